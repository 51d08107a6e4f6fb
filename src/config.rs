use anyhow::Result;
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub session_hours: i64,
    pub frontend_url: String,
    pub export_dir: String,
    pub allowed_origins: Vec<String>,
    pub password_policy: PasswordPolicy,
    pub smtp: Option<SmtpConfig>,
}

/// Password requirements applied both when validating chosen passwords and
/// when generating temporary ones.
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_number: bool,
    pub require_special_char: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
            require_uppercase: true,
            require_lowercase: true,
            require_number: true,
            require_special_char: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
    pub admin_address: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/lifequote".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()?,
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| "change-this-secret-in-production".to_string()),
            session_hours: env::var("SESSION_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            export_dir: env::var("EXPORT_DIRECTORY").unwrap_or_else(|_| "./exports".to_string()),
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:5173".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            password_policy: PasswordPolicy {
                min_length: env::var("MIN_PASSWORD_LENGTH")
                    .unwrap_or_else(|_| "8".to_string())
                    .parse()?,
                max_length: 128,
                require_uppercase: env_flag("REQUIRE_UPPERCASE", true),
                require_lowercase: env_flag("REQUIRE_LOWERCASE", true),
                require_number: env_flag("REQUIRE_NUMBER", true),
                require_special_char: env_flag("REQUIRE_SPECIAL_CHAR", true),
            },
            smtp: Self::smtp_from_env()?,
        })
    }

    // SMTP is optional: without credentials the server still runs and logs
    // skipped sends instead of failing requests.
    fn smtp_from_env() -> Result<Option<SmtpConfig>> {
        let (Ok(username), Ok(password)) = (env::var("SMTP_USER"), env::var("SMTP_PASS")) else {
            return Ok(None);
        };

        let from_address = env::var("SMTP_FROM").unwrap_or_else(|_| username.clone());
        let admin_address = env::var("CONTACT_NOTIFY_ADDRESS").unwrap_or_else(|_| username.clone());

        Ok(Some(SmtpConfig {
            host: env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string()),
            port: env::var("SMTP_PORT")
                .unwrap_or_else(|_| "587".to_string())
                .parse()?,
            username,
            password,
            from_address,
            admin_address,
        }))
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(default)
}
