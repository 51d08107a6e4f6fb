use anyhow::Result;
use tracing_subscriber::EnvFilter;

use lifequote_server::{
    auth::PasswordService,
    config::Config,
    create_app,
    database::{queries::UserQueries, Database},
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("lifequote_server=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    tokio::fs::create_dir_all(&config.export_dir).await?;

    let database = Database::new(&config.database_url).await?;
    database.migrate().await?;
    tracing::info!("database connected, migrations applied");

    seed_admin_from_env(&database).await?;

    let port = config.port;
    let app = create_app(database, config);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("listening on port {port}");

    axum::serve(listener, app).await?;

    Ok(())
}

// First-run bootstrap: without at least one admin nobody can log in to the
// backoffice. The seeded account has must_change_password set, so the
// credentials from the environment only work until the first login.
async fn seed_admin_from_env(database: &Database) -> Result<()> {
    let (Ok(email), Ok(password)) = (
        std::env::var("ADMIN_EMAIL"),
        std::env::var("ADMIN_PASSWORD"),
    ) else {
        return Ok(());
    };

    let password_hash = PasswordService::hash_password(&password)?;
    match UserQueries::seed_admin(database.pool(), &email.to_lowercase(), &password_hash).await? {
        Some(admin) => tracing::info!(user_id = admin.id, "seeded bootstrap admin account"),
        None => tracing::debug!("bootstrap admin already exists"),
    }

    Ok(())
}
