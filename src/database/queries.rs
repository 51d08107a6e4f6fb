use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::errors::Result;
use crate::models::*;

const USER_COLUMNS: &str = "id, email, first_name, last_name, password_hash, user_type, status, \
                            must_change_password, created_by, created_at, updated_at";

pub struct UserQueries;

impl UserQueries {
    pub async fn create(
        pool: &PgPool,
        email: &str,
        first_name: &str,
        last_name: &str,
        password_hash: &str,
        user_type: UserType,
        created_by: i64,
    ) -> Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, first_name, last_name, password_hash, user_type, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(email)
        .bind(first_name)
        .bind(last_name)
        .bind(password_hash)
        .bind(user_type)
        .bind(created_by)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Insert the bootstrap admin account if no user with this email exists.
    /// Returns None when the account was already there.
    pub async fn seed_admin(
        pool: &PgPool,
        email: &str,
        password_hash: &str,
    ) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, first_name, last_name, password_hash, user_type) \
             VALUES ($1, 'System', 'Administrator', $2, 'ADMIN') \
             ON CONFLICT (email) DO NOTHING \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(email)
        .bind(password_hash)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    pub async fn search(pool: &PgPool, params: &UserSearchParams) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE ($1::text IS NULL OR first_name ILIKE '%' || $1 || '%') \
               AND ($2::text IS NULL OR last_name ILIKE '%' || $2 || '%') \
               AND ($3::text IS NULL OR email ILIKE '%' || $3 || '%') \
             ORDER BY created_at DESC"
        ))
        .bind(&params.first_name)
        .bind(&params.last_name)
        .bind(&params.email)
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    pub async fn update_profile(
        pool: &PgPool,
        id: i64,
        first_name: &str,
        last_name: &str,
        user_type: UserType,
    ) -> Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET first_name = $2, last_name = $3, user_type = $4, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(first_name)
        .bind(last_name)
        .bind(user_type)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    pub async fn set_status(pool: &PgPool, id: i64, status: UserStatus) -> Result<()> {
        sqlx::query("UPDATE users SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(pool)
            .await?;

        Ok(())
    }

    pub async fn update_password(
        pool: &PgPool,
        id: i64,
        password_hash: &str,
        must_change_password: bool,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE users SET password_hash = $2, must_change_password = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .bind(must_change_password)
        .execute(pool)
        .await?;

        Ok(())
    }
}

pub struct SessionQueries;

impl SessionQueries {
    pub async fn create(
        pool: &PgPool,
        user_id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query("INSERT INTO sessions (user_id, token, expires_at) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(token)
            .bind(expires_at)
            .execute(pool)
            .await?;

        Ok(())
    }

    pub async fn find_valid(pool: &PgPool, token: &str) -> Result<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT id, user_id, token, expires_at, created_at FROM sessions \
             WHERE token = $1 AND expires_at > NOW()",
        )
        .bind(token)
        .fetch_optional(pool)
        .await?;

        Ok(session)
    }

    pub async fn delete_by_token(pool: &PgPool, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(pool)
            .await?;

        Ok(())
    }

    pub async fn delete_for_user(pool: &PgPool, user_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}

const QUOTE_COLUMNS: &str =
    "id, insurance_type, title, first_name, last_name, date_of_birth, email, mobile, postcode, \
     smoking_status, coverage_amount, coverage_period, partner_title, partner_first_name, \
     partner_last_name, partner_date_of_birth, partner_smoking_status, download_status, \
     submitted_at";

pub struct QuoteQueries;

impl QuoteQueries {
    pub async fn create(pool: &PgPool, request: &CreateQuoteRequest) -> Result<Quote> {
        let quote = sqlx::query_as::<_, Quote>(&format!(
            "INSERT INTO quotes (insurance_type, title, first_name, last_name, date_of_birth, \
                                 email, mobile, postcode, smoking_status, coverage_amount, \
                                 coverage_period, partner_title, partner_first_name, \
                                 partner_last_name, partner_date_of_birth, partner_smoking_status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
             RETURNING {QUOTE_COLUMNS}"
        ))
        .bind(request.insurance_type)
        .bind(&request.title)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(request.date_of_birth)
        .bind(request.email.to_lowercase())
        .bind(&request.mobile)
        .bind(request.postcode.to_uppercase())
        .bind(request.smoking_status)
        .bind(request.coverage_amount)
        .bind(request.coverage_period)
        .bind(&request.partner_title)
        .bind(&request.partner_first_name)
        .bind(&request.partner_last_name)
        .bind(request.partner_date_of_birth)
        .bind(request.partner_smoking_status)
        .fetch_one(pool)
        .await?;

        Ok(quote)
    }

    pub async fn list(pool: &PgPool, filter: &QuoteFilterParams) -> Result<Vec<Quote>> {
        let quotes = sqlx::query_as::<_, Quote>(&format!(
            "SELECT {QUOTE_COLUMNS} FROM quotes \
             WHERE ($1::date IS NULL OR submitted_at >= $1::date) \
               AND ($2::date IS NULL OR submitted_at < $2::date + INTERVAL '1 day') \
               AND ($3::insurance_type IS NULL OR insurance_type = $3) \
               AND ($4::download_status IS NULL OR download_status = $4) \
             ORDER BY submitted_at DESC"
        ))
        .bind(filter.start_date)
        .bind(filter.end_date)
        .bind(filter.insurance_type)
        .bind(filter.download_status)
        .fetch_all(pool)
        .await?;

        Ok(quotes)
    }

    pub async fn list_new(pool: &PgPool) -> Result<Vec<Quote>> {
        let quotes = sqlx::query_as::<_, Quote>(&format!(
            "SELECT {QUOTE_COLUMNS} FROM quotes WHERE download_status = 'NEW' \
             ORDER BY submitted_at DESC"
        ))
        .fetch_all(pool)
        .await?;

        Ok(quotes)
    }
}

pub struct DownloadQueries;

impl DownloadQueries {
    pub async fn list_with_users(pool: &PgPool) -> Result<Vec<DownloadWithUser>> {
        let downloads = sqlx::query_as::<_, DownloadWithUser>(
            "SELECT d.id, d.file_name, d.downloaded_by, d.downloaded_at, d.quote_count, \
                    u.first_name AS user_first_name, u.last_name AS user_last_name, \
                    u.email AS user_email \
             FROM downloads d \
             JOIN users u ON u.id = d.downloaded_by \
             ORDER BY d.downloaded_at DESC",
        )
        .fetch_all(pool)
        .await?;

        Ok(downloads)
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Download>> {
        let download = sqlx::query_as::<_, Download>(
            "SELECT id, file_name, downloaded_by, downloaded_at, quote_count \
             FROM downloads WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(download)
    }
}

const CONTACT_COLUMNS: &str =
    "c.id, c.name, c.email, c.subject, c.message, c.status, c.notes, c.resolved_by, \
     c.resolved_at, c.submitted_at, u.first_name AS resolver_first_name, \
     u.last_name AS resolver_last_name, u.email AS resolver_email";

pub struct ContactQueries;

impl ContactQueries {
    pub async fn create(pool: &PgPool, request: &CreateContactRequest) -> Result<ContactSubmission> {
        let submission = sqlx::query_as::<_, ContactSubmission>(
            "INSERT INTO contact_submissions (name, email, subject, message) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, name, email, subject, message, status, notes, resolved_by, \
                       resolved_at, submitted_at",
        )
        .bind(&request.name)
        .bind(&request.email)
        .bind(&request.subject)
        .bind(&request.message)
        .fetch_one(pool)
        .await?;

        Ok(submission)
    }

    pub async fn list(
        pool: &PgPool,
        status: Option<ContactStatus>,
        search: Option<&str>,
    ) -> Result<Vec<ContactSubmissionWithResolver>> {
        let submissions = sqlx::query_as::<_, ContactSubmissionWithResolver>(&format!(
            "SELECT {CONTACT_COLUMNS} \
             FROM contact_submissions c \
             LEFT JOIN users u ON u.id = c.resolved_by \
             WHERE ($1::contact_status IS NULL OR c.status = $1) \
               AND ($2::text IS NULL OR c.name ILIKE '%' || $2 || '%' \
                    OR c.email ILIKE '%' || $2 || '%' OR c.subject ILIKE '%' || $2 || '%') \
             ORDER BY c.submitted_at DESC"
        ))
        .bind(status)
        .bind(search)
        .fetch_all(pool)
        .await?;

        Ok(submissions)
    }

    pub async fn counts(pool: &PgPool) -> Result<ContactCounts> {
        let row: (i64, i64, i64, i64) = sqlx::query_as(
            "SELECT COUNT(*) FILTER (WHERE status = 'NEW'), \
                    COUNT(*) FILTER (WHERE status = 'READ'), \
                    COUNT(*) FILTER (WHERE status = 'RESOLVED'), \
                    COUNT(*) \
             FROM contact_submissions",
        )
        .fetch_one(pool)
        .await?;

        Ok(ContactCounts {
            new: row.0,
            read: row.1,
            resolved: row.2,
            all: row.3,
        })
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: i64,
    ) -> Result<Option<ContactSubmissionWithResolver>> {
        let submission = sqlx::query_as::<_, ContactSubmissionWithResolver>(&format!(
            "SELECT {CONTACT_COLUMNS} \
             FROM contact_submissions c \
             LEFT JOIN users u ON u.id = c.resolved_by \
             WHERE c.id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(submission)
    }

    /// Flip a freshly viewed submission from NEW to READ. The status guard in
    /// the WHERE clause makes repeat views a no-op.
    pub async fn mark_read_if_new(pool: &PgPool, id: i64) -> Result<bool> {
        let result =
            sqlx::query("UPDATE contact_submissions SET status = 'READ' WHERE id = $1 AND status = 'NEW'")
                .bind(id)
                .execute(pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn update_status(
        pool: &PgPool,
        id: i64,
        status: ContactStatus,
        notes: Option<&str>,
        resolved_by: i64,
    ) -> Result<Option<ContactSubmissionWithResolver>> {
        let updated = sqlx::query(
            "UPDATE contact_submissions \
             SET status = $2, \
                 notes = COALESCE($3, notes), \
                 resolved_by = CASE WHEN $2 = 'RESOLVED' THEN $4 ELSE resolved_by END, \
                 resolved_at = CASE WHEN $2 = 'RESOLVED' THEN NOW() ELSE resolved_at END \
             WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .bind(notes)
        .bind(resolved_by)
        .execute(pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        Self::find_by_id(pool, id).await
    }

    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM contact_submissions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

pub struct ResetTokenQueries;

impl ResetTokenQueries {
    pub async fn create(
        pool: &PgPool,
        user_id: i64,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO password_reset_tokens (user_id, token_hash, expires_at) \
             VALUES ($1, $2, $3)",
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn find_valid(pool: &PgPool, token_hash: &str) -> Result<Option<PasswordResetToken>> {
        let token = sqlx::query_as::<_, PasswordResetToken>(
            "SELECT id, user_id, token_hash, expires_at, used, created_at \
             FROM password_reset_tokens \
             WHERE token_hash = $1 AND used = FALSE AND expires_at >= NOW()",
        )
        .bind(token_hash)
        .fetch_optional(pool)
        .await?;

        Ok(token)
    }

    /// Burn the token, install the new password hash, and drop every session
    /// for the user, all in one transaction. Returns false when the token was
    /// already consumed by a concurrent request.
    pub async fn consume(
        pool: &PgPool,
        token_id: i64,
        user_id: i64,
        password_hash: &str,
    ) -> Result<bool> {
        let mut tx = pool.begin().await?;

        let burned = sqlx::query(
            "UPDATE password_reset_tokens SET used = TRUE \
             WHERE id = $1 AND used = FALSE AND expires_at >= NOW()",
        )
        .bind(token_id)
        .execute(&mut *tx)
        .await?;

        if burned.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            "UPDATE users SET password_hash = $2, must_change_password = FALSE, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(user_id)
        .bind(password_hash)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }
}
