use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct Download {
    pub id: i64,
    pub file_name: String,
    pub downloaded_by: i64,
    pub downloaded_at: DateTime<Utc>,
    pub quote_count: i32,
}

/// Download joined with the user who triggered it, as fetched for history
/// listings.
#[derive(Debug, Clone, FromRow)]
pub struct DownloadWithUser {
    pub id: i64,
    pub file_name: String,
    pub downloaded_by: i64,
    pub downloaded_at: DateTime<Utc>,
    pub quote_count: i32,
    pub user_first_name: String,
    pub user_last_name: String,
    pub user_email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResponse {
    pub id: i64,
    pub file_name: String,
    pub downloaded_by: i64,
    pub downloaded_at: DateTime<Utc>,
    pub quote_count: i32,
    pub user: DownloadUser,
}

impl From<DownloadWithUser> for DownloadResponse {
    fn from(row: DownloadWithUser) -> Self {
        Self {
            id: row.id,
            file_name: row.file_name,
            downloaded_by: row.downloaded_by,
            downloaded_at: row.downloaded_at,
            quote_count: row.quote_count,
            user: DownloadUser {
                first_name: row.user_first_name,
                last_name: row.user_last_name,
                email: row.user_email,
            },
        }
    }
}
