use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "contact_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ContactStatus {
    New,
    Read,
    Resolved,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSubmission {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub status: ContactStatus,
    pub notes: Option<String>,
    pub resolved_by: Option<i64>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub submitted_at: DateTime<Utc>,
}

/// Submission joined with the resolving user, for the admin views.
#[derive(Debug, Clone, FromRow)]
pub struct ContactSubmissionWithResolver {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub status: ContactStatus,
    pub notes: Option<String>,
    pub resolved_by: Option<i64>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub submitted_at: DateTime<Utc>,
    pub resolver_first_name: Option<String>,
    pub resolver_last_name: Option<String>,
    pub resolver_email: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactResolver {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSubmissionResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub status: ContactStatus,
    pub notes: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub submitted_at: DateTime<Utc>,
    pub resolver: Option<ContactResolver>,
}

impl From<ContactSubmissionWithResolver> for ContactSubmissionResponse {
    fn from(row: ContactSubmissionWithResolver) -> Self {
        let resolver = match (
            row.resolved_by,
            row.resolver_first_name,
            row.resolver_last_name,
            row.resolver_email,
        ) {
            (Some(id), Some(first_name), Some(last_name), Some(email)) => Some(ContactResolver {
                id,
                first_name,
                last_name,
                email,
            }),
            _ => None,
        };

        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            subject: row.subject,
            message: row.message,
            status: row.status,
            notes: row.notes,
            resolved_at: row.resolved_at,
            submitted_at: row.submitted_at,
            resolver,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateContactRequest {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateContactStatusRequest {
    pub status: ContactStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ContactListParams {
    pub status: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct ContactCounts {
    pub new: i64,
    pub read: i64,
    pub resolved: i64,
    pub all: i64,
}
