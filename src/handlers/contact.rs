use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde_json::json;

use crate::{
    database::queries::ContactQueries,
    errors::{AppError, Result},
    handlers::{success, AppState},
    middleware::AdminUser,
    models::{
        ContactListParams, ContactStatus, ContactSubmissionResponse, CreateContactRequest,
        UpdateContactStatusRequest,
    },
};

fn parse_status_filter(status: Option<&str>) -> Result<Option<ContactStatus>> {
    match status {
        None | Some("ALL") => Ok(None),
        Some("NEW") => Ok(Some(ContactStatus::New)),
        Some("READ") => Ok(Some(ContactStatus::Read)),
        Some("RESOLVED") => Ok(Some(ContactStatus::Resolved)),
        Some(other) => Err(AppError::Validation(vec![format!(
            "Invalid status filter: {other}"
        )])),
    }
}

pub async fn submit(
    State(state): State<AppState>,
    Json(request): Json<CreateContactRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let mut errors = Vec::new();
    if request.name.trim().is_empty() {
        errors.push("Name is required".to_string());
    }
    if !request.email.contains('@') {
        errors.push("Valid email is required".to_string());
    }
    if request.subject.trim().is_empty() {
        errors.push("Subject is required".to_string());
    }
    if request.message.trim().is_empty() {
        errors.push("Message is required".to_string());
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    // Save first; notification emails are best-effort and must never block
    // or fail the submission.
    let submission = ContactQueries::create(state.database.pool(), &request).await?;

    tracing::info!(submission_id = submission.id, "contact form saved");

    let email = state.email.clone();
    tokio::spawn(async move {
        email.send_contact_notification(&submission).await;
        email.send_contact_auto_reply(&submission).await;
    });

    Ok((
        StatusCode::CREATED,
        success(json!({
            "message": "Thank you for your message. We will get back to you within 24 hours.",
        })),
    ))
}

pub async fn list(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(params): Query<ContactListParams>,
) -> Result<Json<serde_json::Value>> {
    let status = parse_status_filter(params.status.as_deref())?;
    let submissions =
        ContactQueries::list(state.database.pool(), status, params.search.as_deref()).await?;
    let counts = ContactQueries::counts(state.database.pool()).await?;

    let submissions: Vec<ContactSubmissionResponse> =
        submissions.into_iter().map(Into::into).collect();

    Ok(success(json!({
        "submissions": submissions,
        "counts": counts,
    })))
}

pub async fn get(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>> {
    let submission = ContactQueries::find_by_id(state.database.pool(), id)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut response = ContactSubmissionResponse::from(submission);

    // First view of a NEW submission marks it READ; the guarded update keeps
    // later views from touching anything else.
    if response.status == ContactStatus::New
        && ContactQueries::mark_read_if_new(state.database.pool(), id).await?
    {
        response.status = ContactStatus::Read;
    }

    Ok(success(response))
}

pub async fn update_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
    Json(request): Json<UpdateContactStatusRequest>,
) -> Result<Json<serde_json::Value>> {
    let submission = ContactQueries::update_status(
        state.database.pool(),
        id,
        request.status,
        request.notes.as_deref(),
        admin.id,
    )
    .await?
    .ok_or(AppError::NotFound)?;

    Ok(success(ContactSubmissionResponse::from(submission)))
}

pub async fn delete(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>> {
    if !ContactQueries::delete(state.database.pool(), id).await? {
        return Err(AppError::NotFound);
    }

    Ok(success(json!({
        "message": "Contact submission deleted successfully",
    })))
}
