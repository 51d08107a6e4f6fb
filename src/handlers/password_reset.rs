use axum::{
    extract::{Path, State},
    response::Json,
};
use chrono::{Duration, Utc};
use serde_json::json;

use crate::{
    auth::{reset_token, PasswordService},
    database::queries::{ResetTokenQueries, UserQueries},
    errors::{AppError, Result},
    handlers::{success, AppState},
    models::{RequestResetRequest, ResetPasswordRequest, UserStatus},
};

const TOKEN_TTL_HOURS: i64 = 1;

// Same answer whether or not the account exists, so the endpoint cannot be
// used to probe for registered emails.
const REQUEST_MESSAGE: &str =
    "If an account exists with this email, a password reset link has been sent.";

pub async fn request(
    State(state): State<AppState>,
    Json(request): Json<RequestResetRequest>,
) -> Result<Json<serde_json::Value>> {
    let email = request.email.to_lowercase();

    if let Some(user) = UserQueries::find_by_email(state.database.pool(), &email).await? {
        if user.status == UserStatus::Active {
            let token = reset_token::generate();
            let expires_at = Utc::now() + Duration::hours(TOKEN_TTL_HOURS);
            ResetTokenQueries::create(
                state.database.pool(),
                user.id,
                &reset_token::hash(&token),
                expires_at,
            )
            .await?;

            tracing::info!(user_id = user.id, "password reset token issued");

            let reset_url = format!("{}/reset-password?token={token}", state.config.frontend_url);
            let mailer = state.email.clone();
            tokio::spawn(async move {
                mailer
                    .send_password_reset(&user.email, &user.first_name, &reset_url)
                    .await;
            });
        } else {
            tracing::info!(user_id = user.id, "reset requested for inactive account");
        }
    }

    Ok(success(json!({ "message": REQUEST_MESSAGE })))
}

pub async fn verify(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let record = ResetTokenQueries::find_valid(state.database.pool(), &reset_token::hash(&token))
        .await?
        .ok_or(AppError::InvalidResetToken)?;

    let user = UserQueries::find_by_id(state.database.pool(), record.user_id)
        .await?
        .ok_or(AppError::InvalidResetToken)?;

    if user.status != UserStatus::Active {
        return Err(AppError::UserDeactivated);
    }

    Ok(success(json!({
        "valid": true,
        "email": user.email,
    })))
}

pub async fn reset(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<serde_json::Value>> {
    let record =
        ResetTokenQueries::find_valid(state.database.pool(), &reset_token::hash(&request.token))
            .await?
            .ok_or(AppError::InvalidResetToken)?;

    let user = UserQueries::find_by_id(state.database.pool(), record.user_id)
        .await?
        .ok_or(AppError::InvalidResetToken)?;

    if user.status != UserStatus::Active {
        return Err(AppError::UserDeactivated);
    }

    PasswordService::validate_policy(&request.new_password, &state.config.password_policy)?;
    let password_hash = PasswordService::hash_password(&request.new_password)?;

    let consumed =
        ResetTokenQueries::consume(state.database.pool(), record.id, user.id, &password_hash)
            .await?;
    if !consumed {
        return Err(AppError::InvalidResetToken);
    }

    tracing::info!(user_id = user.id, "password reset completed");

    Ok(success(json!({
        "message": "Password has been reset successfully. You can now log in with your new password.",
    })))
}
