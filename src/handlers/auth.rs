use axum::{extract::State, response::Json};
use chrono::Utc;
use serde_json::json;

use crate::{
    auth::{JwtService, PasswordService},
    database::queries::{SessionQueries, UserQueries},
    errors::{AppError, Result},
    handlers::{success, AppState},
    middleware::AuthenticatedUser,
    models::{AuthResponse, ChangePasswordRequest, LoginRequest, UserResponse, UserStatus},
};

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>> {
    let user = UserQueries::find_by_email(state.database.pool(), &request.email.to_lowercase())
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if user.status != UserStatus::Active {
        return Err(AppError::UserDeactivated);
    }

    if !PasswordService::verify_password(&request.password, &user.password_hash)? {
        return Err(AppError::InvalidCredentials);
    }

    let jwt_service = JwtService::new(&state.config.jwt_secret, state.config.session_hours);
    let token = jwt_service.generate_token(user.id, &user.email, user.user_type)?;

    let expires_at = Utc::now() + jwt_service.token_duration();
    SessionQueries::create(state.database.pool(), user.id, &token, expires_at).await?;

    tracing::info!(user_id = user.id, "user logged in");

    Ok(success(AuthResponse {
        user: UserResponse::from(user),
        token,
        expires_in: format!("{}h", state.config.session_hours),
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<serde_json::Value>> {
    SessionQueries::delete_by_token(state.database.pool(), &user.token).await?;

    Ok(success(json!({
        "message": "Logged out successfully",
    })))
}

pub async fn change_password(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<serde_json::Value>> {
    let record = UserQueries::find_by_id(state.database.pool(), user.id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !PasswordService::verify_password(&request.current_password, &record.password_hash)? {
        return Err(AppError::InvalidCredentials);
    }

    PasswordService::validate_policy(&request.new_password, &state.config.password_policy)?;

    let password_hash = PasswordService::hash_password(&request.new_password)?;
    UserQueries::update_password(state.database.pool(), user.id, &password_hash, false).await?;

    tracing::info!(user_id = user.id, "password changed");

    Ok(success(json!({
        "message": "Password changed successfully",
    })))
}

pub async fn verify(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<serde_json::Value>> {
    let record = UserQueries::find_by_id(state.database.pool(), user.id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(success(json!({
        "user": UserResponse::from(record),
    })))
}
