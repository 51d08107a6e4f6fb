use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde_json::json;

use crate::{
    auth::PasswordService,
    database::queries::{SessionQueries, UserQueries},
    errors::{AppError, Result},
    handlers::{success, AppState},
    middleware::AdminUser,
    models::{
        CreateUserRequest, UpdateUserRequest, UserResponse, UserSearchParams, UserStatus, UserType,
    },
};

pub async fn create(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let mut errors = Vec::new();
    if !request.email.contains('@') {
        errors.push("Valid email is required".to_string());
    }
    if request.first_name.trim().is_empty() {
        errors.push("First name is required".to_string());
    }
    if request.last_name.trim().is_empty() {
        errors.push("Last name is required".to_string());
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let email = request.email.to_lowercase();
    if UserQueries::find_by_email(state.database.pool(), &email)
        .await?
        .is_some()
    {
        return Err(AppError::DuplicateEmail);
    }

    let temporary_password = PasswordService::generate_temporary(&state.config.password_policy);
    let password_hash = PasswordService::hash_password(&temporary_password)?;

    let user = UserQueries::create(
        state.database.pool(),
        &email,
        request.first_name.trim(),
        request.last_name.trim(),
        &password_hash,
        request.user_type.unwrap_or(UserType::Backoffice),
        admin.id,
    )
    .await?;

    tracing::info!(user_id = user.id, created_by = admin.id, "user created");

    Ok((
        StatusCode::CREATED,
        success(json!({
            "user": UserResponse::from(user),
            "temporaryPassword": temporary_password,
            "message": "User created successfully. Please provide the temporary password to the user.",
        })),
    ))
}

pub async fn list(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<serde_json::Value>> {
    let users = UserQueries::list(state.database.pool()).await?;
    let users: Vec<UserResponse> = users.into_iter().map(Into::into).collect();

    Ok(success(users))
}

pub async fn search(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(params): Query<UserSearchParams>,
) -> Result<Json<serde_json::Value>> {
    let users = UserQueries::search(state.database.pool(), &params).await?;
    let users: Vec<UserResponse> = users.into_iter().map(Into::into).collect();

    Ok(success(users))
}

pub async fn get(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>> {
    let user = UserQueries::find_by_id(state.database.pool(), id)
        .await?
        .ok_or(AppError::UserNotFound)?;

    Ok(success(UserResponse::from(user)))
}

pub async fn update(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<serde_json::Value>> {
    let user = UserQueries::find_by_id(state.database.pool(), id)
        .await?
        .ok_or(AppError::UserNotFound)?;

    // Losing admin rights must also cut off any sessions issued while the
    // user still had them.
    let downgraded =
        user.user_type == UserType::Admin && request.user_type == UserType::Backoffice;

    let updated = UserQueries::update_profile(
        state.database.pool(),
        id,
        request.first_name.trim(),
        request.last_name.trim(),
        request.user_type,
    )
    .await?;

    if downgraded {
        let dropped = SessionQueries::delete_for_user(state.database.pool(), id).await?;
        tracing::info!(user_id = id, sessions = dropped, "admin downgraded, sessions revoked");
    }

    Ok(success(json!({
        "user": UserResponse::from(updated),
        "forcedLogout": downgraded,
    })))
}

pub async fn deactivate(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>> {
    UserQueries::find_by_id(state.database.pool(), id)
        .await?
        .ok_or(AppError::UserNotFound)?;

    UserQueries::set_status(state.database.pool(), id, UserStatus::Deactivated).await?;
    SessionQueries::delete_for_user(state.database.pool(), id).await?;

    tracing::info!(user_id = id, "user deactivated");

    Ok(success(json!({
        "message": "User deactivated successfully",
    })))
}

pub async fn reset_password(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>> {
    UserQueries::find_by_id(state.database.pool(), id)
        .await?
        .ok_or(AppError::UserNotFound)?;

    let temporary_password = PasswordService::generate_temporary(&state.config.password_policy);
    let password_hash = PasswordService::hash_password(&temporary_password)?;

    UserQueries::update_password(state.database.pool(), id, &password_hash, true).await?;
    SessionQueries::delete_for_user(state.database.pool(), id).await?;

    tracing::info!(user_id = id, "password reset by admin");

    Ok(success(json!({
        "temporaryPassword": temporary_password,
        "message": "Password reset successfully. Please provide the temporary password to the user.",
    })))
}
