use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use crate::{
    auth::JwtService,
    database::queries::{SessionQueries, UserQueries},
    errors::AppError,
    handlers::AppState,
    models::{UserStatus, UserType},
};

/// A caller holding a valid bearer token backed by a live session row and an
/// ACTIVE account. Deleting session rows therefore cuts off a token
/// immediately, whatever its JWT expiry says.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub email: String,
    pub user_type: UserType,
    pub must_change_password: bool,
    pub token: String,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.user_type == UserType::Admin
    }
}

/// An authenticated user who has completed any required password change.
/// Backoffice routes take this; the change-password and verify endpoints
/// take the plain `AuthenticatedUser`.
#[derive(Debug, Clone)]
pub struct BackofficeUser(pub AuthenticatedUser);

/// An authenticated ADMIN who has completed any required password change.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthenticatedUser);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|header| header.to_str().ok())
            .and_then(|header| header.strip_prefix("Bearer "))
            .ok_or(AppError::Unauthorized)?;

        let jwt_service = JwtService::new(&state.config.jwt_secret, state.config.session_hours);
        let claims = jwt_service.verify_token(token)?;
        let user_id = claims.user_id()?;

        // The session row must still exist; logout, deactivation, role
        // downgrade and password reset all delete it.
        SessionQueries::find_valid(state.database.pool(), token)
            .await?
            .ok_or(AppError::Unauthorized)?;

        let user = UserQueries::find_by_id(state.database.pool(), user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if user.status != UserStatus::Active {
            return Err(AppError::UserDeactivated);
        }

        Ok(AuthenticatedUser {
            id: user.id,
            email: user.email,
            user_type: user.user_type,
            must_change_password: user.must_change_password,
            token: token.to_string(),
        })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for BackofficeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;

        if user.must_change_password {
            return Err(AppError::MustChangePassword);
        }

        Ok(BackofficeUser(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let BackofficeUser(user) = BackofficeUser::from_request_parts(parts, state).await?;

        if !user.is_admin() {
            return Err(AppError::Forbidden);
        }

        Ok(AdminUser(user))
    }
}
