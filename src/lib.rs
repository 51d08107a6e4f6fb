pub mod auth;
pub mod config;
pub mod database;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use config::Config;
use database::Database;
use handlers::AppState;
use services::EmailService;

pub fn create_app(database: Database, config: Config) -> Router {
    let email = EmailService::new(&config);
    let cors = cors_layer(&config.allowed_origins);

    let state = AppState {
        database,
        config,
        email,
    };

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route(
            "/api/auth/change-password",
            post(handlers::auth::change_password),
        )
        .route("/api/auth/verify", get(handlers::auth::verify))
        .route(
            "/api/quotes",
            post(handlers::quotes::submit).get(handlers::quotes::list),
        )
        .route("/api/quotes/new", get(handlers::quotes::list_new))
        .route("/api/downloads/new", post(handlers::downloads::download_new))
        .route("/api/downloads", get(handlers::downloads::list))
        .route("/api/downloads/:id/file", get(handlers::downloads::get_file))
        .route(
            "/api/users",
            post(handlers::users::create).get(handlers::users::list),
        )
        .route("/api/users/search", get(handlers::users::search))
        .route(
            "/api/users/:id",
            get(handlers::users::get).put(handlers::users::update),
        )
        .route(
            "/api/users/:id/deactivate",
            post(handlers::users::deactivate),
        )
        .route(
            "/api/users/:id/reset-password",
            post(handlers::users::reset_password),
        )
        .route("/api/contact", post(handlers::contact::submit))
        .route("/api/contact/submissions", get(handlers::contact::list))
        .route(
            "/api/contact/submissions/:id",
            get(handlers::contact::get)
                .put(handlers::contact::update_status)
                .delete(handlers::contact::delete),
        )
        .route(
            "/api/password-reset/request",
            post(handlers::password_reset::request),
        )
        .route(
            "/api/password-reset/verify/:token",
            get(handlers::password_reset::verify),
        )
        .route(
            "/api/password-reset/reset",
            post(handlers::password_reset::reset),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
