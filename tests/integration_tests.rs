use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use serial_test::serial;
use std::env;
use tower::ServiceExt;

use chrono::{Duration, Utc};
use lifequote_server::auth::PasswordService;
use lifequote_server::config::{Config, PasswordPolicy};
use lifequote_server::create_app;
use lifequote_server::database::queries::{SessionQueries, UserQueries};
use lifequote_server::database::Database;
use lifequote_server::models::UserType;

const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "Adm1n!Passw0rd";

async fn setup() -> Option<(Router, Database)> {
    let Ok(database_url) = env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping integration test");
        return None;
    };

    let db = Database::new(&database_url)
        .await
        .expect("Failed to connect to test database");
    db.migrate().await.expect("Failed to run migrations");

    sqlx::query(
        "TRUNCATE TABLE download_quotes, downloads, quotes, contact_submissions, \
         password_reset_tokens, sessions, users RESTART IDENTITY CASCADE",
    )
    .execute(db.pool())
    .await
    .expect("Failed to clean test database");

    let config = Config {
        database_url,
        port: 0,
        jwt_secret: "integration-test-secret".to_string(),
        session_hours: 24,
        frontend_url: "http://localhost:5173".to_string(),
        export_dir: env::temp_dir()
            .join("lifequote-test-exports")
            .to_string_lossy()
            .into_owned(),
        allowed_origins: vec!["http://localhost:5173".to_string()],
        password_policy: PasswordPolicy::default(),
        smtp: None,
    };

    Some((create_app(db.clone(), config), db))
}

async fn seed_admin(db: &Database) {
    let password_hash = PasswordService::hash_password(ADMIN_PASSWORD).unwrap();
    UserQueries::seed_admin(db.pool(), ADMIN_EMAIL, &password_hash)
        .await
        .unwrap()
        .expect("admin should not exist after truncate");
}

async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, payload: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

fn quote_payload() -> Value {
    json!({
        "insuranceType": "SOLO",
        "title": "Ms",
        "firstName": "Freya",
        "lastName": "Holt",
        "dateOfBirth": "1990-05-12",
        "email": "freya@example.com",
        "mobile": "07700900456",
        "postcode": "EC1A 1BB",
        "smokingStatus": false,
        "coverageAmount": 100000,
        "coveragePeriod": 20
    })
}

async fn login(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            &json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    body["data"]["token"].as_str().unwrap().to_string()
}

#[tokio::test]
#[serial]
async fn test_health_check() {
    let Some((app, _db)) = setup().await else { return };

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["database"], json!("connected"));
}

#[tokio::test]
#[serial]
async fn test_protected_routes_require_token() {
    let Some((app, _db)) = setup().await else { return };

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/quotes")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"]["code"], json!("UNAUTHORIZED"));
}

#[tokio::test]
#[serial]
async fn test_public_quote_submission() {
    let Some((app, _db)) = setup().await else { return };

    let response = app
        .oneshot(json_request("POST", "/api/quotes", &quote_payload()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert!(body["data"]["quoteId"].is_i64());
}

#[tokio::test]
#[serial]
async fn test_quote_validation_errors_are_collected() {
    let Some((app, _db)) = setup().await else { return };

    let mut payload = quote_payload();
    payload["email"] = json!("not-an-email");
    payload["coverageAmount"] = json!(5000);

    let response = app
        .oneshot(json_request("POST", "/api/quotes", &payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], json!("VALIDATION_ERROR"));
    assert_eq!(body["error"]["details"].as_array().unwrap().len(), 2);
}

#[tokio::test]
#[serial]
async fn test_login_rejects_bad_credentials() {
    let Some((app, db)) = setup().await else { return };
    seed_admin(&db).await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            &json!({ "email": ADMIN_EMAIL, "password": "wrong-password" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], json!("INVALID_CREDENTIALS"));
}

#[tokio::test]
#[serial]
async fn test_session_lifecycle() {
    let Some((app, db)) = setup().await else { return };
    seed_admin(&db).await;

    let token = login(&app).await;

    // The token works while its session row exists
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/verify")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Seeded admin still has the first-login flag, so backoffice data is gated
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/quotes")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], json!("MUST_CHANGE_PASSWORD"));

    // Logout deletes the session; the JWT alone is no longer enough
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/logout")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/auth/verify")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[serial]
async fn test_admin_downgrade_revokes_target_sessions() {
    let Some((app, db)) = setup().await else { return };
    seed_admin(&db).await;

    // Clear the first-login flag so the acting admin passes the backoffice gate
    sqlx::query("UPDATE users SET must_change_password = FALSE WHERE email = $1")
        .bind(ADMIN_EMAIL)
        .execute(db.pool())
        .await
        .unwrap();
    let token = login(&app).await;

    let admin = UserQueries::find_by_email(db.pool(), ADMIN_EMAIL)
        .await
        .unwrap()
        .unwrap();
    let target = UserQueries::create(
        db.pool(),
        "mark@example.com",
        "Mark",
        "Hale",
        "hash",
        UserType::Admin,
        admin.id,
    )
    .await
    .unwrap();
    SessionQueries::create(
        db.pool(),
        target.id,
        "target-session",
        Utc::now() + Duration::hours(1),
    )
    .await
    .unwrap();

    let authed_put = |payload: Value| {
        Request::builder()
            .method("PUT")
            .uri(format!("/api/users/{}", target.id))
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::from(payload.to_string()))
            .unwrap()
    };

    // Stripping admin rights must also kill the target's live sessions
    let response = app
        .clone()
        .oneshot(authed_put(json!({
            "firstName": "Mark",
            "lastName": "Hale",
            "userType": "BACKOFFICE"
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["forcedLogout"], json!(true));
    assert_eq!(body["data"]["user"]["userType"], json!("BACKOFFICE"));
    assert!(SessionQueries::find_valid(db.pool(), "target-session")
        .await
        .unwrap()
        .is_none());

    // An update that keeps the role is not a downgrade and spares sessions
    SessionQueries::create(
        db.pool(),
        target.id,
        "fresh-session",
        Utc::now() + Duration::hours(1),
    )
    .await
    .unwrap();

    let response = app
        .clone()
        .oneshot(authed_put(json!({
            "firstName": "Marcus",
            "lastName": "Hale",
            "userType": "BACKOFFICE"
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["forcedLogout"], json!(false));
    assert!(SessionQueries::find_valid(db.pool(), "fresh-session")
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
#[serial]
async fn test_contact_submission_and_admin_gate() {
    let Some((app, db)) = setup().await else { return };
    seed_admin(&db).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/contact",
            &json!({
                "name": "Sam Carter",
                "email": "sam@example.com",
                "subject": "Policy question",
                "message": "How do I update my details?"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // Listing submissions is admin-only
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/contact/submissions")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[serial]
async fn test_password_reset_request_does_not_leak_accounts() {
    let Some((app, db)) = setup().await else { return };
    seed_admin(&db).await;

    for email in [ADMIN_EMAIL, "nobody@example.com"] {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/password-reset/request",
                &json!({ "email": email }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], json!(true));
    }

    // Only the real account got a token
    let tokens: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM password_reset_tokens")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(tokens, 1);
}
