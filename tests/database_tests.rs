use axum::response::IntoResponse;
use chrono::{Duration, NaiveDate, Utc};
use http_body_util::BodyExt;
use serial_test::serial;
use std::env;

use lifequote_server::auth::reset_token;
use lifequote_server::database::queries::{
    ContactQueries, DownloadQueries, QuoteQueries, ResetTokenQueries, SessionQueries, UserQueries,
};
use lifequote_server::database::Database;
use lifequote_server::errors::AppError;
use lifequote_server::models::{
    ContactStatus, CreateContactRequest, CreateQuoteRequest, DownloadStatus, InsuranceType,
    QuoteFilterParams, UserStatus, UserType,
};
use lifequote_server::services::export;

async fn setup_test_db() -> Option<Database> {
    let Ok(database_url) = env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping database test");
        return None;
    };

    let db = Database::new(&database_url)
        .await
        .expect("Failed to connect to test database");
    db.migrate().await.expect("Failed to run migrations");

    // Clean up any existing test data
    sqlx::query(
        "TRUNCATE TABLE download_quotes, downloads, quotes, contact_submissions, \
         password_reset_tokens, sessions, users RESTART IDENTITY CASCADE",
    )
    .execute(db.pool())
    .await
    .expect("Failed to clean test database");

    Some(db)
}

async fn seed_admin(db: &Database) -> lifequote_server::models::User {
    UserQueries::seed_admin(db.pool(), "admin@example.com", "not-a-real-hash")
        .await
        .unwrap()
        .expect("admin should not exist after truncate")
}

fn quote_request(insurance_type: InsuranceType) -> CreateQuoteRequest {
    CreateQuoteRequest {
        insurance_type,
        title: "Mr".to_string(),
        first_name: "Ade".to_string(),
        last_name: "Okafor".to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1985, 3, 14).unwrap(),
        email: "Ade.Okafor@Example.com".to_string(),
        mobile: "07700900123".to_string(),
        postcode: "sw1a 1aa".to_string(),
        smoking_status: false,
        coverage_amount: 150_000,
        coverage_period: 25,
        partner_title: Some("Mrs".to_string()),
        partner_first_name: Some("Bisi".to_string()),
        partner_last_name: Some("Okafor".to_string()),
        partner_date_of_birth: NaiveDate::from_ymd_opt(1987, 7, 2),
        partner_smoking_status: Some(true),
    }
}

#[tokio::test]
#[serial]
async fn test_user_lifecycle() {
    let Some(db) = setup_test_db().await else { return };
    let admin = seed_admin(&db).await;
    assert_eq!(admin.user_type, UserType::Admin);
    assert!(admin.must_change_password);

    let user = UserQueries::create(
        db.pool(),
        "jane@example.com",
        "Jane",
        "Doe",
        "hash",
        UserType::Backoffice,
        admin.id,
    )
    .await
    .unwrap();
    assert_eq!(user.created_by, Some(admin.id));
    assert_eq!(user.status, UserStatus::Active);

    let found = UserQueries::find_by_email(db.pool(), "jane@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, user.id);

    UserQueries::set_status(db.pool(), user.id, UserStatus::Deactivated)
        .await
        .unwrap();
    let found = UserQueries::find_by_id(db.pool(), user.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.status, UserStatus::Deactivated);

    // Re-seeding an existing admin is a no-op
    let again = UserQueries::seed_admin(db.pool(), "admin@example.com", "other")
        .await
        .unwrap();
    assert!(again.is_none());
}

#[tokio::test]
#[serial]
async fn test_duplicate_email_insert_answers_conflict() {
    let Some(db) = setup_test_db().await else { return };
    let admin = seed_admin(&db).await;

    UserQueries::create(
        db.pool(),
        "jane@example.com",
        "Jane",
        "Doe",
        "hash",
        UserType::Backoffice,
        admin.id,
    )
    .await
    .unwrap();

    // Two concurrent creates can both pass the email pre-check; the unique
    // index is the last line of defense and must answer like the pre-check.
    let err = UserQueries::create(
        db.pool(),
        "jane@example.com",
        "Janet",
        "Doe",
        "hash",
        UserType::Backoffice,
        admin.id,
    )
    .await
    .unwrap_err();

    let response = err.into_response();
    assert_eq!(response.status(), axum::http::StatusCode::CONFLICT);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["code"], serde_json::json!("DUPLICATE_EMAIL"));
    // Raw constraint text stays out of client responses
    assert!(!body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("constraint"));
}

#[tokio::test]
#[serial]
async fn test_session_validity_and_revocation() {
    let Some(db) = setup_test_db().await else { return };
    let admin = seed_admin(&db).await;

    SessionQueries::create(db.pool(), admin.id, "live-token", Utc::now() + Duration::hours(1))
        .await
        .unwrap();
    SessionQueries::create(
        db.pool(),
        admin.id,
        "stale-token",
        Utc::now() - Duration::hours(1),
    )
    .await
    .unwrap();

    assert!(SessionQueries::find_valid(db.pool(), "live-token")
        .await
        .unwrap()
        .is_some());
    assert!(SessionQueries::find_valid(db.pool(), "stale-token")
        .await
        .unwrap()
        .is_none());

    let dropped = SessionQueries::delete_for_user(db.pool(), admin.id)
        .await
        .unwrap();
    assert_eq!(dropped, 2);
    assert!(SessionQueries::find_valid(db.pool(), "live-token")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
#[serial]
async fn test_reset_token_consumed_exactly_once() {
    let Some(db) = setup_test_db().await else { return };
    let admin = seed_admin(&db).await;

    SessionQueries::create(db.pool(), admin.id, "session", Utc::now() + Duration::hours(1))
        .await
        .unwrap();

    let token = reset_token::generate();
    let token_hash = reset_token::hash(&token);
    ResetTokenQueries::create(db.pool(), admin.id, &token_hash, Utc::now() + Duration::hours(1))
        .await
        .unwrap();

    let record = ResetTokenQueries::find_valid(db.pool(), &token_hash)
        .await
        .unwrap()
        .unwrap();
    assert!(!record.used);

    let consumed = ResetTokenQueries::consume(db.pool(), record.id, admin.id, "new-hash")
        .await
        .unwrap();
    assert!(consumed);

    // Password installed, sessions revoked, flag cleared
    let user = UserQueries::find_by_id(db.pool(), admin.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.password_hash, "new-hash");
    assert!(!user.must_change_password);
    assert!(SessionQueries::find_valid(db.pool(), "session")
        .await
        .unwrap()
        .is_none());

    // A second consumption attempt fails and changes nothing
    let consumed = ResetTokenQueries::consume(db.pool(), record.id, admin.id, "other-hash")
        .await
        .unwrap();
    assert!(!consumed);
    let user = UserQueries::find_by_id(db.pool(), admin.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.password_hash, "new-hash");

    assert!(ResetTokenQueries::find_valid(db.pool(), &token_hash)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
#[serial]
async fn test_expired_reset_token_is_invalid() {
    let Some(db) = setup_test_db().await else { return };
    let admin = seed_admin(&db).await;

    let token_hash = reset_token::hash(&reset_token::generate());
    ResetTokenQueries::create(db.pool(), admin.id, &token_hash, Utc::now() - Duration::minutes(5))
        .await
        .unwrap();

    assert!(ResetTokenQueries::find_valid(db.pool(), &token_hash)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
#[serial]
async fn test_quote_creation_normalizes_and_filters() {
    let Some(db) = setup_test_db().await else { return };

    let joint = QuoteQueries::create(db.pool(), &quote_request(InsuranceType::Joint))
        .await
        .unwrap();
    assert_eq!(joint.email, "ade.okafor@example.com");
    assert_eq!(joint.postcode, "SW1A 1AA");
    assert_eq!(joint.download_status, DownloadStatus::New);

    let mut solo = quote_request(InsuranceType::Solo);
    solo.email = "solo@example.com".to_string();
    solo.partner_title = None;
    solo.partner_first_name = None;
    solo.partner_last_name = None;
    solo.partner_date_of_birth = None;
    solo.partner_smoking_status = None;
    QuoteQueries::create(db.pool(), &solo).await.unwrap();

    let all = QuoteQueries::list(db.pool(), &QuoteFilterParams::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    let joints = QuoteQueries::list(
        db.pool(),
        &QuoteFilterParams {
            insurance_type: Some(InsuranceType::Joint),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(joints.len(), 1);
    assert_eq!(joints[0].id, joint.id);

    let fresh = QuoteQueries::list_new(db.pool()).await.unwrap();
    assert_eq!(fresh.len(), 2);
}

#[tokio::test]
#[serial]
async fn test_export_marks_quotes_and_records_download() {
    let Some(db) = setup_test_db().await else { return };
    let admin = seed_admin(&db).await;

    for i in 0..3 {
        let mut request = quote_request(InsuranceType::Solo);
        request.email = format!("quote{i}@example.com");
        QuoteQueries::create(db.pool(), &request).await.unwrap();
    }

    let dir = tempfile::tempdir().unwrap();
    let export_dir = dir.path().to_str().unwrap();

    let outcome = export::export_new_quotes(db.pool(), export_dir, admin.id)
        .await
        .unwrap();
    assert_eq!(outcome.quote_count, 3);
    assert!(!outcome.bytes.is_empty());

    // One download row covering all three quotes
    let downloads = DownloadQueries::list_with_users(db.pool()).await.unwrap();
    assert_eq!(downloads.len(), 1);
    assert_eq!(downloads[0].quote_count, 3);
    assert_eq!(downloads[0].downloaded_by, admin.id);

    let linked: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM download_quotes WHERE download_id = $1")
        .bind(outcome.download_id)
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(linked, 3);

    // Everything flipped to DOWNLOADED
    assert!(QuoteQueries::list_new(db.pool()).await.unwrap().is_empty());

    // The workbook was persisted for re-download
    let path = export::export_file_path(export_dir, &outcome.file_name);
    assert!(path.exists());
}

#[tokio::test]
#[serial]
async fn test_export_with_no_new_quotes_leaves_no_trace() {
    let Some(db) = setup_test_db().await else { return };
    let admin = seed_admin(&db).await;

    let dir = tempfile::tempdir().unwrap();
    let err = export::export_new_quotes(db.pool(), dir.path().to_str().unwrap(), admin.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NoNewQuotes));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM downloads")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
#[serial]
async fn test_contact_status_transitions() {
    let Some(db) = setup_test_db().await else { return };
    let admin = seed_admin(&db).await;

    let submission = ContactQueries::create(
        db.pool(),
        &CreateContactRequest {
            name: "Sam Carter".to_string(),
            email: "sam@example.com".to_string(),
            subject: "Policy question".to_string(),
            message: "How do I update my details?".to_string(),
        },
    )
    .await
    .unwrap();
    assert_eq!(submission.status, ContactStatus::New);

    // First view flips NEW to READ, later views are no-ops
    assert!(ContactQueries::mark_read_if_new(db.pool(), submission.id)
        .await
        .unwrap());
    assert!(!ContactQueries::mark_read_if_new(db.pool(), submission.id)
        .await
        .unwrap());

    let resolved = ContactQueries::update_status(
        db.pool(),
        submission.id,
        ContactStatus::Resolved,
        Some("Answered by phone"),
        admin.id,
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(resolved.status, ContactStatus::Resolved);
    assert_eq!(resolved.resolved_by, Some(admin.id));
    assert!(resolved.resolved_at.is_some());
    assert_eq!(resolved.notes.as_deref(), Some("Answered by phone"));

    let counts = ContactQueries::counts(db.pool()).await.unwrap();
    assert_eq!(counts.resolved, 1);
    assert_eq!(counts.all, 1);

    assert!(ContactQueries::delete(db.pool(), submission.id).await.unwrap());
    assert!(!ContactQueries::delete(db.pool(), submission.id).await.unwrap());
}
