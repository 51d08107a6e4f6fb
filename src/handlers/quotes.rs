use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use serde_json::json;

use crate::{
    database::queries::QuoteQueries,
    errors::{AppError, Result},
    handlers::{success, AppState},
    middleware::BackofficeUser,
    models::{CreateQuoteRequest, InsuranceType, NewQuotesResponse, QuoteFilterParams},
};

const MIN_COVERAGE_AMOUNT: i64 = 30_000;
const COVERAGE_PERIOD_RANGE: std::ops::RangeInclusive<i32> = 5..=72;

fn validate_submission(request: &CreateQuoteRequest) -> Result<()> {
    let mut errors = Vec::new();

    if request.title.trim().is_empty() {
        errors.push("Title is required".to_string());
    }
    if request.first_name.trim().is_empty() {
        errors.push("First name is required".to_string());
    }
    if request.last_name.trim().is_empty() {
        errors.push("Last name is required".to_string());
    }
    if !request.email.contains('@') {
        errors.push("Valid email is required".to_string());
    }
    if request.mobile.trim().is_empty() {
        errors.push("Mobile number is required".to_string());
    }
    if request.postcode.trim().is_empty() {
        errors.push("Postcode is required".to_string());
    }
    if request.coverage_amount < MIN_COVERAGE_AMOUNT {
        errors.push("Valid coverage amount is required".to_string());
    }
    if !COVERAGE_PERIOD_RANGE.contains(&request.coverage_period) {
        errors.push("Valid coverage period is required".to_string());
    }

    if request.insurance_type == InsuranceType::Joint {
        let partner_complete = request.partner_title.as_deref().is_some_and(|t| !t.is_empty())
            && request
                .partner_first_name
                .as_deref()
                .is_some_and(|n| !n.is_empty())
            && request
                .partner_last_name
                .as_deref()
                .is_some_and(|n| !n.is_empty())
            && request.partner_date_of_birth.is_some()
            && request.partner_smoking_status.is_some();

        if !partner_complete {
            errors.push("Partner details are required for joint insurance".to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

pub async fn submit(
    State(state): State<AppState>,
    Json(request): Json<CreateQuoteRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    validate_submission(&request)?;

    let quote = QuoteQueries::create(state.database.pool(), &request).await?;

    let quote_id = quote.id;
    tracing::info!(quote_id, "quote submitted");

    // Confirmation email is a side effect; the submission is already saved.
    let email = state.email.clone();
    tokio::spawn(async move {
        email.send_quote_confirmation(&quote).await;
    });

    Ok((
        StatusCode::CREATED,
        success(json!({
            "message": "Your quote request has been submitted successfully. \
                        An insurance advisor will contact you soon.",
            "quoteId": quote_id,
        })),
    ))
}

pub async fn list(
    State(state): State<AppState>,
    _user: BackofficeUser,
    Query(filter): Query<QuoteFilterParams>,
) -> Result<Json<serde_json::Value>> {
    let quotes = QuoteQueries::list(state.database.pool(), &filter).await?;

    Ok(success(quotes))
}

pub async fn list_new(
    State(state): State<AppState>,
    _user: BackofficeUser,
) -> Result<Json<serde_json::Value>> {
    let quotes = QuoteQueries::list_new(state.database.pool()).await?;

    Ok(success(NewQuotesResponse {
        count: quotes.len(),
        quotes,
    }))
}
