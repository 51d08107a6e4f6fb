use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "insurance_type", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum InsuranceType {
    Solo,
    Joint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "download_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum DownloadStatus {
    New,
    Downloaded,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: i64,
    pub insurance_type: InsuranceType,
    pub title: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub email: String,
    pub mobile: String,
    pub postcode: String,
    pub smoking_status: bool,
    pub coverage_amount: i64,
    pub coverage_period: i32,
    pub partner_title: Option<String>,
    pub partner_first_name: Option<String>,
    pub partner_last_name: Option<String>,
    pub partner_date_of_birth: Option<NaiveDate>,
    pub partner_smoking_status: Option<bool>,
    pub download_status: DownloadStatus,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuoteRequest {
    pub insurance_type: InsuranceType,
    pub title: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub email: String,
    pub mobile: String,
    pub postcode: String,
    pub smoking_status: bool,
    pub coverage_amount: i64,
    pub coverage_period: i32,
    pub partner_title: Option<String>,
    pub partner_first_name: Option<String>,
    pub partner_last_name: Option<String>,
    pub partner_date_of_birth: Option<NaiveDate>,
    pub partner_smoking_status: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteFilterParams {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub insurance_type: Option<InsuranceType>,
    pub download_status: Option<DownloadStatus>,
}

#[derive(Debug, Serialize)]
pub struct NewQuotesResponse {
    pub count: usize,
    pub quotes: Vec<Quote>,
}
