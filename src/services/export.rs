use chrono::Utc;
use rust_xlsxwriter::{Color, Format, Workbook, XlsxError};
use sqlx::PgPool;
use std::path::{Path, PathBuf};

use crate::errors::{AppError, Result};
use crate::models::{DownloadStatus, InsuranceType, Quote};

const QUOTE_SELECT: &str =
    "SELECT id, insurance_type, title, first_name, last_name, date_of_birth, email, mobile, \
            postcode, smoking_status, coverage_amount, coverage_period, partner_title, \
            partner_first_name, partner_last_name, partner_date_of_birth, \
            partner_smoking_status, download_status, submitted_at \
     FROM quotes WHERE download_status = 'NEW' ORDER BY submitted_at DESC FOR UPDATE";

#[derive(Debug)]
pub struct ExportOutcome {
    pub download_id: i64,
    pub file_name: String,
    pub quote_count: usize,
    pub bytes: Vec<u8>,
}

/// Export all NEW quotes to a spreadsheet and mark them DOWNLOADED.
///
/// Selection (with row locks), the download record, the join rows and the
/// status flip all happen in one transaction, so two concurrent exports can
/// never bundle the same quote and a crash never re-surfaces exported rows.
/// The workbook is built in memory before the commit; the file on disk is
/// written afterwards and is only a cache for later re-downloads.
pub async fn export_new_quotes(
    pool: &PgPool,
    export_dir: &str,
    downloaded_by: i64,
) -> Result<ExportOutcome> {
    let mut tx = pool.begin().await?;

    let quotes = sqlx::query_as::<_, Quote>(QUOTE_SELECT)
        .fetch_all(&mut *tx)
        .await?;

    if quotes.is_empty() {
        return Err(AppError::NoNewQuotes);
    }

    let bytes = build_workbook(&quotes)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("workbook generation failed: {e}")))?;

    let file_name = format!("quotes_{}.xlsx", Utc::now().format("%Y-%m-%d_%H-%M-%S"));

    let download_id: i64 = sqlx::query_scalar(
        "INSERT INTO downloads (file_name, downloaded_by, quote_count) \
         VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(&file_name)
    .bind(downloaded_by)
    .bind(quotes.len() as i32)
    .fetch_one(&mut *tx)
    .await?;

    let quote_ids: Vec<i64> = quotes.iter().map(|q| q.id).collect();

    sqlx::query(
        "INSERT INTO download_quotes (download_id, quote_id) SELECT $1, UNNEST($2::bigint[])",
    )
    .bind(download_id)
    .bind(&quote_ids)
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE quotes SET download_status = $2 WHERE id = ANY($1)")
        .bind(&quote_ids)
        .bind(DownloadStatus::Downloaded)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    if let Err(e) = persist_file(export_dir, &file_name, &bytes).await {
        // The batch is committed and the caller still gets the bytes; only
        // later re-downloads of this file are affected.
        tracing::warn!("failed to persist export file {file_name}: {e}");
    }

    Ok(ExportOutcome {
        download_id,
        file_name,
        quote_count: quotes.len(),
        bytes,
    })
}

pub fn export_file_path(export_dir: &str, file_name: &str) -> PathBuf {
    Path::new(export_dir).join(file_name)
}

async fn persist_file(export_dir: &str, file_name: &str, bytes: &[u8]) -> std::io::Result<()> {
    tokio::fs::create_dir_all(export_dir).await?;
    tokio::fs::write(export_file_path(export_dir, file_name), bytes).await
}

const HEADERS: [(&str, f64); 18] = [
    ("Quote ID", 10.0),
    ("Insurance Type", 15.0),
    ("Submitted Date", 20.0),
    ("Title", 10.0),
    ("First Name", 20.0),
    ("Last Name", 20.0),
    ("Date of Birth", 15.0),
    ("Email", 30.0),
    ("Mobile", 15.0),
    ("Postcode", 12.0),
    ("Smoking Status", 15.0),
    ("Coverage Amount (\u{a3})", 18.0),
    ("Coverage Period (years)", 20.0),
    ("Partner Title", 12.0),
    ("Partner First Name", 20.0),
    ("Partner Last Name", 20.0),
    ("Partner Date of Birth", 18.0),
    ("Partner Smoking Status", 22.0),
];

fn build_workbook(quotes: &[Quote]) -> std::result::Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Quotes")?;

    let header_format = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(0x0074C9));

    for (col, (header, width)) in HEADERS.iter().enumerate() {
        let col = col as u16;
        worksheet.set_column_width(col, *width)?;
        worksheet.write_string_with_format(0, col, *header, &header_format)?;
    }

    for (i, quote) in quotes.iter().enumerate() {
        let row = (i + 1) as u32;
        let insurance_type = match quote.insurance_type {
            InsuranceType::Solo => "SOLO",
            InsuranceType::Joint => "JOINT",
        };

        worksheet.write_number(row, 0, quote.id as f64)?;
        worksheet.write_string(row, 1, insurance_type)?;
        worksheet.write_string(row, 2, quote.submitted_at.to_rfc3339())?;
        worksheet.write_string(row, 3, &quote.title)?;
        worksheet.write_string(row, 4, &quote.first_name)?;
        worksheet.write_string(row, 5, &quote.last_name)?;
        worksheet.write_string(row, 6, quote.date_of_birth.to_string())?;
        worksheet.write_string(row, 7, &quote.email)?;
        worksheet.write_string(row, 8, &quote.mobile)?;
        worksheet.write_string(row, 9, &quote.postcode)?;
        worksheet.write_string(row, 10, yes_no(quote.smoking_status))?;
        worksheet.write_number(row, 11, quote.coverage_amount as f64)?;
        worksheet.write_number(row, 12, f64::from(quote.coverage_period))?;
        worksheet.write_string(row, 13, quote.partner_title.as_deref().unwrap_or(""))?;
        worksheet.write_string(row, 14, quote.partner_first_name.as_deref().unwrap_or(""))?;
        worksheet.write_string(row, 15, quote.partner_last_name.as_deref().unwrap_or(""))?;
        worksheet.write_string(
            row,
            16,
            quote
                .partner_date_of_birth
                .map(|d| d.to_string())
                .unwrap_or_default(),
        )?;
        worksheet.write_string(
            row,
            17,
            quote.partner_smoking_status.map(yes_no).unwrap_or(""),
        )?;
    }

    worksheet.autofilter(0, 0, quotes.len() as u32, (HEADERS.len() - 1) as u16)?;
    worksheet.set_freeze_panes(1, 0)?;

    workbook.save_to_buffer()
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}
