use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};

use crate::{
    database::queries::DownloadQueries,
    errors::{AppError, Result},
    handlers::{success, AppState},
    middleware::BackofficeUser,
    models::DownloadResponse,
    services::export,
};

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

fn attachment(file_name: &str, bytes: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}

pub async fn download_new(
    State(state): State<AppState>,
    BackofficeUser(user): BackofficeUser,
) -> Result<Response> {
    let outcome = export::export_new_quotes(
        state.database.pool(),
        &state.config.export_dir,
        user.id,
    )
    .await?;

    tracing::info!(
        download_id = outcome.download_id,
        quote_count = outcome.quote_count,
        user_id = user.id,
        "exported new quotes"
    );

    Ok(attachment(&outcome.file_name, outcome.bytes))
}

pub async fn list(
    State(state): State<AppState>,
    _user: BackofficeUser,
) -> Result<Json<serde_json::Value>> {
    let downloads = DownloadQueries::list_with_users(state.database.pool()).await?;
    let downloads: Vec<DownloadResponse> = downloads.into_iter().map(Into::into).collect();

    Ok(success(downloads))
}

pub async fn get_file(
    State(state): State<AppState>,
    _user: BackofficeUser,
    Path(id): Path<i64>,
) -> Result<Response> {
    let download = DownloadQueries::find_by_id(state.database.pool(), id)
        .await?
        .ok_or(AppError::DownloadNotFound)?;

    let path = export::export_file_path(&state.config.export_dir, &download.file_name);
    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AppError::FileNotFound
        } else {
            AppError::Io(e)
        }
    })?;

    Ok(attachment(&download.file_name, bytes))
}
