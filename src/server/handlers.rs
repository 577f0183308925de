use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Form, Json};
use serde::Deserialize;
use thiserror::Error;

use super::state::{AppState, ProgressReport};
use crate::core::SentimentError;
use crate::reviews::{label_all, ReviewTable, SentimentFilter};

pub const DOWNLOAD_FILENAME: &str = "sentiment_results.csv";

/// Everything a handler can fail with, mapped onto an HTTP status.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Sentiment(#[from] SentimentError),

    #[error("Could not read the uploaded file as CSV")]
    UnreadableCsv(#[source] SentimentError),

    #[error(transparent)]
    Multipart(#[from] MultipartError),

    #[error("No file uploaded")]
    MissingFile,

    #[error("Upload a CSV file first")]
    NoTable,

    #[error("No results to download yet")]
    NoResults,

    #[error("An analysis is already running")]
    Busy,

    #[error("Analysis task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Sentiment(e) if e.is_user_error() => StatusCode::BAD_REQUEST,
            AppError::Sentiment(_) | AppError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Multipart(e) => e.status(),
            AppError::UnreadableCsv(_) | AppError::MissingFile | AppError::NoTable => {
                StatusCode::BAD_REQUEST
            }
            AppError::NoResults => StatusCode::NOT_FOUND,
            AppError::Busy => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else if let AppError::UnreadableCsv(source) = &self {
            tracing::warn!(error = %source, "rejected upload");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        (status, self.to_string()).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct IndexQuery {
    pub sentiment: Option<String>,
}

pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<IndexQuery>,
) -> Result<Html<String>, AppError> {
    let filter = query
        .sentiment
        .as_deref()
        .and_then(|s| s.parse::<SentimentFilter>().ok())
        .unwrap_or_default();

    let session = state.session.read().await;
    let html = state.pages.index(
        session.notice.as_deref(),
        session.table.as_ref(),
        session.results.as_ref(),
        filter,
        state.config.preview_rows,
    )?;
    Ok(Html(html))
}

pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Redirect, AppError> {
    if state.run.is_running() {
        return Err(AppError::Busy);
    }

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        let table = ReviewTable::from_csv_bytes(&bytes).map_err(AppError::UnreadableCsv)?;
        tracing::info!(
            file = %file_name,
            rows = table.len(),
            columns = table.headers().len(),
            "review table uploaded"
        );

        let mut session = state.session.write().await;
        session.notice = Some(format!("Loaded {} reviews", table.len()));
        session.results = None;
        session.table = Some(table);
        return Ok(Redirect::to("/"));
    }

    Err(AppError::MissingFile)
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeForm {
    pub column: String,
}

pub async fn analyze(
    State(state): State<AppState>,
    Form(form): Form<AnalyzeForm>,
) -> Result<Redirect, AppError> {
    let table = state
        .session
        .read()
        .await
        .table
        .clone()
        .ok_or(AppError::NoTable)?;
    if table.column_index(&form.column).is_none() {
        return Err(SentimentError::UnknownColumn(form.column).into());
    }

    let guard = state.run.try_start(table.len()).ok_or(AppError::Busy)?;
    let scorer = state.scorer.clone();
    let column = form.column;

    let (labeled, guard) = tokio::task::spawn_blocking(move || {
        let labeled = label_all(&table, &column, scorer.as_ref(), |p| guard.record(p));
        (labeled, guard)
    })
    .await?;
    let results = labeled?;

    let mut session = state.session.write().await;
    session.results = Some(results);
    session.notice = Some("Analysis complete!".to_string());
    drop(guard);

    Ok(Redirect::to("/"))
}

pub async fn progress(State(state): State<AppState>) -> Json<ProgressReport> {
    Json(state.progress())
}

pub async fn download(State(state): State<AppState>) -> Result<Response, AppError> {
    let session = state.session.read().await;
    let results = session.results.as_ref().ok_or(AppError::NoResults)?;
    let body = results.to_csv_bytes()?;

    let disposition = format!("attachment; filename=\"{DOWNLOAD_FILENAME}\"");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
