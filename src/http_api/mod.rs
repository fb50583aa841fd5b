use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::date::parse_canonical_date;
use crate::ingest::{self, IngestConfig, IngestError, IngestReport, Ingestor};
use crate::sanitize::normalize_record;
use crate::store::{ScheduleBackend, StoreError};
use crate::views::{self, ClassEntry, ClassFilter, RetryPolicy, ScheduleListing};
use crate::{ScheduleRow, Section, Year};

#[derive(Clone)]
pub struct AppState {
    backend: Arc<dyn ScheduleBackend>,
    ingest: IngestConfig,
    retry: RetryPolicy,
}

impl AppState {
    pub fn new(backend: Arc<dyn ScheduleBackend>) -> Self {
        Self {
            backend,
            ingest: IngestConfig::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_ingest_config(mut self, config: IngestConfig) -> Self {
        self.ingest = config;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    fn backend(&self) -> Arc<dyn ScheduleBackend> {
        self.backend.clone()
    }

    async fn load_rows(&self) -> Result<Vec<ScheduleRow>, ApiError> {
        Ok(views::fetch_with_retry(self.backend.as_ref(), &self.retry).await?)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Invalid(String),
    Internal(String),
}

impl ApiError {
    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid(message.into())
    }
}

impl From<StoreError> for ApiError {
    fn from(value: StoreError) -> Self {
        ApiError::Internal(value.to_string())
    }
}

impl From<IngestError> for ApiError {
    fn from(value: IngestError) -> Self {
        match value {
            IngestError::DeleteRange(err) => ApiError::Internal(err.to_string()),
            other => ApiError::Invalid(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(message) => {
                let body = Json(ErrorBody {
                    error: "not_found",
                    message,
                });
                (StatusCode::NOT_FOUND, body).into_response()
            }
            ApiError::Invalid(message) => {
                let body = Json(ErrorBody {
                    error: "invalid_request",
                    message,
                });
                (StatusCode::BAD_REQUEST, body).into_response()
            }
            ApiError::Internal(message) => {
                tracing::error!(%message, "request failed");
                let body = Json(ErrorBody {
                    error: "internal_error",
                    message,
                });
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/curriculum", get(list_curriculum))
        .route("/api/available-dates", get(available_dates))
        .route("/api/delete-range", post(delete_range))
        .route("/api/upload", post(upload_records))
        .route("/api/import", post(import_file))
        .route("/api/analyze-csv", post(analyze_csv))
        .route("/api/schedule/class", get(class_schedule))
        .route("/api/schedule/daily", get(daily_schedule))
        .route("/api/schedule/instructor", get(instructor_schedule))
        .route("/api/instructors", get(list_instructors))
        .fallback(not_found)
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, backend: Arc<dyn ScheduleBackend>) -> std::io::Result<()> {
    let state = AppState::new(backend);
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("no route for {}", uri.path()))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn list_curriculum(State(state): State<AppState>) -> Result<Json<ScheduleListing>, ApiError> {
    let rows = state.load_rows().await?;
    Ok(Json(ScheduleListing::new(rows)))
}

async fn available_dates(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let dates = state.backend().available_dates().await?;
    Ok(Json(json!({ "count": dates.len(), "dates": dates })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteRangePayload {
    min_date: Option<String>,
    max_date: Option<String>,
}

async fn delete_range(
    State(state): State<AppState>,
    Json(payload): Json<DeleteRangePayload>,
) -> Result<Json<Value>, ApiError> {
    let (Some(min), Some(max)) = (payload.min_date, payload.max_date) else {
        return Err(ApiError::invalid("minDate and maxDate are required"));
    };
    for date in [&min, &max] {
        if parse_canonical_date(date).is_none() {
            return Err(ApiError::invalid(format!("'{date}' is not a YYYY-MM-DD date")));
        }
    }
    let deleted = state.backend().delete_range(&min, &max).await?;
    tracing::info!(%min, %max, deleted, "deleted date range");
    Ok(Json(json!({
        "message": format!("deleted rows from {min} to {max}"),
        "deletedCount": deleted,
    })))
}

/// Accepts a JSON array of records keyed by raw or canonical headers.
async fn upload_records(
    State(state): State<AppState>,
    Json(payload): Json<Vec<Value>>,
) -> Result<Json<Value>, ApiError> {
    if payload.is_empty() {
        return Err(ApiError::invalid("expected a non-empty array of records"));
    }
    let mut records = Vec::with_capacity(payload.len());
    for (idx, item) in payload.into_iter().enumerate() {
        let Value::Object(object) = item else {
            return Err(ApiError::invalid(format!("record {} is not an object", idx + 1)));
        };
        let cells: Vec<(String, String)> = object
            .into_iter()
            .map(|(key, value)| {
                let text = match value {
                    Value::Null => String::new(),
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, text)
            })
            .collect();
        let record = normalize_record(cells.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        records.push((idx + 1, record));
    }
    let batch = ingest::rows_from_records(records)?;
    let count = state.backend().insert_rows(&batch.rows).await?;
    tracing::info!(count, skipped = batch.skipped_blank_rows, "inserted uploaded records");
    Ok(Json(json!({ "message": "rows inserted", "count": count })))
}

async fn import_file(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ImportResponse>, ApiError> {
    let ingestor = Ingestor::new(state.backend(), state.ingest.clone());
    tracing::info!(bytes = body.len(), "importing schedule file");
    let report = ingestor.import_bytes(&body).await?;
    Ok(Json(ImportResponse {
        status: report.status(),
        message: report.summary(),
        report,
    }))
}

#[derive(Debug, Serialize)]
struct ImportResponse {
    status: crate::IngestStatus,
    message: String,
    report: IngestReport,
}

async fn analyze_csv(body: Bytes) -> Result<Json<Value>, ApiError> {
    let analysis = ingest::analyze_bytes(&body)?;
    let mut value = serde_json::to_value(analysis).map_err(|err| ApiError::Internal(err.to_string()))?;
    if let Value::Object(map) = &mut value {
        map.insert("success".to_string(), Value::Bool(true));
    }
    Ok(Json(value))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClassQuery {
    year: u8,
    class: String,
    #[serde(default)]
    exams_only: bool,
}

async fn class_schedule(
    State(state): State<AppState>,
    Query(query): Query<ClassQuery>,
) -> Result<Json<Vec<ClassEntry>>, ApiError> {
    let year = Year::from_number(query.year)
        .ok_or_else(|| ApiError::invalid(format!("unknown year {}", query.year)))?;
    let section = query
        .class
        .chars()
        .next()
        .and_then(Section::from_letter)
        .filter(|_| query.class.chars().count() == 1)
        .ok_or_else(|| ApiError::invalid(format!("unknown class '{}'", query.class)))?;
    let rows = state.load_rows().await?;
    Ok(Json(views::class_schedule(
        &rows,
        ClassFilter::new(year, section),
        query.exams_only,
    )))
}

#[derive(Debug, Deserialize)]
struct DailyQuery {
    date: String,
}

async fn daily_schedule(
    State(state): State<AppState>,
    Query(query): Query<DailyQuery>,
) -> Result<Json<Vec<ScheduleRow>>, ApiError> {
    let date = parse_canonical_date(&query.date)
        .ok_or_else(|| ApiError::invalid(format!("'{}' is not a YYYY-MM-DD date", query.date)))?
        .format("%Y-%m-%d")
        .to_string();
    let rows = state.load_rows().await?;
    let day = views::daily_schedule(&rows, &date)
        .into_iter()
        .cloned()
        .collect();
    Ok(Json(day))
}

async fn list_instructors(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    let rows = state.load_rows().await?;
    Ok(Json(views::instructors(&rows)))
}

#[derive(Debug, Deserialize)]
struct InstructorQuery {
    name: String,
}

async fn instructor_schedule(
    State(state): State<AppState>,
    Query(query): Query<InstructorQuery>,
) -> Result<Json<Vec<ClassEntry>>, ApiError> {
    let rows = state.load_rows().await?;
    Ok(Json(views::instructor_schedule(&rows, query.name.trim())))
}
