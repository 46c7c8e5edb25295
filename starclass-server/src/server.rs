//! HTTP routes for single-record and batch prediction.

use crate::args::ServerArgs;
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use starclass::batch::{run_batch, BatchReport, RESULTS_FILE_NAME};
use starclass::encoding::OovPolicy;
use starclass::error::{BatchError, MalformedRecord, PredictionError, SchemaMismatch};
use starclass::pipeline::{CategoryFallback, PredictionPipeline};
use starclass::record::RawStarRecord;
use starclass::star_type::StarType;
use tracing::{debug, error, info, warn};

pub const ROWS_TOTAL_HEADER: &str = "x-rows-total";
pub const ROWS_FAILED_HEADER: &str = "x-rows-failed";
pub const ROWS_FALLBACK_HEADER: &str = "x-rows-fallback";

/// Shared request state. Cloned per request; the artifacts behind the
/// pipeline are shared.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: PredictionPipeline,
}

/// Request failures and the status code each maps to.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Prediction(#[from] PredictionError),

    #[error(transparent)]
    SchemaMismatch(#[from] SchemaMismatch),

    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("unreadable CSV upload: {0}")]
    Unreadable(String),

    #[error("batch worker failed: {0}")]
    Worker(String),
}

impl From<MalformedRecord> for ApiError {
    fn from(err: MalformedRecord) -> Self {
        ApiError::Prediction(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody(rejection.body_text())
    }
}

impl From<BatchError> for ApiError {
    fn from(err: BatchError) -> Self {
        match err {
            BatchError::SchemaMismatch(mismatch) => ApiError::SchemaMismatch(mismatch),
            other => ApiError::Unreadable(other.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    missing: Vec<&'static str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, missing) = match &self {
            ApiError::Prediction(_) | ApiError::InvalidBody(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, Vec::new())
            }
            ApiError::SchemaMismatch(mismatch) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                mismatch.missing.iter().map(|f| f.column()).collect(),
            ),
            ApiError::Unreadable(_) => (StatusCode::BAD_REQUEST, Vec::new()),
            ApiError::Worker(_) => (StatusCode::INTERNAL_SERVER_ERROR, Vec::new()),
        };
        let body = ErrorBody {
            error: self.to_string(),
            missing,
        };
        (status, Json(body)).into_response()
    }
}

/// Body of a successful single prediction.
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub star_type: StarType,
    pub code: usize,
    pub fallbacks: Vec<CategoryFallback>,
}

/// Known categories and labels, for populating input selectors.
#[derive(Debug, Serialize)]
pub struct VocabularyResponse {
    pub colors: Vec<String>,
    pub spectral_classes: Vec<String>,
    pub star_types: Vec<&'static str>,
    pub oov_policy: OovPolicy,
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn vocabulary(State(state): State<AppState>) -> Json<VocabularyResponse> {
    let artifacts = state.pipeline.artifacts();
    Json(VocabularyResponse {
        colors: artifacts.color_encoder().classes().to_vec(),
        spectral_classes: artifacts.spectral_encoder().classes().to_vec(),
        star_types: StarType::ALL.iter().map(|t| t.name()).collect(),
        oov_policy: state.pipeline.policy(),
    })
}

async fn predict(
    State(state): State<AppState>,
    body: Result<Json<RawStarRecord>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let Json(raw) = body.map_err(|rejection| {
        debug!("Rejected prediction body: {}", rejection.body_text());
        rejection
    })?;
    let record = raw.into_record()?;
    let prediction = state.pipeline.predict_one(&record).map_err(|e| {
        debug!("Rejected prediction request: {}", e);
        e
    })?;

    for fallback in &prediction.fallbacks {
        warn!(
            "Unknown {} {:?} replaced by {:?}",
            fallback.field, fallback.observed, fallback.substituted
        );
    }

    Ok(Json(PredictResponse {
        star_type: prediction.star_type,
        code: prediction.star_type.code(),
        fallbacks: prediction.fallbacks,
    }))
}

async fn predict_batch(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    if body.is_empty() {
        return Err(ApiError::Unreadable("request body is empty".to_string()));
    }

    let pipeline = state.pipeline.clone();
    let (report, csv) = tokio::task::spawn_blocking(move || {
        let mut output = Vec::new();
        run_batch(&pipeline, &body[..], &mut output).map(|report| (report, output))
    })
    .await
    .map_err(|e| {
        error!("Batch task panicked or was cancelled: {}", e);
        ApiError::Worker(e.to_string())
    })??;

    info!(
        "Served batch of {} rows ({} failed)",
        report.total_rows,
        report.failed()
    );
    Ok(csv_attachment(&report, csv))
}

fn csv_attachment(report: &BatchReport, csv: Vec<u8>) -> Response {
    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{RESULTS_FILE_NAME}\""),
        ),
        (
            HeaderName::from_static(ROWS_TOTAL_HEADER),
            report.total_rows.to_string(),
        ),
        (
            HeaderName::from_static(ROWS_FAILED_HEADER),
            report.failed().to_string(),
        ),
        (
            HeaderName::from_static(ROWS_FALLBACK_HEADER),
            report.fallback_rows.to_string(),
        ),
    ];
    (StatusCode::OK, headers, csv).into_response()
}

/// Build the application router.
pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/vocabulary", get(vocabulary))
        .route("/api/predict", post(predict))
        .route("/api/predict/batch", post(predict_batch))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

/// Serve until the process is stopped.
pub async fn run_server(pipeline: PredictionPipeline, args: ServerArgs) -> anyhow::Result<()> {
    let app = build_router(AppState { pipeline }, args.max_upload_bytes);
    let addr = args.socket_addr();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Star type prediction service listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use starclass::record::Field;

    #[test]
    fn test_error_status_codes() {
        let unknown: ApiError = PredictionError::UnknownCategory {
            field: Field::Color,
            value: "Ultraviolet".to_string(),
        }
        .into();
        assert_eq!(
            unknown.into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );

        let malformed: ApiError = MalformedRecord::MissingField(Field::Radius).into();
        assert_eq!(
            malformed.into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );

        let mismatch: ApiError = BatchError::from(SchemaMismatch {
            missing: vec![Field::Radius],
        })
        .into();
        assert!(matches!(mismatch, ApiError::SchemaMismatch(_)));
        assert_eq!(
            mismatch.into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );

        let io: ApiError = BatchError::Io(std::io::Error::other("truncated")).into();
        assert_eq!(io.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
