//! HTTP JSON API consumed by the dashboard frontend.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use consumption_client::domain::{ClientRecord, ConsumptionEvent};
use serde::{Deserialize, Serialize};
use time::Date;
use tower_http::cors::{Any, CorsLayer};

use crate::{
    config::AnalysisConfig,
    pipeline::{parse_day, AnalysisPipeline, AnalysisReport, AnalysisRequest, PipelineError},
    store::StoreError,
};

pub const RECENT_EVENTS_LIMIT: i64 = 100;

#[derive(Clone)]
pub struct ApiState {
    pipeline: AnalysisPipeline,
    default_start: Date,
    default_end: Date,
}

impl ApiState {
    pub fn new(pipeline: AnalysisPipeline, cfg: &AnalysisConfig) -> Result<Self, PipelineError> {
        Ok(Self {
            pipeline,
            default_start: parse_day(&cfg.default_start_date)?,
            default_end: parse_day(&cfg.default_end_date)?,
        })
    }
}

pub fn router(state: ApiState) -> Router {
    let api = Router::new()
        .route("/analyze", get(analyze))
        .route("/neighborhoods", get(neighborhoods))
        .route("/address-detail/:owner_id", get(address_detail))
        .route("/health", get(health));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new().nest("/api", api).layer(cors).with_state(state)
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Pipeline(PipelineError::InvalidRequest(_)) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = ErrorBody {
            success: false,
            error: self.to_string(),
            detail: format!("{self:?}"),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeParams {
    start_date: Option<String>,
    end_date: Option<String>,
    neighborhood: Option<String>,
}

async fn analyze(
    State(state): State<ApiState>,
    Query(params): Query<AnalyzeParams>,
) -> Result<Json<AnalysisReport>, ApiError> {
    let start = match params.start_date.as_deref() {
        Some(s) => parse_day(s)?,
        None => state.default_start,
    };
    let end = match params.end_date.as_deref() {
        Some(s) => parse_day(s)?,
        None => state.default_end,
    };
    let request = AnalysisRequest::new(start, end, params.neighborhood)?;

    let report = state.pipeline.run(&request).await?;
    Ok(Json(report))
}

#[derive(Debug, Serialize)]
struct NeighborhoodsResponse {
    success: bool,
    neighborhoods: Vec<String>,
}

async fn neighborhoods(State(state): State<ApiState>) -> Result<Json<NeighborhoodsResponse>, ApiError> {
    let neighborhoods = state.pipeline.store().neighborhoods().await?;
    Ok(Json(NeighborhoodsResponse {
        success: true,
        neighborhoods,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddressDetailResponse {
    success: bool,
    client: Option<ClientRecord>,
    recent_events: Vec<ConsumptionEvent>,
}

async fn address_detail(
    State(state): State<ApiState>,
    Path(owner_id): Path<String>,
) -> Result<Json<AddressDetailResponse>, ApiError> {
    let store = state.pipeline.store();
    let (client, recent_events) = tokio::try_join!(
        store.client(&owner_id),
        store.recent_events(&owner_id, RECENT_EVENTS_LIMIT)
    )?;

    Ok(Json(AddressDetailResponse {
        success: true,
        client,
        recent_events,
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "success": true, "status": "ok" }))
}
