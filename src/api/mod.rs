//! HTTP API for the estimation service.
//!
//! Every endpoint validates its input before touching the provider, and
//! answers with `503` plus a remediation hint when no API key is configured.

mod server;
pub mod types;

pub use server::{ApiServer, ApiServerConfig};

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::config::DeploymentConfig;
use crate::error::EstimationError;
use crate::estimation::{
    BatchReport, EstimationResult, EstimationTarget, MetricEstimator, MetricKind,
};
use types::{
    BatchResponse, ErrorResponse, EstimateBatchRequest, EstimateMetricRequest,
    EstimateProductRequest, HealthResponse, SuccessResponse,
};

/// Maximum JSON body size (16 KB).
const MAX_BODY_BYTES: usize = 16 * 1024;

/// Shared handler state.
pub struct AppState {
    /// `None` when no API key is configured.
    estimator: Option<MetricEstimator>,
    deployment: DeploymentConfig,
}

impl AppState {
    pub fn new(estimator: Option<MetricEstimator>, deployment: DeploymentConfig) -> Self {
        Self {
            estimator,
            deployment,
        }
    }

    fn estimator(&self) -> Result<&MetricEstimator, EstimationError> {
        self.estimator
            .as_ref()
            .ok_or_else(|| EstimationError::ConfigurationMissing {
                hint: self.deployment.missing_key_hint().to_string(),
            })
    }

    fn fail(&self, error: EstimationError) -> ApiError {
        ApiError::new(error, self.deployment.development)
    }
}

/// Build the API router with state applied.
pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/estimate-product", post(estimate_product_handler))
        .route(
            "/api/estimate-business-metrics",
            post(estimate_metric_handler),
        )
        .route("/api/estimate-batch", post(estimate_batch_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// An estimation failure rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    error: EstimationError,
    development: bool,
}

impl ApiError {
    fn new(error: EstimationError, development: bool) -> Self {
        Self { error, development }
    }

    fn status(&self) -> StatusCode {
        match &self.error {
            EstimationError::InvalidInput(_) | EstimationError::NoInput => StatusCode::BAD_REQUEST,
            EstimationError::ConfigurationMissing { .. } => StatusCode::SERVICE_UNAVAILABLE,
            EstimationError::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            EstimationError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            EstimationError::MalformedResponse { .. }
            | EstimationError::InvalidResponseShape { .. }
            | EstimationError::TransportFailure(_)
            | EstimationError::EstimationFailed { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    fn body(&self) -> ErrorResponse {
        let (error, details, hint) = match &self.error {
            EstimationError::InvalidInput(_) | EstimationError::NoInput => {
                ("Invalid request", Some(self.error.to_string()), None)
            }
            EstimationError::ConfigurationMissing { hint } => {
                ("API key is not configured", None, Some(hint.clone()))
            }
            _ => (
                "Estimation failed",
                Some(self.error.to_string()),
                self.error
                    .is_retryable_later()
                    .then(|| "Wait a moment and try again.".to_string()),
            ),
        };

        ErrorResponse {
            error: error.to_string(),
            details,
            hint,
            debug: self.development.then(|| format!("{:?}", self.error)),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        model: state
            .estimator
            .as_ref()
            .map(|estimator| estimator.model_name().to_string()),
    })
}

fn require_product_name(name: Option<String>) -> Result<String, EstimationError> {
    name.filter(|n| !n.trim().is_empty())
        .ok_or_else(|| EstimationError::InvalidInput("product name is required".to_string()))
}

fn parse_metric_kind(kind: Option<String>) -> Result<MetricKind, EstimationError> {
    kind.ok_or_else(|| {
        EstimationError::InvalidInput(
            "metric kind is required (cpa, ltv, cac, break-even)".to_string(),
        )
    })?
    .parse()
}

fn bad_body(rejection: JsonRejection) -> EstimationError {
    EstimationError::InvalidInput(rejection.body_text())
}

async fn estimate_product_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<EstimateProductRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse<EstimationResult>>, ApiError> {
    estimate_product(&state, body)
        .await
        .map(|data| Json(SuccessResponse::new(data)))
        .map_err(|e| state.fail(e))
}

async fn estimate_product(
    state: &AppState,
    body: Result<Json<EstimateProductRequest>, JsonRejection>,
) -> Result<EstimationResult, EstimationError> {
    let Json(req) = body.map_err(bad_body)?;
    let product_name = require_product_name(req.product_name)?;
    state.estimator()?.estimate_product(&product_name).await
}

async fn estimate_metric_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<EstimateMetricRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse<EstimationResult>>, ApiError> {
    estimate_metric(&state, body)
        .await
        .map(|data| Json(SuccessResponse::new(data)))
        .map_err(|e| state.fail(e))
}

async fn estimate_metric(
    state: &AppState,
    body: Result<Json<EstimateMetricRequest>, JsonRejection>,
) -> Result<EstimationResult, EstimationError> {
    let Json(req) = body.map_err(bad_body)?;
    let product_name = require_product_name(req.product_name)?;
    let kind = parse_metric_kind(req.metric_kind)?;
    state
        .estimator()?
        .estimate_metric(&product_name, kind)
        .await
}

async fn estimate_batch_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<EstimateBatchRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse<BatchResponse>>, ApiError> {
    estimate_batch(&state, body)
        .await
        .map(|report| Json(SuccessResponse::new(BatchResponse::from(report))))
        .map_err(|e| state.fail(e))
}

async fn estimate_batch(
    state: &AppState,
    body: Result<Json<EstimateBatchRequest>, JsonRejection>,
) -> Result<BatchReport, EstimationError> {
    let Json(req) = body.map_err(bad_body)?;
    let names = req
        .product_names
        .map(|names| names.into_vec())
        .unwrap_or_default();
    let target = match req.metric_kind {
        Some(kind) => EstimationTarget::Metric(kind.parse()?),
        None => EstimationTarget::Product,
    };
    if names.iter().all(|n| n.trim().is_empty()) {
        return Err(EstimationError::NoInput);
    }
    state.estimator()?.estimate_batch(&names, target).await
}
