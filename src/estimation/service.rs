//! The estimation pipeline for a single product.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Serialize;

use super::{
    EstimationRequest, EstimationResult, EstimationTarget, MetricKind, RetryPolicy,
    RetryingClient, build_prompt, parse_response,
};
use crate::calc::{self, LtvCacRatio};
use crate::config::EstimationConfig;
use crate::error::EstimationError;
use crate::llm::LlmProvider;

/// Runs prompt → provider → parser for estimation requests.
///
/// Cheap to clone; holds no per-request state.
#[derive(Clone)]
pub struct MetricEstimator {
    client: RetryingClient,
    item_timeout: Duration,
}

impl MetricEstimator {
    pub fn new(provider: Arc<dyn LlmProvider>, config: &EstimationConfig) -> Self {
        Self::with_client(
            RetryingClient::new(provider, RetryPolicy::from(config)),
            config.item_timeout,
        )
    }

    pub fn with_client(client: RetryingClient, item_timeout: Duration) -> Self {
        Self {
            client,
            item_timeout,
        }
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    /// Estimate the fields for one validated request.
    ///
    /// The whole pipeline, retries included, is bounded by the item timeout.
    pub async fn estimate(
        &self,
        request: &EstimationRequest,
    ) -> Result<EstimationResult, EstimationError> {
        let target = request.target();
        let product = request.product_name();
        tracing::info!(product, %target, "Estimation started");

        let prompt = build_prompt(target, product);
        let pipeline = async {
            let raw = self.client.estimate(&prompt).await?;
            parse_response(&raw, target.expected_fields())
        };

        let result = tokio::time::timeout(self.item_timeout, pipeline)
            .await
            .unwrap_or(Err(EstimationError::Timeout(self.item_timeout)));

        match &result {
            Ok(fields) => tracing::info!(product, %target, ?fields, "Estimation completed"),
            Err(e) => tracing::warn!(product, %target, error = %e, "Estimation failed"),
        }
        result
    }

    /// Estimate commerce figures (price, profit per unit, ad cost, conversions).
    pub async fn estimate_product(
        &self,
        product_name: &str,
    ) -> Result<EstimationResult, EstimationError> {
        let request = EstimationRequest::new(product_name, EstimationTarget::Product)?;
        self.estimate(&request).await
    }

    /// Estimate the inputs of one business metric.
    pub async fn estimate_metric(
        &self,
        product_name: &str,
        kind: MetricKind,
    ) -> Result<EstimationResult, EstimationError> {
        let request = EstimationRequest::new(product_name, kind)?;
        self.estimate(&request).await
    }

    /// Estimate LTV and CAC for one product and derive their ratio.
    ///
    /// Both estimations run concurrently; either failing fails the whole call.
    pub async fn estimate_ltv_cac(
        &self,
        product_name: &str,
    ) -> Result<LtvCacEstimate, EstimationError> {
        let ltv_request = EstimationRequest::new(product_name, MetricKind::Ltv)?;
        let cac_request = EstimationRequest::new(product_name, MetricKind::Cac)?;

        let (ltv_fields, cac_fields) =
            tokio::try_join!(self.estimate(&ltv_request), self.estimate(&cac_request))?;

        let ltv = match ltv_fields.ltv_input().map(|input| calc::ltv(&input)) {
            Some(Ok(ltv)) => calc::round_half_up(ltv, 0),
            Some(Err(e)) => {
                tracing::warn!(product_name, error = %e, "Estimated LTV inputs are unusable");
                Decimal::ZERO
            }
            None => Decimal::ZERO,
        };
        let cac = cac_fields.cac().unwrap_or_default();

        let ratio = match calc::ltv_cac_ratio(ltv, cac) {
            Ok(ratio) => Some(ratio),
            Err(e) => {
                tracing::warn!(product_name, error = %e, "Estimated LTV/CAC cannot form a ratio");
                None
            }
        };

        Ok(LtvCacEstimate {
            ltv_fields,
            cac_fields,
            ltv,
            cac,
            ratio,
        })
    }
}

/// Combined LTV and CAC estimation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LtvCacEstimate {
    pub ltv_fields: EstimationResult,
    pub cac_fields: EstimationResult,
    /// Order value × purchase frequency, rounded.
    pub ltv: Decimal,
    pub cac: Decimal,
    /// `None` when the estimates violate the ratio's preconditions.
    pub ratio: Option<LtvCacRatio>,
}
