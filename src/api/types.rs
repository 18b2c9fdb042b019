//! Request and response DTOs for the estimation API.

use serde::{Deserialize, Serialize};

use crate::estimation::{BatchItem, BatchReport, split_product_names};

// --- Requests ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateProductRequest {
    #[serde(default)]
    pub product_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateMetricRequest {
    #[serde(default)]
    pub product_name: Option<String>,
    /// One of cpa, ltv, cac, break-even.
    #[serde(default, alias = "metricType")]
    pub metric_kind: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateBatchRequest {
    #[serde(default)]
    pub product_names: Option<ProductNames>,
    /// Omitted for product figures.
    #[serde(default, alias = "metricType")]
    pub metric_kind: Option<String>,
}

/// Product names as a list or as one comma-separated string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ProductNames {
    List(Vec<String>),
    Text(String),
}

impl ProductNames {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::List(names) => names,
            Self::Text(text) => split_product_names(&text),
        }
    }
}

// --- Responses ---

#[derive(Debug, Serialize)]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Internal detail, development deployments only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub items: Vec<BatchItem>,
    pub success_count: usize,
    pub failed_products: Vec<String>,
    pub summary: String,
}

impl From<BatchReport> for BatchResponse {
    fn from(report: BatchReport) -> Self {
        let success_count = report.success_count();
        let failed_products = report
            .failed_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let summary = report.summary();
        Self {
            items: report.items,
            success_count,
            failed_products,
            summary,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}
