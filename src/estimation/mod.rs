//! LLM-assisted estimation of calculator inputs.
//!
//! One pipeline serves every calculator:
//! - [`build_prompt`] renders a fixed template for the estimation target
//! - [`RetryingClient`] sends it, retrying while the provider throttles
//! - [`parse_response`] pulls a validated, rounded field map out of the reply
//!
//! [`MetricEstimator`] glues these together for single products and for
//! concurrent batches.

mod batch;
mod parser;
mod prompt;
mod retry;
mod service;

pub use batch::{BatchItem, BatchOutcome, BatchReport, split_product_names};
pub use parser::{parse_response, strip_code_fence};
pub use prompt::build_prompt;
pub use retry::{RetryPolicy, RetryingClient, is_throttling, retry_delay};
pub use service::{LtvCacEstimate, MetricEstimator};

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calc::{AdPerformanceInput, BreakEvenInput, LtvInput, TargetCpaInput};
use crate::error::EstimationError;

/// Business metric whose inputs the model is asked to estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetricKind {
    Cpa,
    Ltv,
    Cac,
    BreakEven,
}

impl MetricKind {
    pub const ALL: [MetricKind; 4] = [Self::Cpa, Self::Ltv, Self::Cac, Self::BreakEven];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cpa => "cpa",
            Self::Ltv => "ltv",
            Self::Cac => "cac",
            Self::BreakEven => "break-even",
        }
    }

    /// Fields the model must return for this metric.
    pub fn expected_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Cpa => &["sellingPrice", "cost"],
            Self::Ltv => &["orderValue", "purchaseFrequency"],
            Self::Cac => &["cac"],
            Self::BreakEven => &["fixedCost", "variableCost", "sellingPrice"],
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = EstimationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.trim())
            .ok_or_else(|| {
                EstimationError::InvalidInput(format!(
                    "unknown metric kind '{}' (expected one of: cpa, ltv, cac, break-even)",
                    s
                ))
            })
    }
}

/// What a single estimation call produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EstimationTarget {
    /// Commerce figures for the ad-performance calculator.
    Product,
    Metric(MetricKind),
}

impl EstimationTarget {
    pub fn expected_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Product => &["price", "profitPerUnit", "adCost", "conversions"],
            Self::Metric(kind) => kind.expected_fields(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Metric(kind) => kind.as_str(),
        }
    }
}

impl fmt::Display for EstimationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<MetricKind> for EstimationTarget {
    fn from(kind: MetricKind) -> Self {
        Self::Metric(kind)
    }
}

impl FromStr for EstimationTarget {
    type Err = EstimationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim() == "product" {
            return Ok(Self::Product);
        }
        s.parse::<MetricKind>().map(Self::Metric)
    }
}

/// A validated estimation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EstimationRequest {
    product_name: String,
    target: EstimationTarget,
}

impl EstimationRequest {
    /// Trims the product name and rejects it if nothing is left.
    pub fn new(
        product_name: impl AsRef<str>,
        target: impl Into<EstimationTarget>,
    ) -> Result<Self, EstimationError> {
        let product_name = product_name.as_ref().trim();
        if product_name.is_empty() {
            return Err(EstimationError::InvalidInput(
                "product name is required".to_string(),
            ));
        }
        Ok(Self {
            product_name: product_name.to_string(),
            target: target.into(),
        })
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn target(&self) -> EstimationTarget {
        self.target
    }
}

/// Rounded, non-negative integer fields returned by the model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EstimationResult {
    fields: BTreeMap<&'static str, i64>,
}

impl EstimationResult {
    pub(crate) fn insert(&mut self, field: &'static str, value: i64) {
        self.fields.insert(field, value);
    }

    pub fn get(&self, field: &str) -> Option<i64> {
        self.fields.get(field).copied()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, i64)> + '_ {
        self.fields.iter().map(|(k, v)| (*k, *v))
    }

    fn decimal(&self, field: &str) -> Option<Decimal> {
        self.get(field).map(Decimal::from)
    }

    pub fn target_cpa_input(&self) -> Option<TargetCpaInput> {
        Some(TargetCpaInput {
            selling_price: self.decimal("sellingPrice")?,
            cost: self.decimal("cost")?,
        })
    }

    pub fn ltv_input(&self) -> Option<LtvInput> {
        Some(LtvInput {
            order_value: self.decimal("orderValue")?,
            purchase_frequency: self.decimal("purchaseFrequency")?,
        })
    }

    pub fn cac(&self) -> Option<Decimal> {
        self.decimal("cac")
    }

    pub fn break_even_input(&self) -> Option<BreakEvenInput> {
        Some(BreakEvenInput {
            fixed_cost: self.decimal("fixedCost")?,
            variable_cost: self.decimal("variableCost")?,
            selling_price: self.decimal("sellingPrice")?,
        })
    }

    pub fn ad_performance_input(&self) -> Option<AdPerformanceInput> {
        Some(AdPerformanceInput {
            price: self.decimal("price")?,
            profit_per_unit: self.decimal("profitPerUnit")?,
            ad_cost: self.decimal("adCost")?,
            conversions: self.decimal("conversions")?,
        })
    }
}
