//! Concurrent, settle-all estimation over many product names.

use serde::Serialize;

use super::{EstimationRequest, EstimationResult, EstimationTarget, MetricEstimator};
use crate::error::EstimationError;

/// Split a comma-separated list of product names, trimming each entry and
/// dropping empty ones.
pub fn split_product_names(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Outcome of one product's pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    Success { data: EstimationResult },
    Failure { reason: String },
}

/// One input position of a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    pub product_name: String,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

impl BatchItem {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, BatchOutcome::Success { .. })
    }
}

/// Results of a batch, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub items: Vec<BatchItem>,
}

impl BatchReport {
    pub fn success_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_success()).count()
    }

    pub fn failed_names(&self) -> Vec<&str> {
        self.items
            .iter()
            .filter(|item| !item.is_success())
            .map(|item| item.product_name.as_str())
            .collect()
    }

    /// One-line summary naming the products that failed.
    pub fn summary(&self) -> String {
        let failed = self.failed_names();
        if failed.is_empty() {
            format!("All {} products estimated", self.items.len())
        } else {
            format!(
                "{} succeeded, {} failed: {}",
                self.success_count(),
                failed.len(),
                failed.join(", ")
            )
        }
    }
}

impl MetricEstimator {
    /// Estimate `target` for every product name concurrently.
    ///
    /// Names are trimmed and empty entries dropped; if none remain the call
    /// fails with `NoInput` before any request is sent. Every pipeline runs to
    /// completion, and a failure only marks its own item. Duplicate names are
    /// estimated independently.
    pub async fn estimate_batch<S: AsRef<str>>(
        &self,
        product_names: &[S],
        target: EstimationTarget,
    ) -> Result<BatchReport, EstimationError> {
        let names: Vec<String> = product_names
            .iter()
            .map(|name| name.as_ref().trim())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();

        if names.is_empty() {
            return Err(EstimationError::NoInput);
        }

        tracing::info!(count = names.len(), %target, "Batch estimation started");

        let pipelines = names.iter().map(|name| async move {
            let request = EstimationRequest::new(name, target)?;
            self.estimate(&request).await
        });
        let outcomes = futures::future::join_all(pipelines).await;

        let items: Vec<BatchItem> = names
            .into_iter()
            .zip(outcomes)
            .map(|(product_name, outcome)| BatchItem {
                product_name,
                outcome: match outcome {
                    Ok(data) => BatchOutcome::Success { data },
                    Err(e) => BatchOutcome::Failure {
                        reason: e.to_string(),
                    },
                },
            })
            .collect();

        let report = BatchReport { items };
        tracing::info!(
            succeeded = report.success_count(),
            failed = ?report.failed_names(),
            "Batch estimation completed"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::estimation::{MetricKind, RetryingClient};
    use crate::test_support::{ScriptedProvider, fast_policy};
    use pretty_assertions::assert_eq;

    fn estimator(provider: Arc<ScriptedProvider>) -> MetricEstimator {
        MetricEstimator::with_client(
            RetryingClient::new(provider, fast_policy()),
            Duration::from_secs(5),
        )
    }

    /// Replies with malformed text for any prompt naming "broken".
    fn cac_provider() -> Arc<ScriptedProvider> {
        ScriptedProvider::new(|_, prompt| {
            if prompt.contains("Product name: broken") {
                Ok("I think the CAC is about 1000 won".to_string())
            } else {
                Ok("{\"cac\": 1000}".to_string())
            }
        })
    }

    #[test]
    fn test_split_product_names() {
        assert_eq!(
            split_product_names(" mug, , tea kettle ,,  "),
            vec!["mug".to_string(), "tea kettle".to_string()]
        );
        assert!(split_product_names(" , ").is_empty());
    }

    #[tokio::test]
    async fn test_one_failure_does_not_sink_batch() {
        let estimator = estimator(cac_provider());

        let report = estimator
            .estimate_batch(&["mug", "broken", "kettle"], MetricKind::Cac.into())
            .await
            .unwrap();

        assert_eq!(report.items.len(), 3);
        assert_eq!(report.success_count(), 2);
        assert_eq!(report.failed_names(), vec!["broken"]);
        assert_eq!(
            report
                .items
                .iter()
                .map(|i| i.product_name.as_str())
                .collect::<Vec<_>>(),
            vec!["mug", "broken", "kettle"]
        );
        assert!(matches!(
            &report.items[1].outcome,
            BatchOutcome::Failure { reason } if reason.contains("Failed to parse JSON")
        ));
    }

    #[tokio::test]
    async fn test_failure_position_is_irrelevant() {
        let estimator = estimator(cac_provider());

        for names in [
            ["broken", "mug", "kettle"],
            ["mug", "kettle", "broken"],
        ] {
            let report = estimator
                .estimate_batch(&names, MetricKind::Cac.into())
                .await
                .unwrap();
            assert_eq!(report.items.len(), 3);
            assert_eq!(report.success_count(), 2);
        }
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_calls() {
        let provider = cac_provider();
        let estimator = estimator(provider.clone());

        let err = estimator
            .estimate_batch(&["  ", ""], MetricKind::Cac.into())
            .await
            .unwrap_err();
        assert_eq!(err, EstimationError::NoInput);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_duplicates_are_independent() {
        let provider = cac_provider();
        let estimator = estimator(provider.clone());

        let report = estimator
            .estimate_batch(&["mug", " mug "], MetricKind::Cac.into())
            .await
            .unwrap();
        assert_eq!(report.items.len(), 2);
        assert_eq!(provider.calls(), 2);
    }

    #[test]
    fn test_summary_wording() {
        let ok = BatchItem {
            product_name: "mug".to_string(),
            outcome: BatchOutcome::Success {
                data: EstimationResult::default(),
            },
        };
        let bad = BatchItem {
            product_name: "kettle".to_string(),
            outcome: BatchOutcome::Failure {
                reason: "boom".to_string(),
            },
        };

        let all_ok = BatchReport {
            items: vec![ok.clone(), ok.clone()],
        };
        assert_eq!(all_ok.summary(), "All 2 products estimated");

        let mixed = BatchReport {
            items: vec![ok, bad],
        };
        assert_eq!(mixed.summary(), "1 succeeded, 1 failed: kettle");
    }

    #[test]
    fn test_item_serialization() {
        let bad = BatchItem {
            product_name: "kettle".to_string(),
            outcome: BatchOutcome::Failure {
                reason: "boom".to_string(),
            },
        };
        assert_eq!(
            serde_json::to_value(&bad).unwrap(),
            serde_json::json!({"productName": "kettle", "status": "failure", "reason": "boom"})
        );
    }
}
