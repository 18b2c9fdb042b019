//! `estimate` and `batch` commands.

use clap::ValueEnum;
use serde_json::json;

use super::print_json;
use crate::estimation::{EstimationTarget, MetricEstimator, MetricKind, split_product_names};

/// What an `estimate` or `batch` run asks the model for.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimateKind {
    /// Price, profit per unit, ad cost and conversions
    Product,
    Cpa,
    Ltv,
    Cac,
    BreakEven,
    /// LTV and CAC together, with their ratio
    LtvCac,
}

impl EstimateKind {
    /// The single estimation target, or `None` for the combined LTV:CAC run.
    fn target(self) -> Option<EstimationTarget> {
        match self {
            Self::Product => Some(EstimationTarget::Product),
            Self::Cpa => Some(MetricKind::Cpa.into()),
            Self::Ltv => Some(MetricKind::Ltv.into()),
            Self::Cac => Some(MetricKind::Cac.into()),
            Self::BreakEven => Some(MetricKind::BreakEven.into()),
            Self::LtvCac => None,
        }
    }
}

/// Estimate one product and print the result as JSON.
pub async fn run_estimate_command(
    estimator: &MetricEstimator,
    kind: EstimateKind,
    product: &str,
) -> anyhow::Result<()> {
    match kind.target() {
        Some(EstimationTarget::Product) => {
            print_json(&estimator.estimate_product(product).await?)
        }
        Some(EstimationTarget::Metric(metric)) => {
            print_json(&estimator.estimate_metric(product, metric).await?)
        }
        None => {
            let estimate = estimator.estimate_ltv_cac(product).await?;
            print_json(&estimate)?;
            match &estimate.ratio {
                Some(ratio) => println!("LTV:CAC {:.2}:1, {}", ratio.ratio, ratio.health.description()),
                None => println!("LTV:CAC ratio unavailable for these estimates"),
            }
            Ok(())
        }
    }
}

/// Estimate every product in a comma-separated list and print the report.
pub async fn run_batch_command(
    estimator: &MetricEstimator,
    kind: EstimateKind,
    products: &str,
) -> anyhow::Result<()> {
    let Some(target) = kind.target() else {
        anyhow::bail!("batch estimation supports product, cpa, ltv, cac and break-even");
    };

    let names = split_product_names(products);
    let report = estimator.estimate_batch(&names, target).await?;

    print_json(&json!({
        "items": report.items,
        "successCount": report.success_count(),
        "failedProducts": report.failed_names(),
    }))?;
    println!("{}", report.summary());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::error::EstimationError;
    use crate::estimation::RetryingClient;
    use crate::test_support::{ScriptedProvider, fast_policy};

    fn estimator(provider: std::sync::Arc<ScriptedProvider>) -> MetricEstimator {
        MetricEstimator::with_client(
            RetryingClient::new(provider, fast_policy()),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_kind_targets() {
        assert_eq!(EstimateKind::Product.target(), Some(EstimationTarget::Product));
        assert_eq!(
            EstimateKind::BreakEven.target(),
            Some(EstimationTarget::Metric(MetricKind::BreakEven))
        );
        assert_eq!(EstimateKind::LtvCac.target(), None);
    }

    #[tokio::test]
    async fn test_batch_rejects_ltv_cac() {
        let provider = ScriptedProvider::new(|_, _| Ok("{}".to_string()));
        let err = run_batch_command(&estimator(provider.clone()), EstimateKind::LtvCac, "mug")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("batch estimation supports"));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_batch_without_names_is_no_input() {
        let provider = ScriptedProvider::new(|_, _| Ok("{}".to_string()));
        let err = run_batch_command(&estimator(provider), EstimateKind::Cac, " , ")
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<EstimationError>(),
            Some(&EstimationError::NoInput)
        );
    }

    #[tokio::test]
    async fn test_estimate_propagates_failure() {
        let provider = ScriptedProvider::new(|_, _| Ok("not json".to_string()));
        let err = run_estimate_command(&estimator(provider), EstimateKind::Cpa, "mug")
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EstimationError>(),
            Some(EstimationError::MalformedResponse { .. })
        ));
    }
}
