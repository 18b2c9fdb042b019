//! Derived marketing metrics.
//!
//! Pure arithmetic over `Decimal`. Functions with preconditions check them
//! first and return a [`CalcError`] naming the violated constraint.

use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::CalcError;

/// Round to `dp` decimal places, halves away from zero.
pub fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

fn ensure(condition: bool, constraint: &'static str) -> Result<(), CalcError> {
    if condition {
        Ok(())
    } else {
        Err(CalcError::violated(constraint))
    }
}

/// Unwrap a `checked_*` result; `None` means the value left `Decimal`'s range.
fn in_range(value: Option<Decimal>) -> Result<Decimal, CalcError> {
    value.ok_or(CalcError::violated("value is out of range"))
}

// --- Target CPA ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetCpaInput {
    pub selling_price: Decimal,
    pub cost: Decimal,
}

/// Highest acquisition cost that still breaks even on one sale.
pub fn target_cpa(input: &TargetCpaInput) -> Result<Decimal, CalcError> {
    ensure(input.selling_price > Decimal::ZERO, "selling price must be greater than 0")?;
    ensure(input.cost >= Decimal::ZERO, "cost must not be negative")?;
    ensure(input.cost < input.selling_price, "cost must be less than selling price")?;
    Ok(input.selling_price - input.cost)
}

// --- LTV ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LtvInput {
    pub order_value: Decimal,
    pub purchase_frequency: Decimal,
}

pub fn ltv(input: &LtvInput) -> Result<Decimal, CalcError> {
    ensure(input.order_value > Decimal::ZERO, "order value must be greater than 0")?;
    ensure(
        input.purchase_frequency > Decimal::ZERO,
        "purchase frequency must be greater than 0",
    )?;
    in_range(input.order_value.checked_mul(input.purchase_frequency))
}

// --- LTV:CAC ---

/// Marketing health band of an LTV:CAC ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    Healthy,
    Good,
    Caution,
    Risk,
}

impl Health {
    /// Bands are closed at their lower bound.
    pub fn from_ratio(ratio: Decimal) -> Self {
        if ratio >= dec!(3) {
            Self::Healthy
        } else if ratio >= dec!(2) {
            Self::Good
        } else if ratio >= dec!(1) {
            Self::Caution
        } else {
            Self::Risk
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Good => "good",
            Self::Caution => "caution",
            Self::Risk => "risk",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Healthy => "Healthy (3:1 or better)",
            Self::Good => "Good (2:1 or better)",
            Self::Caution => "Needs attention (1:1 or better)",
            Self::Risk => "At risk (below 1:1)",
        }
    }
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LtvCacRatio {
    pub ltv: Decimal,
    pub cac: Decimal,
    pub ratio: Decimal,
    pub health: Health,
}

pub fn ltv_cac_ratio(ltv: Decimal, cac: Decimal) -> Result<LtvCacRatio, CalcError> {
    ensure(ltv > Decimal::ZERO, "LTV must be greater than 0")?;
    ensure(cac > Decimal::ZERO, "CAC must be greater than 0")?;
    let ratio = in_range(ltv.checked_div(cac))?;
    Ok(LtvCacRatio {
        ltv,
        cac,
        ratio,
        health: Health::from_ratio(ratio),
    })
}

// --- Break-even ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakEvenInput {
    pub fixed_cost: Decimal,
    pub variable_cost: Decimal,
    pub selling_price: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakEven {
    pub contribution_margin: Decimal,
    /// Units to sell, rounded up.
    pub break_even_quantity: Decimal,
}

pub fn contribution_margin(
    selling_price: Decimal,
    variable_cost: Decimal,
) -> Result<Decimal, CalcError> {
    in_range(selling_price.checked_sub(variable_cost))
}

pub fn break_even(input: &BreakEvenInput) -> Result<BreakEven, CalcError> {
    ensure(input.fixed_cost > Decimal::ZERO, "fixed cost must be greater than 0")?;
    ensure(input.selling_price > Decimal::ZERO, "selling price must be greater than 0")?;
    ensure(input.variable_cost >= Decimal::ZERO, "variable cost must not be negative")?;
    ensure(
        input.variable_cost < input.selling_price,
        "variable cost must be less than selling price",
    )?;

    let margin = contribution_margin(input.selling_price, input.variable_cost)?;
    Ok(BreakEven {
        contribution_margin: margin,
        break_even_quantity: in_range(input.fixed_cost.checked_div(margin))?.ceil(),
    })
}

// --- Ad performance ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdPerformanceInput {
    pub price: Decimal,
    pub profit_per_unit: Decimal,
    pub ad_cost: Decimal,
    pub conversions: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdPerformance {
    pub revenue: Decimal,
    pub net_profit: Decimal,
    /// Revenue per unit of ad spend; 0 without ad spend.
    pub roas: Decimal,
    /// Net profit over ad spend, in percent; 0 without ad spend.
    pub roi: Decimal,
}

pub fn ad_performance(input: &AdPerformanceInput) -> Result<AdPerformance, CalcError> {
    let revenue = in_range(input.price.checked_mul(input.conversions))?;
    let net_profit = in_range(
        input
            .profit_per_unit
            .checked_mul(input.conversions)
            .and_then(|gross| gross.checked_sub(input.ad_cost)),
    )?;
    let (roas, roi) = if input.ad_cost.is_zero() {
        (Decimal::ZERO, Decimal::ZERO)
    } else {
        (
            in_range(revenue.checked_div(input.ad_cost))?,
            in_range(
                net_profit
                    .checked_div(input.ad_cost)
                    .and_then(|r| r.checked_mul(dec!(100))),
            )?,
        )
    };
    Ok(AdPerformance {
        revenue,
        net_profit,
        roas,
        roi,
    })
}

/// Index of the row with the strictly greatest net profit; the first row
/// wins ties.
pub fn highest_net_profit(results: &[AdPerformance]) -> Option<usize> {
    let mut best: Option<(usize, Decimal)> = None;
    for (idx, result) in results.iter().enumerate() {
        match best {
            Some((_, max)) if result.net_profit <= max => {}
            _ => best = Some((idx, result.net_profit)),
        }
    }
    best.map(|(idx, _)| idx)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdPerformanceReport {
    pub results: Vec<AdPerformance>,
    pub highest_profit: Option<usize>,
}

/// Compute every row and pick the most profitable one.
pub fn evaluate_ad_rows(rows: &[AdPerformanceInput]) -> Result<AdPerformanceReport, CalcError> {
    let results = rows
        .iter()
        .map(ad_performance)
        .collect::<Result<Vec<_>, _>>()?;
    let highest_profit = highest_net_profit(&results);
    Ok(AdPerformanceReport {
        results,
        highest_profit,
    })
}

// --- Conversion rate optimization ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CroInput {
    pub monthly_visitors: Decimal,
    /// Percent, e.g. `2.5` for 2.5%.
    pub current_rate: Decimal,
    pub improved_rate: Decimal,
    pub average_order_value: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CroImpact {
    pub current_conversions: Decimal,
    pub improved_conversions: Decimal,
    pub additional_conversions: Decimal,
    pub monthly_revenue_increase: Decimal,
    pub annual_revenue_increase: Decimal,
    /// Relative rate improvement in percent; 0 when the current rate is 0.
    pub conversion_rate_improvement: Decimal,
}

/// Revenue impact of raising the conversion rate.
///
/// Conversion counts and the relative improvement are rounded to two
/// decimals, revenue to whole units.
pub fn cro_impact(input: &CroInput) -> Result<CroImpact, CalcError> {
    ensure(
        input.monthly_visitors > Decimal::ZERO,
        "monthly visitors must be greater than 0",
    )?;
    ensure(input.current_rate >= Decimal::ZERO, "current rate must not be negative")?;
    ensure(input.improved_rate >= Decimal::ZERO, "improved rate must not be negative")?;
    ensure(
        input.average_order_value >= Decimal::ZERO,
        "average order value must not be negative",
    )?;
    ensure(
        input.improved_rate >= input.current_rate,
        "improved rate must not be lower than current rate",
    )?;

    let conversions_at = |rate: Decimal| {
        in_range(
            input
                .monthly_visitors
                .checked_mul(rate)
                .and_then(|v| v.checked_div(dec!(100))),
        )
    };
    let current = conversions_at(input.current_rate)?;
    let improved = conversions_at(input.improved_rate)?;
    let additional = in_range(improved.checked_sub(current))?;
    let monthly = in_range(additional.checked_mul(input.average_order_value))?;
    let annual = in_range(monthly.checked_mul(dec!(12)))?;
    let improvement = if input.current_rate.is_zero() {
        Decimal::ZERO
    } else {
        in_range(
            (input.improved_rate - input.current_rate)
                .checked_div(input.current_rate)
                .and_then(|r| r.checked_mul(dec!(100))),
        )?
    };

    Ok(CroImpact {
        current_conversions: round_half_up(current, 2),
        improved_conversions: round_half_up(improved, 2),
        additional_conversions: round_half_up(additional, 2),
        monthly_revenue_increase: round_half_up(monthly, 0),
        annual_revenue_increase: round_half_up(annual, 0),
        conversion_rate_improvement: round_half_up(improvement, 2),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ad(price: Decimal, profit: Decimal, ad_cost: Decimal, conversions: Decimal) -> AdPerformanceInput {
        AdPerformanceInput {
            price,
            profit_per_unit: profit,
            ad_cost,
            conversions,
        }
    }

    #[test]
    fn test_target_cpa() {
        let input = TargetCpaInput {
            selling_price: dec!(50000),
            cost: dec!(30000),
        };
        assert_eq!(target_cpa(&input).unwrap(), dec!(20000));
    }

    #[test]
    fn test_target_cpa_rejects_cost_at_price() {
        let input = TargetCpaInput {
            selling_price: dec!(50000),
            cost: dec!(50000),
        };
        assert_eq!(
            target_cpa(&input).unwrap_err(),
            CalcError::violated("cost must be less than selling price")
        );
    }

    #[test]
    fn test_ltv_requires_positive_inputs() {
        let ok = LtvInput {
            order_value: dec!(45000),
            purchase_frequency: dec!(3.5),
        };
        assert_eq!(ltv(&ok).unwrap(), dec!(157500));

        let zero = LtvInput {
            purchase_frequency: Decimal::ZERO,
            ..ok
        };
        assert!(ltv(&zero).unwrap_err().to_string().contains("purchase frequency"));
    }

    #[test]
    fn test_break_even() {
        let input = BreakEvenInput {
            fixed_cost: dec!(5000000),
            variable_cost: dec!(30000),
            selling_price: dec!(50000),
        };
        let result = break_even(&input).unwrap();
        assert_eq!(result.contribution_margin, dec!(20000));
        assert_eq!(result.break_even_quantity, dec!(250));
    }

    #[test]
    fn test_break_even_rounds_up() {
        let input = BreakEvenInput {
            fixed_cost: dec!(1000001),
            variable_cost: dec!(30000),
            selling_price: dec!(50000),
        };
        assert_eq!(break_even(&input).unwrap().break_even_quantity, dec!(51));
    }

    #[test]
    fn test_break_even_rejects_variable_cost_at_price() {
        let input = BreakEvenInput {
            fixed_cost: dec!(5000000),
            variable_cost: dec!(50000),
            selling_price: dec!(50000),
        };
        assert!(
            break_even(&input)
                .unwrap_err()
                .to_string()
                .contains("variable cost must be less than selling price")
        );
    }

    #[test]
    fn test_ltv_cac_health() {
        let healthy = ltv_cac_ratio(dec!(200000), dec!(50000)).unwrap();
        assert_eq!(healthy.ratio, dec!(4));
        assert_eq!(healthy.health, Health::Healthy);

        let risk = ltv_cac_ratio(dec!(40000), dec!(50000)).unwrap();
        assert_eq!(risk.ratio, dec!(0.8));
        assert_eq!(risk.health, Health::Risk);

        assert!(ltv_cac_ratio(dec!(1), Decimal::ZERO).is_err());
    }

    #[test]
    fn test_health_band_boundaries() {
        assert_eq!(Health::from_ratio(dec!(3)), Health::Healthy);
        assert_eq!(Health::from_ratio(dec!(2.999)), Health::Good);
        assert_eq!(Health::from_ratio(dec!(2)), Health::Good);
        assert_eq!(Health::from_ratio(dec!(1)), Health::Caution);
        assert_eq!(Health::from_ratio(dec!(0.999)), Health::Risk);
    }

    #[test]
    fn test_ad_performance() {
        let result = ad_performance(&ad(dec!(50000), dec!(15000), dec!(10000), dec!(20))).unwrap();
        assert_eq!(result.revenue, dec!(1000000));
        assert_eq!(result.net_profit, dec!(290000));
        assert_eq!(result.roas, dec!(100));
        assert_eq!(result.roi, dec!(2900));
    }

    #[test]
    fn test_ad_performance_without_spend() {
        let result = ad_performance(&ad(dec!(10000), dec!(2000), Decimal::ZERO, dec!(5))).unwrap();
        assert_eq!(result.roas, Decimal::ZERO);
        assert_eq!(result.roi, Decimal::ZERO);
        assert_eq!(result.net_profit, dec!(10000));
    }

    #[test]
    fn test_highest_profit_first_wins_ties() {
        let report = evaluate_ad_rows(&[
            ad(dec!(100), dec!(10), dec!(0), dec!(5)),
            ad(dec!(100), dec!(25), dec!(0), dec!(2)),
            ad(dec!(100), dec!(5), dec!(0), dec!(10)),
        ])
        .unwrap();
        // All three rows net 50.
        assert_eq!(report.highest_profit, Some(0));

        let report = evaluate_ad_rows(&[
            ad(dec!(100), dec!(10), dec!(100), dec!(5)),
            ad(dec!(100), dec!(30), dec!(10), dec!(5)),
        ])
        .unwrap();
        assert_eq!(report.highest_profit, Some(1));

        assert_eq!(highest_net_profit(&[]), None);
    }

    #[test]
    fn test_highest_profit_with_all_losses() {
        let report = evaluate_ad_rows(&[
            ad(dec!(100), dec!(1), dec!(500), dec!(1)),
            ad(dec!(100), dec!(1), dec!(200), dec!(1)),
        ])
        .unwrap();
        assert_eq!(report.highest_profit, Some(1));
    }

    #[test]
    fn test_cro_impact() {
        let input = CroInput {
            monthly_visitors: dec!(10000),
            current_rate: dec!(2),
            improved_rate: dec!(3),
            average_order_value: dec!(50000),
        };
        let impact = cro_impact(&input).unwrap();
        assert_eq!(impact.current_conversions, dec!(200));
        assert_eq!(impact.improved_conversions, dec!(300));
        assert_eq!(impact.additional_conversions, dec!(100));
        assert_eq!(impact.monthly_revenue_increase, dec!(5000000));
        assert_eq!(impact.annual_revenue_increase, dec!(60000000));
        assert_eq!(impact.conversion_rate_improvement, dec!(50));
    }

    #[test]
    fn test_cro_zero_current_rate() {
        let input = CroInput {
            monthly_visitors: dec!(1000),
            current_rate: Decimal::ZERO,
            improved_rate: dec!(1.5),
            average_order_value: dec!(20000),
        };
        let impact = cro_impact(&input).unwrap();
        assert_eq!(impact.additional_conversions, dec!(15));
        assert_eq!(impact.conversion_rate_improvement, Decimal::ZERO);
    }

    #[test]
    fn test_cro_rejects_lower_improved_rate() {
        let input = CroInput {
            monthly_visitors: dec!(1000),
            current_rate: dec!(3),
            improved_rate: dec!(2),
            average_order_value: dec!(20000),
        };
        assert_eq!(
            cro_impact(&input).unwrap_err(),
            CalcError::violated("improved rate must not be lower than current rate")
        );
    }

    #[test]
    fn test_overflow_is_out_of_range() {
        let out_of_range = CalcError::violated("value is out of range");
        let huge = Decimal::MAX;

        let input = LtvInput {
            order_value: huge,
            purchase_frequency: dec!(2),
        };
        assert_eq!(ltv(&input).unwrap_err(), out_of_range);

        assert_eq!(
            ltv_cac_ratio(huge, dec!(0.0000000001)).unwrap_err(),
            out_of_range
        );

        let input = BreakEvenInput {
            fixed_cost: huge,
            variable_cost: Decimal::ZERO,
            selling_price: dec!(0.5),
        };
        assert_eq!(break_even(&input).unwrap_err(), out_of_range);

        assert_eq!(
            ad_performance(&ad(huge, dec!(1), dec!(1), dec!(10))).unwrap_err(),
            out_of_range
        );
        assert_eq!(
            evaluate_ad_rows(&[
                ad(dec!(100), dec!(10), dec!(0), dec!(5)),
                ad(dec!(1), huge, dec!(1), dec!(10)),
            ])
            .unwrap_err(),
            out_of_range
        );

        let input = CroInput {
            monthly_visitors: huge,
            current_rate: dec!(1),
            improved_rate: dec!(200),
            average_order_value: dec!(1),
        };
        assert_eq!(cro_impact(&input).unwrap_err(), out_of_range);
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(dec!(2.5), 0), dec!(3));
        assert_eq!(round_half_up(dec!(1.005), 2), dec!(1.01));
    }
}
