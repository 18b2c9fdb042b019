//! `calc` subcommands: the calculators on explicit inputs.

use clap::Subcommand;
use rust_decimal::Decimal;
use serde_json::json;

use super::print_json;
use crate::calc::{
    self, AdPerformanceInput, BreakEvenInput, CroInput, LtvInput, TargetCpaInput,
};

#[derive(Subcommand, Debug, Clone)]
pub enum CalcCommand {
    /// Highest acquisition cost that still breaks even
    TargetCpa {
        #[arg(long)]
        selling_price: Decimal,
        #[arg(long)]
        cost: Decimal,
    },

    /// Customer lifetime value
    Ltv {
        #[arg(long)]
        order_value: Decimal,
        #[arg(long)]
        purchase_frequency: Decimal,
    },

    /// LTV:CAC ratio and health band
    LtvCac {
        #[arg(long)]
        ltv: Decimal,
        #[arg(long)]
        cac: Decimal,
    },

    /// Contribution margin and break-even quantity
    BreakEven {
        #[arg(long)]
        fixed_cost: Decimal,
        #[arg(long)]
        variable_cost: Decimal,
        #[arg(long)]
        selling_price: Decimal,
    },

    /// Ad performance for one or more rows
    Ad {
        /// "price,profit_per_unit,ad_cost,conversions"; repeat for more rows
        #[arg(long = "row", required = true, value_parser = parse_ad_row)]
        rows: Vec<AdPerformanceInput>,
    },

    /// Revenue impact of a conversion-rate improvement
    Cro {
        #[arg(long)]
        monthly_visitors: Decimal,
        /// Current conversion rate in percent
        #[arg(long)]
        current_rate: Decimal,
        /// Improved conversion rate in percent
        #[arg(long)]
        improved_rate: Decimal,
        #[arg(long)]
        average_order_value: Decimal,
    },
}

/// Run a calc command and print its result as JSON.
pub fn run_calc_command(cmd: CalcCommand) -> anyhow::Result<()> {
    print_json(&evaluate(cmd)?)
}

fn evaluate(cmd: CalcCommand) -> anyhow::Result<serde_json::Value> {
    let value = match cmd {
        CalcCommand::TargetCpa {
            selling_price,
            cost,
        } => {
            let target = calc::target_cpa(&TargetCpaInput {
                selling_price,
                cost,
            })?;
            json!({ "targetCpa": target })
        }
        CalcCommand::Ltv {
            order_value,
            purchase_frequency,
        } => {
            let ltv = calc::ltv(&LtvInput {
                order_value,
                purchase_frequency,
            })?;
            json!({ "ltv": ltv })
        }
        CalcCommand::LtvCac { ltv, cac } => {
            let ratio = calc::ltv_cac_ratio(ltv, cac)?;
            json!({
                "ratio": calc::round_half_up(ratio.ratio, 2),
                "health": ratio.health,
                "description": ratio.health.description(),
            })
        }
        CalcCommand::BreakEven {
            fixed_cost,
            variable_cost,
            selling_price,
        } => serde_json::to_value(calc::break_even(&BreakEvenInput {
            fixed_cost,
            variable_cost,
            selling_price,
        })?)?,
        CalcCommand::Ad { rows } => serde_json::to_value(calc::evaluate_ad_rows(&rows)?)?,
        CalcCommand::Cro {
            monthly_visitors,
            current_rate,
            improved_rate,
            average_order_value,
        } => serde_json::to_value(calc::cro_impact(&CroInput {
            monthly_visitors,
            current_rate,
            improved_rate,
            average_order_value,
        })?)?,
    };
    Ok(value)
}

fn parse_ad_row(raw: &str) -> Result<AdPerformanceInput, String> {
    let values = raw
        .split(',')
        .map(|part| part.trim().parse::<Decimal>().map_err(|e| format!("{part:?}: {e}")))
        .collect::<Result<Vec<_>, _>>()?;

    let [price, profit_per_unit, ad_cost, conversions] = values[..] else {
        return Err(format!(
            "expected 4 comma-separated values (price,profit_per_unit,ad_cost,conversions), got {}",
            values.len()
        ));
    };
    Ok(AdPerformanceInput {
        price,
        profit_per_unit,
        ad_cost,
        conversions,
    })
}
