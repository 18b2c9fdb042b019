//! Command-line interface.
//!
//! Commands:
//! - `serve`: run the HTTP API
//! - `estimate`: estimate one product's figures or metric inputs
//! - `batch`: estimate several products concurrently
//! - `calc`: run a calculator on explicit inputs, no model involved

mod calc;
mod estimate;

pub use calc::{CalcCommand, run_calc_command};
pub use estimate::{EstimateKind, run_batch_command, run_estimate_command};

use clap::{Parser, Subcommand};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "adcalc")]
#[command(about = "Marketing-economics calculators with LLM-assisted input estimation")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API
    Serve {
        /// Address to bind (overrides HTTP_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides HTTP_PORT)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Estimate figures for one product
    Estimate {
        /// What to estimate
        #[arg(value_enum)]
        kind: EstimateKind,

        /// Product name
        product: String,
    },

    /// Estimate several products concurrently
    Batch {
        /// What to estimate
        #[arg(value_enum)]
        kind: EstimateKind,

        /// Comma-separated product names, e.g. "mug, kettle"
        products: String,
    },

    /// Run a calculator on explicit inputs
    #[command(subcommand)]
    Calc(CalcCommand),
}

/// Print `value` as pretty JSON on stdout.
fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
