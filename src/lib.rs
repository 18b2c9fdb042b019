//! Marketing-economics calculators with LLM-assisted input estimation.
//!
//! The [`estimation`] pipeline asks a hosted model for plausible calculator
//! inputs given only a product name; [`calc`] turns inputs into derived
//! metrics. Both are exposed over HTTP ([`api`]) and on the command line
//! ([`cli`]).

pub mod api;
pub mod calc;
pub mod cli;
pub mod config;
pub mod error;
pub mod estimation;
pub mod llm;

#[cfg(test)]
mod test_support;
