use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use adcalc::api::{self, ApiServer, ApiServerConfig, AppState};
use adcalc::cli::{Cli, Command, run_batch_command, run_calc_command, run_estimate_command};
use adcalc::config::Config;
use adcalc::estimation::MetricEstimator;
use adcalc::llm::create_llm_provider;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    match Cli::parse().command {
        Command::Calc(cmd) => run_calc_command(cmd),
        Command::Serve { host, port } => {
            let (config, estimator) = load()?;
            let host = host.unwrap_or(config.http.host);
            let port = port.unwrap_or(config.http.port);
            let addr: SocketAddr = format!("{host}:{port}")
                .parse()
                .with_context(|| format!("invalid bind address {host}:{port}"))?;

            let state = Arc::new(AppState::new(estimator, config.deployment));
            let mut server = ApiServer::new(ApiServerConfig { addr }, api::routes(state));
            server.start().await?;

            tokio::signal::ctrl_c().await?;
            server.shutdown().await;
            Ok(())
        }
        Command::Estimate { kind, product } => {
            let (config, estimator) = load()?;
            let estimator = require_estimator(estimator, &config)?;
            run_estimate_command(&estimator, kind, &product).await
        }
        Command::Batch { kind, products } => {
            let (config, estimator) = load()?;
            let estimator = require_estimator(estimator, &config)?;
            run_batch_command(&estimator, kind, &products).await
        }
    }
}

/// Load configuration and build the estimator, if a key is configured.
fn load() -> anyhow::Result<(Config, Option<MetricEstimator>)> {
    let config = Config::from_env()?;
    let estimator = create_llm_provider(&config.google)?
        .map(|provider| MetricEstimator::new(provider, &config.estimation));
    Ok((config, estimator))
}

fn require_estimator(
    estimator: Option<MetricEstimator>,
    config: &Config,
) -> anyhow::Result<MetricEstimator> {
    estimator.with_context(|| {
        format!(
            "API key is not configured. {}",
            config.deployment.missing_key_hint()
        )
    })
}

/// `RUST_LOG` filters (default `adcalc=info,tower_http=info`); `LOG_FORMAT=json`
/// switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("adcalc=info,tower_http=info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
}
