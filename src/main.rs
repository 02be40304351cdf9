//! Route Consolidation - AS-IS vs TO-BE route comparison
//!
//! Loads both stop point datasets, resolves legs through the configured
//! routing provider and prints the comparison for a group.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tracing_appender::rolling::{RollingFileAppender, Rotation};

use route_consolidation::cli::{Cli, Command};
use route_consolidation::config::Config;
use route_consolidation::services::consolidation::ConsolidationEngine;
use route_consolidation::services::render::{report_table, scenario_to_geojson};
use route_consolidation::services::resolver::LegResolver;
use route_consolidation::services::routing::create_route_provider_with_fallback;
use route_consolidation::services::stop_import::{common_group_keys, load_stop_records, select_group};
use route_consolidation::types::ScenarioKind;

async fn build_engine(config: &Config) -> ConsolidationEngine {
    let provider = create_route_provider_with_fallback(config.provider.clone()).await;
    let resolver = Arc::new(LegResolver::new(provider, config.resolver.clone()));
    ConsolidationEngine::new(resolver, config.builder.clone(), config.metrics)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs directory - use LOGS_DIR env var or default to ./logs
    let logs_dir = std::env::var("LOGS_DIR")
        .unwrap_or_else(|_| "logs".to_string());
    std::fs::create_dir_all(&logs_dir).ok();

    // File appender for persistent logs (daily rotation)
    let file_appender = RollingFileAppender::new(
        Rotation::DAILY,
        &logs_dir,
        "route-consolidation.log",
    );
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // stderr keeps stdout clean for JSON / GeoJSON output
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,route_consolidation=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false))  // file
        .init();

    let mut config = Config::from_env()?;
    if let Some(path) = cli.as_is {
        config.as_is_path = path;
    }
    if let Some(path) = cli.to_be {
        config.to_be_path = path;
    }
    info!("Configuration loaded");

    let as_is_records = load_stop_records(&config.as_is_path)
        .with_context(|| format!("loading AS-IS stops from {}", config.as_is_path.display()))?;
    let to_be_records = load_stop_records(&config.to_be_path)
        .with_context(|| format!("loading TO-BE stops from {}", config.to_be_path.display()))?;

    match cli.command {
        Command::Groups => {
            for key in common_group_keys(&as_is_records, &to_be_records) {
                println!("{}", key);
            }
        }
        Command::Compare { group, json } => {
            let as_is = select_group(&as_is_records, &group);
            let to_be = select_group(&to_be_records, &group);
            if as_is.is_empty() && to_be.is_empty() {
                anyhow::bail!("group '{}' not found in either dataset", group);
            }

            let engine = build_engine(&config).await;
            let report = engine.compare_group(&group, &as_is, &to_be).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report_table(&report));
            }
        }
        Command::Geojson { group, scenario } => {
            let kind = ScenarioKind::from(scenario);
            let records = match kind {
                ScenarioKind::AsIs => &as_is_records,
                ScenarioKind::ToBe => &to_be_records,
            };
            let points = select_group(records, &group);
            if points.is_empty() {
                anyhow::bail!("group '{}' not found in {} dataset", group, kind);
            }

            let engine = build_engine(&config).await;
            let outcome = engine.run_scenario(kind, &points).await;
            let scenario = match outcome.scenario() {
                Some(scenario) => scenario,
                None => anyhow::bail!(
                    "{} scenario failed: {}",
                    kind,
                    outcome.error().unwrap_or("unknown error")
                ),
            };
            println!("{}", serde_json::to_string_pretty(&scenario_to_geojson(&group, scenario))?);
        }
    }

    Ok(())
}
