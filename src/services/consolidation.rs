//! Group comparison run
//!
//! Builds AS-IS and TO-BE for one group concurrently, aggregates each, and
//! compares them. The two scenarios fail independently: a transport failure
//! in one is reported on that scenario and the other is still computed.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};

use crate::services::comparison::compare;
use crate::services::metrics::{aggregate, MetricsConfig};
use crate::services::resolver::LegResolver;
use crate::services::scenario::{BuilderConfig, ScenarioBuilder};
use crate::types::{Comparison, Scenario, ScenarioKind, ScenarioMetrics, StopPoint};

/// Result of computing one scenario
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScenarioOutcome {
    Computed {
        scenario: Scenario,
        metrics: ScenarioMetrics,
    },
    Failed {
        kind: ScenarioKind,
        error: String,
    },
}

impl ScenarioOutcome {
    pub fn metrics(&self) -> Option<&ScenarioMetrics> {
        match self {
            ScenarioOutcome::Computed { metrics, .. } => Some(metrics),
            ScenarioOutcome::Failed { .. } => None,
        }
    }

    pub fn scenario(&self) -> Option<&Scenario> {
        match self {
            ScenarioOutcome::Computed { scenario, .. } => Some(scenario),
            ScenarioOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ScenarioOutcome::Failed { error, .. } => Some(error),
            ScenarioOutcome::Computed { .. } => None,
        }
    }
}

/// Both scenarios of one group and their comparison
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupReport {
    pub group_key: String,
    pub as_is: ScenarioOutcome,
    pub to_be: ScenarioOutcome,
    /// Present only when both scenarios were computed
    pub comparison: Option<Vec<Comparison>>,
}

/// Scenario builder + metrics configuration
pub struct ConsolidationEngine {
    builder: ScenarioBuilder,
    metrics: MetricsConfig,
}

impl ConsolidationEngine {
    pub fn new(resolver: Arc<LegResolver>, builder_config: BuilderConfig, metrics: MetricsConfig) -> Self {
        Self {
            builder: ScenarioBuilder::new(resolver, builder_config),
            metrics,
        }
    }

    /// Build and aggregate one scenario, capturing failure as an outcome
    pub async fn run_scenario(&self, kind: ScenarioKind, points: &[StopPoint]) -> ScenarioOutcome {
        match self.builder.build(kind, points).await {
            Ok(scenario) => {
                let metrics = aggregate(&scenario, &self.metrics);
                ScenarioOutcome::Computed { scenario, metrics }
            }
            Err(e) => {
                error!("{} scenario failed: {}", kind, e);
                ScenarioOutcome::Failed {
                    kind,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Compute both scenarios for a group. AS-IS and TO-BE may come from
    /// different datasets, hence the two point slices.
    pub async fn compare_group(
        &self,
        group_key: &str,
        as_is_points: &[StopPoint],
        to_be_points: &[StopPoint],
    ) -> GroupReport {
        info!(
            "Comparing group {}: {} AS-IS points, {} TO-BE points",
            group_key,
            as_is_points.len(),
            to_be_points.len()
        );

        let (as_is, to_be) = tokio::join!(
            self.run_scenario(ScenarioKind::AsIs, as_is_points),
            self.run_scenario(ScenarioKind::ToBe, to_be_points),
        );

        let comparison = match (as_is.metrics(), to_be.metrics()) {
            (Some(a), Some(b)) => Some(compare(a, b)),
            _ => None,
        };

        GroupReport {
            group_key: group_key.to_string(),
            as_is,
            to_be,
            comparison,
        }
    }
}
