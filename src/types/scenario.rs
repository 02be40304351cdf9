//! Scenario, metrics and comparison types

use serde::{Deserialize, Serialize};

use super::Leg;

/// Routing strategy under evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    /// Baseline: one independent trip per pickup to its nearest drop
    AsIs,
    /// Consolidated: one multi-stop trip over all pickups to a shared drop
    ToBe,
}

impl ScenarioKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ScenarioKind::AsIs => "as_is",
            ScenarioKind::ToBe => "to_be",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ScenarioKind::AsIs => "AS-IS",
            ScenarioKind::ToBe => "TO-BE",
        }
    }
}

impl std::fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Ordered legs for one routing strategy
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub kind: ScenarioKind,
    pub legs: Vec<Leg>,
}

impl Scenario {
    pub fn empty(kind: ScenarioKind) -> Self {
        Self { kind, legs: vec![] }
    }

    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }

    /// Number of legs that fell back to a straight line
    pub fn unresolved_count(&self) -> usize {
        self.legs.iter().filter(|leg| !leg.resolved).count()
    }
}

/// Totals for one scenario. Produced by `services::metrics::aggregate`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioMetrics {
    pub total_duration_seconds: f64,
    pub total_distance_meters: f64,
    pub cost: f64,
    /// kg CO2e
    pub emissions: f64,
}

impl ScenarioMetrics {
    pub fn total_distance_km(&self) -> f64 {
        self.total_distance_meters / 1000.0
    }

    pub fn total_duration_minutes(&self) -> f64 {
        self.total_duration_seconds / 60.0
    }

    /// Value of the metric in the unit used for comparison
    pub fn value(&self, metric: MetricName) -> f64 {
        match metric {
            MetricName::Duration => self.total_duration_seconds,
            MetricName::Distance => self.total_distance_km(),
            MetricName::Cost => self.cost,
            MetricName::Emissions => self.emissions,
        }
    }
}

/// Compared metric. Lower is better for all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricName {
    /// seconds
    Duration,
    /// kilometers
    Distance,
    Cost,
    /// kg CO2e
    Emissions,
}

impl MetricName {
    pub const ALL: [MetricName; 4] = [
        MetricName::Duration,
        MetricName::Distance,
        MetricName::Cost,
        MetricName::Emissions,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            MetricName::Duration => "duration",
            MetricName::Distance => "distance",
            MetricName::Cost => "cost",
            MetricName::Emissions => "emissions",
        }
    }

    pub const fn unit(self) -> &'static str {
        match self {
            MetricName::Duration => "s",
            MetricName::Distance => "km",
            MetricName::Cost => "",
            MetricName::Emissions => "kg CO2e",
        }
    }
}

/// AS-IS vs TO-BE delta for one metric. Positive delta means TO-BE is lower.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub metric_name: MetricName,
    pub as_is_value: f64,
    pub to_be_value: f64,
    pub delta: f64,
    pub delta_percent: f64,
}
