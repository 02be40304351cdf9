//! Scenario totals: duration, distance, cost and emissions

use std::str::FromStr;

use crate::types::{Leg, Scenario, ScenarioMetrics};

/// Cost per kilometer driven (KRW, 25 t livestock truck incl. driver)
pub const DEFAULT_COST_PER_KM: f64 = 1_500.0;

/// kg CO2e per kilometer driven (diesel heavy goods vehicle)
pub const DEFAULT_EMISSIONS_PER_KM: f64 = 0.9;

/// Where leg distances come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetricSource {
    /// Distances returned by the routing provider (or the straight-line fallback)
    #[default]
    Provider,
    /// The dataset's pre-computed drive distance where a leg carries one,
    /// provider distance otherwise
    Recorded,
}

impl FromStr for MetricSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "provider" => Ok(MetricSource::Provider),
            "recorded" | "drive_dist" => Ok(MetricSource::Recorded),
            other => anyhow::bail!("unknown metric source '{}' (expected provider or recorded)", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsConfig {
    pub cost_per_km: f64,
    pub emissions_per_km: f64,
    pub source: MetricSource,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            cost_per_km: DEFAULT_COST_PER_KM,
            emissions_per_km: DEFAULT_EMISSIONS_PER_KM,
            source: MetricSource::Provider,
        }
    }
}

fn leg_distance_meters(leg: &Leg, source: MetricSource) -> f64 {
    match source {
        MetricSource::Provider => leg.distance_meters,
        MetricSource::Recorded => leg.recorded_distance_meters.unwrap_or(leg.distance_meters),
    }
}

/// Sum a scenario's legs into totals. An empty scenario is all zeros.
pub fn aggregate(scenario: &Scenario, config: &MetricsConfig) -> ScenarioMetrics {
    let total_duration_seconds: f64 = scenario.legs.iter().map(|leg| leg.duration_seconds).sum();
    let total_distance_meters: f64 = scenario
        .legs
        .iter()
        .map(|leg| leg_distance_meters(leg, config.source))
        .sum();

    let distance_km = total_distance_meters / 1000.0;

    ScenarioMetrics {
        total_duration_seconds,
        total_distance_meters,
        cost: distance_km * config.cost_per_km,
        emissions: distance_km * config.emissions_per_km,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Coordinates, RouteGeometry, ScenarioKind, StopPoint};

    fn leg(duration_seconds: f64, distance_meters: f64, recorded: Option<f64>) -> Leg {
        let origin = StopPoint::pickup("p", Coordinates::new(37.5, 127.0), "G1", None).unwrap();
        let destination = StopPoint::drop_point("d", Coordinates::new(37.6, 127.2), "G1").unwrap();
        Leg {
            origin,
            destination,
            via: vec![],
            path: RouteGeometry::empty(),
            duration_seconds,
            distance_meters,
            resolved: true,
            recorded_distance_meters: recorded,
        }
    }

    #[test]
    fn test_aggregate_empty_scenario_is_zero() {
        let metrics = aggregate(&Scenario::empty(ScenarioKind::ToBe), &MetricsConfig::default());
        assert_eq!(metrics, ScenarioMetrics::default());
    }

    #[test]
    fn test_aggregate_sums_and_applies_factors() {
        let scenario = Scenario {
            kind: ScenarioKind::AsIs,
            legs: vec![leg(600.0, 10_000.0, None), leg(300.0, 5_000.0, None)],
        };
        let config = MetricsConfig {
            cost_per_km: 2.0,
            emissions_per_km: 0.5,
            source: MetricSource::Provider,
        };

        let metrics = aggregate(&scenario, &config);

        assert_eq!(metrics.total_duration_seconds, 900.0);
        assert_eq!(metrics.total_distance_meters, 15_000.0);
        assert!((metrics.cost - 30.0).abs() < 1e-9);
        assert!((metrics.emissions - 7.5).abs() < 1e-9);
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let scenario = Scenario {
            kind: ScenarioKind::AsIs,
            legs: vec![leg(123.4, 5_678.9, None), leg(0.1, 0.2, None)],
        };
        let config = MetricsConfig::default();

        assert_eq!(aggregate(&scenario, &config), aggregate(&scenario, &config));
    }

    #[test]
    fn test_aggregate_recorded_source_prefers_dataset_distance() {
        let scenario = Scenario {
            kind: ScenarioKind::AsIs,
            legs: vec![leg(60.0, 10_000.0, Some(12_000.0)), leg(60.0, 4_000.0, None)],
        };

        let provider = aggregate(&scenario, &MetricsConfig::default());
        let recorded = aggregate(
            &scenario,
            &MetricsConfig {
                source: MetricSource::Recorded,
                ..Default::default()
            },
        );

        assert_eq!(provider.total_distance_meters, 14_000.0);
        assert_eq!(recorded.total_distance_meters, 16_000.0);
        assert_eq!(provider.total_duration_seconds, recorded.total_duration_seconds);
    }

    #[test]
    fn test_metric_source_from_str() {
        assert_eq!("provider".parse::<MetricSource>().unwrap(), MetricSource::Provider);
        assert_eq!("drive_dist".parse::<MetricSource>().unwrap(), MetricSource::Recorded);
        assert!("guess".parse::<MetricSource>().is_err());
    }
}
