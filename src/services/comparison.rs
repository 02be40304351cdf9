//! AS-IS vs TO-BE deltas

use crate::types::{Comparison, MetricName, ScenarioMetrics};

/// Percentage of `delta` relative to `baseline`; 0 when the baseline is 0
fn percent_of(delta: f64, baseline: f64) -> f64 {
    if baseline == 0.0 {
        0.0
    } else {
        delta / baseline * 100.0
    }
}

/// One entry per metric, in `MetricName::ALL` order.
/// `delta = as_is - to_be`, so a positive delta means TO-BE is better.
pub fn compare(as_is: &ScenarioMetrics, to_be: &ScenarioMetrics) -> Vec<Comparison> {
    MetricName::ALL
        .iter()
        .map(|&metric_name| {
            let as_is_value = as_is.value(metric_name);
            let to_be_value = to_be.value(metric_name);
            let delta = as_is_value - to_be_value;
            Comparison {
                metric_name,
                as_is_value,
                to_be_value,
                delta,
                delta_percent: percent_of(delta, as_is_value),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(seconds: f64, meters: f64, cost: f64, emissions: f64) -> ScenarioMetrics {
        ScenarioMetrics {
            total_duration_seconds: seconds,
            total_distance_meters: meters,
            cost,
            emissions,
        }
    }

    #[test]
    fn test_compare_one_entry_per_metric() {
        let result = compare(&ScenarioMetrics::default(), &ScenarioMetrics::default());
        let names: Vec<MetricName> = result.iter().map(|c| c.metric_name).collect();
        assert_eq!(names, MetricName::ALL.to_vec());
    }

    #[test]
    fn test_compare_positive_delta_when_to_be_lower() {
        let as_is = metrics(3_600.0, 40_000.0, 60_000.0, 36.0);
        let to_be = metrics(2_700.0, 30_000.0, 45_000.0, 27.0);

        let result = compare(&as_is, &to_be);

        let distance = result.iter().find(|c| c.metric_name == MetricName::Distance).unwrap();
        assert_eq!(distance.as_is_value, 40.0);
        assert_eq!(distance.to_be_value, 30.0);
        assert_eq!(distance.delta, 10.0);
        assert!((distance.delta_percent - 25.0).abs() < 1e-9);

        for c in &result {
            assert!(c.delta > 0.0);
            assert!((c.delta_percent - 25.0).abs() < 1e-9, "{:?}", c);
        }
    }

    #[test]
    fn test_compare_negative_delta_when_to_be_worse() {
        let as_is = metrics(100.0, 1_000.0, 10.0, 1.0);
        let to_be = metrics(150.0, 1_000.0, 10.0, 1.0);

        let duration = compare(&as_is, &to_be)[0];
        assert_eq!(duration.metric_name, MetricName::Duration);
        assert_eq!(duration.delta, -50.0);
        assert!((duration.delta_percent - -50.0).abs() < 1e-9);
    }

    #[test]
    fn test_compare_zero_baseline_gives_zero_percent() {
        let as_is = ScenarioMetrics::default();
        let to_be = metrics(500.0, 2_000.0, 3.0, 0.4);

        for c in compare(&as_is, &to_be) {
            assert_eq!(c.delta_percent, 0.0);
            assert!(c.delta_percent.is_finite());
            assert!(c.delta <= 0.0);
        }
    }

    #[test]
    fn test_compare_does_not_mutate_inputs() {
        let as_is = metrics(10.0, 20.0, 30.0, 40.0);
        let to_be = metrics(1.0, 2.0, 3.0, 4.0);
        let (before_a, before_b) = (as_is, to_be);

        let _ = compare(&as_is, &to_be);

        assert_eq!(as_is, before_a);
        assert_eq!(to_be, before_b);
    }
}
