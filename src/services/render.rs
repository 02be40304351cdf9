//! Map rendering helpers
//!
//! Produces a GeoJSON FeatureCollection that any web map can draw: stop
//! markers plus one line per leg. Degraded (straight-line) legs are marked
//! dashed. Nothing here holds state.

use serde::Serialize;
use serde_json::{json, Value};

use crate::services::consolidation::{GroupReport, ScenarioOutcome};
use crate::types::{Coordinates, Leg, Scenario, StopPoint, StopRole};

/// Leg line palette, cycled by leg index
const LEG_PALETTE: [&str; 8] = [
    "#1f77b4", "#ff7f0e", "#9467bd", "#8c564b", "#e377c2", "#17becf", "#bcbd22", "#7f7f7f",
];

const PICKUP_COLOR: &str = "green";
const DROP_COLOR: &str = "red";

/// Line color for the `index`-th leg
pub fn color_for_index(index: usize) -> &'static str {
    LEG_PALETTE[index % LEG_PALETTE.len()]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LegStyle {
    Solid,
    /// Straight-line fallback
    Dashed,
}

pub fn leg_style(leg: &Leg) -> LegStyle {
    if leg.resolved {
        LegStyle::Solid
    } else {
        LegStyle::Dashed
    }
}

/// Mean position of the points, `None` for an empty group
pub fn group_center<'a>(points: impl IntoIterator<Item = &'a StopPoint>) -> Option<Coordinates> {
    let (count, lat, lng) = points.into_iter().fold((0usize, 0.0, 0.0), |(n, lat, lng), p| {
        let c = p.coordinates();
        (n + 1, lat + c.lat, lng + c.lng)
    });
    if count == 0 {
        return None;
    }
    let n = count as f64;
    Some(Coordinates::new(lat / n, lng / n))
}

/// Marker label: "C<seq>" / "C" for pickups, "D" for drops
pub fn stop_label(stop: &StopPoint) -> String {
    match (stop.role(), stop.sequence_index()) {
        (StopRole::Pickup, Some(seq)) => format!("C{}", seq),
        (StopRole::Pickup, None) => "C".to_string(),
        (StopRole::Drop, _) => "D".to_string(),
    }
}

fn stop_feature(stop: &StopPoint) -> Value {
    let color = match stop.role() {
        StopRole::Pickup => PICKUP_COLOR,
        StopRole::Drop => DROP_COLOR,
    };
    json!({
        "type": "Feature",
        "geometry": {
            "type": "Point",
            "coordinates": stop.coordinates().to_lng_lat(),
        },
        "properties": {
            "kind": "stop",
            "id": stop.id(),
            "role": stop.role().as_str(),
            "label": stop_label(stop),
            "color": color,
        },
    })
}

fn leg_feature(index: usize, leg: &Leg) -> Value {
    let style = leg_style(leg);
    let dash_array = match style {
        LegStyle::Dashed => Some("6 6"),
        LegStyle::Solid => None,
    };
    let tooltip = leg
        .stops()
        .map(stop_label)
        .collect::<Vec<_>>()
        .join(" → ");

    json!({
        "type": "Feature",
        "geometry": {
            "type": "LineString",
            "coordinates": leg.path.coordinates,
        },
        "properties": {
            "kind": "leg",
            "index": index,
            "from": leg.origin.id(),
            "to": leg.destination.id(),
            "tooltip": tooltip,
            "color": color_for_index(index),
            "style": style,
            "dashArray": dash_array,
            "resolved": leg.resolved,
            "durationSeconds": leg.duration_seconds,
            "distanceMeters": leg.distance_meters,
        },
    })
}

/// GeoJSON FeatureCollection for a scenario: every stop once, then the legs
pub fn scenario_to_geojson(group_key: &str, scenario: &Scenario) -> Value {
    let mut stops: Vec<&StopPoint> = Vec::new();
    for stop in scenario.legs.iter().flat_map(|leg| leg.stops()) {
        if !stops.iter().any(|s| s.id() == stop.id()) {
            stops.push(stop);
        }
    }

    let center = group_center(stops.iter().copied());

    let features: Vec<Value> = stops
        .iter()
        .map(|s| stop_feature(s))
        .chain(scenario.legs.iter().enumerate().map(|(i, leg)| leg_feature(i, leg)))
        .collect();

    json!({
        "type": "FeatureCollection",
        "properties": {
            "name": format!("{} {}", scenario.kind.label(), group_key),
            "center": center.map(|c| [c.lat, c.lng]),
        },
        "features": features,
    })
}

fn outcome_line(outcome: &ScenarioOutcome, label: &str) -> String {
    match outcome {
        ScenarioOutcome::Computed { scenario, metrics } => format!(
            "{}: {} legs ({} straight-line), {:.1} km, {:.1} min",
            label,
            scenario.legs.len(),
            scenario.unresolved_count(),
            metrics.total_distance_km(),
            metrics.total_duration_minutes()
        ),
        ScenarioOutcome::Failed { error, .. } => format!("{}: failed: {}", label, error),
    }
}

/// Plain-text summary of a group report
pub fn report_table(report: &GroupReport) -> String {
    let mut out = format!("Group {}\n", report.group_key);
    out.push_str(&outcome_line(&report.as_is, "AS-IS"));
    out.push('\n');
    out.push_str(&outcome_line(&report.to_be, "TO-BE"));
    out.push('\n');

    let Some(comparison) = &report.comparison else {
        out.push_str("No comparison: a scenario failed\n");
        return out;
    };

    out.push_str(&format!(
        "\n{:<18}{:>14}{:>14}{:>14}{:>10}\n",
        "metric", "AS-IS", "TO-BE", "delta", "delta %"
    ));
    for c in comparison {
        let name = match c.metric_name.unit() {
            "" => c.metric_name.as_str().to_string(),
            unit => format!("{} ({})", c.metric_name.as_str(), unit),
        };
        out.push_str(&format!(
            "{:<18}{:>14.1}{:>14.1}{:>14.1}{:>9.1}%\n",
            name, c.as_is_value, c.to_be_value, c.delta, c.delta_percent
        ));
    }
    out
}
