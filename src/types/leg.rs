//! Leg types

use serde::Serialize;

use super::{RouteGeometry, StopPoint};

/// One travel segment between two stops.
///
/// `resolved == false` marks a straight-line fallback produced when the
/// routing provider had no route for the pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Leg {
    pub origin: StopPoint,
    pub destination: StopPoint,
    /// Intermediate stops in visiting order (combined optimizer legs only)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub via: Vec<StopPoint>,
    pub path: RouteGeometry,
    pub duration_seconds: f64,
    pub distance_meters: f64,
    pub resolved: bool,
    /// Drive distance carried by the source dataset, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorded_distance_meters: Option<f64>,
}

impl Leg {
    /// Every stop this leg touches, in order
    pub fn stops(&self) -> impl Iterator<Item = &StopPoint> {
        std::iter::once(&self.origin)
            .chain(self.via.iter())
            .chain(std::iter::once(&self.destination))
    }

    pub fn distance_km(&self) -> f64 {
        self.distance_meters / 1000.0
    }
}
