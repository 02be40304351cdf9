//! In-process routing provider with scripted answers for tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::services::routing::{ProviderRoute, RouteLookup, RouteProvider, RoutingError};
use crate::types::{Coordinates, RouteGeometry};

const PROVIDER: &str = "Scripted";

#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Route { duration_seconds: f64, distance_meters: f64 },
    Trip { order: Vec<usize>, duration_seconds: f64, distance_meters: f64 },
    NoRoute,
    Timeout,
    Malformed,
}

/// Answers every request with `default` unless an origin/destination pair
/// has its own reply
pub struct ScriptedProvider {
    default: ScriptedReply,
    pairs: HashMap<[u64; 4], ScriptedReply>,
    delays: HashMap<[u64; 4], Duration>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn always(default: ScriptedReply) -> Self {
        Self {
            default,
            pairs: HashMap::new(),
            delays: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_pair(mut self, origin: Coordinates, destination: Coordinates, reply: ScriptedReply) -> Self {
        self.pairs.insert(key(origin, destination), reply);
        self
    }

    /// Hold the answer for an origin/destination pair
    pub fn with_delay(mut self, origin: Coordinates, destination: Coordinates, delay: Duration) -> Self {
        self.delays.insert(key(origin, destination), delay);
        self
    }

    /// Requests that reached the provider
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn answer(&self, reply: &ScriptedReply, points: &[Coordinates], trip: bool) -> Result<RouteLookup, RoutingError> {
        match reply {
            ScriptedReply::Route { duration_seconds, distance_meters } => {
                Ok(RouteLookup::Found(ProviderRoute {
                    geometry: bent_path(points),
                    duration_seconds: *duration_seconds,
                    distance_meters: *distance_meters,
                    waypoint_order: if trip { (0..points.len()).collect() } else { vec![] },
                }))
            }
            ScriptedReply::Trip { order, duration_seconds, distance_meters } => {
                Ok(RouteLookup::Found(ProviderRoute {
                    geometry: bent_path(points),
                    duration_seconds: *duration_seconds,
                    distance_meters: *distance_meters,
                    waypoint_order: if trip { order.clone() } else { vec![] },
                }))
            }
            ScriptedReply::NoRoute => Ok(RouteLookup::NoRoute {
                reason: "empty route list".to_string(),
            }),
            ScriptedReply::Timeout => Err(RoutingError::Timeout { provider: PROVIDER }),
            ScriptedReply::Malformed => Err(RoutingError::MalformedResponse {
                provider: PROVIDER,
                message: "unexpected end of JSON".to_string(),
            }),
        }
    }
}

fn key(origin: Coordinates, destination: Coordinates) -> [u64; 4] {
    [
        origin.lat.to_bits(),
        origin.lng.to_bits(),
        destination.lat.to_bits(),
        destination.lng.to_bits(),
    ]
}

/// Input points with a midpoint inserted after the first one, so a resolved
/// path is distinguishable from a straight fallback
fn bent_path(points: &[Coordinates]) -> RouteGeometry {
    let mut coords = Vec::with_capacity(points.len() + 1);
    for (i, p) in points.iter().enumerate() {
        coords.push(*p);
        if i == 0 {
            if let Some(next) = points.get(1) {
                coords.push(Coordinates::new((p.lat + next.lat) / 2.0, (p.lng + next.lng) / 2.0 + 0.001));
            }
        }
    }
    RouteGeometry::from_coordinates(&coords)
}

#[async_trait]
impl RouteProvider for ScriptedProvider {
    async fn route(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<RouteLookup, RoutingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let pair = key(origin, destination);
        if let Some(delay) = self.delays.get(&pair) {
            tokio::time::sleep(*delay).await;
        }
        let reply = self.pairs.get(&pair).unwrap_or(&self.default);
        self.answer(reply, &[origin, destination], false)
    }

    async fn optimized_trip(&self, waypoints: &[Coordinates]) -> Result<RouteLookup, RoutingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer(&self.default, waypoints, true)
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}
