//! Leg resolution with straight-line fallback
//!
//! A provider answer of "no route" (or a timeout) never escapes this module:
//! it becomes a two-point (or waypoint-by-waypoint) straight leg flagged
//! `resolved = false`. Transport failures propagate unless the configured
//! policy says otherwise.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::services::geo;
use crate::services::routing::{RouteLookup, RouteProvider, RoutingError};
use crate::types::{Coordinates, Leg, RouteGeometry, StopPoint};

/// What to do with a transport failure (network error, malformed body)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportFailurePolicy {
    /// Surface the error to the scenario caller
    #[default]
    Propagate,
    /// Treat it like "no route" and draw a straight line
    Fallback,
}

impl FromStr for TransportFailurePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "propagate" => Ok(TransportFailurePolicy::Propagate),
            "fallback" => Ok(TransportFailurePolicy::Fallback),
            other => anyhow::bail!("unknown transport failure policy '{}'", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Speed used to estimate the duration of straight-line fallback legs
    pub fallback_speed_kmh: f64,
    pub transport_failure_policy: TransportFailurePolicy,
    /// Memoise single-leg lookups by coordinate pair
    pub cache_legs: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            fallback_speed_kmh: geo::AVERAGE_SPEED_KMH,
            transport_failure_policy: TransportFailurePolicy::Propagate,
            cache_legs: true,
        }
    }
}

/// Bit-exact coordinate pair
type LegKey = [u64; 4];

fn leg_key(origin: Coordinates, destination: Coordinates) -> LegKey {
    [
        origin.lat.to_bits(),
        origin.lng.to_bits(),
        destination.lat.to_bits(),
        destination.lng.to_bits(),
    ]
}

/// Provider answers keyed by coordinate pair. Errors are never stored.
#[derive(Default)]
struct LegCache {
    entries: Mutex<HashMap<LegKey, RouteLookup>>,
}

impl LegCache {
    fn get(&self, key: &LegKey) -> Option<RouteLookup> {
        self.entries.lock().get(key).cloned()
    }

    fn insert(&self, key: LegKey, lookup: RouteLookup) {
        self.entries.lock().insert(key, lookup);
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

/// Resolves legs against a routing provider
pub struct LegResolver {
    provider: Arc<dyn RouteProvider>,
    config: ResolverConfig,
    cache: LegCache,
}

impl LegResolver {
    pub fn new(provider: Arc<dyn RouteProvider>, config: ResolverConfig) -> Self {
        Self {
            provider,
            config,
            cache: LegCache::default(),
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Number of memoised coordinate pairs
    pub fn cached_legs(&self) -> usize {
        self.cache.len()
    }

    /// Resolve a single leg from `origin` to `destination`
    pub async fn resolve(&self, origin: &StopPoint, destination: &StopPoint) -> Result<Leg, RoutingError> {
        let from = origin.coordinates();
        let to = destination.coordinates();

        if from == to {
            debug!("Leg {} -> {} has identical endpoints, zero length", origin.id(), destination.id());
            return Ok(Leg {
                origin: origin.clone(),
                destination: destination.clone(),
                via: vec![],
                path: RouteGeometry::from_coordinates(&[from, to]),
                duration_seconds: 0.0,
                distance_meters: 0.0,
                resolved: true,
                recorded_distance_meters: None,
            });
        }

        let key = leg_key(from, to);
        let cached = if self.config.cache_legs { self.cache.get(&key) } else { None };

        let lookup = match cached {
            Some(lookup) => {
                debug!("Leg {} -> {} served from cache", origin.id(), destination.id());
                lookup
            }
            None => match self.provider.route(from, to).await {
                Ok(lookup) => {
                    if self.config.cache_legs {
                        self.cache.insert(key, lookup.clone());
                    }
                    lookup
                }
                Err(e) if self.falls_back_on(&e) => {
                    warn!(
                        "{} failed for {} -> {}: {}. Using straight line.",
                        self.provider.name(),
                        origin.id(),
                        destination.id(),
                        e
                    );
                    return Ok(self.fallback_leg(origin, vec![], destination));
                }
                Err(e) => return Err(e),
            },
        };

        Ok(match lookup {
            RouteLookup::Found(route) => {
                let path = if route.geometry.is_empty() {
                    RouteGeometry::from_coordinates(&[from, to])
                } else {
                    route.geometry
                };
                Leg {
                    origin: origin.clone(),
                    destination: destination.clone(),
                    via: vec![],
                    path,
                    duration_seconds: route.duration_seconds,
                    distance_meters: route.distance_meters,
                    resolved: true,
                    recorded_distance_meters: None,
                }
            }
            RouteLookup::NoRoute { reason } => {
                warn!(
                    "No route from {} to {} ({}). Using straight line.",
                    origin.id(),
                    destination.id(),
                    reason
                );
                self.fallback_leg(origin, vec![], destination)
            }
        })
    }

    /// Resolve one combined leg through the trip optimizer. `origin` is
    /// fixed as source and `destination` as the trip end; `intermediate`
    /// stops are visited in the order the provider chooses.
    pub async fn resolve_trip(
        &self,
        origin: &StopPoint,
        intermediate: &[StopPoint],
        destination: &StopPoint,
    ) -> Result<Leg, RoutingError> {
        let waypoints: Vec<Coordinates> = std::iter::once(origin)
            .chain(intermediate.iter())
            .chain(std::iter::once(destination))
            .map(|s| s.coordinates())
            .collect();

        let lookup = match self.provider.optimized_trip(&waypoints).await {
            Ok(lookup) => lookup,
            Err(e) if self.falls_back_on(&e) => {
                warn!("{} trip optimization failed: {}. Using straight lines.", self.provider.name(), e);
                return Ok(self.fallback_leg(origin, intermediate.to_vec(), destination));
            }
            Err(e) => return Err(e),
        };

        Ok(match lookup {
            RouteLookup::Found(route) => {
                let via = visiting_order(&route.waypoint_order, intermediate);
                let path = if route.geometry.is_empty() {
                    let mut points = vec![origin.coordinates()];
                    points.extend(via.iter().map(|s| s.coordinates()));
                    points.push(destination.coordinates());
                    RouteGeometry::from_coordinates(&points)
                } else {
                    route.geometry
                };
                Leg {
                    origin: origin.clone(),
                    destination: destination.clone(),
                    via,
                    path,
                    duration_seconds: route.duration_seconds,
                    distance_meters: route.distance_meters,
                    resolved: true,
                    recorded_distance_meters: None,
                }
            }
            RouteLookup::NoRoute { reason } => {
                warn!("No optimized trip over {} waypoints ({}). Using straight lines.", waypoints.len(), reason);
                self.fallback_leg(origin, intermediate.to_vec(), destination)
            }
        })
    }

    fn falls_back_on(&self, error: &RoutingError) -> bool {
        error.is_timeout() || self.config.transport_failure_policy == TransportFailurePolicy::Fallback
    }

    /// Straight-line leg through the stops in the given order
    fn fallback_leg(&self, origin: &StopPoint, via: Vec<StopPoint>, destination: &StopPoint) -> Leg {
        let mut points = vec![origin.coordinates()];
        points.extend(via.iter().map(|s| s.coordinates()));
        points.push(destination.coordinates());

        let distance_km = geo::polyline_length_km(&points);

        Leg {
            origin: origin.clone(),
            destination: destination.clone(),
            via,
            path: RouteGeometry::from_coordinates(&points),
            duration_seconds: geo::travel_time_seconds(distance_km, self.config.fallback_speed_kmh),
            distance_meters: distance_km * 1000.0,
            resolved: false,
            recorded_distance_meters: None,
        }
    }
}

/// Map a provider visiting order over `[origin, intermediate.., destination]`
/// back to the intermediate stops. Falls back to the submitted order when the
/// provider's order does not cover every intermediate stop exactly once.
fn visiting_order(waypoint_order: &[usize], intermediate: &[StopPoint]) -> Vec<StopPoint> {
    let n = intermediate.len();
    let picked: Vec<usize> = waypoint_order
        .iter()
        .filter(|&&i| i >= 1 && i <= n)
        .map(|&i| i - 1)
        .collect();

    let mut seen = vec![false; n];
    let complete = picked.len() == n
        && picked.iter().all(|&i| !std::mem::replace(&mut seen[i], true));

    if complete {
        picked.into_iter().map(|i| intermediate[i].clone()).collect()
    } else {
        if !waypoint_order.is_empty() {
            warn!("Provider visiting order {:?} is incomplete, keeping submitted order", waypoint_order);
        }
        intermediate.to_vec()
    }
}
