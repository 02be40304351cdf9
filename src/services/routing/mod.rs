//! Routing providers for single-leg routes and optimized multi-stop trips
//!
//! Uses Mapbox or Valhalla in production, mock for tests and offline runs.

mod mapbox;
mod polyline;
mod valhalla;

pub use mapbox::{GeometryFormat, MapboxClient, MapboxConfig, Overview};
pub use polyline::{decode_polyline, PolylineError};
pub use valhalla::{ValhallaClient, ValhallaConfig};

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::services::geo;
use crate::types::{Coordinates, RouteGeometry};

/// Best route candidate returned by a provider
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRoute {
    pub geometry: RouteGeometry,
    pub duration_seconds: f64,
    pub distance_meters: f64,
    /// Input waypoint indices in visiting order. Filled by optimized trips,
    /// empty for single-leg routes.
    pub waypoint_order: Vec<usize>,
}

/// Outcome of a provider query that reached the provider and got an answer
#[derive(Debug, Clone, PartialEq)]
pub enum RouteLookup {
    Found(ProviderRoute),
    /// The provider answered but has no usable route (non-2xx status or an
    /// empty candidate list)
    NoRoute { reason: String },
}

/// Transport-level failure talking to a routing provider
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("{provider} request failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} request timed out")]
    Timeout { provider: &'static str },

    #[error("{provider} returned a malformed response: {message}")]
    MalformedResponse {
        provider: &'static str,
        message: String,
    },

    #[error("failed to create HTTP client for {provider}: {source}")]
    ClientBuild {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl RoutingError {
    /// The request URL is stripped: Mapbox carries the access token in the query
    pub(crate) fn from_reqwest(provider: &'static str, source: reqwest::Error) -> Self {
        let source = source.without_url();
        if source.is_timeout() {
            RoutingError::Timeout { provider }
        } else if source.is_decode() {
            RoutingError::MalformedResponse {
                provider,
                message: source.to_string(),
            }
        } else {
            RoutingError::Transport { provider, source }
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, RoutingError::Timeout { .. })
    }
}

/// Routing provider abstraction (Mapbox, Valhalla, mock)
#[async_trait]
pub trait RouteProvider: Send + Sync {
    /// Driving route between two points; the first candidate wins
    async fn route(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<RouteLookup, RoutingError>;

    /// Optimized open trip over `waypoints`: the first waypoint is fixed as
    /// source, the last as destination, no return leg
    async fn optimized_trip(&self, waypoints: &[Coordinates]) -> Result<RouteLookup, RoutingError>;

    /// Get service name for logging
    fn name(&self) -> &str;
}

/// Mock routing service for tests and offline runs
/// Uses Haversine distance × road coefficient at the average speed
#[derive(Debug, Default)]
pub struct MockRoutingService;

impl MockRoutingService {
    pub fn new() -> Self {
        Self
    }

    fn estimate(&self, points: &[Coordinates], waypoint_order: Vec<usize>) -> ProviderRoute {
        let road_km = geo::polyline_length_km(points) * geo::ROAD_COEFFICIENT;
        ProviderRoute {
            geometry: RouteGeometry::from_coordinates(points),
            duration_seconds: geo::travel_time_seconds(road_km, geo::AVERAGE_SPEED_KMH),
            distance_meters: road_km * 1000.0,
            waypoint_order,
        }
    }
}

#[async_trait]
impl RouteProvider for MockRoutingService {
    async fn route(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<RouteLookup, RoutingError> {
        Ok(RouteLookup::Found(self.estimate(&[origin, destination], vec![])))
    }

    async fn optimized_trip(&self, waypoints: &[Coordinates]) -> Result<RouteLookup, RoutingError> {
        if waypoints.len() < 2 {
            return Ok(RouteLookup::NoRoute {
                reason: "optimized trip needs at least two waypoints".to_string(),
            });
        }
        // The mock keeps the submitted order
        let order = (0..waypoints.len()).collect();
        Ok(RouteLookup::Found(self.estimate(waypoints, order)))
    }

    fn name(&self) -> &str {
        "MockRouting"
    }
}

/// Which routing backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingBackend {
    Mapbox,
    Valhalla,
    Mock,
}

impl FromStr for RoutingBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mapbox" => Ok(RoutingBackend::Mapbox),
            "valhalla" => Ok(RoutingBackend::Valhalla),
            "mock" => Ok(RoutingBackend::Mock),
            other => anyhow::bail!("unknown routing backend '{}' (expected mapbox, valhalla or mock)", other),
        }
    }
}

/// Fully resolved provider settings
#[derive(Debug, Clone)]
pub enum ProviderSettings {
    Mapbox(MapboxConfig),
    Valhalla(ValhallaConfig),
    Mock,
}

/// Create routing provider based on configuration
pub fn create_route_provider(settings: ProviderSettings) -> Result<Arc<dyn RouteProvider>, RoutingError> {
    Ok(match settings {
        ProviderSettings::Mapbox(cfg) => Arc::new(MapboxClient::new(cfg)?),
        ProviderSettings::Valhalla(cfg) => Arc::new(ValhallaClient::new(cfg)?),
        ProviderSettings::Mock => Arc::new(MockRoutingService::new()),
    })
}

/// Create routing provider, falling back to the mock service when the
/// configured backend cannot be used.
///
/// Valhalla is probed with a status request first; a Mapbox client without
/// an access token is never created.
pub async fn create_route_provider_with_fallback(settings: ProviderSettings) -> Arc<dyn RouteProvider> {
    match &settings {
        ProviderSettings::Mapbox(cfg) if cfg.access_token.trim().is_empty() => {
            warn!("Mapbox selected but no access token configured. Falling back to mock routing.");
            return Arc::new(MockRoutingService::new());
        }
        ProviderSettings::Valhalla(cfg) => {
            if let Err(e) = check_valhalla_health(cfg).await {
                warn!("Valhalla not available at {}: {}. Falling back to mock routing.", cfg.base_url, e);
                return Arc::new(MockRoutingService::new());
            }
            info!("Valhalla routing service available at {}", cfg.base_url);
        }
        _ => {}
    }

    match create_route_provider(settings) {
        Ok(provider) => {
            info!("Using {} routing provider", provider.name());
            provider
        }
        Err(e) => {
            warn!("{}. Falling back to mock routing.", e);
            Arc::new(MockRoutingService::new())
        }
    }
}

/// Check if Valhalla is healthy by making a simple status request
async fn check_valhalla_health(config: &ValhallaConfig) -> anyhow::Result<()> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()?;

    let url = format!("{}/status", config.base_url);
    let response = client.get(&url).send().await?;

    if response.status().is_success() {
        Ok(())
    } else {
        anyhow::bail!("Valhalla returned status {}", response.status())
    }
}
