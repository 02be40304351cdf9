//! Mapbox Directions / Optimization client
//!
//! API documentation:
//! https://docs.mapbox.com/api/navigation/directions/
//! https://docs.mapbox.com/api/navigation/optimization-v1/

use std::str::FromStr;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{decode_polyline, ProviderRoute, RouteLookup, RouteProvider, RoutingError};
use crate::types::{Coordinates, RouteGeometry};

const PROVIDER: &str = "Mapbox";

/// Optimization API v1 coordinate limit
const MAX_OPTIMIZATION_WAYPOINTS: usize = 12;

/// Response geometry encoding (`geometries` parameter)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryFormat {
    GeoJson,
    Polyline,
    Polyline6,
}

impl GeometryFormat {
    pub const fn as_str(self) -> &'static str {
        match self {
            GeometryFormat::GeoJson => "geojson",
            GeometryFormat::Polyline => "polyline",
            GeometryFormat::Polyline6 => "polyline6",
        }
    }

    fn precision(self) -> u32 {
        match self {
            GeometryFormat::Polyline6 => 6,
            _ => 5,
        }
    }
}

impl FromStr for GeometryFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "geojson" => Ok(GeometryFormat::GeoJson),
            "polyline" => Ok(GeometryFormat::Polyline),
            "polyline6" => Ok(GeometryFormat::Polyline6),
            other => anyhow::bail!("unknown geometry format '{}'", other),
        }
    }
}

/// Path detail returned (`overview` parameter)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overview {
    Full,
    Simplified,
    /// No geometry at all
    False,
}

impl Overview {
    pub const fn as_str(self) -> &'static str {
        match self {
            Overview::Full => "full",
            Overview::Simplified => "simplified",
            Overview::False => "false",
        }
    }
}

impl FromStr for Overview {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(Overview::Full),
            "simplified" => Ok(Overview::Simplified),
            "false" | "none" => Ok(Overview::False),
            other => anyhow::bail!("unknown overview '{}'", other),
        }
    }
}

/// Mapbox client configuration
#[derive(Debug, Clone)]
pub struct MapboxConfig {
    /// API base URL (e.g., "https://api.mapbox.com")
    pub base_url: String,
    /// Routing profile, e.g. "mapbox/driving"
    pub profile: String,
    /// Public or secret access token
    pub access_token: String,
    pub geometries: GeometryFormat,
    pub overview: Overview,
    /// Request turn-by-turn steps
    pub steps: bool,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for MapboxConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.mapbox.com".to_string(),
            profile: "mapbox/driving".to_string(),
            access_token: String::new(),
            geometries: GeometryFormat::GeoJson,
            overview: Overview::Simplified,
            steps: false,
            timeout_seconds: 30,
        }
    }
}

impl MapboxConfig {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            ..Default::default()
        }
    }
}

/// Mapbox routing client
pub struct MapboxClient {
    client: Client,
    config: MapboxConfig,
}

impl MapboxClient {
    pub fn new(config: MapboxConfig) -> Result<Self, RoutingError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|source| RoutingError::ClientBuild { provider: PROVIDER, source })?;

        Ok(Self { client, config })
    }

    /// `{lng},{lat};{lng},{lat};...`
    fn coordinate_path(locations: &[Coordinates]) -> String {
        locations
            .iter()
            .map(|c| format!("{},{}", c.lng, c.lat))
            .collect::<Vec<_>>()
            .join(";")
    }

    pub fn directions_url(&self, locations: &[Coordinates]) -> String {
        format!(
            "{}/directions/v5/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.profile,
            Self::coordinate_path(locations)
        )
    }

    pub fn optimization_url(&self, locations: &[Coordinates]) -> String {
        format!(
            "{}/optimized-trips/v1/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.profile,
            Self::coordinate_path(locations)
        )
    }

    /// Query parameters shared by both endpoints
    fn common_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("geometries", self.config.geometries.as_str().to_string()),
            ("overview", self.config.overview.as_str().to_string()),
            ("steps", self.config.steps.to_string()),
            ("access_token", self.config.access_token.clone()),
        ]
    }

    fn optimization_params(&self) -> Vec<(&'static str, String)> {
        let mut params = self.common_params();
        params.push(("source", "first".to_string()));
        params.push(("destination", "last".to_string()));
        params.push(("roundtrip", "false".to_string()));
        params
    }

    /// GET `url` and decode the body. Non-2xx answers are the provider
    /// declining the request and come back as `Err(reason)`.
    async fn fetch<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&'static str, String)],
    ) -> Result<Result<T, String>, RoutingError> {
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| RoutingError::from_reqwest(PROVIDER, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or(body);
            warn!("Mapbox returned error {} for {}: {}", status, url, message);
            return Ok(Err(format!("HTTP {}: {}", status.as_u16(), message)));
        }

        let body = response
            .json::<T>()
            .await
            .map_err(|e| RoutingError::from_reqwest(PROVIDER, e))?;
        Ok(Ok(body))
    }

    fn decode_geometry(&self, geometry: Option<ResponseGeometry>) -> Result<RouteGeometry, RoutingError> {
        match geometry {
            None => Ok(RouteGeometry::empty()),
            Some(ResponseGeometry::LineString { coordinates }) => Ok(RouteGeometry { coordinates }),
            Some(ResponseGeometry::Encoded(encoded)) => {
                let coordinates = decode_polyline(&encoded, self.config.geometries.precision())
                    .map_err(|e| RoutingError::MalformedResponse {
                        provider: PROVIDER,
                        message: e.to_string(),
                    })?;
                Ok(RouteGeometry { coordinates })
            }
        }
    }

    fn directions_lookup(&self, response: DirectionsResponse) -> Result<RouteLookup, RoutingError> {
        let Some(best) = response.routes.into_iter().next() else {
            return Ok(RouteLookup::NoRoute {
                reason: response
                    .message
                    .or(response.code)
                    .unwrap_or_else(|| "empty route list".to_string()),
            });
        };

        Ok(RouteLookup::Found(ProviderRoute {
            geometry: self.decode_geometry(best.geometry)?,
            duration_seconds: best.duration,
            distance_meters: best.distance,
            waypoint_order: vec![],
        }))
    }

    fn optimization_lookup(
        &self,
        response: OptimizationResponse,
        waypoint_count: usize,
    ) -> Result<RouteLookup, RoutingError> {
        let Some(trip) = response.trips.into_iter().next() else {
            return Ok(RouteLookup::NoRoute {
                reason: response
                    .message
                    .or(response.code)
                    .unwrap_or_else(|| "empty trip list".to_string()),
            });
        };

        if response.waypoints.len() != waypoint_count {
            return Err(RoutingError::MalformedResponse {
                provider: PROVIDER,
                message: format!(
                    "expected {} waypoints, got {}",
                    waypoint_count,
                    response.waypoints.len()
                ),
            });
        }

        // waypoints[i].waypoint_index is the position of input i in the trip
        let mut order: Vec<usize> = (0..waypoint_count).collect();
        order.sort_by_key(|&i| response.waypoints[i].waypoint_index);

        Ok(RouteLookup::Found(ProviderRoute {
            geometry: self.decode_geometry(trip.geometry)?,
            duration_seconds: trip.duration,
            distance_meters: trip.distance,
            waypoint_order: order,
        }))
    }
}

#[async_trait]
impl RouteProvider for MapboxClient {
    async fn route(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<RouteLookup, RoutingError> {
        let locations = [origin, destination];
        let url = self.directions_url(&locations);

        debug!("Requesting Mapbox directions {}", url);

        match self.fetch::<DirectionsResponse>(&url, &self.common_params()).await? {
            Ok(response) => self.directions_lookup(response),
            Err(reason) => Ok(RouteLookup::NoRoute { reason }),
        }
    }

    async fn optimized_trip(&self, waypoints: &[Coordinates]) -> Result<RouteLookup, RoutingError> {
        if waypoints.len() < 2 {
            return Ok(RouteLookup::NoRoute {
                reason: "optimized trip needs at least two waypoints".to_string(),
            });
        }
        if waypoints.len() > MAX_OPTIMIZATION_WAYPOINTS {
            return Ok(RouteLookup::NoRoute {
                reason: format!(
                    "{} waypoints exceed the optimization limit of {}",
                    waypoints.len(),
                    MAX_OPTIMIZATION_WAYPOINTS
                ),
            });
        }

        let url = self.optimization_url(waypoints);

        debug!("Requesting Mapbox optimized trip for {} waypoints", waypoints.len());

        match self.fetch::<OptimizationResponse>(&url, &self.optimization_params()).await? {
            Ok(response) => self.optimization_lookup(response, waypoints.len()),
            Err(reason) => Ok(RouteLookup::NoRoute { reason }),
        }
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

// Mapbox API types

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ResponseGeometry {
    /// `geometries=geojson`
    LineString { coordinates: Vec<[f64; 2]> },
    /// `geometries=polyline|polyline6`
    Encoded(String),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    /// Seconds
    duration: f64,
    /// Meters
    distance: f64,
    #[serde(default)]
    geometry: Option<ResponseGeometry>,
}

#[derive(Debug, Deserialize)]
struct OptimizationResponse {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    waypoints: Vec<OptimizedWaypoint>,
    #[serde(default)]
    trips: Vec<OptimizedTrip>,
}

#[derive(Debug, Deserialize)]
struct OptimizedWaypoint {
    waypoint_index: usize,
}

#[derive(Debug, Deserialize)]
struct OptimizedTrip {
    duration: f64,
    distance: f64,
    #[serde(default)]
    geometry: Option<ResponseGeometry>,
}
