//! Valhalla routing engine client
//!
//! Valhalla API documentation:
//! https://valhalla.github.io/valhalla/api/turn-by-turn/api-reference/
//! https://valhalla.github.io/valhalla/api/optimized/api-reference/

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{decode_polyline, ProviderRoute, RouteLookup, RouteProvider, RoutingError};
use crate::types::{Coordinates, RouteGeometry};

const PROVIDER: &str = "Valhalla";

/// Valhalla client configuration
#[derive(Debug, Clone)]
pub struct ValhallaConfig {
    /// Base URL of Valhalla server (e.g., "http://localhost:8002")
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Request maneuver instructions in addition to the shape
    pub steps: bool,
}

impl Default for ValhallaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8002".to_string(),
            timeout_seconds: 30,
            steps: false,
        }
    }
}

impl ValhallaConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }
}

/// Valhalla routing client
pub struct ValhallaClient {
    client: Client,
    config: ValhallaConfig,
}

impl ValhallaClient {
    pub fn new(config: ValhallaConfig) -> Result<Self, RoutingError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|source| RoutingError::ClientBuild { provider: PROVIDER, source })?;

        Ok(Self { client, config })
    }

    /// Build the route request; also used for `/optimized_route`, which keeps
    /// the first and last location fixed
    pub fn build_route_request(&self, locations: &[Coordinates]) -> RouteRequest {
        let locs: Vec<ValhallaLocation> = locations
            .iter()
            .map(|c| ValhallaLocation {
                lat: c.lat,
                lon: c.lng,
                // 500m radius – farm coordinates are often a barn centroid
                // well off the public road
                radius: Some(500),
            })
            .collect();

        RouteRequest {
            locations: locs,
            costing: "truck".to_string(),
            units: "kilometers".to_string(),
            directions_type: if self.config.steps { "instructions" } else { "none" }.to_string(),
        }
    }

    async fn post_route(&self, endpoint: &str, locations: &[Coordinates]) -> Result<RouteLookup, RoutingError> {
        let request = self.build_route_request(locations);
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint);

        debug!("Requesting {} from Valhalla for {} locations", endpoint, locations.len());

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RoutingError::from_reqwest(PROVIDER, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            warn!("Valhalla {} returned error {}: {}", endpoint, status, message);
            return Ok(RouteLookup::NoRoute {
                reason: format!("HTTP {}: {}", status.as_u16(), message),
            });
        }

        let route_response: RouteResponse = response
            .json()
            .await
            .map_err(|e| RoutingError::from_reqwest(PROVIDER, e))?;

        route_lookup(route_response)
    }
}

/// Convert a trip into the provider-neutral lookup
fn route_lookup(route_response: RouteResponse) -> Result<RouteLookup, RoutingError> {
    let trip = route_response.trip;
    if trip.legs.is_empty() {
        return Ok(RouteLookup::NoRoute {
            reason: "trip has no legs".to_string(),
        });
    }

    // Extract and concatenate geometry from ALL legs
    let mut all_coordinates: Vec<[f64; 2]> = Vec::new();
    for (i, leg) in trip.legs.iter().enumerate() {
        let leg_coords = decode_polyline(&leg.shape, 6).map_err(|e| RoutingError::MalformedResponse {
            provider: PROVIDER,
            message: e.to_string(),
        })?;

        // Skip the first point of subsequent legs (it's the same as last point of previous leg)
        if i == 0 {
            all_coordinates.extend(leg_coords);
        } else {
            all_coordinates.extend(leg_coords.into_iter().skip(1));
        }
    }

    let waypoint_order = trip
        .locations
        .iter()
        .filter_map(|loc| loc.original_index)
        .collect();

    debug!(
        "Received route with {} points from {} legs",
        all_coordinates.len(),
        trip.legs.len()
    );

    Ok(RouteLookup::Found(ProviderRoute {
        geometry: RouteGeometry { coordinates: all_coordinates },
        duration_seconds: trip.summary.time,
        // Convert km to meters
        distance_meters: trip.summary.length * 1000.0,
        waypoint_order,
    }))
}

#[async_trait]
impl RouteProvider for ValhallaClient {
    async fn route(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<RouteLookup, RoutingError> {
        match self.post_route("route", &[origin, destination]).await? {
            RouteLookup::Found(mut route) => {
                route.waypoint_order.clear();
                Ok(RouteLookup::Found(route))
            }
            no_route => Ok(no_route),
        }
    }

    async fn optimized_trip(&self, waypoints: &[Coordinates]) -> Result<RouteLookup, RoutingError> {
        if waypoints.len() < 2 {
            return Ok(RouteLookup::NoRoute {
                reason: "optimized trip needs at least two waypoints".to_string(),
            });
        }

        match self.post_route("optimized_route", waypoints).await? {
            RouteLookup::Found(mut route) => {
                if route.waypoint_order.len() != waypoints.len() {
                    // Older servers omit original_index; the submitted order stands
                    route.waypoint_order = (0..waypoints.len()).collect();
                }
                Ok(RouteLookup::Found(route))
            }
            no_route => Ok(no_route),
        }
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

// Valhalla API types

#[derive(Debug, Serialize, Clone)]
struct ValhallaLocation {
    lat: f64,
    lon: f64,
    /// Radius in meters for snapping to roads
    #[serde(skip_serializing_if = "Option::is_none")]
    radius: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct RouteRequest {
    locations: Vec<ValhallaLocation>,
    costing: String,
    units: String,
    directions_type: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Deserialize)]
struct RouteResponse {
    trip: Trip,
}

#[derive(Debug, Deserialize)]
struct Trip {
    #[serde(default)]
    locations: Vec<TripLocation>,
    #[serde(default)]
    legs: Vec<Leg>,
    summary: Summary,
}

#[derive(Debug, Deserialize)]
struct TripLocation {
    #[serde(default)]
    original_index: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct Leg {
    /// Encoded polyline shape
    shape: String,
}

#[derive(Debug, Deserialize)]
struct Summary {
    /// Kilometers (units="kilometers")
    length: f64,
    /// Seconds
    time: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valhalla_config_default() {
        let config = ValhallaConfig::default();
        assert_eq!(config.base_url, "http://localhost:8002");
        assert_eq!(config.timeout_seconds, 30);
        assert!(!config.steps);
    }

    #[test]
    fn test_valhalla_config_custom() {
        let config = ValhallaConfig::new("http://valhalla:8002");
        assert_eq!(config.base_url, "http://valhalla:8002");
    }

    #[test]
    fn test_valhalla_client_name() {
        let client = ValhallaClient::new(ValhallaConfig::default()).unwrap();
        assert_eq!(client.name(), "Valhalla");
    }

    #[test]
    fn test_build_route_request() {
        let client = ValhallaClient::new(ValhallaConfig::default()).unwrap();

        let locations = vec![
            Coordinates { lat: 37.50, lng: 127.00 },
            Coordinates { lat: 37.55, lng: 127.10 },
            Coordinates { lat: 37.60, lng: 127.20 },
        ];

        let request = client.build_route_request(&locations);

        assert_eq!(request.locations.len(), 3);
        assert_eq!(request.costing, "truck");
        assert_eq!(request.units, "kilometers");
        assert_eq!(request.directions_type, "none");

        assert!((request.locations[0].lat - 37.50).abs() < 0.0001);
        assert!((request.locations[0].lon - 127.00).abs() < 0.0001);
        assert!((request.locations[2].lon - 127.20).abs() < 0.0001);
    }

    #[test]
    fn test_build_route_request_with_steps() {
        let mut config = ValhallaConfig::default();
        config.steps = true;
        let client = ValhallaClient::new(config).unwrap();

        let request = client.build_route_request(&[
            Coordinates { lat: 37.50, lng: 127.00 },
            Coordinates { lat: 37.60, lng: 127.20 },
        ]);
        assert_eq!(request.directions_type, "instructions");
    }

    #[test]
    fn test_route_lookup_joins_leg_shapes() {
        let json = r#"{
            "trip": {
                "locations": [{"original_index": 0}, {"original_index": 2}, {"original_index": 1}],
                "legs": [{"shape": "_p~iF~ps|U_ulLnnqC"}, {"shape": "_ulLnnqC_mqNvxq`@"}],
                "summary": {"length": 12.5, "time": 900.0}
            }
        }"#;
        let response: RouteResponse = serde_json::from_str(json).unwrap();

        let RouteLookup::Found(route) = route_lookup(response).unwrap() else {
            panic!("expected a route");
        };

        // 2 + 2 points, shared joint counted once
        assert_eq!(route.geometry.len(), 3);
        assert_eq!(route.distance_meters, 12_500.0);
        assert_eq!(route.duration_seconds, 900.0);
        assert_eq!(route.waypoint_order, vec![0, 2, 1]);
    }

    #[test]
    fn test_route_lookup_without_legs_is_no_route() {
        let json = r#"{"trip": {"legs": [], "summary": {"length": 0.0, "time": 0.0}}}"#;
        let response: RouteResponse = serde_json::from_str(json).unwrap();

        assert!(matches!(route_lookup(response).unwrap(), RouteLookup::NoRoute { .. }));
    }

    #[tokio::test]
    #[ignore = "Requires running Valhalla server"]
    async fn test_valhalla_integration_route() {
        let client = ValhallaClient::new(ValhallaConfig::new("http://localhost:8002")).unwrap();

        let lookup = client
            .route(
                Coordinates { lat: 37.50, lng: 127.00 },
                Coordinates { lat: 37.60, lng: 127.20 },
            )
            .await
            .unwrap();

        let RouteLookup::Found(route) = lookup else {
            panic!("expected a route");
        };
        assert!(route.geometry.len() > 10);
        assert!(route.distance_meters > 15_000.0);
    }
}
