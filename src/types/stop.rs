//! Stop point types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Valid WGS-84 position (finite, lat within ±90, lng within ±180)
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// GeoJSON position order
    pub fn to_lng_lat(self) -> [f64; 2] {
        [self.lng, self.lat]
    }
}

/// Role of a stop within a collection run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopRole {
    /// Livestock collection origin ("C" in source datasets)
    Pickup,
    /// Shared destination, e.g. a processing facility ("D")
    Drop,
}

impl StopRole {
    pub const fn as_str(self) -> &'static str {
        match self {
            StopRole::Pickup => "pickup",
            StopRole::Drop => "drop",
        }
    }

    /// Parse the dataset role tag. Accepts the single-letter codes as well as
    /// the spelled-out names, case-insensitively.
    pub fn from_tag(tag: &str) -> Result<Self, StopPointError> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "c" | "pickup" => Ok(StopRole::Pickup),
            "d" | "drop" => Ok(StopRole::Drop),
            other => Err(StopPointError::UnknownRole(other.to_string())),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum StopPointError {
    #[error("unknown stop role tag '{0}'")]
    UnknownRole(String),

    #[error("stop {id}: invalid coordinates ({lat}, {lng})")]
    InvalidCoordinates { id: String, lat: f64, lng: f64 },

    #[error("stop {id}: drop points cannot carry a sequence index")]
    SequenceOnDrop { id: String },

    #[error("stop {id}: empty group key")]
    EmptyGroupKey { id: String },
}

/// A pickup or drop point belonging to one collection group.
///
/// Constructed only through [`StopPoint::new`], which validates role,
/// sequence and coordinates; fields are read through accessors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopPoint {
    id: String,
    coordinates: Coordinates,
    role: StopRole,
    group_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sequence_index: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    recorded_distance_meters: Option<f64>,
}

impl StopPoint {
    pub fn new(
        id: impl Into<String>,
        coordinates: Coordinates,
        role: StopRole,
        group_key: impl Into<String>,
        sequence_index: Option<i64>,
    ) -> Result<Self, StopPointError> {
        let id = id.into();
        let group_key = group_key.into();

        if !coordinates.is_valid() {
            return Err(StopPointError::InvalidCoordinates {
                id,
                lat: coordinates.lat,
                lng: coordinates.lng,
            });
        }
        if role == StopRole::Drop && sequence_index.is_some() {
            return Err(StopPointError::SequenceOnDrop { id });
        }
        if group_key.trim().is_empty() {
            return Err(StopPointError::EmptyGroupKey { id });
        }

        Ok(Self {
            id,
            coordinates,
            role,
            group_key,
            sequence_index,
            recorded_distance_meters: None,
        })
    }

    pub fn pickup(
        id: impl Into<String>,
        coordinates: Coordinates,
        group_key: impl Into<String>,
        sequence_index: Option<i64>,
    ) -> Result<Self, StopPointError> {
        Self::new(id, coordinates, StopRole::Pickup, group_key, sequence_index)
    }

    pub fn drop_point(
        id: impl Into<String>,
        coordinates: Coordinates,
        group_key: impl Into<String>,
    ) -> Result<Self, StopPointError> {
        Self::new(id, coordinates, StopRole::Drop, group_key, None)
    }

    /// Attach the dataset's pre-computed drive distance (meters).
    /// Non-finite or negative values are ignored.
    pub fn with_recorded_distance(mut self, meters: Option<f64>) -> Self {
        self.recorded_distance_meters = meters.filter(|m| m.is_finite() && *m >= 0.0);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn coordinates(&self) -> Coordinates {
        self.coordinates
    }

    pub fn role(&self) -> StopRole {
        self.role
    }

    pub fn group_key(&self) -> &str {
        &self.group_key
    }

    pub fn sequence_index(&self) -> Option<i64> {
        self.sequence_index
    }

    pub fn recorded_distance_meters(&self) -> Option<f64> {
        self.recorded_distance_meters
    }

    pub fn is_pickup(&self) -> bool {
        self.role == StopRole::Pickup
    }

    pub fn is_drop(&self) -> bool {
        self.role == StopRole::Drop
    }
}
