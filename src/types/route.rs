//! Route geometry types

use serde::Serialize;

use super::Coordinates;

/// Route geometry as GeoJSON coordinates
/// Coordinates are in [longitude, latitude] order (GeoJSON standard)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteGeometry {
    /// Array of [lng, lat] coordinates forming the route polyline
    pub coordinates: Vec<[f64; 2]>,
}

impl RouteGeometry {
    /// Create empty geometry
    pub fn empty() -> Self {
        Self { coordinates: vec![] }
    }

    /// Create geometry from a list of coordinates (straight lines)
    pub fn from_coordinates(coords: &[Coordinates]) -> Self {
        Self {
            coordinates: coords.iter().map(|c| c.to_lng_lat()).collect(),
        }
    }

    /// Check if geometry is empty
    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.coordinates.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_coordinates_uses_lng_lat_order() {
        let geometry = RouteGeometry::from_coordinates(&[
            Coordinates::new(36.6424, 127.4890),
            Coordinates::new(36.9403, 127.6905),
        ]);

        assert_eq!(geometry.coordinates[0], [127.4890, 36.6424]);
        assert_eq!(geometry.len(), 2);
        assert!(RouteGeometry::empty().is_empty());
    }
}
