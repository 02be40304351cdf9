//! Stop point CSV import
//!
//! Expected columns (header names, any order):
//! `id` (optional), `sorting_id`, `location_t` (C | D), `stop_seq` (optional),
//! `lat`, `lon` (or `lng`), `drive_dist` (optional, meters).
//! Comma or semicolon delimited.

use std::collections::BTreeSet;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::types::{Coordinates, StopPoint, StopPointError, StopRole};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: {source}")]
    InvalidRow {
        row: usize,
        #[source]
        source: StopPointError,
    },
}

/// Raw CSV row
#[derive(Debug, Deserialize)]
struct CsvStopRow {
    #[serde(default)]
    id: Option<String>,
    sorting_id: String,
    location_t: String,
    #[serde(default)]
    stop_seq: Option<i64>,
    lat: f64,
    #[serde(alias = "lng")]
    lon: f64,
    #[serde(default)]
    drive_dist: Option<f64>,
}

impl CsvStopRow {
    /// `row` is 1-based, header excluded
    fn into_stop_point(self, row: usize) -> Result<StopPoint, LoadError> {
        let role = StopRole::from_tag(&self.location_t).map_err(|source| LoadError::InvalidRow { row, source })?;
        let group_key = self.sorting_id.trim().to_string();
        let id = self
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| format!("{}-{}", group_key, row));

        // Datasets number every row; only pickups are sequenced
        let sequence_index = match role {
            StopRole::Pickup => self.stop_seq,
            StopRole::Drop => {
                if self.stop_seq.is_some() {
                    debug!("Ignoring stop_seq on drop point {}", id);
                }
                None
            }
        };

        StopPoint::new(id, Coordinates::new(self.lat, self.lon), role, group_key, sequence_index)
            .map(|p| p.with_recorded_distance(self.drive_dist))
            .map_err(|source| LoadError::InvalidRow { row, source })
    }
}

/// Parse stop points from CSV data
pub fn read_stop_records<R: Read>(reader: R, delimiter: u8) -> Result<Vec<StopPoint>, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut points = Vec::new();
    for (i, result) in reader.deserialize().enumerate() {
        let row: CsvStopRow = result?;
        points.push(row.into_stop_point(i + 1)?);
    }
    Ok(points)
}

/// Semicolon when the header uses it and has no commas, comma otherwise
fn detect_delimiter(content: &str) -> u8 {
    let header = content.lines().next().unwrap_or_default();
    if header.contains(';') && !header.contains(',') {
        b';'
    } else {
        b','
    }
}

/// Load stop points from a CSV file
pub fn load_stop_records(path: &Path) -> Result<Vec<StopPoint>, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let points = read_stop_records(content.as_bytes(), detect_delimiter(&content))?;
    info!("Loaded {} stop points from {}", points.len(), path.display());
    Ok(points)
}

/// Distinct group keys, sorted
pub fn group_keys(points: &[StopPoint]) -> BTreeSet<String> {
    points.iter().map(|p| p.group_key().to_string()).collect()
}

/// Group keys present in both datasets, sorted
pub fn common_group_keys(as_is: &[StopPoint], to_be: &[StopPoint]) -> Vec<String> {
    let to_be_keys = group_keys(to_be);
    group_keys(as_is)
        .into_iter()
        .filter(|k| to_be_keys.contains(k))
        .collect()
}

/// Points of one group, in file order
pub fn select_group(points: &[StopPoint], group_key: &str) -> Vec<StopPoint> {
    points
        .iter()
        .filter(|p| p.group_key() == group_key)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const AS_IS_CSV: &str = "\
id,sorting_id,location_t,stop_seq,lat,lon,drive_dist
F1,S-01,C,,37.50,127.00,25400
F2,S-01,C,,37.55,127.10,
P1,S-01,D,,37.60,127.20,
F3,S-02,C,,36.90,127.40,8000
P2,S-02,D,,36.95,127.45,
F9,S-09,C,,35.00,128.00,
";

    const TO_BE_CSV: &str = "\
sorting_id;location_t;stop_seq;lat;lng
S-01;C;1;37.50;127.00
S-01;C;2;37.55;127.10
S-01;D;3;37.60;127.20
S-02;C;1;36.90;127.40
S-02;D;;36.95;127.45
S-03;C;1;36.00;127.00
";

    #[test]
    fn test_read_stop_records() {
        let points = read_stop_records(AS_IS_CSV.as_bytes(), b',').unwrap();

        assert_eq!(points.len(), 6);
        assert_eq!(points[0].id(), "F1");
        assert!(points[0].is_pickup());
        assert_eq!(points[0].recorded_distance_meters(), Some(25_400.0));
        assert_eq!(points[1].recorded_distance_meters(), None);
        assert!(points[2].is_drop());
        assert_eq!(points[2].group_key(), "S-01");
    }

    #[test]
    fn test_read_semicolon_file_generates_ids_and_drops_sequence_on_drop() {
        let points = read_stop_records(TO_BE_CSV.as_bytes(), detect_delimiter(TO_BE_CSV)).unwrap();

        assert_eq!(points[0].id(), "S-01-1");
        assert_eq!(points[1].sequence_index(), Some(2));
        assert!(points[2].is_drop());
        assert_eq!(points[2].sequence_index(), None);
        assert!((points[3].coordinates().lng - 127.40).abs() < 1e-9);
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter(AS_IS_CSV), b',');
        assert_eq!(detect_delimiter(TO_BE_CSV), b';');
        assert_eq!(detect_delimiter(""), b',');
    }

    #[test]
    fn test_unknown_role_reports_row() {
        let csv = "sorting_id,location_t,lat,lon\nS-01,C,37.5,127.0\nS-01,X,37.6,127.2\n";
        let err = read_stop_records(csv.as_bytes(), b',').unwrap_err();

        assert!(matches!(
            err,
            LoadError::InvalidRow { row: 2, source: StopPointError::UnknownRole(_) }
        ));
    }

    #[test]
    fn test_out_of_range_coordinates_rejected() {
        let csv = "sorting_id,location_t,lat,lon\nS-01,C,127.0,37.5\n";
        let err = read_stop_records(csv.as_bytes(), b',').unwrap_err();

        assert!(matches!(
            err,
            LoadError::InvalidRow { row: 1, source: StopPointError::InvalidCoordinates { .. } }
        ));
    }

    #[test]
    fn test_non_numeric_latitude_is_csv_error() {
        let csv = "sorting_id,location_t,lat,lon\nS-01,C,north,127.0\n";
        let err = read_stop_records(csv.as_bytes(), b',').unwrap_err();
        assert!(matches!(err, LoadError::Csv(_)));
    }

    #[test]
    fn test_common_group_keys_sorted_intersection() {
        let as_is = read_stop_records(AS_IS_CSV.as_bytes(), b',').unwrap();
        let to_be = read_stop_records(TO_BE_CSV.as_bytes(), b';').unwrap();

        assert_eq!(common_group_keys(&as_is, &to_be), vec!["S-01", "S-02"]);
    }

    #[test]
    fn test_select_group_keeps_file_order() {
        let points = read_stop_records(AS_IS_CSV.as_bytes(), b',').unwrap();
        let group = select_group(&points, "S-01");

        let ids: Vec<&str> = group.iter().map(|p| p.id()).collect();
        assert_eq!(ids, vec!["F1", "F2", "P1"]);
        assert!(select_group(&points, "NOPE").is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_stop_records(Path::new("/nonexistent/stops.csv")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
