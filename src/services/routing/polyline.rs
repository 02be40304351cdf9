//! Encoded polyline decoding
//!
//! Mapbox emits precision 5 (`polyline`) or 6 (`polyline6`); Valhalla always
//! uses precision 6.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid polyline encoding at byte {offset}")]
pub struct PolylineError {
    pub offset: usize,
}

/// Decode an encoded polyline into GeoJSON-ordered `[lng, lat]` pairs
pub fn decode_polyline(encoded: &str, precision: u32) -> Result<Vec<[f64; 2]>, PolylineError> {
    let factor = 10_f64.powi(precision as i32);
    let mut coordinates = Vec::new();
    let mut lat = 0i64;
    let mut lng = 0i64;

    let bytes = encoded.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        lat += next_value(bytes, &mut i)?;
        lng += next_value(bytes, &mut i)?;

        coordinates.push([lng as f64 / factor, lat as f64 / factor]);
    }

    Ok(coordinates)
}

/// Read one zig-zag encoded delta starting at `*i`
fn next_value(bytes: &[u8], i: &mut usize) -> Result<i64, PolylineError> {
    let mut shift = 0;
    let mut result = 0i64;
    loop {
        let Some(&raw) = bytes.get(*i) else {
            return Err(PolylineError { offset: *i });
        };
        let byte = raw as i64 - 63;
        if !(0..64).contains(&byte) || shift > 60 {
            return Err(PolylineError { offset: *i });
        }
        *i += 1;
        result |= (byte & 0x1f) << shift;
        shift += 5;
        if byte < 0x20 {
            break;
        }
    }

    Ok(if result & 1 != 0 { !(result >> 1) } else { result >> 1 })
}
