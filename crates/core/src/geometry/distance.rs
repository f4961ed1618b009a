//! Minimum separation between two lon/lat geometries
//!
//! Separation is measured vertex-to-vertex: every coordinate of both geometries is
//! extracted (points, line vertices, polygon ring vertices, members of multi-geometries
//! and collections) and the smallest pairwise distance wins. Edges are not interpolated,
//! so long straight edges should be densified by the caller when sub-vertex accuracy
//! matters.

use crate::config::DistanceMetric;
use crate::core_types::units::FEET_PER_METER;
use crate::error::{ensure_finite, QdError, Result};
use geo::{CoordsIter, HaversineDistance};
use geo_types::{Coord, Geometry, Point};

/// Feet per degree of latitude on the equirectangular approximation
pub const FEET_PER_DEGREE_LAT: f64 = 364_000.0;

/// All vertices of `geometry`, validated as finite lon/lat pairs.
///
/// # Errors
///
/// [`QdError::Geometry`] when the geometry has no vertices, or a vertex is non-finite or
/// outside the lon/lat domain.
pub fn vertices(geometry: &Geometry<f64>) -> Result<Vec<Coord<f64>>> {
    let coords: Vec<Coord<f64>> = geometry.coords_iter().collect();
    if coords.is_empty() {
        return Err(QdError::geometry("geometry has no vertices"));
    }
    for c in &coords {
        if !(c.x.is_finite() && c.y.is_finite()) {
            return Err(QdError::geometry(format!(
                "non-finite vertex ({}, {})",
                c.x, c.y
            )));
        }
        if c.y.abs() > 90.0 || c.x.abs() > 360.0 {
            return Err(QdError::geometry(format!(
                "vertex ({}, {}) outside the lon/lat domain",
                c.x, c.y
            )));
        }
    }
    Ok(coords)
}

/// Longitude difference `to - from` folded into `[-180, 180)` degrees
fn longitude_delta(from: f64, to: f64) -> f64 {
    (to - from + 180.0).rem_euclid(360.0) - 180.0
}

/// Distance in feet between two lon/lat coordinates
pub fn coord_distance_ft(a: Coord<f64>, b: Coord<f64>, metric: DistanceMetric) -> f64 {
    match metric {
        DistanceMetric::Haversine => {
            Point::from(a).haversine_distance(&Point::from(b)) * FEET_PER_METER
        }
        DistanceMetric::Planar => {
            let mean_lat = ((a.y + b.y) / 2.0).to_radians();
            let dx = longitude_delta(a.x, b.x) * mean_lat.cos() * FEET_PER_DEGREE_LAT;
            let dy = (b.y - a.y) * FEET_PER_DEGREE_LAT;
            dx.hypot(dy)
        }
    }
}

/// Smallest vertex-to-vertex distance between `a` and `b` (ft).
///
/// # Errors
///
/// [`QdError::Geometry`] for empty or invalid geometry (see [`vertices`]),
/// [`QdError::ComputationOverflow`] if the result is non-finite.
pub fn min_distance_ft(
    a: &Geometry<f64>,
    b: &Geometry<f64>,
    metric: DistanceMetric,
) -> Result<f64> {
    let from = vertices(a)?;
    let to = vertices(b)?;
    let mut best = f64::INFINITY;
    for &p in &from {
        for &q in &to {
            let d = coord_distance_ft(p, q, metric);
            if d < best {
                best = d;
            }
        }
    }
    ensure_finite("minimum separation", best)
}
