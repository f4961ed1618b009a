//! Concentric QD buffer rings
//!
//! A safe distance is drawn as closed circular polygons around the potential explosion
//! site, one per K-factor multiple. Circles are built on an equirectangular
//! approximation:
//!
//! ```text
//! Δlat = r · sin θ / 364 000
//! Δlon = r · cos θ / (364 000 · cos φ)
//! ```
//!
//! with `r` in feet and `φ` the centre latitude. Accurate to well under a percent for the
//! few-thousand-foot radii QD produces, away from the poles.

use super::distance::FEET_PER_DEGREE_LAT;
use crate::config::MIN_RING_VERTICES;
use crate::core_types::KFactorType;
use crate::error::{ensure_finite, QdError, Result};
use crate::physics::SafeDistanceResult;
use geo_types::{Coord, LineString, Polygon};
use serde::Serialize;

/// Multiples used when the caller asks for the default ring set
pub const DEFAULT_RING_MULTIPLES: [f64; 4] = [0.25, 0.5, 0.75, 1.0];

/// One buffer ring with its audit metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BufferRing {
    /// Closed ring polygon (first vertex repeated as last), lon/lat
    pub polygon: Polygon<f64>,
    /// Fraction of the safe distance this ring represents
    pub k_factor_multiple: f64,
    /// Radius (ft)
    pub radius_ft: f64,
    /// Display label, e.g. `HD 1.1 IBD 0.50xK (200.00 ft)`
    pub label: String,
    /// Governing citation
    pub citation: String,
    /// Hazard division code
    pub hazard_division: String,
    /// K-factor category
    pub k_factor_type: KFactorType,
    /// Paired band at `radius · (1 ± uncertainty)` rather than a nominal ring
    pub is_uncertainty_band: bool,
}

/// Closed circle of `radius_ft` around `center` (`[lon, lat]`).
///
/// # Errors
///
/// [`QdError::InvalidInput`] for a non-finite centre, a latitude at or beyond a pole,
/// fewer than [`MIN_RING_VERTICES`] vertices or a non-positive radius.
pub fn circle(center: [f64; 2], radius_ft: f64, vertices: usize) -> Result<Polygon<f64>> {
    let [lon, lat] = center;
    if !(lon.is_finite() && lat.is_finite() && lat.abs() < 90.0) {
        return Err(QdError::invalid_input(
            "center",
            format!("[{lon}, {lat}] is not a valid lon/lat below the poles"),
        ));
    }
    if vertices < MIN_RING_VERTICES {
        return Err(QdError::invalid_input(
            "vertices",
            format!("at least {MIN_RING_VERTICES} required, got {vertices}"),
        ));
    }
    if !(radius_ft.is_finite() && radius_ft > 0.0) {
        return Err(QdError::invalid_input(
            "radius",
            format!("must be > 0 ft, got {radius_ft}"),
        ));
    }

    let dlat = radius_ft / FEET_PER_DEGREE_LAT;
    let dlon = ensure_finite("ring longitude span", dlat / lat.to_radians().cos())?;
    let step = std::f64::consts::TAU / vertices as f64;
    let mut coords: Vec<Coord<f64>> = (0..vertices)
        .map(|i| {
            let theta = step * i as f64;
            Coord {
                x: lon + dlon * theta.cos(),
                y: lat + dlat * theta.sin(),
            }
        })
        .collect();
    coords.push(coords[0]);
    Ok(Polygon::new(LineString::new(coords), vec![]))
}

fn validate_multiples(multiples: &[f64]) -> Result<()> {
    if multiples.is_empty() {
        return Err(QdError::invalid_input(
            "k_factor_multiples",
            "at least one multiple is required",
        ));
    }
    let mut previous = 0.0;
    for &m in multiples {
        if !(m.is_finite() && m > previous) {
            return Err(QdError::invalid_input(
                "k_factor_multiples",
                format!("multiples must be positive and strictly ascending, got {multiples:?}"),
            ));
        }
        previous = m;
    }
    Ok(())
}

/// Rings at each of `multiples` times the safe distance.
///
/// With `uncertainty = Some(u)` every nominal ring is followed by a pair of bands at
/// `radius · (1 - u)` and `radius · (1 + u)`. Nominal radii are strictly increasing in
/// the multiple.
///
/// # Errors
///
/// [`QdError::InvalidInput`] for an empty or non-ascending multiple list, `u` outside
/// `[0, 1)`, a zero safe distance or an invalid centre (see [`circle`]).
pub fn generate_rings(
    center: [f64; 2],
    safe_distance: &SafeDistanceResult,
    multiples: &[f64],
    uncertainty: Option<f64>,
    vertices: usize,
) -> Result<Vec<BufferRing>> {
    validate_multiples(multiples)?;
    if let Some(u) = uncertainty {
        if !(u.is_finite() && (0.0..1.0).contains(&u)) {
            return Err(QdError::invalid_input(
                "uncertainty",
                format!("must lie in [0, 1), got {u}"),
            ));
        }
    }

    let hd = &safe_distance.hazard_division;
    let kind = safe_distance.k_factor_type;
    let ring = |radius_ft: f64, multiple: f64, label: String, band: bool| -> Result<BufferRing> {
        Ok(BufferRing {
            polygon: circle(center, radius_ft, vertices)?,
            k_factor_multiple: multiple,
            radius_ft,
            label,
            citation: safe_distance.citation.clone(),
            hazard_division: hd.clone(),
            k_factor_type: kind,
            is_uncertainty_band: band,
        })
    };

    let mut rings = Vec::with_capacity(multiples.len() * 3);
    for &m in multiples {
        let radius = safe_distance.distance_ft * m;
        rings.push(ring(
            radius,
            m,
            format!("HD {hd} {kind} {m:.2}xK ({radius:.2} ft)"),
            false,
        )?);
        if let Some(u) = uncertainty.filter(|u| *u > 0.0) {
            for (sign, side) in [(-1.0, "lower"), (1.0, "upper")] {
                let band = radius * (1.0 + sign * u);
                rings.push(ring(
                    band,
                    m,
                    format!("HD {hd} {kind} {m:.2}xK {side} band ({band:.2} ft)"),
                    true,
                )?);
            }
        }
    }

    tracing::debug!(
        rings = rings.len(),
        distance_ft = safe_distance.distance_ft,
        "buffer rings generated"
    );
    Ok(rings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::{CalculationRequest, Organization, WeightUnit};
    use crate::physics::calculate_safe_distance;
    use crate::standards::StandardsRegistry;
    use approx::assert_relative_eq;

    fn safe_400() -> SafeDistanceResult {
        let request = CalculationRequest::new(
            1000.0,
            WeightUnit::Pounds,
            Organization::Dod,
            KFactorType::Ibd,
        );
        calculate_safe_distance(&StandardsRegistry::builtin(), &request, 1.5).unwrap()
    }

    #[test]
    fn test_rings_are_closed_and_sized() {
        let rings = generate_rings([-117.0, 34.0], &safe_400(), &[0.5, 1.0], None, 64).unwrap();
        assert_eq!(rings.len(), 2);
        for ring in &rings {
            let coords = &ring.polygon.exterior().0;
            assert_eq!(coords.len(), 65);
            assert_eq!(coords.first(), coords.last());
            assert!(ring.citation.contains("6055.09"));
            assert!(ring.label.contains("HD 1.1"));
            assert!(ring.label.contains("IBD"));
        }
        assert_relative_eq!(rings[0].radius_ft, 200.0);
        assert_relative_eq!(rings[1].radius_ft, 400.0);
    }

    #[test]
    fn test_north_vertex_offset_matches_radius() {
        let rings = generate_rings([10.0, 45.0], &safe_400(), &[1.0], None, 64).unwrap();
        // Vertex 16 of 64 sits at θ = 90°
        let north = rings[0].polygon.exterior().0[16];
        assert_relative_eq!(north.y - 45.0, 400.0 / FEET_PER_DEGREE_LAT, epsilon = 1e-12);
        assert_relative_eq!(north.x, 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_uncertainty_bands_bracket_nominal() {
        let rings =
            generate_rings([0.0, 0.0], &safe_400(), &[1.0], Some(0.1), MIN_RING_VERTICES).unwrap();
        assert_eq!(rings.len(), 3);
        assert!(!rings[0].is_uncertainty_band);
        assert!(rings[1].is_uncertainty_band && rings[2].is_uncertainty_band);
        assert_relative_eq!(rings[1].radius_ft, 360.0, epsilon = 1e-9);
        assert_relative_eq!(rings[2].radius_ft, 440.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rejects_bad_multiples_and_vertices() {
        let safe = safe_400();
        assert!(generate_rings([0.0, 0.0], &safe, &[], None, 64).is_err());
        assert!(generate_rings([0.0, 0.0], &safe, &[1.0, 0.5], None, 64).is_err());
        assert!(generate_rings([0.0, 0.0], &safe, &[0.5, 0.5], None, 64).is_err());
        assert!(generate_rings([0.0, 0.0], &safe, &[-1.0], None, 64).is_err());
        assert!(generate_rings([0.0, 0.0], &safe, &[1.0], None, 16).is_err());
        assert!(generate_rings([0.0, 90.0], &safe, &[1.0], None, 64).is_err());
        assert!(generate_rings([0.0, 0.0], &safe, &[1.0], Some(1.0), 64).is_err());
    }
}
