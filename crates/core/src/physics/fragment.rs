//! Hazardous fragment throw distance (Gurney model)
//!
//! Casing fragments are launched at a velocity set by the ratio of explosive energy to
//! casing mass. The Gurney relation gives the initial velocity
//!
//! ```text
//! v0 = √(2E) · √(W / (2t))
//! ```
//!
//! and the hazardous-fragment distance follows an empirical power law
//!
//! ```text
//! D_frag = 0.0084 · v0^1.5 · t^0.5 · safety_margin
//! ```
//!
//! with `W` in pounds, `t` the casing thickness in inches, `√(2E)` in km/s and the
//! distance in feet. The model is independent of the governing organization.
//!
//! # References
//!
//! - Gurney, R.W. (1943). "The Initial Velocities of Fragments from Bombs, Shells and
//!   Grenades". BRL Report 405.
//! - DDESB Technical Paper 16 (2009). Methodologies for Calculating Primary Fragment
//!   Characteristics.

use crate::core_types::{Casing, CasingMaterial, WeightUnit};
use crate::error::{ensure_finite, QdError, Result};
use crate::physics::scaling::{round_hundredths, validate_quantity};
use serde::Serialize;

/// Citation attached to every fragment result
pub const FRAGMENT_CITATION: &str =
    "DDESB Technical Paper 16, Methodologies for Calculating Primary Fragment Characteristics";

/// Empirical distance coefficient
const DISTANCE_COEFFICIENT: f64 = 0.0084;

/// Fragment hazard estimate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FragmentResult {
    /// Hazardous fragment distance (ft), rounded to hundredths
    pub hazard_distance_ft: f64,
    /// Initial fragment velocity (Gurney units, km/s scale)
    pub initial_velocity: f64,
    /// Gurney constant used (km/s)
    pub gurney_constant: f64,
    /// Casing material
    pub casing_material: CasingMaterial,
    /// Casing thickness (in)
    pub casing_thickness_in: f64,
    /// Net explosive weight (lbs)
    pub quantity_lbs: f64,
    /// Safety margin applied
    pub safety_margin: f64,
    /// Governing citation
    pub citation: String,
}

/// Estimate the hazardous fragment distance.
///
/// # Errors
///
/// [`QdError::InvalidInput`] for a non-positive quantity, casing thickness or safety
/// margin; [`QdError::ComputationOverflow`] for non-finite intermediates.
pub fn calculate_fragment_distance(
    quantity: f64,
    unit: WeightUnit,
    casing: &Casing,
    safety_margin: f64,
) -> Result<FragmentResult> {
    validate_quantity(quantity)?;
    let thickness = casing.thickness_in;
    if !(thickness.is_finite() && thickness > 0.0) {
        return Err(QdError::invalid_input(
            "casing_thickness",
            format!("must be > 0 in, got {thickness}"),
        ));
    }
    if !(safety_margin.is_finite() && safety_margin > 0.0) {
        return Err(QdError::invalid_input(
            "safety_margin",
            format!("must be > 0, got {safety_margin}"),
        ));
    }

    let lbs = *unit.to_pounds(quantity)?;
    let gurney = casing.material.gurney_constant();
    let initial_velocity = ensure_finite(
        "fragment velocity",
        gurney * (lbs / (2.0 * thickness)).sqrt(),
    )?;
    let distance = ensure_finite(
        "fragment distance",
        DISTANCE_COEFFICIENT * initial_velocity.powf(1.5) * thickness.sqrt() * safety_margin,
    )?;

    tracing::debug!(
        lbs,
        material = %casing.material,
        thickness,
        initial_velocity,
        distance,
        "fragment hazard distance calculated"
    );

    Ok(FragmentResult {
        hazard_distance_ft: round_hundredths(distance),
        initial_velocity,
        gurney_constant: gurney,
        casing_material: casing.material,
        casing_thickness_in: thickness,
        quantity_lbs: lbs,
        safety_margin,
        citation: FRAGMENT_CITATION.to_string(),
    })
}
