//! Cube-root (Hopkinson-Cranz) scaling of safe separation distance
//!
//! Blast overpressure at a given scaled distance `Z = D / W^(1/3)` is independent of the
//! charge size, so every QD table reduces to choosing a K-factor and evaluating
//!
//! ```text
//! D = K · W^(1/3)
//! ```
//!
//! with `W` the net explosive weight in pounds and `D` in feet.
//!
//! # Corrections
//!
//! The deterministic distance is
//!
//! ```text
//! D = K · (W · TNT_eq)^(1/3) · f_T · f_H · s
//! f_T = 1 + 0.002 (T - 298)
//! f_H = 1 + 0.001 (H - 50)
//! ```
//!
//! where `s` is the material sensitivity clamped into `[0, 1]`. Every factor is `1` under
//! standard conditions for the TNT reference material, so the neutral distance is exactly
//! the tabulated `K · W^(1/3)`.
//!
//! # References
//!
//! - Hopkinson, B. (1915). British Ordnance Board Minutes 13565.
//! - Cranz, C. (1926). Lehrbuch der Ballistik. Springer.
//! - DoD 6055.09-M, Volume 1, Enclosure 6: Quantity-Distance criteria.

use super::fragment::calculate_fragment_distance;
use super::risk::{assess_risk, RiskAnalysis};
use crate::core_types::{CalculationRequest, KFactorType, Organization, Pounds, WeightUnit};
use crate::error::{ensure_finite, QdError, Result};
use crate::physics::fragment::FragmentResult;
use crate::standards::{KFactorResolution, StandardsRegistry};
use serde::Serialize;
use tracing::{debug, warn};

/// Round to two decimal places (hundredths of a foot).
#[inline]
pub(crate) fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Check a net explosive weight before any scaling.
///
/// # Errors
///
/// [`QdError::InvalidInput`] unless `quantity` is finite and strictly positive.
pub fn validate_quantity(quantity: f64) -> Result<()> {
    if quantity.is_finite() && quantity > 0.0 {
        Ok(())
    } else {
        Err(QdError::invalid_input(
            "quantity",
            format!("net explosive weight must be > 0, got {quantity}"),
        ))
    }
}

/// Value-typed cache key of the uncorrected stage
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BaseDistanceKey {
    /// `quantity.to_bits()`
    pub quantity_bits: u64,
    /// Weight unit
    pub unit: WeightUnit,
    /// Organization
    pub organization: Organization,
    /// K-factor category
    pub k_factor_type: KFactorType,
    /// Normalized sub-type key
    pub subtype: Option<String>,
}

impl BaseDistanceKey {
    /// Key for `request`
    pub fn for_request(request: &CalculationRequest) -> Self {
        Self {
            quantity_bits: request.quantity.to_bits(),
            unit: request.unit,
            organization: request.organization,
            k_factor_type: request.k_factor_type,
            subtype: request
                .subtype
                .as_deref()
                .map(crate::standards::normalize_subtype),
        }
    }
}

/// Uncorrected stage: NEW in pounds, resolved K-factor and `K · W^(1/3)`
///
/// Depends only on value-typed inputs and the registry, so it is what the engine caches.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseDistance {
    /// Net explosive weight in pounds
    pub quantity_lbs: Pounds,
    /// Resolved K-factor
    pub k_factor: KFactorResolution,
    /// `K · W^(1/3)` in feet
    pub base_ft: f64,
}

/// Convert, resolve and scale.
///
/// # Errors
///
/// [`QdError::InvalidInput`] for a non-positive quantity, [`QdError::Configuration`] for
/// an organization or category missing from `registry`, [`QdError::ComputationOverflow`]
/// for non-finite intermediates.
pub fn base_distance(
    registry: &StandardsRegistry,
    request: &CalculationRequest,
) -> Result<BaseDistance> {
    validate_quantity(request.quantity)?;
    let quantity_lbs = request.unit.to_pounds(request.quantity)?;
    let k_factor = registry.k_factor(
        request.organization,
        request.k_factor_type,
        request.subtype.as_deref(),
    )?;
    let base_ft = ensure_finite("base distance", k_factor.value * quantity_lbs.cbrt())?;
    Ok(BaseDistance {
        quantity_lbs,
        k_factor,
        base_ft,
    })
}

/// Deterministic safe-distance result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SafeDistanceResult {
    /// Required separation (ft), rounded to hundredths
    pub distance_ft: f64,
    /// Resolved K-factor
    pub k_factor: f64,
    /// K-factor category
    pub k_factor_type: KFactorType,
    /// Governing organization
    pub organization: Organization,
    /// Requested sub-type was not registered; organization default used
    pub used_fallback: bool,
    /// Sub-type that matched exactly, if any
    pub matched_subtype: Option<String>,
    /// Hazard division code
    pub hazard_division: String,
    /// Net explosive weight in pounds (before TNT equivalence)
    pub quantity_lbs: f64,
    /// Regulatory citation
    pub citation: String,
    /// Step-by-step numeric trace, enough to reproduce the distance by hand
    pub trace: Vec<String>,
    /// Auxiliary risk block, when requested
    pub risk: Option<RiskAnalysis>,
    /// Fragment-hazard block, when a casing was supplied
    pub fragment: Option<FragmentResult>,
}

/// Apply material and environmental corrections to a base distance.
///
/// `fragment_safety_margin` is only used when the request carries a casing.
///
/// # Errors
///
/// [`QdError::InvalidInput`] for out-of-range material or environment,
/// [`QdError::ComputationOverflow`] for a non-finite distance.
pub fn apply_corrections(
    base: &BaseDistance,
    request: &CalculationRequest,
    fragment_safety_margin: f64,
) -> Result<SafeDistanceResult> {
    let material = request.material_or_default();
    let environment = request.environment_or_default();
    material.validate()?;
    environment.validate()?;

    let k = base.k_factor.value;
    let lbs = *base.quantity_lbs;
    let mut trace = Vec::with_capacity(8);

    trace.push(format!(
        "NEW: {} {} = {:.4} lbs",
        request.quantity, request.unit, lbs
    ));
    let subtype_note = match (&base.k_factor.matched_subtype, &request.subtype) {
        (Some(matched), _) => format!(" [{matched}]"),
        (None, Some(requested)) => format!(
            " [sub-type '{requested}' not registered, organization default used]"
        ),
        (None, None) => String::new(),
    };
    trace.push(format!(
        "K-factor: {} {}{} = {} ({})",
        request.organization, request.k_factor_type, subtype_note, k, base.k_factor.citation
    ));

    let tnt = material.tnt_equivalence;
    let effective_lbs = lbs * tnt;
    let base_ft = ensure_finite("base distance", base.base_ft * tnt.cbrt())?;
    trace.push(format!(
        "W_eff = {lbs:.4} lbs x TNT equivalence {tnt} = {effective_lbs:.4} lbs"
    ));
    trace.push(format!(
        "base = K x W_eff^(1/3) = {k} x {effective_lbs:.4}^(1/3) = {base_ft:.4} ft"
    ));

    let temp_factor = environment.temperature_factor();
    trace.push(format!(
        "temp_factor = 1 + 0.002 x ({} - 298) = {temp_factor:.6}",
        environment.temperature
    ));
    let humidity_factor = environment.humidity_factor();
    trace.push(format!(
        "humidity_factor = 1 + 0.001 x ({} - 50) = {humidity_factor:.6}",
        environment.humidity
    ));
    let sensitivity = material.effective_sensitivity();
    trace.push(format!(
        "sensitivity = {sensitivity:.4} (input {}, clamped to [0, 1])",
        material.sensitivity
    ));

    let raw = ensure_finite(
        "corrected distance",
        base_ft * temp_factor * humidity_factor * sensitivity,
    )?;
    let distance_ft = round_hundredths(raw);
    trace.push(format!(
        "distance = {base_ft:.4} x {temp_factor:.6} x {humidity_factor:.6} x {sensitivity:.4} = {raw:.4} -> {distance_ft:.2} ft"
    ));

    if sensitivity == 0.0 {
        warn!(
            quantity = request.quantity,
            "material sensitivity is zero; corrected distance collapses to zero"
        );
    }

    let risk = request
        .risk_based
        .then(|| assess_risk(distance_ft, &request.hazard_division, &environment));
    if let Some(risk) = &risk {
        trace.push(format!(
            "risk: P_f = {:.3e}/yr, risk_factor = {:.4}, risk distance = {:.2} ft ({})",
            risk.annual_probability_of_failure,
            risk.risk_factor,
            risk.risk_distance_ft,
            risk.citation
        ));
    }

    let fragment = match request.casing {
        Some(casing) => Some(calculate_fragment_distance(
            request.quantity,
            request.unit,
            &casing,
            fragment_safety_margin,
        )?),
        None => None,
    };

    debug!(
        org = %request.organization,
        kind = %request.k_factor_type,
        k,
        distance_ft,
        used_fallback = base.k_factor.used_fallback,
        "safe distance calculated"
    );

    Ok(SafeDistanceResult {
        distance_ft,
        k_factor: k,
        k_factor_type: request.k_factor_type,
        organization: request.organization,
        used_fallback: base.k_factor.used_fallback,
        matched_subtype: base.k_factor.matched_subtype.clone(),
        hazard_division: request.hazard_division.clone(),
        quantity_lbs: lbs,
        citation: base.k_factor.citation.clone(),
        trace,
        risk,
        fragment,
    })
}

/// Full deterministic calculation without caching.
///
/// # Errors
///
/// See [`base_distance`] and [`apply_corrections`].
pub fn calculate_safe_distance(
    registry: &StandardsRegistry,
    request: &CalculationRequest,
    fragment_safety_margin: f64,
) -> Result<SafeDistanceResult> {
    let base = base_distance(registry, request)?;
    apply_corrections(&base, request, fragment_safety_margin)
}
