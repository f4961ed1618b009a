//! Risk-based siting proxy
//!
//! An auxiliary block attached on request. It never replaces the deterministic distance;
//! it reports an annual probability-of-failure proxy and the reduced distance a
//! risk-based siting review would start from.
//!
//! ```text
//! P_f  = P_base(HD) · (1 + confinement)
//! r    = clamp((P_f / 1e-4)^(1/3), 0.5, 1.0)
//! D_r  = D · r
//! ```

use super::scaling::round_hundredths;
use crate::core_types::EnvironmentalConditions;
use serde::Serialize;

/// Citation attached to every risk block
pub const RISK_CITATION: &str = "DDESB Technical Paper 14, Approved Methods and Algorithms for DoD Risk-Based Explosives Siting";

/// Reference annual probability at which the risk distance equals the deterministic one
const REFERENCE_PROBABILITY: f64 = 1e-4;

/// Auxiliary risk-analysis block
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAnalysis {
    /// Annual probability-of-failure proxy
    pub annual_probability_of_failure: f64,
    /// Reduction applied to the deterministic distance, in `[0.5, 1.0]`
    pub risk_factor: f64,
    /// Reduced risk-based distance (ft)
    pub risk_distance_ft: f64,
    /// Governing citation
    pub citation: String,
}

/// Baseline annual event probability by hazard division
pub fn base_probability(hazard_division: &str) -> f64 {
    match hazard_division.trim() {
        "1.2" => 5e-5,
        "1.3" => 1e-5,
        "1.4" => 1e-6,
        _ => 1e-4,
    }
}

/// Risk block for an already-computed deterministic distance
pub fn assess_risk(
    distance_ft: f64,
    hazard_division: &str,
    environment: &EnvironmentalConditions,
) -> RiskAnalysis {
    let probability =
        base_probability(hazard_division) * (1.0 + environment.effective_confinement());
    let risk_factor = (probability / REFERENCE_PROBABILITY).cbrt().clamp(0.5, 1.0);
    RiskAnalysis {
        annual_probability_of_failure: probability,
        risk_factor,
        risk_distance_ft: round_hundredths(distance_ft * risk_factor),
        citation: RISK_CITATION.to_string(),
    }
}
