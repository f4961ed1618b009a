//! Physics models: blast scaling, fragment throw, risk proxy and uncertainty

pub mod fragment;
pub mod risk;
pub mod scaling;
pub mod uncertainty;

pub use fragment::{calculate_fragment_distance, FragmentResult, FRAGMENT_CITATION};
pub use risk::{assess_risk, base_probability, RiskAnalysis, RISK_CITATION};
pub use scaling::{
    apply_corrections, base_distance, calculate_safe_distance, validate_quantity, BaseDistance,
    BaseDistanceKey, SafeDistanceResult,
};
pub use uncertainty::{monte_carlo, SamplingParameters, UncertaintyResult, CONFIDENCE_LEVEL};
