//! Facility siting compliance

pub mod analysis;
pub mod batch;

pub use analysis::{
    analyze_facility, analyze_facility_until, analyze_facility_with, assess_features,
    assess_features_until, check_separation, ComplianceReport, ComplianceStatus,
    ComplianceViolation, Facility, FacilityAnalysis, FeatureClearance, IndeterminateFeature,
    SeparationCheck, SurroundingFeature,
};
pub use batch::{run_batch, BatchControl, BatchEntry, BatchOutcome, CancellationToken, StopReason};
