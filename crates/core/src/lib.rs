//! Explosives Quantity-Distance (QD) Core Library
//!
//! Computes minimum safe separation distances around facilities that store or handle
//! explosives, under the DoD, DoE, NATO and Air Force standards, and produces the
//! buffer-ring geometry and compliance findings needed to audit them.
//!
//! ## Components
//!
//! - Unit conversion between grams, kilograms, pounds and NATO NEQ
//! - Immutable standards registry of K-factors and citations, swappable as a whole
//! - Hopkinson-Cranz cube-root scaling with material and environmental corrections
//! - Gurney fragment-throw hazard distance
//! - Seeded, parallel Monte Carlo confidence intervals
//! - Concentric buffer rings and uncertainty bands
//! - Facility compliance, single or in cancellable batches
//!
//! Every distance is in feet and every result carries the citation of the standard that
//! governed it.
//!
//! ```
//! use qd_core::{CalculationRequest, EngineConfig, KFactorType, Organization, QdEngine, WeightUnit};
//!
//! let engine = QdEngine::new(EngineConfig::default())?;
//! let request = CalculationRequest::new(1000.0, WeightUnit::Pounds, Organization::Dod, KFactorType::Ibd);
//! let result = engine.calculate_safe_distance(&request)?;
//! assert_eq!(result.distance_ft, 400.0);
//! # Ok::<(), qd_core::QdError>(())
//! ```

pub mod compliance;
pub mod config;
pub mod core_types;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod physics;
pub mod standards;

// Re-export core types
pub use core_types::{
    convert, from_pounds, to_pounds, CalculationRequest, Casing, CasingMaterial,
    EnvironmentalConditions, KFactorType, MaterialProperties, Organization, Pounds, WeightUnit,
};

// Re-export calculators and results
pub use compliance::{
    BatchControl, BatchOutcome, CancellationToken, ComplianceReport, ComplianceStatus,
    ComplianceViolation, Facility, FacilityAnalysis, SurroundingFeature,
};
pub use config::{DistanceMetric, EngineConfig};
pub use engine::QdEngine;
pub use error::{QdError, Result};
pub use geometry::BufferRing;
pub use physics::{FragmentResult, RiskAnalysis, SafeDistanceResult, UncertaintyResult};
pub use standards::{RegistryHandle, StandardsRegistry};
