//! Core types shared by every calculator

pub mod classification;
pub mod conditions;
pub mod request;
pub mod units;

pub use classification::{KFactorType, Organization, DEFAULT_HAZARD_DIVISION};
pub use conditions::{
    Casing, CasingMaterial, EnvironmentalConditions, MaterialProperties, STANDARD_HUMIDITY_PCT,
    STANDARD_PRESSURE_KPA, STANDARD_TEMPERATURE_K,
};
pub use request::CalculationRequest;
pub use units::{convert, from_pounds, to_pounds, Pounds, WeightUnit};
