//! Calculation request: what to scale, under which standard

use super::classification::{KFactorType, Organization, DEFAULT_HAZARD_DIVISION};
use super::conditions::{Casing, EnvironmentalConditions, MaterialProperties};
use super::units::WeightUnit;
use serde::{Deserialize, Serialize};

fn default_hazard_division() -> String {
    DEFAULT_HAZARD_DIVISION.to_string()
}

/// A single safe-distance request
///
/// Built with [`CalculationRequest::new`] and refined with the `with_*` methods:
///
/// ```
/// use qd_core::core_types::{CalculationRequest, KFactorType, Organization, WeightUnit};
///
/// let request = CalculationRequest::new(1000.0, WeightUnit::Pounds, Organization::Doe, KFactorType::Lop)
///     .with_subtype("II")
///     .with_hazard_division("1.2")
///     .risk_based(true);
/// assert_eq!(request.subtype.as_deref(), Some("II"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationRequest {
    /// Net explosive weight
    pub quantity: f64,
    /// Unit of `quantity`
    pub unit: WeightUnit,
    /// Governing organization
    pub organization: Organization,
    /// K-factor category
    pub k_factor_type: KFactorType,
    /// Facility type, lab designation or LOP class
    #[serde(default)]
    pub subtype: Option<String>,
    /// Hazard division code
    #[serde(default = "default_hazard_division")]
    pub hazard_division: String,
    /// Material properties (TNT reference material when absent)
    #[serde(default)]
    pub material: Option<MaterialProperties>,
    /// Environmental conditions (standard conditions when absent)
    #[serde(default)]
    pub environment: Option<EnvironmentalConditions>,
    /// Attach the auxiliary risk-analysis block
    #[serde(default)]
    pub risk_based: bool,
    /// Attach a fragment-hazard block for this casing
    #[serde(default)]
    pub casing: Option<Casing>,
}

impl CalculationRequest {
    /// Create a request with standard conditions, hazard division 1.1 and no sub-type.
    pub fn new(
        quantity: f64,
        unit: WeightUnit,
        organization: Organization,
        k_factor_type: KFactorType,
    ) -> Self {
        Self {
            quantity,
            unit,
            organization,
            k_factor_type,
            subtype: None,
            hazard_division: default_hazard_division(),
            material: None,
            environment: None,
            risk_based: false,
            casing: None,
        }
    }

    /// Set the sub-type key (facility type, lab designation or LOP class).
    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = Some(subtype.into());
        self
    }

    /// Set the hazard division code.
    pub fn with_hazard_division(mut self, hazard_division: impl Into<String>) -> Self {
        self.hazard_division = hazard_division.into();
        self
    }

    /// Set the material properties.
    pub fn with_material(mut self, material: MaterialProperties) -> Self {
        self.material = Some(material);
        self
    }

    /// Set the environmental conditions.
    pub fn with_environment(mut self, environment: EnvironmentalConditions) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Request the auxiliary risk block.
    pub fn risk_based(mut self, enabled: bool) -> Self {
        self.risk_based = enabled;
        self
    }

    /// Attach a fragment-hazard analysis for `casing`.
    pub fn with_casing(mut self, casing: Casing) -> Self {
        self.casing = Some(casing);
        self
    }

    /// Same request with a different quantity
    pub fn with_quantity(&self, quantity: f64) -> Self {
        Self {
            quantity,
            ..self.clone()
        }
    }

    /// Material in effect for this request
    pub fn material_or_default(&self) -> MaterialProperties {
        self.material.unwrap_or_default()
    }

    /// Environment in effect for this request
    pub fn environment_or_default(&self) -> EnvironmentalConditions {
        self.environment.unwrap_or_default()
    }
}
