//! Material and environmental inputs to a QD calculation
//!
//! Both structs are transient: built per request, never stored. Sensitivity and
//! confinement are clamped into `[0, 1]` every time they are read, so a record
//! carrying `sensitivity = 1.4` can never scale a distance beyond nominal.

use crate::error::{QdError, Result};
use serde::{Deserialize, Serialize};

/// Standard reference temperature (K) at which the temperature correction is a no-op
pub const STANDARD_TEMPERATURE_K: f64 = 298.0;

/// Standard reference humidity (%) at which the humidity correction is a no-op
pub const STANDARD_HUMIDITY_PCT: f64 = 50.0;

/// Standard sea-level pressure (kPa)
pub const STANDARD_PRESSURE_KPA: f64 = 101.325;

/// Properties of the stored explosive material
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialProperties {
    /// Sensitivity factor (0-1); 1.0 means full nominal scaling
    pub sensitivity: f64,
    /// Detonation velocity (m/s)
    pub detonation_velocity: f64,
    /// TNT-equivalence factor applied to the net explosive weight
    pub tnt_equivalence: f64,
}

impl Default for MaterialProperties {
    /// TNT reference material: full sensitivity, 6000 m/s, equivalence 1.0
    fn default() -> Self {
        Self {
            sensitivity: 1.0,
            detonation_velocity: 6000.0,
            tnt_equivalence: 1.0,
        }
    }
}

impl MaterialProperties {
    /// Create material properties. Sensitivity is clamped to `[0, 1]`.
    pub fn new(sensitivity: f64, detonation_velocity: f64, tnt_equivalence: f64) -> Self {
        Self {
            sensitivity: sensitivity.clamp(0.0, 1.0),
            detonation_velocity,
            tnt_equivalence,
        }
    }

    /// Sensitivity clamped into `[0, 1]`
    #[inline]
    pub fn effective_sensitivity(&self) -> f64 {
        self.sensitivity.clamp(0.0, 1.0)
    }

    /// Check the fields that cannot be clamped into range.
    ///
    /// # Errors
    ///
    /// [`QdError::InvalidInput`] for a non-finite sensitivity or a non-positive
    /// detonation velocity or TNT equivalence.
    pub fn validate(&self) -> Result<()> {
        if !self.sensitivity.is_finite() {
            return Err(QdError::invalid_input(
                "sensitivity",
                format!("must be finite, got {}", self.sensitivity),
            ));
        }
        if !(self.detonation_velocity.is_finite() && self.detonation_velocity > 0.0) {
            return Err(QdError::invalid_input(
                "detonation_velocity",
                format!("must be > 0 m/s, got {}", self.detonation_velocity),
            ));
        }
        if !(self.tnt_equivalence.is_finite() && self.tnt_equivalence > 0.0) {
            return Err(QdError::invalid_input(
                "tnt_equivalence",
                format!("must be > 0, got {}", self.tnt_equivalence),
            ));
        }
        Ok(())
    }
}

/// Ambient conditions at the site
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentalConditions {
    /// Ambient temperature (K)
    pub temperature: f64,
    /// Atmospheric pressure (kPa)
    pub pressure: f64,
    /// Relative humidity (%)
    pub humidity: f64,
    /// Degree of confinement (0-1)
    pub confinement_factor: f64,
}

impl Default for EnvironmentalConditions {
    /// Standard conditions: 298 K, 101.325 kPa, 50 % RH, unconfined
    fn default() -> Self {
        Self {
            temperature: STANDARD_TEMPERATURE_K,
            pressure: STANDARD_PRESSURE_KPA,
            humidity: STANDARD_HUMIDITY_PCT,
            confinement_factor: 0.0,
        }
    }
}

impl EnvironmentalConditions {
    /// Create environmental conditions. Confinement is clamped to `[0, 1]`.
    pub fn new(temperature: f64, pressure: f64, humidity: f64, confinement_factor: f64) -> Self {
        Self {
            temperature,
            pressure,
            humidity,
            confinement_factor: confinement_factor.clamp(0.0, 1.0),
        }
    }

    /// Confinement clamped into `[0, 1]`
    #[inline]
    pub fn effective_confinement(&self) -> f64 {
        self.confinement_factor.clamp(0.0, 1.0)
    }

    /// Temperature correction `1 + 0.002 (T - 298)`
    #[inline]
    pub fn temperature_factor(&self) -> f64 {
        temperature_factor(self.temperature)
    }

    /// Humidity correction `1 + 0.001 (H - 50)`
    #[inline]
    pub fn humidity_factor(&self) -> f64 {
        1.0 + 0.001 * (self.humidity - STANDARD_HUMIDITY_PCT)
    }

    /// Check ranges that cannot be clamped.
    ///
    /// # Errors
    ///
    /// [`QdError::InvalidInput`] for a non-positive temperature or pressure, humidity
    /// outside `[0, 100]`, or a non-finite confinement factor.
    pub fn validate(&self) -> Result<()> {
        if !(self.temperature.is_finite() && self.temperature > 0.0) {
            return Err(QdError::invalid_input(
                "temperature",
                format!("must be > 0 K, got {}", self.temperature),
            ));
        }
        if !(self.pressure.is_finite() && self.pressure > 0.0) {
            return Err(QdError::invalid_input(
                "pressure",
                format!("must be > 0 kPa, got {}", self.pressure),
            ));
        }
        if !(0.0..=100.0).contains(&self.humidity) {
            return Err(QdError::invalid_input(
                "humidity",
                format!("must be within 0-100 %, got {}", self.humidity),
            ));
        }
        if !self.confinement_factor.is_finite() {
            return Err(QdError::invalid_input(
                "confinement_factor",
                format!("must be finite, got {}", self.confinement_factor),
            ));
        }
        Ok(())
    }
}

/// Casing material of a munition, selecting the Gurney constant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CasingMaterial {
    /// Steel casing
    Steel,
    /// Aluminum casing
    Aluminum,
    /// Anything else
    #[default]
    Generic,
}

impl CasingMaterial {
    /// Gurney constant `sqrt(2E)` in km/s
    pub const fn gurney_constant(self) -> f64 {
        match self {
            Self::Steel => 2.44,
            Self::Aluminum => 2.63,
            Self::Generic => 2.32,
        }
    }

    /// Parse a free-form material name. Unrecognized names are [`CasingMaterial::Generic`].
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "steel" => Self::Steel,
            "aluminum" | "aluminium" => Self::Aluminum,
            _ => Self::Generic,
        }
    }
}

impl std::fmt::Display for CasingMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Steel => "Steel",
            Self::Aluminum => "Aluminum",
            Self::Generic => "Generic",
        })
    }
}

/// Munition casing used by the fragment hazard model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Casing {
    /// Casing material
    pub material: CasingMaterial,
    /// Wall thickness (inches)
    pub thickness_in: f64,
}

impl Casing {
    /// Create a casing description.
    pub const fn new(material: CasingMaterial, thickness_in: f64) -> Self {
        Self {
            material,
            thickness_in,
        }
    }
}

/// Temperature correction `1 + 0.002 (T - 298)`, shared with the Monte Carlo sampler
#[inline]
pub(crate) fn temperature_factor(temperature_k: f64) -> f64 {
    1.0 + 0.002 * (temperature_k - STANDARD_TEMPERATURE_K)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrections_neutral_at_standard_conditions() {
        let env = EnvironmentalConditions::default();
        assert_eq!(env.temperature_factor(), 1.0);
        assert_eq!(env.humidity_factor(), 1.0);
    }

    #[test]
    fn test_sensitivity_and_confinement_clamped() {
        let material = MaterialProperties {
            sensitivity: 1.7,
            ..MaterialProperties::default()
        };
        assert_eq!(material.effective_sensitivity(), 1.0);
        assert_eq!(MaterialProperties::new(-0.3, 6000.0, 1.0).sensitivity, 0.0);

        let env = EnvironmentalConditions {
            confinement_factor: 3.0,
            ..EnvironmentalConditions::default()
        };
        assert_eq!(env.effective_confinement(), 1.0);
    }

    #[test]
    fn test_casing_material_names() {
        assert_eq!(CasingMaterial::from_name("Steel"), CasingMaterial::Steel);
        assert_eq!(CasingMaterial::from_name("aluminium"), CasingMaterial::Aluminum);
        assert_eq!(CasingMaterial::from_name("titanium"), CasingMaterial::Generic);
        assert!(
            CasingMaterial::Steel.gurney_constant() > CasingMaterial::Generic.gurney_constant()
        );
    }

    #[test]
    fn test_validation_rejects_out_of_range() {
        let hot = EnvironmentalConditions {
            humidity: 120.0,
            ..EnvironmentalConditions::default()
        };
        assert!(matches!(
            hot.validate(),
            Err(QdError::InvalidInput { field: "humidity", .. })
        ));

        let inert = MaterialProperties {
            tnt_equivalence: 0.0,
            ..MaterialProperties::default()
        };
        assert!(inert.validate().is_err());
    }
}
