//! Explosive-weight units and conversion
//!
//! Net explosive weight (NEW) arrives in whatever unit the facility record uses.
//! The scaling law is calibrated in pounds and feet, so every calculation starts by
//! normalizing to [`Pounds`].
//!
//! NATO net explosive quantity (NEQ) is expressed in kilograms, so it converts with the
//! kilogram factor.
//!
//! # Usage
//! ```
//! use qd_core::core_types::units::{convert, WeightUnit};
//!
//! let lbs = WeightUnit::Kilograms.to_pounds(1000.0).unwrap();
//! assert!((*lbs - 2204.62).abs() < 0.01);
//!
//! let kg = convert(2204.62262185, WeightUnit::Pounds, WeightUnit::Kilograms).unwrap();
//! assert!((kg - 1000.0).abs() < 1e-6);
//! ```

use crate::error::{ensure_finite, QdError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

/// Pounds per kilogram
pub const LBS_PER_KG: f64 = 2.20462262185;

/// Pounds per gram
pub const LBS_PER_GRAM: f64 = LBS_PER_KG / 1000.0;

/// Feet per meter
pub const FEET_PER_METER: f64 = 3.280839895;

/// Unit of a net explosive weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeightUnit {
    /// Grams
    #[serde(rename = "g")]
    Grams,
    /// Kilograms
    #[serde(rename = "kg")]
    Kilograms,
    /// Pounds (the scaling-law unit)
    #[serde(rename = "lbs")]
    Pounds,
    /// NATO net explosive quantity, kilogram-equivalent
    #[serde(rename = "NEQ")]
    Neq,
}

impl WeightUnit {
    /// Every supported unit
    pub const ALL: [WeightUnit; 4] = [
        WeightUnit::Grams,
        WeightUnit::Kilograms,
        WeightUnit::Pounds,
        WeightUnit::Neq,
    ];

    /// Pounds per one of this unit
    #[inline]
    pub const fn pounds_per_unit(self) -> f64 {
        match self {
            Self::Grams => LBS_PER_GRAM,
            Self::Kilograms | Self::Neq => LBS_PER_KG,
            Self::Pounds => 1.0,
        }
    }

    /// Short symbol used in traces and labels
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Grams => "g",
            Self::Kilograms => "kg",
            Self::Pounds => "lbs",
            Self::Neq => "NEQ",
        }
    }

    /// Convert `quantity` of this unit to pounds.
    ///
    /// Sign is preserved; positivity is validated by the calculators, not here.
    ///
    /// # Errors
    ///
    /// [`QdError::InvalidInput`] for a non-finite quantity,
    /// [`QdError::ComputationOverflow`] if the product overflows.
    pub fn to_pounds(self, quantity: f64) -> Result<Pounds> {
        if !quantity.is_finite() {
            return Err(QdError::invalid_input(
                "quantity",
                format!("must be finite, got {quantity}"),
            ));
        }
        let lbs = ensure_finite("unit conversion", quantity * self.pounds_per_unit())?;
        Ok(Pounds(lbs))
    }

    /// Express a weight in pounds in this unit.
    ///
    /// # Errors
    ///
    /// [`QdError::InvalidInput`] for a non-finite weight.
    pub fn express(self, pounds: Pounds) -> Result<f64> {
        if !pounds.0.is_finite() {
            return Err(QdError::invalid_input(
                "pounds",
                format!("must be finite, got {}", pounds.0),
            ));
        }
        Ok(pounds.0 / self.pounds_per_unit())
    }
}

impl fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for WeightUnit {
    type Err = QdError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "g" | "gram" | "grams" => Ok(Self::Grams),
            "kg" | "kilogram" | "kilograms" => Ok(Self::Kilograms),
            "lb" | "lbs" | "pound" | "pounds" => Ok(Self::Pounds),
            "neq" => Ok(Self::Neq),
            other => Err(QdError::invalid_input(
                "unit",
                format!("unknown weight unit '{other}' (expected g, kg, lbs or NEQ)"),
            )),
        }
    }
}

/// Convert `quantity` of `unit` to pounds.
///
/// # Errors
///
/// See [`WeightUnit::to_pounds`].
pub fn to_pounds(quantity: f64, unit: WeightUnit) -> Result<Pounds> {
    unit.to_pounds(quantity)
}

/// Convert a weight in pounds to `unit`.
///
/// # Errors
///
/// See [`WeightUnit::express`].
pub fn from_pounds(pounds: Pounds, unit: WeightUnit) -> Result<f64> {
    unit.express(pounds)
}

/// Convert `quantity` between two weight units.
///
/// # Errors
///
/// Propagates conversion failures from [`WeightUnit::to_pounds`].
pub fn convert(quantity: f64, from: WeightUnit, to: WeightUnit) -> Result<f64> {
    to.express(from.to_pounds(quantity)?)
}

/// Weight in pounds
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Pounds(f64);

impl Pounds {
    /// Wrap a raw pound value.
    #[inline]
    pub const fn new(value: f64) -> Self {
        Pounds(value)
    }

    /// Raw value
    #[inline]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Cube root, the scaled-distance term `W^(1/3)`
    #[inline]
    pub fn cbrt(self) -> f64 {
        self.0.cbrt()
    }
}

impl Eq for Pounds {}

impl PartialOrd for Pounds {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pounds {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Deref for Pounds {
    type Target = f64;
    #[inline]
    fn deref(&self) -> &f64 {
        &self.0
    }
}

impl fmt::Display for Pounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4} lbs", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_to_pounds_factors() {
        assert_relative_eq!(*WeightUnit::Pounds.to_pounds(1000.0).unwrap(), 1000.0);
        assert_relative_eq!(
            *WeightUnit::Kilograms.to_pounds(1000.0).unwrap(),
            2204.62262185,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            *WeightUnit::Grams.to_pounds(1000.0).unwrap(),
            2.20462262185,
            epsilon = 1e-12
        );
        // NEQ is kilogram-equivalent
        assert_eq!(
            WeightUnit::Neq.to_pounds(42.0).unwrap(),
            WeightUnit::Kilograms.to_pounds(42.0).unwrap()
        );
    }

    #[test]
    fn test_parse_units() {
        assert_eq!("lbs".parse::<WeightUnit>().unwrap(), WeightUnit::Pounds);
        assert_eq!("KG".parse::<WeightUnit>().unwrap(), WeightUnit::Kilograms);
        assert_eq!(" g ".parse::<WeightUnit>().unwrap(), WeightUnit::Grams);
        assert_eq!("NEQ".parse::<WeightUnit>().unwrap(), WeightUnit::Neq);
        assert!(matches!(
            "tonnes".parse::<WeightUnit>(),
            Err(QdError::InvalidInput { field: "unit", .. })
        ));
    }

    #[test]
    fn test_non_finite_quantity_rejected() {
        assert!(WeightUnit::Pounds.to_pounds(f64::NAN).is_err());
        assert!(WeightUnit::Kilograms.to_pounds(f64::INFINITY).is_err());
    }

    #[test]
    fn test_conversion_keeps_sign() {
        assert_relative_eq!(
            *WeightUnit::Kilograms.to_pounds(-10.0).unwrap(),
            -22.0462262185,
            epsilon = 1e-9
        );
        // Positivity is enforced where the weight is used
        assert!(matches!(
            crate::physics::validate_quantity(-10.0),
            Err(QdError::InvalidInput { field: "quantity", .. })
        ));
    }

    #[test]
    fn test_conversion_overflow_is_surfaced() {
        let err = WeightUnit::Kilograms.to_pounds(f64::MAX).unwrap_err();
        assert!(matches!(err, QdError::ComputationOverflow { .. }));
    }

    #[test]
    fn test_round_trip_every_unit() {
        for unit in WeightUnit::ALL {
            let lbs = to_pounds(1234.5, unit).unwrap();
            assert_relative_eq!(from_pounds(lbs, unit).unwrap(), 1234.5, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_convert_between_units() {
        let g = convert(1.0, WeightUnit::Kilograms, WeightUnit::Grams).unwrap();
        assert_relative_eq!(g, 1000.0, epsilon = 1e-9);
    }
}
