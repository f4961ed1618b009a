//! Error taxonomy for the QD engine
//!
//! Every failure is surfaced to the caller as a typed [`QdError`]. The engine never
//! substitutes a zero distance or an empty result for a failed calculation: a silently
//! returned zero separation distance would site a building inside the blast radius.
//!
//! Falling back to an organization's default K-factor is *not* an error. It is reported
//! through `used_fallback` on the result instead.

use thiserror::Error;

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, QdError>;

/// Typed failures raised by the QD engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QdError {
    /// Caller supplied a value outside its domain (non-positive quantity, unknown unit,
    /// unknown organization string, non-positive casing thickness, ...).
    #[error("invalid input `{field}`: {message}")]
    InvalidInput {
        /// Name of the offending field
        field: &'static str,
        /// What was wrong with it
        message: String,
    },

    /// The standards registry or engine configuration cannot satisfy the request
    /// (organization missing from the registry, K-factor type not defined for it,
    /// out-of-range configuration values).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Empty or degenerate geometry supplied to a distance computation.
    #[error("geometry error: {0}")]
    Geometry(String),

    /// A calculation produced a non-finite value (overflow from extreme inputs).
    #[error("computation overflow in {stage}: {value}")]
    ComputationOverflow {
        /// Calculation stage that overflowed
        stage: &'static str,
        /// The offending value (`inf` or `NaN`)
        value: f64,
    },
}

impl QdError {
    /// Create an [`QdError::InvalidInput`] for `field`.
    pub fn invalid_input(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            message: message.into(),
        }
    }

    /// Create a [`QdError::Configuration`] error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a [`QdError::Geometry`] error.
    pub fn geometry(message: impl Into<String>) -> Self {
        Self::Geometry(message.into())
    }
}

/// Reject non-finite intermediate values.
///
/// # Errors
///
/// Returns [`QdError::ComputationOverflow`] when `value` is infinite or `NaN`.
#[inline]
pub(crate) fn ensure_finite(stage: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(QdError::ComputationOverflow { stage, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_message_names_field() {
        let err = QdError::invalid_input("quantity", "must be > 0, got -5");
        assert_eq!(
            err.to_string(),
            "invalid input `quantity`: must be > 0, got -5"
        );
    }

    #[test]
    fn test_ensure_finite() {
        assert_eq!(ensure_finite("base", 12.5), Ok(12.5));
        assert!(matches!(
            ensure_finite("base", f64::INFINITY),
            Err(QdError::ComputationOverflow { stage: "base", .. })
        ));
        assert!(ensure_finite("base", f64::NAN).is_err());
    }
}
