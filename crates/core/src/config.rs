//! Engine configuration
//!
//! All fields have defaults, so a partial TOML document such as
//!
//! ```toml
//! cache_capacity = 256
//!
//! [monte_carlo]
//! max_iterations = 20000
//! seed = 42
//! ```
//!
//! deserializes into a complete [`EngineConfig`].

use crate::error::{QdError, Result};
use serde::{Deserialize, Serialize};

/// Minimum vertex count of a buffer ring polygon
pub const MIN_RING_VERTICES: usize = 32;

/// Monte Carlo sampler settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloConfig {
    /// Largest iteration count a caller may request
    pub max_iterations: usize,
    /// Quantity standard deviation as a fraction of the quantity
    pub quantity_margin: f64,
    /// Sensitivity standard deviation as a fraction of the sensitivity
    pub sensitivity_sd_fraction: f64,
    /// Temperature standard deviation (K)
    pub temperature_sd_kelvin: f64,
    /// Samples per parallel chunk
    pub chunk_size: usize,
    /// Fixed seed; a random seed is drawn per run when absent
    pub seed: Option<u64>,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100_000,
            quantity_margin: 0.10,
            sensitivity_sd_fraction: 0.05,
            temperature_sd_kelvin: 2.0,
            chunk_size: 1024,
            seed: None,
        }
    }
}

/// Buffer ring polygon settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RingConfig {
    /// Vertices per ring, excluding the closing vertex
    pub vertices: usize,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self { vertices: 64 }
    }
}

/// Fragment model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FragmentConfig {
    /// Multiplier on the hazardous fragment distance
    pub safety_margin: f64,
}

impl Default for FragmentConfig {
    fn default() -> Self {
        Self { safety_margin: 1.5 }
    }
}

/// How separation between two lon/lat vertices is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Great-circle distance on a spherical earth
    #[default]
    Haversine,
    /// Equirectangular projection about the pair's mean latitude
    Planar,
}

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Entries kept in the base-distance cache (0 disables caching)
    pub cache_capacity: usize,
    /// Worker threads of the engine's pool; rayon picks when absent
    pub worker_threads: Option<usize>,
    /// Monte Carlo settings
    pub monte_carlo: MonteCarloConfig,
    /// Buffer ring settings
    pub rings: RingConfig,
    /// Fragment model settings
    pub fragment: FragmentConfig,
    /// Compliance distance metric
    pub distance_metric: DistanceMetric,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 1024,
            worker_threads: None,
            monte_carlo: MonteCarloConfig::default(),
            rings: RingConfig::default(),
            fragment: FragmentConfig::default(),
            distance_metric: DistanceMetric::default(),
        }
    }
}

impl EngineConfig {
    /// Check ranges serde cannot express.
    ///
    /// # Errors
    ///
    /// [`QdError::Configuration`] describing the first offending field.
    pub fn validate(&self) -> Result<()> {
        let mc = &self.monte_carlo;
        if mc.max_iterations == 0 {
            return Err(QdError::configuration(
                "monte_carlo.max_iterations must be at least 1",
            ));
        }
        if mc.chunk_size == 0 {
            return Err(QdError::configuration(
                "monte_carlo.chunk_size must be at least 1",
            ));
        }
        for (name, value) in [
            ("monte_carlo.quantity_margin", mc.quantity_margin),
            ("monte_carlo.sensitivity_sd_fraction", mc.sensitivity_sd_fraction),
            ("monte_carlo.temperature_sd_kelvin", mc.temperature_sd_kelvin),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(QdError::configuration(format!(
                    "{name} must be a finite non-negative number, got {value}"
                )));
            }
        }
        if self.rings.vertices < MIN_RING_VERTICES {
            return Err(QdError::configuration(format!(
                "rings.vertices must be at least {MIN_RING_VERTICES}, got {}",
                self.rings.vertices
            )));
        }
        let margin = self.fragment.safety_margin;
        if !(margin.is_finite() && margin > 0.0) {
            return Err(QdError::configuration(format!(
                "fragment.safety_margin must be > 0, got {margin}"
            )));
        }
        if self.worker_threads == Some(0) {
            return Err(QdError::configuration("worker_threads must be at least 1"));
        }
        Ok(())
    }
}
