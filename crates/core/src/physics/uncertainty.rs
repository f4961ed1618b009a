//! Monte Carlo uncertainty of the safe distance
//!
//! Each iteration perturbs the three inputs with the largest measurement uncertainty
//! and re-evaluates the scaling law:
//!
//! ```text
//! W ~ N(W, (W · margin)²)        clamped to ≥ 0
//! s ~ N(s, (s · 0.05)²)          clamped to [0, 1]
//! T ~ N(T, 2.0²)
//! D = K · (W · TNT_eq)^(1/3) · f_T(T) · f_H · s
//! ```
//!
//! The sampler is intentionally non-deterministic across runs unless a seed is
//! configured. Iterations are split into fixed-size chunks and chunk `i` draws from a
//! `StdRng` seeded with `seed + i`, so a fixed seed reproduces the same samples no matter
//! how rayon schedules the chunks. The seed actually used is always reported.
//!
//! Gaussian deviates use the Box-Muller transform.

use crate::config::MonteCarloConfig;
use crate::core_types::conditions::temperature_factor;
use crate::core_types::{EnvironmentalConditions, MaterialProperties, Pounds};
use crate::error::{ensure_finite, QdError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;

/// Two-sided confidence level of the reported interval
pub const CONFIDENCE_LEVEL: f64 = 0.95;

/// Sampling parameters in effect for a run
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplingParameters {
    /// Quantity standard deviation as a fraction of the quantity
    pub quantity_margin: f64,
    /// Sensitivity standard deviation as a fraction of the sensitivity
    pub sensitivity_sd_fraction: f64,
    /// Temperature standard deviation (K)
    pub temperature_sd_kelvin: f64,
}

/// Monte Carlo summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UncertaintyResult {
    /// Sample mean (ft)
    pub mean_ft: f64,
    /// Sample standard deviation (ft)
    pub std_dev_ft: f64,
    /// Standard error of the mean, `std_dev / sqrt(n)` (ft)
    pub standard_error_ft: f64,
    /// 2.5th and 97.5th percentiles (ft)
    pub confidence_interval_ft: [f64; 2],
    /// Confidence level of the interval
    pub confidence_level: f64,
    /// Number of samples drawn
    pub iterations: usize,
    /// Seed of chunk 0
    pub seed: u64,
    /// K-factor the samples were scaled with
    pub k_factor: f64,
    /// Sampling parameters
    pub sampling: SamplingParameters,
}

struct Sampler {
    k_factor: f64,
    quantity_lbs: f64,
    tnt_equivalence: f64,
    sensitivity: f64,
    temperature: f64,
    humidity_factor: f64,
    params: SamplingParameters,
}

impl Sampler {
    fn draw<R: Rng>(&self, rng: &mut R) -> f64 {
        let quantity = (self.quantity_lbs
            + self.quantity_lbs * self.params.quantity_margin * standard_normal(rng))
        .max(0.0);
        let sensitivity = (self.sensitivity
            + self.sensitivity * self.params.sensitivity_sd_fraction * standard_normal(rng))
        .clamp(0.0, 1.0);
        let temperature =
            self.temperature + self.params.temperature_sd_kelvin * standard_normal(rng);

        let base = self.k_factor * (quantity * self.tnt_equivalence).cbrt();
        (base * temperature_factor(temperature) * self.humidity_factor * sensitivity).max(0.0)
    }
}

/// Standard normal deviate via Box-Muller
fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    // 1 - [0, 1) keeps u1 away from zero
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

/// Linearly interpolated percentile of sorted data, `p` in `[0, 1]`
pub(crate) fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let position = p.clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = position.floor() as usize;
            let upper = position.ceil() as usize;
            let weight = position - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * weight
        }
    }
}

/// Run the sampler on the current rayon pool.
///
/// # Errors
///
/// [`QdError::InvalidInput`] for zero iterations, iterations above
/// `config.max_iterations`, a non-positive quantity or out-of-range material and
/// environment; [`QdError::ComputationOverflow`] if the summary is non-finite.
pub fn monte_carlo(
    k_factor: f64,
    quantity_lbs: Pounds,
    material: &MaterialProperties,
    environment: &EnvironmentalConditions,
    iterations: usize,
    config: &MonteCarloConfig,
) -> Result<UncertaintyResult> {
    if iterations == 0 {
        return Err(QdError::invalid_input("iterations", "must be at least 1"));
    }
    if iterations > config.max_iterations {
        return Err(QdError::invalid_input(
            "iterations",
            format!(
                "{iterations} exceeds the configured cap of {}",
                config.max_iterations
            ),
        ));
    }
    if !(quantity_lbs.is_finite() && *quantity_lbs > 0.0) {
        return Err(QdError::invalid_input(
            "quantity",
            format!("net explosive weight must be > 0, got {quantity_lbs}"),
        ));
    }
    material.validate()?;
    environment.validate()?;

    let seed = config.seed.unwrap_or_else(|| rand::rng().random());
    let params = SamplingParameters {
        quantity_margin: config.quantity_margin,
        sensitivity_sd_fraction: config.sensitivity_sd_fraction,
        temperature_sd_kelvin: config.temperature_sd_kelvin,
    };
    let sampler = Sampler {
        k_factor,
        quantity_lbs: *quantity_lbs,
        tnt_equivalence: material.tnt_equivalence,
        sensitivity: material.effective_sensitivity(),
        temperature: environment.temperature,
        humidity_factor: environment.humidity_factor(),
        params,
    };

    let chunk_size = config.chunk_size.max(1);
    let chunks = iterations.div_ceil(chunk_size);
    let mut samples: Vec<f64> = (0..chunks)
        .into_par_iter()
        .flat_map_iter(|chunk| {
            let len = chunk_size.min(iterations - chunk * chunk_size);
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(chunk as u64));
            let mut out = Vec::with_capacity(len);
            for _ in 0..len {
                out.push(sampler.draw(&mut rng));
            }
            out
        })
        .collect();

    let n = samples.len() as f64;
    let mean = ensure_finite("monte carlo mean", samples.iter().sum::<f64>() / n)?;
    let variance = if samples.len() > 1 {
        samples.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / (n - 1.0)
    } else {
        0.0
    };
    let std_dev = ensure_finite("monte carlo std dev", variance.sqrt())?;

    samples.sort_unstable_by(f64::total_cmp);
    let tail = (1.0 - CONFIDENCE_LEVEL) / 2.0;
    let lower = percentile(&samples, tail);
    let upper = percentile(&samples, 1.0 - tail);

    tracing::debug!(
        iterations,
        seed,
        mean,
        std_dev,
        lower,
        upper,
        "monte carlo uncertainty complete"
    );

    Ok(UncertaintyResult {
        mean_ft: mean,
        std_dev_ft: std_dev,
        standard_error_ft: std_dev / n.sqrt(),
        confidence_interval_ft: [lower, upper],
        confidence_level: CONFIDENCE_LEVEL,
        iterations: samples.len(),
        seed,
        k_factor,
        sampling: params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(seed: u64) -> MonteCarloConfig {
        MonteCarloConfig {
            seed: Some(seed),
            ..MonteCarloConfig::default()
        }
    }

    #[test]
    fn test_percentile_interpolates() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&data, 0.0), 1.0);
        assert_eq!(percentile(&data, 0.5), 3.0);
        assert_eq!(percentile(&data, 1.0), 5.0);
        assert!((percentile(&data, 0.125) - 1.5).abs() < 1e-12);
        assert_eq!(percentile(&[7.0], 0.975), 7.0);
    }

    #[test]
    fn test_fixed_seed_is_reproducible() {
        let material = MaterialProperties::default();
        let env = EnvironmentalConditions::default();
        let a = monte_carlo(40.0, Pounds::new(1000.0), &material, &env, 5000, &seeded(7)).unwrap();
        let b = monte_carlo(40.0, Pounds::new(1000.0), &material, &env, 5000, &seeded(7)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.seed, 7);
    }

    #[test]
    fn test_iteration_bounds() {
        let material = MaterialProperties::default();
        let env = EnvironmentalConditions::default();
        let config = MonteCarloConfig {
            max_iterations: 100,
            ..seeded(1)
        };
        assert!(monte_carlo(40.0, Pounds::new(1000.0), &material, &env, 0, &config).is_err());
        let err =
            monte_carlo(40.0, Pounds::new(1000.0), &material, &env, 101, &config).unwrap_err();
        assert!(matches!(err, QdError::InvalidInput { field: "iterations", .. }));
        assert!(monte_carlo(40.0, Pounds::new(1000.0), &material, &env, 100, &config).is_ok());
    }

    #[test]
    fn test_single_iteration_degenerate_interval() {
        let result = monte_carlo(
            40.0,
            Pounds::new(1000.0),
            &MaterialProperties::default(),
            &EnvironmentalConditions::default(),
            1,
            &seeded(3),
        )
        .unwrap();
        assert_eq!(result.std_dev_ft, 0.0);
        assert_eq!(result.confidence_interval_ft[0], result.mean_ft);
        assert_eq!(result.confidence_interval_ft[1], result.mean_ft);
    }
}
