//! Statistical properties of the Monte Carlo uncertainty analyzer
//!
//! The sampler is random by contract, so these tests assert properties of the
//! distribution rather than exact values. Seeds are fixed to keep CI stable.
//!
//! Run tests with: `cargo test --test monte_carlo_statistics`

use approx::assert_relative_eq;
use qd_core::{
    config::MonteCarloConfig, CalculationRequest, EngineConfig, KFactorType, MaterialProperties,
    Organization, QdEngine, QdError, WeightUnit,
};

fn engine_with(monte_carlo: MonteCarloConfig) -> QdEngine {
    QdEngine::new(EngineConfig {
        monte_carlo,
        ..EngineConfig::default()
    })
    .expect("engine")
}

fn seeded(seed: u64) -> MonteCarloConfig {
    MonteCarloConfig {
        seed: Some(seed),
        ..MonteCarloConfig::default()
    }
}

fn dod_ibd() -> CalculationRequest {
    CalculationRequest::new(1000.0, WeightUnit::Pounds, Organization::Dod, KFactorType::Ibd)
}

#[test]
fn test_interval_contains_mean_and_is_non_negative() {
    for seed in 0..10 {
        let result = engine_with(seeded(seed)).monte_carlo(&dod_ibd(), 2_000).unwrap();
        let [lower, upper] = result.confidence_interval_ft;
        assert!(lower >= 0.0);
        assert!(upper >= lower);
        assert!(lower <= result.mean_ft && result.mean_ft <= upper, "seed {seed}");
        assert!(result.std_dev_ft > 0.0);
        assert_eq!(result.iterations, 2_000);
        assert_eq!(result.seed, seed);
    }
}

#[test]
fn test_standard_error_shrinks_with_iterations() {
    let engine = engine_with(seeded(11));
    let coarse = engine.monte_carlo(&dod_ibd(), 1_000).unwrap();
    let fine = engine.monte_carlo(&dod_ibd(), 50_000).unwrap();
    assert!(fine.standard_error_ft < coarse.standard_error_ft);
    // Percentile interval converges rather than collapsing
    let width = |r: &qd_core::UncertaintyResult| {
        r.confidence_interval_ft[1] - r.confidence_interval_ft[0]
    };
    assert_relative_eq!(width(&fine), width(&coarse), max_relative = 0.25);
}

#[test]
fn test_interval_narrows_with_sampling_margin() {
    let wide = engine_with(MonteCarloConfig {
        quantity_margin: 0.2,
        ..seeded(5)
    })
    .monte_carlo(&dod_ibd(), 5_000)
    .unwrap();
    let narrow = engine_with(MonteCarloConfig {
        quantity_margin: 0.02,
        ..seeded(5)
    })
    .monte_carlo(&dod_ibd(), 5_000)
    .unwrap();
    let width = |r: &qd_core::UncertaintyResult| {
        r.confidence_interval_ft[1] - r.confidence_interval_ft[0]
    };
    assert!(width(&narrow) < width(&wide));
}

/// As every sampling margin goes to zero the mean is the deterministic distance
#[test]
fn test_mean_converges_to_deterministic_distance() {
    let request = dod_ibd().with_material(MaterialProperties::new(0.8, 6000.0, 1.0));
    let deterministic = engine_with(seeded(1))
        .calculate_safe_distance(&request)
        .unwrap()
        .distance_ft;

    let mut previous_error = f64::INFINITY;
    for margin in [0.2, 0.05, 0.005, 0.0] {
        let config = MonteCarloConfig {
            quantity_margin: margin,
            sensitivity_sd_fraction: margin / 4.0,
            temperature_sd_kelvin: margin * 10.0,
            ..seeded(3)
        };
        let result = engine_with(config).monte_carlo(&request, 5_000).unwrap();
        let error = (result.mean_ft - deterministic).abs();
        assert!(error <= previous_error + 0.01, "margin {margin}: {error} > {previous_error}");
        previous_error = error;
    }
    assert!(previous_error < 0.01, "zero-margin mean off by {previous_error}");
}

/// Sensitivity samples are clamped into `[0, 1]`. At the default sensitivity of 1.0 the
/// upper half of the distribution is cut off, so the mean sits below the deterministic
/// distance by `K W^(1/3) σ_s φ(0)` and the upper bound never exceeds it.
#[test]
fn test_full_sensitivity_clamp_biases_mean_low() {
    let config = MonteCarloConfig {
        quantity_margin: 0.0,
        temperature_sd_kelvin: 0.0,
        ..seeded(17)
    };
    let engine = engine_with(config);
    let deterministic = engine.calculate_safe_distance(&dod_ibd()).unwrap().distance_ft;
    assert_eq!(deterministic, 400.0);

    let result = engine.monte_carlo(&dod_ibd(), 50_000).unwrap();
    let sd = MonteCarloConfig::default().sensitivity_sd_fraction;
    let expected = deterministic * (1.0 - sd / (2.0 * std::f64::consts::PI).sqrt());
    assert_relative_eq!(result.mean_ft, expected, max_relative = 0.002);
    assert!(result.mean_ft < deterministic - 5.0);

    let [lower, upper] = result.confidence_interval_ft;
    assert!(upper <= deterministic + 1e-9);
    assert_relative_eq!(upper, deterministic, epsilon = 1e-6);
    assert!(lower < deterministic);
}

#[test]
fn test_unbounded_iterations_rejected() {
    let engine = engine_with(MonteCarloConfig {
        max_iterations: 10_000,
        ..seeded(1)
    });
    let err = engine.monte_carlo(&dod_ibd(), 10_001).unwrap_err();
    assert!(matches!(err, QdError::InvalidInput { field: "iterations", .. }));
}

#[test]
fn test_unseeded_runs_report_their_seed() {
    let engine = engine_with(MonteCarloConfig::default());
    let a = engine.monte_carlo(&dod_ibd(), 1_000).unwrap();
    let replay = engine_with(seeded(a.seed)).monte_carlo(&dod_ibd(), 1_000).unwrap();
    assert_eq!(a.mean_ft, replay.mean_ft);
    assert_eq!(a.confidence_interval_ft, replay.confidence_interval_ft);
}
