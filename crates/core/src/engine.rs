//! The QD engine: one entry point over every calculator
//!
//! [`QdEngine`] owns the standards registry handle, the validated configuration, a
//! bounded cache of uncorrected base distances and a dedicated rayon pool. Monte Carlo
//! runs and batch compliance analysis execute on that pool so a heavy request cannot
//! starve the caller's own rayon work.
//!
//! The cache is keyed on the value-typed inputs of the base stage (quantity, unit,
//! organization, K-factor type, sub-type) and tagged with the registry generation it was
//! filled under. Swapping the registry empties it.

use crate::compliance::{
    analyze_facility_until, analyze_facility_with, run_batch, BatchControl, BatchOutcome,
    Facility, FacilityAnalysis, SurroundingFeature,
};
use crate::config::EngineConfig;
use crate::core_types::{CalculationRequest, Casing, KFactorType, WeightUnit};
use crate::error::{QdError, Result};
use crate::geometry::{self, BufferRing, DEFAULT_RING_MULTIPLES};
use crate::physics::{
    self, apply_corrections, BaseDistance, BaseDistanceKey, FragmentResult, SafeDistanceResult,
    UncertaintyResult,
};
use crate::standards::{RegistryHandle, RegistrySnapshot, StandardsRegistry};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// FIFO-bounded base-distance cache
#[derive(Debug, Default)]
struct DistanceCache {
    generation: u64,
    entries: FxHashMap<BaseDistanceKey, BaseDistance>,
    order: VecDeque<BaseDistanceKey>,
}

impl DistanceCache {
    fn clear(&mut self, generation: u64) {
        self.entries.clear();
        self.order.clear();
        self.generation = generation;
    }

    fn get(&mut self, generation: u64, key: &BaseDistanceKey) -> Option<BaseDistance> {
        if generation != self.generation {
            self.clear(generation);
            return None;
        }
        self.entries.get(key).cloned()
    }

    fn insert(&mut self, generation: u64, key: BaseDistanceKey, value: BaseDistance, cap: usize) {
        // Filled under a registry that has since been replaced
        if generation < self.generation {
            return;
        }
        if generation > self.generation {
            self.clear(generation);
        }
        if self.entries.contains_key(&key) {
            return;
        }
        while self.order.len() >= cap {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, value);
    }
}

/// Quantity-distance engine
#[derive(Debug)]
pub struct QdEngine {
    registry: RegistryHandle,
    config: EngineConfig,
    cache: Mutex<DistanceCache>,
    pool: rayon::ThreadPool,
}

impl QdEngine {
    /// Engine over the built-in DOD, DOE, NATO and Air Force tables.
    ///
    /// # Errors
    ///
    /// [`QdError::Configuration`] if `config` is invalid or the worker pool cannot start.
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_registry(StandardsRegistry::builtin(), config)
    }

    /// Engine over a custom registry.
    ///
    /// # Errors
    ///
    /// [`QdError::Configuration`] if `config` is invalid or the worker pool cannot start.
    pub fn with_registry(registry: StandardsRegistry, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads.unwrap_or(0))
            .thread_name(|i| format!("qd-worker-{i}"))
            .build()
            .map_err(|e| QdError::configuration(format!("worker pool: {e}")))?;
        info!(
            threads = pool.current_num_threads(),
            cache_capacity = config.cache_capacity,
            organizations = registry.organizations().count(),
            "QD engine ready"
        );
        Ok(Self {
            registry: RegistryHandle::new(registry),
            config,
            cache: Mutex::new(DistanceCache::default()),
            pool,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current registry and its generation
    pub fn registry(&self) -> RegistrySnapshot {
        self.registry.snapshot()
    }

    /// Replace the standards registry atomically and drop every cached distance.
    /// Calculations already running finish against the registry they started with.
    pub fn swap_registry(&self, registry: StandardsRegistry) -> u64 {
        let generation = self.registry.swap(registry);
        self.lock_cache().clear(generation);
        generation
    }

    /// Entries currently cached
    pub fn cached_distances(&self) -> usize {
        self.lock_cache().entries.len()
    }

    fn lock_cache(&self) -> MutexGuard<'_, DistanceCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn base_distance(
        &self,
        snapshot: &RegistrySnapshot,
        request: &CalculationRequest,
    ) -> Result<BaseDistance> {
        let capacity = self.config.cache_capacity;
        if capacity == 0 {
            return physics::base_distance(&snapshot.registry, request);
        }
        let key = BaseDistanceKey::for_request(request);
        if let Some(hit) = self.lock_cache().get(snapshot.generation, &key) {
            debug!(quantity = request.quantity, "base distance cache hit");
            return Ok(hit);
        }
        let base = physics::base_distance(&snapshot.registry, request)?;
        self.lock_cache()
            .insert(snapshot.generation, key, base.clone(), capacity);
        Ok(base)
    }

    /// Deterministic safe distance with trace and citation.
    ///
    /// # Errors
    ///
    /// See [`physics::calculate_safe_distance`].
    pub fn calculate_safe_distance(
        &self,
        request: &CalculationRequest,
    ) -> Result<SafeDistanceResult> {
        let snapshot = self.registry();
        let base = self.base_distance(&snapshot, request)?;
        apply_corrections(&base, request, self.config.fragment.safety_margin)
    }

    /// Hazardous fragment distance with the configured safety margin.
    ///
    /// # Errors
    ///
    /// See [`physics::calculate_fragment_distance`].
    pub fn calculate_fragment_distance(
        &self,
        quantity: f64,
        unit: WeightUnit,
        casing: &Casing,
    ) -> Result<FragmentResult> {
        physics::calculate_fragment_distance(
            quantity,
            unit,
            casing,
            self.config.fragment.safety_margin,
        )
    }

    /// Monte Carlo uncertainty around `request`, run on the engine's pool.
    ///
    /// The K-factor comes from the request's organization, category and sub-type; the
    /// sampled inputs are its quantity, material and environment.
    ///
    /// # Errors
    ///
    /// See [`physics::monte_carlo`]; also any K-factor resolution error.
    pub fn monte_carlo(
        &self,
        request: &CalculationRequest,
        iterations: usize,
    ) -> Result<UncertaintyResult> {
        let snapshot = self.registry();
        let base = self.base_distance(&snapshot, request)?;
        let material = request.material_or_default();
        let environment = request.environment_or_default();
        self.pool.install(|| {
            physics::monte_carlo(
                base.k_factor.value,
                base.quantity_lbs,
                &material,
                &environment,
                iterations,
                &self.config.monte_carlo,
            )
        })
    }

    /// Buffer rings around `center` (`[lon, lat]`) at each K-factor multiple.
    ///
    /// # Errors
    ///
    /// See [`geometry::generate_rings`] and [`Self::calculate_safe_distance`].
    pub fn generate_rings(
        &self,
        center: [f64; 2],
        request: &CalculationRequest,
        multiples: &[f64],
        uncertainty: Option<f64>,
    ) -> Result<Vec<BufferRing>> {
        let safe_distance = self.calculate_safe_distance(request)?;
        geometry::generate_rings(
            center,
            &safe_distance,
            multiples,
            uncertainty,
            self.config.rings.vertices,
        )
    }

    /// Four evenly spaced rings at 0.25, 0.5, 0.75 and 1.0 times the safe distance.
    ///
    /// # Errors
    ///
    /// See [`Self::generate_rings`].
    pub fn generate_rings_default(
        &self,
        center: [f64; 2],
        request: &CalculationRequest,
    ) -> Result<Vec<BufferRing>> {
        self.generate_rings(center, request, &DEFAULT_RING_MULTIPLES, None)
    }

    /// Compliance of one facility against its surroundings.
    ///
    /// # Errors
    ///
    /// [`QdError::InvalidInput`] for a negative weight, plus any safe-distance error.
    pub fn analyze_facility(
        &self,
        facility: &Facility,
        features: &[SurroundingFeature],
        k_factor_type: KFactorType,
        default_unit: WeightUnit,
    ) -> Result<FacilityAnalysis> {
        analyze_facility_with(
            facility,
            features,
            k_factor_type,
            default_unit,
            self.config.distance_metric,
            |request| self.calculate_safe_distance(request),
        )
    }

    /// Compliance of many facilities on the engine's pool, cancellable through `control`.
    ///
    /// Cancellation is observed between facilities and between the features of one
    /// facility; an interrupted facility is listed as not analysed.
    pub fn analyze_batch(
        &self,
        facilities: &[Facility],
        features: &[SurroundingFeature],
        k_factor_type: KFactorType,
        default_unit: WeightUnit,
        control: &BatchControl,
    ) -> BatchOutcome {
        self.pool.install(|| {
            run_batch(facilities, control, |facility, control| {
                analyze_facility_until(
                    facility,
                    features,
                    k_factor_type,
                    default_unit,
                    self.config.distance_metric,
                    |request| self.calculate_safe_distance(request),
                    || control.is_stopped(),
                )
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::Organization;
    use crate::standards::DodStandard;
    use approx::assert_relative_eq;

    fn request(quantity: f64) -> CalculationRequest {
        CalculationRequest::new(
            quantity,
            WeightUnit::Pounds,
            Organization::Dod,
            KFactorType::Ibd,
        )
    }

    #[test]
    fn test_repeat_requests_hit_cache() {
        let engine = QdEngine::new(EngineConfig::default()).unwrap();
        let a = engine.calculate_safe_distance(&request(1000.0)).unwrap();
        let b = engine.calculate_safe_distance(&request(1000.0)).unwrap();
        assert_eq!(a, b);
        assert_eq!(engine.cached_distances(), 1);
    }

    #[test]
    fn test_cache_is_bounded() {
        let config = EngineConfig {
            cache_capacity: 3,
            ..EngineConfig::default()
        };
        let engine = QdEngine::new(config).unwrap();
        for q in [1.0, 2.0, 3.0, 4.0, 5.0] {
            engine.calculate_safe_distance(&request(q)).unwrap();
        }
        assert_eq!(engine.cached_distances(), 3);
    }

    #[test]
    fn test_swap_invalidates_cache() {
        let engine = QdEngine::new(EngineConfig::default()).unwrap();
        let before = engine.calculate_safe_distance(&request(1000.0)).unwrap();
        assert_relative_eq!(before.distance_ft, 400.0);

        let stricter = StandardsRegistry::builder()
            .with_standard(&DodStandard)
            .with_default(Organization::Dod, KFactorType::Ibd, 50.0, "local supplement")
            .build()
            .unwrap();
        assert_eq!(engine.swap_registry(stricter), 1);
        assert_eq!(engine.cached_distances(), 0);

        let after = engine.calculate_safe_distance(&request(1000.0)).unwrap();
        assert_relative_eq!(after.distance_ft, 500.0);
        assert_eq!(after.citation, "local supplement");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = EngineConfig::default();
        config.rings.vertices = 8;
        assert!(matches!(
            QdEngine::new(config),
            Err(QdError::Configuration(_))
        ));
    }
}
