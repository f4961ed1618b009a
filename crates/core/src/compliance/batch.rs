//! Cancellable batch analysis over many facilities
//!
//! Facilities are analysed in parallel on whatever rayon pool the call runs in. Before
//! each facility starts, the batch checks its [`BatchControl`]; the analysis closure also
//! receives the control so it can give up between features of a large facility. Once
//! cancelled or past the deadline, remaining and interrupted facilities are listed as
//! not analysed while finished ones are kept. Result order is unspecified.

use super::analysis::{Facility, FacilityAnalysis};
use crate::error::Result;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Shared flag a caller flips to stop a running batch
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Fresh, uncancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Facilities already running finish normally.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether [`cancel`](Self::cancel) was called on any clone
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Cancellation and time-box settings of a batch
#[derive(Debug, Clone, Default)]
pub struct BatchControl {
    /// Cancellation flag
    pub token: CancellationToken,
    /// No facility starts after this instant
    pub deadline: Option<Instant>,
}

impl BatchControl {
    /// No cancellation, no deadline
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an existing token
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Stop starting new facilities at `deadline`
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Stop starting new facilities `timeout` from now
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Whether work should stop now (cancelled or past the deadline)
    pub fn is_stopped(&self) -> bool {
        self.stop_reason().is_some()
    }

    fn stop_reason(&self) -> Option<StopReason> {
        if self.token.is_cancelled() {
            Some(StopReason::Cancelled)
        } else if self.deadline.is_some_and(|d| Instant::now() >= d) {
            Some(StopReason::DeadlineExceeded)
        } else {
            None
        }
    }
}

/// Why a batch did not analyse every facility
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The token was cancelled
    Cancelled,
    /// The deadline passed
    DeadlineExceeded,
}

/// One finished facility
#[derive(Debug, Clone, PartialEq)]
pub struct BatchEntry {
    /// Facility identifier
    pub facility_id: String,
    /// Analysis, or the error that facility raised
    pub outcome: Result<FacilityAnalysis>,
}

/// Results of a batch run
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    /// Facilities that were analysed (successfully or not)
    pub completed: Vec<BatchEntry>,
    /// Facilities never started or interrupted before finishing
    pub not_analyzed: Vec<String>,
    /// Set when the batch was cut short
    pub stopped: Option<StopReason>,
}

impl BatchOutcome {
    /// Whether every facility was analysed
    pub fn is_complete(&self) -> bool {
        self.not_analyzed.is_empty()
    }
}

/// Analyse `facilities` in parallel with `analyze`, honouring `control`.
///
/// `analyze` returns `Ok(None)` when it stopped part-way through a facility.
pub fn run_batch<F>(facilities: &[Facility], control: &BatchControl, analyze: F) -> BatchOutcome
where
    F: Fn(&Facility, &BatchControl) -> Result<Option<FacilityAnalysis>> + Sync,
{
    let started = Instant::now();
    info!(facilities = facilities.len(), "batch compliance analysis started");

    let results: Vec<(String, Option<Result<FacilityAnalysis>>)> = facilities
        .par_iter()
        .map(|facility| {
            let outcome = if control.is_stopped() {
                None
            } else {
                analyze(facility, control).transpose()
            };
            (facility.id.clone(), outcome)
        })
        .collect();

    let mut completed = Vec::with_capacity(results.len());
    let mut not_analyzed = Vec::new();
    for (facility_id, outcome) in results {
        match outcome {
            Some(outcome) => completed.push(BatchEntry {
                facility_id,
                outcome,
            }),
            None => not_analyzed.push(facility_id),
        }
    }
    let stopped = if not_analyzed.is_empty() {
        None
    } else {
        control.stop_reason().or(Some(StopReason::Cancelled))
    };

    info!(
        completed = completed.len(),
        not_analyzed = not_analyzed.len(),
        stopped = ?stopped,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "batch compliance analysis finished"
    );
    BatchOutcome {
        completed,
        not_analyzed,
        stopped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::{analyze_facility_until, SurroundingFeature};
    use crate::config::DistanceMetric;
    use crate::core_types::{KFactorType, Organization, WeightUnit};
    use crate::physics::calculate_safe_distance;
    use crate::standards::StandardsRegistry;
    use geo_types::{point, Geometry};

    fn facilities(n: usize) -> Vec<Facility> {
        (0..n)
            .map(|i| Facility {
                id: format!("F{i}"),
                name: format!("Facility {i}"),
                geometry: Geometry::Point(point!(x: 0.0, y: 0.0)),
                net_explosive_weight: None,
                unit: None,
                hazard_division: "1.1".into(),
                organization: Organization::Dod,
                subtype: None,
            })
            .collect()
    }

    fn skip(facility: &Facility, _: &BatchControl) -> Result<Option<FacilityAnalysis>> {
        Ok(Some(FacilityAnalysis::NoWeightSpecified {
            facility_id: facility.id.clone(),
        }))
    }

    #[test]
    fn test_uncontrolled_batch_completes() {
        let outcome = run_batch(&facilities(8), &BatchControl::new(), skip);
        assert!(outcome.is_complete());
        assert_eq!(outcome.completed.len(), 8);
        assert_eq!(outcome.stopped, None);
    }

    #[test]
    fn test_cancel_mid_batch_keeps_partial_results() {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build()
            .unwrap();
        let control = BatchControl::new();
        let token = control.token.clone();
        let outcome = pool.install(|| {
            run_batch(&facilities(20), &control, |facility, control| {
                token.cancel();
                skip(facility, control)
            })
        });
        assert!(!outcome.completed.is_empty());
        assert!(!outcome.not_analyzed.is_empty());
        assert_eq!(outcome.completed.len() + outcome.not_analyzed.len(), 20);
        assert_eq!(outcome.stopped, Some(StopReason::Cancelled));
    }

    #[test]
    fn test_past_deadline_analyses_nothing() {
        let control = BatchControl::new().with_deadline(Instant::now());
        let outcome = run_batch(&facilities(4), &control, skip);
        assert!(outcome.completed.is_empty());
        assert_eq!(outcome.not_analyzed.len(), 4);
        assert_eq!(outcome.stopped, Some(StopReason::DeadlineExceeded));
    }

    #[test]
    fn test_cancel_inside_facility_is_not_reported_complete() {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build()
            .unwrap();
        let registry = StandardsRegistry::builtin();
        let mut heavy = facilities(1);
        heavy[0].net_explosive_weight = Some(1000.0);
        let features: Vec<SurroundingFeature> = (0..50)
            .map(|i| SurroundingFeature {
                id: format!("B{i}"),
                name: format!("Building {i}"),
                geometry: Some(Geometry::Point(point!(x: 0.0, y: 0.01))),
                is_qd_ring: false,
            })
            .collect();

        let control = BatchControl::new();
        let token = control.token.clone();
        let outcome = pool.install(|| {
            run_batch(&heavy, &control, |facility, control| {
                analyze_facility_until(
                    facility,
                    &features,
                    KFactorType::Ibd,
                    WeightUnit::Pounds,
                    DistanceMetric::Planar,
                    |request| calculate_safe_distance(&registry, request, 1.5),
                    || {
                        // Cancelled after the facility already started
                        token.cancel();
                        control.is_stopped()
                    },
                )
            })
        });
        assert!(outcome.completed.is_empty());
        assert_eq!(outcome.not_analyzed, vec!["F0".to_string()]);
        assert_eq!(outcome.stopped, Some(StopReason::Cancelled));
    }
}
