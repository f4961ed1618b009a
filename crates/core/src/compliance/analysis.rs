//! Per-facility siting compliance
//!
//! The facility's required separation comes from the safe-distance calculator. Every
//! surrounding feature except other QD rings and the facility itself is then measured
//! and sorted into one of three lists:
//!
//! - **violation**: `actual < required`
//! - **clearance**: `actual >= required`
//! - **indeterminate**: the separation could not be measured (no geometry, empty or
//!   invalid coordinates). Never counted as compliant.
//!
//! A bad feature never aborts the analysis of the rest.

use crate::config::{DistanceMetric, FragmentConfig};
use crate::core_types::{
    CalculationRequest, KFactorType, Organization, WeightUnit, DEFAULT_HAZARD_DIVISION,
};
use crate::error::{QdError, Result};
use crate::geometry::min_distance_ft;
use crate::physics::{calculate_safe_distance, SafeDistanceResult};
use crate::standards::StandardsRegistry;
use geo_types::Geometry;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

fn default_hazard_division() -> String {
    DEFAULT_HAZARD_DIVISION.to_string()
}

/// A potential explosion site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    /// Identifier, also used to exclude the facility from its own feature list
    pub id: String,
    /// Display name
    pub name: String,
    /// Point or polygon footprint, lon/lat
    pub geometry: Geometry<f64>,
    /// Net explosive weight; `None` or zero means nothing is stored
    #[serde(default)]
    pub net_explosive_weight: Option<f64>,
    /// Unit of the weight; the caller's default unit when absent
    #[serde(default)]
    pub unit: Option<WeightUnit>,
    /// Hazard division code
    #[serde(default = "default_hazard_division")]
    pub hazard_division: String,
    /// Governing organization
    pub organization: Organization,
    /// Facility type / LOP class used for K-factor lookup
    #[serde(default)]
    pub subtype: Option<String>,
}

impl Facility {
    /// Safe-distance request for this facility, or `None` when no weight is stored.
    ///
    /// # Errors
    ///
    /// [`QdError::InvalidInput`] for a negative or non-finite weight.
    pub fn request(
        &self,
        k_factor_type: KFactorType,
        default_unit: WeightUnit,
    ) -> Result<Option<CalculationRequest>> {
        let weight = match self.net_explosive_weight {
            None => return Ok(None),
            Some(w) if w == 0.0 => return Ok(None),
            Some(w) if !w.is_finite() || w < 0.0 => {
                return Err(QdError::invalid_input(
                    "net_explosive_weight",
                    format!("facility {} has weight {w}", self.id),
                ))
            }
            Some(w) => w,
        };
        let mut request = CalculationRequest::new(
            weight,
            self.unit.unwrap_or(default_unit),
            self.organization,
            k_factor_type,
        )
        .with_hazard_division(self.hazard_division.clone());
        if let Some(subtype) = &self.subtype {
            request = request.with_subtype(subtype.clone());
        }
        Ok(Some(request))
    }
}

/// A feature around the facility: building, road, boundary, another facility
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurroundingFeature {
    /// Identifier
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Lon/lat geometry; a feature without one is indeterminate
    #[serde(default)]
    pub geometry: Option<Geometry<f64>>,
    /// Buffer ring drawn by a previous analysis, not a real exposure
    #[serde(default)]
    pub is_qd_ring: bool,
}

/// Feature closer than the required separation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplianceViolation {
    /// Feature identifier
    pub feature_id: String,
    /// Feature name
    pub feature_name: String,
    /// Measured separation (ft)
    pub actual_distance_ft: f64,
    /// Required separation (ft)
    pub required_distance_ft: f64,
    /// `required - actual` (ft)
    pub deficiency_ft: f64,
    /// Deficiency as a percentage of the requirement
    pub percent_deficient: f64,
}

/// Feature at or beyond the required separation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureClearance {
    /// Feature identifier
    pub feature_id: String,
    /// Feature name
    pub feature_name: String,
    /// Measured separation (ft)
    pub actual_distance_ft: f64,
    /// Required separation (ft)
    pub required_distance_ft: f64,
    /// `actual - required` (ft)
    pub margin_ft: f64,
}

/// Feature whose separation could not be measured
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndeterminateFeature {
    /// Feature identifier
    pub feature_id: String,
    /// Feature name
    pub feature_name: String,
    /// Why the check was skipped
    pub reason: String,
}

/// Outcome of a single separation check
#[derive(Debug, Clone, PartialEq)]
pub enum SeparationCheck {
    /// `actual >= required`
    Clear(FeatureClearance),
    /// `actual < required`
    Violation(ComplianceViolation),
}

/// Compare a measured separation with the requirement.
pub fn check_separation(
    feature: &SurroundingFeature,
    actual_distance_ft: f64,
    required_distance_ft: f64,
) -> SeparationCheck {
    if actual_distance_ft < required_distance_ft {
        let deficiency_ft = required_distance_ft - actual_distance_ft;
        SeparationCheck::Violation(ComplianceViolation {
            feature_id: feature.id.clone(),
            feature_name: feature.name.clone(),
            actual_distance_ft,
            required_distance_ft,
            deficiency_ft,
            percent_deficient: deficiency_ft / required_distance_ft * 100.0,
        })
    } else {
        SeparationCheck::Clear(FeatureClearance {
            feature_id: feature.id.clone(),
            feature_name: feature.name.clone(),
            actual_distance_ft,
            required_distance_ft,
            margin_ft: actual_distance_ft - required_distance_ft,
        })
    }
}

/// Overall verdict of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    /// Every measurable feature clears and none were indeterminate
    Compliant,
    /// At least one violation
    NonCompliant,
    /// No violations, but some features could not be measured
    Indeterminate,
}

/// Compliance report of one facility
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplianceReport {
    /// Facility identifier
    pub facility_id: String,
    /// Facility name
    pub facility_name: String,
    /// Verdict
    pub status: ComplianceStatus,
    /// Required separation calculation
    pub safe_distance: SafeDistanceResult,
    /// Governing citation
    pub citation: String,
    /// Features inside the required separation
    pub violations: Vec<ComplianceViolation>,
    /// Features that clear it
    pub clearances: Vec<FeatureClearance>,
    /// Features that could not be measured
    pub indeterminate: Vec<IndeterminateFeature>,
}

impl ComplianceReport {
    /// `true` only when every feature was measured and cleared
    pub fn is_compliant(&self) -> bool {
        self.status == ComplianceStatus::Compliant
    }
}

/// Result of analysing one facility
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FacilityAnalysis {
    /// Facility holds explosives and was analysed
    Analyzed(Box<ComplianceReport>),
    /// Facility has no (or zero) net explosive weight and was skipped
    NoWeightSpecified {
        /// Facility identifier
        facility_id: String,
    },
}

impl FacilityAnalysis {
    /// Facility identifier
    pub fn facility_id(&self) -> &str {
        match self {
            Self::Analyzed(report) => &report.facility_id,
            Self::NoWeightSpecified { facility_id } => facility_id,
        }
    }

    /// The report, if the facility was analysed
    pub fn report(&self) -> Option<&ComplianceReport> {
        match self {
            Self::Analyzed(report) => Some(report.as_ref()),
            Self::NoWeightSpecified { .. } => None,
        }
    }
}

/// Findings accumulated while measuring features
#[derive(Debug, Default)]
struct Findings {
    violations: Vec<ComplianceViolation>,
    clearances: Vec<FeatureClearance>,
    indeterminate: Vec<IndeterminateFeature>,
}

impl Findings {
    fn measure(
        &mut self,
        facility: &Facility,
        feature: &SurroundingFeature,
        required: f64,
        metric: DistanceMetric,
    ) {
        if feature.is_qd_ring || feature.id == facility.id {
            return;
        }
        let Some(geometry) = &feature.geometry else {
            warn!(facility = %facility.id, feature = %feature.id, "feature has no geometry");
            self.indeterminate.push(IndeterminateFeature {
                feature_id: feature.id.clone(),
                feature_name: feature.name.clone(),
                reason: "no geometry".to_string(),
            });
            return;
        };
        match min_distance_ft(&facility.geometry, geometry, metric) {
            Ok(actual) => match check_separation(feature, actual, required) {
                SeparationCheck::Clear(clearance) => self.clearances.push(clearance),
                SeparationCheck::Violation(violation) => self.violations.push(violation),
            },
            Err(err) => {
                warn!(
                    facility = %facility.id,
                    feature = %feature.id,
                    error = %err,
                    "separation indeterminate"
                );
                self.indeterminate.push(IndeterminateFeature {
                    feature_id: feature.id.clone(),
                    feature_name: feature.name.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }

    fn into_report(
        mut self,
        facility: &Facility,
        safe_distance: SafeDistanceResult,
    ) -> ComplianceReport {
        // Worst deficiency first; ties by feature id
        self.violations.sort_by(|a, b| {
            b.deficiency_ft
                .total_cmp(&a.deficiency_ft)
                .then_with(|| a.feature_id.cmp(&b.feature_id))
        });

        let status = if !self.violations.is_empty() {
            ComplianceStatus::NonCompliant
        } else if !self.indeterminate.is_empty() {
            ComplianceStatus::Indeterminate
        } else {
            ComplianceStatus::Compliant
        };
        debug!(
            facility = %facility.id,
            required = safe_distance.distance_ft,
            violations = self.violations.len(),
            clearances = self.clearances.len(),
            indeterminate = self.indeterminate.len(),
            "facility assessed"
        );

        ComplianceReport {
            facility_id: facility.id.clone(),
            facility_name: facility.name.clone(),
            status,
            citation: safe_distance.citation.clone(),
            safe_distance,
            violations: self.violations,
            clearances: self.clearances,
            indeterminate: self.indeterminate,
        }
    }
}

/// Measure every feature against an already computed safe distance.
///
/// Violations are ordered worst deficiency first.
pub fn assess_features(
    facility: &Facility,
    features: &[SurroundingFeature],
    safe_distance: SafeDistanceResult,
    metric: DistanceMetric,
) -> ComplianceReport {
    let mut findings = Findings::default();
    for feature in features {
        findings.measure(facility, feature, safe_distance.distance_ft, metric);
    }
    findings.into_report(facility, safe_distance)
}

/// [`assess_features`], checking `stop` before each feature. Returns `None` once `stop`
/// reports true; a partially measured facility is never reported.
pub fn assess_features_until<S>(
    facility: &Facility,
    features: &[SurroundingFeature],
    safe_distance: SafeDistanceResult,
    metric: DistanceMetric,
    stop: S,
) -> Option<ComplianceReport>
where
    S: Fn() -> bool,
{
    let mut findings = Findings::default();
    for feature in features {
        if stop() {
            debug!(facility = %facility.id, "assessment interrupted");
            return None;
        }
        findings.measure(facility, feature, safe_distance.distance_ft, metric);
    }
    Some(findings.into_report(facility, safe_distance))
}

/// Required separation of `facility`, or `None` when it stores no explosives.
fn required_separation<F>(
    facility: &Facility,
    k_factor_type: KFactorType,
    default_unit: WeightUnit,
    safe_distance: F,
) -> Result<Option<SafeDistanceResult>>
where
    F: FnOnce(&CalculationRequest) -> Result<SafeDistanceResult>,
{
    match facility.request(k_factor_type, default_unit)? {
        Some(request) => safe_distance(&request).map(Some),
        None => {
            debug!(facility = %facility.id, "no explosive weight specified; skipped");
            Ok(None)
        }
    }
}

fn no_weight(facility: &Facility) -> FacilityAnalysis {
    FacilityAnalysis::NoWeightSpecified {
        facility_id: facility.id.clone(),
    }
}

/// Analyse one facility, obtaining its required separation from `safe_distance`.
///
/// # Errors
///
/// [`QdError::InvalidInput`] for a negative weight, plus whatever `safe_distance`
/// returns. Problems with individual features are reported as indeterminate, not as
/// errors.
pub fn analyze_facility_with<F>(
    facility: &Facility,
    features: &[SurroundingFeature],
    k_factor_type: KFactorType,
    default_unit: WeightUnit,
    metric: DistanceMetric,
    safe_distance: F,
) -> Result<FacilityAnalysis>
where
    F: FnOnce(&CalculationRequest) -> Result<SafeDistanceResult>,
{
    let Some(required) =
        required_separation(facility, k_factor_type, default_unit, safe_distance)?
    else {
        return Ok(no_weight(facility));
    };
    Ok(FacilityAnalysis::Analyzed(Box::new(assess_features(
        facility, features, required, metric,
    ))))
}

/// [`analyze_facility_with`] that gives up between features once `stop` reports true.
///
/// `Ok(None)` means the facility was interrupted and has no result.
///
/// # Errors
///
/// See [`analyze_facility_with`].
pub fn analyze_facility_until<F, S>(
    facility: &Facility,
    features: &[SurroundingFeature],
    k_factor_type: KFactorType,
    default_unit: WeightUnit,
    metric: DistanceMetric,
    safe_distance: F,
    stop: S,
) -> Result<Option<FacilityAnalysis>>
where
    F: FnOnce(&CalculationRequest) -> Result<SafeDistanceResult>,
    S: Fn() -> bool,
{
    let Some(required) =
        required_separation(facility, k_factor_type, default_unit, safe_distance)?
    else {
        return Ok(Some(no_weight(facility)));
    };
    Ok(
        assess_features_until(facility, features, required, metric, stop)
            .map(|report| FacilityAnalysis::Analyzed(Box::new(report))),
    )
}

/// Analyse one facility against its surroundings without caching.
///
/// # Errors
///
/// See [`analyze_facility_with`].
pub fn analyze_facility(
    registry: &StandardsRegistry,
    facility: &Facility,
    features: &[SurroundingFeature],
    k_factor_type: KFactorType,
    default_unit: WeightUnit,
    metric: DistanceMetric,
) -> Result<FacilityAnalysis> {
    let margin = FragmentConfig::default().safety_margin;
    analyze_facility_with(
        facility,
        features,
        k_factor_type,
        default_unit,
        metric,
        |request| calculate_safe_distance(registry, request, margin),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo_types::{point, LineString, Polygon};

    fn magazine(weight: Option<f64>) -> Facility {
        Facility {
            id: "M1".into(),
            name: "Magazine 1".into(),
            geometry: Geometry::Point(point!(x: 0.0, y: 0.0)),
            net_explosive_weight: weight,
            unit: Some(WeightUnit::Pounds),
            hazard_division: "1.1".into(),
            organization: Organization::Dod,
            subtype: None,
        }
    }

    fn feature(id: &str, geometry: Option<Geometry<f64>>) -> SurroundingFeature {
        SurroundingFeature {
            id: id.into(),
            name: format!("Feature {id}"),
            geometry,
            is_qd_ring: false,
        }
    }

    fn at_feet_north(feet: f64) -> Option<Geometry<f64>> {
        Some(Geometry::Point(point!(x: 0.0, y: feet / 364_000.0)))
    }

    fn analyze(facility: &Facility, features: &[SurroundingFeature]) -> FacilityAnalysis {
        analyze_facility(
            &StandardsRegistry::builtin(),
            facility,
            features,
            KFactorType::Ibd,
            WeightUnit::Pounds,
            DistanceMetric::Planar,
        )
        .unwrap()
    }

    #[test]
    fn test_boundary_is_compliant_one_foot_less_is_not() {
        let f = feature("B", None);
        assert!(matches!(
            check_separation(&f, 400.0, 400.0),
            SeparationCheck::Clear(ref c) if c.margin_ft == 0.0
        ));
        match check_separation(&f, 399.0, 400.0) {
            SeparationCheck::Violation(v) => {
                assert_eq!(v.deficiency_ft, 1.0);
                assert_relative_eq!(v.percent_deficient, 0.25);
            }
            SeparationCheck::Clear(_) => panic!("399 ft must violate a 400 ft requirement"),
        }
    }

    #[test]
    fn test_violation_and_clearance_sorted() {
        let features = [
            feature("mild", at_feet_north(390.0)),
            feature("far", at_feet_north(1_000.0)),
            feature("severe", at_feet_north(10.0)),
            feature("near", at_feet_north(100.0)),
        ];
        let analysis = analyze(&magazine(Some(1000.0)), &features);
        let report = analysis.report().expect("analysed");
        assert_eq!(report.status, ComplianceStatus::NonCompliant);
        let order: Vec<&str> = report
            .violations
            .iter()
            .map(|v| v.feature_id.as_str())
            .collect();
        assert_eq!(order, ["severe", "near", "mild"]);
        assert_relative_eq!(report.violations[1].deficiency_ft, 300.0, epsilon = 1e-6);
        assert!(report
            .violations
            .windows(2)
            .all(|w| w[0].deficiency_ft >= w[1].deficiency_ft));
        assert_eq!(report.clearances.len(), 1);
        assert!(report.citation.contains("6055.09"));
    }

    #[test]
    fn test_rings_and_self_are_excluded() {
        let mut ring = feature("ring", at_feet_north(10.0));
        ring.is_qd_ring = true;
        let own = feature("M1", at_feet_north(0.0));
        let analysis = analyze(&magazine(Some(1000.0)), &[ring, own]);
        let report = analysis.report().unwrap();
        assert!(report.is_compliant());
        assert!(report.violations.is_empty() && report.clearances.is_empty());
    }

    #[test]
    fn test_bad_feature_is_indeterminate_not_compliant() {
        let empty = Geometry::Polygon(Polygon::new(LineString::new(vec![]), vec![]));
        let features = [
            feature("missing", None),
            feature("empty", Some(empty)),
            feature("far", at_feet_north(5_000.0)),
        ];
        let analysis = analyze(&magazine(Some(1000.0)), &features);
        let report = analysis.report().unwrap();
        assert_eq!(report.status, ComplianceStatus::Indeterminate);
        assert!(!report.is_compliant());
        assert_eq!(report.indeterminate.len(), 2);
        assert_eq!(report.clearances.len(), 1);
    }

    #[test]
    fn test_equal_deficiencies_ordered_by_id() {
        let features = [
            feature("b", at_feet_north(200.0)),
            feature("a", at_feet_north(200.0)),
        ];
        let analysis = analyze(&magazine(Some(1000.0)), &features);
        let ids: Vec<&str> = analysis
            .report()
            .unwrap()
            .violations
            .iter()
            .map(|v| v.feature_id.as_str())
            .collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn test_stop_between_features_drops_partial_report() {
        let registry = StandardsRegistry::builtin();
        let features = [
            feature("one", at_feet_north(100.0)),
            feature("two", at_feet_north(200.0)),
            feature("three", at_feet_north(300.0)),
        ];
        let checks = std::cell::Cell::new(0);
        let interrupted = analyze_facility_until(
            &magazine(Some(1000.0)),
            &features,
            KFactorType::Ibd,
            WeightUnit::Pounds,
            DistanceMetric::Planar,
            |request| calculate_safe_distance(&registry, request, 1.5),
            || {
                checks.set(checks.get() + 1);
                checks.get() > 1
            },
        )
        .unwrap();
        assert!(interrupted.is_none());
        assert_eq!(checks.get(), 2);

        let finished = analyze_facility_until(
            &magazine(Some(1000.0)),
            &features,
            KFactorType::Ibd,
            WeightUnit::Pounds,
            DistanceMetric::Planar,
            |request| calculate_safe_distance(&registry, request, 1.5),
            || false,
        )
        .unwrap()
        .unwrap();
        assert_eq!(finished.report().unwrap().violations.len(), 3);

        // No weight never needs interrupting
        let skipped = analyze_facility_until(
            &magazine(None),
            &features,
            KFactorType::Ibd,
            WeightUnit::Pounds,
            DistanceMetric::Planar,
            |request| calculate_safe_distance(&registry, request, 1.5),
            || true,
        )
        .unwrap();
        assert!(matches!(skipped, Some(FacilityAnalysis::NoWeightSpecified { .. })));
    }

    #[test]
    fn test_missing_or_zero_weight_skipped() {
        for weight in [None, Some(0.0)] {
            let analysis = analyze(&magazine(weight), &[]);
            assert_eq!(
                analysis,
                FacilityAnalysis::NoWeightSpecified {
                    facility_id: "M1".into()
                }
            );
        }
    }

    #[test]
    fn test_negative_weight_rejected() {
        let err = analyze_facility(
            &StandardsRegistry::builtin(),
            &magazine(Some(-5.0)),
            &[],
            KFactorType::Ibd,
            WeightUnit::Pounds,
            DistanceMetric::Planar,
        )
        .unwrap_err();
        assert!(matches!(err, QdError::InvalidInput { .. }));
    }
}
