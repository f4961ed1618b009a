//! Immutable standards registry
//!
//! Loaded once from the [`OrganizationStandard`] implementations (or a custom builder),
//! then only read. Updating standards means building a new registry and swapping it into
//! a [`RegistryHandle`]; entries are never edited in place, so concurrent readers see
//! either the old table or the new one, never a mix.

use super::organization::{builtin_standard, OrganizationStandard, StandardReference};
use crate::core_types::{KFactorType, Organization};
use crate::error::{QdError, Result};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

/// Normalize a sub-type key: trimmed, lowercase, spaces and hyphens as underscores.
pub fn normalize_subtype(key: &str) -> String {
    key.trim().to_ascii_lowercase().replace([' ', '-'], "_")
}

/// Outcome of a K-factor lookup
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KFactorResolution {
    /// Resolved K-factor (ft/lb^(1/3))
    pub value: f64,
    /// Governing citation
    pub citation: String,
    /// A sub-type was requested but not registered, so the organization default was used
    pub used_fallback: bool,
    /// Normalized sub-type key that matched, if any
    pub matched_subtype: Option<String>,
}

#[derive(Debug, Clone)]
struct KFactorTable {
    default: f64,
    subtypes: FxHashMap<String, f64>,
    citation: String,
}

#[derive(Debug, Clone, Default)]
struct OrganizationEntry {
    tables: FxHashMap<KFactorType, KFactorTable>,
    references: Vec<StandardReference>,
}

/// Read-only lookup of K-factors and citations
#[derive(Debug, Clone, Default)]
pub struct StandardsRegistry {
    entries: FxHashMap<Organization, OrganizationEntry>,
}

impl StandardsRegistry {
    /// Registry holding every built-in organization standard
    pub fn builtin() -> Self {
        Self::from_standards(Organization::ALL.into_iter().map(builtin_standard))
    }

    /// Load the given standards. Later standards for the same organization replace
    /// earlier ones.
    pub fn from_standards<'a>(
        standards: impl IntoIterator<Item = &'a dyn OrganizationStandard>,
    ) -> Self {
        let mut entries = FxHashMap::default();
        for standard in standards {
            let mut entry = OrganizationEntry {
                references: standard.references().to_vec(),
                ..OrganizationEntry::default()
            };
            for kind in KFactorType::ALL {
                if let Some(schedule) = standard.schedule(kind) {
                    let subtypes = schedule
                        .subtypes
                        .iter()
                        .map(|(key, value)| (normalize_subtype(key), *value))
                        .collect();
                    entry.tables.insert(
                        kind,
                        KFactorTable {
                            default: schedule.default,
                            subtypes,
                            citation: standard.citation(kind).to_string(),
                        },
                    );
                }
            }
            entries.insert(standard.organization(), entry);
        }
        Self { entries }
    }

    /// Start a custom registry from scratch
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Organizations present in this registry
    pub fn organizations(&self) -> impl Iterator<Item = Organization> + '_ {
        self.entries.keys().copied()
    }

    /// Resolve a K-factor.
    ///
    /// Lookup order: exact sub-type match, then the organization's default for `kind`.
    /// An unregistered sub-type is not an error; the result carries
    /// `used_fallback = true` instead.
    ///
    /// # Errors
    ///
    /// [`QdError::Configuration`] if `org` is absent from the registry or does not
    /// define `kind`. Never falls back across organizations.
    pub fn k_factor(
        &self,
        org: Organization,
        kind: KFactorType,
        subtype: Option<&str>,
    ) -> Result<KFactorResolution> {
        let table = self.table(org, kind)?;

        let Some(requested) = subtype else {
            return Ok(KFactorResolution {
                value: table.default,
                citation: table.citation.clone(),
                used_fallback: false,
                matched_subtype: None,
            });
        };

        let key = normalize_subtype(requested);
        if let Some(&value) = table.subtypes.get(&key) {
            debug!(%org, %kind, subtype = %key, value, "K-factor sub-type matched");
            return Ok(KFactorResolution {
                value,
                citation: table.citation.clone(),
                used_fallback: false,
                matched_subtype: Some(key),
            });
        }

        warn!(
            %org,
            %kind,
            subtype = %requested,
            default = table.default,
            "sub-type not registered, using organization default K-factor"
        );
        Ok(KFactorResolution {
            value: table.default,
            citation: table.citation.clone(),
            used_fallback: true,
            matched_subtype: None,
        })
    }

    /// Citation attached to every result for `(org, kind)`.
    ///
    /// # Errors
    ///
    /// Same conditions as [`StandardsRegistry::k_factor`].
    pub fn standard_text(&self, org: Organization, kind: KFactorType) -> Result<&str> {
        Ok(self.table(org, kind)?.citation.as_str())
    }

    /// Catalogue of governing documents for `org`.
    ///
    /// # Errors
    ///
    /// [`QdError::Configuration`] if `org` is absent from the registry.
    pub fn references(&self, org: Organization) -> Result<&[StandardReference]> {
        Ok(self.entry(org)?.references.as_slice())
    }

    /// Registered sub-type keys for `(org, kind)`, sorted
    ///
    /// # Errors
    ///
    /// Same conditions as [`StandardsRegistry::k_factor`].
    pub fn subtypes(&self, org: Organization, kind: KFactorType) -> Result<Vec<&str>> {
        let mut keys: Vec<&str> = self
            .table(org, kind)?
            .subtypes
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort_unstable();
        Ok(keys)
    }

    fn entry(&self, org: Organization) -> Result<&OrganizationEntry> {
        self.entries.get(&org).ok_or_else(|| {
            QdError::configuration(format!(
                "organization {org} is not present in the standards registry"
            ))
        })
    }

    fn table(&self, org: Organization, kind: KFactorType) -> Result<&KFactorTable> {
        self.entry(org)?.tables.get(&kind).ok_or_else(|| {
            QdError::configuration(format!(
                "{org} does not define a {kind} ({}) K-factor",
                kind.description()
            ))
        })
    }
}

/// Builder for custom registries (site-specific supplements, test fixtures)
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    registry: StandardsRegistry,
    orphaned: Vec<(Organization, KFactorType, String)>,
}

impl RegistryBuilder {
    /// Load a whole organization standard.
    pub fn with_standard(mut self, standard: &dyn OrganizationStandard) -> Self {
        let loaded = StandardsRegistry::from_standards([standard]);
        self.registry.entries.extend(loaded.entries);
        self
    }

    /// Define (or replace) the default K-factor and citation for `(org, kind)`.
    pub fn with_default(
        mut self,
        org: Organization,
        kind: KFactorType,
        value: f64,
        citation: impl Into<String>,
    ) -> Self {
        let entry = self.registry.entries.entry(org).or_default();
        let citation = citation.into();
        entry
            .tables
            .entry(kind)
            .and_modify(|table| {
                table.default = value;
                table.citation.clone_from(&citation);
            })
            .or_insert_with(|| KFactorTable {
                default: value,
                subtypes: FxHashMap::default(),
                citation,
            });
        self
    }

    /// Register a sub-type override. `(org, kind)` must already have a default, otherwise
    /// [`build`](Self::build) fails.
    pub fn with_subtype(
        mut self,
        org: Organization,
        kind: KFactorType,
        subtype: &str,
        value: f64,
    ) -> Self {
        match self
            .registry
            .entries
            .get_mut(&org)
            .and_then(|entry| entry.tables.get_mut(&kind))
        {
            Some(table) => {
                table.subtypes.insert(normalize_subtype(subtype), value);
            }
            None => self.orphaned.push((org, kind, subtype.to_string())),
        }
        self
    }

    /// Validate and freeze.
    ///
    /// # Errors
    ///
    /// [`QdError::Configuration`] if any K-factor is non-positive or non-finite, or a
    /// sub-type override was given for an `(org, kind)` without a default.
    pub fn build(self) -> Result<StandardsRegistry> {
        if let Some((org, kind, subtype)) = self.orphaned.first() {
            return Err(QdError::configuration(format!(
                "{org} {kind} sub-type '{subtype}' has no default K-factor to override"
            )));
        }
        for (org, entry) in &self.registry.entries {
            for (kind, table) in &entry.tables {
                let values = std::iter::once(table.default).chain(table.subtypes.values().copied());
                for value in values {
                    if !(value.is_finite() && value > 0.0) {
                        return Err(QdError::configuration(format!(
                            "{org} {kind} K-factor must be positive, got {value}"
                        )));
                    }
                }
            }
        }
        Ok(self.registry)
    }
}

/// A registry together with the generation it was published under
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    /// The registry
    pub registry: Arc<StandardsRegistry>,
    /// Incremented on every swap
    pub generation: u64,
}

/// Atomically swappable handle to the current registry
#[derive(Debug)]
pub struct RegistryHandle {
    current: RwLock<RegistrySnapshot>,
}

impl RegistryHandle {
    /// Publish `registry` as generation 0.
    pub fn new(registry: StandardsRegistry) -> Self {
        Self {
            current: RwLock::new(RegistrySnapshot {
                registry: Arc::new(registry),
                generation: 0,
            }),
        }
    }

    /// Current registry. Cheap: clones an `Arc`.
    pub fn snapshot(&self) -> RegistrySnapshot {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the whole registry, returning the new generation.
    pub fn swap(&self, registry: StandardsRegistry) -> u64 {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let generation = current.generation + 1;
        *current = RegistrySnapshot {
            registry: Arc::new(registry),
            generation,
        };
        tracing::info!(generation, "standards registry swapped");
        generation
    }
}

impl Default for RegistryHandle {
    fn default() -> Self {
        Self::new(StandardsRegistry::builtin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::standards::organization::DodStandard;

    #[test]
    fn test_builtin_defaults() {
        let registry = StandardsRegistry::builtin();
        let dod = registry
            .k_factor(Organization::Dod, KFactorType::Ibd, None)
            .unwrap();
        assert_eq!(dod.value, 40.0);
        assert!(!dod.used_fallback);
        assert!(dod.citation.contains("6055.09"));

        let doe = registry
            .k_factor(Organization::Doe, KFactorType::Ibd, None)
            .unwrap();
        assert_eq!(doe.value, 50.0);
    }

    #[test]
    fn test_subtype_match_is_normalized() {
        let registry = StandardsRegistry::builtin();
        let res = registry
            .k_factor(Organization::Dod, KFactorType::Ild, Some("Barricaded "))
            .unwrap();
        assert_eq!(res.value, 9.0);
        assert_eq!(res.matched_subtype.as_deref(), Some("barricaded"));
        assert!(!res.used_fallback);

        let lop = registry
            .k_factor(Organization::Doe, KFactorType::Lop, Some("III"))
            .unwrap();
        assert_eq!(lop.value, 18.0);
    }

    #[test]
    fn test_unknown_subtype_falls_back_visibly() {
        let registry = StandardsRegistry::builtin();
        let res = registry
            .k_factor(Organization::Dod, KFactorType::Ibd, Some("submarine pen"))
            .unwrap();
        assert_eq!(res.value, 40.0);
        assert!(res.used_fallback);
        assert!(res.matched_subtype.is_none());
    }

    #[test]
    fn test_missing_organization_is_configuration_error() {
        let registry = StandardsRegistry::builder()
            .with_standard(&DodStandard)
            .build()
            .unwrap();
        let err = registry
            .k_factor(Organization::Nato, KFactorType::Ibd, None)
            .unwrap_err();
        assert!(matches!(err, QdError::Configuration(_)));
        assert!(registry.standard_text(Organization::Nato, KFactorType::Ibd).is_err());
    }

    #[test]
    fn test_undefined_kind_is_configuration_error() {
        let registry = StandardsRegistry::builtin();
        assert!(matches!(
            registry.k_factor(Organization::Dod, KFactorType::Lop, None),
            Err(QdError::Configuration(_))
        ));
    }

    #[test]
    fn test_every_builtin_organization_is_cited() {
        let registry = StandardsRegistry::builtin();
        for org in Organization::ALL {
            let citation = registry.standard_text(org, KFactorType::Ibd).unwrap();
            assert!(!citation.is_empty(), "{org}");
            assert!(!registry.references(org).unwrap().is_empty(), "{org}");
        }
        let doe = registry.references(Organization::Doe).unwrap();
        assert!(doe.iter().any(|r| r.reference.contains("1212")));
    }

    #[test]
    fn test_subtype_without_default_rejected() {
        let result = StandardsRegistry::builder()
            .with_standard(&DodStandard)
            .with_subtype(Organization::Dod, KFactorType::Lop, "II", 18.0)
            .build();
        assert!(matches!(result, Err(QdError::Configuration(ref m)) if m.contains("'II'")));

        let registry = StandardsRegistry::builder()
            .with_default(Organization::Dod, KFactorType::Lop, 20.0, "local LOP table")
            .with_subtype(Organization::Dod, KFactorType::Lop, "II", 18.0)
            .build()
            .unwrap();
        let res = registry
            .k_factor(Organization::Dod, KFactorType::Lop, Some("II"))
            .unwrap();
        assert_eq!(res.value, 18.0);
    }

    #[test]
    fn test_builder_rejects_non_positive_k_factor() {
        let result = StandardsRegistry::builder()
            .with_default(Organization::Dod, KFactorType::Ibd, 0.0, "bad")
            .build();
        assert!(matches!(result, Err(QdError::Configuration(_))));
    }

    #[test]
    fn test_handle_swap_bumps_generation() {
        let handle = RegistryHandle::default();
        let before = handle.snapshot();
        assert_eq!(before.generation, 0);

        let custom = StandardsRegistry::builder()
            .with_default(Organization::Dod, KFactorType::Ibd, 45.0, "site supplement")
            .build()
            .unwrap();
        assert_eq!(handle.swap(custom), 1);

        let after = handle.snapshot();
        assert_eq!(
            after
                .registry
                .k_factor(Organization::Dod, KFactorType::Ibd, None)
                .unwrap()
                .value,
            45.0
        );
        // Old snapshot is untouched
        assert_eq!(
            before
                .registry
                .k_factor(Organization::Dod, KFactorType::Ibd, None)
                .unwrap()
                .value,
            40.0
        );
    }
}
