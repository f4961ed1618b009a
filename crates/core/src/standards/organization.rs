//! Per-organization standards
//!
//! Each governing body is one implementation of [`OrganizationStandard`]. Adding an
//! organization means adding an enum variant and an implementation here; the compiler
//! then points at every match that needs a new arm.
//!
//! K-factors are in ft/lb^(1/3) for `D = K · W^(1/3)` with `W` in pounds and `D` in feet.

use crate::core_types::{KFactorType, Organization};
use serde::Serialize;

/// Entry in an organization's catalogue of governing documents
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StandardReference {
    /// Catalogue key (e.g. `quantity_distance`)
    pub key: &'static str,
    /// Document designation
    pub reference: &'static str,
    /// Relevant chapters or sections
    pub chapters: &'static [&'static str],
    /// What the document governs
    pub description: &'static str,
}

/// K-factors of one category: default plus optional sub-type overrides
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KFactorSchedule {
    /// Organization default, used when no sub-type matches
    pub default: f64,
    /// `(sub-type key, K-factor)` overrides
    pub subtypes: &'static [(&'static str, f64)],
}

impl KFactorSchedule {
    const fn flat(default: f64) -> Self {
        Self {
            default,
            subtypes: &[],
        }
    }
}

/// Standard published by one organization
///
/// Implementations provide the raw tables; [`super::StandardsRegistry`] loads them once
/// into an immutable lookup structure.
pub trait OrganizationStandard: Send + Sync {
    /// Organization this standard belongs to
    fn organization(&self) -> Organization;

    /// K-factor schedule for `kind`, `None` if the standard does not define it
    fn schedule(&self, kind: KFactorType) -> Option<KFactorSchedule>;

    /// Regulatory citation for `kind`
    fn citation(&self, kind: KFactorType) -> &'static str;

    /// Documents this standard is built from
    fn references(&self) -> &'static [StandardReference];
}

/// DoD 6055.09-M
pub struct DodStandard;

/// DOE-STD-1212
pub struct DoeStandard;

/// NATO AASTP-1
pub struct NatoStandard;

/// AFMAN 91-201
pub struct AirForceStandard;

/// Built-in standard for `organization`
pub fn builtin_standard(organization: Organization) -> &'static dyn OrganizationStandard {
    match organization {
        Organization::Dod => &DodStandard,
        Organization::Doe => &DoeStandard,
        Organization::Nato => &NatoStandard,
        Organization::AirForce => &AirForceStandard,
    }
}

const DOD_REFERENCES: &[StandardReference] = &[
    StandardReference {
        key: "quantity_distance",
        reference: "DoD 6055.09-M",
        chapters: &["V7.E4", "V1.E6"],
        description: "Standards for Quantity-Distance relationships",
    },
    StandardReference {
        key: "aircraft_siting",
        reference: "DoD 6055.09-M",
        chapters: &["V4.E5.6", "V4.E5.7"],
        description: "Aircraft and Airfield Quantity-Distance criteria",
    },
    StandardReference {
        key: "doe_crossref",
        reference: "DOE-STD-1212-2019",
        chapters: &["Chapter 3.4"],
        description: "DOE to DoD standard cross-references",
    },
    StandardReference {
        key: "storage_compatibility",
        reference: "DESR 6055.09 Edition 1",
        chapters: &["V1.E6.4", "V1.E6.5"],
        description: "Explosive compatibility storage requirements",
    },
    StandardReference {
        key: "handling",
        reference: "DA PAM 385-64",
        chapters: &["Chapter 5"],
        description: "Ammunition and explosives handling requirements",
    },
];

const DOE_REFERENCES: &[StandardReference] = &[
    StandardReference {
        key: "facility_safety",
        reference: "DOE-STD-1212-2019",
        chapters: &["Chapter 3", "Chapter 4"],
        description: "Explosives safety requirements for facilities",
    },
    StandardReference {
        key: "storage_limits",
        reference: "DOE O 440.1B",
        chapters: &["Attachment 2"],
        description: "Storage limits and requirements",
    },
    StandardReference {
        key: "laboratory_operations",
        reference: "DOE-STD-1212-2025",
        chapters: &["Chapter 11"],
        description: "Laboratory operations with explosives",
    },
];

const NATO_REFERENCES: &[StandardReference] = &[StandardReference {
    key: "quantity_distance",
    reference: "AASTP-1 Edition B",
    chapters: &["Part I, Section III", "Annex I-A"],
    description: "Principles for storage of military ammunition and explosives",
}];

const AIR_FORCE_REFERENCES: &[StandardReference] = &[
    StandardReference {
        key: "air_force",
        reference: "AFMAN 91-201",
        chapters: &["Chapter 12", "Chapter 14"],
        description: "Air Force Explosives Safety Standards",
    },
    StandardReference {
        key: "aircraft_siting",
        reference: "DoD 6055.09-M",
        chapters: &["V4.E5.6", "V4.E5.7"],
        description: "Aircraft and Airfield Quantity-Distance criteria",
    },
];

impl OrganizationStandard for DodStandard {
    fn organization(&self) -> Organization {
        Organization::Dod
    }

    fn schedule(&self, kind: KFactorType) -> Option<KFactorSchedule> {
        match kind {
            KFactorType::Ibd => Some(KFactorSchedule {
                default: 40.0,
                subtypes: &[("high_quantity", 50.0)],
            }),
            KFactorType::Ild => Some(KFactorSchedule {
                default: 18.0,
                subtypes: &[("barricaded", 9.0), ("unbarricaded", 18.0)],
            }),
            KFactorType::Imd => Some(KFactorSchedule {
                default: 11.0,
                subtypes: &[
                    ("earth_covered_side", 6.0),
                    ("earth_covered_front", 11.0),
                    ("barricaded", 6.0),
                    ("unbarricaded", 18.0),
                ],
            }),
            KFactorType::Ptrd => Some(KFactorSchedule {
                default: 24.0,
                subtypes: &[("high_quantity", 30.0)],
            }),
            KFactorType::Lop => None,
        }
    }

    fn citation(&self, kind: KFactorType) -> &'static str {
        match kind {
            KFactorType::Ibd => "DoD 6055.09-M, V1.E6 Table V1.E6.T1 (Inhabited Building Distance)",
            KFactorType::Ild => "DoD 6055.09-M, V1.E6 Table V1.E6.T8 (Intraline Distance)",
            KFactorType::Imd => "DoD 6055.09-M, V1.E6 Table V1.E6.T6 (Intermagazine Distance)",
            KFactorType::Ptrd => {
                "DoD 6055.09-M, V1.E6 Table V1.E6.T1 (Public Traffic Route Distance)"
            }
            KFactorType::Lop => "DoD 6055.09-M, V1.E6 (Level of Protection not defined)",
        }
    }

    fn references(&self) -> &'static [StandardReference] {
        DOD_REFERENCES
    }
}

impl OrganizationStandard for DoeStandard {
    fn organization(&self) -> Organization {
        Organization::Doe
    }

    fn schedule(&self, kind: KFactorType) -> Option<KFactorSchedule> {
        match kind {
            KFactorType::Ibd => Some(KFactorSchedule {
                default: 50.0,
                subtypes: &[("laboratory", 40.0)],
            }),
            KFactorType::Ild => Some(KFactorSchedule::flat(18.0)),
            KFactorType::Imd => Some(KFactorSchedule::flat(11.0)),
            KFactorType::Ptrd => Some(KFactorSchedule::flat(30.0)),
            KFactorType::Lop => Some(KFactorSchedule {
                default: 50.0,
                subtypes: &[("i", 50.0), ("ii", 35.0), ("iii", 18.0), ("iv", 9.0)],
            }),
        }
    }

    fn citation(&self, kind: KFactorType) -> &'static str {
        match kind {
            KFactorType::Ibd => "DOE-STD-1212-2019, Chapter 3 (Inhabited Building Distance)",
            KFactorType::Ild => "DOE-STD-1212-2019, Chapter 3 (Intraline Distance)",
            KFactorType::Imd => "DOE-STD-1212-2019, Chapter 3 (Intermagazine Distance)",
            KFactorType::Ptrd => "DOE-STD-1212-2019, Chapter 3 (Public Traffic Route Distance)",
            KFactorType::Lop => "DOE-STD-1212-2019, Chapter 4 (Level of Protection)",
        }
    }

    fn references(&self) -> &'static [StandardReference] {
        DOE_REFERENCES
    }
}

impl OrganizationStandard for NatoStandard {
    fn organization(&self) -> Organization {
        Organization::Nato
    }

    fn schedule(&self, kind: KFactorType) -> Option<KFactorSchedule> {
        match kind {
            KFactorType::Ibd => Some(KFactorSchedule::flat(44.4)),
            KFactorType::Ild => Some(KFactorSchedule {
                default: 18.0,
                subtypes: &[("barricaded", 9.0)],
            }),
            KFactorType::Imd => Some(KFactorSchedule {
                default: 11.0,
                subtypes: &[("earth_covered_side", 6.0)],
            }),
            KFactorType::Ptrd => Some(KFactorSchedule::flat(29.6)),
            KFactorType::Lop => None,
        }
    }

    fn citation(&self, kind: KFactorType) -> &'static str {
        match kind {
            KFactorType::Ibd => "AASTP-1 Edition B, Part I Section III (Inhabited Building Distance)",
            KFactorType::Ild => "AASTP-1 Edition B, Part I Section III (Process Building Distance)",
            KFactorType::Imd => "AASTP-1 Edition B, Part I Section III (Inter-Magazine Distance)",
            KFactorType::Ptrd => "AASTP-1 Edition B, Part I Section III (Public Traffic Route Distance)",
            KFactorType::Lop => "AASTP-1 Edition B (Level of Protection not defined)",
        }
    }

    fn references(&self) -> &'static [StandardReference] {
        NATO_REFERENCES
    }
}

impl OrganizationStandard for AirForceStandard {
    fn organization(&self) -> Organization {
        Organization::AirForce
    }

    fn schedule(&self, kind: KFactorType) -> Option<KFactorSchedule> {
        match kind {
            KFactorType::Ibd => Some(KFactorSchedule {
                default: 40.0,
                subtypes: &[("aircraft_parking", 50.0)],
            }),
            KFactorType::Ild => Some(KFactorSchedule::flat(18.0)),
            KFactorType::Imd => Some(KFactorSchedule {
                default: 11.0,
                subtypes: &[("hardened_aircraft_shelter", 6.0)],
            }),
            KFactorType::Ptrd => Some(KFactorSchedule::flat(24.0)),
            KFactorType::Lop => None,
        }
    }

    fn citation(&self, kind: KFactorType) -> &'static str {
        match kind {
            KFactorType::Ibd => "AFMAN 91-201, Chapter 12 (Inhabited Building Distance)",
            KFactorType::Ild => "AFMAN 91-201, Chapter 12 (Intraline Distance)",
            KFactorType::Imd => "AFMAN 91-201, Chapter 12 (Intermagazine Distance)",
            KFactorType::Ptrd => "AFMAN 91-201, Chapter 12 (Public Traffic Route Distance)",
            KFactorType::Lop => "AFMAN 91-201 (Level of Protection not defined)",
        }
    }

    fn references(&self) -> &'static [StandardReference] {
        AIR_FORCE_REFERENCES
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_standard_matches_organization() {
        for org in Organization::ALL {
            assert_eq!(builtin_standard(org).organization(), org);
        }
    }

    #[test]
    fn test_lop_only_defined_by_doe() {
        for org in Organization::ALL {
            let defined = builtin_standard(org).schedule(KFactorType::Lop).is_some();
            assert_eq!(defined, org == Organization::Doe, "{org}");
        }
    }

    #[test]
    fn test_every_organization_has_references() {
        for org in Organization::ALL {
            assert!(!builtin_standard(org).references().is_empty());
        }
    }
}
