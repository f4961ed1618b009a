//! Regulatory classification keys: organization and K-factor category
//!
//! These enums are the closed set the standards registry is keyed on. Strings coming
//! from facility records are parsed once at the boundary; everything past that point
//! is type-checked.

use crate::error::{QdError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Organization whose explosives-safety standard governs a site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Organization {
    /// Department of Defense (DoD 6055.09-M)
    Dod,
    /// Department of Energy (DOE-STD-1212)
    Doe,
    /// NATO (AASTP-1)
    Nato,
    /// US Air Force (AFMAN 91-201)
    AirForce,
}

impl Organization {
    /// Every organization the engine knows how to model
    pub const ALL: [Organization; 4] = [
        Organization::Dod,
        Organization::Doe,
        Organization::Nato,
        Organization::AirForce,
    ];

    /// Canonical code, as stored on facility records
    pub const fn code(self) -> &'static str {
        match self {
            Self::Dod => "DOD",
            Self::Doe => "DOE",
            Self::Nato => "NATO",
            Self::AirForce => "AIR_FORCE",
        }
    }
}

impl fmt::Display for Organization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Organization {
    type Err = QdError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().replace(['-', ' '], "_").as_str() {
            "DOD" => Ok(Self::Dod),
            "DOE" => Ok(Self::Doe),
            "NATO" => Ok(Self::Nato),
            "AIR_FORCE" | "AIRFORCE" | "USAF" => Ok(Self::AirForce),
            _ => Err(QdError::invalid_input(
                "organization",
                format!(
                    "unknown organization '{}' (expected DOD, DOE, NATO or AIR_FORCE)",
                    s.trim()
                ),
            )),
        }
    }
}

/// Named K-factor category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum KFactorType {
    /// Inhabited Building Distance
    Ibd,
    /// Intraline Distance
    Ild,
    /// Intermagazine Distance
    Imd,
    /// Public Traffic Route Distance
    Ptrd,
    /// Level of Protection (DOE sub-scheme)
    Lop,
}

impl KFactorType {
    /// Every K-factor category
    pub const ALL: [KFactorType; 5] = [
        KFactorType::Ibd,
        KFactorType::Ild,
        KFactorType::Imd,
        KFactorType::Ptrd,
        KFactorType::Lop,
    ];

    /// Short code used in labels and traces
    pub const fn code(self) -> &'static str {
        match self {
            Self::Ibd => "IBD",
            Self::Ild => "ILD",
            Self::Imd => "IMD",
            Self::Ptrd => "PTRD",
            Self::Lop => "LOP",
        }
    }

    /// Long-form name
    pub const fn description(self) -> &'static str {
        match self {
            Self::Ibd => "Inhabited Building Distance",
            Self::Ild => "Intraline Distance",
            Self::Imd => "Intermagazine Distance",
            Self::Ptrd => "Public Traffic Route Distance",
            Self::Lop => "Level of Protection",
        }
    }
}

impl fmt::Display for KFactorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for KFactorType {
    type Err = QdError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IBD" => Ok(Self::Ibd),
            "ILD" => Ok(Self::Ild),
            "IMD" => Ok(Self::Imd),
            "PTRD" => Ok(Self::Ptrd),
            "LOP" => Ok(Self::Lop),
            other => Err(QdError::invalid_input(
                "k_factor_type",
                format!("unknown K-factor type '{other}' (expected IBD, ILD, IMD, PTRD or LOP)"),
            )),
        }
    }
}

/// Default hazard division code when a record does not carry one
pub const DEFAULT_HAZARD_DIVISION: &str = "1.1";
