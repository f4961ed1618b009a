//! Regulatory standards: K-factor tables and citations
//!
//! Every public output of the engine embeds the citation of the standard that governed
//! it. Auditors reading a siting report need to see which table a number came from.

pub mod organization;
pub mod registry;

pub use organization::{
    builtin_standard, AirForceStandard, DodStandard, DoeStandard, KFactorSchedule, NatoStandard,
    OrganizationStandard, StandardReference,
};
pub use registry::{
    normalize_subtype, KFactorResolution, RegistryBuilder, RegistryHandle, RegistrySnapshot,
    StandardsRegistry,
};
