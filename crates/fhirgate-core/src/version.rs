//! # FHIR Schema Versions
//!
//! The closed set of FHIR releases fhirgate ships schemas for. Every
//! `match` on [`FhirVersion`] is exhaustive, so adding a release forces
//! every consumer (schema file naming, CLI help, tests) to handle it.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::FhirgateError;

/// A supported FHIR schema release.
///
/// | Name | Release |
/// |------|---------|
/// | `stu3` | FHIR 3.0 |
/// | `r4` | FHIR 4.0 |
/// | `r4b` | FHIR 4.3 |
/// | `r5` | FHIR 5.0 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FhirVersion {
    /// Standard for Trial Use 3.
    Stu3,
    /// Release 4.
    R4,
    /// Release 4B.
    R4b,
    /// Release 5.
    R5,
}

impl FhirVersion {
    /// Every supported version, oldest first.
    pub const ALL: [FhirVersion; 4] = [Self::Stu3, Self::R4, Self::R4b, Self::R5];

    /// Returns the lowercase version name used on the command line and in
    /// schema file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stu3 => "stu3",
            Self::R4 => "r4",
            Self::R4b => "r4b",
            Self::R5 => "r5",
        }
    }

    /// File name of this version's schema inside a schema directory,
    /// e.g. `fhir.r4.schema.json`.
    pub fn schema_file_name(&self) -> String {
        format!("fhir.{}.schema.json", self.as_str())
    }
}

impl Default for FhirVersion {
    fn default() -> Self {
        Self::R4
    }
}

impl std::fmt::Display for FhirVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FhirVersion {
    type Err = FhirgateError;

    /// Parse a version name. Surrounding whitespace and ASCII case are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stu3" => Ok(Self::Stu3),
            "r4" => Ok(Self::R4),
            "r4b" => Ok(Self::R4b),
            "r5" => Ok(Self::R5),
            _ => Err(FhirgateError::UnsupportedVersion(s.to_string())),
        }
    }
}
