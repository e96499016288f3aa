//! Protocol version tags.

use serde::{Deserialize, Serialize};

/// Supported CSW protocol versions.
///
/// Every dispatched operation is bound to exactly one version; handlers are
/// registered per `(Version, Operation)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Version {
    Csw202,
    Csw300,
}

impl Version {
    /// All versions this build knows about, oldest first.
    pub const ALL: [Version; 2] = [Version::Csw202, Version::Csw300];

    /// The version string as it appears in requests.
    pub fn as_str(&self) -> &'static str {
        match self {
            Version::Csw202 => "2.0.2",
            Version::Csw300 => "3.0.0",
        }
    }

    /// Parse a version string; `None` for anything unknown.
    pub fn parse(s: &str) -> Option<Version> {
        match s {
            "2.0.2" => Some(Version::Csw202),
            "3.0.0" => Some(Version::Csw300),
            _ => None,
        }
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
