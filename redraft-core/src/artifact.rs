//! # Artifacts
//!
//! An Artifact is one generated unit of executable text (a Python script or a
//! SQL query) tagged with the version ordinal it holds within a run. Stages
//! hand artifacts forward by value; nothing mutates one after it is built.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Version ordinal of an artifact within one run (v1 = first draft).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(u8);

impl Version {
    /// The first draft
    pub const V1: Version = Version(1);
    /// The refined draft
    pub const V2: Version = Version(2);

    /// The version that follows this one
    pub fn next(self) -> Version {
        Version(self.0.saturating_add(1))
    }

    /// Numeric ordinal (1-based)
    pub fn ordinal(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A versioned unit of executable text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub text: String,
    pub version: Version,
}

impl Artifact {
    /// Create an artifact at an explicit version. Text is trimmed.
    pub fn new(text: impl Into<String>, version: Version) -> Self {
        Self {
            text: text.into().trim().to_string(),
            version,
        }
    }

    /// Create a first-draft (v1) artifact
    pub fn draft(text: impl Into<String>) -> Self {
        Self::new(text, Version::V1)
    }

    /// Create the next-version artifact with new text
    pub fn refine(&self, text: impl Into<String>) -> Artifact {
        Artifact::new(text, self.version.next())
    }

    /// Carry this artifact's text forward unchanged as the next version.
    ///
    /// This is the fallback rule: a degraded critique must never replace a
    /// working artifact with empty content.
    pub fn carry_forward(&self) -> Artifact {
        Artifact {
            text: self.text.clone(),
            version: self.version.next(),
        }
    }

    /// Whether the artifact holds no executable text
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.version, self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_is_v1() {
        let a = Artifact::draft("SELECT 1");
        assert_eq!(a.version, Version::V1);
        assert_eq!(a.text, "SELECT 1");
    }

    #[test]
    fn test_new_trims() {
        let a = Artifact::draft("  x = 1\n");
        assert_eq!(a.text, "x = 1");
    }

    #[test]
    fn test_refine_bumps_version() {
        let v1 = Artifact::draft("SELECT 1");
        let v2 = v1.refine("SELECT 2");
        assert_eq!(v2.version, Version::V2);
        assert_eq!(v2.text, "SELECT 2");
        // v1 untouched
        assert_eq!(v1.text, "SELECT 1");
    }

    #[test]
    fn test_carry_forward_keeps_text() {
        let v1 = Artifact::draft("SELECT 1");
        let v2 = v1.carry_forward();
        assert_eq!(v2.version, Version::V2);
        assert_eq!(v2.text, v1.text);
    }

    #[test]
    fn test_version_display() {
        assert_eq!(Version::V1.to_string(), "v1");
        assert_eq!(Version::V2.to_string(), "v2");
        assert_eq!(Version::V2.next().to_string(), "v3");
    }
}
