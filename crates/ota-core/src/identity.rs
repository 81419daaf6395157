//! # Identity Newtypes
//!
//! [`VersionId`] names a firmware version in the catalog; [`ArtifactName`]
//! names a file in the artifact store. Both validate at construction, and
//! both deserialize through the same validation, so a catalog file cannot
//! smuggle an unchecked name past the store.
//!
//! ## Security Invariant
//!
//! An [`ArtifactName`] is a single filename component. It never contains a
//! parent-directory marker (`..`), a path separator (`/` or `\`), or a NUL
//! byte, and it is never `.`. This is a syntactic filter on the literal
//! string; the store additionally canonicalizes and checks descent from its
//! root.

use std::borrow::Borrow;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A symbolic firmware version identifier, e.g. `"v1"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionId(String);

impl VersionId {
    /// Create a version identifier, validating it is non-empty and free of
    /// control characters.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyVersionId`] or
    /// [`ValidationError::ControlCharacter`].
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if s.trim().is_empty() {
            return Err(ValidationError::EmptyVersionId);
        }
        if s.chars().any(char::is_control) {
            return Err(ValidationError::ControlCharacter(s));
        }
        Ok(Self(s))
    }

    /// Access the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for VersionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for VersionId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<VersionId> for String {
    fn from(id: VersionId) -> Self {
        id.0
    }
}

impl std::fmt::Display for VersionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated firmware filename: one path component, nothing more.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArtifactName(String);

impl ArtifactName {
    /// Parse an untrusted filename.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] describing the first rule the name breaks.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        Self::validate(value)?;
        Ok(Self(value.to_string()))
    }

    fn validate(s: &str) -> Result<(), ValidationError> {
        if s.is_empty() {
            return Err(ValidationError::EmptyArtifactName);
        }
        if s.contains("..") {
            return Err(ValidationError::ParentSegment(s.to_string()));
        }
        if s.contains('/') || s.contains('\\') {
            return Err(ValidationError::PathSeparator(s.to_string()));
        }
        if s.contains('\0') {
            return Err(ValidationError::NulByte);
        }
        if s == "." {
            return Err(ValidationError::CurrentDir);
        }
        Ok(())
    }

    /// Access the filename string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ArtifactName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::validate(&value)?;
        Ok(Self(value))
    }
}

impl From<ArtifactName> for String {
    fn from(name: ArtifactName) -> Self {
        name.0
    }
}

impl std::fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // -- VersionId --

    #[test]
    fn version_id_accepts_symbolic_names() {
        assert_eq!(VersionId::new("v1").unwrap().as_str(), "v1");
        assert!(VersionId::new("2025.01-rc1").is_ok());
    }

    #[test]
    fn version_id_rejects_empty_and_blank() {
        assert_eq!(VersionId::new(""), Err(ValidationError::EmptyVersionId));
        assert_eq!(VersionId::new("   "), Err(ValidationError::EmptyVersionId));
    }

    #[test]
    fn version_id_rejects_control_characters() {
        assert!(matches!(
            VersionId::new("v1\n"),
            Err(ValidationError::ControlCharacter(_))
        ));
    }

    #[test]
    fn version_id_serde_validates() {
        let ok: VersionId = serde_yaml::from_str("v2").unwrap();
        assert_eq!(ok.as_str(), "v2");
        assert!(serde_yaml::from_str::<VersionId>("''").is_err());
    }

    // -- ArtifactName --

    #[test]
    fn artifact_name_accepts_plain_filenames() {
        for name in ["v1.0.bin", "firmware", "a-b_c.1.2.bin", ".hidden"] {
            assert!(ArtifactName::parse(name).is_ok(), "{name} should be accepted");
        }
    }

    #[test]
    fn artifact_name_rejects_traversal() {
        assert!(matches!(
            ArtifactName::parse("../../etc/passwd"),
            Err(ValidationError::ParentSegment(_))
        ));
        assert!(matches!(
            ArtifactName::parse(".."),
            Err(ValidationError::ParentSegment(_))
        ));
        assert!(matches!(
            ArtifactName::parse("v1..bin"),
            Err(ValidationError::ParentSegment(_))
        ));
    }

    #[test]
    fn artifact_name_rejects_separators() {
        assert!(matches!(
            ArtifactName::parse("sub/v1.bin"),
            Err(ValidationError::PathSeparator(_))
        ));
        assert!(matches!(
            ArtifactName::parse("/etc/passwd"),
            Err(ValidationError::PathSeparator(_))
        ));
        assert!(matches!(
            ArtifactName::parse("sub\\v1.bin"),
            Err(ValidationError::PathSeparator(_))
        ));
    }

    #[test]
    fn artifact_name_rejects_empty_nul_and_dot() {
        assert_eq!(ArtifactName::parse(""), Err(ValidationError::EmptyArtifactName));
        assert_eq!(ArtifactName::parse("v1\0.bin"), Err(ValidationError::NulByte));
        assert_eq!(ArtifactName::parse("."), Err(ValidationError::CurrentDir));
    }

    #[test]
    fn artifact_name_serde_validates() {
        assert!(serde_yaml::from_str::<ArtifactName>("v1.0.bin").is_ok());
        let err = serde_yaml::from_str::<ArtifactName>("../secret").unwrap_err();
        assert!(err.to_string().contains("parent-directory"));
    }

    proptest! {
        #[test]
        fn names_with_parent_marker_never_parse(prefix in "[a-z0-9.]{0,8}", suffix in "[a-z0-9.]{0,8}") {
            let name = format!("{prefix}..{suffix}");
            prop_assert!(ArtifactName::parse(&name).is_err());
        }

        #[test]
        fn names_with_slash_never_parse(prefix in "[a-z0-9]{0,8}", suffix in "[a-z0-9]{0,8}") {
            let name = format!("{prefix}/{suffix}");
            prop_assert!(ArtifactName::parse(&name).is_err());
        }

        #[test]
        fn plain_alphanumeric_names_parse(name in "[A-Za-z0-9_-]{1,32}(\\.[a-z]{1,4})?") {
            prop_assert!(ArtifactName::parse(&name).is_ok());
        }
    }
}
