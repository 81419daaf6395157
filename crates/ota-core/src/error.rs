//! # Error Hierarchy
//!
//! Structured error types for the firmware core, built with `thiserror`.
//! Each layer owns its enum so callers can map failures precisely:
//! a catalog that cannot be loaded, a name that fails validation, a store
//! lookup that misses, and a latest pointer that names nothing are four
//! different operator stories.

use std::path::PathBuf;

use thiserror::Error;

/// Domain primitive validation failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Version identifiers must be non-empty.
    #[error("version identifier must not be empty")]
    EmptyVersionId,

    /// Version identifiers must not contain control characters.
    #[error("version identifier contains control characters: {0:?}")]
    ControlCharacter(String),

    /// Artifact names must be non-empty.
    #[error("artifact name must not be empty")]
    EmptyArtifactName,

    /// The name contains a parent-directory marker.
    #[error("artifact name contains a parent-directory segment: {0:?}")]
    ParentSegment(String),

    /// The name contains a path separator.
    #[error("artifact name contains a path separator: {0:?}")]
    PathSeparator(String),

    /// The name contains a NUL byte.
    #[error("artifact name contains a NUL byte")]
    NulByte,

    /// The name is `.`, which denotes the store root itself.
    #[error("artifact name must not be the current-directory marker")]
    CurrentDir,
}

/// Errors while loading a catalog document.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Catalog file does not exist.
    #[error("catalog not found: {}", path.display())]
    NotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// Catalog file exists but could not be read.
    #[error("failed to read catalog {}: {source}", path.display())]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Catalog file is not valid YAML or does not match the schema.
    #[error("failed to parse catalog {}: {source}", path.display())]
    YamlParse {
        /// Path that was parsed.
        path: PathBuf,
        /// Underlying parse error, including field-level validation messages.
        source: serde_yaml::Error,
    },

    /// The catalog maps no versions at all.
    #[error("catalog maps no firmware versions")]
    EmptyVersions,

    /// A domain primitive in the catalog failed validation.
    #[error("invalid catalog entry: {0}")]
    Validation(#[from] ValidationError),
}

/// Errors from the artifact store adapter.
///
/// Display strings may contain the artifact name but never the on-disk path;
/// the store root is operator configuration, not client-facing information.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No regular file with this name exists in the store.
    #[error("artifact not found: {0}")]
    NotFound(String),

    /// The name resolved (e.g. through a symlink) to a location outside the
    /// store root.
    #[error("artifact resolves outside the store root: {0}")]
    OutsideRoot(String),

    /// The file exists but could not be inspected or read.
    #[error("I/O error on artifact {name}: {source}")]
    Io {
        /// Artifact name being accessed.
        name: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configured store root is missing or not a directory.
    #[error("invalid artifact store root {}: {reason}", path.display())]
    InvalidRoot {
        /// Configured root path.
        path: PathBuf,
        /// Why it was rejected.
        reason: String,
    },
}

impl StoreError {
    /// Classify an I/O error against a named artifact.
    ///
    /// Errors meaning the name cannot denote an existing file (`ENOENT`,
    /// `ENOTDIR`, `EINVAL`) become [`StoreError::NotFound`]; everything else,
    /// permissions and device errors included, stays an [`StoreError::Io`].
    pub fn from_io(name: &str, source: std::io::Error) -> Self {
        if names_no_file(&source) {
            Self::NotFound(name.to_string())
        } else {
            Self::Io {
                name: name.to_string(),
                source,
            }
        }
    }

    /// Whether this error means "there is no such artifact" from a client's
    /// point of view.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::OutsideRoot(_))
    }
}

fn names_no_file(err: &std::io::Error) -> bool {
    #[cfg(unix)]
    const ENOTDIR: i32 = 20;

    match err.kind() {
        std::io::ErrorKind::NotFound | std::io::ErrorKind::InvalidInput => true,
        #[cfg(unix)]
        _ if err.raw_os_error() == Some(ENOTDIR) => true,
        _ => false,
    }
}

/// Errors from the version resolver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The latest pointer names a version absent from the mapping.
    #[error("latest version {latest:?} is not mapped to an artifact")]
    NotConfigured {
        /// The dangling pointer value.
        latest: String,
    },

    /// A requested version is absent from the mapping.
    #[error("unknown firmware version {0:?}")]
    UnknownVersion(String),
}
