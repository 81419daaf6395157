//! # Firmware Catalog
//!
//! The catalog is the process-wide version mapping plus the latest pointer.
//! It is loaded from a YAML document at startup (and on reload) and is
//! never mutated in place: changes produce a new [`Catalog`] that the
//! [`VersionResolver`](crate::resolver::VersionResolver) swaps in whole.
//!
//! ## Document Format
//!
//! ```yaml
//! firmware_dir: firmwares        # relative to the catalog file
//! latest: v2
//! versions:
//!   v1: v1.0.bin
//!   v2: v2.0.bin
//! ```
//!
//! A `latest` that names no mapped version is accepted with a warning. It is
//! a deployment mistake the `latest` operation reports as a configuration
//! error, distinct from a mapped artifact whose file is missing.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, ResolveError};
use crate::identity::{ArtifactName, VersionId};

/// A version identifier bound to the artifact that implements it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactRecord {
    /// Symbolic version name.
    pub version: VersionId,
    /// File in the artifact store.
    pub filename: ArtifactName,
}

/// Version mapping plus latest pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Catalog {
    versions: BTreeMap<VersionId, ArtifactName>,
    latest: VersionId,
}

impl Catalog {
    /// Build a catalog.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::EmptyVersions`] if `versions` is empty.
    pub fn new(
        versions: BTreeMap<VersionId, ArtifactName>,
        latest: VersionId,
    ) -> Result<Self, CatalogError> {
        if versions.is_empty() {
            return Err(CatalogError::EmptyVersions);
        }
        Ok(Self { versions, latest })
    }

    /// The latest pointer.
    pub fn latest(&self) -> &VersionId {
        &self.latest
    }

    /// Whether the latest pointer names a mapped version.
    pub fn latest_is_mapped(&self) -> bool {
        self.versions.contains_key(self.latest.as_str())
    }

    /// Look up a version.
    pub fn get(&self, version: &str) -> Option<ArtifactRecord> {
        self.versions
            .get_key_value(version)
            .map(|(v, f)| ArtifactRecord {
                version: v.clone(),
                filename: f.clone(),
            })
    }

    /// Resolve the latest pointer against this catalog.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::NotConfigured`] if the pointer is unmapped.
    pub fn resolve_latest(&self) -> Result<ArtifactRecord, ResolveError> {
        self.get(self.latest.as_str())
            .ok_or_else(|| ResolveError::NotConfigured {
                latest: self.latest.to_string(),
            })
    }

    /// A copy of this catalog with the latest pointer moved to `version`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::UnknownVersion`] if `version` is unmapped.
    pub fn with_latest(&self, version: &VersionId) -> Result<Self, ResolveError> {
        if !self.versions.contains_key(version.as_str()) {
            return Err(ResolveError::UnknownVersion(version.to_string()));
        }
        Ok(Self {
            versions: self.versions.clone(),
            latest: version.clone(),
        })
    }

    /// All mapped versions in identifier order.
    pub fn records(&self) -> impl Iterator<Item = ArtifactRecord> + '_ {
        self.versions.iter().map(|(v, f)| ArtifactRecord {
            version: v.clone(),
            filename: f.clone(),
        })
    }

    /// Number of mapped versions.
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Whether no versions are mapped. Always `false` for a constructed catalog.
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

/// On-disk catalog document.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogDocument {
    firmware_dir: PathBuf,
    latest: VersionId,
    versions: BTreeMap<VersionId, ArtifactName>,
}

/// A catalog together with where it was loaded from.
#[derive(Debug, Clone)]
pub struct CatalogFile {
    /// Path the catalog was read from.
    pub path: PathBuf,
    /// Artifact directory, resolved relative to the catalog's directory.
    pub firmware_dir: PathBuf,
    /// Version mapping and latest pointer.
    pub catalog: Catalog,
}

impl CatalogFile {
    /// Parse a catalog document. `path` is used for error context and to
    /// resolve a relative `firmware_dir`.
    ///
    /// # Errors
    ///
    /// [`CatalogError::YamlParse`] for malformed YAML, unknown fields, or
    /// invalid identifiers; [`CatalogError::EmptyVersions`] for an empty map.
    pub fn from_yaml_str(content: &str, path: &Path) -> Result<Self, CatalogError> {
        let doc: CatalogDocument =
            serde_yaml::from_str(content).map_err(|source| CatalogError::YamlParse {
                path: path.to_path_buf(),
                source,
            })?;

        let base = path.parent().unwrap_or(Path::new("."));
        let firmware_dir = if doc.firmware_dir.is_absolute() {
            doc.firmware_dir
        } else {
            base.join(doc.firmware_dir)
        };

        let catalog = Catalog::new(doc.versions, doc.latest)?;
        if !catalog.latest_is_mapped() {
            tracing::warn!(
                catalog = %path.display(),
                latest = %catalog.latest(),
                "latest version is not mapped; /firmware/latest will report a config error"
            );
        }

        Ok(Self {
            path: path.to_path_buf(),
            firmware_dir,
            catalog,
        })
    }
}

/// Read and parse a catalog file.
///
/// # Errors
///
/// [`CatalogError::NotFound`] if the file is absent, [`CatalogError::Io`] if
/// it cannot be read, and the errors of [`CatalogFile::from_yaml_str`].
pub fn load_catalog(path: &Path) -> Result<CatalogFile, CatalogError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            CatalogError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            CatalogError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    CatalogFile::from_yaml_str(&content, path)
}
