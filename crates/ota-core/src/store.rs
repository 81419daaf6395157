//! # Artifact Store Adapter
//!
//! Maps an [`ArtifactName`] to a regular file under a configured root
//! directory. This module is the sole authority for building filesystem
//! paths from names; nothing else in the workspace joins untrusted input
//! onto a path.
//!
//! ## Containment
//!
//! The root is canonicalized once at construction. Every lookup joins the
//! validated name onto that root, canonicalizes the result, and requires it
//! to still be a descendant of the root. A symlink inside the store that
//! points elsewhere therefore resolves to [`StoreError::OutsideRoot`].

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::digest::{digest_reader, DigestCache, Sha256Digest};
use crate::error::StoreError;
use crate::identity::ArtifactName;

/// Longest file name component accepted by common filesystems (`NAME_MAX`).
const MAX_NAME_BYTES: usize = 255;

/// An artifact that was found in the store at lookup time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedArtifact {
    name: ArtifactName,
    path: PathBuf,
    len: u64,
    modified: Option<SystemTime>,
}

impl LocatedArtifact {
    /// Build a located artifact from its parts.
    ///
    /// Store implementations call this once they have confirmed the file
    /// exists; it performs no I/O.
    pub fn new(name: ArtifactName, path: PathBuf, len: u64, modified: Option<SystemTime>) -> Self {
        Self {
            name,
            path,
            len,
            modified,
        }
    }

    /// The name the artifact was looked up by.
    pub fn name(&self) -> &ArtifactName {
        &self.name
    }

    /// Canonical on-disk path. Never send this to a client.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File size in bytes at lookup time.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the file was empty at lookup time.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Modification time at lookup time, where the platform reports one.
    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }
}

/// A key-to-bytes lookup service for firmware artifacts.
///
/// Methods are synchronous and may block on filesystem I/O; async callers
/// run them on the blocking pool.
pub trait ArtifactStore: Send + Sync {
    /// Confirm that `name` resolves to an existing regular file.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when absent or not a regular file,
    /// [`StoreError::OutsideRoot`] when it escapes the store, and
    /// [`StoreError::Io`] for any other failure.
    fn locate(&self, name: &ArtifactName) -> Result<LocatedArtifact, StoreError>;

    /// Open a located artifact for reading.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the file vanished since `locate`.
    fn open(&self, artifact: &LocatedArtifact) -> Result<File, StoreError>;

    /// SHA-256 of the artifact's bytes.
    ///
    /// # Errors
    ///
    /// Propagates open and read failures.
    fn digest(&self, artifact: &LocatedArtifact) -> Result<Sha256Digest, StoreError> {
        let file = self.open(artifact)?;
        digest_reader(file).map_err(|e| StoreError::from_io(artifact.name().as_str(), e))
    }
}

/// Filesystem-backed artifact store.
#[derive(Debug)]
pub struct FsArtifactStore {
    root: PathBuf,
    cache: Option<DigestCache>,
}

impl FsArtifactStore {
    /// Open a store rooted at `root`, which must be an existing directory.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidRoot`] if the root cannot be
    /// canonicalized or is not a directory.
    pub fn open_root(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let configured = root.as_ref();
        let canonical = fs::canonicalize(configured).map_err(|e| StoreError::InvalidRoot {
            path: configured.to_path_buf(),
            reason: e.to_string(),
        })?;
        if !canonical.is_dir() {
            return Err(StoreError::InvalidRoot {
                path: configured.to_path_buf(),
                reason: "not a directory".to_string(),
            });
        }
        Ok(Self {
            root: canonical,
            cache: None,
        })
    }

    /// Enable digest memoization keyed by (path, size, mtime).
    pub fn with_digest_cache(mut self) -> Self {
        self.cache = Some(DigestCache::new());
        self
    }

    /// The canonical store root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The digest cache, if enabled.
    pub fn cache(&self) -> Option<&DigestCache> {
        self.cache.as_ref()
    }
}

impl ArtifactStore for FsArtifactStore {
    fn locate(&self, name: &ArtifactName) -> Result<LocatedArtifact, StoreError> {
        // No filesystem stores a longer single component.
        if name.as_str().len() > MAX_NAME_BYTES {
            return Err(StoreError::NotFound(name.to_string()));
        }
        let candidate = self.root.join(name.as_str());
        let resolved =
            fs::canonicalize(&candidate).map_err(|e| StoreError::from_io(name.as_str(), e))?;

        if !resolved.starts_with(&self.root) {
            tracing::warn!(artifact = %name, "artifact resolves outside the store root");
            return Err(StoreError::OutsideRoot(name.to_string()));
        }

        let meta = fs::metadata(&resolved).map_err(|e| StoreError::from_io(name.as_str(), e))?;
        if !meta.is_file() {
            return Err(StoreError::NotFound(name.to_string()));
        }

        Ok(LocatedArtifact::new(
            name.clone(),
            resolved,
            meta.len(),
            meta.modified().ok(),
        ))
    }

    fn open(&self, artifact: &LocatedArtifact) -> Result<File, StoreError> {
        File::open(artifact.path()).map_err(|e| StoreError::from_io(artifact.name().as_str(), e))
    }

    fn digest(&self, artifact: &LocatedArtifact) -> Result<Sha256Digest, StoreError> {
        let compute = || digest_reader(File::open(artifact.path())?);
        let result = match &self.cache {
            Some(cache) => {
                cache.get_or_compute(artifact.path(), artifact.len(), artifact.modified(), compute)
            }
            None => compute(),
        };
        result.map_err(|e| StoreError::from_io(artifact.name().as_str(), e))
    }
}
