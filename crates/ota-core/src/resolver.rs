//! # Version Resolver
//!
//! Holds the current [`Catalog`] behind an atomically swappable reference.
//!
//! Readers take one `Arc<Catalog>` snapshot per request and resolve against
//! it; the lock is held only long enough to clone the `Arc`. Writers build a
//! complete replacement catalog and swap it in with a single store. A
//! request therefore never observes a half-updated mapping, and the version,
//! filename, and digest it reports all come from one resolution even if the
//! pointer moves mid-request.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::catalog::{ArtifactRecord, Catalog};
use crate::error::ResolveError;
use crate::identity::VersionId;

/// Resolves the latest pointer to an artifact record.
#[derive(Debug)]
pub struct VersionResolver {
    current: RwLock<Arc<Catalog>>,
}

impl VersionResolver {
    /// Create a resolver over an initial catalog.
    pub fn new(catalog: Catalog) -> Self {
        Self {
            current: RwLock::new(Arc::new(catalog)),
        }
    }

    /// The catalog as of this instant.
    pub fn snapshot(&self) -> Arc<Catalog> {
        Arc::clone(&self.current.read())
    }

    /// Resolve the latest pointer against one snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::NotConfigured`] if the pointer is unmapped.
    pub fn resolve_latest(&self) -> Result<ArtifactRecord, ResolveError> {
        self.snapshot().resolve_latest()
    }

    /// Resolve an arbitrary version.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::UnknownVersion`] if it is unmapped.
    pub fn resolve(&self, version: &str) -> Result<ArtifactRecord, ResolveError> {
        self.snapshot()
            .get(version)
            .ok_or_else(|| ResolveError::UnknownVersion(version.to_string()))
    }

    /// Replace the whole catalog. Returns the catalog that was active.
    pub fn replace(&self, catalog: Catalog) -> Arc<Catalog> {
        std::mem::replace(&mut *self.current.write(), Arc::new(catalog))
    }

    /// Move the latest pointer to an already-mapped version.
    ///
    /// The read-modify-swap runs under the write lock, so concurrent
    /// promotions and replacements serialize.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::UnknownVersion`] if `version` is unmapped; the
    /// active catalog is left untouched.
    pub fn promote(&self, version: &VersionId) -> Result<(), ResolveError> {
        let mut guard = self.current.write();
        let next = guard.with_latest(version)?;
        *guard = Arc::new(next);
        Ok(())
    }
}
