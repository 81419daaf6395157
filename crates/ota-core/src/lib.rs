//! # ota-core — Firmware Catalog, Store, and Digest Primitives
//!
//! The protocol core of the firmware distribution server. Everything here is
//! independent of HTTP: the API crate composes these pieces into request
//! handlers, the CLI composes them into operator checks.
//!
//! ## Components (leaf-first)
//!
//! | Module       | Role |
//! |--------------|------|
//! | [`identity`] | `VersionId` and `ArtifactName` newtypes, validated at construction |
//! | [`digest`]   | Streaming SHA-256 over artifact bytes, optional digest cache |
//! | [`store`]    | The only place a filesystem path is built from a name |
//! | [`catalog`]  | Version mapping + latest pointer, loaded from YAML |
//! | [`resolver`] | Atomically swappable catalog snapshot, resolves "latest" |
//!
//! ## Crate Policy
//!
//! - No `unsafe` code.
//! - No `.unwrap()` outside tests.
//! - Untrusted names never reach `Path::join` without passing through
//!   [`ArtifactName::parse`] first.

pub mod catalog;
pub mod digest;
pub mod error;
pub mod identity;
pub mod resolver;
pub mod store;

pub use catalog::{load_catalog, ArtifactRecord, Catalog, CatalogFile};
pub use digest::{digest_bytes, digest_file, digest_reader, try_digest_file, DigestCache, Sha256Digest};
pub use error::{CatalogError, ResolveError, StoreError, ValidationError};
pub use identity::{ArtifactName, VersionId};
pub use resolver::VersionResolver;
pub use store::{ArtifactStore, FsArtifactStore, LocatedArtifact};
