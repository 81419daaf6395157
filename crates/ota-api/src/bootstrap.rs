//! # Server Bootstrap
//!
//! Builds the application state from configuration at startup.
//!
//! ## Bootstrap Sequence
//!
//! 1. **Load Catalog** — Parse the YAML catalog, validate every identifier.
//! 2. **Open Store** — Canonicalize the firmware directory, attach the digest
//!    cache if enabled.
//! 3. **Audit Artifacts** — Warn for each mapped artifact the store cannot
//!    locate. Missing files do not stop startup; requests for them get 404.
//! 4. **Log Banner** — Structured startup summary.
//!
//! The returned [`CatalogReloader`] re-runs step 1 on demand (SIGHUP on Unix)
//! and swaps the result into the live resolver.

use std::path::PathBuf;
use std::sync::Arc;

use ota_core::{
    load_catalog, ArtifactStore, Catalog, CatalogError, FsArtifactStore, StoreError,
    VersionResolver,
};

use crate::state::{AppConfig, AppState};

/// Errors during bootstrap.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// The catalog could not be loaded.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The firmware directory is unusable.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Everything `main` needs after bootstrap.
#[derive(Debug)]
pub struct Bootstrapped {
    pub state: AppState,
    pub reloader: CatalogReloader,
}

/// Load the catalog, open the store, and assemble [`AppState`].
pub fn bootstrap(config: AppConfig) -> Result<Bootstrapped, BootstrapError> {
    let file = load_catalog(&config.catalog_path)?;

    let mut store = FsArtifactStore::open_root(&file.firmware_dir)?;
    if config.digest_cache {
        store = store.with_digest_cache();
    }

    audit_artifacts(&file.catalog, &store);
    log_banner(&config, &file.catalog, &store);

    let resolver = Arc::new(VersionResolver::new(file.catalog));
    let reloader = CatalogReloader {
        catalog_path: file.path,
        firmware_dir: file.firmware_dir,
        resolver: Arc::clone(&resolver),
    };
    let state = AppState::new(config, resolver, Arc::new(store));

    Ok(Bootstrapped { state, reloader })
}

fn audit_artifacts(catalog: &Catalog, store: &dyn ArtifactStore) {
    for record in catalog.records() {
        if let Err(e) = store.locate(&record.filename) {
            tracing::warn!(
                version = %record.version,
                artifact = %record.filename,
                error = %e,
                "mapped firmware artifact is not available"
            );
        }
    }
}

fn log_banner(config: &AppConfig, catalog: &Catalog, store: &FsArtifactStore) {
    tracing::info!(
        catalog = %config.catalog_path.display(),
        firmware_dir = %store.root().display(),
        versions = catalog.len(),
        latest = %catalog.latest(),
        latest_mapped = catalog.latest_is_mapped(),
        tls = config.tls.is_some(),
        digest_cache = config.digest_cache,
        download_requires_key = config.download_requires_key,
        "firmware server bootstrapped"
    );
}

/// Re-reads the catalog and swaps it into the live resolver.
#[derive(Debug, Clone)]
pub struct CatalogReloader {
    catalog_path: PathBuf,
    firmware_dir: PathBuf,
    resolver: Arc<VersionResolver>,
}

impl CatalogReloader {
    /// Reload once. On failure the active catalog stays in place.
    ///
    /// The store root is fixed for the life of the process; a reloaded
    /// catalog that names a different `firmware_dir` is applied for its
    /// mapping only.
    pub fn reload(&self) -> Result<(), CatalogError> {
        let file = match load_catalog(&self.catalog_path) {
            Ok(file) => file,
            Err(e) => {
                tracing::error!(error = %e, "catalog reload failed; keeping active catalog");
                return Err(e);
            }
        };

        if file.firmware_dir != self.firmware_dir {
            tracing::warn!(
                configured = %self.firmware_dir.display(),
                reloaded = %file.firmware_dir.display(),
                "firmware_dir changed in catalog; restart to apply"
            );
        }

        let versions = file.catalog.len();
        let latest = file.catalog.latest().clone();
        let previous = self.resolver.replace(file.catalog);
        tracing::info!(
            versions,
            latest = %latest,
            previous_latest = %previous.latest(),
            "catalog reloaded"
        );
        Ok(())
    }

    /// Reload on every SIGHUP for the life of the process.
    #[cfg(unix)]
    pub fn spawn_on_sighup(self) -> std::io::Result<tokio::task::JoinHandle<()>> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut hangups = signal(SignalKind::hangup())?;
        Ok(tokio::spawn(async move {
            while hangups.recv().await.is_some() {
                tracing::info!("SIGHUP received; reloading catalog");
                let reloader = self.clone();
                if let Err(e) = tokio::task::spawn_blocking(move || reloader.reload()).await {
                    tracing::error!(error = %e, "catalog reload task failed");
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::ApiKey;
    use std::path::Path;

    fn write(path: &Path, content: &str) {
        std::fs::write(path, content).unwrap();
    }

    fn setup(catalog: &str) -> (tempfile::TempDir, AppConfig) {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("firmwares")).unwrap();
        write(&tmp.path().join("firmwares/v1.0.bin"), "one");
        write(&tmp.path().join("firmwares/v2.0.bin"), "two");
        let catalog_path = tmp.path().join("catalog.yaml");
        write(&catalog_path, catalog);

        let mut config = AppConfig::new(ApiKey::new("k").unwrap());
        config.catalog_path = catalog_path;
        (tmp, config)
    }

    const CATALOG: &str =
        "firmware_dir: firmwares\nlatest: v2\nversions:\n  v1: v1.0.bin\n  v2: v2.0.bin\n";

    #[test]
    fn bootstrap_builds_state() {
        let (_tmp, config) = setup(CATALOG);
        let boot = bootstrap(config).unwrap();
        let record = boot.state.resolver.resolve_latest().unwrap();
        assert_eq!(record.filename.as_str(), "v2.0.bin");
        assert!(boot.state.store.locate(&record.filename).is_ok());
    }

    #[test]
    fn missing_catalog_fails() {
        let (tmp, mut config) = setup(CATALOG);
        config.catalog_path = tmp.path().join("absent.yaml");
        assert!(matches!(
            bootstrap(config),
            Err(BootstrapError::Catalog(CatalogError::NotFound { .. }))
        ));
    }

    #[test]
    fn missing_firmware_dir_fails() {
        let (_tmp, config) = setup("firmware_dir: nowhere\nlatest: v1\nversions:\n  v1: v1.0.bin\n");
        assert!(matches!(
            bootstrap(config),
            Err(BootstrapError::Store(StoreError::InvalidRoot { .. }))
        ));
    }

    #[test]
    fn missing_artifacts_do_not_block_startup() {
        let (_tmp, config) =
            setup("firmware_dir: firmwares\nlatest: v3\nversions:\n  v3: v3.0.bin\n");
        assert!(bootstrap(config).is_ok());
    }

    #[test]
    fn reload_swaps_catalog() {
        let (_tmp, config) = setup(CATALOG);
        let catalog_path = config.catalog_path.clone();
        let boot = bootstrap(config).unwrap();

        write(
            &catalog_path,
            "firmware_dir: firmwares\nlatest: v1\nversions:\n  v1: v1.0.bin\n  v2: v2.0.bin\n",
        );
        boot.reloader.reload().unwrap();
        assert_eq!(boot.state.resolver.snapshot().latest().as_str(), "v1");
    }

    #[test]
    fn failed_reload_keeps_active_catalog() {
        let (_tmp, config) = setup(CATALOG);
        let catalog_path = config.catalog_path.clone();
        let boot = bootstrap(config).unwrap();

        write(&catalog_path, "latest: [not, a, version\n");
        assert!(boot.reloader.reload().is_err());
        assert_eq!(boot.state.resolver.snapshot().latest().as_str(), "v2");

        write(&catalog_path, "firmware_dir: firmwares\nlatest: v1\nversions:\n  v1: ../x.bin\n");
        assert!(boot.reloader.reload().is_err());
        assert_eq!(boot.state.resolver.snapshot().latest().as_str(), "v2");
    }
}
