//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers via
//! the `State` extractor.
//!
//! - **Resolver** — the atomically swappable catalog (version mapping and
//!   latest pointer).
//! - **Store** — the artifact store adapter, behind a trait object so tests
//!   can observe exactly which lookups a request performs.
//! - **Config** — immutable process configuration read once at startup.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use ota_core::{ArtifactStore, VersionResolver};
use thiserror::Error;

use crate::auth::ApiKey;

/// PEM certificate chain and private key for HTTPS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Process configuration.
///
/// `Debug` is safe to log: the API key renders as `[REDACTED]`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address to bind the listener to.
    pub bind: IpAddr,
    /// Port to bind the listener to.
    pub port: u16,
    /// Shared secret presented in `x-api-key`.
    pub api_key: ApiKey,
    /// Path of the YAML catalog.
    pub catalog_path: PathBuf,
    /// HTTPS material; `None` serves plain HTTP.
    pub tls: Option<TlsConfig>,
    /// Memoize artifact digests by (path, size, mtime).
    pub digest_cache: bool,
    /// Require the API key on `download` as well as `latest`.
    pub download_requires_key: bool,
}

/// Errors reading configuration from the environment.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("OTA_API_KEY must be set to a non-empty shared secret")]
    MissingApiKey,

    #[error("invalid {var}: {value:?}")]
    Invalid { var: &'static str, value: String },

    #[error("OTA_TLS_CERT and OTA_TLS_KEY must be set together")]
    IncompleteTls,
}

impl AppConfig {
    /// Defaults around a given secret: all interfaces, port 3000,
    /// `catalog.yaml`, plain HTTP, digest cache on, open downloads.
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
            api_key,
            catalog_path: PathBuf::from("catalog.yaml"),
            tls: None,
            digest_cache: true,
            download_requires_key: false,
        }
    }

    /// Build configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingApiKey`] without a usable `OTA_API_KEY`,
    /// [`ConfigError::IncompleteTls`] when only one of the TLS paths is set,
    /// and [`ConfigError::Invalid`] for unparseable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = lookup("OTA_API_KEY")
            .and_then(ApiKey::new)
            .ok_or(ConfigError::MissingApiKey)?;
        let mut config = Self::new(api_key);

        if let Some(bind) = lookup("OTA_BIND") {
            config.bind = bind.parse().map_err(|_| ConfigError::Invalid {
                var: "OTA_BIND",
                value: bind,
            })?;
        }
        if let Some(port) = lookup("PORT") {
            config.port = port.parse().map_err(|_| ConfigError::Invalid {
                var: "PORT",
                value: port,
            })?;
        }
        if let Some(path) = lookup("OTA_CATALOG") {
            config.catalog_path = PathBuf::from(path);
        }

        config.tls = match (lookup("OTA_TLS_CERT"), lookup("OTA_TLS_KEY")) {
            (Some(cert), Some(key)) => Some(TlsConfig {
                cert: PathBuf::from(cert),
                key: PathBuf::from(key),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteTls),
        };

        if let Some(v) = lookup("OTA_DIGEST_CACHE") {
            config.digest_cache = parse_bool("OTA_DIGEST_CACHE", v)?;
        }
        if let Some(v) = lookup("OTA_DOWNLOAD_REQUIRES_KEY") {
            config.download_requires_key = parse_bool("OTA_DOWNLOAD_REQUIRES_KEY", v)?;
        }

        Ok(config)
    }

    /// Listener address.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

fn parse_bool(var: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid { var, value }),
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub resolver: Arc<VersionResolver>,
    pub store: Arc<dyn ArtifactStore>,
}

impl AppState {
    /// Assemble state from its parts.
    pub fn new(
        config: AppConfig,
        resolver: Arc<VersionResolver>,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            resolver,
            store,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}
