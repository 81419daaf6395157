//! # Check Subcommand
//!
//! Loads a catalog exactly as the server would and checks it against the
//! firmware directory it names:
//!
//! - every identifier and filename passes validation,
//! - `latest` names a mapped version,
//! - every mapped artifact is a regular file inside `firmware_dir`.
//!
//! Text output lists each version with its artifact and digest (`*` marks
//! latest). `--json` prints the body `/firmware/latest` would return.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use ota_core::{load_catalog, ArtifactStore, FsArtifactStore};

/// Arguments for the `ota check` subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Catalog file to check.
    #[arg(value_name = "CATALOG")]
    pub catalog: PathBuf,

    /// Print the latest-firmware JSON body instead of the version table.
    #[arg(long)]
    pub json: bool,
}

/// Outcome for one mapped version.
#[derive(Debug, Clone, Serialize)]
pub struct EntryReport {
    pub version: String,
    pub filename: String,
    pub sha256: Option<String>,
    pub error: Option<String>,
    pub latest: bool,
}

/// Outcome for a whole catalog.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogReport {
    pub latest: String,
    pub latest_mapped: bool,
    pub entries: Vec<EntryReport>,
}

impl CatalogReport {
    /// Whether the catalog is safe to deploy.
    pub fn is_ok(&self) -> bool {
        self.latest_mapped && self.entries.iter().all(|e| e.error.is_none())
    }

    fn latest_entry(&self) -> Option<&EntryReport> {
        self.entries.iter().find(|e| e.latest)
    }
}

#[derive(Serialize)]
struct LatestBody<'a> {
    version: &'a str,
    filename: &'a str,
    sha256: &'a str,
}

/// Load and inspect a catalog.
///
/// # Errors
///
/// Fails if the catalog cannot be loaded or its firmware directory cannot be
/// opened; per-artifact problems are recorded in the report instead.
pub fn check_catalog(path: &std::path::Path) -> Result<CatalogReport> {
    let file = load_catalog(path)?;
    let store = FsArtifactStore::open_root(&file.firmware_dir)
        .with_context(|| format!("catalog {} names an unusable firmware_dir", path.display()))?;

    let latest = file.catalog.latest().clone();
    let entries = file
        .catalog
        .records()
        .map(|record| {
            let digest = store
                .locate(&record.filename)
                .and_then(|located| store.digest(&located));
            let (sha256, error) = match digest {
                Ok(d) => (Some(d.to_hex()), None),
                Err(e) => (None, Some(e.to_string())),
            };
            EntryReport {
                latest: record.version == latest,
                version: record.version.to_string(),
                filename: record.filename.to_string(),
                sha256,
                error,
            }
        })
        .collect();

    Ok(CatalogReport {
        latest: latest.to_string(),
        latest_mapped: file.catalog.latest_is_mapped(),
        entries,
    })
}

/// Execute the check subcommand.
pub fn run_check(args: &CheckArgs) -> Result<u8> {
    let stdout = std::io::stdout();
    run_check_to(args, &mut stdout.lock())
}

fn run_check_to(args: &CheckArgs, out: &mut impl Write) -> Result<u8> {
    let report = check_catalog(&args.catalog)?;

    if !report.latest_mapped {
        tracing::error!(latest = %report.latest, "latest names an unmapped version");
    }
    for entry in report.entries.iter().filter(|e| e.error.is_some()) {
        tracing::error!(
            version = %entry.version,
            artifact = %entry.filename,
            "{}",
            entry.error.as_deref().unwrap_or_default()
        );
    }

    if args.json {
        if let Some(entry) = report.latest_entry() {
            if let Some(sha256) = &entry.sha256 {
                let body = LatestBody {
                    version: &entry.version,
                    filename: &entry.filename,
                    sha256,
                };
                writeln!(out, "{}", serde_json::to_string_pretty(&body)?)?;
            }
        }
    } else {
        for entry in &report.entries {
            let marker = if entry.latest { '*' } else { ' ' };
            let digest = entry.sha256.as_deref().unwrap_or("MISSING");
            writeln!(out, "{marker} {}\t{}\t{digest}", entry.version, entry.filename)?;
        }
    }

    if report.is_ok() {
        tracing::info!(versions = report.entries.len(), "catalog OK");
        Ok(0)
    } else {
        Ok(1)
    }
}
