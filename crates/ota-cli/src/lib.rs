//! # ota-cli — Operator CLI for the Firmware Server
//!
//! ## Subcommands
//!
//! - `ota digest <FILE>...` — SHA-256 of each file, `sha256sum` layout.
//! - `ota check <CATALOG> [--json]` — pre-deployment catalog validation.
//!
//! Both exit `0` on success and `1` on any problem, so they slot into CI
//! and deployment hooks:
//!
//! ```bash
//! ota check /etc/ota/catalog.yaml && kill -HUP "$(pidof ota-api)"
//! ```

pub mod check;
pub mod digest;
