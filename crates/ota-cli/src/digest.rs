//! # Digest Subcommand
//!
//! Prints `<sha256>  <file>` per input, the same hex the server reports from
//! `/firmware/latest`.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use ota_core::try_digest_file;

/// Arguments for the `ota digest` subcommand.
#[derive(Args, Debug)]
pub struct DigestArgs {
    /// Files to hash.
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,
}

/// Execute the digest subcommand.
pub fn run_digest(args: &DigestArgs) -> Result<u8> {
    let stdout = std::io::stdout();
    run_digest_to(args, &mut stdout.lock())
}

fn run_digest_to(args: &DigestArgs, out: &mut impl Write) -> Result<u8> {
    let mut failed = false;
    for file in &args.files {
        match try_digest_file(file) {
            Ok(digest) => {
                writeln!(out, "{digest}  {}", file.display()).context("failed to write output")?;
            }
            Err(e) => {
                tracing::error!(file = %file.display(), "cannot digest: {e}");
                failed = true;
            }
        }
    }
    Ok(u8::from(failed))
}
