// SPDX-License-Identifier: MIT
//
// devrandom: Quantum Entropy Stream
// Copyright (c) 2025 Valer Bocan, PhD, CSSLP
// Email: valer.bocan@upt.ro
//
// Department of Computer and Information Technology
// Politehnica University of Timisoara

//! devrandom - Quantum Entropy Stream
//!
//! Streams raw quantum random bytes from the ANU QRNG service to standard
//! output, forever, until the first error.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     fetch     ┌──────────────┐     write      ┌──────────────┐
//! │   ANU QRNG   │ ─────────────>│   devrandom  │ ──────────────>│    stdout    │
//! │   JSON API   │    (HTTPS)    │  (hex → raw) │   raw bytes    │              │
//! └──────────────┘               └──────────────┘                └──────────────┘
//! ```
//!
//! On failure a single `Error: <description>` line is written to standard
//! error and the process exits with a non-zero status. Logs also go to
//! standard error and are off unless `--log-level` says otherwise.

use anyhow::{Context, Result};
use clap::Parser;
use devrandom_core::{config::SourceConfig, source::QrngEntropySource, Pipeline};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "devrandom")]
#[command(about = "Streams quantum random bytes to stdout", long_about = None)]
struct Args {
    /// Log level (off, error, warn, info, debug, trace)
    #[arg(short, long, default_value = "off")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing; stdout carries entropy, so logs go to stderr
    let filter = EnvFilter::try_new(&args.log_level)
        .with_context(|| format!("Invalid log level '{}'", args.log_level))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .json()
        .init();

    info!("devrandom v{}", devrandom_core::VERSION);

    let source = QrngEntropySource::new(SourceConfig::default())
        .context("Failed to create entropy source")?;
    info!("Entropy source: {}", source.request_url());
    info!("Request timeout: {:?}", source.config().timeout());

    let outcome = Pipeline::new(source, tokio::io::stdout()).run().await;

    eprintln!("{}", outcome.diagnostic());
    std::process::exit(outcome.exit_code());
}
