// SPDX-License-Identifier: MIT
//
// devrandom: Quantum Entropy Stream
// Copyright (c) 2025 Valer Bocan, PhD, CSSLP
// Email: valer.bocan@upt.ro
//
// Department of Computer and Information Technology
// Politehnica University of Timisoara

//! devrandom Core Library
//!
//! This crate implements a continuous entropy stream: it polls a remote quantum
//! random number API, decodes the hex blocks it returns and writes the raw bytes
//! to a sink until the first error.
//!
//! # Architecture
//!
//! The library is organized into modules representing core concerns:
//! - `protocol`: JSON response format and entropy blocks
//! - `config`: Source configuration with validation
//! - `source`: Fetch loop and the HTTP entropy source
//! - `sink`: Decode-and-write loop over an injected byte sink
//! - `pipeline`: Coordinator wiring the two loops with a shared error channel
//! - `metrics`: Pipeline counters
//! - `error`: Unified error types
//!
//! # Failure model
//!
//! Every error is fatal. The first one reported by either loop stops the
//! pipeline; nothing is retried.

pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod protocol;
pub mod sink;
pub mod source;

pub use error::{Error, Result};
pub use pipeline::{Pipeline, PipelineOutcome};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Upper bound the remote API accepts for `length` and `size`
pub const MAX_ARRAY_LENGTH: u32 = 1024;
