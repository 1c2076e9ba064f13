// SPDX-License-Identifier: MIT
//
// devrandom: Quantum Entropy Stream
// Copyright (c) 2025 Valer Bocan, PhD, CSSLP
// Email: valer.bocan@upt.ro
//
// Department of Computer and Information Technology
// Politehnica University of Timisoara

//! Error types for the entropy pipeline
//!
//! Every failure is terminal for the pipeline, so the taxonomy exists for
//! diagnostics only. No variant is retried.

pub type Result<T> = std::result::Result<T, Error>;

/// Core error type carried on the pipeline's error channel
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration validation failed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport failure or failure while reading the response body
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body is not a well-formed entropy response
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Entropy block is not valid hexadecimal
    #[error("Decode error: {0}")]
    Decode(#[from] hex::FromHexError),

    /// Remote service reported `success: false`
    #[error("unable to retrieve entropy")]
    Unsuccessful,

    /// An empty entropy block was received
    #[error("entropy source exhausted")]
    Exhausted,

    /// Writing decoded bytes to the output sink failed
    #[error("unable to write to stdout")]
    Sink(#[source] std::io::Error),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Short stable tag, used as a structured log field
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "config",
            Error::Network(_) => "network",
            Error::Serialization(_) => "serialization",
            Error::Decode(_) => "decode",
            Error::Unsuccessful => "unsuccessful",
            Error::Exhausted => "exhausted",
            Error::Sink(_) => "sink",
            Error::Internal(_) => "internal",
        }
    }

    /// Check if the error originated in the HTTP transport
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Network(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
