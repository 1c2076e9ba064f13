// SPDX-License-Identifier: MIT
//
// devrandom: Quantum Entropy Stream
// Copyright (c) 2025 Valer Bocan, PhD, CSSLP
// Email: valer.bocan@upt.ro
//
// Department of Computer and Information Technology
// Politehnica University of Timisoara

//! Wire types of the remote QRNG JSON API
//!
//! The service answers every request with a JSON object of the form
//! `{"type": "hex16", "length": 1024, "size": 1024, "data": [...], "success": true}`.
//! Each element of `data` is one hex-encoded [`EntropyBlock`].

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One unit of randomness as delivered by the remote API
///
/// The block is kept in its wire encoding until the sink decodes it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntropyBlock(String);

impl EntropyBlock {
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of raw bytes this block decodes to
    pub fn decoded_len(&self) -> usize {
        self.0.len() / 2
    }

    /// Decode the hex payload into raw bytes
    ///
    /// An empty block means the source has nothing left to give and is
    /// reported as [`Error::Exhausted`].
    pub fn decode(&self) -> Result<Vec<u8>> {
        if self.is_empty() {
            return Err(Error::Exhausted);
        }
        Ok(hex::decode(&self.0)?)
    }
}

impl fmt::Display for EntropyBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntropyBlock {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Parsed response of one API call
///
/// Missing fields take their zero value; a field of the wrong type fails
/// the whole parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntropyResponse {
    /// Encoding tag echoed by the service (e.g. `hex16`)
    #[serde(rename = "type")]
    pub data_type: String,

    /// Number of blocks requested
    pub length: i64,

    /// Size of each block requested
    pub size: i64,

    /// Blocks in delivery order
    pub data: Vec<EntropyBlock>,

    /// Whether the service could satisfy the request
    pub success: bool,
}

impl EntropyResponse {
    /// Parse a raw response body
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(Into::into)
    }

    /// Consume the response, yielding its blocks in order
    ///
    /// Fails with [`Error::Unsuccessful`] when the service reported failure,
    /// whatever the `data` field holds.
    pub fn into_blocks(self) -> Result<Vec<EntropyBlock>> {
        if !self.success {
            return Err(Error::Unsuccessful);
        }
        Ok(self.data)
    }
}
