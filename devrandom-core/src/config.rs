// SPDX-License-Identifier: MIT
//
// devrandom: Quantum Entropy Stream
// Copyright (c) 2025 Valer Bocan, PhD, CSSLP
// Email: valer.bocan@upt.ro
//
// Department of Computer and Information Technology
// Politehnica University of Timisoara

//! Configuration of the remote entropy source

use crate::{Error, Result};
use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Endpoint of the ANU Quantum Random Numbers Server JSON API
pub const DEFAULT_SOURCE_URL: &str = "https://qrng.anu.edu.au/API/jsonI.php";

/// Data encoding requested from the service
pub const DEFAULT_DATA_TYPE: &str = "hex16";

/// Blocks requested per call
pub const DEFAULT_ARRAY_LENGTH: u32 = 1024;

/// Size of each block requested
pub const DEFAULT_BLOCK_SIZE: u32 = 1024;

/// HTTP request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Remote entropy source configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SourceConfig {
    /// Base URL of the QRNG JSON API
    pub base_url: Url,

    /// Value of the `type` query parameter
    #[serde(default = "default_data_type")]
    pub data_type: String,

    /// Value of the `length` query parameter
    #[serde(default = "default_array_length")]
    pub array_length: u32,

    /// Value of the `size` query parameter
    #[serde(default = "default_block_size")]
    pub block_size: u32,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_source_url(),
            data_type: default_data_type(),
            array_length: default_array_length(),
            block_size: default_block_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl SourceConfig {
    /// Create a configuration for a custom endpoint, keeping the default query
    pub fn with_base_url(base_url: Url) -> Self {
        Self {
            base_url,
            ..Self::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        match self.base_url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(Error::Config(format!(
                    "Unsupported URL scheme '{}' in {}",
                    other, self.base_url
                )))
            }
        }

        if self.data_type.trim().is_empty() {
            return Err(Error::Config("data_type cannot be empty".to_string()));
        }

        if self.array_length == 0 || self.array_length > crate::MAX_ARRAY_LENGTH {
            return Err(Error::Config(format!(
                "array_length must be between 1 and {}",
                crate::MAX_ARRAY_LENGTH
            )));
        }

        if self.block_size == 0 || self.block_size > crate::MAX_ARRAY_LENGTH {
            return Err(Error::Config(format!(
                "block_size must be between 1 and {}",
                crate::MAX_ARRAY_LENGTH
            )));
        }

        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be > 0".to_string()));
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Build the request URL with the query parameters in canonical order
    pub fn request_url(&self) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("length", &self.array_length.to_string())
            .append_pair("size", &self.block_size.to_string())
            .append_pair("type", &self.data_type);
        url
    }

    /// Build the HTTP client used by the fetcher
    pub fn build_client(&self) -> Result<Client> {
        ClientBuilder::new()
            .timeout(self.timeout())
            .pool_max_idle_per_host(1)
            .tcp_keepalive(Duration::from_secs(60))
            .use_rustls_tls()
            .build()
            .map_err(Error::Network)
    }
}

// Default value functions
fn default_source_url() -> Url {
    Url::parse(DEFAULT_SOURCE_URL).expect("DEFAULT_SOURCE_URL is a valid URL")
}

fn default_data_type() -> String {
    DEFAULT_DATA_TYPE.to_string()
}

fn default_array_length() -> u32 {
    DEFAULT_ARRAY_LENGTH
}

fn default_block_size() -> u32 {
    DEFAULT_BLOCK_SIZE
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
