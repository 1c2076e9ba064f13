// SPDX-License-Identifier: MIT
//
// devrandom: Quantum Entropy Stream
// Copyright (c) 2025 Valer Bocan, PhD, CSSLP
// Email: valer.bocan@upt.ro
//
// Department of Computer and Information Technology
// Politehnica University of Timisoara

//! Pipeline counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Counters shared by the fetcher, the writer and the coordinator
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    start_time: Instant,
    requests_total: AtomicU64,
    blocks_published: AtomicU64,
    blocks_written: AtomicU64,
    bytes_written: AtomicU64,
    errors_reported: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_seconds: u64,
    pub requests_total: u64,
    pub blocks_published: u64,
    pub blocks_written: u64,
    pub bytes_written: u64,
    pub errors_reported: u64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                start_time: Instant::now(),
                requests_total: AtomicU64::new(0),
                blocks_published: AtomicU64::new(0),
                blocks_written: AtomicU64::new(0),
                bytes_written: AtomicU64::new(0),
                errors_reported: AtomicU64::new(0),
            }),
        }
    }

    pub fn record_request(&self) {
        self.inner.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_published(&self) {
        self.inner.blocks_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_written(&self, bytes: usize) {
        self.inner.blocks_written.fetch_add(1, Ordering::Relaxed);
        self.inner.bytes_written.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.inner.errors_reported.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests_total(&self) -> u64 {
        self.inner.requests_total.load(Ordering::Relaxed)
    }

    pub fn blocks_published(&self) -> u64 {
        self.inner.blocks_published.load(Ordering::Relaxed)
    }

    pub fn blocks_written(&self) -> u64 {
        self.inner.blocks_written.load(Ordering::Relaxed)
    }

    pub fn bytes_written(&self) -> u64 {
        self.inner.bytes_written.load(Ordering::Relaxed)
    }

    pub fn errors_reported(&self) -> u64 {
        self.inner.errors_reported.load(Ordering::Relaxed)
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.inner.start_time.elapsed().as_secs()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_seconds: self.uptime_seconds(),
            requests_total: self.requests_total(),
            blocks_published: self.blocks_published(),
            blocks_written: self.blocks_written(),
            bytes_written: self.bytes_written(),
            errors_reported: self.errors_reported(),
        }
    }
}
