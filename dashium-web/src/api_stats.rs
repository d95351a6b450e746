// Dashium - A self-hosted monitoring dashboard built with Rust
// Copyright (C) 2025 Dashium Project Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! In-memory usage statistics for GET API calls.
//!
//! Entries are keyed by the canonical form of the request's query parameters,
//! so each distinct parameter combination gets its own counters.

use serde::Serialize;
use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use crate::view_registry::QueryParams;

#[derive(Debug, Default, Clone)]
struct EndpointStats {
    total_requests: u64,
    total_errors: u64,
    successes: u64,
    total_ms: f64,
    max_ms: f64,
}

/// One row of the admin panel's usage table
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ApiStatsRow {
    pub api_name: String,
    pub total_calls: u64,
    pub total_errors: u64,
    pub avg_response_time_ms: f64,
    pub max_response_time_ms: f64,
}

/// Distinct parameter combinations tracked before new ones share one row
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

/// Row that absorbs calls once the table is full
pub const OVERFLOW_KEY: &str = "(other)";

#[derive(Debug)]
pub struct ApiStats {
    entries: Mutex<BTreeMap<String, EndpointStats>>,
    max_entries: usize,
}

impl Default for ApiStats {
    fn default() -> Self {
        Self::with_max_entries(DEFAULT_MAX_ENTRIES)
    }
}

/// `k=v` pairs in key order, joined by `;`
pub fn canonical_key(params: &QueryParams) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(";")
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl ApiStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, EndpointStats>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count one call. Timings only accumulate for successful calls.
    pub fn record(&self, params: &QueryParams, elapsed: Duration, failed: bool) {
        let mut key = canonical_key(params);
        let mut entries = self.lock();

        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            if !entries.contains_key(OVERFLOW_KEY) {
                tracing::warn!(
                    max_entries = self.max_entries,
                    "API stats table is full; further parameter combinations are counted under {}",
                    OVERFLOW_KEY
                );
            }
            key = OVERFLOW_KEY.to_string();
        }

        let entry = entries.entry(key).or_default();

        entry.total_requests += 1;
        if failed {
            entry.total_errors += 1;
            return;
        }

        let ms = elapsed.as_secs_f64() * 1000.0;
        entry.successes += 1;
        entry.total_ms += ms;
        if ms > entry.max_ms {
            entry.max_ms = ms;
        }
    }

    pub fn snapshot(&self) -> Vec<ApiStatsRow> {
        self.lock()
            .iter()
            .map(|(key, stats)| {
                let avg = if stats.successes == 0 {
                    0.0
                } else {
                    stats.total_ms / stats.successes as f64
                };
                ApiStatsRow {
                    api_name: key.clone(),
                    total_calls: stats.total_requests,
                    total_errors: stats.total_errors,
                    avg_response_time_ms: round2(avg),
                    max_response_time_ms: round2(stats.max_ms),
                }
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
