//! Metrics definitions for search and association sync.
//!
//! This module defines all metrics used throughout the service.
//! Metrics are collected using the `metrics` crate and can be exported
//! to Prometheus via `metrics-exporter-prometheus`.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Instant;

use crate::models::AssociationKind;
use crate::ports::PaginationMode;

/// Initialize all metric descriptions.
/// Call this once at startup before any metrics are recorded.
pub fn init_metrics() {
    describe_counter!(
        "pagination_requests_total",
        "Total number of paginated search requests, by mode"
    );
    describe_counter!(
        "pagination_invalid_cursor_total",
        "Total number of rejected cursor tokens"
    );
    describe_histogram!(
        "page_fetch_duration_seconds",
        "Time taken to fetch one page and its total count in seconds"
    );
    describe_counter!(
        "association_sync_total",
        "Total number of association sync passes, by relationship"
    );
    describe_counter!(
        "association_sync_failures_total",
        "Total number of per-id association changes that could not be applied"
    );
}

/// Record a paginated request.
pub fn record_pagination_request(mode: PaginationMode) {
    let mode = match mode {
        PaginationMode::Cursor => "cursor",
        PaginationMode::Offset => "offset",
    };
    counter!("pagination_requests_total", "mode" => mode).increment(1);
}

/// Record a rejected cursor.
pub fn record_invalid_cursor() {
    counter!("pagination_invalid_cursor_total").increment(1);
}

/// Record one association sync pass.
pub fn record_association_sync(kind: AssociationKind) {
    counter!("association_sync_total", "kind" => kind.as_str()).increment(1);
}

/// Record per-id sync failures.
///
/// # Arguments
/// * `kind` - The relationship being synced
/// * `op` - `"add"` or `"remove"`
/// * `count` - Number of ids that failed
pub fn record_association_failures(kind: AssociationKind, op: &'static str, count: u64) {
    if count == 0 {
        return;
    }
    counter!("association_sync_failures_total", "kind" => kind.as_str(), "op" => op)
        .increment(count);
}

/// A timer that records page fetch duration when dropped.
pub struct FetchTimer {
    start: Instant,
}

impl FetchTimer {
    /// Start a new fetch timer.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for FetchTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FetchTimer {
    fn drop(&mut self) {
        histogram!("page_fetch_duration_seconds").record(self.start.elapsed().as_secs_f64());
    }
}
