//! Metrics collection using metrics-rs.
//!
//! framegrab exposes the following metrics:
//!
//! | Metric | Type | Description |
//! |--------|------|-------------|
//! | `framegrab_cycles_total` | Counter | Request cycles executed |
//! | `framegrab_frames_harvested` | Counter | Frames copied out and queued |
//! | `framegrab_readback_timeouts` | Counter | Harvest waits that timed out |
//! | `framegrab_bytes_copied` | Counter | Pixel bytes copied to host results |
//! | `framegrab_queue_depth` | Gauge | Frames awaiting pull |
//!
//! Metrics go through the `metrics` facade; install an exporter
//! (prometheus, statsd, ...) to collect them.

use metrics::{counter, gauge, Unit};
use std::sync::atomic::{AtomicBool, Ordering};

/// Whether metric descriptions have been registered.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

const CYCLES_TOTAL: &str = "framegrab_cycles_total";
const FRAMES_HARVESTED: &str = "framegrab_frames_harvested";
const READBACK_TIMEOUTS: &str = "framegrab_readback_timeouts";
const BYTES_COPIED: &str = "framegrab_bytes_copied";
const QUEUE_DEPTH: &str = "framegrab_queue_depth";

/// Register metric descriptions.
///
/// Call once at application startup. Safe to call multiple times;
/// subsequent calls are no-ops.
pub fn init_metrics() {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    metrics::describe_counter!(CYCLES_TOTAL, Unit::Count, "Request cycles executed");
    metrics::describe_counter!(
        FRAMES_HARVESTED,
        Unit::Count,
        "Frames copied out of the ring and queued"
    );
    metrics::describe_counter!(
        READBACK_TIMEOUTS,
        Unit::Count,
        "Harvest waits that exceeded the fence timeout"
    );
    metrics::describe_counter!(BYTES_COPIED, Unit::Bytes, "Pixel bytes copied to host results");
    metrics::describe_gauge!(QUEUE_DEPTH, Unit::Count, "Frames awaiting pull");
}

/// Record one executed request cycle.
#[inline]
pub fn record_cycle() {
    counter!(CYCLES_TOTAL).increment(1);
}

/// Record a harvested frame of `bytes` pixel bytes.
#[inline]
pub fn record_harvest(bytes: u64) {
    counter!(FRAMES_HARVESTED).increment(1);
    counter!(BYTES_COPIED).increment(bytes);
}

/// Record a harvest wait timeout.
#[inline]
pub fn record_timeout() {
    counter!(READBACK_TIMEOUTS).increment(1);
}

/// Record the current result-queue depth.
#[inline]
pub fn record_queue_depth(depth: usize) {
    gauge!(QUEUE_DEPTH).set(depth as f64);
}
