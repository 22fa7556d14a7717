//! # Metrics
//!
//! Prometheus metrics for monitoring code repository operations.
//!
//! ## Metrics Exposed
//!
//! - `code_repository_operations_total` - Remote operations by operation and outcome
//! - `code_repository_operation_duration_seconds` - Duration of remote operations
//! - `code_repository_sweep_deleted_total` - Records deleted by sweeps
//! - `code_repository_sweep_failures_total` - Per-item delete failures during sweeps
//! - `code_repository_sweeps_skipped_total` - Sweeps skipped for unsupported regions

use anyhow::Result;
use prometheus::core::Collector;
use prometheus::{Encoder, HistogramVec, IntCounter, IntCounterVec, Registry, TextEncoder};
use std::sync::{LazyLock, Mutex, PoisonError};

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static REGISTERED: Mutex<bool> = Mutex::new(false);

static OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "code_repository_operations_total",
            "Total number of code repository operations",
        ),
        &["operation", "outcome"],
    )
    .expect("Failed to create OPERATIONS_TOTAL metric - this should never happen")
});

static OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "code_repository_operation_duration_seconds",
            "Duration of code repository operations in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0]),
        &["operation"],
    )
    .expect("Failed to create OPERATION_DURATION metric - this should never happen")
});

static SWEEP_DELETED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "code_repository_sweep_deleted_total",
        "Total number of code repositories deleted by sweeps",
    )
    .expect("Failed to create SWEEP_DELETED_TOTAL metric - this should never happen")
});

static SWEEP_FAILURES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "code_repository_sweep_failures_total",
        "Total number of per-item delete failures during sweeps",
    )
    .expect("Failed to create SWEEP_FAILURES_TOTAL metric - this should never happen")
});

static SWEEPS_SKIPPED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "code_repository_sweeps_skipped_total",
        "Total number of sweeps skipped because the region does not support the API",
    )
    .expect("Failed to create SWEEPS_SKIPPED_TOTAL metric - this should never happen")
});

/// Register all metrics with the registry
///
/// Safe to call more than once. The registered flag is only set once every
/// metric is in the registry, so a failed call can be retried.
pub fn register_metrics() -> Result<()> {
    let mut registered = REGISTERED.lock().unwrap_or_else(PoisonError::into_inner);
    if *registered {
        return Ok(());
    }
    register_all(&REGISTRY)?;
    *registered = true;
    Ok(())
}

fn register_all(registry: &Registry) -> Result<()> {
    let collectors: [Box<dyn Collector>; 5] = [
        Box::new(OPERATIONS_TOTAL.clone()),
        Box::new(OPERATION_DURATION.clone()),
        Box::new(SWEEP_DELETED_TOTAL.clone()),
        Box::new(SWEEP_FAILURES_TOTAL.clone()),
        Box::new(SWEEPS_SKIPPED_TOTAL.clone()),
    ];
    for collector in collectors {
        match registry.register(collector) {
            // Left over from an earlier partial registration.
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Record one remote operation
pub fn record_operation(operation: &str, outcome: &str, duration: f64) {
    OPERATIONS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
    OPERATION_DURATION
        .with_label_values(&[operation])
        .observe(duration);
}

pub fn operation_count(operation: &str, outcome: &str) -> u64 {
    OPERATIONS_TOTAL
        .with_label_values(&[operation, outcome])
        .get()
}

pub fn increment_sweep_deleted() {
    SWEEP_DELETED_TOTAL.inc();
}

pub fn increment_sweep_failures() {
    SWEEP_FAILURES_TOTAL.inc();
}

pub fn increment_sweeps_skipped() {
    SWEEPS_SKIPPED_TOTAL.inc();
}

pub fn sweep_deleted_count() -> u64 {
    SWEEP_DELETED_TOTAL.get()
}

pub fn sweep_failure_count() -> u64 {
    SWEEP_FAILURES_TOTAL.get()
}

/// Render the registry in the Prometheus text exposition format
pub fn gather_text() -> Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
