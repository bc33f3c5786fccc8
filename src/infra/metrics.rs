//! Lock-free metrics collection and periodic reporting
//!
//! Counters are plain atomics so the monitor loop and the provider tasks can
//! record without contention. `report()` swaps the per-interval counters and
//! returns a snapshot for logging.
//!
//! NOTE: All atomics use Relaxed ordering; these are statistics only and must
//! never drive monitoring decisions.

use crate::services::location_processor::SuppressReason;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Exponential bucket boundaries for event handling latency (microseconds)
/// Buckets: ≤50, ≤100, ≤200, ≤400, ≤800, ≤1600, ≤3200, >3200
const BUCKET_BOUNDS: [u64; 7] = [50, 100, 200, 400, 800, 1600, 3200];
pub const METRICS_NUM_BUCKETS: usize = 8;

#[inline]
fn bucket_index(latency_us: u64) -> usize {
    BUCKET_BOUNDS.partition_point(|&bound| bound < latency_us)
}

#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

fn swap_buckets(buckets: &[AtomicU64; METRICS_NUM_BUCKETS]) -> [u64; METRICS_NUM_BUCKETS] {
    let mut result = [0u64; METRICS_NUM_BUCKETS];
    for (i, bucket) in buckets.iter().enumerate() {
        result[i] = bucket.swap(0, Ordering::Relaxed);
    }
    result
}

/// Upper bound of the bucket holding the given percentile
fn percentile_from_buckets(buckets: &[u64; METRICS_NUM_BUCKETS], percentile: f64) -> u64 {
    let total: u64 = buckets.iter().sum();
    if total == 0 {
        return 0;
    }

    const BUCKET_UPPER_BOUNDS: [u64; METRICS_NUM_BUCKETS] = [50, 100, 200, 400, 800, 1600, 3200, 6400];

    let target = ((total as f64 * percentile).ceil() as u64).max(1);
    let mut cumulative = 0u64;
    for (i, &count) in buckets.iter().enumerate() {
        cumulative += count;
        if cumulative >= target {
            return BUCKET_UPPER_BOUNDS[i];
        }
    }
    BUCKET_UPPER_BOUNDS[METRICS_NUM_BUCKETS - 1]
}

pub struct Metrics {
    /// Fixes delivered to the monitor (monotonic)
    fixes_total: AtomicU64,
    fixes_first: AtomicU64,
    fixes_stationary: AtomicU64,
    fixes_reversal: AtomicU64,
    /// Status reports published (monotonic)
    reports_total: AtomicU64,
    /// Geofence transitions applied (monotonic)
    transitions_total: AtomicU64,
    /// Alerts handed to the notifier (monotonic)
    alerts_total: AtomicU64,
    alerts_dropped: AtomicU64,
    geofence_arms: AtomicU64,
    geofence_disarms: AtomicU64,
    geofence_cmds_dropped: AtomicU64,
    /// Inbound events dropped by sources because the monitor queue was full
    events_dropped: AtomicU64,
    /// Events handled since last report (reset on report)
    events_since_report: AtomicU64,
    latency_sum_us: AtomicU64,
    latency_max_us: AtomicU64,
    latency_buckets: [AtomicU64; METRICS_NUM_BUCKETS],
    last_report_time: parking_lot::Mutex<Instant>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            fixes_total: AtomicU64::new(0),
            fixes_first: AtomicU64::new(0),
            fixes_stationary: AtomicU64::new(0),
            fixes_reversal: AtomicU64::new(0),
            reports_total: AtomicU64::new(0),
            transitions_total: AtomicU64::new(0),
            alerts_total: AtomicU64::new(0),
            alerts_dropped: AtomicU64::new(0),
            geofence_arms: AtomicU64::new(0),
            geofence_disarms: AtomicU64::new(0),
            geofence_cmds_dropped: AtomicU64::new(0),
            events_dropped: AtomicU64::new(0),
            events_since_report: AtomicU64::new(0),
            latency_sum_us: AtomicU64::new(0),
            latency_max_us: AtomicU64::new(0),
            latency_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            last_report_time: parking_lot::Mutex::new(Instant::now()),
        }
    }

    #[inline]
    pub fn record_fix(&self) {
        self.fixes_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_suppressed(&self, reason: SuppressReason) {
        let counter = match reason {
            SuppressReason::FirstFix => &self.fixes_first,
            SuppressReason::Stationary => &self.fixes_stationary,
            SuppressReason::Reversal => &self.fixes_reversal,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_report(&self) {
        self.reports_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_transition(&self) {
        self.transitions_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_alert(&self) {
        self.alerts_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_alert_dropped(&self) {
        self.alerts_dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_geofence_arm(&self) {
        self.geofence_arms.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_geofence_disarm(&self) {
        self.geofence_disarms.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_geofence_cmd_dropped(&self) {
        self.geofence_cmds_dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_event_dropped(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one handled inbound event and how long it took
    #[inline]
    pub fn record_event_processed(&self, latency_us: u64) {
        self.events_since_report.fetch_add(1, Ordering::Relaxed);
        self.latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        self.latency_buckets[bucket_index(latency_us)].fetch_add(1, Ordering::Relaxed);
        update_atomic_max(&self.latency_max_us, latency_us);
    }

    pub fn fixes_total(&self) -> u64 {
        self.fixes_total.load(Ordering::Relaxed)
    }

    pub fn reports_total(&self) -> u64 {
        self.reports_total.load(Ordering::Relaxed)
    }

    pub fn alerts_total(&self) -> u64 {
        self.alerts_total.load(Ordering::Relaxed)
    }

    pub fn geofence_arms(&self) -> u64 {
        self.geofence_arms.load(Ordering::Relaxed)
    }

    pub fn geofence_disarms(&self) -> u64 {
        self.geofence_disarms.load(Ordering::Relaxed)
    }

    pub fn transitions_total(&self) -> u64 {
        self.transitions_total.load(Ordering::Relaxed)
    }

    /// Snapshot monotonic counters and reset the interval ones
    pub fn report(&self) -> MetricsSummary {
        let events_count = self.events_since_report.swap(0, Ordering::Relaxed);
        let latency_sum = self.latency_sum_us.swap(0, Ordering::Relaxed);
        let max_latency = self.latency_max_us.swap(0, Ordering::Relaxed);
        let lat_buckets = swap_buckets(&self.latency_buckets);

        let elapsed = {
            let mut last = self.last_report_time.lock();
            let elapsed = last.elapsed();
            *last = Instant::now();
            elapsed
        };

        let events_per_sec = if elapsed.as_secs_f64() > 0.0 {
            events_count as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        MetricsSummary {
            fixes_total: self.fixes_total.load(Ordering::Relaxed),
            fixes_first: self.fixes_first.load(Ordering::Relaxed),
            fixes_stationary: self.fixes_stationary.load(Ordering::Relaxed),
            fixes_reversal: self.fixes_reversal.load(Ordering::Relaxed),
            reports_total: self.reports_total.load(Ordering::Relaxed),
            transitions_total: self.transitions_total.load(Ordering::Relaxed),
            alerts_total: self.alerts_total.load(Ordering::Relaxed),
            alerts_dropped: self.alerts_dropped.load(Ordering::Relaxed),
            geofence_arms: self.geofence_arms.load(Ordering::Relaxed),
            geofence_disarms: self.geofence_disarms.load(Ordering::Relaxed),
            geofence_cmds_dropped: self.geofence_cmds_dropped.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            events_per_sec,
            avg_latency_us: if events_count > 0 { latency_sum / events_count } else { 0 },
            max_latency_us: max_latency,
            lat_p99_us: percentile_from_buckets(&lat_buckets, 0.99),
            lat_buckets,
        }
    }
}

/// Point-in-time metrics snapshot
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub fixes_total: u64,
    pub fixes_first: u64,
    pub fixes_stationary: u64,
    pub fixes_reversal: u64,
    pub reports_total: u64,
    pub transitions_total: u64,
    pub alerts_total: u64,
    pub alerts_dropped: u64,
    pub geofence_arms: u64,
    pub geofence_disarms: u64,
    pub geofence_cmds_dropped: u64,
    pub events_dropped: u64,
    pub events_per_sec: f64,
    pub avg_latency_us: u64,
    pub max_latency_us: u64,
    pub lat_p99_us: u64,
    /// Bounds: ≤50, ≤100, ≤200, ≤400, ≤800, ≤1600, ≤3200, >3200 µs
    pub lat_buckets: [u64; METRICS_NUM_BUCKETS],
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            fixes = %self.fixes_total,
            suppressed_first = %self.fixes_first,
            suppressed_stationary = %self.fixes_stationary,
            suppressed_reversal = %self.fixes_reversal,
            reports = %self.reports_total,
            transitions = %self.transitions_total,
            alerts = %self.alerts_total,
            alerts_dropped = %self.alerts_dropped,
            arms = %self.geofence_arms,
            disarms = %self.geofence_disarms,
            geofence_cmds_dropped = %self.geofence_cmds_dropped,
            events_dropped = %self.events_dropped,
            events_per_sec = format!("{:.1}", self.events_per_sec),
            avg_latency_us = %self.avg_latency_us,
            max_latency_us = %self.max_latency_us,
            p99_us = %self.lat_p99_us,
            "metrics"
        );
    }
}
