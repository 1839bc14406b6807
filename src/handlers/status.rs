//! Status and health check handlers
//!
//! - `/status` - Server status with extraction counters and latency
//! - `/health` - Liveness probe
//! - `/ready` - Readiness probe
//!
//! # Example Response
//!
//! ```json
//! {
//!   "version": "0.1.0",
//!   "name": "pagelens-web",
//!   "uptime_seconds": 3600,
//!   "extractions": {
//!     "succeeded": 120,
//!     "timed_out": 4,
//!     "failed": 2,
//!     "rejected": 9
//!   },
//!   "searches_served": 57,
//!   "memory": { "rss_bytes": 52428800, "virtual_bytes": 268435456 },
//!   "latency": { "p50_ms": 1830.5, "p95_ms": 6012.2, "p99_ms": 19950.0, ... },
//!   "status": "running",
//!   "timestamp": "2026-01-01T12:00:00+00:00"
//! }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use hdrhistogram::Histogram;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::{debug, instrument};

use crate::error::ExtractionError;

/// Server version from Cargo.toml
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Server name from Cargo.toml
pub const SERVER_NAME: &str = env!("CARGO_PKG_NAME");

// ============================================================================
// Response Types
// ============================================================================

/// Health check response for liveness probes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Health status (always "healthy" if responding)
    pub status: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}

/// Server status with runtime metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Server version (from Cargo.toml)
    pub version: String,

    /// Server name
    pub name: String,

    /// Server uptime in seconds
    pub uptime_seconds: u64,

    /// Extraction outcomes since start
    pub extractions: ExtractionCounts,

    /// Search requests answered
    pub searches_served: u64,

    /// Memory usage metrics
    pub memory: MemoryMetrics,

    /// Extraction latency percentiles
    pub latency: LatencyMetrics,

    /// Server status (always "running" if responding)
    pub status: String,

    /// RFC 3339 timestamp of when status was generated
    pub timestamp: String,
}

/// Extraction outcomes, one counter per caller-facing result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionCounts {
    /// 200 responses
    pub succeeded: u64,
    /// 504 responses
    pub timed_out: u64,
    /// 500 responses
    pub failed: u64,
    /// 400 responses, never reached the browser
    pub rejected: u64,
}

impl ExtractionCounts {
    /// All extraction requests seen
    pub fn total(&self) -> u64 {
        self.succeeded + self.timed_out + self.failed + self.rejected
    }
}

/// Memory usage metrics collected from sysinfo.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryMetrics {
    /// Resident Set Size (bytes)
    pub rss_bytes: u64,

    /// Virtual memory size (bytes)
    pub virtual_bytes: u64,
}

/// Latency percentile metrics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LatencyMetrics {
    /// 50th percentile (median) latency in milliseconds
    pub p50_ms: f64,

    /// 95th percentile latency in milliseconds
    pub p95_ms: f64,

    /// 99th percentile latency in milliseconds
    pub p99_ms: f64,

    /// Number of recorded samples
    pub total_requests: u64,

    /// Mean latency in milliseconds
    pub mean_ms: f64,

    /// Maximum latency recorded in milliseconds
    pub max_ms: f64,
}

// ============================================================================
// Latency Histogram
// ============================================================================

/// Thread-safe latency histogram.
///
/// Tracks latencies from 1 microsecond to 120 seconds with 3 significant
/// figures, enough headroom for two navigation budgets back to back.
#[derive(Debug)]
pub struct LatencyHistogram {
    inner: RwLock<Histogram<u64>>,
}

impl LatencyHistogram {
    /// Create an empty histogram.
    pub fn new() -> Self {
        let histogram =
            Histogram::new_with_bounds(1, 120_000_000, 3).expect("Failed to create histogram");
        Self {
            inner: RwLock::new(histogram),
        }
    }

    /// Record a latency value in microseconds.
    ///
    /// Values outside the histogram bounds are silently ignored.
    pub fn record(&self, latency_us: u64) {
        let mut hist = self.inner.write();
        let _ = hist.record(latency_us);
    }

    /// Record a latency duration.
    pub fn record_duration(&self, duration: Duration) {
        self.record(duration.as_micros() as u64);
    }

    /// Number of recorded values.
    pub fn count(&self) -> u64 {
        self.inner.read().len()
    }

    /// Percentiles converted to milliseconds.
    pub fn metrics(&self) -> LatencyMetrics {
        let hist = self.inner.read();
        LatencyMetrics {
            p50_ms: hist.value_at_percentile(50.0) as f64 / 1000.0,
            p95_ms: hist.value_at_percentile(95.0) as f64 / 1000.0,
            p99_ms: hist.value_at_percentile(99.0) as f64 / 1000.0,
            total_requests: hist.len(),
            mean_ms: hist.mean() / 1000.0,
            max_ms: hist.max() as f64 / 1000.0,
        }
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Service Statistics
// ============================================================================

/// Counters shared by all request handlers.
///
/// Every field is either atomic or behind a lock, so one instance can be
/// shared across handlers via `Arc`.
///
/// ```rust
/// use std::time::Duration;
/// use pagelens_web::handlers::ServiceStats;
/// use pagelens_web::ExtractionError;
///
/// let stats = ServiceStats::new();
/// stats.record_extraction(Ok(()), Duration::from_millis(1800));
/// stats.record_extraction(Err(ExtractionError::Timeout), Duration::from_secs(20));
/// assert_eq!(stats.extraction_counts().total(), 2);
/// ```
#[derive(Debug)]
pub struct ServiceStats {
    start_time: Instant,
    succeeded: AtomicU64,
    timed_out: AtomicU64,
    failed: AtomicU64,
    rejected: AtomicU64,
    searches_served: AtomicU64,
    latency_histogram: LatencyHistogram,
}

impl ServiceStats {
    /// Fresh counters, start time now.
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            succeeded: AtomicU64::new(0),
            timed_out: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            searches_served: AtomicU64::new(0),
            latency_histogram: LatencyHistogram::new(),
        }
    }

    /// Server uptime in seconds.
    #[inline]
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Count one extraction outcome.
    ///
    /// Rejected input never touched a browser and is kept out of the latency
    /// histogram.
    pub fn record_extraction(
        &self,
        outcome: std::result::Result<(), ExtractionError>,
        elapsed: Duration,
    ) {
        let counter = match outcome {
            Ok(()) => &self.succeeded,
            Err(ExtractionError::Timeout) => &self.timed_out,
            Err(ExtractionError::NavigationFailure) => &self.failed,
            Err(ExtractionError::InvalidInput) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.latency_histogram.record_duration(elapsed);
    }

    /// Count one answered search.
    #[inline]
    pub fn record_search(&self) -> u64 {
        self.searches_served.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Snapshot of the extraction counters.
    pub fn extraction_counts(&self) -> ExtractionCounts {
        ExtractionCounts {
            succeeded: self.succeeded.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }

    /// Searches answered so far.
    #[inline]
    pub fn searches_served(&self) -> u64 {
        self.searches_served.load(Ordering::Relaxed)
    }

    /// Extraction latency percentiles.
    #[inline]
    pub fn latency_metrics(&self) -> LatencyMetrics {
        self.latency_histogram.metrics()
    }
}

impl Default for ServiceStats {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// System Metrics Collection
// ============================================================================

/// Memory usage of the current process, zeroes if it cannot be read.
fn collect_memory_metrics() -> MemoryMetrics {
    let pid = Pid::from_u32(std::process::id());
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

    match system.process(pid) {
        Some(process) => MemoryMetrics {
            rss_bytes: process.memory(),
            virtual_bytes: process.virtual_memory(),
        },
        None => {
            debug!("Could not find current process in sysinfo");
            MemoryMetrics::default()
        }
    }
}

// ============================================================================
// HTTP Handlers
// ============================================================================

/// `GET /health`: always `200 {"status":"healthy"}` while the process serves.
#[instrument(skip_all)]
pub async fn health_handler() -> impl IntoResponse {
    debug!("Health check requested");
    (StatusCode::OK, Json(HealthResponse::default()))
}

/// `GET /status`: counters, memory and latency.
///
/// ```bash
/// curl http://localhost:3001/status
/// ```
#[instrument(skip_all)]
pub async fn status_handler(State(stats): State<Arc<ServiceStats>>) -> impl IntoResponse {
    debug!("Status check requested");

    let response = StatusResponse {
        version: SERVER_VERSION.to_string(),
        name: SERVER_NAME.to_string(),
        uptime_seconds: stats.uptime_seconds(),
        extractions: stats.extraction_counts(),
        searches_served: stats.searches_served(),
        memory: collect_memory_metrics(),
        latency: stats.latency_metrics(),
        status: "running".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(response))
}

/// `GET /ready`
///
/// Browsers are launched per request, so there is nothing to warm up and
/// readiness mirrors liveness.
#[instrument(skip_all)]
pub async fn readiness_handler() -> impl IntoResponse {
    debug!("Readiness check requested");
    (StatusCode::OK, Json(HealthResponse::default()))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_health_response_default() {
        assert_eq!(HealthResponse::default().status, "healthy");
    }

    #[test]
    fn test_stats_new() {
        let stats = ServiceStats::new();
        assert_eq!(stats.extraction_counts(), ExtractionCounts::default());
        assert_eq!(stats.searches_served(), 0);
        assert!(stats.uptime_seconds() < 1);
    }

    #[test]
    fn test_record_extraction_outcomes() {
        let stats = ServiceStats::new();
        let ms = Duration::from_millis;

        stats.record_extraction(Ok(()), ms(1200));
        stats.record_extraction(Ok(()), ms(900));
        stats.record_extraction(Err(ExtractionError::Timeout), ms(20_000));
        stats.record_extraction(Err(ExtractionError::NavigationFailure), ms(300));
        stats.record_extraction(Err(ExtractionError::InvalidInput), ms(0));

        assert_eq!(
            stats.extraction_counts(),
            ExtractionCounts {
                succeeded: 2,
                timed_out: 1,
                failed: 1,
                rejected: 1,
            }
        );
        assert_eq!(stats.extraction_counts().total(), 5);
        // Rejections are not timed.
        assert_eq!(stats.latency_metrics().total_requests, 4);
    }

    #[test]
    fn test_search_counter() {
        let stats = ServiceStats::new();
        assert_eq!(stats.record_search(), 1);
        assert_eq!(stats.record_search(), 2);
        assert_eq!(stats.searches_served(), 2);
    }

    #[test]
    fn test_latency_histogram() {
        let histogram = LatencyHistogram::new();

        histogram.record(1000); // 1ms
        histogram.record(2000); // 2ms
        histogram.record(5000); // 5ms
        histogram.record(10000); // 10ms
        histogram.record(50000); // 50ms

        assert_eq!(histogram.count(), 5);

        let metrics = histogram.metrics();
        assert!(metrics.mean_ms > 0.0);
        assert!(metrics.p50_ms > 0.0);
        assert!(metrics.p95_ms >= metrics.p50_ms);
        assert!(metrics.p99_ms >= metrics.p95_ms);
        // HdrHistogram buckets values, so max may be slightly above 50ms
        assert!((50.0..=51.0).contains(&metrics.max_ms), "max {}", metrics.max_ms);
    }

    #[test]
    fn test_latency_histogram_accepts_long_extractions() {
        let histogram = LatencyHistogram::new();
        histogram.record_duration(Duration::from_secs(45));
        assert_eq!(histogram.count(), 1);
    }

    #[test]
    fn test_collect_memory_metrics() {
        let metrics = collect_memory_metrics();
        assert!(metrics.rss_bytes > 0);
    }

    #[test]
    fn test_status_response_serialization() {
        let response = StatusResponse {
            version: "0.1.0".to_string(),
            name: "test-server".to_string(),
            uptime_seconds: 3600,
            extractions: ExtractionCounts {
                succeeded: 3,
                ..Default::default()
            },
            searches_served: 7,
            memory: MemoryMetrics::default(),
            latency: LatencyMetrics::default(),
            status: "running".to_string(),
            timestamp: "2026-01-01T00:00:00Z".to_string(),
        };

        let json = serde_json::to_string(&response).expect("Failed to serialize");
        assert!(json.contains("\"uptime_seconds\":3600"));
        assert!(json.contains("\"succeeded\":3"));
        assert!(json.contains("\"searches_served\":7"));
        assert!(json.contains("\"status\":\"running\""));
    }

    #[test]
    fn test_server_constants() {
        assert!(!SERVER_VERSION.is_empty());
        assert_eq!(SERVER_NAME, "pagelens-web");
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_status_handler() {
        let stats = Arc::new(ServiceStats::new());
        stats.record_extraction(Ok(()), Duration::from_millis(5));
        stats.record_search();

        let response = status_handler(State(stats)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_readiness_handler() {
        let response = readiness_handler().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_stats_thread_safety() {
        use std::thread;

        let stats = Arc::new(ServiceStats::new());
        let handles: Vec<_> = (0..10)
            .map(|_| {
                let stats = Arc::clone(&stats);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        stats.record_extraction(Ok(()), Duration::from_millis(1));
                        stats.record_search();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("Thread panicked");
        }

        assert_eq!(stats.extraction_counts().succeeded, 10_000);
        assert_eq!(stats.searches_served(), 10_000);
        assert_eq!(stats.latency_metrics().total_requests, 10_000);
    }
}
