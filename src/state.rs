//! # Application State Management
//!
//! State shared by every HTTP worker: the effective configuration, the
//! alignment service, and request/job metrics.
//!
//! ## Sharing pattern:
//! - **config** and **service** never change after startup, so a plain `Arc`
//!   is enough
//! - **metrics** are updated by every request, so they sit behind
//!   `Arc<RwLock<_>>`: many readers for `/metrics`, one writer at a time
//!
//! Alignment jobs themselves share nothing here; their only common resource
//! is the staging directories, kept apart by unique file names.

use crate::alignment::{AlignmentOutcome, AlignmentService};
use crate::config::AppConfig;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub service: Arc<AlignmentService>,
    pub metrics: Arc<RwLock<AppMetrics>>,
    pub start_time: Instant,
}

/// Counters collected across all HTTP requests.
#[derive(Debug, Default, Clone)]
pub struct AppMetrics {
    /// Total number of HTTP requests processed since server start
    pub request_count: u64,

    /// Responses with a 4xx or 5xx status
    pub error_count: u64,

    /// Alignment requests currently being processed
    pub jobs_in_flight: u32,

    pub jobs: JobCounters,

    /// Keyed by route pattern, e.g. "POST /process/{lang_code}"
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

/// How alignment requests ended.
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct JobCounters {
    pub aligned: u64,
    pub rejected: u64,
    pub failed: u64,
    /// Subset of `failed` where the engine hit its time limit.
    pub timed_out: u64,
}

#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    pub request_count: u64,
    pub total_duration_ms: u64,
    pub error_count: u64,
}

impl AppState {
    pub fn new(config: AppConfig, service: AlignmentService) -> Self {
        Self {
            config: Arc::new(config),
            service: Arc::new(service),
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            start_time: Instant::now(),
        }
    }

    /// Metrics are plain counters, so a panic mid-update leaves nothing worth
    /// refusing to read.
    fn metrics_mut(&self) -> RwLockWriteGuard<'_, AppMetrics> {
        self.metrics.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn increment_request_count(&self) {
        self.metrics_mut().request_count += 1;
    }

    pub fn increment_error_count(&self) {
        self.metrics_mut().error_count += 1;
    }

    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics_mut();
        let endpoint_metric = metrics.endpoint_metrics.entry(endpoint.to_string()).or_default();

        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;
        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    pub fn job_started(&self) {
        self.metrics_mut().jobs_in_flight += 1;
    }

    /// Called once per `job_started`, whatever happened in between.
    pub fn job_finished(&self, outcome: Option<&AlignmentOutcome>) {
        let mut metrics = self.metrics_mut();
        metrics.jobs_in_flight = metrics.jobs_in_flight.saturating_sub(1);
        match outcome {
            Some(AlignmentOutcome::Aligned { .. }) => metrics.jobs.aligned += 1,
            Some(AlignmentOutcome::Rejected(_)) => metrics.jobs.rejected += 1,
            Some(AlignmentOutcome::Failed(error)) => {
                metrics.jobs.failed += 1;
                if error.is_timeout() {
                    metrics.jobs.timed_out += 1;
                }
            }
            None => metrics.jobs.failed += 1,
        }
    }

    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        self.metrics.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl AppMetrics {
    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}

impl EndpointMetric {
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }

    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}
