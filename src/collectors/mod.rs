//! Metrics Collectors
//!
//! Collectors query the hub and update the corresponding Prometheus metrics.
//!
//! # Error Handling
//!
//! Hub failures are non-fatal at this boundary: they are logged as warnings and
//! reported as [`CollectionStatus::Failed`], so a long-running exporter skips
//! the scrape instead of exiting.

use crate::config::HassConfig;
use crate::metrics::MetricsCollector;
use tracing::{info, warn};

/// Shared context passed to all collectors
#[derive(Clone, Copy)]
pub struct CollectionContext<'a> {
    /// Hub connection settings; each scrape opens its own connection
    pub config: &'a HassConfig,
    /// Metrics collector for updating Prometheus metrics
    pub metrics: &'a MetricsCollector,
}

/// Status of a metrics collection operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionStatus {
    /// Metrics were successfully collected and updated
    Success,
    /// Collection failed but is non-fatal (already logged as warning)
    Failed,
}

/// Result type for collector functions
pub type CollectionResult = Result<CollectionStatus, anyhow::Error>;

/// Runs `query_future`; on success hands the data to `process`, on error
/// logs a warning and reports [`CollectionStatus::Failed`].
pub async fn collect_with_handler<T, F, P, E>(
    name: &str,
    query_future: F,
    process: P,
) -> CollectionResult
where
    F: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: FnOnce(T),
{
    match query_future.await {
        Ok(data) => {
            process(data);
            info!("Updated {} metrics", name);
            Ok(CollectionStatus::Success)
        }
        Err(e) => {
            warn!("Failed to query {}: {}", name, e);
            Ok(CollectionStatus::Failed)
        }
    }
}

pub mod device;

pub use device::collect_device_metrics;
