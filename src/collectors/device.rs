//! Device Metrics Collector
//!
//! Collects radio and topology metrics for every ZHA device.
//!
//! # Metrics Produced
//! - `zha_lqi_info`, `zha_rssi_db` - Link quality and signal strength
//! - `zha_device_state_info` - Availability (labels: ieee, user_given_name, state)
//! - `zha_neighbor_count`, `zha_route_count` - Topology table sizes
//!
//! All series carry the labels `ieee` and `user_given_name`.

use super::{collect_with_handler, CollectionContext, CollectionResult};
use crate::zha::fetch_devices;

/// Collects device metrics from the hub
///
/// Opens a connection, fetches all devices, and replaces the per-device series
/// with the fresh values. On failure the previous series are left in place.
///
/// # Returns
///
/// * `Ok(CollectionStatus::Success)` - Devices fetched and metrics updated
/// * `Ok(CollectionStatus::Failed)` - Scrape failed (non-fatal, logged as warning)
pub async fn collect_device_metrics(ctx: &CollectionContext<'_>) -> CollectionResult {
    collect_with_handler("devices", fetch_devices(ctx.config), |devices| {
        ctx.metrics.reset_devices();
        for device in &devices {
            ctx.metrics.observe_device(device);
        }
    })
    .await
}
