//! Prometheus Metrics Definitions
//!
//! This module defines the Prometheus metrics exported for ZHA devices.
//!
//! # Metrics
//!
//! All per-device metrics carry the labels `ieee` and `user_given_name`.
//!
//! - `zha_lqi_info` - Link quality indication
//! - `zha_rssi_db` - Received signal strength
//! - `zha_device_state_info` - Availability; extra label `state` is one of
//!   `available` / `unavailable`, the current state is 1 and the other 0
//! - `zha_neighbor_count` - Number of entries in the device's neighbor table
//! - `zha_route_count` - Number of entries in the device's routing table
//! - `zha_up` - 1 if the last scrape of the hub succeeded, 0 otherwise

use crate::zha::DeviceInfo;
use prometheus::{Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

const NAMESPACE: &str = "zha";
const DEVICE_LABELS: &[&str] = &["ieee", "user_given_name"];
const DEVICE_STATES: [&str; 2] = ["available", "unavailable"];

/// Metrics collector for ZHA devices
#[derive(Clone)]
pub struct MetricsCollector {
    registry: Arc<Registry>,

    pub lqi: Arc<GaugeVec>,
    pub rssi: Arc<GaugeVec>,
    pub device_state: Arc<GaugeVec>,
    pub neighbor_count: Arc<GaugeVec>,
    pub route_count: Arc<GaugeVec>,
    pub up: Arc<Gauge>,
}

impl MetricsCollector {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let lqi = GaugeVec::new(
            Opts::new("lqi_info", "Link Quality Indication").namespace(NAMESPACE),
            DEVICE_LABELS,
        )?;

        let rssi = GaugeVec::new(
            Opts::new("rssi_db", "Received Signal Strength").namespace(NAMESPACE),
            DEVICE_LABELS,
        )?;

        let device_state = GaugeVec::new(
            Opts::new("device_state_info", "Device State").namespace(NAMESPACE),
            &["ieee", "user_given_name", "state"],
        )?;

        let neighbor_count = GaugeVec::new(
            Opts::new("neighbor_count", "Number of current neighbors").namespace(NAMESPACE),
            DEVICE_LABELS,
        )?;

        let route_count = GaugeVec::new(
            Opts::new("route_count", "Number of current routes").namespace(NAMESPACE),
            DEVICE_LABELS,
        )?;

        let up = Gauge::with_opts(
            Opts::new("up", "Whether the last scrape of the hub succeeded").namespace(NAMESPACE),
        )?;

        registry.register(Box::new(lqi.clone()))?;
        registry.register(Box::new(rssi.clone()))?;
        registry.register(Box::new(device_state.clone()))?;
        registry.register(Box::new(neighbor_count.clone()))?;
        registry.register(Box::new(route_count.clone()))?;
        registry.register(Box::new(up.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            lqi: Arc::new(lqi),
            rssi: Arc::new(rssi),
            device_state: Arc::new(device_state),
            neighbor_count: Arc::new(neighbor_count),
            route_count: Arc::new(route_count),
            up: Arc::new(up),
        })
    }

    /// Set every per-device series for `device`.
    pub fn observe_device(&self, device: &DeviceInfo) {
        let labels = [device.ieee.as_str(), device.display_name()];

        self.lqi.with_label_values(&labels).set(device.lqi as f64);
        self.rssi.with_label_values(&labels).set(device.rssi as f64);
        self.neighbor_count
            .with_label_values(&labels)
            .set(device.neighbors.len() as f64);
        self.route_count
            .with_label_values(&labels)
            .set(device.routes.len() as f64);

        let current = if device.available {
            DEVICE_STATES[0]
        } else {
            DEVICE_STATES[1]
        };
        for state in DEVICE_STATES {
            let value = if state == current { 1.0 } else { 0.0 };
            self.device_state
                .with_label_values(&[labels[0], labels[1], state])
                .set(value);
        }
    }

    /// Render metrics in Prometheus text format
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Drop all per-device series so departed devices disappear.
    pub fn reset_devices(&self) {
        self.lqi.reset();
        self.rssi.reset();
        self.device_state.reset();
        self.neighbor_count.reset();
        self.route_count.reset();
    }
}
