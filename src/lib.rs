//! ZHA Device Exporter
//!
//! Polls a Home Assistant hub's WebSocket API for Zigbee (ZHA) device
//! telemetry and republishes it as Prometheus metrics or as device dumps.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐      WebSocket       ┌──────────────────────┐
//! │    Home     │ ◄─────────────────►  │     zha-exporter     │
//! │  Assistant  │  JSON text frames    │  ┌───────────────┐   │      text      ┌────────────┐
//! └─────────────┘                      │  │ DeviceManager │   │ ─────────────► │ textfile / │
//!                                      │  └───────────────┘   │   exposition   │   stdout   │
//!                                      │  ┌───────────────┐   │                └────────────┘
//!                                      │  │    Metrics    │   │
//!                                      │  └───────────────┘   │
//!                                      └──────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`zha`] - WebSocket client, handshake, request IDs and device types
//! - [`metrics`] - Prometheus metric definitions
//! - [`collectors`] - Per-scrape device collection
//! - [`exporter`] - Scrape loop and metric output
//! - [`format`] - Router-config-style device rendering
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//!
//! # Quick Start
//!
//! ```no_run
//! use zha_exporter::{config::Config, zha};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/Default.toml")?;
//!     for device in zha::fetch_devices(&config.homeassistant).await? {
//!         println!("{}", device.as_cisco());
//!     }
//!     Ok(())
//! }
//! ```

pub mod collectors;
pub mod config;
pub mod error;
pub mod exporter;
pub mod format;
pub mod metrics;
pub mod zha;
