//! ZHA WebSocket API Client
//!
//! This module provides the device-level API on top of an authenticated
//! [`Connection`].
//!
//! # Example
//!
//! ```no_run
//! use zha_exporter::config::HassConfig;
//! use zha_exporter::zha::DeviceManager;
//! use secrecy::SecretString;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = HassConfig {
//!     hostname: "homeassistant.local".to_string(),
//!     port: 8123,
//!     token: SecretString::from("your-long-lived-token"),
//!     use_tls: false,
//!     verify_ssl: true,
//!     request_timeout_seconds: 30,
//! };
//!
//! let mut manager = DeviceManager::connect(&config).await?;
//! let devices = manager.get_devices().await;
//! manager.close().await;
//! for device in devices? {
//!     println!("{} lqi={}", device.ieee, device.lqi);
//! }
//! # Ok(())
//! # }
//! ```

use crate::config::HassConfig;
use crate::error::{Result, ZhaError};
use crate::zha::connection::{Connection, ConnectionState};
use crate::zha::types::{decode_device, is_truthy, DeviceInfo, HubError};
use serde_json::{Map, Value};
use tracing::{debug, info};

pub const ZHA_DEVICES: &str = "zha/devices";
pub const RESULT: &str = "result";

/// Client for the hub's ZHA device API.
///
/// Owns exactly one [`Connection`]; requests on it run one at a time.
pub struct DeviceManager {
    connection: Connection,
}

impl DeviceManager {
    /// Connect to `ws://{hostname}:{port}/api/websocket` and authenticate.
    pub async fn connect(config: &HassConfig) -> Result<Self> {
        let connection = Connection::open(config).await?;
        Ok(Self { connection })
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Send a request and return the raw reply if its type matches.
    pub async fn send_message(
        &mut self,
        request_type: &str,
        expected_response_type: &str,
        attach_id: bool,
        fields: Map<String, Value>,
    ) -> Result<Value> {
        self.connection
            .send_message(request_type, expected_response_type, attach_id, fields)
            .await
    }

    /// Fetch and decode every device known to the hub, in hub order.
    ///
    /// The first record that fails to decode aborts the whole call.
    pub async fn get_devices(&mut self) -> Result<Vec<DeviceInfo>> {
        let records = self.device_records().await?;
        let devices = records
            .iter()
            .enumerate()
            .map(|(index, record)| decode_device(index, record))
            .collect::<Result<Vec<_>>>()?;

        info!("Decoded {} devices", devices.len());
        Ok(devices)
    }

    /// Fetch the raw device records without decoding them.
    pub async fn dump_devices(&mut self) -> Result<Vec<Value>> {
        self.device_records().await
    }

    async fn device_records(&mut self) -> Result<Vec<Value>> {
        let mut response = self
            .send_message(ZHA_DEVICES, RESULT, true, Map::new())
            .await?;

        if response.get("success").and_then(Value::as_bool) == Some(false) {
            return Err(ZhaError::RequestFailed(hub_error_message(&response)));
        }

        let result = response.get_mut("result").map(Value::take).unwrap_or(Value::Null);
        if !is_truthy(&result) {
            return Err(ZhaError::RequestFailed(format!(
                "Unable to get devices: hub returned {}",
                result
            )));
        }

        match result {
            Value::Array(records) => {
                debug!("Received {} device records", records.len());
                Ok(records)
            }
            other => Err(ZhaError::RequestFailed(format!(
                "Unable to get devices: expected a list of devices, received {}",
                other
            ))),
        }
    }

    /// Close the underlying connection.
    pub async fn close(mut self) {
        self.connection.close().await;
    }
}

fn hub_error_message(response: &Value) -> String {
    let error = response
        .get("error")
        .cloned()
        .and_then(|e| serde_json::from_value::<HubError>(e).ok());

    match error {
        Some(HubError {
            code: Some(code),
            message: Some(message),
        }) => format!("Unable to get devices: {} ({})", message, code),
        Some(HubError {
            message: Some(message),
            ..
        }) => format!("Unable to get devices: {}", message),
        _ => "Unable to get devices: hub reported failure".to_string(),
    }
}

/// Connect, fetch decoded devices, and close, on every exit path.
pub async fn fetch_devices(config: &HassConfig) -> Result<Vec<DeviceInfo>> {
    let mut manager = DeviceManager::connect(config).await?;
    let devices = manager.get_devices().await;
    manager.close().await;
    devices
}

/// Connect, fetch raw device records, and close, on every exit path.
pub async fn fetch_raw_devices(config: &HassConfig) -> Result<Vec<Value>> {
    let mut manager = DeviceManager::connect(config).await?;
    let devices = manager.dump_devices().await;
    manager.close().await;
    devices
}
