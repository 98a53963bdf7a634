//! Scripted mock hub for integration tests.
//!
//! Accepts a single WebSocket connection on a loopback port and plays a
//! script of sends and receives against it.

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use zha_exporter::config::HassConfig;

pub const TOKEN: &str = "test-token";

pub enum Step {
    /// Send a JSON text frame
    Send(Value),
    /// Wait for one text frame from the client and record it
    Recv,
    /// Send a raw text frame
    SendRaw(&'static str),
    /// Sleep before the next step
    Pause(Duration),
    /// Send a close frame and end the session
    Close,
}

pub struct MockHub {
    pub port: u16,
    handle: JoinHandle<Vec<Value>>,
}

impl MockHub {
    pub async fn start(script: Vec<Step>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock hub");
        let port = listener.local_addr().unwrap().port();

        let handle = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.expect("No client connected");
            let mut ws = accept_async(socket).await.expect("WebSocket upgrade failed");
            let mut received: Vec<Value> = Vec::new();

            for step in script {
                match step {
                    Step::Send(value) => {
                        if ws.send(Message::Text(value.to_string().into())).await.is_err() {
                            return received;
                        }
                    }
                    Step::SendRaw(text) => {
                        if ws.send(Message::Text(text.into())).await.is_err() {
                            return received;
                        }
                    }
                    Step::Recv => loop {
                        match ws.next().await {
                            Some(Ok(Message::Text(text))) => {
                                received.push(serde_json::from_str(text.as_str()).unwrap());
                                break;
                            }
                            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return received,
                            Some(Ok(_)) => continue,
                        }
                    },
                    Step::Pause(duration) => tokio::time::sleep(duration).await,
                    Step::Close => {
                        let _ = ws.close(None).await;
                        return received;
                    }
                }
            }

            // Let the client finish its closing handshake
            while let Some(Ok(message)) = ws.next().await {
                if message.is_close() {
                    break;
                }
            }
            received
        });

        Self { port, handle }
    }

    /// Frames the client sent, once the session has ended.
    pub async fn received(self) -> Vec<Value> {
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("Mock hub did not finish")
            .expect("Mock hub panicked")
    }
}

pub fn hass_config(port: u16) -> HassConfig {
    HassConfig {
        hostname: "127.0.0.1".to_string(),
        port,
        token: SecretString::from(TOKEN),
        use_tls: false,
        verify_ssl: true,
        request_timeout_seconds: 1,
    }
}

/// The handshake a well-behaved hub performs.
pub fn handshake() -> Vec<Step> {
    vec![
        Step::Send(json!({"type": "auth_required", "ha_version": "2025.1.0"})),
        Step::Recv,
        Step::Send(json!({"type": "auth_ok", "ha_version": "2025.1.0"})),
    ]
}

/// Handshake, then answer one request with `reply`.
pub fn handshake_then_reply(reply: Value) -> Vec<Step> {
    let mut script = handshake();
    script.push(Step::Recv);
    script.push(Step::Send(reply));
    script
}

/// A device record as the hub sends it.
pub fn raw_device(ieee: &str, nwk: Value) -> Value {
    json!({
        "ieee": ieee,
        "nwk": nwk,
        "manufacturer": "IKEA of Sweden",
        "model": "TRADFRI bulb E27 WS opal 980lm",
        "name": "IKEA of Sweden TRADFRI bulb E27 WS opal 980lm",
        "quirk_applied": false,
        "quirk_class": "zigpy.device.Device",
        "quirk_id": null,
        "manufacturer_code": 4476,
        "power_source": "Mains",
        "lqi": 255,
        "rssi": -52,
        "last_seen": "2025-01-12T10:15:30",
        "available": true,
        "device_type": "Router",
        "area_id": "living_room",
        "active_coordinator": false,
        "device_reg_id": "2a0c8e1f0f3c4f9e",
        "user_given_name": "Living room lamp",
        "neighbors": [
            {
                "device_type": "Coordinator",
                "rx_on_when_idle": "On",
                "relationship": "Parent",
                "extended_pan_id": "dd:dd:dd:dd:dd:dd:dd:dd",
                "ieee": "00:0d:6f:00:0a:90:69:e7",
                "nwk": "0x0000",
                "permit_joining": "NotAccepting",
                "depth": "0",
                "lqi": "255"
            }
        ],
        "routes": [
            {
                "dest_nwk": "0x0000",
                "route_status": "Active",
                "memory_constrained": false,
                "many_to_one": true,
                "route_record_required": false,
                "next_hop": "0x0000"
            }
        ],
        "endpoint_names": [{"name": "EXTENDED_COLOR_LIGHT"}],
        "signature": {"node_descriptor": {"logical_type": 1}, "endpoints": {}},
        "entities": [{"entity_id": "light.living_room_lamp", "name": "Living room lamp"}],
        "pairing_status": "CONFIGURED"
    })
}

pub fn devices_result(id: u32, devices: Vec<Value>) -> Value {
    json!({"id": id, "type": "result", "success": true, "result": devices})
}
