use crate::zha::connection::ConnectionState;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ZhaError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(#[source] tungstenite::Error),

    #[error("Handshake failed: {0}")]
    HandshakeFailed(String),

    #[error("Request IDs exhausted: all {max} IDs are in use")]
    ResourceExhausted { max: u32 },

    #[error("Unexpected response: expected `{expected}`, received `{received}`")]
    UnexpectedResponse { expected: String, received: String },

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Decode error in device record {index}{}: {reason}", field_suffix(.field))]
    Decode {
        index: usize,
        field: Option<&'static str>,
        reason: String,
    },

    #[error("Timed out after {0:?} waiting for a response")]
    Timeout(Duration),

    #[error("Connection closed by hub")]
    ConnectionClosed,

    #[error("Connection not ready (state: {0})")]
    NotReady(ConnectionState),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

fn field_suffix(field: &Option<&'static str>) -> String {
    match field {
        Some(name) => format!(" (field `{}`)", name),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, ZhaError>;
