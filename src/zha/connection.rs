//! WebSocket Connection and Handshake
//!
//! A [`Connection`] is one authenticated WebSocket session to the hub. Opening
//! it runs the handshake:
//!
//! ```text
//! Disconnected ──open──► AwaitingAuthRequest ──auth_required / send auth──► AwaitingAuthResult
//!                                                                              │
//!                                     Failed ◄──auth_invalid / other───────────┤
//!                                                                              ▼
//!                                           Closed ◄──close / drop────────── Ready
//! ```
//!
//! Only a `Ready` connection accepts application requests. Requests are
//! strictly sequential: [`Connection::send_message`] takes `&mut self`, sends one
//! envelope and awaits exactly one reply. Replies are correlated by their
//! `type`; when the hub echoes an `id`, it must match the request's ID as well.

use crate::config::HassConfig;
use crate::error::{Result, ZhaError};
use crate::zha::ids::{IdAllocator, RequestId};
use crate::zha::types::Envelope;
use futures_util::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const AUTH_REQUIRED: &str = "auth_required";
pub const AUTH: &str = "auth";
pub const AUTH_OK: &str = "auth_ok";
pub const AUTH_INVALID: &str = "auth_invalid";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    AwaitingAuthRequest,
    AwaitingAuthResult,
    Ready,
    Closed,
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::AwaitingAuthRequest => "awaiting auth request",
            ConnectionState::AwaitingAuthResult => "awaiting auth result",
            ConnectionState::Ready => "ready",
            ConnectionState::Closed => "closed",
            ConnectionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Build the hub WebSocket URL for `hostname:port`.
pub fn websocket_url(hostname: &str, port: u16, use_tls: bool) -> String {
    let protocol = if use_tls { "wss" } else { "ws" };
    format!("{}://{}:{}/api/websocket", protocol, hostname, port)
}

/// One authenticated WebSocket session to the hub.
pub struct Connection {
    stream: WsStream,
    state: ConnectionState,
    ids: IdAllocator,
    read_timeout: Duration,
}

impl Connection {
    /// Open the socket and complete the handshake.
    ///
    /// The socket is dropped (and thereby closed) on every failure path.
    pub async fn open(config: &HassConfig) -> Result<Self> {
        let url = config.websocket_url();
        debug!("Connecting to {}", url);

        let stream = connect_websocket(&url, config.use_tls, config.verify_ssl).await?;
        let mut connection = Self {
            stream,
            state: ConnectionState::AwaitingAuthRequest,
            ids: IdAllocator::new(),
            read_timeout: config.request_timeout(),
        };

        if let Err(e) = connection.authenticate(&config.token).await {
            connection.state = ConnectionState::Failed;
            warn!("Handshake with {} failed: {}", url, e);
            return Err(e);
        }

        info!("Authenticated to hub at {}", url);
        Ok(connection)
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn ids(&self) -> &IdAllocator {
        &self.ids
    }

    async fn authenticate(&mut self, token: &SecretString) -> Result<()> {
        let first = self.receive().await.map_err(handshake_error)?;
        let first_type = handshake_type(&first)?;
        if first_type != AUTH_REQUIRED {
            return Err(ZhaError::HandshakeFailed(format!(
                "expected `{}`, received `{}`",
                AUTH_REQUIRED, first_type
            )));
        }
        self.state = ConnectionState::AwaitingAuthResult;

        let auth = Envelope::new(AUTH).with_field("access_token", token.expose_secret().trim());
        debug!("Sending auth message");
        self.transmit(&auth).await?;

        let reply = self.receive().await.map_err(handshake_error)?;
        match handshake_type(&reply)? {
            AUTH_OK => {
                self.state = ConnectionState::Ready;
                let version = reply.get("ha_version").and_then(Value::as_str).unwrap_or("unknown");
                debug!("Hub version: {}", version);
                Ok(())
            }
            AUTH_INVALID => {
                let reason = reply
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("access token rejected");
                Err(ZhaError::HandshakeFailed(format!("{}: {}", AUTH_INVALID, reason)))
            }
            other => Err(ZhaError::HandshakeFailed(format!(
                "expected `{}`, received `{}`",
                AUTH_OK, other
            ))),
        }
    }

    /// Send `request_type` and await one reply of `expected_response_type`.
    ///
    /// With `attach_id`, an ID is held from before the send until the reply
    /// has been read, on every exit path. Returns the raw reply.
    pub async fn send_message(
        &mut self,
        request_type: &str,
        expected_response_type: &str,
        attach_id: bool,
        fields: Map<String, Value>,
    ) -> Result<Value> {
        if self.state != ConnectionState::Ready {
            return Err(ZhaError::NotReady(self.state));
        }

        let request_id: Option<RequestId> = if attach_id {
            Some(self.ids.acquire()?)
        } else {
            None
        };

        let mut envelope = Envelope::new(request_type).with_fields(fields);
        if let Some(id) = &request_id {
            envelope = envelope.with_id(id.get());
        }

        self.transmit(&envelope).await?;
        let response = self.receive().await?;
        drop(request_id);

        let response_type = message_type(&response)?;
        if response_type != expected_response_type {
            return Err(ZhaError::UnexpectedResponse {
                expected: expected_response_type.to_string(),
                received: response_type.to_string(),
            });
        }

        if let (Some(sent), Some(echoed)) = (envelope.id, response.get("id")) {
            if echoed.as_u64() != Some(u64::from(sent)) {
                return Err(ZhaError::UnexpectedResponse {
                    expected: format!("{} for id {}", expected_response_type, sent),
                    received: format!("{} for id {}", response_type, echoed),
                });
            }
        }

        Ok(response)
    }

    async fn transmit(&mut self, envelope: &Envelope) -> Result<()> {
        let payload = serde_json::to_string(envelope)?;
        if envelope.message_type == AUTH {
            debug!("Sending message: {{\"type\":\"auth\",\"access_token\":\"<redacted>\"}}");
        } else {
            debug!("Sending message: {}", payload);
        }

        if let Err(e) = self.stream.send(Message::Text(payload.into())).await {
            self.state = ConnectionState::Failed;
            return Err(ZhaError::WebSocket(e));
        }
        Ok(())
    }

    /// Await the next text frame, within the read timeout.
    async fn receive(&mut self) -> Result<Value> {
        let next = tokio::time::timeout(self.read_timeout, next_text(&mut self.stream)).await;

        let text = match next {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                self.state = ConnectionState::Failed;
                return Err(e);
            }
            Err(_) => {
                // A late reply would be read as the answer to the next request.
                self.state = ConnectionState::Failed;
                return Err(ZhaError::Timeout(self.read_timeout));
            }
        };

        debug!("Got response: {}", text);
        Ok(serde_json::from_str(&text)?)
    }

    /// Close the socket gracefully. Dropping a connection also releases the
    /// socket, without the closing handshake.
    pub async fn close(&mut self) {
        if matches!(self.state, ConnectionState::Closed) {
            return;
        }
        if let Err(e) = self.stream.close(None).await {
            debug!("Error while closing WebSocket: {}", e);
        }
        self.state = ConnectionState::Closed;
        info!("WebSocket connection closed");
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if self.state != ConnectionState::Closed {
            debug!("Connection dropped in state {}; socket released", self.state);
        }
    }
}

async fn connect_websocket(url: &str, use_tls: bool, verify_ssl: bool) -> Result<WsStream> {
    let (ws_stream, _) = if use_tls && !verify_ssl {
        // Custom TLS connector for self-signed certs
        let connector = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()
            .map_err(|e| ZhaError::Config(format!("TLS setup failed: {}", e)))?;

        let connector = tokio_tungstenite::Connector::NativeTls(connector);
        tokio_tungstenite::connect_async_tls_with_config(url, None, false, Some(connector))
            .await
            .map_err(ZhaError::ConnectionFailed)?
    } else {
        connect_async(url).await.map_err(ZhaError::ConnectionFailed)?
    };

    Ok(ws_stream)
}

async fn next_text(stream: &mut WsStream) -> Result<String> {
    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => return Ok(text.as_str().to_owned()),
            Some(Ok(Message::Close(frame))) => {
                debug!("Hub closed the connection: {:?}", frame);
                return Err(ZhaError::ConnectionClosed);
            }
            Some(Ok(Message::Binary(_))) => {
                return Err(ZhaError::UnexpectedResponse {
                    expected: "text frame".to_string(),
                    received: "binary frame".to_string(),
                })
            }
            Some(Ok(other)) => debug!("Skipping control frame: {:?}", other),
            Some(Err(e)) => return Err(ZhaError::WebSocket(e)),
            None => return Err(ZhaError::ConnectionClosed),
        }
    }
}

/// Frames that are not JSON are a protocol violation during the handshake.
fn handshake_error(error: ZhaError) -> ZhaError {
    match error {
        ZhaError::Json(e) => ZhaError::HandshakeFailed(format!("invalid handshake message: {}", e)),
        other => other,
    }
}

fn handshake_type(message: &Value) -> Result<&str> {
    message.get("type").and_then(Value::as_str).ok_or_else(|| {
        ZhaError::HandshakeFailed(format!("message without a `type` field: {}", message))
    })
}

/// The `type` field of an inbound message.
pub fn message_type(message: &Value) -> Result<&str> {
    message
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| ZhaError::UnexpectedResponse {
            expected: "message with a `type` field".to_string(),
            received: message.to_string(),
        })
}
