//! ZHA WebSocket API Type Definitions
//!
//! Outbound envelopes and the device records returned by `zha/devices`.
//!
//! # Design Notes
//!
//! - **Nullable vs. defaulted**: `quirk_id`, `manufacturer_code`, `area_id`,
//!   `device_reg_id` and `user_given_name` are `Option<T>`; `neighbors`,
//!   `routes` and `signature` default to empty when the hub omits them.
//! - **Unknown fields** sent by the hub are ignored so newer hub releases keep
//!   decoding. Missing required fields and wrong types are rejected.
//! - **`nwk`** arrives either as a hex string (`"0x1234"`) or an integer
//!   (`4660`); [`Nwk`] accepts both.

use crate::error::{Result, ZhaError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use tracing::debug;

/// Outbound message: `{"type": ..., "id": ..., ...fields}`.
///
/// `type` and `id` are owned by the envelope; extra fields with those names
/// are dropped so they cannot shadow them on the wire.
#[derive(Debug, Serialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Envelope {
    pub fn new(message_type: impl Into<String>) -> Self {
        Self {
            message_type: message_type.into(),
            id: None,
            fields: Map::new(),
        }
    }

    pub fn with_id(mut self, id: u32) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if !is_reserved(&key) {
            self.fields.insert(key, value.into());
        }
        self
    }

    pub fn with_fields(mut self, fields: Map<String, Value>) -> Self {
        for (key, value) in fields {
            if is_reserved(&key) {
                debug!("Dropping caller field `{}` from {} envelope", key, self.message_type);
                continue;
            }
            self.fields.insert(key, value);
        }
        self
    }
}

fn is_reserved(key: &str) -> bool {
    key == "type" || key == "id"
}

/// Error object attached to a failed `result` message.
#[derive(Debug, Deserialize)]
pub struct HubError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Network (NWK) address, as delivered by the hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Nwk {
    Int(u64),
    Text(String),
}

impl Nwk {
    /// The 16-bit address, if the hub value parses as one.
    pub fn address(&self) -> Option<u16> {
        match self {
            Nwk::Int(value) => u16::try_from(*value).ok(),
            Nwk::Text(text) => {
                let text = text.trim();
                let hex = text
                    .strip_prefix("0x")
                    .or_else(|| text.strip_prefix("0X"))
                    .unwrap_or(text);
                u16::from_str_radix(hex, 16).ok()
            }
        }
    }
}

impl fmt::Display for Nwk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Nwk::Int(value) => write!(f, "{}", value),
            Nwk::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointName {
    pub name: String,
}

/// Neighbor table entry reported by a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub device_type: String,
    pub rx_on_when_idle: String,
    pub relationship: String,
    pub extended_pan_id: String,
    pub ieee: String,
    pub nwk: String,
    pub permit_joining: String,
    pub depth: String,
    pub lqi: String,
}

/// Routing table entry reported by a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub dest_nwk: String,
    pub route_status: String,
    pub memory_constrained: bool,
    pub many_to_one: bool,
    pub route_record_required: bool,
    pub next_hop: String,
}

/// Device record from `zha/devices`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub ieee: String,
    pub nwk: Nwk,
    pub manufacturer: String,
    pub model: String,
    pub name: String,
    pub quirk_applied: bool,
    pub quirk_class: String,
    pub quirk_id: Option<String>,
    pub manufacturer_code: Option<u16>,
    pub power_source: String,
    pub lqi: i64,
    pub rssi: i64,
    pub last_seen: String,
    pub available: bool,
    pub device_type: String,
    pub area_id: Option<String>,
    pub active_coordinator: bool,
    pub device_reg_id: Option<String>,
    pub user_given_name: Option<String>,
    #[serde(default)]
    pub neighbors: Vec<Neighbor>,
    #[serde(default)]
    pub routes: Vec<Route>,
    #[serde(default)]
    pub endpoint_names: Option<Vec<EndpointName>>,
    #[serde(default)]
    pub signature: Map<String, Value>,
}

impl DeviceInfo {
    /// Label-friendly name: the user-given name, or empty.
    pub fn display_name(&self) -> &str {
        self.user_given_name.as_deref().unwrap_or("")
    }
}

/// Decode the `index`-th raw device record.
pub fn decode_device(index: usize, record: &Value) -> Result<DeviceInfo> {
    let object = record.as_object().ok_or_else(|| ZhaError::Decode {
        index,
        field: None,
        reason: format!("expected an object, found {}", json_kind(record)),
    })?;

    DeviceInfo::deserialize(record).map_err(|e| ZhaError::Decode {
        index,
        field: missing_field(&e, object).or_else(|| mistyped_field(object)),
        reason: e.to_string(),
    })
}

const DEVICE_FIELDS: &[&str] = &[
    "ieee",
    "nwk",
    "manufacturer",
    "model",
    "name",
    "quirk_applied",
    "quirk_class",
    "quirk_id",
    "manufacturer_code",
    "power_source",
    "lqi",
    "rssi",
    "last_seen",
    "available",
    "device_type",
    "area_id",
    "active_coordinator",
    "device_reg_id",
    "user_given_name",
    "neighbors",
    "routes",
    "endpoint_names",
    "signature",
];

/// The top-level field named by a "missing field" error. Nested records
/// report the same message, so the key must really be absent here.
fn missing_field(error: &serde_json::Error, object: &Map<String, Value>) -> Option<&'static str> {
    let message = error.to_string();
    let name = message.strip_prefix("missing field `")?.split('`').next()?;
    DEVICE_FIELDS
        .iter()
        .copied()
        .find(|field| *field == name && !object.contains_key(*field))
}

/// First present field whose value does not decode into its declared type.
fn mistyped_field(object: &Map<String, Value>) -> Option<&'static str> {
    macro_rules! check_fields {
        ($($field:literal => $ty:ty),* $(,)?) => {
            $(
                if let Some(value) = object.get($field) {
                    if <$ty>::deserialize(value).is_err() {
                        return Some($field);
                    }
                }
            )*
        };
    }

    check_fields! {
        "ieee" => String,
        "nwk" => Nwk,
        "manufacturer" => String,
        "model" => String,
        "name" => String,
        "quirk_applied" => bool,
        "quirk_class" => String,
        "quirk_id" => Option<String>,
        "manufacturer_code" => Option<u16>,
        "power_source" => String,
        "lqi" => i64,
        "rssi" => i64,
        "last_seen" => String,
        "available" => bool,
        "device_type" => String,
        "area_id" => Option<String>,
        "active_coordinator" => bool,
        "device_reg_id" => Option<String>,
        "user_given_name" => Option<String>,
        "neighbors" => Vec<Neighbor>,
        "routes" => Vec<Route>,
        "endpoint_names" => Option<Vec<EndpointName>>,
        "signature" => Map<String, Value>,
    }

    None
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// JSON truthiness as the hub's clients read it: `null`, `false`, `0`, `""`,
/// `[]` and `{}` are false, everything else is true.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truthiness_matches_json_falsy_values() {
        for falsy in [json!(null), json!(false), json!(0), json!(0.0), json!(""), json!([]), json!({})] {
            assert!(!is_truthy(&falsy), "{} should be falsy", falsy);
        }
        for truthy in [json!(true), json!(1), json!("x"), json!([0]), json!({"a": null})] {
            assert!(is_truthy(&truthy), "{} should be truthy", truthy);
        }
    }

    #[test]
    fn envelope_omits_absent_id() {
        let auth = Envelope::new("auth").with_field("access_token", "secret");
        let text = serde_json::to_string(&auth).unwrap();
        assert_eq!(text, r#"{"type":"auth","access_token":"secret"}"#);

        let request = Envelope::new("zha/devices").with_id(7);
        let text = serde_json::to_string(&request).unwrap();
        assert_eq!(text, r#"{"type":"zha/devices","id":7}"#);
    }

    #[test]
    fn envelope_keeps_its_own_type_and_id() {
        let mut fields = Map::new();
        fields.insert("id".to_string(), json!(9));
        fields.insert("type".to_string(), json!("x"));
        fields.insert("note".to_string(), json!("hi"));

        let request = Envelope::new("zha/devices").with_fields(fields).with_id(1);
        let text = serde_json::to_string(&request).unwrap();

        assert_eq!(text, r#"{"type":"zha/devices","id":1,"note":"hi"}"#);
    }

    #[test]
    fn nwk_address_from_both_forms() {
        assert_eq!(Nwk::Text("0x1234".into()).address(), Some(0x1234));
        assert_eq!(Nwk::Text("1A2B".into()).address(), Some(0x1A2B));
        assert_eq!(Nwk::Int(4660).address(), Some(0x1234));
        assert_eq!(Nwk::Int(70000).address(), None);
        assert_eq!(Nwk::Text("nope".into()).address(), None);
    }
}
