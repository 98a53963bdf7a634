//! Router-config-style text rendering
//!
//! Renders a JSON object as an indented block in the style of a network
//! device's running configuration:
//!
//! ```text
//! device 00:0d:6f:00:0a:90:69:e7
//!   nwk 0x0000
//!   manufacturer Silicon Labs
//!   neighbors 00:12:4b:00:1c:a1:b8:46
//!     relationship Child
//!   !
//! !
//! ```
//!
//! Falsy values (`null`, `false`, `0`, `""`, `[]`, `{}`) are left out.

use crate::zha::types::is_truthy;
use crate::zha::DeviceInfo;
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

const INDENT: &str = "  ";

/// Render `value` as a block named `obj_name`.
///
/// The header carries the value of `primary_key` (or of `name`, if no key is
/// given and the object has one). `keydict` names the primary key to use for
/// nested objects, by field name.
pub fn format_like_cisco(
    obj_name: &str,
    value: &Value,
    primary_key: Option<&str>,
    keydict: &HashMap<&str, &str>,
) -> String {
    let empty = serde_json::Map::new();
    let obj = value.as_object().unwrap_or(&empty);

    let primary_key = primary_key.or_else(|| obj.contains_key("name").then_some("name"));

    let mut lines = Vec::new();
    match primary_key {
        Some(key) => {
            let header = obj.get(key).map(scalar_to_string).unwrap_or_default();
            lines.push(format!("{} {}", obj_name, header));
        }
        None => lines.push(obj_name.to_string()),
    }

    for (key, value) in obj {
        if !is_truthy(value) || Some(key.as_str()) == primary_key {
            continue;
        }

        match value {
            Value::Object(_) => {
                let nested = format_like_cisco(key, value, keydict.get(key.as_str()).copied(), keydict);
                lines.push(indent(&nested));
            }
            Value::Array(items) => match items.first() {
                Some(Value::Object(_)) => {
                    let nested_key = keydict.get(key.as_str()).copied();
                    for item in items {
                        lines.push(indent(&format_like_cisco(key, item, nested_key, keydict)));
                    }
                }
                Some(Value::Array(_)) => warn!("Unable to serialize {}: {}", key, value),
                _ => {
                    let joined = items
                        .iter()
                        .map(scalar_to_string)
                        .collect::<Vec<_>>()
                        .join(", ");
                    lines.push(format!("{}{} {}", INDENT, key, joined));
                }
            },
            scalar => lines.push(format!("{}{} {}", INDENT, key, scalar_to_string(scalar))),
        }
    }

    lines.push("!".to_string());
    lines.join("\n")
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Prefix every non-blank line with one indentation level.
fn indent(text: &str) -> String {
    text.lines()
        .map(|line| {
            if line.trim().is_empty() {
                line.to_string()
            } else {
                format!("{}{}", INDENT, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

impl DeviceInfo {
    /// Router-config-style rendering: `device <ieee>`, neighbors keyed by
    /// `ieee`, routes keyed by `dest_nwk`.
    pub fn as_cisco(&self) -> String {
        let keydict = HashMap::from([("neighbors", "ieee"), ("routes", "dest_nwk")]);
        match serde_json::to_value(self) {
            Ok(value) => format_like_cisco("device", &value, Some("ieee"), &keydict),
            Err(e) => {
                warn!("Unable to serialize device {}: {}", self.ieee, e);
                format!("device {}\n!", self.ieee)
            }
        }
    }
}
