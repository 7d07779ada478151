//! Payload shapes delivered by the watch feed and the unwrapper that resolves them.
//!
//! Producers either send the fleet itself or a message wrapper whose second slot
//! holds it. Both are accepted; the shape is decided once, at deserialization,
//! and carried as a variant instead of being probed at dispatch time.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::UnwrapError;
use crate::fleet::Fleet;

/// Opaque event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    /// The fleet delivered as-is
    Direct(Box<Fleet>),
    /// The fleet embedded in a message wrapper
    Wrapped(FleetMessage),
    /// Anything else; never resolves to a fleet
    Unknown(Value),
}

/// Generic message wrapper: a source tag followed by the fleet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetMessage {
    /// Informer callback that produced the message (e.g. "OnUpdate")
    #[serde(default)]
    pub source: String,
    pub fleet: Box<Fleet>,
}

impl From<Fleet> for Payload {
    fn from(fleet: Fleet) -> Self {
        Self::Direct(Box::new(fleet))
    }
}

impl From<FleetMessage> for Payload {
    fn from(message: FleetMessage) -> Self {
        Self::Wrapped(message)
    }
}

/// Resolve the fleet carried by `payload`.
pub fn unwrap_fleet(payload: &Payload) -> Result<&Fleet, UnwrapError> {
    match payload {
        Payload::Direct(fleet) => Ok(fleet.as_ref()),
        Payload::Wrapped(message) => Ok(message.fleet.as_ref()),
        Payload::Unknown(value) => Err(UnwrapError {
            found: describe(value),
        }),
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_owned(),
        Value::Bool(_) => "boolean".to_owned(),
        Value::Number(_) => "number".to_owned(),
        Value::String(_) => "string".to_owned(),
        Value::Array(items) => format!("array of {} items", items.len()),
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).take(8).collect();
            format!("object with keys [{}]", keys.join(", "))
        }
    }
}
