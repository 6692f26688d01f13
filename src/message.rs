//! Wire message types
//!
//! The relay forwards device traffic verbatim and never decodes it. These
//! types describe what sits on either end: the commands the relay encodes
//! for a device, and the tagged messages a device emits.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::registry::Frame;

/// An action directed at one device
///
/// The action string is domain-specific ("STOP", "REBOOT", "TOGGLE_MODE",
/// ...) and opaque to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub action: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
}

impl Command {
    /// Create a command without arguments
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            args: None,
        }
    }

    /// Attach structured arguments
    pub fn with_args(mut self, args: Value) -> Self {
        self.args = Some(args);
        self
    }

    /// Encode into the frame delivered to the device
    ///
    /// The encoding is a JSON object: `{"action": "...", "args": ...}` with
    /// `args` omitted when absent.
    pub fn encode(&self) -> Result<Frame, serde_json::Error> {
        serde_json::to_string(self).map(Frame::from)
    }

    /// Decode a command from a frame received by a device
    pub fn decode(frame: &Frame) -> Result<Self, serde_json::Error> {
        match frame {
            Frame::Text(text) => serde_json::from_str(text),
            Frame::Binary(data) => serde_json::from_slice(data),
        }
    }
}

/// A device-origin message
///
/// `message_type` is the discriminant ("telemetry", "vision", "kinematics",
/// "camera_feed"); everything else is kind-specific payload flattened at the
/// top level of the JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryMessage {
    pub message_type: String,

    /// Producer clock, seconds since the Unix epoch
    #[serde(default)]
    pub timestamp: f64,

    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl TelemetryMessage {
    /// Create an empty message of the given kind stamped with the current time
    pub fn new(message_type: impl Into<String>) -> Self {
        Self {
            message_type: message_type.into(),
            timestamp: now_epoch_secs(),
            payload: Map::new(),
        }
    }

    /// Add a payload field
    pub fn field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }

    pub fn to_frame(&self) -> Result<Frame, serde_json::Error> {
        serde_json::to_string(self).map(Frame::from)
    }
}

fn now_epoch_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_command_encoding() {
        let frame = Command::new("STOP").encode().unwrap();
        assert_eq!(frame.as_text(), Some(r#"{"action":"STOP"}"#));

        let frame = Command::new("MOVE_FORWARD")
            .with_args(json!({"speed": 1.5}))
            .encode()
            .unwrap();
        let value: Value = serde_json::from_str(frame.as_text().unwrap()).unwrap();
        assert_eq!(value, json!({"action": "MOVE_FORWARD", "args": {"speed": 1.5}}));
    }

    #[test]
    fn test_command_decode() {
        let frame = Frame::from(r#"{"action":"CAM_SWITCH"}"#);
        assert_eq!(Command::decode(&frame).unwrap(), Command::new("CAM_SWITCH"));

        assert!(Command::decode(&Frame::from("not json")).is_err());
    }

    #[test]
    fn test_telemetry_message_flattens_payload() {
        let raw = r#"{"message_type":"kinematics","h3_mobility":{"joint_angles":[0.0,1.5]}}"#;
        let message: TelemetryMessage = serde_json::from_str(raw).unwrap();

        assert_eq!(message.message_type, "kinematics");
        assert_eq!(message.timestamp, 0.0);
        assert_eq!(
            message.payload["h3_mobility"],
            json!({"joint_angles": [0.0, 1.5]})
        );
    }

    #[test]
    fn test_telemetry_message_builder() {
        let message = TelemetryMessage::new("vision").field("current_zone", json!("AUTONOMOUS"));
        let frame = message.to_frame().unwrap();
        let value: Value = serde_json::from_str(frame.as_text().unwrap()).unwrap();

        assert_eq!(value["message_type"], "vision");
        assert_eq!(value["current_zone"], "AUTONOMOUS");
        assert!(value["timestamp"].as_f64().unwrap() > 0.0);
    }
}
