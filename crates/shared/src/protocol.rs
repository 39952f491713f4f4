use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RelayError;

pub const REGISTER_EVENT: &str = "register";
pub const ANDROID_CONTROL_EVENT: &str = "androidControl";
pub const CONTROL_EVENT: &str = "control";

/// Mode attached to commands whose input event did not name one.
pub const DEFAULT_MODE: &str = "game";

/// Payload of a `register` frame.
///
/// Older desktop clients send a bare string, newer clients an object with a
/// `type` field. Any other JSON shape is kept as-is so it can be reported as
/// an unknown role rather than rejected while decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoleHint {
    Legacy(String),
    Structured {
        #[serde(rename = "type")]
        kind: String,
    },
    Unrecognized(Value),
}

impl RoleHint {
    pub fn structured(kind: impl Into<String>) -> Self {
        Self::Structured { kind: kind.into() }
    }

    /// The role string carried by the hint, whichever form it arrived in.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RoleHint::Legacy(kind) | RoleHint::Structured { kind } => Some(kind),
            RoleHint::Unrecognized(_) => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            RoleHint::Legacy(kind) | RoleHint::Structured { kind } => kind.clone(),
            RoleHint::Unrecognized(value) => value.to_string(),
        }
    }
}

impl From<Value> for RoleHint {
    fn from(value: Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or(RoleHint::Unrecognized(value))
    }
}

/// A decoded inbound frame.
///
/// On the wire a frame is either `{"event": name, "data": payload}` or the
/// positional `[name, payload]` form emitted by socket.io style clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientFrame {
    #[serde(rename = "register")]
    Register(RoleHint),
    /// Control payloads stay untyped until the sender has been admitted.
    #[serde(rename = "androidControl")]
    AndroidControl(Value),
}

impl ClientFrame {
    pub fn decode(text: &str) -> Result<Self, RelayError> {
        let value: Value = serde_json::from_str(text).map_err(|e| RelayError::Decode {
            reason: e.to_string(),
        })?;

        let (event, data) = match value {
            Value::Object(mut map) => {
                let event = match map.remove("event") {
                    Some(Value::String(event)) => event,
                    _ => {
                        return Err(RelayError::Decode {
                            reason: "frame object has no string `event` field".into(),
                        })
                    }
                };
                (event, map.remove("data").unwrap_or(Value::Null))
            }
            Value::Array(items) => {
                let mut items = items.into_iter();
                let event = match items.next() {
                    Some(Value::String(event)) => event,
                    _ => {
                        return Err(RelayError::Decode {
                            reason: "frame array must start with an event name".into(),
                        })
                    }
                };
                (event, items.next().unwrap_or(Value::Null))
            }
            other => {
                return Err(RelayError::Decode {
                    reason: format!("expected frame object or array, got {other}"),
                })
            }
        };

        match event.as_str() {
            REGISTER_EVENT => Ok(ClientFrame::Register(RoleHint::from(data))),
            ANDROID_CONTROL_EVENT => Ok(ClientFrame::AndroidControl(data)),
            _ => Err(RelayError::UnknownEvent { event }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPhase {
    KeyDown,
    KeyUp,
    /// A discrete press with no matching release from the controller.
    KeyPress,
}

impl KeyPhase {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "KEY_DOWN" => Some(KeyPhase::KeyDown),
            "KEY_UP" => Some(KeyPhase::KeyUp),
            "KEY_PRESS" => Some(KeyPhase::KeyPress),
            _ => None,
        }
    }
}

/// A keyboard-style input event from a controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputEvent {
    pub key: String,
    /// Raw phase string; unknown phases are rejected during translation.
    pub phase: String,
    pub mode: Option<String>,
}

impl InputEvent {
    pub fn new(key: impl Into<String>, phase: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            phase: phase.into(),
            mode: None,
        }
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    /// Validates an `androidControl` payload.
    ///
    /// Only `type: "INPUT"` with a non-empty `key` is accepted. `MOUSE`
    /// payloads are recognised but not handled.
    pub fn from_payload(payload: &Value) -> Result<Self, RelayError> {
        let Some(object) = payload.as_object() else {
            return Err(RelayError::malformed("payload is not an object"));
        };

        match object.get("type").and_then(Value::as_str) {
            Some("INPUT") => {}
            Some("MOUSE") => {
                return Err(RelayError::UnhandledEventKind {
                    kind: "MOUSE".into(),
                })
            }
            Some(other) => {
                return Err(RelayError::malformed(format!("unsupported type {other:?}")))
            }
            None => return Err(RelayError::malformed("missing `type`")),
        }

        let key = object
            .get("key")
            .and_then(Value::as_str)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| RelayError::malformed("missing `key`"))?;

        let phase = match object.get("event") {
            Some(Value::String(phase)) => phase.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };

        Ok(Self {
            key: key.to_string(),
            phase,
            mode: object.get("mode").and_then(Value::as_str).map(str::to_string),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    KeyDown,
    KeyUp,
}

/// Canonical command delivered to actuators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub action: Action,
    pub key: String,
    pub mode: String,
}

impl Command {
    /// The matching release: same key and mode, `keyUp`.
    pub fn released(&self) -> Self {
        Self {
            action: Action::KeyUp,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerFrame {
    Control(Command),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn legacy_and_structured_hints_carry_the_same_role_string() {
        let legacy = RoleHint::from(json!("exe"));
        let structured = RoleHint::from(json!({ "type": "exe" }));
        assert_eq!(legacy, RoleHint::Legacy("exe".into()));
        assert_eq!(structured, RoleHint::structured("exe"));
        assert_eq!(legacy.as_str(), structured.as_str());
    }

    #[test]
    fn odd_register_payloads_are_kept_as_unrecognized() {
        let hint = RoleHint::from(json!({ "type": 7 }));
        assert!(matches!(hint, RoleHint::Unrecognized(_)));
        assert_eq!(hint.as_str(), None);
        assert_eq!(RoleHint::from(Value::Null).describe(), "null");
    }

    #[test]
    fn decodes_object_and_positional_frames() {
        let object = ClientFrame::decode(r#"{"event":"register","data":"pc"}"#).expect("object");
        let positional = ClientFrame::decode(r#"["register","pc"]"#).expect("array");
        assert_eq!(object, positional);

        let control = ClientFrame::decode(
            r#"{"event":"androidControl","data":{"type":"INPUT","key":"ARROW_UP","event":"KEY_DOWN"}}"#,
        )
        .expect("control");
        assert!(matches!(control, ClientFrame::AndroidControl(_)));
    }

    #[test]
    fn rejects_unknown_events_and_garbage() {
        let err = ClientFrame::decode(r#"{"event":"chat","data":"hi"}"#).expect_err("unknown");
        assert_eq!(err.code(), crate::error::ErrorCode::UnknownEvent);

        let err = ClientFrame::decode("not json").expect_err("garbage");
        assert_eq!(err.code(), crate::error::ErrorCode::Decode);

        let err = ClientFrame::decode("42").expect_err("scalar");
        assert_eq!(err.code(), crate::error::ErrorCode::Decode);
    }

    #[test]
    fn client_frame_encodes_as_event_and_data() {
        let frame = ClientFrame::Register(RoleHint::structured("android_controller"));
        assert_eq!(
            serde_json::to_value(&frame).expect("encode"),
            json!({ "event": "register", "data": { "type": "android_controller" } })
        );
    }

    #[test]
    fn input_payload_validation() {
        let event = InputEvent::from_payload(
            &json!({ "type": "INPUT", "key": "ACTION_A", "event": "KEY_PRESS", "mode": "menu" }),
        )
        .expect("valid");
        assert_eq!(event, InputEvent::new("ACTION_A", "KEY_PRESS").with_mode("menu"));

        let err = InputEvent::from_payload(&json!({ "type": "MOUSE", "event": "MOUSE_MOVE" }))
            .expect_err("mouse");
        assert_eq!(err.code(), crate::error::ErrorCode::UnhandledEventKind);

        for payload in [
            json!("KEY_DOWN"),
            json!({ "key": "a" }),
            json!({ "type": "INPUT" }),
            json!({ "type": "INPUT", "key": "" }),
            json!({ "type": "INPUT", "key": 3 }),
            json!({ "type": "SETTINGS", "key": "a" }),
        ] {
            let err = InputEvent::from_payload(&payload).expect_err("malformed");
            assert_eq!(err.code(), crate::error::ErrorCode::MalformedPayload, "{payload}");
        }
    }

    #[test]
    fn outbound_control_frame_shape() {
        let frame = ServerFrame::Control(Command {
            action: Action::KeyDown,
            key: "a".into(),
            mode: DEFAULT_MODE.into(),
        });
        assert_eq!(
            serde_json::to_value(&frame).expect("encode"),
            json!({ "event": "control", "data": { "action": "keyDown", "key": "a", "mode": "game" } })
        );
    }

    #[test]
    fn release_keeps_key_and_mode() {
        let press = Command {
            action: Action::KeyDown,
            key: "up".into(),
            mode: "menu".into(),
        };
        let release = press.released();
        assert_eq!(release.action, Action::KeyUp);
        assert_eq!((release.key.as_str(), release.mode.as_str()), ("up", "menu"));
    }
}
