//! Wire frame definitions.
//!
//! All frames are JSON objects discriminated by a `type` field. Inbound
//! frames are untrusted: unknown discriminators map to
//! [`ServerFrame::Unknown`] and missing payloads default to JSON null
//! rather than failing the whole frame.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The identity pair forwarded at registration time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Principal (user) id.
    pub principal_id: u64,
    /// Organization id.
    pub org_id: u64,
}

impl Identity {
    /// Create a new identity pair.
    pub fn new(principal_id: u64, org_id: u64) -> Self {
        Self {
            principal_id,
            org_id,
        }
    }
}

/// Outbound frames, client to server.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Identify this connection to the server.
    Register { principal_id: u64, org_id: u64 },
    /// Subscribe to a topic, optionally scoped to one resource.
    Subscribe {
        subscription_type: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        resource_id: Option<u64>,
    },
    /// Unsubscribe from a topic.
    Unsubscribe {
        subscription_type: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        resource_id: Option<u64>,
    },
    /// Liveness probe.
    Ping,
}

impl ClientFrame {
    /// Build a register frame from an identity pair.
    pub fn register(identity: Identity) -> Self {
        Self::Register {
            principal_id: identity.principal_id,
            org_id: identity.org_id,
        }
    }
}

/// Inbound frames, server to client.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Greeting after registration. Logged, never dispatched.
    Welcome {
        #[serde(default)]
        message: Value,
    },
    /// A new message in a subscribed conversation.
    NewMessage {
        #[serde(default)]
        message: Value,
    },
    /// A thread's metadata changed.
    ThreadUpdated {
        #[serde(default)]
        thread: Value,
    },
    /// A presence change for some principal.
    PresenceUpdate {
        #[serde(default)]
        presence: Value,
    },
    /// Heartbeat acknowledgment. Logged, never dispatched.
    Pong,
    /// Server-reported error. Logged, never dispatched.
    Error {
        #[serde(default)]
        error: Value,
    },
    /// Any discriminator we do not recognize. Degrades gracefully instead
    /// of being treated as malformed.
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_register_frame_shape() {
        let frame = ClientFrame::register(Identity::new(1, 2));
        let value = serde_json::to_value(&frame).expect("serialize");
        assert_eq!(
            value,
            json!({"type": "register", "principal_id": 1, "org_id": 2})
        );
    }

    #[test]
    fn test_subscribe_frame_shape() {
        let frame = ClientFrame::Subscribe {
            subscription_type: "threads".to_string(),
            resource_id: Some(42),
        };
        let value = serde_json::to_value(&frame).expect("serialize");
        assert_eq!(
            value,
            json!({"type": "subscribe", "subscription_type": "threads", "resource_id": 42})
        );
    }

    #[test]
    fn test_subscribe_frame_omits_missing_resource_id() {
        let frame = ClientFrame::Subscribe {
            subscription_type: "presence".to_string(),
            resource_id: None,
        };
        let value = serde_json::to_value(&frame).expect("serialize");
        assert_eq!(
            value,
            json!({"type": "subscribe", "subscription_type": "presence"})
        );
    }

    #[test]
    fn test_ping_frame_shape() {
        let value = serde_json::to_value(ClientFrame::Ping).expect("serialize");
        assert_eq!(value, json!({"type": "ping"}));
    }

    #[test]
    fn test_inbound_frames_parse() {
        let frame: ServerFrame =
            serde_json::from_str(r#"{"type":"new_message","message":{"id":7}}"#).expect("parse");
        assert_eq!(
            frame,
            ServerFrame::NewMessage {
                message: json!({"id": 7})
            }
        );

        let frame: ServerFrame =
            serde_json::from_str(r#"{"type":"thread_updated","thread":{"id":3}}"#).expect("parse");
        assert!(matches!(frame, ServerFrame::ThreadUpdated { .. }));

        let frame: ServerFrame =
            serde_json::from_str(r#"{"type":"presence_update","presence":{"online":true}}"#)
                .expect("parse");
        assert!(matches!(frame, ServerFrame::PresenceUpdate { .. }));

        let frame: ServerFrame = serde_json::from_str(r#"{"type":"pong"}"#).expect("parse");
        assert_eq!(frame, ServerFrame::Pong);
    }

    #[test]
    fn test_unknown_discriminator_parses_to_unknown() {
        let frame: ServerFrame =
            serde_json::from_str(r#"{"type":"totally_new","stuff":1}"#).expect("parse");
        assert_eq!(frame, ServerFrame::Unknown);
    }

    #[test]
    fn test_missing_payload_defaults_to_null() {
        let frame: ServerFrame = serde_json::from_str(r#"{"type":"welcome"}"#).expect("parse");
        assert_eq!(
            frame,
            ServerFrame::Welcome {
                message: Value::Null
            }
        );
    }
}
