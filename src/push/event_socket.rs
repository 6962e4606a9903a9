use serde::Deserialize;
use serde_json::Value;

use crate::error::AcquireError;
use crate::push::protocol::{Decoded, Protocol};
use crate::push::subscriptions::Inbound;

/// `{"type": "<event>", "data": <payload>}`
#[derive(Debug, Deserialize)]
struct EventEnvelope {
    #[serde(rename = "type")]
    event: String,
    #[serde(default)]
    data: Value,
}

/// Generic event socket: every text frame is one named event. There is no
/// handshake and no server-side subscription; events are routed by name.
#[derive(Debug, Default)]
pub struct EventSocketProtocol;

impl Protocol for EventSocketProtocol {
    fn handshake(&mut self) -> Vec<String> {
        Vec::new()
    }

    fn ready_on_open(&self) -> bool {
        true
    }

    fn subscribe(&mut self, _topic: &str) -> Option<String> {
        None
    }

    fn decode(&mut self, frame: &str) -> Result<Decoded, AcquireError> {
        if frame.trim().is_empty() {
            return Ok(Decoded::Ignored);
        }
        let envelope: EventEnvelope =
            serde_json::from_str(frame).map_err(|e| AcquireError::Parse(e.to_string()))?;
        Ok(Decoded::Message(Inbound {
            topic: envelope.event,
            payload: envelope.data,
        }))
    }
}
