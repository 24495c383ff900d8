use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope returned by every HTTP endpoint of the companion server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResult {
    pub response: Value,
}

impl FetchResult {
    pub fn new(response: impl Into<Value>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

/// One named message on the real-time channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelFrame {
    pub event: String,
    #[serde(default)]
    pub payload: Value,
}

impl ChannelFrame {
    pub fn new(event: impl Into<String>, payload: Value) -> Self {
        Self {
            event: event.into(),
            payload,
        }
    }
}

pub const CONNECT_EVENT: &str = "connect";
pub const DISCONNECT_EVENT: &str = "disconnect";

pub fn namespace_route(namespace: &str) -> String {
    format!("/io/{namespace}")
}
