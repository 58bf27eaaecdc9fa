//! The JSON `request` part of an ELG audio request.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Metadata sent next to the raw audio `content` part.
///
/// Every field is optional at this level: presence rules are enforced by the
/// request validator so that they fail in a fixed order with specific codes.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioRequestPart {
    pub format: Option<String>,
    pub sample_rate: Option<u32>,
    pub params: Option<Map<String, Value>>,
    pub features: Option<Map<String, Value>>,
}

impl AudioRequestPart {
    /// `params.transcript`, if it is present and a string.
    pub fn transcript(&self) -> Option<String> {
        string_field(self.params.as_ref(), "transcript")
    }

    /// `features.fname`, the caller's name for the recording.
    pub fn file_name(&self) -> Option<String> {
        string_field(self.features.as_ref(), "fname")
    }
}

fn string_field(map: Option<&Map<String, Value>>, key: &str) -> Option<String> {
    map.and_then(|m| m.get(key))
        .and_then(Value::as_str)
        .map(str::to_string)
}
