//! Standard status messages and the codes this service emits.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SERVICE_NOT_FOUND: &str = "elg.service.not.found";
pub const REQUEST_INVALID: &str = "elg.request.invalid";
pub const PARAMETER_MISSING: &str = "elg.request.parameter.missing";
pub const UPLOAD_TOO_LARGE: &str = "elg.upload.too.large";
pub const AUDIO_FORMAT_UNSUPPORTED: &str = "elg.request.audio.format.unsupported";
pub const AUDIO_SAMPLE_RATE_UNSUPPORTED: &str = "elg.request.audio.samplerate.unsupported";
pub const INTERNAL_ERROR: &str = "elg.request.service.internalerror";
pub const TRANSCRIPT_TOO_SHORT: &str = "lingsoft.transcript.too.short";
pub const SAMPLE_RATE_MISMATCH: &str = "lingsoft.sampleRate.value.mismatch";

/// A single error or warning entry.
///
/// `text` is a template whose `{0}`, `{1}` placeholders are filled from
/// `params` by the client, following the ELG i18n convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub code: String,
    pub text: String,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub detail: BTreeMap<String, String>,
}

impl StatusMessage {
    pub fn new(code: &str, params: Vec<String>) -> Self {
        Self {
            code: code.to_string(),
            text: default_text(code).to_string(),
            params,
            detail: BTreeMap::new(),
        }
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<String>) -> Self {
        self.detail.insert(key.to_string(), value.into());
        self
    }

    /// Generic internal error; the real cause stays in the server log.
    pub fn internal_error() -> Self {
        Self::new(INTERNAL_ERROR, vec!["Something went wrong at back-end".to_string()])
    }

    /// HTTP status that accompanies a failure carrying this message.
    pub fn http_status(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;

        match self.code.as_str() {
            SERVICE_NOT_FOUND => StatusCode::NOT_FOUND,
            UPLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            INTERNAL_ERROR => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

fn default_text(code: &str) -> &'static str {
    match code {
        SERVICE_NOT_FOUND => "Service {0} not found",
        REQUEST_INVALID => "Invalid request message",
        PARAMETER_MISSING => "Required parameter {0} missing from request",
        UPLOAD_TOO_LARGE => "Upload too large",
        AUDIO_FORMAT_UNSUPPORTED => "Unsupported audio format {0}",
        AUDIO_SAMPLE_RATE_UNSUPPORTED => "Unsupported audio sample rate {0}",
        INTERNAL_ERROR => "Internal error during processing: {0}",
        TRANSCRIPT_TOO_SHORT => "Transcript is too short, at least {0} characters are required",
        SAMPLE_RATE_MISMATCH => "Declared sample rate {0} does not match the audio sample rate {1}",
        _ => "{0}",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_detail_is_omitted_when_empty() {
        let json = serde_json::to_value(StatusMessage::new(UPLOAD_TOO_LARGE, vec![])).unwrap();
        assert!(json.get("detail").is_none());
        assert_eq!(json["text"], "Upload too large");
    }

    #[test]
    fn test_http_status_mapping() {
        let status = |code: &str| StatusMessage::new(code, vec![]).http_status();
        assert_eq!(status(SERVICE_NOT_FOUND), StatusCode::NOT_FOUND);
        assert_eq!(status(UPLOAD_TOO_LARGE), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(status(TRANSCRIPT_TOO_SHORT), StatusCode::BAD_REQUEST);
        assert_eq!(
            StatusMessage::internal_error().http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
