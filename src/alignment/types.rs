//! Data model shared by the validator, stager, invoker and orchestrator.

use crate::alignment::language::Language;
use crate::elg::message::{self, StatusMessage};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// An inbound alignment request, as extracted from the multipart body.
///
/// Lives for one HTTP call. Nothing here has been checked yet.
#[derive(Debug, Clone, Default)]
pub struct AlignmentRequest {
    pub audio: Option<Vec<u8>>,
    pub declared_format: Option<String>,
    pub declared_sample_rate: Option<u32>,
    pub language_code: String,
    pub transcript: Option<String>,
    pub file_name_hint: Option<String>,
}

/// A validated request whose inputs have been written to the staging area.
///
/// Each job gets its own `{job_id}` subdirectory under the audio and
/// transcript staging dirs, holding exactly one file each. The engine
/// aligns every pair it finds in the directories it is given, so this keeps
/// it to this job's pair. Both files share the base name `job_id`.
#[derive(Debug, Clone)]
pub struct AlignmentJob {
    pub job_id: Uuid,
    pub audio_dir: PathBuf,
    pub transcript_dir: PathBuf,
    pub audio_path: PathBuf,
    pub transcript_path: PathBuf,
    pub language: Language,
    pub phone_table: &'static str,
}

/// One aligned token. `start <= end`, both in seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordAlignment {
    pub start: f64,
    pub end: f64,
    pub token: String,
}

/// Why a request was rejected before any work was done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCode {
    UnsupportedLanguage,
    MissingField,
    MissingParameter,
    TranscriptTooShort,
    UnsupportedAudioFormat,
    TooSmall,
    TooLarge,
    UnsupportedSampleRate,
}

impl FailureCode {
    /// The protocol code reported to the caller.
    pub fn elg_code(self) -> &'static str {
        match self {
            FailureCode::UnsupportedLanguage => message::SERVICE_NOT_FOUND,
            FailureCode::MissingField => message::REQUEST_INVALID,
            FailureCode::MissingParameter => message::PARAMETER_MISSING,
            FailureCode::TranscriptTooShort => message::TRANSCRIPT_TOO_SHORT,
            FailureCode::UnsupportedAudioFormat => message::AUDIO_FORMAT_UNSUPPORTED,
            FailureCode::TooSmall => message::REQUEST_INVALID,
            FailureCode::TooLarge => message::UPLOAD_TOO_LARGE,
            FailureCode::UnsupportedSampleRate => message::AUDIO_SAMPLE_RATE_UNSUPPORTED,
        }
    }
}

/// A client-caused rejection. At most one is produced per request.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationFailure {
    pub code: FailureCode,
    pub params: Vec<String>,
    pub detail: BTreeMap<String, String>,
}

impl ValidationFailure {
    pub fn new(code: FailureCode) -> Self {
        Self {
            code,
            params: Vec::new(),
            detail: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.params.push(param.into());
        self
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<String>) -> Self {
        self.detail.insert(key.to_string(), value.into());
        self
    }

    pub fn to_message(&self) -> StatusMessage {
        let mut message = StatusMessage::new(self.code.elg_code(), self.params.clone());
        message.detail = self.detail.clone();
        message
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self.code, self.code.elg_code())?;
        for (key, value) in &self.detail {
            write!(f, " {}: {}", key, value)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationFailure {}

/// Non-fatal annotation attached to a successful response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    SampleRateMismatch { declared: u32, measured: u32 },
}

impl Warning {
    pub fn to_message(&self) -> StatusMessage {
        match self {
            Warning::SampleRateMismatch { declared, measured } => StatusMessage::new(
                message::SAMPLE_RATE_MISMATCH,
                vec![declared.to_string(), measured.to_string()],
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_message_carries_code_params_and_detail() {
        let failure = ValidationFailure::new(FailureCode::UnsupportedSampleRate)
            .with_param("8000")
            .with_detail("sampleRate", "Audio sample rate is 8000 Hz");
        let message = failure.to_message();

        assert_eq!(message.code, "elg.request.audio.samplerate.unsupported");
        assert_eq!(message.params, vec!["8000".to_string()]);
        assert_eq!(message.detail["sampleRate"], "Audio sample rate is 8000 Hz");
    }

    #[test]
    fn test_size_failures_use_distinct_codes() {
        assert_eq!(FailureCode::TooSmall.elg_code(), "elg.request.invalid");
        assert_eq!(FailureCode::TooLarge.elg_code(), "elg.upload.too.large");
    }

    #[test]
    fn test_warning_message_names_both_rates() {
        let message = Warning::SampleRateMismatch { declared: 12000, measured: 16000 }.to_message();
        assert_eq!(message.code, "lingsoft.sampleRate.value.mismatch");
        assert_eq!(message.params, vec!["12000".to_string(), "16000".to_string()]);
    }
}
