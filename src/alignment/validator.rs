//! # Request Validation
//!
//! Runs the admission checks for an alignment request in a fixed order and
//! stops at the first violation. Request-shape checks come first, then the
//! byte-size check, then the WAV parse, and only after a successful parse the
//! checks that depend on measured audio properties.
//!
//! ## Order:
//! 1. language is supported
//! 2. audio content and declared format are present
//! 3. transcript is present and long enough
//! 4. declared format is the supported encoding
//! 5. audio size is within bounds
//! 6. audio parses as WAV
//! 7. measured sample rate is the required rate
//! 8. declared sample rate matches the measured one (warning only)
//!
//! Each step is a plain function returning `Result<_, ValidationFailure>`;
//! `validate` chains them with `?`.

use crate::alignment::language::Language;
use crate::alignment::types::{AlignmentRequest, FailureCode, ValidationFailure, Warning};
use crate::audio::{self, WavInfo};
use crate::config::LimitsConfig;
use tracing::debug;
use uuid::Uuid;

/// A request that passed every check, ready to be staged.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub job_id: Uuid,
    pub language: Language,
    pub transcript: String,
    pub audio: Vec<u8>,
    pub audio_info: WavInfo,
    pub warnings: Vec<Warning>,
    pub file_name_hint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RequestValidator {
    limits: LimitsConfig,
}

impl RequestValidator {
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    pub fn validate(
        &self,
        request: AlignmentRequest,
    ) -> Result<ValidatedRequest, ValidationFailure> {
        let language = check_language(&request.language_code)?;
        let (audio, format) = check_required_fields(request.audio, request.declared_format)?;
        let transcript = check_transcript(request.transcript, self.limits.min_transcript_chars)?;
        check_declared_format(&format, &self.limits.audio_format)?;
        check_size(audio.len(), &self.limits)?;
        let audio_info = check_container(&audio)?;
        check_sample_rate(&audio_info, self.limits.required_sample_rate)?;
        let warnings = compare_declared_rate(request.declared_sample_rate, &audio_info)
            .into_iter()
            .collect();

        Ok(ValidatedRequest {
            job_id: Uuid::new_v4(),
            language,
            transcript,
            audio,
            audio_info,
            warnings,
            file_name_hint: request.file_name_hint,
        })
    }
}

fn check_language(code: &str) -> Result<Language, ValidationFailure> {
    code.parse::<Language>().map_err(|_| {
        ValidationFailure::new(FailureCode::UnsupportedLanguage)
            .with_param(code)
            .with_detail("lang", format!("Language '{}' is not supported", code))
    })
}

fn check_required_fields(
    audio: Option<Vec<u8>>,
    format: Option<String>,
) -> Result<(Vec<u8>, String), ValidationFailure> {
    let audio = audio.ok_or_else(|| {
        ValidationFailure::new(FailureCode::MissingField)
            .with_detail("content", "Audio content is missing")
    })?;
    let format = format.ok_or_else(|| {
        ValidationFailure::new(FailureCode::MissingField)
            .with_detail("format", "Audio format is missing")
    })?;
    Ok((audio, format))
}

/// Surrounding whitespace is dropped; the trimmed text is both what gets
/// counted (in characters) and what gets staged.
fn check_transcript(
    transcript: Option<String>,
    min_chars: usize,
) -> Result<String, ValidationFailure> {
    let transcript = transcript.ok_or_else(|| {
        ValidationFailure::new(FailureCode::MissingParameter)
            .with_param("transcript")
            .with_detail("transcript", "No transcript was given")
    })?;

    let transcript = transcript.trim();
    if transcript.chars().count() < min_chars {
        return Err(ValidationFailure::new(FailureCode::TranscriptTooShort)
            .with_param(min_chars.to_string())
            .with_detail(
                "transcript",
                "Given transcript is too short, perhaps wrong transcript",
            ));
    }

    Ok(transcript.to_string())
}

fn check_declared_format(format: &str, supported: &str) -> Result<(), ValidationFailure> {
    if format != supported {
        return Err(ValidationFailure::new(FailureCode::UnsupportedAudioFormat)
            .with_param(format)
            .with_detail("format", format!("Only {} audio is supported", supported)));
    }
    Ok(())
}

fn check_size(len: usize, limits: &LimitsConfig) -> Result<(), ValidationFailure> {
    if len < limits.min_audio_bytes {
        return Err(ValidationFailure::new(FailureCode::TooSmall)
            .with_detail("audio", "File is empty or too small"));
    }
    if len > limits.max_audio_bytes {
        let max_mb = limits.max_audio_bytes / (1024 * 1024);
        return Err(ValidationFailure::new(FailureCode::TooLarge)
            .with_detail("audio", format!("File is over {}MB", max_mb)));
    }
    Ok(())
}

fn check_container(bytes: &[u8]) -> Result<WavInfo, ValidationFailure> {
    audio::inspect(bytes).map_err(|e| {
        debug!(error = %e, "audio payload rejected by WAV parser");
        ValidationFailure::new(FailureCode::UnsupportedAudioFormat)
            .with_param("not WAV-parseable")
            .with_detail("audio", "Audio is not WAV-parseable")
    })
}

fn check_sample_rate(info: &WavInfo, required: u32) -> Result<(), ValidationFailure> {
    if info.sample_rate != required {
        return Err(ValidationFailure::new(FailureCode::UnsupportedSampleRate)
            .with_param(info.sample_rate.to_string())
            .with_detail(
                "sampleRate",
                format!(
                    "Audio sample rate is {} Hz, {} Hz is required",
                    info.sample_rate, required
                ),
            ));
    }
    Ok(())
}

fn compare_declared_rate(declared: Option<u32>, info: &WavInfo) -> Option<Warning> {
    match declared {
        Some(declared) if declared != info.sample_rate => Some(Warning::SampleRateMismatch {
            declared,
            measured: info.sample_rate,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::pcm16_wav;

    fn validator() -> RequestValidator {
        RequestValidator::new(LimitsConfig::default())
    }

    /// One second of 16kHz mono audio: comfortably above the minimum size.
    fn valid_request() -> AlignmentRequest {
        AlignmentRequest {
            audio: Some(pcm16_wav(16_000, 1, 16_000)),
            declared_format: Some("LINEAR16".to_string()),
            declared_sample_rate: Some(16_000),
            language_code: "fi".to_string(),
            transcript: Some("olen kehittäjä".to_string()),
            file_name_hint: None,
        }
    }

    fn code_of(request: AlignmentRequest) -> FailureCode {
        validator().validate(request).unwrap_err().code
    }

    #[test]
    fn test_valid_request_passes() {
        let validated = validator().validate(valid_request()).unwrap();
        assert_eq!(validated.language, Language::Finnish);
        assert_eq!(validated.transcript, "olen kehittäjä");
        assert_eq!(validated.audio_info.sample_rate, 16_000);
        assert!(validated.warnings.is_empty());
    }

    #[test]
    fn test_job_ids_are_unique() {
        let a = validator().validate(valid_request()).unwrap();
        let b = validator().validate(valid_request()).unwrap();
        assert_ne!(a.job_id, b.job_id);
    }

    #[test]
    fn test_unsupported_language_wins_over_everything_else() {
        let request = AlignmentRequest {
            language_code: "fini".to_string(),
            audio: None,
            declared_format: None,
            transcript: None,
            ..valid_request()
        };
        let failure = validator().validate(request).unwrap_err();
        assert_eq!(failure.code, FailureCode::UnsupportedLanguage);
        assert_eq!(failure.code.elg_code(), "elg.service.not.found");
    }

    #[test]
    fn test_missing_audio_or_format() {
        assert_eq!(
            code_of(AlignmentRequest { audio: None, ..valid_request() }),
            FailureCode::MissingField
        );
        assert_eq!(
            code_of(AlignmentRequest { declared_format: None, ..valid_request() }),
            FailureCode::MissingField
        );
    }

    #[test]
    fn test_missing_fields_checked_before_transcript() {
        let request = AlignmentRequest { audio: None, transcript: None, ..valid_request() };
        assert_eq!(code_of(request), FailureCode::MissingField);
    }

    #[test]
    fn test_missing_transcript_is_missing_parameter() {
        let failure = validator()
            .validate(AlignmentRequest { transcript: None, ..valid_request() })
            .unwrap_err();
        assert_eq!(failure.code, FailureCode::MissingParameter);
        assert_eq!(failure.code.elg_code(), "elg.request.parameter.missing");
    }

    #[test]
    fn test_transcript_length_boundary() {
        for short in ["", "ab", "  ab  ", "äö"] {
            let request = AlignmentRequest {
                transcript: Some(short.to_string()),
                ..valid_request()
            };
            assert_eq!(code_of(request), FailureCode::TranscriptTooShort, "{:?}", short);
        }

        // exactly three characters, multi-byte included
        for ok in ["abc", "äöå"] {
            let request = AlignmentRequest {
                transcript: Some(ok.to_string()),
                ..valid_request()
            };
            assert!(validator().validate(request).is_ok(), "{:?}", ok);
        }
    }

    #[test]
    fn test_counted_transcript_is_the_staged_transcript() {
        let request = AlignmentRequest {
            transcript: Some("  abc\n".to_string()),
            ..valid_request()
        };
        let validated = validator().validate(request).unwrap();
        assert_eq!(validated.transcript, "abc");
    }

    #[test]
    fn test_declared_format_checked_before_parsing() {
        // mp3 declared and mp3-looking bytes: the declared format decides the failure
        let request = AlignmentRequest {
            declared_format: Some("mp3".to_string()),
            audio: Some(vec![0xFF; 64 * 1024]),
            ..valid_request()
        };
        let failure = validator().validate(request).unwrap_err();
        assert_eq!(failure.code, FailureCode::UnsupportedAudioFormat);
        assert_eq!(failure.params, vec!["mp3".to_string()]);
    }

    #[test]
    fn test_too_small_and_boundary() {
        let audio = pcm16_wav(16_000, 1, 16_000);
        let limits = LimitsConfig {
            min_audio_bytes: audio.len(),
            ..LimitsConfig::default()
        };
        let validator = RequestValidator::new(limits);

        // exactly at the minimum: proceeds
        let at_min = AlignmentRequest { audio: Some(audio.clone()), ..valid_request() };
        assert!(validator.validate(at_min).is_ok());

        // one byte short: rejected before parsing
        let mut short = audio;
        short.pop();
        let failure = validator
            .validate(AlignmentRequest { audio: Some(short), ..valid_request() })
            .unwrap_err();
        assert_eq!(failure.code, FailureCode::TooSmall);
        assert_eq!(failure.detail["audio"], "File is empty or too small");
    }

    #[test]
    fn test_empty_audio_is_too_small() {
        assert_eq!(
            code_of(AlignmentRequest { audio: Some(Vec::new()), ..valid_request() }),
            FailureCode::TooSmall
        );
    }

    #[test]
    fn test_too_large() {
        let limits = LimitsConfig {
            min_audio_bytes: 0,
            max_audio_bytes: 1024,
            ..LimitsConfig::default()
        };
        let failure = RequestValidator::new(limits).validate(valid_request()).unwrap_err();
        assert_eq!(failure.code, FailureCode::TooLarge);
        assert_eq!(failure.code.elg_code(), "elg.upload.too.large");
    }

    #[test]
    fn test_non_wav_payload_is_unsupported_format() {
        let request = AlignmentRequest { audio: Some(vec![0x49; 32 * 1024]), ..valid_request() };
        let failure = validator().validate(request).unwrap_err();
        assert_eq!(failure.code, FailureCode::UnsupportedAudioFormat);
        assert_eq!(failure.code.elg_code(), "elg.request.audio.format.unsupported");
        assert_eq!(failure.detail["audio"], "Audio is not WAV-parseable");
    }

    #[test]
    fn test_non_wav_payload_wins_over_bad_declared_rate() {
        let request = AlignmentRequest {
            audio: Some(vec![0x49; 32 * 1024]),
            declared_sample_rate: Some(44_100),
            ..valid_request()
        };
        assert_eq!(code_of(request), FailureCode::UnsupportedAudioFormat);
    }

    #[test]
    fn test_wrong_sample_rate_names_measured_rate() {
        let request = AlignmentRequest {
            audio: Some(pcm16_wav(8_000, 1, 16_000)),
            declared_sample_rate: Some(8_000),
            ..valid_request()
        };
        let failure = validator().validate(request).unwrap_err();
        assert_eq!(failure.code, FailureCode::UnsupportedSampleRate);
        assert_eq!(failure.params, vec!["8000".to_string()]);
    }

    #[test]
    fn test_declared_rate_mismatch_is_a_warning() {
        let request = AlignmentRequest { declared_sample_rate: Some(12_000), ..valid_request() };
        let validated = validator().validate(request).unwrap();
        assert_eq!(
            validated.warnings,
            vec![Warning::SampleRateMismatch { declared: 12_000, measured: 16_000 }]
        );
    }

    #[test]
    fn test_no_declared_rate_no_warning() {
        let request = AlignmentRequest { declared_sample_rate: None, ..valid_request() };
        assert!(validator().validate(request).unwrap().warnings.is_empty());
    }
}
