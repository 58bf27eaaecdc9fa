//! # WAV Inspection
//!
//! Reads the facts the validator needs from an uploaded WAV file: sample
//! rate, channel layout, bit depth and duration. Only the header is parsed;
//! samples are never decoded.

use hound::WavReader;
use std::io::Cursor;

/// Header-level facts about a WAV recording.
#[derive(Debug, Clone, PartialEq)]
pub struct WavInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    /// Samples per channel.
    pub frames: u64,
    pub byte_len: usize,
}

impl WavInfo {
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames as f64 / self.sample_rate as f64
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InspectError {
    #[error("WAV parsing failed: {0}")]
    Parse(#[from] hound::Error),

    #[error("data chunk declares {declared} bytes but only {available} were uploaded")]
    Truncated { declared: u64, available: usize },
}

/// Parse the header of `bytes` as a WAV container.
pub fn inspect(bytes: &[u8]) -> Result<WavInfo, InspectError> {
    let reader = WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();

    let bytes_per_sample = u64::from(spec.bits_per_sample).div_ceil(8);
    let declared = u64::from(reader.len()) * bytes_per_sample;
    if declared > bytes.len() as u64 {
        return Err(InspectError::Truncated {
            declared,
            available: bytes.len(),
        });
    }

    Ok(WavInfo {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        bits_per_sample: spec.bits_per_sample,
        frames: u64::from(reader.duration()),
        byte_len: bytes.len(),
    })
}
