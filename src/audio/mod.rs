//! # Audio Module
//!
//! Container-level audio handling. The service never decodes audio for its
//! own use; it only needs to know whether an upload is a WAV file and at
//! which sample rate it was recorded.
//!
//! ## Audio Format Requirements:
//! - **Container**: RIFF/WAVE
//! - **Encoding**: LINEAR16 (16-bit PCM)
//! - **Sample Rate**: 16kHz (16,000 Hz)

pub mod inspector;

pub use inspector::{inspect, WavInfo};
