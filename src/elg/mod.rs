//! # ELG Protocol Types
//!
//! Wire shapes of the European Language Grid service protocol: the JSON
//! `request` part sent alongside the audio, and the `response` / `failure`
//! envelopes returned to the caller.
//!
//! ## Envelopes:
//! ```json
//! {"response": {"type": "annotations",
//!               "annotations": {"forced_alignment": [...]},
//!               "warnings": [...]}}
//! {"failure": {"errors": [{"code": "...", "text": "...", "params": [...], "detail": {...}}]}}
//! ```

pub mod message;
pub mod request;
pub mod response;

pub use request::AudioRequestPart;
pub use response::ElgResponse;
