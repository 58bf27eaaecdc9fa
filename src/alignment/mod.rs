//! # Forced Alignment Pipeline
//!
//! Everything between an extracted HTTP request and the protocol response:
//!
//! - **validator**: ordered admission checks, first failure wins
//! - **stager**: writes inputs for the engine and removes them afterwards
//! - **invoker**: runs the external engine and reads its CTM output
//! - **ctm**: strict parser for the engine's output format
//! - **service**: the per-request state machine tying the above together
//!
//! The alignment itself happens in an external script; this crate never
//! touches acoustic models.

pub mod ctm;
pub mod invoker;
pub mod language;
pub mod service;
pub mod stager;
pub mod types;
pub mod validator;

pub use language::Language;
pub use service::{AlignmentOutcome, AlignmentService};
pub use types::AlignmentRequest;
