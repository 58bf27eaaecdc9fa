//! # Error Handling
//!
//! HTTP-level errors: problems found before a request ever reaches the
//! alignment pipeline (an unreadable multipart body, a request part that is
//! not JSON) or failures of the HTTP plumbing itself.
//!
//! Alignment outcomes are not errors at this level; they are turned into
//! protocol envelopes by `elg::response`. These errors are rendered in the
//! same envelope so that callers only ever see one failure shape:
//!
//! ```json
//! {"failure": {"errors": [{"code": "elg.request.invalid", "text": "...",
//!                          "params": [], "detail": {"request": "..."}}]}}
//! ```

use crate::elg::message::{self, StatusMessage};
use crate::elg::ElgResponse;
use actix_web::{HttpResponse, ResponseError};
use std::fmt;
use tracing::error;

/// Custom error types for the HTTP layer.
///
/// ## Error Categories:
/// - **BadRequest**: the client sent a body we cannot read (400)
/// - **Internal**: something broke on our side (500); the message is logged,
///   never sent to the client
#[derive(Debug)]
pub enum AppError {
    Internal(String),
    BadRequest(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
        }
    }
}

impl AppError {
    fn to_message(&self) -> StatusMessage {
        match self {
            AppError::Internal(_) => StatusMessage::internal_error(),
            AppError::BadRequest(msg) => {
                StatusMessage::new(message::REQUEST_INVALID, vec![])
                    .with_detail("request", msg.clone())
            }
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        self.to_message().http_status()
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::Internal(msg) = self {
            error!(error = %msg, "internal error while handling request");
        }
        ElgResponse::failure(self.to_message()).into_http_response()
    }
}

/// A malformed JSON request part is the client's fault.
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parsing error: {}", err))
    }
}

impl From<actix_multipart::MultipartError> for AppError {
    fn from(err: actix_multipart::MultipartError) -> Self {
        AppError::BadRequest(format!("Multipart error: {}", err))
    }
}

pub type AppResult<T> = Result<T, AppError>;
