//! Success and failure envelopes.

use crate::alignment::service::AlignmentOutcome;
use crate::alignment::types::WordAlignment;
use crate::elg::message::StatusMessage;
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde::Serialize;

/// Top-level body: serializes as `{"response": ...}` or `{"failure": ...}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ElgResponse {
    Response(AnnotationsResponse),
    Failure(Failure),
}

#[derive(Debug, Serialize)]
pub struct AnnotationsResponse {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub annotations: Annotations,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<StatusMessage>,
}

#[derive(Debug, Serialize)]
pub struct Annotations {
    pub forced_alignment: Vec<AlignmentAnnotation>,
}

/// One annotation: a time span with the aligned token in `features`.
#[derive(Debug, Serialize)]
pub struct AlignmentAnnotation {
    pub start: f64,
    pub end: f64,
    pub features: AlignmentFeatures,
}

#[derive(Debug, Serialize)]
pub struct AlignmentFeatures {
    pub aligned: String,
}

#[derive(Debug, Serialize)]
pub struct Failure {
    pub errors: Vec<StatusMessage>,
}

impl From<WordAlignment> for AlignmentAnnotation {
    fn from(word: WordAlignment) -> Self {
        Self {
            start: word.start,
            end: word.end,
            features: AlignmentFeatures { aligned: word.token },
        }
    }
}

impl ElgResponse {
    pub fn annotations(alignments: Vec<WordAlignment>, warnings: Vec<StatusMessage>) -> Self {
        ElgResponse::Response(AnnotationsResponse {
            kind: "annotations",
            annotations: Annotations {
                forced_alignment: alignments.into_iter().map(AlignmentAnnotation::from).collect(),
            },
            warnings,
        })
    }

    pub fn failure(error: StatusMessage) -> Self {
        ElgResponse::Failure(Failure { errors: vec![error] })
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ElgResponse::Response(_) => StatusCode::OK,
            ElgResponse::Failure(failure) => failure
                .errors
                .first()
                .map(StatusMessage::http_status)
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }

    pub fn into_http_response(self) -> HttpResponse {
        HttpResponse::build(self.status()).json(self)
    }
}

impl From<AlignmentOutcome> for ElgResponse {
    fn from(outcome: AlignmentOutcome) -> Self {
        match outcome {
            AlignmentOutcome::Aligned { alignments, warnings, .. } => ElgResponse::annotations(
                alignments,
                warnings.iter().map(|warning| warning.to_message()).collect(),
            ),
            AlignmentOutcome::Rejected(failure) => ElgResponse::failure(failure.to_message()),
            // The cause has been logged with the job id; callers get a generic message.
            AlignmentOutcome::Failed(_) => {
                ElgResponse::failure(StatusMessage::internal_error())
            }
        }
    }
}
