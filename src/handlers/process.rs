//! # Alignment Endpoint
//!
//! `POST /process/{lang_code}` takes a multipart body with two parts:
//!
//! - `request`: JSON metadata (`format`, `sampleRate`, `params.transcript`, ...)
//! - `content`: the raw WAV bytes
//!
//! The handler only extracts these parts; every admission rule lives in the
//! request validator so that failures come out in one fixed order. The one
//! exception is an unsupported language, which is answered before the body is
//! read so that a broken `request` part cannot mask it.

use crate::alignment::{AlignmentRequest, Language};
use crate::elg::message::{self, StatusMessage};
use crate::elg::{AudioRequestPart, ElgResponse};
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use actix_multipart::{Field, Multipart};
use actix_web::{web, HttpRequest, HttpResponse};
use futures_util::StreamExt;
use tracing::{debug, error};

/// The JSON part is small metadata; anything bigger is not a real request.
const MAX_REQUEST_PART_BYTES: usize = 64 * 1024;

/// Parts pulled out of the multipart body, not yet interpreted.
#[derive(Debug, Default)]
struct UploadedParts {
    request: Option<Vec<u8>>,
    content: Option<Vec<u8>>,
}

impl UploadedParts {
    fn into_request(self, language_code: String) -> AppResult<AlignmentRequest> {
        let metadata = match self.request {
            Some(bytes) => serde_json::from_slice::<AudioRequestPart>(&bytes)?,
            None => AudioRequestPart::default(),
        };

        Ok(AlignmentRequest {
            audio: self.content,
            declared_format: metadata.format.clone(),
            declared_sample_rate: metadata.sample_rate,
            language_code,
            transcript: metadata.transcript(),
            file_name_hint: metadata.file_name(),
        })
    }
}

pub async fn process_alignment(
    state: web::Data<AppState>,
    path: web::Path<String>,
    mut payload: Multipart,
) -> AppResult<HttpResponse> {
    let language_code = path.into_inner();
    if language_code.parse::<Language>().is_err() {
        debug!(lang = %language_code, "unsupported language, body not read");
        let request = AlignmentRequest {
            language_code,
            ..AlignmentRequest::default()
        };
        return run_job(&state, request).await;
    }

    let parts = read_parts(&mut payload, state.config.limits.max_audio_bytes).await?;
    let request = parts.into_request(language_code)?;
    run_job(&state, request).await
}

/// Run one request through the alignment service and render its outcome.
///
/// The job runs in its own task: if the client goes away and this handler
/// is dropped, the job still reaches cleanup.
async fn run_job(
    state: &web::Data<AppState>,
    request: AlignmentRequest,
) -> AppResult<HttpResponse> {
    state.job_started();
    let job_state = state.clone();
    let job = tokio::spawn(async move {
        let outcome = job_state.service.process(request).await;
        job_state.job_finished(Some(&outcome));
        outcome
    });

    match job.await {
        Ok(outcome) => Ok(ElgResponse::from(outcome).into_http_response()),
        Err(join_error) => {
            state.job_finished(None);
            error!(error = %join_error, "alignment task did not complete");
            Err(AppError::Internal(format!("alignment task failed: {}", join_error)))
        }
    }
}

/// Fallback for every unknown route.
pub async fn not_found(req: HttpRequest) -> HttpResponse {
    ElgResponse::failure(StatusMessage::new(
        message::SERVICE_NOT_FOUND,
        vec![req.path().to_string()],
    ))
    .into_http_response()
}

/// Collect the `request` and `content` parts.
///
/// `content` is kept up to `max_audio_bytes + 1` bytes: enough for the
/// validator to see that it is oversize without holding the whole upload.
async fn read_parts(payload: &mut Multipart, max_audio_bytes: usize) -> AppResult<UploadedParts> {
    let mut parts = UploadedParts::default();

    while let Some(item) = payload.next().await {
        let mut field = item?;

        let field_name = field
            .content_disposition()
            .and_then(|cd| cd.get_name())
            .map(str::to_string)
            .ok_or_else(|| AppError::BadRequest("Missing field name".to_string()))?;

        match field_name.as_str() {
            "request" => {
                let bytes = read_capped(&mut field, MAX_REQUEST_PART_BYTES + 1).await?;
                if bytes.len() > MAX_REQUEST_PART_BYTES {
                    return Err(AppError::BadRequest("Request part is too large".to_string()));
                }
                parts.request = Some(bytes);
            }
            "content" => {
                let bytes = read_capped(&mut field, max_audio_bytes.saturating_add(1)).await?;
                debug!(bytes = bytes.len(), "received audio content");
                parts.content = Some(bytes);
            }
            other => {
                debug!(field = other, "ignoring unknown multipart field");
                read_capped(&mut field, 0).await?;
            }
        }
    }

    Ok(parts)
}

/// Read a field to the end, keeping at most `cap` bytes.
async fn read_capped(field: &mut Field, cap: usize) -> AppResult<Vec<u8>> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk?;
        let room = cap.saturating_sub(bytes.len());
        bytes.extend_from_slice(&chunk[..room.min(chunk.len())]);
    }
    Ok(bytes)
}
