//! # Alignment Orchestration
//!
//! Drives one request through its lifecycle:
//!
//! ```text
//! Received -> Validating -> Rejected
//!                        -> Staged -> Invoking -> Cleanup -> Aligned | Failed
//! ```
//!
//! Cleanup always runs once files may have been written, whether staging or
//! the engine failed. Nothing is retried: each request ends in exactly one
//! outcome.

use crate::alignment::invoker::{AlignmentEngine, EngineError, ScriptEngine};
use crate::alignment::stager::{FileStager, StagingError};
use crate::alignment::types::{AlignmentRequest, ValidationFailure, Warning, WordAlignment};
use crate::alignment::validator::{RequestValidator, ValidatedRequest};
use crate::config::AppConfig;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, info_span, Instrument};

/// Server-side failure after validation passed.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl PipelineError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, PipelineError::Engine(EngineError::Timeout(_)))
    }
}

/// Terminal state of one request. The job id lives on the request's tracing
/// span, not here.
#[derive(Debug)]
pub enum AlignmentOutcome {
    Aligned {
        alignments: Vec<WordAlignment>,
        warnings: Vec<Warning>,
    },
    Rejected(ValidationFailure),
    Failed(PipelineError),
}

pub struct AlignmentService {
    validator: RequestValidator,
    stager: FileStager,
    engine: Arc<dyn AlignmentEngine>,
}

impl fmt::Debug for AlignmentService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlignmentService")
            .field("validator", &self.validator)
            .field("stager", &self.stager)
            .finish_non_exhaustive()
    }
}

impl AlignmentService {
    pub fn new(
        validator: RequestValidator,
        stager: FileStager,
        engine: Arc<dyn AlignmentEngine>,
    ) -> Self {
        Self {
            validator,
            stager,
            engine,
        }
    }

    /// Wire the production components from configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            RequestValidator::new(config.limits.clone()),
            FileStager::new(&config.staging),
            Arc::new(ScriptEngine::new(config.engine.clone(), config.staging.clone())),
        )
    }

    pub fn stager(&self) -> &FileStager {
        &self.stager
    }

    pub async fn process(&self, request: AlignmentRequest) -> AlignmentOutcome {
        let language_code = request.language_code.clone();
        let validated = match self.validator.validate(request) {
            Ok(validated) => validated,
            Err(failure) => {
                info!(
                    lang = %language_code,
                    code = failure.code.elg_code(),
                    "request rejected: {}",
                    failure
                );
                return AlignmentOutcome::Rejected(failure);
            }
        };

        let job_id = validated.job_id;
        let span = info_span!("alignment_job", job_id = %job_id, lang = %validated.language);
        async move {
            info!(
                duration_secs = validated.audio_info.duration_secs(),
                file_name = validated.file_name_hint.as_deref().unwrap_or("-"),
                "request accepted"
            );

            let result = self.stage_and_align(&validated).await;
            self.stager.cleanup(&job_id).await;

            match result {
                Ok(alignments) => {
                    info!(tokens = alignments.len(), "alignment succeeded");
                    AlignmentOutcome::Aligned {
                        alignments,
                        warnings: validated.warnings,
                    }
                }
                Err(error) => {
                    error!(error = %error, "alignment failed");
                    AlignmentOutcome::Failed(error)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn stage_and_align(
        &self,
        validated: &ValidatedRequest,
    ) -> Result<Vec<WordAlignment>, PipelineError> {
        let job = self.stager.stage(validated).await?;
        let alignments = self.engine.align(&job).await?;
        Ok(alignments)
    }
}
