//! # File Staging
//!
//! Writes validated inputs where the alignment engine looks for them and
//! removes them again afterwards.
//!
//! ## Layout:
//! - `{audio_dir}/{job_id}/{job_id}.wav`
//! - `{transcript_dir}/{job_id}/{job_id}.txt`
//! - `{output_dir}/{job_id}.ctm` (written by the engine)
//!
//! The engine is pointed at the job's own subdirectories, so concurrent jobs
//! never see each other's inputs. Every name starts with a fresh UUID, so no
//! locking is involved.

use crate::alignment::types::AlignmentJob;
use crate::alignment::validator::ValidatedRequest;
use crate::config::StagingConfig;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
#[error("failed to write {path}: {source}")]
pub struct StagingError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

#[derive(Debug, Clone)]
pub struct FileStager {
    audio_dir: PathBuf,
    transcript_dir: PathBuf,
    output_dir: PathBuf,
}

impl FileStager {
    pub fn new(config: &StagingConfig) -> Self {
        Self {
            audio_dir: config.audio_dir.clone(),
            transcript_dir: config.transcript_dir.clone(),
            output_dir: config.output_dir.clone(),
        }
    }

    /// Create the working directories if they are missing. Called once at startup.
    pub fn prepare(&self) -> io::Result<()> {
        for dir in [&self.audio_dir, &self.transcript_dir, &self.output_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn audio_dir(&self) -> &Path {
        &self.audio_dir
    }

    #[cfg(test)]
    pub fn transcript_dir(&self) -> &Path {
        &self.transcript_dir
    }

    /// Write the audio and transcript for a validated request into the job's
    /// own subdirectories.
    ///
    /// Every step must succeed. Whatever was written before a failure is left
    /// behind; `cleanup` removes it.
    pub async fn stage(
        &self,
        request: &ValidatedRequest,
    ) -> Result<AlignmentJob, StagingError> {
        let job_id = request.job_id;
        let audio_dir = self.audio_dir.join(job_id.to_string());
        let transcript_dir = self.transcript_dir.join(job_id.to_string());
        let audio_path = audio_dir.join(format!("{}.wav", job_id));
        let transcript_path = transcript_dir.join(format!("{}.txt", job_id));

        create_dir(&audio_dir).await?;
        write(&audio_path, request.audio.as_slice()).await?;
        create_dir(&transcript_dir).await?;
        write(&transcript_path, request.transcript.as_bytes()).await?;

        debug!(
            job_id = %job_id,
            audio = %audio_path.display(),
            transcript = %transcript_path.display(),
            "staged alignment inputs"
        );

        Ok(AlignmentJob {
            job_id,
            audio_dir,
            transcript_dir,
            audio_path,
            transcript_path,
            language: request.language,
            phone_table: request.language.phone_table(),
        })
    }

    /// Remove every entry whose name starts with `job_id`.
    ///
    /// Scans the audio, transcript and output directories plus the output
    /// directory's immediate subdirectories, where the engine leaves its
    /// intermediate files. Never fails: problems are logged and skipped.
    /// Returns the number of entries removed.
    pub async fn cleanup(&self, job_id: &Uuid) -> usize {
        let prefix = job_id.to_string();
        let mut removed = 0;

        for dir in self.cleanup_dirs().await {
            removed += remove_prefixed(&dir, &prefix).await;
        }

        debug!(job_id = %job_id, removed, "cleanup finished");
        removed
    }

    async fn cleanup_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = vec![
            self.audio_dir.clone(),
            self.transcript_dir.clone(),
            self.output_dir.clone(),
        ];

        match tokio::fs::read_dir(&self.output_dir).await {
            Ok(mut entries) => loop {
                match entries.next_entry().await {
                    Ok(Some(entry)) => {
                        let is_dir =
                            entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
                        let path = entry.path();
                        if is_dir && !dirs.contains(&path) {
                            dirs.push(path);
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!(
                            dir = %self.output_dir.display(),
                            error = %e,
                            "failed to list output directory"
                        );
                        break;
                    }
                }
            },
            Err(e) => {
                warn!(
                    dir = %self.output_dir.display(),
                    error = %e,
                    "failed to open output directory"
                );
            }
        }

        dirs
    }
}

async fn create_dir(path: &Path) -> Result<(), StagingError> {
    tokio::fs::create_dir(path).await.map_err(|source| StagingError {
        path: path.to_path_buf(),
        source,
    })
}

async fn write(path: &Path, contents: &[u8]) -> Result<(), StagingError> {
    tokio::fs::write(path, contents).await.map_err(|source| StagingError {
        path: path.to_path_buf(),
        source,
    })
}

async fn remove_prefixed(dir: &Path, prefix: &str) -> usize {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "cleanup directory no longer exists");
            return 0;
        }
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "failed to open directory for cleanup");
            return 0;
        }
    };

    let mut removed = 0;
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "failed to list directory for cleanup");
                break;
            }
        };

        if !entry.file_name().to_string_lossy().starts_with(prefix) {
            continue;
        }

        let path = entry.path();
        let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
        let result = if is_dir {
            tokio::fs::remove_dir_all(&path).await
        } else {
            tokio::fs::remove_file(&path).await
        };

        match result {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "already removed");
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to remove staged file");
            }
        }
    }

    removed
}
