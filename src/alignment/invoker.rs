//! # Alignment Engine Invocation
//!
//! The alignment itself is done by an external script. This module launches
//! it for one job, waits for it under a hard timeout, then reads the CTM file
//! it leaves behind.
//!
//! ## Engine calling convention:
//! ```text
//! {program} {script} {phone_table} {debug} textDirTrue {job_audio_dir} {job_transcript_dir}
//! ```
//! The script processes every `{id}.wav` / `{id}.txt` pair it finds in the
//! two directories and writes `{output_dir}/{id}.ctm` for each. It is always
//! given the job's own subdirectories.
//!
//! On Unix the engine runs in its own process group, so a timeout takes down
//! everything it started and not just the interpreter.

use crate::alignment::ctm::{self, CtmError};
use crate::alignment::types::{AlignmentJob, WordAlignment};
use crate::config::{EngineConfig, StagingConfig};
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::process::{ChildStderr, Command};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Tells the engine that a transcript directory is supplied.
const TRANSCRIPT_AVAILABLE_FLAG: &str = "textDirTrue";

/// Longest stderr tail kept for the log.
const STDERR_LOG_LIMIT: usize = 2048;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to launch alignment engine {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed while waiting for alignment engine: {0}")]
    Wait(#[source] io::Error),

    #[error("alignment engine did not finish within {0:?}")]
    Timeout(Duration),

    #[error("alignment engine exited with status {0:?}")]
    ExitStatus(Option<i32>),

    #[error("alignment engine produced no output at {0}")]
    NoOutput(PathBuf),

    #[error("failed to read alignment output {path}: {source}")]
    ReadOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed alignment output: {0}")]
    Malformed(#[from] CtmError),

    #[error("alignment output at {0} contains no tokens")]
    EmptyOutput(PathBuf),
}

/// Something that can turn a staged job into word alignments.
#[async_trait]
pub trait AlignmentEngine: Send + Sync {
    async fn align(&self, job: &AlignmentJob) -> Result<Vec<WordAlignment>, EngineError>;
}

/// Runs the alignment script as a child process.
#[derive(Debug, Clone)]
pub struct ScriptEngine {
    engine: EngineConfig,
    output_dir: PathBuf,
}

impl ScriptEngine {
    pub fn new(engine: EngineConfig, staging: StagingConfig) -> Self {
        Self {
            engine,
            output_dir: staging.output_dir,
        }
    }

    fn command(&self, job: &AlignmentJob) -> Command {
        let mut command = Command::new(&self.engine.program);
        command
            .arg(&self.engine.script)
            .arg(job.phone_table)
            .arg(if self.engine.debug { "true" } else { "false" })
            .arg(TRANSCRIPT_AVAILABLE_FLAG)
            .arg(&job.audio_dir)
            .arg(&job.transcript_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);
        command
    }

    async fn run(&self, job: &AlignmentJob) -> Result<(), EngineError> {
        debug!(
            job_id = %job.job_id,
            lang = %job.language,
            audio = %job.audio_path.display(),
            transcript = %job.transcript_path.display(),
            "launching alignment engine"
        );

        let started = Instant::now();
        let mut child = self.command(job).spawn().map_err(|source| EngineError::Spawn {
            program: self.engine.program.clone(),
            source,
        })?;
        let pid = child.id();
        let stderr = child.stderr.take();

        let timeout = self.engine.timeout();
        let finished = tokio::time::timeout(timeout, async {
            let (status, stderr) = tokio::join!(child.wait(), read_stderr_tail(stderr));
            status.map(|status| (status, stderr))
        })
        .await;

        let (status, stderr) = match finished {
            Ok(result) => result.map_err(EngineError::Wait)?,
            Err(_) => {
                warn!(job_id = %job.job_id, ?timeout, "alignment engine timed out, killing it");
                if let Some(pid) = pid {
                    kill_process_group(pid).await;
                }
                return Err(EngineError::Timeout(timeout));
            }
        };

        if !status.success() {
            warn!(
                job_id = %job.job_id,
                status = ?status.code(),
                stderr = %stderr,
                "alignment engine exited unsuccessfully"
            );
            if self.engine.fail_on_nonzero_exit {
                return Err(EngineError::ExitStatus(status.code()));
            }
        } else if !stderr.is_empty() {
            debug!(job_id = %job.job_id, stderr = %stderr, "alignment engine stderr");
        }

        info!(
            job_id = %job.job_id,
            phone_table = job.phone_table,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "alignment engine finished"
        );
        Ok(())
    }
}

#[async_trait]
impl AlignmentEngine for ScriptEngine {
    async fn align(&self, job: &AlignmentJob) -> Result<Vec<WordAlignment>, EngineError> {
        self.run(job).await?;
        read_alignments(&self.output_dir, &job.job_id).await
    }
}

/// Path of the CTM file the engine writes for `job_id`.
pub fn output_path(output_dir: &Path, job_id: &Uuid) -> PathBuf {
    output_dir.join(format!("{}.ctm", job_id))
}

/// Locate and parse the engine's output for one job.
pub async fn read_alignments(
    output_dir: &Path,
    job_id: &Uuid,
) -> Result<Vec<WordAlignment>, EngineError> {
    let path = output_path(output_dir, job_id);
    let text = match tokio::fs::read_to_string(&path).await {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(EngineError::NoOutput(path)),
        Err(source) => return Err(EngineError::ReadOutput { path, source }),
    };

    let alignments = ctm::parse(&text)?;
    if alignments.is_empty() {
        return Err(EngineError::EmptyOutput(path));
    }
    Ok(alignments)
}

/// Drain the engine's stderr, keeping only the last `STDERR_LOG_LIMIT` bytes.
async fn read_stderr_tail(stderr: Option<ChildStderr>) -> String {
    let Some(mut stderr) = stderr else {
        return String::new();
    };

    let mut tail = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        match stderr.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                tail.extend_from_slice(&buf[..n]);
                if tail.len() > 2 * STDERR_LOG_LIMIT {
                    tail.drain(..tail.len() - STDERR_LOG_LIMIT);
                }
            }
        }
    }
    if tail.len() > STDERR_LOG_LIMIT {
        tail.drain(..tail.len() - STDERR_LOG_LIMIT);
    }
    String::from_utf8_lossy(&tail).trim().to_string()
}

/// Kill the engine's whole process group. The group id is the engine's pid.
#[cfg(unix)]
async fn kill_process_group(pgid: u32) {
    let result = Command::new("kill")
        .arg("-KILL")
        .arg("--")
        .arg(format!("-{}", pgid))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    match result {
        Ok(status) if status.success() => debug!(pgid, "killed engine process group"),
        Ok(status) => warn!(pgid, status = ?status.code(), "kill reported failure"),
        Err(e) => warn!(pgid, error = %e, "failed to run kill for engine process group"),
    }
}

#[cfg(not(unix))]
async fn kill_process_group(_pgid: u32) {}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::alignment::language::Language;
    use tempfile::TempDir;

    struct Fixture {
        root: TempDir,
        staging: StagingConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let root = TempDir::new().unwrap();
            let staging = StagingConfig {
                audio_dir: root.path().join("src_for_wav"),
                transcript_dir: root.path().join("src_for_txt"),
                output_dir: root.path().join("out"),
            };
            for dir in [&staging.audio_dir, &staging.transcript_dir, &staging.output_dir] {
                std::fs::create_dir_all(dir).unwrap();
            }
            Self { root, staging }
        }

        /// Write a stand-in engine script and return a config that runs it.
        fn engine(&self, body: &str, timeout_secs: u64) -> ScriptEngine {
            let script = self.root.path().join("align.sh");
            std::fs::write(&script, body).unwrap();
            ScriptEngine::new(
                EngineConfig {
                    program: "sh".to_string(),
                    script,
                    debug: false,
                    timeout_secs,
                    fail_on_nonzero_exit: true,
                },
                self.staging.clone(),
            )
        }

        fn job(&self, language: Language) -> AlignmentJob {
            let job_id = Uuid::new_v4();
            let audio_dir = self.staging.audio_dir.join(job_id.to_string());
            let transcript_dir = self.staging.transcript_dir.join(job_id.to_string());
            std::fs::create_dir_all(&audio_dir).unwrap();
            std::fs::create_dir_all(&transcript_dir).unwrap();
            let audio_path = audio_dir.join(format!("{}.wav", job_id));
            let transcript_path = transcript_dir.join(format!("{}.txt", job_id));
            std::fs::write(&audio_path, b"RIFF").unwrap();
            std::fs::write(&transcript_path, "hello world").unwrap();
            AlignmentJob {
                job_id,
                audio_dir,
                transcript_dir,
                audio_path,
                transcript_path,
                language,
                phone_table: language.phone_table(),
            }
        }
    }

    /// Writes a fixed two-word CTM for every staged wav, like the real engine.
    fn echo_engine_script(out: &Path) -> String {
        format!(
            r#"for f in "$4"/*.wav; do
  id=$(basename "$f" .wav)
  printf '0.0 0.5 hello\n0.5 1.0 world\n' > "{out}/$id.ctm"
done
"#,
            out = out.display()
        )
    }

    #[tokio::test]
    async fn test_runs_engine_and_parses_output() {
        let fixture = Fixture::new();
        let engine = fixture.engine(&echo_engine_script(&fixture.staging.output_dir), 30);
        let job = fixture.job(Language::Finnish);

        let words = engine.align(&job).await.unwrap();

        let tokens: Vec<_> = words.iter().map(|w| w.token.as_str()).collect();
        assert_eq!(tokens, ["hello", "world"]);
        assert_eq!(words[0].start, 0.0);
        assert_eq!(words[1].end, 1.0);
    }

    #[tokio::test]
    async fn test_passes_positional_arguments() {
        let fixture = Fixture::new();
        let args_file = fixture.root.path().join("args");
        let script = format!(
            "echo \"$1|$2|$3|$4|$5\" > \"{}\"\n{}",
            args_file.display(),
            echo_engine_script(&fixture.staging.output_dir)
        );
        let engine = fixture.engine(&script, 30);
        let job = fixture.job(Language::Komi);

        engine.align(&job).await.unwrap();

        let args = std::fs::read_to_string(&args_file).unwrap();
        let expected = format!(
            "phone-komi-finnish.csv|false|textDirTrue|{}|{}",
            job.audio_dir.display(),
            job.transcript_dir.display()
        );
        assert_eq!(args.trim(), expected);
    }

    #[tokio::test]
    async fn test_missing_output_is_an_error() {
        let fixture = Fixture::new();
        let engine = fixture.engine("exit 0\n", 30);
        let job = fixture.job(Language::Finnish);

        let err = engine.align(&job).await.unwrap_err();
        assert!(matches!(err, EngineError::NoOutput(_)));
    }

    #[tokio::test]
    async fn test_nonzero_exit_fails_even_with_output() {
        let fixture = Fixture::new();
        let script = format!("{}exit 3\n", echo_engine_script(&fixture.staging.output_dir));
        let engine = fixture.engine(&script, 30);
        let job = fixture.job(Language::Finnish);

        let err = engine.align(&job).await.unwrap_err();
        assert!(matches!(err, EngineError::ExitStatus(Some(3))));
    }

    #[tokio::test]
    async fn test_nonzero_exit_tolerated_when_configured() {
        let fixture = Fixture::new();
        let script = format!("{}exit 3\n", echo_engine_script(&fixture.staging.output_dir));
        let mut engine = fixture.engine(&script, 30);
        engine.engine.fail_on_nonzero_exit = false;
        let job = fixture.job(Language::Finnish);

        assert_eq!(engine.align(&job).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_output_fails_job() {
        let fixture = Fixture::new();
        let script = format!(
            "id=$(basename \"$4\"/*.wav .wav)\n\
             printf '0.0 0.5 hello\\nbroken line here too\\n' > \"{}/$id.ctm\"\n",
            fixture.staging.output_dir.display()
        );
        let engine = fixture.engine(&script, 30);
        let job = fixture.job(Language::Finnish);

        let err = engine.align(&job).await.unwrap_err();
        assert!(matches!(err, EngineError::Malformed(CtmError::FieldCount { line: 2, .. })));
    }

    #[tokio::test]
    async fn test_timeout_kills_engine() {
        let fixture = Fixture::new();
        let engine = fixture.engine("sleep 30\n", 1);
        let job = fixture.job(Language::Finnish);

        let started = Instant::now();
        let err = engine.align(&job).await.unwrap_err();
        assert!(matches!(err, EngineError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_timeout_kills_background_children() {
        let fixture = Fixture::new();
        let marker = fixture.root.path().join("survived");
        let script = format!("(sleep 2; touch \"{}\") &\nwait\n", marker.display());
        let engine = fixture.engine(&script, 1);
        let job = fixture.job(Language::Finnish);

        let err = engine.align(&job).await.unwrap_err();
        assert!(matches!(err, EngineError::Timeout(_)));

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(!marker.exists(), "engine child outlived the timeout");
    }

    #[tokio::test]
    async fn test_noisy_stderr_does_not_block_engine() {
        let fixture = Fixture::new();
        let script = format!(
            "i=0\nwhile [ $i -lt 2000 ]; do echo \"noise line $i\" >&2; i=$((i+1)); done\n{}",
            echo_engine_script(&fixture.staging.output_dir)
        );
        let engine = fixture.engine(&script, 30);
        let job = fixture.job(Language::Finnish);

        assert_eq!(engine.align(&job).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let fixture = Fixture::new();
        let mut engine = fixture.engine("exit 0\n", 30);
        engine.engine.program = "/nonexistent/interpreter".to_string();
        let job = fixture.job(Language::Finnish);

        let err = engine.align(&job).await.unwrap_err();
        assert!(matches!(err, EngineError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_empty_output_is_an_error() {
        let dir = TempDir::new().unwrap();
        let job_id = Uuid::new_v4();
        std::fs::write(output_path(dir.path(), &job_id), "\n").unwrap();

        let err = read_alignments(dir.path(), &job_id).await.unwrap_err();
        assert!(matches!(err, EngineError::EmptyOutput(_)));
    }
}
