//! # Configuration Management
//!
//! This module handles loading and managing application configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Default values (built into the code)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. `HOST` / `PORT` (deployment platforms)
//! 2. Environment variables (APP_SERVER__PORT, APP_STAGING__AUDIO_DIR, etc.)
//! 3. Configuration file (config.toml)
//! 4. Default values (defined in the Default impl)
//!
//! ## Sections:
//! - **server**: where the HTTP listener binds
//! - **staging**: the directories shared with the alignment engine
//! - **engine**: how the external alignment script is launched
//! - **limits**: thresholds applied by the request validator

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration that contains all settings.
///
/// Cloned into every request handler through `AppState`, so it stays a plain
/// data struct with no handles or locks inside.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub staging: StagingConfig,
    pub engine: EngineConfig,
    pub limits: LimitsConfig,
}

/// Server-specific configuration settings.
///
/// ## Fields:
/// - `host`: IP address or hostname to bind the server to (e.g., "127.0.0.1", "0.0.0.0")
/// - `port`: TCP port number to listen on
/// - `workers`: number of actix worker threads (0 = one per CPU core)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

/// Directories shared with the alignment engine.
///
/// The engine reads every `{id}.wav` / `{id}.txt` pair it finds in
/// `audio_dir` and `transcript_dir` and writes `{id}.ctm` into `output_dir`.
/// All three are created at startup if they do not exist yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagingConfig {
    pub audio_dir: PathBuf,
    pub transcript_dir: PathBuf,
    pub output_dir: PathBuf,
}

/// How the external alignment script is launched.
///
/// ## Fields:
/// - `program`: interpreter used to run the script (usually `sh`)
/// - `script`: path of the alignment entry point
/// - `debug`: value of the engine's debug flag, `false` in production
/// - `timeout_secs`: hard limit for one engine run; the child is killed after it
/// - `fail_on_nonzero_exit`: treat a non-zero exit status as a failed job even
///   if an output file exists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub program: String,
    pub script: PathBuf,
    pub debug: bool,
    pub timeout_secs: u64,
    pub fail_on_nonzero_exit: bool,
}

/// Thresholds used by the request validator.
///
/// Sizes are in bytes and both bounds are inclusive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub min_audio_bytes: usize,
    pub max_audio_bytes: usize,
    pub min_transcript_chars: usize,
    pub required_sample_rate: u32,
    pub audio_format: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
                workers: 0,
            },
            staging: StagingConfig {
                audio_dir: PathBuf::from("/opt/kaldi/egs/kohdistus/src_for_wav"),
                transcript_dir: PathBuf::from("/opt/kaldi/egs/kohdistus/src_for_txt"),
                output_dir: PathBuf::from("/opt/kaldi/egs/kohdistus"),
            },
            engine: EngineConfig {
                program: "sh".to_string(),
                script: PathBuf::from("/opt/kaldi/egs/align/aligning_with_Docker/bin/align.sh"),
                debug: false,
                timeout_secs: 600,
                fail_on_nonzero_exit: true,
            },
            limits: LimitsConfig::default(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            // anything smaller is an empty or clipped recording
            min_audio_bytes: 20 * 1024,
            max_audio_bytes: 25 * 1024 * 1024,
            min_transcript_chars: 3,
            // the acoustic models are trained on 16kHz
            required_sample_rate: 16_000,
            audio_format: "LINEAR16".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AppConfig {
    /// Load configuration from multiple sources in priority order.
    ///
    /// ## Environment Variable Examples:
    /// - `APP_SERVER__PORT=3000`: Override server port
    /// - `APP_STAGING__AUDIO_DIR=/data/wav`: Override the audio staging directory
    /// - `APP_ENGINE__TIMEOUT_SECS=120`: Shorter engine timeout
    /// - `HOST=0.0.0.0` / `PORT=3000`: Special cases for deployment platforms
    ///
    /// Nested keys use a double underscore so that field names which contain
    /// an underscore themselves (`audio_dir`, `timeout_secs`) stay intact.
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );

        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// Catching these at startup means a misconfigured deployment fails fast
    /// instead of rejecting every request at runtime.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        let dirs = [
            ("staging.audio_dir", &self.staging.audio_dir),
            ("staging.transcript_dir", &self.staging.transcript_dir),
            ("staging.output_dir", &self.staging.output_dir),
        ];
        for (key, dir) in dirs {
            if dir.as_os_str().is_empty() {
                return Err(anyhow::anyhow!("{} cannot be empty", key));
            }
        }

        if self.staging.audio_dir == self.staging.transcript_dir {
            return Err(anyhow::anyhow!(
                "Audio and transcript staging directories must be distinct"
            ));
        }

        if self.engine.program.trim().is_empty() {
            return Err(anyhow::anyhow!("Engine program cannot be empty"));
        }

        if self.engine.timeout_secs == 0 {
            return Err(anyhow::anyhow!("Engine timeout must be greater than 0"));
        }

        if self.limits.min_audio_bytes > self.limits.max_audio_bytes {
            return Err(anyhow::anyhow!(
                "min_audio_bytes ({}) exceeds max_audio_bytes ({})",
                self.limits.min_audio_bytes,
                self.limits.max_audio_bytes
            ));
        }

        if self.limits.required_sample_rate == 0 {
            return Err(anyhow::anyhow!("Required sample rate must be greater than 0"));
        }

        Ok(())
    }
}
