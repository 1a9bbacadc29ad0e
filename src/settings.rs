//! Analyzer settings, which are configurable using environment variables.
use crate::config::get_config;
use crate::decoder::DecodeOptions;
use camino::Utf8PathBuf;
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzerSettings {
    /// Wall-clock deadline for one request.
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,
    /// Maximum number of requests processed at the same time.
    #[serde(default = "default_workers")]
    pub workers: NonZeroUsize,
    /// Address space limit of process workers, in bytes.
    #[serde(default = "default_memory_limit")]
    pub memory_limit: u64,
    #[serde(default = "default_max_reply_bytes")]
    pub max_reply_bytes: usize,
    #[serde(default = "default_staging_dir")]
    pub staging_dir: Utf8PathBuf,
    #[serde(default)]
    pub isolation: Isolation,
    /// Reject files which do not follow the standard to the letter.
    #[serde(default)]
    pub strict: bool,
}

/// Where the pipeline runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Isolation {
    /// A child process per request.
    #[default]
    Process,
    /// Tokio's blocking thread pool.
    InProcess,
}

impl AnalyzerSettings {
    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            strict: self.strict,
        }
    }
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            workers: default_workers(),
            memory_limit: default_memory_limit(),
            max_reply_bytes: default_max_reply_bytes(),
            staging_dir: default_staging_dir(),
            isolation: Isolation::default(),
            strict: false,
        }
    }
}

/// Read [AnalyzerSettings] from `MEDPROMPT_*` environment variables.
pub fn from_env() -> Result<AnalyzerSettings, figment::Error> {
    get_config().extract()
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_workers() -> NonZeroUsize {
    std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}

fn default_memory_limit() -> u64 {
    1 << 30
}

fn default_max_reply_bytes() -> usize {
    50 * 1024 * 1024
}

fn default_staging_dir() -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(std::env::temp_dir())
        .unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
        .join("medprompt")
}
