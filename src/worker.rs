//! Where the pipeline actually runs: a child process or the blocking thread pool.

use std::future::Future;
use std::process::Stdio;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::OwnedSemaphorePermit;

use crate::decoder::DecodeOptions;
use crate::engine::{analyze, AnalysisEngine, DicomEngine};
use crate::error::{AnalysisError, DecodeError, ErrorKind};
use crate::result::AnalysisResult;
use crate::types::RequestId;

/// Most of a worker's stderr kept for the logs.
const STDERR_LIMIT: usize = 64 * 1024;

/// Runs the pipeline over one staged file.
///
/// `admission` is the pool slot the run occupies. It must be held until the work has
/// really stopped, including work which outlives a dropped `analyze` future.
pub trait Worker: Send + Sync {
    fn analyze(
        &self,
        request: &RequestId,
        path: &Utf8Path,
        admission: Admission,
    ) -> impl Future<Output = Result<AnalysisResult, AnalysisError>> + Send;
}

/// One slot of the worker pool. Dropping it lets the next request in.
#[derive(Debug)]
pub struct Admission {
    _permit: Option<OwnedSemaphorePermit>,
}

impl Admission {
    pub(crate) fn new(permit: OwnedSemaphorePermit) -> Self {
        Self {
            _permit: Some(permit),
        }
    }

    /// A slot outside of any pool, for calling a worker directly.
    pub fn detached() -> Self {
        Self { _permit: None }
    }
}

/// Runs the pipeline on tokio's blocking thread pool.
#[derive(Debug)]
pub struct InProcessWorker<E = DicomEngine> {
    engine: Arc<E>,
}

impl<E: AnalysisEngine + 'static> InProcessWorker<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

impl<E: AnalysisEngine + 'static> Worker for InProcessWorker<E> {
    async fn analyze(
        &self,
        request: &RequestId,
        path: &Utf8Path,
        admission: Admission,
    ) -> Result<AnalysisResult, AnalysisError> {
        let bytes = fs_err::tokio::read(path).await?;
        let engine = Arc::clone(&self.engine);
        // a timed out caller stops waiting but the thread runs to completion
        tokio::task::spawn_blocking(move || {
            let _admission = admission;
            analyze(engine.as_ref(), bytes)
        })
        .await
        .map_err(|e| {
            tracing::error!(event = "worker", request = %request, error = %e);
            AnalysisError::execution(format!("pipeline task failed: {e}"))
        })?
    }
}

/// Runs the pipeline in a child process: `<program> worker -- <path>`.
///
/// The child is killed when the future is dropped, so a timeout in the caller
/// terminates it.
#[derive(Debug, Clone)]
pub struct ProcessWorker {
    program: Utf8PathBuf,
    options: DecodeOptions,
    memory_limit: Option<u64>,
    max_reply_bytes: usize,
}

impl ProcessWorker {
    pub fn new(program: impl Into<Utf8PathBuf>, max_reply_bytes: usize) -> Self {
        Self {
            program: program.into(),
            options: DecodeOptions::default(),
            memory_limit: None,
            max_reply_bytes,
        }
    }

    /// A worker which runs the executable of the current process.
    pub fn current_exe(max_reply_bytes: usize) -> std::io::Result<Self> {
        let exe = std::env::current_exe()?;
        let exe = Utf8PathBuf::from_path_buf(exe).map_err(|p| {
            std::io::Error::other(format!("executable path is not UTF-8: {p:?}"))
        })?;
        Ok(Self::new(exe, max_reply_bytes))
    }

    pub fn with_options(mut self, options: DecodeOptions) -> Self {
        self.options = options;
        self
    }

    /// Limit the address space of the child process (unix only).
    pub fn with_memory_limit(mut self, bytes: u64) -> Self {
        self.memory_limit = Some(bytes);
        self
    }

    fn command(&self, path: &Utf8Path) -> Command {
        let mut command = Command::new(&self.program);
        command.arg("worker");
        if self.options.strict {
            command.arg("--strict");
        }
        command.arg("--").arg(path.as_str());
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(bytes) = self.memory_limit {
            limit_address_space(&mut command, bytes);
        }
        command
    }
}

impl Worker for ProcessWorker {
    async fn analyze(
        &self,
        request: &RequestId,
        path: &Utf8Path,
        _admission: Admission,
    ) -> Result<AnalysisResult, AnalysisError> {
        let mut child = self.command(path).spawn().map_err(|e| {
            tracing::error!(event = "worker", request = %request, program = %self.program, error = %e);
            AnalysisError::execution(format!("could not start worker: {e}"))
        })?;
        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(AnalysisError::execution("worker pipes were not captured"));
        };
        let stderr_task = tokio::spawn(drain_capped(stderr, STDERR_LIMIT));

        let mut reply = Vec::new();
        let limit = self.max_reply_bytes as u64 + 1;
        if let Err(e) = stdout.take(limit).read_to_end(&mut reply).await {
            return Err(AnalysisError::execution(format!("could not read worker reply: {e}")));
        }
        if reply.len() > self.max_reply_bytes {
            let _ = child.start_kill();
            tracing::error!(
                event = "worker",
                request = %request,
                max_reply_bytes = self.max_reply_bytes,
                "worker reply too large"
            );
            return Err(AnalysisError::execution("worker reply too large"));
        }

        let status = child
            .wait()
            .await
            .map_err(|e| AnalysisError::execution(format!("could not wait for worker: {e}")))?;
        let diagnostics = stderr_task.await.unwrap_or_default();
        if !status.success() {
            tracing::error!(
                event = "worker",
                request = %request,
                status = %status,
                stderr = %String::from_utf8_lossy(&diagnostics)
            );
            return Err(AnalysisError::execution(format!("worker exited with {status}")));
        }
        if !diagnostics.is_empty() {
            tracing::debug!(event = "worker", request = %request, stderr = %String::from_utf8_lossy(&diagnostics));
        }

        let reply: WorkerReply = serde_json::from_slice(&reply).map_err(|e| {
            tracing::error!(event = "worker", request = %request, error = %e, "unparseable reply");
            AnalysisError::execution(format!("unparseable worker reply: {e}"))
        })?;
        reply.into_result()
    }
}

/// Read everything from `reader`, keeping at most `cap` bytes.
///
/// Reading past the cap keeps the child from blocking on a full pipe.
async fn drain_capped<R: AsyncRead + Unpin>(mut reader: R, cap: usize) -> Vec<u8> {
    let mut kept = Vec::new();
    let mut chunk = [0u8; 8192];
    while let Ok(n) = reader.read(&mut chunk).await {
        if n == 0 {
            break;
        }
        let room = cap.saturating_sub(kept.len());
        kept.extend_from_slice(&chunk[..n.min(room)]);
    }
    kept
}

#[cfg(unix)]
fn limit_address_space(command: &mut Command, bytes: u64) {
    let limit = libc::rlimit {
        rlim_cur: bytes as libc::rlim_t,
        rlim_max: bytes as libc::rlim_t,
    };
    // SAFETY: setrlimit is async-signal-safe and the closure does not allocate.
    unsafe {
        command.pre_exec(move || {
            if libc::setrlimit(libc::RLIMIT_AS, &limit) == 0 {
                Ok(())
            } else {
                Err(std::io::Error::last_os_error())
            }
        });
    }
}

#[cfg(not(unix))]
fn limit_address_space(_command: &mut Command, _bytes: u64) {}

/// What a worker process prints to stdout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerReply {
    Success(AnalysisResult),
    /// The file could not be decoded.
    Rejected(DecodeError),
    /// The worker could not finish. Details stay in the worker's own log.
    Failed(ErrorKind),
}

impl WorkerReply {
    pub fn into_result(self) -> Result<AnalysisResult, AnalysisError> {
        match self {
            WorkerReply::Success(result) => Ok(result),
            WorkerReply::Rejected(e) => Err(AnalysisError::Decode(e)),
            WorkerReply::Failed(ErrorKind::IOError) => Err(AnalysisError::Io(
                std::io::Error::other("worker could not read the staged file"),
            )),
            WorkerReply::Failed(kind) => Err(AnalysisError::execution(format!("worker reported {kind}"))),
        }
    }
}

impl From<Result<AnalysisResult, AnalysisError>> for WorkerReply {
    fn from(outcome: Result<AnalysisResult, AnalysisError>) -> Self {
        match outcome {
            Ok(result) => WorkerReply::Success(result),
            Err(AnalysisError::Decode(e)) => WorkerReply::Rejected(e),
            Err(e) => WorkerReply::Failed(e.kind()),
        }
    }
}

/// Child side of [ProcessWorker]: analyze the file at `path`.
pub fn run_worker(path: &Utf8Path, options: DecodeOptions) -> WorkerReply {
    let outcome = fs_err::read(path)
        .map_err(AnalysisError::from)
        .and_then(|bytes| analyze(&DicomEngine::new(options), bytes));
    if let Err(e) = &outcome {
        tracing::warn!(event = "worker", path = %path, kind = %e.kind(), error = %e);
    }
    outcome.into()
}
