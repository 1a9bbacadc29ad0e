use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use tokio::sync::Semaphore;

use crate::error::AnalysisError;
use crate::result::AnalysisResult;
use crate::staged_file::{stage, StagedFile};
use crate::types::RequestId;
use crate::worker::{Admission, Worker};

/// Runs one analysis per staged file on a [Worker], under a deadline, with at most
/// `workers` analyses in flight.
///
/// Whatever the outcome, the staged file does not exist any more once
/// [ExecutionBoundary::run] returns. A run which timed out keeps its pool slot until
/// the worker has really stopped.
pub struct ExecutionBoundary<W> {
    worker: W,
    permits: Arc<Semaphore>,
    timeout: Duration,
    staging_dir: Utf8PathBuf,
}

impl<W: Worker> ExecutionBoundary<W> {
    pub fn new(
        worker: W,
        workers: NonZeroUsize,
        timeout: Duration,
        staging_dir: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            worker,
            permits: Arc::new(Semaphore::new(workers.get())),
            timeout,
            staging_dir: staging_dir.into(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn staging_dir(&self) -> &Utf8Path {
        &self.staging_dir
    }

    /// Analyze the file at `path`, which this call takes ownership of and deletes.
    pub async fn run(
        &self,
        path: impl Into<Utf8PathBuf>,
        timeout: Duration,
    ) -> Result<AnalysisResult, AnalysisError> {
        self.run_staged(StagedFile::new(path), timeout).await
    }

    /// Stage an upload in the staging directory, then [ExecutionBoundary::run] it with
    /// the configured timeout.
    pub async fn run_bytes(
        &self,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<AnalysisResult, AnalysisError> {
        let staged = stage(&self.staging_dir, original_name, bytes)
            .await
            .inspect_err(|e| tracing::error!(event = "stage", dir = %self.staging_dir, error = %e))?;
        self.run_staged(staged, self.timeout).await
    }

    async fn run_staged(
        &self,
        staged: StagedFile,
        timeout: Duration,
    ) -> Result<AnalysisResult, AnalysisError> {
        let request = RequestId::generate();
        tracing::info!(event = "analyze", request = %request, path = %staged.path());
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| AnalysisError::execution("worker pool is closed"))?;

        let started = Instant::now();
        let analysis = self
            .worker
            .analyze(&request, staged.path(), Admission::new(permit));
        let outcome = match tokio::time::timeout(timeout, analysis).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(event = "timeout", request = %request, timeout = ?timeout);
                Err(AnalysisError::execution(format!("deadline of {timeout:?} exceeded")))
            }
        };
        let elapsed = started.elapsed();

        let outcome = match (outcome, staged.remove()) {
            (outcome, Ok(())) => outcome,
            (Ok(_), Err(e)) => {
                tracing::error!(event = "cleanup", request = %request, error = %e);
                Err(AnalysisError::Io(e))
            }
            (Err(failure), Err(e)) => {
                tracing::error!(event = "cleanup", request = %request, error = %e);
                Err(failure)
            }
        };
        match &outcome {
            Ok(result) => tracing::info!(
                event = "analyze",
                request = %request,
                elapsed = ?elapsed,
                preview = result.preview_png.is_some(),
                warning = result.warning.map(|w| w.as_str())
            ),
            Err(e) => tracing::warn!(
                event = "analyze",
                request = %request,
                elapsed = ?elapsed,
                kind = %e.kind(),
                error = %e
            ),
        }
        outcome
    }
}
