use camino::{Utf8Path, Utf8PathBuf};

use crate::sanitize::sanitize;

/// An uploaded file on disk which belongs to exactly one request.
///
/// The file is deleted by [StagedFile::remove], or when the guard is dropped if that
/// was never called (cancellation, panic).
#[derive(Debug)]
pub struct StagedFile {
    path: Utf8PathBuf,
    removed: bool,
}

impl StagedFile {
    /// Take ownership of an existing file.
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            removed: false,
        }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Delete the file. A file which is already gone counts as removed.
    pub fn remove(mut self) -> std::io::Result<()> {
        self.removed = true;
        remove_if_exists(&self.path)
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        match remove_if_exists(&self.path) {
            Ok(()) => tracing::debug!(event = "cleanup", path = %self.path, "removed on drop"),
            Err(e) => tracing::error!(event = "cleanup", path = %self.path, error = %e),
        }
    }
}

fn remove_if_exists(path: &Utf8Path) -> std::io::Result<()> {
    match fs_err::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Write an upload to `dir/<ulid>-<sanitized name>`.
///
/// If writing fails, whatever part of the file was created is removed.
pub async fn stage(
    dir: &Utf8Path,
    original_name: &str,
    bytes: &[u8],
) -> std::io::Result<StagedFile> {
    fs_err::tokio::create_dir_all(dir).await?;
    let name = match sanitize(original_name) {
        s if s.is_empty() => "upload".to_string(),
        s => s,
    };
    let staged = StagedFile::new(dir.join(format!("{}-{name}", ulid::Ulid::new())));
    fs_err::tokio::write(staged.path(), bytes).await?;
    tracing::debug!(event = "stage", path = %staged.path(), bytes = bytes.len());
    Ok(staged)
}
