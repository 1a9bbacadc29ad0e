use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Coarse failure kinds which are visible to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    FormatError,
    DecodeError,
    UnsupportedEncodingError,
    MissingPixelDataError,
    UnsupportedFormatError,
    ExecutionError,
    IOError,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::FormatError => "FormatError",
            ErrorKind::DecodeError => "DecodeError",
            ErrorKind::UnsupportedEncodingError => "UnsupportedEncodingError",
            ErrorKind::MissingPixelDataError => "MissingPixelDataError",
            ErrorKind::UnsupportedFormatError => "UnsupportedFormatError",
            ErrorKind::ExecutionError => "ExecutionError",
            ErrorKind::IOError => "IOError",
        }
    }

    /// How the collaborator layer should report a request which ended with this kind.
    pub fn status_class(self) -> StatusClass {
        match self {
            ErrorKind::FormatError
            | ErrorKind::DecodeError
            | ErrorKind::UnsupportedEncodingError => StatusClass::ClientError,
            ErrorKind::MissingPixelDataError | ErrorKind::UnsupportedFormatError => {
                StatusClass::Success
            }
            ErrorKind::ExecutionError | ErrorKind::IOError => StatusClass::ServerError,
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    ClientError,
    ServerError,
}

impl StatusClass {
    pub fn http_status(self) -> u16 {
        match self {
            StatusClass::Success => 200,
            StatusClass::ClientError => 400,
            StatusClass::ServerError => 500,
        }
    }
}

/// Failure to decode the container. Always fatal to the request.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DecodeError {
    #[error("file does not have the DICM signature at byte offset 128")]
    Format,

    #[error("malformed data element stream at byte offset {offset}: {details}")]
    Malformed { offset: usize, details: String },

    #[error("unsupported encoding at byte offset {offset}: {details}")]
    UnsupportedEncoding { offset: usize, details: String },
}

impl DecodeError {
    pub(crate) fn malformed(offset: usize, details: impl Into<String>) -> Self {
        Self::Malformed {
            offset,
            details: details.into(),
        }
    }

    pub(crate) fn unsupported(offset: usize, details: impl Into<String>) -> Self {
        Self::UnsupportedEncoding {
            offset,
            details: details.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DecodeError::Format => ErrorKind::FormatError,
            DecodeError::Malformed { .. } => ErrorKind::DecodeError,
            DecodeError::UnsupportedEncoding { .. } => ErrorKind::UnsupportedEncodingError,
        }
    }
}

/// Failure to produce a preview raster. Degrades the result instead of failing it.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PixelError {
    #[error("file has no pixel data")]
    MissingPixelData,

    #[error("unsupported pixel data: {0}")]
    UnsupportedFormat(String),
}

impl PixelError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PixelError::MissingPixelData => ErrorKind::MissingPixelDataError,
            PixelError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormatError,
        }
    }
}

/// Failure to encode a raster as PNG.
#[derive(thiserror::Error, Debug)]
#[error("could not encode preview: {0}")]
pub struct EncodeError(#[from] pub image::ImageError);

/// Error which ends a request without a result.
#[derive(thiserror::Error, Debug)]
pub enum AnalysisError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("processing did not finish: {0}")]
    Execution(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AnalysisError {
    pub(crate) fn execution(details: impl Into<String>) -> Self {
        Self::Execution(details.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::Decode(e) => e.kind(),
            AnalysisError::Execution(_) => ErrorKind::ExecutionError,
            AnalysisError::Io(_) => ErrorKind::IOError,
        }
    }

    /// A message which is safe to show to the caller.
    ///
    /// Decode errors describe the input, which the caller already has. Execution and
    /// IO errors may mention paths or worker diagnostics, so they are replaced with a
    /// fixed text.
    pub fn safe_message(&self) -> String {
        match self {
            AnalysisError::Decode(e) => e.to_string(),
            AnalysisError::Execution(_) => "The file could not be processed in time.".to_string(),
            AnalysisError::Io(_) => "The uploaded file could not be staged or cleaned up.".to_string(),
        }
    }
}

impl From<EncodeError> for AnalysisError {
    fn from(e: EncodeError) -> Self {
        AnalysisError::Execution(e.to_string())
    }
}
