use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, ErrorKind, PixelError, StatusClass};
use crate::metadata::MetadataRecord;

/// Everything produced for one request which got past decoding.
///
/// There is no error field: a fatal error is the `Err` side of the outcome and only
/// shows up in the [Envelope].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub metadata: MetadataRecord,
    /// PNG encoded preview. `None` when the pixel data could not be turned into one.
    #[serde(with = "base64_png")]
    pub preview_png: Option<Vec<u8>>,
    /// Why there is no preview.
    pub warning: Option<ErrorKind>,
}

/// Combine extracted metadata with the outcome of the preview stages.
///
/// A pixel error becomes a warning on an otherwise successful result.
pub fn assemble(metadata: MetadataRecord, preview: Result<Vec<u8>, PixelError>) -> AnalysisResult {
    match preview {
        Ok(png) => AnalysisResult {
            metadata,
            preview_png: Some(png),
            warning: None,
        },
        Err(e) => AnalysisResult {
            metadata,
            preview_png: None,
            warning: Some(e.kind()),
        },
    }
}

/// The JSON object handed to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MetadataRecord>,
    pub image_preview_base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Envelope {
    pub fn from_outcome(outcome: &Result<AnalysisResult, AnalysisError>) -> Self {
        match outcome {
            Ok(result) => Self {
                metadata: Some(result.metadata.clone()),
                image_preview_base64: result.preview_png.as_deref().map(base64_png::encode),
                warning: result.warning,
                error: None,
                message: None,
            },
            Err(e) => Self {
                metadata: None,
                image_preview_base64: None,
                warning: None,
                error: Some(e.kind()),
                message: Some(e.safe_message()),
            },
        }
    }

    pub fn status(&self) -> StatusClass {
        self.error
            .map(ErrorKind::status_class)
            .unwrap_or(StatusClass::Success)
    }
}

mod base64_png {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn encode(png: &[u8]) -> String {
        STANDARD.encode(png)
    }

    pub fn serialize<S: Serializer>(png: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match png {
            Some(png) => serializer.serialize_some(&encode(png)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|s| STANDARD.decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
