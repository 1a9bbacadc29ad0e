use bytes::Bytes;

use crate::dataset::Dataset;
use crate::decoder::{ContainerDecoder, DecodeOptions};
use crate::error::{AnalysisError, DecodeError, EncodeError, PixelError};
use crate::metadata::MetadataRecord;
use crate::pixel;
use crate::raster::{encode_png, NormalizedRaster};
use crate::result::{assemble, AnalysisResult};

/// The stages of turning an uploaded file into an [AnalysisResult].
///
/// Workers only depend on this trait, so a different decoding policy or format
/// version can be swapped in without touching them.
pub trait AnalysisEngine: Send + Sync {
    fn decode(&self, bytes: Bytes) -> Result<Dataset, DecodeError>;

    fn extract(&self, dataset: &Dataset) -> MetadataRecord;

    fn normalize(&self, dataset: &Dataset) -> Result<NormalizedRaster, PixelError>;

    fn encode(&self, raster: &NormalizedRaster) -> Result<Vec<u8>, EncodeError>;
}

/// Uncompressed little endian DICOM files.
#[derive(Debug, Clone, Copy, Default)]
pub struct DicomEngine {
    decoder: ContainerDecoder,
}

impl DicomEngine {
    pub fn new(options: DecodeOptions) -> Self {
        Self {
            decoder: ContainerDecoder::new(options),
        }
    }
}

impl AnalysisEngine for DicomEngine {
    fn decode(&self, bytes: Bytes) -> Result<Dataset, DecodeError> {
        self.decoder.decode(bytes)
    }

    fn extract(&self, dataset: &Dataset) -> MetadataRecord {
        MetadataRecord::extract(dataset)
    }

    fn normalize(&self, dataset: &Dataset) -> Result<NormalizedRaster, PixelError> {
        pixel::process(dataset)
    }

    fn encode(&self, raster: &NormalizedRaster) -> Result<Vec<u8>, EncodeError> {
        encode_png(raster)
    }
}

/// Run every stage of `engine` over the contents of one file.
///
/// Decode errors end the analysis. A pixel error only drops the preview.
pub fn analyze<E: AnalysisEngine + ?Sized>(
    engine: &E,
    bytes: impl Into<Bytes>,
) -> Result<AnalysisResult, AnalysisError> {
    let dataset = engine.decode(bytes.into())?;
    let metadata = engine.extract(&dataset);
    let preview = match engine.normalize(&dataset) {
        Ok(raster) => Ok(engine.encode(&raster)?),
        Err(e) => {
            tracing::info!(event = "pixel", kind = %e.kind(), details = %e);
            Err(e)
        }
    };
    Ok(assemble(metadata, preview))
}
