mod boundary;
mod byte_reader;
mod config;
mod dataset;
mod decoder;
mod engine;
mod error;
mod metadata;
mod pixel;
mod raster;
mod registry;
mod result;
mod sanitize;
mod settings;
mod staged_file;
#[cfg(test)]
mod testing;
mod types;
mod vr;
mod worker;

pub use boundary::ExecutionBoundary;
pub use config::get_config;
pub use dataset::{Dataset, Element};
pub use decoder::{ContainerDecoder, DecodeOptions, DecodedFile, FileMeta, TransferSyntax};
pub use engine::{analyze, AnalysisEngine, DicomEngine};
pub use error::{AnalysisError, DecodeError, EncodeError, ErrorKind, PixelError, StatusClass};
pub use metadata::{MetadataRecord, NOT_AVAILABLE};
pub use pixel::{normalize, process, PixelBuffer, MID_GRAY};
pub use raster::{encode_png, NormalizedRaster};
pub use registry::{implicit_vr, lookup, name_of, tags, Multiplicity, Tag, TagInfo};
pub use result::{assemble, AnalysisResult, Envelope};
pub use settings::{from_env as settings_from_env, AnalyzerSettings, Isolation};
pub use staged_file::{stage, StagedFile};
pub use types::RequestId;
pub use vr::Vr;
pub use worker::{run_worker, Admission, InProcessWorker, ProcessWorker, Worker, WorkerReply};
