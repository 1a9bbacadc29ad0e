//! Reads a DICOM Part 10 file into a [Dataset].
//!
//! Only the two uncompressed little endian transfer syntaxes are decoded. Sequences,
//! encapsulated pixel data and anything else which uses undefined lengths is
//! rejected with [DecodeError::UnsupportedEncoding] instead of being skipped.

use bytes::Bytes;

use crate::byte_reader::ByteReader;
use crate::dataset::{Dataset, Element};
use crate::error::DecodeError;
use crate::registry::{self, name_of, tags, Tag};
use crate::vr::Vr;

/// Length of the file preamble which precedes the `DICM` signature.
pub const PREAMBLE_LENGTH: usize = 128;

/// The signature found right after the preamble.
pub const SIGNATURE: &[u8; 4] = b"DICM";

/// Value length which marks an element encoded with delimiters instead of a length.
const UNDEFINED_LENGTH: u32 = 0xFFFF_FFFF;

const IMPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2";
const EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1";
const DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1.99";
const EXPLICIT_VR_BIG_ENDIAN: &str = "1.2.840.10008.1.2.2";

/// How element headers of the main data set are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferSyntax {
    ImplicitVrLittleEndian,
    ExplicitVrLittleEndian,
}

impl TransferSyntax {
    /// Select the transfer syntax for a Transfer Syntax UID.
    ///
    /// Unrecognized UIDs (the encapsulated syntaxes) still have explicit VR little
    /// endian headers. Their pixel data has an undefined length, which the decoder
    /// rejects when it gets there.
    fn from_uid(uid: &str, offset: usize) -> Result<Self, DecodeError> {
        match uid {
            IMPLICIT_VR_LITTLE_ENDIAN => Ok(Self::ImplicitVrLittleEndian),
            EXPLICIT_VR_LITTLE_ENDIAN => Ok(Self::ExplicitVrLittleEndian),
            EXPLICIT_VR_BIG_ENDIAN => Err(DecodeError::unsupported(
                offset,
                "explicit VR big endian transfer syntax",
            )),
            DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN => Err(DecodeError::unsupported(
                offset,
                "deflated transfer syntax",
            )),
            _ => Ok(Self::ExplicitVrLittleEndian),
        }
    }
}

/// Parsing policy of a [ContainerDecoder].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Reject blank VR codes and out-of-order tags instead of tolerating them.
    pub strict: bool,
}

/// The File Meta Information group and the transfer syntax it selected.
#[derive(Debug, Clone)]
pub struct FileMeta {
    pub elements: Dataset,
    pub transfer_syntax: TransferSyntax,
}

impl FileMeta {
    fn fallback() -> Self {
        Self {
            elements: Dataset::new(),
            transfer_syntax: TransferSyntax::ExplicitVrLittleEndian,
        }
    }
}

/// Result of [ContainerDecoder::decode_file].
#[derive(Debug, Clone)]
pub struct DecodedFile {
    pub meta: FileMeta,
    pub dataset: Dataset,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ContainerDecoder {
    options: DecodeOptions,
}

impl ContainerDecoder {
    pub fn new(options: DecodeOptions) -> Self {
        Self { options }
    }

    /// Decode the main data set of a file.
    pub fn decode(&self, bytes: impl Into<Bytes>) -> Result<Dataset, DecodeError> {
        self.decode_file(bytes).map(|file| file.dataset)
    }

    /// Decode a file, keeping its File Meta Information.
    pub fn decode_file(&self, bytes: impl Into<Bytes>) -> Result<DecodedFile, DecodeError> {
        let mut reader = ByteReader::new(bytes.into());
        check_signature(&mut reader)?;
        let body_start = reader.position();

        let meta = match self.read_file_meta(&mut reader) {
            Ok(Some(meta)) => meta,
            Ok(None) => FileMeta::fallback(),
            Err(e @ DecodeError::UnsupportedEncoding { .. }) => return Err(e),
            Err(e) => {
                tracing::warn!(
                    event = "decode",
                    error = e.to_string(),
                    "unreadable file meta information, assuming explicit VR little endian"
                );
                reader.seek(body_start);
                FileMeta::fallback()
            }
        };

        let dataset = self.read_dataset(&mut reader, meta.transfer_syntax)?;
        tracing::debug!(
            event = "decode",
            transfer_syntax = ?meta.transfer_syntax,
            elements = dataset.len(),
            trailing_bytes = reader.remaining()
        );
        Ok(DecodedFile { meta, dataset })
    }

    /// Read the group 0002 elements, which are always explicit VR little endian.
    ///
    /// Returns `None` if there is no file meta group or it does not name a transfer syntax.
    fn read_file_meta(&self, reader: &mut ByteReader) -> Result<Option<FileMeta>, DecodeError> {
        let mut elements = Dataset::new();
        while reader.remaining() >= 4 {
            if reader.peek_u16("reading file meta information")? != 0x0002 {
                break;
            }
            let element = self.read_element(reader, TransferSyntax::ExplicitVrLittleEndian)?;
            elements.insert(element);
        }

        let Some(uid_element) = elements.get(tags::TRANSFER_SYNTAX_UID) else {
            if !elements.is_empty() {
                tracing::warn!(event = "decode", "file meta information has no transfer syntax");
            }
            return Ok(None);
        };
        let uid = uid_element.text();
        if uid.is_empty() {
            return Ok(None);
        }
        let transfer_syntax = TransferSyntax::from_uid(&uid, reader.position())?;
        Ok(Some(FileMeta {
            elements,
            transfer_syntax,
        }))
    }

    fn read_dataset(
        &self,
        reader: &mut ByteReader,
        syntax: TransferSyntax,
    ) -> Result<Dataset, DecodeError> {
        let mut dataset = Dataset::new();
        let mut previous: Option<Tag> = None;
        while !reader.is_at_end() {
            let offset = reader.position();
            let element = self.read_element(reader, syntax)?;
            let tag = element.tag;
            if self.options.strict && previous.is_some_and(|p| p >= tag) {
                return Err(DecodeError::malformed(
                    offset,
                    format!("{} is not in ascending order", name_of(tag)),
                ));
            }
            previous = Some(tag);
            if dataset.insert(element).is_some() {
                tracing::debug!(event = "decode", tag = %tag, "duplicate tag replaced");
            }
            if tag == tags::PIXEL_DATA {
                break;
            }
        }
        Ok(dataset)
    }

    fn read_element(
        &self,
        reader: &mut ByteReader,
        syntax: TransferSyntax,
    ) -> Result<Element, DecodeError> {
        let offset = reader.position();
        let group = reader.read_u16("reading data element tag")?;
        let element = reader.read_u16("reading data element tag")?;
        let tag = Tag::new(group, element);

        if tag.group == 0xFFFE {
            return Err(DecodeError::unsupported(
                offset,
                format!("sequence item {tag} outside of a supported element"),
            ));
        }

        let (vr, length) = match syntax {
            TransferSyntax::ExplicitVrLittleEndian => self.read_explicit_vr_and_length(reader, tag)?,
            TransferSyntax::ImplicitVrLittleEndian => (
                registry::implicit_vr(tag),
                reader.read_u32("reading implicit VR value length")?,
            ),
        };

        if length == UNDEFINED_LENGTH {
            return Err(DecodeError::unsupported(
                offset,
                format!(
                    "{} ({vr}) has undefined length; sequences and encapsulated pixel data are not supported",
                    name_of(tag)
                ),
            ));
        }
        let length = length as usize;
        if let Some(width) = vr.fixed_width() {
            if length % width != 0 {
                return Err(DecodeError::malformed(
                    offset,
                    format!(
                        "{} has VR {vr} but its length {length} is not a multiple of {width}",
                        name_of(tag)
                    ),
                ));
            }
        }

        let bytes = reader.read(length, &format!("reading value of {}", name_of(tag)))?;
        Ok(Element { tag, vr, bytes })
    }

    fn read_explicit_vr_and_length(
        &self,
        reader: &mut ByteReader,
        tag: Tag,
    ) -> Result<(Vr, u32), DecodeError> {
        let offset = reader.position();
        let code = reader.peek(2, "reading explicit VR")?;
        let code = [code[0], code[1]];
        let vr = match Vr::from_bytes(code) {
            Some(vr) => vr,
            // Blank VRs have been seen in the wild.
            None if !self.options.strict && matches!(&code, b"  " | b"\0\0") => Vr::UN,
            None => {
                return Err(DecodeError::malformed(
                    offset,
                    format!(
                        "unrecognized VR {:?} for {}",
                        String::from_utf8_lossy(&code),
                        name_of(tag)
                    ),
                ));
            }
        };
        reader.skip(2, "reading explicit VR")?;

        let length = if vr.has_long_length() {
            reader.skip(2, "reading reserved bytes")?;
            reader.read_u32("reading value length")?
        } else {
            u32::from(reader.read_u16("reading value length")?)
        };
        Ok((vr, length))
    }
}

fn check_signature(reader: &mut ByteReader) -> Result<(), DecodeError> {
    match reader.peek(PREAMBLE_LENGTH + SIGNATURE.len(), "reading file header") {
        Ok(header) if &header[PREAMBLE_LENGTH..] == SIGNATURE => {
            reader.skip(PREAMBLE_LENGTH + SIGNATURE.len(), "reading file header")
        }
        _ => Err(DecodeError::Format),
    }
}
