//! Builds synthetic files for unit tests.

use crate::decoder::{PREAMBLE_LENGTH, SIGNATURE};
use crate::registry::{tags, Tag};
use crate::vr::Vr;

const IMPLICIT: &str = "1.2.840.10008.1.2";
const EXPLICIT: &str = "1.2.840.10008.1.2.1";

#[derive(Debug, Clone)]
pub(crate) struct FileBuilder {
    bytes: Vec<u8>,
    implicit: bool,
}

impl FileBuilder {
    pub fn explicit() -> Self {
        Self::with_transfer_syntax(EXPLICIT)
    }

    pub fn implicit() -> Self {
        Self::with_transfer_syntax(IMPLICIT)
    }

    /// Preamble and signature only; the data set follows directly.
    pub fn without_meta() -> Self {
        let mut bytes = vec![0u8; PREAMBLE_LENGTH];
        bytes.extend_from_slice(SIGNATURE);
        Self {
            bytes,
            implicit: false,
        }
    }

    pub fn with_transfer_syntax(uid: &str) -> Self {
        let mut uid_value = uid.as_bytes().to_vec();
        if uid_value.len() % 2 == 1 {
            uid_value.push(0);
        }
        let ts = explicit_element(tags::TRANSFER_SYNTAX_UID, Vr::UI, &uid_value);
        let group_length = explicit_element(
            tags::FILE_META_INFORMATION_GROUP_LENGTH,
            Vr::UL,
            &(ts.len() as u32).to_le_bytes(),
        );
        let mut builder = Self::without_meta();
        builder.bytes.extend(group_length);
        builder.bytes.extend(ts);
        builder.implicit = uid == IMPLICIT;
        builder
    }

    /// Append an element, padding the value to even length.
    pub fn element(mut self, tag: Tag, vr: Vr, value: &[u8]) -> Self {
        let mut value = value.to_vec();
        if value.len() % 2 == 1 {
            value.push(if vr.is_text() && vr != Vr::UI { b' ' } else { 0 });
        }
        let encoded = if self.implicit {
            implicit_element(tag, &value)
        } else {
            explicit_element(tag, vr, &value)
        };
        self.bytes.extend(encoded);
        self
    }

    /// Append an element header with an undefined length and no value.
    pub fn undefined_length(mut self, tag: Tag, vr: Vr) -> Self {
        self.bytes.extend(tag_bytes(tag));
        if !self.implicit {
            self.bytes.extend(vr.as_str().as_bytes());
            self.bytes.extend([0, 0]);
        }
        self.bytes.extend(0xFFFF_FFFFu32.to_le_bytes());
        self
    }

    /// Append the pixel data element; OB for 8-bit samples, OW otherwise.
    pub fn pixels(self, bits: u16, data: &[u8]) -> Self {
        let vr = if bits == 8 { Vr::OB } else { Vr::OW };
        self.element(tags::PIXEL_DATA, vr, data)
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

fn tag_bytes(tag: Tag) -> impl Iterator<Item = u8> {
    tag.group
        .to_le_bytes()
        .into_iter()
        .chain(tag.element.to_le_bytes())
}

fn explicit_element(tag: Tag, vr: Vr, value: &[u8]) -> Vec<u8> {
    let mut out: Vec<u8> = tag_bytes(tag).collect();
    out.extend(vr.as_str().as_bytes());
    if vr.has_long_length() {
        out.extend([0, 0]);
        out.extend((value.len() as u32).to_le_bytes());
    } else {
        out.extend((value.len() as u16).to_le_bytes());
    }
    out.extend_from_slice(value);
    out
}

fn implicit_element(tag: Tag, value: &[u8]) -> Vec<u8> {
    let mut out: Vec<u8> = tag_bytes(tag).collect();
    out.extend((value.len() as u32).to_le_bytes());
    out.extend_from_slice(value);
    out
}

/// Little endian bytes of 16-bit samples.
pub(crate) fn words(samples: impl IntoIterator<Item = u16>) -> Vec<u8> {
    samples.into_iter().flat_map(u16::to_le_bytes).collect()
}

/// An explicit VR file with the required image pixel attributes, ready for more
/// attributes and then [FileBuilder::pixels].
pub(crate) fn image_header(rows: u16, columns: u16, bits: u16, signed: bool) -> FileBuilder {
    FileBuilder::explicit()
        .element(tags::ROWS, Vr::US, &rows.to_le_bytes())
        .element(tags::COLUMNS, Vr::US, &columns.to_le_bytes())
        .element(tags::BITS_ALLOCATED, Vr::US, &bits.to_le_bytes())
        .element(tags::PIXEL_REPRESENTATION, Vr::US, &u16::from(signed).to_le_bytes())
}
