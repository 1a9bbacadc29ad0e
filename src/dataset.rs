use std::collections::HashMap;

use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;

use crate::registry::Tag;
use crate::vr::Vr;

/// One decoded data element. The value is kept as the raw bytes read from the stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: Tag,
    pub vr: Vr,
    pub bytes: Bytes,
}

impl Element {
    pub fn new(tag: Tag, vr: Vr, bytes: impl Into<Bytes>) -> Self {
        Self {
            tag,
            vr,
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The value as text with its padding stripped.
    ///
    /// Character sets other than ASCII/UTF-8 are not supported, invalid sequences
    /// are replaced.
    pub fn text(&self) -> String {
        let raw = String::from_utf8_lossy(&self.bytes);
        self.vr.trim_text(&raw).to_string()
    }

    /// The first of a multi-valued (backslash separated) text value.
    pub fn first_text(&self) -> String {
        let text = self.text();
        match text.split_once('\\') {
            Some((first, _)) => self.vr.trim_text(first).to_string(),
            None => text,
        }
    }

    /// First value as an unsigned integer.
    pub fn uint(&self) -> Option<u32> {
        match self.vr {
            Vr::US | Vr::OW if self.bytes.len() >= 2 => {
                Some(u32::from(LittleEndian::read_u16(&self.bytes)))
            }
            Vr::UL if self.bytes.len() >= 4 => Some(LittleEndian::read_u32(&self.bytes)),
            Vr::SS if self.bytes.len() >= 2 => u32::try_from(LittleEndian::read_i16(&self.bytes)).ok(),
            Vr::SL if self.bytes.len() >= 4 => u32::try_from(LittleEndian::read_i32(&self.bytes)).ok(),
            Vr::IS | Vr::DS => self.first_text().parse().ok(),
            _ => None,
        }
    }

    /// First value as a float.
    pub fn float(&self) -> Option<f64> {
        match self.vr {
            Vr::DS | Vr::IS => self.first_text().parse().ok(),
            Vr::FD if self.bytes.len() >= 8 => Some(LittleEndian::read_f64(&self.bytes)),
            Vr::FL if self.bytes.len() >= 4 => Some(f64::from(LittleEndian::read_f32(&self.bytes))),
            _ => self.uint().map(f64::from),
        }
    }
}

/// Elements of one decoded file, looked up by tag.
///
/// Iteration follows stream order. A repeated tag replaces the earlier value in place.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    elements: Vec<Element>,
    index: HashMap<Tag, usize>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an element, returning the element it replaced.
    pub fn insert(&mut self, element: Element) -> Option<Element> {
        match self.index.get(&element.tag) {
            Some(&i) => Some(std::mem::replace(&mut self.elements[i], element)),
            None => {
                self.index.insert(element.tag, self.elements.len());
                self.elements.push(element);
                None
            }
        }
    }

    pub fn get(&self, tag: Tag) -> Option<&Element> {
        self.index.get(&tag).map(|&i| &self.elements[i])
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.index.contains_key(&tag)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }
}

impl FromIterator<Element> for Dataset {
    fn from_iter<I: IntoIterator<Item = Element>>(iter: I) -> Self {
        let mut dataset = Dataset::new();
        for element in iter {
            dataset.insert(element);
        }
        dataset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tags;
    use rstest::*;

    #[test]
    fn test_last_write_wins_in_stream_position() {
        let dataset: Dataset = [
            Element::new(tags::PATIENT_ID, Vr::LO, &b"first"[..]),
            Element::new(tags::MODALITY, Vr::CS, &b"CT"[..]),
            Element::new(tags::PATIENT_ID, Vr::LO, &b"second"[..]),
        ]
        .into_iter()
        .collect();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.get(tags::PATIENT_ID).unwrap().text(), "second");
        let order: Vec<_> = dataset.iter().map(|e| e.tag).collect();
        assert_eq!(order, vec![tags::PATIENT_ID, tags::MODALITY]);
    }

    #[rstest]
    #[case(Vr::US, vec![0x00, 0x02], Some(512))]
    #[case(Vr::UL, vec![0x01, 0x00, 0x01, 0x00], Some(65537))]
    #[case(Vr::IS, b"12 ".to_vec(), Some(12))]
    #[case(Vr::IS, b"3\\4 ".to_vec(), Some(3))]
    #[case(Vr::SS, vec![0xFF, 0xFF], None)]
    #[case(Vr::US, vec![0x01], None)]
    #[case(Vr::LO, b"12".to_vec(), None)]
    fn test_uint(#[case] vr: Vr, #[case] bytes: Vec<u8>, #[case] expected: Option<u32>) {
        let element = Element::new(tags::ROWS, vr, bytes);
        assert_eq!(element.uint(), expected)
    }

    #[rstest]
    #[case(Vr::DS, b"0.5 ".to_vec(), Some(0.5))]
    #[case(Vr::DS, b" -1024".to_vec(), Some(-1024.0))]
    #[case(Vr::DS, b"2\\3".to_vec(), Some(2.0))]
    #[case(Vr::DS, b"abc".to_vec(), None)]
    #[case(Vr::FD, 1.25f64.to_le_bytes().to_vec(), Some(1.25))]
    fn test_float(#[case] vr: Vr, #[case] bytes: Vec<u8>, #[case] expected: Option<f64>) {
        let element = Element::new(tags::RESCALE_SLOPE, vr, bytes);
        assert_eq!(element.float(), expected)
    }
}
