//! Static registry of the data element tags this crate knows how to interpret.
//!
//! Implicit VR data sets carry no VR in their element headers, so the decoder looks
//! up the VR here. Metadata and pixel extraction use the same table for names and
//! expected multiplicities.

use std::fmt::Display;

use crate::vr::Vr;

/// A data element tag, i.e. a (group, element) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag {
    pub group: u16,
    pub element: u16,
}

impl Tag {
    pub const fn new(group: u16, element: u16) -> Self {
        Self { group, element }
    }

    /// Group length tags, `(gggg,0000)`.
    pub fn is_group_length(self) -> bool {
        self.element == 0x0000
    }

    pub fn is_file_meta(self) -> bool {
        self.group == 0x0002
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:04X},{:04X})", self.group, self.element)
    }
}

/// Expected number of values of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multiplicity {
    One,
    OneOrMore,
}

/// What the registry knows about a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagInfo {
    pub tag: Tag,
    pub name: &'static str,
    pub vr: Vr,
    pub vm: Multiplicity,
}

const fn entry(group: u16, element: u16, name: &'static str, vr: Vr, vm: Multiplicity) -> TagInfo {
    TagInfo {
        tag: Tag::new(group, element),
        name,
        vr,
        vm,
    }
}

pub mod tags {
    use super::Tag;

    pub const FILE_META_INFORMATION_GROUP_LENGTH: Tag = Tag::new(0x0002, 0x0000);
    pub const MEDIA_STORAGE_SOP_CLASS_UID: Tag = Tag::new(0x0002, 0x0002);
    pub const MEDIA_STORAGE_SOP_INSTANCE_UID: Tag = Tag::new(0x0002, 0x0003);
    pub const TRANSFER_SYNTAX_UID: Tag = Tag::new(0x0002, 0x0010);
    pub const SPECIFIC_CHARACTER_SET: Tag = Tag::new(0x0008, 0x0005);
    pub const SOP_CLASS_UID: Tag = Tag::new(0x0008, 0x0016);
    pub const SOP_INSTANCE_UID: Tag = Tag::new(0x0008, 0x0018);
    pub const STUDY_DATE: Tag = Tag::new(0x0008, 0x0020);
    pub const ACQUISITION_DATE: Tag = Tag::new(0x0008, 0x0022);
    pub const MODALITY: Tag = Tag::new(0x0008, 0x0060);
    pub const STUDY_DESCRIPTION: Tag = Tag::new(0x0008, 0x1030);
    pub const PATIENT_NAME: Tag = Tag::new(0x0010, 0x0010);
    pub const PATIENT_ID: Tag = Tag::new(0x0010, 0x0020);
    pub const STUDY_INSTANCE_UID: Tag = Tag::new(0x0020, 0x000D);
    pub const SERIES_INSTANCE_UID: Tag = Tag::new(0x0020, 0x000E);
    pub const SAMPLES_PER_PIXEL: Tag = Tag::new(0x0028, 0x0002);
    pub const PHOTOMETRIC_INTERPRETATION: Tag = Tag::new(0x0028, 0x0004);
    pub const PLANAR_CONFIGURATION: Tag = Tag::new(0x0028, 0x0006);
    pub const NUMBER_OF_FRAMES: Tag = Tag::new(0x0028, 0x0008);
    pub const ROWS: Tag = Tag::new(0x0028, 0x0010);
    pub const COLUMNS: Tag = Tag::new(0x0028, 0x0011);
    pub const BITS_ALLOCATED: Tag = Tag::new(0x0028, 0x0100);
    pub const BITS_STORED: Tag = Tag::new(0x0028, 0x0101);
    pub const HIGH_BIT: Tag = Tag::new(0x0028, 0x0102);
    pub const PIXEL_REPRESENTATION: Tag = Tag::new(0x0028, 0x0103);
    pub const RESCALE_INTERCEPT: Tag = Tag::new(0x0028, 0x1052);
    pub const RESCALE_SLOPE: Tag = Tag::new(0x0028, 0x1053);
    pub const PIXEL_DATA: Tag = Tag::new(0x7FE0, 0x0010);
}

use Multiplicity::{One, OneOrMore};

/// Sorted by tag.
static REGISTRY: &[TagInfo] = &[
    entry(0x0002, 0x0000, "FileMetaInformationGroupLength", Vr::UL, One),
    entry(0x0002, 0x0001, "FileMetaInformationVersion", Vr::OB, One),
    entry(0x0002, 0x0002, "MediaStorageSOPClassUID", Vr::UI, One),
    entry(0x0002, 0x0003, "MediaStorageSOPInstanceUID", Vr::UI, One),
    entry(0x0002, 0x0010, "TransferSyntaxUID", Vr::UI, One),
    entry(0x0002, 0x0012, "ImplementationClassUID", Vr::UI, One),
    entry(0x0002, 0x0013, "ImplementationVersionName", Vr::SH, One),
    entry(0x0008, 0x0005, "SpecificCharacterSet", Vr::CS, OneOrMore),
    entry(0x0008, 0x0008, "ImageType", Vr::CS, OneOrMore),
    entry(0x0008, 0x0016, "SOPClassUID", Vr::UI, One),
    entry(0x0008, 0x0018, "SOPInstanceUID", Vr::UI, One),
    entry(0x0008, 0x0020, "StudyDate", Vr::DA, One),
    entry(0x0008, 0x0021, "SeriesDate", Vr::DA, One),
    entry(0x0008, 0x0022, "AcquisitionDate", Vr::DA, One),
    entry(0x0008, 0x0030, "StudyTime", Vr::TM, One),
    entry(0x0008, 0x0050, "AccessionNumber", Vr::SH, One),
    entry(0x0008, 0x0060, "Modality", Vr::CS, One),
    entry(0x0008, 0x0070, "Manufacturer", Vr::LO, One),
    entry(0x0008, 0x0090, "ReferringPhysicianName", Vr::PN, One),
    entry(0x0008, 0x1030, "StudyDescription", Vr::LO, One),
    entry(0x0008, 0x103E, "SeriesDescription", Vr::LO, One),
    entry(0x0010, 0x0010, "PatientName", Vr::PN, One),
    entry(0x0010, 0x0020, "PatientID", Vr::LO, One),
    entry(0x0010, 0x0030, "PatientBirthDate", Vr::DA, One),
    entry(0x0010, 0x0040, "PatientSex", Vr::CS, One),
    entry(0x0010, 0x1010, "PatientAge", Vr::AS, One),
    entry(0x0018, 0x0015, "BodyPartExamined", Vr::CS, One),
    entry(0x0018, 0x0050, "SliceThickness", Vr::DS, One),
    entry(0x0018, 0x1030, "ProtocolName", Vr::LO, One),
    entry(0x0020, 0x000D, "StudyInstanceUID", Vr::UI, One),
    entry(0x0020, 0x000E, "SeriesInstanceUID", Vr::UI, One),
    entry(0x0020, 0x0011, "SeriesNumber", Vr::IS, One),
    entry(0x0020, 0x0013, "InstanceNumber", Vr::IS, One),
    entry(0x0020, 0x0032, "ImagePositionPatient", Vr::DS, OneOrMore),
    entry(0x0020, 0x0037, "ImageOrientationPatient", Vr::DS, OneOrMore),
    entry(0x0028, 0x0002, "SamplesPerPixel", Vr::US, One),
    entry(0x0028, 0x0004, "PhotometricInterpretation", Vr::CS, One),
    entry(0x0028, 0x0006, "PlanarConfiguration", Vr::US, One),
    entry(0x0028, 0x0008, "NumberOfFrames", Vr::IS, One),
    entry(0x0028, 0x0010, "Rows", Vr::US, One),
    entry(0x0028, 0x0011, "Columns", Vr::US, One),
    entry(0x0028, 0x0030, "PixelSpacing", Vr::DS, OneOrMore),
    entry(0x0028, 0x0100, "BitsAllocated", Vr::US, One),
    entry(0x0028, 0x0101, "BitsStored", Vr::US, One),
    entry(0x0028, 0x0102, "HighBit", Vr::US, One),
    entry(0x0028, 0x0103, "PixelRepresentation", Vr::US, One),
    entry(0x0028, 0x1050, "WindowCenter", Vr::DS, OneOrMore),
    entry(0x0028, 0x1051, "WindowWidth", Vr::DS, OneOrMore),
    entry(0x0028, 0x1052, "RescaleIntercept", Vr::DS, One),
    entry(0x0028, 0x1053, "RescaleSlope", Vr::DS, One),
    entry(0x0028, 0x1054, "RescaleType", Vr::LO, One),
    entry(0x7FE0, 0x0010, "PixelData", Vr::OW, One),
];

/// Look up a tag in the registry.
pub fn lookup(tag: Tag) -> Option<&'static TagInfo> {
    REGISTRY
        .binary_search_by(|info| info.tag.cmp(&tag))
        .ok()
        .map(|i| &REGISTRY[i])
}

/// The VR to assume for a tag in an implicit VR data set.
pub fn implicit_vr(tag: Tag) -> Vr {
    match lookup(tag) {
        Some(info) => info.vr,
        None if tag.is_group_length() => Vr::UL,
        None => Vr::UN,
    }
}

/// Get the standard name of a tag, or its numeric form if it is not registered.
pub fn name_of(tag: Tag) -> String {
    lookup(tag)
        .map(|info| info.name.to_string())
        .unwrap_or_else(|| tag.to_string())
}
