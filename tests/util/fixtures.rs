//! DICOM files written by dicom-rs, so that decoding is checked against an independent
//! encoder.

use dicom::core::{DataElement, PrimitiveValue, VR};
use dicom::dictionary_std::{tags, uids};
use dicom::object::{FileMetaTableBuilder, InMemDicomObject};

pub const SOP_INSTANCE_UID: &str = "2.25.164452200898186296452633608713549770669";

/// Patient and study attributes, without any image.
pub(crate) fn study() -> InMemDicomObject {
    InMemDicomObject::from_element_iter([
        DataElement::new(
            tags::SOP_CLASS_UID,
            VR::UI,
            uids::SECONDARY_CAPTURE_IMAGE_STORAGE,
        ),
        DataElement::new(tags::SOP_INSTANCE_UID, VR::UI, SOP_INSTANCE_UID),
        DataElement::new(tags::STUDY_DATE, VR::DA, "20240115"),
        DataElement::new(tags::MODALITY, VR::CS, "CT"),
        DataElement::new(tags::STUDY_DESCRIPTION, VR::LO, "CHEST PA"),
        DataElement::new(tags::PATIENT_NAME, VR::PN, "Doe^Jane"),
        DataElement::new(tags::PATIENT_ID, VR::LO, "123ABC"),
    ])
}

fn put_image_header(obj: &mut InMemDicomObject, rows: u16, columns: u16, bits: u16, signed: bool) {
    obj.put(DataElement::new(tags::SAMPLES_PER_PIXEL, VR::US, PrimitiveValue::from(1_u16)));
    obj.put(DataElement::new(tags::PHOTOMETRIC_INTERPRETATION, VR::CS, "MONOCHROME2"));
    obj.put(DataElement::new(tags::ROWS, VR::US, PrimitiveValue::from(rows)));
    obj.put(DataElement::new(tags::COLUMNS, VR::US, PrimitiveValue::from(columns)));
    obj.put(DataElement::new(tags::BITS_ALLOCATED, VR::US, PrimitiveValue::from(bits)));
    obj.put(DataElement::new(tags::BITS_STORED, VR::US, PrimitiveValue::from(bits)));
    obj.put(DataElement::new(tags::HIGH_BIT, VR::US, PrimitiveValue::from(bits - 1)));
    obj.put(DataElement::new(
        tags::PIXEL_REPRESENTATION,
        VR::US,
        PrimitiveValue::from(u16::from(signed)),
    ));
}

/// A 16-bit unsigned image whose samples are `0, 1, 2, ...` in row-major order.
pub(crate) fn ramp_u16(rows: u16, columns: u16) -> InMemDicomObject {
    let mut obj = study();
    put_image_header(&mut obj, rows, columns, 16, false);
    let samples: Vec<u16> = (0..rows * columns).collect();
    obj.put(DataElement::new(
        tags::PIXEL_DATA,
        VR::OW,
        PrimitiveValue::U16(samples.into()),
    ));
    obj
}

/// A signed 16-bit CT slice with a rescale to Hounsfield units.
pub(crate) fn ct_i16(samples: &[i16], rows: u16, columns: u16) -> InMemDicomObject {
    let mut obj = study();
    put_image_header(&mut obj, rows, columns, 16, true);
    obj.put(DataElement::new(tags::RESCALE_INTERCEPT, VR::DS, "-1024"));
    obj.put(DataElement::new(tags::RESCALE_SLOPE, VR::DS, "1 "));
    obj.put(DataElement::new(
        tags::PIXEL_DATA,
        VR::OW,
        PrimitiveValue::I16(samples.to_vec().into()),
    ));
    obj
}

/// An 8-bit image with the given per-pixel attributes and raw samples.
pub(crate) fn image_u8(
    rows: u16,
    columns: u16,
    extra: Vec<DataElement<InMemDicomObject>>,
    samples: Vec<u8>,
) -> InMemDicomObject {
    let mut obj = study();
    put_image_header(&mut obj, rows, columns, 8, false);
    for element in extra {
        obj.put(element);
    }
    obj.put(DataElement::new(tags::PIXEL_DATA, VR::OB, PrimitiveValue::from(samples)));
    obj
}

/// Write a complete file: preamble, `DICM`, file meta group and data set.
pub(crate) fn to_file_bytes(obj: InMemDicomObject, transfer_syntax: &str) -> Vec<u8> {
    let meta = FileMetaTableBuilder::new()
        .media_storage_sop_class_uid(uids::SECONDARY_CAPTURE_IMAGE_STORAGE)
        .media_storage_sop_instance_uid(SOP_INSTANCE_UID)
        .transfer_syntax(transfer_syntax)
        .build()
        .unwrap();
    let mut bytes = Vec::new();
    obj.with_exact_meta(meta).write_all(&mut bytes).unwrap();
    bytes
}

pub(crate) fn explicit(obj: InMemDicomObject) -> Vec<u8> {
    to_file_bytes(obj, uids::EXPLICIT_VR_LITTLE_ENDIAN)
}
