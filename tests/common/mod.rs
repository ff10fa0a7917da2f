#![allow(dead_code)]

use std::path::{Path, PathBuf};

use dicom_core::{DataElement, PrimitiveValue, VR};
use dicom_dictionary_std::{tags, uids};
use dicom_object::meta::FileMetaTableBuilder;
use dicom_object::InMemDicomObject;

pub const ROWS: u16 = 4;
pub const COLUMNS: u16 = 6;

/// Identity of a generated test image
#[derive(Debug, Clone)]
pub struct ImageFixture {
    pub patient_name: &'static str,
    pub patient_id: &'static str,
    pub study_uid: &'static str,
    pub series_uid: &'static str,
    pub instance_uid: &'static str,
}

pub const JANE_DOE: ImageFixture = ImageFixture {
    patient_name: "Jane Doe",
    patient_id: "JD-001",
    study_uid: "1.2.826.0.1.3680043.2.1125.1.1",
    series_uid: "1.2.826.0.1.3680043.2.1125.1.1.1",
    instance_uid: "1.2.826.0.1.3680043.2.1125.1.1.1.1",
};

fn put_str(obj: &mut InMemDicomObject, tag: dicom_core::Tag, vr: VR, value: &str) {
    obj.put(DataElement::new(tag, vr, PrimitiveValue::from(value)));
}

fn put_u16(obj: &mut InMemDicomObject, tag: dicom_core::Tag, value: u16) {
    obj.put(DataElement::new(tag, VR::US, PrimitiveValue::from(value)));
}

/// Write an 8-bit MONOCHROME2 secondary capture image as a Part 10 file
pub fn write_image(path: &Path, fixture: &ImageFixture) -> PathBuf {
    write_image_as(path, fixture, uids::EXPLICIT_VR_LITTLE_ENDIAN)
}

/// Same as [`write_image`], encoded with `transfer_syntax`
pub fn write_image_as(path: &Path, fixture: &ImageFixture, transfer_syntax: &str) -> PathBuf {
    let mut obj = InMemDicomObject::new_empty();
    put_str(&mut obj, tags::SOP_CLASS_UID, VR::UI, uids::SECONDARY_CAPTURE_IMAGE_STORAGE);
    put_str(&mut obj, tags::SOP_INSTANCE_UID, VR::UI, fixture.instance_uid);
    put_str(&mut obj, tags::PATIENT_NAME, VR::PN, fixture.patient_name);
    put_str(&mut obj, tags::PATIENT_ID, VR::LO, fixture.patient_id);
    put_str(&mut obj, tags::STUDY_INSTANCE_UID, VR::UI, fixture.study_uid);
    put_str(&mut obj, tags::SERIES_INSTANCE_UID, VR::UI, fixture.series_uid);
    put_str(&mut obj, tags::MODALITY, VR::CS, "OT");
    put_str(&mut obj, tags::PHOTOMETRIC_INTERPRETATION, VR::CS, "MONOCHROME2");
    put_u16(&mut obj, tags::SAMPLES_PER_PIXEL, 1);
    put_u16(&mut obj, tags::ROWS, ROWS);
    put_u16(&mut obj, tags::COLUMNS, COLUMNS);
    put_u16(&mut obj, tags::BITS_ALLOCATED, 8);
    put_u16(&mut obj, tags::BITS_STORED, 8);
    put_u16(&mut obj, tags::HIGH_BIT, 7);
    put_u16(&mut obj, tags::PIXEL_REPRESENTATION, 0);

    let pixels: Vec<u8> = (0..(ROWS as usize * COLUMNS as usize))
        .map(|i| (i * 10) as u8)
        .collect();
    obj.put(DataElement::new(
        tags::PIXEL_DATA,
        VR::OB,
        PrimitiveValue::from(pixels),
    ));

    let file_obj = obj
        .with_meta(
            FileMetaTableBuilder::new()
                .transfer_syntax(transfer_syntax)
                .media_storage_sop_class_uid(uids::SECONDARY_CAPTURE_IMAGE_STORAGE)
                .media_storage_sop_instance_uid(fixture.instance_uid),
        )
        .expect("build file meta");

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create fixture dir");
    }
    file_obj.write_to_file(path).expect("write part 10");
    path.to_path_buf()
}
