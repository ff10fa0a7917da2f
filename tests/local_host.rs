mod common;

use std::path::Path;

use dah::config::Config;
use dah::local::{scan, LocalError, DICOM_MIME_TYPE};
use dicom_dictionary_std::uids;
use hosting::{State, TransferSyntax};
use uuid::Uuid;

use common::{write_image, write_image_as, ImageFixture, JANE_DOE};

const JOHN_DOE: ImageFixture = ImageFixture {
    patient_name: "John Doe",
    patient_id: "JD-002",
    study_uid: "1.2.826.0.1.3680043.2.1125.2.1",
    series_uid: "1.2.826.0.1.3680043.2.1125.2.1.1",
    instance_uid: "1.2.826.0.1.3680043.2.1125.2.1.1.1",
};

fn config_for(data_dir: &Path, output_dir: &Path, store_dir: &Path, capture: bool) -> Config {
    let toml = format!(
        r#"
        [storage]
        backend = "filesystem"

        [storage.options]
        path = "{}"

        [local]
        data_dir = "{}"
        output_dir = "{}"
        secondary_capture = {}
        "#,
        store_dir.display(),
        data_dir.display(),
        output_dir.display(),
        capture
    );
    Config::from_toml_str(&toml).expect("valid config")
}

#[test]
fn test_scan_groups_by_patient_study_series() {
    let dir = tempfile::tempdir().unwrap();
    write_image(&dir.path().join("a/jane1.dcm"), &JANE_DOE);
    write_image(
        &dir.path().join("a/jane2.dcm"),
        &ImageFixture {
            instance_uid: "1.2.826.0.1.3680043.2.1125.1.1.1.2",
            ..JANE_DOE
        },
    );
    write_image(&dir.path().join("b/john.dcm"), &JOHN_DOE);
    std::fs::write(dir.path().join("README.txt"), "not dicom").unwrap();

    let source = Uuid::new_v4();
    let data = scan(dir.path(), source).unwrap();

    assert_eq!(data.locators.len(), 3);
    assert_eq!(data.available.patients.len(), 2);

    let jane = &data.available.patients[0];
    assert_eq!(jane.name, "Jane Doe");
    assert_eq!(jane.id, "JD-001");
    assert_eq!(jane.studies.len(), 1);
    assert_eq!(jane.studies[0].series.len(), 1);
    let descriptors = &jane.studies[0].series[0].object_descriptors;
    assert_eq!(descriptors.len(), 2);
    assert_eq!(descriptors[0].mime_type.as_deref(), Some(DICOM_MIME_TYPE));
    assert_eq!(descriptors[0].modality.as_deref(), Some("OT"));

    let explicit = TransferSyntax::explicit_vr_little_endian();
    for locator in &data.locators {
        assert_eq!(locator.source, source);
        assert!(locator.uri.starts_with("file:"));
        assert_eq!(locator.transfer_syntax, Some(explicit.uuid()));
        assert!(hosting::uri_to_path(&locator.uri).unwrap().exists());
    }
}

#[test]
fn test_scan_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");
    assert!(matches!(
        scan(&missing, Uuid::new_v4()),
        Err(LocalError::MissingDataDir(_))
    ));
}

#[tokio::test]
async fn test_run_displays_and_publishes() {
    let data = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    write_image(&data.path().join("jane.dcm"), &JANE_DOE);

    let report = dah::run(config_for(data.path(), output.path(), store.path(), true))
        .await
        .unwrap();

    assert_eq!(report.final_state, State::Exit);
    assert_eq!(
        report.notified_states,
        vec![State::Idle, State::InProgress, State::Exit]
    );
    assert_eq!(report.offered, 1);
    assert_eq!(report.surface.frames_displayed, 1);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.published.len(), 1);

    let produced: Vec<_> = std::fs::read_dir(output.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(produced.len(), 1);
    assert!(produced[0].starts_with("dahsc"));
    assert!(produced[0].ends_with(".jpg"));
}

#[tokio::test]
async fn test_run_displays_implicit_vr_file() {
    let data = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    write_image_as(
        &data.path().join("jane.dcm"),
        &JANE_DOE,
        uids::IMPLICIT_VR_LITTLE_ENDIAN,
    );

    let scanned = scan(data.path(), Uuid::new_v4()).unwrap();
    assert_eq!(
        scanned.locators[0].transfer_syntax,
        Some(TransferSyntax::implicit_vr_little_endian().uuid())
    );

    let report = dah::run(config_for(data.path(), output.path(), store.path(), true))
        .await
        .unwrap();

    assert_eq!(report.final_state, State::Exit);
    assert_eq!(report.offered, 1);
    assert_eq!(report.surface.frames_displayed, 1);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.published.len(), 1);
}

#[tokio::test]
async fn test_run_with_empty_directory() {
    let data = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();

    let report = dah::run(config_for(data.path(), output.path(), store.path(), true))
        .await
        .unwrap();

    assert_eq!(report.final_state, State::Exit);
    assert_eq!(report.offered, 0);
    assert_eq!(report.surface.frames_displayed, 0);
    assert!(report.results.is_empty());
    assert!(report.published.is_empty());
}
