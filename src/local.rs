//! Run the viewer against a host backed by a local directory
//!
//! Every readable DICOM file under the data directory is offered as one
//! object, grouped by patient, study and series, and resolved through a
//! `file:` locator.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dicom_object::{open_file, DefaultDicomObject};
use hosting::index::file_uri;
use hosting::transfer_syntax::uid_to_uuid;
use hosting::{
    AvailableData, HostSession, HostingError, InMemoryHost, ObjectDescriptor, ObjectLocator,
    Patient, ResultData, Runtime, Series, State, Study,
};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::config::Config;
use crate::imaging::{DicomDecoder, HeadlessSurface, SurfaceSnapshot};
use crate::storage::{create_storage_backend, StorageError};
use crate::viewer::{Viewer, ViewerAction};

pub const DICOM_MIME_TYPE: &str = "application/dicom";

#[derive(Debug, Error)]
pub enum LocalError {
    #[error("Data directory '{0}' does not exist")]
    MissingDataDir(PathBuf),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Hosting(#[from] HostingError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Application task failed: {0}")]
    Task(String),
}

/// Objects found in a directory, ready to be offered by a host
#[derive(Debug, Clone, Default)]
pub struct LocalData {
    pub available: AvailableData,
    pub locators: Vec<ObjectLocator>,
}

/// Outcome of a local session
#[derive(Debug, Clone)]
pub struct LocalReport {
    pub final_state: State,
    pub notified_states: Vec<State>,
    pub offered: usize,
    pub surface: SurfaceSnapshot,
    pub results: ResultData,
    pub published: Vec<(AvailableData, bool)>,
}

fn absolute(path: &Path) -> Result<PathBuf, LocalError> {
    std::fs::canonicalize(path).map_err(|source| LocalError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn text(obj: &DefaultDicomObject, name: &str) -> String {
    obj.element_by_name(name)
        .ok()
        .and_then(|e| e.to_str().ok())
        .map(|s| s.trim_end_matches(['\0', ' ']).to_string())
        .unwrap_or_default()
}

fn nonempty(s: &str) -> Option<String> {
    let s = s.trim_end_matches(['\0', ' ']);
    (!s.is_empty()).then(|| s.to_string())
}

/// Scan `dir` recursively and build the snapshot a host would offer
///
/// Files that are not DICOM are skipped. Locators carry `source` as the
/// identity of the providing side.
pub fn scan(dir: &Path, source: Uuid) -> Result<LocalData, LocalError> {
    if !dir.is_dir() {
        return Err(LocalError::MissingDataDir(dir.to_path_buf()));
    }
    let root = absolute(dir)?;

    let mut data = LocalData::default();
    for entry in WalkDir::new(&root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        let obj = match open_file(path) {
            Ok(obj) => obj,
            Err(e) => {
                debug!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };

        let uuid = Uuid::new_v4();
        let transfer_syntax = obj.meta().transfer_syntax().to_string();
        let mut descriptor = ObjectDescriptor::new(uuid).with_mime_type(DICOM_MIME_TYPE);
        if let Some(class_uid) = nonempty(obj.meta().media_storage_sop_class_uid()) {
            descriptor = descriptor.with_class_uid(class_uid);
        }
        if let Some(ts) = nonempty(&transfer_syntax) {
            descriptor = descriptor.with_transfer_syntax_uid(ts);
        }
        if let Some(modality) = nonempty(&text(&obj, "Modality")) {
            descriptor = descriptor.with_modality(modality);
        }

        insert(
            &mut data.available,
            text(&obj, "PatientName"),
            text(&obj, "PatientID"),
            text(&obj, "StudyInstanceUID"),
            text(&obj, "SeriesInstanceUID"),
            descriptor,
        );

        let mut locator = ObjectLocator::new(uuid, source, file_uri(path)?);
        if let Some(ts) = nonempty(&transfer_syntax) {
            locator = locator.with_transfer_syntax(uid_to_uuid(&ts));
        }
        data.locators.push(locator);
    }

    info!(
        "Found {} DICOM object(s) for {} patient(s) in {}",
        data.locators.len(),
        data.available.patients.len(),
        root.display()
    );
    Ok(data)
}

fn insert(
    data: &mut AvailableData,
    patient_name: String,
    patient_id: String,
    study_uid: String,
    series_uid: String,
    descriptor: ObjectDescriptor,
) {
    let patient_pos = data.patients.iter().position(|p| {
        if patient_id.is_empty() {
            p.id.is_empty() && p.name == patient_name
        } else {
            p.id == patient_id
        }
    });
    let patient = match patient_pos {
        Some(i) => &mut data.patients[i],
        None => {
            data.patients.push(Patient::new(patient_name).with_id(patient_id));
            let last = data.patients.len() - 1;
            &mut data.patients[last]
        }
    };

    let study = match patient.studies.iter().position(|s| s.study_uid == study_uid) {
        Some(i) => &mut patient.studies[i],
        None => {
            patient.studies.push(Study::new(study_uid));
            let last = patient.studies.len() - 1;
            &mut patient.studies[last]
        }
    };

    let series = match study.series.iter().position(|s| s.series_uid == series_uid) {
        Some(i) => &mut study.series[i],
        None => {
            study.series.push(Series::new(series_uid));
            let last = study.series.len() - 1;
            &mut study.series[last]
        }
    };

    series.object_descriptors.push(descriptor);
}

/// Drive one session: start, offer the directory, run the configured
/// actions and exit
pub async fn run(config: &Config) -> Result<LocalReport, LocalError> {
    let host_source = Uuid::new_v4();
    let data = scan(&config.local.data_dir, host_source)?;
    let offered = data.locators.len();

    let output_dir = &config.local.output_dir;
    std::fs::create_dir_all(output_dir).map_err(|source| LocalError::Io {
        path: output_dir.clone(),
        source,
    })?;
    let output_location = file_uri(&absolute(output_dir)?)?;

    let mut host = InMemoryHost::new().with_output_location(output_location);
    if let Some(screen) = config.local.screen {
        host = host.with_screen(screen);
    }
    for locator in data.locators {
        host = host.with_locator(locator);
    }
    let host = Arc::new(host);
    let session = HostSession::new(host.clone(), config.hosting.host_call_timeout());

    let surface = HeadlessSurface::new();
    let viewer = Viewer::new(
        Arc::new(DicomDecoder::new()),
        create_storage_backend(&config.storage)?,
        Box::new(surface.clone()),
    );

    let (mut runtime, handle) = Runtime::new(viewer, config.hosting.clone(), session);
    let task = tokio::spawn(async move {
        runtime.run().await;
        runtime
    });

    handle.start().await?;
    handle.data_available(data.available, true).await?;
    if config.local.load_data {
        handle.action(ViewerAction::LoadData).await?;
    }
    if config.local.secondary_capture {
        handle.action(ViewerAction::CreateSecondaryCapture).await?;
    }
    handle.exit().await?;

    let runtime = task.await.map_err(|e| LocalError::Task(e.to_string()))?;
    if runtime.state() != State::Exit {
        warn!("Application stopped in state {}", runtime.state());
    }

    Ok(LocalReport {
        final_state: runtime.state(),
        notified_states: host.states().await,
        offered,
        surface: surface.snapshot(),
        results: runtime.results().clone(),
        published: host.published().await,
    })
}
