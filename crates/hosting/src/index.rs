//! Queries over the available-data tree and the application's own result tree

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use crate::error::{HostingError, Result};
use crate::host::HostSession;
use crate::types::{AvailableData, ObjectDescriptor, ObjectLocator, Patient, Series, Study};

/// Iterate every descriptor held under a patient, at any level
pub fn patient_descriptors(patient: &Patient) -> impl Iterator<Item = &ObjectDescriptor> {
    patient.object_descriptors.iter().chain(
        patient.studies.iter().flat_map(|study| {
            study.object_descriptors.iter().chain(
                study
                    .series
                    .iter()
                    .flat_map(|series| series.object_descriptors.iter()),
            )
        }),
    )
}

/// Iterate every descriptor in the tree, including top-level ones
pub fn descriptors(data: &AvailableData) -> impl Iterator<Item = &ObjectDescriptor> {
    data.object_descriptors
        .iter()
        .chain(data.patients.iter().flat_map(patient_descriptors))
}

/// All descriptor UUIDs under a patient
pub fn all_uuids(patient: &Patient) -> BTreeSet<Uuid> {
    patient_descriptors(patient)
        .map(|descriptor| descriptor.descriptor_uuid)
        .collect()
}

pub fn descriptor_count(data: &AvailableData) -> usize {
    descriptors(data).count()
}

pub fn find_descriptor(data: &AvailableData, uuid: Uuid) -> Option<&ObjectDescriptor> {
    descriptors(data).find(|descriptor| descriptor.descriptor_uuid == uuid)
}

/// UUIDs that occur more than once in the tree
pub fn duplicate_uuids(data: &AvailableData) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    for descriptor in descriptors(data) {
        if !seen.insert(descriptor.descriptor_uuid) && !duplicates.contains(&descriptor.descriptor_uuid)
        {
            duplicates.push(descriptor.descriptor_uuid);
        }
    }
    duplicates
}

/// Fail when a UUID occurs more than once in the tree
pub fn check_unique(data: &AvailableData) -> Result<()> {
    let duplicates = duplicate_uuids(data);
    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(HostingError::internal(format!(
            "Duplicate descriptor UUIDs in available data: {:?}",
            duplicates
        )))
    }
}

/// An object produced by the application, ready to be merged into its results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Stable identity of the produced object; merging is idempotent on it
    pub identity: String,
    /// Absolute path of the stored content
    pub location: PathBuf,
    pub patient_name: String,
    pub patient_id: String,
    pub study_uid: String,
    pub series_uid: String,
    pub mime_type: String,
    pub class_uid: Option<String>,
    pub modality: Option<String>,
    pub transfer_syntax_uid: Option<String>,
}

impl Artifact {
    pub fn new(identity: impl Into<String>, location: impl Into<PathBuf>) -> Self {
        Self {
            identity: identity.into(),
            location: location.into(),
            patient_name: String::new(),
            patient_id: String::new(),
            study_uid: String::new(),
            series_uid: String::new(),
            mime_type: "application/octet-stream".to_string(),
            class_uid: None,
            modality: None,
            transfer_syntax_uid: None,
        }
    }

    pub fn with_patient(mut self, name: impl Into<String>, id: impl Into<String>) -> Self {
        self.patient_name = name.into();
        self.patient_id = id.into();
        self
    }

    pub fn with_study(mut self, study_uid: impl Into<String>) -> Self {
        self.study_uid = study_uid.into();
        self
    }

    pub fn with_series(mut self, series_uid: impl Into<String>) -> Self {
        self.series_uid = series_uid.into();
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn with_class_uid(mut self, class_uid: impl Into<String>) -> Self {
        self.class_uid = Some(class_uid.into());
        self
    }

    pub fn with_modality(mut self, modality: impl Into<String>) -> Self {
        self.modality = Some(modality.into());
        self
    }

    fn descriptor(&self, uuid: Uuid) -> ObjectDescriptor {
        ObjectDescriptor {
            descriptor_uuid: uuid,
            mime_type: Some(self.mime_type.clone()),
            class_uid: self.class_uid.clone(),
            transfer_syntax_uid: self.transfer_syntax_uid.clone(),
            modality: self.modality.clone(),
        }
    }
}

/// Outcome of merging an artifact into the result tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merged {
    /// A new descriptor was created
    Added(Uuid),
    /// The artifact was already known; its locator was refreshed
    Updated(Uuid),
}

impl Merged {
    pub fn uuid(&self) -> Uuid {
        match self {
            Merged::Added(uuid) | Merged::Updated(uuid) => *uuid,
        }
    }
}

/// Data produced by the application and published back to the host
///
/// Mutated only through [`ResultData::merge`]; never replaced wholesale.
#[derive(Debug, Clone)]
pub struct ResultData {
    source: Uuid,
    data: AvailableData,
    artifacts: HashMap<String, Uuid>,
    locators: HashMap<Uuid, ObjectLocator>,
}

impl ResultData {
    /// Create an empty result tree for the application identified by `source`
    pub fn new(source: Uuid) -> Self {
        Self {
            source,
            data: AvailableData::default(),
            artifacts: HashMap::new(),
            locators: HashMap::new(),
        }
    }

    pub fn source(&self) -> Uuid {
        self.source
    }

    pub fn data(&self) -> &AvailableData {
        &self.data
    }

    /// Number of produced objects
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn uuid_for(&self, identity: &str) -> Option<Uuid> {
        self.artifacts.get(identity).copied()
    }

    pub fn locator(&self, uuid: Uuid) -> Option<&ObjectLocator> {
        self.locators.get(&uuid)
    }

    /// Locators for produced objects, answering the host's own `getData`
    ///
    /// Unknown UUIDs are skipped.
    pub fn locators_for(&self, uuids: &[Uuid]) -> Vec<ObjectLocator> {
        uuids
            .iter()
            .filter_map(|uuid| self.locators.get(uuid))
            .cloned()
            .collect()
    }

    /// Merge a produced artifact, minting its UUID through the host
    pub async fn merge(&mut self, session: &HostSession, artifact: Artifact) -> Result<Merged> {
        if let Some(uuid) = self.uuid_for(&artifact.identity) {
            self.refresh(uuid, &artifact)?;
            return Ok(Merged::Updated(uuid));
        }

        let uuid = session.generate_uid().await?;
        self.insert(uuid, artifact)?;
        Ok(Merged::Added(uuid))
    }

    /// Merge with an already minted UUID
    ///
    /// The UUID is ignored when the artifact identity is already known.
    pub fn merge_with_uuid(&mut self, uuid: Uuid, artifact: Artifact) -> Result<Merged> {
        if let Some(existing) = self.uuid_for(&artifact.identity) {
            self.refresh(existing, &artifact)?;
            return Ok(Merged::Updated(existing));
        }
        self.insert(uuid, artifact)?;
        Ok(Merged::Added(uuid))
    }

    fn refresh(&mut self, uuid: Uuid, artifact: &Artifact) -> Result<()> {
        let uri = file_uri(&artifact.location)?;
        if let Some(locator) = self.locators.get_mut(&uuid) {
            if locator.uri != uri {
                debug!("Artifact {} moved to {}", artifact.identity, uri);
                locator.uri = uri;
            }
        }
        Ok(())
    }

    fn insert(&mut self, uuid: Uuid, artifact: Artifact) -> Result<()> {
        if self.locators.contains_key(&uuid) {
            return Err(HostingError::internal(format!(
                "UUID {} already used in result data",
                uuid
            )));
        }
        let uri = file_uri(&artifact.location)?;

        let patient = match self.data.patients.iter().position(|p| {
            if artifact.patient_id.is_empty() {
                p.id.is_empty() && p.name == artifact.patient_name
            } else {
                p.id == artifact.patient_id
            }
        }) {
            Some(i) => &mut self.data.patients[i],
            None => {
                self.data.patients.push(
                    Patient::new(artifact.patient_name.clone()).with_id(artifact.patient_id.clone()),
                );
                self.data.patients.last_mut().ok_or_else(|| {
                    HostingError::internal("patient list empty after insert")
                })?
            }
        };

        let study = match patient
            .studies
            .iter()
            .position(|s| s.study_uid == artifact.study_uid)
        {
            Some(i) => &mut patient.studies[i],
            None => {
                patient.studies.push(Study::new(artifact.study_uid.clone()));
                patient
                    .studies
                    .last_mut()
                    .ok_or_else(|| HostingError::internal("study list empty after insert"))?
            }
        };

        let series = match study
            .series
            .iter()
            .position(|s| s.series_uid == artifact.series_uid)
        {
            Some(i) => &mut study.series[i],
            None => {
                study.series.push(Series::new(artifact.series_uid.clone()));
                study
                    .series
                    .last_mut()
                    .ok_or_else(|| HostingError::internal("series list empty after insert"))?
            }
        };

        series.object_descriptors.push(artifact.descriptor(uuid));
        self.locators
            .insert(uuid, ObjectLocator::new(uuid, self.source, uri.clone()));
        info!("Added artifact {} as {} ({})", artifact.identity, uuid, uri);
        self.artifacts.insert(artifact.identity, uuid);
        Ok(())
    }
}

/// `file:` URI for an absolute local path
pub fn file_uri(path: &Path) -> Result<String> {
    Url::from_file_path(path)
        .map(String::from)
        .map_err(|_| HostingError::InvalidUri(format!("not an absolute path: {}", path.display())))
}
