//! Available-data model exchanged between host and hosted application

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One retrievable DICOM object, addressed by its descriptor UUID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectDescriptor {
    /// Unique identifier used for every cross-process reference to this object
    pub descriptor_uuid: Uuid,

    /// MIME type of the object content (e.g. `application/dicom`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// SOP Class UID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_uid: Option<String>,

    /// Transfer syntax the object is stored in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_syntax_uid: Option<String>,

    /// Modality code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modality: Option<String>,
}

/// A DICOM series and the objects it contains
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Series {
    /// Series Instance UID
    pub series_uid: String,

    #[serde(default)]
    pub object_descriptors: Vec<ObjectDescriptor>,
}

/// A DICOM study
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Study {
    /// Study Instance UID
    pub study_uid: String,

    /// Study-level objects not belonging to a series
    #[serde(default)]
    pub object_descriptors: Vec<ObjectDescriptor>,

    #[serde(default)]
    pub series: Vec<Series>,
}

/// A patient and their studies
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub name: String,

    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub assigning_authority: String,

    #[serde(default)]
    pub sex: String,

    #[serde(default)]
    pub birth_date: String,

    /// Patient-level objects not belonging to a study
    #[serde(default)]
    pub object_descriptors: Vec<ObjectDescriptor>,

    #[serde(default)]
    pub studies: Vec<Study>,
}

/// Root of the patient/study/series/object tree
///
/// This is the unit carried by a data-available notification in either
/// direction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableData {
    /// Objects that are not attached to any patient
    #[serde(default)]
    pub object_descriptors: Vec<ObjectDescriptor>,

    #[serde(default)]
    pub patients: Vec<Patient>,
}

/// Resolved retrieval information for one object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectLocator {
    /// UUID of the object this locator resolves
    pub locator: Uuid,

    /// UUID of the application or session that produced the object
    pub source: Uuid,

    /// Transfer syntax the content at `uri` is encoded in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_syntax: Option<Uuid>,

    /// Byte offset of the object within the resource
    #[serde(default)]
    pub offset: u64,

    /// Length in bytes, 0 when unknown or the whole resource
    #[serde(default)]
    pub length: u64,

    /// Scheme-qualified location, e.g. `file:/tmp/a.dcm`
    #[serde(rename = "URI")]
    pub uri: String,
}

/// Screen area in host coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Severity of a status report sent to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatusSeverity {
    Informational,
    Warning,
    Error,
    Fatal,
}

/// Status report (PS3.19 `notifyStatus`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub severity: StatusSeverity,
    pub code: i32,
    pub coding_scheme: String,
    pub message: String,
}

impl ObjectDescriptor {
    /// Create a descriptor with only its identity set
    pub fn new(descriptor_uuid: Uuid) -> Self {
        Self {
            descriptor_uuid,
            mime_type: None,
            class_uid: None,
            transfer_syntax_uid: None,
            modality: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_class_uid(mut self, class_uid: impl Into<String>) -> Self {
        self.class_uid = Some(class_uid.into());
        self
    }

    pub fn with_transfer_syntax_uid(mut self, uid: impl Into<String>) -> Self {
        self.transfer_syntax_uid = Some(uid.into());
        self
    }

    pub fn with_modality(mut self, modality: impl Into<String>) -> Self {
        self.modality = Some(modality.into());
        self
    }
}

impl Series {
    pub fn new(series_uid: impl Into<String>) -> Self {
        Self {
            series_uid: series_uid.into(),
            object_descriptors: Vec::new(),
        }
    }

    pub fn with_descriptor(mut self, descriptor: ObjectDescriptor) -> Self {
        self.object_descriptors.push(descriptor);
        self
    }
}

impl Study {
    pub fn new(study_uid: impl Into<String>) -> Self {
        Self {
            study_uid: study_uid.into(),
            ..Self::default()
        }
    }

    pub fn with_series(mut self, series: Series) -> Self {
        self.series.push(series);
        self
    }
}

impl Patient {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_study(mut self, study: Study) -> Self {
        self.studies.push(study);
        self
    }
}

impl AvailableData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_patient(mut self, patient: Patient) -> Self {
        self.patients.push(patient);
        self
    }

    /// True when the tree carries no object at any level
    pub fn is_empty(&self) -> bool {
        crate::index::descriptor_count(self) == 0
    }
}

impl ObjectLocator {
    pub fn new(locator: Uuid, source: Uuid, uri: impl Into<String>) -> Self {
        Self {
            locator,
            source,
            transfer_syntax: None,
            offset: 0,
            length: 0,
            uri: uri.into(),
        }
    }

    pub fn with_transfer_syntax(mut self, transfer_syntax: Uuid) -> Self {
        self.transfer_syntax = Some(transfer_syntax);
        self
    }
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl Status {
    pub fn new(severity: StatusSeverity, code: i32, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            coding_scheme: APP_CODING_SCHEME.to_string(),
            message: message.into(),
        }
    }
}

/// Coding scheme used for status codes raised by this crate
pub const APP_CODING_SCHEME: &str = "DAH";

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_builders() {
        let uuid = Uuid::new_v4();
        let data = AvailableData::new().with_patient(
            Patient::new("Jane Doe").with_id("P1").with_study(
                Study::new("1.2").with_series(
                    Series::new("1.2.3")
                        .with_descriptor(ObjectDescriptor::new(uuid).with_modality("CT")),
                ),
            ),
        );

        assert_eq!(data.patients[0].name, "Jane Doe");
        assert_eq!(data.patients[0].studies[0].series[0].series_uid, "1.2.3");
        assert_eq!(
            data.patients[0].studies[0].series[0].object_descriptors[0].descriptor_uuid,
            uuid
        );
        assert!(!data.is_empty());
        assert!(AvailableData::new().is_empty());
    }

    #[test]
    fn test_locator_serializes_uri_field() {
        let locator = ObjectLocator::new(Uuid::nil(), Uuid::nil(), "file:/tmp/a.dcm");
        let json = serde_json::to_value(&locator).unwrap();
        assert_eq!(json["URI"], "file:/tmp/a.dcm");
        assert!(json.get("transfer_syntax").is_none());
    }

    #[test]
    fn test_rect_display() {
        let rect = Rect::new(50, 50, 100, 100);
        assert_eq!(rect.to_string(), "100x100+50+50");
        assert!(!rect.is_empty());
        assert!(Rect::new(0, 0, 0, 10).is_empty());
    }
}
