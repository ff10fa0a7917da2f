//! Image viewer hosted application
//!
//! Shows the first object of the first patient the host offers and can
//! publish a JPEG secondary capture of it back to the host.

use std::sync::Arc;

use async_trait::async_trait;
use dicom_dictionary_std::uids;
use hosting::index::{self, Artifact, Merged};
use hosting::transfer_syntax::uuid_to_uid;
use hosting::{
    uri_to_path, Application, HostContext, HostingError, Patient, Rect, ReleaseScope, Result,
    Status, StatusSeverity,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::imaging::{Frame, ImageDecoder, RenderSurface};
use crate::storage::{ArtifactName, ArtifactStore};

/// Status code reported when a resolved object cannot be decoded
pub const STATUS_DECODE_FAILED: i32 = 1;
/// Status code reported when the host does not accept published data
pub const STATUS_PUBLISH_FAILED: i32 = 2;

const JPEG_QUALITY: u8 = 90;

/// User requests the viewer understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerAction {
    /// Resolve and display the first patient's data
    LoadData,
    /// Publish a JPEG of the displayed image
    CreateSecondaryCapture,
}

/// The image currently on the surface and where it came from
#[derive(Debug, Clone)]
struct Displayed {
    frame: Frame,
    source: Uuid,
    patient_name: String,
    patient_id: String,
    study_uid: String,
}

pub struct Viewer {
    decoder: Arc<dyn ImageDecoder>,
    store: Arc<dyn ArtifactStore>,
    surface: Box<dyn RenderSurface>,
    loading_enabled: bool,
    summary: String,
    displayed: Option<Displayed>,
}

impl Viewer {
    pub fn new(
        decoder: Arc<dyn ImageDecoder>,
        store: Arc<dyn ArtifactStore>,
        surface: Box<dyn RenderSurface>,
    ) -> Self {
        Self {
            decoder,
            store,
            surface,
            loading_enabled: false,
            summary: String::new(),
            displayed: None,
        }
    }

    /// Description of the last data-available notification
    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn loading_enabled(&self) -> bool {
        self.loading_enabled
    }

    /// Descriptor UUID of the displayed object
    pub fn displayed_source(&self) -> Option<Uuid> {
        self.displayed.as_ref().map(|d| d.source)
    }

    async fn load_data(&mut self, ctx: &mut HostContext<'_>) -> Result<()> {
        let Some(patient) = ctx.incoming().and_then(|data| data.patients.first()).cloned() else {
            debug!("No patient available to load");
            return Ok(());
        };

        let uuids: Vec<Uuid> = index::all_uuids(&patient).into_iter().collect();
        let resolution = ctx.resolve(&uuids).await?;
        info!(
            "got locators! {} resolved, {} unresolved",
            resolution.locators.len(),
            resolution.unresolved.len()
        );
        for uuid in &resolution.unresolved {
            debug!("No data for {}", uuid);
        }

        let Some(locator) = resolution.locators.first() else {
            info!("No data available yet for patient '{}'", patient.name);
            return Ok(());
        };
        info!(
            "URI: {} locatorUUID: {} sourceUUID: {}",
            locator.uri, locator.locator, locator.source
        );

        let Some(path) = uri_to_path(&locator.uri) else {
            warn!("Unsupported locator URI {}", locator.uri);
            return Ok(());
        };

        match self.decoder.decode(&path) {
            Ok(frame) => {
                self.surface.display(&frame);
                let study_uid = patient
                    .studies
                    .iter()
                    .find(|study| {
                        study.series.iter().any(|series| {
                            series
                                .object_descriptors
                                .iter()
                                .any(|d| d.descriptor_uuid == locator.locator)
                        }) || study
                            .object_descriptors
                            .iter()
                            .any(|d| d.descriptor_uuid == locator.locator)
                    })
                    .map(|study| study.study_uid.clone())
                    .unwrap_or_default();
                self.displayed = Some(Displayed {
                    frame,
                    source: locator.locator,
                    patient_name: patient.name.clone(),
                    patient_id: patient.id.clone(),
                    study_uid,
                });
                Ok(())
            }
            Err(e) => {
                error!("Caught error while trying to load file {}: {}", path.display(), e);
                ctx.session()
                    .notify_status(Status::new(
                        StatusSeverity::Warning,
                        STATUS_DECODE_FAILED,
                        format!("Could not display {}: {}", locator.locator, e),
                    ))
                    .await;
                Ok(())
            }
        }
    }

    async fn create_secondary_capture(&mut self, ctx: &mut HostContext<'_>) -> Result<()> {
        let Some(displayed) = self.displayed.as_ref() else {
            warn!("Nothing displayed; no secondary capture created");
            return Ok(());
        };

        let identity = format!("secondary-capture:{}", displayed.source);
        let previous = ctx
            .results()
            .uuid_for(&identity)
            .and_then(|uuid| ctx.results().locator(uuid))
            .and_then(|locator| uri_to_path(&locator.uri));

        let location = ctx.output_location().await?;
        let jpeg = displayed
            .frame
            .to_jpeg(JPEG_QUALITY)
            .map_err(|e| HostingError::resource(e.to_string()))?;
        let path = self
            .store
            .store(&location, &ArtifactName::new("dahsc", ".jpg"), &jpeg)
            .await
            .map_err(|e| HostingError::resource(e.to_string()))?;
        info!("Created file: {}", path.display());

        let series_uid = uuid_to_uid(&Uuid::new_v5(&Uuid::NAMESPACE_OID, identity.as_bytes()));
        let artifact = Artifact::new(identity, path.clone())
            .with_patient(displayed.patient_name.clone(), displayed.patient_id.clone())
            .with_study(displayed.study_uid.clone())
            .with_series(series_uid)
            .with_mime_type("image/jpeg")
            .with_class_uid(uids::SECONDARY_CAPTURE_IMAGE_STORAGE)
            .with_modality("OT");

        let merged = match ctx.merge(artifact).await {
            Ok(merged) => merged,
            Err(e) => {
                self.discard(&path).await;
                return Err(e);
            }
        };
        debug!("Secondary capture recorded as {:?}", merged);

        // a refreshed capture replaces the file written last time
        if let (Merged::Updated(_), Some(previous)) = (merged, previous) {
            if previous != path {
                self.discard(&previous).await;
            }
        }

        if let Err(e) = ctx.publish(true).await {
            ctx.session()
                .notify_status(Status::new(
                    StatusSeverity::Warning,
                    STATUS_PUBLISH_FAILED,
                    format!("Publishing secondary capture failed: {}", e),
                ))
                .await;
        }
        Ok(())
    }

    async fn discard(&self, path: &std::path::Path) {
        if let Err(e) = self.store.remove(path).await {
            warn!("Could not remove {}: {}", path.display(), e);
        }
    }
}

/// One-line description of a snapshot, e.g. for a status label
pub fn summarize(patients: &[Patient]) -> String {
    let mut s = format!("Received data with {} patient(s)", patients.len());
    let Some(patient) = patients.first() else {
        return s;
    };
    s.push_str(&format!(
        " name: {} studies: {}",
        patient.name,
        patient.studies.len()
    ));
    let Some(study) = patient.studies.first() else {
        return s;
    };
    s.push_str(&format!(" series: {}", study.series.len()));
    let Some(series) = study.series.first() else {
        return s;
    };
    s.push_str(&format!(" uid: {}", series.series_uid));
    if let Some(descriptor) = series.object_descriptors.first() {
        s.push_str(&format!(" uuid: {}", descriptor.descriptor_uuid));
    }
    s
}

#[async_trait]
impl Application for Viewer {
    type Action = ViewerAction;

    async fn acquire_resources(&mut self, ctx: &mut HostContext<'_>) -> Result<()> {
        let preferred = ctx.config().preferred_screen;
        match ctx.session().get_available_screen(preferred).await {
            Ok(area) => {
                self.surface.place(area);
                self.surface.show();
            }
            // the surface exists; only placement is skipped
            Err(e) => error!("getAvailableScreen failed: {}", e),
        }
        Ok(())
    }

    async fn reclaim_resources(&mut self, _ctx: &mut HostContext<'_>) -> Result<()> {
        self.surface.show();
        self.loading_enabled = true;
        Ok(())
    }

    async fn release_resources(&mut self, scope: ReleaseScope) -> Result<()> {
        self.loading_enabled = false;
        if scope == ReleaseScope::All {
            self.surface.clear();
            self.surface.hide();
            self.displayed = None;
            self.summary.clear();
        }
        Ok(())
    }

    async fn data_available(&mut self, ctx: &mut HostContext<'_>) -> Result<()> {
        let patients = ctx
            .incoming()
            .map(|data| data.patients.as_slice())
            .unwrap_or_default();
        self.summary = summarize(patients);
        info!("{}", self.summary);
        self.loading_enabled = true;
        Ok(())
    }

    async fn bring_to_front(&mut self, area: Rect) -> bool {
        self.surface.place(area);
        self.surface.show();
        self.surface.raise();
        true
    }

    async fn handle_action(
        &mut self,
        action: ViewerAction,
        ctx: &mut HostContext<'_>,
    ) -> Result<()> {
        match action {
            ViewerAction::LoadData => {
                if !self.loading_enabled {
                    warn!("Loading is disabled until data is available");
                    return Ok(());
                }
                self.load_data(ctx).await
            }
            ViewerAction::CreateSecondaryCapture => self.create_secondary_capture(ctx).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hosting::{ObjectDescriptor, Series, Study};

    #[test]
    fn test_summarize() {
        assert_eq!(summarize(&[]), "Received data with 0 patient(s)");

        let uuid = Uuid::nil();
        let patients = vec![Patient::new("Jane Doe").with_study(
            Study::new("1.2").with_series(Series::new("1.2.3").with_descriptor(ObjectDescriptor::new(uuid))),
        )];
        assert_eq!(
            summarize(&patients),
            format!(
                "Received data with 1 patient(s) name: Jane Doe studies: 1 series: 1 uid: 1.2.3 uuid: {}",
                uuid
            )
        );
    }
}
