//! Outbound calls a hosted application makes to its host

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{HostingError, Result};
use crate::state::State;
use crate::types::{AvailableData, ObjectLocator, Rect, Status};

/// The host side of the Application Hosting interface
///
/// Implementations wrap a concrete transport. Failures to reach the host are
/// reported as [`HostingError::HostUnreachable`], faults raised while talking
/// to it as [`HostingError::TransportFault`].
#[async_trait]
pub trait HostInterface: Send + Sync {
    /// Inform the host of the application's current lifecycle state
    async fn notify_state_changed(&self, state: State) -> Result<()>;

    /// Report a status or problem to the host
    async fn notify_status(&self, status: Status) -> Result<()>;

    /// Request screen real estate; the returned area is authoritative
    async fn get_available_screen(&self, preferred: Rect) -> Result<Rect>;

    /// Resolve object UUIDs to locators, optionally constrained to transfer syntaxes
    async fn get_data(
        &self,
        uuids: &[Uuid],
        transfer_syntaxes: &[Uuid],
        include_bulk_data: bool,
    ) -> Result<Vec<ObjectLocator>>;

    /// Ask where newly produced artifacts should be written
    async fn get_output_location(&self, preferred_protocols: &[String]) -> Result<String>;

    /// Host-issued identifier, unique across all applications of this host
    async fn generate_uid(&self) -> Result<Uuid>;

    /// Announce data produced by the application
    async fn notify_data_available(&self, data: &AvailableData, last_data: bool) -> Result<bool>;
}

/// Handle used by the application to call its host
///
/// Every call is bounded by a timeout. The host interface may be missing,
/// e.g. while the host is still starting; calls then fail with
/// [`HostingError::HostUnreachable`] instead of panicking.
#[derive(Clone)]
pub struct HostSession {
    host: Option<Arc<dyn HostInterface>>,
    timeout: Duration,
}

impl HostSession {
    /// Create a session bound to a host interface
    pub fn new(host: Arc<dyn HostInterface>, timeout: Duration) -> Self {
        Self {
            host: Some(host),
            timeout,
        }
    }

    /// Create a session with no host interface available
    pub fn detached(timeout: Duration) -> Self {
        Self {
            host: None,
            timeout,
        }
    }

    /// Whether a host interface is attached
    pub fn is_attached(&self) -> bool {
        self.host.is_some()
    }

    fn host(&self) -> Result<&Arc<dyn HostInterface>> {
        self.host
            .as_ref()
            .ok_or_else(|| HostingError::unreachable("host interface not available"))
    }

    async fn bounded<T, F>(&self, call: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(HostingError::Timeout(format!(
                "{} did not complete within {:?}",
                call, self.timeout
            ))),
        }
    }

    /// Notify the host of a state change
    ///
    /// Fire-and-forget: a failure is logged and swallowed so that the local
    /// state machine keeps running.
    pub async fn notify_state_changed(&self, state: State) {
        let result = match self.host() {
            Ok(host) => {
                self.bounded("notifyStateChanged", host.notify_state_changed(state))
                    .await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => debug!("Notified host of state {}", state),
            Err(e) => warn!("Could not notify host of state {}: {}", state, e),
        }
    }

    /// Report a status to the host, logging delivery failures
    pub async fn notify_status(&self, status: Status) {
        let result = match self.host() {
            Ok(host) => self.bounded("notifyStatus", host.notify_status(status.clone())).await,
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            warn!("Could not report status '{}' to host: {}", status.message, e);
        }
    }

    pub async fn get_available_screen(&self, preferred: Rect) -> Result<Rect> {
        let host = self.host()?;
        debug!("Asking host for screen area, preferred {}", preferred);
        self.bounded("getAvailableScreen", host.get_available_screen(preferred))
            .await
    }

    /// Resolve UUIDs to locators
    ///
    /// An empty request is answered locally without contacting the host. The
    /// host may return fewer locators than requested.
    pub async fn get_data(
        &self,
        uuids: &[Uuid],
        transfer_syntaxes: &[Uuid],
        include_bulk_data: bool,
    ) -> Result<Vec<ObjectLocator>> {
        if uuids.is_empty() {
            return Ok(Vec::new());
        }
        let host = self.host()?;
        let locators = self
            .bounded(
                "getData",
                host.get_data(uuids, transfer_syntaxes, include_bulk_data),
            )
            .await?;
        debug!(
            "Host resolved {} of {} requested objects",
            locators.len(),
            uuids.len()
        );
        Ok(locators)
    }

    pub async fn get_output_location(&self, preferred_protocols: &[String]) -> Result<String> {
        let host = self.host()?;
        self.bounded(
            "getOutputLocation",
            host.get_output_location(preferred_protocols),
        )
        .await
    }

    pub async fn generate_uid(&self) -> Result<Uuid> {
        let host = self.host()?;
        self.bounded("generateUID", host.generate_uid()).await
    }

    /// Publish data produced by the application
    ///
    /// A host answering `false` is reported as [`HostingError::PublishRejected`].
    pub async fn publish_data(&self, data: &AvailableData, last_data: bool) -> Result<()> {
        let host = self.host()?;
        let accepted = self
            .bounded(
                "notifyDataAvailable",
                host.notify_data_available(data, last_data),
            )
            .await?;
        if accepted {
            Ok(())
        } else {
            Err(HostingError::PublishRejected)
        }
    }
}

impl std::fmt::Debug for HostSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostSession")
            .field("attached", &self.is_attached())
            .field("timeout", &self.timeout)
            .finish()
    }
}
