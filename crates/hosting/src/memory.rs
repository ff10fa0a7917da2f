//! In-process host implementation
//!
//! Serves locators from a map, records every notification it receives and can
//! be switched to behave like an unreachable or slow host.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{HostingError, Result};
use crate::host::HostInterface;
use crate::state::State;
use crate::types::{AvailableData, ObjectLocator, Rect, Status};

#[derive(Debug)]
struct HostState {
    reachable: bool,
    latency: Duration,
    screen: Option<Rect>,
    locators: HashMap<Uuid, ObjectLocator>,
    output_location: String,
    publish_result: bool,
    strict_transfer_syntaxes: bool,
    states: Vec<State>,
    statuses: Vec<Status>,
    published: Vec<(AvailableData, bool)>,
    get_data_calls: usize,
    issued_uids: Vec<Uuid>,
}

/// Host living in the same process as the application
#[derive(Debug)]
pub struct InMemoryHost {
    inner: Mutex<HostState>,
}

impl InMemoryHost {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HostState {
                reachable: true,
                latency: Duration::ZERO,
                screen: None,
                locators: HashMap::new(),
                output_location: String::new(),
                publish_result: true,
                strict_transfer_syntaxes: false,
                states: Vec::new(),
                statuses: Vec::new(),
                published: Vec::new(),
                get_data_calls: 0,
                issued_uids: Vec::new(),
            }),
        }
    }

    /// Answer screen requests with a fixed area instead of echoing the preferred one
    pub fn with_screen(mut self, screen: Rect) -> Self {
        self.inner.get_mut().screen = Some(screen);
        self
    }

    pub fn with_output_location(mut self, location: impl Into<String>) -> Self {
        self.inner.get_mut().output_location = location.into();
        self
    }

    /// Drop locators whose transfer syntax was not requested
    ///
    /// By default the requested syntaxes are a preference: this host cannot
    /// convert, so an object stored in another syntax is returned as it is.
    pub fn with_strict_transfer_syntaxes(mut self) -> Self {
        self.inner.get_mut().strict_transfer_syntaxes = true;
        self
    }

    pub fn with_locator(mut self, locator: ObjectLocator) -> Self {
        self.inner
            .get_mut()
            .locators
            .insert(locator.locator, locator);
        self
    }

    pub async fn add_locator(&self, locator: ObjectLocator) {
        self.inner
            .lock()
            .await
            .locators
            .insert(locator.locator, locator);
    }

    pub async fn set_reachable(&self, reachable: bool) {
        self.inner.lock().await.reachable = reachable;
    }

    pub async fn set_latency(&self, latency: Duration) {
        self.inner.lock().await.latency = latency;
    }

    pub async fn set_publish_result(&self, accepted: bool) {
        self.inner.lock().await.publish_result = accepted;
    }

    /// State notifications received, in arrival order
    pub async fn states(&self) -> Vec<State> {
        self.inner.lock().await.states.clone()
    }

    pub async fn statuses(&self) -> Vec<Status> {
        self.inner.lock().await.statuses.clone()
    }

    /// Snapshots published by the application with their `last_data` flag
    pub async fn published(&self) -> Vec<(AvailableData, bool)> {
        self.inner.lock().await.published.clone()
    }

    pub async fn get_data_calls(&self) -> usize {
        self.inner.lock().await.get_data_calls
    }

    pub async fn issued_uids(&self) -> Vec<Uuid> {
        self.inner.lock().await.issued_uids.clone()
    }

    /// Lock the host state after simulating transport latency and reachability
    async fn enter(&self, call: &str) -> Result<tokio::sync::MutexGuard<'_, HostState>> {
        let latency = {
            let state = self.inner.lock().await;
            if !state.reachable {
                return Err(HostingError::unreachable(format!(
                    "{}: in-memory host is offline",
                    call
                )));
            }
            state.latency
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        Ok(self.inner.lock().await)
    }
}

impl Default for InMemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HostInterface for InMemoryHost {
    async fn notify_state_changed(&self, state: State) -> Result<()> {
        let mut host = self.enter("notifyStateChanged").await?;
        info!("Application reported state {}", state);
        host.states.push(state);
        Ok(())
    }

    async fn notify_status(&self, status: Status) -> Result<()> {
        let mut host = self.enter("notifyStatus").await?;
        info!(
            "Application status {:?} {}: {}",
            status.severity, status.code, status.message
        );
        host.statuses.push(status);
        Ok(())
    }

    async fn get_available_screen(&self, preferred: Rect) -> Result<Rect> {
        let host = self.enter("getAvailableScreen").await?;
        Ok(host.screen.unwrap_or(preferred))
    }

    async fn get_data(
        &self,
        uuids: &[Uuid],
        transfer_syntaxes: &[Uuid],
        _include_bulk_data: bool,
    ) -> Result<Vec<ObjectLocator>> {
        let mut host = self.enter("getData").await?;
        host.get_data_calls += 1;
        let locators: Vec<ObjectLocator> = uuids
            .iter()
            .filter_map(|uuid| host.locators.get(uuid))
            .filter(|locator| match locator.transfer_syntax {
                Some(ts) if !transfer_syntaxes.is_empty() && !transfer_syntaxes.contains(&ts) => {
                    if host.strict_transfer_syntaxes {
                        false
                    } else {
                        debug!("Serving {} in its stored transfer syntax", locator.locator);
                        true
                    }
                }
                _ => true,
            })
            .cloned()
            .collect();
        debug!("getData: {} requested, {} resolved", uuids.len(), locators.len());
        Ok(locators)
    }

    async fn get_output_location(&self, _preferred_protocols: &[String]) -> Result<String> {
        let host = self.enter("getOutputLocation").await?;
        Ok(host.output_location.clone())
    }

    async fn generate_uid(&self) -> Result<Uuid> {
        let mut host = self.enter("generateUID").await?;
        let uuid = Uuid::new_v4();
        host.issued_uids.push(uuid);
        Ok(uuid)
    }

    async fn notify_data_available(&self, data: &AvailableData, last_data: bool) -> Result<bool> {
        let mut host = self.enter("notifyDataAvailable").await?;
        let accepted = host.publish_result;
        if accepted {
            host.published.push((data.clone(), last_data));
        }
        Ok(accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_data_resolves_known_uuids_only() {
        let known = Uuid::new_v4();
        let host = InMemoryHost::new().with_locator(ObjectLocator::new(
            known,
            Uuid::new_v4(),
            "file:/tmp/a.dcm",
        ));

        let locators = host
            .get_data(&[known, Uuid::new_v4()], &[], false)
            .await
            .unwrap();
        assert_eq!(locators.len(), 1);
        assert_eq!(locators[0].locator, known);
        assert_eq!(host.get_data_calls().await, 1);
    }

    #[tokio::test]
    async fn test_get_data_honours_transfer_syntax() {
        let uuid = Uuid::new_v4();
        let stored_ts = Uuid::new_v4();
        let host = InMemoryHost::new()
            .with_strict_transfer_syntaxes()
            .with_locator(
                ObjectLocator::new(uuid, Uuid::nil(), "file:/tmp/b.dcm")
                    .with_transfer_syntax(stored_ts),
            );

        assert!(host.get_data(&[uuid], &[Uuid::new_v4()], false).await.unwrap().is_empty());
        assert_eq!(host.get_data(&[uuid], &[stored_ts], false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_data_serves_stored_syntax_when_not_strict() {
        let uuid = Uuid::new_v4();
        let stored_ts = Uuid::new_v4();
        let host = InMemoryHost::new().with_locator(
            ObjectLocator::new(uuid, Uuid::nil(), "file:/tmp/c.dcm").with_transfer_syntax(stored_ts),
        );

        let locators = host.get_data(&[uuid], &[Uuid::new_v4()], false).await.unwrap();
        assert_eq!(locators.len(), 1);
        assert_eq!(locators[0].transfer_syntax, Some(stored_ts));
    }

    #[tokio::test]
    async fn test_offline_host_records_nothing() {
        let host = InMemoryHost::new();
        host.set_reachable(false).await;
        assert!(host.notify_state_changed(State::Idle).await.is_err());
        host.set_reachable(true).await;
        assert!(host.states().await.is_empty());
    }
}
