//! Message-driven runtime for a hosted application
//!
//! Host notifications and application-local actions are queued onto one
//! channel and handled one at a time, in arrival order, by [`Runtime::run`].
//! Every lifecycle side effect completes before the matching state
//! notification is sent to the host.

use std::ops::ControlFlow;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::HostingConfig;
use crate::error::{HostingError, Result};
use crate::host::HostSession;
use crate::index::{self, Artifact, Merged, ResultData};
use crate::locator::{LocatorResolver, Resolution};
use crate::state::{Command, Resources, State};
use crate::transfer_syntax::TransferSyntax;
use crate::types::{AvailableData, ObjectLocator, Rect};

/// Message delivered to the application's queue
#[derive(Debug)]
pub enum HostMessage<A> {
    Start,
    Resume,
    Suspend,
    Cancel,
    Exit,
    /// New available-data snapshot from the host
    DataAvailable { data: AvailableData, last_data: bool },
    /// Host asks the application to show itself in `area`
    BringToFront {
        area: Rect,
        reply: Option<oneshot::Sender<bool>>,
    },
    /// Host asks for locators of data the application published
    GetData {
        uuids: Vec<Uuid>,
        transfer_syntaxes: Vec<Uuid>,
        include_bulk_data: bool,
        reply: oneshot::Sender<Vec<ObjectLocator>>,
    },
    /// Application-local event, e.g. a user request
    Action(A),
}

impl<A> HostMessage<A> {
    /// Lifecycle command carried by this message, if any
    pub fn command(&self) -> Option<Command> {
        match self {
            HostMessage::Start => Some(Command::Start),
            HostMessage::Resume => Some(Command::Resume),
            HostMessage::Suspend => Some(Command::Suspend),
            HostMessage::Cancel => Some(Command::Cancel),
            HostMessage::Exit => Some(Command::Exit),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            HostMessage::Start => "start",
            HostMessage::Resume => "resume",
            HostMessage::Suspend => "suspend",
            HostMessage::Cancel => "cancel",
            HostMessage::Exit => "exit",
            HostMessage::DataAvailable { .. } => "data_available",
            HostMessage::BringToFront { .. } => "bring_to_front",
            HostMessage::GetData { .. } => "get_data",
            HostMessage::Action(_) => "action",
        }
    }
}

/// Which resources a release covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseScope {
    /// Resources that can be reclaimed on resume
    Reclaimable,
    /// Everything the application holds
    All,
}

/// Behaviour of a hosted application
///
/// The runtime owns the lifecycle; implementations only acquire and release
/// what they need and react to data and actions. Release must be safe to call
/// when nothing is held.
#[async_trait]
pub trait Application: Send {
    /// Application-local events queued alongside host messages
    type Action: Send + std::fmt::Debug + 'static;

    /// Acquire working resources on `start`
    async fn acquire_resources(&mut self, ctx: &mut HostContext<'_>) -> Result<()>;

    /// Reclaim resources released by a suspend
    async fn reclaim_resources(&mut self, _ctx: &mut HostContext<'_>) -> Result<()> {
        Ok(())
    }

    async fn release_resources(&mut self, scope: ReleaseScope) -> Result<()>;

    /// A new snapshot is available through [`HostContext::incoming`]
    async fn data_available(&mut self, ctx: &mut HostContext<'_>) -> Result<()>;

    async fn bring_to_front(&mut self, _area: Rect) -> bool {
        true
    }

    async fn handle_action(&mut self, action: Self::Action, ctx: &mut HostContext<'_>)
        -> Result<()>;
}

/// Everything a handler may use while the runtime is dispatching a message
pub struct HostContext<'a> {
    session: &'a HostSession,
    config: &'a HostingConfig,
    incoming: Option<&'a AvailableData>,
    last_data: bool,
    resolver: &'a mut LocatorResolver,
    results: &'a mut ResultData,
}

impl HostContext<'_> {
    pub fn session(&self) -> &HostSession {
        self.session
    }

    pub fn config(&self) -> &HostingConfig {
        self.config
    }

    /// Latest snapshot received from the host
    pub fn incoming(&self) -> Option<&AvailableData> {
        self.incoming
    }

    /// Whether the host marked the latest snapshot as final
    pub fn is_last_data(&self) -> bool {
        self.last_data
    }

    pub fn results(&self) -> &ResultData {
        self.results
    }

    /// Resolve UUIDs, asking for the configured transfer syntaxes
    pub async fn resolve(&mut self, uuids: &[Uuid]) -> Result<Resolution> {
        let preferred = self.config.transfer_syntaxes()?;
        self.resolve_with(uuids, &preferred).await
    }

    pub async fn resolve_with(
        &mut self,
        uuids: &[Uuid],
        transfer_syntaxes: &[TransferSyntax],
    ) -> Result<Resolution> {
        self.resolver
            .resolve(
                self.session,
                uuids,
                transfer_syntaxes,
                self.config.include_bulk_data,
            )
            .await
    }

    /// Where the host wants produced artifacts written
    pub async fn output_location(&self) -> Result<String> {
        self.session
            .get_output_location(&self.config.output_protocols)
            .await
    }

    /// Merge a produced artifact into the result tree
    pub async fn merge(&mut self, artifact: Artifact) -> Result<Merged> {
        self.results.merge(self.session, artifact).await
    }

    /// Publish the whole result tree
    ///
    /// On failure the result tree is left untouched so a later publish can
    /// send it again.
    pub async fn publish(&mut self, last_data: bool) -> Result<()> {
        match self.session.publish_data(self.results.data(), last_data).await {
            Ok(()) => {
                info!(
                    "Published {} produced object(s) (last_data={})",
                    self.results.len(),
                    last_data
                );
                Ok(())
            }
            Err(e) => {
                error!("Failed to publish data: {}", e);
                Err(e)
            }
        }
    }
}

/// Sending half of the application's queue, used by the host adapter
pub struct AppHandle<A> {
    tx: mpsc::Sender<HostMessage<A>>,
}

impl<A> Clone for AppHandle<A> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<A: Send + 'static> AppHandle<A> {
    /// Queue a message
    pub async fn send(&self, message: HostMessage<A>) -> Result<()> {
        self.tx
            .send(message)
            .await
            .map_err(|_| HostingError::QueueClosed)
    }

    pub async fn start(&self) -> Result<()> {
        self.send(HostMessage::Start).await
    }

    pub async fn resume(&self) -> Result<()> {
        self.send(HostMessage::Resume).await
    }

    pub async fn suspend(&self) -> Result<()> {
        self.send(HostMessage::Suspend).await
    }

    pub async fn cancel(&self) -> Result<()> {
        self.send(HostMessage::Cancel).await
    }

    pub async fn exit(&self) -> Result<()> {
        self.send(HostMessage::Exit).await
    }

    pub async fn data_available(&self, data: AvailableData, last_data: bool) -> Result<()> {
        self.send(HostMessage::DataAvailable { data, last_data })
            .await
    }

    pub async fn action(&self, action: A) -> Result<()> {
        self.send(HostMessage::Action(action)).await
    }

    /// Ask the application to come to the front and wait for its answer
    pub async fn bring_to_front(&self, area: Rect) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        self.send(HostMessage::BringToFront {
            area,
            reply: Some(reply),
        })
        .await?;
        rx.await.map_err(|_| HostingError::QueueClosed)
    }

    /// Ask the application for locators of data it published
    pub async fn get_data(
        &self,
        uuids: Vec<Uuid>,
        transfer_syntaxes: Vec<Uuid>,
        include_bulk_data: bool,
    ) -> Result<Vec<ObjectLocator>> {
        let (reply, rx) = oneshot::channel();
        self.send(HostMessage::GetData {
            uuids,
            transfer_syntaxes,
            include_bulk_data,
            reply,
        })
        .await?;
        rx.await.map_err(|_| HostingError::QueueClosed)
    }
}

macro_rules! context {
    ($runtime:expr) => {
        HostContext {
            session: &$runtime.session,
            config: &$runtime.config,
            incoming: $runtime.incoming.as_ref(),
            last_data: $runtime.last_data,
            resolver: &mut $runtime.resolver,
            results: &mut $runtime.results,
        }
    };
}

/// Drives one hosted application
pub struct Runtime<A: Application> {
    app: A,
    config: HostingConfig,
    session: HostSession,
    state: State,
    resources: Resources,
    incoming: Option<AvailableData>,
    last_data: bool,
    pending_data: bool,
    resolver: LocatorResolver,
    results: ResultData,
    rx: mpsc::Receiver<HostMessage<A::Action>>,
}

impl<A: Application> Runtime<A> {
    /// Create a runtime and the handle feeding its queue
    pub fn new(app: A, config: HostingConfig, session: HostSession) -> (Self, AppHandle<A::Action>) {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let runtime = Self {
            app,
            config,
            session,
            state: State::Idle,
            resources: Resources::Released,
            incoming: None,
            last_data: false,
            pending_data: false,
            resolver: LocatorResolver::new(),
            results: ResultData::new(Uuid::new_v4()),
            rx,
        };
        (runtime, AppHandle { tx })
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn resources(&self) -> Resources {
        self.resources
    }

    pub fn app(&self) -> &A {
        &self.app
    }

    pub fn results(&self) -> &ResultData {
        &self.results
    }

    pub fn incoming(&self) -> Option<&AvailableData> {
        self.incoming.as_ref()
    }

    /// Announce readiness, then consume the queue until EXIT or until every
    /// handle is dropped. Returns the final state.
    pub async fn run(&mut self) -> State {
        info!(
            "Hosted application '{}' ready (source {})",
            self.config.application_name,
            self.results.source()
        );
        self.session.notify_state_changed(self.state).await;

        while let Some(message) = self.rx.recv().await {
            if self.dispatch(message).await.is_break() {
                break;
            }
        }
        debug!("Runtime loop finished in state {}", self.state);
        self.state
    }

    /// Handle one message
    pub async fn dispatch(&mut self, message: HostMessage<A::Action>) -> ControlFlow<()> {
        let span = info_span!("host_message", kind = message.kind(), state = %self.state);
        self.dispatch_inner(message).instrument(span).await;
        if self.state.is_terminal() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    async fn dispatch_inner(&mut self, message: HostMessage<A::Action>) {
        if self.state.is_terminal() {
            warn!("Application has exited; dropping {} message", message.kind());
            return;
        }

        if let Some(command) = message.command() {
            self.apply(command).await;
            return;
        }

        match message {
            HostMessage::DataAvailable { data, last_data } => {
                self.on_data_available(data, last_data).await
            }
            HostMessage::BringToFront { area, reply } => {
                let shown = if self.resources == Resources::Held {
                    self.app.bring_to_front(area).await
                } else {
                    debug!("bringToFront with no resources held");
                    false
                };
                if let Some(reply) = reply {
                    let _ = reply.send(shown);
                }
            }
            HostMessage::GetData { uuids, reply, .. } => {
                let locators = self.results.locators_for(&uuids);
                debug!(
                    "Host requested {} produced object(s), {} resolved",
                    uuids.len(),
                    locators.len()
                );
                let _ = reply.send(locators);
            }
            HostMessage::Action(action) => {
                if self.state != State::InProgress || self.resources != Resources::Held {
                    warn!("Ignoring action {:?} in state {}", action, self.state);
                    return;
                }
                let mut ctx = context!(self);
                if let Err(e) = self.app.handle_action(action, &mut ctx).await {
                    error!("Action failed: {}", e);
                }
            }
            _ => {}
        }
    }

    async fn on_data_available(&mut self, data: AvailableData, last_data: bool) {
        let duplicates = index::duplicate_uuids(&data);
        if !duplicates.is_empty() {
            warn!("Available data repeats UUIDs {:?}", duplicates);
        }
        info!(
            "Received available data: {} patient(s), {} object(s), last_data={}",
            data.patients.len(),
            index::descriptor_count(&data),
            last_data
        );

        // the new snapshot replaces the old one; cached locators refer to it
        self.resolver.invalidate();
        self.incoming = Some(data);
        self.last_data = last_data;

        if self.state == State::InProgress && self.resources == Resources::Held {
            self.deliver_data().await;
        } else {
            warn!("Data available in state {}; kept until work resumes", self.state);
            self.pending_data = true;
        }
    }

    async fn deliver_data(&mut self) {
        self.pending_data = false;
        let mut ctx = context!(self);
        if let Err(e) = self.app.data_available(&mut ctx).await {
            error!("Handling available data failed: {}", e);
        }
    }

    async fn apply(&mut self, command: Command) {
        let Some(target) = self.state.on(command) else {
            warn!(
                "{}",
                HostingError::InvalidTransition {
                    state: self.state,
                    command
                }
            );
            return;
        };

        match command {
            Command::Start => {
                let mut ctx = context!(self);
                let acquired = self.app.acquire_resources(&mut ctx).await;
                match acquired {
                    Ok(()) => {
                        self.resources = Resources::Held;
                        self.transition(target).await;
                        if self.pending_data {
                            self.deliver_data().await;
                        }
                    }
                    Err(e) => {
                        error!("Could not acquire resources on start: {}", e);
                        self.release(ReleaseScope::All).await;
                        self.session.notify_state_changed(self.state).await;
                    }
                }
            }
            Command::Resume => {
                let mut ctx = context!(self);
                let reclaimed = self.app.reclaim_resources(&mut ctx).await;
                match reclaimed {
                    Ok(()) => {
                        self.resources = Resources::Held;
                        self.transition(target).await;
                        if self.pending_data {
                            self.deliver_data().await;
                        }
                    }
                    Err(e) => {
                        error!("Could not reclaim resources on resume: {}", e);
                        self.session.notify_state_changed(self.state).await;
                    }
                }
            }
            Command::Suspend => {
                self.release(ReleaseScope::Reclaimable).await;
                self.transition(target).await;
            }
            Command::Cancel => {
                self.release(ReleaseScope::All).await;
                self.incoming = None;
                self.pending_data = false;
                self.resolver.invalidate();
                if self.state != target {
                    self.transition(target).await;
                }
            }
            Command::Exit => {
                self.release(ReleaseScope::All).await;
                self.transition(target).await;
                info!("Exiting");
            }
        }
    }

    /// Release resources; failures are logged and the flag is updated anyway
    async fn release(&mut self, scope: ReleaseScope) {
        if let Err(e) = self.app.release_resources(scope).await {
            error!("Releasing resources ({:?}) failed: {}", scope, e);
        }
        self.resources = match (scope, self.resources) {
            (ReleaseScope::All, _) => Resources::Released,
            (ReleaseScope::Reclaimable, Resources::Held) => Resources::Suspended,
            (ReleaseScope::Reclaimable, held) => held,
        };
    }

    async fn transition(&mut self, target: State) {
        debug!("State {} -> {}", self.state, target);
        self.state = target;
        self.session.notify_state_changed(target).await;
    }
}
