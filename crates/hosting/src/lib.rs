//! DICOM Application Hosting (PS3.19) core for hosted applications
//!
//! This crate implements the host-agnostic half of the Application Hosting
//! protocol as seen from a hosted application: the lifecycle state machine,
//! the available-data tree and index, the outbound host session and
//! locator resolution. It never touches pixel data; objects are carried by
//! identity (UUID) and metadata only.
//!
//! # Features
//! - Lifecycle state machine (IDLE, INPROGRESS, SUSPENDED, EXIT)
//! - Single-consumer message queue for host notifications
//! - Host session with bounded, explicitly failing calls
//! - Locator resolution with a `(uuid, transfer syntax)` cache
//! - In-memory host for tests and local harnesses

pub mod config;
pub mod error;
pub mod host;
pub mod index;
pub mod locator;
pub mod memory;
pub mod runtime;
pub mod state;
pub mod transfer_syntax;
pub mod types;

// Re-export commonly used types
pub use config::HostingConfig;
pub use error::{HostingError, Result};
pub use host::{HostInterface, HostSession};
pub use index::{Artifact, Merged, ResultData};
pub use locator::{uri_to_path, LocatorResolver, Resolution};
pub use memory::InMemoryHost;
pub use runtime::{AppHandle, Application, HostContext, HostMessage, ReleaseScope, Runtime};
pub use state::{Command, Resources, State};
pub use transfer_syntax::TransferSyntax;
pub use types::{
    AvailableData, ObjectDescriptor, ObjectLocator, Patient, Rect, Series, Status,
    StatusSeverity, Study,
};

/// URI scheme prefix used for file-based locators
pub const FILE_SCHEME: &str = "file:";
