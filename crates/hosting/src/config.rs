//! Configuration for the hosted-application runtime

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::transfer_syntax::{TransferSyntax, EXPLICIT_VR_LITTLE_ENDIAN};
use crate::types::Rect;
use crate::FILE_SCHEME;

/// Configuration for a hosted application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostingConfig {
    /// Name the application reports in logs and status messages
    #[serde(default = "default_application_name")]
    pub application_name: String,

    /// Screen area requested from the host when resources are acquired
    #[serde(default = "default_preferred_screen")]
    pub preferred_screen: Rect,

    /// Transfer syntaxes the host is asked for when resolving locators, most
    /// preferred first; every entry is sent with each request
    #[serde(default = "default_transfer_syntaxes")]
    pub preferred_transfer_syntaxes: Vec<String>,

    /// Protocols offered when asking the host for an output location
    #[serde(default = "default_output_protocols")]
    pub output_protocols: Vec<String>,

    /// Ask the host to include bulk (pixel) data in resolved objects
    #[serde(default)]
    pub include_bulk_data: bool,

    /// Upper bound for a single call to the host in milliseconds
    #[serde(default = "default_host_call_timeout")]
    pub host_call_timeout_ms: u64,

    /// Capacity of the host notification queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for HostingConfig {
    fn default() -> Self {
        Self {
            application_name: default_application_name(),
            preferred_screen: default_preferred_screen(),
            preferred_transfer_syntaxes: default_transfer_syntaxes(),
            output_protocols: default_output_protocols(),
            include_bulk_data: false,
            host_call_timeout_ms: default_host_call_timeout(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl HostingConfig {
    /// Get host call timeout as Duration
    pub fn host_call_timeout(&self) -> Duration {
        Duration::from_millis(self.host_call_timeout_ms)
    }

    /// Parsed transfer syntaxes, in configured order
    pub fn transfer_syntaxes(&self) -> crate::error::Result<Vec<TransferSyntax>> {
        self.preferred_transfer_syntaxes
            .iter()
            .map(TransferSyntax::new)
            .collect()
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.application_name.trim().is_empty() {
            return Err(crate::error::HostingError::config(
                "Application name cannot be empty",
            ));
        }

        if self.preferred_screen.is_empty() {
            return Err(crate::error::HostingError::config(
                "Preferred screen area must have a non-zero size",
            ));
        }

        self.transfer_syntaxes()?;

        if self.output_protocols.is_empty() {
            return Err(crate::error::HostingError::config(
                "At least one output protocol is required",
            ));
        }

        if self.host_call_timeout_ms == 0 {
            return Err(crate::error::HostingError::config(
                "Host call timeout must be greater than 0",
            ));
        }

        if self.queue_capacity == 0 {
            return Err(crate::error::HostingError::config(
                "Queue capacity must be greater than 0",
            ));
        }

        Ok(())
    }
}

// Default value functions
fn default_application_name() -> String {
    "dah-viewer".to_string()
}

fn default_preferred_screen() -> Rect {
    Rect::new(50, 50, 100, 100)
}

fn default_transfer_syntaxes() -> Vec<String> {
    vec![EXPLICIT_VR_LITTLE_ENDIAN.to_string()]
}

fn default_output_protocols() -> Vec<String> {
    vec![FILE_SCHEME.to_string()]
}

fn default_host_call_timeout() -> u64 {
    10_000 // 10 seconds
}

fn default_queue_capacity() -> usize {
    64
}
