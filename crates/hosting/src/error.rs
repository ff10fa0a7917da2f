//! Error types for Application Hosting operations

use thiserror::Error;

use crate::state::{Command, State};

/// Result type alias for hosting operations
pub type Result<T> = std::result::Result<T, HostingError>;

/// Error types that can occur while talking to the host or driving the lifecycle
#[derive(Error, Debug)]
pub enum HostingError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Host unreachable: {0}")]
    HostUnreachable(String),

    #[error("Transport fault: {0}")]
    TransportFault(String),

    #[error("Timeout occurred: {0}")]
    Timeout(String),

    #[error("Command {command:?} is not valid in state {state}")]
    InvalidTransition { state: State, command: Command },

    #[error("Resource error: {0}")]
    Resource(String),

    #[error("Host rejected published data")]
    PublishRejected,

    #[error("Invalid locator URI: {0}")]
    InvalidUri(String),

    #[error("Invalid UID: {0}")]
    InvalidUid(String),

    #[error("Message queue closed")]
    QueueClosed,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HostingError {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new host unreachable error
    pub fn unreachable(msg: impl Into<String>) -> Self {
        Self::HostUnreachable(msg.into())
    }

    /// Create a new transport fault
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::TransportFault(msg.into())
    }

    /// Create a new resource error
    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the error stems from the host side of the protocol
    pub fn is_host_failure(&self) -> bool {
        matches!(
            self,
            HostingError::HostUnreachable(_)
                | HostingError::TransportFault(_)
                | HostingError::Timeout(_)
        )
    }

    /// Check if this error is recoverable
    ///
    /// Nothing in the hosting core retries; recoverable errors are logged and
    /// the application keeps running in its current state.
    pub fn is_recoverable(&self) -> bool {
        self.is_host_failure()
            || matches!(
                self,
                HostingError::PublishRejected
                    | HostingError::InvalidTransition { .. }
                    | HostingError::Resource(_)
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_failures_are_recoverable() {
        assert!(HostingError::unreachable("no host").is_recoverable());
        assert!(HostingError::transport("broken pipe").is_recoverable());
        assert!(HostingError::Timeout("5s".into()).is_host_failure());
        assert!(HostingError::PublishRejected.is_recoverable());
        assert!(!HostingError::QueueClosed.is_recoverable());
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = HostingError::InvalidTransition {
            state: State::InProgress,
            command: Command::Resume,
        };
        assert_eq!(
            err.to_string(),
            "Command Resume is not valid in state INPROGRESS"
        );
    }
}
