//! AWS provider errors

use crate::client::RemoteError;
use crate::monitor::MonitorError;
use stackflow_core::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AwsError {
    #[error("Invalid {event} event for function '{function}': {message}")]
    InvalidEvent {
        function: String,
        event: &'static str,
        message: String,
    },

    #[error("{0}")]
    StackOperationFailed(String),

    #[error("Stack '{0}' does not exist")]
    StackNotFound(String),

    #[error("Unexpected response from {operation}: {message}")]
    UnexpectedResponse { operation: String, message: String },

    #[error("Nothing packaged yet: {0}")]
    NotPackaged(String),

    #[error("No provider client configured for this command")]
    NoClient,

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Request failed: {0}")]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Monitor(#[from] MonitorError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AwsError {
    pub(crate) fn invalid_event(
        function: &str,
        event: &'static str,
        message: impl Into<String>,
    ) -> Self {
        AwsError::InvalidEvent {
            function: function.to_string(),
            event,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AwsError>;
