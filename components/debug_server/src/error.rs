//! Error types for the debug server

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use profiler_runtime::RuntimeError;
use thiserror::Error;
use tracing::warn;

/// Errors that can occur in the debug server
#[derive(Error, Debug)]
pub enum DebugServerError {
    /// Bind address could not be parsed or resolved
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Listener could not be bound
    #[error("Failed to bind {address}: {source}")]
    Bind {
        /// Address that was requested
        address: String,
        /// Underlying socket error
        #[source]
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested profile is longer than the configured maximum
    #[error("Profile duration {requested}s exceeds maximum of {max}s")]
    DurationTooLong {
        /// Seconds asked for
        requested: u64,
        /// Configured ceiling
        max: u64,
    },

    /// No profile with the requested name
    #[error("Unknown profile: {0}")]
    UnknownProfile(String),

    /// The runtime sampler or heap profiler failed
    #[error("Could not produce profile: {0}")]
    Profile(#[from] RuntimeError),
}

impl DebugServerError {
    /// HTTP status answered for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            DebugServerError::DurationTooLong { .. } => StatusCode::BAD_REQUEST,
            DebugServerError::UnknownProfile(_) => StatusCode::NOT_FOUND,
            DebugServerError::Profile(RuntimeError::HeapProfilingUnavailable(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            DebugServerError::Profile(RuntimeError::SamplerBusy) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for DebugServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            warn!(error = %self, "Profiling request failed");
        }
        (status, self.to_string()).into_response()
    }
}

/// Result type for debug server operations
pub type Result<T> = std::result::Result<T, DebugServerError>;
