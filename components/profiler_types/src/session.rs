// Session status reporting

use serde::{Deserialize, Serialize};
use std::fmt;

/// Externally visible state of a capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// No capture running
    Idle,
    /// Capture launched, waiting out the warmup delay
    Waiting,
    /// Artifact open and owned by the session
    Capturing,
}

impl SessionStatus {
    /// Whether a new session of the same kind would be rejected
    pub fn is_busy(&self) -> bool {
        !matches!(self, SessionStatus::Idle)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Idle => write!(f, "idle"),
            SessionStatus::Waiting => write!(f, "waiting"),
            SessionStatus::Capturing => write!(f, "capturing"),
        }
    }
}
