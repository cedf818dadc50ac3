//! Server configuration

use serde::{Deserialize, Serialize};

/// Configuration for the profiling debug HTTP server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugServerConfig {
    /// Address to bind to, `host:port` (port 0 picks an ephemeral port)
    pub bind_address: String,

    /// CPU profile length when the request gives no `seconds` (default 30)
    pub default_profile_seconds: u64,

    /// Longest CPU profile or trace a request may ask for (default 300)
    pub max_profile_seconds: u64,

    /// Trace length when the request gives no `seconds` (default 1)
    pub default_trace_seconds: u64,
}

impl Default for DebugServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:6060".to_string(),
            default_profile_seconds: 30,
            max_profile_seconds: 300,
            default_trace_seconds: 1,
        }
    }
}

impl DebugServerConfig {
    /// Create a new server configuration bound to `address`
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            bind_address: address.into(),
            ..Default::default()
        }
    }

    /// Set default CPU profile length
    pub fn with_default_profile_seconds(mut self, seconds: u64) -> Self {
        self.default_profile_seconds = seconds;
        self
    }

    /// Set maximum profile length
    pub fn with_max_profile_seconds(mut self, seconds: u64) -> Self {
        self.max_profile_seconds = seconds;
        self
    }

    /// Set default trace length
    pub fn with_default_trace_seconds(mut self, seconds: u64) -> Self {
        self.default_trace_seconds = seconds;
        self
    }
}
