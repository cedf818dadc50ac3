//! HTTP exposition of live profiling endpoints
//!
//! This module provides the debug HTTP server that serves CPU profiles, heap
//! snapshots, symbol lookups, and sampled traces under `/debug/profiling/`.
//!
//! # Example
//!
//! ```no_run
//! use debug_server::{DebugServer, DebugServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DebugServerConfig::new("127.0.0.1:6060");
//!     let server = DebugServer::with_runtime_backends(config);
//!     let handle = server.start().await?;
//!     println!("profiling endpoints on http://{}/debug/profiling/", handle.local_addr());
//!     Ok(())
//! }
//! ```

// Public modules
pub mod config;
pub mod error;
pub mod routes;
pub mod server;

// Re-export main types
pub use config::DebugServerConfig;
pub use error::{DebugServerError, Result};
pub use routes::{router, DebugState, ROUTE_PREFIX};
pub use server::{DebugServer, DebugServerHandle};
