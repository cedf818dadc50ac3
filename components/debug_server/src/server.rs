//! Debug HTTP server implementation

use profiler_runtime::{default_heap_snapshotter, CpuSampler, HeapSnapshotter, PprofCpuSampler};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::DebugServerConfig;
use crate::error::{DebugServerError, Result};
use crate::routes::{router, DebugState, ROUTE_PREFIX};

/// Profiling debug HTTP server
pub struct DebugServer {
    /// Server configuration
    config: DebugServerConfig,

    /// Runtime backends shared by the handlers
    state: DebugState,
}

impl DebugServer {
    /// Create a server over explicit runtime backends
    pub fn new(
        config: DebugServerConfig,
        cpu: Arc<dyn CpuSampler>,
        heap: Arc<dyn HeapSnapshotter>,
    ) -> Self {
        let state = DebugState::new(config.clone(), cpu, heap);
        Self { config, state }
    }

    /// Create a server over the process-wide `pprof` sampler and the default
    /// heap snapshotter
    pub fn with_runtime_backends(config: DebugServerConfig) -> Self {
        Self::new(
            config,
            Arc::new(PprofCpuSampler::default()),
            default_heap_snapshotter(),
        )
    }

    /// Get the server configuration
    pub fn config(&self) -> &DebugServerConfig {
        &self.config
    }

    /// Bind the listener and serve on a background task
    ///
    /// Bind failures are returned to the caller. Once bound, serving errors
    /// are logged and end the task; they never terminate the process.
    pub async fn start(&self) -> Result<DebugServerHandle> {
        let address = self.config.bind_address.clone();

        let addr = resolve_bind_address(&address).await?;

        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(source) => {
                error!(%address, error = %source, "Failed to bind debug profiling listener");
                return Err(DebugServerError::Bind { address, source });
            }
        };
        let local_addr = listener.local_addr()?;

        info!(
            "Profiling endpoints available at http://{}{}/",
            local_addr, ROUTE_PREFIX
        );

        let app = router(self.state.clone());
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let shutdown = async {
                if shutdown_rx.await.is_err() {
                    // Handle dropped without shutdown: keep serving
                    std::future::pending::<()>().await;
                }
            };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!(error = %e, "Debug profiling server error");
            }
            debug!("Debug profiling server stopped");
        });

        Ok(DebugServerHandle {
            local_addr,
            shutdown_tx: Some(shutdown_tx),
            task,
        })
    }
}

/// Handle to a running debug server
///
/// Dropping the handle detaches the server; it then serves for the life of the
/// process.
#[derive(Debug)]
pub struct DebugServerHandle {
    local_addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl DebugServerHandle {
    /// Address the listener is bound to (resolves ephemeral ports)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Base URL of the profiling namespace
    pub fn base_url(&self) -> String {
        format!("http://{}{}/", self.local_addr, ROUTE_PREFIX)
    }

    /// Whether the serving task has ended
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop accepting connections and wait for the serving task to end
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.task).await {
            error!(error = %e, "Debug profiling server task failed");
        }
        info!("Debug profiling server on {} shut down", self.local_addr);
    }
}

/// Resolve the configured listener address to the first socket address
async fn resolve_bind_address(address: &str) -> Result<SocketAddr> {
    let resolved = match tokio::net::lookup_host(address).await {
        Ok(mut addrs) => addrs.next(),
        Err(e) => {
            error!(%address, error = %e, "Failed to resolve debug profiling listener address");
            return Err(DebugServerError::InvalidAddress(format!("{}: {}", address, e)));
        }
    };

    resolved.ok_or_else(|| {
        error!(%address, "Debug profiling listener address resolved to nothing");
        DebugServerError::InvalidAddress(address.to_string())
    })
}
