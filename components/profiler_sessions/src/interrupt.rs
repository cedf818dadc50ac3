//! Interrupt-driven shutdown
//!
//! A registration waits once on the profiler's [`ShutdownNotifier`] and stops
//! the selected sessions so their artifacts are closed before the process
//! goes away.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::profiler::Profiler;

/// Source of the process shutdown request
#[async_trait]
pub trait ShutdownNotifier: Send + Sync + fmt::Debug {
    /// Resolve once shutdown has been requested
    async fn notified(&self);
}

/// Notifier fired by SIGINT (ctrl-c) and, on unix, SIGTERM
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalNotifier;

#[async_trait]
impl ShutdownNotifier for SignalNotifier {
    async fn notified(&self) {
        let interrupt = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for interrupt signal");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            use tokio::signal::unix::{signal, SignalKind};

            match signal(SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => {
                    error!(error = %e, "Failed to listen for terminate signal");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = interrupt => info!("Received interrupt signal"),
            _ = terminate => info!("Received terminate signal"),
        }
    }
}

/// Notifier fired explicitly by the host
///
/// Firing is sticky: waiters that arrive after [`ManualNotifier::trigger`]
/// resolve immediately.
#[derive(Debug)]
pub struct ManualNotifier {
    fired: watch::Sender<bool>,
}

impl ManualNotifier {
    /// Create an unfired notifier
    pub fn new() -> Self {
        let (fired, _) = watch::channel(false);
        Self { fired }
    }

    /// Request shutdown
    pub fn trigger(&self) {
        self.fired.send_replace(true);
    }

    /// Whether shutdown has been requested
    pub fn is_triggered(&self) -> bool {
        *self.fired.borrow()
    }
}

impl Default for ManualNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ShutdownNotifier for ManualNotifier {
    async fn notified(&self) {
        let mut fired = self.fired.subscribe();
        // The sender lives as long as self, so the wait cannot fail
        let _ = fired.wait_for(|fired| *fired).await;
    }
}

/// Which sessions an interrupt stops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterruptOptions {
    /// Stop the CPU capture
    pub stop_cpu: bool,
    /// Stop the memory capture
    pub stop_memory: bool,
}

impl InterruptOptions {
    /// Create options for the given sessions
    pub fn new(stop_cpu: bool, stop_memory: bool) -> Self {
        Self {
            stop_cpu,
            stop_memory,
        }
    }

    fn is_empty(&self) -> bool {
        !self.stop_cpu && !self.stop_memory
    }
}

impl Default for InterruptOptions {
    /// Stop the CPU capture only
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl Profiler {
    /// Stop sessions when the process is asked to shut down
    ///
    /// Spawns one task that waits once on the shutdown notifier; it is not
    /// re-armed. Returns `None` without registering anything when `options`
    /// selects no session or when called outside a tokio runtime.
    pub fn on_interrupt(&self, options: InterruptOptions) -> Option<JoinHandle<()>> {
        if options.is_empty() {
            debug!("Interrupt handling requested for no sessions");
            return None;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                error!(error = %e, "Cannot register interrupt handling outside a tokio runtime");
                return None;
            }
        };

        let profiler = self.clone();
        let handle = runtime.spawn(async move {
            profiler.notifier.notified().await;
            info!(?options, "Shutdown requested, stopping profiling sessions");

            if options.stop_cpu {
                profiler.stop_cpu_capture();
            }
            if options.stop_memory {
                profiler.stop_memory_capture();
            }
        });

        Some(handle)
    }

    /// Register interrupt handling with the configured options
    pub fn on_interrupt_default(&self) -> Option<JoinHandle<()>> {
        let options = self.config.read().interrupt();
        self.on_interrupt(options)
    }
}
