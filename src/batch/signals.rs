//! Shutdown signal handling
//!
//! The run controller polls a [`ShutdownSignal`] between atomic units of
//! work (before each page fetch and before each commit). SIGINT/SIGTERM
//! only set the flag; a batch that is already being committed finishes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Shared cancellation flag
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    shutdown_flag: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if shutdown was requested
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag.load(Ordering::Acquire)
    }

    /// Request shutdown
    pub fn request_shutdown(&self) {
        self.shutdown_flag.store(true, Ordering::Release);
    }
}

/// Create a shutdown signal that listens for SIGINT/SIGTERM
#[cfg(unix)]
pub fn shutdown_signal() -> ShutdownSignal {
    let shutdown = ShutdownSignal::new();
    let handle = shutdown.clone();

    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigint, mut sigterm) =
            match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
                (Ok(sigint), Ok(sigterm)) => (sigint, sigterm),
                (Err(e), _) | (_, Err(e)) => {
                    warn!("Failed to install signal handlers: {}", e);
                    return;
                }
            };

        tokio::select! {
            _ = sigint.recv() => {
                info!("Received SIGINT, stopping after the current unit of work");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, stopping after the current unit of work");
            }
        }

        handle.request_shutdown();
    });

    shutdown
}

#[cfg(not(unix))]
pub fn shutdown_signal() -> ShutdownSignal {
    let shutdown = ShutdownSignal::new();
    let handle = shutdown.clone();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, stopping after the current unit of work");
                handle.request_shutdown();
            }
            Err(e) => {
                warn!("Failed to listen for Ctrl+C signal: {}", e);
            }
        }
    });

    shutdown
}
