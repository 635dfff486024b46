//! Signal handling for graceful shutdown

use anyhow::{Context, Result};
use tokio::signal::unix::{signal, Signal, SignalKind};
use tracing::debug;

/// Handles shutdown signals (SIGTERM, SIGINT)
pub struct ShutdownSignal {
    sigterm: Signal,
    sigint: Signal,
}

impl ShutdownSignal {
    /// Register the signal handlers
    ///
    /// Must be called inside a tokio runtime.
    pub fn new() -> Result<Self> {
        let sigterm =
            signal(SignalKind::terminate()).context("failed to register SIGTERM handler")?;
        let sigint =
            signal(SignalKind::interrupt()).context("failed to register SIGINT handler")?;
        Ok(Self { sigterm, sigint })
    }

    /// Wait for a shutdown signal
    pub async fn wait(&mut self) {
        tokio::select! {
            _ = self.sigterm.recv() => {
                debug!("received SIGTERM");
            }
            _ = self.sigint.recv() => {
                debug!("received SIGINT");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, task};

    #[tokio::test]
    async fn test_wait_pending_without_signal() {
        let mut shutdown = ShutdownSignal::new().unwrap();
        let mut wait = task::spawn(shutdown.wait());
        assert_pending!(wait.poll());
        assert!(!wait.is_woken());
    }
}
