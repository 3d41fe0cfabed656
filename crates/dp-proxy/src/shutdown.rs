//! Shutdown controller
//!
//! Listens for operator interrupts and drives the two-stage shutdown: the
//! first SIGINT/SIGTERM fires the shared cancellation token so every tunnel
//! terminates its child and reports canceled; a second interrupt before the
//! join barrier completes exits the process immediately.

use tokio_util::sync::CancellationToken;

/// Shutdown state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownStage {
    /// Normal operation
    Running,
    /// First interrupt seen; tunnels are winding down cooperatively
    GracefulShutdownRequested,
    /// Second interrupt seen; bypass the join barrier and exit
    ForcedShutdown,
}

impl ShutdownStage {
    /// Advance the state machine by one operator interrupt
    pub fn on_interrupt(self) -> ShutdownStage {
        match self {
            Self::Running => Self::GracefulShutdownRequested,
            Self::GracefulShutdownRequested | Self::ForcedShutdown => Self::ForcedShutdown,
        }
    }
}

/// Arbitrates run termination in response to operator signals
pub struct ShutdownController {
    cancel: CancellationToken,
}

impl ShutdownController {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    /// Spawn the signal-listening task.
    ///
    /// The task lives for the rest of the process; on forced shutdown it
    /// exits the whole process with a non-zero code.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            #[cfg(unix)]
            let mut terminate =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("failed to install signal handler");

            let mut stage = ShutdownStage::Running;

            loop {
                #[cfg(unix)]
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }

                #[cfg(not(unix))]
                let _ = tokio::signal::ctrl_c().await;

                stage = stage.on_interrupt();
                match stage {
                    ShutdownStage::GracefulShutdownRequested => {
                        tracing::warn!(
                            "Interrupted, shutting down tunnels (interrupt again to force exit)"
                        );
                        self.cancel.cancel();
                    }
                    ShutdownStage::ForcedShutdown => {
                        tracing::error!("Interrupted again, forcing exit");
                        std::process::exit(1);
                    }
                    ShutdownStage::Running => unreachable!("interrupt cannot rewind the stage"),
                }
            }
        })
    }
}
