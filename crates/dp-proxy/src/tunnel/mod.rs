//! Tunnel units
//!
//! A tunnel is one forwarding channel backed by exactly one external child
//! process. Two variants exist: workload tunnels (`kubectl port-forward`
//! after pod discovery) and bastion tunnels (`gcloud compute ssh -L`).
//! Both share the supervision loop in this module.

mod bastion;
mod workload;

pub use bastion::BastionTunnel;
pub use workload::WorkloadTunnel;

use std::fmt;
use std::process::Stdio;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Terminal state of one tunnel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TunnelOutcome {
    /// The forwarding process exited cleanly on its own
    Succeeded,
    /// Discovery failed or the forwarding process exited abnormally.
    /// Isolated to this tunnel; never aborts the run.
    Failed(String),
    /// The shared cancellation signal fired and the process was terminated.
    /// Always reported separately from `Failed`.
    Canceled,
}

impl fmt::Display for TunnelOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
            Self::Canceled => write!(f, "canceled"),
        }
    }
}

/// Per-tunnel result collected at the orchestrator's join barrier
#[derive(Debug, Clone)]
pub struct TunnelReport {
    /// Human-readable tunnel label (`namespace/app` or `host:port`)
    pub label: String,
    /// Local port this tunnel owned
    pub local_port: u16,
    /// Terminal state
    pub outcome: TunnelOutcome,
}

/// One tunnel of either variant, ready to run
pub enum Tunnel {
    Workload(WorkloadTunnel),
    Bastion(BastionTunnel),
}

impl Tunnel {
    pub fn label(&self) -> String {
        match self {
            Self::Workload(t) => t.label(),
            Self::Bastion(t) => t.label(),
        }
    }

    pub fn local_port(&self) -> u16 {
        match self {
            Self::Workload(t) => t.local_port(),
            Self::Bastion(t) => t.local_port(),
        }
    }

    /// Run the tunnel to a terminal state. Never returns `Err`; every
    /// failure is contained in the outcome.
    pub async fn run(&self, cancel: &CancellationToken) -> TunnelOutcome {
        match self {
            Self::Workload(t) => t.run(cancel).await,
            Self::Bastion(t) => t.run(cancel).await,
        }
    }
}

/// Supervise one forwarding child process until it exits or the shared
/// cancellation signal fires.
///
/// On cancellation the child receives a kill and is awaited before the
/// tunnel reports `Canceled`; a non-zero exit with no cancellation pending
/// reports `Failed` with the child's stderr.
pub(crate) async fn supervise(mut cmd: Command, cancel: &CancellationToken) -> TunnelOutcome {
    if cancel.is_cancelled() {
        return TunnelOutcome::Canceled;
    }

    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            return TunnelOutcome::Failed(format!(
                "failed to start {}: {}",
                cmd.as_std().get_program().to_string_lossy(),
                e
            ));
        }
    };

    // Drain stderr concurrently so the child never blocks on a full pipe
    let stderr = child.stderr.take();
    let stderr_task = tokio::spawn(async move {
        let mut buf = String::new();
        if let Some(mut stream) = stderr {
            let _ = stream.read_to_string(&mut buf).await;
        }
        buf
    });

    tokio::select! {
        status = child.wait() => match status {
            Ok(status) if status.success() => TunnelOutcome::Succeeded,
            Ok(status) => {
                let diagnostics = stderr_task.await.unwrap_or_default();
                let diagnostics = stderr_tail(&diagnostics);
                if diagnostics.is_empty() {
                    TunnelOutcome::Failed(format!("process exited with {}", status))
                } else {
                    TunnelOutcome::Failed(format!(
                        "process exited with {}: {}",
                        status, diagnostics
                    ))
                }
            }
            Err(e) => TunnelOutcome::Failed(format!("failed to wait on process: {}", e)),
        },
        _ = cancel.cancelled() => {
            let _ = child.start_kill();
            let _ = child.wait().await;
            TunnelOutcome::Canceled
        }
    }
}

/// Last few stderr lines, enough to identify the failure without flooding
/// the summary
fn stderr_tail(stderr: &str) -> String {
    const MAX_LINES: usize = 4;

    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(MAX_LINES);
    lines[start..].join(" | ")
}
