//! Tunnel orchestrator
//!
//! Owns the full set of tunnels for a run: starts each on its own task, all
//! sharing one cancellation token, and joins them with a barrier. One tunnel
//! failing never cancels its siblings; the orchestrator finishes when asked
//! to (cancellation) or when every tunnel has exited on its own.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use dp_core::config::ProxyProfile;
use dp_core::gcloud::Gcloud;
use dp_core::kubectl::Kubectl;

use crate::tunnel::{BastionTunnel, Tunnel, TunnelOutcome, TunnelReport, WorkloadTunnel};

/// Runs N independent tunnels concurrently to completion or cancellation
pub struct TunnelOrchestrator {
    tunnels: Vec<Tunnel>,
    cancel: CancellationToken,
}

impl TunnelOrchestrator {
    /// Build one tunnel per workload and one per bastion connection, in
    /// declaration order. The bastion zone must already be resolved.
    pub fn new(
        profile: &ProxyProfile,
        kubectl: Kubectl,
        gcloud: Gcloud,
        cancel: CancellationToken,
    ) -> Self {
        let mut tunnels = Vec::new();

        for workload in &profile.workloads {
            tunnels.push(Tunnel::Workload(WorkloadTunnel::new(
                workload.clone(),
                kubectl.clone(),
            )));
        }

        for connection in &profile.bastion.connections {
            tunnels.push(Tunnel::Bastion(BastionTunnel::new(
                profile.bastion.clone(),
                connection.clone(),
                gcloud.clone(),
            )));
        }

        Self { tunnels, cancel }
    }

    /// Number of tunnels this run will start
    pub fn tunnel_count(&self) -> usize {
        self.tunnels.len()
    }

    /// Run every tunnel to a terminal state and collect the reports.
    ///
    /// This is a barrier join: it returns only once all started tunnels are
    /// terminal, however many of them failed. Reports come back in start
    /// order (workloads first, then bastion connections).
    pub async fn run(self) -> Vec<TunnelReport> {
        let mut handles = Vec::with_capacity(self.tunnels.len());

        for tunnel in self.tunnels {
            let cancel = self.cancel.clone();
            let tunnel = Arc::new(tunnel);
            let task_tunnel = Arc::clone(&tunnel);

            handles.push((
                tunnel,
                tokio::spawn(async move { task_tunnel.run(&cancel).await }),
            ));
        }

        let mut reports = Vec::with_capacity(handles.len());
        for (tunnel, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => TunnelOutcome::Failed(format!("tunnel task panicked: {}", e)),
            };

            match &outcome {
                TunnelOutcome::Succeeded => {
                    tracing::info!("Tunnel {} finished", tunnel.label());
                }
                TunnelOutcome::Failed(reason) => {
                    tracing::warn!("Tunnel {} failed: {}", tunnel.label(), reason);
                }
                TunnelOutcome::Canceled => {
                    tracing::info!("Tunnel {} canceled", tunnel.label());
                }
            }

            reports.push(TunnelReport {
                label: tunnel.label(),
                local_port: tunnel.local_port(),
                outcome,
            });
        }

        reports
    }
}
