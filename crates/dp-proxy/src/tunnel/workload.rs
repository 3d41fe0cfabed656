//! Workload tunnel: local port to a pod selected at runtime

use tokio_util::sync::CancellationToken;

use dp_core::config::Workload;
use dp_core::kubectl::Kubectl;

use super::{supervise, TunnelOutcome};

/// Forwards a local port into the first running pod of a cluster workload
pub struct WorkloadTunnel {
    workload: Workload,
    kubectl: Kubectl,
}

impl WorkloadTunnel {
    pub fn new(workload: Workload, kubectl: Kubectl) -> Self {
        Self { workload, kubectl }
    }

    pub fn label(&self) -> String {
        format!("{}/{}", self.workload.namespace, self.workload.app)
    }

    pub fn local_port(&self) -> u16 {
        self.workload.local_port
    }

    /// Discover a running pod, then supervise the port-forward process.
    ///
    /// Zero running pods is a tunnel-local failure; nothing is spawned and
    /// sibling tunnels are unaffected.
    pub async fn run(&self, cancel: &CancellationToken) -> TunnelOutcome {
        if cancel.is_cancelled() {
            return TunnelOutcome::Canceled;
        }

        let workload = &self.workload;

        let discovery = self
            .kubectl
            .first_running_pod(&workload.namespace, &workload.app);

        let pod = tokio::select! {
            result = discovery => match result {
                Ok(Some(pod)) => pod,
                Ok(None) => {
                    return TunnelOutcome::Failed(format!(
                        "no running pod for app {} in namespace {}",
                        workload.app, workload.namespace
                    ));
                }
                Err(e) => return TunnelOutcome::Failed(e.to_string()),
            },
            _ = cancel.cancelled() => return TunnelOutcome::Canceled,
        };

        tracing::info!(
            "Forwarding localhost:{} -> {}/{}:{} (pod {})",
            workload.local_port,
            workload.namespace,
            workload.app,
            workload.remote_port,
            pod
        );

        supervise(self.kubectl.port_forward_command(workload, &pod), cancel).await
    }
}
