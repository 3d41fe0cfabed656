//! Bastion tunnel: local port to a fixed remote endpoint via SSH relay

use tokio_util::sync::CancellationToken;

use dp_core::config::{Bastion, Connection};
use dp_core::gcloud::Gcloud;

use super::{supervise, TunnelOutcome};

/// Forwards a local port to a remote host:port through the bastion instance.
///
/// Requires the bastion zone to be resolved before construction; zone
/// discovery happens once per run, upstream of the orchestrator.
pub struct BastionTunnel {
    bastion: Bastion,
    connection: Connection,
    gcloud: Gcloud,
}

impl BastionTunnel {
    pub fn new(bastion: Bastion, connection: Connection, gcloud: Gcloud) -> Self {
        Self {
            bastion,
            connection,
            gcloud,
        }
    }

    pub fn label(&self) -> String {
        format!(
            "{}:{}",
            self.connection.remote_host, self.connection.remote_port
        )
    }

    pub fn local_port(&self) -> u16 {
        self.connection.local_port
    }

    /// Supervise the SSH forwarding process for this connection. The remote
    /// endpoint is static configuration; there is no discovery step.
    pub async fn run(&self, cancel: &CancellationToken) -> TunnelOutcome {
        tracing::info!(
            "Forwarding localhost:{} -> {}:{} via bastion {}",
            self.connection.local_port,
            self.connection.remote_host,
            self.connection.remote_port,
            self.bastion.name
        );

        supervise(
            self.gcloud.ssh_forward_command(&self.bastion, &self.connection),
            cancel,
        )
        .await
    }
}
