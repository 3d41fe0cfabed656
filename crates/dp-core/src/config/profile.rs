//! Proxy profile types
//!
//! A profile describes everything one environment needs: the bastion host
//! with its relayed connections, and the cluster workloads to port-forward.
//! Profiles are read-only input; the only runtime mutation in the whole
//! model is the bastion zone, which is discovered once before any tunnel
//! starts.

use serde::{Deserialize, Serialize};

/// One bastion-relayed tunnel endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    /// Local port to bind
    pub local_port: u16,
    /// Remote host reached through the bastion
    pub remote_host: String,
    /// Port on the remote host
    pub remote_port: u16,
}

/// Bastion host descriptor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bastion {
    /// Compute instance name
    pub name: String,
    /// Compute zone. Discovered at runtime via `gcloud compute instances
    /// list`; left empty in configuration.
    #[serde(default)]
    pub zone: String,
    /// Connections relayed through this bastion, in declaration order
    #[serde(default)]
    pub connections: Vec<Connection>,
}

/// One cluster-forwarded tunnel endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workload {
    /// Kubernetes namespace
    pub namespace: String,
    /// App label selector value (`-l app=<app>`)
    pub app: String,
    /// Local port to bind
    pub local_port: u16,
    /// Container port to forward to
    pub remote_port: u16,
}

/// The selected configuration profile for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyProfile {
    /// Environment name this profile serves (dev, staging, prod, ...)
    pub environment: String,
    /// Cloud project the bastion and cluster live in
    #[serde(default)]
    pub cloud_project: String,
    /// Bastion host descriptor
    pub bastion: Bastion,
    /// Cluster workloads, in declaration order
    #[serde(default)]
    pub workloads: Vec<Workload>,
}
