//! Port registry
//!
//! Computes the set of local ports a run intends to bind and answers whether
//! a port is currently free on the host. Registration is pure; host probing
//! shells out to `lsof` and is a point-in-time snapshot only; a port that
//! goes busy after the probe surfaces later as an ordinary tunnel-start
//! failure.

use std::collections::HashSet;
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

use dp_core::config::ProxyProfile;

/// Port registration errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PortError {
    /// A local port is claimed twice within the active profile
    #[error("Duplicate local port {0} in the configuration")]
    DuplicateLocalPort(u16),
}

/// Collect the local ports the active profile will bind.
///
/// Scan order is all workloads in declaration order, then all bastion
/// connections in declaration order. The first port claimed twice aborts
/// the whole registration; no partial port set is ever produced.
pub fn local_ports(profile: &ProxyProfile) -> Result<Vec<u16>, PortError> {
    let claims = profile
        .workloads
        .iter()
        .map(|w| w.local_port)
        .chain(profile.bastion.connections.iter().map(|c| c.local_port));

    let mut seen = HashSet::new();
    let mut ports = Vec::new();
    for port in claims {
        if !seen.insert(port) {
            return Err(PortError::DuplicateLocalPort(port));
        }
        ports.push(port);
    }

    Ok(ports)
}

/// Host-level port inspection and reclamation.
///
/// Two separate capabilities behind one seam so the conflict-resolution
/// policy loop can be exercised without touching real sockets.
#[async_trait]
pub trait PortHost {
    /// Is the port currently free on this host?
    async fn is_free(&self, port: u16) -> std::io::Result<bool>;

    /// Forcibly terminate whatever process is bound to the port
    async fn kill_owner(&self, port: u16) -> std::io::Result<()>;
}

/// Production [`PortHost`] backed by `lsof` and `kill`
#[derive(Debug, Default)]
pub struct LsofPortHost;

impl LsofPortHost {
    /// PIDs currently bound to the port, via `lsof -t`
    async fn owner_pids(&self, port: u16) -> std::io::Result<Vec<String>> {
        let output = Command::new("lsof")
            .arg("-t")
            .arg(format!("-i:{}", port))
            .stdin(Stdio::null())
            .output()
            .await?;

        // lsof exits non-zero when nothing matches
        if !output.status.success() {
            return Ok(Vec::new());
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect())
    }
}

#[async_trait]
impl PortHost for LsofPortHost {
    async fn is_free(&self, port: u16) -> std::io::Result<bool> {
        Ok(self.owner_pids(port).await?.is_empty())
    }

    async fn kill_owner(&self, port: u16) -> std::io::Result<()> {
        let pids = self.owner_pids(port).await?;
        if pids.is_empty() {
            // Owner already exited between probe and reclaim
            return Ok(());
        }

        tracing::info!("Killing process(es) {} using port {}", pids.join(", "), port);

        let status = Command::new("kill")
            .arg("-9")
            .args(&pids)
            .stdin(Stdio::null())
            .status()
            .await?;

        if !status.success() {
            return Err(std::io::Error::other(format!(
                "kill -9 {} exited with {}",
                pids.join(" "),
                status
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dp_core::config::{Bastion, Connection, Workload};

    fn workload(port: u16) -> Workload {
        Workload {
            namespace: "default".to_string(),
            app: format!("app-{}", port),
            local_port: port,
            remote_port: 80,
        }
    }

    fn connection(port: u16) -> Connection {
        Connection {
            local_port: port,
            remote_host: "db.internal".to_string(),
            remote_port: 5432,
        }
    }

    fn profile(workloads: Vec<Workload>, connections: Vec<Connection>) -> ProxyProfile {
        ProxyProfile {
            environment: "dev".to_string(),
            cloud_project: "acme".to_string(),
            bastion: Bastion {
                name: "bastion".to_string(),
                zone: String::new(),
                connections,
            },
            workloads,
        }
    }

    #[test]
    fn test_local_ports_declaration_order() {
        let p = profile(
            vec![workload(8080), workload(9090)],
            vec![connection(5432), connection(6379)],
        );
        assert_eq!(local_ports(&p).unwrap(), vec![8080, 9090, 5432, 6379]);
    }

    #[test]
    fn test_duplicate_across_workload_and_connection() {
        // Workload A and connection B both claim 8080
        let p = profile(vec![workload(8080)], vec![connection(8080)]);
        assert_eq!(
            local_ports(&p),
            Err(PortError::DuplicateLocalPort(8080))
        );
    }

    #[test]
    fn test_duplicate_reports_first_offender_in_scan_order() {
        // 9090 repeats among workloads before 5432 repeats among connections
        let p = profile(
            vec![workload(9090), workload(9090), workload(5432)],
            vec![connection(5432)],
        );
        assert_eq!(
            local_ports(&p),
            Err(PortError::DuplicateLocalPort(9090))
        );
    }

    #[test]
    fn test_duplicate_yields_no_partial_port_set() {
        let p = profile(vec![workload(8080), workload(8080)], vec![]);
        // All-or-nothing: a duplicate means no port set at all
        assert!(local_ports(&p).is_err());
    }

    #[test]
    fn test_empty_profile_has_empty_port_set() {
        let p = profile(vec![], vec![]);
        assert_eq!(local_ports(&p).unwrap(), Vec::<u16>::new());
    }
}
