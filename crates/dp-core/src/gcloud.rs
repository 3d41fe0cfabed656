//! gcloud integration for devproxy
//!
//! Thin wrapper around the `gcloud` binary for preflight checks,
//! infrastructure-metadata discovery (bastion zone, default cluster), and
//! constructing the bastion SSH forwarding process.
//!
//! The credential directory is passed explicitly as `CLOUDSDK_CONFIG` on
//! every child invocation rather than being set process-wide, so no code
//! path depends on ambient environment state.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;

use crate::config::{Bastion, Connection};
use crate::error::CloudError;

/// Handle to the local `gcloud` installation, bound to one credential
/// directory
#[derive(Debug, Clone)]
pub struct Gcloud {
    config_dir: PathBuf,
}

impl Gcloud {
    /// Create a handle using the given `CLOUDSDK_CONFIG` directory
    pub fn new(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Base command with the credential directory threaded in
    fn command(&self) -> Command {
        let mut cmd = Command::new("gcloud");
        cmd.env("CLOUDSDK_CONFIG", &self.config_dir);
        cmd
    }

    /// Run a metadata query, returning trimmed stdout or a `CloudError`
    /// naming what was being asked
    async fn query(&self, context: &str, args: &[&str]) -> Result<String, CloudError> {
        let output = self
            .command()
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(CloudError::Command {
                context: context.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Run a mutating `gcloud config` style invocation, discarding stdout
    async fn run(&self, context: &str, args: &[&str]) -> Result<(), CloudError> {
        self.query(context, args).await.map(|_| ())
    }

    /// Check that gcloud is installed and runnable
    pub async fn is_installed(&self) -> bool {
        self.command()
            .arg("version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Return the gcloud version banner for the startup log
    pub async fn version(&self) -> Result<String, CloudError> {
        self.query("Getting gcloud version", &["version"]).await
    }

    /// Discover the compute zone of the bastion instance.
    ///
    /// Fatal if the instance is not visible; bastion tunnels cannot start
    /// without a zone.
    pub async fn instance_zone(&self, instance: &str) -> Result<String, CloudError> {
        let filter = format!("name={}", instance);
        let out = self
            .query(
                "Getting bastion zone",
                &[
                    "compute",
                    "instances",
                    "list",
                    "--filter",
                    &filter,
                    "--format",
                    "value(zone)",
                ],
            )
            .await?;

        let zone =
            parse_zone(&out).ok_or_else(|| CloudError::ZoneNotFound(instance.to_string()))?;
        tracing::info!("Bastion '{}' is in zone {}", instance, zone);
        Ok(zone)
    }

    /// Set the active gcloud project
    pub async fn set_project(&self, project: &str) -> Result<(), CloudError> {
        tracing::info!("Setting gcloud project: {}", project);
        self.run(
            "Setting gcloud project",
            &["config", "set", "project", project],
        )
        .await
    }

    /// List clusters and return the first as the default for this run
    pub async fn default_cluster(&self) -> Result<String, CloudError> {
        let out = self
            .query(
                "Listing clusters",
                &["container", "clusters", "list", "--format", "value(name)"],
            )
            .await?;

        let cluster = out.lines().next().unwrap_or("").trim().to_string();
        if cluster.is_empty() {
            return Err(CloudError::NoClusters);
        }
        Ok(cluster)
    }

    /// Return the location of the default cluster
    pub async fn cluster_region(&self) -> Result<String, CloudError> {
        let out = self
            .query(
                "Getting cluster region",
                &[
                    "container",
                    "clusters",
                    "list",
                    "--format",
                    "value(location)",
                ],
            )
            .await?;

        Ok(out.lines().next().unwrap_or("").trim().to_string())
    }

    /// Record the default cluster in gcloud config
    pub async fn set_default_cluster(&self, cluster: &str) -> Result<(), CloudError> {
        self.run(
            "Setting default cluster",
            &["config", "set", "container/cluster", cluster],
        )
        .await
    }

    /// Record the default compute region in gcloud config
    pub async fn set_region(&self, region: &str) -> Result<(), CloudError> {
        self.run(
            "Setting compute region",
            &["config", "set", "compute/region", region],
        )
        .await
    }

    /// Fetch kubectl credentials for the cluster.
    ///
    /// `USE_GKE_GCLOUD_AUTH_PLUGIN` is scoped to this invocation only.
    pub async fn fetch_cluster_credentials(
        &self,
        cluster: &str,
        kubeconfig: &std::path::Path,
    ) -> Result<(), CloudError> {
        tracing::info!("Fetching credentials for cluster {}", cluster);
        let output = self
            .command()
            .args(["container", "clusters", "get-credentials", cluster])
            .env("USE_GKE_GCLOUD_AUTH_PLUGIN", "True")
            .env("KUBECONFIG", kubeconfig)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(CloudError::Command {
                context: "Fetching cluster credentials".to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    /// Build the long-lived bastion forwarding process for one connection.
    ///
    /// The caller owns spawning and supervision; this only parameterizes the
    /// invocation. `-N` keeps the SSH session forward-only.
    pub fn ssh_forward_command(&self, bastion: &Bastion, connection: &Connection) -> Command {
        let forward = format!(
            "localhost:{}:{}:{}",
            connection.local_port, connection.remote_host, connection.remote_port
        );

        let mut cmd = self.command();
        cmd.args([
            "compute",
            "ssh",
            &bastion.name,
            "--zone",
            &bastion.zone,
            "--",
            "-L",
            &forward,
            "-N",
        ]);
        cmd
    }
}

/// Zone of the first matching instance. `value(zone)` yields one line per
/// instance and may use the full resource URL form; keep the first line and
/// its last segment.
fn parse_zone(raw: &str) -> Option<String> {
    let line = raw.lines().next().unwrap_or("").trim();
    if line.is_empty() {
        return None;
    }
    Some(line.rsplit('/').next().unwrap_or(line).to_string())
}
