//! kubectl integration for devproxy
//!
//! Covers the two operations the workload tunnel needs: discovering a
//! running pod for an app label, and constructing the `kubectl port-forward`
//! process. Pod discovery parses `kubectl get pods -o json` output.
//!
//! `KUBECONFIG` is passed explicitly on every child invocation, never set
//! process-wide.

use std::path::PathBuf;
use std::process::Stdio;

use serde::Deserialize;
use tokio::process::Command;

use crate::config::Workload;
use crate::error::CloudError;

/// Handle to the local `kubectl` installation, bound to one kubeconfig
#[derive(Debug, Clone)]
pub struct Kubectl {
    kubeconfig: PathBuf,
}

/// Response shape of `kubectl get pods -o json`
#[derive(Debug, Deserialize)]
struct PodList {
    #[serde(default)]
    items: Vec<Pod>,
}

#[derive(Debug, Deserialize)]
struct Pod {
    metadata: PodMetadata,
    status: PodStatus,
}

#[derive(Debug, Deserialize)]
struct PodMetadata {
    name: String,
}

#[derive(Debug, Deserialize)]
struct PodStatus {
    #[serde(default)]
    phase: String,
}

impl Kubectl {
    /// Create a handle using the given kubeconfig path
    pub fn new(kubeconfig: PathBuf) -> Self {
        Self { kubeconfig }
    }

    /// Base command with the kubeconfig threaded in
    fn command(&self) -> Command {
        let mut cmd = Command::new("kubectl");
        cmd.env("KUBECONFIG", &self.kubeconfig);
        cmd
    }

    /// Check that kubectl is installed and runnable
    pub async fn is_installed(&self) -> bool {
        self.command()
            .args(["version", "--client"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Find the first running pod for `app=<app>` in `namespace`.
    ///
    /// Returns `None` when the query succeeds but no pod is in the Running
    /// phase; the caller decides how to surface that (for tunnels it is a
    /// tunnel-local failure, not a run failure).
    pub async fn first_running_pod(
        &self,
        namespace: &str,
        app: &str,
    ) -> Result<Option<String>, CloudError> {
        let selector = format!("app={}", app);
        let output = self
            .command()
            .args(["get", "pods", "-n", namespace, "-l", &selector, "-o", "json"])
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(CloudError::Command {
                context: format!("Listing pods for app {} in {}", app, namespace),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let pods: PodList =
            serde_json::from_slice(&output.stdout).map_err(|e| CloudError::Command {
                context: format!("Parsing pod list for app {}", app),
                message: e.to_string(),
            })?;

        Ok(first_running(pods))
    }

    /// Build the long-lived port-forward process for one workload and pod.
    ///
    /// The caller owns spawning and supervision.
    pub fn port_forward_command(&self, workload: &Workload, pod: &str) -> Command {
        let namespace = format!("--namespace={}", workload.namespace);
        let ports = format!("{}:{}", workload.local_port, workload.remote_port);

        let mut cmd = self.command();
        cmd.args(["port-forward", &namespace, pod, &ports]);
        cmd
    }
}

/// Select the first pod in the returned ordering whose phase is Running.
/// No load-balancing or health prioritization beyond that.
fn first_running(pods: PodList) -> Option<String> {
    pods.items
        .into_iter()
        .find(|p| p.status.phase == "Running")
        .map(|p| p.metadata.name)
}
