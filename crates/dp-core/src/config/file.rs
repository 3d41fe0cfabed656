//! Top-level configuration document

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;

use super::profile::ProxyProfile;

/// Credential file paths shared by every profile
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudPaths {
    /// gcloud configuration directory (`CLOUDSDK_CONFIG`)
    pub gcloud_config: Option<PathBuf>,
    /// Kubernetes credentials file (`KUBECONFIG`)
    pub kubeconfig: Option<PathBuf>,
}

impl CloudPaths {
    /// Resolve the gcloud config directory, falling back to
    /// `$HOME/.config/gcloud`
    pub fn gcloud_config_dir(&self) -> PathBuf {
        self.gcloud_config.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config")
                .join("gcloud")
        })
    }

    /// Resolve the kubeconfig path, falling back to `$HOME/.kube/config`
    pub fn kubeconfig_path(&self) -> PathBuf {
        self.kubeconfig.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".kube")
                .join("config")
        })
    }
}

/// The whole configuration document: global credential paths plus one proxy
/// profile per environment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Credential file paths
    pub cloud: CloudPaths,
    /// Default environment when `--env` is not given
    pub environment: Option<String>,
    /// Available proxy profiles
    pub proxies: Vec<ProxyProfile>,
}

impl ConfigFile {
    /// Resolve the active profile for this run.
    ///
    /// `requested` (from `--env`) overrides the file-level `environment`.
    /// Fails if neither names an environment, or if no profile matches.
    /// Exactly one profile is active per run; the first match wins.
    pub fn resolve_profile(&self, requested: Option<&str>) -> Result<ProxyProfile, ConfigError> {
        let environment = requested
            .map(str::to_string)
            .or_else(|| self.environment.clone())
            .ok_or(ConfigError::EnvironmentNotSet)?;

        let profile = self
            .proxies
            .iter()
            .find(|p| p.environment == environment)
            .cloned()
            .ok_or(ConfigError::ProfileNotFound(environment.clone()))?;

        if profile.cloud_project.is_empty() {
            return Err(ConfigError::MissingProject(environment));
        }

        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Bastion, Workload};

    fn profile(env: &str) -> ProxyProfile {
        ProxyProfile {
            environment: env.to_string(),
            cloud_project: "acme-project".to_string(),
            bastion: Bastion {
                name: "bastion".to_string(),
                zone: String::new(),
                connections: vec![],
            },
            workloads: vec![Workload {
                namespace: "default".to_string(),
                app: "api".to_string(),
                local_port: 8080,
                remote_port: 80,
            }],
        }
    }

    #[test]
    fn test_resolve_profile_env_flag_overrides_file() {
        let config = ConfigFile {
            environment: Some("dev".to_string()),
            proxies: vec![profile("dev"), profile("staging")],
            ..Default::default()
        };

        let resolved = config.resolve_profile(Some("staging")).unwrap();
        assert_eq!(resolved.environment, "staging");
    }

    #[test]
    fn test_resolve_profile_falls_back_to_file_environment() {
        let config = ConfigFile {
            environment: Some("dev".to_string()),
            proxies: vec![profile("dev")],
            ..Default::default()
        };

        let resolved = config.resolve_profile(None).unwrap();
        assert_eq!(resolved.environment, "dev");
    }

    #[test]
    fn test_resolve_profile_no_environment_anywhere() {
        let config = ConfigFile {
            proxies: vec![profile("dev")],
            ..Default::default()
        };

        assert!(matches!(
            config.resolve_profile(None),
            Err(ConfigError::EnvironmentNotSet)
        ));
    }

    #[test]
    fn test_resolve_profile_unknown_environment() {
        let config = ConfigFile {
            proxies: vec![profile("dev")],
            ..Default::default()
        };

        assert!(matches!(
            config.resolve_profile(Some("prod")),
            Err(ConfigError::ProfileNotFound(env)) if env == "prod"
        ));
    }

    #[test]
    fn test_resolve_profile_missing_project() {
        let mut p = profile("dev");
        p.cloud_project = String::new();
        let config = ConfigFile {
            proxies: vec![p],
            ..Default::default()
        };

        assert!(matches!(
            config.resolve_profile(Some("dev")),
            Err(ConfigError::MissingProject(_))
        ));
    }

    #[test]
    fn test_cloud_paths_explicit_values_win() {
        let paths = CloudPaths {
            gcloud_config: Some(PathBuf::from("/opt/gcloud")),
            kubeconfig: Some(PathBuf::from("/opt/kube/config")),
        };
        assert_eq!(paths.gcloud_config_dir(), PathBuf::from("/opt/gcloud"));
        assert_eq!(paths.kubeconfig_path(), PathBuf::from("/opt/kube/config"));
    }
}
