//! Configuration management for devproxy

mod file;
mod profile;

pub use file::{CloudPaths, ConfigFile};
pub use profile::{Bastion, Connection, ProxyProfile, Workload};

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Get the default configuration directory
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("devproxy")
}

/// Get the default configuration file path
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

/// Load the configuration document from a file
pub fn load_config(path: &Path) -> Result<ConfigFile, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to read config: {}", e)))?;

    let config: ConfigFile = toml::from_str(&content)?;
    Ok(config)
}

/// Ensure the default configuration file exists, creating an empty one on
/// first run, and return its path
pub fn ensure_default_config() -> Result<PathBuf, ConfigError> {
    let path = default_config_path();
    if path.exists() {
        return Ok(path);
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ConfigError::Invalid(format!("Failed to create config dir: {}", e)))?;
    }
    std::fs::write(&path, "")
        .map_err(|e| ConfigError::Invalid(format!("Failed to write config: {}", e)))?;

    tracing::info!("Created empty config at {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        assert!(matches!(
            load_config(&path),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_load_config_empty_file_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "").unwrap();

        let config = load_config(&path).unwrap();
        assert!(config.proxies.is_empty());
        assert!(config.environment.is_none());
    }

    #[test]
    fn test_load_config_full_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
environment = "dev"

[cloud]
kubeconfig = "/home/me/.kube/config"

[[proxies]]
environment = "dev"
cloud_project = "acme-dev"

[proxies.bastion]
name = "bastion-dev"
connections = [
    { local_port = 5432, remote_host = "db.internal", remote_port = 5432 },
]

[[proxies.workloads]]
namespace = "default"
app = "api"
local_port = 8080
remote_port = 80
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.environment.as_deref(), Some("dev"));
        assert_eq!(config.proxies.len(), 1);
        assert_eq!(config.proxies[0].bastion.connections[0].local_port, 5432);
        assert_eq!(config.proxies[0].workloads[0].app, "api");
        // Zone is discovered at runtime, never user-supplied
        assert!(config.proxies[0].bastion.zone.is_empty());
    }
}
