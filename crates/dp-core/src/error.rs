//! Pre-tunnel error types for devproxy
//!
//! Everything in here is fatal: these errors occur while resolving
//! configuration or bootstrapping cloud metadata, strictly before any tunnel
//! exists. Tunnel-local failures are modeled as outcomes, not errors, and
//! live in `dp-proxy`.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// No environment given on the command line or in the config file
    #[error("Environment is not set in the config file or via --env")]
    EnvironmentNotSet,

    /// No proxy profile matches the requested environment
    #[error("No proxy profile found for environment '{0}'")]
    ProfileNotFound(String),

    /// The active profile has no cloud project configured
    #[error("cloud_project is not set for environment '{0}'")]
    MissingProject(String),
}

/// Failures of `gcloud`/`kubectl` invocations during preflight and
/// infrastructure-metadata discovery
#[derive(Error, Debug)]
pub enum CloudError {
    /// Required external tool is missing or not on PATH
    #[error("{0} is not installed or not in PATH")]
    ToolMissing(&'static str),

    /// A cloud-tool invocation exited non-zero
    #[error("{context}: {message}")]
    Command { context: String, message: String },

    /// Zone discovery for the bastion instance returned nothing
    #[error("No compute instance found for bastion '{0}'")]
    ZoneNotFound(String),

    /// Cluster listing returned nothing
    #[error("No clusters visible for the configured project")]
    NoClusters,

    /// I/O error spawning or reading a cloud-tool process
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
