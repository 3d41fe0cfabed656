//! dp-core: Shared configuration and cloud-tool integration for devproxy
//!
//! This crate provides the configuration document model (profiles, bastions,
//! workloads), the pre-tunnel error taxonomy, and thin wrappers around the
//! `gcloud` and `kubectl` binaries that the tunnel layer shells out to.

pub mod config;
pub mod error;
pub mod gcloud;
pub mod kubectl;

pub use error::{CloudError, ConfigError};
