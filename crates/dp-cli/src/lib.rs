//! devproxy: Command-line interface
//!
//! Provides the `devproxy` binary that brings up and supervises the
//! configured tunnels for one environment.

pub mod output;
