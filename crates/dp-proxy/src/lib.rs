//! dp-proxy: Tunnel orchestration core for devproxy
//!
//! Owns everything between a resolved proxy profile and a finished run:
//! local-port validation, host-level conflict resolution, concurrent
//! supervision of the forwarding child processes, and the two-stage
//! graceful/forced shutdown.

pub mod orchestrator;
pub mod ports;
pub mod resolver;
pub mod shutdown;
pub mod tunnel;

pub use orchestrator::TunnelOrchestrator;
pub use ports::{PortError, PortHost};
pub use resolver::{ConflictResolver, ResolveError};
pub use shutdown::ShutdownController;
pub use tunnel::{TunnelOutcome, TunnelReport};
