//! Conflict resolver
//!
//! For every registered port that is already occupied on the host, obtains a
//! resolution from the operator and acts on it before any tunnel starts.
//! This is the only human-in-the-loop gate in the system; once it returns,
//! the rest of the run is fully automatic.

use std::io::{BufRead, Write};

use async_trait::async_trait;
use thiserror::Error;

use crate::ports::PortHost;

/// Resolution for one occupied port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortAction {
    /// Leave the occupying process alone and move on
    Skip,
    /// Kill the occupying process for this port only
    ReclaimOne,
    /// Kill the occupying process here and for every later occupied port
    /// without asking again
    ReclaimAll,
    /// Terminate the entire run
    Abort,
}

impl PortAction {
    /// Parse operator input: `a` reclaim-all, `y` reclaim-one, `n` skip,
    /// `e` exit
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "a" => Some(Self::ReclaimAll),
            "y" => Some(Self::ReclaimOne),
            "n" => Some(Self::Skip),
            "e" => Some(Self::Abort),
            _ => None,
        }
    }
}

/// Conflict-resolution errors. All fatal; no tunnel exists yet.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// Operator chose to abort the run
    #[error("Aborted by operator")]
    Aborted,

    /// The occupying process could not be terminated, so the port cannot be
    /// trusted to bind correctly
    #[error("Failed to reclaim port {port}: {source}")]
    ReclaimFailed {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// Probing or prompting failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of operator decisions, one ask per occupied port
#[async_trait]
pub trait ActionPrompt {
    async fn ask(&mut self, port: u16) -> std::io::Result<PortAction>;
}

/// Interactive prompt reading from stdin.
///
/// Invalid input re-prompts in a plain validation loop; there is no default
/// action.
#[derive(Debug, Default)]
pub struct StdinPrompt;

impl StdinPrompt {
    /// Read lines until one parses as an action. A zero-byte read means the
    /// input is closed and no decision can ever arrive, which is fatal
    /// rather than a retry.
    fn read_action(input: &mut impl BufRead) -> std::io::Result<PortAction> {
        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "input closed before a port action was chosen",
                ));
            }

            match PortAction::parse(&line) {
                Some(action) => return Ok(action),
                None => println!("Invalid input, expected one of a/y/n/e."),
            }
        }
    }
}

#[async_trait]
impl ActionPrompt for StdinPrompt {
    async fn ask(&mut self, port: u16) -> std::io::Result<PortAction> {
        println!("Port {} is in use by another process.", port);
        println!("Killing that process frees the port but stops whatever is running there.");
        println!("Choose an action: (a/y/n/e)");
        println!("  a - kill this process and every later one occupying a configured port");
        println!("  y - kill the process using this port");
        println!("  n - leave this port alone and continue");
        println!("  e - exit devproxy");

        Self::read_action(&mut std::io::stdin().lock())
    }
}

/// Drives the resolution policy over the registered port set
pub struct ConflictResolver<H, P> {
    host: H,
    prompt: P,
}

impl<H: PortHost, P: ActionPrompt> ConflictResolver<H, P> {
    pub fn new(host: H, prompt: P) -> Self {
        Self { host, prompt }
    }

    /// Clear host-level conflicts for every port in `ports`.
    ///
    /// `ReclaimAll` is sticky for the remainder of the run; `Skip` and
    /// `ReclaimOne` are scoped strictly to the current port. A failed
    /// reclamation is fatal.
    pub async fn clear_conflicts(&mut self, ports: &[u16]) -> Result<(), ResolveError> {
        let mut reclaim_all = false;

        for &port in ports {
            if self.host.is_free(port).await? {
                continue;
            }

            if reclaim_all {
                self.reclaim(port).await?;
                continue;
            }

            match self.prompt.ask(port).await? {
                PortAction::Skip => {
                    tracing::warn!("Leaving port {} to its current owner", port);
                }
                PortAction::ReclaimOne => self.reclaim(port).await?,
                PortAction::ReclaimAll => {
                    reclaim_all = true;
                    self.reclaim(port).await?;
                }
                PortAction::Abort => return Err(ResolveError::Aborted),
            }
        }

        Ok(())
    }

    async fn reclaim(&mut self, port: u16) -> Result<(), ResolveError> {
        self.host
            .kill_owner(port)
            .await
            .map_err(|source| ResolveError::ReclaimFailed { port, source })?;
        tracing::info!("Reclaimed port {}", port);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    /// Fake host with a fixed busy set, recording kills
    #[derive(Clone, Default)]
    struct FakeHost {
        busy: HashSet<u16>,
        killed: Arc<Mutex<Vec<u16>>>,
        fail_kill: bool,
    }

    #[async_trait]
    impl PortHost for FakeHost {
        async fn is_free(&self, port: u16) -> std::io::Result<bool> {
            Ok(!self.busy.contains(&port))
        }

        async fn kill_owner(&self, port: u16) -> std::io::Result<()> {
            if self.fail_kill {
                return Err(std::io::Error::other("permission denied"));
            }
            self.killed.lock().unwrap().push(port);
            Ok(())
        }
    }

    /// Scripted prompt, recording which ports it was asked about
    struct ScriptedPrompt {
        script: Vec<PortAction>,
        asked: Vec<u16>,
    }

    impl ScriptedPrompt {
        fn new(script: Vec<PortAction>) -> Self {
            Self {
                script,
                asked: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl ActionPrompt for ScriptedPrompt {
        async fn ask(&mut self, port: u16) -> std::io::Result<PortAction> {
            self.asked.push(port);
            Ok(self.script.remove(0))
        }
    }

    fn host(busy: &[u16]) -> FakeHost {
        FakeHost {
            busy: busy.iter().copied().collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_free_ports_never_prompt() {
        let mut resolver = ConflictResolver::new(host(&[]), ScriptedPrompt::new(vec![]));
        resolver.clear_conflicts(&[8080, 9090]).await.unwrap();
        assert!(resolver.prompt.asked.is_empty());
    }

    #[tokio::test]
    async fn test_reclaim_all_is_sticky() {
        let h = host(&[8080, 9090, 5432]);
        let killed = Arc::clone(&h.killed);
        let mut resolver =
            ConflictResolver::new(h, ScriptedPrompt::new(vec![PortAction::ReclaimAll]));

        resolver.clear_conflicts(&[8080, 9090, 5432]).await.unwrap();

        // Prompted exactly once, every later occupied port reclaimed silently
        assert_eq!(resolver.prompt.asked, vec![8080]);
        assert_eq!(*killed.lock().unwrap(), vec![8080, 9090, 5432]);
    }

    #[tokio::test]
    async fn test_skip_applies_to_current_port_only() {
        let h = host(&[8080, 9090]);
        let killed = Arc::clone(&h.killed);
        let mut resolver = ConflictResolver::new(
            h,
            ScriptedPrompt::new(vec![PortAction::Skip, PortAction::ReclaimOne]),
        );

        resolver.clear_conflicts(&[8080, 9090]).await.unwrap();

        // Both occupied ports prompted; only the second was reclaimed
        assert_eq!(resolver.prompt.asked, vec![8080, 9090]);
        assert_eq!(*killed.lock().unwrap(), vec![9090]);
    }

    #[tokio::test]
    async fn test_reclaim_one_does_not_persist() {
        let h = host(&[8080, 9090]);
        let mut resolver = ConflictResolver::new(
            h,
            ScriptedPrompt::new(vec![PortAction::ReclaimOne, PortAction::Skip]),
        );

        resolver.clear_conflicts(&[8080, 9090]).await.unwrap();

        // ReclaimOne on 8080 must not silence the prompt for 9090
        assert_eq!(resolver.prompt.asked, vec![8080, 9090]);
    }

    #[tokio::test]
    async fn test_abort_fails_the_run() {
        let mut resolver = ConflictResolver::new(
            host(&[8080]),
            ScriptedPrompt::new(vec![PortAction::Abort]),
        );

        assert!(matches!(
            resolver.clear_conflicts(&[8080]).await,
            Err(ResolveError::Aborted)
        ));
    }

    #[tokio::test]
    async fn test_failed_reclaim_is_fatal() {
        let h = FakeHost {
            busy: [8080].into_iter().collect(),
            fail_kill: true,
            ..Default::default()
        };
        let mut resolver =
            ConflictResolver::new(h, ScriptedPrompt::new(vec![PortAction::ReclaimOne]));

        assert!(matches!(
            resolver.clear_conflicts(&[8080]).await,
            Err(ResolveError::ReclaimFailed { port: 8080, .. })
        ));
    }

    #[test]
    fn test_read_action_eof_is_fatal_not_a_retry() {
        let mut input = std::io::Cursor::new("");
        let err = StdinPrompt::read_action(&mut input).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_read_action_eof_after_invalid_input_is_fatal() {
        let mut input = std::io::Cursor::new("maybe\n");
        let err = StdinPrompt::read_action(&mut input).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_read_action_retries_past_invalid_input() {
        let mut input = std::io::Cursor::new("zz\n\ny\n");
        assert_eq!(
            StdinPrompt::read_action(&mut input).unwrap(),
            PortAction::ReclaimOne
        );
    }

    #[test]
    fn test_parse_actions() {
        assert_eq!(PortAction::parse(" A \n"), Some(PortAction::ReclaimAll));
        assert_eq!(PortAction::parse("y"), Some(PortAction::ReclaimOne));
        assert_eq!(PortAction::parse("N"), Some(PortAction::Skip));
        assert_eq!(PortAction::parse("e"), Some(PortAction::Abort));
        assert_eq!(PortAction::parse("yes"), None);
        assert_eq!(PortAction::parse(""), None);
    }
}
