//! Remote shutdown command execution

use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use powerlease_host_api::{PowerError, PowerResult};

/// A command run locally to make the managed machine power off
#[derive(Debug, Clone)]
pub struct RemoteCommand {
    argv: Vec<String>,
    timeout: Duration,
}

impl RemoteCommand {
    pub fn new(argv: Vec<String>, timeout: Duration) -> Self {
        Self { argv, timeout }
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// Run to completion. Succeeds only on a zero exit status within the timeout.
    pub async fn run(&self) -> PowerResult<()> {
        let Some((program, args)) = self.argv.split_first() else {
            return Err(PowerError::RemoteCommand("Empty argv".into()));
        };

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            PowerError::RemoteCommand(format!("Failed to spawn {}: {}", program, e))
        })?;

        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                warn!(program = %program, timeout = ?self.timeout, "Remote command timed out");
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill timed out command");
                }
                return Err(PowerError::RemoteCommand(format!(
                    "{} timed out after {:?}",
                    program, self.timeout
                )));
            }
        };

        debug!(program = %program, ?status, "Remote command finished");

        if status.success() {
            Ok(())
        } else {
            Err(PowerError::RemoteCommand(format!(
                "{} exited with {}",
                program, status
            )))
        }
    }
}
