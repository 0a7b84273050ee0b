use crate::domain::model::{CommandOutput, CommandStatus};
use crate::domain::ports::{ConfigProvider, QueryExecutor};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

/// Runs command strings through `sh -c` with a hard timeout. No retries.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    timeout: Duration,
}

impl ShellExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Self {
        Self::new(config.command_timeout())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl QueryExecutor for ShellExecutor {
    async fn execute(&self, command: &str) -> CommandOutput {
        let started = Instant::now();
        tracing::debug!("Executing: {}", command);

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let result = tokio::time::timeout(self.timeout, cmd.output()).await;
        let elapsed = started.elapsed();

        let output = match result {
            Err(_) => CommandOutput {
                status: CommandStatus::TimedOut,
                stdout: String::new(),
                stderr: String::new(),
                elapsed,
            },
            Ok(Err(e)) => CommandOutput {
                status: CommandStatus::SpawnFailed(e.to_string()),
                stdout: String::new(),
                stderr: String::new(),
                elapsed,
            },
            Ok(Ok(output)) => CommandOutput {
                status: match output.status.code() {
                    Some(code) => CommandStatus::Exited(code),
                    None => CommandStatus::Signalled,
                },
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                elapsed,
            },
        };

        tracing::debug!("Command finished with {:?} in {:?}", output.status, elapsed);
        output
    }
}

/// Quotes a value for `sh` as a single word.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
