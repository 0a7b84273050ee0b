#![allow(dead_code)]

use report_etl::domain::model::{CommandOutput, CommandStatus};
use report_etl::domain::ports::{QueryExecutor, Storage};
use report_etl::{EtlError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// In-memory files keyed by relative path.
#[derive(Clone, Default)]
pub struct MockStorage {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, path: &str, data: &[u8]) {
        self.files.lock().await.insert(path.to_string(), data.to_vec());
    }

    pub async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().await.get(path).cloned()
    }

    pub async fn get_text(&self, path: &str) -> Option<String> {
        self.get_file(path)
            .await
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    pub async fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.files.lock().await.keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl Storage for MockStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let files = self.files.lock().await;
        files.get(path).cloned().ok_or_else(|| {
            EtlError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File not found: {}", path),
            ))
        })
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let mut files = self.files.lock().await;
        files.insert(path.to_string(), data.to_vec());
        Ok(())
    }

    async fn list_files(&self, dir: &str) -> Result<Vec<String>> {
        let prefix = match dir.trim_end_matches('/') {
            "" | "." => String::new(),
            dir => format!("{}/", dir),
        };
        let files = self.files.lock().await;
        let mut names: Vec<String> = files
            .keys()
            .filter_map(|path| path.strip_prefix(prefix.as_str()))
            .filter(|name| !name.contains('/'))
            .map(str::to_string)
            .collect();
        names.sort();
        Ok(names)
    }
}

/// Replies with canned output chosen by the first matching command substring.
/// Unmatched commands fail as if the tool were not installed.
#[derive(Clone, Default)]
pub struct MockExecutor {
    rules: Vec<(String, CommandOutput)>,
    seen: Arc<std::sync::Mutex<Vec<String>>>,
}

pub fn exited(code: i32, stdout: &str) -> CommandOutput {
    CommandOutput {
        status: CommandStatus::Exited(code),
        stdout: stdout.to_string(),
        stderr: if code == 0 { String::new() } else { "error".to_string() },
        elapsed: Duration::from_millis(3),
    }
}

pub fn timed_out() -> CommandOutput {
    CommandOutput {
        status: CommandStatus::TimedOut,
        stdout: String::new(),
        stderr: String::new(),
        elapsed: Duration::from_secs(30),
    }
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, pattern: &str, output: CommandOutput) -> Self {
        self.rules.push((pattern.to_string(), output));
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }

    pub fn count_matching(&self, pattern: &str) -> usize {
        self.commands().iter().filter(|c| c.contains(pattern)).count()
    }
}

impl QueryExecutor for MockExecutor {
    async fn execute(&self, command: &str) -> CommandOutput {
        self.seen.lock().unwrap().push(command.to_string());
        self.rules
            .iter()
            .find(|(pattern, _)| command.contains(pattern.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_else(|| CommandOutput {
                status: CommandStatus::SpawnFailed("docker: not found".to_string()),
                stdout: String::new(),
                stderr: String::new(),
                elapsed: Duration::ZERO,
            })
    }
}
