use crate::config::{HBaseSettings, MongoSettings, OutputSettings, SessionSettings};
use crate::domain::model::{CommandOutput, Dataset, LoadSummary, ReportBundle};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// File names (not paths) directly inside `dir`, sorted.
    fn list_files(&self, dir: &str)
        -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
}

/// Runs one command against an external database tool.
///
/// Implementations never fail: timeouts, non-zero exits and spawn errors are
/// reported through [`CommandOutput::status`] so callers can fall back.
pub trait QueryExecutor: Send + Sync {
    fn execute(&self, command: &str) -> impl std::future::Future<Output = CommandOutput> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn mongo(&self) -> &MongoSettings;
    fn hbase(&self) -> &HBaseSettings;
    fn sessions(&self) -> &SessionSettings;
    fn output(&self) -> &OutputSettings;
    fn command_timeout(&self) -> Duration;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    fn name(&self) -> &'static str;
    async fn extract(&self) -> Result<Dataset>;
    async fn transform(&self, data: Dataset) -> Result<ReportBundle>;
    async fn load(&self, bundle: ReportBundle) -> Result<LoadSummary>;
}
