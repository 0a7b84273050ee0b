use crate::adapters::hbase::{
    count_script, create_table_script, prefix_scan_script, put_script, scan_script, HBaseShell,
};
use crate::core::chart::ChartRenderer;
use crate::core::parser::truncate_display;
use crate::core::report::ReportWriter;
use crate::core::{ConfigProvider, Pipeline, QueryExecutor, Storage};
use crate::domain::model::{CommandOutput, DataOrigin, Dataset, LoadSummary, RawOutput, ReportBundle};
use crate::domain::samples::SampleDataset;
use crate::utils::error::Result;
use std::time::Duration;

pub const COLUMN_FAMILIES: [&str; 3] = ["meta", "geo", "device"];
pub const DEMO_USER: &str = "user_000042";

const SCAN_DISPLAY_CHARS: usize = 500;
const COUNT_DISPLAY_CHARS: usize = 200;

/// Creates the sessions table, inserts the demo sessions and captures three
/// queries as raw shell output.
pub struct HBaseDemoPipeline<S: Storage, E: QueryExecutor, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) executor: E,
    pub(crate) config: C,
    pub(crate) samples: SampleDataset,
}

impl<S: Storage, E: QueryExecutor, C: ConfigProvider> HBaseDemoPipeline<S, E, C> {
    pub fn new(storage: S, executor: E, config: C) -> Self {
        Self {
            storage,
            executor,
            config,
            samples: SampleDataset::default(),
        }
    }

    pub fn with_samples(mut self, samples: SampleDataset) -> Self {
        self.samples = samples;
        self
    }

    async fn ensure_container(&self, shell: &HBaseShell<'_, E>) {
        let settings = self.config.hbase();
        if shell.container_running().await {
            tracing::info!("Container '{}' is running", settings.container);
            return;
        }

        tracing::info!("Starting container '{}'", settings.container);
        if shell.start_container().await && settings.startup_wait_seconds > 0 {
            tracing::info!("Waiting {}s for HBase to start", settings.startup_wait_seconds);
            tokio::time::sleep(Duration::from_secs(settings.startup_wait_seconds)).await;
        }
    }

    async fn run_step(&self, shell: &HBaseShell<'_, E>, step: &str, script: &str) {
        let output = shell.run_script(script).await;
        match output.failure_reason() {
            None => tracing::info!("{}: done", step),
            Some(reason) => tracing::warn!("{}: {}", step, reason),
        }
    }

    async fn capture(
        &self,
        shell: &HBaseShell<'_, E>,
        title: &str,
        script: &str,
        display_limit: usize,
    ) -> RawOutput {
        let output = shell.run_script(script).await;
        let text = raw_text(&output);
        tracing::info!("--- {} ---\n{}", title, truncate_display(&text, display_limit));
        RawOutput {
            title: title.to_string(),
            text,
            display_limit,
        }
    }
}

fn raw_text(output: &CommandOutput) -> String {
    match output.failure_reason() {
        None => output.stdout.clone(),
        Some(reason) => format!("{}[query failed: {}]", output.stdout, reason),
    }
}

#[async_trait::async_trait]
impl<S: Storage, E: QueryExecutor, C: ConfigProvider> Pipeline for HBaseDemoPipeline<S, E, C> {
    fn name(&self) -> &'static str {
        "hbase"
    }

    async fn extract(&self) -> Result<Dataset> {
        let shell = HBaseShell::new(&self.executor, self.config.hbase());
        let table = shell.table().to_string();

        self.ensure_container(&shell).await;
        self.run_step(
            &shell,
            &format!("Create table '{}'", table),
            &create_table_script(&table, &COLUMN_FAMILIES),
        )
        .await;
        self.run_step(
            &shell,
            &format!("Insert {} sample sessions", self.samples.hbase_sessions.len()),
            &put_script(&table, &self.samples.hbase_sessions),
        )
        .await;

        let mut data = Dataset::new(DataOrigin::Live);
        data.raw_outputs.push(
            self.capture(&shell, "QUERY 1: Get all sessions", &scan_script(&table), SCAN_DISPLAY_CHARS)
                .await,
        );
        data.raw_outputs.push(
            self.capture(
                &shell,
                &format!("QUERY 2: Get sessions for {}", DEMO_USER),
                &prefix_scan_script(&table, DEMO_USER),
                SCAN_DISPLAY_CHARS,
            )
            .await,
        );
        data.raw_outputs.push(
            self.capture(
                &shell,
                "QUERY 3: Count total sessions",
                &count_script(&table),
                COUNT_DISPLAY_CHARS,
            )
            .await,
        );
        Ok(data)
    }

    async fn transform(&self, data: Dataset) -> Result<ReportBundle> {
        let mut content = format!(
            "HBASE QUERY OUTPUT\nGenerated: {}\nTable: {} (families: {})\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            self.config.hbase().table,
            COLUMN_FAMILIES.join(", ")
        );
        for raw in &data.raw_outputs {
            content.push_str(&format!("\n--- {} ---\n{}\n", raw.title, raw.text.trim_end()));
        }

        let mut bundle = ReportBundle::new(self.config.output().hbase_dir.as_str(), data.origin);
        bundle.add_document("query_output.txt", content);
        Ok(bundle)
    }

    async fn load(&self, bundle: ReportBundle) -> Result<LoadSummary> {
        let charts = ChartRenderer::disabled();
        Ok(ReportWriter::new(&self.storage, &charts)
            .write_bundle(&bundle)
            .await)
    }
}
