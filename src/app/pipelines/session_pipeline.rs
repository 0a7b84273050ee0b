use crate::adapters::hbase::{add_families_script, put_script, HBaseShell};
use crate::core::{ConfigProvider, Pipeline, QueryExecutor, Storage};
use crate::domain::model::{
    DataOrigin, Dataset, LoadSummary, Record, ReportBundle, ReportTable, StoreBatch,
};
use crate::domain::session::{parse_session_file, HBaseRow, SESSION_FAMILIES};
use crate::utils::error::{EtlError, Result};
use serde_json::Value;

const ROW_KEY: &str = "row_key";

/// Loads `sessions_*.json` exports into the HBase sessions table, one put
/// batch per file.
///
/// `storage` is rooted at the session input directory.
pub struct SessionLoadPipeline<S: Storage, E: QueryExecutor, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) executor: E,
    pub(crate) config: C,
}

impl<S: Storage, E: QueryExecutor, C: ConfigProvider> SessionLoadPipeline<S, E, C> {
    pub fn new(storage: S, executor: E, config: C) -> Self {
        Self {
            storage,
            executor,
            config,
        }
    }

    async fn session_files(&self) -> Result<Vec<String>> {
        let prefix = &self.config.sessions().file_prefix;
        let files: Vec<String> = self
            .storage
            .list_files(".")
            .await?
            .into_iter()
            .filter(|name| name.starts_with(prefix.as_str()) && name.ends_with(".json"))
            .collect();
        Ok(files)
    }

    async fn read_sessions(&self, file: &str) -> Result<ReportTable> {
        let bytes = self.storage.read_file(file).await?;
        let rows: Vec<HBaseRow> = parse_session_file(&bytes)?
            .iter()
            .map(HBaseRow::from)
            .collect();
        Ok(rows_to_table(file, &rows))
    }
}

fn rows_to_table(name: &str, rows: &[HBaseRow]) -> ReportTable {
    let records = rows
        .iter()
        .map(|row| {
            let mut record = Record::new();
            record.insert(ROW_KEY, Value::String(row.row_key.clone()));
            for (column, value) in &row.cells {
                record.insert(column.as_str(), Value::String(value.clone()));
            }
            record
        })
        .collect();
    ReportTable::from_records(name, records)
}

fn table_to_rows(table: &ReportTable) -> Vec<HBaseRow> {
    table
        .records
        .iter()
        .filter_map(|record| {
            let row_key = record.get_str(ROW_KEY)?.to_string();
            let cells = record
                .data
                .iter()
                .filter(|(column, _)| column.as_str() != ROW_KEY)
                .map(|(column, value)| {
                    let text = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (column.clone(), text)
                })
                .collect();
            Some(HBaseRow { row_key, cells })
        })
        .collect()
}

#[async_trait::async_trait]
impl<S: Storage, E: QueryExecutor, C: ConfigProvider> Pipeline for SessionLoadPipeline<S, E, C> {
    fn name(&self) -> &'static str {
        "load-sessions"
    }

    async fn extract(&self) -> Result<Dataset> {
        let settings = self.config.hbase();
        let shell = HBaseShell::new(&self.executor, settings);

        // Nothing is read before the store answers.
        let status = shell.status().await;
        if let Some(reason) = status.failure_reason() {
            return Err(EtlError::ConnectionError {
                target: format!("HBase container '{}'", settings.container),
                message: reason,
            });
        }
        tracing::info!("Connected to HBase successfully");

        let mut data = Dataset::new(DataOrigin::File);
        for file in self.session_files().await? {
            match self.read_sessions(&file).await {
                Ok(table) => {
                    tracing::info!("Processing {} ({} sessions)", file, table.len());
                    data.tables.push(table);
                }
                Err(e) => tracing::warn!("Error skipping {}: {}", file, e),
            }
        }

        if data.tables.is_empty() {
            tracing::warn!(
                "No readable {}*.json files found in {}",
                self.config.sessions().file_prefix,
                self.config.sessions().input_dir
            );
        }
        Ok(data)
    }

    async fn transform(&self, data: Dataset) -> Result<ReportBundle> {
        let table = &self.config.hbase().table;
        let mut bundle = ReportBundle::new("", data.origin);
        for sessions in &data.tables {
            let rows = table_to_rows(sessions);
            if rows.is_empty() {
                continue;
            }
            bundle.batches.push(StoreBatch {
                source: sessions.name.clone(),
                rows: rows.len(),
                script: put_script(table, &rows),
            });
        }
        Ok(bundle)
    }

    async fn load(&self, bundle: ReportBundle) -> Result<LoadSummary> {
        let shell = HBaseShell::new(&self.executor, self.config.hbase());
        let mut summary = LoadSummary::new(bundle.origin);

        // The demo table only carries meta/geo/device.
        if !bundle.batches.is_empty() {
            let table = shell.table();
            let output = shell
                .run_script(&add_families_script(table, &SESSION_FAMILIES))
                .await;
            match output.failure_reason() {
                None => tracing::info!("Column families ready on '{}'", table),
                Some(reason) => {
                    tracing::warn!("Could not add column families to '{}': {}", table, reason)
                }
            }
        }

        for batch in &bundle.batches {
            let output = shell.run_script(&batch.script).await;
            match output.failure_reason() {
                None => {
                    tracing::info!("Loaded {} sessions from {}", batch.rows, batch.source);
                    summary.written.push(batch.source.clone());
                }
                Some(reason) => {
                    let err = EtlError::CommandFailed {
                        command: format!("put batch from {}", batch.source),
                        message: reason,
                    };
                    tracing::warn!("{}", err);
                    summary.failed.push((batch.source.clone(), err.to_string()));
                }
            }
        }

        tracing::info!("Finished loading all sessions");
        Ok(summary)
    }
}
