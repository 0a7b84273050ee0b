use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// One row of a report. Field order is insertion order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    pub data: Map<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self {
            data: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(Value::as_str)
    }

    pub fn get_f64(&self, field: &str) -> Option<f64> {
        self.data.get(field).and_then(Value::as_f64)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.data.insert(field.into(), value);
    }

    /// Renames a field in place, keeping its position.
    pub fn rename_field(&mut self, from: &str, to: &str) {
        if from == to || !self.data.contains_key(from) {
            return;
        }
        let data = std::mem::take(&mut self.data);
        self.data = data
            .into_iter()
            .map(|(k, v)| if k == from { (to.to_string(), v) } else { (k, v) })
            .collect();
    }
}

/// An ordered set of records sharing named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable {
    pub name: String,
    pub columns: Vec<String>,
    pub records: Vec<Record>,
}

impl ReportTable {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            records: Vec::new(),
        }
    }

    /// Builds a table from positional rows. Short rows are padded with nulls.
    pub fn from_rows(name: impl Into<String>, columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        let mut table = Self::new(name, columns);
        for row in rows {
            let mut values = row.into_iter();
            let record = Record::from_pairs(
                columns
                    .iter()
                    .map(|c| (c.to_string(), values.next().unwrap_or(Value::Null))),
            );
            table.records.push(record);
        }
        table
    }

    /// Columns are the union of record fields in first-seen order.
    pub fn from_records(name: impl Into<String>, records: Vec<Record>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for record in &records {
            for key in record.data.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }
        Self {
            name: name.into(),
            columns,
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&Value> {
        self.records.get(row).and_then(|r| r.get(column))
    }

    pub fn head(&self, n: usize) -> ReportTable {
        Self {
            name: self.name.clone(),
            columns: self.columns.clone(),
            records: self.records.iter().take(n).cloned().collect(),
        }
    }

    pub fn rename_column(&mut self, from: &str, to: &str) {
        for column in &mut self.columns {
            if column == from {
                *column = to.to_string();
            }
        }
        for record in &mut self.records {
            record.rename_field(from, to);
        }
    }

    /// Numeric values of a column; missing and non-numeric cells are skipped.
    pub fn column_f64(&self, column: &str) -> Vec<f64> {
        self.records
            .iter()
            .filter_map(|r| r.get_f64(column))
            .collect()
    }

    /// Display strings of a column, one per record.
    pub fn column_labels(&self, column: &str) -> Vec<String> {
        self.records
            .iter()
            .map(|r| match r.get(column) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            })
            .collect()
    }

    pub fn column_sum(&self, column: &str) -> f64 {
        self.column_f64(column).iter().sum()
    }

    pub fn column_mean(&self, column: &str) -> Option<f64> {
        let values = self.column_f64(column);
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    }
}

/// Where the data behind a report came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataOrigin {
    Live,
    File,
    Sample,
}

impl std::fmt::Display for DataOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataOrigin::Live => write!(f, "live query"),
            DataOrigin::File => write!(f, "previous results"),
            DataOrigin::Sample => write!(f, "sample data"),
        }
    }
}

/// Raw shell output shown to the operator without structured parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct RawOutput {
    pub title: String,
    pub text: String,
    pub display_limit: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub origin: DataOrigin,
    pub tables: Vec<ReportTable>,
    pub raw_outputs: Vec<RawOutput>,
}

impl Dataset {
    pub fn new(origin: DataOrigin) -> Self {
        Self {
            origin,
            tables: Vec::new(),
            raw_outputs: Vec::new(),
        }
    }

    pub fn with_table(mut self, table: ReportTable) -> Self {
        self.tables.push(table);
        self
    }

    pub fn table(&self, name: &str) -> Option<&ReportTable> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn take_table(&mut self, name: &str) -> Option<ReportTable> {
        let index = self.tables.iter().position(|t| t.name == name)?;
        Some(self.tables.remove(index))
    }
}

/// Naming hint for the generic `_id` key column produced by aggregations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyColumn {
    Product,
    Category,
    Keep,
}

impl KeyColumn {
    pub const GENERIC: &'static str = "_id";

    pub fn target(&self) -> Option<&'static str> {
        match self {
            KeyColumn::Product => Some("product_id"),
            KeyColumn::Category => Some("category_id"),
            KeyColumn::Keep => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableOutput {
    pub file_name: String,
    pub key: KeyColumn,
    pub table: ReportTable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextDocument {
    pub file_name: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Bar,
    Pie,
    Line,
}

/// One plot panel: category labels with a value each.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl ChartSpec {
    pub fn from_table(
        kind: ChartKind,
        title: impl Into<String>,
        table: &ReportTable,
        label_column: &str,
        value_column: &str,
    ) -> Self {
        let (labels, values): (Vec<String>, Vec<f64>) = table
            .records
            .iter()
            .filter_map(|r| {
                let value = r.get_f64(value_column)?;
                let label = match r.get(label_column) {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => String::new(),
                };
                Some((label, value))
            })
            .unzip();
        Self {
            kind,
            title: title.into(),
            x_label: label_column.to_string(),
            y_label: value_column.to_string(),
            labels,
            values,
        }
    }

    pub fn with_axes(mut self, x_label: impl Into<String>, y_label: impl Into<String>) -> Self {
        self.x_label = x_label.into();
        self.y_label = y_label.into();
        self
    }
}

/// A PNG image made of one or more side-by-side panels.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartJob {
    pub file_name: String,
    pub panels: Vec<ChartSpec>,
}

/// A batch of writes destined for an external store rather than a file.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreBatch {
    pub source: String,
    pub rows: usize,
    pub script: String,
}

/// Everything a pipeline wants persisted, relative to `directory`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportBundle {
    pub origin: DataOrigin,
    pub directory: String,
    pub tables: Vec<TableOutput>,
    pub documents: Vec<TextDocument>,
    pub charts: Vec<ChartJob>,
    pub batches: Vec<StoreBatch>,
}

impl ReportBundle {
    pub fn new(directory: impl Into<String>, origin: DataOrigin) -> Self {
        Self {
            origin,
            directory: directory.into(),
            tables: Vec::new(),
            documents: Vec::new(),
            charts: Vec::new(),
            batches: Vec::new(),
        }
    }

    pub fn add_table(&mut self, file_name: &str, key: KeyColumn, table: ReportTable) {
        self.tables.push(TableOutput {
            file_name: file_name.to_string(),
            key,
            table,
        });
    }

    pub fn add_document(&mut self, file_name: &str, content: String) {
        self.documents.push(TextDocument {
            file_name: file_name.to_string(),
            content,
        });
    }

    pub fn add_chart(&mut self, file_name: &str, panels: Vec<ChartSpec>) {
        self.charts.push(ChartJob {
            file_name: file_name.to_string(),
            panels,
        });
    }

    pub fn path_for(&self, file_name: &str) -> String {
        if self.directory.is_empty() {
            file_name.to_string()
        } else {
            format!("{}/{}", self.directory.trim_end_matches('/'), file_name)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadSummary {
    pub origin: DataOrigin,
    pub written: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl LoadSummary {
    pub fn new(origin: DataOrigin) -> Self {
        Self {
            origin,
            written: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandStatus {
    Exited(i32),
    Signalled,
    TimedOut,
    SpawnFailed(String),
}

/// Captured result of one external command. Failures are data, not errors.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutput {
    pub status: CommandStatus,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl CommandOutput {
    pub fn is_success(&self) -> bool {
        self.status == CommandStatus::Exited(0)
    }

    /// Trimmed stdout of a successful run.
    pub fn text(&self) -> Option<&str> {
        self.is_success().then(|| self.stdout.trim())
    }

    pub fn failure_reason(&self) -> Option<String> {
        match &self.status {
            CommandStatus::Exited(0) => None,
            CommandStatus::Exited(code) => Some(format!(
                "exit code {}: {}",
                code,
                self.stderr.trim()
            )),
            CommandStatus::Signalled => Some("terminated by signal".to_string()),
            CommandStatus::TimedOut => Some(format!("timed out after {:?}", self.elapsed)),
            CommandStatus::SpawnFailed(message) => Some(format!("could not start: {}", message)),
        }
    }
}
