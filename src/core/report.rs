use crate::core::chart::{ChartOutcome, ChartRenderer};
use crate::domain::model::{KeyColumn, LoadSummary, Record, ReportBundle, ReportTable};
use crate::domain::ports::Storage;
use crate::utils::error::Result;
use serde_json::Value;

/// CSV and console rendering of a single cell.
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Relabels the generic `_id` column according to `key`.
pub fn apply_key_column(table: &ReportTable, key: KeyColumn) -> ReportTable {
    let mut table = table.clone();
    if let Some(target) = key.target() {
        table.rename_column(KeyColumn::GENERIC, target);
    }
    table
}

pub fn to_csv_bytes(table: &ReportTable, key: KeyColumn) -> Result<Vec<u8>> {
    let table = apply_key_column(table, key);
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(&table.columns)?;
    for record in &table.records {
        writer.write_record(table.columns.iter().map(|c| cell_text(record.get(c))))?;
    }

    writer
        .into_inner()
        .map_err(|e| crate::utils::error::EtlError::IoError(e.into_error()))
}

/// Reads a CSV written by [`to_csv_bytes`] back into a table.
///
/// Types are decided per column: a column is numeric only when every non-empty
/// cell is a number without a leading zero, boolean when every non-empty cell is
/// `true`/`false`, and text otherwise. Empty cells are null.
pub fn from_csv_bytes(name: &str, bytes: &[u8]) -> Result<ReportTable> {
    let mut reader = csv::Reader::from_reader(bytes);
    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows: Vec<csv::StringRecord> = Vec::new();
    for row in reader.records() {
        rows.push(row?);
    }

    let kinds: Vec<CellKind> = (0..columns.len())
        .map(|i| CellKind::of_column(rows.iter().filter_map(|row| row.get(i))))
        .collect();

    let records = rows
        .iter()
        .map(|row| {
            Record::from_pairs(
                columns
                    .iter()
                    .zip(&kinds)
                    .zip(row.iter())
                    .map(|((column, kind), cell)| (column.clone(), kind.value(cell))),
            )
        })
        .collect();

    Ok(ReportTable {
        name: name.to_string(),
        columns,
        records,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Number,
    Bool,
    Text,
}

impl CellKind {
    fn of_column<'a>(cells: impl Iterator<Item = &'a str>) -> Self {
        let mut numeric = true;
        let mut boolean = true;
        let mut seen = false;
        for cell in cells.filter(|c| !c.is_empty()) {
            seen = true;
            numeric &= is_plain_number(cell);
            boolean &= cell == "true" || cell == "false";
        }
        match (seen, numeric, boolean) {
            (true, true, _) => CellKind::Number,
            (true, _, true) => CellKind::Bool,
            _ => CellKind::Text,
        }
    }

    fn value(self, cell: &str) -> Value {
        if cell.is_empty() {
            return Value::Null;
        }
        match self {
            CellKind::Number => match cell.parse::<i64>() {
                Ok(int) => Value::from(int),
                Err(_) => cell
                    .parse::<f64>()
                    .map(Value::from)
                    .unwrap_or_else(|_| Value::String(cell.to_string())),
            },
            CellKind::Bool => Value::Bool(cell == "true"),
            CellKind::Text => Value::String(cell.to_string()),
        }
    }
}

/// A number as serde_json prints it: no leading zeros, no `+`, finite.
fn is_plain_number(cell: &str) -> bool {
    let digits = cell.strip_prefix('-').unwrap_or(cell);
    let integer_part = digits
        .split(|c| c == '.' || c == 'e' || c == 'E')
        .next()
        .unwrap_or("");
    if integer_part.is_empty() || !integer_part.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    if integer_part.len() > 1 && integer_part.starts_with('0') {
        return false;
    }
    if cell.parse::<i64>().is_ok() {
        return true;
    }
    cell.parse::<f64>().map(f64::is_finite).unwrap_or(false)
}

fn is_numeric_column(table: &ReportTable, column: &str) -> bool {
    let mut seen = false;
    for record in &table.records {
        match record.get(column) {
            Some(Value::Number(_)) => seen = true,
            None | Some(Value::Null) => {}
            Some(_) => return false,
        }
    }
    seen
}

/// Cells of one column as shown in text reports. Float columns share one
/// number of decimals so the values line up.
fn display_column(table: &ReportTable, column: &str) -> Vec<String> {
    let has_float = table
        .records
        .iter()
        .any(|r| matches!(r.get(column), Some(Value::Number(n)) if n.is_f64()));

    if !has_float {
        return table
            .records
            .iter()
            .map(|r| cell_text(r.get(column)))
            .collect();
    }

    let decimals = table
        .records
        .iter()
        .filter_map(|r| match r.get(column) {
            Some(Value::Number(n)) => Some(decimal_places(&n.to_string())),
            _ => None,
        })
        .max()
        .unwrap_or(1)
        .max(1);

    table
        .records
        .iter()
        .map(|r| match r.get(column) {
            Some(Value::Number(n)) => n
                .as_f64()
                .map(|f| format!("{:.*}", decimals, f))
                .unwrap_or_else(|| n.to_string()),
            other => cell_text(other),
        })
        .collect()
}

fn decimal_places(number: &str) -> usize {
    match number.split_once('.') {
        Some((_, fraction)) => fraction.len(),
        None => 0,
    }
}

/// Fixed-width block with right-aligned columns, without a row index.
pub fn render_text(table: &ReportTable) -> String {
    let cells: Vec<Vec<String>> = table
        .columns
        .iter()
        .map(|c| display_column(table, c))
        .collect();
    let widths: Vec<usize> = table
        .columns
        .iter()
        .zip(&cells)
        .map(|(header, column)| {
            column
                .iter()
                .map(|c| c.chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut lines = Vec::with_capacity(table.len() + 1);
    lines.push(join_padded(table.columns.iter().map(String::as_str), &widths));
    for row in 0..table.len() {
        lines.push(join_padded(cells.iter().map(|c| c[row].as_str()), &widths));
    }
    lines.join("\n")
}

fn join_padded<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, width)| format!("{:>width$}", cell, width = width))
        .collect::<Vec<_>>()
        .join("  ")
}

/// GitHub pipe table. Numeric columns are right-aligned.
pub fn render_markdown(table: &ReportTable) -> String {
    let cells: Vec<Vec<String>> = table
        .columns
        .iter()
        .map(|c| display_column(table, c))
        .collect();
    let numeric: Vec<bool> = table
        .columns
        .iter()
        .map(|c| is_numeric_column(table, c))
        .collect();
    let widths: Vec<usize> = table
        .columns
        .iter()
        .zip(&cells)
        .map(|(header, column)| {
            column
                .iter()
                .map(|c| c.chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0)
                .max(3)
        })
        .collect();

    let row = |values: Vec<&str>| {
        let padded: Vec<String> = values
            .iter()
            .zip(&widths)
            .zip(&numeric)
            .map(|((value, width), right)| {
                if *right {
                    format!("{:>width$}", value, width = width)
                } else {
                    format!("{:<width$}", value, width = width)
                }
            })
            .collect();
        format!("| {} |", padded.join(" | "))
    };

    let mut lines = Vec::with_capacity(table.len() + 2);
    lines.push(row(table.columns.iter().map(String::as_str).collect()));
    let rule: Vec<String> = widths
        .iter()
        .zip(&numeric)
        .map(|(width, right)| {
            if *right {
                format!("{}:", "-".repeat(width + 1))
            } else {
                format!(":{}", "-".repeat(width + 1))
            }
        })
        .collect();
    lines.push(format!("|{}|", rule.join("|")));
    for index in 0..table.len() {
        lines.push(row(cells.iter().map(|c| c[index].as_str()).collect()));
    }
    lines.join("\n")
}

/// Formats a number with `,` thousands separators and fixed decimals.
pub fn group_thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (whole, fraction) = match formatted.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && formatted.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };
    match fraction {
        Some(fraction) => format!("{}{}.{}", sign, grouped, fraction),
        None => format!("{}{}", sign, grouped),
    }
}

/// Persists a [`ReportBundle`]: tables first, then documents, then charts.
///
/// Each failure is logged and recorded; nothing here aborts the run, so a
/// chart that cannot be drawn never affects files already written.
pub struct ReportWriter<'a, S: Storage> {
    storage: &'a S,
    charts: &'a ChartRenderer,
}

impl<'a, S: Storage> ReportWriter<'a, S> {
    pub fn new(storage: &'a S, charts: &'a ChartRenderer) -> Self {
        Self { storage, charts }
    }

    pub async fn write_bundle(&self, bundle: &ReportBundle) -> LoadSummary {
        let mut summary = LoadSummary::new(bundle.origin);

        for output in &bundle.tables {
            let path = bundle.path_for(&output.file_name);
            let result = match to_csv_bytes(&output.table, output.key) {
                Ok(bytes) => self.storage.write_file(&path, &bytes).await,
                Err(e) => Err(e),
            };
            record_result(&mut summary, path, result);
        }

        for document in &bundle.documents {
            let path = bundle.path_for(&document.file_name);
            let result = self
                .storage
                .write_file(&path, document.content.as_bytes())
                .await;
            record_result(&mut summary, path, result);
        }

        for job in &bundle.charts {
            let path = bundle.path_for(&job.file_name);
            match self.charts.render(job, &path) {
                Ok(ChartOutcome::Rendered) => {
                    tracing::info!("Saved {}", path);
                    summary.written.push(path);
                }
                Ok(ChartOutcome::Skipped) => summary.skipped.push(path),
                Err(e) => {
                    tracing::warn!("Could not create chart {}: {}", path, e);
                    summary.failed.push((path, e.to_string()));
                }
            }
        }

        summary
    }
}

fn record_result(summary: &mut LoadSummary, path: String, result: Result<()>) {
    match result {
        Ok(()) => {
            tracing::info!("Saved {}", path);
            summary.written.push(path);
        }
        Err(e) => {
            tracing::warn!("Error saving {}: {}", path, e);
            summary.failed.push((path, e.to_string()));
        }
    }
}
