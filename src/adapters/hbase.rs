use crate::config::HBaseSettings;
use crate::domain::model::{CommandOutput, CommandStatus};
use crate::domain::ports::QueryExecutor;
use crate::domain::session::HBaseRow;
use std::time::Duration;

const HEREDOC_TAG: &str = "HBASE_SHELL_EOF";

/// The HBase shell inside its container, fed scripts through a heredoc.
pub struct HBaseShell<'a, E: QueryExecutor> {
    executor: &'a E,
    settings: &'a HBaseSettings,
}

impl<'a, E: QueryExecutor> HBaseShell<'a, E> {
    pub fn new(executor: &'a E, settings: &'a HBaseSettings) -> Self {
        Self { executor, settings }
    }

    pub fn table(&self) -> &str {
        &self.settings.table
    }

    /// `-n` makes the shell exit non-zero on the first failing statement.
    pub fn command_for(&self, script: &str) -> String {
        format!(
            "docker exec -i {} hbase shell -n <<'{tag}'\n{}\n{tag}\n",
            self.settings.container,
            script.trim_end(),
            tag = HEREDOC_TAG
        )
    }

    pub async fn run_script(&self, script: &str) -> CommandOutput {
        if script.lines().any(|line| line.trim() == HEREDOC_TAG) {
            return CommandOutput {
                status: CommandStatus::SpawnFailed(format!(
                    "script contains the heredoc terminator {}",
                    HEREDOC_TAG
                )),
                stdout: String::new(),
                stderr: String::new(),
                elapsed: Duration::ZERO,
            };
        }
        self.executor.execute(&self.command_for(script)).await
    }

    pub async fn container_running(&self) -> bool {
        let command = format!(
            "docker ps --filter name={} --format '{{{{.Names}}}}'",
            self.settings.container
        );
        let output = self.executor.execute(&command).await;
        output.is_success()
            && output
                .stdout
                .lines()
                .any(|name| name.trim() == self.settings.container)
    }

    pub async fn start_container(&self) -> bool {
        let output = self
            .executor
            .execute(&format!("docker start {}", self.settings.container))
            .await;
        if let Some(reason) = output.failure_reason() {
            tracing::warn!("Could not start container {}: {}", self.settings.container, reason);
            return false;
        }
        true
    }

    /// Cluster status; used as the connection probe before loading data.
    pub async fn status(&self) -> CommandOutput {
        self.run_script("status").await
    }
}

/// Quotes a value as a Ruby string literal that always stays on one line.
///
/// Plain values use single quotes. Values with control characters switch to a
/// double-quoted literal with escapes, so no raw line break reaches the heredoc.
pub fn ruby_quote(value: &str) -> String {
    if !value.chars().any(char::is_control) {
        return format!("'{}'", value.replace('\\', r"\\").replace('\'', r"\'"));
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '\\' => quoted.push_str(r"\\"),
            '"' => quoted.push_str("\\\""),
            '#' => quoted.push_str(r"\#"),
            '\n' => quoted.push_str(r"\n"),
            '\r' => quoted.push_str(r"\r"),
            '\t' => quoted.push_str(r"\t"),
            c if c.is_control() => quoted.push_str(&format!("\\u{{{:x}}}", c as u32)),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

pub fn create_table_script(table: &str, families: &[&str]) -> String {
    let families: Vec<String> = families
        .iter()
        .map(|f| format!("{{NAME => {}, VERSIONS => 1}}", ruby_quote(f)))
        .collect();
    format!("create {}, {}", ruby_quote(table), families.join(", "))
}

/// Adds `families` to an existing table; families already present keep their data.
pub fn add_families_script(table: &str, families: &[&str]) -> String {
    let families: Vec<String> = families
        .iter()
        .map(|f| format!("{{NAME => {}, VERSIONS => 1}}", ruby_quote(f)))
        .collect();
    format!("alter {}, {}", ruby_quote(table), families.join(", "))
}

pub fn put_script(table: &str, rows: &[HBaseRow]) -> String {
    let mut lines = Vec::new();
    for row in rows {
        for (column, value) in &row.cells {
            lines.push(format!(
                "put {}, {}, {}, {}",
                ruby_quote(table),
                ruby_quote(&row.row_key),
                ruby_quote(column),
                ruby_quote(value)
            ));
        }
    }
    lines.join("\n")
}

pub fn scan_script(table: &str) -> String {
    format!("scan {}", ruby_quote(table))
}

pub fn prefix_scan_script(table: &str, prefix: &str) -> String {
    format!(
        "scan {}, {{FILTER => \"PrefixFilter({})\"}}",
        ruby_quote(table),
        ruby_quote(prefix)
    )
}

pub fn count_script(table: &str) -> String {
    format!("count {}", ruby_quote(table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::shell::ShellExecutor;
    use crate::domain::session::parse_session_file;
    use tempfile::TempDir;

    struct StaticExecutor(&'static str);

    impl QueryExecutor for StaticExecutor {
        async fn execute(&self, _command: &str) -> CommandOutput {
            CommandOutput {
                status: CommandStatus::Exited(0),
                stdout: self.0.to_string(),
                stderr: String::new(),
                elapsed: Duration::ZERO,
            }
        }
    }

    #[test]
    fn test_create_table_script() {
        assert_eq!(
            create_table_script("sessions", &["meta", "geo", "device"]),
            "create 'sessions', {NAME => 'meta', VERSIONS => 1}, {NAME => 'geo', VERSIONS => 1}, {NAME => 'device', VERSIONS => 1}"
        );
    }

    #[test]
    fn test_put_script_escapes_values() {
        let rows = vec![HBaseRow::new(
            "sess_001",
            &[
                ("meta:user_id", "user_000042"),
                ("events:log", r#"[{"note":"it's \ fine"}]"#),
            ],
        )];
        let script = put_script("sessions", &rows);
        let lines: Vec<&str> = script.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "put 'sessions', 'sess_001', 'meta:user_id', 'user_000042'");
        assert_eq!(
            lines[1],
            r#"put 'sessions', 'sess_001', 'events:log', '[{"note":"it\'s \\ fine"}]'"#
        );
    }

    #[test]
    fn test_ruby_quote_keeps_values_on_one_line() {
        assert_eq!(ruby_quote("Berlin"), "'Berlin'");
        assert_eq!(
            ruby_quote("x\nHBASE_SHELL_EOF\r\t\"#{y}\\"),
            r#""x\nHBASE_SHELL_EOF\r\t\"\#{y}\\""#
        );
        assert_eq!(ruby_quote("bell\u{7}"), r#""bell\u{7}""#);
    }

    #[test]
    fn test_session_values_cannot_close_the_heredoc() {
        let sessions = parse_session_file(
            br#"[{"session_id": "s1", "city": "x\nHBASE_SHELL_EOF\ntouch /tmp/marker #"}]"#,
        )
        .unwrap();
        let rows: Vec<HBaseRow> = sessions.iter().map(HBaseRow::from).collect();
        let settings = HBaseSettings::default();
        let executor = StaticExecutor("");
        let command = HBaseShell::new(&executor, &settings).command_for(&put_script("sessions", &rows));

        let lines: Vec<&str> = command.lines().collect();
        let terminators: Vec<usize> = lines
            .iter()
            .enumerate()
            .filter(|(_, line)| line.trim() == HEREDOC_TAG)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(terminators, vec![lines.len() - 1]);
        assert!(lines.iter().all(|line| !line.starts_with("touch")));
    }

    #[tokio::test]
    async fn test_injected_shell_command_never_runs() {
        let temp_dir = TempDir::new().unwrap();
        let marker = temp_dir.path().join("marker");
        let rows = vec![HBaseRow::new(
            "s1",
            &[(
                "geo:city",
                format!("x\n{}\ntouch {} #", HEREDOC_TAG, marker.display()).as_str(),
            )],
        )];

        let settings = HBaseSettings {
            container: "report-etl-missing-container".to_string(),
            ..HBaseSettings::default()
        };
        let executor = ShellExecutor::new(Duration::from_secs(10));
        let output = HBaseShell::new(&executor, &settings)
            .run_script(&put_script("sessions", &rows))
            .await;

        assert!(!output.is_success());
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_raw_terminator_line_is_refused() {
        let settings = HBaseSettings::default();
        let executor = StaticExecutor("");
        let output = HBaseShell::new(&executor, &settings)
            .run_script("status\nHBASE_SHELL_EOF\nrm -rf x")
            .await;
        assert!(matches!(output.status, CommandStatus::SpawnFailed(_)));
    }

    #[test]
    fn test_add_families_script() {
        assert_eq!(
            add_families_script("sessions", &["stats", "events"]),
            "alter 'sessions', {NAME => 'stats', VERSIONS => 1}, {NAME => 'events', VERSIONS => 1}"
        );
    }

    #[test]
    fn test_query_scripts() {
        assert_eq!(scan_script("sessions"), "scan 'sessions'");
        assert_eq!(
            prefix_scan_script("sessions", "user_000042"),
            r#"scan 'sessions', {FILTER => "PrefixFilter('user_000042')"}"#
        );
        assert_eq!(count_script("sessions"), "count 'sessions'");
    }

    #[test]
    fn test_command_uses_quoted_heredoc() {
        let settings = HBaseSettings::default();
        let executor = StaticExecutor("");
        let shell = HBaseShell::new(&executor, &settings);
        assert_eq!(
            shell.command_for("count 'sessions'\n"),
            "docker exec -i hbase hbase shell -n <<'HBASE_SHELL_EOF'\ncount 'sessions'\nHBASE_SHELL_EOF\n"
        );
    }

    #[tokio::test]
    async fn test_container_running_matches_exact_name() {
        let settings = HBaseSettings::default();
        assert!(HBaseShell::new(&StaticExecutor("hbase\n"), &settings)
            .container_running()
            .await);
        assert!(!HBaseShell::new(&StaticExecutor("hbase-old\n"), &settings)
            .container_running()
            .await);
        assert!(!HBaseShell::new(&StaticExecutor(""), &settings)
            .container_running()
            .await);
    }
}
