use crate::config::AppConfig;
use crate::utils::error::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "report-etl")]
#[command(about = "Runs MongoDB/HBase shell queries and writes CSV, text and chart reports")]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Path to a TOML configuration file (built-in defaults when omitted)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override output.root
    #[arg(long, global = true)]
    pub output_dir: Option<String>,

    /// Override executor.timeout_seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Skip chart rendering
    #[arg(long, global = true)]
    pub no_charts: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run the MongoDB aggregation queries and write mongodb_results/
    Mongo,
    /// Create and query the HBase sessions table through the HBase shell
    Hbase,
    /// Load sessions_*.json exports into the HBase sessions table
    LoadSessions {
        /// Directory holding the session exports
        #[arg(long)]
        input_dir: Option<String>,
    },
    /// Combine previous results into integration_results/
    Integrate,
    /// Run mongo, then integrate
    All,
}

impl CliArgs {
    /// Loads the configuration file (if any) and applies command-line overrides.
    pub fn resolve_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_file(path)?,
            None => AppConfig::default(),
        };

        if let Some(root) = &self.output_dir {
            config.output.root = root.clone();
        }
        if let Some(timeout) = self.timeout {
            config.executor.timeout_seconds = timeout;
        }
        if self.no_charts {
            config.output.charts = false;
        }
        if let Command::LoadSessions {
            input_dir: Some(dir),
        } = &self.command
        {
            config.sessions.input_dir = dir.clone();
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subcommand_with_global_flags() {
        let args = CliArgs::try_parse_from([
            "report-etl",
            "mongo",
            "--output-dir",
            "/tmp/reports",
            "--timeout",
            "5",
            "--no-charts",
        ])
        .unwrap();

        assert_eq!(args.command, Command::Mongo);
        let config = args.resolve_config().unwrap();
        assert_eq!(config.output.root, "/tmp/reports");
        assert_eq!(config.executor.timeout_seconds, 5);
        assert!(!config.output.charts);
    }

    #[test]
    fn test_load_sessions_input_dir_override() {
        let args =
            CliArgs::try_parse_from(["report-etl", "load-sessions", "--input-dir", "./exports"])
                .unwrap();
        let config = args.resolve_config().unwrap();
        assert_eq!(config.sessions.input_dir, "./exports");
    }

    #[test]
    fn test_missing_subcommand_is_rejected() {
        assert!(CliArgs::try_parse_from(["report-etl"]).is_err());
    }
}
