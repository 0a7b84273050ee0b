#[cfg(feature = "cli")]
pub mod cli;

use crate::domain::ports::ConfigProvider;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[cfg(feature = "cli")]
pub use cli::CliArgs;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub mongo: MongoSettings,
    pub hbase: HBaseSettings,
    pub sessions: SessionSettings,
    pub output: OutputSettings,
    pub executor: ExecutorSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MongoSettings {
    pub container: String,
    pub user: String,
    pub password: String,
    pub auth_database: String,
    pub database: String,
    pub collections: Vec<String>,
}

impl Default for MongoSettings {
    fn default() -> Self {
        Self {
            container: "mongodb".to_string(),
            user: "admin".to_string(),
            password: "password".to_string(),
            auth_database: "admin".to_string(),
            database: "ecommerce_db".to_string(),
            collections: ["users", "products", "categories", "transactions"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HBaseSettings {
    pub container: String,
    pub table: String,
    pub startup_wait_seconds: u64,
}

impl Default for HBaseSettings {
    fn default() -> Self {
        Self {
            container: "hbase".to_string(),
            table: "sessions".to_string(),
            startup_wait_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub input_dir: String,
    pub file_prefix: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            input_dir: ".".to_string(),
            file_prefix: "sessions_".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub root: String,
    pub mongo_dir: String,
    pub hbase_dir: String,
    pub integration_dir: String,
    pub charts: bool,
    /// TrueType font for chart text; common system locations are searched when unset
    pub chart_font: Option<String>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            root: ".".to_string(),
            mongo_dir: "mongodb_results".to_string(),
            hbase_dir: "hbase_results".to_string(),
            integration_dir: "integration_results".to_string(),
            charts: true,
            chart_font: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorSettings {
    pub timeout_seconds: u64,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
        }
    }
}

impl AppConfig {
    /// Loads the configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` placeholders such as `${MONGO_PASSWORD}`; undefined variables are left as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_identifier("mongo.container", &self.mongo.container)?;
        validation::validate_identifier("mongo.user", &self.mongo.user)?;
        validation::validate_identifier("mongo.auth_database", &self.mongo.auth_database)?;
        validation::validate_identifier("mongo.database", &self.mongo.database)?;
        if self.mongo.collections.is_empty() {
            return Err(EtlError::MissingConfigError {
                field: "mongo.collections".to_string(),
            });
        }
        for collection in &self.mongo.collections {
            validation::validate_identifier("mongo.collections", collection)?;
        }

        validation::validate_identifier("hbase.container", &self.hbase.container)?;
        validation::validate_identifier("hbase.table", &self.hbase.table)?;
        validation::validate_range("hbase.startup_wait_seconds", self.hbase.startup_wait_seconds, 0, 600)?;

        validation::validate_path("sessions.input_dir", &self.sessions.input_dir)?;
        validation::validate_non_empty_string("sessions.file_prefix", &self.sessions.file_prefix)?;

        validation::validate_path("output.root", &self.output.root)?;
        validation::validate_path("output.mongo_dir", &self.output.mongo_dir)?;
        validation::validate_path("output.hbase_dir", &self.output.hbase_dir)?;
        validation::validate_path("output.integration_dir", &self.output.integration_dir)?;

        validation::validate_range("executor.timeout_seconds", self.executor.timeout_seconds, 1, 3600)?;

        Ok(())
    }
}

impl ConfigProvider for AppConfig {
    fn mongo(&self) -> &MongoSettings {
        &self.mongo
    }

    fn hbase(&self) -> &HBaseSettings {
        &self.hbase
    }

    fn sessions(&self) -> &SessionSettings {
        &self.sessions
    }

    fn output(&self) -> &OutputSettings {
        &self.output
    }

    fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.executor.timeout_seconds)
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_builtin_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.mongo.container, "mongodb");
        assert_eq!(config.mongo.database, "ecommerce_db");
        assert_eq!(config.mongo.collections.len(), 4);
        assert_eq!(config.hbase.table, "sessions");
        assert_eq!(config.command_timeout(), Duration::from_secs(30));
        assert!(config.output.charts);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
[mongo]
container = "mongo-test"

[output]
root = "./reports"
charts = false
"#,
        )
        .unwrap();

        assert_eq!(config.mongo.container, "mongo-test");
        assert_eq!(config.mongo.user, "admin");
        assert_eq!(config.output.root, "./reports");
        assert!(!config.output.charts);
        assert_eq!(config.output.mongo_dir, "mongodb_results");
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("REPORT_ETL_TEST_MONGO_PASSWORD", "s3cret");

        let config = AppConfig::from_toml_str(
            r#"
[mongo]
password = "${REPORT_ETL_TEST_MONGO_PASSWORD}"
user = "${REPORT_ETL_TEST_UNSET_VARIABLE}"
"#,
        )
        .unwrap();
        assert_eq!(config.mongo.password, "s3cret");
        assert_eq!(config.mongo.user, "${REPORT_ETL_TEST_UNSET_VARIABLE}");

        std::env::remove_var("REPORT_ETL_TEST_MONGO_PASSWORD");
    }

    #[test]
    fn test_config_validation() {
        let config = AppConfig::from_toml_str(
            r#"
[hbase]
table = "sessions'; drop"
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());

        let config = AppConfig::from_toml_str("[executor]\ntimeout_seconds = 0\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let err = AppConfig::from_toml_str("[mongo\ncontainer = 1").unwrap_err();
        assert!(matches!(err, EtlError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[sessions]\ninput_dir = \"./data\"\n")
            .unwrap();

        let config = AppConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.sessions.input_dir, "./data");
        assert_eq!(config.sessions.file_prefix, "sessions_");
    }
}
