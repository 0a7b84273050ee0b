use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Command failed: {command}: {message}")]
    CommandFailed { command: String, message: String },

    #[error("Cannot connect to {target}: {message}")]
    ConnectionError { target: String, message: String },

    #[error("Chart rendering failed: {message}")]
    ChartError { message: String },

    #[error("Chart rendering is not available in this build")]
    ChartUnavailable,

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Data,
    ExternalProcess,
    Connection,
    Rendering,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::IoError(_) => ErrorCategory::Io,
            EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::ProcessingError { .. } => ErrorCategory::Data,
            EtlError::CommandFailed { .. } => ErrorCategory::ExternalProcess,
            EtlError::ConnectionError { .. } => ErrorCategory::Connection,
            EtlError::ChartError { .. } | EtlError::ChartUnavailable => ErrorCategory::Rendering,
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Rendering => ErrorSeverity::Low,
            ErrorCategory::ExternalProcess => ErrorSeverity::Medium,
            ErrorCategory::Data | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Io | ErrorCategory::Connection => ErrorSeverity::Critical,
        }
    }

    /// Process exit code for a run that ended with this error.
    pub fn exit_code(&self) -> i32 {
        if let EtlError::ConnectionError { .. } = self {
            return 1;
        }
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::ConnectionError { .. } => {
                "Check that Docker is running and the database container is started (docker ps / docker start <name>), then wait a few seconds before retrying"
            }
            EtlError::CommandFailed { .. } => {
                "Run the command manually to inspect its output; increase --timeout if the database is slow to answer"
            }
            EtlError::ChartError { .. } | EtlError::ChartUnavailable => {
                "Rebuild with the 'charts' feature or pass --no-charts; CSV and text reports are unaffected"
            }
            EtlError::IoError(_) => "Check that the output directory exists and is writable",
            EtlError::CsvError(_) | EtlError::SerializationError(_) => {
                "Regenerate the input files; they may have been edited by hand or truncated"
            }
            EtlError::ProcessingError { .. } => "Inspect the input data with --verbose logging",
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => {
                "Fix the configuration file or command-line overrides and run again"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::ConnectionError { target, .. } => {
                format!("Could not reach {}. The run was stopped.", target)
            }
            EtlError::CommandFailed { command, .. } => {
                format!("External command did not complete: {}", command)
            }
            EtlError::ChartUnavailable => "Charts were skipped (not available in this build)".to_string(),
            EtlError::InvalidConfigValueError { field, reason, .. } => {
                format!("Invalid setting '{}': {}", field, reason)
            }
            EtlError::MissingConfigError { field } => format!("Missing setting '{}'", field),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_error_exits_with_one() {
        let err = EtlError::ConnectionError {
            target: "HBase".to_string(),
            message: "refused".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Connection);
        assert_eq!(err.exit_code(), 1);
        assert!(err.user_friendly_message().contains("HBase"));
    }

    #[test]
    fn test_chart_errors_are_low_severity() {
        assert_eq!(EtlError::ChartUnavailable.severity(), ErrorSeverity::Low);
        assert_eq!(EtlError::ChartUnavailable.exit_code(), 0);
    }

    #[test]
    fn test_config_errors_exit_with_one() {
        let err = EtlError::MissingConfigError {
            field: "mongo.container".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert_eq!(err.exit_code(), 1);
    }
}
