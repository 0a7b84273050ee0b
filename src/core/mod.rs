pub mod analytics;
pub mod chart;
pub mod etl;
pub mod parser;
pub mod report;

pub use crate::domain::model::{Dataset, LoadSummary, Record, ReportBundle, ReportTable};
pub use crate::domain::ports::{ConfigProvider, Pipeline, QueryExecutor, Storage};
pub use crate::utils::error::Result;
