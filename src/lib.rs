pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{shell::ShellExecutor, storage::LocalStorage};
pub use app::pipelines::{
    HBaseDemoPipeline, IntegrationPipeline, MongoQueryPipeline, SessionLoadPipeline,
};
pub use config::AppConfig;
#[cfg(feature = "cli")]
pub use config::CliArgs;
pub use core::chart::{ChartCapability, ChartRenderer};
pub use core::etl::EtlEngine;
pub use domain::samples::SampleDataset;
pub use utils::error::{EtlError, Result};
