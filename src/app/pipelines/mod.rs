pub mod hbase_pipeline;
pub mod integration_pipeline;
pub mod mongo_pipeline;
pub mod session_pipeline;

pub use hbase_pipeline::HBaseDemoPipeline;
pub use integration_pipeline::IntegrationPipeline;
pub use mongo_pipeline::MongoQueryPipeline;
pub use session_pipeline::SessionLoadPipeline;
