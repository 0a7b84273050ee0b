use crate::domain::model::LoadSummary;
use crate::domain::ports::Pipeline;
use crate::utils::error::Result;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<LoadSummary> {
        let name = self.pipeline.name();
        tracing::info!("Starting {} pipeline", name);

        // Extract
        let data = self.pipeline.extract().await?;
        tracing::info!(
            "{}: extracted {} tables from {}",
            name,
            data.tables.len(),
            data.origin
        );

        // Transform
        let bundle = self.pipeline.transform(data).await?;
        tracing::info!(
            "{}: prepared {} tables, {} documents, {} charts, {} store batches",
            name,
            bundle.tables.len(),
            bundle.documents.len(),
            bundle.charts.len(),
            bundle.batches.len()
        );

        // Load
        let summary = self.pipeline.load(bundle).await?;
        tracing::info!(
            "{}: wrote {} outputs ({} skipped, {} failed)",
            name,
            summary.written.len(),
            summary.skipped.len(),
            summary.failed.len()
        );
        for (path, reason) in &summary.failed {
            tracing::warn!("{}: {} not written: {}", name, path, reason);
        }

        Ok(summary)
    }
}
