use crate::adapters::mongo::MongoShell;
use crate::core::analytics;
use crate::core::chart::ChartRenderer;
use crate::core::parser::truncate_display;
use crate::core::report::{apply_key_column, cell_text, ReportWriter};
use crate::core::{ConfigProvider, Pipeline, QueryExecutor, Storage};
use crate::domain::model::{
    ChartKind, ChartSpec, DataOrigin, Dataset, KeyColumn, LoadSummary, Record, ReportBundle,
    ReportTable,
};
use crate::domain::samples::{tables, SampleDataset};
use crate::utils::error::Result;

pub const TOP_PRODUCTS_FILE: &str = "top_products.csv";
pub const REVENUE_BY_CATEGORY_FILE: &str = "revenue_by_category.csv";

/// Units sold and revenue per product, best sellers first.
pub const TOP_PRODUCTS_PIPELINE: &str = r#"[
  {"$unwind": "$items"},
  {"$group": {
    "_id": "$items.product_id",
    "totalSold": {"$sum": "$items.quantity"},
    "totalRevenue": {"$sum": "$items.subtotal"}
  }},
  {"$sort": {"totalSold": -1}},
  {"$limit": 15}
]"#;

/// Revenue and units per product category, joined through `products`.
pub const REVENUE_BY_CATEGORY_PIPELINE: &str = r#"[
  {"$unwind": "$items"},
  {"$lookup": {
    "from": "products",
    "localField": "items.product_id",
    "foreignField": "product_id",
    "as": "product"
  }},
  {"$unwind": "$product"},
  {"$group": {
    "_id": "$product.category_id",
    "totalRevenue": {"$sum": "$items.subtotal"},
    "totalUnits": {"$sum": "$items.quantity"}
  }},
  {"$sort": {"totalRevenue": -1}}
]"#;

/// Top products and revenue by category from the document store, with the
/// sample tables standing in whenever the live path yields nothing.
pub struct MongoQueryPipeline<S: Storage, E: QueryExecutor, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) executor: E,
    pub(crate) config: C,
    pub(crate) charts: ChartRenderer,
    pub(crate) samples: SampleDataset,
}

impl<S: Storage, E: QueryExecutor, C: ConfigProvider> MongoQueryPipeline<S, E, C> {
    pub fn new(storage: S, executor: E, config: C, charts: ChartRenderer) -> Self {
        Self {
            storage,
            executor,
            config,
            charts,
            samples: SampleDataset::default(),
        }
    }

    pub fn with_samples(mut self, samples: SampleDataset) -> Self {
        self.samples = samples;
        self
    }

    fn sample_data(&self) -> Dataset {
        Dataset::new(DataOrigin::Sample)
            .with_table(self.samples.top_products.clone())
            .with_table(self.samples.revenue_by_category.clone())
    }

    async fn transaction_count(&self, shell: &MongoShell<'_, E>) -> u64 {
        let mut transactions = None;
        for collection in &self.config.mongo().collections {
            match shell.count_documents(collection).await {
                Some(count) => {
                    tracing::info!("  {}: {} documents", collection, count);
                    if collection == "transactions" {
                        transactions = Some(count);
                    }
                }
                None => tracing::warn!("  {}: failed to get count", collection),
            }
        }
        match transactions {
            Some(count) => count,
            None => shell.count_documents("transactions").await.unwrap_or(0),
        }
    }

    async fn run_query(
        &self,
        shell: &MongoShell<'_, E>,
        title: &str,
        stages: &str,
    ) -> Option<Vec<Record>> {
        tracing::info!("Running query: {}", title);
        let records = shell.aggregate("transactions", stages).await?;
        if records.is_empty() {
            tracing::warn!("{}: no data returned from query", title);
            return None;
        }
        tracing::info!("{}: found {} rows", title, records.len());
        for (rank, record) in records.iter().take(5).enumerate() {
            tracing::info!(
                "  {}. {}",
                rank + 1,
                truncate_display(&serde_json::Value::Object(record.data.clone()).to_string(), 120)
            );
        }
        Some(records)
    }
}

#[async_trait::async_trait]
impl<S: Storage, E: QueryExecutor, C: ConfigProvider> Pipeline for MongoQueryPipeline<S, E, C> {
    fn name(&self) -> &'static str {
        "mongo"
    }

    async fn extract(&self) -> Result<Dataset> {
        let shell = MongoShell::new(&self.executor, self.config.mongo());

        if !shell.ping().await {
            tracing::warn!(
                "MongoDB connection failed (container '{}'), using sample data",
                self.config.mongo().container
            );
            return Ok(self.sample_data());
        }
        tracing::info!("MongoDB connection successful");

        let transactions = self.transaction_count(&shell).await;
        if transactions == 0 {
            tracing::warn!("No transaction data found, using sample data");
            return Ok(self.sample_data());
        }
        tracing::info!("Found {} transactions to analyze", transactions);

        let products = self
            .run_query(&shell, "top-selling products", TOP_PRODUCTS_PIPELINE)
            .await;
        let categories = self
            .run_query(&shell, "revenue by category", REVENUE_BY_CATEGORY_PIPELINE)
            .await;

        match (products, categories) {
            (Some(products), Some(categories)) => Ok(Dataset::new(DataOrigin::Live)
                .with_table(ReportTable::from_records(tables::TOP_PRODUCTS, products))
                .with_table(ReportTable::from_records(
                    tables::REVENUE_BY_CATEGORY,
                    categories,
                ))),
            _ => {
                tracing::warn!("Queries failed, using sample data");
                Ok(self.sample_data())
            }
        }
    }

    async fn transform(&self, mut data: Dataset) -> Result<ReportBundle> {
        let products = apply_key_column(
            &data
                .take_table(tables::TOP_PRODUCTS)
                .unwrap_or_else(|| self.samples.top_products.clone()),
            KeyColumn::Product,
        );
        let categories = apply_key_column(
            &data
                .take_table(tables::REVENUE_BY_CATEGORY)
                .unwrap_or_else(|| self.samples.revenue_by_category.clone()),
            KeyColumn::Category,
        );

        let mut bundle = ReportBundle::new(self.config.output().mongo_dir.as_str(), data.origin);

        bundle.add_document(
            "query_documentation.txt",
            query_documentation(&products, &categories, data.origin),
        );
        bundle.add_document(
            "summary_statistics.txt",
            analytics::summary_statistics(&products, &categories),
        );

        bundle.add_chart(
            "top_products_chart.png",
            vec![ChartSpec::from_table(
                ChartKind::Bar,
                "Top 10 Products by Units Sold",
                &products.head(10),
                "product_id",
                "totalSold",
            )
            .with_axes("Product ID", "Units Sold")],
        );
        bundle.add_chart(
            "revenue_by_category_chart.png",
            vec![ChartSpec::from_table(
                ChartKind::Bar,
                "Revenue by Category",
                &categories,
                "category_id",
                "totalRevenue",
            )
            .with_axes("Category ID", "Revenue ($)")],
        );

        bundle.add_table(TOP_PRODUCTS_FILE, KeyColumn::Product, products);
        bundle.add_table(REVENUE_BY_CATEGORY_FILE, KeyColumn::Category, categories);

        Ok(bundle)
    }

    async fn load(&self, bundle: ReportBundle) -> Result<LoadSummary> {
        Ok(ReportWriter::new(&self.storage, &self.charts)
            .write_bundle(&bundle)
            .await)
    }
}

fn query_documentation(products: &ReportTable, categories: &ReportTable, origin: DataOrigin) -> String {
    let best = |table: &ReportTable, column: &str| {
        table
            .records
            .first()
            .map(|r| cell_text(r.get(column)))
            .unwrap_or_else(|| "-".to_string())
    };

    format!(
        "MONGODB AGGREGATION QUERIES - RESULTS
Generated: {generated}
Data source: {origin}

QUERY 1: Top-selling Products
=============================
Aggregation Pipeline:
db.transactions.aggregate({q1})

Results Summary:
- Products analyzed: {products}
- Best seller: {best_product}
- Saved to: {products_file}

QUERY 2: Revenue by Category
============================
Aggregation Pipeline:
db.transactions.aggregate({q2})

Results Summary:
- Categories analyzed: {categories}
- Highest revenue category: {best_category}
- Saved to: {categories_file}

FILES GENERATED:
===============
1. {products_file} - Product sales data
2. {categories_file} - Category revenue data
3. summary_statistics.txt - Totals and averages
4. top_products_chart.png - Top 10 products by units sold
5. revenue_by_category_chart.png - Revenue per category
",
        generated = chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        origin = origin,
        q1 = TOP_PRODUCTS_PIPELINE,
        q2 = REVENUE_BY_CATEGORY_PIPELINE,
        products = products.len(),
        categories = categories.len(),
        best_product = best(products, "product_id"),
        best_category = best(categories, "category_id"),
        products_file = TOP_PRODUCTS_FILE,
        categories_file = REVENUE_BY_CATEGORY_FILE,
    )
}
