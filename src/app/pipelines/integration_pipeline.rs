use crate::app::pipelines::mongo_pipeline::{REVENUE_BY_CATEGORY_FILE, TOP_PRODUCTS_FILE};
use crate::core::analytics::{self, FunnelStep};
use crate::core::chart::ChartRenderer;
use crate::core::report::{from_csv_bytes, render_markdown, render_text, ReportWriter};
use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::domain::model::{
    ChartKind, ChartSpec, DataOrigin, Dataset, KeyColumn, LoadSummary, ReportBundle, ReportTable,
};
use crate::domain::samples::{tables, SampleDataset};
use crate::utils::error::Result;
use std::collections::BTreeMap;

/// Combines the query results with the session and spending analyses into
/// the CLV, affinity and funnel reports.
pub struct IntegrationPipeline<S: Storage, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) config: C,
    pub(crate) charts: ChartRenderer,
    pub(crate) samples: SampleDataset,
}

impl<S: Storage, C: ConfigProvider> IntegrationPipeline<S, C> {
    pub fn new(storage: S, config: C, charts: ChartRenderer) -> Self {
        Self {
            storage,
            config,
            charts,
            samples: SampleDataset::default(),
        }
    }

    pub fn with_samples(mut self, samples: SampleDataset) -> Self {
        self.samples = samples;
        self
    }

    /// A previous query result, or `None` when it is missing or unreadable.
    async fn load_result(&self, file: &str, table: &str) -> Option<ReportTable> {
        let path = format!(
            "{}/{}",
            self.config.output().mongo_dir.trim_end_matches('/'),
            file
        );
        let bytes = match self.storage.read_file(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("{} not available: {}", path, e);
                return None;
            }
        };
        match from_csv_bytes(table, &bytes) {
            Ok(loaded) if !loaded.is_empty() => Some(loaded),
            Ok(_) => {
                tracing::warn!("{} has no rows", path);
                None
            }
            Err(e) => {
                tracing::warn!("Could not read {}: {}", path, e);
                None
            }
        }
    }
}

/// A highlighted lead phrase and the rest of one finding.
type Finding = (String, String);

fn key_findings(data: &Dataset, steps: &[FunnelStep]) -> Vec<Finding> {
    let mut findings = Vec::new();

    if let Some(tiers) = data.table(tables::CLV_TIERS) {
        if let Some(top) = tiers.records.first() {
            let share = analytics::percent_value(top.get("revenue_share")).unwrap_or(0.0);
            let tier = top.get_str("clv_tier").unwrap_or("top tier");
            findings.push((
                format!("{}% of revenue", share),
                format!(" comes from {} customers", tier),
            ));
        }
    }

    if let Some(associations) = data.table(tables::PRODUCT_ASSOCIATIONS) {
        let mut partners: BTreeMap<String, usize> = BTreeMap::new();
        for product in associations.column_labels("product_A") {
            *partners.entry(product).or_default() += 1;
        }
        if let Some((product, count)) = partners.iter().max_by_key(|(_, count)| **count) {
            findings.push((
                product.clone(),
                format!(" shows strong affinity with {} other products", count),
            ));
        }
    }

    if let Some(worst) = analytics::biggest_drop_off(steps) {
        if let Some(pct) = worst.drop_off_pct {
            findings.push((
                format!("Drop-off before {} ({}%)", worst.name, pct),
                " is the biggest conversion bottleneck".to_string(),
            ));
        }
    }

    if let Some(last) = steps.last().filter(|_| steps.len() > 1) {
        findings.push((
            format!("{} conversion", last.name),
            format!(" from the previous stage is {}%", last.conversion_pct),
        ));
    }

    findings
}

fn integration_report(data: &Dataset, steps: &[FunnelStep]) -> String {
    let rows = |name: &str| data.table(name).map(ReportTable::len).unwrap_or(0);
    let clv = data
        .table(tables::CLV_ESTIMATES)
        .map(|t| render_text(&analytics::with_clv_tiers(t, "calculated_clv")))
        .unwrap_or_default();
    let recommendations = data
        .table(tables::RECOMMENDATIONS)
        .map(render_text)
        .unwrap_or_default();
    let funnel = render_text(&analytics::funnel_display_table(steps));

    format!(
        "ANALYTICS INTEGRATION REPORT
===============================
Generated: {generated}
Query results: {origin}

DATA LOADED:
- Top products: {products} records
- Revenue by category: {categories} records
- Product associations: {associations} pairs
- User spending: {users} users

1. CUSTOMER LIFETIME VALUE (CLV) ESTIMATION
-------------------------------------------
Sources: MongoDB (transactions) + HBase (sessions) + Spark (spending patterns)
Method: CLV = Avg Purchase x Frequency x Lifespan, adjusted for engagement

{clv}

2. PRODUCT AFFINITY & RECOMMENDATIONS
-------------------------------------
Sources: MongoDB (purchases) + HBase (browsing) + Spark (association rules)
Method: Collaborative filtering over viewed and purchased products

{recommendations}

3. FUNNEL CONVERSION ANALYSIS
-----------------------------
Sources: HBase (session flow) + MongoDB (completed transactions)
Stages: View -> Cart -> Checkout -> Purchase

{funnel}

DATA FLOW:
1. Real-time: user sessions -> HBase
2. Batch: daily transactions -> MongoDB
3. Analytics: Spark processes both sources
4. Insights: integrated reports and charts
",
        generated = chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        origin = data.origin,
        products = rows(tables::TOP_PRODUCTS),
        categories = rows(tables::REVENUE_BY_CATEGORY),
        associations = rows(tables::PRODUCT_ASSOCIATIONS),
        users = rows(tables::USER_SPENDING),
        clv = clv,
        recommendations = recommendations,
        funnel = funnel,
    )
}

fn summary_text(sections: &[(&str, &ReportTable)], findings: &[Finding]) -> String {
    let mut out = String::from("ANALYTICS INTEGRATION - KEY METRICS SUMMARY\n");
    out.push_str(&"=".repeat(50));
    out.push_str("\n\n");
    for (title, table) in sections {
        out.push_str(&format!(
            "{}\n{}\n{}\n\n",
            title,
            "-".repeat(title.len()),
            render_text(table)
        ));
    }
    out.push_str("KEY FINDINGS:\n");
    for (i, (lead, rest)) in findings.iter().enumerate() {
        out.push_str(&format!("{}. {}{}\n", i + 1, lead, rest));
    }
    out
}

fn summary_markdown(sections: &[(&str, &ReportTable)], findings: &[Finding]) -> String {
    let mut out = String::from("# Analytics Integration Summary\n\n");
    for (title, table) in sections {
        out.push_str(&format!("## {}\n\n{}\n\n", title, render_markdown(table)));
    }
    out.push_str("## Key Findings\n\n");
    for (i, (lead, rest)) in findings.iter().enumerate() {
        out.push_str(&format!("{}. **{}**{}\n", i + 1, lead, rest));
    }
    out
}

fn clv_panels(tiers: &ReportTable) -> Vec<ChartSpec> {
    let customers = ChartSpec::from_table(
        ChartKind::Bar,
        "Customer Count by CLV Tier",
        tiers,
        "clv_tier",
        "customer_count",
    )
    .with_axes("CLV Tier", "Number of Customers");

    let (labels, values): (Vec<String>, Vec<f64>) = tiers
        .records
        .iter()
        .filter_map(|r| {
            let share = analytics::percent_value(r.get("revenue_share"))?;
            Some((r.get_str("clv_tier").unwrap_or_default().to_string(), share))
        })
        .unzip();
    let revenue = ChartSpec {
        kind: ChartKind::Pie,
        title: "Revenue Share by CLV Tier".to_string(),
        x_label: String::new(),
        y_label: String::new(),
        labels,
        values,
    };

    vec![customers, revenue]
}

fn funnel_panels(steps: &[FunnelStep]) -> Vec<ChartSpec> {
    let labels: Vec<String> = steps.iter().map(|s| s.name.clone()).collect();
    vec![
        ChartSpec {
            kind: ChartKind::Bar,
            title: "User Count by Funnel Stage".to_string(),
            x_label: "Funnel Stage".to_string(),
            y_label: "Number of Users".to_string(),
            labels: labels.clone(),
            values: steps.iter().map(|s| s.users as f64).collect(),
        },
        ChartSpec {
            kind: ChartKind::Line,
            title: "Conversion Rate by Funnel Stage".to_string(),
            x_label: "Funnel Stage".to_string(),
            y_label: "Conversion Rate (%)".to_string(),
            labels,
            values: steps.iter().map(|s| f64::from(s.conversion_pct)).collect(),
        },
    ]
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for IntegrationPipeline<S, C> {
    fn name(&self) -> &'static str {
        "integrate"
    }

    async fn extract(&self) -> Result<Dataset> {
        let products = self.load_result(TOP_PRODUCTS_FILE, tables::TOP_PRODUCTS).await;
        let categories = self
            .load_result(REVENUE_BY_CATEGORY_FILE, tables::REVENUE_BY_CATEGORY)
            .await;

        let origin = if products.is_some() && categories.is_some() {
            DataOrigin::File
        } else {
            tracing::warn!("MongoDB results not found, using sample data");
            DataOrigin::Sample
        };
        let products = products.unwrap_or_else(|| self.samples.top_products.clone());
        let categories = categories.unwrap_or_else(|| self.samples.revenue_by_category.clone());
        tracing::info!(
            "Loaded {} products and {} categories ({})",
            products.len(),
            categories.len(),
            origin
        );

        let samples = &self.samples;
        Ok(Dataset::new(origin)
            .with_table(products)
            .with_table(categories)
            .with_table(samples.product_associations.clone())
            .with_table(samples.user_spending.clone())
            .with_table(samples.clv_estimates.clone())
            .with_table(samples.recommendations.clone())
            .with_table(samples.clv_tiers.clone())
            .with_table(samples.affinity_pairs.clone()))
    }

    async fn transform(&self, data: Dataset) -> Result<ReportBundle> {
        let steps = analytics::funnel_conversion(&self.samples.funnel_stages);
        let funnel = analytics::funnel_summary_table(&steps);
        let tiers = data
            .table(tables::CLV_TIERS)
            .cloned()
            .unwrap_or_else(|| self.samples.clv_tiers.clone());
        let affinity = data
            .table(tables::AFFINITY_PAIRS)
            .cloned()
            .unwrap_or_else(|| self.samples.affinity_pairs.clone());

        let findings = key_findings(&data, &steps);
        let sections = [
            ("CUSTOMER LIFETIME VALUE (CLV) TIERS", &tiers),
            ("PRODUCT AFFINITY ANALYSIS", &affinity),
            ("FUNNEL CONVERSION ANALYSIS", &funnel),
        ];
        let markdown_sections = [
            ("Customer Lifetime Value (CLV) Tiers", &tiers),
            ("Product Affinity Analysis", &affinity),
            ("Funnel Conversion Analysis", &funnel),
        ];

        let mut bundle = ReportBundle::new(
            self.config.output().integration_dir.as_str(),
            data.origin,
        );
        bundle.add_document("integration_report.txt", integration_report(&data, &steps));
        bundle.add_document("summary.txt", summary_text(&sections, &findings));
        bundle.add_document("summary.md", summary_markdown(&markdown_sections, &findings));
        bundle.add_chart("visualizations/clv_analysis.png", clv_panels(&tiers));
        bundle.add_chart("visualizations/funnel_analysis.png", funnel_panels(&steps));

        bundle.add_table("clv_summary.csv", KeyColumn::Keep, tiers);
        bundle.add_table("product_affinity_summary.csv", KeyColumn::Keep, affinity);
        bundle.add_table("funnel_summary.csv", KeyColumn::Keep, funnel);

        Ok(bundle)
    }

    async fn load(&self, bundle: ReportBundle) -> Result<LoadSummary> {
        Ok(ReportWriter::new(&self.storage, &self.charts)
            .write_bundle(&bundle)
            .await)
    }
}
