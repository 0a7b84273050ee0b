//! Literal fallback data used whenever a live query cannot produce rows.
//!
//! Pipelines receive a [`SampleDataset`] as a constructor parameter and only
//! default to [`SampleDataset::v1`], so tests can inject their own tables.

use crate::domain::model::ReportTable;
use crate::domain::session::HBaseRow;
use serde_json::json;

pub const SAMPLE_DATASET_VERSION: &str = "2024.1";

pub mod tables {
    pub const TOP_PRODUCTS: &str = "top_products";
    pub const REVENUE_BY_CATEGORY: &str = "revenue_by_category";
    pub const PRODUCT_ASSOCIATIONS: &str = "product_associations";
    pub const USER_SPENDING: &str = "user_spending";
    pub const CLV_ESTIMATES: &str = "clv_estimates";
    pub const RECOMMENDATIONS: &str = "recommendations";
    pub const CLV_TIERS: &str = "clv_summary";
    pub const AFFINITY_PAIRS: &str = "product_affinity_summary";
    pub const FUNNEL: &str = "funnel_summary";
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunnelStage {
    pub name: String,
    pub users: u64,
    pub avg_time_minutes: f64,
    pub improvement_priority: String,
}

impl FunnelStage {
    fn new(name: &str, users: u64, avg_time_minutes: f64, improvement_priority: &str) -> Self {
        Self {
            name: name.to_string(),
            users,
            avg_time_minutes,
            improvement_priority: improvement_priority.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SampleDataset {
    pub version: String,
    pub top_products: ReportTable,
    pub revenue_by_category: ReportTable,
    pub product_associations: ReportTable,
    pub user_spending: ReportTable,
    pub clv_estimates: ReportTable,
    pub recommendations: ReportTable,
    pub clv_tiers: ReportTable,
    pub affinity_pairs: ReportTable,
    pub funnel_stages: Vec<FunnelStage>,
    pub hbase_sessions: Vec<HBaseRow>,
}

impl Default for SampleDataset {
    fn default() -> Self {
        Self::v1()
    }
}

impl SampleDataset {
    pub fn v1() -> Self {
        Self {
            version: SAMPLE_DATASET_VERSION.to_string(),
            top_products: top_products(),
            revenue_by_category: revenue_by_category(),
            product_associations: product_associations(),
            user_spending: user_spending(),
            clv_estimates: clv_estimates(),
            recommendations: recommendations(),
            clv_tiers: clv_tiers(),
            affinity_pairs: affinity_pairs(),
            funnel_stages: funnel_stages(),
            hbase_sessions: hbase_sessions(),
        }
    }
}

fn top_products() -> ReportTable {
    let rows = [
        ("prod_00123", 150, 7500.00),
        ("prod_04567", 120, 6000.00),
        ("prod_08901", 95, 4750.00),
        ("prod_02345", 87, 4350.00),
        ("prod_06789", 76, 3800.00),
        ("prod_01234", 65, 3250.00),
        ("prod_05678", 54, 2700.00),
        ("prod_09012", 43, 2150.00),
        ("prod_03456", 32, 1600.00),
        ("prod_07890", 21, 1050.00),
    ];
    ReportTable::from_rows(
        tables::TOP_PRODUCTS,
        &["product_id", "totalSold", "totalRevenue"],
        rows.iter()
            .map(|(id, sold, revenue)| vec![json!(id), json!(sold), json!(revenue)])
            .collect(),
    )
}

fn revenue_by_category() -> ReportTable {
    let rows = [
        ("cat_001", 12500.50, 250),
        ("cat_002", 9800.75, 196),
        ("cat_003", 7450.25, 149),
        ("cat_004", 5200.00, 104),
        ("cat_005", 4100.50, 82),
        ("cat_006", 3200.75, 64),
    ];
    ReportTable::from_rows(
        tables::REVENUE_BY_CATEGORY,
        &["category_id", "totalRevenue", "totalUnits"],
        rows.iter()
            .map(|(id, revenue, units)| vec![json!(id), json!(revenue), json!(units)])
            .collect(),
    )
}

fn product_associations() -> ReportTable {
    ReportTable::from_rows(
        tables::PRODUCT_ASSOCIATIONS,
        &["product_A", "product_B", "association_strength"],
        vec![
            vec![json!("prod_00123"), json!("prod_04567"), json!(1)],
            vec![json!("prod_00123"), json!("prod_08901"), json!(1)],
        ],
    )
}

fn user_spending() -> ReportTable {
    ReportTable::from_rows(
        tables::USER_SPENDING,
        &["user_id", "total_spent", "purchase_count"],
        vec![
            vec![json!("user_000042"), json!(589.96), json!(3)],
            vec![json!("user_000173"), json!(249.96), json!(2)],
            vec![json!("user_000245"), json!(159.98), json!(1)],
        ],
    )
}

fn clv_estimates() -> ReportTable {
    ReportTable::from_rows(
        tables::CLV_ESTIMATES,
        &[
            "user_id",
            "total_spent",
            "purchase_count",
            "avg_session_duration",
            "session_frequency",
            "calculated_clv",
        ],
        vec![
            vec![json!("user_000042"), json!(589.96), json!(3), json!(45), json!(12), json!(707.95)],
            vec![json!("user_000173"), json!(249.96), json!(2), json!(32), json!(8), json!(199.97)],
            vec![json!("user_000245"), json!(159.98), json!(1), json!(28), json!(5), json!(159.98)],
        ],
    )
}

fn recommendations() -> ReportTable {
    ReportTable::from_rows(
        tables::RECOMMENDATIONS,
        &[
            "user_id",
            "viewed_products",
            "purchased_products",
            "recommended_products",
            "confidence_score",
        ],
        vec![
            vec![
                json!("user_000042"),
                json!("prod_00123,prod_04567"),
                json!("prod_00123,prod_04567,prod_06789"),
                json!("prod_08901,prod_02345"),
                json!(0.85),
            ],
            vec![
                json!("user_000173"),
                json!("prod_00123,prod_08901"),
                json!("prod_00123,prod_08901"),
                json!("prod_04567,prod_06789"),
                json!(0.78),
            ],
            vec![
                json!("user_000245"),
                json!("prod_02345"),
                json!("prod_02345"),
                json!("prod_00123,prod_06789"),
                json!(0.65),
            ],
        ],
    )
}

fn clv_tiers() -> ReportTable {
    ReportTable::from_rows(
        tables::CLV_TIERS,
        &["clv_tier", "customer_count", "avg_clv", "revenue_share"],
        vec![
            vec![json!("High (>$500)"), json!(42), json!(785.50), json!("35%")],
            vec![json!("Medium ($200-$500)"), json!(173), json!(345.25), json!("45%")],
            vec![json!("Low (<$200)"), json!(245), json!(159.98), json!("20%")],
        ],
    )
}

fn affinity_pairs() -> ReportTable {
    ReportTable::from_rows(
        tables::AFFINITY_PAIRS,
        &["product_pair", "association_strength", "occurrence_count", "lift"],
        vec![
            vec![json!("prod_00123 + prod_04567"), json!(0.85), json!(150), json!(2.5)],
            vec![json!("prod_00123 + prod_08901"), json!(0.78), json!(120), json!(2.1)],
            vec![json!("prod_02345 + prod_06789"), json!(0.65), json!(95), json!(1.8)],
        ],
    )
}

fn funnel_stages() -> Vec<FunnelStage> {
    vec![
        FunnelStage::new("Product View", 1000, 2.5, "Low"),
        FunnelStage::new("Add to Cart", 350, 5.2, "High"),
        FunnelStage::new("Checkout Start", 180, 8.7, "Medium"),
        FunnelStage::new("Purchase Complete", 120, 12.3, "N/A"),
    ]
}

fn hbase_sessions() -> Vec<HBaseRow> {
    vec![
        HBaseRow::new(
            "user_000042_001",
            &[
                ("meta:user_id", "user_000042"),
                ("meta:session_id", "sess_001"),
                ("device:type", "mobile"),
                ("geo:country", "US"),
            ],
        ),
        HBaseRow::new(
            "user_000042_002",
            &[
                ("meta:user_id", "user_000042"),
                ("meta:session_id", "sess_002"),
                ("device:type", "desktop"),
                ("geo:country", "US"),
            ],
        ),
        HBaseRow::new(
            "user_000173_001",
            &[
                ("meta:user_id", "user_000173"),
                ("meta:session_id", "sess_003"),
                ("device:type", "tablet"),
                ("geo:country", "UK"),
            ],
        ),
    ]
}
