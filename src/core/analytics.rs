//! Derived business metrics for the integration and query reports.

use crate::core::report::group_thousands;
use crate::domain::model::{Record, ReportTable};
use crate::domain::samples::{tables, FunnelStage};
use serde_json::{json, Value};

/// One funnel stage with its rates relative to the previous stage.
#[derive(Debug, Clone, PartialEq)]
pub struct FunnelStep {
    pub name: String,
    pub users: u64,
    /// Whole percent of the previous stage's users that reached this one.
    pub conversion_pct: u32,
    /// `None` for the entry stage.
    pub drop_off_pct: Option<u32>,
    pub avg_time_minutes: f64,
    pub improvement_priority: String,
}

pub fn funnel_conversion(stages: &[FunnelStage]) -> Vec<FunnelStep> {
    let mut previous: Option<u64> = None;
    stages
        .iter()
        .map(|stage| {
            let (conversion_pct, drop_off_pct) = match previous {
                None => (100, None),
                Some(0) => (0, Some(100)),
                Some(before) => {
                    let pct = (stage.users as f64 / before as f64 * 100.0).round() as u32;
                    (pct, Some(100u32.saturating_sub(pct)))
                }
            };
            previous = Some(stage.users);
            FunnelStep {
                name: stage.name.clone(),
                users: stage.users,
                conversion_pct,
                drop_off_pct,
                avg_time_minutes: stage.avg_time_minutes,
                improvement_priority: stage.improvement_priority.clone(),
            }
        })
        .collect()
}

/// Machine-readable funnel table; rates are fractions.
pub fn funnel_summary_table(steps: &[FunnelStep]) -> ReportTable {
    ReportTable::from_rows(
        tables::FUNNEL,
        &[
            "funnel_stage",
            "user_count",
            "conversion_rate",
            "drop_off_rate",
            "avg_time_minutes",
            "improvement_priority",
        ],
        steps
            .iter()
            .map(|step| {
                vec![
                    json!(step.name),
                    json!(step.users),
                    json!(f64::from(step.conversion_pct) / 100.0),
                    step.drop_off_pct
                        .map(|pct| json!(f64::from(pct) / 100.0))
                        .unwrap_or(Value::Null),
                    json!(step.avg_time_minutes),
                    json!(step.improvement_priority),
                ]
            })
            .collect(),
    )
}

/// Funnel table for reading, with rates as percent strings.
pub fn funnel_display_table(steps: &[FunnelStep]) -> ReportTable {
    ReportTable::from_rows(
        "funnel_conversion",
        &["funnel_stage", "user_count", "conversion_rate", "drop_off_rate"],
        steps
            .iter()
            .map(|step| {
                vec![
                    json!(step.name),
                    json!(step.users),
                    json!(format!("{}%", step.conversion_pct)),
                    json!(step
                        .drop_off_pct
                        .map(|pct| format!("{}%", pct))
                        .unwrap_or_else(|| "N/A".to_string())),
                ]
            })
            .collect(),
    )
}

/// The stage losing the largest share of its users, if any stage loses users.
pub fn biggest_drop_off(steps: &[FunnelStep]) -> Option<&FunnelStep> {
    steps
        .iter()
        .filter(|step| step.drop_off_pct.is_some_and(|pct| pct > 0))
        .max_by_key(|step| step.drop_off_pct)
}

pub fn clv_tier(clv: f64) -> &'static str {
    if clv > 500.0 {
        "High (>$500)"
    } else if clv >= 200.0 {
        "Medium ($200-$500)"
    } else {
        "Low (<$200)"
    }
}

/// Copy of `table` with a `clv_tier` column derived from `value_column`.
pub fn with_clv_tiers(table: &ReportTable, value_column: &str) -> ReportTable {
    let mut tiered = table.clone();
    if !tiered.has_column("clv_tier") {
        tiered.columns.push("clv_tier".to_string());
    }
    for record in &mut tiered.records {
        let tier = record.get_f64(value_column).map(clv_tier).unwrap_or("");
        record.insert("clv_tier", json!(tier));
    }
    tiered
}

/// Parses a percent cell such as `"35%"` or `35`.
pub fn percent_value(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    }
}

/// Pairs from an association table whose first product matches `product_id`.
pub fn associations_for<'a>(table: &'a ReportTable, product_id: &str) -> Vec<&'a Record> {
    table
        .records
        .iter()
        .filter(|r| r.get_str("product_A") == Some(product_id))
        .collect()
}

/// Totals over the product and category query results.
pub fn summary_statistics(products: &ReportTable, categories: &ReportTable) -> String {
    let units = products.column_sum("totalSold");
    let product_revenue = products.column_sum("totalRevenue");
    let category_revenue = categories.column_sum("totalRevenue");
    let average = categories.column_mean("totalRevenue").unwrap_or(0.0);

    let mut lines = vec![
        "=== SUMMARY STATISTICS ===".to_string(),
        String::new(),
        "Top Products Analysis:".to_string(),
        format!("Total products analyzed: {}", products.len()),
        format!("Total units sold: {}", group_thousands(units, 0)),
        format!("Total revenue: ${}", group_thousands(product_revenue, 2)),
        String::new(),
        "Category Analysis:".to_string(),
        format!("Total categories: {}", categories.len()),
        format!(
            "Total category revenue: ${}",
            group_thousands(category_revenue, 2)
        ),
        format!(
            "Average revenue per category: ${}",
            group_thousands(average, 2)
        ),
    ];

    if let Some(top) = products.records.first() {
        lines.push(String::new());
        lines.push(format!(
            "Best seller: {} ({} units)",
            crate::core::report::cell_text(top.get("product_id").or_else(|| top.get("_id"))),
            group_thousands(top.get_f64("totalSold").unwrap_or(0.0), 0)
        ));
    }

    lines.push(String::new());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::samples::SampleDataset;

    #[test]
    fn test_funnel_rates_from_stage_counts() {
        let steps = funnel_conversion(&SampleDataset::v1().funnel_stages);
        let conversion: Vec<u32> = steps.iter().map(|s| s.conversion_pct).collect();
        let drop_off: Vec<Option<u32>> = steps.iter().map(|s| s.drop_off_pct).collect();
        assert_eq!(conversion, vec![100, 35, 51, 67]);
        assert_eq!(drop_off, vec![None, Some(65), Some(49), Some(33)]);
    }

    #[test]
    fn test_funnel_with_empty_stage() {
        let stages = vec![
            FunnelStage {
                name: "View".to_string(),
                users: 0,
                avg_time_minutes: 1.0,
                improvement_priority: "Low".to_string(),
            },
            FunnelStage {
                name: "Buy".to_string(),
                users: 0,
                avg_time_minutes: 1.0,
                improvement_priority: "High".to_string(),
            },
        ];
        let steps = funnel_conversion(&stages);
        assert_eq!(steps[1].conversion_pct, 0);
        assert_eq!(steps[1].drop_off_pct, Some(100));
    }

    #[test]
    fn test_funnel_tables() {
        let steps = funnel_conversion(&SampleDataset::v1().funnel_stages);

        let summary = funnel_summary_table(&steps);
        assert_eq!(summary.name, "funnel_summary");
        assert_eq!(summary.cell(1, "conversion_rate"), Some(&json!(0.35)));
        assert_eq!(summary.cell(0, "drop_off_rate"), Some(&Value::Null));

        let display = funnel_display_table(&steps);
        assert_eq!(display.cell(0, "drop_off_rate"), Some(&json!("N/A")));
        assert_eq!(display.cell(3, "conversion_rate"), Some(&json!("67%")));

        let worst = biggest_drop_off(&steps).unwrap();
        assert_eq!(worst.name, "Add to Cart");
    }

    #[test]
    fn test_clv_tier_boundaries() {
        assert_eq!(clv_tier(707.95), "High (>$500)");
        assert_eq!(clv_tier(500.0), "Medium ($200-$500)");
        assert_eq!(clv_tier(200.0), "Medium ($200-$500)");
        assert_eq!(clv_tier(199.97), "Low (<$200)");
    }

    #[test]
    fn test_with_clv_tiers() {
        let samples = SampleDataset::v1();
        let tiered = with_clv_tiers(&samples.clv_estimates, "calculated_clv");
        assert_eq!(tiered.columns.last().map(String::as_str), Some("clv_tier"));
        assert_eq!(tiered.cell(0, "clv_tier"), Some(&json!("High (>$500)")));
        assert_eq!(tiered.cell(2, "clv_tier"), Some(&json!("Low (<$200)")));
    }

    #[test]
    fn test_percent_value() {
        assert_eq!(percent_value(Some(&json!("35%"))), Some(35.0));
        assert_eq!(percent_value(Some(&json!(20))), Some(20.0));
        assert_eq!(percent_value(Some(&json!("n/a"))), None);
        assert_eq!(percent_value(None), None);
    }

    #[test]
    fn test_summary_statistics_on_samples() {
        let samples = SampleDataset::v1();
        let text = summary_statistics(&samples.top_products, &samples.revenue_by_category);
        assert!(text.contains("Total products analyzed: 10"));
        assert!(text.contains("Total units sold: 743"));
        assert!(text.contains("Total revenue: $37,150.00"));
        assert!(text.contains("Total categories: 6"));
        assert!(text.contains("Total category revenue: $42,252.75"));
        assert!(text.contains("Average revenue per category: $7,042.1"));
        assert!(text.contains("Best seller: prod_00123 (150 units)"));
    }

    #[test]
    fn test_associations_for_product() {
        let samples = SampleDataset::v1();
        assert_eq!(associations_for(&samples.product_associations, "prod_00123").len(), 2);
        assert!(associations_for(&samples.product_associations, "prod_99999").is_empty());
    }
}
