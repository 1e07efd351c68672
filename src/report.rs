//! Markdown business report built from the aggregate queries.

use serde::Deserialize;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::analytics::Analytics;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ForecastRow {
    pub month: String,
    pub forecast_millions: f64,
}

/// Read the optional forecast file. Missing or unreadable files yield `None`.
pub fn read_forecast(path: &Path) -> Option<Vec<ForecastRow>> {
    if !path.exists() {
        info!("No forecast at {}, skipping forecast section", path.display());
        return None;
    }
    match parse_forecast(path) {
        Ok(rows) => Some(rows),
        Err(e) => {
            warn!("Ignoring unreadable forecast {}: {}", path.display(), e);
            None
        }
    }
}

fn parse_forecast(path: &Path) -> std::result::Result<Vec<ForecastRow>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

/// Read the optional cleaning log for the data-quality appendix
pub fn read_cleaning_log(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(_) => {
            info!("No cleaning log at {}, skipping data-quality appendix", path.display());
            None
        }
    }
}

fn millions(value: f64) -> String {
    format!("${:.2}M", value / 1e6)
}

fn label(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("unknown")
}

fn table(out: &mut String, headers: &[&str], rows: Vec<Vec<String>>) {
    let _ = writeln!(out, "| {} |", headers.join(" | "));
    let _ = writeln!(out, "|{}", "---|".repeat(headers.len()));
    for row in rows {
        let _ = writeln!(out, "| {} |", row.join(" | "));
    }
    out.push('\n');
}

/// Render the report. Optional sections appear only when their input exists.
pub fn render_report(
    analytics: &Analytics,
    forecast: Option<&[ForecastRow]>,
    cleaning_log: Option<&str>,
) -> String {
    let mut out = String::new();
    out.push_str("# ABC & XYZ Restaurant Chains\n\n");

    let revenue: f64 = analytics.chains.iter().map(|c| c.revenue).sum();
    let profit: f64 = analytics.chains.iter().map(|c| c.profit).sum();
    let _ = writeln!(
        out,
        "Combined revenue {} and profit {} across {} chains.\n",
        millions(revenue),
        millions(profit),
        analytics.chains.len()
    );

    out.push_str("## Chain comparison\n\n");
    table(
        &mut out,
        &["Chain", "Revenue", "Profit", "Orders", "Restaurants", "Avg order"],
        analytics
            .chains
            .iter()
            .map(|c| {
                vec![
                    c.chain.clone(),
                    millions(c.revenue),
                    millions(c.profit),
                    c.orders.to_string(),
                    c.restaurants.to_string(),
                    format!("{:.2}", c.avg_order),
                ]
            })
            .collect(),
    );

    for (title, products) in [
        ("Top products by units sold", &analytics.top_products),
        ("Bottom products by units sold", &analytics.bottom_products),
    ] {
        let _ = writeln!(out, "## {}\n", title);
        table(
            &mut out,
            &["Item", "Category", "Units", "Profit"],
            products
                .iter()
                .map(|p| {
                    vec![
                        label(&p.item_description).to_string(),
                        label(&p.item_category).to_string(),
                        p.units_sold.to_string(),
                        format!("{:.2}", p.profit),
                    ]
                })
                .collect(),
        );
    }

    out.push_str("## Top states by profit\n\n");
    table(
        &mut out,
        &["State", "Profit", "Revenue"],
        analytics
            .top_states
            .iter()
            .map(|s| vec![label(&s.state).to_string(), millions(s.profit), millions(s.revenue)])
            .collect(),
    );

    out.push_str("## Seasons\n\n");
    table(
        &mut out,
        &["Chain", "Season", "Revenue", "Avg order"],
        analytics
            .seasons
            .iter()
            .map(|s| {
                vec![
                    s.chain.clone(),
                    s.season.clone(),
                    millions(s.revenue),
                    format!("{:.2}", s.avg_order),
                ]
            })
            .collect(),
    );

    out.push_str("## Categories\n\n");
    table(
        &mut out,
        &["Category", "Profit", "Avg profit", "Units"],
        analytics
            .categories
            .iter()
            .map(|c| {
                vec![
                    label(&c.item_category).to_string(),
                    millions(c.profit),
                    format!("{:.2}", c.avg_profit),
                    c.units_sold.to_string(),
                ]
            })
            .collect(),
    );

    out.push_str("## Purchase methods\n\n");
    table(
        &mut out,
        &["Chain", "Method", "Orders", "Profit"],
        analytics
            .purchase_methods
            .iter()
            .map(|m| {
                vec![
                    m.chain.clone(),
                    label(&m.order_purchase_method).to_string(),
                    m.orders.to_string(),
                    millions(m.profit),
                ]
            })
            .collect(),
    );

    if let Some(rows) = forecast {
        let total: f64 = rows.iter().map(|r| r.forecast_millions).sum();
        out.push_str("## Revenue forecast\n\n");
        let _ = writeln!(out, "Forecast revenue over {} months: ${:.2}M\n", rows.len(), total);
        table(
            &mut out,
            &["Month", "Forecast"],
            rows.iter()
                .map(|r| vec![r.month.clone(), format!("${:.2}M", r.forecast_millions)])
                .collect(),
        );
    }

    if let Some(log) = cleaning_log {
        out.push_str("## Appendix: data quality\n\n```text\n");
        out.push_str(log.trim_end());
        out.push_str("\n```\n");
    }

    out
}

/// Render and write `report.md`
pub fn write_report(
    analytics: &Analytics,
    forecast_path: &Path,
    cleaning_log_path: &Path,
    out_path: &Path,
) -> Result<()> {
    let forecast = read_forecast(forecast_path);
    let cleaning_log = read_cleaning_log(cleaning_log_path);
    let text = render_report(analytics, forecast.as_deref(), cleaning_log.as_deref());
    fs::write(out_path, text)?;
    info!(
        forecast = forecast.is_some(),
        appendix = cleaning_log.is_some(),
        "Wrote report to {}",
        out_path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::ChainComparison;

    fn analytics() -> Analytics {
        Analytics {
            chains: vec![ChainComparison {
                chain: "ABC".into(),
                revenue: 2_500_000.0,
                profit: 1_000_000.0,
                orders: 10,
                restaurants: 2,
                avg_order: 25.0,
            }],
            monthly: vec![],
            seasons: vec![],
            genders: vec![],
            top_states: vec![],
            top_products: vec![],
            bottom_products: vec![],
            categories: vec![],
            time_of_day: vec![],
            children: vec![],
            purchase_methods: vec![],
            summary: vec![],
        }
    }

    #[test]
    fn test_optional_sections_are_omitted() {
        let text = render_report(&analytics(), None, None);
        assert!(text.contains("| ABC | $2.50M | $1.00M | 10 | 2 | 25.00 |"));
        assert!(!text.contains("Revenue forecast"));
        assert!(!text.contains("Appendix"));
    }

    #[test]
    fn test_forecast_and_appendix_included_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let forecast_path = dir.path().join("revenue_forecast.csv");
        fs::write(&forecast_path, "month,forecast_millions\n2025-07,8.5\n2025-08,9.0\n").unwrap();
        let log_path = dir.path().join("cleaning_log.txt");
        fs::write(&log_path, "[ABC] repair_dates: 1 corrupt date (10.0%) reset to unknown\n").unwrap();
        let out_path = dir.path().join("report.md");

        write_report(&analytics(), &forecast_path, &log_path, &out_path).unwrap();
        let text = fs::read_to_string(&out_path).unwrap();
        assert!(text.contains("Forecast revenue over 2 months: $17.50M"));
        assert!(text.contains("1 corrupt date (10.0%)"));
    }

    #[test]
    fn test_missing_inputs_do_not_fail() {
        let dir = tempfile::tempdir().unwrap();
        let out_path = dir.path().join("report.md");
        write_report(
            &analytics(),
            &dir.path().join("absent.csv"),
            &dir.path().join("absent.txt"),
            &out_path,
        )
        .unwrap();
        assert!(out_path.exists());
    }
}
