//! Read-only aggregate queries over the loaded store.

use rusqlite::{Connection, Row};
use serde::Serialize;
use std::fs::File;
use std::path::Path;
use tracing::info;

use crate::config::ReportConfig;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainComparison {
    pub chain: String,
    pub revenue: f64,
    pub profit: f64,
    pub orders: i64,
    pub restaurants: i64,
    pub avg_order: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyRevenue {
    pub chain: String,
    pub year: i64,
    pub month: i64,
    pub month_name: String,
    pub revenue: f64,
    pub profit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonalRevenue {
    pub chain: String,
    pub season: String,
    pub revenue: f64,
    pub avg_order: f64,
}

/// Revenue split by one attribute (gender, AM/PM, children) per chain
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentRevenue {
    pub chain: String,
    pub segment: Option<String>,
    pub revenue: f64,
    pub avg_order: f64,
    pub orders: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateProfit {
    pub state: Option<String>,
    pub profit: f64,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductPerformance {
    pub item_description: Option<String>,
    pub item_category: Option<String>,
    pub units_sold: i64,
    pub profit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryProfit {
    pub item_category: Option<String>,
    pub profit: f64,
    pub avg_profit: f64,
    pub units_sold: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseMethodBreakdown {
    pub chain: String,
    pub order_purchase_method: Option<String>,
    pub orders: i64,
    pub profit: f64,
}

/// One row of `summary_stats.csv`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainSummary {
    pub chain: String,
    pub total_rows: i64,
    pub mean_order_value: Option<f64>,
    pub min_order_value: Option<f64>,
    pub max_order_value: Option<f64>,
    pub mean_profit: Option<f64>,
    pub min_profit: Option<f64>,
    pub max_profit: Option<f64>,
    pub mean_quantity: Option<f64>,
    pub mean_menu_price: Option<f64>,
    pub unique_orders: i64,
    pub unique_customers: i64,
    pub unique_restaurants: i64,
}

/// Every aggregate the report and `analytics.json` are built from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analytics {
    pub chains: Vec<ChainComparison>,
    pub monthly: Vec<MonthlyRevenue>,
    pub seasons: Vec<SeasonalRevenue>,
    pub genders: Vec<SegmentRevenue>,
    pub top_states: Vec<StateProfit>,
    pub top_products: Vec<ProductPerformance>,
    pub bottom_products: Vec<ProductPerformance>,
    pub categories: Vec<CategoryProfit>,
    pub time_of_day: Vec<SegmentRevenue>,
    pub children: Vec<SegmentRevenue>,
    pub purchase_methods: Vec<PurchaseMethodBreakdown>,
    pub summary: Vec<ChainSummary>,
}

impl Analytics {
    pub fn collect(conn: &Connection, limits: &ReportConfig) -> Result<Self> {
        let analytics = Self {
            chains: chain_comparison(conn)?,
            monthly: monthly_revenue(conn)?,
            seasons: seasonal_revenue(conn)?,
            genders: segment_revenue(conn, "gender")?,
            top_states: top_states(conn, limits.top_states)?,
            top_products: product_performance(conn, limits.top_products, true)?,
            bottom_products: product_performance(conn, limits.top_products, false)?,
            categories: category_profit(conn)?,
            time_of_day: segment_revenue(conn, "time_of_day_flag")?,
            children: segment_revenue(conn, "has_children")?,
            purchase_methods: purchase_methods(conn)?,
            summary: chain_summary(conn)?,
        };
        info!(
            chains = analytics.chains.len(),
            months = analytics.monthly.len(),
            categories = analytics.categories.len(),
            "Collected aggregate queries"
        );
        Ok(analytics)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

fn query_rows<T, F>(conn: &Connection, sql: &str, map: F) -> Result<Vec<T>>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], map)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn chain_comparison(conn: &Connection) -> Result<Vec<ChainComparison>> {
    query_rows(
        conn,
        "SELECT chain,
                COALESCE(SUM(order_total_cost), 0.0),
                COALESCE(SUM(profit), 0.0),
                COUNT(DISTINCT order_number),
                COUNT(DISTINCT restaurant_id),
                COALESCE(AVG(order_total_cost), 0.0)
         FROM orders GROUP BY chain ORDER BY chain",
        |row| {
            Ok(ChainComparison {
                chain: row.get(0)?,
                revenue: row.get(1)?,
                profit: row.get(2)?,
                orders: row.get(3)?,
                restaurants: row.get(4)?,
                avg_order: row.get(5)?,
            })
        },
    )
}

pub fn monthly_revenue(conn: &Connection) -> Result<Vec<MonthlyRevenue>> {
    query_rows(
        conn,
        "SELECT chain, year, month, month_name,
                COALESCE(SUM(order_total_cost), 0.0),
                COALESCE(SUM(profit), 0.0)
         FROM orders
         WHERE purchase_date IS NOT NULL
         GROUP BY chain, year, month
         ORDER BY year, month, chain",
        |row| {
            Ok(MonthlyRevenue {
                chain: row.get(0)?,
                year: row.get(1)?,
                month: row.get(2)?,
                month_name: row.get(3)?,
                revenue: row.get(4)?,
                profit: row.get(5)?,
            })
        },
    )
}

pub fn seasonal_revenue(conn: &Connection) -> Result<Vec<SeasonalRevenue>> {
    query_rows(
        conn,
        "SELECT chain, season,
                COALESCE(SUM(order_total_cost), 0.0),
                COALESCE(AVG(order_total_cost), 0.0)
         FROM orders WHERE season IS NOT NULL
         GROUP BY chain, season
         ORDER BY chain, season",
        |row| {
            Ok(SeasonalRevenue {
                chain: row.get(0)?,
                season: row.get(1)?,
                revenue: row.get(2)?,
                avg_order: row.get(3)?,
            })
        },
    )
}

/// Revenue per chain split by `column`. Only called with fixed column names.
fn segment_revenue(conn: &Connection, column: &str) -> Result<Vec<SegmentRevenue>> {
    let sql = format!(
        "SELECT chain, {column},
                COALESCE(SUM(order_total_cost), 0.0),
                COALESCE(AVG(order_total_cost), 0.0),
                COUNT(*)
         FROM orders GROUP BY chain, {column}
         ORDER BY chain, {column}"
    );
    query_rows(conn, &sql, |row| {
        Ok(SegmentRevenue {
            chain: row.get(0)?,
            segment: row.get(1)?,
            revenue: row.get(2)?,
            avg_order: row.get(3)?,
            orders: row.get(4)?,
        })
    })
}

pub fn top_states(conn: &Connection, limit: usize) -> Result<Vec<StateProfit>> {
    let sql = format!(
        "SELECT r.restaurant_state,
                COALESCE(SUM(o.profit), 0.0) AS total_profit,
                COALESCE(SUM(o.order_total_cost), 0.0)
         FROM orders o
         JOIN restaurants r ON o.restaurant_id = r.restaurant_id
         GROUP BY r.restaurant_state
         ORDER BY total_profit DESC, r.restaurant_state
         LIMIT {}",
        limit
    );
    query_rows(conn, &sql, |row| {
        Ok(StateProfit {
            state: row.get(0)?,
            profit: row.get(1)?,
            revenue: row.get(2)?,
        })
    })
}

/// Best (`descending`) or worst selling products by units
pub fn product_performance(
    conn: &Connection,
    limit: usize,
    descending: bool,
) -> Result<Vec<ProductPerformance>> {
    let direction = if descending { "DESC" } else { "ASC" };
    let sql = format!(
        "SELECT item_description, MIN(item_category),
                COALESCE(SUM(quantity), 0) AS units,
                COALESCE(SUM(profit), 0.0)
         FROM orders
         GROUP BY item_description
         ORDER BY units {}, item_description
         LIMIT {}",
        direction, limit
    );
    query_rows(conn, &sql, |row| {
        Ok(ProductPerformance {
            item_description: row.get(0)?,
            item_category: row.get(1)?,
            units_sold: row.get(2)?,
            profit: row.get(3)?,
        })
    })
}

pub fn category_profit(conn: &Connection) -> Result<Vec<CategoryProfit>> {
    query_rows(
        conn,
        "SELECT item_category,
                COALESCE(SUM(profit), 0.0) AS total_profit,
                COALESCE(AVG(profit), 0.0),
                COALESCE(SUM(quantity), 0)
         FROM orders
         GROUP BY item_category
         ORDER BY total_profit DESC, item_category",
        |row| {
            Ok(CategoryProfit {
                item_category: row.get(0)?,
                profit: row.get(1)?,
                avg_profit: row.get(2)?,
                units_sold: row.get(3)?,
            })
        },
    )
}

pub fn purchase_methods(conn: &Connection) -> Result<Vec<PurchaseMethodBreakdown>> {
    query_rows(
        conn,
        "SELECT chain, order_purchase_method, COUNT(*) AS orders,
                COALESCE(SUM(profit), 0.0)
         FROM orders
         GROUP BY chain, order_purchase_method
         ORDER BY chain, orders DESC",
        |row| {
            Ok(PurchaseMethodBreakdown {
                chain: row.get(0)?,
                order_purchase_method: row.get(1)?,
                orders: row.get(2)?,
                profit: row.get(3)?,
            })
        },
    )
}

pub fn chain_summary(conn: &Connection) -> Result<Vec<ChainSummary>> {
    query_rows(
        conn,
        "SELECT chain,
                COUNT(*),
                ROUND(AVG(order_total_cost), 2),
                ROUND(MIN(order_total_cost), 2),
                ROUND(MAX(order_total_cost), 2),
                ROUND(AVG(profit), 2),
                ROUND(MIN(profit), 2),
                ROUND(MAX(profit), 2),
                ROUND(AVG(quantity), 2),
                ROUND(AVG(menu_price), 2),
                COUNT(DISTINCT order_number),
                COUNT(DISTINCT customer_id),
                COUNT(DISTINCT restaurant_id)
         FROM orders GROUP BY chain ORDER BY chain",
        |row| {
            Ok(ChainSummary {
                chain: row.get(0)?,
                total_rows: row.get(1)?,
                mean_order_value: row.get(2)?,
                min_order_value: row.get(3)?,
                max_order_value: row.get(4)?,
                mean_profit: row.get(5)?,
                min_profit: row.get(6)?,
                max_profit: row.get(7)?,
                mean_quantity: row.get(8)?,
                mean_menu_price: row.get(9)?,
                unique_orders: row.get(10)?,
                unique_customers: row.get(11)?,
                unique_restaurants: row.get(12)?,
            })
        },
    )
}

/// Write the per-chain summary as CSV
pub fn write_summary_stats(summary: &[ChainSummary], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in summary {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::storage::TabularStore;
    use crate::types::{Chain, NormalizedRecord, TimeOfDay};

    fn store() -> TabularStore {
        let mut store = TabularStore::open_in_memory().unwrap();
        let mut salad = NormalizedRecord::sample(Chain::Xyz);
        salad.item_description = Some("Caesar".into());
        salad.item_category = Some("Salads".into());
        salad.quantity = Some(4);
        salad.order_total_cost = Some(30.0);
        salad.time_of_day_flag = Some(TimeOfDay::AM);
        salad.purchase_date = None;
        salad.month = None;
        salad.month_name = None;
        salad.year = None;
        salad.season = None;
        store
            .load(&[
                NormalizedRecord::sample(Chain::Abc),
                NormalizedRecord::sample(Chain::Abc),
                salad,
            ])
            .unwrap();
        store
    }

    #[test]
    fn test_chain_comparison_and_summary() {
        let store = store();
        let chains = chain_comparison(store.connection()).unwrap();
        assert_eq!(chains.len(), 2);
        assert_eq!(chains[0].chain, "ABC");
        assert_eq!(chains[0].revenue, 20.0);
        assert_eq!(chains[1].revenue, 30.0);

        let summary = chain_summary(store.connection()).unwrap();
        assert_eq!(summary[0].total_rows, 2);
        assert_eq!(summary[1].mean_quantity, Some(4.0));
    }

    #[test]
    fn test_monthly_skips_unknown_dates() {
        let store = store();
        let monthly = monthly_revenue(store.connection()).unwrap();
        assert_eq!(monthly.len(), 1);
        assert_eq!(monthly[0].month_name, "July");
        assert_eq!(monthly[0].revenue, 20.0);
    }

    #[test]
    fn test_products_ranked_by_units() {
        let store = store();
        let best = product_performance(store.connection(), 5, true).unwrap();
        assert_eq!(best[0].item_description.as_deref(), Some("Caesar"));
        assert_eq!(best[0].units_sold, 4);
        let worst = product_performance(store.connection(), 1, false).unwrap();
        assert_eq!(worst.len(), 1);
        assert_eq!(worst[0].item_description.as_deref(), Some("Margherita"));
    }

    #[test]
    fn test_collect_and_write_outputs() {
        let store = store();
        let analytics = Analytics::collect(store.connection(), &ReportConfig::default()).unwrap();
        assert_eq!(analytics.time_of_day.len(), 2);
        assert_eq!(analytics.top_states[0].state.as_deref(), Some("TX"));

        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("summary_stats.csv");
        write_summary_stats(&analytics.summary, &csv_path).unwrap();
        let text = std::fs::read_to_string(&csv_path).unwrap();
        assert!(text.starts_with("chain,total_rows,mean_order_value"));
        assert_eq!(text.lines().count(), 3);

        let json_path = dir.path().join("analytics.json");
        analytics.write_json(&json_path).unwrap();
        assert!(json_path.exists());
    }
}
