use chrono::{Datelike, NaiveDate};
use tracing::info;

use crate::config::RebaseConfig;
use crate::types::{Chain, NormalizedRecord, Season};

/// Move `date` forward by `years`, landing Feb 29 on Feb 28 when the
/// target year is not a leap year
pub fn shift_date(date: NaiveDate, years: i32) -> Option<NaiveDate> {
    let year = date.year() + years;
    date.with_year(year)
        .or_else(|| NaiveDate::from_ymd_opt(year, date.month(), 28))
}

fn grow(value: Option<f64>, factor: f64) -> Option<f64> {
    value.map(|v| (v * factor).round())
}

/// Rebase one chain's normalized rows into the later period.
///
/// Row count and order are preserved. Dates move forward, money columns grow
/// by the chain's rate (rounded to whole units), delivery orders get the
/// extra uplift and customer ids are regenerated from the row index.
pub fn rebase_records(
    records: &[NormalizedRecord],
    chain: Chain,
    config: &RebaseConfig,
) -> Vec<NormalizedRecord> {
    let growth = 1.0
        + match chain {
            Chain::Abc => config.abc_growth_rate,
            Chain::Xyz => config.xyz_growth_rate,
        };
    let uplift = 1.0 + config.delivery_uplift;

    let rebased: Vec<NormalizedRecord> = records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let mut row = record.clone();

            row.purchase_date = record
                .purchase_date
                .and_then(|d| shift_date(d, config.year_shift));
            match row.purchase_date {
                Some(date) => {
                    row.month = Some(date.month());
                    row.month_name = Some(date.format("%B").to_string());
                    row.year = Some(date.year());
                    row.season = Season::from_month(date.month());
                }
                None => {
                    row.month = None;
                    row.month_name = None;
                    row.year = None;
                    row.season = None;
                }
            }

            row.menu_price = grow(record.menu_price, growth);
            row.item_total_cost = grow(record.item_total_cost, growth);
            row.profit = grow(record.profit, growth);
            row.order_total_cost = grow(record.order_total_cost, growth);
            if record.order_purchase_method.as_deref() == Some("Delivery") {
                row.order_total_cost = grow(row.order_total_cost, uplift);
            }

            row.customer_id = Some(format!(
                "{}{}{:06}",
                chain, config.customer_id_suffix, index
            ));
            row
        })
        .collect();

    let revenue: f64 = rebased.iter().filter_map(|r| r.order_total_cost).sum();
    info!(
        chain = %chain,
        rows = rebased.len(),
        revenue_millions = revenue / 1e6,
        "Rebased chain by {} years",
        config.year_shift
    );
    rebased
}
