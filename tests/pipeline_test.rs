use anyhow::Result;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

use restaurant_etl::config::Config;
use restaurant_etl::constants::{ITEM_PRODUCT_COST, SHARED_COLUMNS};
use restaurant_etl::error::EtlError;
use restaurant_etl::pipeline::ingestion::read_merged;
use restaurant_etl::pipeline::tasks::{run_all, run_clean, run_load, run_rebase};
use restaurant_etl::types::Chain;

const ABC_HEADER: &str = "customer_id,order_number,restaurant_id,restaurant_city,restaurant_state,restaurant_zip_code,order_purchase_date,order_purchase_time,order_purchase_method,coupon_y_n,order_alcohol_purchased,gender_customer_payee,customer_with_children,item_number,item_description,item_code,item_category,quantity,menu_price,item_total_cost,Profit,order_total_cost";

const XYZ_HEADER: &str = "customer_id,order_number,restaurant_id,restaurant_city,restaurant_state,restaurant_zip_code,order_purchase_date,order_purchase_time,order_purchase_method,coupon_y_n,order_alcohol_purchased,gender_customer_payee,customer_with_children,item_number,item_description,item_code,item_category,quantity,menu_price,item_total_cost,Profit,order_total_cost,item_product_cost";

const ABC_ROWS: [&str; 10] = [
    "C1,1,10,Austin,TX,78701,2018-01-05,12:30:00,Dine-In,Y,0,F,1,100,Caesar,CS1,salad,1,8.5,8.5,2.0,8.5",
    "C2,2,10,Austin,TX,78701,2018-02-11,09:15:00,Takeout,N,0,M,0,101,Club,CL1,Sandwich,2,7.0,14.0,4.0,14.0",
    "C3,3,11,Dallas,TX,75201,2018-03-20,19:45:00,Delivery,N,1,F,1,102,Pepperoni,PP1,Pizza,1,12.0,12.0,5.0,12.0",
    "C1,4,11,Dallas,TX,75201,2018-04-02,13:00:00,Dine-In,Y,1,F,1,100,Caesar,CS1,salad,3,8.5,25.5,6.0,25.5",
    "C4,5,10,Austin,TX,78701,2018-05-17,20:10:00,Delivery,N,0,M,0,103,Wings,WG1,Appetizers,2,9.0,18.0,7.0,18.0",
    "C5,6,12,Houston,TX,77002,2018-06-30,11:05:00,Takeout,N,0,F,0,102,Pepperoni,PP1,Pizza,2,12.0,24.0,9.0,24.0",
    "C6,7,12,Houston,TX,77002,1970-01-01,18:30:00,Dine-In,Y,1,M,1,104,Lasagna,LS1,Pasta,1,14.0,14.0,5.5,14.0",
    "C7,8,10,Austin,TX,78701,2018-08-08,15:00:00,Dine-In,N,0,F,0,101,Club,CL1,Sandwich,1,7.0,7.0,2.0,7.0",
    "C8,9,11,Dallas,TX,75201,2018-09-09,21:30:00,Delivery,Y,1,M,1,105,Brownie,BR1,Dessert,2,4.0,8.0,3.0,8.0",
    "C9,10,12,Houston,TX,77002,2018-12-24,10:00:00,Takeout,N,0,F,1,103,Wings,WG1,Appetizers,1,9.0,9.0,3.5,9.0",
];

const XYZ_ROWS: [&str; 4] = [
    "X1,5,20,Denver,CO,80202,2019-07-04,18:00:00,Takeout,N,1,M,0,300,Cola,CO1,Beverage,2,2.5,5.0,3.0,5.0,",
    "X2,6,20,Denver,CO,80202,2019-07-05,11:00:00,Delivery,N,0,F,0,301,Tiramisu,TI1,Dessert,1,6.0,6.0,2.5,6.0,",
    "X3,7,21,Boulder,CO,80302,2020-02-29,13:20:00,Dine-In,Y,0,F,1,302,Penne,PN1,Pasta,1,11.0,11.0,4.0,11.0,",
    "X1,8,21,Boulder,CO,80302,2019-11-15,19:00:00,Dine-In,N,1,M,0,300,Cola,CO1,Beverage,1,2.5,2.5,1.5,2.5,",
];

fn write_source(path: &Path, header: &str, rows: &[&str]) -> Result<()> {
    let mut text = String::from(header);
    text.push('\n');
    for row in rows {
        text.push_str(row);
        text.push('\n');
    }
    fs::write(path, text)?;
    Ok(())
}

/// Config pointing every directory into `root`, with both raw extracts written
fn scratch_config(root: &Path) -> Result<Config> {
    let raw = root.join("raw");
    fs::create_dir_all(&raw)?;
    write_source(&raw.join("ABC.csv"), ABC_HEADER, &ABC_ROWS)?;
    write_source(&raw.join("XYZ.csv"), XYZ_HEADER, &XYZ_ROWS)?;

    let mut config = Config::default();
    config.paths.abc_source = raw.join("ABC.csv");
    config.paths.xyz_source = raw.join("XYZ.csv");
    config.paths.data_dir = root.join("data");
    config.paths.output_dir = root.join("outputs");
    config.paths.log_dir = root.join("logs");
    Ok(config)
}

#[test]
fn test_clean_conserves_rows_and_writes_shared_layout() -> Result<()> {
    let dir = tempdir()?;
    let config = scratch_config(dir.path())?;

    let result = run_clean(&config)?;
    assert_eq!(result.merged_rows, ABC_ROWS.len() + XYZ_ROWS.len());

    let merged = read_merged(&config.merged_clean_path())?;
    assert_eq!(merged.len(), 14);
    assert!(merged[..10].iter().all(|r| r.chain == Chain::Abc));
    assert!(merged[10..].iter().all(|r| r.chain == Chain::Xyz));

    let header = fs::read_to_string(config.abc_clean_path())?;
    let first_line = header.lines().next().unwrap_or_default();
    assert_eq!(first_line, SHARED_COLUMNS.join(","));
    assert!(!first_line.contains(ITEM_PRODUCT_COST));
    Ok(())
}

#[test]
fn test_cleaning_log_reports_the_known_defects() -> Result<()> {
    let dir = tempdir()?;
    let config = scratch_config(dir.path())?;
    run_clean(&config)?;

    let log = fs::read_to_string(config.cleaning_log_path())?;
    assert!(log.contains("[ABC] repair_dates: 1 corrupt date (10.0%) reset to unknown"));
    assert!(log.contains("[XYZ] drop_unusable_columns: dropped item_product_cost (100% missing across 4 rows)"));
    assert!(log.contains("[merged] row_conservation: 14 rows = ABC 10 + XYZ 4"));
    assert!(log.contains(
        "[merged] categories: 7 distinct item_category values: [Appetizers, Beverages, Dessert, Pasta, Pizza, Salads, Sandwiches]"
    ));
    assert!(!log.contains("non-canonical category"));
    Ok(())
}

/// ABC rows with every order_number, purchase date and purchase time unusable
fn fully_defective_abc_rows() -> Vec<String> {
    ABC_ROWS
        .iter()
        .map(|row| {
            let mut cells: Vec<&str> = row.split(',').collect();
            cells[1] = "abc";
            cells[6] = "not-a-date";
            cells[7] = "garbage";
            cells.join(",")
        })
        .collect()
}

#[test]
fn test_fully_defective_columns_are_reset_and_still_load() -> Result<()> {
    let dir = tempdir()?;
    let config = scratch_config(dir.path())?;
    let rows = fully_defective_abc_rows();
    let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
    write_source(&config.paths.abc_source, ABC_HEADER, &rows)?;

    let result = run_clean(&config)?;
    assert_eq!(result.merged_rows, 14);

    let log = fs::read_to_string(config.cleaning_log_path())?;
    assert!(log.contains("[ABC] repair_dates: 10 unparseable dates (100.0%) reset to unknown"));
    assert!(log.contains("[ABC] repair_dates: 10 unparseable times (100.0%) reset to unknown"));
    assert!(log.contains(
        "[ABC] repair_identifiers: 10 non-numeric order_number values (100.0%) reset to unknown"
    ));
    assert!(log.contains("[merged] row_conservation: 14 rows = ABC 10 + XYZ 4"));

    let merged = read_merged(&config.merged_clean_path())?;
    assert!(merged[..10]
        .iter()
        .all(|r| r.order_number.is_none() && r.purchase_date.is_none() && r.purchase_time.is_none()));

    let summary = run_load(&config)?;
    assert_eq!(summary.orders, 14);
    Ok(())
}

#[test]
fn test_ragged_and_undecodable_input_is_read_and_reported() -> Result<()> {
    let dir = tempdir()?;
    let config = scratch_config(dir.path())?;
    let mut bytes = format!("{}\n{}\n", XYZ_HEADER, XYZ_ROWS[0]).into_bytes();
    bytes.extend_from_slice(b"X2,6,20,Denver,CO,80202,2019-07-05,11:00:00,Delivery,N,0,F,0,301,Tiramis");
    bytes.push(0xf9);
    bytes.extend_from_slice(b",TI1,Dessert,1,6.0,6.0,2.5,6.0,\nX3,7,21,Boulder\n");
    fs::write(&config.paths.xyz_source, bytes)?;

    let result = run_clean(&config)?;
    assert_eq!(result.xyz_rows, 3);
    assert_eq!(result.merged_rows, 13);

    let log = fs::read_to_string(config.cleaning_log_path())?;
    assert!(log.contains(
        "[XYZ] read: 1 undecodable cell decoded with replacement characters; 1 short row padded with unknown values"
    ));
    assert!(log.contains("[merged] row_conservation: 13 rows = ABC 10 + XYZ 3"));

    let merged = read_merged(&config.merged_clean_path())?;
    assert_eq!(merged[11].item_description.as_deref(), Some("Tiramis\u{FFFD}"));
    assert!(merged[12].item_category.is_none());
    Ok(())
}

#[test]
fn test_categories_land_in_the_shared_vocabulary() -> Result<()> {
    let dir = tempdir()?;
    let config = scratch_config(dir.path())?;
    run_clean(&config)?;

    let merged = read_merged(&config.merged_clean_path())?;
    let categories: Vec<&str> = merged
        .iter()
        .filter_map(|r| r.item_category.as_deref())
        .collect();
    assert!(categories.contains(&"Beverages"));
    assert!(categories.contains(&"Salads"));
    assert!(categories.contains(&"Sandwiches"));
    assert!(!categories.contains(&"Beverage"));
    assert!(!categories.contains(&"salad"));
    Ok(())
}

#[test]
fn test_unknown_dates_leave_derived_fields_unknown() -> Result<()> {
    let dir = tempdir()?;
    let config = scratch_config(dir.path())?;
    run_clean(&config)?;

    let merged = read_merged(&config.merged_clean_path())?;
    let undated: Vec<_> = merged.iter().filter(|r| r.purchase_date.is_none()).collect();
    assert_eq!(undated.len(), 1);
    for record in merged.iter() {
        let known = record.purchase_date.is_some();
        assert_eq!(record.month.is_some(), known);
        assert_eq!(record.month_name.is_some(), known);
        assert_eq!(record.year.is_some(), known);
        assert_eq!(record.season.is_some(), known);
    }
    Ok(())
}

#[test]
fn test_cleaning_the_clean_output_changes_nothing() -> Result<()> {
    let dir = tempdir()?;
    let config = scratch_config(dir.path())?;
    run_clean(&config)?;

    let mut second = config.clone();
    second.paths.abc_source = config.abc_clean_path();
    second.paths.xyz_source = config.xyz_clean_path();
    second.paths.data_dir = dir.path().join("second");
    run_clean(&second)?;

    let first_pass = read_merged(&config.merged_clean_path())?;
    let second_pass = read_merged(&second.merged_clean_path())?;
    assert_eq!(first_pass, second_pass);
    Ok(())
}

#[test]
fn test_load_builds_unique_dimensions() -> Result<()> {
    let dir = tempdir()?;
    let config = scratch_config(dir.path())?;
    run_clean(&config)?;

    let summary = run_load(&config)?;
    assert_eq!(summary.orders, 14);
    assert_eq!(summary.restaurants, 5);
    // C1 and X1 repeat; every other customer appears once
    assert_eq!(summary.customers, 12);
    // products are keyed by item number and chain
    assert_eq!(summary.products, 9);

    let conn = rusqlite::Connection::open(config.database_path())?;
    let duplicates: i64 = conn.query_row(
        "SELECT COUNT(*) FROM (SELECT restaurant_id FROM restaurants GROUP BY restaurant_id HAVING COUNT(*) > 1)",
        [],
        |row| row.get(0),
    )?;
    assert_eq!(duplicates, 0);
    let null_dates: i64 = conn.query_row(
        "SELECT COUNT(*) FROM orders WHERE purchase_date IS NULL AND month IS NULL",
        [],
        |row| row.get(0),
    )?;
    assert_eq!(null_dates, 1);
    Ok(())
}

#[test]
fn test_load_rejects_a_reordered_header() -> Result<()> {
    let dir = tempdir()?;
    let config = scratch_config(dir.path())?;
    fs::create_dir_all(&config.paths.data_dir)?;
    fs::write(config.merged_clean_path(), "customer_id,chain\nC1,ABC\n")?;

    match run_load(&config) {
        Err(EtlError::HeaderMismatch { found, .. }) => assert_eq!(found, "customer_id,chain"),
        other => panic!("expected a header mismatch, got {:?}", other.map(|s| s.orders)),
    }
    Ok(())
}

#[test]
fn test_run_writes_analytics_and_report() -> Result<()> {
    let dir = tempdir()?;
    let config = scratch_config(dir.path())?;
    fs::create_dir_all(&config.paths.output_dir)?;
    fs::write(
        config.paths.output_dir.join("revenue_forecast.csv"),
        "month,forecast_millions\n2025-07,1.25\n",
    )?;

    run_all(&config)?;

    let output = &config.paths.output_dir;
    assert!(output.join("analytics.json").exists());
    let summary = fs::read_to_string(output.join("summary_stats.csv"))?;
    assert_eq!(summary.lines().count(), 3);

    let report = fs::read_to_string(output.join("report.md"))?;
    assert!(report.contains("## Chain comparison"));
    assert!(report.contains("## Revenue forecast"));
    assert!(report.contains("## Appendix: data quality"));
    assert!(report.contains("1 corrupt date (10.0%)"));
    Ok(())
}

#[test]
fn test_rebase_shifts_dates_and_rewrites_customers() -> Result<()> {
    let dir = tempdir()?;
    let config = scratch_config(dir.path())?;
    run_clean(&config)?;

    let result = run_rebase(&config)?;
    assert_eq!(result.rows, 14);
    assert_eq!(result.load.orders, 14);

    let rebased = read_merged(&config.paths.data_dir.join("xyz_2025.csv"))?;
    assert_eq!(rebased.len(), 4);
    assert_eq!(rebased[0].customer_id.as_deref(), Some("XYZ2024000000"));
    assert_eq!(rebased[0].year, Some(2025));
    // 2020-02-29 moves to a non-leap year
    assert_eq!(
        rebased[2].purchase_date.map(|d| d.to_string()).as_deref(),
        Some("2026-02-28")
    );
    assert!(config.rebased_database_path().exists());
    Ok(())
}
