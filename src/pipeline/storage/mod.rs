pub mod dimensions;

use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

use crate::error::Result;
use crate::types::NormalizedRecord;
use dimensions::Dimensions;

const SCHEMA: &str = r#"
    DROP TABLE IF EXISTS orders;
    DROP TABLE IF EXISTS restaurants;
    DROP TABLE IF EXISTS products;
    DROP TABLE IF EXISTS customers;

    CREATE TABLE orders (
        id                     INTEGER PRIMARY KEY AUTOINCREMENT,
        chain                  TEXT NOT NULL,
        customer_id            TEXT,
        order_number           INTEGER,
        restaurant_id          INTEGER,
        restaurant_city        TEXT,
        restaurant_state       TEXT,
        restaurant_zip_code    INTEGER,
        purchase_date          TEXT,
        purchase_time          TEXT,
        time_of_day_flag       TEXT,
        month                  INTEGER,
        month_name             TEXT,
        year                   INTEGER,
        season                 TEXT,
        order_purchase_method  TEXT,
        coupon_used            TEXT,
        alcohol_purchased      TEXT,
        gender                 TEXT,
        has_children           TEXT,
        item_number            INTEGER,
        item_description       TEXT,
        item_code              TEXT,
        item_category          TEXT,
        quantity               INTEGER,
        menu_price             REAL,
        item_total_cost        REAL,
        profit                 REAL,
        order_total_cost       REAL
    );
    CREATE TABLE restaurants (
        restaurant_id     INTEGER PRIMARY KEY,
        restaurant_city   TEXT,
        restaurant_state  TEXT,
        restaurant_zip    INTEGER,
        chain             TEXT NOT NULL
    );
    CREATE TABLE products (
        item_number       INTEGER NOT NULL,
        item_description  TEXT,
        item_code         TEXT,
        item_category     TEXT,
        menu_price        REAL,
        chain             TEXT NOT NULL,
        PRIMARY KEY (item_number, chain)
    );
    CREATE TABLE customers (
        customer_id   TEXT PRIMARY KEY,
        gender        TEXT,
        has_children  TEXT,
        chain         TEXT NOT NULL
    );
"#;

/// Row counts written per table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub orders: usize,
    pub restaurants: usize,
    pub products: usize,
    pub customers: usize,
}

/// SQLite store holding the fact table and its three dimensions
pub struct TabularStore {
    conn: Connection,
}

impl TabularStore {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path.as_ref())?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Drop and recreate all four tables, then write the fact rows and the
    /// derived dimensions in one transaction.
    pub fn load(&mut self, records: &[NormalizedRecord]) -> Result<LoadSummary> {
        let dimensions = Dimensions::from_records(records);
        let tx = self.conn.transaction()?;
        tx.execute_batch(SCHEMA)?;

        {
            let mut insert_order = tx.prepare(
                "INSERT INTO orders (
                    chain, customer_id, order_number, restaurant_id, restaurant_city,
                    restaurant_state, restaurant_zip_code, purchase_date, purchase_time,
                    time_of_day_flag, month, month_name, year, season, order_purchase_method,
                    coupon_used, alcohol_purchased, gender, has_children, item_number,
                    item_description, item_code, item_category, quantity, menu_price,
                    item_total_cost, profit, order_total_cost
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                          ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28)",
            )?;
            for r in records {
                insert_order.execute(params![
                    r.chain.as_str(),
                    r.customer_id,
                    r.order_number,
                    r.restaurant_id,
                    r.restaurant_city,
                    r.restaurant_state,
                    r.restaurant_zip_code,
                    r.purchase_date.map(|d| d.format("%Y-%m-%d").to_string()),
                    r.purchase_time,
                    r.time_of_day_flag.map(|f| f.as_str()),
                    r.month,
                    r.month_name,
                    r.year,
                    r.season.map(|s| s.as_str()),
                    r.order_purchase_method,
                    r.coupon_used.map(|f| f.as_str()),
                    r.alcohol_purchased.map(|f| f.as_str()),
                    r.gender,
                    r.has_children.map(|f| f.as_str()),
                    r.item_number,
                    r.item_description,
                    r.item_code,
                    r.item_category,
                    r.quantity,
                    r.menu_price,
                    r.item_total_cost,
                    r.profit,
                    r.order_total_cost,
                ])?;
            }

            let mut insert_restaurant = tx.prepare(
                "INSERT INTO restaurants (restaurant_id, restaurant_city, restaurant_state, restaurant_zip, chain)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for row in &dimensions.restaurants {
                insert_restaurant.execute(params![
                    row.restaurant_id,
                    row.restaurant_city,
                    row.restaurant_state,
                    row.restaurant_zip,
                    row.chain.as_str(),
                ])?;
            }

            let mut insert_product = tx.prepare(
                "INSERT INTO products (item_number, item_description, item_code, item_category, menu_price, chain)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for row in &dimensions.products {
                insert_product.execute(params![
                    row.item_number,
                    row.item_description,
                    row.item_code,
                    row.item_category,
                    row.menu_price,
                    row.chain.as_str(),
                ])?;
            }

            let mut insert_customer = tx.prepare(
                "INSERT INTO customers (customer_id, gender, has_children, chain)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for row in &dimensions.customers {
                insert_customer.execute(params![
                    row.customer_id,
                    row.gender,
                    row.has_children,
                    row.chain.as_str(),
                ])?;
            }
        }
        tx.commit()?;

        let summary = LoadSummary {
            orders: records.len(),
            restaurants: dimensions.restaurants.len(),
            products: dimensions.products.len(),
            customers: dimensions.customers.len(),
        };
        info!(
            orders = summary.orders,
            restaurants = summary.restaurants,
            products = summary.products,
            customers = summary.customers,
            "Loaded tabular store"
        );
        self.log_verification()?;
        Ok(summary)
    }

    /// Orders per chain and distinct categories, straight from the store
    pub fn log_verification(&self) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare("SELECT chain, COUNT(*) FROM orders GROUP BY chain ORDER BY chain")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
        for row in rows {
            let (chain, count) = row?;
            info!(chain = %chain, orders = count, "Store verification");
        }

        let categories: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT item_category) FROM orders",
            [],
            |row| row.get(0),
        )?;
        debug!(categories, "Distinct categories in store");
        Ok(())
    }

    pub fn count_rows(&self, table: &str) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
