/// Column names and fixed vocabularies shared across the pipeline.
/// Every stage reads these instead of spelling column names inline.

// Provenance
pub const CHAIN: &str = "chain";

// Identifiers
pub const CUSTOMER_ID: &str = "customer_id";
pub const ORDER_NUMBER: &str = "order_number";
pub const RESTAURANT_ID: &str = "restaurant_id";
pub const ITEM_NUMBER: &str = "item_number";

// Restaurant location
pub const RESTAURANT_CITY: &str = "restaurant_city";
pub const RESTAURANT_STATE: &str = "restaurant_state";
pub const RESTAURANT_ZIP_CODE: &str = "restaurant_zip_code";

// Date and time, plus the attributes derived from them
pub const PURCHASE_DATE: &str = "purchase_date";
pub const PURCHASE_TIME: &str = "purchase_time";
pub const TIME_OF_DAY_FLAG: &str = "time_of_day_flag";
pub const MONTH: &str = "month";
pub const MONTH_NAME: &str = "month_name";
pub const YEAR: &str = "year";
pub const SEASON: &str = "season";

// Order attributes
pub const ORDER_PURCHASE_METHOD: &str = "order_purchase_method";
pub const COUPON_USED: &str = "coupon_used";
pub const ALCOHOL_PURCHASED: &str = "alcohol_purchased";
pub const GENDER: &str = "gender";
pub const HAS_CHILDREN: &str = "has_children";

// Item attributes
pub const ITEM_DESCRIPTION: &str = "item_description";
pub const ITEM_CODE: &str = "item_code";
pub const ITEM_CATEGORY: &str = "item_category";
pub const QUANTITY: &str = "quantity";

// Money
pub const MENU_PRICE: &str = "menu_price";
pub const ITEM_TOTAL_COST: &str = "item_total_cost";
pub const PROFIT: &str = "profit";
pub const ORDER_TOTAL_COST: &str = "order_total_cost";

// Source-only column carried by the XYZ extract
pub const ITEM_PRODUCT_COST: &str = "item_product_cost";

/// The shared column layout of every normalized and merged output, in order.
pub const SHARED_COLUMNS: [&str; 28] = [
    CHAIN,
    CUSTOMER_ID,
    ORDER_NUMBER,
    RESTAURANT_ID,
    RESTAURANT_CITY,
    RESTAURANT_STATE,
    RESTAURANT_ZIP_CODE,
    PURCHASE_DATE,
    PURCHASE_TIME,
    TIME_OF_DAY_FLAG,
    MONTH,
    MONTH_NAME,
    YEAR,
    SEASON,
    ORDER_PURCHASE_METHOD,
    COUPON_USED,
    ALCOHOL_PURCHASED,
    GENDER,
    HAS_CHILDREN,
    ITEM_NUMBER,
    ITEM_DESCRIPTION,
    ITEM_CODE,
    ITEM_CATEGORY,
    QUANTITY,
    MENU_PRICE,
    ITEM_TOTAL_COST,
    PROFIT,
    ORDER_TOTAL_COST,
];

/// Raw extract headers that are renamed to their canonical column.
/// (raw header, canonical column)
pub const RAW_COLUMN_RENAMES: [(&str, &str); 7] = [
    ("order_purchase_date", PURCHASE_DATE),
    ("order_purchase_time", PURCHASE_TIME),
    ("coupon_y_n", COUPON_USED),
    ("order_alcohol_purchased", ALCOHOL_PURCHASED),
    ("customer_with_children", HAS_CHILDREN),
    ("gender_customer_payee", GENDER),
    ("Profit", PROFIT),
];

/// Columns every raw extract must carry, named by their canonical column.
pub const BASE_SOURCE_COLUMNS: [&str; 22] = [
    CUSTOMER_ID,
    ORDER_NUMBER,
    RESTAURANT_ID,
    RESTAURANT_CITY,
    RESTAURANT_STATE,
    RESTAURANT_ZIP_CODE,
    PURCHASE_DATE,
    PURCHASE_TIME,
    ORDER_PURCHASE_METHOD,
    COUPON_USED,
    ALCOHOL_PURCHASED,
    GENDER,
    HAS_CHILDREN,
    ITEM_NUMBER,
    ITEM_DESCRIPTION,
    ITEM_CODE,
    ITEM_CATEGORY,
    QUANTITY,
    MENU_PRICE,
    ITEM_TOTAL_COST,
    PROFIT,
    ORDER_TOTAL_COST,
];

/// Columns repaired as integers by `repair_identifiers`.
pub const IDENTIFIER_COLUMNS: [&str; 4] =
    [ORDER_NUMBER, RESTAURANT_ID, ITEM_NUMBER, RESTAURANT_ZIP_CODE];

/// Columns repaired as decimals by `repair_amounts`.
pub const MONEY_COLUMNS: [&str; 4] = [MENU_PRICE, ITEM_TOTAL_COST, PROFIT, ORDER_TOTAL_COST];

/// Columns that must be present on every merged row.
pub const REQUIRED_COLUMNS: [&str; 3] = [CHAIN, ITEM_CATEGORY, ORDER_TOTAL_COST];

/// Columns derived from `purchase_date`; all unknown whenever the date is.
pub const DATE_DERIVED_COLUMNS: [&str; 4] = [MONTH, MONTH_NAME, YEAR, SEASON];

/// The category vocabulary both chains are normalized into.
pub const CANONICAL_CATEGORIES: [&str; 7] = [
    "Appetizers",
    "Beverages",
    "Dessert",
    "Pasta",
    "Pizza",
    "Salads",
    "Sandwiches",
];

pub fn is_canonical_category(value: &str) -> bool {
    CANONICAL_CATEGORIES.contains(&value)
}

/// Year written by the source system when a date write failed.
pub const DEFAULT_SENTINEL_YEAR: i32 = 1970;

// Output file names
pub const ABC_CLEAN_FILE: &str = "abc_clean.csv";
pub const XYZ_CLEAN_FILE: &str = "xyz_clean.csv";
pub const MERGED_CLEAN_FILE: &str = "merged_clean.csv";
pub const CLEANING_LOG_FILE: &str = "cleaning_log.txt";
pub const DATABASE_FILE: &str = "restaurant.db";
pub const SUMMARY_STATS_FILE: &str = "summary_stats.csv";
pub const ANALYTICS_FILE: &str = "analytics.json";
pub const REPORT_FILE: &str = "report.md";
pub const FORECAST_FILE: &str = "revenue_forecast.csv";
pub const METRICS_FILE: &str = "metrics.prom";
pub const REBASED_DATABASE_FILE: &str = "restaurant_2025.db";
pub const ABC_REBASED_FILE: &str = "abc_2025.csv";
pub const XYZ_REBASED_FILE: &str = "xyz_2025.csv";
pub const MERGED_REBASED_FILE: &str = "merged_2025.csv";
