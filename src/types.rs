use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Originating restaurant chain of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Chain {
    #[serde(rename = "ABC")]
    Abc,
    #[serde(rename = "XYZ")]
    Xyz,
}

impl Chain {
    pub const ALL: [Chain; 2] = [Chain::Abc, Chain::Xyz];

    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Abc => "ABC",
            Chain::Xyz => "XYZ",
        }
    }

    pub fn parse(value: &str) -> Option<Chain> {
        match value {
            "ABC" => Some(Chain::Abc),
            "XYZ" => Some(Chain::Xyz),
            _ => None,
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    /// Fixed meteorological mapping; `None` for anything outside 1..=12
    pub fn from_month(month: u32) -> Option<Season> {
        match month {
            12 | 1 | 2 => Some(Season::Winter),
            3..=5 => Some(Season::Spring),
            6..=8 => Some(Season::Summer),
            9..=11 => Some(Season::Fall),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Winter => "Winter",
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Fall => "Fall",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeOfDay {
    AM,
    PM,
}

impl TimeOfDay {
    pub fn from_hour(hour: u32) -> TimeOfDay {
        if hour < 12 {
            TimeOfDay::AM
        } else {
            TimeOfDay::PM
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOfDay::AM => "AM",
            TimeOfDay::PM => "PM",
        }
    }
}

/// Readable rendering of the coded boolean flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum YesNo {
    Yes,
    No,
}

impl YesNo {
    /// Accepts the single-letter and 0/1 codes of the extracts as well as
    /// already-readable labels.
    pub fn from_code(code: &str) -> Option<YesNo> {
        match code.trim() {
            "Y" | "y" | "1" | "1.0" | "Yes" | "yes" | "true" | "True" => Some(YesNo::Yes),
            "N" | "n" | "0" | "0.0" | "No" | "no" | "false" | "False" => Some(YesNo::No),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            YesNo::Yes => "Yes",
            YesNo::No => "No",
        }
    }
}

/// One order line item in the shared column layout.
///
/// Field order is the column order of every normalized and merged file.
/// `None` is the "unknown" sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub chain: Chain,
    pub customer_id: Option<String>,
    pub order_number: Option<i64>,
    pub restaurant_id: Option<i64>,
    pub restaurant_city: Option<String>,
    pub restaurant_state: Option<String>,
    pub restaurant_zip_code: Option<i64>,
    pub purchase_date: Option<NaiveDate>,
    pub purchase_time: Option<String>,
    pub time_of_day_flag: Option<TimeOfDay>,
    pub month: Option<u32>,
    pub month_name: Option<String>,
    pub year: Option<i32>,
    pub season: Option<Season>,
    pub order_purchase_method: Option<String>,
    pub coupon_used: Option<YesNo>,
    pub alcohol_purchased: Option<YesNo>,
    pub gender: Option<String>,
    pub has_children: Option<YesNo>,
    pub item_number: Option<i64>,
    pub item_description: Option<String>,
    pub item_code: Option<String>,
    pub item_category: Option<String>,
    pub quantity: Option<i64>,
    pub menu_price: Option<f64>,
    pub item_total_cost: Option<f64>,
    pub profit: Option<f64>,
    pub order_total_cost: Option<f64>,
}

#[cfg(test)]
impl NormalizedRecord {
    /// A fully populated Pizza line item for tests
    pub(crate) fn sample(chain: Chain) -> Self {
        let purchase_date = NaiveDate::from_ymd_opt(2018, 7, 14);
        NormalizedRecord {
            chain,
            customer_id: Some(format!("{}-C1", chain)),
            order_number: Some(1),
            restaurant_id: Some(10),
            restaurant_city: Some("Austin".into()),
            restaurant_state: Some("TX".into()),
            restaurant_zip_code: Some(78701),
            purchase_date,
            purchase_time: Some("12:30".into()),
            time_of_day_flag: Some(TimeOfDay::PM),
            month: Some(7),
            month_name: Some("July".into()),
            year: Some(2018),
            season: Some(Season::Summer),
            order_purchase_method: Some("Dine-In".into()),
            coupon_used: Some(YesNo::No),
            alcohol_purchased: Some(YesNo::No),
            gender: Some("F".into()),
            has_children: Some(YesNo::Yes),
            item_number: Some(100),
            item_description: Some("Margherita".into()),
            item_code: Some("MG".into()),
            item_category: Some("Pizza".into()),
            quantity: Some(1),
            menu_price: Some(10.0),
            item_total_cost: Some(10.0),
            profit: Some(3.0),
            order_total_cost: Some(10.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_season_mapping_is_fixed() {
        assert_eq!(Season::from_month(12), Some(Season::Winter));
        assert_eq!(Season::from_month(2), Some(Season::Winter));
        assert_eq!(Season::from_month(3), Some(Season::Spring));
        assert_eq!(Season::from_month(8), Some(Season::Summer));
        assert_eq!(Season::from_month(11), Some(Season::Fall));
        assert_eq!(Season::from_month(0), None);
        assert_eq!(Season::from_month(13), None);
    }

    #[test]
    fn test_time_of_day_boundary() {
        assert_eq!(TimeOfDay::from_hour(0), TimeOfDay::AM);
        assert_eq!(TimeOfDay::from_hour(11), TimeOfDay::AM);
        assert_eq!(TimeOfDay::from_hour(12), TimeOfDay::PM);
        assert_eq!(TimeOfDay::from_hour(23), TimeOfDay::PM);
    }

    #[test]
    fn test_yes_no_codes() {
        assert_eq!(YesNo::from_code("Y"), Some(YesNo::Yes));
        assert_eq!(YesNo::from_code("0"), Some(YesNo::No));
        assert_eq!(YesNo::from_code("Yes"), Some(YesNo::Yes));
        assert_eq!(YesNo::from_code("maybe"), None);
    }
}
