use serde::Serialize;
use std::collections::HashSet;

use crate::types::{Chain, NormalizedRecord};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestaurantRow {
    pub restaurant_id: i64,
    pub restaurant_city: Option<String>,
    pub restaurant_state: Option<String>,
    pub restaurant_zip: Option<i64>,
    pub chain: Chain,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRow {
    pub item_number: i64,
    pub item_description: Option<String>,
    pub item_code: Option<String>,
    pub item_category: Option<String>,
    pub menu_price: Option<f64>,
    pub chain: Chain,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerRow {
    pub customer_id: String,
    pub gender: Option<String>,
    pub has_children: Option<String>,
    pub chain: Chain,
}

/// The three dimension tables, one row per key
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dimensions {
    pub restaurants: Vec<RestaurantRow>,
    pub products: Vec<ProductRow>,
    pub customers: Vec<CustomerRow>,
}

impl Dimensions {
    /// Collect dimension rows from the fact rows. The first occurrence of a
    /// key wins; rows whose key is unknown are left out of that dimension.
    pub fn from_records(records: &[NormalizedRecord]) -> Self {
        let mut dimensions = Dimensions::default();
        let mut restaurant_keys = HashSet::new();
        let mut product_keys = HashSet::new();
        let mut customer_keys = HashSet::new();

        for record in records {
            if let Some(restaurant_id) = record.restaurant_id {
                if restaurant_keys.insert(restaurant_id) {
                    dimensions.restaurants.push(RestaurantRow {
                        restaurant_id,
                        restaurant_city: record.restaurant_city.clone(),
                        restaurant_state: record.restaurant_state.clone(),
                        restaurant_zip: record.restaurant_zip_code,
                        chain: record.chain,
                    });
                }
            }

            if let Some(item_number) = record.item_number {
                if product_keys.insert((item_number, record.chain)) {
                    dimensions.products.push(ProductRow {
                        item_number,
                        item_description: record.item_description.clone(),
                        item_code: record.item_code.clone(),
                        item_category: record.item_category.clone(),
                        menu_price: record.menu_price,
                        chain: record.chain,
                    });
                }
            }

            if let Some(customer_id) = record.customer_id.as_ref() {
                if customer_keys.insert(customer_id.clone()) {
                    dimensions.customers.push(CustomerRow {
                        customer_id: customer_id.clone(),
                        gender: record.gender.clone(),
                        has_children: record.has_children.map(|f| f.as_str().to_string()),
                        chain: record.chain,
                    });
                }
            }
        }
        dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::YesNo;

    fn record(chain: Chain, restaurant: Option<i64>, item: Option<i64>, customer: Option<&str>) -> NormalizedRecord {
        NormalizedRecord {
            restaurant_id: restaurant,
            item_number: item,
            customer_id: customer.map(str::to_string),
            has_children: Some(YesNo::No),
            ..NormalizedRecord::sample(chain)
        }
    }

    #[test]
    fn test_first_occurrence_wins_and_unknown_keys_are_skipped() {
        let mut later = record(Chain::Abc, Some(1), Some(7), Some("C1"));
        later.restaurant_city = Some("Dallas".into());
        let records = vec![
            record(Chain::Abc, Some(1), Some(7), Some("C1")),
            later,
            record(Chain::Abc, None, None, None),
        ];
        let dimensions = Dimensions::from_records(&records);

        assert_eq!(dimensions.restaurants.len(), 1);
        assert_eq!(dimensions.restaurants[0].restaurant_city.as_deref(), Some("Austin"));
        assert_eq!(dimensions.products.len(), 1);
        assert_eq!(dimensions.customers.len(), 1);
        assert_eq!(dimensions.customers[0].has_children.as_deref(), Some("No"));
    }

    #[test]
    fn test_products_are_keyed_by_item_and_chain() {
        let records = vec![
            record(Chain::Abc, Some(1), Some(7), Some("C1")),
            record(Chain::Xyz, Some(2), Some(7), Some("C2")),
        ];
        let dimensions = Dimensions::from_records(&records);
        assert_eq!(dimensions.products.len(), 2);
    }
}
