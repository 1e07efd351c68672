use once_cell::sync::Lazy;
use std::collections::HashMap;

use super::base::{SourceNormalizer, SourceProfile};
use crate::config::DatePolicy;
use crate::constants::ITEM_PRODUCT_COST;
use crate::error::Result;
use crate::pipeline::frame::Frame;
use crate::pipeline::processing::normalize::NormalizeOutcome;
use crate::types::Chain;

/// XYZ category labels and their canonical form
static XYZ_CATEGORIES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("Beverage", "Beverages"),
        ("Beverages", "Beverages"),
        ("Dessert", "Dessert"),
        ("Pizza", "Pizza"),
        ("Pasta", "Pasta"),
        ("Salads", "Salads"),
        ("Sandwiches", "Sandwiches"),
        ("Appetizers", "Appetizers"),
    ])
});

/// XYZ carries a per-item product cost that the extract never fills in
const XYZ_DROPPABLE_COLUMNS: &[&str] = &[ITEM_PRODUCT_COST];

/// Normalizer for the XYZ extract
pub struct XyzNormalizer {
    policy: DatePolicy,
}

impl XyzNormalizer {
    pub fn new(policy: DatePolicy) -> Self {
        Self { policy }
    }

    fn profile() -> SourceProfile {
        SourceProfile {
            chain: Chain::Xyz,
            extra_columns: &[],
            droppable_columns: XYZ_DROPPABLE_COLUMNS,
            category_map: &XYZ_CATEGORIES,
        }
    }
}

impl Default for XyzNormalizer {
    fn default() -> Self {
        Self::new(DatePolicy::default())
    }
}

impl SourceNormalizer for XyzNormalizer {
    fn normalize(&self, frame: Frame) -> Result<NormalizeOutcome> {
        Self::profile().normalize(frame, &self.policy)
    }

    fn chain(&self) -> Chain {
        Chain::Xyz
    }

    fn name(&self) -> &str {
        "XYZ Restaurants"
    }
}
