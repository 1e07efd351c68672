use once_cell::sync::Lazy;
use std::collections::HashMap;

use super::base::{SourceNormalizer, SourceProfile};
use crate::config::DatePolicy;
use crate::error::Result;
use crate::pipeline::frame::Frame;
use crate::pipeline::processing::normalize::NormalizeOutcome;
use crate::types::Chain;

/// ABC category labels and their canonical form. Canonical labels map to
/// themselves so a second pass changes nothing.
static ABC_CATEGORIES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("salad", "Salads"),
        ("Salads", "Salads"),
        ("Pasta", "Pasta"),
        ("Pizza", "Pizza"),
        ("Sandwich", "Sandwiches"),
        ("Sandwiches", "Sandwiches"),
        ("Appetizers", "Appetizers"),
        ("Beverages", "Beverages"),
        ("Dessert", "Dessert"),
    ])
});

/// Normalizer for the ABC extract
pub struct AbcNormalizer {
    policy: DatePolicy,
}

impl AbcNormalizer {
    pub fn new(policy: DatePolicy) -> Self {
        Self { policy }
    }

    fn profile() -> SourceProfile {
        SourceProfile {
            chain: Chain::Abc,
            extra_columns: &[],
            droppable_columns: &[],
            category_map: &ABC_CATEGORIES,
        }
    }
}

impl Default for AbcNormalizer {
    fn default() -> Self {
        Self::new(DatePolicy::default())
    }
}

impl SourceNormalizer for AbcNormalizer {
    fn normalize(&self, frame: Frame) -> Result<NormalizeOutcome> {
        Self::profile().normalize(frame, &self.policy)
    }

    fn chain(&self) -> Chain {
        Chain::Abc
    }

    fn name(&self) -> &str {
        "ABC Restaurants"
    }
}
