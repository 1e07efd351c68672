use std::collections::HashMap;

use super::normalizers::{AbcNormalizer, MetricsNormalizer, SourceNormalizer, XyzNormalizer};
use super::NormalizeOutcome;
use crate::config::DatePolicy;
use crate::error::{EtlError, Result};
use crate::pipeline::frame::Frame;
use crate::types::Chain;

/// Registry for source-specific normalization strategies
pub struct NormalizationRegistry {
    normalizers: HashMap<Chain, Box<dyn SourceNormalizer>>,
}

impl NormalizationRegistry {
    /// Create a registry with both chain normalizers under one date policy
    pub fn new(policy: &DatePolicy) -> Self {
        let mut normalizers: HashMap<Chain, Box<dyn SourceNormalizer>> = HashMap::new();

        normalizers.insert(
            Chain::Abc,
            Box::new(MetricsNormalizer::new(AbcNormalizer::new(policy.clone()))),
        );
        normalizers.insert(
            Chain::Xyz,
            Box::new(MetricsNormalizer::new(XyzNormalizer::new(policy.clone()))),
        );

        Self { normalizers }
    }

    /// Register a normalizer, replacing any existing one for its chain
    pub fn register(&mut self, normalizer: Box<dyn SourceNormalizer>) {
        self.normalizers.insert(normalizer.chain(), normalizer);
    }

    pub fn get_normalizer(&self, chain: Chain) -> Option<&dyn SourceNormalizer> {
        self.normalizers.get(&chain).map(|n| n.as_ref())
    }

    /// Normalize a frame with the normalizer registered for `chain`
    pub fn normalize(&self, chain: Chain, frame: Frame) -> Result<NormalizeOutcome> {
        match self.get_normalizer(chain) {
            Some(normalizer) => normalizer.normalize(frame),
            None => Err(EtlError::Config(format!(
                "No normalizer registered for chain: {}",
                chain
            ))),
        }
    }

    /// List all registered chains, in a stable order
    pub fn list_sources(&self) -> Vec<Chain> {
        let mut chains: Vec<Chain> = self.normalizers.keys().copied().collect();
        chains.sort();
        chains
    }
}
