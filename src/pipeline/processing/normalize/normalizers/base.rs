use std::collections::HashMap;

use crate::config::DatePolicy;
use crate::error::Result;
use crate::metrics;
use crate::pipeline::frame::Frame;
use crate::pipeline::processing::normalize::{normalize_source, NormalizeOutcome};
use crate::types::Chain;

/// Base trait for source-specific normalizers
pub trait SourceNormalizer: Send + Sync {
    /// Bring a raw extract into the shared vocabulary
    fn normalize(&self, frame: Frame) -> Result<NormalizeOutcome>;

    /// The chain this normalizer handles
    fn chain(&self) -> Chain;

    /// Get a human-readable name for this normalizer
    fn name(&self) -> &str;
}

/// What differs between sources: extra required columns, optional columns
/// that are dropped when empty, and the category vocabulary
pub struct SourceProfile {
    pub chain: Chain,
    pub extra_columns: &'static [&'static str],
    pub droppable_columns: &'static [&'static str],
    pub category_map: &'static HashMap<&'static str, &'static str>,
}

impl SourceProfile {
    pub fn normalize(&self, frame: Frame, policy: &DatePolicy) -> Result<NormalizeOutcome> {
        normalize_source(frame, self, policy)
    }
}

/// A wrapper that adds metrics to any normalizer implementation
pub struct MetricsNormalizer<N: SourceNormalizer> {
    inner: N,
}

impl<N: SourceNormalizer> MetricsNormalizer<N> {
    pub fn new(inner: N) -> Self {
        Self { inner }
    }
}

impl<N: SourceNormalizer> SourceNormalizer for MetricsNormalizer<N> {
    fn normalize(&self, frame: Frame) -> Result<NormalizeOutcome> {
        let chain = self.inner.chain();
        match self.inner.normalize(frame) {
            Ok(outcome) => {
                metrics::normalize::rows_normalized(chain, outcome.frame.len());
                metrics::normalize::corrupt_dates(chain, outcome.dates.corrupt);
                metrics::normalize::unparseable_values(
                    chain,
                    outcome.dates.unparseable
                        + outcome.dates.unparseable_times
                        + outcome.identifiers.total()
                        + outcome.amounts.total()
                        + outcome.auxiliary.unrecognized_flags.total(),
                );
                metrics::normalize::unmapped_categories(
                    chain,
                    outcome.vocabulary.unmapped.values().sum(),
                );
                Ok(outcome)
            }
            Err(e) => {
                metrics::normalize::source_failed(chain);
                Err(e)
            }
        }
    }

    fn chain(&self) -> Chain {
        self.inner.chain()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
