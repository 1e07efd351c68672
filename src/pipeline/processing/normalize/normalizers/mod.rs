// Base trait and shared profile for source-specific normalizers
pub mod base;

// Individual normalizer implementations
pub mod abc;
pub mod xyz;

// Re-export the main components
pub use base::{MetricsNormalizer, SourceNormalizer, SourceProfile};
pub use abc::AbcNormalizer;
pub use xyz::XyzNormalizer;
