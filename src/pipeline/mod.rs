// Data processing pipeline: ingestion, processing, and storage

pub mod frame;
pub mod ingestion;
pub mod processing;
pub mod storage;
pub mod tasks;

// Re-export key types and functions from each stage
pub use frame::Frame;
pub use ingestion::{read_merged, read_source, SourceExtract};
pub use storage::{LoadSummary, TabularStore};
