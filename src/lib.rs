pub mod analytics;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod report;
pub mod types;

// Layered boundaries for application and infrastructure
pub mod app;
pub mod infra;

pub use config::Config;
pub use error::{EtlError, Result};
pub use pipeline::tasks::{run_all, run_analyze, run_clean, run_load, run_rebase, run_report};
pub use types::{Chain, NormalizedRecord};
