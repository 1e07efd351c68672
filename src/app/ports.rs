use std::path::PathBuf;

use crate::error::Result;
use crate::pipeline::frame::Frame;
use crate::pipeline::processing::quality_gate::QualityReport;
use crate::types::Chain;

/// Where the clean stage puts its outputs
pub trait CleanOutputPort {
    /// One normalized source, already projected onto the shared layout
    fn write_normalized(&self, chain: Chain, frame: &Frame) -> Result<PathBuf>;

    fn write_merged(&self, merged: &Frame) -> Result<PathBuf>;

    fn write_quality_report(&self, report: &QualityReport) -> Result<PathBuf>;
}
