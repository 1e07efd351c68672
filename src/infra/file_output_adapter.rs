use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::app::ports::CleanOutputPort;
use crate::constants::{ABC_CLEAN_FILE, CLEANING_LOG_FILE, MERGED_CLEAN_FILE, XYZ_CLEAN_FILE};
use crate::error::Result;
use crate::pipeline::frame::Frame;
use crate::pipeline::processing::quality_gate::QualityReport;
use crate::types::Chain;

/// File-based implementation of CleanOutputPort.
/// Writes the cleaned CSVs and the cleaning log into one directory.
pub struct FileCleanOutputAdapter {
    data_dir: PathBuf,
}

impl FileCleanOutputAdapter {
    pub fn new(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)?;
        Ok(Self {
            data_dir: data_dir.to_path_buf(),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn write_frame(&self, file_name: &str, frame: &Frame) -> Result<PathBuf> {
        let path = self.data_dir.join(file_name);
        let writer = BufWriter::new(File::create(&path)?);
        frame.write_csv(writer)?;
        info!(rows = frame.len(), "Wrote {}", path.display());
        Ok(path)
    }
}

impl CleanOutputPort for FileCleanOutputAdapter {
    fn write_normalized(&self, chain: Chain, frame: &Frame) -> Result<PathBuf> {
        let file_name = match chain {
            Chain::Abc => ABC_CLEAN_FILE,
            Chain::Xyz => XYZ_CLEAN_FILE,
        };
        self.write_frame(file_name, frame)
    }

    fn write_merged(&self, merged: &Frame) -> Result<PathBuf> {
        self.write_frame(MERGED_CLEAN_FILE, merged)
    }

    fn write_quality_report(&self, report: &QualityReport) -> Result<PathBuf> {
        let path = self.data_dir.join(CLEANING_LOG_FILE);
        fs::write(&path, report.render())?;
        info!(
            findings = report.findings.len(),
            problems = report.problem_count(),
            "Wrote quality report to {}",
            path.display()
        );
        Ok(path)
    }
}
