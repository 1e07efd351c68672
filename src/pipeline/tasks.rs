//! Stage entry points shared by the CLI and the integration tests.
//!
//! Every stage takes the loaded configuration and reads its inputs from, and
//! writes its outputs to, the directories named there.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, info_span};
use uuid::Uuid;

use crate::analytics::{write_summary_stats, Analytics};
use crate::app::clean_use_case::CleanUseCase;
use crate::config::Config;
use crate::constants::{
    ABC_REBASED_FILE, ANALYTICS_FILE, FORECAST_FILE, MERGED_REBASED_FILE, REPORT_FILE,
    SHARED_COLUMNS, SUMMARY_STATS_FILE, XYZ_REBASED_FILE,
};
use crate::error::{EtlError, Result};
use crate::infra::FileCleanOutputAdapter;
use crate::metrics::LoadMetrics;
use crate::pipeline::ingestion::{read_merged, read_source};
use crate::pipeline::processing::normalize::NormalizationRegistry;
use crate::pipeline::processing::quality_gate::DefaultQualityGate;
use crate::pipeline::processing::rebase::rebase_records;
use crate::pipeline::storage::{LoadSummary, TabularStore};
use crate::report::write_report;
use crate::types::{Chain, NormalizedRecord};

#[derive(Debug, Clone, Serialize)]
pub struct CleanResult {
    pub run_id: Uuid,
    pub abc_rows: usize,
    pub xyz_rows: usize,
    pub merged_rows: usize,
    pub findings: usize,
    pub problems: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RebaseResult {
    pub rows: usize,
    pub revenue: f64,
    pub load: LoadSummary,
}

/// Read both raw extracts, normalize, unify and validate them, and write the
/// cleaned CSVs plus the cleaning log into the data directory
pub fn run_clean(config: &Config) -> Result<CleanResult> {
    let abc = read_source(&config.paths.abc_source, Chain::Abc.as_str())?;
    let xyz = read_source(&config.paths.xyz_source, Chain::Xyz.as_str())?;
    let (abc_rows, xyz_rows) = (abc.frame.len(), xyz.frame.len());

    let use_case = CleanUseCase::new(
        NormalizationRegistry::new(&config.dates),
        Box::new(DefaultQualityGate::new()),
        Box::new(FileCleanOutputAdapter::new(&config.paths.data_dir)?),
    );
    let outcome = use_case.run(abc, xyz)?;

    Ok(CleanResult {
        run_id: outcome.report.run_id,
        abc_rows,
        xyz_rows,
        merged_rows: outcome.merged.len(),
        findings: outcome.report.findings.len(),
        problems: outcome.report.problem_count(),
    })
}

fn load_into(db_path: &Path, records: &[NormalizedRecord]) -> Result<LoadSummary> {
    let timer = LoadMetrics::start_timer();
    let mut store = TabularStore::open(db_path)?;
    let summary = store.load(records)?;
    timer.finish();
    LoadMetrics::record_load(&summary);
    Ok(summary)
}

/// Load `merged_clean.csv` into the tabular store
pub fn run_load(config: &Config) -> Result<LoadSummary> {
    let _span = info_span!("load").entered();
    let records = read_merged(&config.merged_clean_path())?;
    load_into(&config.database_path(), &records)
}

fn open_existing_store(path: &Path) -> Result<TabularStore> {
    if !path.exists() {
        return Err(EtlError::MissingInput(path.to_path_buf()));
    }
    TabularStore::open(path)
}

/// Run the aggregate queries and write `summary_stats.csv` and `analytics.json`
pub fn run_analyze(config: &Config) -> Result<Analytics> {
    let _span = info_span!("analyze").entered();
    let store = open_existing_store(&config.database_path())?;
    let analytics = Analytics::collect(store.connection(), &config.report)?;

    fs::create_dir_all(&config.paths.output_dir)?;
    write_summary_stats(
        &analytics.summary,
        &config.paths.output_dir.join(SUMMARY_STATS_FILE),
    )?;
    let json_path = config.paths.output_dir.join(ANALYTICS_FILE);
    analytics.write_json(&json_path)?;
    info!("Wrote analytics to {}", json_path.display());
    Ok(analytics)
}

fn write_records(path: &Path, records: &[NormalizedRecord]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(SHARED_COLUMNS)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    info!(rows = records.len(), "Wrote {}", path.display());
    Ok(())
}

/// Build the shifted dataset from the per-source clean files and load it into
/// its own store
pub fn run_rebase(config: &Config) -> Result<RebaseResult> {
    let _span = info_span!("rebase", years = config.rebase.year_shift).entered();
    let data_dir = &config.paths.data_dir;

    let abc = rebase_records(&read_merged(&config.abc_clean_path())?, Chain::Abc, &config.rebase);
    let xyz = rebase_records(&read_merged(&config.xyz_clean_path())?, Chain::Xyz, &config.rebase);
    write_records(&data_dir.join(ABC_REBASED_FILE), &abc)?;
    write_records(&data_dir.join(XYZ_REBASED_FILE), &xyz)?;

    let mut merged = abc;
    merged.extend(xyz);
    write_records(&data_dir.join(MERGED_REBASED_FILE), &merged)?;

    let load = load_into(&config.rebased_database_path(), &merged)?;
    let revenue: f64 = merged.iter().filter_map(|r| r.order_total_cost).sum();
    Ok(RebaseResult {
        rows: merged.len(),
        revenue,
        load,
    })
}

/// Write `report.md` from the loaded store
pub fn run_report(config: &Config) -> Result<PathBuf> {
    let _span = info_span!("report").entered();
    let store = open_existing_store(&config.database_path())?;
    let analytics = Analytics::collect(store.connection(), &config.report)?;

    fs::create_dir_all(&config.paths.output_dir)?;
    let out_path = config.paths.output_dir.join(REPORT_FILE);
    write_report(
        &analytics,
        &config.paths.output_dir.join(FORECAST_FILE),
        &config.cleaning_log_path(),
        &out_path,
    )?;
    Ok(out_path)
}

/// clean, load, analyze and report in order
pub fn run_all(config: &Config) -> Result<CleanResult> {
    let clean = run_clean(config)?;
    let span = info_span!("run", run_id = %clean.run_id);
    let _enter = span.enter();
    run_load(config)?;
    run_analyze(config)?;
    run_report(config)?;
    info!(rows = clean.merged_rows, "Pipeline finished");
    Ok(clean)
}
