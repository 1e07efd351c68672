use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};

use restaurant_etl::config::Config;
use restaurant_etl::constants::METRICS_FILE;
use restaurant_etl::{logging, metrics, pipeline::tasks};

#[derive(Parser)]
#[command(name = "restaurant_etl")]
#[command(about = "ABC and XYZ restaurant-chain reconciliation pipeline")]
#[command(version = "0.1.0")]
struct Cli {
    /// Configuration file (defaults to etl.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize, unify and validate both raw extracts
    Clean,
    /// Load merged_clean.csv into the SQLite store
    Load,
    /// Run the aggregate queries and write summary_stats.csv and analytics.json
    Analyze,
    /// Build the shifted 2024-2025 dataset and its own store
    Rebase,
    /// Write report.md from the loaded store
    Report,
    /// clean, load, analyze and report in order
    Run,
}

fn execute(command: &Commands, config: &Config) -> anyhow::Result<()> {
    match command {
        Commands::Clean => {
            let result = tasks::run_clean(config).context("clean stage failed")?;
            println!(
                "Cleaned {} ABC + {} XYZ rows into {} merged rows",
                result.abc_rows, result.xyz_rows, result.merged_rows
            );
            println!("   Findings: {} ({} problems)", result.findings, result.problems);
            println!("   Cleaning log: {}", config.cleaning_log_path().display());
        }
        Commands::Load => {
            let summary = tasks::run_load(config).context("load stage failed")?;
            println!(
                "Loaded {} orders, {} restaurants, {} products, {} customers into {}",
                summary.orders,
                summary.restaurants,
                summary.products,
                summary.customers,
                config.database_path().display()
            );
        }
        Commands::Analyze => {
            let analytics = tasks::run_analyze(config).context("analyze stage failed")?;
            for chain in &analytics.chains {
                println!(
                    "   {}: revenue {:.2}, profit {:.2}, {} orders",
                    chain.chain, chain.revenue, chain.profit, chain.orders
                );
            }
        }
        Commands::Rebase => {
            let result = tasks::run_rebase(config).context("rebase stage failed")?;
            println!(
                "Rebased {} rows (revenue {:.2}M) into {}",
                result.rows,
                result.revenue / 1e6,
                config.rebased_database_path().display()
            );
        }
        Commands::Report => {
            let path = tasks::run_report(config).context("report stage failed")?;
            println!("Report written to {}", path.display());
        }
        Commands::Run => {
            let result = tasks::run_all(config).context("pipeline failed")?;
            println!(
                "Full pipeline completed: {} merged rows, {} problems",
                result.merged_rows, result.problems
            );
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;

    let _log_guard = logging::init_logging(&config.paths.log_dir);
    metrics::init_metrics();
    metrics::bump_run_heartbeat();

    let outcome = execute(&cli.command, &config);
    if let Err(e) = &outcome {
        error!("{:#}", e);
    }

    std::fs::create_dir_all(&config.paths.output_dir)?;
    if metrics::write_snapshot(&config.paths.output_dir.join(METRICS_FILE))? {
        info!("Metrics snapshot written");
    }
    outcome
}
