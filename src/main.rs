use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

use timesheet_refinery::config::Config;
use timesheet_refinery::domain::RawTable;
use timesheet_refinery::error::Result;
use timesheet_refinery::logging;
use timesheet_refinery::observability;
use timesheet_refinery::pipeline::landing::{self, RAW_EMPLOYEE, RAW_TIMESHEET};
use timesheet_refinery::pipeline::storage::{InMemorySilverStore, NdjsonSilverStore};
use timesheet_refinery::pipeline::{SilverRunSummary, SilverTransformer};

#[derive(Parser)]
#[command(name = "timesheet-refinery")]
#[command(about = "Silver-layer cleaning and validation for employee and timesheet batches")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean, validate and stage one landed batch
    Silver {
        /// Landed employee NDJSON (default: <data_root>/raw_employee.ndjson)
        #[arg(long)]
        employees: Option<PathBuf>,
        /// Landed timesheet NDJSON (default: <data_root>/raw_timesheet.ndjson)
        #[arg(long)]
        timesheets: Option<PathBuf>,
        /// Staging output directory (default from config.toml)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Stage the batch even when validation reports errors
        #[arg(long)]
        best_effort: bool,
        /// Install the Prometheus recorder and print the scrape text after the run
        #[arg(long)]
        metrics: bool,
    },
    /// Clean and validate without staging anything; the exit code reflects the report
    Check {
        /// Landed employee NDJSON (default: <data_root>/raw_employee.ndjson)
        #[arg(long)]
        employees: Option<PathBuf>,
        /// Landed timesheet NDJSON (default: <data_root>/raw_timesheet.ndjson)
        #[arg(long)]
        timesheets: Option<PathBuf>,
        /// Install the Prometheus recorder and print the scrape text after the run
        #[arg(long)]
        metrics: bool,
    },
}

fn resolve_input(explicit: Option<PathBuf>, data_root: &str, file_name: &str) -> PathBuf {
    explicit.unwrap_or_else(|| Path::new(data_root).join(file_name))
}

/// Reads both landed tables, logging a source fingerprint for each so the
/// staged batch can be traced back to exact input bytes.
fn read_inputs(employees: &Path, timesheets: &Path) -> Result<(RawTable, RawTable)> {
    for (path, table) in [(employees, RAW_EMPLOYEE), (timesheets, RAW_TIMESHEET)] {
        let fingerprint = landing::source_fingerprint(path)?;
        info!(table, path = %path.display(), sha256 = %fingerprint, "landed input");
    }
    let raw_employees = landing::read_raw_table(employees, RAW_EMPLOYEE)?;
    let raw_timesheets = landing::read_raw_table(timesheets, RAW_TIMESHEET)?;
    Ok((raw_employees, raw_timesheets))
}

fn print_summary(summary: &SilverRunSummary) {
    println!("\n📊 Silver run results for batch {}:", summary.batch_id);
    println!("   Employees staged:   {}", summary.employee_rows);
    println!("   Timesheets staged:  {}", summary.timesheet_rows);
    println!(
        "   Orphans dropped:    {} rows ({} distinct ids)",
        summary.orphan_rows_dropped,
        summary.orphan_ids.len()
    );
    let verdict = if summary.report.passed {
        "✅ PASSED".to_string()
    } else {
        format!("❌ FAILED ({} errors)", summary.report.error_count())
    };
    println!("   Validation:         {}", verdict);
    for issue in &summary.report.issues {
        println!(
            "   [{}] {}: {}",
            issue.severity, issue.check_name, issue.message
        );
    }
}

fn print_metrics() {
    if let Some(scrape) = observability::render() {
        println!("\n📈 Metrics:\n{scrape}");
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Silver {
            employees,
            timesheets,
            output,
            best_effort,
            metrics,
        } => {
            if metrics {
                observability::init()?;
            }
            println!("🧹 Running silver transform...");

            let mut settings = config.silver.clone();
            if best_effort {
                settings.fail_fast = false;
            }
            let employees = resolve_input(employees, &settings.data_root, "raw_employee.ndjson");
            let timesheets = resolve_input(timesheets, &settings.data_root, "raw_timesheet.ndjson");
            let output_dir =
                output.unwrap_or_else(|| PathBuf::from(settings.output_dir.clone()));

            let (raw_employees, raw_timesheets) = read_inputs(&employees, &timesheets)?;
            let store = Arc::new(NdjsonSilverStore::new(&output_dir)?);
            let transformer = SilverTransformer::new(store, &settings);

            match transformer.run(raw_employees, raw_timesheets).await {
                Ok(summary) => {
                    print_summary(&summary);
                    println!("   Output directory:   {}", output_dir.display());
                    if metrics {
                        print_metrics();
                    }
                }
                Err(e) => {
                    error!("silver run failed: {}", e);
                    println!("❌ Silver run failed: {e}");
                    if metrics {
                        print_metrics();
                    }
                    return Err(e.into());
                }
            }
        }
        Commands::Check {
            employees,
            timesheets,
            metrics,
        } => {
            if metrics {
                observability::init()?;
            }
            println!("🔎 Checking batch (nothing will be staged)...");

            let mut settings = config.silver.clone();
            // best-effort so a failing batch still yields a full report
            settings.fail_fast = false;
            let employees = resolve_input(employees, &settings.data_root, "raw_employee.ndjson");
            let timesheets = resolve_input(timesheets, &settings.data_root, "raw_timesheet.ndjson");

            let (raw_employees, raw_timesheets) = read_inputs(&employees, &timesheets)?;
            let store = Arc::new(InMemorySilverStore::new());
            let transformer = SilverTransformer::new(store, &settings);

            let summary = transformer.run(raw_employees, raw_timesheets).await?;
            print_summary(&summary);
            if metrics {
                print_metrics();
            }
            if !summary.report.passed {
                std::process::exit(1);
            }
        }
    }
    Ok(())
}
