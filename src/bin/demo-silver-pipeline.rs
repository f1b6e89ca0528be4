/// Demo: synthesize a deliberately messy landed batch, then run the full
/// silver stage over it: land → clean → integrity filter → validate → stage.
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::json;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use timesheet_refinery::config::SilverSettings;
use timesheet_refinery::logging;
use timesheet_refinery::pipeline::landing::{self, RAW_EMPLOYEE, RAW_TIMESHEET};
use timesheet_refinery::pipeline::silver::validation::ValidationPolicy;
use timesheet_refinery::pipeline::storage::NdjsonSilverStore;
use timesheet_refinery::pipeline::SilverTransformer;

const NULL_SPELLINGS: &[&str] = &["[NULL]", "null", "N/A", "-", "none", ""];
const JOB_TITLES: &[&str] = &["Line Cook", "Server", "'Dishwasher'", "Host", "N/A"];
const DEPARTMENTS: &[(&str, &str)] = &[("D-10", "Kitchen"), ("D-20", "Front of House"), ("D-30", "Bar")];
const PAY_CODES: &[&str] = &["REG", "OT", "\"REG\"", "HOL"];
const COMMENTS: &[&str] = &[
    "EARLY_OUT",
    "late in",
    "LATE_IN|MISSED_PUNCH",
    "vacation",
    "MEAL NOT TAKEN",
    "ROTATION",
    "forgot badge at home",
    "[NULL]",
    "SICK|LATE",
];

fn messy_or<'a>(rng: &mut impl Rng, value: &'a str) -> &'a str {
    if rng.gen_bool(0.2) {
        NULL_SPELLINGS.choose(rng).unwrap()
    } else {
        value
    }
}

fn write_demo_landing(dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    fs::create_dir_all(dir)?;
    let mut rng = rand::thread_rng();

    let mut employees = fs::File::create(dir.join("raw_employee.ndjson"))?;
    for n in 1..=12 {
        let id = format!("E{n:03}");
        let (dept_id, dept_name) = DEPARTMENTS.choose(&mut rng).unwrap();
        let termination = if rng.gen_bool(0.25) {
            "2024-03-15"
        } else {
            NULL_SPELLINGS.choose(&mut rng).unwrap()
        };
        let row = json!({
            "employee_id": messy_or(&mut rng, &id),
            "first_name": format!("  \"Worker{n}\"  "),
            "last_name": messy_or(&mut rng, "Smith"),
            "job_title": JOB_TITLES.choose(&mut rng).unwrap(),
            "department_id": messy_or(&mut rng, dept_id),
            "department_name": messy_or(&mut rng, dept_name),
            "hire_date": if rng.gen_bool(0.5) { "2023-02-01" } else { "02/01/2023" },
            "termination_date": termination,
        });
        writeln!(employees, "{row}")?;
    }

    let mut timesheets = fs::File::create(dir.join("raw_timesheet.ndjson"))?;
    for _ in 0..40 {
        let employee_id = if rng.gen_bool(0.1) {
            "E999".to_string()
        } else {
            format!("E{:03}", rng.gen_range(1..=12))
        };
        let hours = match rng.gen_range(0..10) {
            0 => "bogus".to_string(),
            1 => NULL_SPELLINGS.choose(&mut rng).unwrap().to_string(),
            2 => "26.5".to_string(),
            _ => format!("{:.2}", rng.gen_range(4.0..10.0)),
        };
        let row = json!({
            "employee_id": employee_id,
            "work_date": messy_or(&mut rng, "2024-06-03"),
            "punch_in": "2024-06-03 08:02:11",
            "punch_out": messy_or(&mut rng, "2024-06-03 16:31:40"),
            "hours_worked": hours,
            "pay_code": PAY_CODES.choose(&mut rng).unwrap(),
            "punch_in_comment": COMMENTS.choose(&mut rng).unwrap(),
            "punch_out_comment": messy_or(&mut rng, "EARLY OUT"),
        });
        writeln!(timesheets, "{row}")?;
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();
    dotenv::dotenv().ok();

    println!("\n🚀 SILVER PIPELINE DEMO: from landed mess to staged tables");
    println!("{}", "=".repeat(60));

    // ================================================================
    // STEP 1: SYNTHESIZE - Write a messy landed batch
    // ================================================================
    let landing_dir = Path::new("output/demo/landing");
    let staging_dir = Path::new("output/demo/silver");
    println!("\n🧪 STEP 1: SYNTHESIZE - Writing messy NDJSON to {}...", landing_dir.display());
    write_demo_landing(landing_dir)?;
    println!("   ✅ raw_employee.ndjson and raw_timesheet.ndjson written");
    println!("   (quoted values, null spellings, orphan ids, pipe comments)");

    // ================================================================
    // STEP 2: LAND - Read the raw tables back with fingerprints
    // ================================================================
    println!("\n📥 STEP 2: LAND - Reading raw tables...");
    let employees_path = landing_dir.join("raw_employee.ndjson");
    let timesheets_path = landing_dir.join("raw_timesheet.ndjson");

    let fingerprint = landing::source_fingerprint(&employees_path)?;
    println!("   🔑 raw_employee sha256: {}...", &fingerprint[..16]);
    let fingerprint = landing::source_fingerprint(&timesheets_path)?;
    println!("   🔑 raw_timesheet sha256: {}...", &fingerprint[..16]);

    let raw_employees = landing::read_raw_table(&employees_path, RAW_EMPLOYEE)?;
    let raw_timesheets = landing::read_raw_table(&timesheets_path, RAW_TIMESHEET)?;
    println!(
        "   ✅ Landed {} employee rows, {} timesheet rows",
        raw_employees.row_count(),
        raw_timesheets.row_count()
    );

    // ================================================================
    // STEP 3: REFINE - Clean, filter and validate the batch
    // ================================================================
    println!("\n🧹 STEP 3: REFINE - Cleaning, integrity filter, validation...");
    let store = Arc::new(NdjsonSilverStore::new(staging_dir)?);
    let transformer = SilverTransformer::new(store, &SilverSettings::default())
        .with_policy(ValidationPolicy::BestEffort);

    let summary = transformer.run(raw_employees, raw_timesheets).await?;
    println!("   ✅ Batch {} processed", summary.batch_id);
    println!("      - Employees staged: {}", summary.employee_rows);
    println!("      - Timesheets staged: {}", summary.timesheet_rows);
    println!(
        "      - Orphan rows dropped: {} ({:?})",
        summary.orphan_rows_dropped, summary.orphan_ids
    );

    // ================================================================
    // STEP 4: REPORT - Show the validation verdict
    // ================================================================
    println!("\n📋 STEP 4: REPORT - Validation findings:");
    for issue in &summary.report.issues {
        let badge = match issue.severity.to_string().as_str() {
            "ERROR" => "❌",
            "WARNING" => "⚠️",
            _ => "ℹ️",
        };
        println!(
            "   {} [{}] {}: {}",
            badge, issue.severity, issue.check_name, issue.message
        );
    }
    println!(
        "   Overall: {}",
        if summary.report.passed { "✅ PASSED" } else { "❌ FAILED" }
    );

    println!("\n📂 Staged files in {}:", staging_dir.display());
    for entry in fs::read_dir(staging_dir)? {
        let entry = entry?;
        println!("   - {}", entry.file_name().to_string_lossy());
    }

    println!("\n✨ DEMO COMPLETE!");
    println!("{}", "=".repeat(60));
    println!("Every staged row is typed, defaulted and batch-stamped;");
    println!("orphan punches are gone and the report gates the load.");

    Ok(())
}
