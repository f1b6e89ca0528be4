use anyhow::Result;
use serde_json::{json, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::tempdir;

use timesheet_refinery::config::SilverSettings;
use timesheet_refinery::error::RefineryError;
use timesheet_refinery::pipeline::landing::{read_raw_table, RAW_EMPLOYEE, RAW_TIMESHEET};
use timesheet_refinery::pipeline::storage::NdjsonSilverStore;
use timesheet_refinery::pipeline::SilverTransformer;

fn write_ndjson(dir: &Path, name: &str, rows: &[Value]) -> Result<PathBuf> {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path)?;
    for row in rows {
        writeln!(file, "{row}")?;
    }
    Ok(path)
}

fn employee_row(id: &str, termination: &str) -> Value {
    json!({
        "employee_id": id,
        "first_name": "Ada",
        "last_name": "Lovelace",
        "job_title": "Analyst",
        "department_id": "D-10",
        "department_name": "Research",
        "hire_date": "2023-02-01",
        "termination_date": termination,
    })
}

fn timesheet_row(id: &str, hours: &str, comment: &str) -> Value {
    json!({
        "employee_id": id,
        "work_date": "2024-06-03",
        "punch_in": "2024-06-03 08:02:11",
        "punch_out": "2024-06-03 16:31:40",
        "hours_worked": hours,
        "pay_code": "REG",
        "punch_in_comment": comment,
        "punch_out_comment": "[NULL]",
    })
}

fn read_staged(dir: &Path, file: String) -> Result<Vec<Value>> {
    let contents = std::fs::read_to_string(dir.join(file))?;
    Ok(contents
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect())
}

#[tokio::test]
async fn messy_batch_stages_typed_and_stamped_rows() -> Result<()> {
    let landing = tempdir()?;
    let staging = tempdir()?;

    let employees_path = write_ndjson(
        landing.path(),
        "raw_employee.ndjson",
        &[
            employee_row("E1", "[NULL]"),
            employee_row("", "2024-01-01"),
        ],
    )?;
    let timesheets_path = write_ndjson(
        landing.path(),
        "raw_timesheet.ndjson",
        &[
            timesheet_row("E1", "8.25", "LATE_IN|MISSED_PUNCH"),
            timesheet_row("E1", "bogus", "something odd"),
            timesheet_row("UNKNOWN", "7", "vacation"),
        ],
    )?;

    let raw_employees = read_raw_table(&employees_path, RAW_EMPLOYEE)?;
    let raw_timesheets = read_raw_table(&timesheets_path, RAW_TIMESHEET)?;

    let store = Arc::new(NdjsonSilverStore::new(staging.path())?);
    let transformer = SilverTransformer::new(store, &SilverSettings::default());
    let summary = transformer.run(raw_employees, raw_timesheets).await?;

    assert!(summary.report.passed);
    assert_eq!(summary.employee_rows, 2);
    // the "UNKNOWN" timesheet id matches the defaulted employee key
    assert_eq!(summary.timesheet_rows, 3);
    assert_eq!(summary.orphan_rows_dropped, 0);

    let staged_employees = read_staged(
        staging.path(),
        format!("stg_employee_{}.ndjson", summary.batch_id),
    )?;
    assert_eq!(staged_employees.len(), 2);

    // placeholder termination becomes the sentinel and derives is_active
    assert_eq!(staged_employees[0]["employee_id"], "E1");
    assert_eq!(staged_employees[0]["termination_date"], "2222-12-31");
    assert_eq!(staged_employees[0]["is_active"], 1);

    // empty key takes the UNKNOWN default; real termination date deactivates
    assert_eq!(staged_employees[1]["employee_id"], "UNKNOWN");
    assert_eq!(staged_employees[1]["termination_date"], "2024-01-01");
    assert_eq!(staged_employees[1]["is_active"], 0);

    // every staged row carries run metadata
    for row in &staged_employees {
        assert_eq!(row["etl_batch_id"], summary.batch_id.as_str());
        assert!(row["processed_at"].is_string());
    }

    let staged_timesheets = read_staged(
        staging.path(),
        format!("stg_timesheet_{}.ndjson", summary.batch_id),
    )?;
    assert_eq!(staged_timesheets[0]["hours_worked"], 8.25);
    assert_eq!(staged_timesheets[0]["punch_in_comment"], "LATE IN, MISSED PUNCH");
    assert_eq!(staged_timesheets[0]["punch_out_comment"], "NA");
    assert_eq!(staged_timesheets[0]["punch_in"], "2024-06-03T08:02:11");
    // malformed hours collapse to the 0.0 default, not an error
    assert_eq!(staged_timesheets[1]["hours_worked"], 0.0);
    assert_eq!(staged_timesheets[1]["punch_in_comment"], "OTHER");
    assert_eq!(staged_timesheets[2]["punch_in_comment"], "PTO");

    let report: Value = serde_json::from_str(&std::fs::read_to_string(
        staging
            .path()
            .join(format!("validation_report_{}.json", summary.batch_id)),
    )?)?;
    assert_eq!(report["passed"], true);
    assert_eq!(report["batch_id"], summary.batch_id.as_str());
    Ok(())
}

#[tokio::test]
async fn all_absent_termination_column_marks_everyone_active() -> Result<()> {
    let landing = tempdir()?;
    let staging = tempdir()?;

    let employees_path = write_ndjson(
        landing.path(),
        "raw_employee.ndjson",
        &[
            employee_row("E1", "[NULL]"),
            employee_row("E2", "null"),
            employee_row("E3", " \"N/A\" "),
        ],
    )?;
    let timesheets_path = write_ndjson(
        landing.path(),
        "raw_timesheet.ndjson",
        &[timesheet_row("E1", "8", "NA")],
    )?;

    let store = Arc::new(NdjsonSilverStore::new(staging.path())?);
    let transformer = SilverTransformer::new(store, &SilverSettings::default());
    let summary = transformer
        .run(
            read_raw_table(&employees_path, RAW_EMPLOYEE)?,
            read_raw_table(&timesheets_path, RAW_TIMESHEET)?,
        )
        .await?;

    let staged = read_staged(
        staging.path(),
        format!("stg_employee_{}.ndjson", summary.batch_id),
    )?;
    assert_eq!(staged.len(), 3);
    for row in &staged {
        assert_eq!(row["termination_date"], "2222-12-31");
        assert_eq!(row["is_active"], 1);
    }
    Ok(())
}

#[tokio::test]
async fn orphan_timesheets_are_dropped_with_counts() -> Result<()> {
    let landing = tempdir()?;
    let staging = tempdir()?;

    let employees_path = write_ndjson(
        landing.path(),
        "raw_employee.ndjson",
        &[employee_row("E1", "[NULL]"), employee_row("E2", "[NULL]")],
    )?;
    let timesheets_path = write_ndjson(
        landing.path(),
        "raw_timesheet.ndjson",
        &[
            timesheet_row("E1", "8", "NA"),
            timesheet_row("E9", "8", "NA"),
            timesheet_row("E2", "8", "NA"),
            timesheet_row("E9", "6", "NA"),
        ],
    )?;

    let store = Arc::new(NdjsonSilverStore::new(staging.path())?);
    let transformer = SilverTransformer::new(store, &SilverSettings::default());
    let summary = transformer
        .run(
            read_raw_table(&employees_path, RAW_EMPLOYEE)?,
            read_raw_table(&timesheets_path, RAW_TIMESHEET)?,
        )
        .await?;

    assert_eq!(summary.timesheet_rows, 2);
    assert_eq!(summary.orphan_rows_dropped, 2);
    assert_eq!(summary.orphan_ids, vec!["E9".to_string()]);

    let staged = read_staged(
        staging.path(),
        format!("stg_timesheet_{}.ndjson", summary.batch_id),
    )?;
    assert!(staged.iter().all(|row| row["employee_id"] != "E9"));

    // dropped orphans never reach the post-filter reference check
    assert!(summary
        .report
        .issues
        .iter()
        .all(|i| i.check_name != "orphan_timesheet_refs"));
    Ok(())
}

#[tokio::test]
async fn fail_fast_aborts_without_staging_anything() -> Result<()> {
    let landing = tempdir()?;
    let staging = tempdir()?;

    let employees_path = write_ndjson(
        landing.path(),
        "raw_employee.ndjson",
        &[employee_row("E1", "[NULL]")],
    )?;
    // every work_date is a null spelling, which is an error-severity check
    let timesheets_path = write_ndjson(
        landing.path(),
        "raw_timesheet.ndjson",
        &[json!({
            "employee_id": "E1",
            "work_date": "[NULL]",
            "hours_worked": "8",
            "pay_code": "REG",
        })],
    )?;

    let store = Arc::new(NdjsonSilverStore::new(staging.path())?);
    let transformer = SilverTransformer::new(store, &SilverSettings::default());
    let err = transformer
        .run(
            read_raw_table(&employees_path, RAW_EMPLOYEE)?,
            read_raw_table(&timesheets_path, RAW_TIMESHEET)?,
        )
        .await
        .unwrap_err();

    match err {
        RefineryError::ValidationFailed { errors, .. } => assert!(errors >= 1),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(std::fs::read_dir(staging.path())?.count(), 0);
    Ok(())
}

#[tokio::test]
async fn best_effort_stages_batch_and_failed_report() -> Result<()> {
    let landing = tempdir()?;
    let staging = tempdir()?;

    let employees_path = write_ndjson(
        landing.path(),
        "raw_employee.ndjson",
        &[employee_row("E1", "[NULL]")],
    )?;
    let timesheets_path = write_ndjson(
        landing.path(),
        "raw_timesheet.ndjson",
        &[json!({
            "employee_id": "E1",
            "work_date": "not a date",
            "hours_worked": "8",
            "pay_code": "REG",
        })],
    )?;

    let settings = SilverSettings {
        fail_fast: false,
        ..SilverSettings::default()
    };
    let store = Arc::new(NdjsonSilverStore::new(staging.path())?);
    let transformer = SilverTransformer::new(store, &settings);
    let summary = transformer
        .run(
            read_raw_table(&employees_path, RAW_EMPLOYEE)?,
            read_raw_table(&timesheets_path, RAW_TIMESHEET)?,
        )
        .await?;

    assert!(!summary.report.passed);
    assert!(summary
        .report
        .issues
        .iter()
        .any(|i| i.check_name == "timesheet_missing_work_date"));

    // the batch still stages, clearly marked non-passing
    let report: Value = serde_json::from_str(&std::fs::read_to_string(
        staging
            .path()
            .join(format!("validation_report_{}.json", summary.batch_id)),
    )?)?;
    assert_eq!(report["passed"], false);
    assert!(staging
        .path()
        .join(format!("stg_timesheet_{}.ndjson", summary.batch_id))
        .exists());
    Ok(())
}

#[tokio::test]
async fn landing_rejects_missing_required_columns() -> Result<()> {
    let landing = tempdir()?;
    let staging = tempdir()?;

    // no employee_id column anywhere in the file
    let employees_path = write_ndjson(
        landing.path(),
        "raw_employee.ndjson",
        &[json!({"first_name": "Ada", "last_name": "L", "job_title": "Analyst"})],
    )?;
    let timesheets_path = write_ndjson(
        landing.path(),
        "raw_timesheet.ndjson",
        &[timesheet_row("E1", "8", "NA")],
    )?;

    let store = Arc::new(NdjsonSilverStore::new(staging.path())?);
    let transformer = SilverTransformer::new(store, &SilverSettings::default());
    let err = transformer
        .run(
            read_raw_table(&employees_path, RAW_EMPLOYEE)?,
            read_raw_table(&timesheets_path, RAW_TIMESHEET)?,
        )
        .await
        .unwrap_err();

    match err {
        RefineryError::MissingColumn { table, column } => {
            assert_eq!(table, "raw_employee");
            assert_eq!(column, "employee_id");
        }
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}
