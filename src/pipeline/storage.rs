use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::domain::{CleanedEmployee, CleanedTable, CleanedTimesheet};
use crate::error::Result;
use crate::observability::metrics as obs;
use crate::pipeline::silver::validation::ValidationReport;

pub const STG_EMPLOYEE: &str = "stg_employee";
pub const STG_TIMESHEET: &str = "stg_timesheet";

/// Staging-layer sink for cleaned batches and their validation reports.
#[async_trait]
pub trait SilverStore: Send + Sync {
    async fn write_employees(&self, table: &CleanedTable<CleanedEmployee>) -> Result<()>;
    async fn write_timesheets(&self, table: &CleanedTable<CleanedTimesheet>) -> Result<()>;
    async fn write_report(&self, report: &ValidationReport) -> Result<()>;
}

/// One staged row as written: the cleaned fields plus run metadata.
#[derive(Serialize)]
struct StampedRow<'a, T: Serialize> {
    #[serde(flatten)]
    row: &'a T,
    etl_batch_id: &'a str,
    processed_at: DateTime<Utc>,
}

/// In-memory store for development and testing.
#[derive(Default)]
pub struct InMemorySilverStore {
    employees: Mutex<Vec<CleanedTable<CleanedEmployee>>>,
    timesheets: Mutex<Vec<CleanedTable<CleanedTimesheet>>>,
    reports: Mutex<Vec<ValidationReport>>,
}

impl InMemorySilverStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn employee_batches(&self) -> Vec<CleanedTable<CleanedEmployee>> {
        self.employees.lock().unwrap().clone()
    }

    pub fn timesheet_batches(&self) -> Vec<CleanedTable<CleanedTimesheet>> {
        self.timesheets.lock().unwrap().clone()
    }

    pub fn reports(&self) -> Vec<ValidationReport> {
        self.reports.lock().unwrap().clone()
    }
}

#[async_trait]
impl SilverStore for InMemorySilverStore {
    async fn write_employees(&self, table: &CleanedTable<CleanedEmployee>) -> Result<()> {
        debug!(batch_id = %table.batch_id, rows = table.len(), "stored employees in memory");
        obs::storage::rows_written(STG_EMPLOYEE, table.len());
        self.employees.lock().unwrap().push(table.clone());
        Ok(())
    }

    async fn write_timesheets(&self, table: &CleanedTable<CleanedTimesheet>) -> Result<()> {
        debug!(batch_id = %table.batch_id, rows = table.len(), "stored timesheets in memory");
        obs::storage::rows_written(STG_TIMESHEET, table.len());
        self.timesheets.lock().unwrap().push(table.clone());
        Ok(())
    }

    async fn write_report(&self, report: &ValidationReport) -> Result<()> {
        debug!(batch_id = %report.batch_id, "stored validation report in memory");
        self.reports.lock().unwrap().push(report.clone());
        Ok(())
    }
}

/// NDJSON store: one file per table per batch under the output directory,
/// every row stamped with `etl_batch_id` and `processed_at`.
pub struct NdjsonSilverStore {
    output_dir: PathBuf,
}

impl NdjsonSilverStore {
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir })
    }

    fn render_ndjson<T: Serialize>(&self, table: &CleanedTable<T>) -> Result<String> {
        let mut payload = String::new();
        for row in &table.rows {
            let stamped = StampedRow {
                row,
                etl_batch_id: table.batch_id.as_str(),
                processed_at: table.processed_at,
            };
            payload.push_str(&serde_json::to_string(&stamped)?);
            payload.push('\n');
        }
        Ok(payload)
    }

    async fn write_table<T: Serialize + Sync>(
        &self,
        table_name: &str,
        table: &CleanedTable<T>,
    ) -> Result<()> {
        let path = self
            .output_dir
            .join(format!("{}_{}.ndjson", table_name, table.batch_id));
        let payload = self.render_ndjson(table)?;
        if let Err(e) = tokio::fs::write(&path, payload).await {
            obs::storage::write_error(table_name);
            return Err(e.into());
        }
        obs::storage::rows_written(table_name, table.len());
        debug!(path = %path.display(), rows = table.len(), "wrote staged table");
        Ok(())
    }
}

#[async_trait]
impl SilverStore for NdjsonSilverStore {
    async fn write_employees(&self, table: &CleanedTable<CleanedEmployee>) -> Result<()> {
        self.write_table(STG_EMPLOYEE, table).await
    }

    async fn write_timesheets(&self, table: &CleanedTable<CleanedTimesheet>) -> Result<()> {
        self.write_table(STG_TIMESHEET, table).await
    }

    async fn write_report(&self, report: &ValidationReport) -> Result<()> {
        let path = self
            .output_dir
            .join(format!("validation_report_{}.json", report.batch_id));
        let payload = serde_json::to_string_pretty(report)?;
        if let Err(e) = tokio::fs::write(&path, payload).await {
            obs::storage::write_error("validation_report");
            return Err(e.into());
        }
        debug!(path = %path.display(), "wrote validation report");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BatchId;
    use crate::pipeline::silver::cleaners::SENTINEL_END_DATE;

    fn employee_table() -> CleanedTable<CleanedEmployee> {
        CleanedTable::new(
            BatchId::mint(),
            vec![CleanedEmployee {
                employee_id: "E1".to_string(),
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                job_title: "Analyst".to_string(),
                department_id: Some("D1".to_string()),
                department_name: "Research".to_string(),
                hire_date: None,
                termination_date: *SENTINEL_END_DATE,
                is_active: 1,
            }],
        )
    }

    #[tokio::test]
    async fn in_memory_store_keeps_batches() {
        let store = InMemorySilverStore::new();
        let table = employee_table();
        store.write_employees(&table).await.unwrap();

        let batches = store.employee_batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].rows[0].employee_id, "E1");
    }

    #[tokio::test]
    async fn ndjson_store_stamps_rows_with_run_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let store = NdjsonSilverStore::new(dir.path()).unwrap();
        let table = employee_table();
        store.write_employees(&table).await.unwrap();

        let path = dir
            .path()
            .join(format!("stg_employee_{}.ndjson", table.batch_id));
        let contents = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 1);

        let row: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(row["employee_id"], "E1");
        assert_eq!(row["etl_batch_id"], table.batch_id.as_str());
        assert!(row["processed_at"].is_string());
    }
}
