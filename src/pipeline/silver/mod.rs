// Silver stage: typed cleaning, comment categorization, referential
// integrity and validation for one landed batch.

pub mod cleaners;
pub mod comments;
pub mod integrity;
pub mod placeholders;
pub mod validation;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument, warn};

use crate::config::SilverSettings;
use crate::domain::{columns, BatchId, CleanedEmployee, CleanedTable, CleanedTimesheet, RawTable};
use crate::error::{RefineryError, Result};
use crate::observability::metrics as obs;
use crate::pipeline::storage::SilverStore;

use cleaners::{
    clean_date_column, clean_date_column_with_sentinel, clean_datetime_column,
    clean_numeric_column, clean_string_column, clean_string_column_filled, SENTINEL_END_DATE,
};
use comments::{clean_comment_column, CommentCategorizer};
use integrity::filter_orphan_timesheets;
use placeholders::PlaceholderSet;
use validation::{ValidationEngine, ValidationInput, ValidationPolicy, ValidationReport};

/// Cleans one raw employee batch into typed rows. The four name/title
/// columns are required; the rest may be omitted by the source and then
/// follow the usual defaulting rules.
pub fn clean_employee_table(
    raw: &RawTable,
    placeholders: &PlaceholderSet,
) -> Result<Vec<CleanedEmployee>> {
    use columns::employee as col;

    let employee_id =
        clean_string_column_filled(raw.column(col::EMPLOYEE_ID)?, placeholders, "UNKNOWN");
    let first_name = clean_string_column_filled(raw.column(col::FIRST_NAME)?, placeholders, "");
    let last_name = clean_string_column_filled(raw.column(col::LAST_NAME)?, placeholders, "");
    let job_title = clean_string_column_filled(raw.column(col::JOB_TITLE)?, placeholders, "Unknown");
    let department_id =
        clean_string_column(&raw.column_or_absent(col::DEPARTMENT_ID), placeholders, None);
    let department_name = clean_string_column_filled(
        &raw.column_or_absent(col::DEPARTMENT_NAME),
        placeholders,
        "Unknown",
    );
    let hire_date = clean_date_column(&raw.column_or_absent(col::HIRE_DATE), placeholders);
    let termination_date =
        clean_date_column_with_sentinel(&raw.column_or_absent(col::TERMINATION_DATE), placeholders);

    let mut rows = Vec::with_capacity(raw.row_count());
    for i in 0..raw.row_count() {
        let termination = termination_date[i];
        rows.push(CleanedEmployee {
            employee_id: employee_id[i].clone(),
            first_name: first_name[i].clone(),
            last_name: last_name[i].clone(),
            job_title: job_title[i].clone(),
            department_id: department_id[i].clone(),
            department_name: department_name[i].clone(),
            hire_date: hire_date[i],
            termination_date: termination,
            is_active: i32::from(termination == *SENTINEL_END_DATE),
        });
    }

    info!(table = %raw.name, rows = rows.len(), "employee batch cleaned");
    Ok(rows)
}

/// Cleans one raw timesheet batch into typed rows. Referential filtering is
/// a separate step: the rows coming out of here may still be orphans.
pub fn clean_timesheet_table(
    raw: &RawTable,
    placeholders: &PlaceholderSet,
    categorizer: &CommentCategorizer,
) -> Result<Vec<CleanedTimesheet>> {
    use columns::timesheet as col;

    let employee_id =
        clean_string_column_filled(raw.column(col::EMPLOYEE_ID)?, placeholders, "UNKNOWN");
    let pay_code = clean_string_column(raw.column(col::PAY_CODE)?, placeholders, None);
    let work_date = clean_date_column(&raw.column_or_absent(col::WORK_DATE), placeholders);
    let punch_in = clean_datetime_column(&raw.column_or_absent(col::PUNCH_IN), placeholders);
    let punch_out = clean_datetime_column(&raw.column_or_absent(col::PUNCH_OUT), placeholders);
    let hours_worked =
        clean_numeric_column(&raw.column_or_absent(col::HOURS_WORKED), placeholders, 0.0);
    let punch_in_comment =
        clean_comment_column(&raw.column_or_absent(col::PUNCH_IN_COMMENT), categorizer);
    let punch_out_comment =
        clean_comment_column(&raw.column_or_absent(col::PUNCH_OUT_COMMENT), categorizer);

    let mut rows = Vec::with_capacity(raw.row_count());
    for i in 0..raw.row_count() {
        rows.push(CleanedTimesheet {
            employee_id: employee_id[i].clone(),
            work_date: work_date[i],
            punch_in: punch_in[i],
            punch_out: punch_out[i],
            hours_worked: hours_worked[i],
            pay_code: pay_code[i].clone(),
            punch_in_comment: punch_in_comment[i].clone(),
            punch_out_comment: punch_out_comment[i].clone(),
        });
    }

    info!(table = %raw.name, rows = rows.len(), "timesheet batch cleaned");
    Ok(rows)
}

/// Outcome of one silver run, for callers and their summaries.
#[derive(Debug)]
pub struct SilverRunSummary {
    pub batch_id: BatchId,
    pub employee_rows: usize,
    pub timesheet_rows: usize,
    pub orphan_rows_dropped: usize,
    pub orphan_ids: Vec<String>,
    pub report: ValidationReport,
}

/// Runs the silver stage for one batch: clean both entities, enforce
/// referential integrity, validate, then stage the accepted tables.
pub struct SilverTransformer {
    store: Arc<dyn SilverStore>,
    placeholders: Arc<PlaceholderSet>,
    categorizer: Arc<CommentCategorizer>,
    engine: ValidationEngine,
    policy: ValidationPolicy,
    min_hours_worked: f64,
    max_hours_worked: f64,
}

impl SilverTransformer {
    pub fn new(store: Arc<dyn SilverStore>, settings: &SilverSettings) -> Self {
        Self {
            store,
            placeholders: Arc::new(PlaceholderSet::standard().clone()),
            categorizer: Arc::new(CommentCategorizer::standard()),
            engine: ValidationEngine::standard(),
            policy: if settings.fail_fast {
                ValidationPolicy::FailFast
            } else {
                ValidationPolicy::BestEffort
            },
            min_hours_worked: settings.min_hours_worked,
            max_hours_worked: settings.max_hours_worked,
        }
    }

    /// Swaps in alternate cleaning rules; tests and non-standard sources
    /// use this instead of the process-wide defaults.
    pub fn with_rules(
        mut self,
        placeholders: Arc<PlaceholderSet>,
        categorizer: Arc<CommentCategorizer>,
    ) -> Self {
        self.placeholders = placeholders;
        self.categorizer = categorizer;
        self
    }

    pub fn with_policy(mut self, policy: ValidationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Processes one batch end to end. The two entities clean in parallel
    /// on blocking workers; the join below is the ordering barrier the
    /// referential filter depends on.
    #[instrument(skip(self, raw_employees, raw_timesheets))]
    pub async fn run(
        &self,
        raw_employees: RawTable,
        raw_timesheets: RawTable,
    ) -> Result<SilverRunSummary> {
        let started = Instant::now();
        let batch_id = BatchId::mint();
        info!(
            batch_id = %batch_id,
            raw_employees = raw_employees.row_count(),
            raw_timesheets = raw_timesheets.row_count(),
            "starting silver run"
        );

        let placeholders = Arc::clone(&self.placeholders);
        let employee_task = tokio::task::spawn_blocking(move || {
            let begun = Instant::now();
            let rows = clean_employee_table(&raw_employees, &placeholders);
            obs::cleaning::duration("employee", begun.elapsed().as_secs_f64());
            rows
        });

        let placeholders = Arc::clone(&self.placeholders);
        let categorizer = Arc::clone(&self.categorizer);
        let timesheet_task = tokio::task::spawn_blocking(move || {
            let begun = Instant::now();
            let rows = clean_timesheet_table(&raw_timesheets, &placeholders, &categorizer);
            obs::cleaning::duration("timesheet", begun.elapsed().as_secs_f64());
            rows
        });

        let (employees, timesheets) = tokio::try_join!(employee_task, timesheet_task)?;
        let (employees, timesheets) = match (employees, timesheets) {
            (Ok(employees), Ok(timesheets)) => (employees, timesheets),
            (Err(e), _) | (_, Err(e)) => {
                obs::silver::run_error();
                return Err(e);
            }
        };
        obs::cleaning::rows_cleaned("employee", employees.len());
        obs::cleaning::rows_cleaned("timesheet", timesheets.len());

        let valid_ids: HashSet<String> =
            employees.iter().map(|e| e.employee_id.clone()).collect();
        let outcome = filter_orphan_timesheets(timesheets, &valid_ids);
        obs::integrity::rows_dropped(outcome.dropped_rows);

        let input = ValidationInput {
            employees: &employees,
            timesheets: &outcome.retained,
            min_hours_worked: self.min_hours_worked,
            max_hours_worked: self.max_hours_worked,
        };
        let report = self.engine.run(batch_id.clone(), &input);

        if !report.passed {
            match self.policy {
                ValidationPolicy::FailFast => {
                    obs::silver::run_error();
                    return Err(RefineryError::ValidationFailed {
                        batch_id: batch_id.to_string(),
                        errors: report.error_count(),
                        warnings: report.warning_count(),
                    });
                }
                ValidationPolicy::BestEffort => {
                    warn!(
                        batch_id = %batch_id,
                        errors = report.error_count(),
                        warnings = report.warning_count(),
                        "staging a non-passing batch under best-effort policy"
                    );
                }
            }
        }

        let employee_table = CleanedTable::new(batch_id.clone(), employees);
        let timesheet_table = CleanedTable::new(batch_id.clone(), outcome.retained);
        self.store.write_employees(&employee_table).await?;
        self.store.write_timesheets(&timesheet_table).await?;
        self.store.write_report(&report).await?;

        let elapsed = started.elapsed();
        obs::silver::run_success();
        obs::silver::duration(elapsed.as_secs_f64());
        info!(
            batch_id = %batch_id,
            employees = employee_table.len(),
            timesheets = timesheet_table.len(),
            orphans_dropped = outcome.dropped_rows,
            passed = report.passed,
            elapsed_ms = elapsed.as_millis() as u64,
            "silver run complete"
        );

        Ok(SilverRunSummary {
            batch_id,
            employee_rows: employee_table.len(),
            timesheet_rows: timesheet_table.len(),
            orphan_rows_dropped: outcome.dropped_rows,
            orphan_ids: outcome.orphan_ids,
            report,
        })
    }
}
