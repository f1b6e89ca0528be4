use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use crate::error::{RefineryError, Result};

/// One raw cell as it arrives from the landing zone. `None` means the cell
/// was missing in the source; textual null spellings are still `Some` here
/// and are resolved later by the placeholder normalizer.
pub type RawCell = Option<String>;

/// Column names of the raw employee and timesheet tables.
pub mod columns {
    pub mod employee {
        pub const EMPLOYEE_ID: &str = "employee_id";
        pub const FIRST_NAME: &str = "first_name";
        pub const LAST_NAME: &str = "last_name";
        pub const JOB_TITLE: &str = "job_title";
        pub const DEPARTMENT_ID: &str = "department_id";
        pub const DEPARTMENT_NAME: &str = "department_name";
        pub const HIRE_DATE: &str = "hire_date";
        pub const TERMINATION_DATE: &str = "termination_date";
    }

    pub mod timesheet {
        pub const EMPLOYEE_ID: &str = "employee_id";
        pub const WORK_DATE: &str = "work_date";
        pub const PUNCH_IN: &str = "punch_in";
        pub const PUNCH_OUT: &str = "punch_out";
        pub const HOURS_WORKED: &str = "hours_worked";
        pub const PAY_CODE: &str = "pay_code";
        pub const PUNCH_IN_COMMENT: &str = "punch_in_comment";
        pub const PUNCH_OUT_COMMENT: &str = "punch_out_comment";
    }
}

/// A columnar raw batch: named columns of equal length. Cell values are
/// untyped text at this stage.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub name: String,
    columns: HashMap<String, Vec<RawCell>>,
    row_count: usize,
}

impl RawTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: HashMap::new(),
            row_count: 0,
        }
    }

    /// Adds a column. The first column fixes the row count; later columns
    /// must match it.
    pub fn push_column(&mut self, column: impl Into<String>, cells: Vec<RawCell>) -> Result<()> {
        let column = column.into();
        if self.columns.is_empty() {
            self.row_count = cells.len();
        } else if cells.len() != self.row_count {
            return Err(RefineryError::Landing {
                table: self.name.clone(),
                message: format!(
                    "column '{}' has {} cells, expected {}",
                    column,
                    cells.len(),
                    self.row_count
                ),
            });
        }
        self.columns.insert(column, cells);
        Ok(())
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Required-column access. Absence is a structural failure, not a data
    /// quality finding.
    pub fn column(&self, name: &str) -> Result<&[RawCell]> {
        self.columns
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| RefineryError::MissingColumn {
                table: self.name.clone(),
                column: name.to_string(),
            })
    }

    /// Access for columns the source may legitimately omit: a missing
    /// column reads as a column of missing cells, so the usual defaulting
    /// rules apply to it.
    pub fn column_or_absent(&self, name: &str) -> Cow<'_, [RawCell]> {
        match self.columns.get(name) {
            Some(cells) => Cow::Borrowed(cells.as_slice()),
            None => Cow::Owned(vec![None; self.row_count]),
        }
    }
}

/// Short run identifier stamped on every cleaned row and on the validation
/// report. First eight hex chars of a v4 UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(String);

impl BatchId {
    pub fn mint() -> Self {
        let full = Uuid::new_v4().simple().to_string();
        BatchId(full[..8].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cleaned employee dimension row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedEmployee {
    pub employee_id: String,
    pub first_name: String,
    pub last_name: String,
    pub job_title: String,
    pub department_id: Option<String>,
    pub department_name: String,
    pub hire_date: Option<NaiveDate>,
    /// Open-ended employments carry the sentinel end date, never null.
    pub termination_date: NaiveDate,
    /// 1 while the termination date is the sentinel, 0 otherwise.
    pub is_active: i32,
}

/// Cleaned timesheet fact row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedTimesheet {
    pub employee_id: String,
    pub work_date: Option<NaiveDate>,
    pub punch_in: Option<NaiveDateTime>,
    pub punch_out: Option<NaiveDateTime>,
    pub hours_worked: f64,
    pub pay_code: Option<String>,
    pub punch_in_comment: String,
    pub punch_out_comment: String,
}

/// A cleaned batch ready for the staging store, stamped with run metadata.
#[derive(Debug, Clone)]
pub struct CleanedTable<T> {
    pub batch_id: BatchId,
    pub processed_at: DateTime<Utc>,
    pub rows: Vec<T>,
}

impl<T> CleanedTable<T> {
    pub fn new(batch_id: BatchId, rows: Vec<T>) -> Self {
        Self {
            batch_id,
            processed_at: Utc::now(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
