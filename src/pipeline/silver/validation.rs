use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::domain::{BatchId, CleanedEmployee, CleanedTimesheet};
use crate::observability::metrics as obs;

/// Severity of a validation finding. Only `Error` can fail a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Info => write!(f, "INFO"),
        }
    }
}

/// One reported finding. Error and warning issues appear only when their
/// check fails; info issues are always present with their counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub check_name: String,
    pub severity: Severity,
    pub message: String,
    pub affected_row_count: usize,
}

/// Immutable outcome of one validation pass. `passed` is false iff an
/// error-severity issue is present; warnings and infos never fail a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub batch_id: BatchId,
    pub generated_at: DateTime<Utc>,
    pub issues: Vec<ValidationIssue>,
    pub passed: bool,
}

impl ValidationReport {
    pub fn new(batch_id: BatchId, issues: Vec<ValidationIssue>) -> Self {
        let passed = !issues.iter().any(|i| i.severity == Severity::Error);
        Self {
            batch_id,
            generated_at: Utc::now(),
            issues,
            passed,
        }
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }
}

/// What the caller wants done with a failed report. Policy lives outside
/// the engine: checks themselves behave identically either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationPolicy {
    /// Abort the run; nothing is written for the batch.
    #[default]
    FailFast,
    /// Log the failure and continue; the report stays marked non-passing.
    BestEffort,
}

/// Everything the checks see. Both cleaned tables come from the same run,
/// after the referential filter.
#[derive(Debug)]
pub struct ValidationInput<'a> {
    pub employees: &'a [CleanedEmployee],
    pub timesheets: &'a [CleanedTimesheet],
    pub min_hours_worked: f64,
    pub max_hours_worked: f64,
}

/// A failed (or, for info checks, observed) evaluation.
#[derive(Debug)]
pub struct Finding {
    pub message: String,
    pub affected_row_count: usize,
}

/// A named, stateless, rerunnable check. For error and warning severities
/// the eval returns `None` on pass; info-severity evals always return a
/// finding so their counts land in every report.
pub struct ValidationCheck {
    pub name: &'static str,
    pub severity: Severity,
    pub eval: fn(&ValidationInput<'_>) -> Option<Finding>,
}

/// The standard check list in its fixed reporting order.
pub fn standard_checks() -> Vec<ValidationCheck> {
    vec![
        ValidationCheck {
            name: "employee_row_count",
            severity: Severity::Error,
            eval: |input| {
                input.employees.is_empty().then(|| Finding {
                    message: "employee table has 0 rows".to_string(),
                    affected_row_count: 0,
                })
            },
        },
        ValidationCheck {
            name: "employee_missing_key",
            severity: Severity::Error,
            eval: |input| {
                let absent = input
                    .employees
                    .iter()
                    .filter(|e| e.employee_id.is_empty())
                    .count();
                (absent > 0).then(|| Finding {
                    message: format!("{absent} employee rows have an absent employee_id"),
                    affected_row_count: absent,
                })
            },
        },
        ValidationCheck {
            name: "employee_is_active_domain",
            severity: Severity::Warning,
            eval: |input| {
                let invalid = input
                    .employees
                    .iter()
                    .filter(|e| e.is_active != 0 && e.is_active != 1)
                    .count();
                (invalid > 0).then(|| Finding {
                    message: format!("{invalid} employee rows have is_active outside {{0, 1}}"),
                    affected_row_count: invalid,
                })
            },
        },
        ValidationCheck {
            name: "employee_duplicate_key",
            severity: Severity::Warning,
            eval: |input| {
                let mut seen = HashSet::new();
                let duplicates = input
                    .employees
                    .iter()
                    .filter(|e| !seen.insert(e.employee_id.as_str()))
                    .count();
                (duplicates > 0).then(|| Finding {
                    message: format!("{duplicates} duplicate employee_id rows found"),
                    affected_row_count: duplicates,
                })
            },
        },
        ValidationCheck {
            name: "timesheet_row_count",
            severity: Severity::Error,
            eval: |input| {
                input.timesheets.is_empty().then(|| Finding {
                    message: "timesheet table has 0 rows".to_string(),
                    affected_row_count: 0,
                })
            },
        },
        ValidationCheck {
            name: "timesheet_missing_key",
            severity: Severity::Error,
            eval: |input| {
                let absent = input
                    .timesheets
                    .iter()
                    .filter(|t| t.employee_id.is_empty())
                    .count();
                (absent > 0).then(|| Finding {
                    message: format!("{absent} timesheet rows have an absent employee_id"),
                    affected_row_count: absent,
                })
            },
        },
        ValidationCheck {
            name: "timesheet_missing_work_date",
            severity: Severity::Error,
            eval: |input| {
                let absent = input
                    .timesheets
                    .iter()
                    .filter(|t| t.work_date.is_none())
                    .count();
                (absent > 0).then(|| Finding {
                    message: format!("{absent} timesheet rows have an absent work_date"),
                    affected_row_count: absent,
                })
            },
        },
        ValidationCheck {
            name: "timesheet_hours_range",
            severity: Severity::Warning,
            eval: |input| {
                let out_of_range = input
                    .timesheets
                    .iter()
                    .filter(|t| {
                        t.hours_worked < input.min_hours_worked
                            || t.hours_worked > input.max_hours_worked
                    })
                    .count();
                (out_of_range > 0).then(|| Finding {
                    message: format!(
                        "{out_of_range} timesheet rows have hours_worked outside [{}, {}]",
                        input.min_hours_worked, input.max_hours_worked
                    ),
                    affected_row_count: out_of_range,
                })
            },
        },
        ValidationCheck {
            name: "orphan_timesheet_refs",
            severity: Severity::Warning,
            eval: |input| {
                let employee_ids: HashSet<&str> = input
                    .employees
                    .iter()
                    .map(|e| e.employee_id.as_str())
                    .collect();
                let orphan_ids: HashSet<&str> = input
                    .timesheets
                    .iter()
                    .map(|t| t.employee_id.as_str())
                    .filter(|id| !employee_ids.contains(id))
                    .collect();
                if orphan_ids.is_empty() {
                    return None;
                }
                let rows = input
                    .timesheets
                    .iter()
                    .filter(|t| orphan_ids.contains(t.employee_id.as_str()))
                    .count();
                Some(Finding {
                    message: format!(
                        "{} employee ids ({rows} rows) not found in employee table",
                        orphan_ids.len()
                    ),
                    affected_row_count: rows,
                })
            },
        },
        ValidationCheck {
            name: "employees_without_timesheets",
            severity: Severity::Info,
            eval: |input| {
                let timesheet_ids: HashSet<&str> = input
                    .timesheets
                    .iter()
                    .map(|t| t.employee_id.as_str())
                    .collect();
                let without = input
                    .employees
                    .iter()
                    .filter(|e| !timesheet_ids.contains(e.employee_id.as_str()))
                    .count();
                Some(Finding {
                    message: format!("{without} employees have no timesheet rows"),
                    affected_row_count: without,
                })
            },
        },
    ]
}

/// Runs a fixed, ordered check list and assembles the report.
pub struct ValidationEngine {
    checks: Vec<ValidationCheck>,
}

impl ValidationEngine {
    pub fn standard() -> Self {
        Self {
            checks: standard_checks(),
        }
    }

    pub fn with_checks(checks: Vec<ValidationCheck>) -> Self {
        Self { checks }
    }

    pub fn run(&self, batch_id: BatchId, input: &ValidationInput<'_>) -> ValidationReport {
        let mut issues = Vec::new();

        for check in &self.checks {
            match (check.eval)(input) {
                Some(finding) => {
                    match check.severity {
                        Severity::Error => error!(
                            check = check.name,
                            affected = finding.affected_row_count,
                            "{}",
                            finding.message
                        ),
                        Severity::Warning => warn!(
                            check = check.name,
                            affected = finding.affected_row_count,
                            "{}",
                            finding.message
                        ),
                        Severity::Info => info!(
                            check = check.name,
                            affected = finding.affected_row_count,
                            "{}",
                            finding.message
                        ),
                    }
                    obs::validation::record_issue(&check.severity.to_string());
                    issues.push(ValidationIssue {
                        check_name: check.name.to_string(),
                        severity: check.severity,
                        message: finding.message,
                        affected_row_count: finding.affected_row_count,
                    });
                }
                None => debug!(check = check.name, "check passed"),
            }
        }

        let report = ValidationReport::new(batch_id, issues);
        obs::validation::record_report(report.passed);
        if report.passed {
            info!(
                batch_id = %report.batch_id,
                warnings = report.warning_count(),
                "validation passed"
            );
        } else {
            error!(
                batch_id = %report.batch_id,
                errors = report.error_count(),
                warnings = report.warning_count(),
                "validation failed"
            );
        }
        report
    }
}
