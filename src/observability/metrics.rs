//! Metrics for the silver refinement pipeline, recorded through the
//! `metrics` facade using Prometheus naming conventions.

use std::fmt;
use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Every metric name used in the system, so call sites never carry magic
/// strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Landing metrics
    LandingTablesRead,
    LandingReadErrors,
    LandingRowsRead,

    // Cleaning metrics
    CleaningRowsCleaned,
    CleaningDuration,

    // Referential integrity metrics
    IntegrityRowsDropped,

    // Validation metrics
    ValidationIssuesDetected,
    ValidationReportsPassed,
    ValidationReportsFailed,

    // Storage metrics
    StorageRowsWritten,
    StorageWriteErrors,

    // Run-level metrics
    SilverRunsSuccess,
    SilverRunsError,
    SilverRunDuration,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::LandingTablesRead => "tsr_landing_tables_read_total",
            MetricName::LandingReadErrors => "tsr_landing_read_errors_total",
            MetricName::LandingRowsRead => "tsr_landing_rows_read_total",

            MetricName::CleaningRowsCleaned => "tsr_cleaning_rows_cleaned_total",
            MetricName::CleaningDuration => "tsr_cleaning_duration_seconds",

            MetricName::IntegrityRowsDropped => "tsr_integrity_rows_dropped_total",

            MetricName::ValidationIssuesDetected => "tsr_validation_issues_detected_total",
            MetricName::ValidationReportsPassed => "tsr_validation_reports_passed_total",
            MetricName::ValidationReportsFailed => "tsr_validation_reports_failed_total",

            MetricName::StorageRowsWritten => "tsr_storage_rows_written_total",
            MetricName::StorageWriteErrors => "tsr_storage_write_errors_total",

            MetricName::SilverRunsSuccess => "tsr_silver_runs_success_total",
            MetricName::SilverRunsError => "tsr_silver_runs_error_total",
            MetricName::SilverRunDuration => "tsr_silver_run_duration_seconds",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

static RECORDER_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the Prometheus recorder. Safe to call once per process; the
/// handle is kept so [`render`] can expose the scrape text.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;
    let _ = RECORDER_HANDLE.set(handle);
    Ok(())
}

/// Renders the current scrape text, if the recorder is installed.
pub fn render() -> Option<String> {
    RECORDER_HANDLE.get().map(|handle| handle.render())
}

// ============================================================================
// Landing Metrics
// ============================================================================

pub mod landing {
    use super::MetricName;

    /// Record a raw table successfully read from the landing zone
    pub fn table_read(rows: usize) {
        ::metrics::counter!(MetricName::LandingTablesRead.as_str()).increment(1);
        ::metrics::counter!(MetricName::LandingRowsRead.as_str()).increment(rows as u64);
    }

    /// Record a failed landing read
    pub fn read_error() {
        ::metrics::counter!(MetricName::LandingReadErrors.as_str()).increment(1);
    }
}

// ============================================================================
// Cleaning Metrics
// ============================================================================

pub mod cleaning {
    use super::MetricName;

    /// Record rows cleaned for one entity
    pub fn rows_cleaned(entity: &str, count: usize) {
        ::metrics::counter!(MetricName::CleaningRowsCleaned.as_str(), "entity" => entity.to_string())
            .increment(count as u64);
    }

    /// Record how long one entity's cleaning pass took
    pub fn duration(entity: &str, secs: f64) {
        ::metrics::histogram!(MetricName::CleaningDuration.as_str(), "entity" => entity.to_string())
            .record(secs);
    }
}

// ============================================================================
// Referential Integrity Metrics
// ============================================================================

pub mod integrity {
    use super::MetricName;

    /// Record timesheet rows dropped for missing employee references
    pub fn rows_dropped(count: usize) {
        ::metrics::counter!(MetricName::IntegrityRowsDropped.as_str()).increment(count as u64);
    }
}

// ============================================================================
// Validation Metrics
// ============================================================================

pub mod validation {
    use super::MetricName;

    /// Record one reported validation issue
    pub fn record_issue(severity: &str) {
        ::metrics::counter!(
            MetricName::ValidationIssuesDetected.as_str(),
            "severity" => severity.to_string()
        )
        .increment(1);
    }

    /// Record a completed validation report
    pub fn record_report(passed: bool) {
        let name = if passed {
            MetricName::ValidationReportsPassed.as_str()
        } else {
            MetricName::ValidationReportsFailed.as_str()
        };
        ::metrics::counter!(name).increment(1);
    }
}

// ============================================================================
// Storage Metrics
// ============================================================================

pub mod storage {
    use super::MetricName;

    /// Record rows written to one staging table
    pub fn rows_written(table: &str, count: usize) {
        ::metrics::counter!(MetricName::StorageRowsWritten.as_str(), "table" => table.to_string())
            .increment(count as u64);
    }

    /// Record a failed staging write
    pub fn write_error(table: &str) {
        ::metrics::counter!(MetricName::StorageWriteErrors.as_str(), "table" => table.to_string())
            .increment(1);
    }
}

// ============================================================================
// Run-level Metrics
// ============================================================================

pub mod silver {
    use super::MetricName;

    /// Record a completed run
    pub fn run_success() {
        ::metrics::counter!(MetricName::SilverRunsSuccess.as_str()).increment(1);
    }

    /// Record an aborted run
    pub fn run_error() {
        ::metrics::counter!(MetricName::SilverRunsError.as_str()).increment(1);
    }

    /// Record end-to-end run duration
    pub fn duration(secs: f64) {
        ::metrics::histogram!(MetricName::SilverRunDuration.as_str()).record(secs);
    }
}
