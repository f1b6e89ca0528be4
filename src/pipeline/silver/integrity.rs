use std::collections::HashSet;

use tracing::warn;

use crate::domain::CleanedTimesheet;

/// Result of the orphan filter. Rows are kept or dropped whole; dropped
/// rows are gone from the batch and only surface through these counts.
#[derive(Debug)]
pub struct IntegrityOutcome {
    pub retained: Vec<CleanedTimesheet>,
    pub dropped_rows: usize,
    /// Distinct unmatched employee ids in first-seen order.
    pub orphan_ids: Vec<String>,
}

/// Drops every timesheet row whose employee id is not in the cleaned
/// employee id set. Taking the set as a parameter pins the ordering: the
/// caller cannot run this before employee cleaning has produced it.
pub fn filter_orphan_timesheets(
    rows: Vec<CleanedTimesheet>,
    valid_employee_ids: &HashSet<String>,
) -> IntegrityOutcome {
    let total = rows.len();
    let mut retained = Vec::with_capacity(total);
    let mut orphan_ids: Vec<String> = Vec::new();
    let mut seen_orphans: HashSet<String> = HashSet::new();

    for row in rows {
        if valid_employee_ids.contains(&row.employee_id) {
            retained.push(row);
        } else if seen_orphans.insert(row.employee_id.clone()) {
            orphan_ids.push(row.employee_id.clone());
        }
    }

    let dropped_rows = total - retained.len();
    if dropped_rows > 0 {
        warn!(
            dropped_rows,
            orphan_ids = orphan_ids.len(),
            "dropped timesheet rows with no matching employee"
        );
    }

    IntegrityOutcome {
        retained,
        dropped_rows,
        orphan_ids,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timesheet(employee_id: &str) -> CleanedTimesheet {
        CleanedTimesheet {
            employee_id: employee_id.to_string(),
            work_date: None,
            punch_in: None,
            punch_out: None,
            hours_worked: 8.0,
            pay_code: None,
            punch_in_comment: "NA".to_string(),
            punch_out_comment: "NA".to_string(),
        }
    }

    #[test]
    fn orphans_are_dropped_and_counted() {
        let valid: HashSet<String> = ["E1", "E2"].iter().map(|s| s.to_string()).collect();
        let rows = vec![
            timesheet("E1"),
            timesheet("E9"),
            timesheet("E2"),
            timesheet("E9"),
        ];

        let outcome = filter_orphan_timesheets(rows, &valid);

        assert_eq!(outcome.retained.len(), 2);
        assert!(outcome.retained.iter().all(|r| r.employee_id != "E9"));
        assert_eq!(outcome.dropped_rows, 2);
        assert_eq!(outcome.orphan_ids, vec!["E9".to_string()]);
    }

    #[test]
    fn clean_batch_passes_through_untouched() {
        let valid: HashSet<String> = ["E1"].iter().map(|s| s.to_string()).collect();
        let rows = vec![timesheet("E1"), timesheet("E1")];

        let outcome = filter_orphan_timesheets(rows, &valid);

        assert_eq!(outcome.retained.len(), 2);
        assert_eq!(outcome.dropped_rows, 0);
        assert!(outcome.orphan_ids.is_empty());
    }

    #[test]
    fn empty_id_set_drops_everything() {
        let valid = HashSet::new();
        let outcome = filter_orphan_timesheets(vec![timesheet("E1")], &valid);
        assert!(outcome.retained.is_empty());
        assert_eq!(outcome.dropped_rows, 1);
        assert_eq!(outcome.orphan_ids, vec!["E1".to_string()]);
    }
}
