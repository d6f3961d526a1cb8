//! # Draft Conflict Detection
//!
//! Before drafts are generated for a patient and target date, the detector
//! scans the patient's existing records for temporal overlap so the clinic
//! does not issue near-duplicate rows. Distance is measured in whole
//! calendar days on `NaiveDate` (time of day never enters the math), and a
//! record conflicts when it falls inside an inclusive, symmetric window
//! around the target.
//!
//! The detector is pure; fetching the candidate records is the caller's job
//! (see [`crate::session::SyncSession::check_draft_conflicts`]).

use crate::record::SyncRecord;
use chrono::NaiveDate;
use tracing::debug;

/// Inclusive day window, past and future, inside which an existing record
/// counts as a conflict.
pub const CONFLICT_WINDOW_DAYS: i64 = 10;

/// How many conflicts a report lists for display. The cap never affects the
/// reported total.
pub const MAX_LISTED_CONFLICTS: usize = 5;

/// One conflicting record, described for the warning dialog.
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictEntry {
    pub label: String,
    pub date: NaiveDate,
}

/// Result of a conflict scan. `conflicts` is capped for display; `total` is
/// the true count.
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictReport {
    pub conflicts: Vec<ConflictEntry>,
    pub total: usize,
}

impl ConflictReport {
    pub fn none() -> Self {
        Self {
            conflicts: Vec::new(),
            total: 0,
        }
    }

    pub fn has_conflict(&self) -> bool {
        self.total > 0
    }
}

/// Scans existing records for day-distance overlap with a target date.
#[derive(Debug, Clone)]
pub struct DraftConflictDetector {
    window_days: i64,
    display_cap: usize,
}

impl Default for DraftConflictDetector {
    fn default() -> Self {
        Self::new(CONFLICT_WINDOW_DAYS, MAX_LISTED_CONFLICTS)
    }
}

impl DraftConflictDetector {
    pub fn new(window_days: i64, display_cap: usize) -> Self {
        Self {
            window_days,
            display_cap,
        }
    }

    /// Parses a dashboard date input. Accepts ISO `YYYY-MM-DD` and the form
    /// input `DD/MM/YYYY`; anything else (including empty input) yields
    /// `None` and the caller skips the check entirely.
    pub fn parse_target(input: &str) -> Option<NaiveDate> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }
        NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(trimmed, "%d/%m/%Y"))
            .ok()
    }

    /// Parses `target_input` and scans `existing`. An unparseable target
    /// reports no conflicts regardless of the existing data.
    pub fn check<T: SyncRecord>(&self, target_input: &str, existing: &[T]) -> ConflictReport {
        match Self::parse_target(target_input) {
            Some(target) => self.scan(target, existing),
            None => ConflictReport::none(),
        }
    }

    /// Scans `existing` against an already-parsed target date. Records
    /// without a reference date are excluded pair-wise, never failing the
    /// whole check.
    pub fn scan<T: SyncRecord>(&self, target: NaiveDate, existing: &[T]) -> ConflictReport {
        let mut report = ConflictReport::none();
        for record in existing {
            let Some(date) = record.reference_date() else {
                continue;
            };
            let distance = (target - date).num_days();
            if distance.abs() <= self.window_days {
                report.total += 1;
                if report.conflicts.len() < self.display_cap {
                    report.conflicts.push(ConflictEntry {
                        label: record.summary_label(),
                        date,
                    });
                }
            }
        }
        debug!(%target, total = report.total, "conflict scan");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{Appointment, AppointmentId, PatientId};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn appointment(id: &str, day: &str) -> Appointment {
        Appointment::new(
            AppointmentId::from(id),
            PatientId::from("p1"),
            "Cardiology",
            Some(date(day)),
        )
    }

    #[test]
    fn nine_days_back_is_a_conflict() {
        let detector = DraftConflictDetector::default();
        let report = detector.check("2024-05-10", &[appointment("a1", "2024-05-01")]);
        assert!(report.has_conflict());
        assert_eq!(report.total, 1);
        assert_eq!(report.conflicts[0].date, date("2024-05-01"));
    }

    #[test]
    fn twelve_days_back_is_not_a_conflict() {
        let detector = DraftConflictDetector::default();
        let report = detector.check("2024-05-10", &[appointment("a1", "2024-04-28")]);
        assert!(!report.has_conflict());
        assert_eq!(report.total, 0);
    }

    #[test]
    fn window_is_inclusive_and_symmetric() {
        let detector = DraftConflictDetector::default();
        let rows = vec![
            appointment("past_edge", "2024-04-30"),   // exactly -10
            appointment("future_edge", "2024-05-20"), // exactly +10
            appointment("outside", "2024-05-21"),     // +11
        ];
        let report = detector.check("2024-05-10", &rows);
        assert_eq!(report.total, 2);
    }

    #[test]
    fn empty_target_skips_the_check() {
        let detector = DraftConflictDetector::default();
        let report = detector.check("  ", &[appointment("a1", "2024-05-10")]);
        assert!(!report.has_conflict());
        assert!(report.conflicts.is_empty());
    }

    #[test]
    fn unparseable_target_skips_the_check() {
        let detector = DraftConflictDetector::default();
        let report = detector.check("next tuesday", &[appointment("a1", "2024-05-10")]);
        assert!(!report.has_conflict());
    }

    #[test]
    fn slash_format_is_accepted() {
        let detector = DraftConflictDetector::default();
        let report = detector.check("10/05/2024", &[appointment("a1", "2024-05-08")]);
        assert_eq!(report.total, 1);
    }

    #[test]
    fn records_without_dates_are_skipped_pair_wise() {
        let detector = DraftConflictDetector::default();
        let rows = vec![
            Appointment::new(
                AppointmentId::from("undated"),
                PatientId::from("p1"),
                "Cardiology",
                None,
            ),
            appointment("dated", "2024-05-09"),
        ];
        let report = detector.check("2024-05-10", &rows);
        assert_eq!(report.total, 1);
    }

    #[test]
    fn display_cap_never_affects_the_total() {
        let detector = DraftConflictDetector::new(CONFLICT_WINDOW_DAYS, 2);
        let rows: Vec<Appointment> = (1..=4)
            .map(|day| appointment(&format!("a{day}"), &format!("2024-05-0{day}")))
            .collect();
        let report = detector.check("2024-05-05", &rows);
        assert_eq!(report.conflicts.len(), 2);
        assert_eq!(report.total, 4);
    }
}
