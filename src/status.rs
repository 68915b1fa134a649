//! Urgency classification over the signed day count until due.

use crate::types::{MaintenanceStatus, ScheduleRules};

/// Days until due at or below which a customer is "due soon".
pub const DUE_SOON_DAYS: i64 = 7;
/// Days until due at or below which a customer is "upcoming".
pub const UPCOMING_DAYS: i64 = 30;

/// Classify with the reference thresholds.
pub fn classify(days_until_due: i64) -> MaintenanceStatus {
    classify_with(days_until_due, &ScheduleRules::default())
}

/// Classify with configured thresholds. Evaluated in order, so day 0
/// (due today) is always `DueSoon`.
pub fn classify_with(days_until_due: i64, rules: &ScheduleRules) -> MaintenanceStatus {
    if days_until_due < 0 {
        MaintenanceStatus::Overdue
    } else if days_until_due <= rules.due_soon_days {
        MaintenanceStatus::DueSoon
    } else if days_until_due <= rules.upcoming_days {
        MaintenanceStatus::Upcoming
    } else {
        MaintenanceStatus::Ok
    }
}
