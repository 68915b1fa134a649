//! Reminder overrides: picking the active snooze and applying it.

use chrono::NaiveDate;

use crate::db::DbReminderOverride;

/// The snooze target replaces the computed date outright.
///
/// There is no expiry check: a target already in the past still wins.
pub fn effective_due_date(
    computed_due_date: NaiveDate,
    active_override: Option<&DbReminderOverride>,
) -> NaiveDate {
    match active_override {
        Some(o) => o.snoozed_until,
        None => computed_due_date,
    }
}

/// Latest-created override in `overrides`.
///
/// Selection is by `created_at` only, never by target date. On equal
/// timestamps the later element wins, which matches insertion order for
/// rows read back from the store.
pub fn active_override<'a, I>(overrides: I) -> Option<&'a DbReminderOverride>
where
    I: IntoIterator<Item = &'a DbReminderOverride>,
{
    overrides
        .into_iter()
        .fold(None, |best: Option<&DbReminderOverride>, candidate| {
            Some(match best {
                Some(current) => newer(current, candidate),
                None => candidate,
            })
        })
}

/// Pick between the running winner and the next row seen. Ties go to
/// `candidate`, the one seen later.
pub(crate) fn newer<'a>(
    current: &'a DbReminderOverride,
    candidate: &'a DbReminderOverride,
) -> &'a DbReminderOverride {
    if current.created_at > candidate.created_at {
        current
    } else {
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::{date, sample_override};

    #[test]
    fn test_latest_created_wins_regardless_of_target() {
        let computed = date("2025-01-10");
        let first = sample_override("o1", "c1", "2025-02-01", 1);
        let second = sample_override("o2", "c1", "2025-03-01", 2);

        let overrides = vec![first.clone(), second.clone()];
        let active = active_override(&overrides);
        assert_eq!(effective_due_date(computed, active), date("2025-03-01"));

        // Reverse: the later-created snooze has the earlier target.
        let early_target = sample_override("o3", "c1", "2025-01-20", 3);
        let overrides = vec![second, first, early_target];
        let active = active_override(&overrides).expect("has overrides");
        assert_eq!(active.id, "o3");
        assert_eq!(effective_due_date(computed, Some(active)), date("2025-01-20"));
    }

    #[test]
    fn test_no_override_keeps_computed_date() {
        let computed = date("2025-01-10");
        let none: Vec<DbReminderOverride> = Vec::new();
        assert!(active_override(&none).is_none());
        assert_eq!(effective_due_date(computed, None), computed);
    }

    #[test]
    fn test_past_snooze_target_still_overrides() {
        // A stale snooze is honoured; it does not revert to the cycle date.
        let computed = date("2025-06-01");
        let stale = sample_override("o1", "c1", "2024-12-01", 1);
        assert_eq!(
            effective_due_date(computed, Some(&stale)),
            date("2024-12-01")
        );
    }

    #[test]
    fn test_equal_timestamps_later_row_wins() {
        let a = sample_override("o1", "c1", "2025-02-01", 5);
        let b = sample_override("o2", "c1", "2025-04-01", 5);
        let overrides = vec![a, b];
        assert_eq!(active_override(&overrides).map(|o| o.id.as_str()), Some("o2"));
    }
}
