// Snoozes: postpone a customer's reminder without touching the cycle.
//
// Every snooze is a new row. Earlier ones stay as history; the newest one
// by creation time is the one that applies.

use chrono::{NaiveDate, Utc};

use crate::dates::add_cycle;
use crate::db::{DbReminderOverride, ServiceDb};
use crate::error::{ServiceError, ServiceResult};
use crate::notification::Notifier;

use super::{report, require_storable};

/// Snooze until an explicit date. The target may not be in the past.
pub fn snooze_reminder(
    db: &ServiceDb,
    notifier: &dyn Notifier,
    customer_id: &str,
    original_due_date: NaiveDate,
    snoozed_until: NaiveDate,
    reason: &str,
    today: NaiveDate,
) -> ServiceResult<DbReminderOverride> {
    let result = (|| -> ServiceResult<DbReminderOverride> {
        require_storable(snoozed_until, "snooze date")?;
        require_storable(original_due_date, "original due date")?;
        if snoozed_until < today {
            return Err(ServiceError::Validation(
                "snooze date cannot be in the past".to_string(),
            ));
        }
        if db.get_customer(customer_id)?.is_none() {
            return Err(ServiceError::not_found("Customer", customer_id));
        }
        let row = DbReminderOverride {
            id: uuid::Uuid::new_v4().to_string(),
            customer_id: customer_id.to_string(),
            original_due_date,
            snoozed_until,
            reason: reason.trim().to_string(),
            created_at: Utc::now(),
        };
        db.insert_override(&row)?;
        Ok(row)
    })();
    report(notifier, result, |o| {
        format!("Reminder snoozed until {}", o.snoozed_until)
    })
}

/// The "+1 month" / "+2 months" shortcuts, counted from today.
pub fn snooze_months(
    db: &ServiceDb,
    notifier: &dyn Notifier,
    customer_id: &str,
    original_due_date: NaiveDate,
    months: u32,
    today: NaiveDate,
) -> ServiceResult<DbReminderOverride> {
    if months == 0 {
        let err = ServiceError::Validation("snooze must be at least one month".to_string());
        return report(notifier, Err(err), |_: &DbReminderOverride| String::new());
    }
    snooze_reminder(
        db,
        notifier,
        customer_id,
        original_due_date,
        add_cycle(today, months),
        "",
        today,
    )
}

pub fn snooze_to_date(
    db: &ServiceDb,
    notifier: &dyn Notifier,
    customer_id: &str,
    original_due_date: NaiveDate,
    snoozed_until: NaiveDate,
    today: NaiveDate,
) -> ServiceResult<DbReminderOverride> {
    snooze_reminder(
        db,
        notifier,
        customer_id,
        original_due_date,
        snoozed_until,
        "",
        today,
    )
}

/// Every snooze ever created for a customer, oldest first.
pub fn snooze_history(db: &ServiceDb, customer_id: &str) -> ServiceResult<Vec<DbReminderOverride>> {
    Ok(db.get_overrides_for_customer(customer_id)?)
}
