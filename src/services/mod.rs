// Service layer: validated mutations over ServiceDb and the reads the
// front end calls. Multi-table writes run inside ServiceDb::with_transaction.

pub mod backup;
pub mod customers;
pub mod maintenance;
pub mod plans;
pub mod reminders;

use chrono::NaiveDate;

use crate::dates::is_storable;
use crate::error::{ServiceError, ServiceResult};
use crate::notification::{Notifier, Severity};

/// Forward the outcome of a mutation to the notifier and hand it back unchanged.
pub(crate) fn report<T>(
    notifier: &dyn Notifier,
    result: ServiceResult<T>,
    success: impl FnOnce(&T) -> String,
) -> ServiceResult<T> {
    match &result {
        Ok(value) => notifier.notify(&success(value), Severity::Success),
        Err(e) => notifier.notify(&e.to_string(), Severity::Error),
    }
    result
}

/// Reject dates a backup export could not write back in `yyyy-MM-dd` form.
pub(crate) fn require_storable(date: NaiveDate, field: &str) -> ServiceResult<()> {
    if is_storable(date) {
        Ok(())
    } else {
        Err(ServiceError::Validation(format!(
            "{field} must be between 0001-01-01 and 9999-12-31, got {date}"
        )))
    }
}
