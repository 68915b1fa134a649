// Maintenance ledger: record services, remove mistakes, read history.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crate::db::{DbMaintenanceRecord, ServiceDb};
use crate::error::{ServiceError, ServiceResult};
use crate::notification::Notifier;
use crate::types::MaintenanceType;

use super::{report, require_storable};

/// A completed service as entered by the technician.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceInput {
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub maintenance_type: MaintenanceType,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub cost: Option<f64>,
}

/// Shared by manual entry and plan completion.
pub(crate) fn validate_input(input: &MaintenanceInput, today: NaiveDate) -> ServiceResult<()> {
    require_storable(input.date, "maintenance date")?;
    if input.date > today {
        return Err(ServiceError::Validation(
            "maintenance date cannot be in the future".to_string(),
        ));
    }
    if let Some(cost) = input.cost {
        if !cost.is_finite() || cost < 0.0 {
            return Err(ServiceError::Validation(format!(
                "cost must be a non-negative amount, got {cost}"
            )));
        }
    }
    Ok(())
}

pub(crate) fn new_record(
    customer_id: &str,
    input: &MaintenanceInput,
    now: DateTime<Utc>,
) -> DbMaintenanceRecord {
    DbMaintenanceRecord {
        id: uuid::Uuid::new_v4().to_string(),
        customer_id: customer_id.to_string(),
        date: input.date,
        maintenance_type: input.maintenance_type,
        notes: input.notes.trim().to_string(),
        cost: input.cost,
        created_at: now,
    }
}

pub fn add_maintenance_record(
    db: &ServiceDb,
    notifier: &dyn Notifier,
    customer_id: &str,
    input: &MaintenanceInput,
    today: NaiveDate,
) -> ServiceResult<DbMaintenanceRecord> {
    let result = (|| -> ServiceResult<DbMaintenanceRecord> {
        validate_input(input, today)?;
        if db.get_customer(customer_id)?.is_none() {
            return Err(ServiceError::not_found("Customer", customer_id));
        }
        let record = new_record(customer_id, input, Utc::now());
        db.insert_maintenance_record(&record)?;
        Ok(record)
    })();
    report(notifier, result, |r| {
        format!("Recorded {} on {}", r.maintenance_type, r.date)
    })
}

pub fn delete_maintenance_record(
    db: &ServiceDb,
    notifier: &dyn Notifier,
    id: &str,
) -> ServiceResult<()> {
    let result = (|| -> ServiceResult<()> {
        if !db.delete_maintenance_record(id)? {
            return Err(ServiceError::not_found("Maintenance record", id));
        }
        Ok(())
    })();
    report(notifier, result, |_| "Maintenance record deleted".to_string())
}

/// Newest service first.
pub fn maintenance_history(
    db: &ServiceDb,
    customer_id: &str,
) -> ServiceResult<Vec<DbMaintenanceRecord>> {
    Ok(db.get_records_for_customer(customer_id)?)
}
