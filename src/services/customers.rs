// Customer roster: add, edit, toggle, cascading delete, lookup.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::{NaiveDate, Utc};
use regex::Regex;
use serde::Deserialize;

use crate::db::{CascadeSummary, CycleMap, DbCustomer, ServiceDb};
use crate::error::{ServiceError, ServiceResult};
use crate::notification::Notifier;
use crate::types::MaintenanceType;

use super::{report, require_storable};

/// Digits, spaces, dashes, parentheses and `+`.
fn phone_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[\d\s\-()+]+$").expect("phone regex"))
}

/// Customer fields as entered in the add/edit form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInput {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub address: String,
    pub installation_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub device_model: Option<String>,
    #[serde(default)]
    pub device_serial: Option<String>,
    #[serde(default)]
    pub maintenance_cycle_months: Option<i64>,
    /// Zero disables a type.
    #[serde(default)]
    pub maintenance_cycles: Option<BTreeMap<MaintenanceType, i64>>,
}

/// Checked and trimmed customer fields.
struct ValidCustomer {
    name: String,
    phone: String,
    address: String,
    installation_date: NaiveDate,
    notes: String,
    device_model: Option<String>,
    device_serial: Option<String>,
    maintenance_cycle_months: Option<u32>,
    maintenance_cycles: Option<CycleMap>,
}

fn trimmed_opt(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn validate(input: &CustomerInput, today: NaiveDate) -> ServiceResult<ValidCustomer> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(ServiceError::Validation("name is required".to_string()));
    }
    let phone = input.phone.trim();
    if phone.is_empty() {
        return Err(ServiceError::Validation("phone is required".to_string()));
    }
    if !phone_re().is_match(phone) {
        return Err(ServiceError::Validation(format!(
            "phone {:?} may only contain digits, spaces, dashes, parentheses and +",
            phone
        )));
    }
    let installation_date = input
        .installation_date
        .ok_or_else(|| ServiceError::Validation("installation date is required".to_string()))?;
    require_storable(installation_date, "installation date")?;
    if installation_date > today {
        return Err(ServiceError::Validation(
            "installation date cannot be in the future".to_string(),
        ));
    }

    let maintenance_cycle_months = match input.maintenance_cycle_months {
        None => None,
        Some(m) if m > 0 => Some(u32::try_from(m).map_err(|_| {
            ServiceError::Validation(format!("maintenance cycle of {m} months is too long"))
        })?),
        Some(m) => {
            return Err(ServiceError::Validation(format!(
                "maintenance cycle must be at least 1 month, got {m}"
            )))
        }
    };

    let maintenance_cycles = match &input.maintenance_cycles {
        None => None,
        Some(entries) => {
            let mut map = CycleMap::new();
            for (kind, &months) in entries {
                let months = u32::try_from(months).map_err(|_| {
                    ServiceError::Validation(format!(
                        "{} cycle must be zero or a positive number of months",
                        kind
                    ))
                })?;
                map.insert(*kind, months);
            }
            if map.is_empty() {
                None
            } else {
                Some(map)
            }
        }
    };

    Ok(ValidCustomer {
        name: name.to_string(),
        phone: phone.to_string(),
        address: input.address.trim().to_string(),
        installation_date,
        notes: input.notes.trim().to_string(),
        device_model: trimmed_opt(&input.device_model),
        device_serial: trimmed_opt(&input.device_serial),
        maintenance_cycle_months,
        maintenance_cycles,
    })
}

fn require_customer(db: &ServiceDb, id: &str) -> ServiceResult<DbCustomer> {
    db.get_customer(id)?
        .ok_or_else(|| ServiceError::not_found("Customer", id))
}

pub fn add_customer(
    db: &ServiceDb,
    notifier: &dyn Notifier,
    input: &CustomerInput,
    today: NaiveDate,
) -> ServiceResult<DbCustomer> {
    let result = (|| -> ServiceResult<DbCustomer> {
        let valid = validate(input, today)?;
        let now = Utc::now();
        let customer = DbCustomer {
            id: uuid::Uuid::new_v4().to_string(),
            name: valid.name,
            phone: valid.phone,
            address: valid.address,
            installation_date: valid.installation_date,
            notes: valid.notes,
            device_model: valid.device_model,
            device_serial: valid.device_serial,
            maintenance_cycle_months: valid.maintenance_cycle_months,
            maintenance_cycles: valid.maintenance_cycles,
            active: true,
            created_at: now,
            updated_at: now,
        };
        db.insert_customer(&customer)?;
        log::info!("Added customer {}", customer.id);
        Ok(customer)
    })();
    report(notifier, result, |c| format!("Customer {} added", c.name))
}

/// Replace the editable fields. Id, creation time and active flag are kept.
pub fn update_customer(
    db: &ServiceDb,
    notifier: &dyn Notifier,
    id: &str,
    input: &CustomerInput,
    today: NaiveDate,
) -> ServiceResult<DbCustomer> {
    let result = (|| -> ServiceResult<DbCustomer> {
        let existing = require_customer(db, id)?;
        let valid = validate(input, today)?;
        let customer = DbCustomer {
            name: valid.name,
            phone: valid.phone,
            address: valid.address,
            installation_date: valid.installation_date,
            notes: valid.notes,
            device_model: valid.device_model,
            device_serial: valid.device_serial,
            maintenance_cycle_months: valid.maintenance_cycle_months,
            maintenance_cycles: valid.maintenance_cycles,
            updated_at: Utc::now(),
            ..existing
        };
        if !db.update_customer(&customer)? {
            return Err(ServiceError::not_found("Customer", id));
        }
        Ok(customer)
    })();
    report(notifier, result, |c| format!("Customer {} updated", c.name))
}

pub fn set_customer_active(
    db: &ServiceDb,
    notifier: &dyn Notifier,
    id: &str,
    active: bool,
) -> ServiceResult<()> {
    let result = (|| -> ServiceResult<()> {
        if !db.set_customer_active(id, active, &Utc::now())? {
            return Err(ServiceError::not_found("Customer", id));
        }
        Ok(())
    })();
    report(notifier, result, |_| {
        if active {
            "Customer reactivated".to_string()
        } else {
            "Customer marked inactive".to_string()
        }
    })
}

/// Delete a customer with its records, snoozes and plans in one transaction.
pub fn delete_customer(
    db: &ServiceDb,
    notifier: &dyn Notifier,
    id: &str,
) -> ServiceResult<CascadeSummary> {
    let result = db.with_transaction(|tx| -> ServiceResult<CascadeSummary> {
        tx.delete_customer_cascade(id)?
            .ok_or_else(|| ServiceError::not_found("Customer", id))
    });
    if let Ok(summary) = &result {
        log::info!(
            "Deleted customer {} ({} records, {} snoozes, {} plans)",
            id,
            summary.maintenance_records,
            summary.reminder_overrides,
            summary.plans
        );
    }
    report(notifier, result, |_| "Customer deleted".to_string())
}

pub fn get_customer(db: &ServiceDb, id: &str) -> ServiceResult<DbCustomer> {
    require_customer(db, id)
}

/// Customers ordered by name, optionally narrowed by a case-insensitive
/// substring of name, phone or address.
pub fn list_customers(db: &ServiceDb, search: Option<&str>) -> ServiceResult<Vec<DbCustomer>> {
    let customers = db.get_all_customers()?;
    let needle = search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);
    Ok(match needle {
        None => customers,
        Some(needle) => customers
            .into_iter()
            .filter(|c| {
                [&c.name, &c.phone, &c.address]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            })
            .collect(),
    })
}
