//! Next-due-date resolution from cycle configuration and service history.
//!
//! Two views of the same question. The single-cycle resolver drives the
//! dashboard and its sort order. The per-type resolver backs the customer
//! detail view when a customer carries a per-type cycle map.

use chrono::NaiveDate;
use serde::Serialize;

use crate::dates::add_cycle;
use crate::db::{DbCustomer, DbMaintenanceRecord};
use crate::types::MaintenanceType;

/// Cycle length used when neither the customer nor the config names one.
pub const DEFAULT_CYCLE_MONTHS: u32 = 6;

/// Base the cycle on the last service, or on installation when there is none.
pub fn next_due_date(
    installation_date: NaiveDate,
    last_maintenance: Option<NaiveDate>,
    cycle_months: u32,
) -> NaiveDate {
    add_cycle(last_maintenance.unwrap_or(installation_date), cycle_months)
}

/// One entry of the per-type breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDueDate {
    #[serde(rename = "type")]
    pub maintenance_type: MaintenanceType,
    pub next_due_date: NaiveDate,
    pub last_date: Option<NaiveDate>,
    pub cycle_months: u32,
}

/// Per-type due dates, soonest first.
///
/// Empty when the customer has no per-type map or every configured cycle is
/// zero. Records belonging to other customers are ignored.
pub fn per_type_due_dates<'a, I>(customer: &DbCustomer, records: I) -> Vec<TypeDueDate>
where
    I: IntoIterator<Item = &'a DbMaintenanceRecord>,
{
    let Some(cycles) = customer.maintenance_cycles.as_ref() else {
        return Vec::new();
    };
    if cycles.values().all(|&months| months == 0) {
        return Vec::new();
    }

    let mut latest: std::collections::HashMap<MaintenanceType, NaiveDate> =
        std::collections::HashMap::new();
    for record in records {
        if record.customer_id != customer.id {
            continue;
        }
        latest
            .entry(record.maintenance_type)
            .and_modify(|d| {
                if record.date > *d {
                    *d = record.date;
                }
            })
            .or_insert(record.date);
    }

    let mut result: Vec<TypeDueDate> = cycles
        .iter()
        .filter(|(_, &months)| months > 0)
        .map(|(&maintenance_type, &cycle_months)| {
            let last_date = latest.get(&maintenance_type).copied();
            TypeDueDate {
                maintenance_type,
                next_due_date: next_due_date(customer.installation_date, last_date, cycle_months),
                last_date,
                cycle_months,
            }
        })
        .collect();

    // Stable sort over the BTreeMap order keeps ties deterministic.
    result.sort_by_key(|entry| entry.next_due_date);
    result
}

/// The soonest due date across every configured type, or the single-cycle
/// date from the latest record of any type when no per-type map applies.
pub fn earliest_due_date<'a, I>(
    customer: &DbCustomer,
    records: I,
    default_cycle_months: u32,
) -> NaiveDate
where
    I: IntoIterator<Item = &'a DbMaintenanceRecord> + Clone,
{
    if let Some(first) = per_type_due_dates(customer, records.clone()).first() {
        return first.next_due_date;
    }
    let last = records
        .into_iter()
        .filter(|r| r.customer_id == customer.id)
        .map(|r| r.date)
        .max();
    next_due_date(
        customer.installation_date,
        last,
        customer.cycle_months(default_cycle_months),
    )
}
