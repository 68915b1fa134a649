// Plans (appointments): create, postpone, cancel, and complete.
//
// Completing a plan writes a maintenance record and closes the plan in a
// single transaction. Each action is checked against the lifecycle before
// anything is written.

use chrono::{NaiveDate, Utc};
use serde::Serialize;

use crate::db::{DbMaintenanceRecord, DbPlan, ServiceDb};
use crate::error::{ServiceError, ServiceResult};
use crate::notification::Notifier;
use crate::plans::{transition, PlanAction};
use crate::types::PlanStatus;

use super::maintenance::{new_record, validate_input, MaintenanceInput};
use super::{report, require_storable};

/// The two rows written by [`complete_plan`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedPlan {
    pub plan: DbPlan,
    pub record: DbMaintenanceRecord,
}

fn require_plan(db: &ServiceDb, id: &str) -> ServiceResult<DbPlan> {
    db.get_plan(id)?
        .ok_or_else(|| ServiceError::not_found("Plan", id))
}

/// Load the plan and check `action` is allowed from its current status.
fn load_for(db: &ServiceDb, id: &str, action: PlanAction) -> ServiceResult<DbPlan> {
    let plan = require_plan(db, id)?;
    transition(plan.status, action).map_err(|source| ServiceError::InvalidTransition {
        plan_id: id.to_string(),
        source,
    })?;
    Ok(plan)
}

/// Lost a race with another write between the check and the guarded UPDATE.
fn stale(id: &str, from: PlanStatus, action: PlanAction) -> ServiceError {
    ServiceError::InvalidTransition {
        plan_id: id.to_string(),
        source: crate::plans::InvalidTransition { from, action },
    }
}

pub fn create_plan(
    db: &ServiceDb,
    notifier: &dyn Notifier,
    customer_id: &str,
    date: NaiveDate,
    notes: &str,
) -> ServiceResult<DbPlan> {
    let result = (|| -> ServiceResult<DbPlan> {
        require_storable(date, "plan date")?;
        if db.get_customer(customer_id)?.is_none() {
            return Err(ServiceError::not_found("Customer", customer_id));
        }
        let now = Utc::now();
        let plan = DbPlan {
            id: uuid::Uuid::new_v4().to_string(),
            customer_id: customer_id.to_string(),
            date,
            notes: notes.trim().to_string(),
            status: PlanStatus::Scheduled,
            maintenance_record_id: None,
            created_at: now,
            updated_at: now,
        };
        db.insert_plan(&plan)?;
        Ok(plan)
    })();
    report(notifier, result, |p| format!("Visit planned for {}", p.date))
}

/// Move a scheduled plan to another date. Status does not change.
pub fn postpone_plan(
    db: &ServiceDb,
    notifier: &dyn Notifier,
    plan_id: &str,
    new_date: NaiveDate,
) -> ServiceResult<DbPlan> {
    let result = require_storable(new_date, "plan date").and_then(|()| {
        db.with_transaction(|tx| -> ServiceResult<DbPlan> {
            let plan = load_for(tx, plan_id, PlanAction::Postpone)?;
            let now = Utc::now();
            if !tx.update_plan_date(plan_id, new_date, &now)? {
                return Err(stale(plan_id, plan.status, PlanAction::Postpone));
            }
            Ok(DbPlan {
                date: new_date,
                updated_at: now,
                ..plan
            })
        })
    });
    report(notifier, result, |p| format!("Visit moved to {}", p.date))
}

/// Cancel a scheduled plan. Cancelling twice is an `InvalidTransition`.
pub fn cancel_plan(
    db: &ServiceDb,
    notifier: &dyn Notifier,
    plan_id: &str,
) -> ServiceResult<DbPlan> {
    let result = db.with_transaction(|tx| -> ServiceResult<DbPlan> {
        let plan = load_for(tx, plan_id, PlanAction::Cancel)?;
        let now = Utc::now();
        if !tx.mark_plan_cancelled(plan_id, &now)? {
            return Err(stale(plan_id, plan.status, PlanAction::Cancel));
        }
        Ok(DbPlan {
            status: PlanStatus::Cancelled,
            updated_at: now,
            ..plan
        })
    });
    report(notifier, result, |_| "Visit cancelled".to_string())
}

/// Record the visit and close the plan. Both rows commit together or not at all.
pub fn complete_plan(
    db: &ServiceDb,
    notifier: &dyn Notifier,
    plan_id: &str,
    input: &MaintenanceInput,
    today: NaiveDate,
) -> ServiceResult<CompletedPlan> {
    let result = validate_input(input, today).and_then(|()| {
        db.with_transaction(|tx| -> ServiceResult<CompletedPlan> {
            let plan = load_for(tx, plan_id, PlanAction::Complete)?;
            let now = Utc::now();
            let record = new_record(&plan.customer_id, input, now);
            tx.insert_maintenance_record(&record)?;
            if !tx.mark_plan_completed(plan_id, &record.id, &now)? {
                return Err(stale(plan_id, plan.status, PlanAction::Complete));
            }
            Ok(CompletedPlan {
                plan: DbPlan {
                    status: PlanStatus::Completed,
                    maintenance_record_id: Some(record.id.clone()),
                    updated_at: now,
                    ..plan
                },
                record,
            })
        })
    });
    if let Ok(done) = &result {
        log::info!("Completed plan {} with record {}", plan_id, done.record.id);
    }
    report(notifier, result, |_| "Visit completed".to_string())
}

/// Every plan of one customer, newest date first.
pub fn customer_plans(db: &ServiceDb, customer_id: &str) -> ServiceResult<Vec<DbPlan>> {
    Ok(db.get_plans_for_customer(customer_id)?)
}
