//! Plan (appointment) lifecycle and plan list views.
//!
//! `scheduled` is the only live state. `completed` and `cancelled` are
//! terminal. Postponing rewrites the date of a scheduled plan and is not a
//! state change.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::db::{DbCustomer, DbPlan, Snapshot};
use crate::types::PlanStatus;

/// Mutations a user can request on an existing plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanAction {
    Postpone,
    Cancel,
    Complete,
}

impl PlanAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanAction::Postpone => "postpone",
            PlanAction::Cancel => "cancel",
            PlanAction::Complete => "complete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot {} a plan that is {from}", .action.as_str())]
pub struct InvalidTransition {
    pub from: PlanStatus,
    pub action: PlanAction,
}

/// Resulting status of applying `action` to a plan in state `from`.
///
/// Every action requires `scheduled`; repeating a cancel is rejected too.
pub fn transition(from: PlanStatus, action: PlanAction) -> Result<PlanStatus, InvalidTransition> {
    match (from, action) {
        (PlanStatus::Scheduled, PlanAction::Postpone) => Ok(PlanStatus::Scheduled),
        (PlanStatus::Scheduled, PlanAction::Cancel) => Ok(PlanStatus::Cancelled),
        (PlanStatus::Scheduled, PlanAction::Complete) => Ok(PlanStatus::Completed),
        (from, action) => Err(InvalidTransition { from, action }),
    }
}

/// A plan joined with the customer it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanView {
    pub plan: DbPlan,
    /// `?` when the customer row is missing.
    pub customer_name: String,
    pub customer_phone: String,
    /// Still scheduled but dated before today.
    pub overdue: bool,
}

const MISSING_CUSTOMER_NAME: &str = "?";

fn to_view(plan: &DbPlan, customers: &HashMap<&str, &DbCustomer>, today: NaiveDate) -> PlanView {
    let customer = customers.get(plan.customer_id.as_str());
    PlanView {
        plan: plan.clone(),
        customer_name: customer
            .map(|c| c.name.clone())
            .unwrap_or_else(|| MISSING_CUSTOMER_NAME.to_string()),
        customer_phone: customer.map(|c| c.phone.clone()).unwrap_or_default(),
        overdue: plan.status == PlanStatus::Scheduled && plan.date < today,
    }
}

/// Plans with customer details, optionally restricted to one status.
///
/// Scheduled plans come overdue first, then by date ascending. Completed
/// and cancelled plans come newest first.
pub fn plan_views(
    snapshot: &Snapshot,
    status: Option<PlanStatus>,
    today: NaiveDate,
) -> Vec<PlanView> {
    let customers: HashMap<&str, &DbCustomer> = snapshot
        .customers
        .iter()
        .map(|c| (c.id.as_str(), c))
        .collect();

    let mut views: Vec<PlanView> = snapshot
        .plans
        .iter()
        .filter(|p| status.map_or(true, |s| p.status == s))
        .map(|p| to_view(p, &customers, today))
        .collect();

    views.sort_by(|a, b| {
        let live_a = a.plan.status == PlanStatus::Scheduled;
        let live_b = b.plan.status == PlanStatus::Scheduled;
        live_b
            .cmp(&live_a)
            .then_with(|| {
                if live_a && live_b {
                    b.overdue
                        .cmp(&a.overdue)
                        .then_with(|| a.plan.date.cmp(&b.plan.date))
                } else {
                    b.plan.date.cmp(&a.plan.date)
                }
            })
    });
    views
}

/// Scheduled plans dated `today`.
pub fn today_plans(snapshot: &Snapshot, today: NaiveDate) -> Vec<PlanView> {
    plan_views(snapshot, Some(PlanStatus::Scheduled), today)
        .into_iter()
        .filter(|v| v.plan.date == today)
        .collect()
}

/// Badge count for today's visits; does not build views.
pub fn today_plan_count(snapshot: &Snapshot, today: NaiveDate) -> usize {
    snapshot
        .plans
        .iter()
        .filter(|p| p.status == PlanStatus::Scheduled && p.date == today)
        .count()
}

/// Every plan of one customer, newest date first.
pub fn customer_plans(snapshot: &Snapshot, customer_id: &str) -> Vec<DbPlan> {
    let mut plans: Vec<DbPlan> = snapshot
        .plans
        .iter()
        .filter(|p| p.customer_id == customer_id)
        .cloned()
        .collect();
    plans.sort_by(|a, b| b.date.cmp(&a.date));
    plans
}
