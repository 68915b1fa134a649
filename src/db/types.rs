//! Shared type definitions for the database layer.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{MaintenanceType, PlanStatus};

/// Errors specific to database operations.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Failed to create database directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Schema migration failed: {0}")]
    Migration(String),

    #[error("Failed to encode column value: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Per-type cycle lengths in months. A zero entry disables that type.
pub type CycleMap = BTreeMap<MaintenanceType, u32>;

/// A row from the `customers` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbCustomer {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub address: String,
    pub installation_date: NaiveDate,
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_serial: Option<String>,
    /// Global cycle for this customer; the configured default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_cycle_months: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_cycles: Option<CycleMap>,
    #[serde(default = "default_active")]
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl DbCustomer {
    /// Effective global cycle length in months.
    pub fn cycle_months(&self, default_months: u32) -> u32 {
        match self.maintenance_cycle_months {
            Some(months) if months > 0 => months,
            _ => default_months,
        }
    }
}

/// A row from the `maintenance_records` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbMaintenanceRecord {
    pub id: String,
    pub customer_id: String,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub maintenance_type: MaintenanceType,
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// A row from the `reminder_overrides` table (a snooze).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbReminderOverride {
    pub id: String,
    pub customer_id: String,
    pub original_due_date: NaiveDate,
    pub snoozed_until: NaiveDate,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// A row from the `plans` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbPlan {
    pub id: String,
    pub customer_id: String,
    pub date: NaiveDate,
    pub notes: String,
    pub status: PlanStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_record_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Every row of every table, read in one scan per table.
///
/// Read-side derivations take a snapshot instead of a connection so they
/// stay pure and can be re-run whenever the caller sees a table change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub customers: Vec<DbCustomer>,
    pub maintenance_records: Vec<DbMaintenanceRecord>,
    pub reminder_overrides: Vec<DbReminderOverride>,
    pub plans: Vec<DbPlan>,
}

/// Rows removed by a cascading customer delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeSummary {
    pub maintenance_records: usize,
    pub reminder_overrides: usize,
    pub plans: usize,
}

impl ToSql for MaintenanceType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for MaintenanceType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for PlanStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for PlanStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// Decode the JSON `maintenance_cycles` column. Empty maps read as `None`.
pub(crate) fn decode_cycle_map(
    idx: usize,
    raw: Option<String>,
) -> rusqlite::Result<Option<CycleMap>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let map: CycleMap = serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(if map.is_empty() { None } else { Some(map) })
}

pub(crate) fn encode_cycle_map(map: Option<&CycleMap>) -> Result<Option<String>, DbError> {
    match map {
        Some(map) if !map.is_empty() => Ok(Some(serde_json::to_string(map)?)),
        _ => Ok(None),
    }
}

/// Row mapper for customer SELECT queries (13 columns, see `CUSTOMER_COLUMNS`).
pub(crate) fn map_customer_row(row: &rusqlite::Row) -> rusqlite::Result<DbCustomer> {
    Ok(DbCustomer {
        id: row.get(0)?,
        name: row.get(1)?,
        phone: row.get(2)?,
        address: row.get(3)?,
        installation_date: row.get(4)?,
        notes: row.get(5)?,
        device_model: row.get(6)?,
        device_serial: row.get(7)?,
        maintenance_cycle_months: row.get(8)?,
        maintenance_cycles: decode_cycle_map(9, row.get(9)?)?,
        active: row.get::<_, i32>(10)? != 0,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

pub(crate) fn map_maintenance_row(row: &rusqlite::Row) -> rusqlite::Result<DbMaintenanceRecord> {
    Ok(DbMaintenanceRecord {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        date: row.get(2)?,
        maintenance_type: row.get(3)?,
        notes: row.get(4)?,
        cost: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub(crate) fn map_override_row(row: &rusqlite::Row) -> rusqlite::Result<DbReminderOverride> {
    Ok(DbReminderOverride {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        original_due_date: row.get(2)?,
        snoozed_until: row.get(3)?,
        reason: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub(crate) fn map_plan_row(row: &rusqlite::Row) -> rusqlite::Result<DbPlan> {
    Ok(DbPlan {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        date: row.get(2)?,
        notes: row.get(3)?,
        status: row.get(4)?,
        maintenance_record_id: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}
