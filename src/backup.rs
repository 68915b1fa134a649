//! Backup document codec.
//!
//! Export writes every row of every table into one versioned JSON document.
//! Import treats the document as untrusted: it is size-checked, parsed into a
//! `serde_json::Value`, and then each entity kind goes through one explicit
//! schema pass that yields sanitized rows or a specific rejection. Nothing
//! here touches the store; applying a validated backup is the service
//! layer's job.
//!
//! Version history:
//! - 1: customers, maintenanceRecords, reminderOverrides
//! - 2: adds plans

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::dates::{format_iso, parse_iso_date};
use crate::db::{CycleMap, DbCustomer, DbMaintenanceRecord, DbPlan, DbReminderOverride, Snapshot};
use crate::types::{MaintenanceType, PlanStatus};

/// Schema version written by this build.
pub const BACKUP_VERSION: u64 = 2;
/// Oldest schema version this build still imports.
pub const MIN_SUPPORTED_VERSION: u64 = 1;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument {
    pub version: u64,
    pub exported_at: DateTime<Utc>,
    pub customers: Vec<DbCustomer>,
    pub maintenance_records: Vec<DbMaintenanceRecord>,
    pub reminder_overrides: Vec<DbReminderOverride>,
    pub plans: Vec<DbPlan>,
}

/// Default cap on the raw size of an imported document.
pub const DEFAULT_MAX_IMPORT_BYTES: usize = 10 * 1024 * 1024;
/// Default cap on rows per table in an imported document.
pub const DEFAULT_MAX_IMPORT_ROWS: usize = 50_000;

/// Hard caps applied before any row is inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportLimits {
    pub max_bytes: usize,
    /// Per table.
    pub max_rows: usize,
}

impl Default for ImportLimits {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_IMPORT_BYTES,
            max_rows: DEFAULT_MAX_IMPORT_ROWS,
        }
    }
}

/// Why an import was refused. Any of these aborts the whole import.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error("Backup file is not a valid backup document: {0}")]
    Malformed(String),

    #[error(
        "Backup version {found} is not supported (this build reads versions {} to {})",
        MIN_SUPPORTED_VERSION,
        BACKUP_VERSION
    )]
    UnsupportedVersion { found: String },

    #[error("Backup file is {size} bytes, larger than the {limit} byte limit")]
    Oversized { size: usize, limit: usize },

    #[error("Backup has {count} {table} rows, more than the {limit} row limit")]
    TooManyRecords {
        table: &'static str,
        count: usize,
        limit: usize,
    },

    #[error("Corrupt customer at position {index}: {reason}")]
    CorruptCustomer { index: usize, reason: String },

    #[error("Corrupt maintenance record at position {index}: {reason}")]
    CorruptMaintenanceRecord { index: usize, reason: String },

    #[error("Corrupt reminder override at position {index}: {reason}")]
    CorruptReminderOverride { index: usize, reason: String },

    #[error("{table} row {id} references unknown customer {customer_id}")]
    UnknownCustomerReference {
        table: &'static str,
        id: String,
        customer_id: String,
    },
}

impl ImportError {
    /// Stable category name shown to the user.
    pub fn kind(&self) -> &'static str {
        match self {
            ImportError::Malformed(_) => "malformed",
            ImportError::UnsupportedVersion { .. } => "unsupported_version",
            ImportError::Oversized { .. } => "oversized",
            ImportError::TooManyRecords { .. } => "too_many_records",
            ImportError::CorruptCustomer { .. }
            | ImportError::CorruptMaintenanceRecord { .. }
            | ImportError::CorruptReminderOverride { .. } => "corrupt_row",
            ImportError::UnknownCustomerReference { .. } => "dangling_reference",
        }
    }
}

/// A document that passed every check, ready to replace the store contents.
#[derive(Debug, Clone)]
pub struct ValidatedBackup {
    pub version: u64,
    pub data: Snapshot,
    /// Plan rows skipped as malformed or duplicated.
    pub dropped_plans: usize,
}

// =============================================================================
// Export
// =============================================================================

pub fn build_document(snapshot: Snapshot, exported_at: DateTime<Utc>) -> BackupDocument {
    BackupDocument {
        version: BACKUP_VERSION,
        exported_at,
        customers: snapshot.customers,
        maintenance_records: snapshot.maintenance_records,
        reminder_overrides: snapshot.reminder_overrides,
        plans: snapshot.plans,
    }
}

/// Pretty-printed UTF-8 JSON.
pub fn to_json(document: &BackupDocument) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(document)
}

/// `aquaservice-backup-YYYY-MM-DD.json`
pub fn backup_file_name(on: NaiveDate) -> String {
    format!("aquaservice-backup-{}.json", format_iso(on))
}

// =============================================================================
// Import
// =============================================================================

/// Validate and sanitize an untrusted backup document.
///
/// `now` fills in missing or unreadable timestamps.
pub fn parse_document(
    text: &str,
    limits: &ImportLimits,
    now: DateTime<Utc>,
) -> Result<ValidatedBackup, ImportError> {
    if text.len() > limits.max_bytes {
        return Err(ImportError::Oversized {
            size: text.len(),
            limit: limits.max_bytes,
        });
    }

    let root: Value =
        serde_json::from_str(text).map_err(|e| ImportError::Malformed(e.to_string()))?;
    let doc = root
        .as_object()
        .ok_or_else(|| ImportError::Malformed("top level is not an object".to_string()))?;

    let version = doc
        .get("version")
        .filter(|v| !is_blank_version(v))
        .ok_or_else(|| ImportError::Malformed("missing version".to_string()))?;
    let customers = required_array(doc, "customers")?;
    let records = required_array(doc, "maintenanceRecords")?;
    let overrides = match doc.get("reminderOverrides") {
        None | Some(Value::Null) => &[][..],
        Some(Value::Array(rows)) => rows.as_slice(),
        Some(_) => {
            return Err(ImportError::Malformed(
                "reminderOverrides is not an array".to_string(),
            ))
        }
    };
    let plans = match doc.get("plans") {
        None | Some(Value::Null) => &[][..],
        Some(Value::Array(rows)) => rows.as_slice(),
        Some(_) => {
            log::warn!("Backup plans field is not an array; importing without plans");
            &[][..]
        }
    };

    let version = match version.as_u64() {
        Some(v) if (MIN_SUPPORTED_VERSION..=BACKUP_VERSION).contains(&v) => v,
        _ => {
            return Err(ImportError::UnsupportedVersion {
                found: version.to_string(),
            })
        }
    };

    for (table, rows) in [
        ("customers", customers),
        ("maintenanceRecords", records),
        ("reminderOverrides", overrides),
        ("plans", plans),
    ] {
        if rows.len() > limits.max_rows {
            return Err(ImportError::TooManyRecords {
                table,
                count: rows.len(),
                limit: limits.max_rows,
            });
        }
    }

    let mut customer_ids: HashSet<String> = HashSet::with_capacity(customers.len());
    let mut clean_customers = Vec::with_capacity(customers.len());
    for (index, row) in customers.iter().enumerate() {
        let customer = sanitize_customer(row, now)
            .map_err(|reason| ImportError::CorruptCustomer { index, reason })?;
        if !customer_ids.insert(customer.id.clone()) {
            return Err(ImportError::CorruptCustomer {
                index,
                reason: format!("duplicate id {}", customer.id),
            });
        }
        clean_customers.push(customer);
    }

    let mut record_ids: HashSet<String> = HashSet::with_capacity(records.len());
    let mut clean_records = Vec::with_capacity(records.len());
    for (index, row) in records.iter().enumerate() {
        let record = sanitize_record(row, now)
            .map_err(|reason| ImportError::CorruptMaintenanceRecord { index, reason })?;
        if !record_ids.insert(record.id.clone()) {
            return Err(ImportError::CorruptMaintenanceRecord {
                index,
                reason: format!("duplicate id {}", record.id),
            });
        }
        clean_records.push(record);
    }

    let mut override_ids: HashSet<String> = HashSet::with_capacity(overrides.len());
    let mut clean_overrides = Vec::with_capacity(overrides.len());
    for (index, row) in overrides.iter().enumerate() {
        let o = sanitize_override(row, now)
            .map_err(|reason| ImportError::CorruptReminderOverride { index, reason })?;
        if !override_ids.insert(o.id.clone()) {
            return Err(ImportError::CorruptReminderOverride {
                index,
                reason: format!("duplicate id {}", o.id),
            });
        }
        clean_overrides.push(o);
    }

    let mut plan_ids: HashSet<String> = HashSet::with_capacity(plans.len());
    let mut clean_plans = Vec::with_capacity(plans.len());
    let mut dropped_plans = 0;
    for (index, row) in plans.iter().enumerate() {
        match sanitize_plan(row, &record_ids, now) {
            Ok(plan) if plan_ids.insert(plan.id.clone()) => clean_plans.push(plan),
            Ok(plan) => {
                log::warn!("Dropping duplicate plan {} at position {}", plan.id, index);
                dropped_plans += 1;
            }
            Err(reason) => {
                log::warn!("Dropping plan at position {}: {}", index, reason);
                dropped_plans += 1;
            }
        }
    }

    check_references(
        &customer_ids,
        clean_records
            .iter()
            .map(|r| ("maintenanceRecords", &r.id, &r.customer_id)),
    )?;
    check_references(
        &customer_ids,
        clean_overrides
            .iter()
            .map(|o| ("reminderOverrides", &o.id, &o.customer_id)),
    )?;
    check_references(
        &customer_ids,
        clean_plans.iter().map(|p| ("plans", &p.id, &p.customer_id)),
    )?;

    Ok(ValidatedBackup {
        version,
        data: Snapshot {
            customers: clean_customers,
            maintenance_records: clean_records,
            reminder_overrides: clean_overrides,
            plans: clean_plans,
        },
        dropped_plans,
    })
}

fn required_array<'a>(doc: &'a Map<String, Value>, key: &str) -> Result<&'a [Value], ImportError> {
    match doc.get(key) {
        Some(Value::Array(rows)) => Ok(rows.as_slice()),
        Some(_) => Err(ImportError::Malformed(format!("{key} is not an array"))),
        None => Err(ImportError::Malformed(format!("missing {key}"))),
    }
}

fn check_references<'a, I>(customer_ids: &HashSet<String>, rows: I) -> Result<(), ImportError>
where
    I: IntoIterator<Item = (&'static str, &'a String, &'a String)>,
{
    for (table, id, customer_id) in rows {
        if !customer_ids.contains(customer_id) {
            return Err(ImportError::UnknownCustomerReference {
                table,
                id: id.clone(),
                customer_id: customer_id.clone(),
            });
        }
    }
    Ok(())
}

// -----------------------------------------------------------------------------
// Per-entity schema passes. Each returns a clean row or the reason it failed.
// -----------------------------------------------------------------------------

fn as_object(row: &Value) -> Result<&Map<String, Value>, String> {
    row.as_object().ok_or_else(|| "row is not an object".to_string())
}

fn required_str(obj: &Map<String, Value>, key: &str) -> Result<String, String> {
    match obj.get(key).and_then(Value::as_str).map(str::trim) {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        Some(_) => Err(format!("{key} is empty")),
        None => Err(format!("{key} is missing or not a string")),
    }
}

fn optional_str(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn optional_nonempty(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// A `version` of null, zero, false or "" counts as absent.
fn is_blank_version(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Accepts `yyyy-MM-dd` or a full RFC 3339 timestamp. A timestamp keeps the
/// calendar day in its own offset.
fn date_value(value: Option<&Value>) -> Option<NaiveDate> {
    let raw = value?.as_str()?;
    parse_iso_date(raw).or_else(|| {
        DateTime::parse_from_rfc3339(raw.trim())
            .ok()
            .map(|dt| dt.date_naive())
    })
}

fn required_date(obj: &Map<String, Value>, key: &str) -> Result<NaiveDate, String> {
    date_value(obj.get(key)).ok_or_else(|| format!("{key} is not a valid calendar date"))
}

fn timestamp(obj: &Map<String, Value>, key: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    obj.get(key)
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(now)
}

fn positive_months(value: Option<&Value>) -> Option<u32> {
    value
        .and_then(Value::as_u64)
        .filter(|&m| m > 0)
        .and_then(|m| u32::try_from(m).ok())
}

/// Unknown type keys and non-integer values are dropped.
fn cycle_map(value: Option<&Value>) -> Option<CycleMap> {
    let obj = value?.as_object()?;
    let map: CycleMap = obj
        .iter()
        .filter_map(|(key, months)| {
            let kind = key.parse::<MaintenanceType>().ok()?;
            let months = u32::try_from(months.as_u64()?).ok()?;
            Some((kind, months))
        })
        .collect::<BTreeMap<_, _>>();
    if map.is_empty() {
        None
    } else {
        Some(map)
    }
}

fn sanitize_customer(row: &Value, now: DateTime<Utc>) -> Result<DbCustomer, String> {
    let obj = as_object(row)?;
    let created_at = timestamp(obj, "createdAt", now);
    Ok(DbCustomer {
        id: required_str(obj, "id")?,
        name: required_str(obj, "name")?,
        phone: required_str(obj, "phone")?,
        address: optional_str(obj, "address"),
        installation_date: required_date(obj, "installationDate")?,
        notes: optional_str(obj, "notes"),
        device_model: optional_nonempty(obj, "deviceModel"),
        device_serial: optional_nonempty(obj, "deviceSerial"),
        maintenance_cycle_months: positive_months(obj.get("maintenanceCycleMonths")),
        maintenance_cycles: cycle_map(obj.get("maintenanceCycles")),
        active: obj.get("active").and_then(Value::as_bool).unwrap_or(true),
        created_at,
        updated_at: obj
            .get("updatedAt")
            .map(|_| timestamp(obj, "updatedAt", now))
            .unwrap_or(created_at),
    })
}

fn sanitize_record(row: &Value, now: DateTime<Utc>) -> Result<DbMaintenanceRecord, String> {
    let obj = as_object(row)?;
    let maintenance_type = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| "type is missing or not a string".to_string())?
        .parse::<MaintenanceType>()
        .map_err(|e| e.to_string())?;
    Ok(DbMaintenanceRecord {
        id: required_str(obj, "id")?,
        customer_id: required_str(obj, "customerId")?,
        date: required_date(obj, "date")?,
        maintenance_type,
        notes: optional_str(obj, "notes"),
        cost: obj
            .get("cost")
            .and_then(Value::as_f64)
            .filter(|c| c.is_finite() && *c >= 0.0),
        created_at: timestamp(obj, "createdAt", now),
    })
}

fn sanitize_override(row: &Value, now: DateTime<Utc>) -> Result<DbReminderOverride, String> {
    let obj = as_object(row)?;
    let snoozed_until = required_date(obj, "snoozedUntil")?;
    Ok(DbReminderOverride {
        id: required_str(obj, "id")?,
        customer_id: required_str(obj, "customerId")?,
        original_due_date: date_value(obj.get("originalDueDate")).unwrap_or(snoozed_until),
        snoozed_until,
        reason: optional_str(obj, "reason"),
        created_at: timestamp(obj, "createdAt", now),
    })
}

/// Plans are optional data: a bad row is reported and skipped by the caller.
/// A completed plan pointing at a record absent from the backup loses the link.
fn sanitize_plan(
    row: &Value,
    record_ids: &HashSet<String>,
    now: DateTime<Utc>,
) -> Result<DbPlan, String> {
    let obj = as_object(row)?;
    let status = obj
        .get("status")
        .and_then(Value::as_str)
        .ok_or_else(|| "status is missing or not a string".to_string())?
        .parse::<PlanStatus>()
        .map_err(|e| e.to_string())?;
    let created_at = timestamp(obj, "createdAt", now);
    Ok(DbPlan {
        id: required_str(obj, "id")?,
        customer_id: required_str(obj, "customerId")?,
        date: required_date(obj, "date")?,
        notes: optional_str(obj, "notes"),
        status,
        maintenance_record_id: optional_nonempty(obj, "maintenanceRecordId")
            .filter(|id| record_ids.contains(id)),
        created_at,
        updated_at: obj
            .get("updatedAt")
            .map(|_| timestamp(obj, "updatedAt", now))
            .unwrap_or(created_at),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::db::test_utils::{date, sample_customer, sample_override, sample_plan, sample_record, ts};

    fn parse(value: Value) -> Result<ValidatedBackup, ImportError> {
        parse_document(&value.to_string(), &ImportLimits::default(), ts(0))
    }

    fn minimal_customer(id: &str) -> Value {
        json!({
            "id": id,
            "name": "Ayse",
            "phone": "0532 111 22 33",
            "installationDate": "2024-01-15"
        })
    }

    #[test]
    fn test_export_document_shape() {
        let snapshot = Snapshot {
            customers: vec![sample_customer("c1", "Ayse")],
            maintenance_records: vec![sample_record("m1", "c1", "2024-06-01")],
            reminder_overrides: vec![sample_override("o1", "c1", "2025-03-01", 1)],
            plans: vec![sample_plan("p1", "c1", "2025-02-01")],
        };
        let json = to_json(&build_document(snapshot, ts(30))).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["version"], json!(2));
        assert_eq!(value["customers"][0]["installationDate"], json!("2024-01-15"));
        assert_eq!(value["maintenanceRecords"][0]["type"], json!("filter_replacement"));
        assert_eq!(value["reminderOverrides"][0]["snoozedUntil"], json!("2025-03-01"));
        assert_eq!(value["plans"][0]["status"], json!("scheduled"));
        assert!(json.contains('\n'), "export should be pretty-printed");
    }

    #[test]
    fn test_backup_file_name_has_date() {
        assert_eq!(
            backup_file_name(date("2025-03-07")),
            "aquaservice-backup-2025-03-07.json"
        );
    }

    #[test]
    fn test_version_one_without_plans_imports() {
        let backup = parse(json!({
            "version": 1,
            "exportedAt": "2024-12-01T10:00:00Z",
            "customers": [minimal_customer("c1")],
            "maintenanceRecords": [{
                "id": "m1", "customerId": "c1", "date": "2024-06-01", "type": "repair"
            }],
            "reminderOverrides": []
        }))
        .expect("v1 document should import");
        assert_eq!(backup.version, 1);
        assert!(backup.data.plans.is_empty());
        assert_eq!(backup.dropped_plans, 0);

        let customer = &backup.data.customers[0];
        assert_eq!(customer.address, "");
        assert!(customer.active);
        assert_eq!(customer.created_at, ts(0));
        assert_eq!(backup.data.maintenance_records[0].maintenance_type, MaintenanceType::Repair);
    }

    #[test]
    fn test_overrides_field_may_be_absent() {
        let backup = parse(json!({
            "version": 2,
            "customers": [],
            "maintenanceRecords": []
        }))
        .unwrap();
        assert!(backup.data.reminder_overrides.is_empty());
    }

    #[test]
    fn test_malformed_documents() {
        for doc in [
            json!([1, 2, 3]),
            json!({"customers": [], "maintenanceRecords": []}),
            json!({"version": null, "customers": [], "maintenanceRecords": []}),
            json!({"version": 0, "customers": [], "maintenanceRecords": []}),
            json!({"version": 2, "maintenanceRecords": []}),
            json!({"version": 2, "customers": {}, "maintenanceRecords": []}),
            json!({"version": 2, "customers": [], "maintenanceRecords": [], "reminderOverrides": 5}),
        ] {
            let err = parse(doc).unwrap_err();
            assert_eq!(err.kind(), "malformed", "{err}");
        }
        let err = parse_document("{not json", &ImportLimits::default(), ts(0)).unwrap_err();
        assert_eq!(err.kind(), "malformed");
    }

    #[test]
    fn test_unsupported_versions() {
        for version in [json!(3), json!("2"), json!(1.5), json!(-1)] {
            let err = parse(json!({
                "version": version,
                "customers": [],
                "maintenanceRecords": []
            }))
            .unwrap_err();
            assert_eq!(err.kind(), "unsupported_version", "{err}");
        }
    }

    #[test]
    fn test_size_and_row_caps() {
        let doc = json!({
            "version": 2,
            "customers": [minimal_customer("c1"), minimal_customer("c2")],
            "maintenanceRecords": []
        })
        .to_string();

        let tiny = ImportLimits {
            max_bytes: 16,
            max_rows: 100,
        };
        assert!(matches!(
            parse_document(&doc, &tiny, ts(0)),
            Err(ImportError::Oversized { limit: 16, .. })
        ));

        let one_row = ImportLimits {
            max_bytes: 1024 * 1024,
            max_rows: 1,
        };
        assert_eq!(
            parse_document(&doc, &one_row, ts(0)).unwrap_err(),
            ImportError::TooManyRecords {
                table: "customers",
                count: 2,
                limit: 1,
            }
        );
    }

    #[test]
    fn test_corrupt_customer_rejects_everything() {
        let mut bad_date = minimal_customer("c2");
        bad_date["installationDate"] = json!("2024-02-30");
        let mut no_phone = minimal_customer("c3");
        no_phone.as_object_mut().unwrap().remove("phone");

        for bad in [bad_date, no_phone, json!("c4")] {
            let err = parse(json!({
                "version": 2,
                "customers": [minimal_customer("c1"), bad],
                "maintenanceRecords": []
            }))
            .unwrap_err();
            assert!(matches!(err, ImportError::CorruptCustomer { index: 1, .. }), "{err}");
        }
    }

    #[test]
    fn test_duplicate_customer_ids_rejected() {
        let err = parse(json!({
            "version": 2,
            "customers": [minimal_customer("c1"), minimal_customer("c1")],
            "maintenanceRecords": []
        }))
        .unwrap_err();
        assert_eq!(err.kind(), "corrupt_row");
    }

    #[test]
    fn test_corrupt_record_rejects_everything() {
        for record in [
            json!({"id": "m1", "customerId": "c1", "date": "2024-06-01", "type": "descaling"}),
            json!({"id": "m1", "customerId": "c1", "date": "June 1st", "type": "repair"}),
            json!({"id": "m1", "date": "2024-06-01", "type": "repair"}),
        ] {
            let err = parse(json!({
                "version": 2,
                "customers": [minimal_customer("c1")],
                "maintenanceRecords": [record]
            }))
            .unwrap_err();
            assert!(matches!(err, ImportError::CorruptMaintenanceRecord { index: 0, .. }));
        }
    }

    #[test]
    fn test_dangling_references_rejected() {
        let err = parse(json!({
            "version": 2,
            "customers": [minimal_customer("c1")],
            "maintenanceRecords": [
                {"id": "m1", "customerId": "ghost", "date": "2024-06-01", "type": "repair"}
            ]
        }))
        .unwrap_err();
        assert_eq!(
            err,
            ImportError::UnknownCustomerReference {
                table: "maintenanceRecords",
                id: "m1".to_string(),
                customer_id: "ghost".to_string(),
            }
        );

        let err = parse(json!({
            "version": 2,
            "customers": [minimal_customer("c1")],
            "maintenanceRecords": [],
            "reminderOverrides": [{"id": "o1", "customerId": "ghost", "snoozedUntil": "2025-01-01"}]
        }))
        .unwrap_err();
        assert_eq!(err.kind(), "dangling_reference");

        let err = parse(json!({
            "version": 2,
            "customers": [minimal_customer("c1")],
            "maintenanceRecords": [],
            "plans": [{"id": "p1", "customerId": "ghost", "date": "2025-01-01", "status": "scheduled"}]
        }))
        .unwrap_err();
        assert_eq!(err.kind(), "dangling_reference");
    }

    #[test]
    fn test_bad_plans_are_dropped_not_fatal() {
        let backup = parse(json!({
            "version": 2,
            "customers": [minimal_customer("c1")],
            "maintenanceRecords": [
                {"id": "m1", "customerId": "c1", "date": "2024-06-01", "type": "repair"}
            ],
            "plans": [
                {"id": "p1", "customerId": "c1", "date": "2025-01-01", "status": "scheduled"},
                {"id": "p2", "customerId": "c1", "date": "2025-01-01", "status": "postponed"},
                {"id": "p3", "customerId": "c1", "status": "scheduled"},
                {"id": "p1", "customerId": "c1", "date": "2025-02-01", "status": "scheduled"},
                {"id": "p4", "customerId": "c1", "date": "2024-06-01", "status": "completed",
                 "maintenanceRecordId": "m1"},
                {"id": "p5", "customerId": "c1", "date": "2024-05-01", "status": "completed",
                 "maintenanceRecordId": "gone"},
                42
            ]
        }))
        .unwrap();
        let ids: Vec<&str> = backup.data.plans.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p4", "p5"]);
        assert_eq!(backup.dropped_plans, 4);
        assert_eq!(backup.data.plans[1].maintenance_record_id.as_deref(), Some("m1"));
        assert_eq!(backup.data.plans[2].maintenance_record_id, None);
    }

    #[test]
    fn test_optional_fields_sanitized() {
        let mut customer = minimal_customer("c1");
        customer["maintenanceCycleMonths"] = json!(0);
        customer["maintenanceCycles"] = json!({
            "filter_replacement": 6,
            "descaling": 3,
            "repair": "soon"
        });
        customer["active"] = json!(false);
        customer["createdAt"] = json!("2024-01-15T08:30:00Z");

        let backup = parse(json!({
            "version": 2,
            "customers": [customer],
            "maintenanceRecords": [
                {"id": "m1", "customerId": "c1", "date": "2024-06-01", "type": "repair", "cost": -5},
                {"id": "m2", "customerId": "c1", "date": "2024-07-01T09:00:00Z", "type": "repair", "cost": 120.5}
            ],
            "reminderOverrides": [
                {"id": "o1", "customerId": "c1", "snoozedUntil": "2025-02-01", "createdAt": "garbage"}
            ]
        }))
        .unwrap();

        let customer = &backup.data.customers[0];
        assert_eq!(customer.maintenance_cycle_months, None);
        let cycles = customer.maintenance_cycles.as_ref().unwrap();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[&MaintenanceType::FilterReplacement], 6);
        assert!(!customer.active);
        assert_eq!(customer.updated_at, customer.created_at);

        assert_eq!(backup.data.maintenance_records[0].cost, None);
        assert_eq!(backup.data.maintenance_records[1].cost, Some(120.5));
        assert_eq!(backup.data.maintenance_records[1].date, date("2024-07-01"));

        let o = &backup.data.reminder_overrides[0];
        assert_eq!(o.original_due_date, date("2025-02-01"));
        assert_eq!(o.created_at, ts(0));
    }

    #[test]
    fn test_timestamp_dates_keep_their_written_day() {
        let backup = parse(json!({
            "version": 2,
            "customers": [{
                "id": "c1", "name": "Ayse", "phone": "0532",
                "installationDate": "2024-01-15T23:30:00-05:00"
            }],
            "maintenanceRecords": [
                {"id": "m1", "customerId": "c1", "date": "2024-07-01T00:30:00+03:00", "type": "repair"}
            ]
        }))
        .unwrap();
        assert_eq!(backup.data.customers[0].installation_date, date("2024-01-15"));
        assert_eq!(backup.data.maintenance_records[0].date, date("2024-07-01"));
    }
}
