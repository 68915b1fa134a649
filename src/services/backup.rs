// Backup export and restore.
//
// Export reads a snapshot and serializes it. Import validates the whole
// document first; only a fully valid backup reaches the single restore
// transaction, which clears and refills all four tables.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use serde::Serialize;

use crate::backup::{
    backup_file_name, build_document, parse_document, to_json, BackupDocument, ImportError,
    ImportLimits, ValidatedBackup,
};
use crate::db::{DbError, ServiceDb};
use crate::error::{ServiceError, ServiceResult};
use crate::notification::Notifier;

use super::report;

/// What a successful restore wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub version: u64,
    pub customers: usize,
    pub maintenance_records: usize,
    pub reminder_overrides: usize,
    pub plans: usize,
    pub dropped_plans: usize,
    /// Copy of the database taken just before the restore.
    pub safety_backup: Option<PathBuf>,
}

/// Every row of every table, stamped with the current time.
pub fn export_backup(db: &ServiceDb) -> ServiceResult<BackupDocument> {
    let snapshot = db.load_snapshot()?;
    Ok(build_document(snapshot, Utc::now()))
}

pub fn export_json(db: &ServiceDb) -> ServiceResult<String> {
    let document = export_backup(db)?;
    to_json(&document).map_err(|e| ServiceError::Store(DbError::Encode(e)))
}

/// Write `aquaservice-backup-YYYY-MM-DD.json` into `dir`, creating it if needed.
pub async fn write_backup_file(
    db: &ServiceDb,
    notifier: &dyn Notifier,
    dir: &Path,
    today: NaiveDate,
) -> ServiceResult<PathBuf> {
    match export_json(db) {
        Ok(json) => write_backup_json(notifier, json, dir, today).await,
        Err(e) => report(notifier, Err(e), |_: &PathBuf| String::new()),
    }
}

/// File half of [`write_backup_file`], for callers that must not hold the
/// database while the write is awaited.
pub async fn write_backup_json(
    notifier: &dyn Notifier,
    json: String,
    dir: &Path,
    today: NaiveDate,
) -> ServiceResult<PathBuf> {
    let result = async {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(backup_file_name(today));
        tokio::fs::write(&path, json).await?;
        log::info!("Backup exported to {}", path.display());
        Ok::<_, ServiceError>(path)
    }
    .await;
    report(notifier, result, |p| format!("Backup saved to {}", p.display()))
}

/// Replace the store contents with a validated backup, all or nothing.
pub fn restore(db: &ServiceDb, backup: &ValidatedBackup) -> ServiceResult<ImportSummary> {
    let safety_backup = crate::db_backup::pre_import_backup(db)?;
    let data = &backup.data;
    db.with_transaction(|tx| -> ServiceResult<()> {
        tx.clear_all_tables()?;
        for customer in &data.customers {
            tx.insert_customer(customer)?;
        }
        for record in &data.maintenance_records {
            tx.insert_maintenance_record(record)?;
        }
        for row in &data.reminder_overrides {
            tx.insert_override(row)?;
        }
        for plan in &data.plans {
            tx.insert_plan(plan)?;
        }
        Ok(())
    })?;

    let summary = ImportSummary {
        version: backup.version,
        customers: data.customers.len(),
        maintenance_records: data.maintenance_records.len(),
        reminder_overrides: data.reminder_overrides.len(),
        plans: data.plans.len(),
        dropped_plans: backup.dropped_plans,
        safety_backup,
    };
    log::info!(
        "Restored backup v{}: {} customers, {} records, {} snoozes, {} plans ({} plans dropped)",
        summary.version,
        summary.customers,
        summary.maintenance_records,
        summary.reminder_overrides,
        summary.plans,
        summary.dropped_plans
    );
    Ok(summary)
}

/// Validate `text` and, only if every check passes, restore it.
pub fn import_backup_json(
    db: &ServiceDb,
    notifier: &dyn Notifier,
    text: &str,
    limits: &ImportLimits,
) -> ServiceResult<ImportSummary> {
    let result = parse_document(text, limits, Utc::now())
        .map_err(|e| {
            log::warn!("Backup import rejected ({}): {}", e.kind(), e);
            ServiceError::from(e)
        })
        .and_then(|backup| restore(db, &backup));
    report(notifier, result, |s| {
        format!("Imported {} customers", s.customers)
    })
}

/// Read a backup file and import it. The size cap is checked before reading.
pub async fn import_backup_file(
    db: &ServiceDb,
    notifier: &dyn Notifier,
    path: &Path,
    limits: &ImportLimits,
) -> ServiceResult<ImportSummary> {
    match read_backup_file(path, limits).await {
        Ok(text) => import_backup_json(db, notifier, &text, limits),
        Err(e) => report(notifier, Err(e), |_: &ImportSummary| String::new()),
    }
}

/// Load a backup file as text, refusing it by metadata size before reading.
pub async fn read_backup_file(path: &Path, limits: &ImportLimits) -> ServiceResult<String> {
    let size = tokio::fs::metadata(path).await?.len();
    if size > limits.max_bytes as u64 {
        return Err(ServiceError::from(ImportError::Oversized {
            size: usize::try_from(size).unwrap_or(usize::MAX),
            limit: limits.max_bytes,
        }));
    }
    let bytes = tokio::fs::read(path).await?;
    String::from_utf8(bytes)
        .map_err(|_| ServiceError::from(ImportError::Malformed("file is not UTF-8".into())))
}
