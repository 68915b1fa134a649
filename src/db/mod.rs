//! SQLite-backed local store for customers, maintenance history, snoozes and plans.
//!
//! The database lives at `~/.aquaservice/aquaservice.db` unless the config
//! names another path. It is the only persistence layer: there is no server
//! and no sync. Multi-table writes (cascading delete, plan completion,
//! backup restore) go through [`ServiceDb::with_transaction`] so readers never
//! observe a half-applied change.

use std::path::{Path, PathBuf};

use rusqlite::Connection;

pub mod types;
pub use types::*;

pub mod customers;
pub mod maintenance;
pub mod overrides;
pub mod plans;

pub(crate) const CUSTOMER_COLUMNS: &str = "id, name, phone, address, installation_date, notes,
     device_model, device_serial, maintenance_cycle_months, maintenance_cycles, active,
     created_at, updated_at";

pub(crate) const MAINTENANCE_COLUMNS: &str =
    "id, customer_id, date, maintenance_type, notes, cost, created_at";

pub(crate) const OVERRIDE_COLUMNS: &str =
    "id, customer_id, original_due_date, snoozed_until, reason, created_at";

pub(crate) const PLAN_COLUMNS: &str =
    "id, customer_id, date, notes, status, maintenance_record_id, created_at, updated_at";

pub struct ServiceDb {
    conn: Connection,
}

impl ServiceDb {
    /// Borrow the underlying connection for ad-hoc queries.
    pub fn conn_ref(&self) -> &Connection {
        &self.conn
    }

    /// Execute a closure within a SQLite transaction.
    /// Commits on Ok, rolls back on Err.
    pub fn with_transaction<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<DbError>,
    {
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(DbError::from)?;
        match f(self) {
            Ok(val) => {
                if let Err(e) = self.conn.execute_batch("COMMIT") {
                    let _ = self.conn.execute_batch("ROLLBACK");
                    return Err(DbError::from(e).into());
                }
                Ok(val)
            }
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    /// Open (or create) the database at the default location and apply the schema.
    pub fn open() -> Result<Self, DbError> {
        let path = Self::default_path()?;
        Self::open_at(path)
    }

    /// Open a database at an explicit path.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(DbError::CreateDir)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        crate::migrations::run_migrations(&conn).map_err(DbError::Migration)?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        Ok(Self { conn })
    }

    /// Resolve the default database path: `~/.aquaservice/aquaservice.db`.
    pub fn default_path() -> Result<PathBuf, DbError> {
        let home = dirs::home_dir().ok_or(DbError::HomeDirNotFound)?;
        Ok(home.join(".aquaservice").join("aquaservice.db"))
    }

    /// Read every table in full: one scan per table, four in total.
    pub fn load_snapshot(&self) -> Result<Snapshot, DbError> {
        Ok(Snapshot {
            customers: self.get_all_customers()?,
            maintenance_records: self.get_all_maintenance_records()?,
            reminder_overrides: self.get_all_overrides()?,
            plans: self.get_all_plans()?,
        })
    }

    /// Empty all four tables. Children first so FK checks hold at each step.
    ///
    /// Callers must run this inside [`ServiceDb::with_transaction`].
    pub fn clear_all_tables(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "DELETE FROM plans;
             DELETE FROM reminder_overrides;
             DELETE FROM maintenance_records;
             DELETE FROM customers;",
        )?;
        Ok(())
    }

    /// Row count for a table, used by tests and the import summary.
    pub fn count_rows(&self, table: &str) -> Result<usize, DbError> {
        let known = [
            "customers",
            "maintenance_records",
            "reminder_overrides",
            "plans",
        ];
        if !known.contains(&table) {
            return Err(DbError::Sqlite(rusqlite::Error::InvalidParameterName(
                table.to_string(),
            )));
        }
        let count: i64 =
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

// =============================================================================
// Shared test utilities
// =============================================================================


// =============================================================================
// Tests
// =============================================================================
