//! Hot copies of the live SQLite file.
//!
//! Uses `rusqlite::backup::Backup` so the source database can stay open and
//! in use while it is copied. Taken before schema migrations and before a
//! JSON restore replaces every table.

use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::db::{DbError, ServiceDb};

/// Path of the main database file, or `None` for in-memory/temp databases.
pub(crate) fn database_file(conn: &Connection) -> Result<Option<PathBuf>, rusqlite::Error> {
    let db_path: String = conn.query_row("PRAGMA database_list", [], |row| row.get(2))?;
    if db_path.is_empty() || db_path == ":memory:" {
        return Ok(None);
    }
    Ok(Some(PathBuf::from(db_path)))
}

/// Copy all pages of `conn` into a fresh database at `dest`.
pub(crate) fn copy_database(conn: &Connection, dest: &Path) -> Result<(), rusqlite::Error> {
    let mut backup_conn = Connection::open(dest)?;
    let backup = rusqlite::backup::Backup::new(conn, &mut backup_conn)?;
    // Copy all pages in one step (small DB, a few MB at most)
    backup.step(-1)?;
    Ok(())
}

/// Write `<db_path>.<suffix>.bak` next to the live database.
///
/// Returns the backup path, or `None` when the database has no file.
pub(crate) fn backup_with_suffix(
    conn: &Connection,
    suffix: &str,
) -> Result<Option<PathBuf>, rusqlite::Error> {
    let Some(db_path) = database_file(conn)? else {
        return Ok(None);
    };
    let backup_path = PathBuf::from(format!("{}.{}.bak", db_path.display(), suffix));
    copy_database(conn, &backup_path)?;
    Ok(Some(backup_path))
}

/// Back up the live database to an explicit path.
pub fn backup_database(db: &ServiceDb, dest: &Path) -> Result<(), DbError> {
    copy_database(db.conn_ref(), dest)?;
    log::info!("Database backed up to {}", dest.display());
    Ok(())
}

/// Safety copy taken right before a restore clears every table.
pub fn pre_import_backup(db: &ServiceDb) -> Result<Option<PathBuf>, DbError> {
    let path = backup_with_suffix(db.conn_ref(), "pre-import")?;
    if let Some(ref p) = path {
        log::info!("Pre-import backup written to {}", p.display());
    }
    Ok(path)
}
