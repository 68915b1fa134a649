use rusqlite::params;

use super::*;

impl ServiceDb {
    // =========================================================================
    // Maintenance records
    // =========================================================================

    pub fn insert_maintenance_record(&self, record: &DbMaintenanceRecord) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO maintenance_records (
                id, customer_id, date, maintenance_type, notes, cost, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.id,
                record.customer_id,
                record.date,
                record.maintenance_type,
                record.notes,
                record.cost,
                record.created_at,
            ],
        )?;
        Ok(())
    }

    /// Delete one record. Returns `false` if it did not exist.
    pub fn delete_maintenance_record(&self, id: &str) -> Result<bool, DbError> {
        let rows = self
            .conn
            .execute("DELETE FROM maintenance_records WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    pub fn get_maintenance_record(&self, id: &str) -> Result<Option<DbMaintenanceRecord>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MAINTENANCE_COLUMNS} FROM maintenance_records WHERE id = ?1"
        ))?;
        let mut rows = stmt.query_map(params![id], map_maintenance_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// A customer's service history, most recent first.
    pub fn get_records_for_customer(
        &self,
        customer_id: &str,
    ) -> Result<Vec<DbMaintenanceRecord>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MAINTENANCE_COLUMNS} FROM maintenance_records
             WHERE customer_id = ?1
             ORDER BY date DESC, created_at DESC"
        ))?;
        let rows = stmt.query_map(params![customer_id], map_maintenance_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Full table scan in insertion order.
    pub fn get_all_maintenance_records(&self) -> Result<Vec<DbMaintenanceRecord>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MAINTENANCE_COLUMNS} FROM maintenance_records ORDER BY rowid"
        ))?;
        let rows = stmt.query_map([], map_maintenance_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
