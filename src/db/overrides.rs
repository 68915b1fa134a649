use rusqlite::params;

use super::*;

impl ServiceDb {
    // =========================================================================
    // Reminder overrides (snoozes)
    // =========================================================================

    /// Append a snooze. Earlier snoozes for the customer stay as history.
    pub fn insert_override(&self, row: &DbReminderOverride) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO reminder_overrides (
                id, customer_id, original_due_date, snoozed_until, reason, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                row.id,
                row.customer_id,
                row.original_due_date,
                row.snoozed_until,
                row.reason,
                row.created_at,
            ],
        )?;
        Ok(())
    }

    /// A customer's snooze history, oldest first.
    pub fn get_overrides_for_customer(
        &self,
        customer_id: &str,
    ) -> Result<Vec<DbReminderOverride>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {OVERRIDE_COLUMNS} FROM reminder_overrides
             WHERE customer_id = ?1
             ORDER BY created_at, rowid"
        ))?;
        let rows = stmt.query_map(params![customer_id], map_override_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn get_all_overrides(&self) -> Result<Vec<DbReminderOverride>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {OVERRIDE_COLUMNS} FROM reminder_overrides ORDER BY rowid"
        ))?;
        let rows = stmt.query_map([], map_override_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
