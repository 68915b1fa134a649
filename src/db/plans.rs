use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::params;

use super::*;

impl ServiceDb {
    // =========================================================================
    // Plans (scheduled visits)
    // =========================================================================

    pub fn insert_plan(&self, plan: &DbPlan) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO plans (
                id, customer_id, date, notes, status, maintenance_record_id,
                created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                plan.id,
                plan.customer_id,
                plan.date,
                plan.notes,
                plan.status,
                plan.maintenance_record_id,
                plan.created_at,
                plan.updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_plan(&self, id: &str) -> Result<Option<DbPlan>, DbError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {PLAN_COLUMNS} FROM plans WHERE id = ?1"))?;
        let mut rows = stmt.query_map(params![id], map_plan_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Move a scheduled plan to a new date.
    ///
    /// The status guard lives in the WHERE clause, so a plan that is no
    /// longer scheduled is left alone and `false` is returned.
    pub fn update_plan_date(
        &self,
        id: &str,
        date: NaiveDate,
        updated_at: &DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let rows = self.conn.execute(
            "UPDATE plans SET date = ?2, updated_at = ?3
             WHERE id = ?1 AND status = 'scheduled'",
            params![id, date, updated_at],
        )?;
        Ok(rows > 0)
    }

    /// Mark a scheduled plan cancelled. Returns `false` if it was not scheduled.
    pub fn mark_plan_cancelled(&self, id: &str, updated_at: &DateTime<Utc>) -> Result<bool, DbError> {
        let rows = self.conn.execute(
            "UPDATE plans SET status = 'cancelled', updated_at = ?2
             WHERE id = ?1 AND status = 'scheduled'",
            params![id, updated_at],
        )?;
        Ok(rows > 0)
    }

    /// Mark a scheduled plan completed and link the record that closed it.
    pub fn mark_plan_completed(
        &self,
        id: &str,
        maintenance_record_id: &str,
        updated_at: &DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let rows = self.conn.execute(
            "UPDATE plans SET status = 'completed', maintenance_record_id = ?2, updated_at = ?3
             WHERE id = ?1 AND status = 'scheduled'",
            params![id, maintenance_record_id, updated_at],
        )?;
        Ok(rows > 0)
    }

    pub fn get_plans_for_customer(&self, customer_id: &str) -> Result<Vec<DbPlan>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans WHERE customer_id = ?1 ORDER BY date DESC"
        ))?;
        let rows = stmt.query_map(params![customer_id], map_plan_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn get_all_plans(&self) -> Result<Vec<DbPlan>, DbError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {PLAN_COLUMNS} FROM plans ORDER BY rowid"))?;
        let rows = stmt.query_map([], map_plan_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
