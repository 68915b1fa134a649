use rusqlite::params;

use super::*;

impl ServiceDb {
    // =========================================================================
    // Customers
    // =========================================================================

    /// Insert a new customer row.
    pub fn insert_customer(&self, customer: &DbCustomer) -> Result<(), DbError> {
        let cycles = encode_cycle_map(customer.maintenance_cycles.as_ref())?;
        self.conn.execute(
            "INSERT INTO customers (
                id, name, phone, address, installation_date, notes,
                device_model, device_serial, maintenance_cycle_months, maintenance_cycles,
                active, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                customer.id,
                customer.name,
                customer.phone,
                customer.address,
                customer.installation_date,
                customer.notes,
                customer.device_model,
                customer.device_serial,
                customer.maintenance_cycle_months,
                cycles,
                customer.active as i32,
                customer.created_at,
                customer.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Overwrite every mutable column of an existing customer.
    ///
    /// Returns `false` if no customer has this id. `created_at` is never touched.
    pub fn update_customer(&self, customer: &DbCustomer) -> Result<bool, DbError> {
        let cycles = encode_cycle_map(customer.maintenance_cycles.as_ref())?;
        let rows = self.conn.execute(
            "UPDATE customers SET
                name = ?2,
                phone = ?3,
                address = ?4,
                installation_date = ?5,
                notes = ?6,
                device_model = ?7,
                device_serial = ?8,
                maintenance_cycle_months = ?9,
                maintenance_cycles = ?10,
                active = ?11,
                updated_at = ?12
             WHERE id = ?1",
            params![
                customer.id,
                customer.name,
                customer.phone,
                customer.address,
                customer.installation_date,
                customer.notes,
                customer.device_model,
                customer.device_serial,
                customer.maintenance_cycle_months,
                cycles,
                customer.active as i32,
                customer.updated_at,
            ],
        )?;
        Ok(rows > 0)
    }

    /// Flip the active flag. Returns `false` if no customer matched.
    pub fn set_customer_active(
        &self,
        id: &str,
        active: bool,
        updated_at: &chrono::DateTime<chrono::Utc>,
    ) -> Result<bool, DbError> {
        let rows = self.conn.execute(
            "UPDATE customers SET active = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, active as i32, updated_at],
        )?;
        Ok(rows > 0)
    }

    /// Get a customer by ID.
    pub fn get_customer(&self, id: &str) -> Result<Option<DbCustomer>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1"
        ))?;

        let mut rows = stmt.query_map(params![id], map_customer_row)?;

        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Get all customers, ordered by name.
    pub fn get_all_customers(&self) -> Result<Vec<DbCustomer>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY name, id"
        ))?;
        let rows = stmt.query_map([], map_customer_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Remove a customer together with its maintenance records, snoozes and plans.
    ///
    /// Callers must run this inside [`ServiceDb::with_transaction`]; on its own
    /// each DELETE commits separately. Returns `None` if the customer is unknown.
    pub fn delete_customer_cascade(&self, id: &str) -> Result<Option<CascadeSummary>, DbError> {
        let exists = self
            .conn
            .prepare("SELECT 1 FROM customers WHERE id = ?1")?
            .exists(params![id])?;
        if !exists {
            return Ok(None);
        }

        let plans = self
            .conn
            .execute("DELETE FROM plans WHERE customer_id = ?1", params![id])?;
        let reminder_overrides = self.conn.execute(
            "DELETE FROM reminder_overrides WHERE customer_id = ?1",
            params![id],
        )?;
        let maintenance_records = self.conn.execute(
            "DELETE FROM maintenance_records WHERE customer_id = ?1",
            params![id],
        )?;
        self.conn
            .execute("DELETE FROM customers WHERE id = ?1", params![id])?;

        Ok(Some(CascadeSummary {
            maintenance_records,
            reminder_overrides,
            plans,
        }))
    }
}
