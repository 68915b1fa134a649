//! AquaService: field-service tracking for water-treatment maintenance.
//!
//! Pure derivations (`dates`, `due`, `status`, `snooze`, `dashboard`,
//! `plans`, `backup`) work over an explicit [`db::Snapshot`]. The `services`
//! layer validates input, writes through [`db::ServiceDb`], and reports
//! outcomes to a [`notification::Notifier`].

pub mod backup;
pub mod dashboard;
pub mod dates;
pub mod db;
pub mod db_backup;
pub mod due;
pub mod error;
mod migrations;
pub mod notification;
pub mod plans;
pub mod services;
pub mod snooze;
pub mod state;
pub mod status;
pub mod types;
