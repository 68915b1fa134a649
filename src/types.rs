use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backup::{DEFAULT_MAX_IMPORT_BYTES, DEFAULT_MAX_IMPORT_ROWS};
use crate::due::DEFAULT_CYCLE_MONTHS;
use crate::status::{DUE_SOON_DAYS, UPCOMING_DAYS};

/// Raised when a stored or imported string is not a known enum value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} value: {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Closed set of service types a technician can record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceType {
    FilterReplacement,
    MembraneReplacement,
    GeneralMaintenance,
    Repair,
    Other,
}

impl MaintenanceType {
    pub const ALL: [MaintenanceType; 5] = [
        MaintenanceType::FilterReplacement,
        MaintenanceType::MembraneReplacement,
        MaintenanceType::GeneralMaintenance,
        MaintenanceType::Repair,
        MaintenanceType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MaintenanceType::FilterReplacement => "filter_replacement",
            MaintenanceType::MembraneReplacement => "membrane_replacement",
            MaintenanceType::GeneralMaintenance => "general_maintenance",
            MaintenanceType::Repair => "repair",
            MaintenanceType::Other => "other",
        }
    }
}

impl FromStr for MaintenanceType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MaintenanceType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "maintenance type",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for MaintenanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Urgency tier derived from the signed day count until the effective due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceStatus {
    Overdue,
    DueSoon,
    Upcoming,
    Ok,
}

impl MaintenanceStatus {
    /// Sort rank used by the dashboard: most urgent first.
    pub fn priority(&self) -> u8 {
        match self {
            MaintenanceStatus::Overdue => 0,
            MaintenanceStatus::DueSoon => 1,
            MaintenanceStatus::Upcoming => 2,
            MaintenanceStatus::Ok => 3,
        }
    }
}

/// Lifecycle state of a scheduled visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl PlanStatus {
    pub const ALL: [PlanStatus; 3] = [
        PlanStatus::Scheduled,
        PlanStatus::Completed,
        PlanStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Scheduled => "scheduled",
            PlanStatus::Completed => "completed",
            PlanStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for PlanStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PlanStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "plan status",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cycle and threshold settings shared by every derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleRules {
    pub default_cycle_months: u32,
    pub due_soon_days: i64,
    pub upcoming_days: i64,
}

impl Default for ScheduleRules {
    fn default() -> Self {
        Self {
            default_cycle_months: DEFAULT_CYCLE_MONTHS,
            due_soon_days: DUE_SOON_DAYS,
            upcoming_days: UPCOMING_DAYS,
        }
    }
}

/// Application configuration, read from `~/.aquaservice/config.json`.
///
/// Every field is optional in the file; missing keys fall back to the
/// reference values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_cycle_months")]
    pub default_cycle_months: u32,
    #[serde(default = "default_due_soon_days")]
    pub due_soon_days: i64,
    #[serde(default = "default_upcoming_days")]
    pub upcoming_days: i64,
    /// Hard cap on the raw size of an imported backup file.
    #[serde(default = "default_max_import_bytes")]
    pub max_import_bytes: usize,
    /// Hard cap on rows per table in an imported backup.
    #[serde(default = "default_max_import_rows")]
    pub max_import_rows: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<String>,
    /// Where exports are written when no directory is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_dir: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_cycle_months() -> u32 {
    DEFAULT_CYCLE_MONTHS
}

fn default_due_soon_days() -> i64 {
    DUE_SOON_DAYS
}

fn default_upcoming_days() -> i64 {
    UPCOMING_DAYS
}

fn default_max_import_bytes() -> usize {
    DEFAULT_MAX_IMPORT_BYTES
}

fn default_max_import_rows() -> usize {
    DEFAULT_MAX_IMPORT_ROWS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_cycle_months: default_cycle_months(),
            due_soon_days: default_due_soon_days(),
            upcoming_days: default_upcoming_days(),
            max_import_bytes: default_max_import_bytes(),
            max_import_rows: default_max_import_rows(),
            database_path: None,
            backup_dir: None,
            log_level: default_log_level(),
        }
    }
}

impl Config {
    pub fn schedule_rules(&self) -> ScheduleRules {
        ScheduleRules {
            default_cycle_months: self.default_cycle_months,
            due_soon_days: self.due_soon_days,
            upcoming_days: self.upcoming_days,
        }
    }

    pub fn import_limits(&self) -> crate::backup::ImportLimits {
        crate::backup::ImportLimits {
            max_bytes: self.max_import_bytes,
            max_rows: self.max_import_rows,
        }
    }
}
