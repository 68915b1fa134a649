//! Error types for service operations
//!
//! Every failure falls into one of four categories:
//! - Validation: user input has the wrong shape, nothing was attempted
//! - InvalidTransition: a plan action was refused before any write
//! - ImportValidation: a backup was rejected before any table was touched
//! - StoreFailure: the database or file system failed underneath us

use thiserror::Error;

use crate::backup::ImportError;
use crate::db::DbError;
use crate::plans::InvalidTransition;

/// Error types for service operations
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Plan {plan_id}: {source}")]
    InvalidTransition {
        plan_id: String,
        source: InvalidTransition,
    },

    #[error("Import rejected: {0}")]
    Import(#[from] ImportError),

    #[error("Database error: {0}")]
    Store(#[from] DbError),

    #[error("IO error: {0}")]
    Io(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCategory {
    Validation,
    InvalidTransition,
    ImportValidation,
    StoreFailure,
}

impl ServiceError {
    pub fn not_found(kind: &'static str, id: &str) -> Self {
        ServiceError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Unknown ids are input mistakes; I/O failures sit with the store.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ServiceError::Validation(_) | ServiceError::NotFound { .. } => {
                ErrorCategory::Validation
            }
            ServiceError::InvalidTransition { .. } => ErrorCategory::InvalidTransition,
            ServiceError::Import(_) => ErrorCategory::ImportValidation,
            ServiceError::Store(_) | ServiceError::Io(_) => ErrorCategory::StoreFailure,
        }
    }

    /// Get a user-friendly recovery suggestion
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "Correct the highlighted field and try again.",
            ServiceError::NotFound { .. } => "Refresh the list; the item may have been deleted.",
            ServiceError::InvalidTransition { .. } => {
                "Only scheduled plans can be postponed, cancelled or completed."
            }
            ServiceError::Import(err) => match err {
                ImportError::Malformed(_) => "Choose a backup file exported by AquaService.",
                ImportError::UnsupportedVersion { .. } => {
                    "Update AquaService to a version that can read this backup."
                }
                ImportError::Oversized { .. } | ImportError::TooManyRecords { .. } => {
                    "The file exceeds the import limits in ~/.aquaservice/config.json."
                }
                _ => "The backup is damaged. Your existing data was not changed.",
            },
            ServiceError::Store(_) => "Check disk space and permissions for ~/.aquaservice.",
            ServiceError::Io(_) => "Check file permissions and disk space.",
        }
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        ServiceError::Io(err.to_string())
    }
}

impl From<rusqlite::Error> for ServiceError {
    fn from(err: rusqlite::Error) -> Self {
        ServiceError::Store(DbError::Sqlite(err))
    }
}

/// Serializable error representation for the UI and CLI output
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceFailure {
    pub message: String,
    pub category: ErrorCategory,
    /// Finer-grained import reason (`malformed`, `dangling_reference`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    pub recovery_suggestion: String,
}

impl From<&ServiceError> for ServiceFailure {
    fn from(err: &ServiceError) -> Self {
        ServiceFailure {
            message: err.to_string(),
            category: err.category(),
            kind: match err {
                ServiceError::Import(import) => Some(import.kind()),
                _ => None,
            },
            recovery_suggestion: err.recovery_suggestion().to_string(),
        }
    }
}
