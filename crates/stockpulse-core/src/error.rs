//! Domain-level error types.

use thiserror::Error;

use crate::services::SyncSummary;

/// Domain errors - business logic failures.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Repository-level errors.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Query execution failed: {0}")]
    Query(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

impl RepoError {
    /// Whether the store as a whole is unreachable, as opposed to one bad row.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, RepoError::Connection(_))
    }
}

/// Pass-level sync failures. Each carries the summary of work done before the abort.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Transient failure syncing {account_id}: {reason}")]
    Transient {
        account_id: String,
        reason: String,
        summary: SyncSummary,
    },

    #[error("Sync failed for {account_id}: {reason}")]
    SyncFailed {
        account_id: String,
        reason: String,
        summary: SyncSummary,
    },

    #[error("Persistence unavailable while syncing {account_id}: {reason}")]
    PersistenceUnavailable {
        account_id: String,
        reason: String,
        summary: SyncSummary,
    },

    /// Rejected before any work; the summary is empty.
    #[error("Invalid account id {account_id:?}: {reason}")]
    InvalidAccount {
        account_id: String,
        reason: String,
        summary: SyncSummary,
    },
}

impl SyncError {
    /// Partial summary of the aborted pass.
    pub fn summary(&self) -> &SyncSummary {
        match self {
            SyncError::Transient { summary, .. }
            | SyncError::SyncFailed { summary, .. }
            | SyncError::PersistenceUnavailable { summary, .. }
            | SyncError::InvalidAccount { summary, .. } => summary,
        }
    }

    pub fn account_id(&self) -> &str {
        match self {
            SyncError::Transient { account_id, .. }
            | SyncError::SyncFailed { account_id, .. }
            | SyncError::PersistenceUnavailable { account_id, .. }
            | SyncError::InvalidAccount { account_id, .. } => account_id,
        }
    }

    /// Whether the external source failed transiently and the pass may be retried with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::Transient { .. })
    }
}
