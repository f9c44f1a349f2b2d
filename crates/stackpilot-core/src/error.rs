//! Domain errors

use thiserror::Error;

use crate::domain::lifecycle::{InstanceState, LifecycleAction};

#[derive(Error, Debug)]
pub enum DomainError {
    /// Nonexistent reference, or a reference outside the caller's scope.
    /// Tenant callers are never told which of the two it was.
    #[error("Not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("No active subscription")]
    NoActiveSubscription,

    #[error("Instance quota exceeded (limit {limit})")]
    QuotaExceeded { limit: i32 },

    #[error("Module not allowed by plan: {0}")]
    ModuleNotAllowed(String),

    #[error("Action {action} not allowed from state {state}")]
    InvalidTransition {
        action: LifecycleAction,
        state: InstanceState,
    },

    #[error("Another action is already in progress for this instance")]
    ConflictActionInProgress,

    #[error("Stale state: expected {expected}, found {actual}")]
    StaleState {
        expected: InstanceState,
        actual: InstanceState,
    },

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Executor failure: {0}")]
    ExecutorFailure(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}
