//! Provisioning executor port
//!
//! The external capability that actually creates, starts, stops, and
//! destroys the underlying stacks, plus a queryable ground-truth status.
//! Failures come back as `DomainError::ExecutorFailure` and are absorbed
//! into the instance's state by the caller, never propagated raw.

use async_trait::async_trait;

use crate::domain::Instance;
use crate::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorOp {
    Start,
    Stop,
    Restart,
}

impl ExecutorOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutorOp::Start => "start",
            ExecutorOp::Stop => "stop",
            ExecutorOp::Restart => "restart",
        }
    }
}

/// Ground-truth status of the backing stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorStatus {
    Running,
    Stopped,
    /// No backing stack exists for the instance.
    Absent,
}

#[async_trait]
pub trait ProvisioningExecutor: Send + Sync {
    /// First deployment: create the database, wire the port, start the stack.
    async fn allocate(&self, instance: &Instance) -> Result<(), DomainError>;

    async fn transition(&self, instance: &Instance, op: ExecutorOp) -> Result<(), DomainError>;

    /// Tear the stack down and release its resources.
    async fn deallocate(&self, instance: &Instance) -> Result<(), DomainError>;

    async fn status(&self, instance: &Instance) -> Result<ExecutorStatus, DomainError>;
}
