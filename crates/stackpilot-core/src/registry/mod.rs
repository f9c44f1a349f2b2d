//! Instance registry: the authoritative store of instance records.
//!
//! `compare_and_transition` is the sole mutation entry point. It is atomic
//! with respect to the expected current state, which is what lets the Action
//! Dispatcher and the Reconciliation Sweeper coexist without trampling each
//! other's writes.

pub mod memory;

pub use memory::InMemoryInstanceRegistry;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{AccessScope, Instance, InstanceDraft, InstanceState};
use crate::error::DomainError;

#[async_trait]
pub trait InstanceRegistry: Send + Sync {
    async fn get(&self, id: &Uuid) -> Result<Option<Instance>, DomainError>;

    async fn list_by_scope(&self, scope: &AccessScope) -> Result<Vec<Instance>, DomainError>;

    /// All instances currently in one of `states`; used by the sweeper.
    async fn list_in_states(&self, states: &[InstanceState])
        -> Result<Vec<Instance>, DomainError>;

    /// Instances counting toward the tenant's quota (state != REMOVED).
    async fn count_live_for_tenant(&self, tenant_id: &Uuid) -> Result<i64, DomainError>;

    /// Insert a new record in state CREATED, allocating a free port and a
    /// unique database name. Fails `ResourceExhausted` when the port range
    /// is fully held by non-REMOVED instances, `ValidationError` when name
    /// or domain is already taken.
    async fn create(&self, draft: InstanceDraft) -> Result<Instance, DomainError>;

    /// Atomically move `id` from `expected` to `next`, replacing
    /// `last_error` with `error` and stamping `last_transitioned_at`.
    /// Fails `StaleState` if the stored state is not `expected`.
    async fn compare_and_transition(
        &self,
        id: &Uuid,
        expected: InstanceState,
        next: InstanceState,
        error: Option<String>,
    ) -> Result<Instance, DomainError>;
}
