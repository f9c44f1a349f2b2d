//! Subscription repository trait (port)

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::Subscription;
use crate::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Subscription>, DomainError>;

    /// The tenant's current binding: the most recently created subscription,
    /// regardless of status. The entitlement evaluator decides what a
    /// suspended or expired binding is worth.
    async fn find_current_by_tenant(
        &self,
        tenant_id: &Uuid,
    ) -> Result<Option<Subscription>, DomainError>;

    async fn list(&self) -> Result<Vec<Subscription>, DomainError>;
    async fn list_by_tenant(&self, tenant_id: &Uuid) -> Result<Vec<Subscription>, DomainError>;
    async fn list_active(&self) -> Result<Vec<Subscription>, DomainError>;

    async fn create(&self, subscription: &Subscription) -> Result<Subscription, DomainError>;
    async fn update(&self, subscription: &Subscription) -> Result<Subscription, DomainError>;

    /// Suspend every ACTIVE subscription of the tenant; keeps the
    /// at-most-one-ACTIVE invariant when a new subscription is activated.
    async fn suspend_active_for_tenant(&self, tenant_id: &Uuid) -> Result<u64, DomainError>;
}
