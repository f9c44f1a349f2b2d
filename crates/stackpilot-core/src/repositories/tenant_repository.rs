//! Tenant account repository trait (port)
//!
//! Accounts are created and owned by the external identity/billing system;
//! the core only reads them.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::TenantAccount;
use crate::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TenantRepository: Send + Sync {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<TenantAccount>, DomainError>;
    async fn find_by_user_id(&self, user_id: &Uuid) -> Result<Option<TenantAccount>, DomainError>;
    async fn list(&self) -> Result<Vec<TenantAccount>, DomainError>;
}
