//! Plan catalog repository trait (port)

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::Plan;
use crate::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlanRepository: Send + Sync {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Plan>, DomainError>;
    async fn list(&self) -> Result<Vec<Plan>, DomainError>;
    async fn create(&self, plan: &Plan) -> Result<Plan, DomainError>;
    async fn update(&self, plan: &Plan) -> Result<Plan, DomainError>;
    async fn delete(&self, id: &Uuid) -> Result<(), DomainError>;
}
