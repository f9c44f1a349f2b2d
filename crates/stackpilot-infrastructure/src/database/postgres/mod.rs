//! PostgreSQL repository implementations

pub mod action_log_repo_impl;
pub mod instance_registry_impl;
pub mod plan_repo_impl;
pub mod subscription_repo_impl;
pub mod tenant_repo_impl;

pub use action_log_repo_impl::PgActionLogRepository;
pub use instance_registry_impl::PgInstanceRegistry;
pub use plan_repo_impl::PgPlanRepository;
pub use subscription_repo_impl::PgSubscriptionRepository;
pub use tenant_repo_impl::PgTenantRepository;
