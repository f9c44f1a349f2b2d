//! Orchestration services

pub mod dispatcher;
pub mod entitlement;
pub mod executor;
pub mod locks;
pub mod reporting;
pub mod scope;
pub mod sweeper;

pub use dispatcher::{ActionDispatcher, CreateInstance};
pub use entitlement::EntitlementService;
pub use executor::{ExecutorOp, ExecutorStatus, ProvisioningExecutor};
pub use locks::{InstanceLock, InstanceLockTable};
pub use reporting::{DashboardSummary, ReportingService};
pub use scope::AccessScopeGuard;
pub use sweeper::{ReconciliationSweeper, SweepReport};
