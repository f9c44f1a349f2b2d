//! Action dispatcher
//!
//! Public entry point for lifecycle intents. Every call runs the same
//! sequence: scope check, entitlement check (create/start), per-instance
//! lock, transition-table lookup, CAS to the intermediate marker, the
//! executor call under a bounded timeout, CAS to the settle state.
//!
//! Executor failures are absorbed into the instance (state ERROR plus the
//! captured message) rather than failing the call, so callers can tell
//! "my request was invalid" from "my request was accepted but provisioning
//! failed".

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{
    ActionLog, ActionLogStatus, CallerIdentity, Instance, InstanceDraft, LifecycleAction,
    TransitionPlan,
};
use crate::error::DomainError;
use crate::registry::InstanceRegistry;
use crate::repositories::ActionLogRepository;

use super::entitlement::EntitlementService;
use super::executor::{ExecutorOp, ProvisioningExecutor};
use super::locks::{InstanceLock, InstanceLockTable};
use super::scope::AccessScopeGuard;

/// CREATE request payload, already past HTTP-level deserialization.
#[derive(Debug, Clone)]
pub struct CreateInstance {
    pub name: String,
    pub domain: String,
    /// Module names the instance should enable; checked against the plan.
    pub modules: Vec<String>,
    /// Staff callers may create on behalf of a tenant.
    pub tenant_id: Option<Uuid>,
}

pub struct ActionDispatcher {
    registry: Arc<dyn InstanceRegistry>,
    entitlements: EntitlementService,
    executor: Arc<dyn ProvisioningExecutor>,
    action_logs: Arc<dyn ActionLogRepository>,
    locks: InstanceLockTable,
    executor_timeout: Duration,
}

impl ActionDispatcher {
    pub fn new(
        registry: Arc<dyn InstanceRegistry>,
        entitlements: EntitlementService,
        executor: Arc<dyn ProvisioningExecutor>,
        action_logs: Arc<dyn ActionLogRepository>,
        locks: InstanceLockTable,
        executor_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            entitlements,
            executor,
            action_logs,
            locks,
            executor_timeout,
        }
    }

    /// Create a new instance and kick off its first deployment.
    ///
    /// Entitlements are checked before any record exists; the returned
    /// instance is already in DEPLOYING and settles to RUNNING or ERROR in
    /// the background while the per-instance lock stays held.
    pub async fn create(
        &self,
        caller: &CallerIdentity,
        request: CreateInstance,
    ) -> Result<Instance, DomainError> {
        let tenant_id = self.resolve_owner(caller, request.tenant_id)?;

        validate_name(&request.name)?;
        validate_domain(&request.domain)?;

        let (entitlement, subscription) = self
            .entitlements
            .evaluate_with_subscription(&tenant_id)
            .await?;

        let live = self.registry.count_live_for_tenant(&tenant_id).await?;
        if live >= entitlement.max_instances as i64 {
            return Err(DomainError::QuotaExceeded {
                limit: entitlement.max_instances,
            });
        }

        for module in &request.modules {
            if !entitlement.module_allowed(module) {
                return Err(DomainError::ModuleNotAllowed(module.clone()));
            }
        }

        // Pending-creation token: the id is allocated up front so the lock
        // covers the record from before its first appearance.
        let id = Uuid::new_v4();
        let lock = self
            .locks
            .try_acquire(id)
            .ok_or(DomainError::ConflictActionInProgress)?;

        let instance = self
            .registry
            .create(InstanceDraft {
                id,
                tenant_id,
                subscription_id: subscription.id,
                name: request.name,
                domain: request.domain,
            })
            .await?;

        info!(
            "instance {} created for tenant {} on port {}",
            instance.id, instance.tenant_id, instance.port
        );

        let action = LifecycleAction::Provision;
        let plan = action.plan(instance.state)?;

        let log = ActionLog::started(
            instance.id,
            caller.user_id,
            action,
            json!({
                "name": instance.name,
                "domain": instance.domain,
                "port": instance.port,
            }),
        );
        self.action_logs.create(&log).await?;

        let deploying = self
            .registry
            .compare_and_transition(&instance.id, instance.state, plan.intermediate, None)
            .await?;

        // Settle in the background; the caller polls the registry for the
        // outcome, as with any other read.
        let registry = Arc::clone(&self.registry);
        let executor = Arc::clone(&self.executor);
        let action_logs = Arc::clone(&self.action_logs);
        let timeout = self.executor_timeout;
        let task_instance = deploying.clone();
        tokio::spawn(async move {
            if let Err(e) = Self::execute_and_settle(
                registry,
                executor,
                action_logs,
                timeout,
                task_instance,
                action,
                plan,
                log.id,
                lock,
            )
            .await
            {
                error!("provisioning settle failed for instance {}: {}", id, e);
            }
        });

        Ok(deploying)
    }

    /// Dispatch a lifecycle action against an existing instance and wait for
    /// it to settle. Returns the settled instance; an executor failure shows
    /// up as state ERROR on it, not as an error return.
    pub async fn dispatch(
        &self,
        caller: &CallerIdentity,
        instance_id: &Uuid,
        action: LifecycleAction,
    ) -> Result<Instance, DomainError> {
        let instance = self
            .registry
            .get(instance_id)
            .await?
            .ok_or(DomainError::NotFound)?;
        AccessScopeGuard::authorize_instance(caller, &instance)?;

        // A suspended or expired subscription blocks start, not stop/delete.
        if action == LifecycleAction::Start {
            let entitlement = self.entitlements.evaluate(&instance.tenant_id).await?;
            if !entitlement.allows_activation() {
                return Err(DomainError::QuotaExceeded {
                    limit: entitlement.max_instances,
                });
            }
        }

        let lock = self
            .locks
            .try_acquire(*instance_id)
            .ok_or(DomainError::ConflictActionInProgress)?;

        // Re-read under the lock; the state may have moved since the scope
        // check.
        let instance = self
            .registry
            .get(instance_id)
            .await?
            .ok_or(DomainError::NotFound)?;
        let plan = action.plan(instance.state)?;

        let log = ActionLog::started(
            instance.id,
            caller.user_id,
            action,
            json!({
                "name": instance.name,
                "from_state": instance.state,
            }),
        );
        self.action_logs.create(&log).await?;

        let marked = self
            .registry
            .compare_and_transition(&instance.id, instance.state, plan.intermediate, None)
            .await?;

        Self::execute_and_settle(
            Arc::clone(&self.registry),
            Arc::clone(&self.executor),
            Arc::clone(&self.action_logs),
            self.executor_timeout,
            marked,
            action,
            plan,
            log.id,
            lock,
        )
        .await
    }

    fn resolve_owner(
        &self,
        caller: &CallerIdentity,
        requested: Option<Uuid>,
    ) -> Result<Uuid, DomainError> {
        if caller.is_staff() {
            return requested.ok_or_else(|| {
                DomainError::ValidationError(
                    "tenant_id is required when staff create an instance".to_string(),
                )
            });
        }

        let own = caller.tenant_id.ok_or_else(|| {
            DomainError::InternalError("tenant caller carries no tenant identity".to_string())
        })?;
        match requested {
            Some(other) if other != own => Err(DomainError::NotFound),
            _ => Ok(own),
        }
    }

    /// The tail of the dispatch sequence: executor call under the timeout,
    /// CAS to the settle state, action-log outcome, lock release (on drop).
    #[allow(clippy::too_many_arguments)]
    async fn execute_and_settle(
        registry: Arc<dyn InstanceRegistry>,
        executor: Arc<dyn ProvisioningExecutor>,
        action_logs: Arc<dyn ActionLogRepository>,
        timeout: Duration,
        instance: Instance,
        action: LifecycleAction,
        plan: TransitionPlan,
        log_id: Uuid,
        _lock: InstanceLock,
    ) -> Result<Instance, DomainError> {
        let started = Utc::now();

        let call = async {
            match action {
                LifecycleAction::Provision => executor.allocate(&instance).await,
                LifecycleAction::Start => {
                    executor.transition(&instance, ExecutorOp::Start).await
                }
                LifecycleAction::Stop => executor.transition(&instance, ExecutorOp::Stop).await,
                LifecycleAction::Restart => {
                    executor.transition(&instance, ExecutorOp::Restart).await
                }
                LifecycleAction::Delete => executor.deallocate(&instance).await,
            }
        };

        let outcome = match tokio::time::timeout(timeout, call).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(DomainError::ExecutorFailure(message))) => Err(message),
            Ok(Err(other)) => Err(other.to_string()),
            Err(_) => Err(format!(
                "provisioning operation timed out after {}s",
                timeout.as_secs()
            )),
        };
        let duration = (Utc::now() - started).num_seconds();

        match outcome {
            Ok(()) => {
                let settled = registry
                    .compare_and_transition(&instance.id, plan.intermediate, plan.on_success, None)
                    .await?;
                if let Err(e) = action_logs
                    .finish(&log_id, ActionLogStatus::Success, None, duration)
                    .await
                {
                    warn!("failed to record action log outcome: {}", e);
                }
                info!(
                    "instance {} settled {} after {}",
                    settled.id, settled.state, action
                );
                Ok(settled)
            }
            Err(message) => {
                warn!(
                    "executor failed {} for instance {}: {}",
                    action, instance.id, message
                );
                let settled = registry
                    .compare_and_transition(
                        &instance.id,
                        plan.intermediate,
                        plan.on_failure,
                        Some(message.clone()),
                    )
                    .await?;
                if let Err(e) = action_logs
                    .finish(&log_id, ActionLogStatus::Failed, Some(message), duration)
                    .await
                {
                    warn!("failed to record action log outcome: {}", e);
                }
                Ok(settled)
            }
        }
    }
}

fn validate_name(name: &str) -> Result<(), DomainError> {
    if name.len() < 2 || name.len() > 100 {
        return Err(DomainError::ValidationError(
            "instance name must be between 2 and 100 characters".to_string(),
        ));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err(DomainError::ValidationError(
            "instance name may only contain lowercase letters, digits, '-' and '_'".to_string(),
        ));
    }
    Ok(())
}

fn validate_domain(domain: &str) -> Result<(), DomainError> {
    if domain.is_empty() || domain.len() > 255 {
        return Err(DomainError::ValidationError(
            "domain must be between 1 and 255 characters".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("acme-prod_1").is_ok());
        assert!(validate_name("a").is_err());
        assert!(validate_name("Acme").is_err());
        assert!(validate_name("acme corp").is_err());
    }
}
