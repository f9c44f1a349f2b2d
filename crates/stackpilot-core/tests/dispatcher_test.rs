//! Action dispatcher integration tests: quota enforcement, per-instance
//! mutual exclusion, executor failure absorption, tenant isolation.

mod support;

use std::time::Duration;

use uuid::Uuid;

use stackpilot_core::domain::{
    ActionLogStatus, CallerIdentity, InstanceState, LifecycleAction,
};
use stackpilot_core::error::DomainError;
use stackpilot_core::registry::InstanceRegistry;
use stackpilot_core::services::CreateInstance;

use support::{fixture, fixture_with_executor, wait_until_settled, FakeExecutor};

fn create_request(name: &str) -> CreateInstance {
    CreateInstance {
        name: name.to_string(),
        domain: format!("{name}.apps.localhost"),
        modules: Vec::new(),
        tenant_id: None,
    }
}

#[tokio::test]
async fn test_create_under_quota_settles_running() {
    let fx = fixture();
    let caller = fx.seed_tenant(1, &[]).await;

    let instance = fx.dispatcher.create(&caller, create_request("acme")).await.unwrap();
    assert_eq!(instance.state, InstanceState::Deploying);

    let settled = wait_until_settled(fx.registry.as_ref(), &instance.id).await;
    assert_eq!(settled.state, InstanceState::Running);
    assert!(settled.last_error.is_none());

    let tenant_id = caller.tenant_id.unwrap();
    assert_eq!(fx.registry.count_live_for_tenant(&tenant_id).await.unwrap(), 1);

    let logs = fx.action_logs.all();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].action, LifecycleAction::Provision);
    assert_eq!(logs[0].status, ActionLogStatus::Success);
}

#[tokio::test]
async fn test_create_over_quota_fails_and_creates_nothing() {
    let fx = fixture();
    let caller = fx.seed_tenant(1, &[]).await;
    let tenant_id = caller.tenant_id.unwrap();

    let first = fx.dispatcher.create(&caller, create_request("acme")).await.unwrap();
    wait_until_settled(fx.registry.as_ref(), &first.id).await;

    let err = fx
        .dispatcher
        .create(&caller, create_request("acme2"))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::QuotaExceeded { limit: 1 }));
    assert_eq!(fx.registry.count_live_for_tenant(&tenant_id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_create_without_subscription_fails() {
    let fx = fixture();
    let caller = CallerIdentity::tenant(Uuid::new_v4(), Uuid::new_v4());

    let err = fx
        .dispatcher
        .create(&caller, create_request("acme"))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NoActiveSubscription));
}

#[tokio::test]
async fn test_create_with_disallowed_module_fails() {
    let fx = fixture();
    let caller = fx.seed_tenant(3, &["crm"]).await;

    let mut request = create_request("acme");
    request.modules = vec!["crm".to_string(), "inventory".to_string()];
    let err = fx.dispatcher.create(&caller, request).await.unwrap_err();
    assert!(matches!(err, DomainError::ModuleNotAllowed(m) if m == "inventory"));
}

#[tokio::test]
async fn test_suspended_tenant_cannot_create_but_can_stop() {
    let fx = fixture();
    let caller = fx.seed_tenant(2, &[]).await;
    let tenant_id = caller.tenant_id.unwrap();

    let instance = fx.dispatcher.create(&caller, create_request("acme")).await.unwrap();
    let running = wait_until_settled(fx.registry.as_ref(), &instance.id).await;
    assert_eq!(running.state, InstanceState::Running);

    fx.suspend_subscriptions(&tenant_id).await;

    let err = fx
        .dispatcher
        .create(&caller, create_request("acme2"))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::QuotaExceeded { limit: 0 }));

    // Stop stays available to a suspended tenant.
    let stopped = fx
        .dispatcher
        .dispatch(&caller, &instance.id, LifecycleAction::Stop)
        .await
        .unwrap();
    assert_eq!(stopped.state, InstanceState::Stopped);

    // Start does not.
    let err = fx
        .dispatcher
        .dispatch(&caller, &instance.id, LifecycleAction::Start)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::QuotaExceeded { limit: 0 }));
}

#[tokio::test]
async fn test_concurrent_actions_one_wins_one_conflicts() {
    let fx = fixture_with_executor(FakeExecutor::with_delay(Duration::from_millis(100)));
    let caller = fx.seed_tenant(1, &[]).await;

    let instance = fx.dispatcher.create(&caller, create_request("acme")).await.unwrap();
    let running = wait_until_settled(fx.registry.as_ref(), &instance.id).await;
    assert_eq!(running.state, InstanceState::Running);

    let before = fx.executor.invocation_count();
    let (stop, restart) = tokio::join!(
        fx.dispatcher.dispatch(&caller, &instance.id, LifecycleAction::Stop),
        fx.dispatcher.dispatch(&caller, &instance.id, LifecycleAction::Restart),
    );

    let conflicts = [&stop, &restart]
        .iter()
        .filter(|r| matches!(r, Err(DomainError::ConflictActionInProgress)))
        .count();
    assert_eq!(conflicts, 1, "exactly one of the two actions must conflict");
    assert_eq!(
        fx.executor.invocation_count(),
        before + 1,
        "only one executor invocation may happen"
    );

    // The winner settled the instance into its table-defined state.
    let settled = fx.registry.get(&instance.id).await.unwrap().unwrap();
    match (stop.is_ok(), restart.is_ok()) {
        (true, false) => assert_eq!(settled.state, InstanceState::Stopped),
        (false, true) => assert_eq!(settled.state, InstanceState::Running),
        _ => unreachable!("exactly one action must succeed"),
    }
}

#[tokio::test]
async fn test_executor_failure_settles_error_and_recovers() {
    let fx = fixture();
    let caller = fx.seed_tenant(1, &[]).await;

    let instance = fx.dispatcher.create(&caller, create_request("acme")).await.unwrap();
    wait_until_settled(fx.registry.as_ref(), &instance.id).await;

    let stopped = fx
        .dispatcher
        .dispatch(&caller, &instance.id, LifecycleAction::Stop)
        .await
        .unwrap();
    assert_eq!(stopped.state, InstanceState::Stopped);

    fx.executor.set_failing(Some("container runtime unreachable"));
    let failed = fx
        .dispatcher
        .dispatch(&caller, &instance.id, LifecycleAction::Start)
        .await
        .unwrap();
    assert_eq!(failed.state, InstanceState::Error);
    assert_eq!(
        failed.last_error.as_deref(),
        Some("container runtime unreachable")
    );

    // START is allowed from ERROR and can recover.
    fx.executor.set_failing(None);
    let recovered = fx
        .dispatcher
        .dispatch(&caller, &instance.id, LifecycleAction::Start)
        .await
        .unwrap();
    assert_eq!(recovered.state, InstanceState::Running);
    assert!(recovered.last_error.is_none());
}

#[tokio::test]
async fn test_tenant_isolation_hides_foreign_instances() {
    let fx = fixture();
    let owner = fx.seed_tenant(1, &[]).await;
    let intruder = fx.seed_tenant(1, &[]).await;

    let instance = fx.dispatcher.create(&owner, create_request("acme")).await.unwrap();
    let running = wait_until_settled(fx.registry.as_ref(), &instance.id).await;

    let err = fx
        .dispatcher
        .dispatch(&intruder, &instance.id, LifecycleAction::Stop)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound));

    let unchanged = fx.registry.get(&instance.id).await.unwrap().unwrap();
    assert_eq!(unchanged.state, running.state);
}

#[tokio::test]
async fn test_staff_operates_across_tenants() {
    let fx = fixture();
    let owner = fx.seed_tenant(1, &[]).await;
    let staff = CallerIdentity::staff(Uuid::new_v4());

    let instance = fx.dispatcher.create(&owner, create_request("acme")).await.unwrap();
    wait_until_settled(fx.registry.as_ref(), &instance.id).await;

    let stopped = fx
        .dispatcher
        .dispatch(&staff, &instance.id, LifecycleAction::Stop)
        .await
        .unwrap();
    assert_eq!(stopped.state, InstanceState::Stopped);
}

#[tokio::test]
async fn test_invalid_transition_performs_no_mutation() {
    let fx = fixture();
    let caller = fx.seed_tenant(1, &[]).await;

    let instance = fx.dispatcher.create(&caller, create_request("acme")).await.unwrap();
    let running = wait_until_settled(fx.registry.as_ref(), &instance.id).await;
    assert_eq!(running.state, InstanceState::Running);

    let err = fx
        .dispatcher
        .dispatch(&caller, &instance.id, LifecycleAction::Start)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidTransition { .. }));

    let unchanged = fx.registry.get(&instance.id).await.unwrap().unwrap();
    assert_eq!(unchanged.state, InstanceState::Running);
}

#[tokio::test]
async fn test_failed_delete_retains_instance_for_retry() {
    let fx = fixture();
    let caller = fx.seed_tenant(1, &[]).await;
    let tenant_id = caller.tenant_id.unwrap();

    let instance = fx.dispatcher.create(&caller, create_request("acme")).await.unwrap();
    wait_until_settled(fx.registry.as_ref(), &instance.id).await;

    fx.executor.set_failing(Some("volume still attached"));
    let failed = fx
        .dispatcher
        .dispatch(&caller, &instance.id, LifecycleAction::Delete)
        .await
        .unwrap();
    assert_eq!(failed.state, InstanceState::Error);
    assert_eq!(failed.last_error.as_deref(), Some("volume still attached"));
    assert_eq!(fx.registry.count_live_for_tenant(&tenant_id).await.unwrap(), 1);

    fx.executor.set_failing(None);
    let removed = fx
        .dispatcher
        .dispatch(&caller, &instance.id, LifecycleAction::Delete)
        .await
        .unwrap();
    assert_eq!(removed.state, InstanceState::Removed);
    assert_eq!(fx.registry.count_live_for_tenant(&tenant_id).await.unwrap(), 0);

    // Retained for audit, still queryable.
    assert!(fx.registry.get(&instance.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_create_rejects_malformed_name() {
    let fx = fixture();
    let caller = fx.seed_tenant(1, &[]).await;

    let err = fx
        .dispatcher
        .create(&caller, create_request("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::ValidationError(_)));
}
