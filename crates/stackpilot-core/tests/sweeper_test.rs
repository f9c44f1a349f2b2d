//! Reconciliation sweeper integration tests: drift correction, idempotence,
//! lock deference.

mod support;

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use stackpilot_core::domain::{InstanceDraft, InstanceState};
use stackpilot_core::registry::{InMemoryInstanceRegistry, InstanceRegistry};
use stackpilot_core::services::{ExecutorStatus, InstanceLockTable, ReconciliationSweeper};

use support::FakeExecutor;

struct SweepFixture {
    registry: Arc<InMemoryInstanceRegistry>,
    executor: Arc<FakeExecutor>,
    locks: InstanceLockTable,
    sweeper: ReconciliationSweeper,
}

fn sweep_fixture() -> SweepFixture {
    let registry = Arc::new(InMemoryInstanceRegistry::new(8070, 8170));
    let executor = Arc::new(FakeExecutor::new());
    let locks = InstanceLockTable::new();
    let sweeper = ReconciliationSweeper::new(
        registry.clone(),
        executor.clone(),
        locks.clone(),
        Duration::from_secs(60),
        true,
    );
    SweepFixture {
        registry,
        executor,
        locks,
        sweeper,
    }
}

async fn seed_instance(registry: &InMemoryInstanceRegistry, state: InstanceState) -> Uuid {
    let draft = InstanceDraft {
        id: Uuid::new_v4(),
        tenant_id: Uuid::new_v4(),
        subscription_id: Uuid::new_v4(),
        name: format!("inst-{}", Uuid::new_v4().simple()),
        domain: format!("{}.apps.localhost", Uuid::new_v4().simple()),
    };
    let instance = registry.create(draft).await.unwrap();
    if state != InstanceState::Created {
        registry
            .compare_and_transition(&instance.id, InstanceState::Created, state, None)
            .await
            .unwrap();
    }
    instance.id
}

#[tokio::test]
async fn test_sweep_corrects_settled_drift_with_note() {
    let fx = sweep_fixture();
    let id = seed_instance(&fx.registry, InstanceState::Running).await;
    fx.executor.set_status(ExecutorStatus::Stopped);

    let report = fx.sweeper.sweep_once().await.unwrap();
    assert_eq!(report.corrected, 1);

    let corrected = fx.registry.get(&id).await.unwrap().unwrap();
    assert_eq!(corrected.state, InstanceState::Stopped);
    assert!(corrected.last_error.unwrap().contains("drift"));
}

#[tokio::test]
async fn test_sweep_is_idempotent() {
    let fx = sweep_fixture();
    seed_instance(&fx.registry, InstanceState::Running).await;
    fx.executor.set_status(ExecutorStatus::Stopped);

    let first = fx.sweeper.sweep_once().await.unwrap();
    assert_eq!(first.corrected, 1);

    let second = fx.sweeper.sweep_once().await.unwrap();
    assert_eq!(second.corrected, 0, "second pass must not mutate again");
}

#[tokio::test]
async fn test_sweep_skips_locked_instances() {
    let fx = sweep_fixture();
    let id = seed_instance(&fx.registry, InstanceState::Running).await;
    fx.executor.set_status(ExecutorStatus::Stopped);

    let _held = fx.locks.try_acquire(id).unwrap();
    let report = fx.sweeper.sweep_once().await.unwrap();
    assert_eq!(report.skipped_locked, 1);
    assert_eq!(report.corrected, 0);

    let untouched = fx.registry.get(&id).await.unwrap().unwrap();
    assert_eq!(untouched.state, InstanceState::Running);
}

#[tokio::test]
async fn test_sweep_completes_interrupted_delete() {
    let fx = sweep_fixture();
    let id = seed_instance(&fx.registry, InstanceState::Deleting).await;
    fx.executor.set_status(ExecutorStatus::Absent);

    let report = fx.sweeper.sweep_once().await.unwrap();
    assert_eq!(report.corrected, 1);
    let removed = fx.registry.get(&id).await.unwrap().unwrap();
    assert_eq!(removed.state, InstanceState::Removed);
}

#[tokio::test]
async fn test_sweep_flags_missing_stack_as_error() {
    let fx = sweep_fixture();
    let id = seed_instance(&fx.registry, InstanceState::Running).await;
    fx.executor.set_status(ExecutorStatus::Absent);

    fx.sweeper.sweep_once().await.unwrap();
    let flagged = fx.registry.get(&id).await.unwrap().unwrap();
    assert_eq!(flagged.state, InstanceState::Error);
    assert!(flagged.last_error.unwrap().contains("missing"));
}

#[tokio::test]
async fn test_sweep_adopts_state_of_interrupted_transition() {
    let fx = sweep_fixture();
    let id = seed_instance(&fx.registry, InstanceState::Starting).await;
    fx.executor.set_status(ExecutorStatus::Running);

    fx.sweeper.sweep_once().await.unwrap();
    let settled = fx.registry.get(&id).await.unwrap().unwrap();
    assert_eq!(settled.state, InstanceState::Running);
}

#[tokio::test]
async fn test_sweep_never_touches_error_instances() {
    let fx = sweep_fixture();
    let id = seed_instance(&fx.registry, InstanceState::Error).await;
    fx.executor.set_status(ExecutorStatus::Running);

    let report = fx.sweeper.sweep_once().await.unwrap();
    assert_eq!(report.examined, 0);
    let untouched = fx.registry.get(&id).await.unwrap().unwrap();
    assert_eq!(untouched.state, InstanceState::Error);
}
