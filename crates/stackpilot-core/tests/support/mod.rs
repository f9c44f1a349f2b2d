//! Shared fixtures for the orchestrator integration tests: in-memory
//! billing stores and a programmable fake executor.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use stackpilot_core::domain::{
    ActionLog, ActionLogStatus, BillingCycle, CallerIdentity, Instance, InstanceState, Plan,
    Subscription, SubscriptionStatus, TenantAccount,
};
use stackpilot_core::error::DomainError;
use stackpilot_core::registry::{InMemoryInstanceRegistry, InstanceRegistry};
use stackpilot_core::repositories::{
    ActionLogRepository, PlanRepository, SubscriptionRepository, TenantRepository,
};
use stackpilot_core::services::{
    ActionDispatcher, EntitlementService, ExecutorOp, ExecutorStatus, InstanceLockTable,
    ProvisioningExecutor,
};

// ---------------------------------------------------------------------------
// In-memory billing stores
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryTenants {
    rows: Mutex<Vec<TenantAccount>>,
}

impl InMemoryTenants {
    pub fn insert(&self, tenant: TenantAccount) {
        self.rows.lock().unwrap().push(tenant);
    }
}

#[async_trait]
impl TenantRepository for InMemoryTenants {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<TenantAccount>, DomainError> {
        Ok(self.rows.lock().unwrap().iter().find(|t| &t.id == id).cloned())
    }

    async fn find_by_user_id(&self, user_id: &Uuid) -> Result<Option<TenantAccount>, DomainError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|t| &t.user_id == user_id)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<TenantAccount>, DomainError> {
        Ok(self.rows.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub struct InMemoryPlans {
    rows: Mutex<Vec<Plan>>,
}

#[async_trait]
impl PlanRepository for InMemoryPlans {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Plan>, DomainError> {
        Ok(self.rows.lock().unwrap().iter().find(|p| &p.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<Plan>, DomainError> {
        Ok(self.rows.lock().unwrap().clone())
    }

    async fn create(&self, plan: &Plan) -> Result<Plan, DomainError> {
        self.rows.lock().unwrap().push(plan.clone());
        Ok(plan.clone())
    }

    async fn update(&self, plan: &Plan) -> Result<Plan, DomainError> {
        let mut rows = self.rows.lock().unwrap();
        let existing = rows
            .iter_mut()
            .find(|p| p.id == plan.id)
            .ok_or(DomainError::NotFound)?;
        *existing = plan.clone();
        Ok(plan.clone())
    }

    async fn delete(&self, id: &Uuid) -> Result<(), DomainError> {
        self.rows.lock().unwrap().retain(|p| &p.id != id);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemorySubscriptions {
    rows: Mutex<Vec<Subscription>>,
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptions {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Subscription>, DomainError> {
        Ok(self.rows.lock().unwrap().iter().find(|s| &s.id == id).cloned())
    }

    async fn find_current_by_tenant(
        &self,
        tenant_id: &Uuid,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|s| &s.tenant_id == tenant_id)
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Subscription>, DomainError> {
        Ok(self.rows.lock().unwrap().clone())
    }

    async fn list_by_tenant(&self, tenant_id: &Uuid) -> Result<Vec<Subscription>, DomainError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|s| &s.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn list_active(&self) -> Result<Vec<Subscription>, DomainError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.status == SubscriptionStatus::Active)
            .cloned()
            .collect())
    }

    async fn create(&self, subscription: &Subscription) -> Result<Subscription, DomainError> {
        self.rows.lock().unwrap().push(subscription.clone());
        Ok(subscription.clone())
    }

    async fn update(&self, subscription: &Subscription) -> Result<Subscription, DomainError> {
        let mut rows = self.rows.lock().unwrap();
        let existing = rows
            .iter_mut()
            .find(|s| s.id == subscription.id)
            .ok_or(DomainError::NotFound)?;
        *existing = subscription.clone();
        Ok(subscription.clone())
    }

    async fn suspend_active_for_tenant(&self, tenant_id: &Uuid) -> Result<u64, DomainError> {
        let mut rows = self.rows.lock().unwrap();
        let mut suspended = 0;
        for s in rows.iter_mut() {
            if &s.tenant_id == tenant_id && s.status == SubscriptionStatus::Active {
                s.status = SubscriptionStatus::Suspended;
                suspended += 1;
            }
        }
        Ok(suspended)
    }
}

#[derive(Default)]
pub struct InMemoryActionLogs {
    rows: Mutex<Vec<ActionLog>>,
}

impl InMemoryActionLogs {
    pub fn all(&self) -> Vec<ActionLog> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActionLogRepository for InMemoryActionLogs {
    async fn create(&self, log: &ActionLog) -> Result<ActionLog, DomainError> {
        self.rows.lock().unwrap().push(log.clone());
        Ok(log.clone())
    }

    async fn finish(
        &self,
        id: &Uuid,
        status: ActionLogStatus,
        error_message: Option<String>,
        duration_seconds: i64,
    ) -> Result<(), DomainError> {
        let mut rows = self.rows.lock().unwrap();
        let log = rows
            .iter_mut()
            .find(|l| &l.id == id)
            .ok_or(DomainError::NotFound)?;
        log.status = status;
        log.error_message = error_message;
        log.duration_seconds = Some(duration_seconds);
        Ok(())
    }

    async fn list_by_instance(&self, instance_id: &Uuid) -> Result<Vec<ActionLog>, DomainError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|l| &l.instance_id == instance_id)
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Fake executor
// ---------------------------------------------------------------------------

pub struct FakeExecutor {
    delay: Duration,
    fail_with: Mutex<Option<String>>,
    status: Mutex<ExecutorStatus>,
    pub invocations: AtomicUsize,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            fail_with: Mutex::new(None),
            status: Mutex::new(ExecutorStatus::Running),
            invocations: AtomicUsize::new(0),
        }
    }

    /// When set, every operation fails with this message until cleared.
    pub fn set_failing(&self, message: Option<&str>) {
        *self.fail_with.lock().unwrap() = message.map(str::to_string);
    }

    pub fn set_status(&self, status: ExecutorStatus) {
        *self.status.lock().unwrap() = status;
    }

    pub fn invocation_count(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    async fn operate(&self) -> Result<(), DomainError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.fail_with.lock().unwrap().clone() {
            Some(message) => Err(DomainError::ExecutorFailure(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ProvisioningExecutor for FakeExecutor {
    async fn allocate(&self, _instance: &Instance) -> Result<(), DomainError> {
        self.operate().await
    }

    async fn transition(&self, _instance: &Instance, _op: ExecutorOp) -> Result<(), DomainError> {
        self.operate().await
    }

    async fn deallocate(&self, _instance: &Instance) -> Result<(), DomainError> {
        self.operate().await
    }

    async fn status(&self, _instance: &Instance) -> Result<ExecutorStatus, DomainError> {
        Ok(*self.status.lock().unwrap())
    }
}

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

pub struct Fixture {
    pub registry: Arc<InMemoryInstanceRegistry>,
    pub tenants: Arc<InMemoryTenants>,
    pub plans: Arc<InMemoryPlans>,
    pub subscriptions: Arc<InMemorySubscriptions>,
    pub action_logs: Arc<InMemoryActionLogs>,
    pub executor: Arc<FakeExecutor>,
    pub locks: InstanceLockTable,
    pub dispatcher: ActionDispatcher,
}

pub fn fixture() -> Fixture {
    fixture_with_executor(FakeExecutor::new())
}

pub fn fixture_with_executor(executor: FakeExecutor) -> Fixture {
    let registry = Arc::new(InMemoryInstanceRegistry::new(8070, 8170));
    let tenants = Arc::new(InMemoryTenants::default());
    let plans = Arc::new(InMemoryPlans::default());
    let subscriptions = Arc::new(InMemorySubscriptions::default());
    let action_logs = Arc::new(InMemoryActionLogs::default());
    let executor = Arc::new(executor);
    let locks = InstanceLockTable::new();

    let entitlements = EntitlementService::new(subscriptions.clone(), plans.clone());
    let dispatcher = ActionDispatcher::new(
        registry.clone(),
        entitlements,
        executor.clone(),
        action_logs.clone(),
        locks.clone(),
        Duration::from_secs(5),
    );

    Fixture {
        registry,
        tenants,
        plans,
        subscriptions,
        action_logs,
        executor,
        locks,
        dispatcher,
    }
}

impl Fixture {
    /// Seed a tenant with an ACTIVE subscription on a fresh plan and hand
    /// back the tenant caller.
    pub async fn seed_tenant(&self, max_instances: i32, modules: &[&str]) -> CallerIdentity {
        let user_id = Uuid::new_v4();
        let tenant_id = Uuid::new_v4();
        self.tenants.insert(TenantAccount {
            id: tenant_id,
            user_id,
            company_name: format!("company-{tenant_id}"),
            phone: None,
            address: None,
            created_at: chrono::Utc::now(),
        });

        let plan = Plan::new(
            format!("plan-{tenant_id}"),
            49.0,
            10,
            20,
            max_instances,
            modules.iter().map(|m| m.to_string()).collect(),
        )
        .unwrap();
        self.plans.create(&plan).await.unwrap();

        let subscription =
            Subscription::new(tenant_id, plan.id, BillingCycle::Monthly, true);
        self.subscriptions.create(&subscription).await.unwrap();

        CallerIdentity::tenant(user_id, tenant_id)
    }

    pub async fn suspend_subscriptions(&self, tenant_id: &Uuid) {
        self.subscriptions
            .suspend_active_for_tenant(tenant_id)
            .await
            .unwrap();
    }
}

/// Poll until the instance leaves its intermediate state.
pub async fn wait_until_settled(registry: &dyn InstanceRegistry, id: &Uuid) -> Instance {
    for _ in 0..500 {
        let instance = registry
            .get(id)
            .await
            .unwrap()
            .expect("instance should exist");
        if !instance.state.is_intermediate() && instance.state != InstanceState::Created {
            return instance;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("instance {id} never settled");
}
