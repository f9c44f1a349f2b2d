//! In-memory registry engine.
//!
//! Single-node deployments and the test suite run on this; the
//! infrastructure crate provides the Postgres-backed implementation with the
//! same CAS semantics.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use rand::{distr::Alphanumeric, Rng};
use tokio::sync::Mutex;
use uuid::Uuid;

use stackpilot_shared::constants::{DB_NAME_PREFIX, DB_PASSWORD_LEN};

use crate::domain::{AccessScope, Instance, InstanceDraft, InstanceState};
use crate::error::DomainError;

use super::InstanceRegistry;

pub struct InMemoryInstanceRegistry {
    instances: Mutex<HashMap<Uuid, Instance>>,
    port_range_start: u16,
    port_range_end: u16,
}

impl InMemoryInstanceRegistry {
    pub fn new(port_range_start: u16, port_range_end: u16) -> Self {
        Self {
            instances: Mutex::new(HashMap::new()),
            port_range_start,
            port_range_end,
        }
    }

    fn generate_db_password() -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(DB_PASSWORD_LEN)
            .map(char::from)
            .collect()
    }
}

#[async_trait]
impl InstanceRegistry for InMemoryInstanceRegistry {
    async fn get(&self, id: &Uuid) -> Result<Option<Instance>, DomainError> {
        let instances = self.instances.lock().await;
        Ok(instances.get(id).cloned())
    }

    async fn list_by_scope(&self, scope: &AccessScope) -> Result<Vec<Instance>, DomainError> {
        let instances = self.instances.lock().await;
        let mut rows: Vec<Instance> = instances
            .values()
            .filter(|i| scope.permits(&i.tenant_id))
            .cloned()
            .collect();
        rows.sort_by_key(|i| i.created_at);
        Ok(rows)
    }

    async fn list_in_states(
        &self,
        states: &[InstanceState],
    ) -> Result<Vec<Instance>, DomainError> {
        let instances = self.instances.lock().await;
        let mut rows: Vec<Instance> = instances
            .values()
            .filter(|i| states.contains(&i.state))
            .cloned()
            .collect();
        rows.sort_by_key(|i| i.created_at);
        Ok(rows)
    }

    async fn count_live_for_tenant(&self, tenant_id: &Uuid) -> Result<i64, DomainError> {
        let instances = self.instances.lock().await;
        Ok(instances
            .values()
            .filter(|i| &i.tenant_id == tenant_id && i.is_live())
            .count() as i64)
    }

    async fn create(&self, draft: InstanceDraft) -> Result<Instance, DomainError> {
        let mut instances = self.instances.lock().await;

        if instances
            .values()
            .any(|i| i.is_live() && i.name == draft.name)
        {
            return Err(DomainError::ValidationError(format!(
                "instance name already in use: {}",
                draft.name
            )));
        }
        if instances
            .values()
            .any(|i| i.is_live() && i.domain == draft.domain)
        {
            return Err(DomainError::ValidationError(format!(
                "domain already in use: {}",
                draft.domain
            )));
        }

        // Lowest free port among non-REMOVED holders.
        let port = (self.port_range_start..=self.port_range_end)
            .find(|p| {
                !instances
                    .values()
                    .any(|i| i.is_live() && i.port == *p as i32)
            })
            .ok_or_else(|| {
                DomainError::ResourceExhausted(format!(
                    "port range {}-{} exhausted",
                    self.port_range_start, self.port_range_end
                ))
            })?;

        let now = Utc::now();
        let instance = Instance {
            id: draft.id,
            tenant_id: draft.tenant_id,
            subscription_id: draft.subscription_id,
            name: draft.name.clone(),
            domain: draft.domain,
            port: port as i32,
            db_name: format!("{}{}", DB_NAME_PREFIX, draft.name),
            db_password: Self::generate_db_password(),
            state: InstanceState::Created,
            last_error: None,
            created_at: now,
            last_transitioned_at: now,
        };

        instances.insert(instance.id, instance.clone());
        Ok(instance)
    }

    async fn compare_and_transition(
        &self,
        id: &Uuid,
        expected: InstanceState,
        next: InstanceState,
        error: Option<String>,
    ) -> Result<Instance, DomainError> {
        let mut instances = self.instances.lock().await;
        let instance = instances.get_mut(id).ok_or(DomainError::NotFound)?;

        if instance.state != expected {
            return Err(DomainError::StaleState {
                expected,
                actual: instance.state,
            });
        }

        instance.state = next;
        instance.last_error = error;
        instance.last_transitioned_at = Utc::now();
        Ok(instance.clone())
    }
}
