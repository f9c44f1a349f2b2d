//! Staff dashboard aggregation.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::{AccessScope, InstanceState, Plan};
use crate::error::DomainError;
use crate::registry::InstanceRegistry;
use crate::repositories::{PlanRepository, SubscriptionRepository, TenantRepository};

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub total_clients: usize,
    pub active_subscriptions: usize,
    /// Sum of plan prices over currently ACTIVE subscriptions.
    pub monthly_revenue: f64,
    pub total_instances: usize,
    pub running_instances: usize,
    pub error_instances: usize,
}

#[derive(Clone)]
pub struct ReportingService {
    tenants: Arc<dyn TenantRepository>,
    plans: Arc<dyn PlanRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    registry: Arc<dyn InstanceRegistry>,
}

impl ReportingService {
    pub fn new(
        tenants: Arc<dyn TenantRepository>,
        plans: Arc<dyn PlanRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        registry: Arc<dyn InstanceRegistry>,
    ) -> Self {
        Self {
            tenants,
            plans,
            subscriptions,
            registry,
        }
    }

    pub async fn dashboard_summary(&self) -> Result<DashboardSummary, DomainError> {
        let tenants = self.tenants.list().await?;
        let plans: HashMap<Uuid, Plan> = self
            .plans
            .list()
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let active = self.subscriptions.list_active().await?;

        let monthly_revenue = active
            .iter()
            .filter_map(|s| plans.get(&s.plan_id))
            .map(|p| p.price)
            .sum();

        let instances = self.registry.list_by_scope(&AccessScope::All).await?;
        let live = instances.iter().filter(|i| i.is_live()).count();
        let running = instances
            .iter()
            .filter(|i| i.state == InstanceState::Running)
            .count();
        let errored = instances
            .iter()
            .filter(|i| i.state == InstanceState::Error)
            .count();

        Ok(DashboardSummary {
            total_clients: tenants.len(),
            active_subscriptions: active.len(),
            monthly_revenue,
            total_instances: live,
            running_instances: running,
            error_instances: errored,
        })
    }
}
