//! Entitlement evaluator
//!
//! Computes the quota envelope for a tenant from its current subscription
//! and plan. Snapshots are computed fresh per call and must not be stored
//! across requests; plan or subscription data may change between calls.

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use crate::domain::{EntitlementSnapshot, Subscription};
use crate::error::DomainError;
use crate::repositories::{PlanRepository, SubscriptionRepository};

#[derive(Clone)]
pub struct EntitlementService {
    subscriptions: Arc<dyn SubscriptionRepository>,
    plans: Arc<dyn PlanRepository>,
}

impl EntitlementService {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        plans: Arc<dyn PlanRepository>,
    ) -> Self {
        Self {
            subscriptions,
            plans,
        }
    }

    pub async fn evaluate(&self, tenant_id: &Uuid) -> Result<EntitlementSnapshot, DomainError> {
        self.evaluate_with_subscription(tenant_id)
            .await
            .map(|(snapshot, _)| snapshot)
    }

    /// Like [`evaluate`](Self::evaluate), but also hands back the
    /// subscription so the CREATE path can bind the new instance to it.
    pub async fn evaluate_with_subscription(
        &self,
        tenant_id: &Uuid,
    ) -> Result<(EntitlementSnapshot, Subscription), DomainError> {
        let subscription = self
            .subscriptions
            .find_current_by_tenant(tenant_id)
            .await?
            .ok_or(DomainError::NoActiveSubscription)?;

        // Suspended/expired binding: existing instances stay readable, the
        // quota for create/start is zero.
        if !subscription.is_active() {
            return Ok((EntitlementSnapshot::zero(), subscription));
        }

        let plan = self
            .plans
            .find_by_id(&subscription.plan_id)
            .await?
            .ok_or_else(|| {
                warn!(
                    "subscription {} references missing plan {}",
                    subscription.id, subscription.plan_id
                );
                DomainError::InternalError("subscription references a missing plan".to_string())
            })?;

        Ok((EntitlementSnapshot::from_plan(&plan), subscription))
    }
}
