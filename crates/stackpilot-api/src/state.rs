use std::sync::Arc;

use stackpilot_core::registry::InstanceRegistry;
use stackpilot_core::repositories::{
    ActionLogRepository, PlanRepository, SubscriptionRepository, TenantRepository,
};
use stackpilot_core::services::{ActionDispatcher, ReportingService};

use crate::auth::JwtKeys;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<ActionDispatcher>,
    pub registry: Arc<dyn InstanceRegistry>,
    pub tenants: Arc<dyn TenantRepository>,
    pub plans: Arc<dyn PlanRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub action_logs: Arc<dyn ActionLogRepository>,
    pub reporting: ReportingService,
    pub jwt: Arc<JwtKeys>,
}
