//! # Stackpilot API
//!
//! HTTP handlers, DTOs, auth extraction, and error mapping.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod response;
pub mod state;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health::health_check))
        // Caller identity
        .route("/api/v1/me", get(handlers::auth::me))
        // Instances
        .route(
            "/api/v1/instances",
            get(handlers::instances::list_instances).post(handlers::instances::create_instance),
        )
        .route(
            "/api/v1/instances/{id}/start",
            post(handlers::instances::start_instance),
        )
        .route(
            "/api/v1/instances/{id}/stop",
            post(handlers::instances::stop_instance),
        )
        .route(
            "/api/v1/instances/{id}/restart",
            post(handlers::instances::restart_instance),
        )
        .route(
            "/api/v1/instances/{id}/remove",
            post(handlers::instances::remove_instance),
        )
        .route(
            "/api/v1/instances/{id}/logs",
            get(handlers::instances::instance_logs),
        )
        // Plan catalog
        .route(
            "/api/v1/plans",
            get(handlers::plans::list_plans).post(handlers::plans::create_plan),
        )
        .route(
            "/api/v1/plans/{id}",
            put(handlers::plans::update_plan).delete(handlers::plans::delete_plan),
        )
        // Subscriptions
        .route(
            "/api/v1/subscriptions",
            get(handlers::subscriptions::list_subscriptions)
                .post(handlers::subscriptions::create_subscription),
        )
        .route(
            "/api/v1/subscriptions/{id}",
            put(handlers::subscriptions::update_subscription),
        )
        // Tenant accounts
        .route("/api/v1/clients", get(handlers::clients::list_clients))
        // Staff dashboard
        .route(
            "/api/v1/dashboard/summary",
            get(handlers::dashboard::dashboard_summary),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
