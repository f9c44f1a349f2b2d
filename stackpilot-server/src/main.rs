use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use stackpilot_api::{auth::JwtKeys, build_router, state::AppState};
use stackpilot_core::services::{
    ActionDispatcher, EntitlementService, InstanceLockTable, ReconciliationSweeper,
    ReportingService,
};
use stackpilot_infrastructure::database::postgres::{
    PgActionLogRepository, PgInstanceRegistry, PgPlanRepository, PgSubscriptionRepository,
    PgTenantRepository,
};
use stackpilot_infrastructure::database::{connection, run_migrations};
use stackpilot_infrastructure::executor::ScriptExecutor;
use stackpilot_shared::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenvy::dotenv().ok();

    // Initialize telemetry
    stackpilot_shared::telemetry::init_telemetry();

    info!("Stackpilot server starting...");

    // Load configuration
    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Connect to database
    info!("Connecting to database...");
    let pool = connection::create_pool(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await?;
    run_migrations(&pool).await?;
    info!("Database connection established.");

    // Repositories
    let registry = Arc::new(PgInstanceRegistry::new(
        pool.clone(),
        config.provisioner.port_range_start,
        config.provisioner.port_range_end,
    ));
    let tenants = Arc::new(PgTenantRepository::new(pool.clone()));
    let plans = Arc::new(PgPlanRepository::new(pool.clone()));
    let subscriptions = Arc::new(PgSubscriptionRepository::new(pool.clone()));
    let action_logs = Arc::new(PgActionLogRepository::new(pool.clone()));

    // Provisioning executor
    let executor = Arc::new(ScriptExecutor::new(&config.provisioner.script_path));

    // Orchestration services
    let locks = InstanceLockTable::new();
    let entitlements = EntitlementService::new(subscriptions.clone(), plans.clone());
    let dispatcher = Arc::new(ActionDispatcher::new(
        registry.clone(),
        entitlements,
        executor.clone(),
        action_logs.clone(),
        locks.clone(),
        Duration::from_secs(config.provisioner.executor_timeout_secs),
    ));
    let reporting = ReportingService::new(
        tenants.clone(),
        plans.clone(),
        subscriptions.clone(),
        registry.clone(),
    );

    // Reconciliation sweeper as a background task
    let sweeper = ReconciliationSweeper::new(
        registry.clone(),
        executor.clone(),
        locks.clone(),
        Duration::from_secs(config.sweeper.interval_secs),
        config.sweeper.probe_settled,
    );
    tokio::spawn(sweeper.run());
    info!(
        "Reconciliation sweeper running every {}s",
        config.sweeper.interval_secs
    );

    // App state + router
    let state = AppState {
        dispatcher,
        registry,
        tenants,
        plans,
        subscriptions,
        action_logs,
        reporting,
        jwt: Arc::new(JwtKeys::new(&config.auth.jwt_secret)),
    };
    let app = build_router(state);

    // Bind address
    let host: std::net::IpAddr = config.app.host.parse()?;
    let addr = SocketAddr::from((host, config.app.port));
    info!("Listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received shutdown signal");
        })
        .await?;

    Ok(())
}
