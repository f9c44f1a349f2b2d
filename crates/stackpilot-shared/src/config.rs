//! Configuration management

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub provisioner: ProvisionerSettings,
    pub sweeper: SweeperSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub env: String,
    pub host: String,
    pub port: u16,
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
}

/// Settings for instance provisioning: where the port pool lives, which
/// script drives the underlying stacks, and how long a single executor call
/// may run before it is treated as failed.
#[derive(Debug, Deserialize, Clone)]
pub struct ProvisionerSettings {
    pub port_range_start: u16,
    pub port_range_end: u16,
    pub domain_suffix: String,
    pub script_path: String,
    pub executor_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SweeperSettings {
    pub interval_secs: u64,
    /// Also probe RUNNING/STOPPED instances for silent drift.
    pub probe_settled: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        let config = Config::builder()
            .set_default("app.env", "development")?
            .set_default("app.host", "127.0.0.1")?
            .set_default("app.port", 8080)?
            .set_default("app.name", "stackpilot-server")?
            .set_default("database.url", "postgres://localhost/stackpilot")?
            .set_default("database.max_connections", 16)?
            .set_default("database.min_connections", 1)?
            .set_default("auth.jwt_secret", "change-me")?
            .set_default("provisioner.port_range_start", 8070)?
            .set_default("provisioner.port_range_end", 8470)?
            .set_default("provisioner.domain_suffix", "apps.localhost")?
            .set_default("provisioner.script_path", "./deploy-instance.sh")?
            .set_default("provisioner.executor_timeout_secs", 300)?
            .set_default("sweeper.interval_secs", 60)?
            .set_default("sweeper.probe_settled", true)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::default().separator("__").try_parsing(true))
            .build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_defaults() {
        let config = AppConfig::load().expect("defaults should deserialize");
        assert_eq!(config.app.port, 8080);
        assert!(config.provisioner.port_range_start < config.provisioner.port_range_end);
        assert_eq!(config.provisioner.executor_timeout_secs, 300);
    }
}
