//! Provisioning executor implementations

pub mod script;

pub use script::ScriptExecutor;
