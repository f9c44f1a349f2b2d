//! # Stackpilot Shared
//!
//! Configuration, telemetry, constants, and common types shared across the
//! stackpilot workspace.

pub mod config;
pub mod constants;
pub mod error;
pub mod telemetry;
pub mod types;
