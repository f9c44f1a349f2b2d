//! HTTP handlers

pub mod auth;
pub mod clients;
pub mod dashboard;
pub mod health;
pub mod instances;
pub mod plans;
pub mod subscriptions;
