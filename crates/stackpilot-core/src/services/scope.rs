//! Access scope guard
//!
//! The single authorization boundary in front of the registry. Staff see
//! everything; tenant callers see only their own rows, and anything outside
//! that scope surfaces as `NotFound` so existence never leaks.

use crate::domain::{AccessScope, CallerIdentity, CallerRole, Instance};
use crate::error::DomainError;

pub struct AccessScopeGuard;

impl AccessScopeGuard {
    pub fn scope(caller: &CallerIdentity) -> Result<AccessScope, DomainError> {
        match caller.role {
            CallerRole::Staff => Ok(AccessScope::All),
            CallerRole::Tenant => caller
                .tenant_id
                .map(AccessScope::Tenant)
                .ok_or_else(|| {
                    DomainError::InternalError(
                        "tenant caller carries no tenant identity".to_string(),
                    )
                }),
        }
    }

    /// `NotFound` if the instance is outside the caller's scope.
    pub fn authorize_instance(
        caller: &CallerIdentity,
        instance: &Instance,
    ) -> Result<(), DomainError> {
        let scope = Self::scope(caller)?;
        if scope.permits(&instance.tenant_id) {
            Ok(())
        } else {
            Err(DomainError::NotFound)
        }
    }

    /// Staff-only operations answer `NotFound` to tenant callers.
    pub fn require_staff(caller: &CallerIdentity) -> Result<(), DomainError> {
        if caller.is_staff() {
            Ok(())
        } else {
            Err(DomainError::NotFound)
        }
    }
}
