//! Instance lifecycle state machine
//!
//! States, actions, and the transition table. Every registry mutation goes
//! through a `TransitionPlan` produced here; nothing else decides which
//! state an instance may enter next.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Lifecycle state of a provisioned instance.
///
/// `Removed` is the only terminal state. `Error` is terminal for automation:
/// the sweeper never rewrites it, only an explicit caller action moves an
/// instance out of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceState {
    Created,
    Deploying,
    Running,
    Stopping,
    Stopped,
    Starting,
    Restarting,
    Deleting,
    Removed,
    Error,
}

impl InstanceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceState::Created => "CREATED",
            InstanceState::Deploying => "DEPLOYING",
            InstanceState::Running => "RUNNING",
            InstanceState::Stopping => "STOPPING",
            InstanceState::Stopped => "STOPPED",
            InstanceState::Starting => "STARTING",
            InstanceState::Restarting => "RESTARTING",
            InstanceState::Deleting => "DELETING",
            InstanceState::Removed => "REMOVED",
            InstanceState::Error => "ERROR",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "CREATED" => Some(InstanceState::Created),
            "DEPLOYING" => Some(InstanceState::Deploying),
            "RUNNING" => Some(InstanceState::Running),
            "STOPPING" => Some(InstanceState::Stopping),
            "STOPPED" => Some(InstanceState::Stopped),
            "STARTING" => Some(InstanceState::Starting),
            "RESTARTING" => Some(InstanceState::Restarting),
            "DELETING" => Some(InstanceState::Deleting),
            "REMOVED" => Some(InstanceState::Removed),
            "ERROR" => Some(InstanceState::Error),
            _ => None,
        }
    }

    /// Human-readable label for portal display.
    pub fn label(&self) -> &'static str {
        match self {
            InstanceState::Created => "Created - Pending Deployment",
            InstanceState::Deploying => "Deploying",
            InstanceState::Running => "Running",
            InstanceState::Stopping => "Stopping",
            InstanceState::Stopped => "Stopped",
            InstanceState::Starting => "Starting",
            InstanceState::Restarting => "Restarting",
            InstanceState::Deleting => "Deleting",
            InstanceState::Removed => "Removed",
            InstanceState::Error => "Error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, InstanceState::Removed)
    }

    /// An intermediate marker: an action was accepted and the executor call
    /// is (or was) in flight.
    pub fn is_intermediate(&self) -> bool {
        matches!(
            self,
            InstanceState::Deploying
                | InstanceState::Starting
                | InstanceState::Stopping
                | InstanceState::Restarting
                | InstanceState::Deleting
        )
    }
}

impl std::fmt::Display for InstanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle action requested against an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleAction {
    /// Implicit first deployment after create.
    Provision,
    Start,
    Stop,
    Restart,
    Delete,
}

impl LifecycleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleAction::Provision => "PROVISION",
            LifecycleAction::Start => "START",
            LifecycleAction::Stop => "STOP",
            LifecycleAction::Restart => "RESTART",
            LifecycleAction::Delete => "DELETE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PROVISION" => Some(LifecycleAction::Provision),
            "START" => Some(LifecycleAction::Start),
            "STOP" => Some(LifecycleAction::Stop),
            "RESTART" => Some(LifecycleAction::Restart),
            "DELETE" => Some(LifecycleAction::Delete),
            _ => None,
        }
    }

    pub fn allowed_from(&self, state: InstanceState) -> bool {
        match self {
            LifecycleAction::Provision => matches!(state, InstanceState::Created),
            LifecycleAction::Start => {
                matches!(state, InstanceState::Stopped | InstanceState::Error)
            }
            LifecycleAction::Stop => {
                matches!(state, InstanceState::Running | InstanceState::Error)
            }
            LifecycleAction::Restart => matches!(
                state,
                InstanceState::Running | InstanceState::Stopped | InstanceState::Error
            ),
            LifecycleAction::Delete => {
                !matches!(state, InstanceState::Deleting | InstanceState::Removed)
            }
        }
    }

    /// Resolve the transition plan for this action from `current`, or fail
    /// with `InvalidTransition` without any mutation.
    pub fn plan(&self, current: InstanceState) -> Result<TransitionPlan, DomainError> {
        if !self.allowed_from(current) {
            return Err(DomainError::InvalidTransition {
                action: *self,
                state: current,
            });
        }

        let (intermediate, on_success) = match self {
            LifecycleAction::Provision => (InstanceState::Deploying, InstanceState::Running),
            LifecycleAction::Start => (InstanceState::Starting, InstanceState::Running),
            LifecycleAction::Stop => (InstanceState::Stopping, InstanceState::Stopped),
            LifecycleAction::Restart => (InstanceState::Restarting, InstanceState::Running),
            LifecycleAction::Delete => (InstanceState::Deleting, InstanceState::Removed),
        };

        Ok(TransitionPlan {
            intermediate,
            on_success,
            on_failure: InstanceState::Error,
        })
    }
}

impl std::fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three states an accepted action moves through: the intermediate
/// marker, then one of the two settle states depending on the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionPlan {
    pub intermediate: InstanceState,
    pub on_success: InstanceState,
    pub on_failure: InstanceState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provision_only_from_created() {
        assert!(LifecycleAction::Provision.allowed_from(InstanceState::Created));
        assert!(!LifecycleAction::Provision.allowed_from(InstanceState::Running));
        assert!(!LifecycleAction::Provision.allowed_from(InstanceState::Error));
    }

    #[test]
    fn test_start_from_stopped_and_error() {
        assert!(LifecycleAction::Start.allowed_from(InstanceState::Stopped));
        assert!(LifecycleAction::Start.allowed_from(InstanceState::Error));
        assert!(!LifecycleAction::Start.allowed_from(InstanceState::Running));
        assert!(!LifecycleAction::Start.allowed_from(InstanceState::Removed));
    }

    #[test]
    fn test_delete_from_any_but_deleting_and_removed() {
        for state in [
            InstanceState::Created,
            InstanceState::Deploying,
            InstanceState::Running,
            InstanceState::Stopped,
            InstanceState::Error,
        ] {
            assert!(LifecycleAction::Delete.allowed_from(state), "{state}");
        }
        assert!(!LifecycleAction::Delete.allowed_from(InstanceState::Deleting));
        assert!(!LifecycleAction::Delete.allowed_from(InstanceState::Removed));
    }

    #[test]
    fn test_plan_resolves_settle_states() {
        let plan = LifecycleAction::Restart.plan(InstanceState::Stopped).unwrap();
        assert_eq!(plan.intermediate, InstanceState::Restarting);
        assert_eq!(plan.on_success, InstanceState::Running);
        assert_eq!(plan.on_failure, InstanceState::Error);
    }

    #[test]
    fn test_plan_rejects_invalid_transition() {
        let err = LifecycleAction::Stop.plan(InstanceState::Stopped).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
    }

    #[test]
    fn test_state_round_trip() {
        for state in [
            InstanceState::Created,
            InstanceState::Deploying,
            InstanceState::Removed,
            InstanceState::Error,
        ] {
            assert_eq!(InstanceState::from_str(state.as_str()), Some(state));
        }
        assert_eq!(InstanceState::from_str("BOGUS"), None);
    }
}
