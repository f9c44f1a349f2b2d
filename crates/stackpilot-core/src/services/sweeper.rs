//! Reconciliation sweeper
//!
//! Recurring background pass over non-terminal instances: query the
//! executor for ground truth and correct registry drift. Never blocks on a
//! held lock: an in-flight dispatcher call always wins and the instance is
//! simply skipped for this pass. ERROR instances are left alone; only an
//! explicit caller action moves out of ERROR.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::domain::InstanceState;
use crate::error::DomainError;
use crate::registry::InstanceRegistry;

use super::executor::{ExecutorStatus, ProvisioningExecutor};
use super::locks::InstanceLockTable;

#[derive(Debug, Default, Clone, Copy)]
pub struct SweepReport {
    pub examined: usize,
    pub corrected: usize,
    pub skipped_locked: usize,
}

pub struct ReconciliationSweeper {
    registry: Arc<dyn InstanceRegistry>,
    executor: Arc<dyn ProvisioningExecutor>,
    locks: InstanceLockTable,
    interval: Duration,
    probe_settled: bool,
}

impl ReconciliationSweeper {
    pub fn new(
        registry: Arc<dyn InstanceRegistry>,
        executor: Arc<dyn ProvisioningExecutor>,
        locks: InstanceLockTable,
        interval: Duration,
        probe_settled: bool,
    ) -> Self {
        Self {
            registry,
            executor,
            locks,
            interval,
            probe_settled,
        }
    }

    /// Fixed-cadence loop; each pass is cheap and idempotent, so no backoff.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match self.sweep_once().await {
                Ok(report) if report.corrected > 0 => {
                    info!(
                        "sweep corrected {} of {} examined instances ({} locked, skipped)",
                        report.corrected, report.examined, report.skipped_locked
                    );
                }
                Ok(report) => {
                    debug!(
                        "sweep examined {} instances, no drift ({} locked, skipped)",
                        report.examined, report.skipped_locked
                    );
                }
                Err(e) => warn!("sweep pass failed: {}", e),
            }
        }
    }

    pub async fn sweep_once(&self) -> Result<SweepReport, DomainError> {
        let mut states = vec![
            InstanceState::Deploying,
            InstanceState::Starting,
            InstanceState::Stopping,
            InstanceState::Restarting,
            InstanceState::Deleting,
        ];
        if self.probe_settled {
            states.push(InstanceState::Running);
            states.push(InstanceState::Stopped);
        }

        let mut report = SweepReport::default();

        for candidate in self.registry.list_in_states(&states).await? {
            let Some(_lock) = self.locks.try_acquire(candidate.id) else {
                report.skipped_locked += 1;
                continue;
            };

            // Re-read under the lock; the dispatcher may have settled the
            // instance between the listing and the acquire.
            let Some(current) = self.registry.get(&candidate.id).await? else {
                continue;
            };
            if !states.contains(&current.state) {
                continue;
            }
            report.examined += 1;

            let observed = match self.executor.status(&current).await {
                Ok(status) => status,
                Err(e) => {
                    warn!(
                        "ground-truth query failed for instance {}: {}",
                        current.id, e
                    );
                    continue;
                }
            };

            if let Some((next, note)) = correction(current.state, observed) {
                match self
                    .registry
                    .compare_and_transition(&current.id, current.state, next, note)
                    .await
                {
                    Ok(_) => {
                        report.corrected += 1;
                        info!(
                            "sweep corrected instance {}: {} -> {}",
                            current.id, current.state, next
                        );
                    }
                    // Lost the race to a concurrent writer; the next pass
                    // sees the fresh state.
                    Err(DomainError::StaleState { .. }) => {}
                    Err(e) => return Err(e),
                }
            }
        }

        Ok(report)
    }
}

/// Map the recorded state and the executor's ground truth to the corrective
/// transition, if any. Drift notes mark the unexpected mismatches.
fn correction(
    recorded: InstanceState,
    observed: ExecutorStatus,
) -> Option<(InstanceState, Option<String>)> {
    match (recorded, observed) {
        (InstanceState::Running, ExecutorStatus::Running) => None,
        (InstanceState::Stopped, ExecutorStatus::Stopped) => None,

        // A vanished stack under a DELETING marker is a completed delete.
        (InstanceState::Deleting, ExecutorStatus::Absent) => Some((InstanceState::Removed, None)),
        (_, ExecutorStatus::Absent) => Some((
            InstanceState::Error,
            Some("drift: backing stack is missing".to_string()),
        )),

        (InstanceState::Running, ExecutorStatus::Stopped) => Some((
            InstanceState::Stopped,
            Some("drift: registry recorded RUNNING but executor reports stopped".to_string()),
        )),
        (InstanceState::Stopped, ExecutorStatus::Running) => Some((
            InstanceState::Running,
            Some("drift: registry recorded STOPPED but executor reports running".to_string()),
        )),

        // Interrupted transition (crash mid-action): adopt what the executor
        // actually reached.
        (_, ExecutorStatus::Running) => Some((InstanceState::Running, None)),
        (_, ExecutorStatus::Stopped) => Some((InstanceState::Stopped, None)),
    }
}
