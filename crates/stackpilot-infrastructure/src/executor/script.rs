//! Script-driven provisioning executor
//!
//! Drives the per-instance stacks through the operator-supplied
//! provisioning script:
//!
//! ```text
//! <script> deploy  <name> <domain> <port>
//! <script> start   <name>
//! <script> stop    <name>
//! <script> restart <name>
//! <script> destroy <name>
//! <script> status  <name>     # prints: running | stopped | absent
//! ```
//!
//! A non-zero exit settles the action as failed with the captured stderr as
//! the instance's error message.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use stackpilot_core::domain::Instance;
use stackpilot_core::error::DomainError;
use stackpilot_core::services::{ExecutorOp, ExecutorStatus, ProvisioningExecutor};

pub struct ScriptExecutor {
    script_path: PathBuf,
}

impl ScriptExecutor {
    pub fn new(script_path: impl Into<PathBuf>) -> Self {
        Self {
            script_path: script_path.into(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<String, DomainError> {
        debug!("executing {} {}", self.script_path.display(), args.join(" "));

        let output = Command::new(&self.script_path)
            .args(args)
            .output()
            .await
            .map_err(|e| {
                DomainError::ExecutorFailure(format!(
                    "failed to launch {}: {e}",
                    self.script_path.display()
                ))
            })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr.trim();
            Err(DomainError::ExecutorFailure(if message.is_empty() {
                format!("script exited with {}", output.status)
            } else {
                message.to_string()
            }))
        }
    }
}

#[async_trait]
impl ProvisioningExecutor for ScriptExecutor {
    async fn allocate(&self, instance: &Instance) -> Result<(), DomainError> {
        self.run(&[
            "deploy",
            &instance.name,
            &instance.domain,
            &instance.port.to_string(),
        ])
        .await
        .map(|_| ())
    }

    async fn transition(&self, instance: &Instance, op: ExecutorOp) -> Result<(), DomainError> {
        self.run(&[op.as_str(), &instance.name]).await.map(|_| ())
    }

    async fn deallocate(&self, instance: &Instance) -> Result<(), DomainError> {
        self.run(&["destroy", &instance.name]).await.map(|_| ())
    }

    async fn status(&self, instance: &Instance) -> Result<ExecutorStatus, DomainError> {
        let stdout = self.run(&["status", &instance.name]).await?;
        match stdout.trim().to_ascii_lowercase().as_str() {
            "running" => Ok(ExecutorStatus::Running),
            "stopped" => Ok(ExecutorStatus::Stopped),
            "absent" | "missing" => Ok(ExecutorStatus::Absent),
            other => Err(DomainError::ExecutorFailure(format!(
                "unrecognized status output: {other}"
            ))),
        }
    }
}
