// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The canonical command executor.
//!
//! All collaborators (diagnostic probes, CLI handlers) execute remote
//! commands through this type and receive outcomes as data: a failing
//! command or a dead link produces a classified [`ExecutionResult`], never
//! a fault that could take the caller down with it.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use super::result::{ExecutionResult, FailureKind};
use super::transport::{RemoteCommand, Transport};
use crate::config::{ConnectionConfig, TransportKind};
use crate::security::contains_sudo_failure;
use crate::ssh::{Error, ProcessTransport, SessionTransport};

/// Pick the execution strategy once at startup.
///
/// The in-process client is preferred; the external-client fallback is for
/// environments or servers it cannot handle, and its capability check
/// (a runnable `ssh` binary) happens here rather than on first use.
pub fn select_transport(config: &ConnectionConfig) -> Result<Arc<dyn Transport>, Error> {
    match config.transport {
        TransportKind::Native => Ok(Arc::new(SessionTransport::new(config.clone()))),
        TransportKind::Process => Ok(Arc::new(ProcessTransport::new(config.clone())?)),
        TransportKind::Auto => {
            // Nothing to probe for the in-process client; it carries its
            // own protocol implementation.
            Ok(Arc::new(SessionTransport::new(config.clone())))
        }
    }
}

/// Executes remote commands and classifies their outcomes.
pub struct CommandExecutor {
    transport: Arc<dyn Transport>,
    default_timeout: Duration,
}

impl CommandExecutor {
    /// Build an executor from validated configuration.
    ///
    /// Validation failures surface immediately as [`crate::config::ConfigError`];
    /// a doomed configuration never reaches the network.
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        config.validate()?;
        let default_timeout = config.command_timeout();
        let transport = select_transport(&config)
            .context("Failed to initialize the command transport")?;
        tracing::debug!("Using {} transport", transport.name());
        Ok(Self {
            transport,
            default_timeout,
        })
    }

    /// Build an executor over an explicit transport. Used by tests and by
    /// callers that manage transport selection themselves.
    pub fn with_transport(transport: Arc<dyn Transport>, default_timeout: Duration) -> Self {
        Self {
            transport,
            default_timeout,
        }
    }

    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Run one command with the default timeout.
    ///
    /// A leading `sudo ` prefix is honored as an escalation request for
    /// compatibility with callers that hand-roll it.
    pub async fn execute(&self, command: &str) -> ExecutionResult {
        self.run(RemoteCommand::parse(command), self.default_timeout)
            .await
    }

    pub async fn execute_with_timeout(&self, command: &str, timeout: Duration) -> ExecutionResult {
        self.run(RemoteCommand::parse(command), timeout).await
    }

    /// Run one command with privilege escalation.
    pub async fn execute_elevated(&self, command: &str) -> ExecutionResult {
        self.run(RemoteCommand::elevated(command), self.default_timeout)
            .await
    }

    pub async fn execute_elevated_with_timeout(
        &self,
        command: &str,
        timeout: Duration,
    ) -> ExecutionResult {
        self.run(RemoteCommand::elevated(command), timeout).await
    }

    /// Run a structured command with an explicit timeout.
    pub async fn run(&self, command: RemoteCommand, timeout: Duration) -> ExecutionResult {
        let label = command.display_line();

        if timeout.is_zero() {
            return ExecutionResult::failure(
                label,
                FailureKind::Config,
                "timeout must be positive",
            );
        }

        match self.transport.run(&command, timeout).await {
            Ok(output) => {
                if output.exit_status == 0 {
                    ExecutionResult::success(label, output.stdout)
                } else {
                    let exit_code = output.exit_status as i32;
                    let detail = if output.stderr.trim().is_empty() {
                        output.stdout.trim().to_string()
                    } else {
                        output.stderr.trim().to_string()
                    };
                    if command.elevate && contains_sudo_failure(&detail) {
                        ExecutionResult::escalation_denied(
                            label,
                            output.stdout,
                            format!("privilege escalation failed: {detail}"),
                            exit_code,
                        )
                    } else {
                        let detail = if detail.is_empty() {
                            format!("command exited with status {exit_code}")
                        } else {
                            detail
                        };
                        ExecutionResult::remote_exit(label, output.stdout, detail, exit_code)
                    }
                }
            }
            Err(e) => classify_error(label, e),
        }
    }

    /// Force-drop the session and purge the stored host identity.
    ///
    /// For device-swap scenarios: the next command reconnects from scratch
    /// and re-learns the remote identity.
    pub async fn reset_connection(&self) -> (bool, String) {
        match self.transport.reset().await {
            Ok(()) => (
                true,
                "Connection reset and stored host identity cleared".to_string(),
            ),
            Err(e) => (false, format!("Reset failed: {e}")),
        }
    }
}

/// Map a transport error onto the caller-facing failure taxonomy.
fn classify_error(command: String, error: Error) -> ExecutionResult {
    match &error {
        e if e.is_auth_failure() => ExecutionResult::failure(
            command,
            FailureKind::Auth,
            format!("authentication failed: {e}"),
        ),
        Error::CommandTimeout(secs) => ExecutionResult::failure(
            command,
            FailureKind::Timeout,
            format!("timed out after {secs}s"),
        ),
        Error::ConnectionUnavailable(_) => ExecutionResult::failure(
            command,
            FailureKind::Transport,
            // The display form already carries the classification prefix.
            error.to_string(),
        ),
        Error::ConnectTimeout(_)
        | Error::HostKeyMismatch(_)
        | Error::ClientUnavailable(_) => ExecutionResult::failure(
            command,
            FailureKind::Transport,
            format!("connection unavailable: {error}"),
        ),
        _ => ExecutionResult::failure(
            command,
            FailureKind::Transport,
            format!("transport error: {error}"),
        ),
    }
}
