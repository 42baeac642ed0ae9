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

//! Persistent session management for the device link.
//!
//! The device is reached over a USB-tethered link that can vanish on
//! unplug or reboot and reappear as a different unit. The session keeps at
//! most one live transport per process, re-establishes it on demand, and
//! serializes the handshake so a burst of concurrent callers produces a
//! single connection attempt.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use super::client::{Client, CommandOutput};
use super::known_hosts::{forget_host, StrictHostKeyChecking};
use super::Error;
use crate::config::ConnectionConfig;
use crate::executor::transport::{RemoteCommand, Transport};
use crate::security::EscalationPassword;

struct SessionState {
    client: Option<Client>,
    last_activity: Option<Instant>,
}

/// Lock-guarded singleton connection to the device.
pub struct Session {
    config: ConnectionConfig,
    strict_mode: StrictHostKeyChecking,
    state: Mutex<SessionState>,
}

impl Session {
    /// Create a session manager. No connection is made until first use.
    pub fn new(config: ConnectionConfig) -> Self {
        tracing::debug!(
            "Session manager initialized for {}@{}:{} (not connected yet)",
            config.username,
            config.host,
            config.port
        );
        Self {
            config,
            strict_mode: StrictHostKeyChecking::AcceptNew,
            state: Mutex::new(SessionState {
                client: None,
                last_activity: None,
            }),
        }
    }

    pub fn with_strict_mode(mut self, strict_mode: StrictHostKeyChecking) -> Self {
        self.strict_mode = strict_mode;
        self
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Get a live client, connecting if necessary.
    ///
    /// Exactly one caller performs the handshake; the rest block on the
    /// state lock and then reuse the established client. Command execution
    /// happens on the returned clone, outside the lock, so a slow command
    /// never starves other callers of the session.
    pub async fn client(&self) -> Result<Client, Error> {
        let mut state = self.state.lock().await;

        if let Some(client) = &state.client {
            if !client.is_closed() {
                return Ok(client.clone());
            }
            tracing::debug!("Cached connection is dead, reconnecting");
        }

        // Tear down any stale handle quietly before the fresh handshake.
        if let Some(stale) = state.client.take() {
            let _ = stale.disconnect().await;
        }

        tracing::info!(
            "Connecting to {}@{}:{}",
            self.config.username,
            self.config.host,
            self.config.port
        );

        let connected = match Client::connect(&self.config, self.strict_mode).await {
            Err(Error::HostKeyMismatch(endpoint)) => {
                // A re-flashed or swapped device reuses the address with a
                // new key. Purge the stale record and retry once.
                tracing::warn!("Stored identity for {endpoint} is stale, purging and retrying");
                if let Err(e) = forget_host(&self.config.host, self.config.port) {
                    tracing::warn!("Could not clear host identity: {e}");
                }
                Client::connect(&self.config, self.strict_mode).await
            }
            other => other,
        };

        match connected {
            Ok(client) => {
                tracing::info!("SSH connection established");
                state.client = Some(client.clone());
                state.last_activity = Some(Instant::now());
                Ok(client)
            }
            Err(e) if e.is_auth_failure() => {
                // Not retried here: hammering a rejecting server risks
                // remote lockout policies.
                tracing::error!("SSH authentication failed: {e}");
                Err(e)
            }
            Err(e) => {
                tracing::error!("SSH connection failed: {e}");
                Err(e)
            }
        }
    }

    /// Drop the cached client so the next call reconnects.
    ///
    /// Used after transport-level errors during execution; the handle is
    /// assumed broken and is not closed gracefully.
    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        if state.client.take().is_some() {
            tracing::debug!("Session marked stale, next command will reconnect");
        }
    }

    /// Record command activity on the session.
    pub async fn touch(&self) {
        let mut state = self.state.lock().await;
        state.last_activity = Some(Instant::now());
    }

    /// Close the connection and clear state.
    ///
    /// A non-silent disconnect also purges the stored host identity record
    /// so a swapped or re-flashed device at the same address does not fail
    /// verification on the next connect.
    pub async fn disconnect(&self, silent: bool) {
        let mut state = self.state.lock().await;
        if let Some(client) = state.client.take() {
            let _ = client.disconnect().await;
        }
        state.last_activity = None;
        drop(state);

        if !silent {
            match forget_host(&self.config.host, self.config.port) {
                Ok(true) => {
                    tracing::info!("Cleared stored host identity for {}", self.config.host)
                }
                Ok(false) => {}
                Err(e) => tracing::warn!("Could not clear host identity: {e}"),
            }
            tracing::info!("SSH connection closed");
        }
    }

    pub async fn is_connected(&self) -> bool {
        let state = self.state.lock().await;
        state
            .client
            .as_ref()
            .map(|client| !client.is_closed())
            .unwrap_or(false)
    }

    pub async fn last_activity(&self) -> Option<Instant> {
        self.state.lock().await.last_activity
    }
}

/// Primary execution strategy: commands run over the persistent session.
pub struct SessionTransport {
    session: Arc<Session>,
    escalation: Option<EscalationPassword>,
}

impl SessionTransport {
    pub fn new(config: ConnectionConfig) -> Self {
        let escalation = config.escalation_password();
        Self {
            session: Arc::new(Session::new(config)),
            escalation,
        }
    }

    pub fn session(&self) -> Arc<Session> {
        Arc::clone(&self.session)
    }

    /// Build the transport-level command line and stdin payload.
    ///
    /// Privileged commands become `sudo -S -p '' <line>` with the
    /// credential written to the channel's stdin; without a credential,
    /// `sudo -n` guarantees sudo fails instead of waiting on a prompt.
    fn prepare(&self, command: &RemoteCommand) -> (String, Option<zeroize::Zeroizing<Vec<u8>>>) {
        if !command.elevate {
            return (command.line.clone(), None);
        }
        match &self.escalation {
            Some(password) => (
                format!("sudo -S -p '' {}", command.line),
                Some(password.with_newline()),
            ),
            None => (format!("sudo -n {}", command.line), None),
        }
    }
}

#[async_trait::async_trait]
impl Transport for SessionTransport {
    fn name(&self) -> &'static str {
        "session"
    }

    async fn run(
        &self,
        command: &RemoteCommand,
        timeout: Duration,
    ) -> Result<CommandOutput, Error> {
        // Auth rejections keep their identity; everything else that keeps
        // a channel from existing is one failure class to callers.
        let client = self.session.client().await.map_err(|e| {
            if e.is_auth_failure() {
                e
            } else {
                Error::ConnectionUnavailable(Box::new(e))
            }
        })?;
        let (line, stdin) = self.prepare(command);

        tracing::debug!("Executing: {}", command.display_line());

        // Elevated commands run without a pty so the tty cannot echo the
        // injected credential into the captured output.
        let request_pty = !command.elevate;

        match tokio::time::timeout(timeout, client.execute(&line, stdin, request_pty)).await {
            // The wait is abandoned but the session survives; the remote
            // process is not killed (no channel id is tracked for that).
            Err(_) => Err(Error::CommandTimeout(timeout.as_secs())),
            Ok(Err(e)) => {
                // Channel-level failure: assume the transport is broken so
                // the next command reconnects.
                self.session.invalidate().await;
                Err(e)
            }
            Ok(Ok(output)) => {
                self.session.touch().await;
                Ok(output)
            }
        }
    }

    async fn reset(&self) -> Result<(), Error> {
        self.session.disconnect(false).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport_with_password(password: Option<&str>) -> SessionTransport {
        SessionTransport::new(ConnectionConfig {
            password: password.map(str::to_string),
            ..Default::default()
        })
    }

    #[test]
    fn test_prepare_plain_command() {
        let transport = transport_with_password(Some("pw"));
        let (line, stdin) = transport.prepare(&RemoteCommand::parse("uptime"));
        assert_eq!(line, "uptime");
        assert!(stdin.is_none());
    }

    #[test]
    fn test_prepare_elevated_injects_via_stdin() {
        let transport = transport_with_password(Some("pw"));
        let (line, stdin) = transport.prepare(&RemoteCommand::parse("sudo whoami"));
        assert_eq!(line, "sudo -S -p '' whoami");
        // The credential goes to stdin, never into the command line.
        assert!(!line.contains("pw"));
        assert_eq!(&*stdin.unwrap(), b"pw\n");
    }

    #[test]
    fn test_prepare_elevated_without_credential_is_noninteractive() {
        let transport = transport_with_password(None);
        let (line, stdin) = transport.prepare(&RemoteCommand::elevated("whoami"));
        assert_eq!(line, "sudo -n whoami");
        assert!(stdin.is_none());
    }

    #[tokio::test]
    async fn test_session_starts_disconnected() {
        let session = Session::new(ConnectionConfig::default());
        assert!(!session.is_connected().await);
        assert!(session.last_activity().await.is_none());
    }
}
