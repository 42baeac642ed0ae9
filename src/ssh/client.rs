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

//! In-process SSH client for the device link.
//!
//! A thin wrapper over russh handling connection establishment with a
//! bounded timeout, password/key authentication, host key verification,
//! protocol keepalive, and per-command exec channels with optional stdin
//! credential injection.

use russh::client::{Config, Handle, Handler};
use russh::keys::PrivateKeyWithHashAlg;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use zeroize::Zeroizing;

use super::known_hosts::StrictHostKeyChecking;
use super::Error;
use crate::config::ConnectionConfig;

/// Buffer size for command stdout collection. 8KB matches typical SSH
/// channel window sizes and multi-line diagnostic output.
const CMD_BUFFER_SIZE: usize = 8192;

/// Buffer size for stderr, which is usually short status text.
const ERR_BUFFER_SIZE: usize = 1024;

/// Captured output of one remote command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// The stdout output of the command.
    pub stdout: String,
    /// The stderr output of the command. Empty when a pty was granted,
    /// since the remote side merges streams into the terminal.
    pub stderr: String,
    /// The unix exit status (`$?` in bash).
    pub exit_status: u32,
}

/// An authenticated connection to the device.
///
/// Cloning is cheap: clones share the underlying protocol handle, and each
/// command opens its own channel, so concurrent callers multiplex over one
/// transport.
#[derive(Clone)]
pub struct Client {
    handle: Arc<Handle<ClientHandler>>,
    host: String,
    port: u16,
}

impl Client {
    /// Open and authenticate a connection per the given configuration.
    ///
    /// The whole TCP + handshake + auth sequence is bounded by the
    /// configured connect timeout. Authentication errors come back as
    /// [`Error::PasswordWrong`] / [`Error::KeyAuthFailed`] so callers can
    /// tell them apart from transient link failures.
    pub async fn connect(
        config: &ConnectionConfig,
        strict_mode: StrictHostKeyChecking,
    ) -> Result<Self, Error> {
        let ssh_config = Arc::new(Config {
            keepalive_interval: Some(Duration::from_secs(config.keepalive_interval_secs)),
            keepalive_max: 3,
            ..Default::default()
        });

        let handler = ClientHandler {
            hostname: config.host.clone(),
            port: config.port,
            strict_mode,
        };

        let addr = (config.host.as_str(), config.port);
        let connect_secs = config.connect_timeout_secs;

        let mut handle = tokio::time::timeout(
            config.connect_timeout(),
            russh::client::connect(ssh_config, addr, handler),
        )
        .await
        .map_err(|_| Error::ConnectTimeout(connect_secs))??;

        tokio::time::timeout(
            config.connect_timeout(),
            authenticate(&mut handle, config),
        )
        .await
        .map_err(|_| Error::ConnectTimeout(connect_secs))??;

        Ok(Self {
            handle: Arc::new(handle),
            host: config.host.clone(),
            port: config.port,
        })
    }

    /// Execute a remote command on a fresh exec channel.
    ///
    /// With `request_pty`, a pseudo-terminal is allocated for commands
    /// that behave differently without one (top, anything probing its
    /// tty). Callers writing credentials through `stdin` must NOT request
    /// a pty: the remote tty echoes input back into the output stream.
    ///
    /// Every invocation is a new shell context; `cd` and variables do not
    /// carry over.
    pub async fn execute(
        &self,
        command: &str,
        stdin: Option<Zeroizing<Vec<u8>>>,
        request_pty: bool,
    ) -> Result<CommandOutput, Error> {
        let mut stdout_buffer = Vec::with_capacity(CMD_BUFFER_SIZE);
        let mut stderr_buffer = Vec::with_capacity(ERR_BUFFER_SIZE);

        let channel = self.handle.channel_open_session().await?;
        if request_pty {
            channel
                .request_pty(false, "xterm", 80, 24, 0, 0, &[])
                .await?;
        }
        channel.exec(true, command).await?;

        if let Some(input) = stdin {
            channel.data(&input[..]).await?;
        }
        channel.eof().await?;

        let mut channel = channel;
        let mut exit_status: Option<u32> = None;

        while let Some(msg) = channel.wait().await {
            match msg {
                russh::ChannelMsg::Data { ref data } => {
                    stdout_buffer.write_all(data).await.map_err(Error::Io)?
                }
                russh::ChannelMsg::ExtendedData { ref data, ext } => {
                    if ext == 1 {
                        stderr_buffer.write_all(data).await.map_err(Error::Io)?
                    }
                }
                // Exit status can arrive before the last data message, so
                // keep draining until the channel closes.
                russh::ChannelMsg::ExitStatus { exit_status: code } => exit_status = Some(code),
                _ => {}
            }
        }

        match exit_status {
            Some(exit_status) => Ok(CommandOutput {
                stdout: String::from_utf8_lossy(&stdout_buffer).to_string(),
                stderr: String::from_utf8_lossy(&stderr_buffer).to_string(),
                exit_status,
            }),
            None => Err(Error::CommandDidntExit),
        }
    }

    /// Whether the underlying protocol handle has shut down.
    pub fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }

    /// Disconnect from the remote host.
    pub async fn disconnect(&self) -> Result<(), Error> {
        self.handle
            .disconnect(russh::Disconnect::ByApplication, "", "")
            .await
            .map_err(Error::Ssh)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("handle", &"Handle<ClientHandler>")
            .finish()
    }
}

/// Authenticate with the configured method: password when present,
/// otherwise the configured private key file.
async fn authenticate(
    handle: &mut Handle<ClientHandler>,
    config: &ConnectionConfig,
) -> Result<(), Error> {
    if let Some(password) = config.password.as_deref().filter(|p| !p.is_empty()) {
        let authenticated = handle
            .authenticate_password(&config.username, password)
            .await?;
        if !authenticated.success() {
            return Err(Error::PasswordWrong);
        }
        return Ok(());
    }

    if let Some(key_file) = &config.key_file {
        let key = russh::keys::load_secret_key(key_file, None)?;
        let authenticated = handle
            .authenticate_publickey(
                &config.username,
                PrivateKeyWithHashAlg::new(
                    Arc::new(key),
                    handle.best_supported_rsa_hash().await?.flatten(),
                ),
            )
            .await?;
        if !authenticated.success() {
            return Err(Error::KeyAuthFailed);
        }
        return Ok(());
    }

    Err(Error::NoAuthMethod)
}

/// SSH client handler for managing server key verification.
#[derive(Debug, Clone)]
pub struct ClientHandler {
    hostname: String,
    port: u16,
    strict_mode: StrictHostKeyChecking,
}

impl Handler for ClientHandler {
    type Error = Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &russh::keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        match self.strict_mode {
            StrictHostKeyChecking::No => Ok(true),
            StrictHostKeyChecking::Yes => {
                match russh::keys::check_known_hosts(&self.hostname, self.port, server_public_key)
                {
                    Ok(known) => Ok(known),
                    Err(russh::keys::Error::KeyChanged { .. }) => Err(Error::HostKeyMismatch(
                        socket_label(&self.hostname, self.port),
                    )),
                    Err(e) => Err(Error::KeyInvalid(e)),
                }
            }
            StrictHostKeyChecking::AcceptNew => {
                match russh::keys::check_known_hosts(&self.hostname, self.port, server_public_key)
                {
                    Ok(true) => Ok(true),
                    Ok(false) => {
                        // First contact with this device: record and trust.
                        if let Err(e) = russh::keys::known_hosts::learn_known_hosts(
                            &self.hostname,
                            self.port,
                            server_public_key,
                        ) {
                            tracing::warn!("Could not record host key: {e}");
                        }
                        Ok(true)
                    }
                    Err(russh::keys::Error::KeyChanged { .. }) => Err(Error::HostKeyMismatch(
                        socket_label(&self.hostname, self.port),
                    )),
                    Err(e) => Err(Error::KeyInvalid(e)),
                }
            }
        }
    }
}

fn socket_label(host: &str, port: u16) -> String {
    match format!("{host}:{port}").parse::<SocketAddr>() {
        Ok(addr) => addr.to_string(),
        Err(_) => format!("{host}:{port}"),
    }
}
