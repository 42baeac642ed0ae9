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

//! Fallback execution path through the external `ssh` client.
//!
//! Used when the in-process client cannot be used. Each call spawns `ssh`
//! under a pseudo-terminal and drives it expect-style: watch for the login
//! password prompt, inject the credential, watch for a nested sudo prompt
//! on privileged commands, then read until exit or timeout. No state
//! persists between calls; the per-call spawn cost is the price of
//! compatibility.

use portable_pty::{native_pty_system, Child, CommandBuilder, PtySize};
use std::io::{Read, Write};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use super::client::CommandOutput;
use super::Error;
use crate::config::ConnectionConfig;
use crate::executor::transport::{RemoteCommand, Transport};
use crate::security::{contains_password_prompt, EscalationPassword};

/// Poll quantum for the pty read loop.
const READ_TICK: Duration = Duration::from_millis(100);

/// Fallback transport over a spawned `ssh` process.
pub struct ProcessTransport {
    config: ConnectionConfig,
    escalation: Option<EscalationPassword>,
}

impl ProcessTransport {
    /// Create the transport, verifying the external client exists.
    pub fn new(config: ConnectionConfig) -> Result<Self, Error> {
        if !Self::is_available() {
            return Err(Error::ClientUnavailable(
                "no runnable `ssh` binary on PATH".to_string(),
            ));
        }
        let escalation = config.escalation_password();
        Ok(Self { config, escalation })
    }

    /// Capability check used by transport selection at startup.
    pub fn is_available() -> bool {
        std::process::Command::new("ssh")
            .arg("-V")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .is_ok()
    }

    fn build_command(&self, line: &str) -> CommandBuilder {
        let mut cmd = CommandBuilder::new("ssh");
        cmd.args([
            "-o",
            "StrictHostKeyChecking=no",
            "-o",
            "UserKnownHostsFile=/dev/null",
            "-o",
            "LogLevel=ERROR",
        ]);
        cmd.arg("-o");
        cmd.arg(format!("ConnectTimeout={}", self.config.connect_timeout_secs));
        if self.config.port != 22 {
            cmd.arg("-p");
            cmd.arg(self.config.port.to_string());
        }
        if let Some(key_file) = &self.config.key_file {
            cmd.arg("-i");
            cmd.arg(key_file);
        }
        cmd.arg(format!("{}@{}", self.config.username, self.config.host));
        cmd.arg(line);
        cmd
    }
}

#[async_trait::async_trait]
impl Transport for ProcessTransport {
    fn name(&self) -> &'static str {
        "process"
    }

    async fn run(
        &self,
        command: &RemoteCommand,
        timeout: Duration,
    ) -> Result<CommandOutput, Error> {
        // Privileged commands keep their plain `sudo` form here; the nested
        // prompt is answered through the pty like the login prompt.
        let line = command.display_line();
        let builder = self.build_command(&line);
        let login_password = self.config.password.clone();
        let escalation = if command.elevate {
            self.escalation.clone()
        } else {
            None
        };

        let driven = tokio::task::spawn_blocking(move || {
            drive_pty(builder, login_password, escalation, timeout)
        })
        .await
        .map_err(|e| Error::Other(format!("pty driver task failed: {e}")))??;

        // The external client reserves 255 for its own failures
        // (unreachable host, rejected auth), which must not be reported as
        // a remote command exit.
        if driven.exit_status == 255 {
            let detail = driven.stdout.trim().to_string();
            if detail.to_lowercase().contains("permission denied") {
                return Err(Error::PasswordWrong);
            }
            return Err(Error::Other(if detail.is_empty() {
                "ssh client exited with status 255".to_string()
            } else {
                detail
            }));
        }

        Ok(driven)
    }

    async fn reset(&self) -> Result<(), Error> {
        // Nothing persistent to drop, and the spawned client pins its
        // known-hosts file to /dev/null, so no identity record exists.
        Ok(())
    }
}

/// Run the spawned client to completion, answering password prompts.
fn drive_pty(
    builder: CommandBuilder,
    login_password: Option<String>,
    escalation: Option<EscalationPassword>,
    timeout: Duration,
) -> Result<CommandOutput, Error> {
    let pty_system = native_pty_system();
    let pair = pty_system
        .openpty(PtySize {
            rows: 24,
            cols: 80,
            pixel_width: 0,
            pixel_height: 0,
        })
        .map_err(|e| Error::ClientUnavailable(e.to_string()))?;

    let mut child: Box<dyn Child + Send + Sync> = pair
        .slave
        .spawn_command(builder)
        .map_err(|e| Error::ClientUnavailable(e.to_string()))?;
    drop(pair.slave);

    let mut reader = pair
        .master
        .try_clone_reader()
        .map_err(|e| Error::Other(e.to_string()))?;
    let mut writer = pair
        .master
        .take_writer()
        .map_err(|e| Error::Other(e.to_string()))?;

    // Blocking reads happen on their own thread; the driver consumes
    // chunks with a deadline so a hung link cannot wedge the caller.
    let (tx, rx) = mpsc::channel::<Vec<u8>>();
    std::thread::spawn(move || {
        let mut buf = [0u8; 4096];
        loop {
            match reader.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
            }
        }
    });

    let deadline = Instant::now() + timeout;
    let mut output = String::new();
    // Prompts already answered stay behind this cursor so they are not
    // matched twice.
    let mut scan_from = 0usize;
    let mut login_sent = false;
    let mut sudo_sent = false;

    let exit_status = loop {
        let now = Instant::now();
        if now >= deadline {
            let _ = child.kill();
            return Err(Error::CommandTimeout(timeout.as_secs()));
        }
        let wait = READ_TICK.min(deadline - now);

        match rx.recv_timeout(wait) {
            Ok(chunk) => {
                output.push_str(&String::from_utf8_lossy(&chunk));

                if contains_password_prompt(&output[scan_from..]) {
                    if !login_sent {
                        if let Some(password) = &login_password {
                            writer
                                .write_all(password.as_bytes())
                                .and_then(|_| writer.write_all(b"\n"))
                                .map_err(Error::Io)?;
                            login_sent = true;
                            scan_from = output.len();
                        }
                    } else if !sudo_sent {
                        if let Some(password) = &escalation {
                            writer
                                .write_all(&password.with_newline())
                                .map_err(Error::Io)?;
                            sudo_sent = true;
                            scan_from = output.len();
                        }
                    }
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if let Some(status) = child
                    .try_wait()
                    .map_err(|e| Error::Other(e.to_string()))?
                {
                    // Drain whatever the reader already captured.
                    while let Ok(chunk) = rx.try_recv() {
                        output.push_str(&String::from_utf8_lossy(&chunk));
                    }
                    break status.exit_code();
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                let status = child.wait().map_err(|e| Error::Other(e.to_string()))?;
                break status.exit_code();
            }
        }
    };

    Ok(CommandOutput {
        stdout: scrub_prompts(&output),
        stderr: String::new(),
        exit_status,
    })
}

/// Remove password-prompt lines that the pty echoes into the output.
fn scrub_prompts(output: &str) -> String {
    output
        .lines()
        .filter(|line| !contains_password_prompt(line))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrub_prompts() {
        let raw = "ubuntu@192.168.55.1's password: \r\n[sudo] password for ubuntu:\nroot\n";
        assert_eq!(scrub_prompts(raw), "root");
    }

    #[test]
    fn test_scrub_keeps_regular_output() {
        let raw = "Linux tegra 5.10.104-tegra aarch64\nuptime ok\n";
        assert_eq!(
            scrub_prompts(raw),
            "Linux tegra 5.10.104-tegra aarch64\nuptime ok"
        );
    }

    #[test]
    fn test_availability_probe_does_not_panic() {
        // Environments without an ssh binary must report false, not fail.
        let _ = ProcessTransport::is_available();
    }
}
