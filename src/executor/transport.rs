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

//! The execution strategy seam.
//!
//! All command execution flows through one executor over a single
//! [`Transport`] trait; the concrete strategy is picked once at startup
//! rather than per call site.

use async_trait::async_trait;
use std::time::Duration;

use crate::ssh::{client::CommandOutput, Error};

/// A remote command plus its privilege requirement, kept structured so the
/// escalation credential is injected by the transport rather than spliced
/// into a shell line by callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    /// The command line without any escalation prefix.
    pub line: String,
    pub elevate: bool,
}

impl RemoteCommand {
    /// Parse an operator-supplied command line. A leading `sudo ` prefix is
    /// stripped and recorded as an escalation request, which keeps the old
    /// string-based call sites working.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.strip_prefix("sudo ") {
            Some(rest) => Self {
                line: rest.trim_start().to_string(),
                elevate: true,
            },
            None => Self {
                line: trimmed.to_string(),
                elevate: false,
            },
        }
    }

    /// Parse a command line and force escalation regardless of prefix.
    pub fn elevated(raw: &str) -> Self {
        let mut command = Self::parse(raw);
        command.elevate = true;
        command
    }

    /// The command as the operator sees it in results and logs.
    pub fn display_line(&self) -> String {
        if self.elevate {
            format!("sudo {}", self.line)
        } else {
            self.line.clone()
        }
    }
}

/// One way of running commands on the device.
///
/// Implementations must honor the timeout, keep escalation credentials out
/// of the command line, and distinguish auth, transport and timeout errors
/// through [`Error`] so the executor can classify outcomes for callers.
#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &'static str;

    /// Run one command, bounded by `timeout`.
    async fn run(&self, command: &RemoteCommand, timeout: Duration)
        -> Result<CommandOutput, Error>;

    /// Drop any persistent channel and purge the stored host identity, so
    /// a different physical device on the same address can be reached.
    async fn reset(&self) -> Result<(), Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_command() {
        let command = RemoteCommand::parse("uptime");
        assert_eq!(command.line, "uptime");
        assert!(!command.elevate);
        assert_eq!(command.display_line(), "uptime");
    }

    #[test]
    fn test_parse_strips_sudo_prefix() {
        let command = RemoteCommand::parse("sudo dmesg --level=err");
        assert_eq!(command.line, "dmesg --level=err");
        assert!(command.elevate);
        assert_eq!(command.display_line(), "sudo dmesg --level=err");
    }

    #[test]
    fn test_parse_handles_whitespace() {
        let command = RemoteCommand::parse("  sudo   mmcli -L");
        assert_eq!(command.line, "mmcli -L");
        assert!(command.elevate);
    }

    #[test]
    fn test_sudo_substring_is_not_escalation() {
        let command = RemoteCommand::parse("echo sudo is a word");
        assert_eq!(command.line, "echo sudo is a word");
        assert!(!command.elevate);

        // `sudoedit` is not a `sudo ` prefix either
        let command = RemoteCommand::parse("sudoedit /etc/hosts");
        assert!(!command.elevate);
    }

    #[test]
    fn test_elevated_forces_flag() {
        let command = RemoteCommand::elevated("whoami");
        assert_eq!(command.line, "whoami");
        assert!(command.elevate);

        // Already-prefixed input is not double-stripped
        let command = RemoteCommand::elevated("sudo whoami");
        assert_eq!(command.line, "whoami");
        assert!(command.elevate);
    }
}
