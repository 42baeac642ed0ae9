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

//! Structured outcome of one remote command execution.

use std::fmt;

/// Why an execution failed, when it did.
///
/// Callers route on this: config and auth failures are not worth retrying,
/// transport failures self-heal on the next call, timeouts leave the
/// session usable, and remote exits are not connectivity problems at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Credentials were missing or invalid before any connection attempt.
    Config,
    /// The remote host rejected the credentials.
    Auth,
    /// Network-level failure; the session will reconnect on the next call.
    Transport,
    /// The command exceeded its timeout; the session is still usable.
    Timeout,
    /// The command ran and returned a non-zero exit code.
    RemoteExit,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::Config => "configuration",
            FailureKind::Auth => "authentication",
            FailureKind::Transport => "transport",
            FailureKind::Timeout => "timeout",
            FailureKind::RemoteExit => "remote exit",
        };
        write!(f, "{label}")
    }
}

/// Result of executing a command on the device.
///
/// Invariant: `success` implies `exit_code == Some(0)` and no error detail;
/// a failed result always carries a [`FailureKind`] and a human-readable
/// detail string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub success: bool,
    /// Captured stdout (merged terminal output when a pty was granted).
    pub output: String,
    /// Failure detail for the operator; absent on success.
    pub error: Option<String>,
    pub failure: Option<FailureKind>,
    /// Remote exit code, when the command actually ran.
    pub exit_code: Option<i32>,
    /// The command as the caller issued it.
    pub command: String,
}

impl ExecutionResult {
    pub fn success(command: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
            failure: None,
            exit_code: Some(0),
            command: command.into(),
        }
    }

    /// A command that ran to completion with a non-zero exit.
    pub fn remote_exit(
        command: impl Into<String>,
        output: impl Into<String>,
        detail: impl Into<String>,
        exit_code: i32,
    ) -> Self {
        Self {
            success: false,
            output: output.into(),
            error: Some(detail.into()),
            failure: Some(FailureKind::RemoteExit),
            exit_code: Some(exit_code),
            command: command.into(),
        }
    }

    /// A failure that happened before or around the command itself.
    pub fn failure(
        command: impl Into<String>,
        kind: FailureKind,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(detail.into()),
            failure: Some(kind),
            exit_code: None,
            command: command.into(),
        }
    }

    /// Escalation rejected by the remote side.
    pub fn escalation_denied(
        command: impl Into<String>,
        output: impl Into<String>,
        detail: impl Into<String>,
        exit_code: i32,
    ) -> Self {
        Self {
            success: false,
            output: output.into(),
            error: Some(detail.into()),
            failure: Some(FailureKind::Auth),
            exit_code: Some(exit_code),
            command: command.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.failure == Some(FailureKind::Timeout)
    }

    /// Failure detail, or an empty string on success.
    pub fn error_detail(&self) -> &str {
        self.error.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_invariant() {
        let result = ExecutionResult::success("echo ok", "ok\n");
        assert!(result.success);
        assert_eq!(result.exit_code, Some(0));
        assert!(result.error.is_none());
        assert!(result.failure.is_none());
    }

    #[test]
    fn test_remote_exit_carries_code_and_detail() {
        let result = ExecutionResult::remote_exit("false", "", "exited with 1", 1);
        assert!(!result.success);
        assert_eq!(result.exit_code, Some(1));
        assert_eq!(result.failure, Some(FailureKind::RemoteExit));
        assert_eq!(result.error_detail(), "exited with 1");
    }

    #[test]
    fn test_timeout_classification() {
        let result =
            ExecutionResult::failure("sleep 120", FailureKind::Timeout, "timed out after 5s");
        assert!(result.is_timeout());
        assert_eq!(result.exit_code, None);
    }

    #[test]
    fn test_failure_kind_display() {
        assert_eq!(FailureKind::Auth.to_string(), "authentication");
        assert_eq!(FailureKind::RemoteExit.to_string(), "remote exit");
    }
}
