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

//! Escalation credential handling with automatic memory clearing.
//!
//! The credential is injected into a privileged command's stdin, never
//! interpolated into the command line, so it cannot leak through process
//! listings or remote shell history.

use anyhow::Result;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use zeroize::Zeroizing;

/// Password prompt patterns emitted by ssh and sudo across distributions.
///
/// Matched case-insensitively against pty output by the fallback transport,
/// which has no structured way to know a prompt from regular output.
pub const PASSWORD_PROMPT_PATTERNS: &[&str] = &[
    "[sudo] password for ",
    "password for ",
    "password:",
    "'s password:",
];

/// Patterns indicating the remote side rejected the escalation credential.
pub const SUDO_FAILURE_PATTERNS: &[&str] = &[
    "sorry, try again",
    "incorrect password",
    "authentication failure",
    "sudo: 3 incorrect password attempts",
    "sudo: no password was provided",
];

/// A privilege-escalation credential that clears its memory on drop.
///
/// Debug output never reveals the password, and each clone is zeroized
/// independently, so the value is safe to hand to concurrent tasks.
#[derive(Clone)]
pub struct EscalationPassword {
    inner: SecretString,
}

impl EscalationPassword {
    /// Wrap a password. Empty passwords are rejected so a misconfigured
    /// environment fails loudly instead of sending a blank credential.
    pub fn new(password: String) -> Result<Self> {
        if password.is_empty() {
            anyhow::bail!("Escalation password cannot be empty");
        }
        Ok(Self {
            inner: SecretString::new(password.into_boxed_str()),
        })
    }

    /// The raw credential bytes. Use immediately, do not store.
    pub fn as_bytes(&self) -> &[u8] {
        self.inner.expose_secret().as_bytes()
    }

    /// The credential with a trailing newline, as sudo expects on stdin.
    ///
    /// Returned in a zeroizing container so the copy is also cleared.
    pub fn with_newline(&self) -> Zeroizing<Vec<u8>> {
        let mut bytes = self.inner.expose_secret().as_bytes().to_vec();
        bytes.push(b'\n');
        Zeroizing::new(bytes)
    }
}

impl fmt::Debug for EscalationPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EscalationPassword")
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Check whether pty output ends in a password prompt.
pub fn contains_password_prompt(output: &str) -> bool {
    let lower = output.to_lowercase();
    PASSWORD_PROMPT_PATTERNS
        .iter()
        .any(|pattern| lower.contains(*pattern))
}

/// Check whether output reports an escalation failure.
pub fn contains_sudo_failure(output: &str) -> bool {
    let lower = output.to_lowercase();
    SUDO_FAILURE_PATTERNS
        .iter()
        .any(|pattern| lower.contains(*pattern))
}
