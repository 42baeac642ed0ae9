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

//! Stored host-identity records.
//!
//! The target device reappears with a new host key whenever it is
//! re-flashed or swapped for another unit on the same link-local address,
//! so the console must be able to purge the stale record instead of
//! refusing to connect forever.

use directories::BaseDirs;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;

/// Get the default known_hosts file path
pub fn get_default_known_hosts_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.home_dir().join(".ssh").join("known_hosts"))
}

/// Remove every stored identity record for a host.
///
/// Rewrites the known_hosts file without the lines naming the host, in
/// both plain and `[host]:port` forms. Missing file is not an error;
/// returns whether any record was actually removed.
pub fn forget_host(host: &str, port: u16) -> io::Result<bool> {
    let Some(path) = get_default_known_hosts_path() else {
        return Ok(false);
    };
    if !path.exists() {
        return Ok(false);
    }

    let bracketed = format!("[{host}]:{port}");
    let content = std::fs::read_to_string(&path)?;
    let retained: Vec<&str> = content
        .lines()
        .filter(|line| !known_hosts_line_matches(line, host, &bracketed))
        .collect();

    let removed = retained.len() < content.lines().count();
    if removed {
        let mut rewritten = retained.join("\n");
        if !rewritten.is_empty() {
            rewritten.push('\n');
        }
        std::fs::write(&path, rewritten)?;
        tracing::info!("Cleared known host entry for {host}");
    }
    Ok(removed)
}

/// Whether a known_hosts line names the given host.
///
/// The host field is the first column and may hold a comma-separated list.
/// Hashed entries cannot be matched by name and are left alone.
fn known_hosts_line_matches(line: &str, host: &str, bracketed: &str) -> bool {
    let Some(first) = line.split_whitespace().next() else {
        return false;
    };
    first
        .split(',')
        .any(|entry| entry == host || entry == bracketed)
}

/// Mode for host key checking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrictHostKeyChecking {
    /// Always verify host keys (fail on unknown/changed)
    Yes,
    /// Never verify host keys (accept all)
    No,
    /// Verify known hosts, add new ones automatically (TOFU)
    #[default]
    AcceptNew,
}

impl FromStr for StrictHostKeyChecking {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "yes" | "true" => Self::Yes,
            "no" | "false" => Self::No,
            _ => Self::AcceptNew,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_matching() {
        let line = "192.168.55.1 ssh-ed25519 AAAAC3Nza...";
        assert!(known_hosts_line_matches(line, "192.168.55.1", "[192.168.55.1]:22"));
        assert!(!known_hosts_line_matches(line, "192.168.55.2", "[192.168.55.2]:22"));

        // Comma-separated host list
        let line = "tegra,192.168.55.1 ssh-rsa AAAAB3Nza...";
        assert!(known_hosts_line_matches(line, "192.168.55.1", "[192.168.55.1]:22"));
        assert!(known_hosts_line_matches(line, "tegra", "[tegra]:22"));

        // Non-standard port form
        let line = "[192.168.55.1]:2222 ssh-ed25519 AAAAC3Nza...";
        assert!(known_hosts_line_matches(line, "192.168.55.1", "[192.168.55.1]:2222"));
        assert!(!known_hosts_line_matches(line, "192.168.55.1", "[192.168.55.1]:22"));

        // Substring of another host must not match
        let line = "192.168.55.10 ssh-ed25519 AAAAC3Nza...";
        assert!(!known_hosts_line_matches(line, "192.168.55.1", "[192.168.55.1]:22"));
    }

    #[test]
    fn test_blank_line_does_not_match() {
        assert!(!known_hosts_line_matches("", "host", "[host]:22"));
        assert!(!known_hosts_line_matches("   ", "host", "[host]:22"));
    }

    #[test]
    fn test_strict_host_key_checking_from_str() {
        assert_eq!(
            StrictHostKeyChecking::from_str("yes").unwrap(),
            StrictHostKeyChecking::Yes
        );
        assert_eq!(
            StrictHostKeyChecking::from_str("no").unwrap(),
            StrictHostKeyChecking::No
        );
        assert_eq!(
            StrictHostKeyChecking::from_str("accept-new").unwrap(),
            StrictHostKeyChecking::AcceptNew
        );
        assert_eq!(
            StrictHostKeyChecking::from_str("anything-else").unwrap(),
            StrictHostKeyChecking::AcceptNew
        );
    }

    #[test]
    fn test_get_default_known_hosts_path() {
        let path = get_default_known_hosts_path();
        assert!(path.is_some());
        if let Some(p) = path {
            assert!(p.to_str().unwrap().contains(".ssh"));
        }
    }
}
