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

//! Memoized device reachability checks.
//!
//! Polling UIs and per-probe preflight checks all independently ask "is
//! the device up"; without memoization that turns into a connection storm
//! against one constrained link. Results are cached for a TTL window and
//! overwritten whole, never merged.

use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::executor::CommandExecutor;

/// TTL for the lightweight echo check.
const ECHO_TTL: Duration = Duration::from_secs(10);
/// TTL for the heavyweight detailed status.
const DETAILED_TTL: Duration = Duration::from_secs(600);
/// Timeout for the echo probe itself.
const ECHO_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
/// Timeout for the general internet reachability probe.
const INTERNET_PROBE_TIMEOUT: Duration = Duration::from_secs(3);
/// A well-known public resolver; reaching it means the host has a route
/// out, independent of the device link.
const INTERNET_PROBE_ADDR: (&str, u16) = ("8.8.8.8", 53);

struct Cached<T> {
    value: T,
    captured_at: Instant,
}

impl<T> Cached<T> {
    fn fresh(&self, ttl: Duration) -> bool {
        self.captured_at.elapsed() <= ttl
    }
}

/// Combined link report for UI polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    /// Whether this host can reach the public internet at all.
    pub internet_available: bool,
    /// Whether the device answered the echo probe.
    pub device_available: bool,
    /// Operator-facing detail from the device probe.
    pub detail: String,
    pub checked_at: DateTime<Utc>,
}

/// TTL cache over the executor's reachability probes.
pub struct StatusCache {
    echo: Mutex<Option<Cached<(bool, String)>>>,
    detailed: Mutex<Option<Cached<StatusReport>>>,
    echo_ttl: Duration,
    detailed_ttl: Duration,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::with_ttls(ECHO_TTL, DETAILED_TTL)
    }

    pub fn with_ttls(echo_ttl: Duration, detailed_ttl: Duration) -> Self {
        Self {
            echo: Mutex::new(None),
            detailed: Mutex::new(None),
            echo_ttl,
            detailed_ttl,
        }
    }

    /// Cheap cached liveness check.
    ///
    /// The cache lock is held across the probe, so concurrent callers on a
    /// cold cache share one probe instead of racing several. Within the
    /// TTL window every caller receives the identical cached tuple.
    pub async fn check_connection(&self, executor: &CommandExecutor) -> (bool, String) {
        let mut slot = self.echo.lock().await;
        if let Some(cached) = slot.as_ref() {
            if cached.fresh(self.echo_ttl) {
                tracing::debug!("Using cached connection check result");
                return cached.value.clone();
            }
        }

        let value = probe_device(executor).await;
        *slot = Some(Cached {
            value: value.clone(),
            captured_at: Instant::now(),
        });
        value
    }

    /// Heavier cached report covering both general internet reachability
    /// and the device link. Meant for UI polling, not for gating command
    /// execution.
    pub async fn detailed_status(&self, executor: &CommandExecutor) -> StatusReport {
        let mut slot = self.detailed.lock().await;
        if let Some(cached) = slot.as_ref() {
            if cached.fresh(self.detailed_ttl) {
                tracing::debug!("Using cached detailed status");
                return cached.value.clone();
            }
        }

        let internet_available = probe_internet().await;
        let (device_available, detail) = probe_device(executor).await;

        let report = StatusReport {
            internet_available,
            device_available,
            detail,
            checked_at: Utc::now(),
        };
        *slot = Some(Cached {
            value: report.clone(),
            captured_at: Instant::now(),
        });
        report
    }

    /// Drop both cached entries, forcing the next caller to re-probe.
    pub async fn invalidate(&self) {
        *self.echo.lock().await = None;
        *self.detailed.lock().await = None;
    }
}

impl Default for StatusCache {
    fn default() -> Self {
        Self::new()
    }
}

/// One echo round-trip through the executor.
async fn probe_device(executor: &CommandExecutor) -> (bool, String) {
    let result = executor
        .execute_with_timeout("echo ok", ECHO_PROBE_TIMEOUT)
        .await;
    if result.success && result.output.trim() == "ok" {
        (true, "Connection active".to_string())
    } else if result.success {
        (
            false,
            format!("Connection failed: unexpected probe output {:?}", result.output),
        )
    } else {
        (
            false,
            format!("Connection failed: {}", result.error_detail()),
        )
    }
}

async fn probe_internet() -> bool {
    tokio::time::timeout(
        INTERNET_PROBE_TIMEOUT,
        tokio::net::TcpStream::connect(INTERNET_PROBE_ADDR),
    )
    .await
    .map(|connected| connected.is_ok())
    .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_freshness() {
        let cached = Cached {
            value: (),
            captured_at: Instant::now(),
        };
        assert!(cached.fresh(Duration::from_secs(10)));
        assert!(!cached.fresh(Duration::ZERO));
    }

    #[test]
    fn test_report_equality() {
        let report = StatusReport {
            internet_available: true,
            device_available: false,
            detail: "Connection failed: timed out after 5s".to_string(),
            checked_at: Utc::now(),
        };
        assert_eq!(report.clone(), report);
    }
}
