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

//! Filesystem usage and SMART health probes.

use futures::future::BoxFuture;

use super::{capture, capture_elevated, DiagnosticResult};
use crate::executor::CommandExecutor;

pub(super) fn usage(executor: &CommandExecutor) -> BoxFuture<'_, DiagnosticResult> {
    Box::pin(async move {
        match capture(executor, "df -h / && lsblk").await {
            Ok(output) => DiagnosticResult::pass("storage", format!("Storage:\n{output}")),
            Err(detail) => {
                DiagnosticResult::fail("storage", format!("Error reading storage usage: {detail}"))
            }
        }
    })
}

/// SMART self-assessment for every block device.
///
/// Two-step probe: the device list from the first command feeds the
/// per-device queries, issued sequentially on the same link.
pub(super) fn disk_health(executor: &CommandExecutor) -> BoxFuture<'_, DiagnosticResult> {
    Box::pin(async move {
        let devices = match capture(executor, "lsblk -dno NAME").await {
            Ok(raw) => raw
                .lines()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(|name| format!("/dev/{name}"))
                .collect::<Vec<_>>(),
            Err(detail) => {
                return DiagnosticResult::fail(
                    "disk-health",
                    format!("Error listing block devices: {detail}"),
                )
            }
        };

        let mut lines = vec!["SMART Disk Health:".to_string()];
        let mut unhealthy = false;
        let mut indeterminate = false;

        for device in devices {
            let verdict = capture_elevated(executor, &format!("smartctl -H {device}")).await;
            let summary = match &verdict {
                Ok(output) if output.contains("PASSED") => "PASSED".to_string(),
                Ok(output) if output.contains("FAILED") => {
                    unhealthy = true;
                    "FAILED".to_string()
                }
                Ok(output) if output.contains("Unable to detect device type") => {
                    "unsupported or virtual device".to_string()
                }
                Ok(_) => {
                    indeterminate = true;
                    "SMART data unavailable or malformed".to_string()
                }
                Err(detail) => {
                    indeterminate = true;
                    format!("query failed: {detail}")
                }
            };
            lines.push(format!("{device}: {summary}"));
        }

        let output = lines.join("\n");
        if unhealthy {
            DiagnosticResult::fail("disk-health", output)
        } else if indeterminate {
            DiagnosticResult::warn("disk-health", output)
        } else {
            DiagnosticResult::pass("disk-health", output)
        }
    })
}
