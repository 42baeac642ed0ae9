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

//! Network interface, connection manager and modem/SIM probes.

use futures::future::BoxFuture;

use super::{capture, capture_elevated, DiagnosticResult};
use crate::executor::CommandExecutor;

pub(super) fn interfaces(executor: &CommandExecutor) -> BoxFuture<'_, DiagnosticResult> {
    Box::pin(async move {
        match capture(executor, "ip -br addr show").await {
            Ok(output) => {
                DiagnosticResult::pass("interfaces", format!("Network Interfaces:\n{output}"))
            }
            Err(detail) => DiagnosticResult::fail(
                "interfaces",
                format!("Error listing network interfaces: {detail}"),
            ),
        }
    })
}

pub(super) fn devices(executor: &CommandExecutor) -> BoxFuture<'_, DiagnosticResult> {
    Box::pin(async move {
        match capture(executor, "nmcli device").await {
            Ok(output) => {
                DiagnosticResult::pass("network", format!("Connection Manager Devices:\n{output}"))
            }
            Err(detail) => {
                DiagnosticResult::fail("network", format!("Error checking network: {detail}"))
            }
        }
    })
}

/// Modem and SIM status through ModemManager.
///
/// Two-step probe: the modem path reported by the listing builds the
/// follow-up signal query. Both steps need escalation on the device image.
pub(super) fn modem(executor: &CommandExecutor) -> BoxFuture<'_, DiagnosticResult> {
    Box::pin(async move {
        let listing = match capture_elevated(executor, "mmcli -L").await {
            Ok(listing) => listing,
            Err(detail) => {
                return DiagnosticResult::fail(
                    "modem",
                    format!("Error communicating with modem: {detail}"),
                )
            }
        };

        if listing.contains("No modems were found") {
            return DiagnosticResult::warn("modem", "No modem found.");
        }
        if listing.contains("ModemManager is not running") {
            return DiagnosticResult::fail("modem", "ModemManager service is not active.");
        }

        let Some(modem_path) = listing
            .split_whitespace()
            .find(|token| token.contains("/Modem/"))
        else {
            return DiagnosticResult::warn(
                "modem",
                format!("Could not determine modem status:\n{listing}"),
            );
        };

        match capture_elevated(executor, &format!("mmcli -m {modem_path} --signal")).await {
            Ok(signal) => {
                let lower = signal.to_lowercase();
                if lower.contains("no sim") || lower.contains("absent") {
                    DiagnosticResult::warn("modem", "Modem present but SIM not inserted.")
                } else {
                    DiagnosticResult::pass(
                        "modem",
                        format!("Modem {modem_path}:\n{signal}"),
                    )
                }
            }
            Err(detail) => DiagnosticResult::warn(
                "modem",
                format!("Modem detected but signal query failed: {detail}"),
            ),
        }
    })
}
