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

//! Kernel log probes.

use futures::future::BoxFuture;

use super::DiagnosticResult;
use crate::executor::CommandExecutor;

pub(super) fn dmesg_critical(executor: &CommandExecutor) -> BoxFuture<'_, DiagnosticResult> {
    Box::pin(async move {
        // Only dmesg needs escalation; the filter runs as the login user.
        let result = executor
            .execute_elevated("dmesg | grep -iE 'fail|error|critical' | tail -n 30")
            .await;

        if result.success {
            let matches = result.output.trim();
            if matches.is_empty() {
                DiagnosticResult::pass("dmesg", "No critical kernel messages.")
            } else {
                DiagnosticResult::warn(
                    "dmesg",
                    format!("Critical Kernel Logs:\n{matches}"),
                )
            }
        } else if result.exit_code == Some(1) && result.output.trim().is_empty() {
            // grep exits 1 on no matches; that is the healthy case.
            DiagnosticResult::pass("dmesg", "No critical kernel messages.")
        } else {
            DiagnosticResult::fail(
                "dmesg",
                format!("Error reading kernel log: {}", result.error_detail()),
            )
        }
    })
}
