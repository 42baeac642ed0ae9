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

//! System identity, CPU and memory probes.

use futures::future::BoxFuture;

use super::{capture, DiagnosticResult};
use crate::executor::CommandExecutor;

pub(super) fn system(executor: &CommandExecutor) -> BoxFuture<'_, DiagnosticResult> {
    Box::pin(async move {
        match capture(executor, "uname -a && uptime && hostnamectl").await {
            Ok(output) => DiagnosticResult::pass("system", format!("System Info:\n{output}")),
            Err(detail) => {
                DiagnosticResult::fail("system", format!("Error running system check: {detail}"))
            }
        }
    })
}

pub(super) fn cpuinfo(executor: &CommandExecutor) -> BoxFuture<'_, DiagnosticResult> {
    Box::pin(async move {
        match capture(executor, "lscpu").await {
            Ok(output) => DiagnosticResult::pass("cpuinfo", format!("CPU Info:\n{output}")),
            Err(detail) => {
                DiagnosticResult::fail("cpuinfo", format!("Error reading CPU info: {detail}"))
            }
        }
    })
}

pub(super) fn memory(executor: &CommandExecutor) -> BoxFuture<'_, DiagnosticResult> {
    Box::pin(async move {
        match capture(executor, "free -h").await {
            Ok(output) => DiagnosticResult::pass("memory", format!("Memory Usage:\n{output}")),
            Err(detail) => {
                DiagnosticResult::fail("memory", format!("Error reading memory usage: {detail}"))
            }
        }
    })
}
