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

//! Hardware and software diagnostics for the device.
//!
//! Each probe is a pure function over the executor: it runs one or two
//! remote commands, interprets the output, and returns a result. Probes
//! are discovered through a static registry and invoked with a bounded
//! per-probe timeout; one failing probe never stops the rest of a run.

use futures::future::BoxFuture;
use std::time::Duration;

use crate::executor::CommandExecutor;

mod hardware;
mod logs;
mod network;
mod power;
mod storage;
mod system;

/// Upper bound for a single probe, covering every remote command it runs.
const PROBE_TIMEOUT: Duration = Duration::from_secs(60);

/// Outcome category of one probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagStatus {
    Pass,
    /// The probe ran but found something an operator should look at.
    Warn,
    Fail,
}

/// Result of one diagnostic probe.
#[derive(Debug, Clone)]
pub struct DiagnosticResult {
    pub name: &'static str,
    pub status: DiagStatus,
    pub output: String,
}

impl DiagnosticResult {
    pub fn pass(name: &'static str, output: impl Into<String>) -> Self {
        Self {
            name,
            status: DiagStatus::Pass,
            output: output.into(),
        }
    }

    pub fn warn(name: &'static str, output: impl Into<String>) -> Self {
        Self {
            name,
            status: DiagStatus::Warn,
            output: output.into(),
        }
    }

    pub fn fail(name: &'static str, output: impl Into<String>) -> Self {
        Self {
            name,
            status: DiagStatus::Fail,
            output: output.into(),
        }
    }
}

type ProbeFn = for<'a> fn(&'a CommandExecutor) -> BoxFuture<'a, DiagnosticResult>;

/// One registered probe.
pub struct Diagnostic {
    pub name: &'static str,
    pub title: &'static str,
    run: ProbeFn,
}

/// Static probe table. Order is the run order: identity and software state
/// first, then buses and peripherals, logs last.
pub const REGISTRY: &[Diagnostic] = &[
    Diagnostic {
        name: "system",
        title: "System identity and uptime",
        run: system::system,
    },
    Diagnostic {
        name: "cpuinfo",
        title: "CPU topology",
        run: system::cpuinfo,
    },
    Diagnostic {
        name: "memory",
        title: "Memory usage",
        run: system::memory,
    },
    Diagnostic {
        name: "thermals",
        title: "Thermal sensors",
        run: power::thermals,
    },
    Diagnostic {
        name: "power",
        title: "Power rails",
        run: power::rails,
    },
    Diagnostic {
        name: "storage",
        title: "Filesystem usage",
        run: storage::usage,
    },
    Diagnostic {
        name: "disk-health",
        title: "SMART disk health",
        run: storage::disk_health,
    },
    Diagnostic {
        name: "usb",
        title: "USB devices",
        run: hardware::usb,
    },
    Diagnostic {
        name: "i2c",
        title: "I2C bus scan",
        run: hardware::i2c,
    },
    Diagnostic {
        name: "camera",
        title: "Camera enumeration",
        run: hardware::camera,
    },
    Diagnostic {
        name: "interfaces",
        title: "Network interfaces",
        run: network::interfaces,
    },
    Diagnostic {
        name: "network",
        title: "Connection manager devices",
        run: network::devices,
    },
    Diagnostic {
        name: "modem",
        title: "Modem and SIM",
        run: network::modem,
    },
    Diagnostic {
        name: "dmesg",
        title: "Critical kernel messages",
        run: logs::dmesg_critical,
    },
];

/// Look up a probe by its registry name.
pub fn find(name: &str) -> Option<&'static Diagnostic> {
    REGISTRY.iter().find(|probe| probe.name == name)
}

/// Run one probe with the standard bound.
pub async fn run_one(probe: &Diagnostic, executor: &CommandExecutor) -> DiagnosticResult {
    match tokio::time::timeout(PROBE_TIMEOUT, (probe.run)(executor)).await {
        Ok(result) => result,
        Err(_) => DiagnosticResult::fail(
            probe.name,
            format!("Probe timed out after {}s", PROBE_TIMEOUT.as_secs()),
        ),
    }
}

/// Run every registered probe sequentially.
///
/// The probes share one constrained link; a parallel burst would mostly
/// measure its own connection contention.
pub async fn run_all(executor: &CommandExecutor) -> Vec<DiagnosticResult> {
    let mut results = Vec::with_capacity(REGISTRY.len());
    for probe in REGISTRY {
        tracing::info!("Running diagnostic: {}", probe.name);
        results.push(run_one(probe, executor).await);
    }
    results
}

/// Run one remote command, mapping failure into the probe error shape.
pub(crate) async fn capture(
    executor: &CommandExecutor,
    command: &str,
) -> Result<String, String> {
    let result = executor.execute(command).await;
    if result.success {
        Ok(result.output.trim().to_string())
    } else {
        Err(result.error_detail().to_string())
    }
}

/// Elevated variant of [`capture`].
pub(crate) async fn capture_elevated(
    executor: &CommandExecutor,
    command: &str,
) -> Result<String, String> {
    let result = executor.execute_elevated(command).await;
    if result.success {
        Ok(result.output.trim().to_string())
    } else {
        Err(result.error_detail().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_registry_names_are_unique() {
        let mut seen = HashSet::new();
        for probe in REGISTRY {
            assert!(seen.insert(probe.name), "duplicate probe name {}", probe.name);
        }
    }

    #[test]
    fn test_find() {
        assert!(find("system").is_some());
        assert!(find("modem").is_some());
        assert!(find("flux-capacitor").is_none());
    }

    #[test]
    fn test_result_constructors() {
        assert_eq!(DiagnosticResult::pass("x", "ok").status, DiagStatus::Pass);
        assert_eq!(DiagnosticResult::warn("x", "hm").status, DiagStatus::Warn);
        assert_eq!(DiagnosticResult::fail("x", "no").status, DiagStatus::Fail);
    }
}
