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

use anyhow::{bail, Result};
use owo_colors::OwoColorize;

use crate::diagnostics::{self, DiagStatus, DiagnosticResult};
use crate::executor::CommandExecutor;

/// List registered probes.
pub fn list_probes() {
    println!("{} {}", "▶".cyan(), "Available diagnostics".bold());
    for probe in diagnostics::REGISTRY {
        println!("  {:<12} {}", probe.name.bold(), probe.title);
    }
}

/// Run the selected (or all) probes and print a summary.
/// Returns the process exit code.
pub async fn run_diagnostics(executor: &CommandExecutor, names: &[String]) -> Result<i32> {
    let results = if names.is_empty() {
        diagnostics::run_all(executor).await
    } else {
        let mut selected = Vec::with_capacity(names.len());
        for name in names {
            match diagnostics::find(name) {
                Some(probe) => selected.push(probe),
                None => bail!(
                    "Unknown diagnostic '{name}'. Use `jdiag diag --list` to see available probes."
                ),
            }
        }
        let mut results = Vec::with_capacity(selected.len());
        for probe in selected {
            results.push(diagnostics::run_one(probe, executor).await);
        }
        results
    };

    let mut passed = 0usize;
    let mut warned = 0usize;
    let mut failed = 0usize;

    for result in &results {
        print_result(result);
        match result.status {
            DiagStatus::Pass => passed += 1,
            DiagStatus::Warn => warned += 1,
            DiagStatus::Fail => failed += 1,
        }
    }

    println!(
        "\n{} {} passed, {} warnings, {} failed",
        "▶".cyan(),
        passed.to_string().green(),
        warned.to_string().yellow(),
        failed.to_string().red()
    );

    Ok(if failed > 0 { 1 } else { 0 })
}

fn print_result(result: &DiagnosticResult) {
    let marker = match result.status {
        DiagStatus::Pass => "●".green().to_string(),
        DiagStatus::Warn => "●".yellow().to_string(),
        DiagStatus::Fail => "●".red().to_string(),
    };
    println!("\n{} {}", marker, result.name.bold());
    for line in result.output.lines() {
        println!("    {line}");
    }
}
