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

use anyhow::Result;
use owo_colors::OwoColorize;
use std::time::Duration;

use crate::executor::CommandExecutor;

/// Run one command and print the outcome. Returns the process exit code.
pub async fn execute_command(
    executor: &CommandExecutor,
    command: &str,
    timeout: Option<u64>,
) -> Result<i32> {
    let result = match timeout {
        Some(secs) => {
            executor
                .execute_with_timeout(command, Duration::from_secs(secs))
                .await
        }
        None => executor.execute(command).await,
    };

    if result.success {
        if !result.output.is_empty() {
            print!("{}", result.output);
            if !result.output.ends_with('\n') {
                println!();
            }
        }
        return Ok(0);
    }

    // Failed results still carry any captured output, which is usually the
    // interesting part for the operator.
    if !result.output.trim().is_empty() {
        println!("{}", result.output.trim_end());
    }
    let kind = result
        .failure
        .map(|kind| kind.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    eprintln!(
        "{} {} failure: {}",
        "●".red(),
        kind,
        result.error_detail()
    );
    Ok(result.exit_code.unwrap_or(1).max(1))
}
