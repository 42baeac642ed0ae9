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

use crate::executor::CommandExecutor;
use crate::status::StatusCache;

/// Report device reachability. Returns the process exit code.
pub async fn check_connection(
    executor: &CommandExecutor,
    cache: &StatusCache,
    detailed: bool,
) -> Result<i32> {
    if detailed {
        let report = cache.detailed_status(executor).await;
        println!("{} {}", "▶".cyan(), "Link Status".bold());
        print_line("internet", report.internet_available, "reachable", "unreachable");
        print_line("device", report.device_available, &report.detail, &report.detail);
        println!("  checked at {}", report.checked_at.to_rfc3339());
        return Ok(if report.device_available { 0 } else { 1 });
    }

    let (connected, message) = cache.check_connection(executor).await;
    if connected {
        println!("{} {}", "●".green(), message);
        Ok(0)
    } else {
        println!("{} {}", "●".red(), message);
        Ok(1)
    }
}

fn print_line(label: &str, ok: bool, ok_text: &str, bad_text: &str) {
    if ok {
        println!("  {} {label}: {}", "●".green(), ok_text.green());
    } else {
        println!("  {} {label}: {}", "●".red(), bad_text.red());
    }
}
