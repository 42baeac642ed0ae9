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

/// Force-drop the session and purge the stored host identity.
/// Returns the process exit code.
pub async fn reset_connection(executor: &CommandExecutor, cache: &StatusCache) -> Result<i32> {
    let (success, message) = executor.reset_connection().await;
    // Stale cached reachability would mask the reset.
    cache.invalidate().await;

    if success {
        println!("{} {message}", "●".green());
        Ok(0)
    } else {
        println!("{} {message}", "●".red());
        Ok(1)
    }
}
