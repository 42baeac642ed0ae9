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

use anyhow::{Context, Result};
use clap::Parser;

use jdiag::{
    cli::{Cli, Commands},
    commands::{check, diag, exec, reset},
    config::ConnectionConfig,
    executor::CommandExecutor,
    status::StatusCache,
    utils::init_logging,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    // `diag --list` needs no device connection at all.
    if let Commands::Diag { list: true, .. } = &cli.command {
        diag::list_probes();
        return Ok(());
    }

    let mut config = ConnectionConfig::load_with_priority(&cli.config)
        .await
        .context("Failed to load configuration")?;

    if let Some(host) = &cli.host {
        config.host = host.clone();
    }
    if let Some(user) = &cli.user {
        config.username = user.clone();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    let executor = CommandExecutor::new(config)?;
    let cache = StatusCache::new();

    let exit_code = match &cli.command {
        Commands::Exec { command, timeout } => {
            let command = Cli::joined_command(command);
            exec::execute_command(&executor, &command, *timeout).await?
        }
        Commands::Check { detailed } => {
            check::check_connection(&executor, &cache, *detailed).await?
        }
        Commands::Diag { names, .. } => diag::run_diagnostics(&executor, names).await?,
        Commands::Reset => reset::reset_connection(&executor, &cache).await?,
    };

    std::process::exit(exit_code)
}
