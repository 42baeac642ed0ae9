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

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "jdiag",
    version,
    about = "Remote diagnostics console for Jetson-class embedded devices",
    long_about = "jdiag talks to an embedded Linux board over its USB/Ethernet point-to-point link.\nIt maintains a persistent SSH session to the device, runs one-shot or batched hardware\ndiagnostics (power rails, thermals, storage, modem/SIM, buses, kernel logs), and executes\narbitrary remote commands, including privilege-escalated ones, with bounded timeouts.",
    after_help = "EXAMPLES:\n  Run one remote command:       jdiag exec \"uptime\"\n  Privileged command:           jdiag exec \"sudo dmesg | tail\"\n  Cached liveness check:        jdiag check\n  Full link report:             jdiag check --detailed\n  Run all diagnostics:          jdiag diag\n  Run selected diagnostics:     jdiag diag thermals modem\n  After swapping the device:    jdiag reset\n\nConnection settings come from ~/.config/jdiag/config.yaml or ./jdiag.yaml,\noverridden by JDIAG_HOST, JDIAG_USER, JDIAG_PASSWORD, JDIAG_PORT, JDIAG_KEY_FILE,\nJDIAG_SUDO_PASSWORD and JDIAG_TRANSPORT."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        long,
        default_value = "~/.config/jdiag/config.yaml",
        help = "Configuration file path [default: ~/.config/jdiag/config.yaml]"
    )]
    pub config: PathBuf,

    #[arg(long, help = "Device hostname or address (overrides config)")]
    pub host: Option<String>,

    #[arg(short = 'u', long, help = "Login username (overrides config)")]
    pub user: Option<String>,

    #[arg(short = 'p', long, help = "SSH port (overrides config)")]
    pub port: Option<u16>,

    #[arg(
        short = 'v',
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Execute a command on the device",
        long_about = "Executes one command on the device over the persistent session.\nA leading `sudo ` requests privilege escalation; the credential is injected\nnon-interactively, never spliced into the command line.\n\nExit codes: 0 (command succeeded), 1 (command or connection failed)"
    )]
    Exec {
        #[arg(
            long,
            help = "Command timeout in seconds (overrides the configured default)"
        )]
        timeout: Option<u64>,

        #[arg(trailing_var_arg = true, required = true, help = "Command to execute")]
        command: Vec<String>,
    },

    #[command(
        about = "Check device reachability",
        long_about = "Cheap cached liveness check against the device link.\nWith --detailed, also probes general internet reachability and reports\nboth, cached at a longer interval for UI polling.\n\nExit codes: 0 (device reachable), 1 (unreachable)"
    )]
    Check {
        #[arg(long, help = "Include internet reachability and report details")]
        detailed: bool,
    },

    #[command(
        about = "Run hardware/software diagnostics",
        long_about = "Runs the registered diagnostic probes sequentially over the device link,\neach bounded by its own timeout. A failing probe is reported and the run\ncontinues.\n\nExit codes: 0 (no failures), 1 (any probe failed)"
    )]
    Diag {
        #[arg(long, help = "List available probes and exit")]
        list: bool,

        #[arg(help = "Probe names to run (all registered probes when omitted)")]
        names: Vec<String>,
    },

    #[command(
        about = "Reset the device connection",
        long_about = "Force-drops the persistent session and purges the stored host identity\nrecord, so a re-flashed or swapped device on the same address can be\nreached without identity-verification conflicts."
    )]
    Reset,
}

impl Cli {
    /// The exec command line as a single string.
    pub fn joined_command(parts: &[String]) -> String {
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exec() {
        let cli = Cli::try_parse_from(["jdiag", "exec", "uptime"]).unwrap();
        match cli.command {
            Commands::Exec { command, timeout } => {
                assert_eq!(command, vec!["uptime"]);
                assert_eq!(timeout, None);
            }
            _ => panic!("expected exec"),
        }
    }

    #[test]
    fn test_parse_exec_with_timeout_and_args() {
        let cli =
            Cli::try_parse_from(["jdiag", "exec", "--timeout", "5", "sleep", "120"]).unwrap();
        match cli.command {
            Commands::Exec { command, timeout } => {
                assert_eq!(Cli::joined_command(&command), "sleep 120");
                assert_eq!(timeout, Some(5));
            }
            _ => panic!("expected exec"),
        }
    }

    #[test]
    fn test_parse_check_detailed() {
        let cli = Cli::try_parse_from(["jdiag", "check", "--detailed"]).unwrap();
        match cli.command {
            Commands::Check { detailed } => assert!(detailed),
            _ => panic!("expected check"),
        }
    }

    #[test]
    fn test_parse_diag_names() {
        let cli = Cli::try_parse_from(["jdiag", "diag", "thermals", "modem"]).unwrap();
        match cli.command {
            Commands::Diag { list, names } => {
                assert!(!list);
                assert_eq!(names, vec!["thermals", "modem"]);
            }
            _ => panic!("expected diag"),
        }
    }

    #[test]
    fn test_verbosity_count() {
        let cli = Cli::try_parse_from(["jdiag", "-vv", "reset"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_exec_requires_command() {
        assert!(Cli::try_parse_from(["jdiag", "exec"]).is_err());
    }
}
