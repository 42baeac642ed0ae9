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

//! Connection configuration for the target device.
//!
//! Settings are resolved once at startup from an optional YAML file with
//! environment variable overrides, and validated before any connection
//! attempt is made. The defaults target a Jetson-class board on its
//! USB-tethered link-local address.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::fs;

use crate::security::EscalationPassword;

/// Default device address on the USB/Ethernet point-to-point link.
pub const DEFAULT_HOST: &str = "192.168.55.1";
/// Default login user shipped on the device image.
pub const DEFAULT_USER: &str = "ubuntu";

const DEFAULT_PORT: u16 = 22;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 60;
const DEFAULT_KEEPALIVE_INTERVAL_SECS: u64 = 5;

/// Validation failures detected before a connection is attempted.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required connection setting: {0}")]
    MissingField(&'static str),

    #[error("no authentication method configured: set a password or a key file")]
    NoAuthMethod,

    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

/// Which execution path to use for remote commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Prefer the in-process SSH client, fall back to the external one.
    #[default]
    Auto,
    /// In-process SSH client only.
    Native,
    /// External `ssh` binary driven through a pseudo-terminal.
    Process,
}

impl FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "native" => Ok(Self::Native),
            "process" => Ok(Self::Process),
            other => Err(ConfigError::InvalidValue {
                field: "transport",
                value: other.to_string(),
            }),
        }
    }
}

/// Immutable per-process connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_user")]
    pub username: String,

    /// Login password. Also used for privilege escalation unless
    /// `sudo_password` is set separately.
    #[serde(default)]
    pub password: Option<String>,

    /// Private key file, used when no password is configured.
    #[serde(default)]
    pub key_file: Option<PathBuf>,

    /// Separate escalation password, for devices where the login user and
    /// the sudo credential differ.
    #[serde(default)]
    pub sudo_password: Option<String>,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// SSH keepalive interval in seconds. The USB link drops idle
    /// connections silently without it.
    #[serde(default = "default_keepalive")]
    pub keepalive_interval_secs: u64,

    #[serde(default)]
    pub transport: TransportKind,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_user() -> String {
    DEFAULT_USER.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_command_timeout() -> u64 {
    DEFAULT_COMMAND_TIMEOUT_SECS
}

fn default_keepalive() -> u64 {
    DEFAULT_KEEPALIVE_INTERVAL_SECS
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            username: default_user(),
            password: None,
            key_file: None,
            sudo_password: None,
            port: DEFAULT_PORT,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            keepalive_interval_secs: DEFAULT_KEEPALIVE_INTERVAL_SECS,
            transport: TransportKind::Auto,
        }
    }
}

impl ConnectionConfig {
    /// Load a configuration file.
    pub async fn load(path: &Path) -> Result<Self> {
        let expanded_path = expand_tilde(path);

        if !expanded_path.exists() {
            tracing::debug!(
                "Config file not found at {:?}, using defaults",
                expanded_path
            );
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&expanded_path)
            .await
            .with_context(|| format!("Failed to read configuration file at {expanded_path:?}"))?;

        let config: ConnectionConfig = serde_yaml::from_str(&content).with_context(|| {
            format!("Failed to parse YAML configuration file at {expanded_path:?}")
        })?;

        Ok(config)
    }

    /// Load configuration with priority order:
    /// 1. Current directory `jdiag.yaml`
    /// 2. User config `~/.config/jdiag/config.yaml`
    /// 3. The given default path
    ///
    /// Environment variables override whatever the file provided.
    pub async fn load_with_priority(default_path: &Path) -> Result<Self> {
        let current_dir_config = PathBuf::from("jdiag.yaml");
        if current_dir_config.exists() {
            if let Ok(config) = Self::load(&current_dir_config).await {
                return Ok(config.apply_env());
            }
        }

        if let Some(home_dir) = dirs::home_dir() {
            let home_config = home_dir.join(".config").join("jdiag").join("config.yaml");
            if home_config.exists() {
                if let Ok(config) = Self::load(&home_config).await {
                    return Ok(config.apply_env());
                }
            }
        }

        Ok(Self::load(default_path).await?.apply_env())
    }

    /// Overlay `JDIAG_*` environment variables on top of this config.
    pub fn apply_env(mut self) -> Self {
        if let Ok(host) = env::var("JDIAG_HOST") {
            if !host.is_empty() {
                self.host = host;
            }
        }
        if let Ok(user) = env::var("JDIAG_USER") {
            if !user.is_empty() {
                self.username = user;
            }
        }
        if let Ok(password) = env::var("JDIAG_PASSWORD") {
            if !password.is_empty() {
                self.password = Some(password);
            }
        }
        if let Ok(key_file) = env::var("JDIAG_KEY_FILE") {
            if !key_file.is_empty() {
                self.key_file = Some(expand_tilde(Path::new(&key_file)));
            }
        }
        if let Ok(sudo_password) = env::var("JDIAG_SUDO_PASSWORD") {
            if !sudo_password.is_empty() {
                self.sudo_password = Some(sudo_password);
            }
        }
        if let Ok(port) = env::var("JDIAG_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.port = port;
            } else {
                tracing::warn!("Ignoring unparseable JDIAG_PORT value: {port}");
            }
        }
        if let Ok(transport) = env::var("JDIAG_TRANSPORT") {
            match transport.parse::<TransportKind>() {
                Ok(kind) => self.transport = kind,
                Err(_) => tracing::warn!("Ignoring unknown JDIAG_TRANSPORT value: {transport}"),
            }
        }
        self
    }

    /// Check that the configuration can possibly authenticate.
    ///
    /// Called before every connection attempt so that a broken environment
    /// short-circuits with a structured error instead of a doomed handshake.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::MissingField("host"));
        }
        if self.username.trim().is_empty() {
            return Err(ConfigError::MissingField("username"));
        }
        let has_password = self.password.as_deref().map(|p| !p.is_empty());
        if !has_password.unwrap_or(false) && self.key_file.is_none() {
            return Err(ConfigError::NoAuthMethod);
        }
        Ok(())
    }

    /// The credential injected into privileged commands.
    ///
    /// Falls back to the login password, which matches how the device
    /// images are provisioned.
    pub fn escalation_password(&self) -> Option<EscalationPassword> {
        self.sudo_password
            .as_deref()
            .or(self.password.as_deref())
            .filter(|p| !p.is_empty())
            .and_then(|p| EscalationPassword::new(p.to_string()).ok())
    }

    pub fn connect_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn command_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.command_timeout_secs)
    }
}

/// Expand the tilde (~) in paths to the home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Some(path_str) = path.to_str() {
        if let Some(stripped) = path_str.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(stripped);
            }
        }
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_config() -> ConnectionConfig {
        ConnectionConfig {
            password: Some("secret".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = ConnectionConfig::default();
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.username, DEFAULT_USER);
        assert_eq!(config.port, 22);
        assert_eq!(config.transport, TransportKind::Auto);
    }

    #[test]
    fn test_validate_requires_auth_method() {
        let config = ConnectionConfig::default();
        assert_eq!(config.validate(), Err(ConfigError::NoAuthMethod));

        assert!(minimal_config().validate().is_ok());

        let keyed = ConnectionConfig {
            key_file: Some(PathBuf::from("/home/op/.ssh/id_ed25519")),
            ..Default::default()
        };
        assert!(keyed.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_fields() {
        let mut config = minimal_config();
        config.host = "  ".to_string();
        assert_eq!(config.validate(), Err(ConfigError::MissingField("host")));

        let mut config = minimal_config();
        config.username = String::new();
        assert_eq!(
            config.validate(),
            Err(ConfigError::MissingField("username"))
        );
    }

    #[test]
    fn test_empty_password_is_no_auth() {
        let mut config = minimal_config();
        config.password = Some(String::new());
        assert_eq!(config.validate(), Err(ConfigError::NoAuthMethod));
    }

    #[test]
    fn test_escalation_password_falls_back_to_login() {
        let config = minimal_config();
        let escalation = config.escalation_password().unwrap();
        assert_eq!(escalation.as_bytes(), b"secret");

        let mut config = minimal_config();
        config.sudo_password = Some("other".to_string());
        let escalation = config.escalation_password().unwrap();
        assert_eq!(escalation.as_bytes(), b"other");
    }

    #[test]
    fn test_transport_kind_from_str() {
        assert_eq!("auto".parse::<TransportKind>().unwrap(), TransportKind::Auto);
        assert_eq!(
            "native".parse::<TransportKind>().unwrap(),
            TransportKind::Native
        );
        assert_eq!(
            "PROCESS".parse::<TransportKind>().unwrap(),
            TransportKind::Process
        );
        assert!("telnet".parse::<TransportKind>().is_err());
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r#"
host: 10.0.0.7
username: nvidia
password: nvidia
port: 2222
transport: process
"#;
        let config: ConnectionConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.host, "10.0.0.7");
        assert_eq!(config.username, "nvidia");
        assert_eq!(config.port, 2222);
        assert_eq!(config.transport, TransportKind::Process);
        // Unset fields take defaults
        assert_eq!(config.connect_timeout_secs, 30);
        assert_eq!(config.keepalive_interval_secs, 5);
    }
}
