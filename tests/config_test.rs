//! Configuration resolution: files, environment overrides, validation.

use jdiag::config::{ConfigError, ConnectionConfig, TransportKind};
use serial_test::serial;
use std::io::Write;

fn clear_env() {
    for var in [
        "JDIAG_HOST",
        "JDIAG_USER",
        "JDIAG_PASSWORD",
        "JDIAG_PORT",
        "JDIAG_KEY_FILE",
        "JDIAG_SUDO_PASSWORD",
        "JDIAG_TRANSPORT",
    ] {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn env_overrides_defaults() {
    clear_env();
    std::env::set_var("JDIAG_HOST", "10.11.12.13");
    std::env::set_var("JDIAG_USER", "nvidia");
    std::env::set_var("JDIAG_PASSWORD", "nvidia");
    std::env::set_var("JDIAG_PORT", "2222");
    std::env::set_var("JDIAG_TRANSPORT", "process");

    let config = ConnectionConfig::default().apply_env();
    clear_env();

    assert_eq!(config.host, "10.11.12.13");
    assert_eq!(config.username, "nvidia");
    assert_eq!(config.password.as_deref(), Some("nvidia"));
    assert_eq!(config.port, 2222);
    assert_eq!(config.transport, TransportKind::Process);
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn bad_env_values_are_ignored() {
    clear_env();
    std::env::set_var("JDIAG_PORT", "not-a-port");
    std::env::set_var("JDIAG_TRANSPORT", "carrier-pigeon");

    let config = ConnectionConfig::default().apply_env();
    clear_env();

    assert_eq!(config.port, 22);
    assert_eq!(config.transport, TransportKind::Auto);
}

#[test]
#[serial]
fn empty_env_values_do_not_clobber() {
    clear_env();
    std::env::set_var("JDIAG_HOST", "");

    let config = ConnectionConfig::default().apply_env();
    clear_env();

    assert_eq!(config.host, "192.168.55.1");
}

#[test]
#[serial]
fn separate_sudo_password_wins_over_login() {
    clear_env();
    std::env::set_var("JDIAG_PASSWORD", "login-pw");
    std::env::set_var("JDIAG_SUDO_PASSWORD", "sudo-pw");

    let config = ConnectionConfig::default().apply_env();
    clear_env();

    assert_eq!(config.escalation_password().unwrap().as_bytes(), b"sudo-pw");
}

#[tokio::test]
#[serial]
async fn missing_file_yields_defaults() {
    clear_env();
    let config = ConnectionConfig::load(std::path::Path::new("/definitely/not/here.yaml"))
        .await
        .unwrap();
    assert_eq!(config.host, "192.168.55.1");
    assert_eq!(config.username, "ubuntu");
}

#[tokio::test]
#[serial]
async fn file_values_are_loaded() {
    clear_env();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "host: 172.16.0.9\nusername: op\npassword: op\nconnect_timeout_secs: 10"
    )
    .unwrap();

    let config = ConnectionConfig::load(file.path()).await.unwrap();
    assert_eq!(config.host, "172.16.0.9");
    assert_eq!(config.username, "op");
    assert_eq!(config.connect_timeout_secs, 10);
    // Unspecified settings keep defaults
    assert_eq!(config.port, 22);
    assert_eq!(config.command_timeout_secs, 60);
}

#[tokio::test]
#[serial]
async fn malformed_file_is_an_error() {
    clear_env();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "host: [unterminated").unwrap();

    assert!(ConnectionConfig::load(file.path()).await.is_err());
}

#[test]
fn validation_failure_matrix() {
    let no_auth = ConnectionConfig::default();
    assert_eq!(no_auth.validate(), Err(ConfigError::NoAuthMethod));

    let mut blank_host = ConnectionConfig {
        password: Some("pw".to_string()),
        ..Default::default()
    };
    blank_host.host = String::new();
    assert_eq!(blank_host.validate(), Err(ConfigError::MissingField("host")));
}

#[test]
fn doomed_config_never_reaches_a_transport() {
    // Executor construction surfaces the config error immediately instead
    // of attempting a connection that cannot authenticate.
    let result = jdiag::executor::CommandExecutor::new(ConnectionConfig::default());
    let error = result.err().expect("constructor must fail");
    let config_error = error
        .downcast_ref::<ConfigError>()
        .expect("error should be a ConfigError");
    assert_eq!(*config_error, ConfigError::NoAuthMethod);
}
