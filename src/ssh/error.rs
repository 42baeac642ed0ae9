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

use std::fmt;
use std::io;

/// Error type for SSH transport operations.
#[derive(Debug)]
pub enum Error {
    /// IO error
    Io(io::Error),
    /// SSH protocol error from russh
    Ssh(russh::Error),
    /// Wrong password
    PasswordWrong,
    /// Key authentication failed
    KeyAuthFailed,
    /// Invalid or unreadable key material
    KeyInvalid(russh::keys::Error),
    /// No password or key available for the requested auth method
    NoAuthMethod,
    /// TCP/handshake phase exceeded the connect timeout
    ConnectTimeout(u64),
    /// The session could not provide a live channel
    ConnectionUnavailable(Box<Error>),
    /// Remote host identity does not match the stored record
    HostKeyMismatch(String),
    /// Command channel closed without reporting an exit status
    CommandDidntExit,
    /// Command exceeded its execution timeout
    CommandTimeout(u64),
    /// The fallback client binary is missing or unusable
    ClientUnavailable(String),
    /// Other error
    Other(String),
}

impl Error {
    /// Authentication failures are terminal for a session: retrying them
    /// risks tripping remote lockout policies.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Error::PasswordWrong | Error::KeyAuthFailed | Error::KeyInvalid(_) | Error::NoAuthMethod
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::CommandTimeout(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "IO error: {e}"),
            Error::Ssh(e) => write!(f, "SSH error: {e}"),
            Error::PasswordWrong => write!(f, "Wrong password"),
            Error::KeyAuthFailed => write!(f, "Key authentication failed"),
            Error::KeyInvalid(e) => write!(f, "Invalid key: {e}"),
            Error::NoAuthMethod => write!(f, "No authentication method available"),
            Error::ConnectTimeout(secs) => {
                write!(f, "Connection attempt timed out after {secs}s")
            }
            Error::ConnectionUnavailable(inner) => {
                write!(f, "connection unavailable: {inner}")
            }
            Error::HostKeyMismatch(host) => {
                write!(f, "Remote host identity changed for {host}")
            }
            Error::CommandDidntExit => {
                write!(f, "Command channel closed without an exit status")
            }
            Error::CommandTimeout(secs) => write!(f, "Command timed out after {secs}s"),
            Error::ClientUnavailable(detail) => {
                write!(f, "External ssh client unavailable: {detail}")
            }
            Error::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Ssh(e) => Some(e),
            Error::KeyInvalid(e) => Some(e),
            Error::ConnectionUnavailable(inner) => Some(inner.as_ref()),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<russh::Error> for Error {
    fn from(err: russh::Error) -> Self {
        Error::Ssh(err)
    }
}

impl From<russh::keys::Error> for Error {
    fn from(err: russh::keys::Error) -> Self {
        Error::KeyInvalid(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_failure_classification() {
        assert!(Error::PasswordWrong.is_auth_failure());
        assert!(Error::KeyAuthFailed.is_auth_failure());
        assert!(!Error::CommandTimeout(5).is_auth_failure());
        assert!(!Error::CommandDidntExit.is_auth_failure());
    }

    #[test]
    fn test_timeout_classification() {
        assert!(Error::CommandTimeout(30).is_timeout());
        assert!(!Error::ConnectTimeout(30).is_timeout());
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            Error::CommandTimeout(5).to_string(),
            "Command timed out after 5s"
        );
        assert!(Error::HostKeyMismatch("192.168.55.1".to_string())
            .to_string()
            .contains("192.168.55.1"));
        let io_err = Error::from(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
        assert!(io_err.to_string().contains("refused"));
    }
}
