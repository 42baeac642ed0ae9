//! Test transport that records calls and replays scripted outcomes.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use jdiag::executor::{RemoteCommand, Transport};
use jdiag::ssh::{CommandOutput, Error};

/// One scripted reply for the mock transport.
pub enum MockReply {
    Output {
        stdout: &'static str,
        stderr: &'static str,
        exit_status: u32,
    },
    Timeout(u64),
    AuthFailure,
    ConnectTimeout(u64),
    ChannelError,
}

/// A recorded call: the transport-level command, its escalation flag, and
/// the timeout the executor applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub line: String,
    pub elevate: bool,
    pub timeout: Duration,
}

#[derive(Default)]
pub struct MockTransport {
    calls: Mutex<Vec<RecordedCall>>,
    replies: Mutex<VecDeque<MockReply>>,
    resets: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies(replies: Vec<MockReply>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            replies: Mutex::new(replies.into()),
            resets: AtomicUsize::new(0),
        }
    }

    pub fn echo_ok() -> MockReply {
        MockReply::Output {
            stdout: "ok\n",
            stderr: "",
            exit_status: 0,
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn reset_count(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn run(
        &self,
        command: &RemoteCommand,
        timeout: Duration,
    ) -> Result<CommandOutput, Error> {
        self.calls.lock().unwrap().push(RecordedCall {
            line: command.line.clone(),
            elevate: command.elevate,
            timeout,
        });

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(MockReply::Output {
                stdout: "ok\n",
                stderr: "",
                exit_status: 0,
            });

        match reply {
            MockReply::Output {
                stdout,
                stderr,
                exit_status,
            } => Ok(CommandOutput {
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
                exit_status,
            }),
            MockReply::Timeout(secs) => Err(Error::CommandTimeout(secs)),
            MockReply::AuthFailure => Err(Error::PasswordWrong),
            MockReply::ConnectTimeout(secs) => Err(Error::ConnectTimeout(secs)),
            MockReply::ChannelError => Err(Error::CommandDidntExit),
        }
    }

    async fn reset(&self) -> Result<(), Error> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
