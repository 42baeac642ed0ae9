//! TTL behavior of the connection-status cache.

mod common;

use common::{MockReply, MockTransport};
use jdiag::executor::CommandExecutor;
use jdiag::status::StatusCache;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const LONG_TTL: Duration = Duration::from_secs(3600);

fn executor_with(replies: Vec<MockReply>) -> (Arc<MockTransport>, CommandExecutor) {
    let transport = Arc::new(MockTransport::with_replies(replies));
    let executor = CommandExecutor::with_transport(transport.clone(), DEFAULT_TIMEOUT);
    (transport, executor)
}

#[tokio::test]
async fn repeated_checks_within_ttl_hit_the_cache() {
    // Only one scripted reply: any second probe would fall back to the
    // mock default, so an identical result proves the probe ran once.
    let (transport, executor) = executor_with(vec![MockTransport::echo_ok()]);
    let cache = StatusCache::with_ttls(LONG_TTL, LONG_TTL);

    let first = cache.check_connection(&executor).await;
    assert_eq!(first, (true, "Connection active".to_string()));
    assert_eq!(transport.call_count(), 1);

    for _ in 0..5 {
        let again = cache.check_connection(&executor).await;
        assert_eq!(again, first);
    }
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn expired_entry_triggers_a_fresh_probe() {
    let (transport, executor) = executor_with(vec![
        MockTransport::echo_ok(),
        MockReply::Timeout(5),
    ]);
    let cache = StatusCache::with_ttls(Duration::ZERO, LONG_TTL);

    let first = cache.check_connection(&executor).await;
    assert!(first.0);

    let second = cache.check_connection(&executor).await;
    assert!(!second.0);
    assert_eq!(
        second.1,
        "Connection failed: timed out after 5s".to_string()
    );
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test]
async fn failures_are_cached_too() {
    // A dead link must not cause a probe storm: the failure is served
    // from cache within the TTL window like any other result.
    let (transport, executor) = executor_with(vec![MockReply::ConnectTimeout(30)]);
    let cache = StatusCache::with_ttls(LONG_TTL, LONG_TTL);

    let first = cache.check_connection(&executor).await;
    assert!(!first.0);
    assert!(first.1.contains("connection unavailable"));

    let again = cache.check_connection(&executor).await;
    assert_eq!(again, first);
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn unexpected_probe_output_is_not_a_live_link() {
    let (_, executor) = executor_with(vec![MockReply::Output {
        stdout: "Welcome to Ubuntu\n",
        stderr: "",
        exit_status: 0,
    }]);
    let cache = StatusCache::with_ttls(LONG_TTL, LONG_TTL);

    let (connected, message) = cache.check_connection(&executor).await;
    assert!(!connected);
    assert!(message.contains("unexpected probe output"));
}

#[tokio::test]
async fn detailed_status_is_cached_independently() {
    let (transport, executor) = executor_with(vec![
        MockTransport::echo_ok(),
        MockTransport::echo_ok(),
    ]);
    let cache = StatusCache::with_ttls(LONG_TTL, LONG_TTL);

    let first = cache.detailed_status(&executor).await;
    assert!(first.device_available);
    assert_eq!(transport.call_count(), 1);

    let again = cache.detailed_status(&executor).await;
    assert_eq!(again, first);
    assert_eq!(again.checked_at, first.checked_at);
    assert_eq!(transport.call_count(), 1);

    // The cheap check keeps its own entry and probes separately.
    let (connected, _) = cache.check_connection(&executor).await;
    assert!(connected);
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test]
async fn invalidate_forces_reprobe() {
    let (transport, executor) = executor_with(vec![
        MockTransport::echo_ok(),
        MockReply::ConnectTimeout(10),
    ]);
    let cache = StatusCache::with_ttls(LONG_TTL, LONG_TTL);

    assert!(cache.check_connection(&executor).await.0);
    cache.invalidate().await;

    assert!(!cache.check_connection(&executor).await.0);
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test]
async fn echo_probe_uses_short_timeout() {
    let (transport, executor) = executor_with(vec![MockTransport::echo_ok()]);
    let cache = StatusCache::with_ttls(LONG_TTL, LONG_TTL);

    cache.check_connection(&executor).await;

    // The probe must not inherit the executor's long default; a dead link
    // has to be reported in seconds.
    assert_eq!(transport.calls()[0].timeout, Duration::from_secs(5));
    assert_eq!(transport.calls()[0].line, "echo ok");
}
