//! WebSocket checker (spec.md §4.3): connect, optionally send a frame and
//! await/assert a reply.

use std::time::Duration;

use crate::crd::monitor::WebSocketTarget;

use super::transport::{WebSocketTransport, WsError};
use super::{CheckResult, Stopwatch};

pub async fn check(target: &WebSocketTarget, timeout: Duration, transport: &dyn WebSocketTransport, sw: &Stopwatch) -> CheckResult {
    let await_reply = target.expect.is_some();
    let result = transport.exchange(&target.url, target.send.as_deref(), await_reply, timeout).await;
    let latency_ms = sw.elapsed_ms();

    let reply = match result {
        Ok(reply) => reply,
        Err(WsError::Timeout) => return CheckResult::timeout(latency_ms),
        Err(WsError::InvalidScheme) => return CheckResult::invalid_config("url must use ws:// or wss://", latency_ms),
        Err(WsError::ConnectionError(msg)) => return CheckResult::down("WEBSOCKET_ERROR", msg, latency_ms),
    };

    if let Some(expected) = &target.expect {
        match reply {
            Some(text) if text.contains(expected.as_str()) => {}
            Some(text) => {
                return CheckResult::down(
                    "WEBSOCKET_REPLY_MISMATCH",
                    format!("reply {text:?} did not contain {expected:?}"),
                    latency_ms,
                );
            }
            None => return CheckResult::down("WEBSOCKET_REPLY_MISMATCH", "no reply received", latency_ms),
        }
    }

    CheckResult::up("WEBSOCKET_OK", "connection established", latency_ms)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;

    struct MockWs {
        result: Result<Option<String>, WsError>,
    }

    #[async_trait]
    impl WebSocketTransport for MockWs {
        async fn exchange(&self, _url: &str, _send: Option<&str>, _await_reply: bool, _timeout: Duration) -> Result<Option<String>, WsError> {
            self.result.clone()
        }
    }

    #[tokio::test]
    async fn bare_connect_is_up() {
        let target = WebSocketTarget { url: "wss://example.com/ws".to_string(), send: None, expect: None };
        let mock = MockWs { result: Ok(None) };
        let result = check(&target, Duration::from_secs(3), &mock, &Stopwatch::start()).await;
        assert!(result.is_up());
    }

    #[tokio::test]
    async fn matching_reply_is_up() {
        let target = WebSocketTarget { url: "wss://example.com/ws".to_string(), send: Some("ping".to_string()), expect: Some("pong".to_string()) };
        let mock = MockWs { result: Ok(Some("pong!".to_string())) };
        let result = check(&target, Duration::from_secs(3), &mock, &Stopwatch::start()).await;
        assert!(result.is_up());
    }

    #[tokio::test]
    async fn mismatched_reply_is_down() {
        let target = WebSocketTarget { url: "wss://example.com/ws".to_string(), send: Some("ping".to_string()), expect: Some("pong".to_string()) };
        let mock = MockWs { result: Ok(Some("nope".to_string())) };
        let result = check(&target, Duration::from_secs(3), &mock, &Stopwatch::start()).await;
        assert_eq!(result.reason, "WEBSOCKET_REPLY_MISMATCH");
    }

    #[tokio::test]
    async fn invalid_scheme_is_invalid_config() {
        let target = WebSocketTarget { url: "http://example.com/ws".to_string(), send: None, expect: None };
        let mock = MockWs { result: Err(WsError::InvalidScheme) };
        let result = check(&target, Duration::from_secs(3), &mock, &Stopwatch::start()).await;
        assert_eq!(result.reason, "INVALID_CONFIG");
    }
}
