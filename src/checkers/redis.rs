//! Redis checker (spec.md §4.3): issues `PING` and requires a `PONG` reply.

use std::time::Duration;

use crate::crd::monitor::RedisTarget;

use super::transport::{RedisTransport, RedisTransportError};
use super::{CheckResult, Stopwatch};

pub async fn check(target: &RedisTarget, timeout: Duration, transport: &dyn RedisTransport, sw: &Stopwatch) -> CheckResult {
    let password = if target.credential_secret_ref.is_some() {
        crate::secrets::read_credential("redis", "password")
    } else {
        None
    };

    let result = transport.ping(&target.host, target.port, password.as_deref(), timeout).await;
    let latency_ms = sw.elapsed_ms();

    // Error taxonomy matches MySQL/PostgreSQL minus DATABASE_NOT_FOUND (spec.md §4.3).
    match result {
        Ok(reply) if reply.eq_ignore_ascii_case("PONG") => CheckResult::up("REDIS_OK", "PING replied PONG", latency_ms),
        Ok(reply) => CheckResult::down("REDIS_UNEXPECTED_RESPONSE", format!("PING replied {reply:?}"), latency_ms),
        Err(RedisTransportError::Timeout) => CheckResult::timeout(latency_ms),
        Err(RedisTransportError::ConnectionRefused) => CheckResult::down("CONNECTION_REFUSED", "connection refused", latency_ms),
        Err(RedisTransportError::DnsNxDomain) => CheckResult::down("DNS_NXDOMAIN", "name did not resolve", latency_ms),
        Err(RedisTransportError::AuthFailed) => CheckResult::down("AUTH_FAILED", "authentication failed", latency_ms),
        Err(RedisTransportError::CredentialsError) => CheckResult::down("CREDENTIALS_ERROR", "credentials rejected", latency_ms),
        Err(RedisTransportError::ConnectionError(msg)) => CheckResult::down("CONNECTION_ERROR", msg, latency_ms),
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;

    struct MockRedis {
        result: Result<String, RedisTransportError>,
    }

    #[async_trait]
    impl RedisTransport for MockRedis {
        async fn ping(&self, _host: &str, _port: u16, _password: Option<&str>, _timeout: Duration) -> Result<String, RedisTransportError> {
            self.result.clone()
        }
    }

    #[tokio::test]
    async fn pong_reply_is_up() {
        let target = RedisTarget { host: "cache".to_string(), port: 6379, credential_secret_ref: None };
        let mock = MockRedis { result: Ok("PONG".to_string()) };
        let result = check(&target, Duration::from_secs(2), &mock, &Stopwatch::start()).await;
        assert!(result.is_up());
    }

    #[tokio::test]
    async fn unexpected_reply_is_down() {
        let target = RedisTarget { host: "cache".to_string(), port: 6379, credential_secret_ref: None };
        let mock = MockRedis { result: Ok("NOAUTH".to_string()) };
        let result = check(&target, Duration::from_secs(2), &mock, &Stopwatch::start()).await;
        assert_eq!(result.reason, "REDIS_UNEXPECTED_RESPONSE");
    }
}
