//! TCP checker (spec.md §4.3): connect, optionally send/expect a banner.

use std::time::Duration;

use crate::crd::monitor::TcpTarget;

use super::transport::{TcpError, TcpTransport};
use super::{CheckResult, Stopwatch};

pub async fn check(target: &TcpTarget, timeout: Duration, transport: &dyn TcpTransport, sw: &Stopwatch) -> CheckResult {
    let result = transport
        .check(&target.host, target.port, target.send.as_deref(), target.expect.as_deref(), timeout)
        .await;

    let latency_ms = sw.elapsed_ms();
    match result {
        Ok(()) => CheckResult::up("TCP_OK", format!("connected to {}:{}", target.host, target.port), latency_ms),
        Err(TcpError::Timeout) => CheckResult::timeout(latency_ms),
        Err(TcpError::ConnectionRefused) => CheckResult::down("CONNECTION_REFUSED", "connection refused", latency_ms),
        Err(TcpError::DnsNxDomain) => CheckResult::down("DNS_NXDOMAIN", "name did not resolve", latency_ms),
        Err(TcpError::SendError) => CheckResult::down("SEND_ERROR", "failed to send payload", latency_ms),
        Err(TcpError::ConnectionError(msg)) => CheckResult::down("CONNECTION_ERROR", msg, latency_ms),
    }
}
