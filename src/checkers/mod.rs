//! Protocol check engine (spec.md §4.3). A checker is a function
//! `(Monitor, timeoutSeconds) -> CheckResult`; dispatch is by
//! `monitor.spec.type`. Every networked checker is factored into a pure
//! evaluation function plus an injectable transport trait, so every error
//! path is testable without live dependencies (spec.md §4.3 "Injectable
//! transports", spec.md §9's factory-closure re-expression).

pub mod dns;
pub mod grpc;
pub mod http;
pub mod json_query;
pub mod k8s;
pub mod keyword;
pub mod mysql;
pub mod ping;
pub mod postgresql;
pub mod push;
pub mod redis;
pub mod steam;
pub mod tcp;
pub mod transport;
pub mod websocket;

use std::time::{Duration, Instant};

use crate::crd::{CheckState, Monitor, MonitorTarget};

/// Uniform result contract returned by every checker (spec.md §3:
/// CheckResult).
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    pub state: CheckState,
    pub reason: String,
    pub message: String,
    pub latency_ms: u64,
}

impl CheckResult {
    pub fn up(reason: impl Into<String>, message: impl Into<String>, latency_ms: u64) -> Self {
        CheckResult {
            state: CheckState::Up,
            reason: reason.into(),
            message: message.into(),
            latency_ms,
        }
    }

    pub fn down(reason: impl Into<String>, message: impl Into<String>, latency_ms: u64) -> Self {
        CheckResult {
            state: CheckState::Down,
            reason: reason.into(),
            message: message.into(),
            latency_ms,
        }
    }

    /// `state="down"` with `reason="INVALID_CONFIG"` (spec.md §4.3 universal
    /// contract, used when the target variant doesn't match the type).
    pub fn invalid_config(message: impl Into<String>, latency_ms: u64) -> Self {
        CheckResult::down("INVALID_CONFIG", message, latency_ms)
    }

    pub fn timeout(latency_ms: u64) -> Self {
        CheckResult::down("TIMEOUT", "operation timed out", latency_ms)
    }

    pub fn is_up(&self) -> bool {
        self.state == CheckState::Up
    }
}

/// Measures wall-time the way every checker is required to (spec.md §4.3:
/// "Measure wall-time from entry; set latencyMs = elapsed ms on every return
/// path").
pub struct Stopwatch {
    start: Instant,
}

impl Stopwatch {
    pub fn start() -> Self {
        Stopwatch { start: Instant::now() }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// The collection of transport implementations a `dispatch` call uses.
/// Production code builds this with `Transports::production()`; tests build
/// it with mocks (spec.md §4.3).
pub struct Transports {
    pub http: Box<dyn transport::HttpTransport>,
    pub tcp: Box<dyn transport::TcpTransport>,
    pub dns: Box<dyn transport::DnsTransport>,
    pub ping: Box<dyn transport::ProcessRunner>,
    pub websocket: Box<dyn transport::WebSocketTransport>,
    pub grpc: Box<dyn transport::GrpcHealthTransport>,
    pub sql: Box<dyn transport::SqlTransport>,
    pub redis: Box<dyn transport::RedisTransport>,
    pub k8s: Box<dyn transport::K8sReadTransport>,
    pub udp: Box<dyn transport::UdpTransport>,
}

impl Transports {
    pub fn production() -> Self {
        Transports {
            http: Box::new(transport::ReqwestHttpTransport),
            tcp: Box::new(transport::TokioTcpTransport),
            dns: Box::new(transport::HickoryDnsTransport),
            ping: Box::new(transport::SystemProcessRunner),
            websocket: Box::new(transport::TungsteniteWebSocketTransport),
            grpc: Box::new(transport::TonicGrpcHealthTransport),
            sql: Box::new(transport::SqlxSqlTransport),
            redis: Box::new(transport::RedisCrateTransport),
            k8s: Box::new(transport::KubeK8sReadTransport),
            udp: Box::new(transport::TokioUdpTransport),
        }
    }
}

/// Dispatch a check by `monitor.spec.type` (spec.md §4.3).
pub async fn dispatch(monitor: &Monitor, timeout: Duration, transports: &Transports) -> CheckResult {
    let sw = Stopwatch::start();
    match &monitor.spec.target {
        MonitorTarget::Http(t) => http::check(t, monitor.spec.success_criteria.as_ref(), timeout, transports.http.as_ref(), &sw).await,
        MonitorTarget::Keyword(t) => keyword::check(t, monitor.spec.success_criteria.as_ref(), timeout, transports.http.as_ref(), &sw).await,
        MonitorTarget::JsonQuery(t) => json_query::check(t, timeout, transports.http.as_ref(), &sw).await,
        MonitorTarget::Tcp(t) => tcp::check(t, timeout, transports.tcp.as_ref(), &sw).await,
        MonitorTarget::Dns(t) => dns::check(t, timeout, transports.dns.as_ref(), &sw).await,
        MonitorTarget::Ping(t) => ping::check(t, timeout, transports.ping.as_ref(), &sw).await,
        MonitorTarget::Websocket(t) => websocket::check(t, timeout, transports.websocket.as_ref(), &sw).await,
        MonitorTarget::Grpc(t) => grpc::check(t, timeout, transports.grpc.as_ref(), &sw).await,
        MonitorTarget::Mysql(t) => mysql::check(t, timeout, transports.sql.as_ref(), &sw).await,
        MonitorTarget::Postgresql(t) => postgresql::check(t, timeout, transports.sql.as_ref(), &sw).await,
        MonitorTarget::Redis(t) => redis::check(t, timeout, transports.redis.as_ref(), &sw).await,
        MonitorTarget::K8s(t) => k8s::check(t, transports.k8s.as_ref(), &sw).await,
        MonitorTarget::Steam(t) => steam::check(t, timeout, transports.udp.as_ref(), &sw).await,
        MonitorTarget::Push(t) | MonitorTarget::Docker(t) => {
            push::check(t, monitor.status.as_ref(), &sw)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn up_result_has_up_state() {
        let r = CheckResult::up("HTTP_OK", "", 12);
        assert!(r.is_up());
        assert_eq!(r.reason, "HTTP_OK");
    }

    #[test]
    fn down_result_has_down_state() {
        let r = CheckResult::down("HTTP_500", "server error", 8);
        assert!(!r.is_up());
    }

    #[test]
    fn invalid_config_uses_canonical_reason() {
        let r = CheckResult::invalid_config("missing target", 0);
        assert_eq!(r.reason, "INVALID_CONFIG");
        assert!(!r.is_up());
    }

    #[test]
    fn stopwatch_reports_nonzero_after_sleep() {
        let sw = Stopwatch::start();
        std::thread::sleep(Duration::from_millis(5));
        assert!(sw.elapsed_ms() >= 5);
    }
}
