//! Injectable transport traits (spec.md §4.3 "Injectable transports"). Each
//! networked checker depends on a small trait here rather than opening
//! sockets directly, so production code binds the platform-standard crate
//! and tests bind a synthetic mock — "one production implementation and one
//! mock" per spec.md §9's re-expression of the source's factory-closure
//! pattern.

use std::time::Duration;

use async_trait::async_trait;

/* ============================= HTTP ============================= */

#[derive(Debug, Clone, Default)]
pub struct HttpRequest {
    pub url: String,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    pub follow_redirects: bool,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    Timeout,
    ConnectionRefused,
    DnsNxDomain,
    Tls,
    Other(String),
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, req: HttpRequest, timeout: Duration) -> Result<HttpResponse, HttpError>;
}

pub struct ReqwestHttpTransport;

#[async_trait]
impl HttpTransport for ReqwestHttpTransport {
    async fn send(&self, req: HttpRequest, timeout: Duration) -> Result<HttpResponse, HttpError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(if req.follow_redirects {
                reqwest::redirect::Policy::limited(10)
            } else {
                reqwest::redirect::Policy::none()
            })
            .build()
            .map_err(|e| HttpError::Other(e.to_string()))?;

        let method = reqwest::Method::from_bytes(req.method.as_bytes())
            .unwrap_or(reqwest::Method::GET);
        let mut builder = client.request(method, &req.url);
        for (k, v) in &req.headers {
            builder = builder.header(k, v);
        }
        if let Some(body) = req.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(classify_reqwest_error)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| HttpError::Other(e.to_string()))?
            .to_vec();

        Ok(HttpResponse { status, headers, body })
    }
}

fn classify_reqwest_error(e: reqwest::Error) -> HttpError {
    if e.is_timeout() {
        HttpError::Timeout
    } else if e.is_connect() {
        let text = e.to_string();
        if text.contains("dns error") || text.contains("failed to lookup address") {
            HttpError::DnsNxDomain
        } else if text.contains("tls") || text.contains("certificate") {
            HttpError::Tls
        } else {
            HttpError::ConnectionRefused
        }
    } else {
        HttpError::Other(e.to_string())
    }
}

/* ============================= TCP ============================= */

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TcpError {
    Timeout,
    ConnectionRefused,
    DnsNxDomain,
    SendError,
    ConnectionError(String),
}

#[async_trait]
pub trait TcpTransport: Send + Sync {
    /// Connect, optionally send `send`, optionally read until `expect` is
    /// seen. Returns `Ok(())` on success.
    async fn check(
        &self,
        host: &str,
        port: u16,
        send: Option<&str>,
        expect: Option<&str>,
        timeout: Duration,
    ) -> Result<(), TcpError>;
}

pub struct TokioTcpTransport;

#[async_trait]
impl TcpTransport for TokioTcpTransport {
    async fn check(
        &self,
        host: &str,
        port: u16,
        send: Option<&str>,
        expect: Option<&str>,
        timeout: Duration,
    ) -> Result<(), TcpError> {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpStream;

        let addr = format!("{host}:{port}");
        let connect = tokio::time::timeout(timeout, TcpStream::connect(&addr));
        let mut stream = match connect.await {
            Ok(Ok(s)) => s,
            Ok(Err(e)) => {
                return Err(classify_io_error(&e));
            }
            Err(_) => return Err(TcpError::Timeout),
        };

        if let Some(payload) = send {
            if tokio::time::timeout(timeout, stream.write_all(payload.as_bytes()))
                .await
                .is_err()
            {
                return Err(TcpError::Timeout);
            }
        } else {
            return Ok(());
        }

        if let Some(needle) = expect {
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            let deadline = tokio::time::Instant::now() + timeout;
            loop {
                let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
                if remaining.is_zero() {
                    return Err(TcpError::Timeout);
                }
                match tokio::time::timeout(remaining, stream.read(&mut chunk)).await {
                    Ok(Ok(0)) => return Err(TcpError::ConnectionError("connection closed".to_string())),
                    Ok(Ok(n)) => {
                        buf.extend_from_slice(&chunk[..n]);
                        if String::from_utf8_lossy(&buf).contains(needle) {
                            return Ok(());
                        }
                    }
                    Ok(Err(e)) => return Err(classify_io_error(&e)),
                    Err(_) => return Err(TcpError::Timeout),
                }
            }
        }

        Ok(())
    }
}

fn classify_io_error(e: &std::io::Error) -> TcpError {
    use std::io::ErrorKind;
    match e.kind() {
        ErrorKind::ConnectionRefused => TcpError::ConnectionRefused,
        ErrorKind::TimedOut => TcpError::Timeout,
        _ => {
            let text = e.to_string();
            if text.contains("nodename nor servname") || text.contains("Name or service not known") {
                TcpError::DnsNxDomain
            } else {
                TcpError::ConnectionError(text)
            }
        }
    }
}

/* ============================= DNS ============================= */

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DnsError {
    NxDomain,
    Timeout,
    EmptyResponse,
    Other(String),
}

#[async_trait]
pub trait DnsTransport: Send + Sync {
    /// Resolve `name` for the given record type, returning its values
    /// formatted per spec.md §4.3 (MX by `exchange`, SRV as `name:port`).
    async fn resolve(&self, name: &str, record_type: &str, timeout: Duration) -> Result<Vec<String>, DnsError>;
}

pub struct HickoryDnsTransport;

#[async_trait]
impl DnsTransport for HickoryDnsTransport {
    async fn resolve(&self, name: &str, record_type: &str, timeout: Duration) -> Result<Vec<String>, DnsError> {
        use hickory_resolver::TokioAsyncResolver;
        use hickory_resolver::config::{ResolverConfig, ResolverOpts};

        let use_system = std::env::var(crate::secrets::DNS_USE_SYSTEM)
            .map(|v| v == "true" || v == "1")
            .unwrap_or(true);

        let resolver = if use_system {
            TokioAsyncResolver::tokio_from_system_conf()
                .map_err(|e| DnsError::Other(e.to_string()))?
        } else {
            TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
        };

        let lookup = tokio::time::timeout(timeout, async {
            match record_type {
                "A" => resolver.ipv4_lookup(name).await.map(|l| l.iter().map(|r| r.to_string()).collect::<Vec<_>>()).map_err(map_resolve_error),
                "AAAA" => resolver.ipv6_lookup(name).await.map(|l| l.iter().map(|r| r.to_string()).collect::<Vec<_>>()).map_err(map_resolve_error),
                "CNAME" => resolver.lookup(name, hickory_resolver::proto::rr::RecordType::CNAME).await
                    .map(|l| l.iter().map(|r| r.to_string()).collect::<Vec<_>>()).map_err(map_resolve_error),
                "MX" => resolver.mx_lookup(name).await.map(|l| l.iter().map(|r| r.exchange().to_string()).collect::<Vec<_>>()).map_err(map_resolve_error),
                "TXT" => resolver.txt_lookup(name).await.map(|l| l.iter().map(|r| r.to_string()).collect::<Vec<_>>()).map_err(map_resolve_error),
                "SRV" => resolver.srv_lookup(name).await.map(|l| l.iter().map(|r| format!("{}:{}", r.target(), r.port())).collect::<Vec<_>>()).map_err(map_resolve_error),
                other => Err(DnsError::Other(format!("unsupported record type {other}"))),
            }
        })
        .await
        .map_err(|_| DnsError::Timeout)??;

        if lookup.is_empty() {
            Err(DnsError::EmptyResponse)
        } else {
            Ok(lookup)
        }
    }
}

fn map_resolve_error(e: hickory_resolver::error::ResolveError) -> DnsError {
    use hickory_resolver::error::ResolveErrorKind;
    match e.kind() {
        ResolveErrorKind::NoRecordsFound { .. } => DnsError::NxDomain,
        _ => DnsError::Other(e.to_string()),
    }
}

/* ============================= PING (process) ============================= */

#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    TimedOut,
    SpawnFailed(String),
}

#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run_ping(&self, host: &str, packet_count: u32, timeout: Duration) -> Result<ProcessOutput, ProcessError>;
}

pub struct SystemProcessRunner;

#[async_trait]
impl ProcessRunner for SystemProcessRunner {
    async fn run_ping(&self, host: &str, packet_count: u32, timeout: Duration) -> Result<ProcessOutput, ProcessError> {
        let timeout_secs = timeout.as_secs().max(1).to_string();
        let child = tokio::process::Command::new("ping")
            .arg("-c")
            .arg(packet_count.to_string())
            .arg("-W")
            .arg(&timeout_secs)
            .arg(host)
            .output();

        match tokio::time::timeout(timeout, child).await {
            Ok(Ok(output)) => Ok(ProcessOutput {
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                success: output.status.success(),
            }),
            Ok(Err(e)) => Err(ProcessError::SpawnFailed(e.to_string())),
            Err(_) => Err(ProcessError::TimedOut),
        }
    }
}

/* ============================= WEBSOCKET ============================= */

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsError {
    Timeout,
    ConnectionError(String),
    InvalidScheme,
}

#[async_trait]
pub trait WebSocketTransport: Send + Sync {
    /// Connect, optionally send once, optionally await the first inbound
    /// message. Returns the first inbound message if one was awaited.
    async fn exchange(&self, url: &str, send: Option<&str>, await_reply: bool, timeout: Duration) -> Result<Option<String>, WsError>;
}

pub struct TungsteniteWebSocketTransport;

#[async_trait]
impl WebSocketTransport for TungsteniteWebSocketTransport {
    async fn exchange(&self, url: &str, send: Option<&str>, await_reply: bool, timeout: Duration) -> Result<Option<String>, WsError> {
        use futures::{SinkExt, StreamExt};
        use tokio_tungstenite::connect_async;
        use tokio_tungstenite::tungstenite::Message;

        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(WsError::InvalidScheme);
        }

        let connect = tokio::time::timeout(timeout, connect_async(url));
        let (mut stream, _) = match connect.await {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => return Err(WsError::ConnectionError(e.to_string())),
            Err(_) => return Err(WsError::Timeout),
        };

        if let Some(payload) = send {
            let send_fut = stream.send(Message::Text(payload.to_string()));
            if tokio::time::timeout(timeout, send_fut).await.is_err() {
                return Err(WsError::Timeout);
            }
        }

        if !await_reply {
            return Ok(None);
        }

        match tokio::time::timeout(timeout, stream.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => Ok(Some(text)),
            Ok(Some(Ok(Message::Binary(bytes)))) => Ok(Some(String::from_utf8_lossy(&bytes).to_string())),
            Ok(Some(Ok(_))) => Ok(Some(String::new())),
            Ok(Some(Err(e))) => Err(WsError::ConnectionError(e.to_string())),
            Ok(None) => Err(WsError::ConnectionError("connection closed".to_string())),
            Err(_) => Err(WsError::Timeout),
        }
    }
}

/* ============================= GRPC HEALTH ============================= */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrpcHealthStatus {
    Serving,
    NotServing,
    ServiceUnknown,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrpcError {
    Timeout,
    Unavailable,
    Other(String),
}

#[async_trait]
pub trait GrpcHealthTransport: Send + Sync {
    async fn check_health(&self, host: &str, port: u16, service: &str, tls: bool, timeout: Duration) -> Result<GrpcHealthStatus, GrpcError>;
}

pub struct TonicGrpcHealthTransport;

#[async_trait]
impl GrpcHealthTransport for TonicGrpcHealthTransport {
    async fn check_health(&self, host: &str, port: u16, service: &str, tls: bool, timeout: Duration) -> Result<GrpcHealthStatus, GrpcError> {
        let scheme = if tls { "https" } else { "http" };
        let endpoint = tonic::transport::Channel::from_shared(format!("{scheme}://{host}:{port}"))
            .map_err(|e| GrpcError::Other(e.to_string()))?
            .timeout(timeout)
            .connect_timeout(timeout);

        let channel = match tokio::time::timeout(timeout, endpoint.connect()).await {
            Ok(Ok(c)) => c,
            Ok(Err(e)) => return Err(GrpcError::Other(e.to_string())),
            Err(_) => return Err(GrpcError::Timeout),
        };

        let mut client = tonic_health::pb::health_client::HealthClient::new(channel);
        let request = tonic::Request::new(tonic_health::pb::HealthCheckRequest {
            service: service.to_string(),
        });

        match tokio::time::timeout(timeout, client.check(request)).await {
            Ok(Ok(resp)) => Ok(match resp.into_inner().status() {
                tonic_health::pb::health_check_response::ServingStatus::Serving => GrpcHealthStatus::Serving,
                tonic_health::pb::health_check_response::ServingStatus::NotServing => GrpcHealthStatus::NotServing,
                tonic_health::pb::health_check_response::ServingStatus::ServiceUnknown => GrpcHealthStatus::ServiceUnknown,
                _ => GrpcHealthStatus::Unknown,
            }),
            Ok(Err(status)) => {
                if status.code() == tonic::Code::Unavailable {
                    Err(GrpcError::Unavailable)
                } else if status.code() == tonic::Code::DeadlineExceeded {
                    Err(GrpcError::Timeout)
                } else if status.code() == tonic::Code::NotFound {
                    Ok(GrpcHealthStatus::ServiceUnknown)
                } else {
                    Err(GrpcError::Other(status.message().to_string()))
                }
            }
            Err(_) => Err(GrpcError::Timeout),
        }
    }
}

/* ============================= SQL (MySQL / PostgreSQL) ============================= */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlEngine {
    MySql,
    Postgres,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlError {
    Timeout,
    ConnectionRefused,
    DnsNxDomain,
    AuthFailed,
    DatabaseNotFound,
    CredentialsError,
    ConnectionError(String),
}

pub struct SqlConnectParams<'a> {
    pub engine: SqlEngine,
    pub host: &'a str,
    pub port: u16,
    pub database: &'a str,
    pub username: Option<&'a str>,
    pub password: Option<&'a str>,
    pub tls: bool,
    pub health_query: &'a str,
}

#[async_trait]
pub trait SqlTransport: Send + Sync {
    async fn run_health_query(&self, params: SqlConnectParams<'_>, timeout: Duration) -> Result<(), SqlError>;
}

pub struct SqlxSqlTransport;

#[async_trait]
impl SqlTransport for SqlxSqlTransport {
    async fn run_health_query(&self, params: SqlConnectParams<'_>, timeout: Duration) -> Result<(), SqlError> {
        let result = tokio::time::timeout(timeout, async move {
            match params.engine {
                SqlEngine::MySql => {
                    use sqlx::Connection;
                    let url = format!(
                        "mysql://{}:{}@{}:{}/{}",
                        params.username.unwrap_or_default(),
                        params.password.unwrap_or_default(),
                        params.host,
                        params.port,
                        params.database
                    );
                    let mut conn = sqlx::MySqlConnection::connect(&url)
                        .await
                        .map_err(|e| classify_sqlx_error(&e))?;
                    sqlx::query(params.health_query)
                        .execute(&mut conn)
                        .await
                        .map_err(|e| classify_sqlx_error(&e))?;
                    Ok(())
                }
                SqlEngine::Postgres => {
                    use sqlx::Connection;
                    let sslmode = if params.tls { "require" } else { "disable" };
                    let url = format!(
                        "postgres://{}:{}@{}:{}/{}?sslmode={}",
                        params.username.unwrap_or_default(),
                        params.password.unwrap_or_default(),
                        params.host,
                        params.port,
                        params.database,
                        sslmode
                    );
                    let mut conn = sqlx::PgConnection::connect(&url)
                        .await
                        .map_err(|e| classify_sqlx_error(&e))?;
                    sqlx::query(params.health_query)
                        .execute(&mut conn)
                        .await
                        .map_err(|e| classify_sqlx_error(&e))?;
                    Ok(())
                }
            }
        })
        .await;

        match result {
            Ok(inner) => inner,
            Err(_) => Err(SqlError::Timeout),
        }
    }
}

/// Classifies sqlx errors by substring-matching the engine's error text, per
/// spec.md §4.3's "documented order": connection refused, then DNS, then
/// auth/credentials, then missing database.
fn classify_sqlx_error(e: &sqlx::Error) -> SqlError {
    let text = e.to_string().to_lowercase();
    if text.contains("connection refused") {
        SqlError::ConnectionRefused
    } else if text.contains("name or service not known") || text.contains("dns") {
        SqlError::DnsNxDomain
    } else if text.contains("access denied") || text.contains("password authentication failed") {
        SqlError::AuthFailed
    } else if text.contains("unknown database") || text.contains("does not exist") {
        SqlError::DatabaseNotFound
    } else if text.contains("credentials") {
        SqlError::CredentialsError
    } else {
        SqlError::ConnectionError(text)
    }
}

/* ============================= REDIS ============================= */

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedisTransportError {
    Timeout,
    ConnectionRefused,
    DnsNxDomain,
    AuthFailed,
    CredentialsError,
    ConnectionError(String),
}

#[async_trait]
pub trait RedisTransport: Send + Sync {
    /// Issue PING and return the raw response string (e.g. `"PONG"`).
    async fn ping(&self, host: &str, port: u16, password: Option<&str>, timeout: Duration) -> Result<String, RedisTransportError>;
}

pub struct RedisCrateTransport;

#[async_trait]
impl RedisTransport for RedisCrateTransport {
    async fn ping(&self, host: &str, port: u16, password: Option<&str>, timeout: Duration) -> Result<String, RedisTransportError> {
        let url = match password {
            Some(pw) => format!("redis://:{pw}@{host}:{port}"),
            None => format!("redis://{host}:{port}"),
        };

        let result = tokio::time::timeout(timeout, async move {
            let client = redis::Client::open(url).map_err(|e| classify_redis_error(&e))?;
            let mut conn = client
                .get_multiplexed_async_connection()
                .await
                .map_err(|e| classify_redis_error(&e))?;
            redis::cmd("PING")
                .query_async::<_, String>(&mut conn)
                .await
                .map_err(|e| classify_redis_error(&e))
        })
        .await;

        match result {
            Ok(inner) => inner,
            Err(_) => Err(RedisTransportError::Timeout),
        }
    }
}

fn classify_redis_error(e: &redis::RedisError) -> RedisTransportError {
    let text = e.to_string().to_lowercase();
    if text.contains("connection refused") {
        RedisTransportError::ConnectionRefused
    } else if text.contains("name or service not known") || text.contains("dns") {
        RedisTransportError::DnsNxDomain
    } else if text.contains("wrongpass") || text.contains("auth") {
        RedisTransportError::AuthFailed
    } else {
        RedisTransportError::ConnectionError(text)
    }
}

/* ============================= K8S RESOURCE READ ============================= */

#[derive(Debug, Clone, Default)]
pub struct K8sResourceSnapshot {
    pub ready_replicas: Option<i32>,
    pub desired_replicas: Option<i32>,
    pub pod_phase: Option<String>,
    pub pod_containers_ready: Option<bool>,
    pub endpoint_ready_addresses: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum K8sReadError {
    NotFound,
    Other(String),
}

#[async_trait]
pub trait K8sReadTransport: Send + Sync {
    async fn read(&self, kind: &str, namespace: &str, name: &str) -> Result<K8sResourceSnapshot, K8sReadError>;
}

pub struct KubeK8sReadTransport;

#[async_trait]
impl K8sReadTransport for KubeK8sReadTransport {
    async fn read(&self, kind: &str, namespace: &str, name: &str) -> Result<K8sResourceSnapshot, K8sReadError> {
        use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
        use k8s_openapi::api::core::v1::{Endpoints, Pod};
        use kube::{Api, Client};

        let client = Client::try_default()
            .await
            .map_err(|e| K8sReadError::Other(e.to_string()))?;

        match kind {
            "Deployment" => {
                let api: Api<Deployment> = Api::namespaced(client, namespace);
                let d = api.get(name).await.map_err(|e| K8sReadError::Other(e.to_string()))?;
                let status = d.status.unwrap_or_default();
                Ok(K8sResourceSnapshot {
                    ready_replicas: status.ready_replicas,
                    desired_replicas: d.spec.and_then(|s| s.replicas).or(Some(1)),
                    ..Default::default()
                })
            }
            "StatefulSet" => {
                let api: Api<StatefulSet> = Api::namespaced(client, namespace);
                let s = api.get(name).await.map_err(|e| K8sReadError::Other(e.to_string()))?;
                let status = s.status.unwrap_or_default();
                Ok(K8sResourceSnapshot {
                    ready_replicas: status.ready_replicas,
                    desired_replicas: s.spec.and_then(|s| s.replicas).or(Some(1)),
                    ..Default::default()
                })
            }
            "Pod" => {
                let api: Api<Pod> = Api::namespaced(client, namespace);
                let p = api.get(name).await.map_err(|e| K8sReadError::Other(e.to_string()))?;
                let status = p.status.unwrap_or_default();
                let all_ready = status
                    .container_statuses
                    .as_ref()
                    .map(|cs| cs.iter().all(|c| c.ready))
                    .unwrap_or(false);
                Ok(K8sResourceSnapshot {
                    pod_phase: status.phase,
                    pod_containers_ready: Some(all_ready),
                    ..Default::default()
                })
            }
            "Endpoint" => {
                let api: Api<Endpoints> = Api::namespaced(client, namespace);
                let e = api.get(name).await.map_err(|e| K8sReadError::Other(e.to_string()))?;
                let ready = e
                    .subsets
                    .unwrap_or_default()
                    .iter()
                    .map(|s| s.addresses.as_ref().map(|a| a.len()).unwrap_or(0))
                    .sum();
                Ok(K8sResourceSnapshot {
                    endpoint_ready_addresses: Some(ready),
                    ..Default::default()
                })
            }
            other => Err(K8sReadError::Other(format!("unsupported kind {other}"))),
        }
    }
}

/* ============================= UDP (Source-engine A2S) ============================= */

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UdpError {
    Timeout,
    ConnectionError(String),
}

#[async_trait]
pub trait UdpTransport: Send + Sync {
    async fn query(&self, host: &str, port: u16, payload: &[u8], timeout: Duration) -> Result<Vec<u8>, UdpError>;
}

pub struct TokioUdpTransport;

#[async_trait]
impl UdpTransport for TokioUdpTransport {
    async fn query(&self, host: &str, port: u16, payload: &[u8], timeout: Duration) -> Result<Vec<u8>, UdpError> {
        use tokio::net::UdpSocket;

        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|e| UdpError::ConnectionError(e.to_string()))?;
        socket
            .connect((host, port))
            .await
            .map_err(|e| UdpError::ConnectionError(e.to_string()))?;
        socket
            .send(payload)
            .await
            .map_err(|e| UdpError::ConnectionError(e.to_string()))?;

        let mut buf = vec![0u8; 1400];
        match tokio::time::timeout(timeout, socket.recv(&mut buf)).await {
            Ok(Ok(n)) => Ok(buf[..n].to_vec()),
            Ok(Err(e)) => Err(UdpError::ConnectionError(e.to_string())),
            Err(_) => Err(UdpError::Timeout),
        }
    }
}
