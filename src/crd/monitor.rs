use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{Condition, SecretKeyRef};

/* ============================= SCHEDULE ============================= */

/// Minimum allowed `intervalSeconds` (spec.md §3: "intervalSeconds (≥
/// minimum allowed)"). Below this, worker-pod churn would dominate.
pub const MIN_INTERVAL_SECONDS: u32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonitorSchedule {
    pub interval_seconds: u32,
    pub timeout_seconds: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jitter_percent: Option<u32>,
}

impl MonitorSchedule {
    pub fn jitter_percent_or_default(&self) -> u32 {
        self.jitter_percent.unwrap_or(5)
    }
}

/* ============================= SUCCESS CRITERIA ============================= */

/// All fields independently optional and independently togglable — the
/// same "only what's enabled is checked" idiom as the teacher's
/// `DevOpsPolicySpec` (every field `Option<T>`, `None` means "don't check").
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SuccessCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_status_codes: Option<Vec<u16>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms_under: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_contains: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_path_exists: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_path_equals: Option<serde_json::Value>,
}

impl SuccessCriteria {
    pub fn accepted_status_codes_or_default(&self) -> Vec<u16> {
        self.accepted_status_codes.clone().unwrap_or_else(|| vec![200])
    }
}

/* ============================= TARGETS ============================= */

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct HttpHeader {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_from_secret: Option<SecretKeyRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct HttpTarget {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<HttpHeader>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_is_json: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_redirects: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct JsonQueryTarget {
    #[serde(flatten)]
    pub http: HttpTarget,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exists: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equals: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TcpTarget {
    pub host: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum DnsRecordType {
    #[default]
    A,
    Aaaa,
    Cname,
    Mx,
    Txt,
    Srv,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DnsExpected {
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DnsTarget {
    pub name: String,
    pub record_type: DnsRecordType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<DnsExpected>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PingTarget {
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packet_count: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct WebSocketTarget {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GrpcTarget {
    pub host: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TlsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_mode: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SqlTarget {
    pub host: String,
    pub port: u16,
    pub database: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_secret_ref: Option<SecretKeyRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_query: Option<String>,
}

impl SqlTarget {
    pub fn health_query_or_default(&self) -> &str {
        self.health_query.as_deref().unwrap_or("SELECT 1")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RedisTarget {
    pub host: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_secret_ref: Option<SecretKeyRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub enum K8sResourceKind {
    #[default]
    Deployment,
    StatefulSet,
    Endpoint,
    Pod,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct K8sTarget {
    pub kind: K8sResourceKind,
    pub namespace: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_ready_replicas: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SteamTarget {
    pub host: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_players: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_players: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_map: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PushTarget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grace_period_seconds: Option<u32>,
}

impl PushTarget {
    pub fn grace_period_seconds_or_default(&self) -> u32 {
        self.grace_period_seconds.unwrap_or(300)
    }
}

/// Tagged union of protocol-specific target fields, keyed by
/// `monitor.spec.type` (spec.md §3). Invariant: the discriminator and the
/// populated variant must agree, enforced at validation time in
/// `reconcile::monitor`, not here.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MonitorTarget {
    Http(HttpTarget),
    Keyword(HttpTarget),
    JsonQuery(JsonQueryTarget),
    Tcp(TcpTarget),
    Dns(DnsTarget),
    Ping(PingTarget),
    Websocket(WebSocketTarget),
    Push(PushTarget),
    Steam(SteamTarget),
    Grpc(GrpcTarget),
    Mysql(SqlTarget),
    Postgresql(SqlTarget),
    Redis(RedisTarget),
    K8s(K8sTarget),
    Docker(PushTarget),
}

impl MonitorTarget {
    /// The `monitor.spec.type` string this variant corresponds to.
    pub fn type_name(&self) -> &'static str {
        match self {
            MonitorTarget::Http(_) => "http",
            MonitorTarget::Keyword(_) => "keyword",
            MonitorTarget::JsonQuery(_) => "jsonQuery",
            MonitorTarget::Tcp(_) => "tcp",
            MonitorTarget::Dns(_) => "dns",
            MonitorTarget::Ping(_) => "ping",
            MonitorTarget::Websocket(_) => "websocket",
            MonitorTarget::Push(_) => "push",
            MonitorTarget::Steam(_) => "steam",
            MonitorTarget::Grpc(_) => "grpc",
            MonitorTarget::Mysql(_) => "mysql",
            MonitorTarget::Postgresql(_) => "postgresql",
            MonitorTarget::Redis(_) => "redis",
            MonitorTarget::K8s(_) => "k8s",
            MonitorTarget::Docker(_) => "docker",
        }
    }
}

/* ============================= SPEC ============================= */

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "monitoring.yuptime.io",
    version = "v1",
    kind = "Monitor",
    plural = "monitors",
    status = "MonitorStatus",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct MonitorSpec {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    pub schedule: MonitorSchedule,

    #[serde(flatten)]
    pub target: MonitorTarget,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_criteria: Option<SuccessCriteria>,
}

fn default_enabled() -> bool {
    true
}

/* ============================= STATUS ============================= */

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CheckState {
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LastResult {
    pub state: CheckState,
    pub reason: String,
    pub message: String,
    pub latency_ms: u64,
    pub checked_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct UptimeWindow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub one_hour: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub one_day: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seven_day: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thirty_day: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MonitorStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_result: Option<LastResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime: Option<UptimeWindow>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl MonitorStatus {
    /// Enforces spec.md §3's monotonicity invariant: `status.lastResult.checkedAt`
    /// is monotonic non-decreasing across successful writes.
    pub fn accepts_checked_at(&self, candidate: &str) -> bool {
        match &self.last_result {
            Some(prev) => candidate >= prev.checked_at.as_str(),
            None => true,
        }
    }
}
