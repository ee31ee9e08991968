//! Alert dispatcher (spec.md §4.6): watches Monitors for `lastResult.state`
//! transitions and notifies matching `NotificationPolicy` targets. Grounded
//! directly on §4.6's data flow; reuses `checkers::transport::HttpTransport`
//! rather than a second HTTP abstraction (the provider POST is just another
//! outbound HTTP request, same shape as the checkers already send).

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, ListParams};
use kube::{Client, ResourceExt};
use kube_runtime::watcher::{self, Event};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::checkers::transport::{HttpRequest, HttpTransport, ReqwestHttpTransport};
use crate::crd::monitor::{CheckState, LastResult};
use crate::crd::{MaintenanceWindow, Monitor, NotificationPolicy, NotificationProvider, SecretKeyRef, Selector, Silence};
use crate::maintenance;
use crate::scheduler::MonitorId;

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct AlertAnnotations {
    reason: String,
    message: String,
}

#[derive(Debug, Serialize)]
struct AlertPayload {
    labels: BTreeMap<String, String>,
    status: String,
    annotations: AlertAnnotations,
    #[serde(rename = "startsAt")]
    starts_at: String,
}

fn build_payload(monitor: &Monitor, last_result: &LastResult, now: DateTime<Utc>) -> AlertPayload {
    let mut labels = monitor.metadata.labels.clone().unwrap_or_default();
    labels.insert("monitor".to_string(), monitor.name_any());
    labels.insert("namespace".to_string(), monitor.namespace().unwrap_or_default());

    AlertPayload {
        labels,
        status: if last_result.state == CheckState::Down { "firing".to_string() } else { "resolved".to_string() },
        annotations: AlertAnnotations { reason: last_result.reason.clone(), message: last_result.message.clone() },
        starts_at: now.to_rfc3339(),
    }
}

/// True if any MaintenanceWindow or Silence whose selector matches
/// `namespace`/`labels` is currently active (spec.md §4.6: "skips any whose
/// selector is currently suppressed").
async fn is_suppressed(client: &Client, namespace: &str, labels: &BTreeMap<String, String>, now: DateTime<Utc>) -> bool {
    let windows = Api::<MaintenanceWindow>::all(client.clone())
        .list(&ListParams::default())
        .await
        .map(|l| l.items)
        .unwrap_or_default();
    for window in &windows {
        if !matches_selector(&window.spec.selector, namespace, labels) {
            continue;
        }
        if maintenance::is_in_maintenance_window(&window.spec.schedule, window.spec.dtstart.as_deref(), window.spec.duration_minutes, now)
            .unwrap_or(false)
        {
            return true;
        }
    }

    let silences = Api::<Silence>::all(client.clone())
        .list(&ListParams::default())
        .await
        .map(|l| l.items)
        .unwrap_or_default();
    for silence in &silences {
        if !matches_selector(&silence.spec.selector, namespace, labels) {
            continue;
        }
        if maintenance::is_silenced(&silence.spec.starts_at, &silence.spec.ends_at, now).unwrap_or(false) {
            return true;
        }
    }

    false
}

fn matches_selector(selector: &Selector, namespace: &str, labels: &BTreeMap<String, String>) -> bool {
    selector.matches(namespace, labels)
}

async fn resolve_provider_url(client: &Client, namespace: &str, provider_name: &str) -> Option<String> {
    let providers: Api<NotificationProvider> = Api::namespaced(client.clone(), namespace);
    let provider = providers.get(provider_name).await.ok()?;
    resolve_secret_value(client, namespace, &provider.spec.url_secret_ref).await
}

async fn resolve_secret_value(client: &Client, namespace: &str, secret_ref: &SecretKeyRef) -> Option<String> {
    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let secret = secrets.get(&secret_ref.name).await.ok()?;
    let bytes = secret.data?.get(&secret_ref.key)?.0.clone();
    String::from_utf8(bytes).ok()
}

/// Watches Monitors and notifies on `lastResult.state` transitions, applying
/// per-policy suppression and rate-limiting (spec.md §4.6). No durable
/// delivery state: `last_sent`/`last_state` reset on operator restart, which
/// the spec explicitly tolerates ("no durable persistence of delivery state
/// is required by the core spec").
pub struct AlertDispatcher {
    client: Client,
    http: Box<dyn HttpTransport>,
    last_state: Mutex<HashMap<String, CheckState>>,
    last_sent: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl AlertDispatcher {
    pub fn new(client: Client) -> Self {
        Self::with_transport(client, Box::new(ReqwestHttpTransport))
    }

    pub fn with_transport(client: Client, http: Box<dyn HttpTransport>) -> Self {
        AlertDispatcher { client, http, last_state: Mutex::new(HashMap::new()), last_sent: Mutex::new(HashMap::new()) }
    }

    /// Runs the Monitor watcher until its stream ends.
    pub async fn run(self: Arc<Self>) {
        let api: Api<Monitor> = Api::all(self.client.clone());
        let mut stream = watcher::watcher(api, watcher::Config::default()).boxed();

        while let Some(event) = stream.next().await {
            let Ok(event) = event else { continue };
            if let Event::Applied(monitor) = event {
                self.clone().observe(monitor).await;
            }
        }
    }

    async fn observe(self: Arc<Self>, monitor: Monitor) {
        let Some(last_result) = monitor.status.as_ref().and_then(|s| s.last_result.clone()) else {
            return;
        };
        let id = MonitorId::of(&monitor).to_string();
        let previous = {
            let mut map = self.last_state.lock().await;
            map.insert(id, last_result.state.clone())
        };
        match previous {
            Some(prev) if prev != last_result.state => self.fire(&monitor, &last_result).await,
            Some(_) => {}
            None => {} // first observation: establishes a baseline, not a transition
        }
    }

    async fn fire(&self, monitor: &Monitor, last_result: &LastResult) {
        let namespace = monitor.namespace().unwrap_or_default();
        let labels = monitor.metadata.labels.clone().unwrap_or_default();
        let now = Utc::now();

        if is_suppressed(&self.client, &namespace, &labels, now).await {
            info!(monitor = %MonitorId::of(monitor), "alert_suppressed");
            return;
        }

        let policies = match Api::<NotificationPolicy>::all(self.client.clone()).list(&ListParams::default()).await {
            Ok(list) => list.items,
            Err(e) => {
                warn!(error = %e, "alert_policy_list_failed");
                return;
            }
        };

        for policy in &policies {
            if !matches_selector(&policy.spec.selector, &namespace, &labels) {
                continue;
            }
            self.dispatch_to_policy(policy, monitor, last_result, now).await;
        }
    }

    async fn allowed_by_rate_limit(&self, policy_key: &str, window_seconds: u32, now: DateTime<Utc>) -> bool {
        let mut map = self.last_sent.lock().await;
        if let Some(last) = map.get(policy_key) {
            if now.signed_duration_since(*last).num_seconds() < window_seconds as i64 {
                return false;
            }
        }
        map.insert(policy_key.to_string(), now);
        true
    }

    async fn dispatch_to_policy(&self, policy: &NotificationPolicy, monitor: &Monitor, last_result: &LastResult, now: DateTime<Utc>) {
        let policy_key = format!("{}/{}", policy.namespace().unwrap_or_default(), policy.name_any());

        if !self.allowed_by_rate_limit(&policy_key, policy.spec.rate_limit_seconds, now).await {
            info!(policy = %policy_key, "alert_rate_limited");
            return;
        }

        let namespace = policy.namespace().unwrap_or_default();
        let Some(url) = resolve_provider_url(&self.client, &namespace, &policy.spec.provider_ref).await else {
            warn!(policy = %policy_key, "alert_provider_url_unresolved");
            return;
        };

        let payload = build_payload(monitor, last_result, now);
        let body = serde_json::to_vec(&payload).unwrap_or_default();
        let request = HttpRequest {
            url,
            method: "POST".to_string(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: Some(body),
            follow_redirects: false,
        };

        match self.http.send(request, DELIVERY_TIMEOUT).await {
            Ok(response) => info!(policy = %policy_key, status = response.status, "alert_delivered"),
            Err(e) => warn!(policy = %policy_key, error = ?e, "alert_delivery_failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use std::time::Duration as StdDuration;

    use crate::checkers::transport::{HttpError, HttpResponse};
    use crate::crd::monitor::{HttpTarget, MonitorSchedule, MonitorSpec, MonitorTarget};

    use super::*;

    fn sample_monitor() -> Monitor {
        let spec = MonitorSpec {
            enabled: true,
            schedule: MonitorSchedule { interval_seconds: 30, timeout_seconds: 5, jitter_percent: None },
            target: MonitorTarget::Http(HttpTarget { url: "https://example.com".to_string(), ..Default::default() }),
            success_criteria: None,
        };
        let mut monitor = Monitor::new("api-health", spec);
        monitor.metadata.namespace = Some("prod".to_string());
        monitor
    }

    fn down_result() -> LastResult {
        LastResult {
            state: CheckState::Down,
            reason: "HTTP_503".to_string(),
            message: "status 503".to_string(),
            latency_ms: 42,
            checked_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn payload_marks_down_state_as_firing() {
        let monitor = sample_monitor();
        let payload = build_payload(&monitor, &down_result(), Utc::now());
        assert_eq!(payload.status, "firing");
        assert_eq!(payload.labels.get("monitor"), Some(&"api-health".to_string()));
        assert_eq!(payload.labels.get("namespace"), Some(&"prod".to_string()));
    }

    #[test]
    fn payload_marks_up_state_as_resolved() {
        let monitor = sample_monitor();
        let mut result = down_result();
        result.state = CheckState::Up;
        let payload = build_payload(&monitor, &result, Utc::now());
        assert_eq!(payload.status, "resolved");
    }

    struct MockHttp {
        response: Result<HttpResponse, HttpError>,
    }

    #[async_trait]
    impl HttpTransport for MockHttp {
        async fn send(&self, _req: HttpRequest, _timeout: StdDuration) -> Result<HttpResponse, HttpError> {
            self.response.clone()
        }
    }

    #[tokio::test]
    async fn rate_limit_drops_second_send_inside_window() {
        let dispatcher = AlertDispatcher {
            client: unreachable_client(),
            http: Box::new(MockHttp { response: Ok(HttpResponse { status: 200, headers: vec![], body: vec![] }) }),
            last_state: Mutex::new(HashMap::new()),
            last_sent: Mutex::new(HashMap::new()),
        };
        let now = Utc::now();
        assert!(dispatcher.allowed_by_rate_limit("default/pagerduty", 300, now).await);
        assert!(!dispatcher.allowed_by_rate_limit("default/pagerduty", 300, now + chrono::Duration::seconds(10)).await);
        assert!(dispatcher.allowed_by_rate_limit("default/pagerduty", 300, now + chrono::Duration::seconds(301)).await);
    }

    // Constructing a `Client` normally requires a running apiserver; the rate
    // limit test above never calls a method that touches it.
    fn unreachable_client() -> Client {
        Client::try_from(kube::Config::new("https://127.0.0.1:0".parse().unwrap())).expect("client config is well-formed")
    }
}
