//! Metrics exposition (spec.md §6). Grounded on
//! `src/commands/reconcile.rs`'s `LazyLock<Registry>` + `start_metrics_server`
//! pattern, retargeted at the six series spec.md §6 names. Watches Monitor
//! the same way `alert.rs`'s `AlertDispatcher` does, so both subscribe to the
//! same `kube_runtime::watcher` stream shape independently.

use std::net::SocketAddr;
use std::sync::{Arc, LazyLock};

use axum::Router;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use futures::StreamExt;
use kube::Client;
use kube::api::Api;
use kube_runtime::watcher::{self, Event};
use prometheus::{Encoder, GaugeVec, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use tokio::sync::{Mutex, broadcast};
use tracing::info;

use crate::crd::monitor::{CheckState, MonitorTarget};
use crate::crd::Monitor;
use crate::scheduler::MonitorId;

static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static MONITOR_STATE: LazyLock<GaugeVec> = LazyLock::new(|| {
    let g = GaugeVec::new(
        Opts::new("yuptime_monitor_state", "Monitor state: 1=up, 0=down, 0.5=unknown"),
        &["monitor", "namespace", "type", "url"],
    )
    .expect("metric definition is valid");
    REGISTRY.register(Box::new(g.clone())).expect("metric not yet registered");
    g
});

static MONITOR_LATENCY_MS: LazyLock<GaugeVec> = LazyLock::new(|| {
    let g = GaugeVec::new(Opts::new("yuptime_monitor_latency_ms", "Latency of the last check in milliseconds"), &["monitor", "namespace"])
        .expect("metric definition is valid");
    REGISTRY.register(Box::new(g.clone())).expect("metric not yet registered");
    g
});

static MONITOR_CHECKS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    let c = IntCounterVec::new(Opts::new("yuptime_monitor_checks_total", "Total checks observed per monitor"), &["monitor", "namespace"])
        .expect("metric definition is valid");
    REGISTRY.register(Box::new(c.clone())).expect("metric not yet registered");
    c
});

static MONITOR_STATE_CHANGES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    let c = IntCounterVec::new(
        Opts::new("yuptime_monitor_state_changes_total", "Total up/down transitions per monitor"),
        &["monitor", "namespace"],
    )
    .expect("metric definition is valid");
    REGISTRY.register(Box::new(c.clone())).expect("metric not yet registered");
    c
});

static ACTIVE_INCIDENTS: LazyLock<IntGauge> = LazyLock::new(|| {
    let g = IntGauge::new("yuptime_active_incidents", "Count of monitors currently in state=down").expect("metric definition is valid");
    REGISTRY.register(Box::new(g.clone())).expect("metric not yet registered");
    g
});

static MONITOR_CHECK_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let h = HistogramVec::new(
        prometheus::HistogramOpts::new("yuptime_monitor_check_duration_seconds", "Observed check duration in seconds"),
        &["monitor", "namespace"],
    )
    .expect("metric definition is valid");
    REGISTRY.register(Box::new(h.clone())).expect("metric not yet registered");
    h
});

/// Force-initializes every series so they appear on `/metrics` even before
/// the first Monitor event, same idiom as `commands/reconcile.rs::run`.
pub fn register_all() {
    LazyLock::force(&MONITOR_STATE);
    LazyLock::force(&MONITOR_LATENCY_MS);
    LazyLock::force(&MONITOR_CHECKS_TOTAL);
    LazyLock::force(&MONITOR_STATE_CHANGES_TOTAL);
    LazyLock::force(&ACTIVE_INCIDENTS);
    LazyLock::force(&MONITOR_CHECK_DURATION_SECONDS);
}

fn target_type_and_url(target: &MonitorTarget) -> (&'static str, String) {
    let url = match target {
        MonitorTarget::Http(t) | MonitorTarget::Keyword(t) => t.url.clone(),
        MonitorTarget::JsonQuery(t) => t.http.url.clone(),
        MonitorTarget::Tcp(t) => format!("{}:{}", t.host, t.port),
        MonitorTarget::Dns(t) => t.name.clone(),
        MonitorTarget::Ping(t) => t.host.clone(),
        MonitorTarget::Websocket(t) => t.url.clone(),
        MonitorTarget::Grpc(t) => format!("{}:{}", t.host, t.port),
        MonitorTarget::Mysql(t) | MonitorTarget::Postgresql(t) => format!("{}:{}/{}", t.host, t.port, t.database),
        MonitorTarget::Redis(t) => format!("{}:{}", t.host, t.port),
        MonitorTarget::Steam(t) => format!("{}:{}", t.host, t.port),
        MonitorTarget::K8s(t) => format!("{}/{}", t.namespace, t.name),
        MonitorTarget::Push(_) | MonitorTarget::Docker(_) => String::new(),
    };
    (target.type_name(), url)
}

fn state_value(state: &CheckState) -> f64 {
    match state {
        CheckState::Up => 1.0,
        CheckState::Down => 0.0,
    }
}

/// Watches Monitor and updates the six series on every observed
/// `status.lastResult` write, clearing label series on deletion.
pub struct MetricsObserver {
    client: Client,
}

impl MetricsObserver {
    pub fn new(client: Client) -> Self {
        MetricsObserver { client }
    }

    pub async fn run(self: Arc<Self>) {
        let api: Api<Monitor> = Api::all(self.client.clone());
        let mut stream = watcher::watcher(api, watcher::Config::default()).boxed();

        while let Some(event) = stream.next().await {
            match event {
                Ok(Event::Applied(monitor)) => self.observe(&monitor),
                Ok(Event::Deleted(monitor)) => self.clear(&monitor),
                Ok(Event::Restarted(monitors)) => {
                    for monitor in &monitors {
                        self.observe(monitor);
                    }
                }
                Err(_) => continue,
            }
        }
    }

    fn observe(&self, monitor: &Monitor) {
        let Some(last_result) = monitor.status.as_ref().and_then(|s| s.last_result.clone()) else {
            return;
        };
        let MonitorId { namespace, name } = MonitorId::of(monitor);
        let (type_name, url) = target_type_and_url(&monitor.spec.target);

        let was_down = MONITOR_STATE.with_label_values(&[&name, &namespace, type_name, &url]).get() == 0.0;
        MONITOR_STATE.with_label_values(&[&name, &namespace, type_name, &url]).set(state_value(&last_result.state));
        MONITOR_LATENCY_MS.with_label_values(&[&name, &namespace]).set(last_result.latency_ms as f64);
        MONITOR_CHECKS_TOTAL.with_label_values(&[&name, &namespace]).inc();
        MONITOR_CHECK_DURATION_SECONDS
            .with_label_values(&[&name, &namespace])
            .observe(last_result.latency_ms as f64 / 1000.0);

        let now_down = last_result.state == CheckState::Down;
        if was_down != now_down {
            MONITOR_STATE_CHANGES_TOTAL.with_label_values(&[&name, &namespace]).inc();
            if now_down {
                ACTIVE_INCIDENTS.inc();
            } else {
                ACTIVE_INCIDENTS.dec();
            }
        }
    }

    fn clear(&self, monitor: &Monitor) {
        let MonitorId { namespace, name } = MonitorId::of(monitor);
        let (type_name, url) = target_type_and_url(&monitor.spec.target);

        let was_down = MONITOR_STATE.with_label_values(&[&name, &namespace, type_name, &url]).get() == 0.0;
        if was_down {
            ACTIVE_INCIDENTS.dec();
        }
        let _ = MONITOR_STATE.remove_label_values(&[&name, &namespace, type_name, &url]);
        let _ = MONITOR_LATENCY_MS.remove_label_values(&[&name, &namespace]);
        let _ = MONITOR_CHECKS_TOTAL.remove_label_values(&[&name, &namespace]);
        let _ = MONITOR_STATE_CHANGES_TOTAL.remove_label_values(&[&name, &namespace]);
        let _ = MONITOR_CHECK_DURATION_SECONDS.remove_label_values(&[&name, &namespace]);
    }
}

/// Liveness/readiness state shared with the metrics HTTP server.
pub struct ServerState {
    pub ready: bool,
}

pub fn build_router(state: Arc<Mutex<ServerState>>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(|| async { (StatusCode::OK, "OK") }))
        .route("/readyz", get({ let state = state.clone(); move || ready_handler(state.clone()) }))
}

pub async fn run_server(state: Arc<Mutex<ServerState>>, mut shutdown: broadcast::Receiver<()>, addr: SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "metrics_server_started");
    axum::serve(listener, app).with_graceful_shutdown(async move { let _ = shutdown.recv().await; }).await?;
    Ok(())
}

async fn ready_handler(state: Arc<Mutex<ServerState>>) -> impl IntoResponse {
    let state = state.lock().await;
    if state.ready { (StatusCode::OK, "READY") } else { (StatusCode::SERVICE_UNAVAILABLE, "NOT READY") }
}

async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let families = REGISTRY.gather();
    let mut buffer = Vec::new();
    match encoder.encode(&families, &mut buffer) {
        Ok(()) => (StatusCode::OK, String::from_utf8_lossy(&buffer).into_owned()),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding error".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;

    fn state(ready: bool) -> Arc<Mutex<ServerState>> {
        Arc::new(Mutex::new(ServerState { ready }))
    }

    #[tokio::test]
    async fn healthz_always_ok() {
        let app = build_router(state(false));
        let req = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn readyz_reflects_state() {
        let app = build_router(state(false));
        let req = Request::builder().uri("/readyz").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn metrics_route_serves_prometheus_text() {
        register_all();
        let app = build_router(state(true));
        let req = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("yuptime_monitor_state"));
    }

    #[test]
    fn state_value_maps_up_and_down() {
        assert_eq!(state_value(&CheckState::Up), 1.0);
        assert_eq!(state_value(&CheckState::Down), 0.0);
    }
}
