//! Discovery controller (spec.md §4.4): watches `Service`/`Ingress`
//! cluster-wide and derives `Monitor` objects from annotated resources,
//! generalized from `src/commands/watch.rs`'s `kube_runtime::watcher::{watcher,
//! Config, Event}` usage (there applied to `Pod`).

use std::collections::BTreeMap;

use futures::StreamExt;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, ResourceExt};
use kube_runtime::watcher::{self, Event};
use tracing::{info, warn};

use crate::config::OperatorConfig;
use crate::crd::monitor::{GrpcTarget, HttpTarget, MonitorSchedule, MonitorSpec, MonitorTarget, TcpTarget};
use crate::crd::Monitor;

const ENABLED_ANNOTATION: &str = "monitoring.yuptime.io/enabled";
const CHECK_TYPE_ANNOTATION: &str = "monitoring.yuptime.io/check-type";
const HEALTH_PATH_ANNOTATION: &str = "monitoring.yuptime.io/health-path";
const INTERVAL_SECONDS_ANNOTATION: &str = "monitoring.yuptime.io/interval-seconds";
const TIMEOUT_SECONDS_ANNOTATION: &str = "monitoring.yuptime.io/timeout-seconds";
const VERIFY_TLS_ANNOTATION: &str = "monitoring.yuptime.io/verify-tls";
const PORT_ANNOTATION: &str = "monitoring.yuptime.io/port";

pub const MANAGED_BY_LABEL: &str = "monitoring.yuptime.io/managed-by";
pub const MANAGED_BY_VALUE: &str = "discovery";

const FIELD_MANAGER: &str = "yuptime-discovery";
const DEFAULT_INTERVAL_SECONDS: u32 = 60;
const DEFAULT_TIMEOUT_SECONDS: u32 = 10;
const MAX_NAME_LEN: usize = 63;

/* ============================= NAME DERIVATION ============================= */

/// Lowercases, maps every byte outside `[a-z0-9-]` to `-`, collapses runs of
/// dashes, and trims leading/trailing dashes — the usual Kubernetes-name
/// sanitization idiom (spec.md §4.4).
fn sanitize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut prev_dash = false;
    for ch in input.chars().flat_map(|c| c.to_lowercase()) {
        let mapped = if ch.is_ascii_alphanumeric() || ch == '-' { ch } else { '-' };
        if mapped == '-' {
            if !prev_dash {
                out.push('-');
            }
            prev_dash = true;
        } else {
            out.push(mapped);
            prev_dash = false;
        }
    }
    out.trim_matches('-').to_string()
}

fn truncate_name(mut name: String) -> String {
    if name.len() > MAX_NAME_LEN {
        name.truncate(MAX_NAME_LEN);
        name = name.trim_end_matches('-').to_string();
    }
    name
}

fn derive_service_monitor_name(service_name: &str) -> String {
    truncate_name(format!("auto-svc-{}", sanitize(service_name)))
}

fn derive_ingress_monitor_name(ingress_name: &str, host: &str) -> String {
    truncate_name(format!("auto-ing-{}-{}", sanitize(ingress_name), sanitize(host)))
}

/* ============================= MONITOR DERIVATION ============================= */

struct DiscoveryAnnotations<'a> {
    check_type: &'a str,
    health_path: Option<&'a str>,
    interval_seconds: u32,
    timeout_seconds: u32,
    verify_tls: bool,
    port: Option<u16>,
}

fn parse_annotations(annotations: &BTreeMap<String, String>) -> Option<DiscoveryAnnotations<'_>> {
    let enabled = annotations.get(ENABLED_ANNOTATION).map(String::as_str) == Some("true");
    if !enabled {
        return None;
    }
    Some(DiscoveryAnnotations {
        check_type: annotations.get(CHECK_TYPE_ANNOTATION).map(String::as_str).unwrap_or("http"),
        health_path: annotations.get(HEALTH_PATH_ANNOTATION).map(String::as_str),
        interval_seconds: annotations
            .get(INTERVAL_SECONDS_ANNOTATION)
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_INTERVAL_SECONDS),
        timeout_seconds: annotations
            .get(TIMEOUT_SECONDS_ANNOTATION)
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECONDS),
        verify_tls: annotations.get(VERIFY_TLS_ANNOTATION).map(String::as_str) != Some("false"),
        port: annotations.get(PORT_ANNOTATION).and_then(|v| v.parse().ok()),
    })
}

fn target_for(ann: &DiscoveryAnnotations<'_>, host: &str, port: u16, https: bool) -> MonitorTarget {
    let path = ann.health_path.unwrap_or("/").to_string();
    match ann.check_type {
        "tcp" => MonitorTarget::Tcp(TcpTarget { host: host.to_string(), port, ..Default::default() }),
        "grpc" => MonitorTarget::Grpc(GrpcTarget {
            host: host.to_string(),
            port,
            service: None,
            tls: Some(https || ann.verify_tls),
        }),
        "https" => MonitorTarget::Http(HttpTarget {
            url: format!("https://{host}:{port}{path}"),
            ..Default::default()
        }),
        _ => {
            let scheme = if https { "https" } else { "http" };
            MonitorTarget::Http(HttpTarget { url: format!("{scheme}://{host}:{port}{path}"), ..Default::default() })
        }
    }
}

fn monitor_spec(ann: &DiscoveryAnnotations<'_>, target: MonitorTarget) -> MonitorSpec {
    MonitorSpec {
        enabled: true,
        schedule: MonitorSchedule {
            interval_seconds: ann.interval_seconds,
            timeout_seconds: ann.timeout_seconds,
            jitter_percent: None,
        },
        target,
        success_criteria: None,
    }
}

fn labeled(mut monitor: Monitor, namespace: &str) -> Monitor {
    monitor.metadata.namespace = Some(namespace.to_string());
    let labels = monitor.metadata.labels.get_or_insert_with(BTreeMap::new);
    labels.insert(MANAGED_BY_LABEL.to_string(), MANAGED_BY_VALUE.to_string());
    monitor
}

/// Builds the derived Monitor for a Service carrying the enabled annotation,
/// or `None` if the Service opts out or has no ports to check.
fn build_monitor_from_service(svc: &Service) -> Option<(String, Monitor)> {
    let annotations = svc.metadata.annotations.as_ref()?;
    let ann = parse_annotations(annotations)?;
    let service_name = svc.name_any();
    let namespace = svc.namespace().unwrap_or_default();
    let host = format!("{service_name}.{namespace}.svc.cluster.local");
    let port = ann
        .port
        .or_else(|| svc.spec.as_ref()?.ports.as_ref()?.first().map(|p| p.port as u16))?;

    let name = derive_service_monitor_name(&service_name);
    let target = target_for(&ann, &host, port, ann.check_type == "https");
    let monitor = labeled(Monitor::new(&name, monitor_spec(&ann, target)), &namespace);
    Some((name, monitor))
}

/// Builds one derived Monitor per `spec.rules[*].host` (first path only),
/// or an empty vec if the Ingress opts out or declares no hosts.
fn build_monitors_from_ingress(ing: &Ingress) -> Vec<(String, Monitor)> {
    let Some(annotations) = ing.metadata.annotations.as_ref() else {
        return Vec::new();
    };
    let Some(ann) = parse_annotations(annotations) else {
        return Vec::new();
    };
    let ingress_name = ing.name_any();
    let namespace = ing.namespace().unwrap_or_default();
    let Some(spec) = ing.spec.as_ref() else {
        return Vec::new();
    };

    let tls_hosts: Vec<&str> = spec
        .tls
        .as_ref()
        .into_iter()
        .flatten()
        .filter_map(|t| t.hosts.as_ref())
        .flatten()
        .map(String::as_str)
        .collect();

    spec.rules
        .as_ref()
        .into_iter()
        .flatten()
        .filter_map(|rule| {
            let host = rule.host.as_deref()?;
            let https = tls_hosts.contains(&host);
            let port = ann.port.unwrap_or(if https { 443 } else { 80 });
            let path = rule
                .http
                .as_ref()
                .and_then(|http| http.paths.first())
                .and_then(|p| p.path.as_deref());

            let mut ann_for_rule = ann_clone(&ann);
            ann_for_rule.health_path = ann.health_path.or(path);

            let name = derive_ingress_monitor_name(&ingress_name, host);
            let target = target_for(&ann_for_rule, host, port, https);
            let monitor = labeled(Monitor::new(&name, monitor_spec(&ann_for_rule, target)), &namespace);
            Some((name, monitor))
        })
        .collect()
}

fn ann_clone<'a>(ann: &DiscoveryAnnotations<'a>) -> DiscoveryAnnotations<'a> {
    DiscoveryAnnotations {
        check_type: ann.check_type,
        health_path: ann.health_path,
        interval_seconds: ann.interval_seconds,
        timeout_seconds: ann.timeout_seconds,
        verify_tls: ann.verify_tls,
        port: ann.port,
    }
}

/* ============================= RECONCILE HOOKS ============================= */

async fn upsert(client: &Client, namespace: &str, name: &str, monitor: &Monitor, config: &OperatorConfig) {
    if !config.discovery_write_crds {
        info!(monitor = %name, namespace = %namespace, "discovery_dry_run_skip_write");
        return;
    }
    let api: Api<Monitor> = Api::namespaced(client.clone(), namespace);
    let params = PatchParams::apply(FIELD_MANAGER).force();
    if let Err(e) = api.patch(name, &params, &Patch::Apply(monitor)).await {
        warn!(monitor = %name, namespace = %namespace, error = %e, "discovery_upsert_failed");
    } else {
        info!(monitor = %name, namespace = %namespace, "discovery_monitor_upserted");
    }
}

/// Deletes the derived Monitor only if it still carries the discovery
/// `managed-by` label — guards against deleting a user-authored Monitor that
/// happens to collide with a derived name (spec.md §4.4).
async fn delete_if_owned(client: &Client, namespace: &str, name: &str, config: &OperatorConfig) {
    if !config.discovery_write_crds {
        info!(monitor = %name, namespace = %namespace, "discovery_dry_run_skip_delete");
        return;
    }
    let api: Api<Monitor> = Api::namespaced(client.clone(), namespace);
    match api.get(name).await {
        Ok(existing) => {
            let owned = existing
                .metadata
                .labels
                .as_ref()
                .and_then(|l| l.get(MANAGED_BY_LABEL))
                .map(|v| v == MANAGED_BY_VALUE)
                .unwrap_or(false);
            if !owned {
                return;
            }
            if let Err(e) = api.delete(name, &Default::default()).await {
                warn!(monitor = %name, namespace = %namespace, error = %e, "discovery_delete_failed");
            }
        }
        Err(kube::Error::Api(e)) if e.code == 404 => {}
        Err(e) => warn!(monitor = %name, namespace = %namespace, error = %e, "discovery_delete_lookup_failed"),
    }
}

/// Runs the Service watcher until its stream ends.
pub async fn run_services(client: Client, config: OperatorConfig) {
    let api: Api<Service> = Api::all(client.clone());
    let mut stream = watcher::watcher(api, watcher::Config::default()).boxed();

    while let Some(event) = stream.next().await {
        let Ok(event) = event else { continue };
        match event {
            Event::Applied(svc) => {
                let namespace = svc.namespace().unwrap_or_default();
                if let Some((name, monitor)) = build_monitor_from_service(&svc) {
                    upsert(&client, &namespace, &name, &monitor, &config).await;
                }
            }
            Event::Deleted(svc) => {
                let namespace = svc.namespace().unwrap_or_default();
                let name = derive_service_monitor_name(&svc.name_any());
                delete_if_owned(&client, &namespace, &name, &config).await;
            }
            Event::Restarted(_) => {}
        }
    }
}

/// Runs the Ingress watcher until its stream ends.
pub async fn run_ingresses(client: Client, config: OperatorConfig) {
    let api: Api<Ingress> = Api::all(client.clone());
    let mut stream = watcher::watcher(api, watcher::Config::default()).boxed();

    while let Some(event) = stream.next().await {
        let Ok(event) = event else { continue };
        match event {
            Event::Applied(ing) => {
                let namespace = ing.namespace().unwrap_or_default();
                for (name, monitor) in build_monitors_from_ingress(&ing) {
                    upsert(&client, &namespace, &name, &monitor, &config).await;
                }
            }
            Event::Deleted(ing) => {
                let namespace = ing.namespace().unwrap_or_default();
                let ingress_name = ing.name_any();
                let hosts: Vec<String> = ing
                    .spec
                    .as_ref()
                    .and_then(|s| s.rules.as_ref())
                    .into_iter()
                    .flatten()
                    .filter_map(|r| r.host.clone())
                    .collect();
                for host in hosts {
                    let name = derive_ingress_monitor_name(&ingress_name, &host);
                    delete_if_owned(&client, &namespace, &name, &config).await;
                }
            }
            Event::Restarted(_) => {}
        }
    }
}

/// Spawns both watcher tasks, returning immediately (mirrors
/// `reconcile::run_all`'s "launched, not finished" contract).
pub fn run(client: Client, config: OperatorConfig) -> Vec<tokio::task::JoinHandle<()>> {
    vec![
        tokio::spawn(run_services(client.clone(), config.clone())),
        tokio::spawn(run_ingresses(client, config)),
    ]
}
