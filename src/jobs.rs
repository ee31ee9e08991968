//! Worker-pod manifest construction (spec.md §4.2). Each check execution
//! runs as a short-lived Pod running the `checker-executor` binary; this
//! module builds that Pod as a typed `k8s_openapi` object rather than a
//! string template, mirroring the operator's own need to submit typed
//! objects through the `kube` client (the teacher's `enforcement.rs` patches
//! existing workloads the same way; `commands/deploy.rs`'s string templates
//! are for `kubectl apply`, not for objects the operator itself creates).

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    Container, EnvVar, Pod, PodSpec, ResourceRequirements, SecurityContext,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{OwnerReference, Time};
use kube::api::{Api, ListParams};
use kube::{Client, ResourceExt};

use crate::config::OperatorConfig;
use crate::crd::Monitor;

pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY_VALUE: &str = "yuptime-operator";
pub const MONITOR_LABEL: &str = "yuptime.io/monitor";
pub const MONITOR_UID_ANNOTATION: &str = "yuptime.io/monitor-uid";

/// A worker Pod's deterministic name: stable enough that re-queued
/// reconciles don't create duplicates within the same generation, but
/// distinct per-generation so the stall detector can tell check attempts
/// apart.
pub fn worker_pod_name(monitor: &Monitor, generation: i64) -> String {
    format!("yuptime-check-{}-{}", monitor.name_any(), generation)
}

fn owner_reference(monitor: &Monitor) -> Option<OwnerReference> {
    Some(OwnerReference {
        api_version: "monitoring.yuptime.io/v1".to_string(),
        kind: "Monitor".to_string(),
        name: monitor.name_any(),
        uid: monitor.uid()?,
        controller: Some(true),
        block_owner_deletion: Some(true),
    })
}

/// Builds the worker Pod manifest for one check execution of `monitor`.
pub fn build_worker_pod(monitor: &Monitor, config: &OperatorConfig, generation: i64) -> Pod {
    let namespace = monitor.namespace().unwrap_or_else(|| config.default_namespace.clone());
    let name = monitor.name_any();

    let mut labels = BTreeMap::new();
    labels.insert(MANAGED_BY_LABEL.to_string(), MANAGED_BY_VALUE.to_string());
    labels.insert(MONITOR_LABEL.to_string(), name.clone());

    let mut annotations = BTreeMap::new();
    if let Some(uid) = monitor.uid() {
        annotations.insert(MONITOR_UID_ANNOTATION.to_string(), uid);
    }

    let mut requests = BTreeMap::new();
    requests.insert("cpu".to_string(), Quantity("50m".to_string()));
    requests.insert("memory".to_string(), Quantity("32Mi".to_string()));
    let mut limits = BTreeMap::new();
    limits.insert("cpu".to_string(), Quantity("200m".to_string()));
    limits.insert("memory".to_string(), Quantity("64Mi".to_string()));

    Pod {
        metadata: kube::api::ObjectMeta {
            name: Some(worker_pod_name(monitor, generation)),
            namespace: Some(namespace),
            labels: Some(labels),
            annotations: Some(annotations),
            owner_references: owner_reference(monitor).map(|o| vec![o]),
            ..Default::default()
        },
        spec: Some(PodSpec {
            restart_policy: Some("Never".to_string()),
            active_deadline_seconds: Some(monitor.spec.schedule.timeout_seconds as i64 + 10),
            containers: vec![Container {
                name: "checker".to_string(),
                image: Some(config.worker_image.clone()),
                args: Some(vec![
                    "--monitor".to_string(),
                    format!("{}/{}", monitor.namespace().unwrap_or_else(|| config.default_namespace.clone()), name),
                ]),
                env: Some(vec![
                    EnvVar { name: "YUPTIME_MONITOR_NAME".to_string(), value: Some(name.clone()), ..Default::default() },
                    EnvVar {
                        name: "YUPTIME_MONITOR_NAMESPACE".to_string(),
                        value: Some(monitor.namespace().unwrap_or_else(|| config.default_namespace.clone())),
                        ..Default::default()
                    },
                ]),
                security_context: Some(SecurityContext {
                    run_as_non_root: Some(true),
                    read_only_root_filesystem: Some(true),
                    allow_privilege_escalation: Some(false),
                    ..Default::default()
                }),
                resources: Some(ResourceRequirements {
                    requests: Some(requests),
                    limits: Some(limits),
                    ..Default::default()
                }),
                ..Default::default()
            }],
            ..Default::default()
        }),
        status: None,
    }
}

/// Lists worker Pods currently tracked for `monitor_name`, used by both
/// cancellation and the stall detector's "is a pod actually running"
/// cross-check (spec.md §5: the scheduler's map is advisory, the cluster is
/// authoritative).
pub async fn list_active_pods_for_monitor(client: &Client, namespace: &str, monitor_name: &str) -> Result<Vec<Pod>, kube::Error> {
    let api: Api<Pod> = Api::namespaced(client.clone(), namespace);
    let lp = ListParams::default().labels(&format!("{MONITOR_LABEL}={monitor_name}"));
    let list = api.list(&lp).await?;
    Ok(list.items)
}

/// Deletes any pod for `monitor_name` still in `Pending` or `Running` phase —
/// used when a Monitor is disabled, deleted, or its schedule changes enough
/// to invalidate the in-flight check.
pub async fn delete_pending_pods_for_monitor(client: &Client, namespace: &str, monitor_name: &str) -> Result<(), kube::Error> {
    let api: Api<Pod> = Api::namespaced(client.clone(), namespace);
    let pods = list_active_pods_for_monitor(client, namespace, monitor_name).await?;
    for pod in pods {
        let phase = pod.status.as_ref().and_then(|s| s.phase.clone()).unwrap_or_default();
        if phase == "Pending" || phase == "Running" {
            if let Some(name) = pod.metadata.name.as_ref() {
                let _ = api.delete(name, &Default::default()).await;
            }
        }
    }
    Ok(())
}

/// True if a pod has been in a non-terminal phase for longer than
/// `stall_check_interval * stall_multiplier` since its creation timestamp
/// (spec.md §4.2's stall detector).
pub fn pod_is_stalled(pod: &Pod, creation_cutoff: &Time) -> bool {
    let phase = pod.status.as_ref().and_then(|s| s.phase.clone()).unwrap_or_default();
    if phase != "Pending" && phase != "Running" {
        return false;
    }
    pod.metadata
        .creation_timestamp
        .as_ref()
        .map(|created| created.0 < creation_cutoff.0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use k8s_openapi::api::core::v1::PodStatus;

    use crate::crd::monitor::{HttpTarget, MonitorSchedule, MonitorSpec, MonitorTarget};

    use super::*;

    fn sample_monitor() -> Monitor {
        let spec = MonitorSpec {
            enabled: true,
            schedule: MonitorSchedule { interval_seconds: 60, timeout_seconds: 10, jitter_percent: None },
            target: MonitorTarget::Http(HttpTarget { url: "https://example.com".to_string(), ..Default::default() }),
            success_criteria: None,
        };
        let mut monitor = Monitor::new("api-health", spec);
        monitor.metadata.namespace = Some("default".to_string());
        monitor.metadata.uid = Some("11111111-1111-1111-1111-111111111111".to_string());
        monitor
    }

    #[test]
    fn worker_pod_name_is_deterministic_per_generation() {
        let monitor = sample_monitor();
        assert_eq!(worker_pod_name(&monitor, 1), "yuptime-check-api-health-1");
        assert_eq!(worker_pod_name(&monitor, 1), worker_pod_name(&monitor, 1));
        assert_ne!(worker_pod_name(&monitor, 1), worker_pod_name(&monitor, 2));
    }

    #[test]
    fn build_worker_pod_sets_owner_reference_and_labels() {
        let monitor = sample_monitor();
        let config = OperatorConfig::default();
        let pod = build_worker_pod(&monitor, &config, 1);

        let owners = pod.metadata.owner_references.unwrap();
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].kind, "Monitor");
        assert_eq!(owners[0].name, "api-health");

        let labels = pod.metadata.labels.unwrap();
        assert_eq!(labels.get(MONITOR_LABEL), Some(&"api-health".to_string()));

        let spec = pod.spec.unwrap();
        assert_eq!(spec.restart_policy.as_deref(), Some("Never"));
        assert_eq!(spec.containers[0].image.as_deref(), Some(config.worker_image.as_str()));
    }

    #[test]
    fn build_worker_pod_sets_non_root_security_context() {
        let monitor = sample_monitor();
        let config = OperatorConfig::default();
        let pod = build_worker_pod(&monitor, &config, 1);
        let container = &pod.spec.unwrap().containers[0];
        let sc = container.security_context.as_ref().unwrap();
        assert_eq!(sc.run_as_non_root, Some(true));
        assert_eq!(sc.allow_privilege_escalation, Some(false));
    }

    #[test]
    fn pod_is_stalled_when_older_than_cutoff() {
        let mut pod = Pod::default();
        pod.status = Some(PodStatus { phase: Some("Running".to_string()), ..Default::default() });
        pod.metadata.creation_timestamp = Some(Time(Utc::now() - chrono::Duration::minutes(10)));
        let cutoff = Time(Utc::now() - chrono::Duration::minutes(5));
        assert!(pod_is_stalled(&pod, &cutoff));
    }

    #[test]
    fn pod_is_not_stalled_when_terminal() {
        let mut pod = Pod::default();
        pod.status = Some(PodStatus { phase: Some("Succeeded".to_string()), ..Default::default() });
        pod.metadata.creation_timestamp = Some(Time(Utc::now() - chrono::Duration::minutes(10)));
        let cutoff = Time(Utc::now() - chrono::Duration::minutes(5));
        assert!(!pod_is_stalled(&pod, &cutoff));
    }
}
