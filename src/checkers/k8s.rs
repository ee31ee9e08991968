//! Kubernetes resource-read checker (spec.md §4.3): reads a Deployment,
//! StatefulSet, Pod, or Endpoints object and evaluates readiness in-process,
//! without leaving the cluster.

use crate::crd::monitor::{K8sResourceKind, K8sTarget};

use super::transport::{K8sReadError, K8sReadTransport, K8sResourceSnapshot};
use super::{CheckResult, Stopwatch};

fn kind_str(kind: &K8sResourceKind) -> &'static str {
    match kind {
        K8sResourceKind::Deployment => "Deployment",
        K8sResourceKind::StatefulSet => "StatefulSet",
        K8sResourceKind::Endpoint => "Endpoint",
        K8sResourceKind::Pod => "Pod",
    }
}

fn evaluate(target: &K8sTarget, snapshot: &K8sResourceSnapshot) -> (bool, String) {
    match target.kind {
        K8sResourceKind::Deployment | K8sResourceKind::StatefulSet => {
            let ready = snapshot.ready_replicas.unwrap_or(0);
            let desired = snapshot.desired_replicas.unwrap_or(1);
            let min_ready = target.min_ready_replicas.map(|r| r as i32).unwrap_or(desired);
            (ready >= min_ready, format!("{ready}/{desired} replicas ready"))
        }
        K8sResourceKind::Pod => {
            let phase = snapshot.pod_phase.clone().unwrap_or_default();
            let containers_ready = snapshot.pod_containers_ready.unwrap_or(false);
            (phase == "Running" && containers_ready, format!("phase={phase} containersReady={containers_ready}"))
        }
        K8sResourceKind::Endpoint => {
            let ready = snapshot.endpoint_ready_addresses.unwrap_or(0);
            let min_ready = target.min_ready_replicas.unwrap_or(1) as usize;
            (ready >= min_ready, format!("{ready} ready address(es)"))
        }
    }
}

pub async fn check(target: &K8sTarget, transport: &dyn K8sReadTransport, sw: &Stopwatch) -> CheckResult {
    let result = transport.read(kind_str(&target.kind), &target.namespace, &target.name).await;
    let latency_ms = sw.elapsed_ms();

    let snapshot = match result {
        Ok(s) => s,
        Err(K8sReadError::NotFound) => {
            return CheckResult::down(
                "K8S_RESOURCE_NOT_FOUND",
                format!("{}/{} not found", target.namespace, target.name),
                latency_ms,
            );
        }
        Err(K8sReadError::Other(msg)) => return CheckResult::down("K8S_API_ERROR", msg, latency_ms),
    };

    let (ready, message) = evaluate(target, &snapshot);
    if ready {
        CheckResult::up("K8S_READY", message, latency_ms)
    } else {
        CheckResult::down("K8S_NOT_READY", message, latency_ms)
    }
}
