//! Exercises the scheduling/stall-detection path end to end without a live
//! cluster: `jitter_ms` determinism, `build_worker_pod`'s manifest shape, and
//! `pod_is_stalled`'s cutoff logic working together the way
//! `scheduler.rs`/`jobs.rs` compose them (spec.md §4.2).

use chrono::Utc;
use k8s_openapi::api::core::v1::{Pod, PodStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

use yuptime::config::OperatorConfig;
use yuptime::crd::monitor::{HttpTarget, MonitorSchedule, MonitorSpec, MonitorTarget};
use yuptime::crd::Monitor;
use yuptime::jitter::jitter_ms;
use yuptime::jobs::{build_worker_pod, pod_is_stalled, worker_pod_name};

fn http_monitor(name: &str, interval_seconds: u32, timeout_seconds: u32) -> Monitor {
    let spec = MonitorSpec {
        enabled: true,
        schedule: MonitorSchedule { interval_seconds, timeout_seconds, jitter_percent: Some(10) },
        target: MonitorTarget::Http(HttpTarget { url: "https://example.com/health".to_string(), ..Default::default() }),
        success_criteria: None,
    };
    let mut monitor = Monitor::new(name, spec);
    monitor.metadata.namespace = Some("prod".to_string());
    monitor.metadata.uid = Some("22222222-2222-2222-2222-222222222222".to_string());
    monitor
}

#[test]
fn jitter_is_stable_across_repeated_calls_and_bounded_by_interval() {
    let monitor = http_monitor("api-health", 60, 10);
    let namespace = monitor.metadata.namespace.clone().unwrap();
    let name = monitor.metadata.name.clone().unwrap();

    let first = jitter_ms(&namespace, &name, 10, 60);
    let second = jitter_ms(&namespace, &name, 10, 60);
    assert_eq!(first, second, "jitter must be restart-stable for the same monitor");
    assert!(first < 60 * 1000 / 10 + 1, "jitter must stay within the configured percentage of the interval");

    let other = jitter_ms(&namespace, "a-different-monitor", 10, 60);
    assert_ne!(first, other, "distinct monitors should not collide on jitter by construction alone in practice");
}

#[test]
fn worker_pod_carries_owner_reference_and_matches_its_deterministic_name() {
    let monitor = http_monitor("api-health", 60, 10);
    let config = OperatorConfig::default();
    let pod = build_worker_pod(&monitor, &config, 3);

    assert_eq!(pod.metadata.name.as_deref(), Some(worker_pod_name(&monitor, 3).as_str()));
    assert_eq!(pod.metadata.namespace.as_deref(), Some("prod"));

    let owners = pod.metadata.owner_references.as_ref().expect("owner reference set");
    assert_eq!(owners[0].kind, "Monitor");
    assert_eq!(owners[0].uid, "22222222-2222-2222-2222-222222222222");

    let spec = pod.spec.as_ref().expect("pod spec set");
    assert_eq!(spec.active_deadline_seconds, Some(20));
    assert_eq!(spec.containers[0].args.as_deref(), Some(["--monitor".to_string(), "prod/api-health".to_string()].as_slice()));
}

#[test]
fn stall_detector_flags_pods_older_than_the_configured_cutoff() {
    let monitor = http_monitor("api-health", 60, 10);
    let config = OperatorConfig { stall_multiplier: 2, ..OperatorConfig::default() };
    let mut pod = build_worker_pod(&monitor, &config, 1);
    pod.status = Some(PodStatus { phase: Some("Running".to_string()), ..Default::default() });
    pod.metadata.creation_timestamp = Some(Time(Utc::now() - chrono::Duration::seconds(monitor.spec.schedule.interval_seconds as i64 * config.stall_multiplier as i64 + 5)));

    let cutoff = Time(Utc::now() - chrono::Duration::seconds(monitor.spec.schedule.interval_seconds as i64 * config.stall_multiplier as i64));
    assert!(pod_is_stalled(&pod, &cutoff));

    let fresh_cutoff = Time(Utc::now() - chrono::Duration::seconds(monitor.spec.schedule.interval_seconds as i64 * config.stall_multiplier as i64 + 3600));
    assert!(!pod_is_stalled(&pod, &fresh_cutoff));
}

#[test]
fn identically_configured_monitors_in_different_namespaces_get_distinct_jitter() {
    let a = jitter_ms("team-a", "api-health", 10, 60);
    let b = jitter_ms("team-b", "api-health", 10, 60);
    assert_ne!(a, b);
}
