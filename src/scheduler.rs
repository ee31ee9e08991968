//! Job manager / check scheduler (spec.md §4.2, §5, §9). Owns the
//! `schedulingLocks` model: a single task holds a `HashMap<MonitorId,
//! JoinHandle<()>>` of pending launch timers behind an `mpsc` command
//! channel, so no other task ever touches the map directly. Concurrency is
//! bounded by a `tokio::sync::Semaphore`; a completion always reschedules
//! from the completion time, never the originally-scheduled time, so check
//! latency never accumulates drift. A 30s stall detector and a Pod-watching
//! completion observer run as independent tasks that only ever speak to the
//! scheduler through the channel (spec.md §5: "the operator treats its
//! in-memory map as advisory").

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams};
use kube::{Client, ResourceExt};
use kube_runtime::watcher::{self, Event};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::OperatorConfig;
use crate::crd::Monitor;
use crate::jitter;
use crate::jobs;

/// Identifies a Monitor independent of its spec, the key of the
/// `schedulingLocks` map (spec.md §9).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MonitorId {
    pub namespace: String,
    pub name: String,
}

impl MonitorId {
    pub fn of(monitor: &Monitor) -> Self {
        MonitorId {
            namespace: monitor.namespace().unwrap_or_default(),
            name: monitor.name_any(),
        }
    }
}

impl fmt::Display for MonitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Commands accepted by the scheduler task (spec.md §9's re-expression of
/// the global `schedulingLocks` map as a channel-owned struct).
pub enum ScheduleCommand {
    /// Launch a check for `monitor` as soon as the concurrency cap and
    /// jitter offset allow. Sent on Monitor ADDED/MODIFIED and by the stall
    /// detector.
    Launch { monitor: Box<Monitor> },
    /// Cancel any pending timer and delete not-yet-terminal worker pods.
    /// Sent on Monitor DELETED or when a Monitor transitions to disabled.
    Cancel { id: MonitorId },
    /// A worker pod for `id` reached a terminal phase. Frees one unit of
    /// concurrency and reschedules the next launch at `now + interval`.
    Completed { monitor: Box<Monitor> },
}

/// Cheaply cloneable handle for sending commands into the scheduler.
/// Reconcilers, the discovery controller, and the stall/completion tasks
/// all hold one of these rather than touching scheduler state directly.
#[derive(Clone)]
pub struct SchedulerHandle {
    tx: mpsc::Sender<ScheduleCommand>,
}

impl SchedulerHandle {
    pub async fn launch(&self, monitor: Monitor) {
        let id = MonitorId::of(&monitor);
        if self
            .tx
            .send(ScheduleCommand::Launch { monitor: Box::new(monitor) })
            .await
            .is_err()
        {
            warn!(monitor = %id, "scheduler_channel_closed");
        }
    }

    pub async fn cancel(&self, id: MonitorId) {
        let shown = id.to_string();
        if self.tx.send(ScheduleCommand::Cancel { id }).await.is_err() {
            warn!(monitor = %shown, "scheduler_channel_closed");
        }
    }

    pub async fn completed(&self, monitor: Monitor) {
        let id = MonitorId::of(&monitor);
        if self
            .tx
            .send(ScheduleCommand::Completed { monitor: Box::new(monitor) })
            .await
            .is_err()
        {
            warn!(monitor = %id, "scheduler_channel_closed");
        }
    }
}

pub struct Scheduler {
    client: Client,
    config: OperatorConfig,
    rx: mpsc::Receiver<ScheduleCommand>,
    timers: HashMap<MonitorId, JoinHandle<()>>,
    semaphore: Arc<Semaphore>,
}

impl Scheduler {
    pub fn new(client: Client, config: OperatorConfig) -> (Self, SchedulerHandle) {
        let (tx, rx) = mpsc::channel(1024);
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_checks));
        let scheduler = Scheduler {
            client,
            config,
            rx,
            timers: HashMap::new(),
            semaphore,
        };
        (scheduler, SchedulerHandle { tx })
    }

    /// True iff a timer for `id` is scheduled and has not yet fired. A
    /// stale, already-finished `JoinHandle` left over from a prior launch
    /// does not count — `JoinHandle::is_finished` is what lets `Completed`
    /// and `Launch` tell "still waiting" apart from "already fired, map
    /// entry just hasn't been overwritten yet" (spec.md §4.2: "at most one
    /// pending timer per Monitor").
    fn has_pending_timer(&self, id: &MonitorId) -> bool {
        self.timers.get(id).is_some_and(|h| !h.is_finished())
    }

    async fn handle_launch(&mut self, monitor: Monitor) {
        let id = MonitorId::of(&monitor);
        if self.has_pending_timer(&id) {
            return;
        }
        match jobs::list_active_pods_for_monitor(&self.client, &id.namespace, &id.name).await {
            Ok(pods) if pods.iter().any(is_non_terminal) => {
                // A check is already running; its completion will reschedule.
                return;
            }
            Err(e) => {
                warn!(monitor = %id, error = %e, "scheduler_list_pods_failed");
                return;
            }
            Ok(_) => {}
        }

        let delay_ms = jitter::jitter_ms(
            &id.namespace,
            &id.name,
            monitor.spec.schedule.jitter_percent_or_default(),
            monitor.spec.schedule.interval_seconds,
        );
        self.schedule_delayed_launch(id, monitor, Duration::from_millis(delay_ms));
    }

    async fn handle_completed(&mut self, monitor: Monitor) {
        let id = MonitorId::of(&monitor);
        self.semaphore.add_permits(1);

        if self.has_pending_timer(&id) {
            // A reschedule is already in flight (duplicate completion event).
            return;
        }
        let delay = Duration::from_secs(monitor.spec.schedule.interval_seconds as u64);
        self.schedule_delayed_launch(id, monitor, delay);
    }

    async fn handle_cancel(&mut self, id: MonitorId) {
        if let Some(handle) = self.timers.remove(&id) {
            handle.abort();
        }
        if let Err(e) =
            jobs::delete_pending_pods_for_monitor(&self.client, &id.namespace, &id.name).await
        {
            warn!(monitor = %id, error = %e, "scheduler_cancel_delete_failed");
        }
    }

    /// Spawns the sleep-then-launch task and records its handle. Overwrites
    /// (and thereby drops) any stale finished handle already in the map.
    fn schedule_delayed_launch(&mut self, id: MonitorId, monitor: Monitor, delay: Duration) {
        let client = self.client.clone();
        let config = self.config.clone();
        let semaphore = self.semaphore.clone();
        let log_id = id.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let permit = match semaphore.clone().acquire_owned().await {
                Ok(p) => p,
                Err(_) => return, // semaphore closed: scheduler is shutting down
            };

            match launch_worker_pod(&client, &config, &monitor).await {
                Ok(()) => {
                    // Held until the completion watcher observes the terminal
                    // phase and sends ScheduleCommand::Completed.
                    permit.forget();
                    info!(monitor = %log_id, "worker_pod_launched");
                }
                Err(e) => {
                    warn!(monitor = %log_id, error = %e, "worker_pod_launch_failed");
                }
            }
        });

        self.timers.insert(id, handle);
    }

    /// Drives the command loop until every `SchedulerHandle` is dropped.
    pub async fn run(mut self) {
        info!("scheduler_started");
        while let Some(cmd) = self.rx.recv().await {
            match cmd {
                ScheduleCommand::Launch { monitor } => self.handle_launch(*monitor).await,
                ScheduleCommand::Cancel { id } => self.handle_cancel(id).await,
                ScheduleCommand::Completed { monitor } => self.handle_completed(*monitor).await,
            }
        }
        info!("scheduler_stopped");
    }
}

fn is_non_terminal(pod: &Pod) -> bool {
    let phase = pod
        .status
        .as_ref()
        .and_then(|s| s.phase.clone())
        .unwrap_or_default();
    phase != "Succeeded" && phase != "Failed"
}

async fn launch_worker_pod(
    client: &Client,
    config: &OperatorConfig,
    monitor: &Monitor,
) -> kube::Result<()> {
    let namespace = monitor
        .namespace()
        .unwrap_or_else(|| config.default_namespace.clone());
    let generation = monitor.metadata.generation.unwrap_or(0);
    let pod = jobs::build_worker_pod(monitor, config, generation);

    let api: Api<Pod> = Api::namespaced(client.clone(), &namespace);
    api.create(&Default::default(), &pod).await?;
    Ok(())
}

/// Background task (spec.md §4.2 "Stall detector"): every `stall_check_interval`,
/// list enabled Monitors cluster-wide and launch any whose last check is
/// older than `stall_multiplier * intervalSeconds`, or that have never
/// checked at all. This is the sole recovery path for missed completion
/// events (e.g. a watch connection dropping mid-termination).
pub async fn run_stall_detector(handle: SchedulerHandle, client: Client, config: OperatorConfig) {
    let monitors: Api<Monitor> = Api::all(client.clone());
    let mut ticker = tokio::time::interval(config.stall_check_interval);

    loop {
        ticker.tick().await;

        let list = match monitors.list(&ListParams::default()).await {
            Ok(l) => l,
            Err(e) => {
                warn!(error = %e, "stall_detector_list_failed");
                continue;
            }
        };

        for monitor in list.items {
            if !monitor.spec.enabled {
                continue;
            }
            if !is_stalled(&monitor, config.stall_multiplier) {
                continue;
            }
            let id = MonitorId::of(&monitor);
            match jobs::list_active_pods_for_monitor(&client, &id.namespace, &id.name).await {
                Ok(pods) if pods.iter().any(is_non_terminal) => continue,
                Err(e) => {
                    warn!(monitor = %id, error = %e, "stall_detector_list_pods_failed");
                    continue;
                }
                Ok(_) => {}
            }
            info!(monitor = %id, "stall_detected_relaunching");
            handle.launch(monitor).await;
        }
    }
}

fn is_stalled(monitor: &Monitor, stall_multiplier: u32) -> bool {
    let Some(status) = monitor.status.as_ref() else {
        return true;
    };
    let Some(last_result) = status.last_result.as_ref() else {
        return true;
    };
    let Ok(checked_at) = chrono::DateTime::parse_from_rfc3339(&last_result.checked_at) else {
        return true;
    };
    let elapsed = chrono::Utc::now().signed_duration_since(checked_at.with_timezone(&chrono::Utc));
    let threshold = monitor.spec.schedule.interval_seconds as i64 * stall_multiplier as i64;
    elapsed.num_seconds() > threshold
}

/// Background task: watches worker Pods cluster-wide and, for each that
/// reaches a terminal phase, resolves its owning Monitor and sends
/// `ScheduleCommand::Completed`. This is the completion side of §4.2/§4.3's
/// "worker pod → completion watcher observes pod → ... schedules next
/// execution" data flow. Completed pods are swept up an hour after they
/// terminate (spec.md §4.2's "cleanup after 1 hour").
pub async fn run_completion_watcher(handle: SchedulerHandle, client: Client) {
    let pods: Api<Pod> = Api::all(client.clone());
    let watch_config = watcher::Config::default().labels(&format!(
        "{}={}",
        jobs::MANAGED_BY_LABEL,
        jobs::MANAGED_BY_VALUE
    ));
    let mut stream = watcher::watcher(pods, watch_config).boxed();

    while let Some(event) = stream.next().await {
        let Ok(event) = event else {
            continue;
        };
        let Event::Applied(pod) = event else {
            continue;
        };
        if is_non_terminal(&pod) {
            continue;
        }
        let Some(monitor_name) = pod
            .metadata
            .labels
            .as_ref()
            .and_then(|l| l.get(jobs::MONITOR_LABEL))
        else {
            continue;
        };
        let namespace = pod.metadata.namespace.clone().unwrap_or_default();

        let monitors: Api<Monitor> = Api::namespaced(client.clone(), &namespace);
        match monitors.get(monitor_name).await {
            Ok(monitor) => handle.completed(monitor).await,
            Err(e) => {
                warn!(monitor = %monitor_name, namespace = %namespace, error = %e, "completion_watcher_monitor_fetch_failed");
            }
        }

        schedule_pod_cleanup(client.clone(), namespace, pod.name_any());
    }
}

fn schedule_pod_cleanup(client: Client, namespace: String, pod_name: String) {
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        let api: Api<Pod> = Api::namespaced(client, &namespace);
        if let Err(e) = api.delete(&pod_name, &Default::default()).await {
            warn!(pod = %pod_name, namespace = %namespace, error = %e, "worker_pod_cleanup_failed");
        }
    });
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::core::v1::PodStatus;

    use crate::crd::monitor::{CheckState, HttpTarget, LastResult, MonitorSchedule, MonitorSpec, MonitorStatus, MonitorTarget};

    use super::*;

    fn sample_monitor(interval_seconds: u32) -> Monitor {
        let spec = MonitorSpec {
            enabled: true,
            schedule: MonitorSchedule { interval_seconds, timeout_seconds: 10, jitter_percent: None },
            target: MonitorTarget::Http(HttpTarget { url: "https://example.com".to_string(), ..Default::default() }),
            success_criteria: None,
        };
        let mut monitor = Monitor::new("api-health", spec);
        monitor.metadata.namespace = Some("default".to_string());
        monitor
    }

    #[test]
    fn monitor_id_formats_as_namespace_slash_name() {
        let id = MonitorId { namespace: "default".to_string(), name: "api-health".to_string() };
        assert_eq!(id.to_string(), "default/api-health");
    }

    #[test]
    fn is_non_terminal_true_for_running_and_pending() {
        let mut pod = Pod::default();
        pod.status = Some(PodStatus { phase: Some("Running".to_string()), ..Default::default() });
        assert!(is_non_terminal(&pod));

        pod.status = Some(PodStatus { phase: Some("Pending".to_string()), ..Default::default() });
        assert!(is_non_terminal(&pod));
    }

    #[test]
    fn is_non_terminal_false_for_succeeded_and_failed() {
        let mut pod = Pod::default();
        pod.status = Some(PodStatus { phase: Some("Succeeded".to_string()), ..Default::default() });
        assert!(!is_non_terminal(&pod));

        pod.status = Some(PodStatus { phase: Some("Failed".to_string()), ..Default::default() });
        assert!(!is_non_terminal(&pod));
    }

    #[test]
    fn never_checked_monitor_is_stalled() {
        let monitor = sample_monitor(30);
        assert!(is_stalled(&monitor, 2));
    }

    #[test]
    fn recently_checked_monitor_is_not_stalled() {
        let mut monitor = sample_monitor(30);
        monitor.status = Some(MonitorStatus {
            last_result: Some(LastResult {
                state: CheckState::Up,
                reason: "HTTP_OK".to_string(),
                message: String::new(),
                latency_ms: 5,
                checked_at: chrono::Utc::now().to_rfc3339(),
            }),
            ..Default::default()
        });
        assert!(!is_stalled(&monitor, 2));
    }

    #[test]
    fn long_overdue_monitor_is_stalled() {
        let mut monitor = sample_monitor(30);
        monitor.status = Some(MonitorStatus {
            last_result: Some(LastResult {
                state: CheckState::Up,
                reason: "HTTP_OK".to_string(),
                message: String::new(),
                latency_ms: 5,
                checked_at: (chrono::Utc::now() - chrono::Duration::seconds(120)).to_rfc3339(),
            }),
            ..Default::default()
        });
        assert!(is_stalled(&monitor, 2));
    }

    #[tokio::test]
    async fn handle_never_sends_after_scheduler_dropped() {
        // Dropping the receiver side should make sends fail gracefully rather
        // than panic — callers only log a warning.
        let (tx, rx) = mpsc::channel::<ScheduleCommand>(1);
        drop(rx);
        let handle = SchedulerHandle { tx };
        handle.launch(sample_monitor(60)).await;
    }
}
