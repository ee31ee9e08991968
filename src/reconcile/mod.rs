//! Reconciliation pipeline (spec.md §4.1): one `Reconcilable` impl per kind,
//! driven by the shared `pipeline::run_pipeline` Controller loop.

pub mod maintenance_window;
pub mod monitor;
pub mod notification;
pub mod pipeline;
pub mod silence;
pub mod status_page;

use kube::Client;

use crate::scheduler::SchedulerHandle;

/// Spawns all six kind controllers, returning once every one of them has
/// been launched (not once they finish — each runs until its watch stream
/// ends, which `main.rs` races against the shutdown signal the same way
/// `commands/reconcile.rs::run` races its single controller against Ctrl+C).
pub async fn run_all(client: Client, scheduler: SchedulerHandle) -> Vec<tokio::task::JoinHandle<()>> {
    vec![
        tokio::spawn(monitor::run(client.clone(), scheduler.clone())),
        tokio::spawn(maintenance_window::run(client.clone(), scheduler.clone())),
        tokio::spawn(silence::run(client.clone(), scheduler.clone())),
        tokio::spawn(notification::run_provider(client.clone(), scheduler.clone())),
        tokio::spawn(notification::run_policy(client.clone(), scheduler.clone())),
        tokio::spawn(status_page::run(client, scheduler)),
    ]
}
