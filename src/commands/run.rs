//! `run`: the long-running operator process — reconciliation controllers,
//! scheduler, stall detector, discovery, alert dispatcher, and metrics
//! server, raced against Ctrl+C. Grounded directly on
//! `commands/reconcile.rs::run`'s shutdown-broadcast shape, generalized from
//! one Controller to the full set of concurrent tasks spec.md §5 describes.

use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::join_all;
use kube::Client;
use tokio::signal;
use tokio::sync::{broadcast, Mutex};
use tracing::info;

use yuptime::alert::AlertDispatcher;
use yuptime::config::OperatorConfig;
use yuptime::metrics::{self, MetricsObserver, ServerState};
use yuptime::scheduler::{run_completion_watcher, run_stall_detector, Scheduler};
use yuptime::{discovery, reconcile};

pub async fn run() -> Result<()> {
    println!("Starting yuptime operator...\n");

    let config = OperatorConfig::from_env();
    let client = Client::try_default().await.context("failed to load kubeconfig")?;

    print!("  Cluster connection .......... ");
    match client.apiserver_version().await {
        Ok(v) => println!("OK (v{}.{})", v.major, v.minor),
        Err(e) => {
            println!("FAIL");
            anyhow::bail!("cannot reach cluster: {e}. Is the cluster running?");
        }
    }

    metrics::register_all();

    let (scheduler, scheduler_handle) = Scheduler::new(client.clone(), config.clone());

    println!("  Max concurrent checks ....... {}", config.max_concurrent_checks);
    println!("  Stall check interval ........ {}s", config.stall_check_interval.as_secs());
    println!("  Metrics server .............. http://{}", config.metrics_addr);
    println!();
    println!("  Available endpoints:");
    println!("    GET /healthz .............. Liveness probe (always 200 OK)");
    println!("    GET /readyz ............... Readiness probe (503 until ready)");
    println!("    GET /metrics .............. Prometheus metrics scrape endpoint");
    println!();
    println!("Operator running. Press Ctrl+C to stop.\n");
    println!("{}", "=".repeat(70));

    info!("operator_started");

    let server_state = Arc::new(Mutex::new(ServerState { ready: false }));
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let metrics_handle = {
        let state = server_state.clone();
        let shutdown = shutdown_tx.subscribe();
        let addr = config.metrics_addr;
        tokio::spawn(async move { metrics::run_server(state, shutdown, addr).await })
    };

    let mut tasks = Vec::new();
    tasks.push(tokio::spawn(scheduler.run()));
    tasks.push(tokio::spawn(run_stall_detector(scheduler_handle.clone(), client.clone(), config.clone())));
    tasks.push(tokio::spawn(run_completion_watcher(scheduler_handle.clone(), client.clone())));
    tasks.extend(reconcile::run_all(client.clone(), scheduler_handle.clone()).await);
    tasks.extend(discovery::run(client.clone(), config.clone()));
    tasks.push(tokio::spawn(Arc::new(AlertDispatcher::new(client.clone())).run()));
    tasks.push(tokio::spawn(Arc::new(MetricsObserver::new(client.clone())).run()));

    {
        let mut s = server_state.lock().await;
        s.ready = true;
    }

    tokio::select! {
        _ = join_all(tasks) => {
            info!("operator_task_set_ended");
            println!("\nController task set ended unexpectedly.");
        }
        _ = signal::ctrl_c() => {
            info!("shutdown_signal_received");
            println!("\n{}", "=".repeat(70));
            println!("Shutdown signal received. Stopping operator...");
            println!("{}", "=".repeat(70));
        }
    }

    let _ = shutdown_tx.send(());
    let _ = metrics_handle.await?;

    info!("operator_stopped");
    println!("Operator stopped.");

    Ok(())
}
