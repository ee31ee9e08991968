//! `check --monitor <ns>/<name>`: runs one check against an existing Monitor
//! and prints the result, without touching its status — a diagnostic
//! complement to the `checker-executor` worker binary.

use std::time::Duration;

use anyhow::{Context, Result};
use kube::Api;

use yuptime::checkers::{self, Transports};
use yuptime::crd::Monitor;

pub async fn run(monitor_ref: &str) -> Result<()> {
    let (namespace, name) = monitor_ref
        .split_once('/')
        .context("--monitor must be <namespace>/<name>")?;

    let client = kube::Client::try_default().await.context("failed to load kubeconfig")?;
    let api: Api<Monitor> = Api::namespaced(client, namespace);
    let monitor = api.get(name).await.context("failed to fetch Monitor")?;

    let timeout = Duration::from_secs(monitor.spec.schedule.timeout_seconds as u64);
    let result = checkers::dispatch(&monitor, timeout, &Transports::production()).await;

    println!("state:   {:?}", result.state);
    println!("reason:  {}", result.reason);
    println!("message: {}", result.message);
    println!("latency: {}ms", result.latency_ms);

    Ok(())
}
