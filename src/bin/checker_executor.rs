//! `checker-executor`: the worker-pod binary (spec.md §6 "Worker command
//! line"). One process performs exactly one check, patches
//! `status.lastResult`, and exits. Grounded on `commands/reconcile.rs`'s
//! `anyhow::Result` command-boundary idiom; the actual check dispatch reuses
//! `checkers::dispatch` verbatim so the worker and any future in-process test
//! harness share one evaluation path.

use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use kube::api::{Api, Patch, PatchParams};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use yuptime::checkers::{self, Transports};
use yuptime::crd::Monitor;

const FIELD_MANAGER: &str = "checker-executor";

#[derive(Parser)]
#[command(name = "checker-executor")]
#[command(about = "Executes a single yuptime Monitor check and patches its status")]
struct Args {
    /// Monitor to check, as `<namespace>/<name>`.
    #[arg(long)]
    monitor: String,
}

fn parse_monitor_ref(raw: &str) -> anyhow::Result<(&str, &str)> {
    raw.split_once('/')
        .ok_or_else(|| anyhow::anyhow!("--monitor must be <namespace>/<name>, got {raw:?}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))).init();

    let args = Args::parse();
    let (namespace, name) = parse_monitor_ref(&args.monitor)?;

    let client = kube::Client::try_default().await.context("failed to load kubeconfig")?;
    let api: Api<Monitor> = Api::namespaced(client.clone(), namespace);

    let monitor = match api.get(name).await {
        Ok(m) => m,
        Err(e) => {
            warn!(monitor = %name, namespace, error = %e, "checker_executor_fetch_failed");
            std::process::exit(2);
        }
    };

    let timeout = Duration::from_secs(monitor.spec.schedule.timeout_seconds as u64);
    let result = checkers::dispatch(&monitor, timeout, &Transports::production()).await;
    let checked_at = Utc::now().to_rfc3339();

    info!(monitor = %name, namespace, state = ?result.state, reason = %result.reason, latency_ms = result.latency_ms, "checker_executor_result");

    let accepts = monitor.status.as_ref().map(|s| s.accepts_checked_at(&checked_at)).unwrap_or(true);
    if accepts {
        let patch = serde_json::json!({
            "status": {
                "lastResult": {
                    "state": result.state,
                    "reason": result.reason,
                    "message": result.message,
                    "latencyMs": result.latency_ms,
                    "checkedAt": checked_at,
                }
            }
        });
        if let Err(e) = api.patch_status(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&patch)).await {
            warn!(monitor = %name, namespace, error = %e, "checker_executor_patch_failed");
            std::process::exit(2);
        }
    } else {
        warn!(monitor = %name, namespace, checked_at, "checker_executor_stale_result_dropped");
    }

    if result.is_up() { std::process::exit(0) } else { std::process::exit(1) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_namespace_and_name() {
        let (ns, name) = parse_monitor_ref("prod/api-health").unwrap();
        assert_eq!(ns, "prod");
        assert_eq!(name, "api-health");
    }

    #[test]
    fn rejects_missing_slash() {
        assert!(parse_monitor_ref("api-health").is_err());
    }
}
