//! `discover`: runs only the Service/Ingress discovery controllers
//! (spec.md §4.4), useful for validating annotation-derived Monitors without
//! starting the full operator.

use anyhow::{Context, Result};
use kube::Client;

use yuptime::config::OperatorConfig;
use yuptime::discovery;

pub async fn run(config: OperatorConfig) -> Result<()> {
    let client = Client::try_default().await.context("failed to load kubeconfig")?;
    println!("Discovery running (writeCrds={}). Press Ctrl+C to stop.", config.discovery_write_crds);

    let handles = discovery::run(client, config);
    tokio::select! {
        _ = futures::future::join_all(handles) => {}
        _ = tokio::signal::ctrl_c() => {
            println!("Shutdown signal received.");
        }
    }
    Ok(())
}
