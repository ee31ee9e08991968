use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "yuptime-operator")]
#[command(about = "Kubernetes-native uptime monitoring operator")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Display application version
    Version,

    /// Run the operator: reconciliation controllers, scheduler, discovery,
    /// alert dispatcher, and metrics server until Ctrl+C
    Run,

    /// Run one ad-hoc check against a Monitor already in the cluster and
    /// print the result, without patching its status
    Check {
        /// Monitor to check, as `<namespace>/<name>`
        #[arg(long)]
        monitor: String,
    },

    /// Run only the Service/Ingress discovery controllers until Ctrl+C
    Discover,

    /// Manage the yuptime CRDs
    Crd {
        #[command(subcommand)]
        action: CrdAction,
    },
}

#[derive(Subcommand)]
pub enum CrdAction {
    /// Print all yuptime CRD YAML manifests to stdout
    Generate,

    /// Install all yuptime CRDs into the connected cluster
    Install,
}
