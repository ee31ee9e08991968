use std::net::SocketAddr;
use std::time::Duration;

/// Operator-wide configuration, read once at startup.
///
/// Consolidates the scattered constants the teacher spread across
/// `commands/reconcile.rs`/`commands/deploy.rs` into a single struct with an
/// env-driven constructor, since this operator has one long-running `run`
/// command whose knobs need to be read once rather than many single-purpose
/// CLI commands each hardcoding their own.
#[derive(Debug, Clone)]
pub struct OperatorConfig {
    /// Upper bound on concurrently-active worker pods (spec.md §4.2).
    pub max_concurrent_checks: usize,
    /// Stall-detector tick interval (spec.md §4.2: "every 30 seconds").
    pub stall_check_interval: Duration,
    /// Multiple of `intervalSeconds` after which a Monitor is considered
    /// stalled (spec.md §4.2: "now − checkedAt > 2 · intervalSeconds").
    pub stall_multiplier: u32,
    /// Bind address for the Prometheus `/metrics` + `/healthz` + `/readyz`
    /// server.
    pub metrics_addr: SocketAddr,
    /// Whether the discovery controller is allowed to write/patch derived
    /// Monitor resources, or only log what it would do (spec.md §4.4).
    pub discovery_write_crds: bool,
    /// Container image used for worker pods.
    pub worker_image: String,
    /// Namespace worker pods are created in when a Monitor itself has no
    /// namespace override (monitors are namespaced, so in practice this is
    /// always the Monitor's own namespace — kept for parity with the
    /// teacher's explicit `NAMESPACE` constant).
    pub default_namespace: String,
}

impl OperatorConfig {
    pub fn from_env() -> Self {
        Self {
            max_concurrent_checks: std::env::var("YUPTIME_MAX_CONCURRENT_CHECKS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            stall_check_interval: Duration::from_secs(
                std::env::var("YUPTIME_STALL_CHECK_INTERVAL_SECONDS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30),
            ),
            stall_multiplier: std::env::var("YUPTIME_STALL_MULTIPLIER")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2),
            metrics_addr: std::env::var("YUPTIME_METRICS_ADDR")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 9090))),
            discovery_write_crds: std::env::var("YUPTIME_DISCOVERY_WRITE_CRDS")
                .ok()
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            worker_image: std::env::var("YUPTIME_WORKER_IMAGE")
                .unwrap_or_else(|_| "ghcr.io/yuptime/checker-executor:latest".to_string()),
            default_namespace: std::env::var("YUPTIME_DEFAULT_NAMESPACE")
                .unwrap_or_else(|_| "default".to_string()),
        }
    }
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_without_env() {
        // SAFETY: tests run single-threaded per-module here, no other test touches these vars.
        for var in [
            "YUPTIME_MAX_CONCURRENT_CHECKS",
            "YUPTIME_STALL_CHECK_INTERVAL_SECONDS",
            "YUPTIME_STALL_MULTIPLIER",
            "YUPTIME_METRICS_ADDR",
            "YUPTIME_DISCOVERY_WRITE_CRDS",
        ] {
            unsafe { std::env::remove_var(var) };
        }
        let cfg = OperatorConfig::from_env();
        assert_eq!(cfg.max_concurrent_checks, 10);
        assert_eq!(cfg.stall_check_interval, Duration::from_secs(30));
        assert_eq!(cfg.stall_multiplier, 2);
        assert!(!cfg.discovery_write_crds);
    }
}
