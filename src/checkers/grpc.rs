//! gRPC health checker (spec.md §4.3): calls the standard
//! `grpc.health.v1.Health/Check` RPC.

use std::time::Duration;

use crate::crd::monitor::GrpcTarget;

use super::transport::{GrpcError, GrpcHealthStatus, GrpcHealthTransport};
use super::{CheckResult, Stopwatch};

pub async fn check(target: &GrpcTarget, timeout: Duration, transport: &dyn GrpcHealthTransport, sw: &Stopwatch) -> CheckResult {
    let service = target.service.clone().unwrap_or_default();
    let tls = target.tls.unwrap_or(false);
    let result = transport.check_health(&target.host, target.port, &service, tls, timeout).await;
    let latency_ms = sw.elapsed_ms();

    match result {
        Ok(GrpcHealthStatus::Serving) => CheckResult::up("GRPC_SERVING", "health check reported SERVING", latency_ms),
        Ok(GrpcHealthStatus::NotServing) => CheckResult::down("GRPC_NOT_SERVING", "health check reported NOT_SERVING", latency_ms),
        Ok(GrpcHealthStatus::ServiceUnknown) => CheckResult::down("GRPC_SERVICE_UNKNOWN", format!("unknown service {service:?}"), latency_ms),
        Ok(GrpcHealthStatus::Unknown) => CheckResult::down("GRPC_UNKNOWN", "health check reported an unrecognized status", latency_ms),
        Err(GrpcError::Timeout) => CheckResult::timeout(latency_ms),
        Err(GrpcError::Unavailable) => CheckResult::down("GRPC_UNAVAILABLE", "server unavailable", latency_ms),
        Err(GrpcError::Other(msg)) => CheckResult::down("GRPC_ERROR", msg, latency_ms),
    }
}
