//! Ping checker (spec.md §4.3): shells out to the system `ping` binary
//! through an injectable `ProcessRunner` so tests never spawn a real
//! process.

use std::time::Duration;

use crate::crd::monitor::PingTarget;

use super::transport::{ProcessError, ProcessRunner};
use super::{CheckResult, Stopwatch};

const DEFAULT_PACKET_COUNT: u32 = 3;

pub async fn check(target: &PingTarget, timeout: Duration, runner: &dyn ProcessRunner, sw: &Stopwatch) -> CheckResult {
    let packet_count = target.packet_count.unwrap_or(DEFAULT_PACKET_COUNT);
    let result = runner.run_ping(&target.host, packet_count, timeout).await;
    let latency_ms = sw.elapsed_ms();

    match result {
        Ok(output) if output.success => CheckResult::up("PING_OK", format!("{} replied", target.host), latency_ms),
        Ok(output) => CheckResult::down("PING_UNREACHABLE", output.stderr, latency_ms),
        Err(ProcessError::TimedOut) => CheckResult::timeout(latency_ms),
        Err(ProcessError::SpawnFailed(msg)) => CheckResult::down("PING_SPAWN_FAILED", msg, latency_ms),
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::super::transport::ProcessOutput;
    use super::*;

    struct MockRunner {
        result: Result<ProcessOutput, ProcessError>,
    }

    #[async_trait]
    impl ProcessRunner for MockRunner {
        async fn run_ping(&self, _host: &str, _packet_count: u32, _timeout: Duration) -> Result<ProcessOutput, ProcessError> {
            match &self.result {
                Ok(o) => Ok(ProcessOutput { stdout: o.stdout.clone(), stderr: o.stderr.clone(), success: o.success }),
                Err(ProcessError::TimedOut) => Err(ProcessError::TimedOut),
                Err(ProcessError::SpawnFailed(m)) => Err(ProcessError::SpawnFailed(m.clone())),
            }
        }
    }

    #[tokio::test]
    async fn successful_reply_is_up() {
        let target = PingTarget { host: "10.0.0.1".to_string(), packet_count: None };
        let mock = MockRunner { result: Ok(ProcessOutput { stdout: "3 packets transmitted".to_string(), stderr: String::new(), success: true }) };
        let result = check(&target, Duration::from_secs(3), &mock, &Stopwatch::start()).await;
        assert!(result.is_up());
    }

    #[tokio::test]
    async fn unreachable_host_is_down() {
        let target = PingTarget { host: "10.0.0.1".to_string(), packet_count: None };
        let mock = MockRunner { result: Ok(ProcessOutput { stdout: String::new(), stderr: "100% packet loss".to_string(), success: false }) };
        let result = check(&target, Duration::from_secs(3), &mock, &Stopwatch::start()).await;
        assert_eq!(result.reason, "PING_UNREACHABLE");
    }
}
