//! Push/dead-man's-switch checker (spec.md §4.3): there is nothing to
//! dial out to — the monitor is "up" iff a heartbeat arrived within the
//! configured grace period of its last recorded check. The heartbeat
//! itself is recorded by the external push-receiver HTTP endpoint, which
//! writes `status.lastResult` the same way every other checker does.

use chrono::{DateTime, Utc};

use crate::crd::monitor::{MonitorStatus, PushTarget};

use super::{CheckResult, Stopwatch};

pub fn check(target: &PushTarget, status: Option<&MonitorStatus>, sw: &Stopwatch) -> CheckResult {
    let grace_period = target.grace_period_seconds_or_default();
    let latency_ms = sw.elapsed_ms();

    let Some(last_result) = status.and_then(|s| s.last_result.as_ref()) else {
        return CheckResult::down("PUSH_NEVER_RECEIVED", "no heartbeat has been received yet", latency_ms);
    };

    let Ok(last_seen) = DateTime::parse_from_rfc3339(&last_result.checked_at) else {
        return CheckResult::down("PUSH_INVALID_TIMESTAMP", "stored checkedAt is not a valid timestamp", latency_ms);
    };

    let elapsed = Utc::now().signed_duration_since(last_seen.with_timezone(&Utc));
    if elapsed.num_seconds() <= grace_period as i64 {
        CheckResult::up("PUSH_RECEIVED", format!("last heartbeat {} seconds ago", elapsed.num_seconds()), latency_ms)
    } else {
        CheckResult::down(
            "PUSH_MISSED",
            format!("last heartbeat {} seconds ago, grace period is {grace_period}s", elapsed.num_seconds()),
            latency_ms,
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::crd::monitor::{CheckState, LastResult};

    use super::*;

    fn status_with_heartbeat(checked_at: &str) -> MonitorStatus {
        MonitorStatus {
            last_result: Some(LastResult {
                state: CheckState::Up,
                reason: "PUSH_RECEIVED".to_string(),
                message: String::new(),
                latency_ms: 0,
                checked_at: checked_at.to_string(),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn no_prior_heartbeat_is_down() {
        let target = PushTarget { grace_period_seconds: Some(300) };
        let result = check(&target, None, &Stopwatch::start());
        assert_eq!(result.reason, "PUSH_NEVER_RECEIVED");
    }

    #[test]
    fn recent_heartbeat_is_up() {
        let target = PushTarget { grace_period_seconds: Some(300) };
        let now = Utc::now().to_rfc3339();
        let status = status_with_heartbeat(&now);
        let result = check(&target, Some(&status), &Stopwatch::start());
        assert!(result.is_up());
    }

    #[test]
    fn stale_heartbeat_is_down() {
        let target = PushTarget { grace_period_seconds: Some(60) };
        let stale = (Utc::now() - chrono::Duration::seconds(3600)).to_rfc3339();
        let status = status_with_heartbeat(&stale);
        let result = check(&target, Some(&status), &Stopwatch::start());
        assert_eq!(result.reason, "PUSH_MISSED");
    }
}
