//! DNS checker (spec.md §4.3): resolve a name and optionally assert the
//! returned values.

use std::time::Duration;

use crate::crd::monitor::DnsTarget;

use super::transport::{DnsError, DnsTransport};
use super::{CheckResult, Stopwatch};

fn record_type_str(target: &DnsTarget) -> &'static str {
    use crate::crd::monitor::DnsRecordType;
    match target.record_type {
        DnsRecordType::A => "A",
        DnsRecordType::Aaaa => "AAAA",
        DnsRecordType::Cname => "CNAME",
        DnsRecordType::Mx => "MX",
        DnsRecordType::Txt => "TXT",
        DnsRecordType::Srv => "SRV",
    }
}

pub async fn check(target: &DnsTarget, timeout: Duration, transport: &dyn DnsTransport, sw: &Stopwatch) -> CheckResult {
    let record_type = record_type_str(target);
    let result = transport.resolve(&target.name, record_type, timeout).await;
    let latency_ms = sw.elapsed_ms();

    let values = match result {
        Ok(values) => values,
        Err(DnsError::NxDomain) => return CheckResult::down("DNS_NXDOMAIN", format!("{} did not resolve", target.name), latency_ms),
        Err(DnsError::Timeout) => return CheckResult::down("DNS_TIMEOUT", "resolution timed out", latency_ms),
        Err(DnsError::EmptyResponse) => return CheckResult::down("DNS_EMPTY_RESPONSE", "resolver returned no records", latency_ms),
        Err(DnsError::Other(msg)) => return CheckResult::down("DNS_ERROR", msg, latency_ms),
    };

    if let Some(expected) = &target.expected {
        let all_present = expected.values.iter().all(|v| values.contains(v));
        if !all_present {
            return CheckResult::down(
                "DNS_VALUE_MISMATCH",
                format!("resolved {values:?}, expected to contain {:?}", expected.values),
                latency_ms,
            );
        }
    }

    CheckResult::up("DNS_OK", format!("resolved {} record(s)", values.len()), latency_ms)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use crate::crd::monitor::DnsExpected;

    use super::*;

    struct MockDns {
        result: Result<Vec<String>, DnsError>,
    }

    #[async_trait]
    impl DnsTransport for MockDns {
        async fn resolve(&self, _name: &str, _record_type: &str, _timeout: Duration) -> Result<Vec<String>, DnsError> {
            self.result.clone()
        }
    }

    #[tokio::test]
    async fn resolves_and_matches_expected_values() {
        let target = DnsTarget {
            name: "example.com".to_string(),
            expected: Some(DnsExpected { values: vec!["93.184.216.34".to_string()] }),
            ..Default::default()
        };
        let mock = MockDns { result: Ok(vec!["93.184.216.34".to_string()]) };
        let result = check(&target, Duration::from_secs(2), &mock, &Stopwatch::start()).await;
        assert!(result.is_up());
    }

    #[tokio::test]
    async fn mismatch_is_down() {
        let target = DnsTarget {
            name: "example.com".to_string(),
            expected: Some(DnsExpected { values: vec!["10.0.0.1".to_string()] }),
            ..Default::default()
        };
        let mock = MockDns { result: Ok(vec!["93.184.216.34".to_string()]) };
        let result = check(&target, Duration::from_secs(2), &mock, &Stopwatch::start()).await;
        assert_eq!(result.reason, "DNS_VALUE_MISMATCH");
    }

    #[tokio::test]
    async fn nxdomain_is_down() {
        let target = DnsTarget { name: "no-such-domain.invalid".to_string(), ..Default::default() };
        let mock = MockDns { result: Err(DnsError::NxDomain) };
        let result = check(&target, Duration::from_secs(2), &mock, &Stopwatch::start()).await;
        assert_eq!(result.reason, "DNS_NXDOMAIN");
    }

    #[tokio::test]
    async fn resolver_timeout_uses_dns_prefixed_reason() {
        let target = DnsTarget { name: "example.com".to_string(), ..Default::default() };
        let mock = MockDns { result: Err(DnsError::Timeout) };
        let result = check(&target, Duration::from_secs(2), &mock, &Stopwatch::start()).await;
        assert_eq!(result.reason, "DNS_TIMEOUT");
    }
}
