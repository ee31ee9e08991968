//! Keyword checker (spec.md §4.3): performs the HTTP check, and if up,
//! applies `contains[]`/`notContains[]`/`regex[]` against the body. Reuses
//! `http`'s request building, base criteria evaluation, and transport.

use std::time::Duration;

use crate::crd::monitor::{HttpTarget, SuccessCriteria};

use super::http::{build_request, evaluate_base, map_http_error};
use super::transport::HttpTransport;
use super::{CheckResult, Stopwatch};

fn evaluate_keyword(criteria: &SuccessCriteria, body: &str) -> Result<(), (String, String)> {
    if let Some(needles) = &criteria.contains {
        for needle in needles {
            if !body.contains(needle.as_str()) {
                return Err(("KEYWORD_MISSING".to_string(), format!("body did not contain {needle:?}")));
            }
        }
    }

    if let Some(forbidden) = &criteria.not_contains {
        for needle in forbidden {
            if body.contains(needle.as_str()) {
                return Err(("KEYWORD_PRESENT".to_string(), format!("body unexpectedly contained {needle:?}")));
            }
        }
    }

    if let Some(patterns) = &criteria.regex {
        for pattern in patterns {
            let re = regex::Regex::new(pattern)
                .map_err(|e| ("INVALID_REGEX".to_string(), format!("invalid regex {pattern:?}: {e}")))?;
            if !re.is_match(body) {
                return Err(("REGEX_NO_MATCH".to_string(), format!("body did not match {pattern:?}")));
            }
        }
    }

    Ok(())
}

pub async fn check(
    target: &HttpTarget,
    criteria: Option<&SuccessCriteria>,
    timeout: Duration,
    transport: &dyn HttpTransport,
    sw: &Stopwatch,
) -> CheckResult {
    let has_assertion = |c: &SuccessCriteria| {
        c.contains.as_ref().is_some_and(|v| !v.is_empty())
            || c.not_contains.as_ref().is_some_and(|v| !v.is_empty())
            || c.regex.as_ref().is_some_and(|v| !v.is_empty())
    };
    let Some(criteria) = criteria.filter(|c| has_assertion(*c)) else {
        return CheckResult::invalid_config(
            "keyword monitor requires successCriteria.contains, notContains, or regex",
            sw.elapsed_ms(),
        );
    };

    let request = build_request(target);
    match transport.send(request, timeout).await {
        Ok(response) => {
            let latency_ms = sw.elapsed_ms();
            if let Err((reason, message)) = evaluate_base(Some(criteria), &response, latency_ms) {
                return CheckResult::down(reason, message, latency_ms);
            }
            let body = String::from_utf8_lossy(&response.body);
            match evaluate_keyword(criteria, &body) {
                Ok(()) => CheckResult::up("KEYWORD_MATCH", "required text present", latency_ms),
                Err((reason, message)) => CheckResult::down(reason, message, latency_ms),
            }
        }
        Err(err) => {
            let (reason, message) = map_http_error(err);
            CheckResult::down(reason, message, sw.elapsed_ms())
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::super::transport::{HttpError, HttpRequest, HttpResponse};
    use super::*;

    struct MockHttp {
        response: Result<HttpResponse, HttpError>,
    }

    #[async_trait]
    impl HttpTransport for MockHttp {
        async fn send(&self, _req: HttpRequest, _timeout: Duration) -> Result<HttpResponse, HttpError> {
            self.response.clone()
        }
    }

    #[tokio::test]
    async fn missing_contains_is_invalid_config() {
        let target = HttpTarget { url: "https://example.com".to_string(), ..Default::default() };
        let mock = MockHttp {
            response: Ok(HttpResponse { status: 200, headers: vec![], body: b"ok".to_vec() }),
        };
        let result = check(&target, None, Duration::from_secs(5), &mock, &Stopwatch::start()).await;
        assert_eq!(result.reason, "INVALID_CONFIG");
    }

    #[tokio::test]
    async fn matching_text_is_up() {
        let target = HttpTarget { url: "https://example.com".to_string(), ..Default::default() };
        let criteria = SuccessCriteria { contains: Some(vec!["healthy".to_string()]), ..Default::default() };
        let mock = MockHttp {
            response: Ok(HttpResponse { status: 200, headers: vec![], body: b"all healthy here".to_vec() }),
        };
        let result = check(&target, Some(&criteria), Duration::from_secs(5), &mock, &Stopwatch::start()).await;
        assert!(result.is_up());
        assert_eq!(result.reason, "KEYWORD_MATCH");
    }

    #[tokio::test]
    async fn missing_keyword_is_down_with_keyword_missing_reason() {
        let target = HttpTarget { url: "https://example.com".to_string(), ..Default::default() };
        let criteria = SuccessCriteria { contains: Some(vec!["SUCCESS".to_string()]), ..Default::default() };
        let mock = MockHttp { response: Ok(HttpResponse { status: 200, headers: vec![], body: b"HELLO".to_vec() }) };
        let result = check(&target, Some(&criteria), Duration::from_secs(5), &mock, &Stopwatch::start()).await;
        assert!(!result.is_up());
        assert_eq!(result.reason, "KEYWORD_MISSING");
        assert!(result.message.contains("SUCCESS"));
    }

    #[tokio::test]
    async fn forbidden_text_present_is_keyword_present() {
        let target = HttpTarget { url: "https://example.com".to_string(), ..Default::default() };
        let criteria = SuccessCriteria { not_contains: Some(vec!["maintenance".to_string()]), ..Default::default() };
        let mock = MockHttp {
            response: Ok(HttpResponse { status: 200, headers: vec![], body: b"under maintenance".to_vec() }),
        };
        let result = check(&target, Some(&criteria), Duration::from_secs(5), &mock, &Stopwatch::start()).await;
        assert_eq!(result.reason, "KEYWORD_PRESENT");
    }

    #[tokio::test]
    async fn non_matching_regex_is_regex_no_match() {
        let target = HttpTarget { url: "https://example.com".to_string(), ..Default::default() };
        let criteria = SuccessCriteria { regex: Some(vec![r"^\d+$".to_string()]), ..Default::default() };
        let mock = MockHttp { response: Ok(HttpResponse { status: 200, headers: vec![], body: b"not a number".to_vec() }) };
        let result = check(&target, Some(&criteria), Duration::from_secs(5), &mock, &Stopwatch::start()).await;
        assert_eq!(result.reason, "REGEX_NO_MATCH");
    }

    #[tokio::test]
    async fn invalid_regex_is_reported_without_panicking() {
        let target = HttpTarget { url: "https://example.com".to_string(), ..Default::default() };
        let criteria = SuccessCriteria { regex: Some(vec!["(unterminated".to_string()]), ..Default::default() };
        let mock = MockHttp { response: Ok(HttpResponse { status: 200, headers: vec![], body: b"ok".to_vec() }) };
        let result = check(&target, Some(&criteria), Duration::from_secs(5), &mock, &Stopwatch::start()).await;
        assert_eq!(result.reason, "INVALID_REGEX");
    }

    #[tokio::test]
    async fn base_status_mismatch_short_circuits_before_keyword_check() {
        let target = HttpTarget { url: "https://example.com".to_string(), ..Default::default() };
        let criteria = SuccessCriteria { contains: Some(vec!["healthy".to_string()]), ..Default::default() };
        let mock = MockHttp { response: Ok(HttpResponse { status: 500, headers: vec![], body: b"healthy".to_vec() }) };
        let result = check(&target, Some(&criteria), Duration::from_secs(5), &mock, &Stopwatch::start()).await;
        assert_eq!(result.reason, "HTTP_500");
    }
}
