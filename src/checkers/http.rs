//! HTTP checker (spec.md §4.3). Shared by `http` and `keyword` monitor
//! types; `jsonQuery` reuses the request-building half and adds its own
//! path-based assertions in `json_query.rs`.

use std::time::Duration;

use crate::crd::monitor::{HttpHeader, HttpTarget, SuccessCriteria};

use super::transport::{HttpError, HttpRequest, HttpResponse, HttpTransport};
use super::{CheckResult, Stopwatch};

pub(crate) fn resolve_header_value(header: &HttpHeader) -> Option<String> {
    header.value.clone().or_else(|| {
        header
            .value_from_secret
            .as_ref()
            .and_then(|r| crate::secrets::read_credential(&r.name, &r.key))
    })
}

pub(crate) fn build_request(target: &HttpTarget) -> HttpRequest {
    HttpRequest {
        url: target.url.clone(),
        method: target.method.clone().unwrap_or_else(|| "GET".to_string()),
        headers: target
            .headers
            .iter()
            .filter_map(|h| resolve_header_value(h).map(|v| (h.name.clone(), v)))
            .collect(),
        body: target.body.clone().map(|b| b.into_bytes()),
        follow_redirects: target.follow_redirects.unwrap_or(true),
    }
}

pub(crate) fn map_http_error(err: HttpError) -> (String, String) {
    match err {
        HttpError::Timeout => ("TIMEOUT".to_string(), "request timed out".to_string()),
        HttpError::ConnectionRefused => ("CONNECTION_REFUSED".to_string(), "connection refused".to_string()),
        HttpError::DnsNxDomain => ("DNS_NXDOMAIN".to_string(), "name did not resolve".to_string()),
        HttpError::Tls => ("TLS_ERROR".to_string(), "TLS handshake failed".to_string()),
        HttpError::Other(msg) => ("HTTP_ERROR".to_string(), msg),
    }
}

/// Evaluates the criteria the `http` and `keyword` monitor types share:
/// status codes, latency, content type (spec.md §4.3's HTTP reasons). The
/// status-code check applies even with no `successCriteria` at all: the
/// default accepted set is [200], not "anything".
pub(crate) fn evaluate_base(
    criteria: Option<&SuccessCriteria>,
    response: &HttpResponse,
    latency_ms: u64,
) -> Result<(), (String, String)> {
    let accepted = criteria.map(|c| c.accepted_status_codes_or_default()).unwrap_or_else(|| vec![200]);
    if !accepted.contains(&response.status) {
        return Err((
            format!("HTTP_{}", response.status),
            format!("status {} not in accepted set {:?}", response.status, accepted),
        ));
    }

    let Some(criteria) = criteria else {
        return Ok(());
    };

    if let Some(max_latency) = criteria.latency_ms_under {
        if latency_ms >= max_latency as u64 {
            return Err((
                "LATENCY_EXCEEDED".to_string(),
                format!("latency {latency_ms}ms >= threshold {max_latency}ms"),
            ));
        }
    }

    if let Some(expected_ct) = &criteria.expected_content_type {
        let actual = response.header("content-type").unwrap_or_default();
        if !actual.contains(expected_ct.as_str()) {
            return Err((
                "INVALID_CONTENT_TYPE".to_string(),
                format!("content-type {actual:?} does not match expected {expected_ct:?}"),
            ));
        }
    }

    Ok(())
}

/// Evaluates `SuccessCriteria` against a response, in the documented order:
/// status codes, latency, content type, contains, not-contains, regex, JSON
/// path. Returns `Err((reason, message))` for the first criterion that
/// fails.
pub(crate) fn evaluate_success(
    criteria: Option<&SuccessCriteria>,
    response: &HttpResponse,
    latency_ms: u64,
) -> Result<(), (String, String)> {
    evaluate_base(criteria, response, latency_ms)?;

    let Some(criteria) = criteria else {
        return Ok(());
    };

    let body_text = String::from_utf8_lossy(&response.body);

    if let Some(needles) = &criteria.contains {
        for needle in needles {
            if !body_text.contains(needle.as_str()) {
                return Err((
                    "HTTP_BODY_MISSING_TEXT".to_string(),
                    format!("body did not contain {needle:?}"),
                ));
            }
        }
    }

    if let Some(forbidden) = &criteria.not_contains {
        for needle in forbidden {
            if body_text.contains(needle.as_str()) {
                return Err((
                    "HTTP_BODY_FORBIDDEN_TEXT".to_string(),
                    format!("body unexpectedly contained {needle:?}"),
                ));
            }
        }
    }

    if let Some(patterns) = &criteria.regex {
        for pattern in patterns {
            let re = regex::Regex::new(pattern)
                .map_err(|e| ("INVALID_CONFIG".to_string(), format!("invalid regex {pattern:?}: {e}")))?;
            if !re.is_match(&body_text) {
                return Err(("HTTP_REGEX_MISMATCH".to_string(), format!("body did not match {pattern:?}")));
            }
        }
    }

    if criteria.json_path.is_some() || criteria.json_path_exists.is_some() || criteria.json_path_equals.is_some() {
        let parsed: serde_json::Value = serde_json::from_slice(&response.body)
            .map_err(|e| ("HTTP_JSON_PATH_MISMATCH".to_string(), format!("body is not valid JSON: {e}")))?;
        let path = criteria.json_path.as_deref().unwrap_or("$");
        let found = super::json_query::resolve_path(&parsed, path);

        if let Some(expect_exists) = criteria.json_path_exists {
            if found.is_some() != expect_exists {
                return Err((
                    "HTTP_JSON_PATH_MISMATCH".to_string(),
                    format!("path {path:?} existence {} != expected {expect_exists}", found.is_some()),
                ));
            }
        }

        if let Some(expected) = &criteria.json_path_equals {
            if found.as_ref() != Some(expected) {
                return Err((
                    "HTTP_JSON_PATH_MISMATCH".to_string(),
                    format!("path {path:?} value {found:?} != expected {expected:?}"),
                ));
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
    let request = build_request(target);
    match transport.send(request, timeout).await {
        Ok(response) => {
            let latency_ms = sw.elapsed_ms();
            match evaluate_success(criteria, &response, latency_ms) {
                Ok(()) => CheckResult::up("HTTP_OK", format!("status {}", response.status), latency_ms),
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

    fn ok_response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: body.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn accepted_status_is_up() {
        let target = HttpTarget { url: "https://example.com".to_string(), ..Default::default() };
        let mock = MockHttp { response: Ok(ok_response(200, "ok")) };
        let result = check(&target, None, Duration::from_secs(5), &mock, &Stopwatch::start()).await;
        assert!(result.is_up());
        assert_eq!(result.reason, "HTTP_OK");
    }

    #[tokio::test]
    async fn unexpected_status_is_down_with_status_specific_reason() {
        let target = HttpTarget { url: "https://example.com".to_string(), ..Default::default() };
        let mock = MockHttp { response: Ok(ok_response(503, "down")) };
        let result = check(&target, None, Duration::from_secs(5), &mock, &Stopwatch::start()).await;
        assert!(!result.is_up());
        assert_eq!(result.reason, "HTTP_503");
    }

    #[tokio::test]
    async fn non_200_is_down_even_without_success_criteria() {
        let target = HttpTarget { url: "https://example.com".to_string(), ..Default::default() };
        let mock = MockHttp { response: Ok(ok_response(500, "error")) };
        let result = check(&target, None, Duration::from_secs(5), &mock, &Stopwatch::start()).await;
        assert!(!result.is_up());
        assert_eq!(result.reason, "HTTP_500");
    }

    #[tokio::test]
    async fn contains_criterion_enforced() {
        let target = HttpTarget { url: "https://example.com".to_string(), ..Default::default() };
        let criteria = SuccessCriteria { contains: Some(vec!["healthy".to_string()]), ..Default::default() };
        let mock = MockHttp { response: Ok(ok_response(200, "unhealthy system")) };
        let result = check(&target, Some(&criteria), Duration::from_secs(5), &mock, &Stopwatch::start()).await;
        assert_eq!(result.reason, "HTTP_BODY_MISSING_TEXT");
    }

    #[tokio::test]
    async fn timeout_maps_to_timeout_reason() {
        let target = HttpTarget { url: "https://example.com".to_string(), ..Default::default() };
        let mock = MockHttp { response: Err(HttpError::Timeout) };
        let result = check(&target, None, Duration::from_secs(5), &mock, &Stopwatch::start()).await;
        assert_eq!(result.reason, "TIMEOUT");
        assert!(!result.is_up());
    }

    #[tokio::test]
    async fn header_secret_is_resolved_via_env() {
        let header_name = "YUPTIME_CRED_APITOKEN_VALUE";
        unsafe { std::env::set_var(header_name, "shh") };
        let target = HttpTarget {
            url: "https://example.com".to_string(),
            headers: vec![HttpHeader {
                name: "Authorization".to_string(),
                value: None,
                value_from_secret: Some(crate::crd::SecretKeyRef { name: "apitoken".to_string(), key: "value".to_string() }),
            }],
            ..Default::default()
        };
        let request = build_request(&target);
        assert_eq!(request.headers[0], ("Authorization".to_string(), "shh".to_string()));
        unsafe { std::env::remove_var(header_name) };
    }
}
