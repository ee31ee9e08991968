//! JSON-query checker (spec.md §4.3): an HTTP request whose response body
//! is parsed as JSON and asserted against a dot/bracket path.

use std::time::Duration;

use crate::crd::monitor::JsonQueryTarget;

use super::http::{build_request, map_http_error};
use super::transport::HttpTransport;
use super::{CheckResult, Stopwatch};

/// Resolves a small subset of JSONPath: dot-separated field names with
/// optional `[n]` array indices, e.g. `data.items[0].status`. A leading `$`
/// or `$.` is stripped if present. Returns `None` if any segment is absent.
pub(crate) fn resolve_path(value: &serde_json::Value, path: &str) -> Option<serde_json::Value> {
    let trimmed = path.strip_prefix('$').unwrap_or(path);
    let trimmed = trimmed.strip_prefix('.').unwrap_or(trimmed);
    if trimmed.is_empty() {
        return Some(value.clone());
    }

    let mut current = value.clone();
    for segment in trimmed.split('.') {
        let (field, indices) = parse_segment(segment);
        if !field.is_empty() {
            current = current.get(&field)?.clone();
        }
        for idx in indices {
            current = current.get(idx)?.clone();
        }
    }
    Some(current)
}

fn parse_segment(segment: &str) -> (String, Vec<usize>) {
    let mut field = String::new();
    let mut indices = Vec::new();
    let mut chars = segment.chars().peekable();
    while let Some(c) = chars.peek() {
        if *c == '[' {
            break;
        }
        field.push(*c);
        chars.next();
    }
    let rest: String = chars.collect();
    for part in rest.split('[').skip(1) {
        if let Some(stripped) = part.strip_suffix(']') {
            if let Ok(idx) = stripped.parse::<usize>() {
                indices.push(idx);
            }
        }
    }
    (field, indices)
}

pub async fn check(
    target: &JsonQueryTarget,
    timeout: Duration,
    transport: &dyn HttpTransport,
    sw: &Stopwatch,
) -> CheckResult {
    let request = build_request(&target.http);
    let response = match transport.send(request, timeout).await {
        Ok(r) => r,
        Err(err) => {
            let (reason, message) = map_http_error(err);
            return CheckResult::down(reason, message, sw.elapsed_ms());
        }
    };

    let latency_ms = sw.elapsed_ms();
    let parsed: serde_json::Value = match serde_json::from_slice(&response.body) {
        Ok(v) => v,
        Err(e) => return CheckResult::down("JSON_ERROR", e.to_string(), latency_ms),
    };

    let found = resolve_path(&parsed, &target.path);

    if let Some(expect_exists) = target.exists {
        let exists = found.is_some();
        if exists != expect_exists {
            return CheckResult::down(
                "JSON_PATH_NOT_FOUND",
                format!("path {:?} existence {exists} != expected {expect_exists}", target.path),
                latency_ms,
            );
        }
    }

    if let Some(expected) = &target.equals {
        if found.as_ref() != Some(expected) {
            return CheckResult::down(
                "JSON_VALUE_MISMATCH",
                format!("path {:?} value {found:?} != expected {expected:?}", target.path),
                latency_ms,
            );
        }
    }

    if target.exists.is_none() && target.equals.is_none() && found.is_none() {
        return CheckResult::down("JSON_PATH_NOT_FOUND", format!("path {:?} not found", target.path), latency_ms);
    }

    CheckResult::up("JSON_QUERY_OK", format!("path {:?} satisfied", target.path), latency_ms)
}
