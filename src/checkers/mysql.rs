//! MySQL checker (spec.md §4.3): connect and run the configured health
//! query (default `SELECT 1`).

use std::time::Duration;

use crate::crd::monitor::SqlTarget;

use super::transport::{SqlConnectParams, SqlEngine, SqlError, SqlTransport};
use super::{CheckResult, Stopwatch};

pub(crate) fn credential_parts(target: &SqlTarget, family: &str) -> (Option<String>, Option<String>) {
    if target.credential_secret_ref.is_none() {
        return (None, None);
    }
    (
        crate::secrets::read_credential(family, "username"),
        crate::secrets::read_credential(family, "password"),
    )
}

/// Classifies a `SqlError` into spec.md §4.3's reason enum. Only the success
/// reason is protocol-family prefixed (`MYSQL_OK`/`POSTGRESQL_OK`); the
/// error reasons are shared across MySQL, PostgreSQL, and (minus
/// `DATABASE_NOT_FOUND`) Redis.
pub(crate) fn map_sql_error(err: SqlError) -> (String, String) {
    match err {
        SqlError::Timeout => ("TIMEOUT".to_string(), "query timed out".to_string()),
        SqlError::ConnectionRefused => ("CONNECTION_REFUSED".to_string(), "connection refused".to_string()),
        SqlError::DnsNxDomain => ("DNS_NXDOMAIN".to_string(), "name did not resolve".to_string()),
        SqlError::AuthFailed => ("AUTH_FAILED".to_string(), "authentication failed".to_string()),
        SqlError::DatabaseNotFound => ("DATABASE_NOT_FOUND".to_string(), "database does not exist".to_string()),
        SqlError::CredentialsError => ("CREDENTIALS_ERROR".to_string(), "credentials rejected".to_string()),
        SqlError::ConnectionError(msg) => ("CONNECTION_ERROR".to_string(), msg),
    }
}

pub(crate) async fn check_with_family(
    target: &SqlTarget,
    engine: SqlEngine,
    family: &str,
    ok_reason: &str,
    timeout: Duration,
    transport: &dyn SqlTransport,
    sw: &Stopwatch,
) -> CheckResult {
    let (username, password) = credential_parts(target, family);
    let tls = target.tls.as_ref().and_then(|t| t.enabled).unwrap_or(false);

    let params = SqlConnectParams {
        engine,
        host: &target.host,
        port: target.port,
        database: &target.database,
        username: username.as_deref(),
        password: password.as_deref(),
        tls,
        health_query: target.health_query_or_default(),
    };

    let result = transport.run_health_query(params, timeout).await;
    let latency_ms = sw.elapsed_ms();

    match result {
        Ok(()) => CheckResult::up(ok_reason, format!("{}:{} responded", target.host, target.port), latency_ms),
        Err(err) => {
            let (reason, message) = map_sql_error(err);
            CheckResult::down(reason, message, latency_ms)
        }
    }
}

pub async fn check(target: &SqlTarget, timeout: Duration, transport: &dyn SqlTransport, sw: &Stopwatch) -> CheckResult {
    check_with_family(target, SqlEngine::MySql, "mysql", "MYSQL_OK", timeout, transport, sw).await
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;

    struct MockSql {
        result: Result<(), SqlError>,
    }

    #[async_trait]
    impl SqlTransport for MockSql {
        async fn run_health_query(&self, _params: SqlConnectParams<'_>, _timeout: Duration) -> Result<(), SqlError> {
            self.result.clone()
        }
    }

    #[tokio::test]
    async fn healthy_query_is_up() {
        let target = SqlTarget { host: "db".to_string(), port: 3306, database: "app".to_string(), ..Default::default() };
        let mock = MockSql { result: Ok(()) };
        let result = check(&target, Duration::from_secs(5), &mock, &Stopwatch::start()).await;
        assert!(result.is_up());
        assert_eq!(result.reason, "MYSQL_OK");
    }

    #[tokio::test]
    async fn auth_failure_maps_to_auth_reason() {
        let target = SqlTarget { host: "db".to_string(), port: 3306, database: "app".to_string(), ..Default::default() };
        let mock = MockSql { result: Err(SqlError::AuthFailed) };
        let result = check(&target, Duration::from_secs(5), &mock, &Stopwatch::start()).await;
        assert_eq!(result.reason, "AUTH_FAILED");
    }
}
