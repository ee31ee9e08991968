//! PostgreSQL checker (spec.md §4.3). Shares connection-param building and
//! error mapping with `mysql.rs`; only the engine tag differs.

use std::time::Duration;

use crate::crd::monitor::SqlTarget;

use super::mysql::check_with_family;
use super::transport::{SqlEngine, SqlTransport};
use super::{CheckResult, Stopwatch};

pub async fn check(target: &SqlTarget, timeout: Duration, transport: &dyn SqlTransport, sw: &Stopwatch) -> CheckResult {
    check_with_family(target, SqlEngine::Postgres, "postgresql", "POSTGRESQL_OK", timeout, transport, sw).await
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::super::transport::{SqlConnectParams, SqlError};
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
        let target = SqlTarget { host: "db".to_string(), port: 5432, database: "app".to_string(), ..Default::default() };
        let mock = MockSql { result: Ok(()) };
        let result = check(&target, Duration::from_secs(5), &mock, &Stopwatch::start()).await;
        assert!(result.is_up());
        assert_eq!(result.reason, "POSTGRESQL_OK");
    }

    #[tokio::test]
    async fn database_not_found_maps_to_reason() {
        let target = SqlTarget { host: "db".to_string(), port: 5432, database: "app".to_string(), ..Default::default() };
        let mock = MockSql { result: Err(SqlError::DatabaseNotFound) };
        let result = check(&target, Duration::from_secs(5), &mock, &Stopwatch::start()).await;
        assert_eq!(result.reason, "DATABASE_NOT_FOUND");
    }
}
