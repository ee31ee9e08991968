//! Monitor reconciler (spec.md §3/§4.1/§4.2). Validation enforces the schema
//! invariants the scheduler relies on; the only side effect is telling the
//! scheduler to (re)schedule or cancel checks — the actual check execution
//! lives entirely in `scheduler.rs`/`jobs.rs`/`checkers::dispatch`.

use async_trait::async_trait;

use crate::crd::Monitor;
use crate::crd::monitor::{MIN_INTERVAL_SECONDS, MonitorTarget};
use crate::scheduler::MonitorId;

use super::pipeline::{PipelineContext, Reconcilable};

fn non_empty(field: &str, value: &str) -> Result<(), (String, String)> {
    if value.trim().is_empty() {
        Err(("InvalidTarget".to_string(), format!("{field} must not be empty")))
    } else {
        Ok(())
    }
}

fn non_zero_port(field: &str, port: u16) -> Result<(), (String, String)> {
    if port == 0 {
        Err(("InvalidTarget".to_string(), format!("{field} must be a non-zero port")))
    } else {
        Ok(())
    }
}

fn validate_target(target: &MonitorTarget) -> Result<(), (String, String)> {
    match target {
        MonitorTarget::Http(t) | MonitorTarget::Keyword(t) => non_empty("url", &t.url),
        MonitorTarget::JsonQuery(t) => {
            non_empty("url", &t.http.url)?;
            non_empty("path", &t.path)
        }
        MonitorTarget::Tcp(t) => {
            non_empty("host", &t.host)?;
            non_zero_port("port", t.port)
        }
        MonitorTarget::Dns(t) => non_empty("name", &t.name),
        MonitorTarget::Ping(t) => non_empty("host", &t.host),
        MonitorTarget::Websocket(t) => non_empty("url", &t.url),
        MonitorTarget::Push(_) | MonitorTarget::Docker(_) => Ok(()),
        MonitorTarget::Steam(t) => {
            non_empty("host", &t.host)?;
            non_zero_port("port", t.port)
        }
        MonitorTarget::Grpc(t) => {
            non_empty("host", &t.host)?;
            non_zero_port("port", t.port)
        }
        MonitorTarget::Mysql(t) | MonitorTarget::Postgresql(t) => {
            non_empty("host", &t.host)?;
            non_zero_port("port", t.port)?;
            non_empty("database", &t.database)
        }
        MonitorTarget::Redis(t) => {
            non_empty("host", &t.host)?;
            non_zero_port("port", t.port)
        }
        MonitorTarget::K8s(t) => {
            non_empty("namespace", &t.namespace)?;
            non_empty("name", &t.name)
        }
    }
}

#[async_trait]
impl Reconcilable for Monitor {
    const FINALIZER: &'static str = "monitoring.yuptime.io/cleanup";

    fn validate(&self) -> Result<(), (String, String)> {
        if self.spec.schedule.interval_seconds < MIN_INTERVAL_SECONDS {
            return Err((
                "InvalidSchedule".to_string(),
                format!(
                    "intervalSeconds must be at least {MIN_INTERVAL_SECONDS}, got {}",
                    self.spec.schedule.interval_seconds
                ),
            ));
        }
        if self.spec.schedule.timeout_seconds == 0 {
            return Err(("InvalidSchedule".to_string(), "timeoutSeconds must be greater than zero".to_string()));
        }
        if self.spec.schedule.timeout_seconds as u32 > self.spec.schedule.interval_seconds {
            return Err((
                "InvalidSchedule".to_string(),
                "timeoutSeconds must not exceed intervalSeconds".to_string(),
            ));
        }
        validate_target(&self.spec.target)
    }

    async fn apply(&self, ctx: &PipelineContext<Monitor>) -> crate::errors::Result<()> {
        if self.spec.enabled {
            ctx.scheduler.launch(self.clone()).await;
        } else {
            ctx.scheduler.cancel(MonitorId::of(self)).await;
        }
        Ok(())
    }

    async fn on_delete(&self, ctx: &PipelineContext<Monitor>) -> crate::errors::Result<()> {
        ctx.scheduler.cancel(MonitorId::of(self)).await;
        Ok(())
    }
}

/// Runs the Monitor controller until its watch stream ends.
pub async fn run(client: kube::Client, scheduler: crate::scheduler::SchedulerHandle) {
    let api: kube::Api<Monitor> = kube::Api::all(client.clone());
    let ctx = std::sync::Arc::new(PipelineContext { api, client, scheduler });
    super::pipeline::run_pipeline(ctx).await;
}
