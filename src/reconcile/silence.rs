//! Silence reconciler (spec.md §3). Validation only: `startsAt` must parse
//! and precede `endsAt`. Like MaintenanceWindow, the spec is read directly
//! by `maintenance::is_silenced` at suppression time, not cached here.

use async_trait::async_trait;
use chrono::DateTime;

use crate::crd::Silence;

use super::pipeline::{PipelineContext, Reconcilable};

#[async_trait]
impl Reconcilable for Silence {
    const FINALIZER: &'static str = "monitoring.yuptime.io/cleanup";

    fn validate(&self) -> Result<(), (String, String)> {
        let starts = DateTime::parse_from_rfc3339(&self.spec.starts_at)
            .map_err(|e| ("InvalidTimeRange".to_string(), format!("invalid startsAt: {e}")))?;
        let ends = DateTime::parse_from_rfc3339(&self.spec.ends_at)
            .map_err(|e| ("InvalidTimeRange".to_string(), format!("invalid endsAt: {e}")))?;
        if starts >= ends {
            return Err(("InvalidTimeRange".to_string(), "startsAt must be before endsAt".to_string()));
        }
        Ok(())
    }

    async fn apply(&self, _ctx: &PipelineContext<Silence>) -> crate::errors::Result<()> {
        Ok(())
    }
}

/// Runs the Silence controller until its watch stream ends.
pub async fn run(client: kube::Client, scheduler: crate::scheduler::SchedulerHandle) {
    let api: kube::Api<Silence> = kube::Api::all(client.clone());
    let ctx = std::sync::Arc::new(PipelineContext { api, client, scheduler });
    super::pipeline::run_pipeline(ctx).await;
}
