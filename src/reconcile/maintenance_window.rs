//! MaintenanceWindow reconciler (spec.md §3). Validation is the whole job:
//! once the RRULE parses and the duration is sane, there is no further side
//! effect — `maintenance::is_in_maintenance_window` reads the spec directly
//! at alert-suppression time rather than caching anything here.

use async_trait::async_trait;

use crate::crd::MaintenanceWindow;
use crate::maintenance;

use super::pipeline::{PipelineContext, Reconcilable};

#[async_trait]
impl Reconcilable for MaintenanceWindow {
    const FINALIZER: &'static str = "monitoring.yuptime.io/cleanup";

    fn validate(&self) -> Result<(), (String, String)> {
        if self.spec.duration_minutes == 0 {
            return Err(("InvalidSchedule".to_string(), "durationMinutes must be greater than zero".to_string()));
        }
        maintenance::validate_rrule(&self.spec.schedule, self.spec.dtstart.as_deref())
            .map_err(|e| ("InvalidSchedule".to_string(), e))
    }

    async fn apply(&self, _ctx: &PipelineContext<MaintenanceWindow>) -> crate::errors::Result<()> {
        Ok(())
    }
}

/// Runs the MaintenanceWindow controller until its watch stream ends.
pub async fn run(client: kube::Client, scheduler: crate::scheduler::SchedulerHandle) {
    let api: kube::Api<MaintenanceWindow> = kube::Api::all(client.clone());
    let ctx = std::sync::Arc::new(PipelineContext { api, client, scheduler });
    super::pipeline::run_pipeline(ctx).await;
}
