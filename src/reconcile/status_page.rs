//! StatusPage reconciler (spec.md §3). Validation only — the rollup itself
//! (`crd::status_page::compute_rollup`) is computed per request by the
//! external read API, not cached on the status subresource.

use async_trait::async_trait;

use crate::crd::StatusPage;

use super::pipeline::{PipelineContext, Reconcilable};

#[async_trait]
impl Reconcilable for StatusPage {
    const FINALIZER: &'static str = "monitoring.yuptime.io/cleanup";

    fn validate(&self) -> Result<(), (String, String)> {
        if self.spec.slug.trim().is_empty() {
            return Err(("InvalidStatusPage".to_string(), "slug must not be empty".to_string()));
        }
        if self.spec.groups.is_empty() {
            return Err(("InvalidStatusPage".to_string(), "groups must not be empty".to_string()));
        }
        for group in &self.spec.groups {
            if group.name.trim().is_empty() {
                return Err(("InvalidStatusPage".to_string(), "group name must not be empty".to_string()));
            }
            if group.monitor_refs.is_empty() {
                return Err((
                    "InvalidStatusPage".to_string(),
                    format!("group {} must reference at least one monitor", group.name),
                ));
            }
        }
        Ok(())
    }

    async fn apply(&self, _ctx: &PipelineContext<StatusPage>) -> crate::errors::Result<()> {
        Ok(())
    }
}

/// Runs the StatusPage controller until its watch stream ends.
pub async fn run(client: kube::Client, scheduler: crate::scheduler::SchedulerHandle) {
    let api: kube::Api<StatusPage> = kube::Api::all(client.clone());
    let ctx = std::sync::Arc::new(PipelineContext { api, client, scheduler });
    super::pipeline::run_pipeline(ctx).await;
}

#[cfg(test)]
mod tests {
    use crate::crd::StatusPageGroup;
    use crate::crd::status_page::StatusPageSpec;

    use super::*;

    fn page(groups: Vec<StatusPageGroup>) -> StatusPage {
        StatusPage::new("public", StatusPageSpec { slug: "public".to_string(), groups })
    }

    #[test]
    fn valid_page_passes() {
        let p = page(vec![StatusPageGroup { name: "core".to_string(), monitor_refs: vec!["api-health".to_string()] }]);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn empty_groups_is_rejected() {
        let p = page(vec![]);
        assert_eq!(p.validate().unwrap_err().0, "InvalidStatusPage");
    }

    #[test]
    fn group_without_monitor_refs_is_rejected() {
        let p = page(vec![StatusPageGroup { name: "core".to_string(), monitor_refs: vec![] }]);
        assert_eq!(p.validate().unwrap_err().0, "InvalidStatusPage");
    }

    #[test]
    fn empty_slug_is_rejected() {
        let mut p = page(vec![StatusPageGroup { name: "core".to_string(), monitor_refs: vec!["api-health".to_string()] }]);
        p.spec.slug = String::new();
        assert_eq!(p.validate().unwrap_err().0, "InvalidStatusPage");
    }
}
