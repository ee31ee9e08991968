//! NotificationProvider / NotificationPolicy reconcilers (spec.md §3).
//! Providers validate their own shape; policies additionally resolve
//! `providerRef` against the cluster, since a policy pointing at a
//! nonexistent provider can never fire a real alert.

use async_trait::async_trait;
use kube::{Api, ResourceExt};

use crate::crd::{NotificationPolicy, NotificationProvider};
use crate::errors::Error;

use super::pipeline::{PipelineContext, Reconcilable};

#[async_trait]
impl Reconcilable for NotificationProvider {
    const FINALIZER: &'static str = "monitoring.yuptime.io/cleanup";

    fn validate(&self) -> Result<(), (String, String)> {
        if self.spec.provider_type.trim().is_empty() {
            return Err(("InvalidProvider".to_string(), "providerType must not be empty".to_string()));
        }
        if self.spec.url_secret_ref.name.trim().is_empty() || self.spec.url_secret_ref.key.trim().is_empty() {
            return Err(("InvalidProvider".to_string(), "urlSecretRef.name and urlSecretRef.key must not be empty".to_string()));
        }
        Ok(())
    }

    async fn apply(&self, _ctx: &PipelineContext<NotificationProvider>) -> crate::errors::Result<()> {
        Ok(())
    }
}

/// Runs the NotificationProvider controller until its watch stream ends.
pub async fn run_provider(client: kube::Client, scheduler: crate::scheduler::SchedulerHandle) {
    let api: kube::Api<NotificationProvider> = kube::Api::all(client.clone());
    let ctx = std::sync::Arc::new(PipelineContext { api, client, scheduler });
    super::pipeline::run_pipeline(ctx).await;
}

#[async_trait]
impl Reconcilable for NotificationPolicy {
    const FINALIZER: &'static str = "monitoring.yuptime.io/cleanup";

    fn validate(&self) -> Result<(), (String, String)> {
        if self.spec.provider_ref.trim().is_empty() {
            return Err(("InvalidPolicy".to_string(), "providerRef must not be empty".to_string()));
        }
        Ok(())
    }

    async fn apply(&self, ctx: &PipelineContext<NotificationPolicy>) -> crate::errors::Result<()> {
        let namespace = self.namespace().unwrap_or_default();
        let providers: Api<NotificationProvider> = Api::namespaced(ctx.client.clone(), &namespace);
        providers.get(&self.spec.provider_ref).await.map_err(|_| {
            Error::Validation(format!(
                "providerRef {} does not resolve to a NotificationProvider in namespace {namespace}",
                self.spec.provider_ref
            ))
        })?;
        Ok(())
    }
}

/// Runs the NotificationPolicy controller until its watch stream ends.
pub async fn run_policy(client: kube::Client, scheduler: crate::scheduler::SchedulerHandle) {
    let api: kube::Api<NotificationPolicy> = kube::Api::all(client.clone());
    let ctx = std::sync::Arc::new(PipelineContext { api, client, scheduler });
    super::pipeline::run_pipeline(ctx).await;
}

#[cfg(test)]
mod tests {
    use crate::crd::Selector;
    use crate::crd::SecretKeyRef;
    use crate::crd::notification::{NotificationPolicySpec, NotificationProviderSpec};

    use super::*;

    #[test]
    fn valid_provider_passes() {
        let provider = NotificationProvider::new(
            "pagerduty",
            NotificationProviderSpec {
                provider_type: "pagerduty".to_string(),
                url_secret_ref: SecretKeyRef { name: "pagerduty-creds".to_string(), key: "url".to_string() },
            },
        );
        assert!(provider.validate().is_ok());
    }

    #[test]
    fn provider_with_empty_type_is_rejected() {
        let provider = NotificationProvider::new(
            "pagerduty",
            NotificationProviderSpec {
                provider_type: String::new(),
                url_secret_ref: SecretKeyRef { name: "pagerduty-creds".to_string(), key: "url".to_string() },
            },
        );
        assert_eq!(provider.validate().unwrap_err().0, "InvalidProvider");
    }

    #[test]
    fn policy_with_empty_provider_ref_is_rejected() {
        let policy = NotificationPolicy::new(
            "default-policy",
            NotificationPolicySpec { selector: Selector::default(), provider_ref: String::new(), rate_limit_seconds: 300 },
        );
        assert_eq!(policy.validate().unwrap_err().0, "InvalidPolicy");
    }

    #[test]
    fn policy_with_provider_ref_passes_static_validation() {
        let policy = NotificationPolicy::new(
            "default-policy",
            NotificationPolicySpec { selector: Selector::default(), provider_ref: "pagerduty".to_string(), rate_limit_seconds: 300 },
        );
        assert!(policy.validate().is_ok());
    }
}
