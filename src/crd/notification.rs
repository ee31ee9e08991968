use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{Condition, SecretKeyRef, Selector};

/// Credentials and target URL for an external alert router (spec.md §3).
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "monitoring.yuptime.io",
    version = "v1",
    kind = "NotificationProvider",
    plural = "notificationproviders",
    status = "NotificationProviderStatus",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct NotificationProviderSpec {
    pub provider_type: String,
    pub url_secret_ref: SecretKeyRef,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NotificationProviderStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

/// Selector + provider reference + rate-limit window (spec.md §3).
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "monitoring.yuptime.io",
    version = "v1",
    kind = "NotificationPolicy",
    plural = "notificationpolicies",
    status = "NotificationPolicyStatus",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPolicySpec {
    #[serde(default)]
    pub selector: Selector,
    pub provider_ref: String,
    pub rate_limit_seconds: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPolicyStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::CustomResourceExt;

    #[test]
    fn provider_crd_metadata() {
        let crd = NotificationProvider::crd();
        assert_eq!(crd.spec.names.kind, "NotificationProvider");
    }

    #[test]
    fn policy_crd_metadata() {
        let crd = NotificationPolicy::crd();
        assert_eq!(crd.spec.names.kind, "NotificationPolicy");
    }

    #[test]
    fn policy_spec_round_trips() {
        let spec = NotificationPolicySpec {
            selector: Selector::default(),
            provider_ref: "pagerduty".to_string(),
            rate_limit_seconds: 300,
        };
        let json = serde_json::to_string(&spec).unwrap();
        let back: NotificationPolicySpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
    }
}
