use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{Condition, Selector};

/// One-shot suppression window (spec.md §3). Of the two schema variants seen
/// in the retrieved pack (startsAt/endsAt vs expiresAt-only), this spec uses
/// startsAt/endsAt per spec.md §9's explicit resolution.
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "monitoring.yuptime.io",
    version = "v1",
    kind = "Silence",
    plural = "silences",
    status = "SilenceStatus",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct SilenceSpec {
    pub starts_at: String,
    pub ends_at: String,

    #[serde(default)]
    pub selector: Selector,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SilenceStatus {
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
    fn crd_metadata_matches_spec() {
        let crd = Silence::crd();
        assert_eq!(crd.spec.names.kind, "Silence");
        assert_eq!(crd.spec.names.plural, "silences");
    }

    #[test]
    fn spec_requires_starts_and_ends_at() {
        let json = r#"{"startsAt":"2026-01-01T00:00:00Z","endsAt":"2026-01-01T01:00:00Z"}"#;
        let spec: SilenceSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.starts_at, "2026-01-01T00:00:00Z");
        assert_eq!(spec.ends_at, "2026-01-01T01:00:00Z");
    }
}
