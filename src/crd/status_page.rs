use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::Condition;
use super::monitor::CheckState;

/// Publication surface: slug, groups, each group referencing a set of
/// Monitors (spec.md §3). The read/write HTTP API surface itself is an
/// external collaborator (spec.md §1); this module only provides the
/// CRD shape and the rollup *computation* consumed by that surface.
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "monitoring.yuptime.io",
    version = "v1",
    kind = "StatusPage",
    plural = "statuspages",
    status = "StatusPageStatus",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct StatusPageSpec {
    pub slug: String,
    pub groups: Vec<StatusPageGroup>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusPageGroup {
    pub name: String,
    pub monitor_refs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct StatusPageStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

/// Overall rollup state for a `GET /api/v1/status/:slug` response, computed
/// per request from the current Monitor statuses in cache (spec.md §6).
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RollupState {
    Up,
    Degraded,
    Down,
    Unknown,
}

/// Compute the overall rollup for a status page from each referenced
/// Monitor's last known state. `None` in `states` means the Monitor has no
/// `lastResult` yet.
pub fn compute_rollup(states: &[Option<CheckState>]) -> RollupState {
    if states.is_empty() || states.iter().all(|s| s.is_none()) {
        return RollupState::Unknown;
    }
    let total = states.len();
    let down = states.iter().filter(|s| matches!(s, Some(CheckState::Down))).count();
    if down == 0 {
        RollupState::Up
    } else if down == total {
        RollupState::Down
    } else {
        RollupState::Degraded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::CustomResourceExt;

    #[test]
    fn crd_metadata_matches_spec() {
        let crd = StatusPage::crd();
        assert_eq!(crd.spec.names.kind, "StatusPage");
        assert_eq!(crd.spec.names.plural, "statuspages");
    }

    #[test]
    fn rollup_all_up_is_up() {
        let states = vec![Some(CheckState::Up), Some(CheckState::Up)];
        assert_eq!(compute_rollup(&states), RollupState::Up);
    }

    #[test]
    fn rollup_all_down_is_down() {
        let states = vec![Some(CheckState::Down), Some(CheckState::Down)];
        assert_eq!(compute_rollup(&states), RollupState::Down);
    }

    #[test]
    fn rollup_mixed_is_degraded() {
        let states = vec![Some(CheckState::Up), Some(CheckState::Down)];
        assert_eq!(compute_rollup(&states), RollupState::Degraded);
    }

    #[test]
    fn rollup_no_results_is_unknown() {
        let states = vec![None, None];
        assert_eq!(compute_rollup(&states), RollupState::Unknown);
    }

    #[test]
    fn rollup_empty_group_is_unknown() {
        assert_eq!(compute_rollup(&[]), RollupState::Unknown);
    }
}
