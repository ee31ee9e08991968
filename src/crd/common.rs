use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Namespace+labels predicate used by `MaintenanceWindow` and `Silence` to
/// pick which Monitors they apply to (spec.md GLOSSARY: Selector).
///
/// `matchLabels` is flat per spec.md §9's Open Question resolution — the
/// source had both a flat and a nested schema; this spec fixes on flat.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Selector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_namespaces: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_labels: Option<BTreeMap<String, String>>,
}

impl Selector {
    /// True iff this selector selects the given namespace+labels.
    ///
    /// An empty selector (no namespaces, no labels) matches everything —
    /// mirrors Kubernetes' own empty-selector-matches-all convention.
    pub fn matches(&self, namespace: &str, labels: &BTreeMap<String, String>) -> bool {
        let ns_ok = self
            .match_namespaces
            .as_ref()
            .map(|ns| ns.iter().any(|n| n == namespace))
            .unwrap_or(true);

        let labels_ok = self
            .match_labels
            .as_ref()
            .map(|want| {
                want.iter()
                    .all(|(k, v)| labels.get(k).map(|have| have == v).unwrap_or(false))
            })
            .unwrap_or(true);

        ns_ok && labels_ok
    }
}

/// Standard Kubernetes-style status condition (spec.md GLOSSARY: Condition).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: String,
    pub reason: String,
    pub message: String,
    pub last_transition_time: String,
}

impl Condition {
    pub fn ready_true(observed_generation: Option<i64>, now: &str) -> Self {
        let _ = observed_generation;
        Condition {
            type_: "Ready".to_string(),
            status: "True".to_string(),
            reason: "ReconcileSucceeded".to_string(),
            message: "resource reconciled successfully".to_string(),
            last_transition_time: now.to_string(),
        }
    }

    pub fn ready_false(reason: &str, message: &str, now: &str) -> Self {
        Condition {
            type_: "Ready".to_string(),
            status: "False".to_string(),
            reason: reason.to_string(),
            message: message.to_string(),
            last_transition_time: now.to_string(),
        }
    }
}

/// Reference to a single key within a Kubernetes Secret.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SecretKeyRef {
    pub name: String,
    pub key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn empty_selector_matches_everything() {
        let sel = Selector::default();
        assert!(sel.matches("anything", &labels(&[])));
    }

    #[test]
    fn namespace_selector_rejects_other_namespaces() {
        let sel = Selector {
            match_namespaces: Some(vec!["prod".to_string()]),
            match_labels: None,
        };
        assert!(sel.matches("prod", &labels(&[])));
        assert!(!sel.matches("staging", &labels(&[])));
    }

    #[test]
    fn label_selector_requires_all_pairs_present() {
        let sel = Selector {
            match_namespaces: None,
            match_labels: Some(labels(&[("team", "sre"), ("tier", "critical")])),
        };
        assert!(sel.matches("ns", &labels(&[("team", "sre"), ("tier", "critical")])));
        assert!(!sel.matches("ns", &labels(&[("team", "sre")])));
        assert!(!sel.matches("ns", &labels(&[])));
    }

    #[test]
    fn combined_selector_requires_both() {
        let sel = Selector {
            match_namespaces: Some(vec!["prod".to_string()]),
            match_labels: Some(labels(&[("team", "sre")])),
        };
        assert!(sel.matches("prod", &labels(&[("team", "sre")])));
        assert!(!sel.matches("staging", &labels(&[("team", "sre")])));
        assert!(!sel.matches("prod", &labels(&[("team", "other")])));
    }
}
