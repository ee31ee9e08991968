use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{Condition, Selector};

/// Recurring time span during which alerts for selected Monitors are
/// suppressed (spec.md §3).
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "monitoring.yuptime.io",
    version = "v1",
    kind = "MaintenanceWindow",
    plural = "maintenancewindows",
    status = "MaintenanceWindowStatus",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceWindowSpec {
    /// iCalendar RRULE string (spec.md §3).
    pub schedule: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtstart: Option<String>,

    pub duration_minutes: u32,

    #[serde(default)]
    pub selector: Selector,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceWindowStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}
