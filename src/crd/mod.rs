//! Custom-resource types for the `monitoring.yuptime.io/v1` API group
//! (spec.md §3, §6). One submodule per kind, grounded on the teacher's
//! `crd.rs` `#[derive(CustomResource)]` idiom.

pub mod common;
pub mod maintenance_window;
pub mod monitor;
pub mod notification;
pub mod silence;
pub mod status_page;

pub use common::{Condition, SecretKeyRef, Selector};
pub use maintenance_window::{MaintenanceWindow, MaintenanceWindowSpec, MaintenanceWindowStatus};
pub use monitor::{
    CheckState, DnsRecordType, DnsTarget, GrpcTarget, HttpTarget, K8sResourceKind, K8sTarget,
    LastResult, Monitor, MonitorSchedule, MonitorSpec, MonitorStatus, MonitorTarget, PingTarget,
    PushTarget, RedisTarget, SqlTarget, SteamTarget, SuccessCriteria, TcpTarget, TlsConfig,
    WebSocketTarget,
};
pub use notification::{
    NotificationPolicy, NotificationPolicySpec, NotificationPolicyStatus, NotificationProvider,
    NotificationProviderSpec, NotificationProviderStatus,
};
pub use silence::{Silence, SilenceSpec, SilenceStatus};
pub use status_page::{RollupState, StatusPage, StatusPageGroup, StatusPageSpec, StatusPageStatus, compute_rollup};
