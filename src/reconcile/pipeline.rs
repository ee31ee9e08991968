//! Generic "validate → apply → patch status" driver shared by all six kinds
//! (spec.md §4.1). Grounded on `src/commands/reconcile.rs`'s single-kind
//! `reconcile()`/`error_policy()`/finalizer functions, generalized behind the
//! `Reconcilable` trait so the Controller loop, finalizer handling, and
//! status-condition patch are written once and instantiated per kind.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;
use kube::api::{Api, Patch, PatchParams};
use kube::runtime::controller::{Action, Controller};
use kube::{Client, Resource, ResourceExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::crd::Condition;
use crate::errors::Error;
use crate::scheduler::SchedulerHandle;

const REQUEUE_INTERVAL: Duration = Duration::from_secs(60);
const FIELD_MANAGER: &str = "yuptime-operator";

/// Shared state every per-kind reconciler needs: the `Api<K>` the Controller
/// itself watches with (reused rather than re-constructed, sidestepping any
/// question of which `kube::Resource::Scope` a generic `Api::namespaced::<K>`
/// call would need), and the scheduler handle so `monitor.rs` can drive check
/// scheduling without the generic driver knowing about it.
pub struct PipelineContext<K> {
    pub api: Api<K>,
    pub client: Client,
    pub scheduler: SchedulerHandle,
}

/// A CRD kind that can be driven by the generic pipeline. Each kind supplies
/// its own validation and side effects; the pipeline owns the finalizer
/// dance and the `Ready` condition patch.
#[async_trait::async_trait]
pub trait Reconcilable:
    Resource<DynamicType = ()> + Clone + Debug + DeserializeOwned + Serialize + Send + Sync + 'static
{
    /// Unique per kind, following the teacher's `devops.stochastic.io/cleanup`
    /// naming convention.
    const FINALIZER: &'static str;

    /// Rejects malformed specs before any side effect runs. `Err((reason,
    /// message))` patches `Ready=False` with that reason and message.
    fn validate(&self) -> Result<(), (String, String)>;

    /// Kind-specific side effects beyond the status patch (e.g. Monitor
    /// tells the scheduler to (re)schedule or cancel). Only called once
    /// `validate` has passed.
    async fn apply(&self, ctx: &PipelineContext<Self>) -> crate::errors::Result<()>;

    /// Kind-specific cleanup run once on deletion, before the finalizer is
    /// removed. Default is a no-op (most kinds own no external state).
    async fn on_delete(&self, ctx: &PipelineContext<Self>) -> crate::errors::Result<()> {
        let _ = ctx;
        Ok(())
    }
}

fn has_finalizer<K: Reconcilable>(obj: &K) -> bool {
    obj.meta()
        .finalizers
        .as_ref()
        .is_some_and(|f| f.iter().any(|s| s == K::FINALIZER))
}

async fn add_finalizer<K: Reconcilable>(obj: &K, api: &Api<K>) -> kube::Result<()> {
    let name = obj.name_any();
    let patch = serde_json::json!({ "metadata": { "finalizers": [K::FINALIZER] } });
    api.patch(&name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&patch)).await?;
    info!(name = %name, "finalizer_added");
    Ok(())
}

async fn remove_finalizer<K: Reconcilable>(obj: &K, api: &Api<K>) -> kube::Result<()> {
    let name = obj.name_any();
    let patch = serde_json::json!({ "metadata": { "finalizers": [] } });
    api.patch(&name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&patch)).await?;
    info!(name = %name, "finalizer_removed");
    Ok(())
}

/// Builds the `{"status": {...}}` merge patch for a successful reconcile.
pub fn patch_ready_true(observed_generation: Option<i64>) -> serde_json::Value {
    let now = Utc::now().to_rfc3339();
    serde_json::json!({
        "status": {
            "observedGeneration": observed_generation,
            "conditions": [Condition::ready_true(observed_generation, &now)],
        }
    })
}

/// Builds the `{"status": {...}}` merge patch for a failed validation or
/// apply step.
pub fn patch_ready_false(reason: &str, message: &str, observed_generation: Option<i64>) -> serde_json::Value {
    let now = Utc::now().to_rfc3339();
    serde_json::json!({
        "status": {
            "observedGeneration": observed_generation,
            "conditions": [Condition::ready_false(reason, message, &now)],
        }
    })
}

async fn reconcile<K: Reconcilable>(obj: Arc<K>, ctx: Arc<PipelineContext<K>>) -> Result<Action, Error> {
    let name = obj.name_any();
    let namespace = obj.meta().namespace.clone().unwrap_or_default();
    let generation = obj.meta().generation;

    if obj.meta().deletion_timestamp.is_some() {
        if has_finalizer(&obj) {
            obj.on_delete(&ctx).await?;
            remove_finalizer(&obj, &ctx.api).await?;
        }
        return Ok(Action::await_change());
    }

    if !has_finalizer(&obj) {
        add_finalizer(&obj, &ctx.api).await?;
    }

    let status_patch = match obj.validate() {
        Err((reason, message)) => {
            warn!(name = %name, namespace = %namespace, reason = %reason, "reconcile_validation_failed");
            patch_ready_false(&reason, &message, generation)
        }
        Ok(()) => match obj.apply(&ctx).await {
            Ok(()) => patch_ready_true(generation),
            Err(e) => {
                warn!(name = %name, namespace = %namespace, error = %e, "reconcile_apply_failed");
                patch_ready_false("ReconcileFailed", &e.to_string(), generation)
            }
        },
    };

    ctx.api
        .patch_status(&name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&status_patch))
        .await?;

    info!(name = %name, namespace = %namespace, "reconcile_done");
    Ok(Action::requeue(REQUEUE_INTERVAL))
}

fn error_policy<K: Reconcilable>(_obj: Arc<K>, error: &Error, _ctx: Arc<PipelineContext<K>>) -> Action {
    warn!(error = %error, "reconcile_error");
    Action::requeue(Duration::from_secs(30))
}

/// Runs the Controller loop for kind `K` until its watch stream ends (which,
/// barring a cluster-level disconnect, is never — callers race this against
/// a shutdown signal the same way `commands/reconcile.rs::run` races its
/// controller against Ctrl+C).
pub async fn run_pipeline<K: Reconcilable>(ctx: Arc<PipelineContext<K>>) {
    let api = ctx.api.clone();
    Controller::new(api, Default::default())
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            if let Err(e) = res {
                warn!(error = %e, "reconcile_dispatch_error");
            }
        })
        .await;
}
