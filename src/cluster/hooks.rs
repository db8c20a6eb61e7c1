//! Lifecycle hooks fired during a clustering pass.
//!
//! Hooks are user code. Whatever they do, returning an error or panicking,
//! the failure is logged and the pass carries on with the next hook.

use core::fmt;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};

use super::builder::Cluster;
use crate::error::HookError;

/// Result returned by hook callbacks.
pub type HookResult = std::result::Result<(), HookError>;

static NEXT_HOOK_SEQ: AtomicU64 = AtomicU64::new(0);

type ClusterCreatedFn = Box<dyn FnMut(&Cluster) -> HookResult>;
type ClustersReadyFn = Box<dyn FnMut(&[Cluster]) -> HookResult>;

/// Which lifecycle point a hook is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    /// Fired once per cluster, right after it is built.
    ClusterCreated,
    /// Fired once per pass with the complete cluster list.
    ClustersReady,
}

impl HookKind {
    fn as_str(self) -> &'static str {
        match self {
            HookKind::ClusterCreated => "cluster_created",
            HookKind::ClustersReady => "clusters_ready",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a registered hook, used to remove it.
///
/// Unique across all registries, so an id only ever removes the hook it was
/// issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId {
    kind: HookKind,
    seq: u64,
}

impl HookId {
    /// The lifecycle point this hook is attached to.
    pub fn kind(&self) -> HookKind {
        self.kind
    }
}

/// Two ordered hook lists, one per [`HookKind`].
#[derive(Default)]
pub struct HookRegistry {
    created: Vec<(HookId, ClusterCreatedFn)>,
    ready: Vec<(HookId, ClustersReadyFn)>,
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("cluster_created", &self.created.len())
            .field("clusters_ready", &self.ready.len())
            .finish()
    }
}

impl HookRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(kind: HookKind) -> HookId {
        HookId {
            kind,
            seq: NEXT_HOOK_SEQ.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Append a hook fired for every new cluster.
    pub fn add_on_cluster_created(
        &mut self,
        hook: impl FnMut(&Cluster) -> HookResult + 'static,
    ) -> HookId {
        let id = Self::allocate(HookKind::ClusterCreated);
        self.created.push((id, Box::new(hook)));
        id
    }

    /// Append a hook fired once the whole pass is done.
    pub fn add_on_clusters_ready(
        &mut self,
        hook: impl FnMut(&[Cluster]) -> HookResult + 'static,
    ) -> HookId {
        let id = Self::allocate(HookKind::ClustersReady);
        self.ready.push((id, Box::new(hook)));
        id
    }

    /// Remove a hook. Returns `false` (and does nothing) if it is not registered.
    pub fn remove(&mut self, id: HookId) -> bool {
        let before = self.len(id.kind);
        match id.kind {
            HookKind::ClusterCreated => self.created.retain(|(hid, _)| *hid != id),
            HookKind::ClustersReady => self.ready.retain(|(hid, _)| *hid != id),
        }
        self.len(id.kind) != before
    }

    /// Number of hooks of `kind`.
    pub fn len(&self, kind: HookKind) -> usize {
        match kind {
            HookKind::ClusterCreated => self.created.len(),
            HookKind::ClustersReady => self.ready.len(),
        }
    }

    /// Whether no hook of any kind is registered.
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.ready.is_empty()
    }

    /// Fire every cluster-created hook. Returns how many failed.
    pub fn fire_cluster_created(&mut self, cluster: &Cluster) -> usize {
        let mut failed = 0;
        for (id, hook) in &mut self.created {
            if !invoke_isolated(*id, || hook(cluster)) {
                failed += 1;
            }
        }
        failed
    }

    /// Fire every clusters-ready hook. Returns how many failed.
    pub fn fire_clusters_ready(&mut self, clusters: &[Cluster]) -> usize {
        let mut failed = 0;
        for (id, hook) in &mut self.ready {
            if !invoke_isolated(*id, || hook(clusters)) {
                failed += 1;
            }
        }
        failed
    }
}

/// Run one hook, logging instead of propagating any failure.
fn invoke_isolated(id: HookId, call: impl FnOnce() -> HookResult) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            tracing::error!(hook = id.seq, kind = %id.kind, error = %err, "hook failed");
            false
        }
        Err(payload) => {
            tracing::error!(
                hook = id.seq,
                kind = %id.kind,
                panic = panic_message(payload.as_ref()),
                "hook panicked"
            );
            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
