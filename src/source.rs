//! Clustered view over a feature store.
//!
//! [`ClusterSource`] keeps one cached cluster list for the last resolution it
//! was asked for. It recomputes when the resolution changes or when told the
//! store changed, and publishes the result as its own collection.
//!
//! ```text
//! Uninitialized ──request(R)──▶ Computed(R) ──request(R)──▶ (cache hit)
//!                                  │  ▲
//!                request(R'≠R) /   │  │
//!                store changed     └──┘
//! ```
//!
//! Publication is all-or-nothing: a pass that fails leaves the previous
//! clusters and resolution in place.

use crate::cluster::{
    Cluster, ClusteringEngine, GeometryResolver, HookId, HookRegistry, HookResult, PointResolver,
};
use crate::config::ClusterConfig;
use crate::error::Result;
use crate::feature::Feature;
use crate::geom::Extent;
use crate::store::{ChangeListeners, FeatureStore, ListenerId};

/// Emitted to downstream listeners after the store changed and the
/// clusters were republished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceChanged {
    /// Publication counter after the change.
    pub revision: u64,
    /// Number of published clusters.
    pub clusters: usize,
}

/// Caching, self-refreshing clustered view of a [`FeatureStore`].
pub struct ClusterSource<S, R = PointResolver> {
    store: S,
    resolver: R,
    engine: ClusteringEngine,
    config: ClusterConfig,
    hooks: HookRegistry,
    resolution: Option<f64>,
    clusters: Vec<Cluster>,
    revision: u64,
    listeners: ChangeListeners<SourceChanged>,
}

impl<S: FeatureStore> ClusterSource<S, PointResolver> {
    /// Wrap `store`, clustering point geometries.
    pub fn new(store: S, config: ClusterConfig) -> Result<Self> {
        Self::with_resolver(store, config, PointResolver)
    }
}

impl<S: FeatureStore, R: GeometryResolver> ClusterSource<S, R> {
    /// Wrap `store` with a custom geometry resolver.
    pub fn with_resolver(store: S, config: ClusterConfig, resolver: R) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            resolver,
            engine: ClusteringEngine::new(config.distance),
            config,
            hooks: HookRegistry::new(),
            resolution: None,
            clusters: Vec::new(),
            revision: 0,
            listeners: ChangeListeners::new(),
        })
    }

    /// The wrapped store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The configuration this source was built with.
    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Distance threshold in screen units.
    pub fn distance(&self) -> f64 {
        self.engine.distance()
    }

    /// Resolution of the published clusters, `None` before the first pass.
    pub fn resolution(&self) -> Option<f64> {
        self.resolution
    }

    /// Published clusters, in seed order.
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Number of successful publications so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Published clusters materialised as plain features.
    pub fn cluster_features(&self) -> Vec<Feature> {
        self.clusters.iter().map(Cluster::to_feature).collect()
    }

    /// Published clusters whose centroid lies in `extent`.
    pub fn clusters_in_extent(&self, extent: &Extent) -> Vec<&Cluster> {
        self.clusters
            .iter()
            .filter(|c| extent.contains_point(&c.centroid()))
            .collect()
    }

    /// Ask for clusters covering `extent` at `resolution`.
    ///
    /// The load request always reaches the store first. Clusters are only
    /// recomputed when `resolution` differs from the cached one.
    pub fn request_features(&mut self, extent: &Extent, resolution: f64) -> Result<()> {
        self.store.load_features(extent, resolution);
        if self.resolution == Some(resolution) {
            tracing::trace!(resolution, "resolution unchanged, keeping cached clusters");
            return Ok(());
        }
        self.recompute(Some(resolution))
    }

    /// Recompute at the cached resolution and notify downstream listeners.
    ///
    /// Call after the store was modified behind this source's back.
    pub fn on_store_changed(&mut self) -> Result<()> {
        self.recompute(self.resolution)?;
        self.listeners.notify(&SourceChanged {
            revision: self.revision,
            clusters: self.clusters.len(),
        });
        Ok(())
    }

    /// Modify the store, then run [`on_store_changed`](Self::on_store_changed).
    pub fn update_store<T>(&mut self, update: impl FnOnce(&mut S) -> T) -> Result<T> {
        let value = update(&mut self.store);
        self.on_store_changed()?;
        Ok(value)
    }

    /// Register a downstream change listener.
    pub fn subscribe(&mut self, listener: impl FnMut(&SourceChanged) + 'static) -> ListenerId {
        self.listeners.subscribe(listener)
    }

    /// Remove a downstream change listener.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Add a hook fired for every cluster built by this source.
    pub fn add_on_cluster_created(
        &mut self,
        hook: impl FnMut(&Cluster) -> HookResult + 'static,
    ) -> HookId {
        self.hooks.add_on_cluster_created(hook)
    }

    /// Add a hook fired once per pass with all clusters.
    pub fn add_on_clusters_ready(
        &mut self,
        hook: impl FnMut(&[Cluster]) -> HookResult + 'static,
    ) -> HookId {
        self.hooks.add_on_clusters_ready(hook)
    }

    /// Remove a hook. No-op if it is not registered.
    pub fn remove_hook(&mut self, id: HookId) -> bool {
        self.hooks.remove(id)
    }

    /// The hook registry of this source.
    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    fn recompute(&mut self, resolution: Option<f64>) -> Result<()> {
        let outcome = self
            .engine
            .run(&self.store, &self.resolver, &mut self.hooks, resolution);
        match outcome {
            Ok(Some(clusters)) => {
                self.clusters = clusters;
                self.resolution = resolution;
                self.revision += 1;
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    requested = ?resolution,
                    kept = ?self.resolution,
                    "clustering pass failed, keeping previous clusters"
                );
                Err(err)
            }
        }
    }
}

impl<S, R> std::fmt::Debug for ClusterSource<S, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterSource")
            .field("distance", &self.engine.distance())
            .field("resolution", &self.resolution)
            .field("clusters", &self.clusters.len())
            .field("revision", &self.revision)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}
