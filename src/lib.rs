//! # geocluster
//!
//! Greedy point clustering for map views: group features that sit within a
//! resolution-scaled distance of each other and publish one aggregate
//! feature per group, positioned at the group's centroid.
//!
//! The [`ClusterSource`] façade wraps a [`FeatureStore`], caches the clusters
//! for the current resolution, and recomputes when the resolution or the
//! store changes. The algorithm itself lives in [`cluster`].

pub mod cluster;
pub mod config;
/// Error types used across `geocluster`.
pub mod error;
pub mod feature;
pub mod geom;
pub mod source;
pub mod store;


pub use cluster::{
    Cluster, ClusterBuilder, ClusteringEngine, ExtentCenterResolver, GeometryResolver, HookId,
    HookKind, HookRegistry, HookResult, PointResolver,
};
pub use config::ClusterConfig;
pub use error::{Error, HookError, Result};
pub use feature::{Feature, FeatureId};
pub use geom::{Extent, Geometry, Point};
pub use source::{ClusterSource, SourceChanged};
pub use store::{ChangeListeners, FeatureStore, ListenerId, StoreEvent, VecStore};
