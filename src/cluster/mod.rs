//! Resolution-scaled point clustering.
//!
//! Groups features that sit close together on screen and replaces each
//! group with a single [`Cluster`] at the group's centroid.
//!
//! ## Pieces
//!
//! | Type | Role |
//! |------|------|
//! | [`GeometryResolver`] | Feature → point used for distance and centroid |
//! | [`ClusterBuilder`] | Members → cluster at their mean point |
//! | [`HookRegistry`] | Callbacks fired per cluster and per pass |
//! | [`ClusteringEngine`] | The greedy partition pass |
//!
//! ## Distance
//!
//! The threshold is configured in screen units and multiplied by the map
//! resolution (map units per screen unit), so zooming out merges more
//! features:
//!
//! ```text
//! radius = distance × resolution
//! ```
//!
//! The search window is a square around the *seed* feature, not a circle
//! around the evolving centroid. A cluster's members are therefore within
//! `radius` of its seed on each axis, but can be further than `radius` from
//! one another or from the published centroid.
//!
//! ## Usage
//!
//! ```rust
//! use geocluster::cluster::{ClusteringEngine, HookRegistry, PointResolver};
//! use geocluster::{Feature, Point, VecStore};
//!
//! let store = VecStore::from_features(vec![
//!     Feature::point(0.0, 0.0),
//!     Feature::point(1.0, 0.0),
//!     Feature::point(100.0, 100.0),
//! ]);
//!
//! let clusters = ClusteringEngine::new(20.0)
//!     .run(&store, &PointResolver, &mut HookRegistry::new(), Some(1.0))
//!     .unwrap()
//!     .unwrap();
//!
//! assert_eq!(clusters.len(), 2);
//! assert_eq!(clusters[0].centroid(), Point::new(0.5, 0.0));
//! ```

mod builder;
pub(crate) mod engine;
mod hooks;
mod traits;

pub use builder::{Cluster, ClusterBuilder, MEMBERS_PROPERTY};
pub use engine::{ClusteringEngine, DEFAULT_DISTANCE};
pub use hooks::{HookId, HookKind, HookRegistry, HookResult};
pub use traits::{ExtentCenterResolver, GeometryResolver, PointResolver};
