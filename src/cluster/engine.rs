//! The greedy partition pass.
//!
//! # Algorithm
//!
//! Walk the store in order. Each feature not yet claimed becomes a *seed*:
//!
//! 1. Resolve the seed's point (skip the seed if the resolver opts out).
//! 2. Open a square window of half-width `distance * resolution` around it.
//! 3. Claim every unclaimed feature the store reports inside the window.
//! 4. Build a cluster at the mean of the claimed points.
//!
//! Claims are final: a feature is never released or moved to a closer
//! cluster later. The window stays anchored on the seed, so a cluster can
//! span up to twice the radius and its centroid may sit off the seed.
//!
//! # Complexity
//!
//! One extent query per cluster. With the R-tree backed
//! [`VecStore`](crate::store::VecStore) each query costs O(log n + m) for n
//! features and m hits.

use std::collections::HashSet;

use super::builder::{Cluster, ClusterBuilder};
use super::hooks::HookRegistry;
use super::traits::GeometryResolver;
use crate::error::{Error, Result};
use crate::feature::FeatureId;
use crate::geom::{Extent, Point};
use crate::store::FeatureStore;

/// Default distance threshold, in screen units.
pub const DEFAULT_DISTANCE: f64 = 20.0;

/// Greedy, seed-anchored clustering over a [`FeatureStore`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusteringEngine {
    /// Distance threshold in screen units.
    distance: f64,
}

impl ClusteringEngine {
    /// Create an engine with the given distance threshold.
    pub fn new(distance: f64) -> Self {
        Self { distance }
    }

    /// Set the distance threshold.
    pub fn with_distance(mut self, distance: f64) -> Self {
        self.distance = distance;
        self
    }

    /// Distance threshold in screen units.
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Search radius in map units at `resolution`.
    pub fn search_radius(&self, resolution: f64) -> f64 {
        self.distance * resolution
    }

    /// Neighbor window around `seed` at `resolution`.
    pub fn search_window(&self, seed: Point, resolution: f64) -> Extent {
        Extent::from_point(seed).buffer(self.search_radius(resolution))
    }

    /// Run one pass.
    ///
    /// Returns `Ok(None)` without touching the store when `resolution` is
    /// unset. Otherwise returns the clusters in seed order, after firing the
    /// hooks in `hooks`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidParameter`] for a non-positive distance or resolution.
    /// - [`Error::StoreConsistency`] if the store does not return the seed.
    /// - Any resolver or builder error.
    pub fn run<S, R>(
        &self,
        store: &S,
        resolver: &R,
        hooks: &mut HookRegistry,
        resolution: Option<f64>,
    ) -> Result<Option<Vec<Cluster>>>
    where
        S: FeatureStore + ?Sized,
        R: GeometryResolver + ?Sized,
    {
        let Some(resolution) = resolution else {
            tracing::trace!("resolution unset, skipping clustering pass");
            return Ok(None);
        };
        ensure_positive("distance", self.distance)?;
        ensure_positive("resolution", resolution)?;

        let radius = self.search_radius(resolution);
        let builder = ClusterBuilder::new(resolver);
        let features = store.features();

        let mut clustered: HashSet<FeatureId> = HashSet::with_capacity(features.len());
        let mut clusters = Vec::new();
        let mut skipped = 0usize;
        let mut hook_failures = 0usize;

        for feature in &features {
            if clustered.contains(&feature.id()) {
                continue;
            }
            let Some(seed) = resolver.resolve(feature)? else {
                skipped += 1;
                continue;
            };

            let window = Extent::from_point(seed).buffer(radius);
            let neighbors = store.features_in_extent(&window);
            if neighbors.is_empty() {
                return Err(Error::StoreConsistency {
                    feature: feature.id(),
                });
            }

            let claimed: Vec<_> = neighbors
                .into_iter()
                .filter(|n| clustered.insert(n.id()))
                .collect();

            let cluster = builder.build(claimed)?;
            tracing::trace!(
                seed = %feature.id(),
                members = cluster.len(),
                centroid = %cluster.centroid(),
                "cluster built"
            );
            hook_failures += hooks.fire_cluster_created(&cluster);
            clusters.push(cluster);
        }

        hook_failures += hooks.fire_clusters_ready(&clusters);

        tracing::debug!(
            resolution,
            radius,
            features = features.len(),
            clusters = clusters.len(),
            clustered = clustered.len(),
            skipped,
            hook_failures,
            "clustering pass complete"
        );

        Ok(Some(clusters))
    }
}

impl Default for ClusteringEngine {
    fn default() -> Self {
        Self::new(DEFAULT_DISTANCE)
    }
}

pub(crate) fn ensure_positive(name: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(Error::InvalidParameter {
            name,
            message: "must be finite",
        });
    }
    if value <= 0.0 {
        return Err(Error::InvalidParameter {
            name,
            message: "must be positive",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::traits::{ExtentCenterResolver, PointResolver};
    use crate::feature::Feature;
    use crate::geom::Geometry;
    use crate::store::{ListenerId, StoreEvent, VecStore};
    use proptest::prelude::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::sync::Arc;

    fn store_of(points: &[(f64, f64)]) -> VecStore {
        VecStore::from_features(points.iter().map(|&(x, y)| Feature::point(x, y)))
    }

    fn run(store: &VecStore, distance: f64, resolution: f64) -> Vec<Cluster> {
        ClusteringEngine::new(distance)
            .run(store, &PointResolver, &mut HookRegistry::new(), Some(resolution))
            .unwrap()
            .unwrap()
    }

    fn membership(clusters: &[Cluster]) -> Vec<Vec<FeatureId>> {
        clusters.iter().map(|c| c.member_ids().collect()).collect()
    }

    /// Store that forgets to return anything from extent queries.
    struct BlindStore(VecStore);

    impl FeatureStore for BlindStore {
        fn features(&self) -> Vec<Arc<Feature>> {
            self.0.features()
        }
        fn features_in_extent(&self, _extent: &Extent) -> Vec<Arc<Feature>> {
            Vec::new()
        }
        fn add_features(&mut self, features: Vec<Feature>) {
            self.0.add_features(features)
        }
        fn clear(&mut self) {
            self.0.clear()
        }
        fn len(&self) -> usize {
            self.0.len()
        }
        fn subscribe(&mut self, listener: Box<dyn FnMut(&StoreEvent)>) -> ListenerId {
            self.0.subscribe(listener)
        }
        fn unsubscribe(&mut self, id: ListenerId) -> bool {
            self.0.unsubscribe(id)
        }
    }

    #[test]
    fn test_two_near_one_far() {
        let store = store_of(&[(0.0, 0.0), (1.0, 0.0), (100.0, 100.0)]);
        let clusters = run(&store, 20.0, 1.0);

        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].len(), 2);
        assert_eq!(clusters[0].centroid(), Point::new(0.5, 0.0));
        assert_eq!(clusters[1].len(), 1);
        assert_eq!(clusters[1].centroid(), Point::new(100.0, 100.0));
    }

    #[test]
    fn test_empty_store_still_fires_ready_once() {
        let store = VecStore::new();
        let mut hooks = HookRegistry::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        hooks.add_on_clusters_ready(move |clusters| {
            sink.borrow_mut().push(clusters.len());
            Ok(())
        });

        let clusters = ClusteringEngine::default()
            .run(&store, &PointResolver, &mut hooks, Some(1.0))
            .unwrap()
            .unwrap();
        assert!(clusters.is_empty());
        assert_eq!(*seen.borrow(), vec![0]);
    }

    #[test]
    fn test_unset_resolution_is_noop() {
        let store = store_of(&[(0.0, 0.0)]);
        let mut hooks = HookRegistry::new();
        let fired = Rc::new(Cell::new(false));
        let flag = Rc::clone(&fired);
        hooks.add_on_clusters_ready(move |_| {
            flag.set(true);
            Ok(())
        });

        let out = ClusteringEngine::default()
            .run(&store, &PointResolver, &mut hooks, None)
            .unwrap();
        assert!(out.is_none());
        assert!(!fired.get());
    }

    #[test]
    fn test_invalid_parameters() {
        let store = store_of(&[(0.0, 0.0)]);
        let mut hooks = HookRegistry::new();
        let err = ClusteringEngine::new(0.0)
            .run(&store, &PointResolver, &mut hooks, Some(1.0))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "distance", .. }));

        let err = ClusteringEngine::default()
            .run(&store, &PointResolver, &mut hooks, Some(f64::NAN))
            .unwrap_err();
        assert_eq!(
            err,
            Error::InvalidParameter {
                name: "resolution",
                message: "must be finite"
            }
        );
    }

    #[test]
    fn test_window_is_anchored_on_seed() {
        // Points 15 apart, radius 20. The window around 0 reaches 15 but not
        // 30; claiming 15 does not widen it.
        let store = store_of(&[(0.0, 0.0), (15.0, 0.0), (30.0, 0.0), (45.0, 0.0)]);
        let clusters = run(&store, 20.0, 1.0);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].centroid(), Point::new(7.5, 0.0));
        assert_eq!(clusters[1].centroid(), Point::new(37.5, 0.0));
    }

    #[test]
    fn test_later_seed_cannot_steal_claimed_features() {
        // Seed 0 claims 10. Seed 25 would reach 10 but only gets 25 and 40.
        let store = store_of(&[(0.0, 0.0), (10.0, 0.0), (25.0, 0.0), (40.0, 0.0)]);
        let ids: Vec<_> = store.features().iter().map(|f| f.id()).collect();
        let clusters = run(&store, 15.0, 1.0);
        assert_eq!(
            membership(&clusters),
            vec![vec![ids[0], ids[1]], vec![ids[2], ids[3]]]
        );
    }

    #[test]
    fn test_resolution_scales_radius() {
        let engine = ClusteringEngine::new(20.0);
        assert_eq!(engine.search_radius(2.0), 2.0 * engine.search_radius(1.0));
        let window = engine.search_window(Point::origin(), 2.0);
        assert_eq!(window.width(), 80.0);

        let store = store_of(&[(0.0, 0.0), (30.0, 0.0), (200.0, 0.0)]);
        assert_eq!(run(&store, 20.0, 1.0).len(), 3);
        assert_eq!(run(&store, 20.0, 2.0).len(), 2);
        assert_eq!(run(&store, 20.0, 10.0).len(), 1);
    }

    #[test]
    fn test_unresolvable_features_are_dropped() {
        let resolver = |f: &Feature| -> Result<Option<Point>> {
            Ok(f.geometry().and_then(Geometry::as_point))
        };
        let store = VecStore::from_features(vec![
            Feature::point(0.0, 0.0),
            Feature::new(None),
            Feature::point(500.0, 0.0),
        ]);
        let bare = store.features()[1].id();
        let clusters = ClusteringEngine::default()
            .run(&store, &resolver, &mut HookRegistry::new(), Some(1.0))
            .unwrap()
            .unwrap();
        assert_eq!(clusters.len(), 2);
        assert!(clusters.iter().all(|c| !c.contains(bare)));
    }

    #[test]
    fn test_opted_out_neighbor_is_claimed_but_not_kept() {
        let resolver = |f: &Feature| -> Result<Option<Point>> {
            if f.get("skip").is_some() {
                Ok(None)
            } else {
                PointResolver.resolve(f)
            }
        };
        let store = VecStore::from_features(vec![
            Feature::point(0.0, 0.0),
            Feature::point(1.0, 0.0).with_property("skip", true),
            Feature::point(500.0, 0.0),
        ]);
        let opted_out = store.features()[1].id();
        let clusters = ClusteringEngine::default()
            .run(&store, &resolver, &mut HookRegistry::new(), Some(1.0))
            .unwrap()
            .unwrap();

        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].len(), 1);
        assert_eq!(clusters[0].centroid(), Point::origin());
        assert!(clusters.iter().all(|c| !c.contains(opted_out)));
        assert_eq!(clusters.iter().map(Cluster::len).sum::<usize>(), 2);
    }

    #[test]
    fn test_extent_center_skips_vertexless_seed() {
        let store = VecStore::from_features(vec![
            Feature::point(0.0, 0.0),
            Feature::new(Some(Geometry::LineString(vec![]))),
        ]);
        let clusters = ClusteringEngine::default()
            .run(&store, &ExtentCenterResolver, &mut HookRegistry::new(), Some(1.0))
            .unwrap()
            .unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].centroid(), Point::origin());
    }

    #[test]
    fn test_cloned_features_are_clustered_once() {
        let near = Feature::point(0.0, 0.0);
        let store = VecStore::from_features(vec![
            near.clone(),
            Feature::point(500.0, 0.0),
            near.clone().with_property("copy", true),
        ]);
        assert_eq!(store.len(), 2);
        let clusters = run(&store, 20.0, 1.0);
        let members: usize = clusters.iter().map(Cluster::len).sum();
        assert_eq!(members, store.len());
        assert!(clusters[0].contains(near.id()));
    }

    #[test]
    fn test_unsupported_geometry_aborts_pass() {
        let store = VecStore::from_features(vec![
            Feature::point(0.0, 0.0),
            Feature::new(Some(Geometry::LineString(vec![Point::new(900.0, 0.0)]))),
        ]);
        let err = ClusteringEngine::default()
            .run(&store, &PointResolver, &mut HookRegistry::new(), Some(1.0))
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedGeometry { kind: "linestring", .. }));
    }

    #[test]
    fn test_blind_store_is_a_consistency_error() {
        let store = BlindStore(store_of(&[(3.0, 3.0)]));
        let seed = store.features()[0].id();
        let err = ClusteringEngine::default()
            .run(&store, &PointResolver, &mut HookRegistry::new(), Some(1.0))
            .unwrap_err();
        assert_eq!(err, Error::StoreConsistency { feature: seed });
    }

    #[test]
    fn test_created_hook_fires_per_cluster_before_ready() {
        let store = store_of(&[(0.0, 0.0), (500.0, 0.0), (1000.0, 0.0)]);
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut hooks = HookRegistry::new();
        let created = Rc::clone(&log);
        hooks.add_on_cluster_created(move |c| {
            created.borrow_mut().push(format!("created {}", c.centroid().x));
            Ok(())
        });
        hooks.add_on_cluster_created(|_| Err("always fails".into()));
        let ready = Rc::clone(&log);
        hooks.add_on_clusters_ready(move |all| {
            ready.borrow_mut().push(format!("ready {}", all.len()));
            Ok(())
        });

        let clusters = ClusteringEngine::default()
            .run(&store, &PointResolver, &mut hooks, Some(1.0))
            .unwrap()
            .unwrap();
        assert_eq!(clusters.len(), 3);
        assert_eq!(
            *log.borrow(),
            vec!["created 0", "created 500", "created 1000", "ready 3"]
        );
    }

    proptest! {
        #[test]
        fn prop_every_feature_in_exactly_one_cluster(
            points in proptest::collection::vec((-500.0f64..500.0, -500.0f64..500.0), 0..120),
            distance in 1.0f64..50.0,
            resolution in 0.1f64..4.0,
        ) {
            let store = store_of(&points);
            let clusters = run(&store, distance, resolution);

            let mut seen = HashSet::new();
            for cluster in &clusters {
                prop_assert!(!cluster.is_empty());
                for id in cluster.member_ids() {
                    prop_assert!(seen.insert(id), "feature {} clustered twice", id);
                }
            }
            let all: HashSet<_> = store.features().iter().map(|f| f.id()).collect();
            prop_assert_eq!(seen, all);
        }

        #[test]
        fn prop_pass_is_deterministic(
            points in proptest::collection::vec((-100.0f64..100.0, -100.0f64..100.0), 0..60),
            resolution in 0.1f64..4.0,
        ) {
            let store = store_of(&points);
            let first = run(&store, 20.0, resolution);
            let second = run(&store, 20.0, resolution);
            prop_assert_eq!(membership(&first), membership(&second));
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_members_lie_within_seed_window(
            points in proptest::collection::vec((-200.0f64..200.0, -200.0f64..200.0), 1..60),
            resolution in 0.1f64..4.0,
        ) {
            let store = store_of(&points);
            let engine = ClusteringEngine::new(20.0);
            for cluster in run(&store, 20.0, resolution) {
                // Store order puts the seed first among its claims.
                let seed = cluster.members()[0].geometry().and_then(Geometry::as_point).unwrap();
                let window = engine.search_window(seed, resolution);
                for member in cluster.members() {
                    let p = member.geometry().and_then(Geometry::as_point).unwrap();
                    prop_assert!(window.contains_point(&p));
                }
            }
        }
    }
}
