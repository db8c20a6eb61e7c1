//! Aggregate features built from groups of members.

use std::sync::Arc;

use serde_json::Value;

use super::traits::GeometryResolver;
use crate::error::{Error, Result};
use crate::feature::{Feature, FeatureId};
use crate::geom::{Geometry, Point};

/// Property under which a materialised cluster lists its members.
pub const MEMBERS_PROPERTY: &str = "members";

/// A synthetic feature standing in for a group of members.
///
/// Positioned at the arithmetic mean of the members' resolved points.
/// Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    centroid: Point,
    members: Vec<Arc<Feature>>,
}

impl Cluster {
    /// Centroid of the member points.
    pub fn centroid(&self) -> Point {
        self.centroid
    }

    /// The centroid as a geometry.
    pub fn geometry(&self) -> Geometry {
        Geometry::Point(self.centroid)
    }

    /// Grouped features, in the order the store returned them.
    pub fn members(&self) -> &[Arc<Feature>] {
        &self.members
    }

    /// Number of members (at least 1).
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether there are no members. Built clusters always have one.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Ids of the members, in order.
    pub fn member_ids(&self) -> impl Iterator<Item = FeatureId> + '_ {
        self.members.iter().map(|m| m.id())
    }

    /// Whether `id` is one of the members.
    pub fn contains(&self, id: FeatureId) -> bool {
        self.members.iter().any(|m| m.id() == id)
    }

    /// Materialise as a plain point feature whose `members` property holds
    /// the member ids.
    pub fn to_feature(&self) -> Feature {
        let ids: Vec<Value> = self.member_ids().map(|id| Value::from(id.get())).collect();
        Feature::new(Some(self.geometry())).with_property(MEMBERS_PROPERTY, ids)
    }
}

/// Builds [`Cluster`]s using a [`GeometryResolver`].
#[derive(Debug, Clone, Copy)]
pub struct ClusterBuilder<'a, R: ?Sized> {
    resolver: &'a R,
}

impl<'a, R: GeometryResolver + ?Sized> ClusterBuilder<'a, R> {
    /// Create a builder resolving member points with `resolver`.
    pub fn new(resolver: &'a R) -> Self {
        Self { resolver }
    }

    /// Build a cluster from `members`.
    ///
    /// Members the resolver skips are dropped before the centroid is taken.
    /// Fails with [`Error::EmptyCluster`] if nothing is left, and propagates
    /// resolver errors.
    pub fn build(&self, members: Vec<Arc<Feature>>) -> Result<Cluster> {
        let candidates = members.len();
        let mut sum = Point::origin();
        let mut kept = Vec::with_capacity(candidates);

        for member in members {
            if let Some(point) = self.resolver.resolve(&member)? {
                sum += point;
                kept.push(member);
            }
        }

        if kept.is_empty() {
            return Err(Error::EmptyCluster { candidates });
        }

        Ok(Cluster {
            centroid: sum / kept.len() as f64,
            members: kept,
        })
    }
}
