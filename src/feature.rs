//! Features: geometry-bearing records with free-form properties.

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::geom::{Geometry, Point};

static NEXT_FEATURE_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a feature.
///
/// Allocated once per [`Feature`] and never reused within a process, so it
/// can key the per-pass clustered-set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeatureId(u64);

impl FeatureId {
    /// Allocate a fresh identifier.
    pub fn next() -> Self {
        Self(NEXT_FEATURE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wrap a raw value. Callers are responsible for uniqueness.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A geometry plus arbitrary key/value properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    id: FeatureId,
    geometry: Option<Geometry>,
    #[serde(default)]
    properties: Map<String, Value>,
}

impl Feature {
    /// Create a feature with a freshly allocated id.
    pub fn new(geometry: Option<Geometry>) -> Self {
        Self {
            id: FeatureId::next(),
            geometry,
            properties: Map::new(),
        }
    }

    /// Create a point feature.
    pub fn point(x: f64, y: f64) -> Self {
        Self::new(Some(Geometry::Point(Point::new(x, y))))
    }

    /// Create a feature with an explicit id.
    pub fn with_id(id: FeatureId, geometry: Option<Geometry>) -> Self {
        Self {
            id,
            geometry,
            properties: Map::new(),
        }
    }

    /// Set a property, builder style.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Identity of this feature.
    pub fn id(&self) -> FeatureId {
        self.id
    }

    /// Native geometry, if any.
    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }

    /// Replace the geometry.
    pub fn set_geometry(&mut self, geometry: Option<Geometry>) {
        self.geometry = geometry;
    }

    /// Read a property.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Write a property, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.properties.insert(key.into(), value.into())
    }

    /// All properties.
    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }
}
