//! Construction-time configuration.

use serde::{Deserialize, Serialize};

use crate::cluster::engine::{ensure_positive, DEFAULT_DISTANCE};
use crate::error::{Error, Result};
use crate::geom::Extent;

/// Options for a [`ClusterSource`](crate::ClusterSource).
///
/// Everything except `distance` is metadata carried for the host (bounds,
/// projection code, attributions); the clustering pass does not read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Distance threshold in screen units. Multiplied by the resolution to
    /// get the search radius.
    pub distance: f64,
    /// Spatial bounds of the source.
    pub extent: Option<Extent>,
    /// Projection code, e.g. `"EPSG:3857"`.
    pub projection: Option<String>,
    /// Attribution strings shown alongside the data.
    pub attributions: Vec<String>,
    /// Whether the world wraps horizontally.
    pub wrap_x: bool,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            distance: DEFAULT_DISTANCE,
            extent: None,
            projection: None,
            attributions: Vec::new(),
            wrap_x: true,
        }
    }
}

impl ClusterConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the distance threshold.
    pub fn with_distance(mut self, distance: f64) -> Self {
        self.distance = distance;
        self
    }

    /// Set the spatial bounds.
    pub fn with_extent(mut self, extent: Extent) -> Self {
        self.extent = Some(extent);
        self
    }

    /// Set the projection code.
    pub fn with_projection(mut self, projection: impl Into<String>) -> Self {
        self.projection = Some(projection.into());
        self
    }

    /// Add an attribution.
    pub fn with_attribution(mut self, attribution: impl Into<String>) -> Self {
        self.attributions.push(attribution.into());
        self
    }

    /// Set horizontal wrapping.
    pub fn with_wrap_x(mut self, wrap_x: bool) -> Self {
        self.wrap_x = wrap_x;
        self
    }

    /// Check that the values are usable.
    pub fn validate(&self) -> Result<()> {
        ensure_positive("distance", self.distance)
    }

    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
