//! Geometry resolution traits.

use crate::error::{Error, Result};
use crate::feature::Feature;
use crate::geom::Point;

/// Maps a feature to the point used for distance and centroid computation.
///
/// Called several times per feature per pass, so implementations must be
/// cheap and return the same answer for the same feature. Returning
/// `Ok(None)` opts the feature out of clustering.
pub trait GeometryResolver {
    /// Resolve the clustering point of `feature`.
    fn resolve(&self, feature: &Feature) -> Result<Option<Point>>;
}

impl<F> GeometryResolver for F
where
    F: Fn(&Feature) -> Result<Option<Point>>,
{
    fn resolve(&self, feature: &Feature) -> Result<Option<Point>> {
        self(feature)
    }
}

/// Default resolver: the feature's geometry must already be a point.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointResolver;

impl GeometryResolver for PointResolver {
    fn resolve(&self, feature: &Feature) -> Result<Option<Point>> {
        match feature.geometry() {
            Some(geometry) => geometry
                .as_point()
                .map(Some)
                .ok_or(Error::UnsupportedGeometry {
                    feature: feature.id(),
                    kind: geometry.kind(),
                }),
            None => Err(Error::UnsupportedGeometry {
                feature: feature.id(),
                kind: "none",
            }),
        }
    }
}

/// Resolves any geometry to the center of its bounding extent.
///
/// Features without geometry, or whose geometry has no vertices, are skipped
/// rather than rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtentCenterResolver;

impl GeometryResolver for ExtentCenterResolver {
    fn resolve(&self, feature: &Feature) -> Result<Option<Point>> {
        let Some(geometry) = feature.geometry() else {
            return Ok(None);
        };
        let extent = geometry.extent();
        if extent.is_empty() {
            return Ok(None);
        }
        Ok(Some((extent.min + extent.max).scale(0.5)))
    }
}
