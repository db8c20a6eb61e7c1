use thiserror::Error as ThisError;

use crate::feature::FeatureId;

/// Result alias for `geocluster`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a clustering pass.
///
/// Hook failures are not represented here: they never propagate. See
/// [`HookError`].
#[derive(Debug, Clone, PartialEq, ThisError)]
pub enum Error {
    /// The default resolver was given a feature whose geometry is not a point.
    #[error("feature {feature} has unsupported geometry '{kind}' (expected a point)")]
    UnsupportedGeometry {
        /// Offending feature.
        feature: FeatureId,
        /// Geometry kind found (`"none"` when the feature has no geometry).
        kind: &'static str,
    },

    /// Every candidate member of a prospective cluster lacked a point.
    #[error("cannot build a cluster: none of {candidates} candidate members resolved to a point")]
    EmptyCluster {
        /// Number of candidates handed to the builder.
        candidates: usize,
    },

    /// A neighbor query around a resolvable seed did not return anything.
    #[error("store returned no neighbors for seed feature {feature}")]
    StoreConsistency {
        /// Seed feature whose query came back empty.
        feature: FeatureId,
    },

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid parameter value.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Error message.
        message: &'static str,
    },
}

/// Failure reported by a user-supplied hook.
///
/// Caught and logged where the hook is invoked, never returned from a pass.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error("{0}")]
pub struct HookError(pub String);

impl HookError {
    /// Create a hook error from any message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<&str> for HookError {
    fn from(message: &str) -> Self {
        Self(message.to_owned())
    }
}

impl From<String> for HookError {
    fn from(message: String) -> Self {
        Self(message)
    }
}
