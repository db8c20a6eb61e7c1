//! Feature storage contract and an in-memory reference store.
//!
//! The clustering pass only needs ordered enumeration and extent queries.
//! [`VecStore`] keeps features in insertion order and indexes their bounding
//! boxes in an `rstar` R-tree, so each window query is logarithmic rather
//! than a scan of the whole store.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rstar::{RTree, RTreeObject, AABB};

use crate::feature::{Feature, FeatureId};
use crate::geom::Extent;

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(0);

/// Change emitted by a [`FeatureStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    /// A batch of this many features was appended.
    Added(usize),
    /// All features were removed.
    Cleared,
}

/// Handle returned by [`ChangeListeners::subscribe`].
///
/// Ids are unique across every listener list in the process, so a handle
/// from one list never removes a listener from another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Ordered list of change callbacks.
pub struct ChangeListeners<E> {
    listeners: Vec<(ListenerId, Box<dyn FnMut(&E)>)>,
}

impl<E> ChangeListeners<E> {
    /// Create an empty listener list.
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Register a listener; it is called after every later change.
    pub fn subscribe(&mut self, listener: impl FnMut(&E) + 'static) -> ListenerId {
        let id = ListenerId(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed));
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Call every listener, in subscription order.
    pub fn notify(&mut self, event: &E) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl<E> Default for ChangeListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for ChangeListeners<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeListeners")
            .field("count", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

/// Storage the clustering pass reads from.
///
/// # Contract
///
/// - [`features`](FeatureStore::features) enumerates in a stable order.
/// - [`features_in_extent`](FeatureStore::features_in_extent) returns every
///   feature whose geometry intersects the extent; a point feature must match
///   any extent containing it.
/// - [`add_features`](FeatureStore::add_features) ignores a feature whose id
///   is already stored, so every stored feature has a distinct id.
pub trait FeatureStore {
    /// All features, in store order.
    fn features(&self) -> Vec<Arc<Feature>>;

    /// Features whose geometry intersects `extent`, in store order.
    fn features_in_extent(&self, extent: &Extent) -> Vec<Arc<Feature>>;

    /// Append a batch of features, skipping ids already present.
    fn add_features(&mut self, features: Vec<Feature>);

    /// Remove all features.
    fn clear(&mut self);

    /// Number of stored features.
    fn len(&self) -> usize;

    /// Whether the store holds no features.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make data for `extent` at `resolution` available.
    ///
    /// Stores that hold everything in memory need do nothing.
    fn load_features(&mut self, _extent: &Extent, _resolution: f64) {}

    /// Register a change listener.
    fn subscribe(&mut self, listener: Box<dyn FnMut(&StoreEvent)>) -> ListenerId;

    /// Remove a change listener.
    fn unsubscribe(&mut self, id: ListenerId) -> bool;
}

/// R-tree entry: a feature's bounding box and its position in store order.
#[derive(Debug, Clone, Copy, PartialEq)]
struct StoreEntry {
    slot: usize,
    bounds: AABB<[f64; 2]>,
}

impl RTreeObject for StoreEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.bounds
    }
}

/// Insertion-ordered in-memory store with an R-tree over feature bounds.
///
/// Features without a geometry, or with a geometry that has no vertices, are
/// stored and enumerated but never match an extent query.
pub struct VecStore {
    features: Vec<Arc<Feature>>,
    ids: HashSet<FeatureId>,
    index: RTree<StoreEntry>,
    listeners: ChangeListeners<StoreEvent>,
}

impl VecStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            features: Vec::new(),
            ids: HashSet::new(),
            index: RTree::new(),
            listeners: ChangeListeners::new(),
        }
    }

    /// Create a store holding `features` (no event is emitted).
    ///
    /// Later duplicates of an id are dropped.
    pub fn from_features(features: impl IntoIterator<Item = Feature>) -> Self {
        let mut store = Self::new();
        let entries: Vec<StoreEntry> = features
            .into_iter()
            .filter_map(|feature| store.push(feature))
            .collect();
        store.index = RTree::bulk_load(entries);
        store
    }

    /// Append one feature unless its id is taken. Returns the index entry to
    /// insert, if the feature has bounds.
    fn push(&mut self, feature: Feature) -> Option<StoreEntry> {
        if !self.ids.insert(feature.id()) {
            return None;
        }
        let slot = self.features.len();
        let bounds = feature.geometry().and_then(|g| g.extent().to_aabb());
        self.features.push(Arc::new(feature));
        bounds.map(|bounds| StoreEntry { slot, bounds })
    }
}

impl Default for VecStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for VecStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VecStore")
            .field("features", &self.features.len())
            .field("indexed", &self.index.size())
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}

impl FeatureStore for VecStore {
    fn features(&self) -> Vec<Arc<Feature>> {
        self.features.clone()
    }

    fn features_in_extent(&self, extent: &Extent) -> Vec<Arc<Feature>> {
        let Some(window) = extent.to_aabb() else {
            return Vec::new();
        };
        let mut slots: Vec<usize> = self
            .index
            .locate_in_envelope_intersecting(&window)
            .map(|entry| entry.slot)
            .collect();
        slots.sort_unstable();
        slots
            .into_iter()
            .map(|slot| Arc::clone(&self.features[slot]))
            .collect()
    }

    fn add_features(&mut self, features: Vec<Feature>) {
        let before = self.features.len();
        for feature in features {
            if let Some(entry) = self.push(feature) {
                self.index.insert(entry);
            }
        }
        let added = self.features.len() - before;
        self.listeners.notify(&StoreEvent::Added(added));
    }

    fn clear(&mut self) {
        self.features.clear();
        self.ids.clear();
        self.index = RTree::new();
        self.listeners.notify(&StoreEvent::Cleared);
    }

    fn len(&self) -> usize {
        self.features.len()
    }

    fn subscribe(&mut self, listener: Box<dyn FnMut(&StoreEvent)>) -> ListenerId {
        self.listeners.subscribe(listener)
    }

    fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }
}
