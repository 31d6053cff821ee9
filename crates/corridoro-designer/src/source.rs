//! Drawing source and the derived corridor layer
//!
//! The editor mutates a [`DrawingSource`]; every mutation synchronously
//! notifies subscribed [`SourceListener`]s with the full feature set. The
//! [`CorridorLayer`] is such a listener: it rebuilds its corridor collection
//! from scratch and swaps it in, never patching the previous result.

use crate::corridor::CorridorSynthesizer;
use corridoro_core::{Feature, FeatureCollection, FeatureProperties, Geometry, LineStyle, Position};
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Feature collection shared between a producer and the renderer
pub type SharedFeatures = Arc<RwLock<FeatureCollection>>;

/// Unique identifier for a listener subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", &self.0.to_string()[..8])
    }
}

/// Stable handle of a feature inside a [`DrawingSource`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeatureKey(Uuid);

impl std::fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Receives the full feature set after every source mutation
pub trait SourceListener: Send + Sync {
    fn on_source_changed(&self, features: &FeatureCollection);
}

/// Editable set of drawn features
pub struct DrawingSource {
    features: Vec<(FeatureKey, Feature)>,
    listeners: Vec<(SubscriptionId, Arc<dyn SourceListener>)>,
    default_width: f64,
    default_style: LineStyle,
}

impl Default for DrawingSource {
    fn default() -> Self {
        Self::new(50.0, LineStyle::Curved)
    }
}

impl DrawingSource {
    /// Create an empty source; `default_width` and `default_style` are
    /// stamped on routes added through [`DrawingSource::add_drawn`].
    pub fn new(default_width: f64, default_style: LineStyle) -> Self {
        Self {
            features: Vec::new(),
            listeners: Vec::new(),
            default_width,
            default_style,
        }
    }

    pub fn subscribe(&mut self, listener: Arc<dyn SourceListener>) -> SubscriptionId {
        let id = SubscriptionId::new();
        self.listeners.push((id, listener));
        tracing::debug!("Subscription {} added", id);
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sub, _)| *sub != id);
        let removed = self.listeners.len() != before;
        if removed {
            tracing::debug!("Subscription {} removed", id);
        }
        removed
    }

    /// Snapshot of the current features, in insertion order
    pub fn features(&self) -> FeatureCollection {
        self.features.iter().map(|(_, f)| f.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn get(&self, key: FeatureKey) -> Option<&Feature> {
        self.features.iter().find(|(k, _)| *k == key).map(|(_, f)| f)
    }

    fn notify(&self) {
        if self.listeners.is_empty() {
            return;
        }
        let snapshot = self.features();
        for (_, listener) in &self.listeners {
            listener.on_source_changed(&snapshot);
        }
    }

    /// Add a feature; it gets a string id if it has none
    pub fn add(&mut self, mut feature: Feature) -> FeatureKey {
        let key = FeatureKey(Uuid::new_v4());
        if feature.id.is_none() {
            feature.id = Some(Value::from(key.to_string()));
        }
        self.features.push((key, feature));
        self.notify();
        key
    }

    /// Add a freshly drawn route with the default width and style
    pub fn add_drawn(&mut self, positions: Vec<Position>) -> FeatureKey {
        let feature = Feature::new(
            Geometry::LineString(positions),
            FeatureProperties::new(self.default_width, self.default_style),
        );
        self.add(feature)
    }

    /// Replace a feature's geometry (a move or vertex edit)
    pub fn replace_geometry(&mut self, key: FeatureKey, geometry: Geometry) -> bool {
        let Some((_, feature)) = self.features.iter_mut().find(|(k, _)| *k == key) else {
            return false;
        };
        feature.geometry = Some(geometry);
        self.notify();
        true
    }

    /// Replace a feature's properties
    pub fn set_properties(&mut self, key: FeatureKey, properties: FeatureProperties) -> bool {
        let Some((_, feature)) = self.features.iter_mut().find(|(k, _)| *k == key) else {
            return false;
        };
        feature.properties = properties;
        self.notify();
        true
    }

    pub fn remove(&mut self, key: FeatureKey) -> Option<Feature> {
        let index = self.features.iter().position(|(k, _)| *k == key)?;
        let (_, feature) = self.features.remove(index);
        self.notify();
        Some(feature)
    }

    pub fn clear(&mut self) {
        self.features.clear();
        self.notify();
    }
}

/// Corridor polygons derived from a drawing source
pub struct CorridorLayer {
    synthesizer: CorridorSynthesizer,
    output: SharedFeatures,
    revision: AtomicU64,
}

impl CorridorLayer {
    pub fn new(synthesizer: CorridorSynthesizer) -> Self {
        Self {
            synthesizer,
            output: Arc::new(RwLock::new(FeatureCollection::default())),
            revision: AtomicU64::new(0),
        }
    }

    /// Rebuild the corridor collection from `features` and replace the
    /// current one.
    pub fn recompute(&self, features: &FeatureCollection) {
        let corridors = self.synthesizer.synthesize(features);
        let count = corridors.len();
        *self.output.write() = corridors;
        let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(
            "Corridor layer recomputed: {} features -> {} corridor features (rev {})",
            features.len(),
            count,
            revision
        );
    }

    /// Shared handle to the output, for rendering
    pub fn output(&self) -> SharedFeatures {
        Arc::clone(&self.output)
    }

    pub fn snapshot(&self) -> FeatureCollection {
        self.output.read().clone()
    }

    /// Number of completed recomputes
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }
}

impl SourceListener for CorridorLayer {
    fn on_source_changed(&self, features: &FeatureCollection) {
        self.recompute(features);
    }
}

/// Mirrors the source into a shared collection, for rendering the drawing
/// itself
impl SourceListener for RwLock<FeatureCollection> {
    fn on_source_changed(&self, features: &FeatureCollection) {
        *self.write() = features.clone();
    }
}
