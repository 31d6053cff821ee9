//! Map layers
//!
//! A [`LayerStack`] is the ordered set of layers the map draws: tile layers
//! from an external provider, vector layers backed by shared feature
//! collections, and image layers created by a page import. Rendering a stack
//! produces one [`LayerDescriptor`] per canvas, which is all the compositor
//! ever sees.

use crate::raster::ImageSource;
use crate::surface::TileProvider;
use corridoro_core::CompositeError;
use corridoro_designer::SharedFeatures;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tiny_skia::{BlendMode, Pixmap, Transform};
use uuid::Uuid;

/// Canvas shared by every layer without a dedicated one
pub const DEFAULT_CANVAS: &str = "ol-layer";

/// 2D affine transform `x' = a*x + c*y + e`, `y' = b*x + d*y + f`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl AffineTransform {
    pub const fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }

    pub fn from_coefficients(m: [f64; 6]) -> Self {
        Self {
            a: m[0],
            b: m[1],
            c: m[2],
            d: m[3],
            e: m[4],
            f: m[5],
        }
    }

    pub fn coefficients(&self) -> [f64; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    /// Drawing transform; fails for non-finite or singular coefficients.
    pub fn to_skia(&self) -> Result<Transform, CompositeError> {
        let m = self.coefficients();
        if m.iter().any(|v| !v.is_finite()) {
            return Err(CompositeError::MalformedTransform(format!(
                "non-finite coefficient in {self}"
            )));
        }
        if self.determinant().abs() < f64::EPSILON {
            return Err(CompositeError::MalformedTransform(format!("singular {self}")));
        }
        Ok(Transform::from_row(
            self.a as f32,
            self.b as f32,
            self.c as f32,
            self.d as f32,
            self.e as f32,
            self.f as f32,
        ))
    }
}

impl fmt::Display for AffineTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "matrix({}, {}, {}, {}, {}, {})",
            self.a, self.b, self.c, self.d, self.e, self.f
        )
    }
}

impl FromStr for AffineTransform {
    type Err = CompositeError;

    /// Parse the CSS `matrix(a, b, c, d, e, f)` form
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || CompositeError::MalformedTransform(s.to_string());
        let inner = s
            .trim()
            .strip_prefix("matrix(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(malformed)?;

        let values = inner
            .split(',')
            .map(|v| v.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| malformed())?;
        let m: [f64; 6] = values.try_into().map_err(|_| malformed())?;
        if m.iter().any(|v| !v.is_finite()) {
            return Err(malformed());
        }
        Ok(Self::from_coefficients(m))
    }
}

/// How a layer is blended into the canvas it shares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompositeMode {
    #[default]
    SourceOver,
    /// Only draw where the canvas already has pixels
    SourceAtop,
}

impl CompositeMode {
    pub fn blend_mode(self) -> BlendMode {
        match self {
            Self::SourceOver => BlendMode::SourceOver,
            Self::SourceAtop => BlendMode::SourceAtop,
        }
    }
}

/// What a layer is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerRole {
    /// Dimmed background tiles
    TileBase,
    /// Full tiles, masked to the corridors
    TileOverlay,
    /// Features as drawn
    Drawing,
    /// Dissolved corridor polygons
    Corridor,
    /// Vertex markers shown while editing; never printed
    Sketch,
    /// Dimmed copy of an imported page
    ImportedBase,
    /// Imported page, masked to the corridors
    ImportedOverlay,
}

impl LayerRole {
    pub fn is_vector(self) -> bool {
        matches!(self, Self::Drawing | Self::Corridor | Self::Sketch)
    }
}

/// Paint used for a vector layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorStyle {
    /// Polygon fill, RGBA
    pub fill: Option<[u8; 4]>,
    /// Line color and width in pixels
    pub stroke: Option<([u8; 4], f32)>,
    /// Dash pattern for lines in pixels
    pub dash: Option<[f32; 2]>,
    /// Marker radius drawn at points and at every line vertex
    pub vertex_radius: Option<f32>,
    pub vertex_fill: [u8; 4],
}

impl VectorStyle {
    /// Solid white fill, the corridor look
    pub fn white_fill() -> Self {
        Self {
            fill: Some([255, 255, 255, 255]),
            stroke: None,
            dash: None,
            vertex_radius: None,
            vertex_fill: [255, 255, 255, 255],
        }
    }

    /// Dashed route and vertex markers shown while editing
    pub fn sketch() -> Self {
        Self {
            fill: None,
            stroke: Some(([255, 255, 255, 77], 2.0)),
            dash: Some([5.0, 5.0]),
            vertex_radius: Some(5.0),
            vertex_fill: [255, 0, 255, 77],
        }
    }
}

/// Data a layer draws
#[derive(Clone)]
pub enum LayerContent {
    Tiles(Arc<dyn TileProvider>),
    Features {
        features: SharedFeatures,
        style: VectorStyle,
    },
    Image(Arc<ImageSource>),
}

impl fmt::Debug for LayerContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tiles(_) => write!(f, "Tiles"),
            Self::Features { features, .. } => write!(f, "Features({})", features.read().len()),
            Self::Image(source) => write!(
                f,
                "Image({}x{})",
                source.raster.pixel_width, source.raster.pixel_height
            ),
        }
    }
}

/// Unique layer identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerId(Uuid);

impl LayerId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Layer({})", &self.0.to_string()[..8])
    }
}

/// A single map layer
#[derive(Debug, Clone)]
pub struct MapLayer {
    id: LayerId,
    pub name: String,
    pub role: LayerRole,
    pub content: LayerContent,
    pub visible: bool,
    pub opacity: f32,
    pub z_index: i32,
    pub composite: CompositeMode,
    /// Dedicated canvas; `None` shares [`DEFAULT_CANVAS`]
    pub canvas: Option<String>,
    /// Whether the layer's canvas ends up on the printed page
    pub printable: bool,
}

impl MapLayer {
    pub fn new(name: impl Into<String>, role: LayerRole, content: LayerContent) -> Self {
        Self {
            id: LayerId::new(),
            name: name.into(),
            role,
            content,
            visible: true,
            opacity: 1.0,
            z_index: 0,
            composite: CompositeMode::SourceOver,
            canvas: None,
            printable: true,
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }

    pub fn with_composite(mut self, composite: CompositeMode) -> Self {
        self.composite = composite;
        self
    }

    pub fn with_canvas(mut self, canvas: impl Into<String>) -> Self {
        self.canvas = Some(canvas.into());
        self
    }

    pub fn with_printable(mut self, printable: bool) -> Self {
        self.printable = printable;
        self
    }

    pub fn canvas_name(&self) -> &str {
        self.canvas.as_deref().unwrap_or(DEFAULT_CANVAS)
    }
}

/// Ordered collection of map layers
#[derive(Debug, Clone, Default)]
pub struct LayerStack {
    layers: Vec<MapLayer>,
}

impl LayerStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// The map as it starts: dimmed base tiles on their own canvas, drawn
    /// features and corridors filled white, the full tiles drawn only over
    /// them, and the editing sketch on top.
    pub fn default_map(
        tiles: Arc<dyn TileProvider>,
        drawing: SharedFeatures,
        corridors: SharedFeatures,
    ) -> Self {
        let mut stack = Self::new();
        stack.push(
            MapLayer::new("base", LayerRole::TileBase, LayerContent::Tiles(tiles.clone()))
                .with_opacity(0.1)
                .with_canvas("base"),
        );
        stack.push(MapLayer::new(
            "drawing",
            LayerRole::Drawing,
            LayerContent::Features {
                features: drawing.clone(),
                style: VectorStyle::white_fill(),
            },
        ));
        stack.push(MapLayer::new(
            "corridors",
            LayerRole::Corridor,
            LayerContent::Features {
                features: corridors,
                style: VectorStyle::white_fill(),
            },
        ));
        stack.push(
            MapLayer::new("tiles", LayerRole::TileOverlay, LayerContent::Tiles(tiles))
                .with_composite(CompositeMode::SourceAtop),
        );
        stack.push(
            MapLayer::new(
                "drawings",
                LayerRole::Sketch,
                LayerContent::Features {
                    features: drawing,
                    style: VectorStyle::sketch(),
                },
            )
            .with_z_index(10)
            .with_canvas("drawings")
            .with_printable(false),
        );
        stack
    }

    pub fn push(&mut self, layer: MapLayer) -> LayerId {
        let id = layer.id();
        self.layers.push(layer);
        id
    }

    pub fn remove(&mut self, id: LayerId) -> Option<MapLayer> {
        let index = self.layers.iter().position(|l| l.id() == id)?;
        Some(self.layers.remove(index))
    }

    pub fn get(&self, id: LayerId) -> Option<&MapLayer> {
        self.layers.iter().find(|l| l.id() == id)
    }

    pub fn get_mut(&mut self, id: LayerId) -> Option<&mut MapLayer> {
        self.layers.iter_mut().find(|l| l.id() == id)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Layers in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, MapLayer> {
        self.layers.iter()
    }

    pub fn with_role(&self, role: LayerRole) -> impl Iterator<Item = &MapLayer> {
        self.layers.iter().filter(move |l| l.role == role)
    }

    /// Apply `f` to every layer with `role`
    pub fn update_role(&mut self, role: LayerRole, mut f: impl FnMut(&mut MapLayer)) {
        self.layers.iter_mut().filter(|l| l.role == role).for_each(|l| f(l));
    }

    /// Layers in draw order: ascending z-index, ties by insertion order
    pub fn ordered(&self) -> Vec<&MapLayer> {
        let mut ordered: Vec<&MapLayer> = self.layers.iter().collect();
        ordered.sort_by_key(|l| l.z_index);
        ordered
    }

    /// Insert the layers of an imported page and re-order the stack around
    /// them.
    ///
    /// The dimmed copy becomes the bottom layer, the vectors sit above it,
    /// the imported page is drawn over the vectors only, and both tile
    /// layers are hidden. Layers from an earlier import are hidden too.
    /// Returns the ids of the (overlay, base) layers.
    pub fn insert_import(&mut self, source: Arc<ImageSource>, base_opacity: f32) -> (LayerId, LayerId) {
        self.update_role(LayerRole::ImportedBase, |l| l.visible = false);
        self.update_role(LayerRole::ImportedOverlay, |l| l.visible = false);

        let overlay = self.push(
            MapLayer::new(
                "imported",
                LayerRole::ImportedOverlay,
                LayerContent::Image(source.clone()),
            )
            .with_composite(CompositeMode::SourceAtop)
            .with_z_index(3),
        );
        let base = self.push(
            MapLayer::new("imported-base", LayerRole::ImportedBase, LayerContent::Image(source))
                .with_opacity(base_opacity)
                .with_z_index(0),
        );

        self.update_role(LayerRole::TileBase, |l| {
            l.z_index = 2;
            l.visible = false;
        });
        for role in [LayerRole::Drawing, LayerRole::Corridor] {
            self.update_role(role, |l| l.z_index = 1);
        }
        self.update_role(LayerRole::TileOverlay, |l| {
            l.z_index = 4;
            l.visible = false;
        });

        tracing::info!("Inserted imported page as {} over {}", overlay, base);
        (overlay, base)
    }
}

/// One rendered canvas as handed to the compositor
#[derive(Debug, Clone)]
pub struct LayerDescriptor {
    pub canvas: String,
    /// `None` while the canvas has zero extent
    pub raster: Option<Arc<Pixmap>>,
    pub transform: AffineTransform,
    /// Canvas opacity; unset means opaque
    pub opacity: Option<f32>,
    pub z_order: i32,
    pub visible: bool,
    pub printable: bool,
}

impl LayerDescriptor {
    pub fn new(canvas: impl Into<String>, raster: Pixmap) -> Self {
        Self {
            canvas: canvas.into(),
            raster: Some(Arc::new(raster)),
            transform: AffineTransform::identity(),
            opacity: None,
            z_order: 0,
            visible: true,
            printable: true,
        }
    }

    pub fn effective_opacity(&self) -> f32 {
        self.opacity.unwrap_or(1.0).clamp(0.0, 1.0)
    }

    /// Raster size, `(0, 0)` when there is none
    pub fn pixel_size(&self) -> (u32, u32) {
        self.raster
            .as_ref()
            .map(|r| (r.width(), r.height()))
            .unwrap_or((0, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GeoreferencedRaster;
    use crate::surface::NoTiles;
    use corridoro_core::FeatureCollection;
    use parking_lot::RwLock;

    fn shared() -> SharedFeatures {
        Arc::new(RwLock::new(FeatureCollection::default()))
    }

    fn image_source() -> Arc<ImageSource> {
        Arc::new(ImageSource {
            raster: GeoreferencedRaster::centered(10, 10, [0.0, 0.0], 300.0, 10000.0),
            pixels: Pixmap::new(10, 10).unwrap(),
        })
    }

    #[test]
    fn test_parse_css_matrix() {
        let t: AffineTransform = "matrix(1, 0, 0, 1, 10.5, -3)".parse().unwrap();
        assert_eq!(t.coefficients(), [1.0, 0.0, 0.0, 1.0, 10.5, -3.0]);
        let t: AffineTransform = " matrix(2,0,0,2,0,0) ".parse().unwrap();
        assert_eq!(t.a, 2.0);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for input in ["", "none", "matrix(1, 0, 0, 1)", "matrix(1,0,0,1,0,x)", "scale(2)", "matrix(1,0,0,1,0,NaN)"] {
            assert!(
                matches!(input.parse::<AffineTransform>(), Err(CompositeError::MalformedTransform(_))),
                "{input}"
            );
        }
    }

    #[test]
    fn test_display_round_trips() {
        let t = AffineTransform::from_coefficients([0.5, 0.0, 0.0, 0.5, 12.0, 8.0]);
        assert_eq!(t.to_string().parse::<AffineTransform>().unwrap(), t);
    }

    #[test]
    fn test_singular_transform_rejected() {
        let t = AffineTransform::from_coefficients([0.0, 0.0, 0.0, 0.0, 1.0, 1.0]);
        assert!(t.to_skia().is_err());
        assert!(AffineTransform::identity().to_skia().is_ok());
    }

    #[test]
    fn test_default_map_order() {
        let stack = LayerStack::default_map(Arc::new(NoTiles), shared(), shared());
        let roles: Vec<LayerRole> = stack.ordered().iter().map(|l| l.role).collect();
        assert_eq!(
            roles,
            vec![
                LayerRole::TileBase,
                LayerRole::Drawing,
                LayerRole::Corridor,
                LayerRole::TileOverlay,
                LayerRole::Sketch
            ]
        );
        let base = stack.with_role(LayerRole::TileBase).next().unwrap();
        assert_eq!(base.canvas_name(), "base");
        assert!((base.opacity - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_insert_import_reorders() {
        let mut stack = LayerStack::default_map(Arc::new(NoTiles), shared(), shared());
        let (overlay, base) = stack.insert_import(image_source(), 0.1);

        let visible: Vec<LayerRole> = stack
            .ordered()
            .iter()
            .filter(|l| l.visible)
            .map(|l| l.role)
            .collect();
        assert_eq!(
            visible,
            vec![
                LayerRole::ImportedBase,
                LayerRole::Drawing,
                LayerRole::Corridor,
                LayerRole::ImportedOverlay,
                LayerRole::Sketch
            ]
        );
        assert_eq!(stack.get(overlay).unwrap().composite, CompositeMode::SourceAtop);
        assert!((stack.get(base).unwrap().opacity - 0.1).abs() < 1e-6);
        // Tile layers are hidden, not removed
        assert_eq!(stack.len(), 7);
    }

    #[test]
    fn test_second_import_hides_first() {
        let mut stack = LayerStack::default_map(Arc::new(NoTiles), shared(), shared());
        let (first, first_base) = stack.insert_import(image_source(), 0.1);
        let (second, _) = stack.insert_import(image_source(), 0.1);
        assert!(!stack.get(first).unwrap().visible);
        assert!(!stack.get(first_base).unwrap().visible);
        assert!(stack.get(second).unwrap().visible);
    }
}
