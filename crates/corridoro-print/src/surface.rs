//! Rendering surfaces
//!
//! [`RenderSurface`] is what the exporter drives: it owns the view size and
//! resolution, renders asynchronously and reports completion once per
//! request, and exposes its canvases as [`LayerDescriptor`]s.
//! [`OffscreenMap`] is the in-process implementation backed by tiny-skia.

use crate::layer::{LayerContent, LayerDescriptor, LayerStack, MapLayer, VectorStyle};
use corridoro_core::{Feature, Geometry, Position, Projection};
use std::sync::Arc;
use tiny_skia::{
    FillRule, FilterQuality, Paint, PathBuilder, Pixmap, PixmapPaint, Stroke, StrokeDash, Transform,
};
use tokio::sync::oneshot;
use tracing::{debug, trace};

/// Source of base map imagery for a view
pub trait TileProvider: Send + Sync {
    /// Raster covering `extent` (`[min_x, min_y, max_x, max_y]`) at
    /// `width` x `height` pixels, or `None` when nothing is available.
    fn render(&self, extent: [f64; 4], width: u32, height: u32) -> Option<Pixmap>;
}

/// Provider with no imagery
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTiles;

impl TileProvider for NoTiles {
    fn render(&self, _extent: [f64; 4], _width: u32, _height: u32) -> Option<Pixmap> {
        None
    }
}

/// Editing interactions attached to a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractionSet {
    pub draw: bool,
    pub modify: bool,
    pub snap: bool,
}

impl InteractionSet {
    pub const fn enabled() -> Self {
        Self {
            draw: true,
            modify: true,
            snap: true,
        }
    }

    pub const fn disabled() -> Self {
        Self {
            draw: false,
            modify: false,
            snap: false,
        }
    }

    pub fn any_enabled(&self) -> bool {
        self.draw || self.modify || self.snap
    }
}

impl Default for InteractionSet {
    fn default() -> Self {
        Self::enabled()
    }
}

/// A map view that can be resized and rendered
pub trait RenderSurface: Send {
    /// Size in pixels
    fn size(&self) -> (u32, u32);
    fn set_size(&mut self, size: (u32, u32));
    /// Map units per pixel
    fn resolution(&self) -> f64;
    fn set_resolution(&mut self, resolution: f64);
    fn center(&self) -> Position;
    fn projection(&self) -> Arc<dyn Projection>;
    fn interactions(&self) -> InteractionSet;
    fn set_interactions(&mut self, interactions: InteractionSet);
    /// Start a render; the receiver resolves once it is complete.
    fn request_render(&mut self) -> oneshot::Receiver<()>;
    /// Canvases from the last completed render
    fn layers(&self) -> Vec<LayerDescriptor>;
}

/// In-process map surface
pub struct OffscreenMap {
    size: (u32, u32),
    resolution: f64,
    center: Position,
    projection: Arc<dyn Projection>,
    stack: LayerStack,
    interactions: InteractionSet,
    rendered: Vec<LayerDescriptor>,
}

impl OffscreenMap {
    pub fn new(
        stack: LayerStack,
        center: Position,
        resolution: f64,
        size: (u32, u32),
        projection: Arc<dyn Projection>,
    ) -> Self {
        Self {
            size,
            resolution,
            center,
            projection,
            stack,
            interactions: InteractionSet::enabled(),
            rendered: Vec::new(),
        }
    }

    pub fn stack(&self) -> &LayerStack {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut LayerStack {
        &mut self.stack
    }

    pub fn set_center(&mut self, center: Position) {
        self.center = center;
    }

    /// Visible extent `[min_x, min_y, max_x, max_y]`
    pub fn extent(&self) -> [f64; 4] {
        let half_w = self.size.0 as f64 * self.resolution / 2.0;
        let half_h = self.size.1 as f64 * self.resolution / 2.0;
        [
            self.center[0] - half_w,
            self.center[1] - half_h,
            self.center[0] + half_w,
            self.center[1] + half_h,
        ]
    }

    fn view(&self) -> ViewMapping {
        let [min_x, _, _, max_y] = self.extent();
        ViewMapping {
            min_x,
            max_y,
            resolution: self.resolution,
        }
    }

    /// Render every visible layer into its canvas.
    ///
    /// Consecutive layers share a canvas while they name the same one and
    /// are fully opaque; a translucent layer gets a canvas of its own that
    /// carries its opacity.
    pub fn render(&self) -> Vec<LayerDescriptor> {
        let (width, height) = self.size;
        let mut canvases: Vec<LayerDescriptor> = Vec::new();
        let mut current: Option<(Pixmap, LayerDescriptor)> = None;

        for layer in self.stack.ordered().into_iter().filter(|l| l.visible) {
            let joins = current.as_ref().is_some_and(|(_, desc)| {
                desc.canvas == layer.canvas_name()
                    && desc.opacity.is_none()
                    && layer.opacity >= 1.0
                    && desc.printable == layer.printable
            });
            if !joins {
                if let Some(done) = current.take() {
                    canvases.push(finish(done));
                }
                let Some(pixmap) = Pixmap::new(width, height) else {
                    debug!("Surface has zero extent, nothing rendered");
                    return Vec::new();
                };
                let desc = LayerDescriptor {
                    canvas: layer.canvas_name().to_string(),
                    raster: None,
                    transform: Default::default(),
                    opacity: (layer.opacity < 1.0).then_some(layer.opacity),
                    z_order: canvases.len() as i32,
                    visible: true,
                    printable: layer.printable,
                };
                current = Some((pixmap, desc));
            }
            if let Some((canvas, _)) = current.as_mut() {
                self.draw_layer(canvas, layer);
            }
        }
        if let Some(done) = current.take() {
            canvases.push(finish(done));
        }
        debug!(
            "Rendered {} canvases at {}x{}, {:.4} m/px",
            canvases.len(),
            width,
            height,
            self.resolution
        );
        canvases
    }

    fn draw_layer(&self, canvas: &mut Pixmap, layer: &MapLayer) {
        let (width, height) = self.size;
        let Some(mut scratch) = Pixmap::new(width, height) else {
            return;
        };
        match &layer.content {
            LayerContent::Tiles(provider) => {
                let Some(tiles) = provider.render(self.extent(), width, height) else {
                    trace!("No tiles for layer {}", layer.name);
                    return;
                };
                scratch.draw_pixmap(0, 0, tiles.as_ref(), &PixmapPaint::default(), Transform::identity(), None);
            }
            LayerContent::Features { features, style } => {
                let view = self.view();
                for feature in features.read().iter() {
                    draw_feature(&mut scratch, feature, style, &view);
                }
            }
            LayerContent::Image(source) => {
                let raster = &source.raster;
                let r = self.resolution;
                let [min_x, _, _, max_y] = self.extent();
                let sx = raster.width() / raster.pixel_width as f64 / r;
                let sy = raster.height() / raster.pixel_height as f64 / r;
                let tx = (raster.extent[0] - min_x) / r;
                let ty = (max_y - raster.extent[3]) / r;
                let paint = PixmapPaint {
                    quality: FilterQuality::Bilinear,
                    ..Default::default()
                };
                scratch.draw_pixmap(
                    0,
                    0,
                    source.pixels.as_ref(),
                    &paint,
                    Transform::from_row(sx as f32, 0.0, 0.0, sy as f32, tx as f32, ty as f32),
                    None,
                );
            }
        }

        let paint = PixmapPaint {
            blend_mode: layer.composite.blend_mode(),
            ..Default::default()
        };
        canvas.draw_pixmap(0, 0, scratch.as_ref(), &paint, Transform::identity(), None);
    }
}

/// Map units to canvas pixels, kept in f64 until the last step since
/// projected coordinates do not fit an f32 mantissa
struct ViewMapping {
    min_x: f64,
    max_y: f64,
    resolution: f64,
}

impl ViewMapping {
    fn to_pixel(&self, p: Position) -> (f32, f32) {
        (
            ((p[0] - self.min_x) / self.resolution) as f32,
            ((self.max_y - p[1]) / self.resolution) as f32,
        )
    }
}

fn finish((pixmap, mut desc): (Pixmap, LayerDescriptor)) -> LayerDescriptor {
    desc.raster = Some(Arc::new(pixmap));
    desc
}

fn paint_for(rgba: [u8; 4]) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(rgba[0], rgba[1], rgba[2], rgba[3]);
    paint.anti_alias = true;
    paint
}

fn draw_feature(pixmap: &mut Pixmap, feature: &Feature, style: &VectorStyle, view: &ViewMapping) {
    match &feature.geometry {
        Some(Geometry::Polygon(rings)) => {
            let Some(fill) = style.fill else { return };
            let mut pb = PathBuilder::new();
            for ring in rings {
                push_points(&mut pb, ring, view);
                pb.close();
            }
            if let Some(path) = pb.finish() {
                pixmap.fill_path(&path, &paint_for(fill), FillRule::EvenOdd, Transform::identity(), None);
            }
        }
        Some(Geometry::LineString(points)) => {
            if let Some((color, width)) = style.stroke {
                let mut pb = PathBuilder::new();
                push_points(&mut pb, points, view);
                if let Some(path) = pb.finish() {
                    let stroke = Stroke {
                        width,
                        dash: style.dash.and_then(|[on, off]| StrokeDash::new(vec![on, off], 0.0)),
                        ..Default::default()
                    };
                    pixmap.stroke_path(&path, &paint_for(color), &stroke, Transform::identity(), None);
                }
            }
            if let Some(radius) = style.vertex_radius {
                for p in points {
                    draw_marker(pixmap, view.to_pixel(*p), radius, style.vertex_fill);
                }
            }
        }
        Some(Geometry::Point(p)) => {
            if let Some(radius) = style.vertex_radius {
                draw_marker(pixmap, view.to_pixel(*p), radius, style.vertex_fill);
            }
        }
        _ => {}
    }
}

fn push_points(pb: &mut PathBuilder, points: &[Position], view: &ViewMapping) {
    for (i, p) in points.iter().enumerate() {
        let (x, y) = view.to_pixel(*p);
        if i == 0 {
            pb.move_to(x, y);
        } else {
            pb.line_to(x, y);
        }
    }
}

fn draw_marker(pixmap: &mut Pixmap, (x, y): (f32, f32), radius: f32, fill: [u8; 4]) {
    if let Some(path) = PathBuilder::from_circle(x, y, radius) {
        pixmap.fill_path(&path, &paint_for(fill), FillRule::Winding, Transform::identity(), None);
    }
}

impl RenderSurface for OffscreenMap {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn set_size(&mut self, size: (u32, u32)) {
        self.size = size;
    }

    fn resolution(&self) -> f64 {
        self.resolution
    }

    fn set_resolution(&mut self, resolution: f64) {
        self.resolution = resolution;
    }

    fn center(&self) -> Position {
        self.center
    }

    fn projection(&self) -> Arc<dyn Projection> {
        self.projection.clone()
    }

    fn interactions(&self) -> InteractionSet {
        self.interactions
    }

    fn set_interactions(&mut self, interactions: InteractionSet) {
        self.interactions = interactions;
    }

    fn request_render(&mut self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        self.rendered = self.render();
        // The receiver is still held by the caller
        let _ = tx.send(());
        rx
    }

    fn layers(&self) -> Vec<LayerDescriptor> {
        self.rendered.clone()
    }
}
