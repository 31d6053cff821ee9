//! Page compositor
//!
//! Flattens rendered canvases into one page raster. Each canvas is drawn
//! with its own [`LayerDraw`] parameters; nothing carries over from one
//! canvas to the next.

use crate::layer::LayerDescriptor;
use corridoro_core::CompositeError;
use tiny_skia::{Pixmap, PixmapPaint, Transform};
use tracing::{debug, warn};

/// Per-canvas draw parameters
#[derive(Debug, Clone, Copy)]
pub struct LayerDraw {
    pub transform: Transform,
    pub opacity: f32,
}

impl LayerDraw {
    pub fn for_layer(layer: &LayerDescriptor) -> Result<Self, CompositeError> {
        Ok(Self {
            transform: layer.transform.to_skia()?,
            opacity: layer.effective_opacity(),
        })
    }
}

/// Draw `raster` onto `target` at the origin with `draw` applied
pub fn draw_layer(target: &mut Pixmap, raster: &Pixmap, draw: LayerDraw) {
    let paint = PixmapPaint {
        opacity: draw.opacity,
        ..Default::default()
    };
    target.draw_pixmap(0, 0, raster.as_ref(), &paint, draw.transform, None);
}

/// Composite `layers` into a `width` x `height` raster.
///
/// Visible layers are drawn in ascending z-order (stable for ties). Layers
/// without pixels are skipped, as are layers whose transform is unusable;
/// the latter only costs that one layer.
pub fn composite(width: u32, height: u32, layers: &[LayerDescriptor]) -> Result<Pixmap, CompositeError> {
    let mut target = Pixmap::new(width, height).ok_or(CompositeError::EmptyRaster)?;

    let mut ordered: Vec<&LayerDescriptor> = layers.iter().filter(|l| l.visible).collect();
    ordered.sort_by_key(|l| l.z_order);

    let mut drawn = 0;
    for layer in ordered {
        let Some(raster) = layer.raster.as_deref() else {
            debug!("Skipping empty canvas {}", layer.canvas);
            continue;
        };
        let draw = match LayerDraw::for_layer(layer) {
            Ok(draw) => draw,
            Err(err) => {
                warn!("Skipping canvas {}: {}", layer.canvas, err);
                continue;
            }
        };
        draw_layer(&mut target, raster, draw);
        drawn += 1;
    }
    debug!("Composited {} of {} canvases into {}x{}", drawn, layers.len(), width, height);
    Ok(target)
}
