//! Scale-true page export
//!
//! Exporting takes the surface over for the duration of one call: editing
//! interactions are switched off, the view is resized to the page's pixel
//! size and its resolution set so one pixel covers the right ground
//! distance, and after the composite is captured everything is put back.
//! The restore runs on every exit path, including errors.

use crate::compositor::composite;
use crate::pdf::write_image_page;
use crate::surface::{InteractionSet, RenderSurface};
use corridoro_core::units::{ground_resolution_for_scale, mm_to_pixels, MM_PER_INCH};
use corridoro_core::{CompositeError, Orientation, PaperSize, RenderError, Result};
use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};
use std::time::Duration;
use tracing::{debug, info};

/// Parameters of one page export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintJob {
    pub page_width_mm: f64,
    pub page_height_mm: f64,
    pub dpi: f64,
    /// Scale denominator, 10000 for 1:10000
    pub target_scale: f64,
    pub file_name: String,
}

impl Default for PrintJob {
    fn default() -> Self {
        Self::from_paper(PaperSize::A4, Orientation::Landscape, 300.0, 10000.0)
    }
}

impl PrintJob {
    pub fn from_paper(paper: PaperSize, orientation: Orientation, dpi: f64, target_scale: f64) -> Self {
        let (page_width_mm, page_height_mm) = paper.dimensions_mm(orientation);
        Self {
            page_width_mm,
            page_height_mm,
            dpi,
            target_scale,
            file_name: "map.pdf".to_string(),
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// Page size in pixels at the job's dpi
    pub fn pixel_size(&self) -> (u32, u32) {
        (
            mm_to_pixels(self.page_width_mm, self.dpi),
            mm_to_pixels(self.page_height_mm, self.dpi),
        )
    }

    /// Ground meters covered by one page millimeter
    pub fn meters_per_mm(&self) -> f64 {
        self.target_scale / 1000.0
    }

    fn validate(&self) -> std::result::Result<(), CompositeError> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !(positive(self.page_width_mm) && positive(self.page_height_mm)) {
            return Err(CompositeError::InvalidPage(format!(
                "{} x {} mm",
                self.page_width_mm, self.page_height_mm
            )));
        }
        if !positive(self.dpi) || !positive(self.target_scale) {
            return Err(CompositeError::InvalidPage(format!(
                "{} dpi at 1:{}",
                self.dpi, self.target_scale
            )));
        }
        let (w, h) = self.pixel_size();
        if w == 0 || h == 0 {
            return Err(CompositeError::EmptyRaster);
        }
        Ok(())
    }
}

/// Exclusive hold on a surface during an export.
///
/// Interactions are disabled on creation; dropping the guard restores the
/// surface size, resolution and interactions it found.
pub struct ExportGuard<'a, S: RenderSurface + ?Sized> {
    surface: &'a mut S,
    size: (u32, u32),
    resolution: f64,
    interactions: InteractionSet,
}

impl<'a, S: RenderSurface + ?Sized> ExportGuard<'a, S> {
    pub fn acquire(surface: &'a mut S) -> Self {
        let size = surface.size();
        let resolution = surface.resolution();
        let interactions = surface.interactions();
        surface.set_interactions(InteractionSet::disabled());
        Self {
            surface,
            size,
            resolution,
            interactions,
        }
    }
}

impl<S: RenderSurface + ?Sized> Deref for ExportGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        &*self.surface
    }
}

impl<S: RenderSurface + ?Sized> DerefMut for ExportGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut *self.surface
    }
}

impl<S: RenderSurface + ?Sized> Drop for ExportGuard<'_, S> {
    fn drop(&mut self) {
        self.surface.set_size(self.size);
        self.surface.set_resolution(self.resolution);
        self.surface.set_interactions(self.interactions);
        debug!(
            "Surface restored to {}x{} at {:.4} m/px",
            self.size.0, self.size.1, self.resolution
        );
    }
}

/// Renders a surface to a single-page PDF at a true ground scale
#[derive(Debug, Clone)]
pub struct CompositeExporter {
    render_timeout: Duration,
}

impl Default for CompositeExporter {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl CompositeExporter {
    pub fn new(render_timeout: Duration) -> Self {
        Self { render_timeout }
    }

    pub fn render_timeout(&self) -> Duration {
        self.render_timeout
    }

    /// Export the surface's current view as one page.
    ///
    /// Taking the surface by `&mut` keeps two exports from overlapping.
    pub async fn export_page<S: RenderSurface + ?Sized>(&self, surface: &mut S, job: &PrintJob) -> Result<Vec<u8>> {
        job.validate()?;
        let (width, height) = job.pixel_size();

        let mut guard = ExportGuard::acquire(surface);
        let projection = guard.projection();
        let resolution = ground_resolution_for_scale(
            job.meters_per_mm(),
            job.dpi / MM_PER_INCH,
            guard.center(),
            projection.as_ref(),
        );
        info!(
            "Exporting {}x{} px at 1:{} ({:.4} m/px)",
            width, height, job.target_scale, resolution
        );

        guard.set_size((width, height));
        guard.set_resolution(resolution);
        let complete = guard.request_render();
        match tokio::time::timeout(self.render_timeout, complete).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => return Err(RenderError::Aborted.into()),
            Err(_) => {
                return Err(RenderError::Timeout {
                    timeout_ms: self.render_timeout.as_millis() as u64,
                }
                .into())
            }
        }

        let layers: Vec<_> = guard.layers().into_iter().filter(|l| l.printable).collect();
        let page = composite(width, height, &layers)?;
        let bytes = write_image_page(&page, job.page_width_mm, job.page_height_mm, &job.file_name)?;
        drop(guard);
        info!("Exported {} ({} bytes)", job.file_name, bytes.len());
        Ok(bytes)
    }
}
