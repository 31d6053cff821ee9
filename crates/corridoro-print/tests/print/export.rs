use corridoro_core::{Feature, FeatureCollection, Planar, Position, Projection, RenderError, TransverseMercator};
use corridoro_print::{
    AffineTransform, CompositeExporter, InteractionSet, LayerDescriptor, LayerStack, NoTiles, OffscreenMap,
    PageDecoder, PdfPageDecoder, PrintJob, RenderSurface,
};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tiny_skia::{Color, Pixmap};
use tokio::sync::oneshot;

/// Surface with scripted render behaviour
struct ScriptedSurface {
    size: (u32, u32),
    resolution: f64,
    interactions: InteractionSet,
    layers: Vec<LayerDescriptor>,
    complete: bool,
    pending: Option<oneshot::Sender<()>>,
    rendered_at: Option<((u32, u32), f64, InteractionSet)>,
}

impl ScriptedSurface {
    fn new(complete: bool) -> Self {
        Self {
            size: (800, 600),
            resolution: 2.0,
            interactions: InteractionSet::enabled(),
            layers: Vec::new(),
            complete,
            pending: None,
            rendered_at: None,
        }
    }
}

impl RenderSurface for ScriptedSurface {
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
        [0.0, 0.0]
    }
    fn projection(&self) -> Arc<dyn Projection> {
        Arc::new(Planar)
    }
    fn interactions(&self) -> InteractionSet {
        self.interactions
    }
    fn set_interactions(&mut self, interactions: InteractionSet) {
        self.interactions = interactions;
    }
    fn request_render(&mut self) -> oneshot::Receiver<()> {
        self.rendered_at = Some((self.size, self.resolution, self.interactions));
        let (tx, rx) = oneshot::channel();
        if self.complete {
            let _ = tx.send(());
        } else {
            // Held forever: render never completes
            self.pending = Some(tx);
        }
        rx
    }
    fn layers(&self) -> Vec<LayerDescriptor> {
        self.layers.clone()
    }
}

fn small_job() -> PrintJob {
    PrintJob {
        page_width_mm: 20.0,
        page_height_mm: 10.0,
        dpi: 25.4,
        target_scale: 10000.0,
        file_name: "test.pdf".to_string(),
    }
}

fn solid(width: u32, height: u32, color: Color) -> Pixmap {
    let mut pixmap = Pixmap::new(width, height).unwrap();
    pixmap.fill(color);
    pixmap
}

#[tokio::test]
async fn test_export_restores_surface_state() {
    let drawn = FeatureCollection::new(vec![Feature::point([364860.0, 6688850.0], 50.0)]);
    let corridors = Arc::new(RwLock::new(FeatureCollection::default()));
    let stack = LayerStack::default_map(Arc::new(NoTiles), Arc::new(RwLock::new(drawn)), corridors);
    let mut map = OffscreenMap::new(
        stack,
        [364860.0, 6688850.0],
        0.5,
        (320, 200),
        Arc::new(TransverseMercator::etrs_tm35fin()),
    );

    let job = PrintJob {
        dpi: 50.0,
        ..small_job()
    };
    let bytes = CompositeExporter::default().export_page(&mut map, &job).await.unwrap();

    assert!(bytes.starts_with(b"%PDF"));
    assert_eq!(map.size(), (320, 200));
    assert_eq!(map.resolution(), 0.5);
    assert_eq!(map.interactions(), InteractionSet::enabled());
}

#[tokio::test]
async fn test_export_sets_scale_resolution_while_rendering() {
    let mut surface = ScriptedSurface::new(true);
    let job = PrintJob {
        dpi: 300.0,
        ..small_job()
    };
    CompositeExporter::default().export_page(&mut surface, &job).await.unwrap();

    let (size, resolution, interactions) = surface.rendered_at.unwrap();
    assert_eq!(size, job.pixel_size());
    // 1:10000 at 300 dpi: one pixel is 0.0847 mm of paper, 0.847 m of ground
    assert!((resolution - 10.0 / (300.0 / 25.4)).abs() < 1e-9);
    assert!(!interactions.any_enabled());

    assert_eq!(surface.size, (800, 600));
    assert_eq!(surface.resolution, 2.0);
    assert!(surface.interactions.any_enabled());
}

#[tokio::test]
async fn test_render_timeout_is_reported_and_state_restored() {
    let mut surface = ScriptedSurface::new(false);
    let exporter = CompositeExporter::new(Duration::from_millis(20));
    let err = exporter.export_page(&mut surface, &small_job()).await.unwrap_err();

    assert!(err.is_timeout());
    assert_eq!(surface.size, (800, 600));
    assert_eq!(surface.resolution, 2.0);
    assert_eq!(surface.interactions, InteractionSet::enabled());
}

#[tokio::test]
async fn test_dropped_render_is_aborted() {
    struct Dropping(ScriptedSurface);
    impl RenderSurface for Dropping {
        fn size(&self) -> (u32, u32) {
            self.0.size()
        }
        fn set_size(&mut self, size: (u32, u32)) {
            self.0.set_size(size)
        }
        fn resolution(&self) -> f64 {
            self.0.resolution()
        }
        fn set_resolution(&mut self, resolution: f64) {
            self.0.set_resolution(resolution)
        }
        fn center(&self) -> Position {
            self.0.center()
        }
        fn projection(&self) -> Arc<dyn Projection> {
            self.0.projection()
        }
        fn interactions(&self) -> InteractionSet {
            self.0.interactions()
        }
        fn set_interactions(&mut self, interactions: InteractionSet) {
            self.0.set_interactions(interactions)
        }
        fn request_render(&mut self) -> oneshot::Receiver<()> {
            let (_tx, rx) = oneshot::channel();
            rx
        }
        fn layers(&self) -> Vec<LayerDescriptor> {
            Vec::new()
        }
    }

    let mut surface = Dropping(ScriptedSurface::new(true));
    let err = CompositeExporter::default()
        .export_page(&mut surface, &small_job())
        .await
        .unwrap_err();
    assert!(matches!(err, corridoro_core::Error::Render(RenderError::Aborted)));
    assert!(surface.0.interactions.any_enabled());
}

#[tokio::test]
async fn test_malformed_transform_skips_only_that_layer() {
    let mut surface = ScriptedSurface::new(true);
    let (w, h) = small_job().pixel_size();
    let good = LayerDescriptor::new("ol-layer", solid(w, h, Color::from_rgba8(255, 0, 0, 255)));
    let mut bad = LayerDescriptor::new("ol-layer", solid(w, h, Color::from_rgba8(0, 0, 255, 255)));
    bad.transform = AffineTransform::from_coefficients([1.0, 0.0, 0.0, f64::INFINITY, 0.0, 0.0]);
    bad.z_order = 1;
    surface.layers = vec![good, bad];

    let bytes = CompositeExporter::default()
        .export_page(&mut surface, &small_job())
        .await
        .unwrap();

    let page = PdfPageDecoder.decode(&bytes, 72.0).unwrap();
    let px = page.pixels.get_pixel(page.width / 2, page.height / 2);
    assert_eq!(px.0, [255, 0, 0, 255]);
}

#[tokio::test]
async fn test_unprintable_canvas_left_off_page() {
    let mut surface = ScriptedSurface::new(true);
    let (w, h) = small_job().pixel_size();
    let mut sketch = LayerDescriptor::new("drawings", solid(w, h, Color::BLACK));
    sketch.printable = false;
    surface.layers = vec![sketch];

    let bytes = CompositeExporter::default()
        .export_page(&mut surface, &small_job())
        .await
        .unwrap();
    let page = PdfPageDecoder.decode(&bytes, 72.0).unwrap();
    assert!(page.pixels.pixels().all(|p| p.0 == [255, 255, 255, 255]));
}
