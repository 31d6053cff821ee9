use corridoro_core::units::pixels_to_meters;
use corridoro_core::{DecodeError, FeatureCollection, Planar};
use corridoro_print::{
    CompositeExporter, DecodedPage, GeoreferencedImportCalibrator, LayerRole, LayerStack, NoTiles,
    OffscreenMap, PageDecoder, PdfPageDecoder, PrintJob, RasterPageDecoder,
};
use image::RgbaImage;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

fn default_stack() -> LayerStack {
    LayerStack::default_map(
        Arc::new(NoTiles),
        Arc::new(RwLock::new(FeatureCollection::default())),
        Arc::new(RwLock::new(FeatureCollection::default())),
    )
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, image::Rgba([20, 120, 40, 255]));
    let mut bytes = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

struct SlowDecoder;

impl PageDecoder for SlowDecoder {
    fn decode(&self, _bytes: &[u8], _dpi: f64) -> Result<DecodedPage, DecodeError> {
        std::thread::sleep(Duration::from_millis(300));
        Err(DecodeError::NoPages)
    }
}

#[test]
fn test_calibrated_extent_matches_pixels() {
    let calibrator = GeoreferencedImportCalibrator::new();
    for (w, h) in [(1, 1), (300, 600), (3508, 2480)] {
        let raster = calibrator.calibrate(w, h, [100.0, -50.0]);
        assert!((raster.width() - pixels_to_meters(w as f64, 300.0, 10000.0)).abs() < 1e-9);
        assert!((raster.height() - pixels_to_meters(h as f64, 300.0, 10000.0)).abs() < 1e-9);
        let [cx, cy] = raster.center();
        assert!((cx - 100.0).abs() < 1e-9);
        assert!((cy + 50.0).abs() < 1e-9);
    }
}

#[tokio::test]
async fn test_import_inserts_two_layers() {
    let mut stack = default_stack();
    let before = stack.len();
    let imported = GeoreferencedImportCalibrator::new()
        .import_page(Arc::new(RasterPageDecoder), png(30, 20), [1000.0, 2000.0], &mut stack)
        .await
        .unwrap();

    assert_eq!(stack.len(), before + 2);
    assert!((imported.raster.width() - 25.4).abs() < 1e-9);
    assert!((imported.raster.extent[0] - 987.3).abs() < 1e-9);

    let overlay = stack.get(imported.overlay).unwrap();
    assert_eq!(overlay.role, LayerRole::ImportedOverlay);
    assert!((stack.get(imported.base).unwrap().opacity - 0.1).abs() < 1e-6);
    assert!(stack.with_role(LayerRole::TileBase).all(|l| !l.visible));
    assert!(stack.with_role(LayerRole::TileOverlay).all(|l| !l.visible));
}

#[tokio::test]
async fn test_decode_failure_leaves_stack_untouched() {
    let mut stack = default_stack();
    let before: Vec<_> = stack.iter().map(|l| (l.id(), l.visible, l.z_index)).collect();

    let err = GeoreferencedImportCalibrator::new()
        .import_page(Arc::new(PdfPageDecoder), b"%PDF-1.5 broken".to_vec(), [0.0, 0.0], &mut stack)
        .await
        .unwrap_err();

    assert!(err.is_decode_error());
    let after: Vec<_> = stack.iter().map(|l| (l.id(), l.visible, l.z_index)).collect();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_decode_timeout() {
    let mut stack = default_stack();
    let err = GeoreferencedImportCalibrator::new()
        .with_decode_timeout(Duration::from_millis(20))
        .import_page(Arc::new(SlowDecoder), Vec::new(), [0.0, 0.0], &mut stack)
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(stack.len(), default_stack().len());
}

#[tokio::test]
async fn test_exported_page_imports_at_its_ground_size() {
    let mut map = OffscreenMap::new(default_stack(), [0.0, 0.0], 1.0, (100, 100), Arc::new(Planar));
    let job = PrintJob {
        page_width_mm: 20.0,
        page_height_mm: 10.0,
        dpi: 300.0,
        target_scale: 10000.0,
        file_name: "round-trip.pdf".to_string(),
    };
    let bytes = CompositeExporter::default().export_page(&mut map, &job).await.unwrap();

    let mut stack = default_stack();
    let imported = GeoreferencedImportCalibrator::new()
        .import_page(Arc::new(PdfPageDecoder), bytes, [0.0, 0.0], &mut stack)
        .await
        .unwrap();
    // 20 mm at 1:10000 is 200 m, within one pixel
    let pixel = pixels_to_meters(1.0, 300.0, 10000.0);
    assert!((imported.raster.width() - 200.0).abs() <= pixel);
    assert!((imported.raster.height() - 100.0).abs() <= pixel);
}
