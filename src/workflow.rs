//! One editing session: drawn features, their corridors and the map they
//! are rendered on, wired together from a [`Config`].

use corridoro_core::{projection_for_code, Error, FeatureCollection, Position, Result};
use corridoro_designer::{CorridorLayer, CorridorSynthesizer, DrawingSource, SharedFeatures};
use corridoro_print::{
    ImportedPage, LayerStack, NoTiles, OffscreenMap, PdfPageDecoder, RasterPageDecoder,
    RenderSurface,
};
use corridoro_settings::Config;
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Parse `"x,y"` into a map position
pub fn parse_center(s: &str) -> std::result::Result<Position, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got {s:?}"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("invalid coordinate {v:?}"))
    };
    Ok([parse(x)?, parse(y)?])
}

/// How an uploaded page is decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Raster,
}

impl DocumentKind {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("pdf") => Self::Pdf,
            _ => Self::Raster,
        }
    }
}

pub struct MapSession {
    config: Config,
    source: DrawingSource,
    corridors: Arc<CorridorLayer>,
    map: OffscreenMap,
}

impl MapSession {
    pub fn new(config: Config) -> Result<Self> {
        let projection = projection_for_code(&config.view.projection)
            .ok_or_else(|| Error::other(format!("Unknown projection {}", config.view.projection)))?;

        let drawing: SharedFeatures = Arc::new(RwLock::new(FeatureCollection::default()));
        let corridors = Arc::new(CorridorLayer::new(CorridorSynthesizer::new(
            config.corridor_options(),
        )));
        let mut source = config.drawing_source();
        source.subscribe(drawing.clone());
        source.subscribe(corridors.clone());

        let stack = LayerStack::default_map(Arc::new(NoTiles), drawing, corridors.output());
        let [width, height] = config.view.size;
        let map = OffscreenMap::new(
            stack,
            config.view.center,
            config.view.resolution,
            (width, height),
            projection,
        );

        Ok(Self {
            config,
            source,
            corridors,
            map,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn source(&self) -> &DrawingSource {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut DrawingSource {
        &mut self.source
    }

    pub fn map(&self) -> &OffscreenMap {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut OffscreenMap {
        &mut self.map
    }

    /// Current corridor polygons
    pub fn corridors(&self) -> FeatureCollection {
        self.corridors.snapshot()
    }

    /// Add every feature of `features` to the drawing source
    pub fn load_features(&mut self, features: FeatureCollection) -> usize {
        let count = features.len();
        for feature in features.features {
            self.source.add(feature);
        }
        info!(
            "Loaded {} features, {} corridor features",
            count,
            self.corridors.snapshot().len()
        );
        count
    }

    pub fn set_center(&mut self, center: Position) {
        self.map.set_center(center);
    }

    /// Import a page around the current view center
    pub async fn import_page(&mut self, bytes: Vec<u8>, kind: DocumentKind) -> Result<ImportedPage> {
        let calibrator = self.config.import_calibrator();
        let center = self.map.center();
        let stack = self.map.stack_mut();
        match kind {
            DocumentKind::Pdf => {
                calibrator
                    .import_page(Arc::new(PdfPageDecoder), bytes, center, stack)
                    .await
            }
            DocumentKind::Raster => {
                calibrator
                    .import_page(Arc::new(RasterPageDecoder), bytes, center, stack)
                    .await
            }
        }
    }

    /// Export the current view with the configured print settings
    pub async fn export_page(&mut self) -> Result<Vec<u8>> {
        let job = self.config.print_job();
        self.config.exporter().export_page(&mut self.map, &job).await
    }
}
