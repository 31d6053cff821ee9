//! Configuration management for CorridorO
//!
//! Configuration is organized into sections:
//! - Corridor synthesis defaults (width, line style, tessellation)
//! - Print settings (paper, dpi, scale, render wait)
//! - Import convention (decode dpi, nominal scale, base opacity)
//! - View defaults (projection, center, resolution, size)
//!
//! Files are read and written as JSON or TOML, chosen by extension.

use crate::error::{ConfigError, SettingsError, SettingsResult};
use corridoro_core::{projection_for_code, LineStyle, Orientation, PaperSize, Position};
use corridoro_designer::{CorridorOptions, DrawingSource};
use corridoro_print::{CompositeExporter, GeoreferencedImportCalibrator, PrintJob};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Directory name under the platform config directory
pub const APP_DIR: &str = "corridoro";

/// Default config file name
pub const CONFIG_FILE: &str = "config.json";

/// Fewest vertices accepted for a full circle
pub const MIN_CIRCLE_SEGMENTS: usize = 8;

/// Corridor synthesis settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorridorSettings {
    /// Width in meters for features that carry none
    pub default_width: f64,
    /// Line style stamped on newly drawn routes
    pub default_style: LineStyle,
    /// Vertices used to approximate a full circle
    pub circle_segments: usize,
    /// Spline samples per drawn segment
    pub spline_samples_per_segment: usize,
    /// Spline control point pull, 0 to 1
    pub spline_sharpness: f64,
}

impl Default for CorridorSettings {
    fn default() -> Self {
        let options = CorridorOptions::default();
        Self {
            default_width: options.default_width,
            default_style: LineStyle::Curved,
            circle_segments: options.circle_segments,
            spline_samples_per_segment: options.spline_samples_per_segment,
            spline_sharpness: options.spline_sharpness,
        }
    }
}

/// Print settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintSettings {
    pub paper: PaperSize,
    pub orientation: Orientation,
    pub dpi: f64,
    /// Scale denominator, 10000 for 1:10000
    pub scale_denominator: f64,
    /// Longest wait for the surface to finish a render
    pub render_timeout_ms: u64,
    pub file_name: String,
}

impl Default for PrintSettings {
    fn default() -> Self {
        Self {
            paper: PaperSize::A4,
            orientation: Orientation::Landscape,
            dpi: 300.0,
            scale_denominator: 10000.0,
            render_timeout_ms: 30_000,
            file_name: "map.pdf".to_string(),
        }
    }
}

/// Import settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// Dpi uploaded pages are decoded at
    pub decode_dpi: f64,
    /// Scale denominator assumed for uploaded pages
    pub nominal_scale: f64,
    /// Opacity of the dimmed copy beneath the vectors
    pub base_opacity: f32,
    pub decode_timeout_ms: u64,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            decode_dpi: corridoro_print::IMPORT_DPI,
            nominal_scale: corridoro_print::IMPORT_SCALE,
            base_opacity: corridoro_print::IMPORT_BASE_OPACITY,
            decode_timeout_ms: 30_000,
        }
    }
}

/// Initial map view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    /// Projection registry code
    pub projection: String,
    pub center: Position,
    /// Meters per pixel
    pub resolution: f64,
    pub size: [u32; 2],
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            projection: "EPSG:3067".to_string(),
            center: [364_860.0, 6_688_850.0],
            resolution: 0.5,
            size: [1280, 800],
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub corridor: CorridorSettings,
    pub print: PrintSettings,
    pub import: ImportSettings,
    pub view: ViewSettings,
}

enum Format {
    Json,
    Toml,
}

fn format_for(path: &Path) -> SettingsResult<Format> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(Format::Json),
        Some("toml") => Ok(Format::Toml),
        other => Err(ConfigError::UnsupportedFormat(other.unwrap_or("<none>").to_string()).into()),
    }
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn out_of_range(key: &str, value: impl ToString) -> SettingsError {
    ConfigError::ValueOutOfRange {
        key: key.to_string(),
        value: value.to_string(),
    }
    .into()
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Platform location of the config file
    pub fn default_path() -> SettingsResult<PathBuf> {
        let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = format_for(path)?;
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = match format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load `path` if it exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save config to file (JSON or TOML), creating parent directories
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;
        let format = format_for(path)?;

        let content = match format {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| SettingsError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, content).map_err(|source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        })?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        let corridor = &self.corridor;
        if !positive(corridor.default_width) {
            return Err(SettingsError::invalid(
                "corridor.default_width",
                "must be a positive number of meters",
            ));
        }
        if corridor.circle_segments < MIN_CIRCLE_SEGMENTS {
            return Err(out_of_range("corridor.circle_segments", corridor.circle_segments));
        }
        if corridor.spline_samples_per_segment == 0 {
            return Err(SettingsError::invalid(
                "corridor.spline_samples_per_segment",
                "must be > 0",
            ));
        }
        if !(0.0..=1.0).contains(&corridor.spline_sharpness) {
            return Err(out_of_range("corridor.spline_sharpness", corridor.spline_sharpness));
        }

        let print = &self.print;
        if !positive(print.dpi) {
            return Err(SettingsError::invalid("print.dpi", "must be > 0"));
        }
        if !positive(print.scale_denominator) {
            return Err(SettingsError::invalid("print.scale_denominator", "must be > 0"));
        }
        if print.render_timeout_ms == 0 {
            return Err(SettingsError::invalid("print.render_timeout_ms", "must be > 0"));
        }
        if print.file_name.trim().is_empty() {
            return Err(SettingsError::invalid("print.file_name", "must not be empty"));
        }

        let import = &self.import;
        if !positive(import.decode_dpi) {
            return Err(SettingsError::invalid("import.decode_dpi", "must be > 0"));
        }
        if !positive(import.nominal_scale) {
            return Err(SettingsError::invalid("import.nominal_scale", "must be > 0"));
        }
        if !(0.0..=1.0).contains(&import.base_opacity) {
            return Err(out_of_range("import.base_opacity", import.base_opacity));
        }
        if import.decode_timeout_ms == 0 {
            return Err(SettingsError::invalid("import.decode_timeout_ms", "must be > 0"));
        }

        let view = &self.view;
        if projection_for_code(&view.projection).is_none() {
            return Err(SettingsError::invalid(
                "view.projection",
                format!("unknown projection code {}", view.projection),
            ));
        }
        if !view.center.iter().all(|v| v.is_finite()) {
            return Err(SettingsError::invalid("view.center", "must be finite"));
        }
        if !positive(view.resolution) {
            return Err(SettingsError::invalid("view.resolution", "must be > 0"));
        }
        if view.size.contains(&0) {
            return Err(SettingsError::invalid("view.size", "dimensions must be > 0"));
        }

        Ok(())
    }

    pub fn corridor_options(&self) -> CorridorOptions {
        CorridorOptions {
            default_width: self.corridor.default_width,
            circle_segments: self.corridor.circle_segments,
            spline_samples_per_segment: self.corridor.spline_samples_per_segment,
            spline_sharpness: self.corridor.spline_sharpness,
        }
    }

    /// Empty drawing source stamping the configured defaults
    pub fn drawing_source(&self) -> DrawingSource {
        DrawingSource::new(self.corridor.default_width, self.corridor.default_style)
    }

    pub fn print_job(&self) -> PrintJob {
        PrintJob::from_paper(
            self.print.paper,
            self.print.orientation,
            self.print.dpi,
            self.print.scale_denominator,
        )
        .with_file_name(self.print.file_name.clone())
    }

    pub fn exporter(&self) -> CompositeExporter {
        CompositeExporter::new(Duration::from_millis(self.print.render_timeout_ms))
    }

    pub fn import_calibrator(&self) -> GeoreferencedImportCalibrator {
        GeoreferencedImportCalibrator::new()
            .with_convention(self.import.decode_dpi, self.import.nominal_scale)
            .with_base_opacity(self.import.base_opacity)
            .with_decode_timeout(Duration::from_millis(self.import.decode_timeout_ms))
    }
}
