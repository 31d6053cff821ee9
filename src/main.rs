use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use corridoro::workflow::DocumentKind;
use corridoro::{
    init_json_logging, init_logging, parse_center, Config, CorridorSynthesizer,
    FeatureCollection, MapSession, Position, BUILD_DATE, VERSION,
};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "corridoro",
    version,
    about = "Corridor orienteering maps: route corridors, scale-true PDF export and page import"
)]
struct Cli {
    /// Config file (.json or .toml); defaults to the platform config directory
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log as JSON lines instead of pretty text
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Buffer the features of a GeoJSON file into corridors
    Corridor {
        /// Input FeatureCollection
        input: PathBuf,

        /// Output file, stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep one corridor per feature instead of merging them
        #[arg(long)]
        no_dissolve: bool,
    },

    /// Render drawn features as a scale-true single page PDF
    Export {
        /// Input FeatureCollection
        features: PathBuf,

        /// Output PDF, the configured file name when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// View center as x,y in map units
        #[arg(long, value_parser = parse_center, allow_hyphen_values = true)]
        center: Option<Position>,

        /// Map page (PDF, PNG or JPEG) to show through the corridors
        #[arg(long)]
        map: Option<PathBuf>,
    },

    /// Place a printed page on the map and report where it lands
    Import {
        /// PDF, PNG or JPEG page
        document: PathBuf,

        /// View center as x,y in map units
        #[arg(long, value_parser = parse_center, allow_hyphen_values = true)]
        center: Option<Position>,
    },

    /// Show the active configuration
    Config {
        /// Write the defaults to the config file if it does not exist yet
        #[arg(long)]
        init: bool,
    },
}

fn config_path(cli: &Cli) -> anyhow::Result<PathBuf> {
    match &cli.config {
        Some(path) => Ok(path.clone()),
        None => Ok(Config::default_path()?),
    }
}

fn read_features(path: &Path) -> anyhow::Result<FeatureCollection> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    FeatureCollection::from_json(&json)
        .with_context(|| format!("{} is not a GeoJSON FeatureCollection", path.display()))
}

fn read_bytes(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

async fn session_for(
    config: Config,
    center: Option<Position>,
    map: Option<&Path>,
) -> anyhow::Result<MapSession> {
    let mut session = MapSession::new(config)?;
    if let Some(center) = center {
        session.set_center(center);
    }
    if let Some(path) = map {
        session
            .import_page(read_bytes(path)?, DocumentKind::from_path(path))
            .await
            .with_context(|| format!("Failed to import {}", path.display()))?;
    }
    Ok(session)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.json_logs {
        init_json_logging()?;
    } else {
        init_logging()?;
    }
    info!("CorridorO v{} (built {})", VERSION, BUILD_DATE);

    let path = config_path(&cli)?;
    let config = Config::load_or_default(&path)
        .with_context(|| format!("Failed to load config {}", path.display()))?;

    match cli.command {
        Commands::Corridor {
            input,
            output,
            no_dissolve,
        } => {
            let features = read_features(&input)?;
            let synthesizer = CorridorSynthesizer::new(config.corridor_options());
            let corridors = if no_dissolve {
                synthesizer.corridorize(&features)
            } else {
                synthesizer.synthesize(&features)
            };
            let json = corridors.to_json_pretty()?;
            match output {
                Some(out) => {
                    std::fs::write(&out, json)
                        .with_context(|| format!("Failed to write {}", out.display()))?;
                    info!("Wrote {} corridor features to {}", corridors.len(), out.display());
                }
                None => println!("{json}"),
            }
        }
        Commands::Export {
            features,
            output,
            center,
            map,
        } => {
            let out = output.unwrap_or_else(|| PathBuf::from(&config.print.file_name));
            let mut session = session_for(config, center, map.as_deref()).await?;
            session.load_features(read_features(&features)?);
            let bytes = session.export_page().await.context("Export failed")?;
            std::fs::write(&out, &bytes)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            println!("{} ({} bytes)", out.display(), bytes.len());
        }
        Commands::Import { document, center } => {
            let mut session = session_for(config, center, None).await?;
            let page = session
                .import_page(read_bytes(&document)?, DocumentKind::from_path(&document))
                .await
                .with_context(|| format!("Failed to import {}", document.display()))?;
            let [min_x, min_y, max_x, max_y] = page.raster.extent;
            println!(
                "{} x {} px covering [{:.1}, {:.1}, {:.1}, {:.1}] ({:.1} x {:.1} m)",
                page.raster.pixel_width,
                page.raster.pixel_height,
                min_x,
                min_y,
                max_x,
                max_y,
                page.raster.width(),
                page.raster.height()
            );
            for layer in session.map().stack().ordered() {
                println!(
                    "  z{:<3} {:<16} opacity {:.2}{}",
                    layer.z_index,
                    layer.name,
                    layer.opacity,
                    if layer.visible { "" } else { " (hidden)" }
                );
            }
        }
        Commands::Config { init } => {
            if init {
                if path.exists() {
                    bail!("{} already exists", path.display());
                }
                config.save_to_file(&path)?;
                println!("Wrote {}", path.display());
            } else {
                println!("# {}", path.display());
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}
