//! Définition et implémentation des commandes CLI
//!
//! - `run` : un scénario (une carte d'inondation)
//! - `batch` : toutes les cartes d'un répertoire → un CSV
//! - `polygonize` : raster d'inondation → polygones GeoJSON

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Subcommand;
use fldimpact::vector::VectorFormat;
use tracing::info;

use flood_impact::config::Config;
use flood_impact::export::write_impact_csv;
use flood_impact::pipeline::{self, ImpactContext};
use flood_impact::report::ImpactReport;

#[derive(Subcommand)]
pub enum Commands {
    /// Run one flood scenario and print its impacts
    Run {
        /// Flood extent (.geojson, .json or .shp)
        #[arg(short, long)]
        flood: PathBuf,

        /// Config preset name (default) or path to a JSON config
        #[arg(short, long, default_value = "default")]
        config: String,

        /// Also write the one-row impact CSV
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Run every flood map of a directory and write the impact CSV
    Batch {
        /// Directory of flood extents
        #[arg(short, long)]
        dir: PathBuf,

        /// Config preset name (default) or path to a JSON config
        #[arg(short, long, default_value = "default")]
        config: String,

        /// Output directory override for the CSV
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Save the run report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Convert a flood raster into flood extent polygons
    Polygonize {
        /// Flood raster (GeoTIFF, 1 = flooded)
        #[arg(short, long)]
        raster: PathBuf,

        /// Output GeoJSON file
        #[arg(short, long)]
        output: PathBuf,

        /// Also write the reclassified raster
        #[arg(long)]
        reclass_output: Option<PathBuf>,

        /// Target SRID of the polygons
        #[arg(long, default_value_t = 4326)]
        srid: u32,
    },
}

/// Exécute un scénario unique
pub fn cmd_run(flood: &Path, config_arg: &str, csv: Option<&Path>) -> Result<()> {
    validate_flood_file(flood)?;
    let start = Instant::now();

    let config = Config::resolve(config_arg)?;
    let location = format!("{}, {}", config.location.region, config.location.country);

    println!("=== Flood scenario ===");
    println!("Flood map: {}", flood.display());
    println!("Config: {}", config_arg);
    println!("Location: {}", location);

    let ctx = ImpactContext::load(config)?;
    let name = pipeline::layer_name(flood);
    let outcome = pipeline::run_scenario(&ctx, flood, &name)?;

    let mut report = ImpactReport::new(&location);
    report.record_scenario(outcome.summary());

    if let Some(path) = csv {
        write_impact_csv(std::slice::from_ref(&outcome.record), path)?;
        report.set_output(path);
    }

    report.set_duration(start.elapsed());
    report.display();
    Ok(())
}

/// Exécute toutes les cartes d'un répertoire
pub fn cmd_batch(
    dir: &Path,
    config_arg: &str,
    output: Option<&Path>,
    report_path: Option<&Path>,
) -> Result<()> {
    if !dir.is_dir() {
        anyhow::bail!("Not a directory: {}", dir.display());
    }

    let mut config = Config::resolve(config_arg)?;
    if let Some(dir) = output {
        config.output_dir = dir.to_path_buf();
    }

    println!("=== Flood batch ===");
    println!("Directory: {}", dir.display());
    println!("Config: {}", config_arg);
    println!("Scratch dir: {}", config.scratch_path().display());
    println!("Output dir: {}", config.output_path().display());
    if !config.exclude_layers.is_empty() {
        println!("Excluded: {}", config.exclude_layers.join(", "));
    }

    let ctx = ImpactContext::load(config)?;
    let outcome = pipeline::run_batch(&ctx, dir)?;

    outcome.report.display();
    if let Some(path) = report_path {
        outcome
            .report
            .save_to_file(path)
            .with_context(|| format!("Failed to save report to {}", path.display()))?;
        info!(path = %path.display(), "Report saved");
    }

    println!("{}", outcome.report.summary());
    Ok(())
}

/// Convertit un raster d'inondation en polygones
pub fn cmd_polygonize(
    raster: &Path,
    output: &Path,
    reclass_output: Option<&Path>,
    srid: u32,
) -> Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let count = pipeline::run_polygonize(raster, output, reclass_output, srid)?;
    println!("{} flood polygons written to {}", count, output.display());
    Ok(())
}

/// Vérifie l'extension d'une carte d'inondation
fn validate_flood_file(path: &Path) -> Result<()> {
    if VectorFormat::from_path(path).is_none() {
        anyhow::bail!(
            "Unsupported flood map: '{}'. Expected .geojson, .json or .shp",
            path.display()
        );
    }
    if !path.is_file() {
        anyhow::bail!("Flood map not found: {}", path.display());
    }
    Ok(())
}
