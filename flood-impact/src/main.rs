//! Point d'entrée CLI pour flood-impact

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

// Charger .env au démarrage
fn load_env() {
    // Chercher .env dans le répertoire courant ou parent
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

mod cli;

use cli::Commands;

/// Estimer les impacts d'une inondation (cultures, population, équipements)
#[derive(Parser)]
#[command(name = "flood-impact")]
#[command(author, version)]
#[command(about = "Estimer les surfaces agricoles, la population et les équipements inondés")]
#[command(long_about = "Croise des cartes d'inondation avec un raster de cultures, un raster de population et des points OSM.\n\n'run' traite une carte, 'batch' un répertoire entier, 'polygonize' vectorise un raster d'inondation.")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<()> {
    // Charger .env avant tout
    load_env();

    let cli = Cli::parse();

    // Configurer le logging
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Run { flood, config, csv } => {
            info!(flood = %flood.display(), config = %config, "Flood scenario");
            cli::cmd_run(&flood, &config, csv.as_deref())?;
        }
        Commands::Batch {
            dir,
            config,
            output,
            report,
        } => {
            info!(dir = %dir.display(), config = %config, "Flood batch");
            cli::cmd_batch(&dir, &config, output.as_deref(), report.as_deref())?;
        }
        Commands::Polygonize {
            raster,
            output,
            reclass_output,
            srid,
        } => {
            info!(raster = %raster.display(), output = %output.display(), srid, "Polygonize");
            cli::cmd_polygonize(&raster, &output, reclass_output.as_deref(), srid)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
