//! # flood-impact
//!
//! Estimation des impacts de scénarios d'inondation à partir de cartes
//! d'emprise, d'un raster de cultures, d'un raster de population et de
//! points OSM.
//!
//! ## Features
//!
//! - Configuration JSON (fichier ou preset embarqué) avec surcharges `.env`
//! - Reprojection avec PROJ (feature `reproject`)
//! - Traitement par lot d'un répertoire de cartes → un CSV d'impacts
//! - Fichiers intermédiaires GeoJSON/CSV dans un répertoire de travail
//! - Rapport console et JSON
//!
//! ## Usage CLI
//!
//! ```bash
//! # Un scénario
//! flood-impact run --flood ./maps/fld_100yr.geojson --config ./chazuta.json
//!
//! # Toutes les cartes d'un répertoire
//! flood-impact batch --dir ./maps --config ./chazuta.json --report report.json
//!
//! # Raster d'inondation → polygones
//! flood-impact polygonize --raster flood.tif --output flood.geojson --srid 4326
//! ```

pub mod config;
pub mod export;
pub mod pipeline;
pub mod report;
pub mod scratch;

pub use config::Config;
pub use pipeline::{run_batch, run_polygonize, run_scenario, ImpactContext, ScenarioOutcome};
pub use report::{ImpactReport, ScenarioSummary};
