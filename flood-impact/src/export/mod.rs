//! Modules d'export (CSV, GeoJSON) et reprojection

pub mod csv;
pub mod geojson;
pub mod reproject;

pub use self::csv::{write_impact_csv, ImpactRecord};
pub use reproject::Reprojector;
