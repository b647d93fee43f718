//! # fldimpact
//!
//! Estimation des impacts d'une inondation : surfaces agricoles, population
//! et équipements (OSM `amenity`) situés dans une emprise inondée.
//!
//! ## Features
//!
//! - Classification des tags `amenity` en dix catégories
//! - Raster mono-bande, lecture GeoTIFF par fenêtre (strips/tuiles) avec `tiff`
//! - Reclassification par seuils et vectorisation 4-connexe
//! - Réparation des polygones invalides (nœuds papillon, pointes)
//! - Lecture des emprises et des points en GeoJSON ou Shapefile
//! - Types `geo` pour l'interopérabilité avec l'écosystème Rust géospatial
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fldimpact::{read_flood_extent, read_geotiff, summarize, CellWeight};
//! use std::path::Path;
//!
//! let extent = read_flood_extent(Path::new("flood.geojson"), 4326)?;
//! let population = read_geotiff(Path::new("population.tif"))?;
//! let points = population.cell_points(CellWeight::TruncatedValue);
//! let summary = summarize(&points, &extent.geometry);
//! println!("Population: {}", summary.total);
//! ```

pub mod aggregate;
pub mod amenity;
pub mod error;
pub mod raster;
pub mod repair;
pub mod types;
pub mod vector;

pub use aggregate::{
    agriculture_hectares, clip_points, count_amenities, summarize, CategoryCounts,
    DEFAULT_CELL_HECTARES,
};
pub use amenity::{classify, AmenityCategory};
pub use error::FldImpactError;
pub use raster::geotiff::{
    is_geographic_epsg, read_geotiff, read_geotiff_header, read_geotiff_window, write_geotiff,
};
pub use raster::polygonize::{drop_value, polygonize};
pub use raster::{CellWeight, GeoTransform, Grid, PixelWindow, RasterHeader, ReclassRule};
pub use repair::fix_geometries;
pub use types::{AmenityLayer, AmenityPoint, ClipSummary, FloodExtent, ValuedPolygon, WeightedPoint};
pub use vector::{read_amenity_layer, read_flood_extent, DEFAULT_EPSG};
