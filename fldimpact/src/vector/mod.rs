//! Lecture des couches vecteur (emprise d'inondation, points OSM)
//!
//! Formats pris en charge : GeoJSON (`.geojson`, `.json`) et ESRI Shapefile
//! (`.shp`). Le format est déterminé par l'extension.

pub mod json;
pub mod osm;
pub mod shp;

use std::path::Path;

use geo::{Geometry, MultiPolygon};

use crate::types::{AmenityLayer, FloodExtent};
use crate::FldImpactError;

/// EPSG utilisé quand le fichier ne déclare pas de CRS
pub const DEFAULT_EPSG: u32 = 4326;

/// Format d'un fichier vecteur
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorFormat {
    GeoJson,
    Shapefile,
}

impl VectorFormat {
    /// Détecte le format depuis l'extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "geojson" | "json" => Some(VectorFormat::GeoJson),
            "shp" => Some(VectorFormat::Shapefile),
            _ => None,
        }
    }
}

fn detect(path: &Path) -> Result<VectorFormat, FldImpactError> {
    VectorFormat::from_path(path)
        .ok_or_else(|| FldImpactError::UnsupportedFormat(path.display().to_string()))
}

/// Lit une emprise d'inondation (polygones fusionnés en un MultiPolygon)
///
/// `default_epsg` s'applique quand le fichier ne déclare pas son CRS.
pub fn read_flood_extent(path: &Path, default_epsg: u32) -> Result<FloodExtent, FldImpactError> {
    match detect(path)? {
        VectorFormat::GeoJson => json::read_flood_extent(path, default_epsg),
        VectorFormat::Shapefile => shp::read_flood_extent(path, default_epsg),
    }
}

/// Lit une couche de points OSM et extrait leur tag `amenity`
pub fn read_amenity_layer(path: &Path, default_epsg: u32) -> Result<AmenityLayer, FldImpactError> {
    match detect(path)? {
        VectorFormat::GeoJson => json::read_amenity_layer(path, default_epsg),
        VectorFormat::Shapefile => shp::read_amenity_layer(path, default_epsg),
    }
}

/// Ajoute les polygones d'une géométrie à un MultiPolygon
pub(crate) fn push_polygons(
    target: &mut MultiPolygon,
    geometry: Geometry,
    file: &str,
) -> Result<(), FldImpactError> {
    match geometry {
        Geometry::Polygon(p) => target.0.push(p),
        Geometry::MultiPolygon(mp) => target.0.extend(mp.0),
        Geometry::GeometryCollection(gc) => {
            for g in gc.0 {
                push_polygons(target, g, file)?;
            }
        }
        other => {
            return Err(FldImpactError::UnsupportedGeometry {
                file: file.to_string(),
                kind: geometry_kind(&other).to_string(),
            })
        }
    }
    Ok(())
}

pub(crate) fn geometry_kind(geometry: &Geometry) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

/// Extrait un code EPSG d'un nom de CRS (`EPSG:4326`, `urn:ogc:def:crs:EPSG::32718`, CRS84)
pub fn parse_crs_name(name: &str) -> Option<u32> {
    let upper = name.to_uppercase();
    if upper.ends_with("CRS84") {
        return Some(4326);
    }
    let pos = upper.find("EPSG")?;
    // Le code est le dernier segment (`EPSG:6.6:4326` porte une version)
    upper[pos + 4..].rsplit(':').next()?.trim().parse().ok()
}
