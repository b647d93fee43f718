//! Types de données pour le crate fldimpact

use geo::{MultiPolygon, Point, Polygon};

/// Un point issu d'une cellule raster, porteur d'un poids (hectares, habitants)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedPoint {
    pub point: Point,
    pub weight: f64,
}

/// Un polygone vectorisé avec son attribut `Value`
#[derive(Debug, Clone, PartialEq)]
pub struct ValuedPolygon {
    pub polygon: Polygon,
    pub value: f64,
}

/// Emprise d'inondation d'un scénario
#[derive(Debug, Clone)]
pub struct FloodExtent {
    /// Union (non fusionnée) des polygones du fichier
    pub geometry: MultiPolygon,

    /// Code EPSG du CRS des coordonnées
    pub epsg: u32,

    /// Maximum de l'attribut `FloodValue`, si présent
    pub flood_depth: Option<f64>,
}

/// Un point d'intérêt OSM avec son tag `amenity` extrait
#[derive(Debug, Clone, PartialEq)]
pub struct AmenityPoint {
    pub point: Point,
    pub amenity: String,
}

/// Résultat d'un découpage de points par une emprise
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClipSummary {
    /// Nombre de points dans l'emprise
    pub count: usize,

    /// Somme des poids des points retenus
    pub total: f64,
}

/// Couche de points d'intérêt lue depuis un fichier
#[derive(Debug, Clone)]
pub struct AmenityLayer {
    /// Points portant un tag `amenity`
    pub points: Vec<AmenityPoint>,

    /// Code EPSG du CRS des coordonnées
    pub epsg: u32,

    /// Nombre de points écartés faute de tag `amenity`
    pub untagged: usize,
}
