//! Types d'erreurs pour le crate fldimpact

use thiserror::Error;

/// Erreurs pouvant survenir lors du traitement d'un scénario d'inondation
#[derive(Debug, Error)]
pub enum FldImpactError {
    /// Erreur d'I/O lors de la lecture ou de l'écriture d'un fichier
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Erreur du décodeur/encodeur TIFF
    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// GeoJSON illisible
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// Shapefile illisible
    #[error("Shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),

    /// Raster incohérent (dimensions, géoréférencement, type de pixel)
    #[error("Invalid raster {file}: {reason}")]
    InvalidRaster { file: String, reason: String },

    /// La fenêtre de découpe ne recouvre aucune cellule du raster
    #[error("Clip window does not intersect the raster ({reason})")]
    EmptyWindow { reason: String },

    /// Géométrie invalide
    #[error("Invalid geometry for {entity_id}: {reason}")]
    InvalidGeometry { entity_id: String, reason: String },

    /// Type de géométrie non supporté pour l'opération demandée
    #[error("Unsupported geometry in {file}: {kind}")]
    UnsupportedGeometry { file: String, kind: String },

    /// Format de fichier non reconnu (extension)
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// `.prj` présent mais CRS non reconnu
    #[error("Unknown CRS '{crs}' in {file}, add an EPSG authority to the .prj")]
    UnknownCrs { file: String, crs: String },

    /// Attribut attendu absent
    #[error("Missing attribute '{attribute}' in {file}")]
    MissingAttribute { file: String, attribute: String },
}

impl FldImpactError {
    /// Crée une erreur de raster invalide avec contexte
    pub fn invalid_raster(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRaster {
            file: file.into(),
            reason: reason.into(),
        }
    }

    /// Crée une erreur de géométrie invalide
    pub fn invalid_geometry(entity_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            entity_id: entity_id.into(),
            reason: reason.into(),
        }
    }
}
