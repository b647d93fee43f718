//! Répertoire de travail temporaire (fichiers intermédiaires d'un scénario)

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

/// Emprise reprojetée
pub const FLOOD_POLYGON: &str = "fld_poly.geojson";
/// Points de culture (toutes cellules découpées)
pub const CROP_POINTS: &str = "crop_pts.csv";
/// Points de culture inondés
pub const AG_POLYGON: &str = "ag_poly.geojson";
/// Points de population (toutes cellules découpées)
pub const POP_POINTS: &str = "pop_pts.csv";
/// Points de population inondés
pub const POP_POLYGON: &str = "pop_poly.geojson";
/// Équipements inondés
pub const OSM_POLYGON: &str = "osm_poly.geojson";

/// Répertoire de travail, vidé à la préparation
#[derive(Debug, Clone)]
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    /// Crée le répertoire s'il manque puis supprime son contenu
    ///
    /// Une entrée impossible à supprimer est signalée et laissée en place.
    pub fn prepare(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)
            .with_context(|| format!("Cannot create scratch dir {}", root.display()))?;

        let mut removed = 0usize;
        for entry in fs::read_dir(root)
            .with_context(|| format!("Cannot list scratch dir {}", root.display()))?
        {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(dir = %root.display(), error = %e, "Cannot read scratch entry");
                    continue;
                }
            };
            let path = entry.path();
            let result = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            match result {
                Ok(()) => removed += 1,
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to delete scratch entry"),
            }
        }

        debug!(dir = %root.display(), removed, "Scratch dir ready");
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Chemin d'un fichier du répertoire
    pub fn file(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}
