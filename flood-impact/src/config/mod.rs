//! Configuration d'une série de scénarios

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fldimpact::{is_geographic_epsg, RasterHeader, DEFAULT_CELL_HECTARES, DEFAULT_EPSG};
use tracing::warn;

/// Variable d'environnement : répertoire de travail temporaire
pub const ENV_SCRATCH_DIR: &str = "FLDIMPACT_SCRATCH_DIR";

/// Variable d'environnement : répertoire du CSV final
pub const ENV_OUTPUT_DIR: &str = "FLDIMPACT_OUTPUT_DIR";

/// Configuration principale
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub datasets: Datasets,

    pub location: Location,

    #[serde(default)]
    pub scenario: ScenarioMeta,

    #[serde(default)]
    pub agriculture: Agriculture,

    /// Répertoire des fichiers intermédiaires (vidé à chaque exécution)
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// Répertoire du CSV final
    #[serde(default = "default_scratch_dir")]
    pub output_dir: PathBuf,

    /// Cartes d'inondation à ignorer (nom de fichier ou nom sans extension)
    #[serde(default)]
    pub exclude_layers: Vec<String>,

    /// EPSG de travail (l'emprise y est ramenée avant tout calcul)
    #[serde(default = "default_epsg")]
    pub target_epsg: u32,

    /// EPSG supposé pour les emprises sans CRS déclaré
    #[serde(default = "default_epsg")]
    pub flood_epsg: u32,

    /// EPSG supposé pour les points OSM sans CRS déclaré
    #[serde(default = "default_epsg")]
    pub amenity_epsg: u32,

    /// Répertoire de référence des chemins relatifs
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Jeux de données auxiliaires
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Datasets {
    /// Raster des terres cultivées (classe 2 = culture)
    pub cropland: PathBuf,

    /// Raster de population (habitants par cellule)
    pub population: PathBuf,

    /// Points OSM (attribut `amenity` ou `other_tags`)
    pub amenities: PathBuf,
}

/// Localisation reportée dans chaque ligne du CSV
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Location {
    pub country: String,
    #[serde(default)]
    pub province: String,
    pub region: String,
}

/// Métadonnées constantes d'une série de scénarios
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioMeta {
    #[serde(default)]
    pub return_period: Option<String>,
    #[serde(default)]
    pub flowrate: Option<f64>,
    #[serde(default)]
    pub flood_date: Option<String>,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default = "default_impact_method")]
    pub impact_method: String,
    #[serde(default = "default_map_method")]
    pub map_method: String,
}

impl Default for ScenarioMeta {
    fn default() -> Self {
        Self {
            return_period: None,
            flowrate: None,
            flood_date: None,
            event: None,
            impact_method: default_impact_method(),
            map_method: default_map_method(),
        }
    }
}

/// Paramètres de l'estimation agricole
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Agriculture {
    #[serde(default)]
    pub cell_hectares: CellHectares,
}

/// Surface d'une cellule de culture : valeur fixe ou `"auto"`
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CellHectares {
    Fixed(f64),
    Auto(AutoArea),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoArea {
    Auto,
}

impl Default for CellHectares {
    fn default() -> Self {
        CellHectares::Fixed(DEFAULT_CELL_HECTARES)
    }
}

impl CellHectares {
    /// Hectares par cellule pour un raster donné
    ///
    /// `auto` n'a de sens que pour un raster en CRS projeté ; sinon la valeur
    /// par défaut (cellule de 30 m) est utilisée.
    pub fn resolve(&self, header: &RasterHeader) -> f64 {
        match self {
            CellHectares::Fixed(v) => *v,
            CellHectares::Auto(_) => match header.epsg {
                Some(epsg) if !is_geographic_epsg(epsg) => header.transform.cell_hectares(),
                epsg => {
                    warn!(
                        epsg = ?epsg,
                        default = DEFAULT_CELL_HECTARES,
                        "Automatic cell area needs a projected raster, using default"
                    );
                    DEFAULT_CELL_HECTARES
                }
            },
        }
    }
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from("temp")
}

fn default_epsg() -> u32 {
    DEFAULT_EPSG
}

fn default_impact_method() -> String {
    "Rust".to_string()
}

fn default_map_method() -> String {
    "HAND".to_string()
}

impl Config {
    /// Charge une configuration depuis un fichier
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let mut config: Self =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(config)
    }

    /// Charge une configuration depuis un preset embarqué
    pub fn from_preset(preset: &str) -> Result<Self> {
        match preset {
            "default" => Self::load_embedded(include_str!("presets/default.json")),
            _ => anyhow::bail!("Unknown preset: {}. Use: default", preset),
        }
    }

    fn load_embedded(json: &str) -> Result<Self> {
        let mut config: Self =
            serde_json::from_str(json).context("Failed to parse embedded config")?;
        config.base_dir = std::env::current_dir().unwrap_or_default();
        Ok(config)
    }

    /// Nom de preset ou chemin vers un fichier JSON
    pub fn resolve(name_or_path: &str) -> Result<Self> {
        let path = Path::new(name_or_path);
        let mut config = if path.exists() || name_or_path.ends_with(".json") {
            Self::load(path)?
        } else {
            Self::from_preset(name_or_path)?
        };
        config.apply_env();
        Ok(config)
    }

    /// Applique les surcharges d'environnement (`.env` compris)
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(ENV_SCRATCH_DIR).ok(),
            std::env::var(ENV_OUTPUT_DIR).ok(),
        );
    }

    fn apply_overrides(&mut self, scratch: Option<String>, output: Option<String>) {
        if let Some(dir) = scratch.filter(|s| !s.is_empty()) {
            self.scratch_dir = PathBuf::from(dir);
        }
        if let Some(dir) = output.filter(|s| !s.is_empty()) {
            self.output_dir = PathBuf::from(dir);
        }
    }

    /// Résout un chemin relatif par rapport au fichier de configuration
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn cropland_path(&self) -> PathBuf {
        self.resolve_path(&self.datasets.cropland)
    }

    pub fn population_path(&self) -> PathBuf {
        self.resolve_path(&self.datasets.population)
    }

    pub fn amenities_path(&self) -> PathBuf {
        self.resolve_path(&self.datasets.amenities)
    }

    pub fn scratch_path(&self) -> PathBuf {
        self.resolve_path(&self.scratch_dir)
    }

    pub fn output_path(&self) -> PathBuf {
        self.resolve_path(&self.output_dir)
    }

    /// Nom du CSV final : `<region>_<country>_flood_impact.csv`
    pub fn output_file_name(&self) -> String {
        format!(
            "{}_{}_flood_impact.csv",
            self.location.region, self.location.country
        )
    }

    /// Noms (fichier et nom sans extension) exclus du traitement par lot
    pub fn exclusions(&self) -> HashSet<&str> {
        self.exclude_layers.iter().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fldimpact::{GeoTransform, Grid};

    #[test]
    fn test_default_preset() {
        let config = Config::from_preset("default").unwrap();
        assert_eq!(config.location.country, "Peru");
        assert_eq!(config.target_epsg, 4326);
        assert_eq!(
            config.agriculture.cell_hectares,
            CellHectares::Fixed(0.09)
        );
        assert_eq!(config.output_file_name(), "Chazuta_Peru_flood_impact.csv");
    }

    #[test]
    fn test_unknown_preset() {
        assert!(Config::from_preset("nope").is_err());
    }

    #[test]
    fn test_minimal_config_defaults() {
        let json = r#"{
            "datasets": {"cropland": "c.tif", "population": "p.tif", "amenities": "o.geojson"},
            "location": {"country": "Dominican Republic", "region": "Santiago"},
            "agriculture": {"cell_hectares": "auto"}
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.location.province, "");
        assert_eq!(config.scenario.map_method, "HAND");
        assert_eq!(config.scenario.return_period, None);
        assert_eq!(config.scratch_dir, PathBuf::from("temp"));
        assert_eq!(config.flood_epsg, 4326);
        assert_eq!(
            config.agriculture.cell_hectares,
            CellHectares::Auto(AutoArea::Auto)
        );
    }

    #[test]
    fn test_relative_paths_follow_config_file() {
        let dir = std::env::temp_dir().join("flood_impact_config_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(
            &path,
            r#"{"datasets": {"cropland": "c.tif", "population": "/abs/p.tif", "amenities": "o.shp"},
                "location": {"country": "Peru", "region": "Chazuta"}}"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.cropland_path(), dir.join("c.tif"));
        assert_eq!(config.population_path(), PathBuf::from("/abs/p.tif"));
        assert_eq!(config.scratch_path(), dir.join("temp"));

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::from_preset("default").unwrap();
        config.apply_overrides(Some("/tmp/scratch".to_string()), Some(String::new()));
        assert_eq!(config.scratch_dir, PathBuf::from("/tmp/scratch"));
        assert_eq!(config.output_dir, PathBuf::from("temp"));
    }

    #[test]
    fn test_cell_hectares_resolve() {
        let mut grid = Grid::new(
            1,
            1,
            vec![2.0],
            GeoTransform {
                origin_x: 0.0,
                origin_y: 0.0,
                pixel_width: 20.0,
                pixel_height: 20.0,
            },
        )
        .unwrap();
        let auto = CellHectares::Auto(AutoArea::Auto);

        grid.epsg = Some(32718);
        assert!((auto.resolve(&grid.header()) - 0.04).abs() < 1e-12);

        grid.epsg = Some(4326);
        assert_eq!(auto.resolve(&grid.header()), DEFAULT_CELL_HECTARES);

        assert_eq!(CellHectares::Fixed(0.5).resolve(&grid.header()), 0.5);
    }
}
