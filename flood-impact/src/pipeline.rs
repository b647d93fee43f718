//! Traitement d'un scénario d'inondation et traitement par lot
//!
//! Un scénario = une emprise d'inondation croisée avec les trois jeux de
//! données auxiliaires (cultures, population, équipements OSM). Les fichiers
//! intermédiaires sont écrits dans le répertoire de travail.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use fldimpact::vector::VectorFormat;
use fldimpact::{
    agriculture_hectares, clip_points, classify, count_amenities, drop_value, fix_geometries,
    polygonize, read_amenity_layer, read_flood_extent, read_geotiff, read_geotiff_header,
    read_geotiff_window, summarize, write_geotiff, AmenityLayer, AmenityPoint, CategoryCounts,
    CellWeight, FloodExtent, Grid, RasterHeader, ReclassRule, WeightedPoint,
};
use geo::{BoundingRect, Geometry, Point, Rect};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::export::csv::write_points_csv;
use crate::export::geojson::{export_to_geojson, OutputFeature};
use crate::export::{write_impact_csv, ImpactRecord, Reprojector};
use crate::report::{ImpactReport, ScenarioSummary};
use crate::scratch::{self, ScratchDir};

/// Raster dont seul l'en-tête est chargé, les pixels sont lus par fenêtre
struct RasterSource {
    name: &'static str,
    path: PathBuf,
    header: RasterHeader,
}

impl RasterSource {
    fn open(name: &'static str, path: PathBuf) -> Result<Self> {
        let header = read_geotiff_header(&path)
            .with_context(|| format!("Failed to read {} raster {}", name, path.display()))?;
        Ok(Self { name, path, header })
    }
}

/// Jeux de données chargés une fois pour toute une série de scénarios
pub struct ImpactContext {
    pub config: Config,
    cropland: RasterSource,
    population: RasterSource,
    amenities: AmenityLayer,
    scratch: ScratchDir,
}

impl ImpactContext {
    /// Prépare le répertoire de travail et charge les rasters et les points
    pub fn load(config: Config) -> Result<Self> {
        let scratch = ScratchDir::prepare(&config.scratch_path())?;

        let cropland = RasterSource::open("cropland", config.cropland_path())?;
        let population = RasterSource::open("population", config.population_path())?;

        let amenities_path = config.amenities_path();
        let amenities = read_amenity_layer(&amenities_path, config.amenity_epsg).with_context(|| {
            format!("Failed to read amenity layer {}", amenities_path.display())
        })?;

        info!(
            cropland = %format!("{}x{}", cropland.header.width, cropland.header.height),
            population = %format!("{}x{}", population.header.width, population.header.height),
            amenities = amenities.points.len(),
            untagged = amenities.untagged,
            "Datasets loaded"
        );

        Ok(Self {
            config,
            cropland,
            population,
            amenities,
            scratch,
        })
    }

    pub fn scratch(&self) -> &ScratchDir {
        &self.scratch
    }
}

/// Résultat d'un scénario
#[derive(Debug, Clone)]
pub struct ScenarioOutcome {
    /// Ligne du CSV final
    pub record: ImpactRecord,
    /// Comptes par catégorie (avec les tags non classés)
    pub counts: CategoryCounts,
    /// Comptes par tag OSM
    pub tags: BTreeMap<String, usize>,
}

impl ScenarioOutcome {
    pub fn summary(&self) -> ScenarioSummary {
        ScenarioSummary::new(&self.record, self.tags.clone(), self.counts.unclassified)
    }
}

/// Résultat d'un traitement par lot
#[derive(Debug)]
pub struct BatchOutcome {
    pub records: Vec<ImpactRecord>,
    /// CSV écrit
    pub output: PathBuf,
    pub report: ImpactReport,
}

/// Nom d'une carte d'inondation (nom de fichier sans extension)
pub fn layer_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Collecte les cartes d'inondation d'un répertoire, triées par nom
///
/// Une carte est exclue si son nom de fichier ou son nom sans extension
/// figure dans `exclude`.
pub fn collect_flood_maps(dir: &Path, exclude: &HashSet<&str>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir).with_context(|| format!("Cannot read directory {}", dir.display()))? {
        let path = entry?.path();
        if !path.is_file() || VectorFormat::from_path(&path).is_none() {
            continue;
        }
        let file_name = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        if exclude.contains(file_name.as_str()) || exclude.contains(layer_name(&path).as_str()) {
            debug!(file = %file_name, "Flood map excluded");
            continue;
        }
        files.push(path);
    }

    files.sort();
    Ok(files)
}

/// Traite un scénario : emprise → cultures → population → équipements
pub fn run_scenario(ctx: &ImpactContext, flood_path: &Path, layer_name: &str) -> Result<ScenarioOutcome> {
    let config = &ctx.config;
    let scratch = &ctx.scratch;

    let raw = read_flood_extent(flood_path, config.flood_epsg)
        .with_context(|| format!("Failed to read flood map {}", flood_path.display()))?;
    let extent = normalize_extent(raw, config.target_epsg)?;
    let Some(bbox) = extent.geometry.bounding_rect() else {
        bail!("Flood map {} has no polygon", flood_path.display());
    };
    info!(
        layer = layer_name,
        polygons = extent.geometry.0.len(),
        epsg = extent.epsg,
        flood_depth = ?extent.flood_depth,
        "Flood extent loaded"
    );

    export_to_geojson(
        [OutputFeature::new(extent.geometry.clone())],
        extent.epsg,
        &scratch.file(scratch::FLOOD_POLYGON),
    )?;

    // Cultures
    let cell_hectares = config.agriculture.cell_hectares.resolve(&ctx.cropland.header);
    let crop_grid = window(&ctx.cropland, &bbox, extent.epsg)?
        .reclass(&ReclassRule::cropland())
        .with_nodata(0.0);
    let mut crop_points = crop_grid.cell_points(CellWeight::Constant(cell_hectares));
    to_extent_crs(&mut crop_points, raster_epsg(&crop_grid, extent.epsg), extent.epsg)?;
    write_points_csv(&crop_points, "Hectares", &scratch.file(scratch::CROP_POINTS))?;

    let flooded_crops = clip_points(&crop_points, &extent.geometry);
    export_weighted(&flooded_crops, "Hectares", extent.epsg, &scratch.file(scratch::AG_POLYGON))?;
    let hectares = agriculture_hectares(flooded_crops.len(), cell_hectares);
    debug!(
        cells = crop_points.len(),
        flooded = flooded_crops.len(),
        hectares,
        "Agriculture aggregated"
    );

    // Population
    let pop_grid = window(&ctx.population, &bbox, extent.epsg)?;
    let mut pop_points = pop_grid.cell_points(CellWeight::TruncatedValue);
    to_extent_crs(&mut pop_points, raster_epsg(&pop_grid, extent.epsg), extent.epsg)?;
    write_points_csv(&pop_points, "Population", &scratch.file(scratch::POP_POINTS))?;

    let flooded_pop = clip_points(&pop_points, &extent.geometry);
    export_weighted(&flooded_pop, "Population", extent.epsg, &scratch.file(scratch::POP_POLYGON))?;
    let population = summarize(&pop_points, &extent.geometry);
    debug!(
        cells = pop_points.len(),
        flooded = population.count,
        total = population.total,
        "Population aggregated"
    );

    // Équipements
    let amenities = amenities_in_crs(&ctx.amenities, extent.epsg)?;
    let (counts, tags) = count_amenities(&amenities, &extent.geometry);
    let flooded_amenities = clip_points(&amenities, &extent.geometry);
    if !flooded_amenities.is_empty() {
        let features = flooded_amenities.iter().map(|a| {
            let group = classify(&a.amenity).map(|c| c.label()).unwrap_or("unclassified");
            OutputFeature::new(a.point)
                .with("Amenity", a.amenity.as_str())
                .with("Amenity_Group", group)
        });
        export_to_geojson(features, extent.epsg, &scratch.file(scratch::OSM_POLYGON))?;
    }

    let mut record = ImpactRecord {
        country: config.location.country.clone(),
        province: config.location.province.clone(),
        region: config.location.region.clone(),
        return_period: config.scenario.return_period.clone(),
        flood_depth: extent.flood_depth,
        flowrate: config.scenario.flowrate,
        flood_date: config.scenario.flood_date.clone(),
        event: config.scenario.event.clone(),
        impact_method: config.scenario.impact_method.clone(),
        map_method: config.scenario.map_method.clone(),
        flood_map_name: layer_name.to_string(),
        agriculture_ha: hectares,
        population: population.total.max(0.0) as u64,
        education: 0,
        entertainment: 0,
        facilities: 0,
        financial: 0,
        food: 0,
        healthcare: 0,
        others: 0,
        public_service: 0,
        transportation: 0,
        waste_management: 0,
    };
    record.set_counts(&counts);

    info!(
        layer = layer_name,
        hectares,
        population = record.population,
        amenities = counts.total(),
        unclassified = counts.unclassified,
        "Scenario done"
    );

    Ok(ScenarioOutcome {
        record,
        counts,
        tags,
    })
}

/// Traite toutes les cartes d'un répertoire puis écrit le CSV final
pub fn run_batch(ctx: &ImpactContext, dir: &Path) -> Result<BatchOutcome> {
    let start = Instant::now();
    let config = &ctx.config;

    let maps = collect_flood_maps(dir, &config.exclusions())?;
    if maps.is_empty() {
        bail!("No flood map (.geojson, .json, .shp) found in {}", dir.display());
    }
    info!(count = maps.len(), dir = %dir.display(), "Flood maps found");

    let mut report = ImpactReport::new(&format!(
        "{}, {}",
        config.location.region, config.location.country
    ));
    let mut records = Vec::with_capacity(maps.len());

    for (i, path) in maps.iter().enumerate() {
        let name = layer_name(path);
        info!(layer = %name, "[{}/{}] Processing", i + 1, maps.len());
        let outcome = run_scenario(ctx, path, &name)
            .with_context(|| format!("Scenario {} failed", name))?;
        report.record_scenario(outcome.summary());
        records.push(outcome.record);
    }

    let output_dir = config.output_path();
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Cannot create output dir {}", output_dir.display()))?;
    let output = output_dir.join(config.output_file_name());
    write_impact_csv(&records, &output)?;

    report.set_output(&output);
    report.set_duration(start.elapsed());
    info!(records = records.len(), output = %output.display(), "Batch done");

    Ok(BatchOutcome {
        records,
        output,
        report,
    })
}

/// Raster d'inondation → polygones GeoJSON
///
/// Retourne le nombre de polygones écrits.
pub fn run_polygonize(
    raster: &Path,
    output: &Path,
    reclass_output: Option<&Path>,
    srid: u32,
) -> Result<usize> {
    let grid = read_geotiff(raster)
        .with_context(|| format!("Failed to read flood raster {}", raster.display()))?;
    let source_epsg = grid.epsg.unwrap_or_else(|| {
        warn!(raster = %raster.display(), srid, "Raster has no EPSG, assuming output SRID");
        srid
    });

    let mask = grid.reclass(&ReclassRule::flood_mask()).with_nodata(0.0);
    if let Some(path) = reclass_output {
        write_geotiff(&mask, path)
            .with_context(|| format!("Failed to write reclassified raster {}", path.display()))?;
        debug!(path = %path.display(), "Reclassified raster written");
    }

    let polygons = fix_geometries(drop_value(polygonize(&mask), 0.0));
    debug!(polygons = polygons.len(), "Flood raster polygonized");

    let reprojector = Reprojector::new(source_epsg, srid)?;
    let features = polygons
        .into_iter()
        .map(|vp| {
            let geometry = reprojector.transform_geometry(&Geometry::Polygon(vp.polygon))?;
            Ok(OutputFeature::new(geometry).with("Value", vp.value))
        })
        .collect::<Result<Vec<_>>>()?;

    let count = export_to_geojson(features, srid, output)?;
    info!(polygons = count, output = %output.display(), "Flood polygons written");
    Ok(count)
}

/// Ramène l'emprise dans l'EPSG de travail
fn normalize_extent(extent: FloodExtent, target_epsg: u32) -> Result<FloodExtent> {
    if extent.epsg == target_epsg {
        return Ok(extent);
    }
    let reprojector = Reprojector::new(extent.epsg, target_epsg)?;
    debug!(from = extent.epsg, to = target_epsg, "Reprojecting flood extent");
    Ok(FloodExtent {
        geometry: reprojector.transform_multipolygon(&extent.geometry)?,
        epsg: target_epsg,
        flood_depth: extent.flood_depth,
    })
}

/// EPSG d'un raster, celui de l'emprise s'il n'est pas déclaré
fn raster_epsg(grid: &Grid, extent_epsg: u32) -> u32 {
    grid.epsg.unwrap_or(extent_epsg)
}

/// Lit la fenêtre d'un raster couverte par l'emprise
///
/// La bbox est reprojetée dans le CRS du raster, seuls les blocs qui
/// l'intersectent sont décodés.
fn window(source: &RasterSource, bbox: &Rect, extent_epsg: u32) -> Result<Grid> {
    let epsg = match source.header.epsg {
        Some(epsg) => epsg,
        None => {
            warn!(raster = source.name, epsg = extent_epsg, "Raster has no EPSG, assuming flood extent CRS");
            extent_epsg
        }
    };
    let reprojector = Reprojector::new(extent_epsg, epsg)?;
    let rect = reprojector.transform_rect(bbox)?;
    let clipped = read_geotiff_window(&source.path, &rect).with_context(|| {
        format!(
            "Flood extent does not overlap the {} raster {}",
            source.name,
            source.path.display()
        )
    })?;
    debug!(
        raster = source.name,
        width = clipped.width,
        height = clipped.height,
        valid = clipped.valid_cells(),
        "Raster window"
    );
    Ok(clipped)
}

/// Reprojette des points pondérés sur place
fn to_extent_crs(points: &mut [WeightedPoint], from: u32, to: u32) -> Result<()> {
    let reprojector = Reprojector::new(from, to)?;
    if reprojector.is_identity() {
        return Ok(());
    }
    let mut coords: Vec<Point> = points.iter().map(|p| p.point).collect();
    reprojector.transform_points(&mut coords)?;
    for (wp, p) in points.iter_mut().zip(coords) {
        wp.point = p;
    }
    Ok(())
}

/// Points OSM dans l'EPSG de l'emprise
fn amenities_in_crs(layer: &AmenityLayer, epsg: u32) -> Result<Vec<AmenityPoint>> {
    let mut points = layer.points.clone();
    let reprojector = Reprojector::new(layer.epsg, epsg)?;
    if reprojector.is_identity() {
        return Ok(points);
    }
    let mut coords: Vec<Point> = points.iter().map(|a| a.point).collect();
    reprojector.transform_points(&mut coords)?;
    for (a, p) in points.iter_mut().zip(coords) {
        a.point = p;
    }
    Ok(points)
}

/// Écrit des points pondérés retenus en GeoJSON (collection vide comprise)
fn export_weighted(points: &[&WeightedPoint], column: &'static str, epsg: u32, path: &Path) -> Result<usize> {
    let features = points
        .iter()
        .map(|wp| OutputFeature::new(wp.point).with(column, wp.weight));
    export_to_geojson(features, epsg, path)
}
