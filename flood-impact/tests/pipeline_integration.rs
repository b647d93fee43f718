//! Tests d'intégration : configuration → lot de scénarios → CSV d'impacts
//!
//! Les scénarios de base sont en EPSG:32718 (aucune reprojection). Le module
//! `reprojection` croise une emprise en EPSG:4326 avec des rasters et des
//! points en EPSG:32718.

use std::fs;
use std::path::{Path, PathBuf};

use fldimpact::{read_geotiff, write_geotiff, GeoTransform, Grid};
use flood_impact::export::csv::IMPACT_COLUMNS;
use flood_impact::pipeline::{run_batch, run_polygonize, run_scenario, ImpactContext};
use flood_impact::Config;

const SIZE: usize = 20;

fn grid_from(f: impl Fn(usize, usize) -> f64, nodata: f64) -> Grid {
    let data = (0..SIZE * SIZE).map(|i| f(i / SIZE, i % SIZE)).collect();
    let mut grid = Grid::new(
        SIZE,
        SIZE,
        data,
        GeoTransform {
            origin_x: 0.0,
            origin_y: SIZE as f64,
            pixel_width: 1.0,
            pixel_height: 1.0,
        },
    )
    .unwrap()
    .with_nodata(nodata);
    grid.epsg = Some(32718);
    grid
}

/// Trois cellules de culture dans le carré (0,0)-(10,10)
fn cropland() -> Grid {
    grid_from(
        |row, col| match (row, col) {
            (10, 0) | (19, 9) => 2.0,
            (15, 5) => 3.0,
            (12, 3) => 1.0,
            (11, 15) => 255.0,
            (0, 0) | (5, 15) => 2.0,
            _ => 0.0,
        },
        255.0,
    )
}

/// 50 cellules inondées : 49 x 24 + 54 = 1230 habitants
fn population() -> Grid {
    grid_from(
        |row, col| {
            if row < 10 {
                100.0
            } else if (10..15).contains(&row) && col < 10 {
                if (row, col) == (10, 0) {
                    54.5
                } else {
                    24.9
                }
            } else {
                -9999.0
            }
        },
        -9999.0,
    )
}

const FLOOD_MAP: &str = r#"{
  "type": "FeatureCollection",
  "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::32718"}},
  "features": [{
    "type": "Feature",
    "properties": {"FloodValue": 2.5},
    "geometry": {"type": "Polygon", "coordinates": [[[0,0],[10,0],[10,10],[0,10],[0,0]]]}
  }]
}"#;

const AMENITIES: &str = r#"{
  "type": "FeatureCollection",
  "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::32718"}},
  "features": [
    {"type": "Feature", "properties": {"amenity": "school"},
     "geometry": {"type": "Point", "coordinates": [15, 15]}},
    {"type": "Feature", "properties": {"other_tags": "\"amenity\"=>\"hospital\""},
     "geometry": {"type": "Point", "coordinates": [-3, 4]}}
  ]
}"#;

/// Prépare un répertoire de travail complet et retourne sa racine
fn setup(name: &str) -> PathBuf {
    let root = std::env::temp_dir().join(name);
    fs::remove_dir_all(&root).ok();
    fs::create_dir_all(root.join("data")).unwrap();
    fs::create_dir_all(root.join("maps")).unwrap();

    write_geotiff(&cropland(), &root.join("data/cropland.tif")).unwrap();
    write_geotiff(&population(), &root.join("data/population.tif")).unwrap();
    fs::write(root.join("data/amenities.geojson"), AMENITIES).unwrap();
    fs::write(root.join("maps/fld_100yr.geojson"), FLOOD_MAP).unwrap();
    fs::write(root.join("maps/fld_old.geojson"), FLOOD_MAP).unwrap();
    fs::write(root.join("maps/readme.txt"), "not a map").unwrap();

    fs::write(
        root.join("config.json"),
        r#"{
            "datasets": {
                "cropland": "data/cropland.tif",
                "population": "data/population.tif",
                "amenities": "data/amenities.geojson"
            },
            "location": {"country": "Peru", "province": "San Martin", "region": "Chazuta"},
            "scenario": {"return_period": "100yr", "impact_method": "Rust", "map_method": "HAND"},
            "scratch_dir": "scratch",
            "output_dir": "out",
            "exclude_layers": ["fld_old"],
            "target_epsg": 32718,
            "flood_epsg": 32718,
            "amenity_epsg": 32718
        }"#,
    )
    .unwrap();

    root
}

fn load_context(root: &Path) -> ImpactContext {
    let config = Config::load(&root.join("config.json")).unwrap();
    ImpactContext::load(config).unwrap()
}

#[test]
fn test_scenario_impacts() {
    let root = setup("flood_impact_it_scenario");
    let ctx = load_context(&root);

    let outcome = run_scenario(&ctx, &root.join("maps/fld_100yr.geojson"), "fld_100yr").unwrap();
    let record = &outcome.record;

    assert!((record.agriculture_ha - 0.27).abs() < 1e-9);
    assert_eq!(record.population, 1230);
    assert_eq!(record.flood_depth, Some(2.5));
    assert_eq!(record.return_period.as_deref(), Some("100yr"));
    assert_eq!(outcome.counts.total(), 0);
    assert_eq!(outcome.counts.unclassified, 0);
    assert!(outcome.tags.is_empty());

    // Fichiers intermédiaires (pas d'équipement inondé → pas d'osm_poly)
    let pattern = format!("{}/*.geojson", root.join("scratch").display());
    let mut geojson: Vec<String> = glob::glob(&pattern)
        .unwrap()
        .filter_map(Result::ok)
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    geojson.sort();
    assert_eq!(geojson, vec!["ag_poly.geojson", "fld_poly.geojson", "pop_poly.geojson"]);

    let pattern = format!("{}/*.csv", root.join("scratch").display());
    assert_eq!(glob::glob(&pattern).unwrap().count(), 2);

    let ag: geojson::GeoJson = fs::read_to_string(root.join("scratch/ag_poly.geojson"))
        .unwrap()
        .parse()
        .unwrap();
    match ag {
        geojson::GeoJson::FeatureCollection(fc) => assert_eq!(fc.features.len(), 3),
        other => panic!("Expected FeatureCollection, got {:?}", other),
    }

    fs::remove_dir_all(root).ok();
}

#[test]
fn test_batch_writes_impact_csv() {
    let root = setup("flood_impact_it_batch");
    let ctx = load_context(&root);

    let outcome = run_batch(&ctx, &root.join("maps")).unwrap();
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.output, root.join("out/Chazuta_Peru_flood_impact.csv"));
    assert_eq!(outcome.report.scenarios.len(), 1);

    let mut reader = csv::Reader::from_path(&outcome.output).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(headers, IMPACT_COLUMNS);

    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(&row[0], "Peru");
    assert_eq!(&row[1], "San Martin");
    assert_eq!(&row[2], "Chazuta");
    assert_eq!(&row[3], "100yr");
    assert_eq!(&row[4], "2.5");
    assert_eq!(&row[5], "");
    assert_eq!(&row[10], "fld_100yr");
    assert!((row[11].parse::<f64>().unwrap() - 0.27).abs() < 1e-9);
    assert_eq!(&row[12], "1230");
    for i in 13..23 {
        assert_eq!(&row[i], "0", "column {}", IMPACT_COLUMNS[i]);
    }

    fs::remove_dir_all(root).ok();
}

#[test]
fn test_batch_empty_dir_fails() {
    let root = setup("flood_impact_it_empty");
    let ctx = load_context(&root);
    fs::create_dir_all(root.join("nothing")).unwrap();

    assert!(run_batch(&ctx, &root.join("nothing")).is_err());

    fs::remove_dir_all(root).ok();
}

#[test]
fn test_polygonize_command() {
    let root = std::env::temp_dir().join("flood_impact_it_polygonize");
    fs::remove_dir_all(&root).ok();
    fs::create_dir_all(&root).unwrap();

    // Deux zones inondées séparées et un nodata
    let flood = grid_from(
        |row, col| {
            if (2..4).contains(&row) && (2..4).contains(&col) {
                1.0
            } else if (10..13).contains(&row) && (10..13).contains(&col) {
                3.2
            } else if row == 19 {
                -1.0
            } else {
                0.0
            }
        },
        -1.0,
    );
    let raster = root.join("flood.tif");
    write_geotiff(&flood, &raster).unwrap();

    let output = root.join("flood.geojson");
    let reclass = root.join("flood_reclass.tif");
    let count = run_polygonize(&raster, &output, Some(&reclass), 32718).unwrap();
    assert_eq!(count, 2);

    let mask = read_geotiff(&reclass).unwrap();
    assert_eq!(mask.nodata, Some(0.0));
    assert_eq!(mask.data.iter().filter(|&&v| v == 1.0).count(), 4 + 9);

    let parsed: geojson::GeoJson = fs::read_to_string(&output).unwrap().parse().unwrap();
    match parsed {
        geojson::GeoJson::FeatureCollection(fc) => {
            assert_eq!(fc.features.len(), 2);
            for feature in &fc.features {
                assert_eq!(feature.property("Value").and_then(|v| v.as_f64()), Some(1.0));
            }
        }
        other => panic!("Expected FeatureCollection, got {:?}", other),
    }

    fs::remove_dir_all(root).ok();
}

#[cfg(feature = "reproject")]
mod reprojection {
    use super::*;
    use flood_impact::export::Reprojector;
    use geo::Point;

    const ORIGIN_X: f64 = 380_000.0;
    const ORIGIN_Y: f64 = 9_280_600.0;
    const CELL: f64 = 30.0;

    /// Raster 20x20 de 30 m en UTM 18S
    fn utm_grid(f: impl Fn(usize, usize) -> f64, nodata: f64) -> Grid {
        let data = (0..SIZE * SIZE).map(|i| f(i / SIZE, i % SIZE)).collect();
        let mut grid = Grid::new(
            SIZE,
            SIZE,
            data,
            GeoTransform {
                origin_x: ORIGIN_X,
                origin_y: ORIGIN_Y,
                pixel_width: CELL,
                pixel_height: CELL,
            },
        )
        .unwrap()
        .with_nodata(nodata);
        grid.epsg = Some(32718);
        grid
    }

    /// Cellules des lignes 7..17 et colonnes 3..13
    fn in_flood(row: usize, col: usize) -> bool {
        (7..17).contains(&row) && (3..13).contains(&col)
    }

    /// Coin (x, y) en UTM d'un nœud de grille
    fn node(row: usize, col: usize) -> Point {
        Point::new(ORIGIN_X + col as f64 * CELL, ORIGIN_Y - row as f64 * CELL)
    }

    /// Emprise : les bords suivent les limites de cellules, en EPSG:4326
    fn flood_map_wgs84() -> String {
        let mut ring = vec![node(17, 3), node(17, 13), node(7, 13), node(7, 3), node(17, 3)];
        Reprojector::new(32718, 4326)
            .unwrap()
            .transform_points(&mut ring)
            .unwrap();
        let coords: Vec<[f64; 2]> = ring.iter().map(|p| [p.x(), p.y()]).collect();

        serde_json::json!({
            "type": "FeatureCollection",
            "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::4326"}},
            "features": [{
                "type": "Feature",
                "properties": {"FloodValue": 1.2},
                "geometry": {"type": "Polygon", "coordinates": [coords]}
            }]
        })
        .to_string()
    }

    fn amenities_utm() -> String {
        let inside = node(12, 8);
        let outside = node(2, 18);
        serde_json::json!({
            "type": "FeatureCollection",
            "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::32718"}},
            "features": [
                {"type": "Feature", "properties": {"amenity": "school"},
                 "geometry": {"type": "Point", "coordinates": [inside.x() + 5.0, inside.y() - 5.0]}},
                {"type": "Feature", "properties": {"amenity": "hospital"},
                 "geometry": {"type": "Point", "coordinates": [outside.x(), outside.y()]}}
            ]
        })
        .to_string()
    }

    fn setup_mixed_crs(name: &str) -> PathBuf {
        let root = std::env::temp_dir().join(name);
        fs::remove_dir_all(&root).ok();
        fs::create_dir_all(root.join("data")).unwrap();

        // 3 cellules de culture dans l'emprise, 3 autres juste à côté
        let cropland = utm_grid(
            |row, col| match (row, col) {
                (8, 4) | (12, 8) => 2.0,
                (16, 12) => 3.0,
                (10, 10) => 1.0,
                (7, 2) | (6, 5) | (17, 12) => 2.0,
                _ => 0.0,
            },
            255.0,
        );
        // 100 cellules inondées à 10.8 habitants, une en nodata
        let population = utm_grid(
            |row, col| match (row, col) {
                (9, 9) => -9999.0,
                (r, c) if in_flood(r, c) => 10.8,
                _ => 500.0,
            },
            -9999.0,
        );

        write_geotiff(&cropland, &root.join("data/cropland.tif")).unwrap();
        write_geotiff(&population, &root.join("data/population.tif")).unwrap();
        fs::write(root.join("data/amenities.geojson"), amenities_utm()).unwrap();
        fs::write(root.join("fld_wgs84.geojson"), flood_map_wgs84()).unwrap();

        fs::write(
            root.join("config.json"),
            r#"{
                "datasets": {
                    "cropland": "data/cropland.tif",
                    "population": "data/population.tif",
                    "amenities": "data/amenities.geojson"
                },
                "location": {"country": "Peru", "province": "San Martin", "region": "Chazuta"},
                "scratch_dir": "scratch",
                "output_dir": "out",
                "target_epsg": 4326,
                "flood_epsg": 4326,
                "amenity_epsg": 32718
            }"#,
        )
        .unwrap();

        root
    }

    #[test]
    fn test_scenario_wgs84_extent_over_utm_rasters() {
        let root = setup_mixed_crs("flood_impact_it_mixed_crs");
        let ctx = load_context(&root);

        let outcome = run_scenario(&ctx, &root.join("fld_wgs84.geojson"), "fld_wgs84").unwrap();
        let record = &outcome.record;

        assert!((record.agriculture_ha - 0.27).abs() < 1e-9);
        assert_eq!(record.population, 99 * 10);
        assert_eq!(record.flood_depth, Some(1.2));
        assert_eq!(outcome.counts.total(), 1);
        assert_eq!(record.education, 1);
        assert_eq!(record.healthcare, 0);
        assert_eq!(outcome.tags.get("school"), Some(&1));

        // Les points intermédiaires sont écrits dans le CRS de l'emprise
        let ag: geojson::GeoJson = fs::read_to_string(root.join("scratch/ag_poly.geojson"))
            .unwrap()
            .parse()
            .unwrap();
        match ag {
            geojson::GeoJson::FeatureCollection(fc) => {
                assert_eq!(fc.features.len(), 3);
                for feature in &fc.features {
                    match feature.geometry.as_ref().map(|g| &g.value) {
                        Some(geojson::Value::Point(c)) => {
                            assert!((-76.2..-75.9).contains(&c[0]), "lon {}", c[0]);
                            assert!((-6.6..-6.4).contains(&c[1]), "lat {}", c[1]);
                        }
                        other => panic!("Expected Point, got {:?}", other),
                    }
                }
            }
            other => panic!("Expected FeatureCollection, got {:?}", other),
        }

        fs::remove_dir_all(root).ok();
    }
}
