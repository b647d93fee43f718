//! Lecteur GeoJSON (emprises d'inondation et points OSM)

use std::fs;
use std::path::Path;

use geo::{Geometry, MultiPolygon, Point};
use geojson::{Feature, GeoJson, JsonObject};
use tracing::{debug, warn};

use super::osm::extract_amenity;
use super::{geometry_kind, parse_crs_name, push_polygons};
use crate::types::{AmenityLayer, AmenityPoint, FloodExtent};
use crate::FldImpactError;

/// Attribut portant la hauteur d'eau dans les emprises
pub const FLOOD_VALUE_FIELD: &str = "FloodValue";

struct Collection {
    features: Vec<Feature>,
    epsg: Option<u32>,
}

fn load(path: &Path) -> Result<Collection, FldImpactError> {
    let text = fs::read_to_string(path)?;
    let geojson: GeoJson = text.parse()?;

    Ok(match geojson {
        GeoJson::FeatureCollection(fc) => Collection {
            epsg: fc.foreign_members.as_ref().and_then(crs_epsg),
            features: fc.features,
        },
        GeoJson::Feature(feature) => Collection {
            epsg: feature.foreign_members.as_ref().and_then(crs_epsg),
            features: vec![feature],
        },
        GeoJson::Geometry(geometry) => Collection {
            epsg: geometry.foreign_members.as_ref().and_then(crs_epsg),
            features: vec![Feature {
                bbox: None,
                geometry: Some(geometry),
                id: None,
                properties: None,
                foreign_members: None,
            }],
        },
    })
}

/// Lit le membre `crs` hérité de GeoJSON 2008 : `{"type":"name","properties":{"name":...}}`
fn crs_epsg(members: &JsonObject) -> Option<u32> {
    let name = members
        .get("crs")?
        .get("properties")?
        .get("name")?
        .as_str()?;
    parse_crs_name(name)
}

fn to_geo(feature: &Feature, file: &str) -> Result<Option<Geometry>, FldImpactError> {
    let Some(geometry) = &feature.geometry else {
        return Ok(None);
    };
    let geometry = Geometry::<f64>::try_from(geometry.value.clone()).map_err(|e| {
        FldImpactError::invalid_geometry(file, format!("cannot convert geometry: {}", e))
    })?;
    Ok(Some(geometry))
}

pub(super) fn read_flood_extent(
    path: &Path,
    default_epsg: u32,
) -> Result<FloodExtent, FldImpactError> {
    let name = path.display().to_string();
    let collection = load(path)?;

    let mut geometry = MultiPolygon::new(Vec::new());
    let mut flood_depth: Option<f64> = None;

    for feature in &collection.features {
        let Some(g) = to_geo(feature, &name)? else {
            continue;
        };
        push_polygons(&mut geometry, g, &name)?;

        if let Some(value) = feature.property(FLOOD_VALUE_FIELD).and_then(|v| v.as_f64()) {
            flood_depth = Some(flood_depth.map_or(value, |d| d.max(value)));
        }
    }

    let epsg = collection.epsg.unwrap_or(default_epsg);
    debug!(
        file = %name,
        polygons = geometry.0.len(),
        epsg,
        flood_depth = ?flood_depth,
        "Flood extent loaded"
    );

    Ok(FloodExtent {
        geometry,
        epsg,
        flood_depth,
    })
}

pub(super) fn read_amenity_layer(
    path: &Path,
    default_epsg: u32,
) -> Result<AmenityLayer, FldImpactError> {
    let name = path.display().to_string();
    let collection = load(path)?;

    let mut points = Vec::new();
    let mut untagged = 0;
    let mut has_tag_field = false;

    for feature in &collection.features {
        let amenity_field = feature.property("amenity");
        let other_tags = feature.property("other_tags");
        has_tag_field |= amenity_field.is_some() || other_tags.is_some();

        let amenity = amenity_field
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| other_tags.and_then(|v| v.as_str()).and_then(extract_amenity));

        let Some(amenity) = amenity else {
            untagged += 1;
            continue;
        };

        match to_geo(feature, &name)? {
            Some(Geometry::Point(point)) => points.push(AmenityPoint { point, amenity }),
            Some(Geometry::MultiPoint(mp)) => {
                points.extend(mp.0.into_iter().map(|point: Point| AmenityPoint {
                    point,
                    amenity: amenity.clone(),
                }))
            }
            Some(other) => {
                return Err(FldImpactError::UnsupportedGeometry {
                    file: name,
                    kind: geometry_kind(&other).to_string(),
                })
            }
            None => {
                warn!(file = %name, amenity = %amenity, "Feature without geometry skipped");
            }
        }
    }

    if !collection.features.is_empty() && !has_tag_field {
        return Err(FldImpactError::MissingAttribute {
            file: name,
            attribute: "other_tags".to_string(),
        });
    }

    let epsg = collection.epsg.unwrap_or(default_epsg);
    debug!(file = %name, points = points.len(), untagged, epsg, "Amenity layer loaded");

    Ok(AmenityLayer {
        points,
        epsg,
        untagged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::{self, DEFAULT_EPSG};
    use std::path::PathBuf;

    fn write_temp(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    const FLOOD: &str = r#"{
        "type": "FeatureCollection",
        "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::32718"}},
        "features": [
            {"type": "Feature", "properties": {"FloodValue": 1.5},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[10,0],[10,10],[0,10],[0,0]]]}},
            {"type": "Feature", "properties": {"FloodValue": 3.25},
             "geometry": {"type": "MultiPolygon", "coordinates": [
                [[[20,0],[30,0],[30,10],[20,0]]],
                [[[40,0],[50,0],[50,10],[40,0]]]
             ]}}
        ]
    }"#;

    #[test]
    fn test_read_flood_extent() {
        let path = write_temp("fldimpact_json_flood.geojson", FLOOD);
        let extent = vector::read_flood_extent(&path, DEFAULT_EPSG).unwrap();

        assert_eq!(extent.geometry.0.len(), 3);
        assert_eq!(extent.epsg, 32718);
        assert_eq!(extent.flood_depth, Some(3.25));

        fs::remove_file(path).ok();
    }

    #[test]
    fn test_flood_extent_default_crs() {
        let content = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]}}
        ]}"#;
        let path = write_temp("fldimpact_json_flood_nocrs.geojson", content);
        let extent = vector::read_flood_extent(&path, 4326).unwrap();

        assert_eq!(extent.epsg, 4326);
        assert_eq!(extent.flood_depth, None);

        fs::remove_file(path).ok();
    }

    #[test]
    fn test_flood_extent_rejects_lines() {
        let content = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {},
             "geometry": {"type": "LineString", "coordinates": [[0,0],[1,1]]}}
        ]}"#;
        let path = write_temp("fldimpact_json_flood_line.geojson", content);
        let result = vector::read_flood_extent(&path, DEFAULT_EPSG);
        assert!(matches!(
            result,
            Err(FldImpactError::UnsupportedGeometry { ref kind, .. }) if kind == "LineString"
        ));

        fs::remove_file(path).ok();
    }

    #[test]
    fn test_read_amenity_layer() {
        let content = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"other_tags": "\"amenity\"=>\"school\",\"name\"=>\"A\""},
             "geometry": {"type": "Point", "coordinates": [1, 1]}},
            {"type": "Feature", "properties": {"other_tags": "\"shop\"=>\"bakery\""},
             "geometry": {"type": "Point", "coordinates": [2, 2]}},
            {"type": "Feature", "properties": {"amenity": "bank"},
             "geometry": {"type": "Point", "coordinates": [3, 3]}},
            {"type": "Feature", "properties": {"other_tags": null},
             "geometry": {"type": "Point", "coordinates": [4, 4]}}
        ]}"#;
        let path = write_temp("fldimpact_json_osm.geojson", content);
        let layer = vector::read_amenity_layer(&path, DEFAULT_EPSG).unwrap();

        assert_eq!(layer.points.len(), 2);
        assert_eq!(layer.points[0].amenity, "school");
        assert_eq!(layer.points[0].point, Point::new(1.0, 1.0));
        assert_eq!(layer.points[1].amenity, "bank");
        assert_eq!(layer.untagged, 2);
        assert_eq!(layer.epsg, DEFAULT_EPSG);

        fs::remove_file(path).ok();
    }

    #[test]
    fn test_amenity_layer_missing_attribute() {
        let content = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"name": "x"},
             "geometry": {"type": "Point", "coordinates": [1, 1]}}
        ]}"#;
        let path = write_temp("fldimpact_json_osm_noattr.geojson", content);
        let result = vector::read_amenity_layer(&path, DEFAULT_EPSG);
        assert!(matches!(result, Err(FldImpactError::MissingAttribute { .. })));

        fs::remove_file(path).ok();
    }

    #[test]
    fn test_empty_amenity_layer() {
        let content = r#"{"type": "FeatureCollection", "features": []}"#;
        let path = write_temp("fldimpact_json_osm_empty.geojson", content);
        let layer = vector::read_amenity_layer(&path, DEFAULT_EPSG).unwrap();
        assert!(layer.points.is_empty());
        assert_eq!(layer.untagged, 0);

        fs::remove_file(path).ok();
    }
}
