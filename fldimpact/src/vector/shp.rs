//! Lecteur ESRI Shapefile, CRS lu dans le `.prj` voisin

use std::fs;
use std::path::Path;

use geo::{MultiPolygon, Point};
use shapefile::dbase::{FieldValue, Record};
use shapefile::Shape;
use tracing::{debug, warn};

use super::osm::extract_amenity;
use crate::types::{AmenityLayer, AmenityPoint, FloodExtent};
use crate::FldImpactError;

use super::json::FLOOD_VALUE_FIELD;

/// Code EPSG déclaré par le `.prj` du shapefile
///
/// `Ok(None)` si le shapefile n'a pas de `.prj`. Un `.prj` présent mais
/// dont le CRS n'est pas reconnu est une erreur : l'emprise serait sinon
/// interprétée dans un CRS par défaut sans que rien ne le signale.
pub fn prj_epsg(shp_path: &Path) -> Result<Option<u32>, FldImpactError> {
    let prj = shp_path.with_extension("prj");
    let text = match fs::read_to_string(&prj) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    match parse_wkt_epsg(&text) {
        Some(epsg) => Ok(Some(epsg)),
        None => Err(FldImpactError::UnknownCrs {
            file: prj.display().to_string(),
            crs: wkt_root_name(&text).unwrap_or("<unnamed>").to_string(),
        }),
    }
}

/// Extrait le code EPSG d'un WKT
///
/// Le dernier `AUTHORITY["EPSG","n"]` fait foi. Les `.prj` écrits par
/// ArcGIS n'ont pas d'autorité : le nom du CRS racine est alors reconnu
/// (WGS84, Web Mercator, UTM WGS84/NAD83).
pub fn parse_wkt_epsg(wkt: &str) -> Option<u32> {
    let upper = wkt.to_uppercase();
    // L'autorité du CRS complet est déclarée en dernier
    if let Some(pos) = upper.rfind("AUTHORITY[\"EPSG\",") {
        let rest = &upper[pos + "AUTHORITY[\"EPSG\",".len()..];
        let code: String = rest
            .trim_start_matches(|c: char| c == '"' || c.is_whitespace())
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if let Ok(code) = code.parse() {
            return Some(code);
        }
    }
    wkt_root_name(wkt).and_then(epsg_from_crs_name)
}

/// Nom du CRS racine : première chaîne entre guillemets
fn wkt_root_name(wkt: &str) -> Option<&str> {
    let start = wkt.find('"')? + 1;
    let len = wkt[start..].find('"')?;
    Some(wkt[start..start + len].trim())
}

/// Code EPSG d'un nom de CRS ESRI ou EPSG (`WGS_1984_UTM_Zone_18S`,
/// `WGS 84 / UTM zone 18S`, `GCS_WGS_1984`...)
fn epsg_from_crs_name(name: &str) -> Option<u32> {
    let normalized: String = name
        .to_uppercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect();
    let words: Vec<&str> = normalized.split_whitespace().collect();

    match words.as_slice() {
        ["GCS", "WGS", "1984"] | ["WGS", "1984"] | ["WGS", "84"] | ["WGS84"] => Some(4326),
        ["WGS", "1984", "WEB", "MERCATOR", ..] | ["WGS", "84", "PSEUDO", "MERCATOR"] => Some(3857),
        [datum @ .., "UTM", "ZONE", zone] => utm_epsg(datum, zone),
        _ => None,
    }
}

/// Zone UTM (`18S`, `17N`) → EPSG selon le datum
fn utm_epsg(datum: &[&str], zone: &str) -> Option<u32> {
    let (number, hemisphere) = zone.split_at(zone.len().checked_sub(1)?);
    let number: u32 = number.parse().ok()?;
    if !(1..=60).contains(&number) {
        return None;
    }
    match (datum, hemisphere) {
        (["WGS", "1984"] | ["WGS", "84"] | ["WGS84"], "N") => Some(32600 + number),
        (["WGS", "1984"] | ["WGS", "84"] | ["WGS84"], "S") => Some(32700 + number),
        (["NAD", "1983"] | ["NAD83"], "N") if number <= 23 => Some(26900 + number),
        _ => None,
    }
}

/// EPSG du `.prj`, celui par défaut en son absence
fn layer_epsg(path: &Path, name: &str, default_epsg: u32) -> Result<u32, FldImpactError> {
    Ok(match prj_epsg(path)? {
        Some(epsg) => epsg,
        None => {
            warn!(file = %name, default_epsg, "Shapefile has no .prj, using default EPSG");
            default_epsg
        }
    })
}

fn field_f64(record: &Record, field: &str) -> Option<f64> {
    match record.get(field)? {
        FieldValue::Numeric(v) => *v,
        FieldValue::Float(v) => v.map(f64::from),
        FieldValue::Double(v) => Some(*v),
        FieldValue::Integer(v) => Some(f64::from(*v)),
        _ => None,
    }
}

fn field_str<'a>(record: &'a Record, field: &str) -> Option<&'a str> {
    match record.get(field)? {
        FieldValue::Character(Some(s)) => Some(s.as_str()),
        FieldValue::Memo(s) => Some(s.as_str()),
        _ => None,
    }
}

pub(super) fn read_flood_extent(
    path: &Path,
    default_epsg: u32,
) -> Result<FloodExtent, FldImpactError> {
    let name = path.display().to_string();
    let rows = shapefile::read(path)?;

    let mut geometry = MultiPolygon::new(Vec::new());
    let mut flood_depth: Option<f64> = None;

    for (idx, (shape, record)) in rows.into_iter().enumerate() {
        let mp: MultiPolygon<f64> = match shape {
            Shape::Polygon(polygon) => polygon.try_into(),
            Shape::PolygonM(polygon) => polygon.try_into(),
            Shape::PolygonZ(polygon) => polygon.try_into(),
            Shape::NullShape => continue,
            other => {
                return Err(FldImpactError::UnsupportedGeometry {
                    file: name,
                    kind: other.shapetype().to_string(),
                })
            }
        }
        .map_err(|e| {
            FldImpactError::invalid_geometry(
                format!("{}#{}", name, idx),
                format!("cannot convert polygon: {}", e),
            )
        })?;
        geometry.0.extend(mp.0);

        if let Some(value) = field_f64(&record, FLOOD_VALUE_FIELD) {
            flood_depth = Some(flood_depth.map_or(value, |d| d.max(value)));
        }
    }

    let epsg = layer_epsg(path, &name, default_epsg)?;
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
    let rows = shapefile::read(path)?;

    let has_tag_field = rows.is_empty()
        || rows
            .iter()
            .any(|(_, r)| r.get("amenity").is_some() || r.get("other_tags").is_some());
    if !has_tag_field {
        return Err(FldImpactError::MissingAttribute {
            file: name,
            attribute: "other_tags".to_string(),
        });
    }

    let mut points = Vec::new();
    let mut untagged = 0;

    for (shape, record) in rows {
        let amenity = field_str(&record, "amenity")
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| field_str(&record, "other_tags").and_then(extract_amenity));

        let Some(amenity) = amenity else {
            untagged += 1;
            continue;
        };

        match shape {
            Shape::Point(p) => points.push(AmenityPoint {
                point: Point::new(p.x, p.y),
                amenity,
            }),
            Shape::PointM(p) => points.push(AmenityPoint {
                point: Point::new(p.x, p.y),
                amenity,
            }),
            Shape::PointZ(p) => points.push(AmenityPoint {
                point: Point::new(p.x, p.y),
                amenity,
            }),
            Shape::Multipoint(mp) => {
                points.extend(mp.points().iter().map(|p| AmenityPoint {
                    point: Point::new(p.x, p.y),
                    amenity: amenity.clone(),
                }))
            }
            Shape::NullShape => {
                warn!(file = %name, amenity = %amenity, "Feature without geometry skipped");
            }
            other => {
                return Err(FldImpactError::UnsupportedGeometry {
                    file: name,
                    kind: other.shapetype().to_string(),
                })
            }
        }
    }

    let epsg = layer_epsg(path, &name, default_epsg)?;
    debug!(file = %name, points = points.len(), untagged, epsg, "Amenity layer loaded");

    Ok(AmenityLayer {
        points,
        epsg,
        untagged,
    })
}
