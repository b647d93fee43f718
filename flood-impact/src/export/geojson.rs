//! Export vers GeoJSON avec geozero (streaming, zero-copy)

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use geo::Geometry;
use geozero::geojson::GeoJsonWriter;
use geozero::GeozeroGeometry;

/// Valeur d'une propriété GeoJSON
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    Text(String),
    Number(f64),
}

impl From<&str> for Property {
    fn from(s: &str) -> Self {
        Property::Text(s.to_string())
    }
}

impl From<String> for Property {
    fn from(s: String) -> Self {
        Property::Text(s)
    }
}

impl From<f64> for Property {
    fn from(v: f64) -> Self {
        Property::Number(v)
    }
}

/// Feature à exporter
#[derive(Debug, Clone)]
pub struct OutputFeature {
    pub geometry: Geometry,
    pub properties: Vec<(&'static str, Property)>,
}

impl OutputFeature {
    pub fn new(geometry: impl Into<Geometry>) -> Self {
        Self {
            geometry: geometry.into(),
            properties: Vec::new(),
        }
    }

    pub fn with(mut self, key: &'static str, value: impl Into<Property>) -> Self {
        self.properties.push((key, value.into()));
        self
    }
}

/// Exporte des features en GeoJSON (streaming avec geozero)
///
/// Retourne le nombre de features écrites.
pub fn export_to_geojson<I>(features: I, epsg: u32, output_path: &Path) -> Result<usize>
where
    I: IntoIterator<Item = OutputFeature>,
{
    let file = File::create(output_path)
        .context(format!("Failed to create file: {}", output_path.display()))?;
    let mut writer = BufWriter::new(file);

    // Header FeatureCollection avec CRS
    write!(
        writer,
        r#"{{"type":"FeatureCollection","crs":{{"type":"name","properties":{{"name":"urn:ogc:def:crs:EPSG::{}"}}}},"features":["#,
        epsg
    )?;

    let mut count = 0;
    for (i, feature) in features.into_iter().enumerate() {
        if i > 0 {
            write!(writer, ",")?;
        }
        write_feature(&mut writer, i, &feature)?;
        count += 1;
    }

    write!(writer, "]}}")?;
    writer.flush()?;

    Ok(count)
}

/// Écrit une feature en GeoJSON
fn write_feature<W: Write>(writer: &mut W, id: usize, feature: &OutputFeature) -> Result<()> {
    write!(writer, r#"{{"type":"Feature","id":{},"#, id)?;

    // Geometry via geozero
    write!(writer, r#""geometry":"#)?;
    let mut geom_buf = Vec::new();
    let mut geom_writer = GeoJsonWriter::new(&mut geom_buf);
    feature.geometry.process_geom(&mut geom_writer)?;
    writer.write_all(&geom_buf)?;

    write!(writer, r#","properties":{{"#)?;
    for (i, (key, value)) in feature.properties.iter().enumerate() {
        if i > 0 {
            write!(writer, ",")?;
        }
        write!(writer, r#""{}":"#, escape_json(key))?;
        match value {
            Property::Text(s) => write!(writer, r#""{}""#, escape_json(s))?,
            Property::Number(v) if v.is_finite() => write!(writer, "{}", v)?,
            Property::Number(_) => write!(writer, "null")?,
        }
    }
    write!(writer, "}}}}")?;

    Ok(())
}

/// Échappe une chaîne pour JSON
fn escape_json(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            c if c.is_control() => {
                result.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => result.push(c),
        }
    }
    result
}
