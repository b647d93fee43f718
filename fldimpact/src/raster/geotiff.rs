//! Lecture/écriture GeoTIFF mono-bande avec le crate `tiff`
//!
//! Seuls les tags nécessaires au pipeline sont gérés :
//! ModelPixelScale (33550), ModelTiepoint (33922), GeoKeyDirectory (34735)
//! et GDAL_NODATA (42113).

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek};
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;
use tracing::{debug, warn};

use geo::Rect;

use super::{GeoTransform, Grid, PixelWindow, RasterHeader};
use crate::FldImpactError;

const GT_MODEL_TYPE: u32 = 1024;
const GT_RASTER_TYPE: u32 = 1025;
const GEOGRAPHIC_TYPE: u32 = 2048;
const PROJECTED_CS_TYPE: u32 = 3072;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;

/// Vrai pour les codes EPSG de CRS géographiques 2D (plage 4000-4999)
pub fn is_geographic_epsg(epsg: u32) -> bool {
    (4000..5000).contains(&epsg)
}

/// GeoTIFF ouvert : décodeur positionné sur la première image et métadonnées
struct GeoTiff {
    decoder: Decoder<BufReader<File>>,
    header: RasterHeader,
    name: String,
}

impl GeoTiff {
    fn open(path: &Path) -> Result<Self, FldImpactError> {
        let file = File::open(path)?;
        let mut decoder = Decoder::new(BufReader::new(file))?;
        let name = path.display().to_string();

        let (width, height) = decoder.dimensions()?;
        let header = RasterHeader {
            width: width as usize,
            height: height as usize,
            transform: read_transform(&mut decoder, &name)?,
            nodata: read_nodata(&mut decoder)?,
            epsg: read_epsg(&mut decoder)?,
        };
        if header.width == 0 || header.height == 0 {
            return Err(FldImpactError::invalid_raster(name, "empty raster"));
        }

        Ok(Self {
            decoder,
            header,
            name,
        })
    }

    /// Décode la bande 1 d'une fenêtre, bloc par bloc (strips ou tuiles)
    ///
    /// Seuls les blocs qui recoupent la fenêtre sont lus.
    fn read_window(&mut self, window: &PixelWindow) -> Result<Grid, FldImpactError> {
        let (chunk_w, chunk_h) = self.decoder.chunk_dimensions();
        let (chunk_w, chunk_h) = (chunk_w as usize, chunk_h as usize);
        if chunk_w == 0 || chunk_h == 0 {
            return Err(FldImpactError::invalid_raster(&self.name, "zero-sized chunks"));
        }
        let samples_per_pixel = self.bands_per_chunk()?;
        let chunks_across = self.header.width.div_ceil(chunk_w);

        let mut data = vec![f64::NAN; window.width() * window.height()];
        let mut chunks = 0usize;

        for chunk_row in window.row_start / chunk_h..=(window.row_end - 1) / chunk_h {
            for chunk_col in window.col_start / chunk_w..=(window.col_end - 1) / chunk_w {
                let index = u32::try_from(chunk_row * chunks_across + chunk_col).map_err(|_| {
                    FldImpactError::invalid_raster(&self.name, "chunk index overflow")
                })?;
                let (data_w, data_h) = self.decoder.chunk_data_dimensions(index);
                let (data_w, data_h) = (data_w as usize, data_h as usize);
                let samples = to_f64(self.decoder.read_chunk(index)?, &self.name)?;

                // Tuiles de bord : données rognées ou complétées selon l'encodeur
                let stride = if samples.len() == data_w * data_h * samples_per_pixel {
                    data_w
                } else if samples.len() >= chunk_w * data_h * samples_per_pixel {
                    chunk_w
                } else {
                    return Err(FldImpactError::invalid_raster(
                        &self.name,
                        format!("chunk {} has {} samples", index, samples.len()),
                    ));
                };

                let (row0, col0) = (chunk_row * chunk_h, chunk_col * chunk_w);
                for r in 0..data_h {
                    let row = row0 + r;
                    if row < window.row_start || row >= window.row_end {
                        continue;
                    }
                    for c in 0..data_w {
                        let col = col0 + c;
                        if col < window.col_start || col >= window.col_end {
                            continue;
                        }
                        data[(row - window.row_start) * window.width() + (col - window.col_start)] =
                            samples[(r * stride + c) * samples_per_pixel];
                    }
                }
                chunks += 1;
            }
        }

        debug!(
            file = %self.name,
            width = window.width(),
            height = window.height(),
            chunks,
            "GeoTIFF window decoded"
        );

        let mut grid = Grid::new(
            window.width(),
            window.height(),
            data,
            self.header.transform.for_window(window),
        )?;
        grid.nodata = self.header.nodata;
        grid.epsg = self.header.epsg;
        Ok(grid)
    }

    /// Échantillons par pixel dans un bloc (1 en configuration planaire)
    fn bands_per_chunk(&mut self) -> Result<usize, FldImpactError> {
        let samples = self
            .decoder
            .find_tag(Tag::SamplesPerPixel)?
            .map(|v| v.into_u32())
            .transpose()?
            .unwrap_or(1)
            .max(1) as usize;
        let planar = self
            .decoder
            .find_tag(Tag::PlanarConfiguration)?
            .map(|v| v.into_u16())
            .transpose()?
            .unwrap_or(1);

        if samples > 1 {
            warn!(file = %self.name, bands = samples, "Multi-band raster, using band 1");
        }
        Ok(if planar == 2 { 1 } else { samples })
    }
}

fn to_f64(result: DecodingResult, name: &str) -> Result<Vec<f64>, FldImpactError> {
    Ok(match result {
        DecodingResult::U8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::F32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::F64(v) => v,
        #[allow(unreachable_patterns)]
        _ => return Err(FldImpactError::invalid_raster(name, "unsupported sample format")),
    })
}

/// Lit les métadonnées d'un GeoTIFF sans décoder les pixels
pub fn read_geotiff_header(path: &Path) -> Result<RasterHeader, FldImpactError> {
    Ok(GeoTiff::open(path)?.header)
}

/// Lit la première bande d'un GeoTIFF en entier
pub fn read_geotiff(path: &Path) -> Result<Grid, FldImpactError> {
    let mut tiff = GeoTiff::open(path)?;
    let header = tiff.header;
    let grid = tiff.read_window(&PixelWindow::full(header.width, header.height))?;

    debug!(
        file = %tiff.name,
        width = header.width,
        height = header.height,
        epsg = ?header.epsg,
        nodata = ?header.nodata,
        "GeoTIFF loaded"
    );
    Ok(grid)
}

/// Lit la partie d'un GeoTIFF couverte par un rectangle (CRS du raster)
///
/// Équivaut à `read_geotiff(path)?.clip_to_bounds(rect)` mais ne décode que
/// les blocs qui recoupent la fenêtre.
pub fn read_geotiff_window(path: &Path, rect: &Rect) -> Result<Grid, FldImpactError> {
    let mut tiff = GeoTiff::open(path)?;
    let window = tiff.header.window(rect)?;
    Ok(tiff.read_window(&window)?.mask_outside(rect))
}

fn read_transform<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    name: &str,
) -> Result<GeoTransform, FldImpactError> {
    let scale = decoder
        .find_tag(Tag::ModelPixelScaleTag)?
        .map(|v| v.into_f64_vec())
        .transpose()?
        .filter(|s| s.len() >= 2)
        .ok_or_else(|| FldImpactError::invalid_raster(name, "missing ModelPixelScale tag"))?;

    let tiepoint = decoder
        .find_tag(Tag::ModelTiepointTag)?
        .map(|v| v.into_f64_vec())
        .transpose()?
        .filter(|t| t.len() >= 6)
        .ok_or_else(|| FldImpactError::invalid_raster(name, "missing ModelTiepoint tag"))?;

    if scale[0] <= 0.0 || scale[1] <= 0.0 {
        return Err(FldImpactError::invalid_raster(
            name,
            format!("non-positive pixel size ({}, {})", scale[0], scale[1]),
        ));
    }

    // Le tiepoint associe le pixel (i, j) au point (x, y)
    let (i, j, x, y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);

    Ok(GeoTransform {
        origin_x: x - i * scale[0],
        origin_y: y + j * scale[1],
        pixel_width: scale[0],
        pixel_height: scale[1],
    })
}

/// Extrait le code EPSG du GeoKeyDirectory (clé projetée prioritaire)
fn read_epsg<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<u32>, FldImpactError> {
    let Some(value) = decoder.find_tag(Tag::GeoKeyDirectoryTag)? else {
        return Ok(None);
    };
    let keys = value.into_u32_vec()?;
    Ok(epsg_from_geokeys(&keys))
}

fn epsg_from_geokeys(keys: &[u32]) -> Option<u32> {
    if keys.len() < 4 {
        return None;
    }
    let count = keys[3] as usize;

    let mut geographic = None;
    let mut projected = None;

    // Entrées de 4 valeurs : KeyID, TIFFTagLocation, Count, Value_Offset
    for entry in keys[4..].chunks_exact(4).take(count) {
        let (key_id, location, value) = (entry[0], entry[1], entry[3]);
        if location != 0 {
            continue;
        }
        match key_id {
            GEOGRAPHIC_TYPE => geographic = Some(value),
            PROJECTED_CS_TYPE => projected = Some(value),
            _ => {}
        }
    }

    // 32767 = "user-defined"
    projected
        .filter(|&code| code != 32767)
        .or(geographic.filter(|&code| code != 32767))
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<f64>, FldImpactError> {
    let Some(value) = decoder.find_tag(Tag::GdalNodata)? else {
        return Ok(None);
    };
    let text = value.into_string()?;
    let text = text.trim_matches(char::from(0)).trim();
    match text.parse::<f64>() {
        Ok(v) => Ok(Some(v)),
        Err(_) => {
            warn!(nodata = text, "Unparsable GDAL_NODATA tag, ignored");
            Ok(None)
        }
    }
}

/// Écrit un raster en GeoTIFF Float64 mono-bande
pub fn write_geotiff(grid: &Grid, path: &Path) -> Result<(), FldImpactError> {
    let name = path.display().to_string();
    let file = File::create(path)?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file))?;
    let mut image = encoder.new_image::<colortype::Gray64Float>(
        grid.width as u32,
        grid.height as u32,
    )?;

    let t = &grid.transform;
    image
        .encoder()
        .write_tag(Tag::ModelPixelScaleTag, &[t.pixel_width, t.pixel_height, 0.0][..])?;
    image.encoder().write_tag(
        Tag::ModelTiepointTag,
        &[0.0, 0.0, 0.0, t.origin_x, t.origin_y, 0.0][..],
    )?;

    if let Some(epsg) = grid.epsg {
        let keys = geokeys_for_epsg(epsg).ok_or_else(|| {
            FldImpactError::invalid_raster(&name, format!("EPSG:{} does not fit a GeoKey", epsg))
        })?;
        image
            .encoder()
            .write_tag(Tag::GeoKeyDirectoryTag, &keys[..])?;
    }

    if let Some(nodata) = grid.nodata {
        let text = nodata.to_string();
        image.encoder().write_tag(Tag::GdalNodata, text.as_str())?;
    }

    image.write_data(&grid.data)?;
    Ok(())
}

fn geokeys_for_epsg(epsg: u32) -> Option<Vec<u16>> {
    let code = u16::try_from(epsg).ok()?;
    let (model_type, crs_key) = if is_geographic_epsg(epsg) {
        (MODEL_TYPE_GEOGRAPHIC, GEOGRAPHIC_TYPE)
    } else {
        (MODEL_TYPE_PROJECTED, PROJECTED_CS_TYPE)
    };

    Some(vec![
        1,
        1,
        0,
        3,
        GT_MODEL_TYPE as u16,
        0,
        1,
        model_type,
        GT_RASTER_TYPE as u16,
        0,
        1,
        RASTER_PIXEL_IS_AREA,
        crs_key as u16,
        0,
        1,
        code,
    ])
}
