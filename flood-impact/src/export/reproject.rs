//! Reprojection de géométries avec PROJ
//!
//! Ce module est disponible uniquement avec le feature `reproject`.

#[cfg(feature = "reproject")]
use anyhow::{Context, Result};
#[cfg(feature = "reproject")]
use geo::{Coord, Geometry, LineString, MultiPoint, MultiPolygon, Point, Polygon, Rect};
#[cfg(feature = "reproject")]
use proj::Proj;

/// Reprojection de géométries entre deux systèmes de coordonnées
#[cfg(feature = "reproject")]
pub struct Reprojector {
    proj: Option<Proj>,
    source_epsg: u32,
    target_epsg: u32,
}

#[cfg(feature = "reproject")]
impl Reprojector {
    /// Crée un nouveau reprojector entre deux EPSG
    pub fn new(source_epsg: u32, target_epsg: u32) -> Result<Self> {
        if source_epsg == target_epsg {
            // Pas besoin de reprojection
            return Ok(Self {
                proj: None,
                source_epsg,
                target_epsg,
            });
        }

        let source = format!("EPSG:{}", source_epsg);
        let target = format!("EPSG:{}", target_epsg);

        let proj = Proj::new_known_crs(&source, &target, None).context(format!(
            "Failed to create projection from {} to {}",
            source, target
        ))?;

        Ok(Self {
            proj: Some(proj),
            source_epsg,
            target_epsg,
        })
    }

    /// Retourne le SRID source
    pub fn source_epsg(&self) -> u32 {
        self.source_epsg
    }

    /// Retourne le SRID cible
    pub fn target_epsg(&self) -> u32 {
        self.target_epsg
    }

    pub fn is_identity(&self) -> bool {
        self.proj.is_none()
    }

    /// Transforme une géométrie
    pub fn transform_geometry(&self, geom: &Geometry) -> Result<Geometry> {
        if self.is_identity() {
            return Ok(geom.clone());
        }

        match geom {
            Geometry::Point(p) => {
                let (x, y) = self.transform_coord(p.0)?;
                Ok(Geometry::Point(Point::new(x, y)))
            }
            Geometry::LineString(ls) => Ok(Geometry::LineString(self.transform_linestring(ls)?)),
            Geometry::Polygon(p) => Ok(Geometry::Polygon(self.transform_polygon(p)?)),
            Geometry::MultiPoint(mp) => {
                let mut points = mp.0.clone();
                self.transform_points(&mut points)?;
                Ok(Geometry::MultiPoint(MultiPoint::new(points)))
            }
            Geometry::MultiPolygon(mp) => {
                Ok(Geometry::MultiPolygon(self.transform_multipolygon(mp)?))
            }
            // Types non supportés: retourner tel quel
            _ => Ok(geom.clone()),
        }
    }

    /// Transforme un MultiPolygon
    pub fn transform_multipolygon(&self, mp: &MultiPolygon) -> Result<MultiPolygon> {
        if self.is_identity() {
            return Ok(mp.clone());
        }
        let polys: Result<Vec<Polygon>> = mp.0.iter().map(|p| self.transform_polygon(p)).collect();
        Ok(MultiPolygon::new(polys?))
    }

    /// Transforme des points sur place (conversion batch)
    pub fn transform_points(&self, points: &mut [Point]) -> Result<()> {
        let Some(proj) = &self.proj else {
            return Ok(());
        };
        let mut coords: Vec<(f64, f64)> = points.iter().map(|p| (p.x(), p.y())).collect();
        proj.convert_array(&mut coords)
            .context("Batch coordinate transformation failed")?;
        for (p, (x, y)) in points.iter_mut().zip(coords) {
            *p = Point::new(x, y);
        }
        Ok(())
    }

    /// Transforme un rectangle et retourne l'emprise du résultat
    ///
    /// Les bords sont densifiés pour suivre la courbure de la projection.
    pub fn transform_rect(&self, rect: &Rect) -> Result<Rect> {
        if self.is_identity() {
            return Ok(*rect);
        }
        const STEPS: usize = 16;
        let (min, max) = (rect.min(), rect.max());
        let mut points = Vec::with_capacity(4 * STEPS);
        for i in 0..STEPS {
            let t = i as f64 / STEPS as f64;
            let x = min.x + t * (max.x - min.x);
            let y = min.y + t * (max.y - min.y);
            points.push(Point::new(x, min.y));
            points.push(Point::new(x, max.y));
            points.push(Point::new(min.x, y));
            points.push(Point::new(max.x, y));
        }
        points.push(Point::new(max.x, max.y));
        self.transform_points(&mut points)?;

        let (mut lo, mut hi) = (
            Coord { x: f64::INFINITY, y: f64::INFINITY },
            Coord { x: f64::NEG_INFINITY, y: f64::NEG_INFINITY },
        );
        for p in &points {
            lo.x = lo.x.min(p.x());
            lo.y = lo.y.min(p.y());
            hi.x = hi.x.max(p.x());
            hi.y = hi.y.max(p.y());
        }
        Ok(Rect::new(lo, hi))
    }

    /// Transforme une coordonnée unique
    fn transform_coord(&self, coord: Coord) -> Result<(f64, f64)> {
        match &self.proj {
            Some(proj) => proj
                .convert((coord.x, coord.y))
                .context("Coordinate transformation failed"),
            None => Ok((coord.x, coord.y)),
        }
    }

    /// Transforme une LineString (optimisé avec batch conversion)
    fn transform_linestring(&self, ls: &LineString) -> Result<LineString> {
        let Some(proj) = &self.proj else {
            return Ok(ls.clone());
        };
        let mut coords: Vec<(f64, f64)> = ls.0.iter().map(|c| (c.x, c.y)).collect();

        proj.convert_array(&mut coords)
            .context("Batch coordinate transformation failed")?;

        let result: Vec<Coord> = coords.into_iter().map(|(x, y)| Coord { x, y }).collect();
        Ok(LineString::new(result))
    }

    /// Transforme un Polygon
    fn transform_polygon(&self, p: &Polygon) -> Result<Polygon> {
        let exterior = self.transform_linestring(p.exterior())?;
        let interiors: Result<Vec<LineString>> = p
            .interiors()
            .iter()
            .map(|ls| self.transform_linestring(ls))
            .collect();
        Ok(Polygon::new(exterior, interiors?))
    }
}


/// Vérifie si la reprojection est disponible
pub fn is_available() -> bool {
    cfg!(feature = "reproject")
}

// Implémentation factice quand le feature reproject est désactivé
#[cfg(not(feature = "reproject"))]
use anyhow::{bail, Result};
#[cfg(not(feature = "reproject"))]
use geo::{Geometry, MultiPolygon, Point, Rect};

/// Reprojector factice - pas de reprojection disponible
#[cfg(not(feature = "reproject"))]
pub struct Reprojector {
    epsg: u32,
}

#[cfg(not(feature = "reproject"))]
impl Reprojector {
    /// Tente de créer un reprojector - échoue sans la feature si les EPSG diffèrent
    pub fn new(source_epsg: u32, target_epsg: u32) -> Result<Self> {
        if source_epsg == target_epsg {
            Ok(Self { epsg: source_epsg })
        } else {
            bail!(
                "Reprojection from EPSG:{} to EPSG:{} requires the 'reproject' feature. \
                 Build with: cargo build --features reproject",
                source_epsg,
                target_epsg
            )
        }
    }

    pub fn source_epsg(&self) -> u32 {
        self.epsg
    }

    pub fn target_epsg(&self) -> u32 {
        self.epsg
    }

    pub fn is_identity(&self) -> bool {
        true
    }

    pub fn transform_geometry(&self, geom: &Geometry) -> Result<Geometry> {
        Ok(geom.clone())
    }

    pub fn transform_multipolygon(&self, mp: &MultiPolygon) -> Result<MultiPolygon> {
        Ok(mp.clone())
    }

    pub fn transform_points(&self, _points: &mut [Point]) -> Result<()> {
        Ok(())
    }

    pub fn transform_rect(&self, rect: &Rect) -> Result<Rect> {
        Ok(*rect)
    }
}
