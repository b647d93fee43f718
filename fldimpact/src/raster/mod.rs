//! Raster mono-bande en mémoire et opérations de découpe/reclassification

pub mod geotiff;
pub mod polygonize;
pub mod reclass;

use geo::{coord, Point, Rect};

use crate::types::WeightedPoint;
use crate::FldImpactError;

pub use reclass::ReclassRule;

/// Géoréférencement affine sans rotation (origine = coin haut-gauche)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    /// Taille de pixel en X (positive)
    pub pixel_width: f64,
    /// Taille de pixel en Y (positive, les lignes descendent)
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Coordonnées du centre de la cellule (ligne, colonne)
    pub fn cell_center(&self, row: usize, col: usize) -> Point {
        Point::new(
            self.origin_x + (col as f64 + 0.5) * self.pixel_width,
            self.origin_y - (row as f64 + 0.5) * self.pixel_height,
        )
    }

    /// Coordonnées d'un coin de grille (colonne, ligne), y compris le bord droit/bas
    pub fn corner(&self, col: i64, row: i64) -> (f64, f64) {
        (
            self.origin_x + col as f64 * self.pixel_width,
            self.origin_y - row as f64 * self.pixel_height,
        )
    }

    /// Surface d'une cellule en hectares (CRS métrique uniquement)
    pub fn cell_hectares(&self) -> f64 {
        self.pixel_width * self.pixel_height / 10_000.0
    }

    /// Cellules touchées par un rectangle, bornées à une grille `width` x `height`
    pub fn window(&self, rect: &Rect, width: usize, height: usize) -> Option<PixelWindow> {
        let col_start = ((rect.min().x - self.origin_x) / self.pixel_width).floor().max(0.0) as usize;
        let col_end = (((rect.max().x - self.origin_x) / self.pixel_width).ceil().max(0.0) as usize)
            .min(width);
        let row_start = ((self.origin_y - rect.max().y) / self.pixel_height).floor().max(0.0) as usize;
        let row_end = (((self.origin_y - rect.min().y) / self.pixel_height).ceil().max(0.0) as usize)
            .min(height);

        (col_start < col_end && row_start < row_end).then_some(PixelWindow {
            col_start,
            col_end,
            row_start,
            row_end,
        })
    }

    /// Géoréférencement d'une fenêtre (origine au coin haut-gauche de la fenêtre)
    pub fn for_window(&self, window: &PixelWindow) -> GeoTransform {
        let (origin_x, origin_y) = self.corner(window.col_start as i64, window.row_start as i64);
        GeoTransform {
            origin_x,
            origin_y,
            ..*self
        }
    }
}

/// Fenêtre de pixels `[col_start, col_end) x [row_start, row_end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    pub col_start: usize,
    pub col_end: usize,
    pub row_start: usize,
    pub row_end: usize,
}

impl PixelWindow {
    /// Fenêtre couvrant toute une grille
    pub fn full(width: usize, height: usize) -> Self {
        Self {
            col_start: 0,
            col_end: width,
            row_start: 0,
            row_end: height,
        }
    }

    pub fn width(&self) -> usize {
        self.col_end - self.col_start
    }

    pub fn height(&self) -> usize {
        self.row_end - self.row_start
    }
}

/// Métadonnées d'un raster, sans ses valeurs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterHeader {
    pub width: usize,
    pub height: usize,
    pub transform: GeoTransform,
    pub nodata: Option<f64>,
    pub epsg: Option<u32>,
}

impl RasterHeader {
    /// Fenêtre touchée par un rectangle exprimé dans le CRS du raster
    pub fn window(&self, rect: &Rect) -> Result<PixelWindow, FldImpactError> {
        self.transform
            .window(rect, self.width, self.height)
            .ok_or_else(|| FldImpactError::EmptyWindow {
                reason: format!(
                    "bbox ({:.6}, {:.6}, {:.6}, {:.6}) outside raster ({}x{})",
                    rect.min().x,
                    rect.min().y,
                    rect.max().x,
                    rect.max().y,
                    self.width,
                    self.height
                ),
            })
    }
}

/// Raster mono-bande, stocké ligne par ligne
#[derive(Debug, Clone)]
pub struct Grid {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f64>,
    pub transform: GeoTransform,
    pub nodata: Option<f64>,
    /// Code EPSG si le GeoTIFF le déclare
    pub epsg: Option<u32>,
}

/// Poids associé à chaque point issu d'une cellule
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellWeight {
    /// Poids constant (ex: hectares par cellule)
    Constant(f64),
    /// Valeur de la cellule tronquée à l'entier
    TruncatedValue,
}

impl Grid {
    pub fn new(
        width: usize,
        height: usize,
        data: Vec<f64>,
        transform: GeoTransform,
    ) -> Result<Self, FldImpactError> {
        if data.len() != width * height {
            return Err(FldImpactError::invalid_raster(
                "<memory>",
                format!(
                    "expected {} cells for {}x{}, got {}",
                    width * height,
                    width,
                    height,
                    data.len()
                ),
            ));
        }
        Ok(Self {
            width,
            height,
            data,
            transform,
            nodata: None,
            epsg: None,
        })
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.width + col]
    }

    /// Vrai si la valeur est NaN ou égale au nodata
    pub fn is_nodata(&self, value: f64) -> bool {
        value.is_nan() || self.nodata.map_or(false, |nd| value == nd)
    }

    pub fn header(&self) -> RasterHeader {
        RasterHeader {
            width: self.width,
            height: self.height,
            transform: self.transform,
            nodata: self.nodata,
            epsg: self.epsg,
        }
    }

    /// Emprise du raster dans son CRS
    pub fn bounds(&self) -> Rect {
        let (min_x, max_y) = self.transform.corner(0, 0);
        let (max_x, min_y) = self.transform.corner(self.width as i64, self.height as i64);
        Rect::new(coord! { x: min_x, y: min_y }, coord! { x: max_x, y: max_y })
    }

    /// Déclare une valeur comme nodata (métadonnée seule, les cellules ne changent pas)
    pub fn with_nodata(mut self, value: f64) -> Self {
        self.nodata = Some(value);
        self
    }

    /// Découpe le raster à l'emprise d'un rectangle exprimé dans le CRS du raster.
    ///
    /// La fenêtre couvre les cellules touchées par le rectangle ; les cellules
    /// dont le centre est hors du rectangle passent à nodata.
    pub fn clip_to_bounds(&self, rect: &Rect) -> Result<Grid, FldImpactError> {
        let window = self.header().window(rect)?;
        let mut data = Vec::with_capacity(window.width() * window.height());
        for row in window.row_start..window.row_end {
            let offset = row * self.width;
            data.extend_from_slice(&self.data[offset + window.col_start..offset + window.col_end]);
        }

        let grid = Grid {
            width: window.width(),
            height: window.height(),
            data,
            transform: self.transform.for_window(&window),
            nodata: self.nodata,
            epsg: self.epsg,
        };
        Ok(grid.mask_outside(rect))
    }

    /// Passe à nodata les cellules dont le centre est hors du rectangle
    ///
    /// Sans nodata déclaré, 0 sert de valeur de remplissage et devient le nodata.
    pub(crate) fn mask_outside(mut self, rect: &Rect) -> Grid {
        let fill = self.nodata.unwrap_or(0.0);
        for row in 0..self.height {
            for col in 0..self.width {
                let center = self.transform.cell_center(row, col);
                let inside = center.x() >= rect.min().x
                    && center.x() <= rect.max().x
                    && center.y() >= rect.min().y
                    && center.y() <= rect.max().y;
                if !inside {
                    self.data[row * self.width + col] = fill;
                }
            }
        }
        self.nodata = Some(fill);
        self
    }

    /// Applique une règle de reclassification sur une copie du raster
    ///
    /// La règle s'applique à toutes les cellules, nodata compris ; seules les
    /// valeurs NaN restent inchangées.
    pub fn reclass(&self, rule: &ReclassRule) -> Grid {
        let data = self.data.iter().map(|&v| rule.apply(v)).collect();
        Grid {
            data,
            ..self.clone()
        }
    }

    /// Un point par cellule valide, au centre de la cellule
    pub fn cell_points(&self, weight: CellWeight) -> Vec<WeightedPoint> {
        let mut points = Vec::new();
        for row in 0..self.height {
            for col in 0..self.width {
                let value = self.get(row, col);
                if self.is_nodata(value) {
                    continue;
                }
                let weight = match weight {
                    CellWeight::Constant(w) => w,
                    CellWeight::TruncatedValue => value.trunc(),
                };
                points.push(WeightedPoint {
                    point: self.transform.cell_center(row, col),
                    weight,
                });
            }
        }
        points
    }

    /// Nombre de cellules valides
    pub fn valid_cells(&self) -> usize {
        self.data.iter().filter(|&&v| !self.is_nodata(v)).count()
    }
}

#[cfg(test)]
pub(crate) fn test_grid(width: usize, height: usize, data: Vec<f64>) -> Grid {
    Grid::new(
        width,
        height,
        data,
        GeoTransform {
            origin_x: 0.0,
            origin_y: height as f64,
            pixel_width: 1.0,
            pixel_height: 1.0,
        },
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_size_mismatch() {
        let transform = GeoTransform {
            origin_x: 0.0,
            origin_y: 0.0,
            pixel_width: 1.0,
            pixel_height: 1.0,
        };
        assert!(Grid::new(2, 2, vec![0.0; 3], transform).is_err());
    }

    #[test]
    fn test_cell_center() {
        let grid = test_grid(3, 2, vec![0.0; 6]);
        let p = grid.transform.cell_center(0, 0);
        assert_eq!((p.x(), p.y()), (0.5, 1.5));
        let p = grid.transform.cell_center(1, 2);
        assert_eq!((p.x(), p.y()), (2.5, 0.5));
    }

    #[test]
    fn test_clip_to_bounds() {
        // 4x4, valeurs = index
        let grid = test_grid(4, 4, (0..16).map(|v| v as f64).collect()).with_nodata(-1.0);
        let rect = Rect::new(coord! { x: 1.0, y: 1.0 }, coord! { x: 3.0, y: 3.0 });
        let clipped = grid.clip_to_bounds(&rect).unwrap();

        assert_eq!((clipped.width, clipped.height), (2, 2));
        assert_eq!(clipped.data, vec![5.0, 6.0, 9.0, 10.0]);
        assert_eq!(clipped.transform.origin_x, 1.0);
        assert_eq!(clipped.transform.origin_y, 3.0);
    }

    #[test]
    fn test_clip_masks_partial_cells() {
        let grid = test_grid(4, 4, vec![7.0; 16]).with_nodata(-1.0);
        // Le rectangle touche la colonne 2 sans couvrir son centre
        let rect = Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 2.2, y: 4.0 });
        let clipped = grid.clip_to_bounds(&rect).unwrap();

        assert_eq!(clipped.width, 3);
        assert_eq!(clipped.get(0, 1), 7.0);
        assert_eq!(clipped.get(0, 2), -1.0);
        assert_eq!(clipped.valid_cells(), 8);
    }

    #[test]
    fn test_clip_outside_is_error() {
        let grid = test_grid(2, 2, vec![1.0; 4]);
        let rect = Rect::new(coord! { x: 10.0, y: 10.0 }, coord! { x: 12.0, y: 12.0 });
        assert!(matches!(
            grid.clip_to_bounds(&rect),
            Err(FldImpactError::EmptyWindow { .. })
        ));
    }

    #[test]
    fn test_cell_points_skip_nodata() {
        let grid = test_grid(2, 2, vec![0.0, 2.0, 2.0, f64::NAN]).with_nodata(0.0);
        let points = grid.cell_points(CellWeight::Constant(0.09));
        assert_eq!(points.len(), 2);
        assert!(points.iter().all(|p| p.weight == 0.09));
    }

    #[test]
    fn test_cell_points_truncated_value() {
        let grid = test_grid(2, 1, vec![12.7, 3.2]);
        let points = grid.cell_points(CellWeight::TruncatedValue);
        let weights: Vec<f64> = points.iter().map(|p| p.weight).collect();
        assert_eq!(weights, vec![12.0, 3.0]);
    }

    #[test]
    fn test_with_nodata_is_metadata_only() {
        let grid = test_grid(3, 1, vec![255.0, 2.0, 0.0]).with_nodata(255.0);
        let grid = grid.with_nodata(0.0);
        assert_eq!(grid.data, vec![255.0, 2.0, 0.0]);
        assert_eq!(grid.nodata, Some(0.0));
        assert_eq!(grid.valid_cells(), 2);
    }

    #[test]
    fn test_reclass_applies_to_nodata_cells() {
        // Le nodata 255 du raster de cultures passe en classe 2
        let grid = test_grid(3, 1, vec![255.0, 3.0, 1.0]).with_nodata(255.0);
        let out = grid.reclass(&ReclassRule::cropland()).with_nodata(0.0);
        assert_eq!(out.data, vec![2.0, 2.0, 0.0]);
        assert_eq!(out.cell_points(CellWeight::Constant(0.09)).len(), 2);
    }

    #[test]
    fn test_reclass_keeps_nan() {
        let grid = test_grid(2, 1, vec![f64::NAN, 5.0]);
        let out = grid.reclass(&ReclassRule::cropland());
        assert!(out.data[0].is_nan());
        assert_eq!(out.data[1], 2.0);
    }

    #[test]
    fn test_window_bounds() {
        let grid = test_grid(4, 4, vec![0.0; 16]);
        let rect = Rect::new(coord! { x: 0.5, y: -3.0 }, coord! { x: 2.0, y: 1.5 });
        let window = grid.header().window(&rect).unwrap();
        assert_eq!(
            window,
            PixelWindow {
                col_start: 0,
                col_end: 2,
                row_start: 2,
                row_end: 4,
            }
        );
        let t = grid.transform.for_window(&window);
        assert_eq!((t.origin_x, t.origin_y), (0.0, 2.0));
    }

    #[test]
    fn test_cell_hectares() {
        let t = GeoTransform {
            origin_x: 0.0,
            origin_y: 0.0,
            pixel_width: 30.0,
            pixel_height: 30.0,
        };
        assert!((t.cell_hectares() - 0.09).abs() < 1e-12);
    }
}
