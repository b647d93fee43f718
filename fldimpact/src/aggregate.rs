//! Agrégation point-dans-polygone (surfaces, population, équipements)

use std::collections::BTreeMap;

use geo::{BoundingRect, Intersects, MultiPolygon, Point, Rect};
use tracing::{debug, warn};

use crate::amenity::{classify, AmenityCategory};
use crate::types::{AmenityPoint, ClipSummary, WeightedPoint};

/// Surface par défaut d'un point de culture (cellule de 30 m)
pub const DEFAULT_CELL_HECTARES: f64 = 0.09;

/// Élément localisé par un point
pub trait Located {
    fn location(&self) -> Point;
}

impl Located for WeightedPoint {
    fn location(&self) -> Point {
        self.point
    }
}

impl Located for AmenityPoint {
    fn location(&self) -> Point {
        self.point
    }
}

impl Located for Point {
    fn location(&self) -> Point {
        *self
    }
}

fn rect_contains(rect: &Rect, p: Point) -> bool {
    let (min, max) = (rect.min(), rect.max());
    p.x() >= min.x && p.x() <= max.x && p.y() >= min.y && p.y() <= max.y
}

/// Retourne les points qui intersectent l'emprise (bord inclus)
pub fn clip_points<'a, T: Located>(points: &'a [T], extent: &MultiPolygon) -> Vec<&'a T> {
    let Some(bbox) = extent.bounding_rect() else {
        return Vec::new();
    };

    // Boîte englobante par polygone pour le pré-filtre
    let parts: Vec<_> = extent
        .0
        .iter()
        .filter_map(|p| p.bounding_rect().map(|r| (r, p)))
        .collect();

    points
        .iter()
        .filter(|item| {
            let p = item.location();
            rect_contains(&bbox, p)
                && parts
                    .iter()
                    .any(|(rect, polygon)| rect_contains(rect, p) && polygon.intersects(&p))
        })
        .collect()
}

/// Nombre et somme des poids des points dans l'emprise
pub fn summarize(points: &[WeightedPoint], extent: &MultiPolygon) -> ClipSummary {
    clip_points(points, extent)
        .into_iter()
        .fold(ClipSummary::default(), |acc, wp| ClipSummary {
            count: acc.count + 1,
            total: acc.total + wp.weight,
        })
}

/// Hectares inondés à partir du nombre de points de culture
pub fn agriculture_hectares(count: usize, cell_hectares: f64) -> f64 {
    count as f64 * cell_hectares
}

/// Compteurs d'équipements par catégorie
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryCounts {
    counts: [usize; AmenityCategory::ALL.len()],

    /// Tags sans catégorie
    pub unclassified: usize,
}

impl CategoryCounts {
    fn slot(category: AmenityCategory) -> usize {
        AmenityCategory::ALL
            .iter()
            .position(|c| *c == category)
            .unwrap_or_default()
    }

    pub fn get(&self, category: AmenityCategory) -> usize {
        self.counts[Self::slot(category)]
    }

    pub fn add(&mut self, category: AmenityCategory, n: usize) {
        self.counts[Self::slot(category)] += n;
    }

    /// Total classé (hors `unclassified`)
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Paires (catégorie, compte) dans l'ordre de déclaration
    pub fn iter(&self) -> impl Iterator<Item = (AmenityCategory, usize)> + '_ {
        AmenityCategory::ALL.iter().map(|&c| (c, self.get(c)))
    }

    /// Classe des comptes par tag
    pub fn from_tags(tags: &BTreeMap<String, usize>) -> Self {
        let mut counts = CategoryCounts::default();
        for (tag, &n) in tags {
            match classify(tag) {
                Some(category) => counts.add(category, n),
                None => {
                    warn!(amenity = %tag, count = n, "Amenity tag matches no category");
                    counts.unclassified += n;
                }
            }
        }
        counts
    }
}

/// Équipements dans l'emprise : comptes par catégorie et par tag
pub fn count_amenities(
    points: &[AmenityPoint],
    extent: &MultiPolygon,
) -> (CategoryCounts, BTreeMap<String, usize>) {
    let mut tags: BTreeMap<String, usize> = BTreeMap::new();
    for p in clip_points(points, extent) {
        *tags.entry(p.amenity.clone()).or_default() += 1;
    }

    let counts = CategoryCounts::from_tags(&tags);
    debug!(
        tags = tags.len(),
        classified = counts.total(),
        unclassified = counts.unclassified,
        "Amenities counted"
    );
    (counts, tags)
}
