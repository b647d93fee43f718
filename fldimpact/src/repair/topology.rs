//! Regroupement des boucles en polygones (extérieurs, trous)

use geo::{Area, Contains, InteriorPoint, LineString, Polygon};
use tracing::warn;

/// Organise les boucles issues d'extérieurs en polygones
///
/// Une boucle contenue dans une autre devient un trou de la plus petite
/// boucle qui la contient (règle pair-impair).
pub fn organize_rings(rings: Vec<LineString>) -> Vec<Polygon> {
    if rings.len() == 1 {
        return rings.into_iter().map(|r| Polygon::new(r, vec![])).collect();
    }

    let shapes: Vec<Polygon> = rings
        .iter()
        .map(|r| Polygon::new(r.clone(), vec![]))
        .collect();

    // Profondeur d'imbrication et parent direct de chaque boucle
    let mut parents: Vec<Option<usize>> = vec![None; rings.len()];
    let mut depths: Vec<usize> = vec![0; rings.len()];

    for i in 0..shapes.len() {
        let Some(inner) = shapes[i].interior_point() else {
            continue;
        };
        let mut best: Option<(usize, f64)> = None;
        for j in 0..shapes.len() {
            if i == j || !shapes[j].contains(&inner) {
                continue;
            }
            let area = shapes[j].unsigned_area();
            if area <= shapes[i].unsigned_area() {
                continue;
            }
            depths[i] += 1;
            if best.map_or(true, |(_, a)| area < a) {
                best = Some((j, area));
            }
        }
        parents[i] = best.map(|(j, _)| j);
    }

    let mut polygons: Vec<(usize, Polygon)> = Vec::new();
    for (i, ring) in rings.iter().enumerate() {
        if depths[i] % 2 == 0 {
            polygons.push((i, Polygon::new(ring.clone(), vec![])));
        }
    }
    for (i, ring) in rings.iter().enumerate() {
        if depths[i] % 2 == 0 {
            continue;
        }
        if let Some(parent) = parents[i] {
            if let Some((_, polygon)) = polygons.iter_mut().find(|(idx, _)| *idx == parent) {
                polygon.interiors_push(ring.clone());
            }
        }
    }

    polygons.into_iter().map(|(_, p)| p).collect()
}

/// Rattache des trous au polygone qui contient leur point intérieur
///
/// Les trous hors de tout polygone sont abandonnés.
pub fn assign_holes(polygons: &mut [Polygon], holes: Vec<LineString>) {
    for hole in holes {
        let Some(inner) = Polygon::new(hole.clone(), vec![]).interior_point() else {
            continue;
        };

        let owner = polygons
            .iter_mut()
            .filter(|p| Polygon::new(p.exterior().clone(), vec![]).contains(&inner))
            .min_by(|a, b| exterior_area(a).total_cmp(&exterior_area(b)));

        match owner {
            Some(polygon) => polygon.interiors_push(hole),
            None => warn!(points = hole.0.len(), "Hole outside of every shell, dropped"),
        }
    }
}

fn exterior_area(polygon: &Polygon) -> f64 {
    Polygon::new(polygon.exterior().clone(), vec![]).unsigned_area()
}
