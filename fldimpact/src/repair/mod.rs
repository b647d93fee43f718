//! Réparation des polygones vectorisés (équivalent d'un `make_valid`)
//!
//! Les polygones déjà valides sont conservés tels quels. Les autres sont
//! nettoyés ring par ring : doublons supprimés, croisements noués, boucles
//! séparées puis regroupées en extérieurs et trous.

pub mod ring;
pub mod topology;

use geo::orient::{Direction, Orient};
use geo::{LineString, Polygon};
use tracing::{debug, warn};

use crate::types::ValuedPolygon;

/// Vrai si tous les rings du polygone sont simples
pub fn is_valid_polygon(polygon: &Polygon) -> bool {
    ring::is_simple(polygon.exterior()) && polygon.interiors().iter().all(ring::is_simple)
}

/// Répare un polygone, en le scindant si nécessaire
///
/// Un nœud papillon donne ses deux lobes. Un polygone sans surface
/// retourne une liste vide.
pub fn repair_polygon(polygon: &Polygon) -> Vec<Polygon> {
    if is_valid_polygon(polygon) {
        return vec![polygon.clone()];
    }

    let shells = simple_loops(polygon.exterior());
    if shells.is_empty() {
        return Vec::new();
    }

    let mut polygons = topology::organize_rings(shells);
    let holes: Vec<LineString> = polygon.interiors().iter().flat_map(simple_loops).collect();
    topology::assign_holes(&mut polygons, holes);

    polygons
        .into_iter()
        .map(|p| p.orient(Direction::Default))
        .collect()
}

fn simple_loops(ring: &LineString) -> Vec<LineString> {
    match ring::clean_ring(ring) {
        Some(cleaned) => ring::split_loops(&ring::node_ring(&cleaned)),
        None => Vec::new(),
    }
}

/// Répare une liste de polygones valués, la valeur suit chaque morceau
pub fn fix_geometries(polygons: Vec<ValuedPolygon>) -> Vec<ValuedPolygon> {
    let input = polygons.len();
    let mut repaired = 0usize;
    let mut dropped = 0usize;
    let mut output = Vec::with_capacity(input);

    for vp in polygons {
        if is_valid_polygon(&vp.polygon) {
            output.push(vp);
            continue;
        }

        let parts = repair_polygon(&vp.polygon);
        if parts.is_empty() {
            dropped += 1;
            continue;
        }
        repaired += 1;
        output.extend(parts.into_iter().map(|polygon| ValuedPolygon {
            polygon,
            value: vp.value,
        }));
    }

    if dropped > 0 {
        warn!(dropped, "Degenerate polygons removed");
    }
    debug!(input, repaired, output = output.len(), "Geometries fixed");
    output
}
