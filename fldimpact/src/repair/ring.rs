//! Nettoyage et découpage des rings auto-intersectés

use std::collections::HashMap;

use geo::line_intersection::{line_intersection, LineIntersection};
use geo::{Coord, Line, LineString};

/// Aire minimale d'une boucle conservée
const AREA_EPSILON: f64 = 1e-12;

/// Supprime les doublons consécutifs et ferme le ring
///
/// Retourne `None` si moins de 3 sommets distincts subsistent.
pub fn clean_ring(ring: &LineString) -> Option<Vec<Coord>> {
    let mut coords: Vec<Coord> = Vec::with_capacity(ring.0.len() + 1);
    for &c in &ring.0 {
        if !c.x.is_finite() || !c.y.is_finite() {
            continue;
        }
        if coords.last() != Some(&c) {
            coords.push(c);
        }
    }

    if coords.len() > 1 && coords.first() == coords.last() {
        coords.pop();
    }
    if coords.len() < 3 {
        return None;
    }

    let first = coords[0];
    coords.push(first);
    Some(coords)
}

/// Insère les points d'intersection entre segments non adjacents
///
/// Entrée : ring fermé. Les sommets insérés sont partagés à l'identique
/// par les deux segments concernés.
pub fn node_ring(coords: &[Coord]) -> Vec<Coord> {
    let segments: Vec<Line> = coords.windows(2).map(|w| Line::new(w[0], w[1])).collect();
    let mut splits: Vec<Vec<Coord>> = vec![Vec::new(); segments.len()];

    for i in 0..segments.len() {
        for j in (i + 1)..segments.len() {
            let Some(hit) = line_intersection(segments[i], segments[j]) else {
                continue;
            };
            let points = match hit {
                LineIntersection::SinglePoint { intersection, .. } => vec![intersection],
                LineIntersection::Collinear { intersection } => {
                    vec![intersection.start, intersection.end]
                }
            };
            for p in points {
                push_split(&mut splits[i], segments[i], p);
                push_split(&mut splits[j], segments[j], p);
            }
        }
    }

    let mut noded = Vec::with_capacity(coords.len());
    for (segment, mut extra) in segments.iter().zip(splits) {
        noded.push(segment.start);
        let start = segment.start;
        extra.sort_by(|a, b| dist2(start, *a).total_cmp(&dist2(start, *b)));
        extra.dedup();
        noded.extend(extra);
    }
    if let Some(&first) = noded.first() {
        noded.push(first);
    }
    noded
}

fn push_split(target: &mut Vec<Coord>, segment: Line, p: Coord) {
    if p != segment.start && p != segment.end {
        target.push(p);
    }
}

fn dist2(a: Coord, b: Coord) -> f64 {
    (a.x - b.x).powi(2) + (a.y - b.y).powi(2)
}

fn key(c: Coord) -> (u64, u64) {
    (c.x.to_bits(), c.y.to_bits())
}

/// Découpe un ring noué en boucles simples aux sommets répétés
///
/// Les boucles d'aire nulle (pointes, allers-retours) sont écartées.
pub fn split_loops(noded: &[Coord]) -> Vec<LineString> {
    let mut loops = Vec::new();
    let mut path: Vec<Coord> = Vec::with_capacity(noded.len());
    let mut seen: HashMap<(u64, u64), usize> = HashMap::new();

    for &c in noded {
        if let Some(&start) = seen.get(&key(c)) {
            let mut ring: Vec<Coord> = path[start..].to_vec();
            ring.push(c);
            for removed in &path[start + 1..] {
                seen.remove(&key(*removed));
            }
            path.truncate(start + 1);

            if ring.len() >= 4 && signed_area(&ring).abs() > AREA_EPSILON {
                loops.push(LineString::new(ring));
            }
        } else {
            seen.insert(key(c), path.len());
            path.push(c);
        }
    }

    loops
}

/// Aire signée (positive pour un ring anti-horaire)
pub fn signed_area(coords: &[Coord]) -> f64 {
    coords
        .windows(2)
        .map(|w| w[0].x * w[1].y - w[1].x * w[0].y)
        .sum::<f64>()
        / 2.0
}

/// Vrai si le ring est déjà simple (fermé, sans doublon ni croisement)
pub fn is_simple(ring: &LineString) -> bool {
    let Some(cleaned) = clean_ring(ring) else {
        return false;
    };
    if cleaned.len() != ring.0.len() {
        return false;
    }
    let noded = node_ring(&cleaned);
    if noded.len() != cleaned.len() {
        return false;
    }
    let mut seen = std::collections::HashSet::new();
    cleaned[..cleaned.len() - 1].iter().all(|c| seen.insert(key(*c)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(points: &[(f64, f64)]) -> LineString {
        LineString::from(points.to_vec())
    }

    #[test]
    fn test_clean_ring_closes_and_dedupes() {
        let r = ring(&[(0.0, 0.0), (1.0, 0.0), (1.0, 0.0), (1.0, 1.0)]);
        let cleaned = clean_ring(&r).unwrap();
        assert_eq!(cleaned.len(), 4);
        assert_eq!(cleaned.first(), cleaned.last());
    }

    #[test]
    fn test_clean_ring_degenerate() {
        assert!(clean_ring(&ring(&[(0.0, 0.0), (1.0, 0.0), (0.0, 0.0)])).is_none());
        assert!(clean_ring(&ring(&[])).is_none());
    }

    #[test]
    fn test_bowtie_splits_in_two() {
        let r = ring(&[(0.0, 0.0), (2.0, 2.0), (2.0, 0.0), (0.0, 2.0), (0.0, 0.0)]);
        let cleaned = clean_ring(&r).unwrap();
        let noded = node_ring(&cleaned);
        assert_eq!(noded.len(), cleaned.len() + 2);

        let loops = split_loops(&noded);
        assert_eq!(loops.len(), 2);
        for l in &loops {
            assert!((signed_area(&l.0).abs() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_spike_dropped() {
        let r = ring(&[
            (0.0, 0.0),
            (2.0, 0.0),
            (3.0, 0.0),
            (2.0, 0.0),
            (2.0, 2.0),
            (0.0, 2.0),
            (0.0, 0.0),
        ]);
        let cleaned = clean_ring(&r).unwrap();
        let loops = split_loops(&node_ring(&cleaned));
        assert_eq!(loops.len(), 1);
        assert!((signed_area(&loops[0].0) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_is_simple() {
        let square = ring(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]);
        assert!(is_simple(&square));

        let bowtie = ring(&[(0.0, 0.0), (2.0, 2.0), (2.0, 0.0), (0.0, 2.0), (0.0, 0.0)]);
        assert!(!is_simple(&bowtie));

        let open = ring(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        assert!(!is_simple(&open));
    }
}
