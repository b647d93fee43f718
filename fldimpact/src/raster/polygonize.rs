//! Vectorisation d'un raster en polygones (cellules 4-connexes de même valeur)
//!
//! Les anneaux suivent les bords de cellules. Chaque arête de bord est orientée
//! avec la composante à sa gauche : les extérieurs sortent en sens
//! anti-horaire, les trous en sens horaire. Aux sommets pincés (deux cellules
//! de la composante en diagonale), on tourne à droite pour que chaque anneau
//! entoure une seule région extérieure à la composante.

use std::collections::{HashMap, VecDeque};

use geo::{Contains, Coord, LineString, Point, Polygon};
use tracing::{debug, warn};

use super::Grid;
use crate::types::ValuedPolygon;

/// Sommet de grille (colonne, ligne)
type Vertex = (i64, i64);

#[derive(Debug, Clone, Copy)]
struct Edge {
    from: Vertex,
    to: Vertex,
}

impl Edge {
    fn direction(&self) -> (i64, i64) {
        (self.to.0 - self.from.0, self.to.1 - self.from.1)
    }
}

/// Vectorise toutes les cellules non-NaN du raster.
///
/// Les cellules nodata sont vectorisées comme les autres ; utiliser
/// [`drop_value`] pour les retirer.
pub fn polygonize(grid: &Grid) -> Vec<ValuedPolygon> {
    let (labels, values) = label_components(grid);
    let mut edges: Vec<Vec<Edge>> = vec![Vec::new(); values.len()];

    let label_at = |row: i64, col: i64| -> Option<usize> {
        if row < 0 || col < 0 || row >= grid.height as i64 || col >= grid.width as i64 {
            None
        } else {
            labels[row as usize * grid.width + col as usize]
        }
    };

    for row in 0..grid.height as i64 {
        for col in 0..grid.width as i64 {
            let Some(label) = label_at(row, col) else {
                continue;
            };
            let (c, r) = (col, row);
            if label_at(row + 1, col) != Some(label) {
                edges[label].push(Edge { from: (c, r + 1), to: (c + 1, r + 1) });
            }
            if label_at(row, col + 1) != Some(label) {
                edges[label].push(Edge { from: (c + 1, r + 1), to: (c + 1, r) });
            }
            if label_at(row - 1, col) != Some(label) {
                edges[label].push(Edge { from: (c + 1, r), to: (c, r) });
            }
            if label_at(row, col - 1) != Some(label) {
                edges[label].push(Edge { from: (c, r), to: (c, r + 1) });
            }
        }
    }

    let mut polygons = Vec::new();
    for (label, component_edges) in edges.iter().enumerate() {
        let rings = trace_rings(component_edges);
        for polygon in assemble(rings) {
            polygons.push(ValuedPolygon {
                polygon: to_world(&polygon, grid),
                value: values[label],
            });
        }
    }

    debug!(
        components = values.len(),
        polygons = polygons.len(),
        "Raster polygonized"
    );

    polygons
}

/// Retire les polygones dont la valeur vaut `sentinel`
pub fn drop_value(polygons: Vec<ValuedPolygon>, sentinel: f64) -> Vec<ValuedPolygon> {
    polygons
        .into_iter()
        .filter(|p| p.value != sentinel)
        .collect()
}

/// Étiquette les composantes 4-connexes de même valeur
fn label_components(grid: &Grid) -> (Vec<Option<usize>>, Vec<f64>) {
    let mut labels: Vec<Option<usize>> = vec![None; grid.data.len()];
    let mut values = Vec::new();
    let mut queue = VecDeque::new();

    for start in 0..grid.data.len() {
        let value = grid.data[start];
        if labels[start].is_some() || value.is_nan() {
            continue;
        }

        let label = values.len();
        values.push(value);
        labels[start] = Some(label);
        queue.push_back(start);

        while let Some(idx) = queue.pop_front() {
            let (row, col) = (idx / grid.width, idx % grid.width);
            let mut neighbors = Vec::with_capacity(4);
            if row > 0 {
                neighbors.push(idx - grid.width);
            }
            if row + 1 < grid.height {
                neighbors.push(idx + grid.width);
            }
            if col > 0 {
                neighbors.push(idx - 1);
            }
            if col + 1 < grid.width {
                neighbors.push(idx + 1);
            }
            for n in neighbors {
                if labels[n].is_none() && grid.data[n] == value {
                    labels[n] = Some(label);
                    queue.push_back(n);
                }
            }
        }
    }

    (labels, values)
}

/// Priorité de virage : droite > tout droit > gauche > demi-tour
fn turn_rank(incoming: (i64, i64), outgoing: (i64, i64)) -> u8 {
    // Passage en repère monde (y vers le haut)
    let (ax, ay) = (incoming.0, -incoming.1);
    let (bx, by) = (outgoing.0, -outgoing.1);
    let cross = ax * by - ay * bx;
    let dot = ax * bx + ay * by;

    if cross < 0 {
        3
    } else if cross == 0 && dot > 0 {
        2
    } else if cross > 0 {
        1
    } else {
        0
    }
}

/// Chaîne les arêtes de bord en anneaux fermés (sommets sans doublon final)
fn trace_rings(edges: &[Edge]) -> Vec<Vec<Vertex>> {
    let mut outgoing: HashMap<Vertex, Vec<usize>> = HashMap::new();
    for (i, edge) in edges.iter().enumerate() {
        outgoing.entry(edge.from).or_default().push(i);
    }

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();

    for start in 0..edges.len() {
        if used[start] {
            continue;
        }
        used[start] = true;

        let mut ring = vec![edges[start].from];
        let mut current = start;

        loop {
            let end = edges[current].to;
            let incoming = edges[current].direction();

            // L'arête de départ reste candidate pour fermer l'anneau
            let next = outgoing
                .get(&end)
                .into_iter()
                .flatten()
                .copied()
                .filter(|&e| !used[e] || e == start)
                .max_by_key(|&e| turn_rank(incoming, edges[e].direction()));

            match next {
                Some(e) if e == start => {
                    rings.push(simplify(ring));
                    break;
                }
                Some(e) => {
                    used[e] = true;
                    ring.push(end);
                    current = e;
                }
                None => {
                    warn!(vertices = ring.len(), "Open boundary while tracing ring, dropped");
                    break;
                }
            }
        }
    }

    rings
}

/// Supprime les sommets alignés d'un anneau cyclique
fn simplify(ring: Vec<Vertex>) -> Vec<Vertex> {
    let n = ring.len();
    if n < 4 {
        return ring;
    }
    (0..n)
        .filter(|&i| {
            let prev = ring[(i + n - 1) % n];
            let cur = ring[i];
            let next = ring[(i + 1) % n];
            let d1 = (cur.0 - prev.0, cur.1 - prev.1);
            let d2 = (next.0 - cur.0, next.1 - cur.1);
            d1.0 * d2.1 - d1.1 * d2.0 != 0
        })
        .map(|i| ring[i])
        .collect()
}

/// Double de l'aire signée en repère monde (positive = anti-horaire)
fn signed_area2(ring: &[Vertex]) -> i64 {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let (x1, y1) = (ring[i].0, -ring[i].1);
            let (x2, y2) = (ring[(i + 1) % n].0, -ring[(i + 1) % n].1);
            x1 * y2 - x2 * y1
        })
        .sum()
}

fn to_linestring(ring: &[Vertex]) -> LineString {
    let mut coords: Vec<Coord> = ring
        .iter()
        .map(|&(c, r)| Coord { x: c as f64, y: -(r as f64) })
        .collect();
    if let Some(&first) = coords.first() {
        coords.push(first);
    }
    LineString::new(coords)
}

/// Centre d'une cellule de la composante adjacente au premier bord de l'anneau
fn interior_sample(ring: &[Vertex]) -> Point {
    let (a, b) = (ring[0], ring[1 % ring.len()]);
    let (ax, ay) = (a.0 as f64, -(a.1 as f64));
    let (bx, by) = (b.0 as f64, -(b.1 as f64));
    let len = ((bx - ax).powi(2) + (by - ay).powi(2)).sqrt().max(f64::EPSILON);
    let (nx, ny) = (-(by - ay) / len, (bx - ax) / len);
    Point::new(
        ax + (bx - ax).signum() * 0.5 + nx * 0.5,
        ay + (by - ay).signum() * 0.5 + ny * 0.5,
    )
}

/// Regroupe extérieurs et trous en polygones (repère grille)
fn assemble(rings: Vec<Vec<Vertex>>) -> Vec<Polygon> {
    let mut shells: Vec<Polygon> = Vec::new();
    let mut holes: Vec<Vec<Vertex>> = Vec::new();

    for ring in rings {
        if ring.len() < 3 {
            continue;
        }
        match signed_area2(&ring) {
            a if a > 0 => shells.push(Polygon::new(to_linestring(&ring), vec![])),
            a if a < 0 => holes.push(ring),
            _ => {}
        }
    }

    for hole in holes {
        let inner = interior_sample(&hole);
        let owner = if shells.len() == 1 {
            Some(0)
        } else {
            shells.iter().position(|shell| shell.contains(&inner))
        };
        match owner {
            Some(i) => shells[i].interiors_push(to_linestring(&hole)),
            None => warn!("Hole without enclosing shell, dropped"),
        }
    }

    shells
}

/// Passe du repère grille (colonne, -ligne) au CRS du raster
fn to_world(polygon: &Polygon, grid: &Grid) -> Polygon {
    let t = &grid.transform;
    let map = |ls: &LineString| -> LineString {
        ls.0.iter()
            .map(|c| Coord {
                x: t.origin_x + c.x * t.pixel_width,
                y: t.origin_y + c.y * t.pixel_height,
            })
            .collect()
    };
    Polygon::new(
        map(polygon.exterior()),
        polygon.interiors().iter().map(map).collect(),
    )
}
