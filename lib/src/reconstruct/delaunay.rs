//! Incremental (Bowyer-Watson) Delaunay tetrahedralization.
//!
//! Orientation and in-sphere tests use exact adaptive predicates, so grids,
//! quantized scans and sampled spheres triangulate without overlaps or
//! holes. Each point is located by walking from the last created cell and
//! its cavity is flooded through face neighbours; insertion follows a
//! Morton order so consecutive points are close.

use std::collections::HashMap;

use glam::DVec3;
use log::debug;
use robust::Coord3D;
use robust::insphere;
use robust::orient3d;

/// Four indices into the input points.
pub(crate) type Tetrahedron = [usize; 4];

const NONE: usize = usize::MAX;

#[derive(Clone, Copy, Debug)]
struct Cell {
    vertices: Tetrahedron,
    // neighbors[i] shares the face opposite vertices[i].
    neighbors: [usize; 4],
    alive: bool,
}

fn coord(p: DVec3) -> Coord3D<f64> {
    Coord3D {
        x: p.x,
        y: p.y,
        z: p.z,
    }
}

/// Exact sign of the orientation of `d` relative to the plane `abc`.
///
/// Positive when `d` lies on the side the normal `(b - a) x (c - a)`
/// points away from, zero when the four points are coplanar.
pub(crate) fn orientation(a: DVec3, b: DVec3, c: DVec3, d: DVec3) -> f64 {
    orient3d(coord(a), coord(b), coord(c), coord(d))
}

/// Center and squared radius of the sphere through four points, or `None`
/// when they are (numerically) coplanar.
pub(crate) fn circumsphere(a: DVec3, b: DVec3, c: DVec3, d: DVec3) -> Option<(DVec3, f64)> {
    let u = b - a;
    let v = c - a;
    let w = d - a;

    let det = u.dot(v.cross(w));
    let scale = u.length() * v.length() * w.length();
    if scale == 0.0 || det.abs() <= 1e-12 * scale {
        return None;
    }

    let to_center = (v.cross(w) * u.length_squared()
        + w.cross(u) * v.length_squared()
        + u.cross(v) * w.length_squared())
        / (2.0 * det);

    Some((a + to_center, to_center.length_squared()))
}

// Spread the low 21 bits of `v` three apart.
const fn spread(mut v: u64) -> u64 {
    v &= 0x1f_ffff;
    v = (v | v << 32) & 0x001f_0000_0000_ffff;
    v = (v | v << 16) & 0x001f_0000_ff00_00ff;
    v = (v | v << 8) & 0x100f_00f0_0f00_f00f;
    v = (v | v << 4) & 0x10c3_0c30_c30c_30c3;
    v = (v | v << 2) & 0x1249_2492_4924_9249;
    v
}

#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
fn morton(p: DVec3, min: DVec3, scale: f64) -> u64 {
    let q = ((p - min) * scale).to_array().map(|c| c.clamp(0.0, 2_097_151.0) as u64);
    spread(q[0]) | spread(q[1]) << 1 | spread(q[2]) << 2
}

struct Triangulation {
    points: Vec<DVec3>,
    cells: Vec<Cell>,
    free: Vec<usize>,
    // Insertion that last tested the cell, and whether it was in conflict.
    visited: Vec<usize>,
    in_cavity: Vec<bool>,
    edges: HashMap<(usize, usize), (usize, usize)>,
    last: usize,
}

impl Triangulation {
    fn new(points: Vec<DVec3>, enclosing: Tetrahedron) -> Self {
        let mut vertices = enclosing;
        let [a, b, c, d] = vertices.map(|v| points[v]);
        if orientation(a, b, c, d) < 0.0 {
            vertices.swap(2, 3);
        }
        Self {
            points,
            cells: vec![Cell {
                vertices,
                neighbors: [NONE; 4],
                alive: true,
            }],
            free: Vec::new(),
            visited: vec![0],
            in_cavity: vec![false],
            edges: HashMap::new(),
            last: 0,
        }
    }

    // Orientation of the cell with vertex `i` moved to `p`; negative when
    // `p` lies beyond the face opposite `i`.
    fn side(&self, cell: &Cell, i: usize, p: DVec3) -> f64 {
        let mut corners = cell.vertices.map(|v| self.points[v]);
        corners[i] = p;
        let [a, b, c, d] = corners;
        orientation(a, b, c, d)
    }

    fn contains(&self, cell: &Cell, p: DVec3) -> bool {
        (0..4).all(|i| self.side(cell, i, p) >= 0.0)
    }

    fn in_sphere(&self, cell: usize, p: DVec3) -> f64 {
        let [a, b, c, d] = self.cells[cell].vertices.map(|v| coord(self.points[v]));
        insphere(a, b, c, d, coord(p))
    }

    // Visibility walk from the last created cell. Falls back to a scan if
    // the walk runs longer than the mesh is large.
    fn locate(&self, p: DVec3, rotation: usize) -> Option<usize> {
        let mut current = self.last;
        for step in 0..=self.cells.len() {
            let cell = &self.cells[current];
            let beyond = (0..4)
                .map(|k| (k + step + rotation) % 4)
                .find(|&i| self.side(cell, i, p) < 0.0);
            match beyond {
                None => return Some(current),
                Some(i) if cell.neighbors[i] == NONE => return None,
                Some(i) => current = cell.neighbors[i],
            }
        }
        self.cells
            .iter()
            .position(|cell| cell.alive && self.contains(cell, p))
    }

    fn add_cell(&mut self, vertices: Tetrahedron, neighbors: [usize; 4]) -> usize {
        let cell = Cell {
            vertices,
            neighbors,
            alive: true,
        };
        if let Some(slot) = self.free.pop() {
            self.cells[slot] = cell;
            slot
        } else {
            self.cells.push(cell);
            self.visited.push(0);
            self.in_cavity.push(false);
            self.cells.len() - 1
        }
    }

    /// Insert point `index`; false for a point outside the enclosing
    /// tetrahedron or on top of an existing vertex.
    fn insert(&mut self, index: usize) -> bool {
        let p = self.points[index];
        let generation = index + 1;
        let Some(start) = self.locate(p, index) else {
            return false;
        };
        if self.cells[start]
            .vertices
            .iter()
            .any(|&v| self.points[v] == p)
        {
            return false;
        }

        // Every cell whose closed circumsphere holds `p`, reachable from
        // the one containing it.
        self.visited[start] = generation;
        self.in_cavity[start] = true;
        let mut cavity = vec![start];
        let mut boundary: Vec<(Tetrahedron, usize, usize)> = Vec::new();
        let mut next = 0;
        while next < cavity.len() {
            let cell = self.cells[cavity[next]];
            next += 1;
            for (i, &neighbor) in cell.neighbors.iter().enumerate() {
                if neighbor != NONE {
                    if self.visited[neighbor] != generation {
                        self.visited[neighbor] = generation;
                        let conflict = self.in_sphere(neighbor, p) >= 0.0;
                        self.in_cavity[neighbor] = conflict;
                        if conflict {
                            cavity.push(neighbor);
                        }
                    }
                    if self.in_cavity[neighbor] {
                        continue;
                    }
                }
                boundary.push((cell.vertices, i, neighbor));
            }
        }

        for &c in &cavity {
            self.cells[c].alive = false;
            self.free.push(c);
        }

        // The cavity is star shaped from `p`: joining each boundary face
        // to it keeps the orientation of the cell it replaces.
        self.edges.clear();
        for (mut vertices, i, outside) in boundary {
            vertices[i] = index;
            let mut neighbors = [NONE; 4];
            neighbors[i] = outside;
            let created = self.add_cell(vertices, neighbors);

            if outside != NONE {
                let across = &mut self.cells[outside];
                if let Some(slot) = across.vertices.iter().position(|v| !vertices.contains(v)) {
                    across.neighbors[slot] = created;
                }
            }

            for j in (0..4).filter(|&j| j != i) {
                let mut edge = (0..4).filter(|&m| m != i && m != j).map(|m| vertices[m]);
                let (Some(u), Some(w)) = (edge.next(), edge.next()) else {
                    continue;
                };
                let key = (u.min(w), u.max(w));
                if let Some((other, other_j)) = self.edges.remove(&key) {
                    self.cells[created].neighbors[j] = other;
                    self.cells[other].neighbors[other_j] = created;
                } else {
                    self.edges.insert(key, (created, j));
                }
            }
            self.last = created;
        }
        true
    }
}

/// Tetrahedralize a set of points.
///
/// Repeated positions are inserted once. Tetrahedra touching the
/// enclosing scaffold are dropped, so the result covers the convex hull of
/// the input.
pub(crate) fn tetrahedralize(points: &[DVec3]) -> Vec<Tetrahedron> {
    let n = points.len();
    if n < 4 {
        return Vec::new();
    }

    let min = points.iter().copied().fold(DVec3::INFINITY, DVec3::min);
    let max = points.iter().copied().fold(DVec3::NEG_INFINITY, DVec3::max);
    let center = (min + max) / 2.0;
    let extent = ((max - min) / 2.0).max_element();
    if !(extent > 0.0) {
        return Vec::new();
    }

    // Far enough out that no cell small enough to survive an alpha filter
    // has a scaffold vertex inside its circumsphere.
    let k = (100.0 * extent).max(center.abs().max_element() * 1e-6);
    let mut work = points.to_vec();
    work.push(center + DVec3::new(-k, -k, -k));
    work.push(center + DVec3::new(5.0 * k, -k, -k));
    work.push(center + DVec3::new(-k, 5.0 * k, -k));
    work.push(center + DVec3::new(-k, -k, 5.0 * k));

    let scale = 2_097_151.0 / (2.0 * extent);
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by_cached_key(|&i| (morton(points[i], min, scale), i));

    let mut triangulation = Triangulation::new(work, [n, n + 1, n + 2, n + 3]);
    let skipped = order
        .into_iter()
        .filter(|&i| !triangulation.insert(i))
        .count();

    let mut tetrahedra: Vec<Tetrahedron> = triangulation
        .cells
        .into_iter()
        .filter(|c| c.alive && c.vertices.iter().all(|&v| v < n))
        .map(|c| {
            let mut t = c.vertices;
            t.sort_unstable();
            t
        })
        .collect();
    tetrahedra.sort_unstable();

    debug!(
        "delaunay: {n} points ({skipped} skipped), {} tetrahedra",
        tetrahedra.len()
    );
    tetrahedra
}
