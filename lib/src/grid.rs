use std::collections::HashMap;

use glam::DVec3;
use glam::I64Vec3;
use glam::i64vec3;

/// Spatial hash over a set of positions for fixed radius neighborhood queries.
///
/// Cells are cubes whose side equals the query radius, so every neighbor of
/// a point lies in the 27 cells around it. Only occupied cells are stored,
/// which keeps sparse, wide scans cheap.
#[derive(Clone, Debug)]
pub(crate) struct Grid<'a> {
    points: &'a [DVec3],
    cell_size: f64,
    lower: DVec3,
    cells: HashMap<I64Vec3, Vec<usize>>,
}

impl<'a> Grid<'a> {
    /// `radius` must be positive and finite.
    pub(crate) fn new(points: &'a [DVec3], radius: f64) -> Self {
        let lower = points
            .iter()
            .copied()
            .reduce(DVec3::min)
            .unwrap_or(DVec3::ZERO);

        let mut grid = Self {
            points,
            cell_size: radius,
            lower,
            cells: HashMap::new(),
        };

        for (i, p) in points.iter().enumerate() {
            let index = grid.cell_index(*p);
            grid.cells.entry(index).or_default().push(i);
        }

        grid
    }

    #[allow(clippy::cast_possible_truncation)]
    fn cell_index(&self, point: DVec3) -> I64Vec3 {
        let diff = ((point - self.lower) / self.cell_size).floor();
        i64vec3(diff.x as i64, diff.y as i64, diff.z as i64)
    }

    /// Indices of the points within `radius` of `point` (the point itself
    /// included when it belongs to the set), nearest first, at most
    /// `max_nn` of them.
    pub(crate) fn neighborhood(&self, point: DVec3, max_nn: usize) -> Vec<usize> {
        let center_index = self.cell_index(point);
        let radius_squared = self.cell_size * self.cell_size;

        let mut found: Vec<(f64, usize)> = Vec::new();
        for x_off in [-1, 0, 1] {
            for y_off in [-1, 0, 1] {
                for z_off in [-1, 0, 1] {
                    let index = center_index + i64vec3(x_off, y_off, z_off);
                    let Some(cell) = self.cells.get(&index) else {
                        continue;
                    };
                    for &i in cell {
                        let d = (self.points[i] - point).length_squared();
                        if d <= radius_squared {
                            found.push((d, i));
                        }
                    }
                }
            }
        }

        found.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        found.truncate(max_nn);
        found.into_iter().map(|(_, i)| i).collect()
    }
}
