use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

use glam::DVec3;
use log::debug;

use super::delaunay::circumsphere;
use super::delaunay::orientation;
use super::delaunay::tetrahedralize;
use crate::cloud::ColoredCloud;
use crate::error::ReconstructionFailure;
use crate::mesh::Mesh;

/// Minimum number of distinct points for a tetrahedralization.
pub const MIN_POINTS: usize = 4;

/// Parameters of the alpha shape.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AlphaParams {
    /// Largest circumradius of a kept tetrahedron. Small values hug the
    /// points and keep detail; large values bridge gaps.
    pub alpha: f64,
}

impl Default for AlphaParams {
    fn default() -> Self {
        Self { alpha: 1.0 }
    }
}

/// Build the alpha shape of a cloud.
///
/// The cloud is tetrahedralized, tetrahedra whose circumradius exceeds
/// `alpha` are discarded, and the faces that belong to exactly one kept
/// tetrahedron form the mesh, wound outwards. Duplicate points are merged
/// and points that end up on no face are dropped. Colors follow their
/// vertices. Normals are computed before returning.
///
/// # Errors
///   `InvalidParameter` for a non-positive alpha, `TooFewPoints` with
///   fewer than four distinct points, `DegenerateAlphaShape` when no face
///   survives.
pub fn alpha_shape(cloud: &ColoredCloud, alpha: f64) -> Result<Mesh, ReconstructionFailure> {
    if !(alpha.is_finite() && alpha > 0.0) {
        return Err(ReconstructionFailure::InvalidParameter(format!(
            "alpha must be a positive number, got {alpha}"
        )));
    }

    // Representative (first occurrence) of every distinct position.
    let mut seen: HashMap<[u64; 3], usize> = HashMap::new();
    let mut unique: Vec<DVec3> = Vec::new();
    let mut source: Vec<usize> = Vec::new();
    for (i, p) in cloud.points.iter().enumerate() {
        let key = p.to_array().map(f64::to_bits);
        if let Entry::Vacant(slot) = seen.entry(key) {
            slot.insert(unique.len());
            unique.push(*p);
            source.push(i);
        }
    }

    if unique.len() < MIN_POINTS {
        return Err(ReconstructionFailure::TooFewPoints {
            required: MIN_POINTS,
            actual: unique.len(),
        });
    }

    let tetrahedra = tetrahedralize(&unique);

    let alpha_squared = alpha * alpha;
    let mut faces: BTreeMap<[usize; 3], ([usize; 3], usize)> = BTreeMap::new();
    let mut kept = 0_usize;
    for t in &tetrahedra {
        let [a, b, c, d] = t.map(|i| unique[i]);
        let Some((_, radius_squared)) = circumsphere(a, b, c, d) else {
            continue;
        };
        if radius_squared > alpha_squared {
            continue;
        }
        kept += 1;

        let [i, j, k, l] = *t;
        for (face, opposite) in [([i, j, k], l), ([i, j, l], k), ([i, k, l], j), ([j, k, l], i)] {
            let oriented = orient_away(face, opposite, &unique);
            let mut key = face;
            key.sort_unstable();
            faces.entry(key).or_insert((oriented, 0)).1 += 1;
        }
    }
    debug!(
        "alpha {alpha}: kept {kept} of {} tetrahedra",
        tetrahedra.len()
    );

    let boundary: Vec<[usize; 3]> = faces
        .into_values()
        .filter(|(_, count)| *count == 1)
        .map(|(face, _)| face)
        .collect();

    if boundary.is_empty() {
        return Err(ReconstructionFailure::DegenerateAlphaShape { alpha });
    }

    // Keep only referenced vertices, in input order.
    let mut remap: Vec<Option<usize>> = vec![None; unique.len()];
    for &v in boundary.iter().flatten() {
        remap[v] = Some(0);
    }
    let mut vertices = Vec::new();
    let mut colors = Vec::new();
    for (old, slot) in remap.iter_mut().enumerate() {
        if slot.is_some() {
            *slot = Some(vertices.len());
            vertices.push(unique[old]);
            if cloud.has_colors() {
                colors.push(cloud.colors[source[old]]);
            }
        }
    }

    let triangles: Vec<[usize; 3]> = boundary
        .iter()
        .map(|f| f.map(|v| remap[v].unwrap_or_default()))
        .collect();

    let mesh = Mesh::new(vertices, triangles).ok_or(ReconstructionFailure::EmptyMesh)?;
    Ok(mesh.with_colors(colors).with_normals())
}

// Wind `face` so its normal points away from the tetrahedron's fourth vertex.
fn orient_away(face: [usize; 3], opposite: usize, points: &[DVec3]) -> [usize; 3] {
    let [a, b, c] = face.map(|i| points[i]);
    if orientation(a, b, c, points[opposite]) < 0.0 {
        [face[0], face[2], face[1]]
    } else {
        face
    }
}
