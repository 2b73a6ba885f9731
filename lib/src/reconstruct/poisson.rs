use fast_surface_nets::SurfaceNetsBuffer;
use fast_surface_nets::ndshape::RuntimeShape;
use fast_surface_nets::ndshape::Shape;
use fast_surface_nets::surface_nets;
use glam::DVec3;
use log::debug;
use log::warn;

use super::normals::estimate_normals;
use super::normals::orient_outward;
use crate::cloud::ColoredCloud;
use crate::cloud::ScalarField;
use crate::color::Rgb;
use crate::error::ReconstructionFailure;
use crate::mesh::Mesh;
use crate::mesh::face_normal;

/// Deepest grid the dense solver accepts (2^7 = 128 cells per axis).
pub const MAX_DEPTH: u32 = 7;

/// Ratio between the grid's side and the cloud's largest extent.
pub const SCALE: f64 = 1.1;

const MAX_ITERATIONS: usize = 1000;
const TOLERANCE: f64 = 1e-7;

/// Parameters of the Poisson reconstruction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PoissonParams {
    /// Neighborhood radius for normal estimation.
    pub radius: f64,
    /// Neighborhood cap for normal estimation.
    pub max_nn: usize,
    /// Grid depth: `2^depth` cells per axis. Clamped to [`MAX_DEPTH`].
    pub depth: u32,
}

impl Default for PoissonParams {
    fn default() -> Self {
        Self {
            radius: 0.1,
            max_nn: 30,
            depth: 9,
        }
    }
}

/// Regular lattice of nodes covering the padded bounding cube.
struct Lattice {
    origin: DVec3,
    spacing: f64,
    // nodes per axis
    n: usize,
}

impl Lattice {
    const fn index(&self, x: usize, y: usize, z: usize) -> usize {
        x + self.n * (y + self.n * z)
    }

    const fn len(&self) -> usize {
        self.n * self.n * self.n
    }

    // The 8 nodes around `p` with their trilinear weights.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    fn corners(&self, p: DVec3) -> [(usize, f64); 8] {
        let cells = self.n - 1;
        let g = (p - self.origin) / self.spacing;
        let base = g.floor().clamp(DVec3::ZERO, DVec3::splat((cells - 1) as f64));
        let f = (g - base).clamp(DVec3::ZERO, DVec3::ONE);
        let (x, y, z) = (base.x as usize, base.y as usize, base.z as usize);

        let lerp = |bit: usize, t: f64| if bit == 1 { t } else { 1.0 - t };

        let mut out = [(0, 0.0); 8];
        for (k, slot) in out.iter_mut().enumerate() {
            let (dx, dy, dz) = (k & 1, (k >> 1) & 1, (k >> 2) & 1);
            let w = lerp(dx, f.x) * lerp(dy, f.y) * lerp(dz, f.z);
            *slot = (self.index(x + dx, y + dy, z + dz), w);
        }
        out
    }

    fn sample(&self, field: &[f64], p: DVec3) -> f64 {
        self.corners(p).iter().map(|&(i, w)| field[i] * w).sum()
    }

    fn is_boundary(&self, x: usize, y: usize, z: usize) -> bool {
        let last = self.n - 1;
        x == 0 || y == 0 || z == 0 || x == last || y == last || z == last
    }
}

/// Fit an implicit surface to the cloud and extract it as a mesh.
///
/// Normals are estimated from each point's neighborhood and turned away
/// from the centroid. They are splatted onto a `2^depth` lattice, and the
/// function whose Laplacian matches their divergence is solved for with
/// conjugate gradients (zero on the lattice boundary). The surface is the
/// level set through the samples' mean value, extracted with surface nets.
///
/// Returns the mesh (normals computed, colors interpolated from the cloud)
/// and one density per vertex: the splatted sample weight around it. Low
/// densities flag surface the solver extrapolated.
///
/// # Errors
///   `InvalidParameter` for a zero depth or invalid neighborhood
///   parameters, `InsufficientNeighbors` from normal estimation,
///   `EmptyIsosurface` when the level set does not cross the lattice.
pub fn poisson(
    cloud: &ColoredCloud,
    params: &PoissonParams,
) -> Result<(Mesh, ScalarField), ReconstructionFailure> {
    if params.depth == 0 {
        return Err(ReconstructionFailure::InvalidParameter(
            "depth must be at least 1".to_string(),
        ));
    }
    let depth = if params.depth > MAX_DEPTH {
        warn!(
            "poisson: depth {} exceeds the dense grid limit, using {MAX_DEPTH}",
            params.depth
        );
        MAX_DEPTH
    } else {
        params.depth
    };

    let points = &cloud.points;
    let normals = orient_outward(points, estimate_normals(points, params.radius, params.max_nn)?);

    let lower = points.iter().copied().reduce(DVec3::min).unwrap_or_default();
    let upper = points.iter().copied().reduce(DVec3::max).unwrap_or_default();
    let size = (upper - lower).max_element() * SCALE;
    if !(size.is_finite() && size > 0.0) {
        return Err(ReconstructionFailure::EmptyIsosurface { depth });
    }

    let cells = 1_usize << depth;
    #[allow(clippy::cast_precision_loss)]
    let lattice = Lattice {
        origin: (lower + upper) * 0.5 - DVec3::splat(size * 0.5),
        spacing: size / cells as f64,
        n: cells + 1,
    };
    debug!("poisson: {} nodes per axis, spacing {}", lattice.n, lattice.spacing);

    // Splat normals, sample weights and colors.
    let mut field = vec![DVec3::ZERO; lattice.len()];
    let mut weight = vec![0.0_f64; lattice.len()];
    let mut color = vec![[0.0_f64; 3]; lattice.len()];
    for (k, (p, n)) in points.iter().zip(&normals).enumerate() {
        for (i, w) in lattice.corners(*p) {
            field[i] += *n * w;
            weight[i] += w;
            if cloud.has_colors() {
                for (acc, c) in color[i].iter_mut().zip(cloud.colors[k]) {
                    *acc += c * w;
                }
            }
        }
    }

    let chi = solve(&lattice, &divergence(&lattice, &field));

    #[allow(clippy::cast_precision_loss)]
    let iso = points.iter().map(|p| lattice.sample(&chi, *p)).sum::<f64>() / points.len() as f64;

    let (vertices, triangles) = extract(&lattice, &chi, iso);
    if triangles.is_empty() {
        return Err(ReconstructionFailure::EmptyIsosurface { depth });
    }

    let densities: Vec<f64> = vertices.iter().map(|v| lattice.sample(&weight, *v)).collect();

    let colors: Vec<Rgb> = if cloud.has_colors() {
        let fallback = mean_color(&cloud.colors);
        vertices
            .iter()
            .zip(&densities)
            .map(|(v, &d)| {
                if d <= f64::EPSILON {
                    return fallback;
                }
                let mut rgb = [0.0; 3];
                for (i, w) in lattice.corners(*v) {
                    for (acc, c) in rgb.iter_mut().zip(color[i]) {
                        *acc += c * w;
                    }
                }
                rgb.map(|c| (c / d).clamp(0.0, 1.0))
            })
            .collect()
    } else {
        Vec::new()
    };

    let mesh = Mesh::new(vertices, triangles)
        .ok_or(ReconstructionFailure::EmptyIsosurface { depth })?
        .with_colors(colors)
        .with_normals();

    Ok((mesh, ScalarField(densities)))
}

#[allow(clippy::cast_precision_loss)]
fn mean_color(colors: &[Rgb]) -> Rgb {
    let n = colors.len().max(1) as f64;
    let mut sum = [0.0; 3];
    for rgb in colors {
        for (acc, c) in sum.iter_mut().zip(rgb) {
            *acc += c;
        }
    }
    sum.map(|c| c / n)
}

// Central difference divergence; zero on the boundary.
fn divergence(lattice: &Lattice, field: &[DVec3]) -> Vec<f64> {
    let n = lattice.n;
    let mut div = vec![0.0; lattice.len()];
    for z in 1..n - 1 {
        for y in 1..n - 1 {
            for x in 1..n - 1 {
                let dx = field[lattice.index(x + 1, y, z)].x - field[lattice.index(x - 1, y, z)].x;
                let dy = field[lattice.index(x, y + 1, z)].y - field[lattice.index(x, y - 1, z)].y;
                let dz = field[lattice.index(x, y, z + 1)].z - field[lattice.index(x, y, z - 1)].z;
                div[lattice.index(x, y, z)] = (dx + dy + dz) / (2.0 * lattice.spacing);
            }
        }
    }
    div
}

// out = (6 u - sum of the six neighbours) on interior nodes, the negated
// 7 point Laplacian scaled by spacing^2. Symmetric positive definite with
// the boundary held at zero.
fn apply(lattice: &Lattice, u: &[f64], out: &mut [f64]) {
    let n = lattice.n;
    for z in 0..n {
        for y in 0..n {
            for x in 0..n {
                let i = lattice.index(x, y, z);
                if lattice.is_boundary(x, y, z) {
                    out[i] = 0.0;
                    continue;
                }
                let neighbours = u[i - 1]
                    + u[i + 1]
                    + u[lattice.index(x, y - 1, z)]
                    + u[lattice.index(x, y + 1, z)]
                    + u[lattice.index(x, y, z - 1)]
                    + u[lattice.index(x, y, z + 1)];
                out[i] = 6.0f64.mul_add(u[i], -neighbours);
            }
        }
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

// Conjugate gradients on laplacian(chi) = div.
fn solve(lattice: &Lattice, div: &[f64]) -> Vec<f64> {
    let h2 = lattice.spacing * lattice.spacing;
    let b: Vec<f64> = div.iter().map(|d| -d * h2).collect();

    let mut x = vec![0.0; b.len()];
    let mut r = b.clone();
    let mut p = r.clone();
    let mut ap = vec![0.0; b.len()];
    let mut rr = dot(&r, &r);
    let target = TOLERANCE * TOLERANCE * rr;

    let mut iterations = 0;
    while iterations < MAX_ITERATIONS && rr > target && rr > 0.0 {
        apply(lattice, &p, &mut ap);
        let pap = dot(&p, &ap);
        if pap <= 0.0 {
            break;
        }
        let step = rr / pap;
        for ((xi, ri), (pi, api)) in x.iter_mut().zip(r.iter_mut()).zip(p.iter().zip(&ap)) {
            *xi = step.mul_add(*pi, *xi);
            *ri = (-step).mul_add(*api, *ri);
        }
        let rr_next = dot(&r, &r);
        let beta = rr_next / rr;
        for (pi, ri) in p.iter_mut().zip(&r) {
            *pi = beta.mul_add(*pi, *ri);
        }
        rr = rr_next;
        iterations += 1;
    }

    debug!("poisson: {iterations} iterations, residual {}", rr.sqrt());
    x
}

// Level set of chi at `iso`, outside positive. Returns world space vertices
// and triangles wound so their normal points outside.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn extract(lattice: &Lattice, chi: &[f64], iso: f64) -> (Vec<DVec3>, Vec<[usize; 3]>) {
    let n = lattice.n;
    let padded = n + 2;
    let padded_u32 = u32::try_from(padded).unwrap_or(u32::MAX);
    let shape = RuntimeShape::<u32, 3>::new([padded_u32; 3]);

    // Pad with "outside" so the surface closes against the lattice walls.
    let mut sdf = vec![1.0_f32; padded * padded * padded];
    for z in 0..n {
        for y in 0..n {
            for x in 0..n {
                let value = (chi[lattice.index(x, y, z)] - iso) as f32;
                let at = [x, y, z].map(|c| u32::try_from(c + 1).unwrap_or(u32::MAX));
                sdf[shape.linearize(at) as usize] = value;
            }
        }
    }

    let mut buffer = SurfaceNetsBuffer::default();
    surface_nets(&sdf, &shape, [0; 3], [padded_u32 - 1; 3], &mut buffer);

    let vertices: Vec<DVec3> = buffer
        .positions
        .iter()
        .map(|p| {
            let grid = DVec3::new(f64::from(p[0]), f64::from(p[1]), f64::from(p[2])) - DVec3::ONE;
            lattice.origin + grid * lattice.spacing
        })
        .collect();
    let gradients: Vec<DVec3> = buffer
        .normals
        .iter()
        .map(|g| DVec3::new(f64::from(g[0]), f64::from(g[1]), f64::from(g[2])))
        .collect();

    let triangles = buffer
        .indices
        .chunks_exact(3)
        .map(|t| {
            let [a, b, c] = [t[0], t[1], t[2]].map(|i| i as usize);
            let normal = face_normal(vertices[a], vertices[b], vertices[c]);
            let outward = gradients[a] + gradients[b] + gradients[c];
            if normal.dot(outward) < 0.0 { [a, c, b] } else { [a, b, c] }
        })
        .collect();

    (vertices, triangles)
}
