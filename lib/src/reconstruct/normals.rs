use glam::DVec3;
use log::debug;
use nalgebra::Matrix3;
use nalgebra::SymmetricEigen;

use crate::error::ReconstructionFailure;
use crate::grid::Grid;

/// A plane needs three points; the point itself counts.
pub const MIN_NEIGHBORS: usize = 3;

/// Estimate a unit normal for every point by fitting a plane to its
/// neighborhood: the points within `radius`, nearest `max_nn` of them.
///
/// The normal is the eigenvector of the neighborhood covariance with the
/// smallest eigenvalue. Its sign is arbitrary; see [`orient_outward`].
///
/// # Errors
///   `InvalidParameter` for a non-positive radius or `max_nn` below
///   [`MIN_NEIGHBORS`]; `InsufficientNeighbors` for the first point whose
///   neighborhood holds fewer than [`MIN_NEIGHBORS`] points.
pub fn estimate_normals(
    points: &[DVec3],
    radius: f64,
    max_nn: usize,
) -> Result<Vec<DVec3>, ReconstructionFailure> {
    if !(radius.is_finite() && radius > 0.0) {
        return Err(ReconstructionFailure::InvalidParameter(format!(
            "radius must be a positive number, got {radius}"
        )));
    }
    if max_nn < MIN_NEIGHBORS {
        return Err(ReconstructionFailure::InvalidParameter(format!(
            "max_nn must be at least {MIN_NEIGHBORS}, got {max_nn}"
        )));
    }

    let grid = Grid::new(points, radius);

    let normals = points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let neighborhood = grid.neighborhood(*p, max_nn);
            if neighborhood.len() < MIN_NEIGHBORS {
                return Err(ReconstructionFailure::InsufficientNeighbors {
                    point: i,
                    found: neighborhood.len(),
                    required: MIN_NEIGHBORS,
                    radius,
                    max_nn,
                });
            }
            Ok(plane_normal(points, &neighborhood))
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!("estimated {} normals (radius {radius}, max_nn {max_nn})", normals.len());
    Ok(normals)
}

#[allow(clippy::cast_precision_loss)]
fn plane_normal(points: &[DVec3], neighborhood: &[usize]) -> DVec3 {
    let n = neighborhood.len() as f64;
    let centroid = neighborhood.iter().map(|&i| points[i]).sum::<DVec3>() / n;

    let mut covariance = Matrix3::<f64>::zeros();
    for &i in neighborhood {
        let d = points[i] - centroid;
        let v = nalgebra::Vector3::new(d.x, d.y, d.z);
        covariance += v * v.transpose();
    }
    covariance /= n;

    let eigen = SymmetricEigen::new(covariance);
    let smallest = eigen.eigenvalues.imin();
    let column = eigen.eigenvectors.column(smallest);
    let normal = DVec3::new(column[0], column[1], column[2]).normalize_or_zero();

    // Collinear neighborhoods have no unique plane; fall back to +z so the
    // field stays defined.
    if normal == DVec3::ZERO {
        DVec3::Z
    } else {
        normal
    }
}

/// Flip normals that point towards the centroid of the cloud.
///
/// Enough for the closed or mostly convex scans the Poisson solver is fed;
/// concave pockets may end up inverted.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn orient_outward(points: &[DVec3], mut normals: Vec<DVec3>) -> Vec<DVec3> {
    if points.is_empty() {
        return normals;
    }
    let centroid = points.iter().copied().sum::<DVec3>() / points.len() as f64;
    for (p, n) in points.iter().zip(normals.iter_mut()) {
        if n.dot(*p - centroid) < 0.0 {
            *n = -*n;
        }
    }
    normals
}
