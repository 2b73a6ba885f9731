use glam::DVec3;

use super::fibonacci_sphere;
use super::uncolored;
use crate::ReconstructionFailure;
use crate::cloud::ColoredCloud;
use crate::reconstruct::PoissonParams;
use crate::reconstruct::poisson::poisson;

const PARAMS: PoissonParams = PoissonParams {
    radius: 0.15,
    max_nn: 30,
    depth: 4,
};

#[test]
fn sphere() {
    let points = fibonacci_sphere(600, 0.5);
    let (mesh, densities) = poisson(&uncolored(&points), &PARAMS).unwrap();

    assert!(mesh.triangles().len() > 100);
    assert_eq!(densities.len(), mesh.vertices().len());
    assert!(densities.values().iter().all(|d| *d >= 0.0));
    assert!(mesh.vertex_colors().is_none());
    assert_eq!(
        mesh.vertex_normals().map(<[_]>::len),
        Some(mesh.vertices().len())
    );

    let n = mesh.vertices().len() as f64;
    let mean_radius = mesh.vertices().iter().map(|v| v.length()).sum::<f64>() / n;
    assert!((0.35..0.65).contains(&mean_radius), "mean radius {mean_radius}");

    let outward = mesh
        .triangles()
        .iter()
        .zip(mesh.triangle_normals().unwrap())
        .filter(|(t, normal)| {
            let center = t.iter().map(|&i| mesh.vertices()[i]).sum::<DVec3>();
            normal.dot(center) > 0.0
        })
        .count();
    assert!(
        outward * 10 >= mesh.triangles().len() * 9,
        "{outward} of {} triangles face outwards",
        mesh.triangles().len()
    );
}

#[test]
fn colors_are_interpolated() {
    let points = fibonacci_sphere(600, 0.5);
    let colors = vec![[0.2, 0.4, 0.6]; points.len()];
    let (mesh, _) = poisson(&ColoredCloud { points, colors }, &PARAMS).unwrap();

    for rgb in mesh.vertex_colors().unwrap() {
        for (c, expected) in rgb.iter().zip([0.2, 0.4, 0.6]) {
            assert!((c - expected).abs() < 1e-9, "{rgb:?}");
        }
    }
}

#[test]
fn sparse_cloud_has_no_normals() {
    let points: Vec<DVec3> = (0..10).map(|i| DVec3::new(f64::from(i), 0.0, 0.0)).collect();
    assert!(matches!(
        poisson(&uncolored(&points), &PARAMS),
        Err(ReconstructionFailure::InsufficientNeighbors { found: 1, .. })
    ));
}

#[test]
fn depth_zero_is_rejected() {
    let params = PoissonParams { depth: 0, ..PARAMS };
    assert!(matches!(
        poisson(&uncolored(&fibonacci_sphere(50, 1.0)), &params),
        Err(ReconstructionFailure::InvalidParameter(_))
    ));
}
