use glam::DVec3;

use super::fibonacci_sphere;
use super::unit_tetrahedron;
use crate::PointCloud;
use crate::ReconstructionFailure;
use crate::ScalarField;
use crate::cloud::ScanPoint;
use crate::mesh::inspect;
use crate::normalize::normalize;
use crate::reconstruct::ThresholdParams;
use crate::reconstruct::threshold::PALETTE;
use crate::reconstruct::threshold::filter;
use crate::reconstruct::threshold::threshold;

// A bright tetrahedron surrounded by dim points.
fn bright_tetrahedron() -> (PointCloud, ScalarField) {
    let mut points: Vec<ScanPoint> = unit_tetrahedron()
        .into_iter()
        .map(|pos| ScanPoint {
            pos,
            intensity: 900.0,
            rgb: [0.0; 3],
        })
        .collect();
    for (i, pos) in [DVec3::splat(5.0), DVec3::splat(-5.0), DVec3::new(5.0, -5.0, 0.0)]
        .into_iter()
        .enumerate()
    {
        points.push(ScanPoint {
            pos,
            intensity: 100.0 * i as f64,
            rgb: [0.0; 3],
        });
    }
    let cloud = PointCloud::new(points).unwrap();
    let normalized = normalize("intensity", &cloud.intensity()).unwrap();
    (cloud, normalized)
}

#[test]
fn keeps_points_above_the_threshold() {
    let (cloud, normalized) = bright_tetrahedron();
    let filtered = filter(&cloud, &normalized, 0.5).unwrap();

    assert_eq!(filtered.points, unit_tetrahedron());
    assert!(filtered.colors.iter().all(|c| *c == PALETTE.color(1.0)));
}

#[test]
fn threshold_is_strict() {
    let (cloud, normalized) = bright_tetrahedron();
    // 200 of 900 is the largest dim value.
    let at = 200.0 / 900.0;
    assert_eq!(filter(&cloud, &normalized, at).unwrap().len(), 4);
    assert_eq!(filter(&cloud, &normalized, at - 1e-9).unwrap().len(), 5);
}

#[test]
fn meshes_the_survivors() {
    let (cloud, normalized) = bright_tetrahedron();
    let mesh = threshold(&cloud, &normalized, &ThresholdParams::default()).unwrap();

    assert_eq!(mesh.vertices(), unit_tetrahedron().as_slice());
    assert_eq!(mesh.triangles().len(), 4);
    assert_eq!(mesh.vertex_colors().map(<[_]>::len), Some(4));
}

#[test]
fn nothing_above_the_maximum() {
    let (cloud, normalized) = bright_tetrahedron();
    let params = ThresholdParams {
        threshold: 1.0,
        ..ThresholdParams::default()
    };
    assert_eq!(
        threshold(&cloud, &normalized, &params).unwrap_err(),
        ReconstructionFailure::EmptyFilteredSet { threshold: 1.0 }
    );
}

#[test]
fn field_must_match_the_cloud() {
    let (cloud, _) = bright_tetrahedron();
    assert!(matches!(
        filter(&cloud, &ScalarField::from(vec![1.0]), 0.5),
        Err(ReconstructionFailure::InvalidParameter(_))
    ));
}

// 200 bright points on the unit sphere and its bright center, inside 50
// dim points on a wider sphere.
fn bright_sphere() -> (PointCloud, ScalarField) {
    let mut points: Vec<ScanPoint> = fibonacci_sphere(200, 1.0)
        .into_iter()
        .enumerate()
        .map(|(i, pos)| ScanPoint {
            pos,
            intensity: 600.0 + i as f64,
            rgb: [0.0; 3],
        })
        .collect();
    points.push(ScanPoint {
        pos: DVec3::ZERO,
        intensity: 1000.0,
        rgb: [0.0; 3],
    });
    points.extend(
        fibonacci_sphere(50, 3.0)
            .into_iter()
            .enumerate()
            .map(|(i, pos)| ScanPoint {
                pos,
                intensity: i as f64,
                rgb: [0.0; 3],
            }),
    );
    let cloud = PointCloud::new(points).unwrap();
    let normalized = normalize("intensity", &cloud.intensity()).unwrap();
    (cloud, normalized)
}

#[test]
fn sphere_keeps_exactly_the_bright_points() {
    let (cloud, normalized) = bright_sphere();
    let filtered = filter(&cloud, &normalized, 0.5).unwrap();
    assert_eq!(filtered.len(), 201);
    assert!(filtered.points.iter().all(|p| p.length() <= 1.0 + 1e-12));
}

#[test]
fn sphere_survivors_are_meshed_as_their_hull() {
    let (cloud, normalized) = bright_sphere();
    let params = ThresholdParams {
        threshold: 0.5,
        alpha: 2.0,
    };
    let mesh = threshold(&cloud, &normalized, &params).unwrap();

    // The center is enclosed and drops out.
    let info = inspect(&mesh);
    assert_eq!(info.vertex_count, 200);
    assert_eq!(info.triangle_count, 396);
    assert_eq!(info.edge_count, Some(594));
    assert!(mesh.vertices().iter().all(|v| (v.length() - 1.0).abs() < 1e-9));

    let expected: Vec<[f64; 3]> = normalized.values()[..200]
        .iter()
        .map(|v| PALETTE.color(*v))
        .collect();
    assert_eq!(mesh.vertex_colors().unwrap(), expected.as_slice());
}
