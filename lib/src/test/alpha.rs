use std::collections::HashMap;

use glam::DVec3;
use insta::assert_debug_snapshot;

use super::cube;
use super::fibonacci_sphere;
use super::uncolored;
use super::unit_tetrahedron;
use crate::ReconstructionFailure;
use crate::cloud::ColoredCloud;
use crate::mesh::inspect;
use crate::reconstruct::alpha::alpha_shape;

// Every directed edge once and its reverse once: closed and consistently
// wound.
fn assert_closed(triangles: &[[usize; 3]]) {
    let mut directed: HashMap<(usize, usize), usize> = HashMap::new();
    for &[a, b, c] in triangles {
        for edge in [(a, b), (b, c), (c, a)] {
            *directed.entry(edge).or_default() += 1;
        }
    }
    for (&(a, b), &count) in &directed {
        assert_eq!(count, 1, "edge {a}-{b} used {count} times");
        assert_eq!(directed.get(&(b, a)), Some(&1), "edge {a}-{b} has no twin");
    }
}

#[test]
fn tetrahedron() {
    let mesh = alpha_shape(&uncolored(&unit_tetrahedron()), 1.0).unwrap();

    assert_eq!(mesh.vertices(), unit_tetrahedron().as_slice());
    assert_eq!(
        mesh.triangles(),
        &[[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]]
    );
    assert_debug_snapshot!(inspect(&mesh), @r"
    MeshInfo {
        vertex_count: 4,
        triangle_count: 4,
        edge_count: Some(
            6,
        ),
        vertex_normal_count: 4,
        triangle_normal_count: 4,
    }
    ");
}

#[test]
fn alpha_below_the_circumradius_leaves_nothing() {
    // The unit tetrahedron's circumradius is sqrt(3) / 2.
    let err = alpha_shape(&uncolored(&unit_tetrahedron()), 0.8).unwrap_err();
    assert_eq!(err, ReconstructionFailure::DegenerateAlphaShape { alpha: 0.8 });
}

#[test]
fn cube_hull() {
    let mesh = alpha_shape(&uncolored(&cube()), 2.0).unwrap();
    assert_closed(mesh.triangles());
    assert_debug_snapshot!(inspect(&mesh), @r"
    MeshInfo {
        vertex_count: 8,
        triangle_count: 12,
        edge_count: Some(
            18,
        ),
        vertex_normal_count: 8,
        triangle_normal_count: 12,
    }
    ");
}

#[test]
fn lattice_surface_is_closed() {
    // 8 x 8 x 8 unit lattice: every cell is a cube of cospherical corners.
    let mut points = Vec::new();
    for z in 0..8 {
        for y in 0..8 {
            for x in 0..8 {
                points.push(DVec3::new(f64::from(x), f64::from(y), f64::from(z)));
            }
        }
    }

    let mesh = alpha_shape(&uncolored(&points), 1.0).unwrap();
    assert_closed(mesh.triangles());
    // Only the 8^3 - 6^3 surface nodes remain, two triangles per square.
    assert_eq!(mesh.vertices().len(), 296);
    assert_eq!(mesh.triangles().len(), 6 * 7 * 7 * 2);
    for v in mesh.vertices() {
        assert!(
            v.min_element() == 0.0 || v.max_element() == 7.0,
            "interior vertex {v} on the surface"
        );
    }
}

#[test]
fn sphere_hull_is_closed_and_outward() {
    // The center turns every tetrahedron into a well shaped cone over a
    // hull triangle, then falls inside the shape.
    let mut points = fibonacci_sphere(200, 1.0);
    points.push(DVec3::ZERO);
    let mesh = alpha_shape(&uncolored(&points), 2.0).unwrap();

    assert_eq!(mesh.vertices().len(), 200);
    assert_eq!(mesh.triangles().len(), 2 * 200 - 4);
    assert_closed(mesh.triangles());

    for (t, n) in mesh.triangles().iter().zip(mesh.triangle_normals().unwrap()) {
        let center = t.iter().map(|&i| mesh.vertices()[i]).sum::<DVec3>() / 3.0;
        assert!(n.dot(center) > 0.0, "triangle {t:?} faces inwards");
    }
}

#[test]
fn small_alpha_opens_gaps() {
    // Two tetrahedra far apart: a small alpha keeps them separate.
    let mut points = unit_tetrahedron();
    points.extend(unit_tetrahedron().iter().map(|p| *p + DVec3::new(10.0, 0.0, 0.0)));

    let mesh = alpha_shape(&uncolored(&points), 1.0).unwrap();
    assert_eq!(mesh.vertices().len(), 8);
    assert_eq!(mesh.triangles().len(), 8);
    assert_closed(mesh.triangles());
}

#[test]
fn duplicates_and_stray_points_are_dropped() {
    let mut points = unit_tetrahedron();
    points.push(DVec3::new(1.0, 0.0, 0.0));
    points.push(DVec3::new(50.0, 50.0, 50.0));

    let mesh = alpha_shape(&uncolored(&points), 1.0).unwrap();
    assert_eq!(mesh.vertices(), unit_tetrahedron().as_slice());
}

#[test]
fn colors_follow_their_vertices() {
    let mut points = vec![DVec3::new(50.0, 50.0, 50.0)];
    points.extend(unit_tetrahedron());
    let colors: Vec<[f64; 3]> = (0..5).map(|i| [f64::from(i) / 4.0, 0.0, 0.0]).collect();

    let mesh = alpha_shape(&ColoredCloud { points, colors }, 1.0).unwrap();
    assert_eq!(
        mesh.vertex_colors().unwrap(),
        &[[0.25, 0.0, 0.0], [0.5, 0.0, 0.0], [0.75, 0.0, 0.0], [1.0, 0.0, 0.0]]
    );
}

#[test]
fn too_few_points() {
    let points = vec![DVec3::ZERO, DVec3::X, DVec3::Y, DVec3::X];
    assert_eq!(
        alpha_shape(&uncolored(&points), 1.0).unwrap_err(),
        ReconstructionFailure::TooFewPoints {
            required: 4,
            actual: 3
        }
    );
}

#[test]
fn coplanar_points_have_no_volume() {
    let points = vec![DVec3::ZERO, DVec3::X, DVec3::Y, DVec3::new(1.0, 1.0, 0.0)];
    assert!(matches!(
        alpha_shape(&uncolored(&points), 5.0),
        Err(ReconstructionFailure::DegenerateAlphaShape { .. })
    ));
}

#[test]
fn alpha_must_be_positive() {
    assert!(matches!(
        alpha_shape(&uncolored(&unit_tetrahedron()), 0.0),
        Err(ReconstructionFailure::InvalidParameter(_))
    ));
}
