use std::path::Path;

use insta::assert_snapshot;
use tempfile::tempdir;

use super::rows;
use super::unit_tetrahedron;
use super::write_pts;
use crate::Error;
use crate::Mesh;
use crate::Variant;
use crate::cloud::ColoredCloud;
use crate::io::is_mesh;
use crate::io::is_point_cloud;
use crate::io::load_mesh;
use crate::io::load_pts;
use crate::io::output_path;
use crate::io::save;
use crate::io::write_obj_to;
use crate::mesh::inspect;
use crate::reconstruct::alpha::alpha_shape;

#[test]
fn extensions() {
    assert!(is_point_cloud(Path::new("scan.pts")));
    assert!(!is_point_cloud(Path::new("scan.xyz")));
    assert!(!is_point_cloud(Path::new("file_without_extension")));
    assert!(is_mesh(Path::new("dir/scan_poisson.obj")));
    assert!(!is_mesh(Path::new("scan.ply")));
}

#[test]
fn load_skips_the_metadata_line() {
    let dir = tempdir().unwrap();
    let rows = rows(&unit_tetrahedron());
    let path = write_pts(dir.path(), "tetra.pts", &rows);

    let cloud = load_pts(&path).unwrap();
    assert_eq!(cloud.len(), 4);
    assert_eq!(cloud.points()[3].to_row(), rows[3]);
}

#[test]
fn load_ignores_blank_lines_and_comments() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sparse.pts");
    std::fs::write(
        &path,
        "2\n\n1 2 3 -100 10 20 30\n   \n4 5 6 250 40 50 60 # last row\n",
    )
    .unwrap();

    let cloud = load_pts(&path).unwrap();
    assert_eq!(cloud.len(), 2);
    assert_eq!(
        cloud.points()[1].to_row(),
        [4.0, 5.0, 6.0, 250.0, 40.0, 50.0, 60.0]
    );
}

#[test]
fn load_rejects_the_wrong_extension_without_reading() {
    let err = load_pts(Path::new("does/not/exist.xyz")).unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat { expected: "pts", .. }));
}

#[test]
fn load_reports_a_missing_file() {
    let dir = tempdir().unwrap();
    let err = load_pts(&dir.path().join("missing.pts")).unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
}

#[test]
fn load_rejects_short_rows() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("short.pts");
    std::fs::write(&path, "2\n1 2 3 4 5 6 7\n1 2 3 4 5 6\n").unwrap();

    let err = load_pts(&path).unwrap_err();
    let Error::MalformedData { reason, .. } = err else {
        panic!("expected MalformedData, got {err:?}");
    };
    assert_eq!(reason, "line 3: expected 7 fields, found 6");
}

#[test]
fn load_rejects_text_in_a_numeric_column() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("text.pts");
    std::fs::write(&path, "1\n1 2 three 4 5 6 7\n").unwrap();

    let err = load_pts(&path).unwrap_err();
    assert!(err.to_string().contains("'three' is not a finite number"), "{err}");
}

#[test]
fn load_rejects_bytes_that_are_not_text() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("binary.pts");
    let mut bytes = b"1\n1 2 3 4 5 6 7\n".to_vec();
    bytes.extend([0xff, 0xfe, b' ', b'1', b'\n']);
    std::fs::write(&path, bytes).unwrap();

    let err = load_pts(&path).unwrap_err();
    let Error::MalformedData { reason, .. } = err else {
        panic!("expected MalformedData, got {err:?}");
    };
    assert_eq!(reason, "line 3: not valid UTF-8");
}

#[test]
fn load_rejects_a_header_only_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.pts");
    std::fs::write(&path, "0\n").unwrap();

    assert!(matches!(
        load_pts(&path).unwrap_err(),
        Error::MalformedData { .. }
    ));
}

#[test]
fn output_path_sits_next_to_the_source() {
    let path = output_path(Path::new("/data/scans/room.pts"), Variant::Poisson).unwrap();
    assert_eq!(path, Path::new("/data/scans/room_poisson.obj"));

    assert!(matches!(
        output_path(Path::new("/data/room.ply"), Variant::Delaunay),
        Err(Error::UnsupportedFormat { .. })
    ));
}

#[test]
fn obj_text() {
    let mesh = Mesh::new(
        unit_tetrahedron(),
        vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
    )
    .unwrap();

    let mut out = Vec::new();
    write_obj_to(&mut out, &mesh).unwrap();
    assert_snapshot!(String::from_utf8(out).unwrap(), @r"
    # pts_mesh
    # number of vertices: 4
    # number of triangles: 4
    v 0 0 0
    v 1 0 0
    v 0 1 0
    v 0 0 1
    f 1 3 2
    f 1 2 4
    f 1 4 3
    f 2 3 4
    ");
}

#[test]
fn saved_mesh_loads_back() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("tetra.pts");
    let cloud = ColoredCloud {
        points: unit_tetrahedron(),
        colors: vec![[0.1, 0.2, 0.3], [0.4, 0.5, 0.6], [0.7, 0.8, 0.9], [1.0, 0.0, 0.5]],
    };
    let mesh = alpha_shape(&cloud, 1.0).unwrap();

    let written = save(&mesh, &source, Variant::Delaunay).unwrap();
    assert_eq!(written, dir.path().join("tetra_delaunay.obj"));

    let loaded = load_mesh(&written).unwrap();
    assert_eq!(loaded.vertices(), mesh.vertices());
    assert_eq!(loaded.triangles(), mesh.triangles());
    assert_eq!(loaded.vertex_colors(), mesh.vertex_colors());
    assert_eq!(loaded.vertex_normals(), mesh.vertex_normals());

    // Triangle normals are not part of the file.
    let info = inspect(&loaded);
    assert_eq!(info.vertex_normal_count, 4);
    assert_eq!(info.triangle_normal_count, 0);
}

#[test]
fn save_overwrites() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("tetra.pts");
    let mesh = Mesh::new(unit_tetrahedron(), vec![[0, 2, 1]]).unwrap();
    save(&mesh, &source, Variant::Threshold).unwrap();

    let bigger = Mesh::new(unit_tetrahedron(), vec![[0, 2, 1], [1, 2, 3]]).unwrap();
    let path = save(&bigger, &source, Variant::Threshold).unwrap();
    assert_eq!(load_mesh(&path).unwrap().triangles().len(), 2);
}

#[test]
fn load_mesh_face_forms() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("quad.obj");
    std::fs::write(
        &path,
        "o quad\n\
         v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\n\
         vt 0 0\n\
         f 1/1 2/1 3/1 4/1\n\
         f -4//1 -2//1 -1//1\n",
    )
    .unwrap();

    let mesh = load_mesh(&path).unwrap();
    assert_eq!(mesh.triangles(), &[[0, 1, 2], [0, 2, 3], [0, 2, 3]]);
    assert!(mesh.vertex_colors().is_none());
    assert!(mesh.vertex_normals().is_none());
}

#[test]
fn load_mesh_rejects_bad_input() {
    let dir = tempdir().unwrap();

    assert!(matches!(
        load_mesh(&dir.path().join("mesh.ply")),
        Err(Error::UnsupportedFormat { expected: "obj", .. })
    ));

    let empty = dir.path().join("empty.obj");
    std::fs::write(&empty, "# nothing here\n").unwrap();
    let err = load_mesh(&empty).unwrap_err();
    assert!(err.to_string().contains("mesh is empty"), "{err}");

    let dangling = dir.path().join("dangling.obj");
    std::fs::write(&dangling, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 7\n").unwrap();
    assert!(matches!(
        load_mesh(&dangling),
        Err(Error::MalformedData { .. })
    ));
}
