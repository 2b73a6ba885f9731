mod alpha;
mod io;
mod poisson;
mod threshold;

use std::fmt::Write as _;
use std::path::Path;
use std::path::PathBuf;

use glam::DVec3;

use crate::cloud::ColoredCloud;
use crate::cloud::PointCloud;
use crate::cloud::ScanPoint;

/// Corners of the unit tetrahedron at the origin.
pub(crate) fn unit_tetrahedron() -> Vec<DVec3> {
    vec![
        DVec3::new(0.0, 0.0, 0.0),
        DVec3::new(1.0, 0.0, 0.0),
        DVec3::new(0.0, 1.0, 0.0),
        DVec3::new(0.0, 0.0, 1.0),
    ]
}

/// Corners of the cube spanning -1..1.
pub(crate) fn cube() -> Vec<DVec3> {
    let mut corners = Vec::new();
    for z in [-1.0, 1.0] {
        for y in [-1.0, 1.0] {
            for x in [-1.0, 1.0] {
                corners.push(DVec3::new(x, y, z));
            }
        }
    }
    corners
}

/// Evenly spread points on a sphere (golden angle spiral). No four of them
/// are coplanar.
pub(crate) fn fibonacci_sphere(n: usize, radius: f64) -> Vec<DVec3> {
    let golden = std::f64::consts::PI * (3.0 - 5.0_f64.sqrt());
    (0..n)
        .map(|i| {
            let z = 1.0 - 2.0 * (i as f64 + 0.5) / n as f64;
            let r = (1.0 - z * z).sqrt();
            let theta = golden * i as f64;
            DVec3::new(r * theta.cos(), r * theta.sin(), z) * radius
        })
        .collect()
}

/// Scan points at `positions`, intensity rising with the index.
pub(crate) fn scan(positions: &[DVec3]) -> PointCloud {
    let points = positions
        .iter()
        .enumerate()
        .map(|(i, p)| ScanPoint {
            pos: *p,
            intensity: i as f64,
            rgb: [128.0, 128.0, 128.0],
        })
        .collect();
    PointCloud::new(points).expect("test clouds are not empty")
}

pub(crate) fn uncolored(positions: &[DVec3]) -> ColoredCloud {
    ColoredCloud::uncolored(positions.to_vec())
}

/// Write a `.pts` file with a metadata line followed by `rows`.
pub(crate) fn write_pts(dir: &Path, name: &str, rows: &[[f64; 7]]) -> PathBuf {
    let mut text = format!("{}\n", rows.len());
    for row in rows {
        let line: Vec<String> = row.iter().map(ToString::to_string).collect();
        writeln!(text, "{}", line.join(" ")).expect("write to string");
    }
    let path = dir.join(name);
    std::fs::write(&path, text).expect("write test cloud");
    path
}

/// Rows for `positions` with intensity rising with the index.
pub(crate) fn rows(positions: &[DVec3]) -> Vec<[f64; 7]> {
    scan(positions).points().iter().map(ScanPoint::to_row).collect()
}
