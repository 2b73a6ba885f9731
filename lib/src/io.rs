use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::ErrorKind;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use glam::DVec3;
use log::info;

use crate::Error;
use crate::Result;
use crate::cloud::FIELDS_PER_POINT;
use crate::cloud::PointCloud;
use crate::cloud::ScanPoint;
use crate::color::Palette;
use crate::mesh::Mesh;
use crate::reconstruct::Variant;

/// Extension of point cloud scans.
pub const POINT_CLOUD_EXTENSION: &str = "pts";

/// Extension of mesh files.
pub const MESH_EXTENSION: &str = "obj";

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().is_some_and(|e| e == extension)
}

/// True for paths ending in `.pts`.
#[must_use]
pub fn is_point_cloud(path: &Path) -> bool {
    has_extension(path, POINT_CLOUD_EXTENSION)
}

/// True for paths ending in `.obj`.
#[must_use]
pub fn is_mesh(path: &Path) -> bool {
    has_extension(path, MESH_EXTENSION)
}

fn open(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::new(file))
}

// Undecodable text is bad content, not a failed read.
fn read_error(path: &Path, line_number: usize, source: std::io::Error) -> Error {
    if source.kind() == ErrorKind::InvalidData {
        Error::MalformedData {
            path: path.to_path_buf(),
            reason: format!("line {line_number}: not valid UTF-8"),
        }
    } else {
        Error::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Return the point cloud stored in a `.pts` file.
///
/// The first line is metadata and is always skipped. Every following
/// non-blank line must hold exactly seven numbers:
/// `x y z intensity r g b`. Text after a `#` is ignored.
///
/// # Errors
///   [`Error::UnsupportedFormat`] for any other extension (the file is not
///   opened), [`Error::Io`] when it cannot be read, and
///   [`Error::MalformedData`] for a row of the wrong width, a value that is
///   not a finite number, or a file with no data rows.
pub fn load_pts(path: &Path) -> Result<PointCloud> {
    if !is_point_cloud(path) {
        return Err(Error::UnsupportedFormat {
            path: path.to_path_buf(),
            expected: POINT_CLOUD_EXTENSION,
        });
    }

    let malformed = |reason: String| Error::MalformedData {
        path: path.to_path_buf(),
        reason,
    };

    let reader = open(path)?;
    let mut points = Vec::new();
    for (number, line) in reader.lines().enumerate().skip(1) {
        let line = line.map_err(|source| read_error(path, number + 1, source))?;
        let data = line.split('#').next().unwrap_or_default();
        let parts: Vec<&str> = data.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }

        let line_number = number + 1;
        if parts.len() != FIELDS_PER_POINT {
            return Err(malformed(format!(
                "line {line_number}: expected {FIELDS_PER_POINT} fields, found {}",
                parts.len()
            )));
        }

        let mut row = [0.0_f64; FIELDS_PER_POINT];
        for (value, part) in row.iter_mut().zip(&parts) {
            *value = part
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| {
                    malformed(format!("line {line_number}: '{part}' is not a finite number"))
                })?;
        }
        points.push(ScanPoint::from(row));
    }

    let cloud = PointCloud::new(points)
        .ok_or_else(|| malformed("no data rows after the metadata line".to_string()))?;
    info!("load_pts - {} points from {}", cloud.len(), path.display());
    Ok(cloud)
}

/// Where the mesh reconstructed from `source` with `variant` is written:
/// `scan.pts` becomes `scan_<variant>.obj` in the same directory.
///
/// # Errors
///   [`Error::UnsupportedFormat`] when `source` is not a `.pts` path.
pub fn output_path(source: &Path, variant: Variant) -> Result<PathBuf> {
    sibling(source, variant.name())
}

/// Where the colored preview of `source` is written:
/// `scan.pts` becomes `scan_preview_<palette>.obj`.
///
/// # Errors
///   [`Error::UnsupportedFormat`] when `source` is not a `.pts` path.
pub fn preview_path(source: &Path, palette: Palette) -> Result<PathBuf> {
    sibling(source, &format!("preview_{}", palette.name()))
}

fn sibling(source: &Path, suffix: &str) -> Result<PathBuf> {
    let stem = source
        .file_stem()
        .filter(|_| is_point_cloud(source))
        .ok_or_else(|| Error::UnsupportedFormat {
            path: source.to_path_buf(),
            expected: POINT_CLOUD_EXTENSION,
        })?;

    let mut name = stem.to_os_string();
    name.push(format!("_{suffix}.{MESH_EXTENSION}"));
    Ok(source.with_file_name(name))
}

/// Write `mesh` next to `source` and return the path written.
///
/// Running twice overwrites the previous file.
///
/// # Errors
///   [`Error::UnsupportedFormat`] for a source that is not `.pts`,
///   [`Error::Write`] when the file cannot be written.
pub fn save(mesh: &Mesh, source: &Path, variant: Variant) -> Result<PathBuf> {
    let path = output_path(source, variant)?;
    save_obj(&path, mesh)?;
    Ok(path)
}

/// Write a mesh as Wavefront OBJ text.
///
/// Vertices carry their color when the mesh has one (`v x y z r g b`).
/// When vertex normals exist they are written as `vn` lines and referenced
/// from the faces.
///
/// # Errors
///   [`Error::Write`] when the file cannot be created or written to.
pub fn save_obj(path: &Path, mesh: &Mesh) -> Result<()> {
    write_obj(path, mesh).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!("save_obj - wrote {}", path.display());
    Ok(())
}

fn write_obj(path: &Path, mesh: &Mesh) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_obj_to(&mut writer, mesh)?;
    writer.flush()
}

/// Serialize a mesh as OBJ into any writer.
///
/// # Errors
///   Whatever the writer reports.
pub fn write_obj_to(writer: &mut impl Write, mesh: &Mesh) -> std::io::Result<()> {
    writeln!(writer, "# pts_mesh")?;
    writeln!(writer, "# number of vertices: {}", mesh.vertices().len())?;
    writeln!(writer, "# number of triangles: {}", mesh.triangles().len())?;

    let colors = mesh.vertex_colors();
    for (i, v) in mesh.vertices().iter().enumerate() {
        match colors {
            Some(colors) => {
                let [r, g, b] = colors[i];
                writeln!(writer, "v {} {} {} {r} {g} {b}", v.x, v.y, v.z)?;
            }
            None => writeln!(writer, "v {} {} {}", v.x, v.y, v.z)?,
        }
    }

    let normals = mesh.vertex_normals();
    if let Some(normals) = normals {
        for n in normals {
            writeln!(writer, "vn {} {} {}", n.x, n.y, n.z)?;
        }
    }

    for t in mesh.triangles() {
        let [a, b, c] = t.map(|i| i + 1);
        if normals.is_some() {
            writeln!(writer, "f {a}//{a} {b}//{b} {c}//{c}")?;
        } else {
            writeln!(writer, "f {a} {b} {c}")?;
        }
    }

    Ok(())
}

/// Return the mesh stored in an `.obj` file.
///
/// Reads `v` (optionally followed by r g b), `vn` and `f` records. Faces
/// may use any of the `i`, `i/t`, `i//n`, `i/t/n` forms and negative
/// (relative) indices; polygons are split into a triangle fan. Other
/// records are ignored.
///
/// # Errors
///   [`Error::UnsupportedFormat`] for any other extension (the file is not
///   opened), [`Error::Io`] when it cannot be read, and
///   [`Error::MalformedData`] for unparsable records, out of range
///   indices, or a file without vertices.
pub fn load_mesh(path: &Path) -> Result<Mesh> {
    if !is_mesh(path) {
        return Err(Error::UnsupportedFormat {
            path: path.to_path_buf(),
            expected: MESH_EXTENSION,
        });
    }

    let malformed = |line_number: usize, reason: &str| Error::MalformedData {
        path: path.to_path_buf(),
        reason: format!("line {line_number}: {reason}"),
    };

    let mut vertices: Vec<DVec3> = Vec::new();
    let mut colors: Vec<[f64; 3]> = Vec::new();
    let mut normals: Vec<DVec3> = Vec::new();
    let mut triangles: Vec<[usize; 3]> = Vec::new();

    for (number, line) in open(path)?.lines().enumerate() {
        let line = line.map_err(|source| read_error(path, number + 1, source))?;
        let line_number = number + 1;
        let mut parts = line.split_whitespace();
        let Some(tag) = parts.next() else {
            continue;
        };

        match tag {
            "v" => {
                let values = parse_floats(parts)
                    .ok_or_else(|| malformed(line_number, "vertex is not numeric"))?;
                if values.len() < 3 {
                    return Err(malformed(line_number, "vertex needs three coordinates"));
                }
                vertices.push(DVec3::new(values[0], values[1], values[2]));
                if values.len() >= 6 {
                    colors.push([values[3], values[4], values[5]]);
                }
            }
            "vn" => {
                let values = parse_floats(parts)
                    .ok_or_else(|| malformed(line_number, "normal is not numeric"))?;
                if values.len() < 3 {
                    return Err(malformed(line_number, "normal needs three components"));
                }
                normals.push(DVec3::new(values[0], values[1], values[2]));
            }
            "f" => {
                let corners = parts
                    .map(|corner| resolve_index(corner, vertices.len()))
                    .collect::<Option<Vec<usize>>>()
                    .ok_or_else(|| malformed(line_number, "face references a missing vertex"))?;
                if corners.len() < 3 {
                    return Err(malformed(line_number, "face needs three vertices"));
                }
                for k in 1..corners.len() - 1 {
                    triangles.push([corners[0], corners[k], corners[k + 1]]);
                }
            }
            _ => {}
        }
    }

    if vertices.is_empty() {
        return Err(Error::MalformedData {
            path: path.to_path_buf(),
            reason: "mesh is empty".to_string(),
        });
    }

    let mesh = Mesh::new(vertices, triangles).ok_or_else(|| Error::MalformedData {
        path: path.to_path_buf(),
        reason: "face references a missing vertex".to_string(),
    })?;
    info!(
        "load_mesh - {} vertices, {} triangles from {}",
        mesh.vertices().len(),
        mesh.triangles().len(),
        path.display()
    );
    Ok(mesh.with_colors(colors).with_vertex_normals(normals))
}

fn parse_floats<'a>(parts: impl Iterator<Item = &'a str>) -> Option<Vec<f64>> {
    parts.map(|p| p.parse::<f64>().ok()).collect()
}

// OBJ indices are 1-based; negative ones count back from the last vertex
// read so far.
fn resolve_index(corner: &str, vertex_count: usize) -> Option<usize> {
    let index: i64 = corner.split('/').next()?.parse().ok()?;
    let count = i64::try_from(vertex_count).ok()?;
    let resolved = match index {
        0 => return None,
        i if i > 0 => i - 1,
        i => count + i,
    };
    usize::try_from(resolved).ok()
}
