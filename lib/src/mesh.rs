use std::collections::HashSet;

use glam::DVec3;
use serde::Serialize;

use crate::color::Rgb;

/// A triangle mesh: vertices, index triples and optional per element data.
///
/// Every triangle index is smaller than the vertex count; the constructor
/// refuses anything else.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    pub(crate) vertices: Vec<DVec3>,
    pub(crate) triangles: Vec<[usize; 3]>,
    pub(crate) vertex_normals: Option<Vec<DVec3>>,
    pub(crate) triangle_normals: Option<Vec<DVec3>>,
    pub(crate) vertex_colors: Option<Vec<Rgb>>,
}

impl Mesh {
    /// Returns `None` if a triangle references a missing vertex.
    #[must_use]
    pub fn new(vertices: Vec<DVec3>, triangles: Vec<[usize; 3]>) -> Option<Self> {
        let n = vertices.len();
        if triangles.iter().flatten().any(|&i| i >= n) {
            return None;
        }
        Some(Self {
            vertices,
            triangles,
            ..Self::default()
        })
    }

    /// Attach one color per vertex. Colors of the wrong length are dropped.
    #[must_use]
    pub fn with_colors(mut self, colors: Vec<Rgb>) -> Self {
        self.vertex_colors = (colors.len() == self.vertices.len()).then_some(colors);
        self
    }

    /// Attach per vertex normals read from a file. Normals of the wrong
    /// length are dropped.
    #[must_use]
    pub(crate) fn with_vertex_normals(mut self, normals: Vec<DVec3>) -> Self {
        self.vertex_normals = (normals.len() == self.vertices.len()).then_some(normals);
        self
    }

    /// Returns the mesh with triangle normals and vertex normals filled in.
    ///
    /// Triangle normals are unit length (zero for degenerate triangles).
    /// A vertex normal is the normalized sum of its triangles' normals.
    /// Applying it twice gives the same mesh.
    #[must_use]
    pub fn with_normals(mut self) -> Self {
        let triangle_normals: Vec<DVec3> = self
            .triangles
            .iter()
            .map(|t| face_normal(self.vertices[t[0]], self.vertices[t[1]], self.vertices[t[2]]))
            .collect();

        let mut vertex_normals = vec![DVec3::ZERO; self.vertices.len()];
        for (t, n) in self.triangles.iter().zip(&triangle_normals) {
            for &i in t {
                vertex_normals[i] += *n;
            }
        }
        for n in &mut vertex_normals {
            *n = n.normalize_or_zero();
        }

        self.triangle_normals = Some(triangle_normals);
        self.vertex_normals = Some(vertex_normals);
        self
    }

    /// Vertex positions.
    #[must_use]
    pub fn vertices(&self) -> &[DVec3] {
        &self.vertices
    }

    /// Triangles as vertex index triples, counter-clockwise seen from outside.
    #[must_use]
    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// Per vertex normals, once computed.
    #[must_use]
    pub fn vertex_normals(&self) -> Option<&[DVec3]> {
        self.vertex_normals.as_deref()
    }

    /// Per triangle normals, once computed.
    #[must_use]
    pub fn triangle_normals(&self) -> Option<&[DVec3]> {
        self.triangle_normals.as_deref()
    }

    /// Per vertex colors, when the source cloud was colored.
    #[must_use]
    pub fn vertex_colors(&self) -> Option<&[Rgb]> {
        self.vertex_colors.as_deref()
    }

    /// A mesh without vertices is the result of a failed reconstruction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// Unit normal of a triangle wound `a`, `b`, `c`.
pub(crate) fn face_normal(a: DVec3, b: DVec3, c: DVec3) -> DVec3 {
    (b - a).cross(c - a).normalize_or_zero()
}

/// Summary counts of a mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct MeshInfo {
    /// Number of vertices.
    pub vertex_count: usize,
    /// Number of triangles.
    pub triangle_count: usize,
    /// Unique undirected edges; `None` when the mesh has no faces to
    /// derive them from.
    pub edge_count: Option<usize>,
    /// Number of vertex normals (zero until computed).
    pub vertex_normal_count: usize,
    /// Number of triangle normals (zero until computed).
    pub triangle_normal_count: usize,
}

/// Count the elements of a mesh.
#[must_use]
pub fn inspect(mesh: &Mesh) -> MeshInfo {
    let edge_count = (!mesh.triangles.is_empty()).then(|| {
        mesh.triangles
            .iter()
            .flat_map(|&[a, b, c]| [(a, b), (b, c), (c, a)])
            .map(|(i, j)| (i.min(j), i.max(j)))
            .collect::<HashSet<_>>()
            .len()
    });

    MeshInfo {
        vertex_count: mesh.vertices.len(),
        triangle_count: mesh.triangles.len(),
        edge_count,
        vertex_normal_count: mesh.vertex_normals.as_ref().map_or(0, Vec::len),
        triangle_normal_count: mesh.triangle_normals.as_ref().map_or(0, Vec::len),
    }
}
