use std::path::PathBuf;

use thiserror::Error;

use crate::reconstruct::Variant;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Every way a request can fail, from loading a file to writing the mesh.
///
/// Each stage returns its failure unmodified; only the orchestrator turns
/// an `Error` into a user facing message.
#[derive(Debug, Error)]
pub enum Error {
    /// The file extension is not the one expected for this operation.
    #[error("Unsupported file format: {path} (expected .{expected})")]
    UnsupportedFormat {
        /// Offending path.
        path: PathBuf,
        /// Extension that would have been accepted, without the dot.
        expected: &'static str,
    },

    /// The file was read but its content is not usable.
    #[error("Malformed data in {path}: {reason}")]
    MalformedData {
        /// File being parsed.
        path: PathBuf,
        /// What was wrong, including the line number when known.
        reason: String,
    },

    /// Normalization over a field whose values are all equal (or absent).
    #[error("Degenerate field '{field}': {reason}")]
    DegenerateField {
        /// Name of the scalar field.
        field: &'static str,
        /// Why the field cannot be normalized.
        reason: String,
    },

    /// A reconstruction strategy could not produce a mesh.
    #[error("{variant} reconstruction failed: {reason}")]
    Reconstruction {
        /// Strategy that failed.
        variant: Variant,
        /// Geometric reason for the failure.
        reason: ReconstructionFailure,
    },

    /// Persisting the mesh failed.
    #[error("Could not write mesh to {path}: {source}")]
    Write {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The algorithm selector does not name a known strategy.
    #[error("Unrecognized algorithm '{0}' (expected delaunay, poisson or threshold)")]
    UnrecognizedAlgorithm(String),

    /// Reading an input file failed.
    #[error("Could not read {path}: {source}")]
    Io {
        /// Source path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Why a reconstruction strategy gave up.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ReconstructionFailure {
    /// The alpha filter rejected every tetrahedron, or no boundary face survived.
    #[error("alpha shape is degenerate (alpha = {alpha}): no triangles")]
    DegenerateAlphaShape {
        /// Alpha that was used.
        alpha: f64,
    },

    /// A tetrahedralization needs at least four distinct, non coplanar points.
    #[error("need at least {required} distinct points, got {actual}")]
    TooFewPoints {
        /// Minimum number of points.
        required: usize,
        /// Points supplied after removing duplicates.
        actual: usize,
    },

    /// Normal estimation found a neighborhood too sparse to fit a plane.
    #[error(
        "insufficient neighbors for point {point}: found {found}, need {required} (radius {radius}, max_nn {max_nn})"
    )]
    InsufficientNeighbors {
        /// Index of the point in the cloud.
        point: usize,
        /// Neighbors found, the point itself included.
        found: usize,
        /// Minimum neighborhood size.
        required: usize,
        /// Search radius.
        radius: f64,
        /// Neighborhood cap.
        max_nn: usize,
    },

    /// No point passed the intensity threshold.
    #[error("no points above threshold {threshold}")]
    EmptyFilteredSet {
        /// Threshold applied to the normalized field.
        threshold: f64,
    },

    /// The implicit function never crossed the iso-value inside the grid.
    #[error("implicit surface is empty at depth {depth}")]
    EmptyIsosurface {
        /// Grid depth used by the solver.
        depth: u32,
    },

    /// The strategy finished without a single vertex or triangle.
    #[error("reconstruction produced an empty mesh")]
    EmptyMesh,

    /// A strategy parameter is out of range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl Error {
    pub(crate) const fn reconstruction(variant: Variant, reason: ReconstructionFailure) -> Self {
        Self::Reconstruction { variant, reason }
    }
}
