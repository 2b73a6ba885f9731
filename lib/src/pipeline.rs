//! Request orchestration: one call per request, stages run strictly in
//! order (load, normalize, reconstruct, save) and the first failure aborts
//! the request.
//!
//! The [`Orchestrator`] methods returning [`Result`] are the typed API used
//! by the command line driver. The `*_response` methods wrap them in the
//! status/body contract served over HTTP: every failure becomes a `400`
//! whose message is the error text prefixed with `"Exception: "`.

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use log::info;
use log::warn;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

use crate::Error;
use crate::Result;
use crate::color::Palette;
use crate::color::colorize;
use crate::io;
use crate::mesh::Mesh;
use crate::mesh::MeshInfo;
use crate::mesh::inspect;
use crate::normalize::PointCloudInfo;
use crate::normalize::normalize;
use crate::normalize::point_cloud_info;
use crate::reconstruct::Algorithm;
use crate::reconstruct::AlphaParams;
use crate::reconstruct::PoissonParams;
use crate::reconstruct::Reconstruction;
use crate::reconstruct::StrategyMetadata;
use crate::reconstruct::ThresholdParams;
use crate::reconstruct::Variant;
use crate::reconstruct::reconstruct;

/// Everything the orchestrator knows that does not arrive with a request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Config {
    /// Point clouds described by a batch `GET /point-cloud`.
    pub sources: Vec<PathBuf>,
    /// Parameters of the delaunay strategy.
    pub alpha: AlphaParams,
    /// Parameters of the poisson strategy.
    pub poisson: PoissonParams,
    /// Parameters of the threshold strategy.
    pub threshold: ThresholdParams,
}

impl Config {
    /// The configured parameters for `variant`.
    #[must_use]
    pub const fn algorithm(&self, variant: Variant) -> Algorithm {
        match variant {
            Variant::Delaunay => Algorithm::Delaunay(self.alpha),
            Variant::Poisson => Algorithm::Poisson(self.poisson),
            Variant::Threshold => Algorithm::Threshold(self.threshold),
        }
    }
}

/// One reconstruction to perform.
#[derive(Clone, Debug, PartialEq)]
pub struct ReconstructionRequest {
    /// The `.pts` file to read.
    pub source_path: PathBuf,
    /// Strategy and its parameters.
    pub algorithm: Algorithm,
}

/// What a successful request produced.
#[derive(Clone, Debug, PartialEq)]
pub struct ReconstructionResult {
    /// The reconstructed mesh, with normals.
    pub mesh: Mesh,
    /// Where the mesh was written.
    pub output_path: PathBuf,
    /// Strategy specific extras (Poisson densities).
    pub metadata: StrategyMetadata,
}

/// Run a request from file to file.
///
/// A degenerate intensity field only fails the threshold strategy; the
/// others go on with uncolored vertices.
///
/// # Errors
///   The first failure of any stage, unmodified.
pub fn run(request: &ReconstructionRequest) -> Result<ReconstructionResult> {
    let source = &request.source_path;
    let variant = request.algorithm.variant();
    let cloud = io::load_pts(source)?;
    let intensity = match normalize("intensity", &cloud.intensity()) {
        Ok(field) => Some(field),
        Err(e @ Error::DegenerateField { .. }) if variant != Variant::Threshold => {
            warn!("{variant}: {e}, vertices left uncolored");
            None
        }
        Err(e) => return Err(e),
    };

    let Reconstruction { mesh, metadata } =
        reconstruct(&cloud, intensity.as_ref(), &request.algorithm)?;
    let output_path = io::save(&mesh, source, variant)?;

    Ok(ReconstructionResult {
        mesh,
        output_path,
        metadata,
    })
}

/// Write the cloud as colored vertices, for inspection in any mesh viewer.
///
/// The height gradient colors by normalized `z`, the other palettes by
/// normalized intensity. The file holds no faces.
///
/// # Errors
///   Loader and normalizer failures, [`Error::Write`].
pub fn preview(source: &Path, palette: Palette) -> Result<PathBuf> {
    let cloud = io::load_pts(source)?;
    let field = match palette {
        Palette::HeightGradient => normalize("z", &cloud.height())?,
        Palette::Inferno | Palette::Viridis => normalize("intensity", &cloud.intensity())?,
    };

    let colored = colorize(&cloud, &field, palette);
    let mesh = Mesh {
        vertices: colored.points,
        ..Mesh::default()
    }
    .with_colors(colored.colors);

    let path = io::preview_path(source, palette)?;
    io::save_obj(&path, &mesh)?;
    Ok(path)
}

/// Diagnostics of one file or of every configured source.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PointCloudReport {
    /// A single requested file.
    Single(PointCloudInfo),
    /// The configured sources, keyed by path.
    Batch(BTreeMap<String, PointCloudInfo>),
}

/// A status code and a JSON body, ready for the HTTP shell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Value,
}

impl ApiResponse {
    /// `200 OK`.
    pub const OK: u16 = 200;
    /// `201 Created`.
    pub const CREATED: u16 = 201;
    /// `400 Bad Request`.
    pub const BAD_REQUEST: u16 = 400;

    fn failure(error: &Error) -> Self {
        warn!("request failed: {error}");
        Self {
            status: Self::BAD_REQUEST,
            body: json!({ "message": format!("Exception: {error}") }),
        }
    }

    fn from_result<T: Serialize>(status: u16, result: Result<T>) -> Self {
        match result {
            Ok(body) => Self {
                status,
                body: json!(body),
            },
            Err(e) => Self::failure(&e),
        }
    }
}

/// Drives the pipeline stages for each request. Holds configuration only;
/// nothing survives a request.
#[derive(Clone, Debug, Default)]
pub struct Orchestrator {
    config: Config,
}

impl Orchestrator {
    /// An orchestrator over an injected configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Reconstruct `source_path` with the strategy named by `selector`.
    ///
    /// # Errors
    ///   [`Error::UnrecognizedAlgorithm`] before anything is read or
    ///   written, otherwise whatever [`run`] reports.
    pub fn create_mesh(&self, source_path: &Path, selector: &str) -> Result<ReconstructionResult> {
        let variant: Variant = selector.parse()?;
        let request = ReconstructionRequest {
            source_path: source_path.to_path_buf(),
            algorithm: self.config.algorithm(variant),
        };
        let result = run(&request)?;
        info!(
            "{variant}: {} -> {}",
            source_path.display(),
            result.output_path.display()
        );
        Ok(result)
    }

    /// Diagnostics of `path`, or of every configured source when `None`.
    ///
    /// # Errors
    ///   The first file that fails to load aborts the whole batch.
    pub fn point_cloud_info(&self, path: Option<&Path>) -> Result<PointCloudReport> {
        if let Some(path) = path {
            return Ok(PointCloudReport::Single(point_cloud_info(
                &io::load_pts(path)?,
            )));
        }

        let mut batch = BTreeMap::new();
        for source in &self.config.sources {
            let cloud = io::load_pts(source)?;
            batch.insert(source.display().to_string(), point_cloud_info(&cloud));
        }
        Ok(PointCloudReport::Batch(batch))
    }

    /// Statistics of a mesh file.
    ///
    /// # Errors
    ///   [`io::load_mesh`] failures.
    pub fn mesh_info(&self, path: &Path) -> Result<MeshInfo> {
        Ok(inspect(&io::load_mesh(path)?))
    }

    /// `POST /point-cloud`: `201 {message, output, mesh_info}` or `400`.
    #[must_use]
    pub fn create_mesh_response(&self, source_path: &Path, selector: &str) -> ApiResponse {
        let result = self.create_mesh(source_path, selector).map(|result| {
            json!({
                "message": format!("Mesh created with {selector}"),
                "output": result.output_path.display().to_string(),
                "mesh_info": inspect(&result.mesh),
            })
        });
        ApiResponse::from_result(ApiResponse::CREATED, result)
    }

    /// `GET /point-cloud`: `200` with the diagnostics or `400`.
    #[must_use]
    pub fn point_cloud_info_response(&self, path: Option<&Path>) -> ApiResponse {
        ApiResponse::from_result(ApiResponse::OK, self.point_cloud_info(path))
    }

    /// `GET /3d-mesh`: `200` with the mesh statistics or `400`.
    #[must_use]
    pub fn mesh_info_response(&self, path: &Path) -> ApiResponse {
        ApiResponse::from_result(ApiResponse::OK, self.mesh_info(path))
    }
}
