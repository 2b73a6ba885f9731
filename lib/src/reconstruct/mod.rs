//! The three interchangeable surface reconstruction strategies.
//!
//! [`reconstruct`] is the single dispatch point: it takes the loaded cloud,
//! its normalized intensity and an [`Algorithm`] (variant plus parameters)
//! and returns a mesh with normals, or a [`crate::Error::Reconstruction`]
//! naming the variant.

/// Alpha shapes carved out of a Delaunay tetrahedralization.
pub mod alpha;
pub(crate) mod delaunay;
/// Normal estimation by local plane fitting.
pub mod normals;
/// Implicit surface fitting on a regular grid.
pub mod poisson;
/// Intensity filtering followed by an alpha shape.
pub mod threshold;

use core::fmt;
use core::str::FromStr;

use log::info;
use serde::Serialize;

use crate::Error;
use crate::Result;
use crate::cloud::ColoredCloud;
use crate::cloud::PointCloud;
use crate::cloud::ScalarField;
use crate::color::Palette;
use crate::color::colorize;
use crate::error::ReconstructionFailure;
use crate::mesh::Mesh;

pub use alpha::AlphaParams;
pub use poisson::PoissonParams;
pub use threshold::ThresholdParams;

/// Name of a reconstruction strategy. Also the suffix of the output file.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Alpha shape over the whole cloud.
    Delaunay,
    /// Poisson surface reconstruction.
    Poisson,
    /// Alpha shape over the points above an intensity threshold.
    Threshold,
}

impl Variant {
    /// All variants, in selector order.
    pub const ALL: [Self; 3] = [Self::Delaunay, Self::Poisson, Self::Threshold];

    /// Selector string and file suffix.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Delaunay => "delaunay",
            Self::Poisson => "poisson",
            Self::Threshold => "threshold",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|v| v.name() == s)
            .ok_or_else(|| Error::UnrecognizedAlgorithm(s.to_string()))
    }
}

/// A strategy together with its parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Algorithm {
    /// See [`alpha::alpha_shape`].
    Delaunay(AlphaParams),
    /// See [`poisson::poisson`].
    Poisson(PoissonParams),
    /// See [`threshold::threshold`].
    Threshold(ThresholdParams),
}

impl Algorithm {
    /// The strategy's name.
    #[must_use]
    pub const fn variant(&self) -> Variant {
        match self {
            Self::Delaunay(_) => Variant::Delaunay,
            Self::Poisson(_) => Variant::Poisson,
            Self::Threshold(_) => Variant::Threshold,
        }
    }
}

/// Data a strategy produces besides the mesh.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum StrategyMetadata {
    /// Delaunay and threshold report nothing extra.
    #[default]
    None,
    /// Poisson reports how well supported each vertex is by input samples.
    /// Low values mark extrapolated surface, candidates for trimming.
    Poisson {
        /// One density per mesh vertex.
        densities: ScalarField,
    },
}

/// A strategy's output.
#[derive(Clone, Debug, PartialEq)]
pub struct Reconstruction {
    /// Non-empty mesh with vertex and triangle normals.
    pub mesh: Mesh,
    /// Strategy specific extras.
    pub metadata: StrategyMetadata,
}

/// Run one strategy.
///
/// `normalized_intensity` holds one value in `[0, 1]` per point. Delaunay
/// and Poisson use it only to color the vertices and leave them uncolored
/// without it; threshold filters on it and cannot run without it.
///
/// # Errors
///   [`Error::Reconstruction`] naming the variant and the geometric reason.
pub fn reconstruct(
    cloud: &PointCloud,
    normalized_intensity: Option<&ScalarField>,
    algorithm: &Algorithm,
) -> Result<Reconstruction> {
    let variant = algorithm.variant();
    info!("{variant}: reconstructing {} points", cloud.len());

    let reconstruction = match algorithm {
        Algorithm::Delaunay(params) => {
            let colored = display_colors(cloud, normalized_intensity);
            let mesh = alpha::alpha_shape(&colored, params.alpha)
                .map_err(|reason| Error::reconstruction(variant, reason))?;
            Reconstruction {
                mesh,
                metadata: StrategyMetadata::None,
            }
        }
        Algorithm::Poisson(params) => {
            let colored = display_colors(cloud, normalized_intensity);
            let (mesh, densities) = poisson::poisson(&colored, params)
                .map_err(|reason| Error::reconstruction(variant, reason))?;
            Reconstruction {
                mesh,
                metadata: StrategyMetadata::Poisson { densities },
            }
        }
        Algorithm::Threshold(params) => {
            let mesh = normalized_intensity
                .ok_or_else(|| {
                    ReconstructionFailure::InvalidParameter(
                        "no normalized intensity to filter on".to_string(),
                    )
                })
                .and_then(|field| threshold::threshold(cloud, field, params))
                .map_err(|reason| Error::reconstruction(variant, reason))?;
            Reconstruction {
                mesh,
                metadata: StrategyMetadata::None,
            }
        }
    };

    check_post_condition(&reconstruction.mesh)
        .map_err(|reason| Error::reconstruction(variant, reason))?;

    info!(
        "{variant}: {} vertices, {} triangles",
        reconstruction.mesh.vertices().len(),
        reconstruction.mesh.triangles().len()
    );
    Ok(reconstruction)
}

fn display_colors(cloud: &PointCloud, normalized_intensity: Option<&ScalarField>) -> ColoredCloud {
    normalized_intensity.map_or_else(
        || ColoredCloud::uncolored(cloud.positions()),
        |field| colorize(cloud, field, Palette::Inferno),
    )
}

// Every strategy must hand back something a caller can save.
fn check_post_condition(mesh: &Mesh) -> core::result::Result<(), ReconstructionFailure> {
    if mesh.vertices().is_empty() || mesh.triangles().is_empty() {
        return Err(ReconstructionFailure::EmptyMesh);
    }
    Ok(())
}
