use log::debug;

use super::alpha::alpha_shape;
use crate::cloud::ColoredCloud;
use crate::cloud::PointCloud;
use crate::cloud::ScalarField;
use crate::color::Palette;
use crate::error::ReconstructionFailure;
use crate::mesh::Mesh;

/// Palette applied to the points that pass the threshold.
pub const PALETTE: Palette = Palette::Inferno;

/// Parameters of the threshold strategy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThresholdParams {
    /// Points whose normalized value is strictly greater survive.
    pub threshold: f64,
    /// Alpha of the shape built over the survivors.
    pub alpha: f64,
}

impl Default for ThresholdParams {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            alpha: 1.0,
        }
    }
}

/// The points whose normalized value exceeds `threshold`, colored by that
/// value.
///
/// # Errors
///   `InvalidParameter` when the field does not hold one value per point
///   or the threshold is not a number.
pub fn filter(
    cloud: &PointCloud,
    normalized: &ScalarField,
    threshold: f64,
) -> Result<ColoredCloud, ReconstructionFailure> {
    if normalized.len() != cloud.len() {
        return Err(ReconstructionFailure::InvalidParameter(format!(
            "field has {} values for {} points",
            normalized.len(),
            cloud.len()
        )));
    }
    if threshold.is_nan() {
        return Err(ReconstructionFailure::InvalidParameter(
            "threshold is not a number".to_string(),
        ));
    }

    let (points, colors) = cloud
        .points()
        .iter()
        .zip(normalized.values())
        .filter(|(_, v)| **v > threshold)
        .map(|(p, v)| (p.pos, PALETTE.color(*v)))
        .unzip();

    Ok(ColoredCloud { points, colors })
}

/// Alpha shape over the points above the threshold.
///
/// # Errors
///   `EmptyFilteredSet` when nothing passes, otherwise whatever
///   [`filter`] or [`alpha_shape`] report.
pub fn threshold(
    cloud: &PointCloud,
    normalized: &ScalarField,
    params: &ThresholdParams,
) -> Result<Mesh, ReconstructionFailure> {
    let filtered = filter(cloud, normalized, params.threshold)?;
    debug!(
        "threshold {}: {} of {} points kept",
        params.threshold,
        filtered.len(),
        cloud.len()
    );

    if filtered.is_empty() {
        return Err(ReconstructionFailure::EmptyFilteredSet {
            threshold: params.threshold,
        });
    }

    alpha_shape(&filtered, params.alpha)
}
