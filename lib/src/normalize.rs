use log::debug;
use serde::Serialize;

use crate::Error;
use crate::Result;
use crate::cloud::FIELDS_PER_POINT;
use crate::cloud::PointCloud;
use crate::cloud::ScalarField;

/// Number of leading rows echoed back by [`point_cloud_info`].
pub const SAMPLE_ROWS: usize = 5;

/// Range and moments of a scalar field.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FieldSummary {
    /// Smallest value.
    pub min: f64,
    /// Largest value.
    pub max: f64,
    /// Arithmetic mean.
    pub mean: f64,
    /// Population standard deviation.
    pub stddev: f64,
}

/// Rescale a field to `[0, 1]` using its own min and max.
///
/// The minimum maps to exactly `0.0` and the maximum to exactly `1.0`.
///
/// # Errors
///   [`Error::DegenerateField`] when the field is empty, constant, or its
///   range is not finite. A constant field has no meaningful rescaling and
///   is rejected rather than mapped to an arbitrary value.
pub fn normalize(name: &'static str, field: &ScalarField) -> Result<ScalarField> {
    let summary = summary(field).ok_or_else(|| Error::DegenerateField {
        field: name,
        reason: "field is empty".to_string(),
    })?;

    let range = summary.max - summary.min;
    if !range.is_finite() {
        return Err(Error::DegenerateField {
            field: name,
            reason: format!("range {} to {} is not finite", summary.min, summary.max),
        });
    }
    if range == 0.0 {
        return Err(Error::DegenerateField {
            field: name,
            reason: format!("all values equal {}", summary.min),
        });
    }

    debug!("normalize {name}: min {} max {}", summary.min, summary.max);
    Ok(ScalarField(
        field
            .values()
            .iter()
            .map(|v| (v - summary.min) / range)
            .collect(),
    ))
}

/// Min, max, mean and population standard deviation, or `None` when empty.
#[must_use]
pub fn summary(field: &ScalarField) -> Option<FieldSummary> {
    let values = field.values();
    let first = *values.first()?;

    let (min, max, sum) = values
        .iter()
        .fold((first, first, 0.0_f64), |(lo, hi, sum), &v| {
            (lo.min(v), hi.max(v), sum + v)
        });

    #[allow(clippy::cast_precision_loss)]
    let n = values.len() as f64;
    let mean = sum / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    Some(FieldSummary {
        min,
        max,
        mean,
        stddev: variance.sqrt(),
    })
}

/// Diagnostics reported for a loaded scan.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PointCloudInfo {
    /// Number of points.
    pub point_count: usize,
    /// The first few rows, unchanged.
    pub sample_rows: Vec<[f64; FIELDS_PER_POINT]>,
    /// `(min, max)` of x.
    pub x_range: (f64, f64),
    /// `(min, max)` of y.
    pub y_range: (f64, f64),
    /// `(min, max)` of z.
    pub z_range: (f64, f64),
    /// `(min, max)` of the red channel.
    pub r_range: (f64, f64),
    /// `(min, max)` of the green channel.
    pub g_range: (f64, f64),
    /// `(min, max)` of the blue channel.
    pub b_range: (f64, f64),
    /// Full summary of the raw intensity.
    pub intensity: FieldSummary,
}

/// Compute the diagnostics for a cloud.
#[must_use]
pub fn point_cloud_info(cloud: &PointCloud) -> PointCloudInfo {
    // A PointCloud is never empty, so every summary exists.
    let range = |field: ScalarField| {
        summary(&field).map_or((f64::NAN, f64::NAN), |s| (s.min, s.max))
    };

    let intensity = summary(&cloud.intensity()).unwrap_or(FieldSummary {
        min: f64::NAN,
        max: f64::NAN,
        mean: f64::NAN,
        stddev: f64::NAN,
    });

    PointCloudInfo {
        point_count: cloud.len(),
        sample_rows: cloud
            .points()
            .iter()
            .take(SAMPLE_ROWS)
            .map(crate::cloud::ScanPoint::to_row)
            .collect(),
        x_range: range(cloud.column(|p| p.pos.x)),
        y_range: range(cloud.column(|p| p.pos.y)),
        z_range: range(cloud.height()),
        r_range: range(cloud.column(|p| p.rgb[0])),
        g_range: range(cloud.column(|p| p.rgb[1])),
        b_range: range(cloud.column(|p| p.rgb[2])),
        intensity,
    }
}
