use crate::cloud::ColoredCloud;
use crate::cloud::PointCloud;
use crate::cloud::ScalarField;

/// An RGB triple, every channel in `[0, 1]`.
pub type Rgb = [f64; 3];

/// How a normalized scalar is turned into a color.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Palette {
    /// Red grows with the value, blue shrinks, green stays at zero.
    HeightGradient,
    /// Perceptually uniform black, purple, orange, pale yellow.
    #[default]
    Inferno,
    /// Perceptually uniform purple, teal, yellow.
    Viridis,
}

// Eleven evenly spaced samples (t = 0.0, 0.1, .. 1.0) of the reference
// 256 entry tables. Linear interpolation between them stays within a
// fraction of a percent of the full tables.
const INFERNO: [Rgb; 11] = [
    [0.001_462, 0.000_466, 0.013_866],
    [0.087_411, 0.044_556, 0.224_813],
    [0.258_234, 0.038_571, 0.406_485],
    [0.416_331, 0.090_203, 0.432_943],
    [0.578_304, 0.148_039, 0.404_411],
    [0.735_683, 0.215_906, 0.330_245],
    [0.865_006, 0.316_822, 0.226_055],
    [0.954_506, 0.468_744, 0.099_874],
    [0.987_622, 0.645_320, 0.039_886],
    [0.964_394, 0.843_848, 0.273_391],
    [0.988_362, 0.998_364, 0.644_924],
];

const VIRIDIS: [Rgb; 11] = [
    [0.267_004, 0.004_874, 0.329_415],
    [0.282_623, 0.140_926, 0.457_517],
    [0.253_935, 0.265_254, 0.529_983],
    [0.206_756, 0.371_758, 0.553_117],
    [0.163_625, 0.471_133, 0.558_148],
    [0.127_568, 0.566_949, 0.550_556],
    [0.134_692, 0.658_636, 0.517_649],
    [0.266_941, 0.748_751, 0.440_573],
    [0.477_504, 0.821_444, 0.318_195],
    [0.741_388, 0.873_449, 0.149_561],
    [0.993_248, 0.906_157, 0.143_936],
];

impl Palette {
    /// All palettes.
    pub const ALL: [Self; 3] = [Self::HeightGradient, Self::Inferno, Self::Viridis];

    /// Short name, used as the suffix of preview files.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::HeightGradient => "height",
            Self::Inferno => "inferno",
            Self::Viridis => "viridis",
        }
    }

    /// Color of a single value. Values outside `[0, 1]` are clamped and
    /// non-finite values map to the start of the palette.
    #[must_use]
    pub fn color(self, value: f64) -> Rgb {
        let t = if value.is_finite() {
            value.clamp(0.0, 1.0)
        } else {
            0.0
        };
        match self {
            Self::HeightGradient => [t, 0.0, 1.0 - t],
            Self::Inferno => lookup(&INFERNO, t),
            Self::Viridis => lookup(&VIRIDIS, t),
        }
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn lookup(table: &[Rgb], t: f64) -> Rgb {
    let last = table.len() - 1;
    let scaled = t * last as f64;
    let lower = (scaled.floor() as usize).min(last - 1);
    let frac = scaled - lower as f64;
    let a = table[lower];
    let b = table[lower + 1];
    [0, 1, 2].map(|c| frac.mul_add(b[c] - a[c], a[c]).clamp(0.0, 1.0))
}

/// Map a normalized field to one color per value.
#[must_use]
pub fn map(field: &ScalarField, palette: Palette) -> Vec<Rgb> {
    field.values().iter().map(|&v| palette.color(v)).collect()
}

/// Pair the cloud's positions with the colors of a normalized field.
///
/// A field whose length differs from the cloud leaves it uncolored.
#[must_use]
pub fn colorize(cloud: &PointCloud, field: &ScalarField, palette: Palette) -> ColoredCloud {
    let points = cloud.positions();
    if field.len() != points.len() {
        return ColoredCloud::uncolored(points);
    }
    ColoredCloud {
        points,
        colors: map(field, palette),
    }
}
