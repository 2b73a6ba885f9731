use glam::DVec3;

/// Number of numeric columns in every row of a `.pts` scan.
pub const FIELDS_PER_POINT: usize = 7;

/// One scanned sample: position, reflectance and color.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScanPoint {
    /// Position in scanner coordinates.
    pub pos: DVec3,
    /// Raw reflectance as recorded by the scanner.
    pub intensity: f64,
    /// Raw color channels, in the scanner's own range (usually 0..=255).
    pub rgb: [f64; 3],
}

impl ScanPoint {
    /// Rebuild the row exactly as it appeared in the file.
    #[must_use]
    pub const fn to_row(&self) -> [f64; FIELDS_PER_POINT] {
        [
            self.pos.x,
            self.pos.y,
            self.pos.z,
            self.intensity,
            self.rgb[0],
            self.rgb[1],
            self.rgb[2],
        ]
    }
}

impl From<[f64; FIELDS_PER_POINT]> for ScanPoint {
    fn from(row: [f64; FIELDS_PER_POINT]) -> Self {
        Self {
            pos: DVec3::new(row[0], row[1], row[2]),
            intensity: row[3],
            rgb: [row[4], row[5], row[6]],
        }
    }
}

/// An ordered, non-empty set of scan points.
///
/// Built by [`crate::io::load_pts`] and never mutated afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct PointCloud {
    points: Vec<ScanPoint>,
}

impl PointCloud {
    /// Returns `None` for an empty set of points.
    #[must_use]
    pub fn new(points: Vec<ScanPoint>) -> Option<Self> {
        if points.is_empty() {
            None
        } else {
            Some(Self { points })
        }
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The points in file order.
    #[must_use]
    pub fn points(&self) -> &[ScanPoint] {
        &self.points
    }

    /// Positions in file order.
    #[must_use]
    pub fn positions(&self) -> Vec<DVec3> {
        self.points.iter().map(|p| p.pos).collect()
    }

    /// Raw intensity column.
    #[must_use]
    pub fn intensity(&self) -> ScalarField {
        self.column(|p| p.intensity)
    }

    /// Height (z) column.
    #[must_use]
    pub fn height(&self) -> ScalarField {
        self.column(|p| p.pos.z)
    }

    /// Any per-point value as a field.
    pub fn column(&self, f: impl Fn(&ScanPoint) -> f64) -> ScalarField {
        ScalarField(self.points.iter().map(f).collect())
    }
}

/// One float per point, in cloud order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScalarField(pub Vec<f64>);

impl ScalarField {
    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the field has no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The values in cloud order.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.0
    }
}

impl From<Vec<f64>> for ScalarField {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

/// Coordinates paired with a display color, channels in `[0, 1]`.
///
/// This is what the reconstruction strategies consume. Colors never
/// influence the geometry; they are carried through to the mesh vertices.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColoredCloud {
    /// Positions.
    pub points: Vec<DVec3>,
    /// One color per position, or empty for an uncolored cloud.
    pub colors: Vec<[f64; 3]>,
}

impl ColoredCloud {
    /// A cloud without colors.
    #[must_use]
    pub const fn uncolored(points: Vec<DVec3>) -> Self {
        Self {
            points,
            colors: Vec::new(),
        }
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when there are no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// True when every point has a color.
    #[must_use]
    pub fn has_colors(&self) -> bool {
        !self.colors.is_empty() && self.colors.len() == self.points.len()
    }
}
