use std::fmt;

/// NCHW single-precision array flowing between transforms.
pub type Tensor = ndarray::Array4<f32>;

/// Exact `(batch, channels, height, width)` extent of a [`Tensor`].
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct Shape4 {
    /// Batch size.
    pub batch: usize,
    /// Channel count.
    pub channels: usize,
    /// Spatial height (rows).
    pub height: usize,
    /// Spatial width (columns).
    pub width: usize,
}

impl Shape4 {
    /// Create a shape from its four extents.
    pub const fn new(batch: usize, channels: usize, height: usize, width: usize) -> Self {
        Self {
            batch,
            channels,
            height,
            width,
        }
    }

    /// Shape of an existing tensor.
    pub fn of(t: &Tensor) -> Self {
        let (batch, channels, height, width) = t.dim();
        Self::new(batch, channels, height, width)
    }

    /// Extents as an `ndarray` dimension tuple.
    pub const fn dim(self) -> (usize, usize, usize, usize) {
        (self.batch, self.channels, self.height, self.width)
    }

    /// Total element count.
    pub const fn len(self) -> usize {
        self.batch * self.channels * self.height * self.width
    }

    /// `true` when any extent is zero.
    pub const fn is_empty(self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Shape4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.batch, self.channels, self.height, self.width
        )
    }
}

impl From<(usize, usize, usize, usize)> for Shape4 {
    fn from((b, c, h, w): (usize, usize, usize, usize)) -> Self {
        Self::new(b, c, h, w)
    }
}
