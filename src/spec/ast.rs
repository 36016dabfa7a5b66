use smallvec::SmallVec;

/// Border handling for padding and padded convolutions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PadMode {
    /// Fill with zeros.
    #[default]
    Zeros,
    /// Repeat the edge value.
    Replicate,
    /// Mirror around the edge value (edge itself not repeated).
    Reflect,
}

/// Spatial doubling algorithm for `up(..)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum UpsampleAlgo {
    /// Nearest-neighbour replication.
    Nearest,
    /// Bilinear interpolation with half-pixel centres.
    #[default]
    Bilinear,
    /// Gaussian-pyramid expand.
    Pyramid,
    /// Channel-to-space rearrangement (pixel shuffle).
    Shuffle,
}

/// Discriminant of an [`OpDescriptor`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// `evenize`
    PadToEven,
    /// `conv`
    Convolve,
    /// `sconv`
    StridedConvolve,
    /// `up`
    Upsample,
    /// `prelu`
    ParametricActivation,
}

/// One parsed token of a block chain, arguments resolved to defaults.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OpDescriptor {
    /// Pad odd height/width by one trailing unit.
    PadToEven {
        /// Fill mode for the added row/column.
        pad: PadMode,
    },
    /// Stride-1 convolution.
    Convolve {
        /// Square kernel size.
        kernel: usize,
        /// Border mode for the implicit padding.
        pad: PadMode,
    },
    /// Stride-2 convolution.
    StridedConvolve {
        /// Square kernel size.
        kernel: usize,
        /// Border mode for the implicit padding.
        pad: PadMode,
    },
    /// Double both spatial extents.
    Upsample {
        /// Resampling algorithm.
        algo: UpsampleAlgo,
    },
    /// Leaky rectifier with one learned slope shared by all channels.
    ParametricActivation {
        /// Initial slope.
        init: f32,
    },
}

impl OpDescriptor {
    /// Kind tag, without arguments.
    pub fn kind(&self) -> OpKind {
        match self {
            Self::PadToEven { .. } => OpKind::PadToEven,
            Self::Convolve { .. } => OpKind::Convolve,
            Self::StridedConvolve { .. } => OpKind::StridedConvolve,
            Self::Upsample { .. } => OpKind::Upsample,
            Self::ParametricActivation { .. } => OpKind::ParametricActivation,
        }
    }

    /// Spatial scale multiplier this op contributes to the block's cumulative stride.
    pub fn stride_factor(&self) -> f64 {
        match self {
            Self::StridedConvolve { .. } => 2.0,
            Self::Upsample { .. } => 0.5,
            _ => 1.0,
        }
    }

    /// `true` when the op advances the channel plan by one entry.
    pub fn consumes_channels(&self) -> bool {
        matches!(self, Self::Convolve { .. } | Self::StridedConvolve { .. })
    }
}

/// Flags following the `+` separators.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BlockFlags {
    /// Add a shortcut path (`skip`).
    pub skip: bool,
    /// Omit convolution biases (`nobias`).
    pub no_bias: bool,
    /// Disable implicit convolution padding (`nopad`).
    pub no_pad: bool,
}

/// A fully parsed block spec.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockSpec {
    /// Main-chain ops in application order; `PadToEven` can only be first.
    pub ops: SmallVec<[OpDescriptor; 8]>,
    /// Block-wide flags.
    pub flags: BlockFlags,
}

impl BlockSpec {
    /// Product of all per-op stride factors.
    pub fn cumulative_stride(&self) -> f64 {
        self.ops.iter().map(OpDescriptor::stride_factor).product()
    }

    /// Count of channel-plan transitions the chain performs.
    pub fn channel_steps(&self) -> usize {
        self.ops.iter().filter(|op| op.consumes_channels()).count()
    }
}
