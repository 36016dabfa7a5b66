use crate::foundation::core::{Shape4, Tensor};
use crate::foundation::error::NetResult;
use crate::layers::{Conv2d, Layer, ParamVisit};
use crate::ops::ConvGeometry;
use crate::spec::ast::PadMode;

/// Structural shape of a block's shortcut path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShortcutPolicy {
    /// Input passes through unchanged.
    Identity,
    /// 1×1 convolution to the output channel count.
    ChannelProjection,
    /// Bilinear rescale by `1 / cumulative_stride`.
    SpatialResample,
    /// Rescale, then 1×1 projection.
    ResampleThenProject,
}

impl ShortcutPolicy {
    /// Indexed `[channels_equal][unit_stride]`.
    const TABLE: [[Self; 2]; 2] = [
        [Self::ResampleThenProject, Self::ChannelProjection],
        [Self::SpatialResample, Self::Identity],
    ];

    /// Pick the policy for a block whose in/out channels are (un)equal and whose cumulative
    /// stride is (not) 1.
    pub fn select(channels_equal: bool, unit_stride: bool) -> Self {
        Self::TABLE[usize::from(channels_equal)][usize::from(unit_stride)]
    }

    /// `true` when the path rescales spatially.
    pub fn resamples(self) -> bool {
        matches!(self, Self::SpatialResample | Self::ResampleThenProject)
    }

    /// `true` when the path changes the channel count.
    pub fn projects(self) -> bool {
        matches!(self, Self::ChannelProjection | Self::ResampleThenProject)
    }
}

/// Shortcut path of a compiled block, fixed at construction.
#[derive(Clone, Debug, PartialEq)]
pub struct Shortcut {
    policy: ShortcutPolicy,
    resample: Option<Layer>,
    project: Option<Conv2d>,
}

impl Shortcut {
    pub(crate) fn build(
        policy: ShortcutPolicy,
        in_channels: usize,
        out_channels: usize,
        cumulative_stride: f64,
        bias: bool,
    ) -> Self {
        let resample = policy.resamples().then(|| Layer::Resample {
            scale: 1.0 / cumulative_stride,
        });
        let project = policy.projects().then(|| {
            Conv2d::new(
                in_channels,
                out_channels,
                1,
                ConvGeometry {
                    stride: 1,
                    padding: 0,
                    pad_mode: PadMode::Zeros,
                },
                bias,
            )
        });
        Self {
            policy,
            resample,
            project,
        }
    }

    pub fn policy(&self) -> ShortcutPolicy {
        self.policy
    }

    pub fn forward(&self, input: &Tensor) -> NetResult<Tensor> {
        let resampled = match &self.resample {
            Some(layer) => Some(layer.forward(input)?),
            None => None,
        };
        match (&self.project, resampled) {
            (Some(conv), Some(r)) => conv.forward(&r),
            (Some(conv), None) => conv.forward(input),
            (None, Some(r)) => Ok(r),
            (None, None) => Ok(input.clone()),
        }
    }

    pub fn output_shape(&self, s: Shape4) -> NetResult<Shape4> {
        let mut s = match &self.resample {
            Some(layer) => layer.output_shape(s)?,
            None => s,
        };
        if let Some(conv) = &self.project {
            s.channels = conv.out_channels();
        }
        Ok(s)
    }

    pub(crate) fn reset_params(&mut self, prefix: &str) {
        if let Some(conv) = self.project.as_mut() {
            conv.reset_params(prefix);
        }
    }

    pub(crate) fn visit_params(
        &mut self,
        prefix: &str,
        visit: &mut ParamVisit<'_>,
    ) -> NetResult<()> {
        match self.project.as_mut() {
            Some(conv) => conv.visit_params(prefix, visit),
            None => Ok(()),
        }
    }
}
