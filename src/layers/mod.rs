//! The fixed set of parameterized transforms a block is assembled from.

pub(crate) mod factory;

use ndarray::{Array1, Array4};

use crate::foundation::core::{Shape4, Tensor};
use crate::foundation::error::{NetError, NetResult};
use crate::foundation::math::fill_uniform_fan_in;
use crate::ops::{self, ConvGeometry, ResizeFilter};
use crate::spec::ast::{PadMode, UpsampleAlgo};

pub use factory::build_layer;

/// Callback receiving `(name, shape, data)` for every learnable array.
pub type ParamVisit<'a> = dyn FnMut(&str, &[usize], &mut [f32]) -> NetResult<()> + 'a;

/// Square-kernel convolution with optional bias.
#[derive(Clone, Debug, PartialEq)]
pub struct Conv2d {
    /// `(out, in, k, k)` weights.
    pub weight: Array4<f32>,
    /// Per-output-channel bias.
    pub bias: Option<Array1<f32>>,
    /// Stride, padding and border mode.
    pub geom: ConvGeometry,
}

impl Conv2d {
    /// Zero-initialized convolution.
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel: usize,
        geom: ConvGeometry,
        bias: bool,
    ) -> Self {
        Self {
            weight: Array4::zeros((out_channels, in_channels, kernel, kernel)),
            bias: bias.then(|| Array1::zeros(out_channels)),
            geom,
        }
    }

    /// Input channel count.
    pub fn in_channels(&self) -> usize {
        self.weight.dim().1
    }

    /// Output channel count.
    pub fn out_channels(&self) -> usize {
        self.weight.dim().0
    }

    /// Kernel size.
    pub fn kernel(&self) -> usize {
        self.weight.dim().2
    }

    pub fn forward(&self, input: &Tensor) -> NetResult<Tensor> {
        ops::conv2d(input, &self.weight, self.bias.as_ref(), self.geom)
    }

    fn output_shape(&self, s: Shape4) -> NetResult<Shape4> {
        if s.channels != self.in_channels() {
            return Err(NetError::shape_mismatch(format!(
                "convolution expects {} input channels, got {s}",
                self.in_channels()
            )));
        }
        let k = self.kernel();
        match (
            self.geom.output_extent(s.height, k),
            self.geom.output_extent(s.width, k),
        ) {
            (Some(h), Some(w)) => Ok(Shape4::new(s.batch, self.out_channels(), h, w)),
            _ => Err(NetError::shape_mismatch(format!(
                "kernel {k}x{k} does not fit input {s}"
            ))),
        }
    }

    pub(crate) fn reset_params(&mut self, prefix: &str) {
        let (_, in_c, kh, kw) = self.weight.dim();
        if let Some(w) = self.weight.as_slice_mut() {
            fill_uniform_fan_in(&format!("{prefix}.weight"), in_c * kh * kw, w);
        }
        if let Some(b) = self.bias.as_mut() {
            b.fill(0.0);
        }
    }

    pub(crate) fn visit_params(
        &mut self,
        prefix: &str,
        visit: &mut ParamVisit<'_>,
    ) -> NetResult<()> {
        let shape = self.weight.shape().to_vec();
        let w = self
            .weight
            .as_slice_mut()
            .ok_or_else(|| NetError::params(format!("{prefix}.weight is not contiguous")))?;
        visit(&format!("{prefix}.weight"), &shape, w)?;
        if let Some(b) = self.bias.as_mut() {
            let shape = [b.len()];
            let data = b
                .as_slice_mut()
                .ok_or_else(|| NetError::params(format!("{prefix}.bias is not contiguous")))?;
            visit(&format!("{prefix}.bias"), &shape, data)?;
        }
        Ok(())
    }
}

/// One elementary transform. Closed set: every spec token maps onto one of these.
#[derive(Clone, Debug, PartialEq)]
pub enum Layer {
    /// Trailing one-unit padding of odd extents.
    PadToEven {
        /// Fill mode.
        pad: PadMode,
    },
    /// Convolution (stride 1 or 2).
    Conv(Conv2d),
    /// Spatial doubling.
    Upsample {
        /// Algorithm.
        algo: UpsampleAlgo,
    },
    /// Parametric leaky rectifier with one shared slope.
    PRelu {
        /// Value the slope resets to.
        init: f32,
        /// Learned slope, a single entry.
        slope: Array1<f32>,
    },
    /// Bilinear rescale by an arbitrary factor; only used on shortcut paths.
    Resample {
        /// Spatial scale factor.
        scale: f64,
    },
}

impl Layer {
    pub fn forward(&self, input: &Tensor) -> NetResult<Tensor> {
        match self {
            Self::PadToEven { pad } => ops::pad_to_even(input, *pad),
            Self::Conv(conv) => conv.forward(input),
            Self::Upsample { algo } => match algo {
                UpsampleAlgo::Nearest => ops::resize_scale(input, 2.0, ResizeFilter::Nearest),
                UpsampleAlgo::Bilinear => ops::resize_scale(input, 2.0, ResizeFilter::Bilinear),
                UpsampleAlgo::Pyramid => ops::pyramid_up(input),
                UpsampleAlgo::Shuffle => ops::pixel_shuffle(input, 2),
            },
            Self::PRelu { slope, .. } => Ok(ops::prelu(input, slope[0])),
            Self::Resample { scale } => ops::resize_scale(input, *scale, ResizeFilter::Bilinear),
        }
    }

    /// Shape this layer produces for an input of shape `s`, without touching data.
    pub fn output_shape(&self, s: Shape4) -> NetResult<Shape4> {
        let scaled = |n: usize, scale: f64| (n as f64 * scale).floor() as usize;
        match self {
            Self::PadToEven { .. } => Ok(Shape4::new(
                s.batch,
                s.channels,
                s.height + s.height % 2,
                s.width + s.width % 2,
            )),
            Self::Conv(conv) => conv.output_shape(s),
            Self::Upsample {
                algo: UpsampleAlgo::Shuffle,
            } => {
                if s.channels % 4 != 0 {
                    return Err(NetError::UnsupportedUpsampleChannelCount {
                        channels: s.channels,
                    });
                }
                Ok(Shape4::new(s.batch, s.channels / 4, s.height * 2, s.width * 2))
            }
            Self::Upsample { .. } => Ok(Shape4::new(
                s.batch,
                s.channels,
                s.height * 2,
                s.width * 2,
            )),
            Self::PRelu { .. } => Ok(s),
            Self::Resample { scale } => Ok(Shape4::new(
                s.batch,
                s.channels,
                scaled(s.height, *scale),
                scaled(s.width, *scale),
            )),
        }
    }

    /// Deterministically re-initialize learnable state, keyed by `prefix`.
    pub fn reset_params(&mut self, prefix: &str) {
        match self {
            Self::Conv(conv) => conv.reset_params(prefix),
            Self::PRelu { init, slope } => slope.fill(*init),
            _ => {}
        }
    }

    pub fn visit_params(&mut self, prefix: &str, visit: &mut ParamVisit<'_>) -> NetResult<()> {
        match self {
            Self::Conv(conv) => conv.visit_params(prefix, visit),
            Self::PRelu { slope, .. } => {
                let data = slope
                    .as_slice_mut()
                    .ok_or_else(|| NetError::params(format!("{prefix}.weight is not contiguous")))?;
                visit(&format!("{prefix}.weight"), &[1], data)
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/layers/mod.rs"]
mod tests;
