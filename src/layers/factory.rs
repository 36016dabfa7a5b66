use ndarray::Array1;

use crate::foundation::error::{NetError, NetResult};
use crate::layers::{Conv2d, Layer};
use crate::ops::ConvGeometry;
use crate::spec::ast::{BlockFlags, OpDescriptor, UpsampleAlgo};

fn conv(
    kernel: usize,
    stride: usize,
    pad: crate::spec::ast::PadMode,
    flags: BlockFlags,
    in_channels: usize,
    out_channels: usize,
) -> Layer {
    let padding = if flags.no_pad { 0 } else { (kernel - 1) / 2 };
    Layer::Conv(Conv2d::new(
        in_channels,
        out_channels,
        kernel,
        ConvGeometry {
            stride,
            padding,
            pad_mode: pad,
        },
        !flags.no_bias,
    ))
}

/// Build the transform for one descriptor.
///
/// `in_channels` is the channel count reaching the op; `out_channels` is only read by the
/// convolution variants.
pub fn build_layer(
    desc: &OpDescriptor,
    flags: BlockFlags,
    in_channels: usize,
    out_channels: usize,
) -> NetResult<Layer> {
    Ok(match *desc {
        OpDescriptor::PadToEven { pad } => Layer::PadToEven { pad },
        OpDescriptor::Convolve { kernel, pad } => {
            conv(kernel, 1, pad, flags, in_channels, out_channels)
        }
        OpDescriptor::StridedConvolve { kernel, pad } => {
            conv(kernel, 2, pad, flags, in_channels, out_channels)
        }
        OpDescriptor::Upsample { algo } => {
            if algo == UpsampleAlgo::Shuffle && in_channels % 4 != 0 {
                return Err(NetError::UnsupportedUpsampleChannelCount {
                    channels: in_channels,
                });
            }
            Layer::Upsample { algo }
        }
        OpDescriptor::ParametricActivation { init } => Layer::PRelu {
            init,
            slope: Array1::from_elem(1, init),
        },
    })
}
