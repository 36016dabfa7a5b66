use ndarray::{Array1, Array4};
use rayon::prelude::*;

use crate::foundation::core::{Shape4, Tensor};
use crate::foundation::error::{NetError, NetResult};
use crate::ops::pad::{Padding, pad};
use crate::spec::ast::PadMode;

/// Geometry of a square-kernel 2-D convolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConvGeometry {
    /// Spatial step between output samples.
    pub stride: usize,
    /// Implicit padding on every edge.
    pub padding: usize,
    /// Border mode for the implicit padding.
    pub pad_mode: PadMode,
}

impl ConvGeometry {
    /// Output extent along one axis: `floor((n + 2p - k) / s) + 1`.
    pub fn output_extent(&self, n: usize, kernel: usize) -> Option<usize> {
        let padded = n + 2 * self.padding;
        if padded < kernel || self.stride == 0 {
            return None;
        }
        Some((padded - kernel) / self.stride + 1)
    }
}

/// Cross-correlate `input` (N, I, H, W) with `weight` (O, I, k, k), adding `bias` (O).
///
/// Output planes are computed in parallel; the result does not depend on the thread count.
pub fn conv2d(
    input: &Tensor,
    weight: &Array4<f32>,
    bias: Option<&Array1<f32>>,
    geom: ConvGeometry,
) -> NetResult<Tensor> {
    let shape = Shape4::of(input);
    let (out_c, in_c, kh, kw) = weight.dim();
    if in_c != shape.channels {
        return Err(NetError::shape_mismatch(format!(
            "convolution expects {in_c} input channels, got {shape}"
        )));
    }
    if let Some(b) = bias
        && b.len() != out_c
    {
        return Err(NetError::shape_mismatch(format!(
            "bias has {} entries for {out_c} output channels",
            b.len()
        )));
    }
    let (Some(out_h), Some(out_w)) = (
        geom.output_extent(shape.height, kh),
        geom.output_extent(shape.width, kw),
    ) else {
        return Err(NetError::shape_mismatch(format!(
            "kernel {kh}x{kw} does not fit input {shape} with padding {}",
            geom.padding
        )));
    };

    let padded = pad(input, Padding::uniform(geom.padding), geom.pad_mode)?;
    let padded = padded.as_standard_layout();
    let src = padded
        .as_slice()
        .ok_or_else(|| NetError::shape_mismatch("padded input is not contiguous"))?;
    let weight = weight.as_standard_layout();
    let w = weight
        .as_slice()
        .ok_or_else(|| NetError::shape_mismatch("weight is not contiguous"))?;
    let (ph, pw) = (
        shape.height + 2 * geom.padding,
        shape.width + 2 * geom.padding,
    );
    let plane = out_h * out_w;
    let stride = geom.stride;

    let mut out = vec![0.0f32; shape.batch * out_c * plane];
    out.par_chunks_mut(plane.max(1))
        .enumerate()
        .for_each(|(idx, dst)| {
            let (n, o) = (idx / out_c, idx % out_c);
            dst.fill(bias.map_or(0.0, |b| b[o]));
            for i in 0..in_c {
                let src_plane = &src[(n * in_c + i) * ph * pw..][..ph * pw];
                let w_plane = &w[(o * in_c + i) * kh * kw..][..kh * kw];
                for ky in 0..kh {
                    for kx in 0..kw {
                        let wv = w_plane[ky * kw + kx];
                        if wv == 0.0 {
                            continue;
                        }
                        for oy in 0..out_h {
                            let row = &src_plane[(oy * stride + ky) * pw..];
                            let drow = &mut dst[oy * out_w..(oy + 1) * out_w];
                            for (ox, d) in drow.iter_mut().enumerate() {
                                *d += wv * row[ox * stride + kx];
                            }
                        }
                    }
                }
            }
        });

    Array4::from_shape_vec((shape.batch, out_c, out_h, out_w), out)
        .map_err(|e| NetError::Other(anyhow::Error::new(e)))
}

#[cfg(test)]
#[path = "../../tests/unit/ops/conv.rs"]
mod tests;
