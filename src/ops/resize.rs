//! Spatial resampling: scale-factor interpolation, Gaussian-pyramid expand, pixel shuffle.
//!
//! Interpolation uses half-pixel centres (`align_corners = false`): output pixel `d` samples
//! source coordinate `(d + 0.5) / scale - 0.5`. Output extents are `floor(n * scale)`.

use ndarray::{Array4, Axis};

use crate::foundation::core::{Shape4, Tensor};
use crate::foundation::error::{NetError, NetResult};

/// Interpolation filter for [`resize_scale`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResizeFilter {
    /// Nearest neighbour, `floor((d + 0.5) / scale)`.
    Nearest,
    /// Bilinear.
    Bilinear,
}

#[derive(Clone, Copy, Debug)]
struct Tap {
    lo: usize,
    hi: usize,
    frac: f32,
}

fn scaled_extent(n: usize, scale: f64) -> usize {
    (n as f64 * scale).floor() as usize
}

fn taps(n_in: usize, n_out: usize, scale: f64, filter: ResizeFilter) -> Vec<Tap> {
    let last = n_in - 1;
    (0..n_out)
        .map(|d| match filter {
            ResizeFilter::Nearest => {
                let i = (((d as f64) + 0.5) / scale).floor() as usize;
                let i = i.min(last);
                Tap {
                    lo: i,
                    hi: i,
                    frac: 0.0,
                }
            }
            ResizeFilter::Bilinear => {
                let src = (((d as f64) + 0.5) / scale - 0.5).max(0.0);
                let lo = (src.floor() as usize).min(last);
                let hi = (lo + 1).min(last);
                Tap {
                    lo,
                    hi,
                    frac: (src - lo as f64) as f32,
                }
            }
        })
        .collect()
}

/// Resample both spatial extents by `scale`.
pub fn resize_scale(input: &Tensor, scale: f64, filter: ResizeFilter) -> NetResult<Tensor> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(NetError::validation(format!(
            "resize scale must be finite and > 0, got {scale}"
        )));
    }
    let shape = Shape4::of(input);
    let out_h = scaled_extent(shape.height, scale);
    let out_w = scaled_extent(shape.width, scale);
    if out_h == 0 || out_w == 0 {
        return Err(NetError::validation(format!(
            "resizing {shape} by {scale} produces an empty extent"
        )));
    }

    let ty = taps(shape.height, out_h, scale, filter);
    let tx = taps(shape.width, out_w, scale, filter);
    Ok(Array4::from_shape_fn(
        (shape.batch, shape.channels, out_h, out_w),
        |(n, c, y, x)| {
            let (ry, rx) = (ty[y], tx[x]);
            let p = |yy: usize, xx: usize| input[[n, c, yy, xx]];
            let top = p(ry.lo, rx.lo) * (1.0 - rx.frac) + p(ry.lo, rx.hi) * rx.frac;
            if ry.frac == 0.0 {
                return top;
            }
            let bottom = p(ry.hi, rx.lo) * (1.0 - rx.frac) + p(ry.hi, rx.hi) * rx.frac;
            top * (1.0 - ry.frac) + bottom * ry.frac
        },
    ))
}

/// Expand one axis by 2 with the binomial `[1, 4, 6, 4, 1] / 8` interpolation kernel.
///
/// Even outputs sit on source samples, odd outputs between them; borders replicate.
fn expand_axis(input: &Tensor, axis: Axis) -> Tensor {
    let mut dim = input.raw_dim();
    let n = dim[axis.index()];
    dim[axis.index()] = n * 2;
    let last = n - 1;
    let mut out = Array4::<f32>::zeros(dim);
    for (i, mut lane) in out.axis_iter_mut(axis).enumerate() {
        let k = i / 2;
        if i % 2 == 0 {
            let prev = input.index_axis(axis, k.saturating_sub(1));
            let cur = input.index_axis(axis, k);
            let next = input.index_axis(axis, (k + 1).min(last));
            ndarray::Zip::from(&mut lane)
                .and(&prev)
                .and(&cur)
                .and(&next)
                .for_each(|o, &a, &b, &c| *o = (a + 6.0 * b + c) * 0.125);
        } else {
            let cur = input.index_axis(axis, k);
            let next = input.index_axis(axis, (k + 1).min(last));
            ndarray::Zip::from(&mut lane)
                .and(&cur)
                .and(&next)
                .for_each(|o, &b, &c| *o = (b + c) * 0.5);
        }
    }
    out
}

/// Gaussian-pyramid upsampling: doubles height and width.
pub fn pyramid_up(input: &Tensor) -> NetResult<Tensor> {
    let shape = Shape4::of(input);
    if shape.height == 0 || shape.width == 0 {
        return Err(NetError::validation(format!(
            "pyramid upsampling needs a non-empty input, got {shape}"
        )));
    }
    Ok(expand_axis(&expand_axis(input, Axis(2)), Axis(3)))
}

/// Rearrange `(N, C·r², H, W)` into `(N, C, H·r, W·r)`.
pub fn pixel_shuffle(input: &Tensor, factor: usize) -> NetResult<Tensor> {
    let shape = Shape4::of(input);
    let r2 = factor * factor;
    if factor == 0 || shape.channels % r2 != 0 {
        return Err(NetError::UnsupportedUpsampleChannelCount {
            channels: shape.channels,
        });
    }
    let out_c = shape.channels / r2;
    Ok(Array4::from_shape_fn(
        (shape.batch, out_c, shape.height * factor, shape.width * factor),
        |(n, c, y, x)| {
            let src_c = c * r2 + (y % factor) * factor + (x % factor);
            input[[n, src_c, y / factor, x / factor]]
        },
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/ops/resize.rs"]
mod tests;
