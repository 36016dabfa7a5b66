//! Per-pixel separable synthesis and the frame statistics it depends on.

use ndarray::{Array4, Axis, s};
use rayon::prelude::*;

use crate::foundation::core::{Shape4, Tensor};
use crate::foundation::error::{NetError, NetResult};
use crate::ops::{self, Padding};
use crate::spec::ast::PadMode;

/// Added to the joint standard deviation before dividing.
pub const NORMALIZE_EPSILON: f32 = 1e-7;

/// Normalizer entries with a smaller magnitude are treated as 1.
pub const NORMALIZER_FLOOR: f32 = 0.01;

fn mean_and_variance<'a>(values: impl Iterator<Item = &'a f32> + Clone) -> (f64, f64) {
    let (sum, n) = values
        .clone()
        .fold((0.0f64, 0usize), |(s, n), &v| (s + f64::from(v), n + 1));
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = sum / n as f64;
    let var = values
        .map(|&v| {
            let d = f64::from(v) - mean;
            d * d
        })
        .sum::<f64>()
        / n as f64;
    (mean, var)
}

/// Normalize both frames with their joint statistics, per batch entry.
///
/// The joint mean is the average of the two frame means; the joint deviation is
/// `sqrt(mean_i(var_i + (mean - mean_i)^2))` with population variances.
pub fn normalize_pair(one: &Tensor, two: &Tensor) -> NetResult<(Tensor, Tensor)> {
    if one.dim() != two.dim() {
        return Err(NetError::shape_mismatch(format!(
            "frames differ in shape: {} vs {}",
            Shape4::of(one),
            Shape4::of(two)
        )));
    }
    let mut a = one.clone();
    let mut b = two.clone();
    for batch in 0..one.dim().0 {
        let (m1, v1) = mean_and_variance(one.index_axis(Axis(0), batch).iter());
        let (m2, v2) = mean_and_variance(two.index_axis(Axis(0), batch).iter());
        let mean = 0.5 * (m1 + m2);
        let std = (0.5 * ((v1 + (mean - m1).powi(2)) + (v2 + (mean - m2).powi(2)))).sqrt();
        let (mean, denom) = (mean as f32, std as f32 + NORMALIZE_EPSILON);
        for t in [&mut a, &mut b] {
            t.index_axis_mut(Axis(0), batch)
                .mapv_inplace(|v| (v - mean) / denom);
        }
    }
    Ok((a, b))
}

/// Frame prepared for synthesis: an all-ones channel appended, then replicate padding of
/// `kernel_size / 2` on every edge.
pub fn synthesis_frame(frame: &Tensor, kernel_size: usize) -> NetResult<Tensor> {
    let (n, _, h, w) = frame.dim();
    let ones = Array4::<f32>::ones((n, 1, h, w));
    let with_ones = ops::concat_channels(&[frame, &ones])?;
    ops::pad(
        &with_ones,
        Padding::uniform(kernel_size / 2),
        PadMode::Replicate,
    )
}

/// Separable local filtering.
///
/// `out[n, c, y, x] = Σ_i Σ_j input[n, c, y + i, x + j] · vertical[n, i, y, x] ·
/// horizontal[n, j, y, x]`. `vertical` and `horizontal` are `(N, K, H, W)`; `input` must be
/// `(N, C, H + K - 1, W + K - 1)`.
pub fn separable_filter(
    input: &Tensor,
    vertical: &Tensor,
    horizontal: &Tensor,
) -> NetResult<Tensor> {
    let src_shape = Shape4::of(input);
    let kernel_shape = Shape4::of(vertical);
    if kernel_shape != Shape4::of(horizontal) {
        return Err(NetError::shape_mismatch(format!(
            "vertical kernels {kernel_shape} and horizontal kernels {} differ",
            Shape4::of(horizontal)
        )));
    }
    let Shape4 {
        batch: n,
        channels: k,
        height: h,
        width: w,
    } = kernel_shape;
    let (ih, iw) = (h + k.saturating_sub(1), w + k.saturating_sub(1));
    if k == 0 || src_shape.batch != n || src_shape.height != ih || src_shape.width != iw {
        return Err(NetError::shape_mismatch(format!(
            "input {src_shape} does not fit {k}-tap kernels over {h}x{w}"
        )));
    }
    let c = src_shape.channels;

    let input = input.as_standard_layout();
    let src = input
        .as_slice()
        .ok_or_else(|| NetError::shape_mismatch("input is not contiguous"))?;
    let vertical = vertical.as_standard_layout();
    let vs = vertical
        .as_slice()
        .ok_or_else(|| NetError::shape_mismatch("vertical kernels are not contiguous"))?;
    let horizontal = horizontal.as_standard_layout();
    let hs = horizontal
        .as_slice()
        .ok_or_else(|| NetError::shape_mismatch("horizontal kernels are not contiguous"))?;

    let plane = h * w;
    let mut out = vec![0.0f32; n * c * plane];
    out.par_chunks_mut(plane.max(1))
        .enumerate()
        .for_each(|(p, dst)| {
            let b = p / c.max(1);
            let src_plane = &src[p * ih * iw..(p + 1) * ih * iw];
            let kernels = b * k * plane;
            for y in 0..h {
                for x in 0..w {
                    let at = y * w + x;
                    let mut acc = 0.0f32;
                    for i in 0..k {
                        let row = &src_plane[(y + i) * iw + x..(y + i) * iw + x + k];
                        let mut inner = 0.0f32;
                        for (j, &v) in row.iter().enumerate() {
                            inner += v * hs[kernels + j * plane + at];
                        }
                        acc += inner * vs[kernels + i * plane + at];
                    }
                    dst[at] = acc;
                }
            }
        });

    Array4::from_shape_vec((n, c, h, w), out)
        .map_err(|e| NetError::shape_mismatch(format!("synthesis output: {e}")))
}

/// Divide every channel but the last by the last one.
pub fn divide_by_normalizer(synthesized: &Tensor) -> NetResult<Tensor> {
    let c = synthesized.dim().1;
    if c < 2 {
        return Err(NetError::shape_mismatch(format!(
            "need a normalizer channel, got {}",
            Shape4::of(synthesized)
        )));
    }
    let norm = synthesized
        .slice(s![.., c - 1..c, .., ..])
        .mapv(|v| if v.abs() < NORMALIZER_FLOOR { 1.0 } else { v });
    Ok(&synthesized.slice(s![.., ..c - 1, .., ..]) / &norm)
}

#[cfg(test)]
#[path = "../../tests/unit/network/synthesis.rs"]
mod tests;
