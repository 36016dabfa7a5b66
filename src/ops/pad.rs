use ndarray::{Array4, s};

use crate::foundation::core::{Shape4, Tensor};
use crate::foundation::error::{NetError, NetResult};
use crate::spec::ast::PadMode;

/// Padding amounts per spatial edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Padding {
    /// Rows added above.
    pub top: usize,
    /// Rows added below.
    pub bottom: usize,
    /// Columns added left.
    pub left: usize,
    /// Columns added right.
    pub right: usize,
}

impl Padding {
    /// Same amount on all four edges.
    pub const fn uniform(p: usize) -> Self {
        Self {
            top: p,
            bottom: p,
            left: p,
            right: p,
        }
    }

    /// Only the trailing (bottom/right) edges.
    pub const fn trailing(bottom: usize, right: usize) -> Self {
        Self {
            top: 0,
            bottom,
            left: 0,
            right,
        }
    }

    /// `true` when nothing is added.
    pub const fn is_zero(self) -> bool {
        self.top == 0 && self.bottom == 0 && self.left == 0 && self.right == 0
    }
}

fn source_index(i: usize, before: usize, n: usize, mode: PadMode) -> Option<usize> {
    let p = i as isize - before as isize;
    let n = n as isize;
    if (0..n).contains(&p) {
        return Some(p as usize);
    }
    match mode {
        PadMode::Zeros => None,
        PadMode::Replicate => Some(p.clamp(0, n - 1) as usize),
        PadMode::Reflect => {
            let r = if p < 0 { -p } else { 2 * (n - 1) - p };
            Some(r.clamp(0, n - 1) as usize)
        }
    }
}

/// Pad the spatial extents of an NCHW tensor.
///
/// Reflect padding needs every pad amount strictly below the padded extent; replicate and
/// reflect need a non-empty input.
pub fn pad(input: &Tensor, padding: Padding, mode: PadMode) -> NetResult<Tensor> {
    if padding.is_zero() {
        return Ok(input.clone());
    }
    let shape = Shape4::of(input);
    let (h, w) = (shape.height, shape.width);
    match mode {
        PadMode::Zeros => {}
        PadMode::Replicate if h == 0 || w == 0 => {
            return Err(NetError::validation(format!(
                "replicate padding needs a non-empty input, got {shape}"
            )));
        }
        PadMode::Reflect
            if padding.top.max(padding.bottom) >= h || padding.left.max(padding.right) >= w =>
        {
            return Err(NetError::validation(format!(
                "reflect padding {padding:?} too large for input {shape}"
            )));
        }
        _ => {}
    }

    let out_h = h + padding.top + padding.bottom;
    let out_w = w + padding.left + padding.right;
    if mode == PadMode::Zeros {
        let mut out = Array4::<f32>::zeros((shape.batch, shape.channels, out_h, out_w));
        out.slice_mut(s![
            ..,
            ..,
            padding.top..padding.top + h,
            padding.left..padding.left + w
        ])
        .assign(input);
        return Ok(out);
    }

    let rows: Vec<usize> = (0..out_h)
        .map(|y| source_index(y, padding.top, h, mode).unwrap_or(0))
        .collect();
    let cols: Vec<usize> = (0..out_w)
        .map(|x| source_index(x, padding.left, w, mode).unwrap_or(0))
        .collect();
    Ok(Array4::from_shape_fn(
        (shape.batch, shape.channels, out_h, out_w),
        |(n, c, y, x)| input[[n, c, rows[y], cols[x]]],
    ))
}

/// Pad odd height and/or width by one trailing unit; a no-op on even extents.
pub fn pad_to_even(input: &Tensor, mode: PadMode) -> NetResult<Tensor> {
    let shape = Shape4::of(input);
    pad(
        input,
        Padding::trailing(shape.height % 2, shape.width % 2),
        mode,
    )
}

/// Keep the leading `height` rows and `width` columns.
pub fn crop_trailing(input: &Tensor, height: usize, width: usize) -> NetResult<Tensor> {
    let shape = Shape4::of(input);
    if height > shape.height || width > shape.width {
        return Err(NetError::shape_mismatch(format!(
            "cannot crop {shape} to {height}x{width}"
        )));
    }
    if height == shape.height && width == shape.width {
        return Ok(input.clone());
    }
    Ok(input.slice(s![.., .., ..height, ..width]).to_owned())
}

#[cfg(test)]
#[path = "../../tests/unit/ops/pad.rs"]
mod tests;
