//! CPU array engine: the numeric primitives every transform is built from.

pub mod conv;
pub mod pad;
pub mod resize;

use ndarray::{Axis, concatenate};

use crate::foundation::core::{Shape4, Tensor};
use crate::foundation::error::{NetError, NetResult};

pub use conv::{ConvGeometry, conv2d};
pub use pad::{Padding, crop_trailing, pad, pad_to_even};
pub use resize::{ResizeFilter, pixel_shuffle, pyramid_up, resize_scale};

/// Elementwise sum of two tensors of identical shape.
pub fn add(a: &Tensor, b: &Tensor) -> NetResult<Tensor> {
    let mut out = a.clone();
    add_assign(&mut out, b)?;
    Ok(out)
}

/// `acc += other`, shapes must match exactly (no broadcasting).
pub fn add_assign(acc: &mut Tensor, other: &Tensor) -> NetResult<()> {
    if acc.dim() != other.dim() {
        return Err(NetError::shape_mismatch(format!(
            "cannot add {} and {}",
            Shape4::of(acc),
            Shape4::of(other)
        )));
    }
    *acc += other;
    Ok(())
}

/// Leaky rectifier with a single slope for all channels.
pub fn prelu(input: &Tensor, slope: f32) -> Tensor {
    input.mapv(|v| if v >= 0.0 { v } else { v * slope })
}

/// Concatenate along the channel axis.
pub fn concat_channels(parts: &[&Tensor]) -> NetResult<Tensor> {
    let views: Vec<_> = parts.iter().map(|t| t.view()).collect();
    concatenate(Axis(1), &views).map_err(|e| {
        NetError::shape_mismatch(format!("channel concatenation failed: {e}"))
    })
}

#[cfg(test)]
#[path = "../../tests/unit/ops/mod.rs"]
mod tests;
