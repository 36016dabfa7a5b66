use crate::block::Block;
use crate::foundation::core::{Shape4, Tensor};
use crate::foundation::error::{NetError, NetResult};
use crate::ops;

/// What travels through the pyramid: real tensors, or only their shapes.
pub(crate) trait Flow {
    type Value;

    fn shape(v: &Self::Value) -> Shape4;
    fn apply(block: &Block, v: &Self::Value) -> NetResult<Self::Value>;
    fn add(acc: Self::Value, other: &Self::Value) -> NetResult<Self::Value>;
    fn crop(v: Self::Value, height: usize, width: usize) -> NetResult<Self::Value>;
}

/// Runs every block on tensor data.
pub(crate) struct Eval;

impl Flow for Eval {
    type Value = Tensor;

    fn shape(v: &Tensor) -> Shape4 {
        Shape4::of(v)
    }

    fn apply(block: &Block, v: &Tensor) -> NetResult<Tensor> {
        block.forward(v)
    }

    fn add(mut acc: Tensor, other: &Tensor) -> NetResult<Tensor> {
        ops::add_assign(&mut acc, other)?;
        Ok(acc)
    }

    fn crop(v: Tensor, height: usize, width: usize) -> NetResult<Tensor> {
        ops::crop_trailing(&v, height, width)
    }
}

/// Propagates shapes only, with the same validation as [`Eval`].
pub(crate) struct Infer;

impl Flow for Infer {
    type Value = Shape4;

    fn shape(v: &Shape4) -> Shape4 {
        *v
    }

    fn apply(block: &Block, v: &Shape4) -> NetResult<Shape4> {
        block.output_shape(*v)
    }

    fn add(acc: Shape4, other: &Shape4) -> NetResult<Shape4> {
        if acc != *other {
            return Err(NetError::shape_mismatch(format!(
                "cannot add {acc} and {other}"
            )));
        }
        Ok(acc)
    }

    fn crop(v: Shape4, height: usize, width: usize) -> NetResult<Shape4> {
        if height > v.height || width > v.width {
            return Err(NetError::shape_mismatch(format!(
                "cannot crop {v} to {height}x{width}"
            )));
        }
        Ok(Shape4 {
            height,
            width,
            ..v
        })
    }
}
