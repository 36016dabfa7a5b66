use ndarray::{Array3, Axis, s};

use crate::foundation::core::Tensor;
use crate::foundation::error::{NetError, NetResult};
use crate::ops;
use crate::spec::ast::PadMode;

use super::config::build_thread_pool;
use super::model::Network;

/// A network together with the worker pool its `threads` setting asks for.
///
/// The pool is built once here and reused by every [`Interpolator::estimate`] call.
#[derive(Debug)]
pub struct Interpolator {
    network: Network,
    pool: Option<rayon::ThreadPool>,
}

impl Interpolator {
    pub fn new(network: Network) -> NetResult<Self> {
        let pool = match network.config().threads {
            Some(n) => Some(build_thread_pool(Some(n))?),
            None => None,
        };
        Ok(Self { network, pool })
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Worker threads a call to [`Interpolator::estimate`] runs on.
    pub fn threads(&self) -> usize {
        self.pool
            .as_ref()
            .map_or_else(rayon::current_num_threads, rayon::ThreadPool::current_num_threads)
    }

    /// [`estimate`] on the dedicated pool, or on the caller's pool when none was requested.
    pub fn estimate(&self, one: &Array3<f32>, two: &Array3<f32>) -> NetResult<Array3<f32>> {
        match &self.pool {
            Some(pool) => pool.install(|| estimate(&self.network, one, two)),
            None => estimate(&self.network, one, two),
        }
    }
}

/// Interpolate the frame halfway between two `(3, H, W)` frames.
///
/// Extents are capped by the network's `max_width`/`max_height`. Odd extents are replicate
/// padded to even before the pass and cropped away after it, so the result always has the
/// input's shape. Runs on the caller's rayon pool; [`Interpolator`] honours `threads`.
#[tracing::instrument(
    level = "debug",
    skip_all,
    fields(height = one.dim().1, width = one.dim().2)
)]
pub fn estimate(
    network: &Network,
    one: &Array3<f32>,
    two: &Array3<f32>,
) -> NetResult<Array3<f32>> {
    if one.dim() != two.dim() {
        return Err(NetError::validation(format!(
            "frames differ in shape: {:?} vs {:?}",
            one.dim(),
            two.dim()
        )));
    }
    let (channels, height, width) = one.dim();
    if channels != 3 {
        return Err(NetError::validation(format!(
            "frames need 3 channels, got {channels}"
        )));
    }
    let config = network.config();
    if width == 0 || height == 0 || width > config.max_width || height > config.max_height {
        return Err(NetError::validation(format!(
            "frame size {width}x{height} outside 1x1..={}x{}",
            config.max_width, config.max_height
        )));
    }

    let prepare = |frame: &Array3<f32>| -> NetResult<Tensor> {
        let batched = frame.clone().insert_axis(Axis(0));
        ops::pad_to_even(&batched, PadMode::Replicate)
    };
    let (a, b) = (prepare(one)?, prepare(two)?);
    let out = network.forward(&a, &b)?;
    Ok(out.slice(s![0, .., ..height, ..width]).to_owned())
}

/// `(3, H, W)` frame in blue, green, red plane order with values in `[0, 1]`.
///
/// The plane order matches the channel order the synthesis weights were trained with.
pub fn frame_from_image(img: &image::RgbImage) -> Array3<f32> {
    let (w, h) = img.dimensions();
    Array3::from_shape_fn((3, h as usize, w as usize), |(c, y, x)| {
        let px = img.get_pixel(x as u32, y as u32);
        f32::from(px.0[2 - c]) / 255.0
    })
}

/// Inverse of [`frame_from_image`]; values are clamped to `[0, 1]` before quantizing.
pub fn frame_to_image(frame: &Array3<f32>) -> NetResult<image::RgbImage> {
    let (c, h, w) = frame.dim();
    if c != 3 {
        return Err(NetError::validation(format!(
            "image output needs 3 planes, got {c}"
        )));
    }
    let (w32, h32) = (
        u32::try_from(w).map_err(|_| NetError::validation("frame too wide"))?,
        u32::try_from(h).map_err(|_| NetError::validation("frame too tall"))?,
    );
    Ok(image::RgbImage::from_fn(w32, h32, |x, y| {
        let (x, y) = (x as usize, y as usize);
        let q = |plane: usize| (frame[[plane, y, x]].clamp(0.0, 1.0) * 255.0).round() as u8;
        image::Rgb([q(2), q(1), q(0)])
    }))
}

#[cfg(test)]
#[path = "../../tests/unit/network/estimate.rs"]
mod tests;
