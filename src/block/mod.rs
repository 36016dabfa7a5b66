//! Block compiler: spec string + channel plan -> one composite transform.
//!
//! A block is an optional leading `evenize`, a main chain of layers, and an optional shortcut
//! whose structure is chosen once, at construction, from
//! `(in_channels == out_channels, cumulative_stride == 1)`.

mod shortcut;

use std::borrow::Cow;

use crate::foundation::core::{Shape4, Tensor};
use crate::foundation::error::{NetError, NetResult};
use crate::layers::{Layer, ParamVisit, build_layer};
use crate::ops;
use crate::spec::ast::{BlockSpec, OpDescriptor, UpsampleAlgo};
use crate::spec::parser::parse_block_spec;

pub use shortcut::{Shortcut, ShortcutPolicy};

pub(crate) fn join_name(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_owned()
    } else {
        format!("{prefix}.{name}")
    }
}

/// A compiled block.
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    source: String,
    spec: BlockSpec,
    in_channels: usize,
    out_channels: usize,
    cumulative_stride: f64,
    evenize: Option<Layer>,
    main: Vec<Layer>,
    shortcut: Option<Shortcut>,
}

/// `true` when an `f32` weight of `dims`, and a bias along any one of them, can be allocated.
fn weight_fits(dims: [usize; 4]) -> bool {
    dims.into_iter()
        .map(|d| d.max(1))
        .try_fold(1usize, usize::checked_mul)
        .is_some_and(|n| n <= isize::MAX as usize / std::mem::size_of::<f32>())
}

/// Parse `spec` and compile it against `channels`.
///
/// `channels[0]` is the block's input channel count; every `conv`/`sconv` consumes the next
/// entry as its output count. After the chain exactly one entry must remain, otherwise the
/// spec and plan disagree and construction fails with [`NetError::MalformedSpec`].
///
/// Convolution weights start from a deterministic initialization (see
/// [`Block::reset_params`] with an empty prefix).
#[tracing::instrument(level = "debug")]
pub fn compile_block(spec: &str, channels: &[usize]) -> NetResult<Block> {
    let parsed = parse_block_spec(spec)?;
    let mut block = Block::compile(spec, parsed, channels)?;
    block.reset_params("");
    Ok(block)
}

impl Block {
    /// Compile an already parsed spec. `source` is only used for error messages.
    pub fn compile(source: &str, spec: BlockSpec, channels: &[usize]) -> NetResult<Self> {
        let malformed = |msg: String| NetError::malformed_spec(source, msg);
        let Some(&in_channels) = channels.first() else {
            return Err(malformed("channel plan is empty".to_owned()));
        };

        let mut evenize = None;
        let mut main = Vec::with_capacity(spec.ops.len());
        let mut consumed = 0usize;
        let mut current = in_channels;

        for (i, op) in spec.ops.iter().enumerate() {
            if let OpDescriptor::PadToEven { .. } = op {
                if i != 0 {
                    return Err(malformed(
                        "'evenize' is only valid as the first op of a chain".to_owned(),
                    ));
                }
                evenize = Some(build_layer(op, spec.flags, current, current)?);
                continue;
            }

            let out = if op.consumes_channels() {
                let Some(&next) = channels.get(consumed + 1) else {
                    return Err(malformed(format!(
                        "channel plan {channels:?} runs out at op {i} ({:?})",
                        op.kind()
                    )));
                };
                consumed += 1;
                next
            } else {
                current
            };

            if let OpDescriptor::Convolve { kernel, .. }
            | OpDescriptor::StridedConvolve { kernel, .. } = op
                && !weight_fits([out, current, *kernel, *kernel])
            {
                return Err(malformed(format!(
                    "op {i}: a {out}x{current}x{kernel}x{kernel} weight is too large"
                )));
            }
            main.push(build_layer(op, spec.flags, current, out)?);
            current = match op {
                OpDescriptor::Upsample {
                    algo: UpsampleAlgo::Shuffle,
                } => current / 4,
                _ => out,
            };
        }

        let remaining = channels.len() - consumed;
        if remaining != 1 {
            return Err(malformed(format!(
                "channel plan {channels:?} leaves {remaining} entries after the chain, expected 1"
            )));
        }

        let cumulative_stride = spec.cumulative_stride();
        let out_channels = current;
        if spec.flags.skip && !weight_fits([out_channels, in_channels, 1, 1]) {
            return Err(malformed(format!(
                "a {out_channels}x{in_channels} shortcut projection is too large"
            )));
        }
        let shortcut = spec.flags.skip.then(|| {
            let policy =
                ShortcutPolicy::select(in_channels == out_channels, cumulative_stride == 1.0);
            Shortcut::build(
                policy,
                in_channels,
                out_channels,
                cumulative_stride,
                !spec.flags.no_bias,
            )
        });

        tracing::trace!(
            spec = source,
            in_channels,
            out_channels,
            cumulative_stride,
            shortcut = ?shortcut.as_ref().map(Shortcut::policy),
            "compiled block"
        );

        Ok(Self {
            source: source.to_owned(),
            spec,
            in_channels,
            out_channels,
            cumulative_stride,
            evenize,
            main,
            shortcut,
        })
    }

    /// Spec string this block was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parsed spec.
    pub fn spec(&self) -> &BlockSpec {
        &self.spec
    }

    pub fn in_channels(&self) -> usize {
        self.in_channels
    }

    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    /// Product of per-op spatial scale factors (2 per `sconv`, 1/2 per `up`).
    pub fn cumulative_stride(&self) -> f64 {
        self.cumulative_stride
    }

    /// Shortcut policy, or `None` without the `skip` flag.
    pub fn shortcut_policy(&self) -> Option<ShortcutPolicy> {
        self.shortcut.as_ref().map(Shortcut::policy)
    }

    /// Main-chain layers, excluding a leading `evenize`.
    pub fn layers(&self) -> &[Layer] {
        &self.main
    }

    fn evenized<'a>(&self, input: &'a Tensor) -> NetResult<Cow<'a, Tensor>> {
        match &self.evenize {
            Some(layer) => Ok(Cow::Owned(layer.forward(input)?)),
            None => Ok(Cow::Borrowed(input)),
        }
    }

    fn run_main(&self, x: &Tensor) -> NetResult<Tensor> {
        let mut layers = self.main.iter();
        let Some(first) = layers.next() else {
            return Ok(x.clone());
        };
        let mut out = first.forward(x)?;
        for layer in layers {
            out = layer.forward(&out)?;
        }
        Ok(out)
    }

    /// Output of `evenize` plus the main chain, without the shortcut.
    pub fn forward_main(&self, input: &Tensor) -> NetResult<Tensor> {
        let x = self.evenized(input)?;
        self.run_main(&x)
    }

    /// Main chain plus shortcut (applied to the evenized input), summed elementwise.
    pub fn forward(&self, input: &Tensor) -> NetResult<Tensor> {
        let x = self.evenized(input)?;
        let mut out = self.run_main(&x)?;
        if let Some(shortcut) = &self.shortcut {
            let skip = shortcut.forward(&x)?;
            ops::add_assign(&mut out, &skip).map_err(|e| {
                NetError::shape_mismatch(format!("shortcut of block '{}': {e}", self.source))
            })?;
        }
        Ok(out)
    }

    /// Shape produced for an input of shape `s`, validated like [`Block::forward`].
    pub fn output_shape(&self, s: Shape4) -> NetResult<Shape4> {
        let x = match &self.evenize {
            Some(layer) => layer.output_shape(s)?,
            None => s,
        };
        let mut out = x;
        for layer in &self.main {
            out = layer.output_shape(out)?;
        }
        if let Some(shortcut) = &self.shortcut {
            let skip = shortcut.output_shape(x)?;
            if skip != out {
                return Err(NetError::shape_mismatch(format!(
                    "shortcut of block '{}': cannot add {out} and {skip}",
                    self.source
                )));
            }
        }
        Ok(out)
    }

    /// Deterministically re-initialize every parameter, seeded by its full name.
    pub fn reset_params(&mut self, prefix: &str) {
        for (i, layer) in self.main.iter_mut().enumerate() {
            layer.reset_params(&join_name(prefix, &format!("main.{i}")));
        }
        if let Some(shortcut) = self.shortcut.as_mut() {
            shortcut.reset_params(&join_name(prefix, "shortcut"));
        }
    }

    /// Visit every learnable array as `(name, shape, data)`.
    pub fn visit_params(&mut self, prefix: &str, visit: &mut ParamVisit<'_>) -> NetResult<()> {
        for (i, layer) in self.main.iter_mut().enumerate() {
            layer.visit_params(&join_name(prefix, &format!("main.{i}")), visit)?;
        }
        if let Some(shortcut) = self.shortcut.as_mut() {
            shortcut.visit_params(&join_name(prefix, "shortcut"), visit)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/block/mod.rs"]
mod tests;
