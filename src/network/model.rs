use rayon::prelude::*;
use serde::Serialize;

use crate::block::Block;
use crate::foundation::core::{Shape4, Tensor};
use crate::foundation::error::{NetError, NetResult};
use crate::layers::{Conv2d, ParamVisit};
use crate::ops::{self, ConvGeometry};
use crate::params::{ParamArray, ParamStore};
use crate::pyramid::{Decoder, Encoder, ShapeTable};
use crate::spec::ast::PadMode;
use crate::spec::parser::parse_block_spec;

use super::config::NetworkConfig;
use super::synthesis::{divide_by_normalizer, normalize_pair, separable_filter, synthesis_frame};

/// Kernel heads in evaluation order: (vertical, horizontal) for the first frame, then the
/// second.
const HEADS: [&str; 4] = [
    "vertical_one",
    "horizontal_one",
    "vertical_two",
    "horizontal_two",
];

/// Frame interpolation network: input stage, encoder/decoder pyramid, four kernel heads and
/// separable synthesis.
#[derive(Clone, Debug, PartialEq)]
pub struct Network {
    config: NetworkConfig,
    input: Conv2d,
    encoder: Encoder,
    decoder: Decoder,
    heads: Vec<Block>,
}

/// Shapes a forward pass would produce for one input size.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NetworkPlan {
    /// Shape of each input frame.
    pub frame: Shape4,
    pub features: Shape4,
    pub encoder: Vec<Option<Shape4>>,
    pub shape_table: ShapeTable,
    pub decoder: Vec<Option<Shape4>>,
    /// Shape of each of the four kernel head outputs.
    pub kernels: Shape4,
    pub output: Shape4,
    pub param_count: usize,
}

impl Network {
    /// Build a network with deterministic initial parameters.
    #[tracing::instrument(level = "debug", skip_all, fields(levels = config.channels.len()))]
    pub fn new(config: NetworkConfig) -> NetResult<Self> {
        config.validate()?;
        let levels = config.channels.len();

        let mut input = Conv2d::new(
            3,
            config.input_channels(),
            3,
            ConvGeometry {
                stride: 1,
                padding: 1,
                pad_mode: PadMode::Zeros,
            },
            true,
        );
        input.reset_params("input");

        let encoder = Encoder::new(
            &vec![0; levels],
            &config.channels,
            &config.encoder_horizontal,
            &config.encoder_vertical,
        )?;

        let mut decoder_channels = config.channels.clone();
        decoder_channels[0] = 0;
        let decoder = Decoder::new(
            &decoder_channels,
            &decoder_channels,
            &config.decoder_horizontal,
            &config.decoder_vertical,
        )?;

        let head_spec = parse_block_spec(&config.head)?;
        let c1 = config.channels[1];
        let heads = HEADS
            .iter()
            .map(|name| {
                let plan = [c1, c1, config.kernel_size];
                let mut block = Block::compile(&config.head, head_spec.clone(), &plan)?;
                block.reset_params(&format!("head.{name}"));
                Ok(block)
            })
            .collect::<NetResult<Vec<_>>>()?;

        Ok(Self {
            config,
            input,
            encoder,
            decoder,
            heads,
        })
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    fn check_frames(&self, one: Shape4, two: Shape4) -> NetResult<()> {
        if one != two {
            return Err(NetError::validation(format!(
                "frames differ in shape: {one} vs {two}"
            )));
        }
        if one.channels != 3 {
            return Err(NetError::validation(format!(
                "frames need 3 channels, got {one}"
            )));
        }
        if one.is_empty() || one.height % 2 != 0 || one.width % 2 != 0 {
            return Err(NetError::validation(format!(
                "frames need non-zero even extents, got {one}"
            )));
        }
        Ok(())
    }

    /// Synthesize the frame halfway between `one` and `two`, both `(N, 3, H, W)` with even
    /// `H` and `W`.
    #[tracing::instrument(level = "debug", skip_all, fields(shape = %Shape4::of(one)))]
    pub fn forward(&self, one: &Tensor, two: &Tensor) -> NetResult<Tensor> {
        self.check_frames(Shape4::of(one), Shape4::of(two))?;
        let k = self.config.kernel_size;
        let padded_one = synthesis_frame(one, k)?;
        let padded_two = synthesis_frame(two, k)?;

        let (norm_one, norm_two) = normalize_pair(one, two)?;
        let features = ops::concat_channels(&[
            &self.input.forward(&norm_one)?,
            &self.input.forward(&norm_two)?,
        ])?;

        let mut inputs = vec![None; self.config.channels.len()];
        inputs[0] = Some(features);
        let mut table = ShapeTable::new();
        let encoded = self.encoder.forward(inputs, &mut table)?;
        let decoded = self.decoder.forward(encoded, &table)?;
        let coarse = decoded
            .into_iter()
            .nth(1)
            .flatten()
            .ok_or_else(|| NetError::validation("decoder produced no level-1 output"))?;

        let kernels = self
            .heads
            .par_iter()
            .map(|head| head.forward(&coarse))
            .collect::<NetResult<Vec<_>>>()?;
        tracing::trace!(kernels = %Shape4::of(&kernels[0]), "kernel heads done");

        let mut out = separable_filter(&padded_one, &kernels[0], &kernels[1])?;
        ops::add_assign(&mut out, &separable_filter(&padded_two, &kernels[2], &kernels[3])?)?;
        divide_by_normalizer(&out)
    }

    /// Shapes of every stage for `(1, 3, height, width)` frames, without running any kernel.
    ///
    /// Takes `&mut self` only because parameters are counted through the in-place visitor.
    pub fn plan(&mut self, height: usize, width: usize) -> NetResult<NetworkPlan> {
        let frame = Shape4::new(1, 3, height, width);
        self.check_frames(frame, frame)?;
        let features = Shape4::new(1, 2 * self.input.out_channels(), height, width);

        let mut inputs = vec![None; self.config.channels.len()];
        inputs[0] = Some(features);
        let mut shape_table = ShapeTable::new();
        let encoder = self.encoder.output_shapes(&inputs, &mut shape_table)?;
        let decoder = self.decoder.output_shapes(&encoder, &shape_table)?;
        let coarse = decoder
            .get(1)
            .copied()
            .flatten()
            .ok_or_else(|| NetError::validation("decoder produced no level-1 output"))?;
        let kernels = self.heads[0].output_shape(coarse)?;
        if (kernels.height, kernels.width) != (height, width) {
            return Err(NetError::shape_mismatch(format!(
                "kernel heads produce {kernels} for {frame} frames"
            )));
        }

        let param_count = self
            .param_inventory()?
            .iter()
            .map(|(_, shape)| shape.iter().product::<usize>())
            .sum();

        Ok(NetworkPlan {
            frame,
            features,
            encoder,
            shape_table,
            decoder,
            kernels,
            output: frame,
            param_count,
        })
    }

    /// Visit every learnable array as `(name, shape, data)`, in a fixed order.
    pub fn visit_params(&mut self, visit: &mut ParamVisit<'_>) -> NetResult<()> {
        self.input.visit_params("input", visit)?;
        self.encoder.visit_params(visit)?;
        self.decoder.visit_params(visit)?;
        for (name, head) in HEADS.iter().zip(self.heads.iter_mut()) {
            head.visit_params(&format!("head.{name}"), visit)?;
        }
        Ok(())
    }

    /// `(name, shape)` of every parameter.
    pub fn param_inventory(&mut self) -> NetResult<Vec<(String, Vec<usize>)>> {
        let mut out = Vec::new();
        self.visit_params(&mut |name, shape, _| {
            out.push((name.to_owned(), shape.to_vec()));
            Ok(())
        })?;
        Ok(out)
    }

    /// Snapshot every parameter into a store.
    pub fn export_params(&mut self) -> NetResult<ParamStore> {
        let mut store = ParamStore::new();
        self.visit_params(&mut |name, shape, data| {
            store.insert(name, ParamArray::new(shape.to_vec(), data.to_vec())?);
            Ok(())
        })?;
        Ok(store)
    }

    /// Overwrite every parameter from `store`.
    ///
    /// Every parameter must be present with its exact shape, and the store must not hold
    /// names the network does not know; otherwise nothing is guaranteed about partially
    /// loaded state and the error is [`NetError::Params`].
    #[tracing::instrument(level = "debug", skip_all, fields(arrays = store.len()))]
    pub fn load_params(&mut self, store: &ParamStore) -> NetResult<()> {
        let mut matched = 0usize;
        self.visit_params(&mut |name, shape, data| {
            let array = store
                .get(name)
                .ok_or_else(|| NetError::params(format!("missing parameter '{name}'")))?;
            if array.shape != shape || array.data.len() != data.len() {
                return Err(NetError::params(format!(
                    "'{name}': expected shape {shape:?}, got {:?}",
                    array.shape
                )));
            }
            data.copy_from_slice(&array.data);
            matched += 1;
            Ok(())
        })?;
        if matched != store.len() {
            let mut known = std::collections::BTreeSet::new();
            self.visit_params(&mut |name, _, _| {
                known.insert(name.to_owned());
                Ok(())
            })?;
            let unknown = store.names().find(|n| !known.contains(*n)).unwrap_or_default();
            return Err(NetError::params(format!(
                "store holds {} arrays but the network has {matched}; unknown name '{unknown}'",
                store.len()
            )));
        }
        Ok(())
    }

    /// Restore the deterministic initial parameters.
    pub fn reset_params(&mut self) {
        self.input.reset_params("input");
        self.encoder.reset_params();
        self.decoder.reset_params();
        for (name, head) in HEADS.iter().zip(self.heads.iter_mut()) {
            head.reset_params(&format!("head.{name}"));
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/network/model.rs"]
mod tests;
