use crate::block::{Block, join_name};
use crate::foundation::error::{NetError, NetResult};
use crate::layers::ParamVisit;
use crate::spec::parser::parse_block_spec;

use super::flow::Flow;

fn block_name(prefix: &str, edge: &str, level: usize) -> String {
    join_name(prefix, &format!("{edge}.{level}"))
}

/// Traversal order of a pyramid; decides which neighbor feeds each level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Direction {
    /// Ascending level index; level `i` reads from `i - 1`.
    FineToCoarse,
    /// Descending level index; level `i` reads from `i + 1`.
    CoarseToFine,
}

impl Direction {
    pub(crate) fn neighbor(self, level: usize, levels: usize) -> Option<usize> {
        match self {
            Self::FineToCoarse => level.checked_sub(1),
            Self::CoarseToFine => (level + 1 < levels).then_some(level + 1),
        }
    }

    pub(crate) fn order(self, levels: usize) -> Vec<usize> {
        match self {
            Self::FineToCoarse => (0..levels).collect(),
            Self::CoarseToFine => (0..levels).rev().collect(),
        }
    }
}

/// Blocks attached to one level. Both absent means the level is a pass-through.
#[derive(Clone, Debug, PartialEq)]
pub struct PyramidLevel {
    pub in_channels: usize,
    pub out_channels: usize,
    pub horizontal: Option<Block>,
    pub vertical: Option<Block>,
}

/// Shared construction and per-level combination logic for encoder and decoder.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Pyramid {
    direction: Direction,
    prefix: String,
    levels: Vec<PyramidLevel>,
}

impl Pyramid {
    pub(crate) fn build(
        direction: Direction,
        prefix: &str,
        in_channels: &[usize],
        out_channels: &[usize],
        horizontal: &str,
        vertical: &str,
    ) -> NetResult<Self> {
        if in_channels.len() != out_channels.len() {
            return Err(NetError::validation(format!(
                "{prefix}: {} input channel counts but {} output channel counts",
                in_channels.len(),
                out_channels.len()
            )));
        }
        let hor_spec = parse_block_spec(horizontal)?;
        let ver_spec = parse_block_spec(vertical)?;
        let n = out_channels.len();

        let mut levels = Vec::with_capacity(n);
        for level in 0..n {
            let (cin, cout) = (in_channels[level], out_channels[level]);
            let mut slot = PyramidLevel {
                in_channels: cin,
                out_channels: cout,
                horizontal: None,
                vertical: None,
            };
            if cout != 0 {
                if cin != 0 {
                    let mut block =
                        Block::compile(horizontal, hor_spec.clone(), &[cin, cout, cout])?;
                    block.reset_params(&block_name(prefix, "horizontal", level));
                    slot.horizontal = Some(block);
                }
                if let Some(nb) = direction.neighbor(level, n)
                    && out_channels[nb] != 0
                {
                    let mut block =
                        Block::compile(vertical, ver_spec.clone(), &[out_channels[nb], cout, cout])?;
                    block.reset_params(&block_name(prefix, "vertical", level));
                    slot.vertical = Some(block);
                }
            }
            levels.push(slot);
        }

        tracing::debug!(
            prefix,
            levels = n,
            horizontal = levels.iter().filter(|l| l.horizontal.is_some()).count(),
            vertical = levels.iter().filter(|l| l.vertical.is_some()).count(),
            "built pyramid"
        );

        Ok(Self {
            direction,
            prefix: prefix.to_owned(),
            levels,
        })
    }

    pub(crate) fn levels(&self) -> &[PyramidLevel] {
        &self.levels
    }

    pub(crate) fn prefix(&self) -> &str {
        &self.prefix
    }

    pub(crate) fn order(&self) -> Vec<usize> {
        self.direction.order(self.levels.len())
    }

    pub(crate) fn check_arity<T>(&self, inputs: &[Option<T>]) -> NetResult<()> {
        if inputs.len() != self.levels.len() {
            return Err(NetError::validation(format!(
                "{} expects {} level inputs, got {}",
                self.prefix,
                self.levels.len(),
                inputs.len()
            )));
        }
        Ok(())
    }

    /// Horizontal update of `level`; absent values stay absent.
    pub(crate) fn horizontal<F: Flow>(
        &self,
        level: usize,
        value: Option<F::Value>,
    ) -> NetResult<Option<F::Value>> {
        match (&self.levels[level].horizontal, value) {
            (Some(block), Some(v)) => F::apply(block, &v).map(Some),
            (_, v) => Ok(v),
        }
    }

    /// Vertical contribution into `level` from its already processed neighbor.
    pub(crate) fn vertical<F: Flow>(
        &self,
        level: usize,
        values: &[Option<F::Value>],
    ) -> NetResult<Option<F::Value>> {
        let Some(block) = &self.levels[level].vertical else {
            return Ok(None);
        };
        let Some(nb) = self.direction.neighbor(level, self.levels.len()) else {
            return Ok(None);
        };
        let source = values[nb].as_ref().ok_or_else(|| {
            NetError::validation(format!(
                "{}: level {level} needs a value at level {nb}, which is empty",
                self.prefix
            ))
        })?;
        F::apply(block, source).map(Some)
    }

    /// Residual combination; an absent level takes the contribution as is.
    pub(crate) fn combine<F: Flow>(
        value: Option<F::Value>,
        contribution: F::Value,
    ) -> NetResult<F::Value> {
        match value {
            Some(v) => F::add(v, &contribution),
            None => Ok(contribution),
        }
    }

    pub(crate) fn reset_params(&mut self) {
        let prefix = self.prefix.as_str();
        for (level, slot) in self.levels.iter_mut().enumerate() {
            if let Some(block) = slot.horizontal.as_mut() {
                block.reset_params(&block_name(prefix, "horizontal", level));
            }
            if let Some(block) = slot.vertical.as_mut() {
                block.reset_params(&block_name(prefix, "vertical", level));
            }
        }
    }

    pub(crate) fn visit_params(&mut self, visit: &mut ParamVisit<'_>) -> NetResult<()> {
        let prefix = self.prefix.as_str();
        for (level, slot) in self.levels.iter_mut().enumerate() {
            if let Some(block) = slot.horizontal.as_mut() {
                block.visit_params(&block_name(prefix, "horizontal", level), visit)?;
            }
            if let Some(block) = slot.vertical.as_mut() {
                block.visit_params(&block_name(prefix, "vertical", level), visit)?;
            }
        }
        Ok(())
    }
}
