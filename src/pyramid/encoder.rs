use crate::foundation::core::{Shape4, Tensor};
use crate::foundation::error::NetResult;
use crate::layers::ParamVisit;

use super::builder::{Direction, Pyramid, PyramidLevel};
use super::flow::{Eval, Flow, Infer};
use super::shape_table::ShapeTable;

/// Finest-to-coarsest pyramid pass. Level `i` receives a vertical contribution from `i - 1`.
#[derive(Clone, Debug, PartialEq)]
pub struct Encoder {
    pyramid: Pyramid,
}

impl Encoder {
    /// Encoder whose parameters are named under `encoder.`.
    pub fn new(
        in_channels: &[usize],
        out_channels: &[usize],
        horizontal: &str,
        vertical: &str,
    ) -> NetResult<Self> {
        Self::with_prefix("encoder", in_channels, out_channels, horizontal, vertical)
    }

    pub fn with_prefix(
        prefix: &str,
        in_channels: &[usize],
        out_channels: &[usize],
        horizontal: &str,
        vertical: &str,
    ) -> NetResult<Self> {
        Ok(Self {
            pyramid: Pyramid::build(
                Direction::FineToCoarse,
                prefix,
                in_channels,
                out_channels,
                horizontal,
                vertical,
            )?,
        })
    }

    pub fn levels(&self) -> &[PyramidLevel] {
        self.pyramid.levels()
    }

    /// Run the pass and record every populated level's final shape into `table`.
    ///
    /// `inputs` holds one optional tensor per level; levels without an input and without a
    /// vertical contribution stay empty in the result.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(prefix = self.pyramid.prefix(), levels = inputs.len())
    )]
    pub fn forward(
        &self,
        inputs: Vec<Option<Tensor>>,
        table: &mut ShapeTable,
    ) -> NetResult<Vec<Option<Tensor>>> {
        self.run::<Eval>(inputs, table)
    }

    /// Same traversal on shapes only. Records into `table` exactly like [`Encoder::forward`].
    pub fn output_shapes(
        &self,
        inputs: &[Option<Shape4>],
        table: &mut ShapeTable,
    ) -> NetResult<Vec<Option<Shape4>>> {
        self.run::<Infer>(inputs.to_vec(), table)
    }

    fn run<F: Flow>(
        &self,
        inputs: Vec<Option<F::Value>>,
        table: &mut ShapeTable,
    ) -> NetResult<Vec<Option<F::Value>>> {
        self.pyramid.check_arity(&inputs)?;
        let mut values = inputs;
        for level in self.pyramid.order() {
            let current = self.pyramid.horizontal::<F>(level, values[level].take())?;
            let current = match self.pyramid.vertical::<F>(level, &values)? {
                Some(contribution) => Some(Pyramid::combine::<F>(current, contribution)?),
                None => current,
            };
            if let Some(v) = &current {
                let shape = F::shape(v);
                tracing::trace!(level, %shape, "encoded level");
                table.record(level, shape);
            }
            values[level] = current;
        }
        Ok(values)
    }

    pub fn reset_params(&mut self) {
        self.pyramid.reset_params();
    }

    pub fn visit_params(&mut self, visit: &mut ParamVisit<'_>) -> NetResult<()> {
        self.pyramid.visit_params(visit)
    }
}
