use crate::foundation::core::{Shape4, Tensor};
use crate::foundation::error::{NetError, NetResult};
use crate::layers::ParamVisit;

use super::builder::{Direction, Pyramid, PyramidLevel};
use super::flow::{Eval, Flow, Infer};
use super::shape_table::ShapeTable;

/// Coarsest-to-finest pyramid pass. Level `i` receives a vertical contribution from `i + 1`,
/// reconciled against the shape the encoder recorded for level `i`.
#[derive(Clone, Debug, PartialEq)]
pub struct Decoder {
    pyramid: Pyramid,
}

impl Decoder {
    /// Decoder whose parameters are named under `decoder.`.
    pub fn new(
        in_channels: &[usize],
        out_channels: &[usize],
        horizontal: &str,
        vertical: &str,
    ) -> NetResult<Self> {
        Self::with_prefix("decoder", in_channels, out_channels, horizontal, vertical)
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
                Direction::CoarseToFine,
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

    /// Run the pass against the shapes recorded by the matching encoder call.
    ///
    /// Fails with [`NetError::MissingShapeRecord`] when a level that receives a vertical
    /// contribution has no entry in `table`, and with [`NetError::ShapeReconciliation`] when
    /// a contribution is off by more than one trailing row or column.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(prefix = self.pyramid.prefix(), levels = inputs.len())
    )]
    pub fn forward(
        &self,
        inputs: Vec<Option<Tensor>>,
        table: &ShapeTable,
    ) -> NetResult<Vec<Option<Tensor>>> {
        self.run::<Eval>(inputs, table)
    }

    /// Same traversal on shapes only.
    pub fn output_shapes(
        &self,
        inputs: &[Option<Shape4>],
        table: &ShapeTable,
    ) -> NetResult<Vec<Option<Shape4>>> {
        self.run::<Infer>(inputs.to_vec(), table)
    }

    fn run<F: Flow>(
        &self,
        inputs: Vec<Option<F::Value>>,
        table: &ShapeTable,
    ) -> NetResult<Vec<Option<F::Value>>> {
        self.pyramid.check_arity(&inputs)?;
        let mut values = inputs;
        for level in self.pyramid.order() {
            let current = self.pyramid.horizontal::<F>(level, values[level].take())?;
            let current = match self.pyramid.vertical::<F>(level, &values)? {
                Some(contribution) => {
                    let expected = table
                        .get(level)
                        .ok_or(NetError::MissingShapeRecord { level })?;
                    let contribution = reconcile::<F>(level, contribution, expected)?;
                    Some(Pyramid::combine::<F>(current, contribution)?)
                }
                None => current,
            };
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

/// Drop one trailing row and/or column introduced by rounding up an odd extent.
fn reconcile<F: Flow>(
    level: usize,
    contribution: F::Value,
    expected: Shape4,
) -> NetResult<F::Value> {
    let found = F::shape(&contribution);
    let fits = |have: usize, want: usize| have == want || have == want + 1;
    if !fits(found.height, expected.height) || !fits(found.width, expected.width) {
        return Err(NetError::ShapeReconciliation {
            level,
            expected,
            found,
        });
    }
    if (found.height, found.width) == (expected.height, expected.width) {
        return Ok(contribution);
    }
    tracing::debug!(level, %found, %expected, "cropping vertical contribution");
    F::crop(contribution, expected.height, expected.width)
}
