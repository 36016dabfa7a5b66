//! Multi-resolution encoder/decoder built from per-level blocks.
//!
//! Level 0 is the finest resolution. Each level may carry a horizontal block (same level) and
//! a vertical block (from its neighbor); both directions share one base builder and differ
//! only in traversal order and in how the decoder reconciles odd-extent rounding.

mod builder;
mod decoder;
mod encoder;
mod flow;
mod shape_table;

use crate::foundation::error::NetResult;

pub use builder::PyramidLevel;
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use shape_table::ShapeTable;

/// Build a matching encoder/decoder pair and an empty shape table for them.
///
/// The encoder maps `in_channels` to `out_channels` and uses `vertical_down` between levels;
/// the decoder consumes the encoder's outputs (`out_channels` on both sides) and uses
/// `vertical_up`. Every spec is parsed up front, so a bad one fails here with
/// [`crate::NetError::MalformedSpec`].
#[tracing::instrument(level = "debug")]
pub fn build_pyramid(
    in_channels: &[usize],
    out_channels: &[usize],
    horizontal: &str,
    vertical_down: &str,
    vertical_up: &str,
) -> NetResult<(Encoder, Decoder, ShapeTable)> {
    let encoder = Encoder::new(in_channels, out_channels, horizontal, vertical_down)?;
    let decoder = Decoder::new(out_channels, out_channels, horizontal, vertical_up)?;
    Ok((encoder, decoder, ShapeTable::new()))
}

#[cfg(test)]
#[path = "../../tests/unit/pyramid/mod.rs"]
mod tests;
