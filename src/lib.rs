//! resep compiles compact block-spec strings into convolutional graphs and assembles them into
//! a separable-kernel frame interpolation network.
//!
//! The layers, bottom up:
//!
//! - [`spec`] parses strings like `"prelu(0.25)-sconv(3)-prelu(0.25)-conv(3)+skip"`
//! - [`compile_block`] turns a spec plus a channel plan into a [`Block`]
//! - [`build_pyramid`] wires blocks into an [`Encoder`]/[`Decoder`] pair that reconcile
//!   odd-extent rounding through an explicitly threaded [`ShapeTable`]
//! - [`Network`] and [`estimate`] run the full interpolation pass on CPU
#![deny(unsafe_code)]

mod foundation;

pub mod block;
pub mod layers;
pub mod network;
pub mod ops;
pub mod params;
pub mod pyramid;
pub mod schedule;
pub mod spec;

pub use crate::foundation::core::{Shape4, Tensor};
pub use crate::foundation::error::{NetError, NetResult};

pub use crate::block::{Block, ShortcutPolicy, compile_block};
pub use crate::network::{
    Interpolator, Network, NetworkConfig, NetworkPlan, estimate, frame_from_image,
    frame_to_image,
};
pub use crate::params::{ParamArray, ParamStore};
pub use crate::pyramid::{Decoder, Encoder, ShapeTable, build_pyramid};
pub use crate::schedule::{
    MidpointStep, interpolate_sequence, interpolate_stream, interpolation_order,
};
pub use crate::spec::{BlockSpec, OpDescriptor, parse_block_spec};
