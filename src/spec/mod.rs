//! Block spec grammar: `tok-tok-...[+flag+flag...]`.
//!
//! A spec string is lexed, then parsed into a [`BlockSpec`]: an ordered list of
//! [`OpDescriptor`]s plus a [`BlockFlags`] set. Parsing never touches array data and depends
//! on nothing but its input.

pub(crate) mod ast;
pub(crate) mod error;
pub(crate) mod lexer;
pub(crate) mod parser;

pub use ast::{BlockFlags, BlockSpec, OpDescriptor, OpKind, PadMode, UpsampleAlgo};
pub use parser::parse_block_spec;
