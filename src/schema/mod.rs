//! The recursive parameter model attached to every node's inputs and outputs.
//!
//! Params live in a [`SchemaTree`] arena and are addressed by id. Only `object` and
//! `array-object` params hold children; an `array-object` holds exactly one locked
//! element template whose children are the fields of every array item.

pub mod custom_output;
pub mod naming;
mod param;
mod param_type;
mod tree;

pub use param::{ARRAY_ELEMENT_NAME, FieldErrors, Param, ParamId, RefTarget, ValueSource};
pub use param_type::ParamType;
pub(crate) use tree::{TreeError, strip_index};
pub use tree::SchemaTree;
