//! Bit-exact field codec and command layouts for generic firmware objects.
//!
//! Firmware command buffers pack fields of arbitrary width at fixed bit
//! offsets, most significant bit first. This crate describes those buffers
//! declaratively and reads/writes them through one codec:
//!
//! - [`FieldSpec`] / [`Layout`]: static field tables
//! - [`bitfield`]: `set` / `get` of a single field
//! - [`general`]: generic-object input/output headers and opcodes
//! - [`channel`]: the channel object body

pub mod bitfield;
pub mod channel;
pub mod error;
pub mod general;
pub mod layout;

pub use channel::OBJ_TYPE_TLP_EMU_CHANNEL;
pub use error::{EncodingError, Result};
pub use general::{HEADER_SIZE, OPCODE_CREATE, OPCODE_DESTROY, OPCODE_MODIFY, OPCODE_QUERY};
pub use layout::{FieldSpec, Layout};
