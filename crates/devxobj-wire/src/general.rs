//! Generic-object command headers.
//!
//! Every generic-object command starts with a 16-byte input header and
//! answers with a 16-byte output header. Object-specific bodies follow the
//! header on CREATE input and QUERY output.
//!
//! ```text
//! input header (general_obj_in_cmd_hdr)
//! 0x00 ┌──────────────────┬──────────────────┐
//!      │ opcode      (16) │ uid         (16) │
//! 0x20 ├──────────────────┼──────────────────┤
//!      │ vhca_tunnel (16) │ obj_type    (16) │
//! 0x40 ├──────────────────┴──────────────────┤
//!      │ obj_id                         (32) │
//! 0x60 ├─────────────────────────────────────┤
//!      │ reserved                       (32) │
//! 0x80 ├─────────────────────────────────────┤
//!      │ op_param                       (64) │
//!      └─────────────────────────────────────┘
//!
//! output header (general_obj_out_cmd_hdr)
//! 0x00 ┌────────────┬────────────────────────┐
//!      │ status (8) │ reserved          (24) │
//! 0x20 ├────────────┴────────────────────────┤
//!      │ syndrome                       (32) │
//! 0x40 ├─────────────────────────────────────┤
//!      │ obj_id                         (32) │
//! 0x60 ├─────────────────────────────────────┤
//!      │ reserved                       (32) │
//!      └─────────────────────────────────────┘
//! ```

use crate::layout::{FieldSpec, Layout};

/// Create a general object.
pub const OPCODE_CREATE: u16 = 0x0a00;
/// Modify a general object. Declared for completeness; not issued by this
/// workspace.
pub const OPCODE_MODIFY: u16 = 0x0a01;
/// Query a general object.
pub const OPCODE_QUERY: u16 = 0x0a02;
/// Destroy a general object.
pub const OPCODE_DESTROY: u16 = 0x0a03;

/// Size of both the input and the output header, in bytes.
pub const HEADER_SIZE: usize = 16;

/// Input header fields.
pub mod input {
    use super::FieldSpec;

    pub const OPCODE: FieldSpec = FieldSpec::at_bit("opcode", 0x00, 16);
    pub const UID: FieldSpec = FieldSpec::at_bit("uid", 0x10, 16);
    pub const VHCA_TUNNEL_ID: FieldSpec = FieldSpec::at_bit("vhca_tunnel_id", 0x20, 16);
    pub const OBJ_TYPE: FieldSpec = FieldSpec::at_bit("obj_type", 0x30, 16);
    pub const OBJ_ID: FieldSpec = FieldSpec::at_bit("obj_id", 0x40, 32);
    pub const OP_PARAM: FieldSpec = FieldSpec::at_bit("op_param", 0x80, 64);
}

/// Output header fields.
pub mod output {
    use super::FieldSpec;

    pub const STATUS: FieldSpec = FieldSpec::at_bit("status", 0x00, 8);
    pub const SYNDROME: FieldSpec = FieldSpec::at_bit("syndrome", 0x20, 32);
    pub const OBJ_ID: FieldSpec = FieldSpec::at_bit("obj_id", 0x40, 32);
}

/// Input header as sent by CREATE, QUERY and DESTROY.
pub const IN_HEADER: Layout = Layout::new(
    "general_obj_in_cmd_hdr",
    HEADER_SIZE,
    &[
        input::OPCODE,
        input::UID,
        input::VHCA_TUNNEL_ID,
        input::OBJ_TYPE,
        input::OBJ_ID,
        input::OP_PARAM,
    ],
);

/// Output header as returned by CREATE, QUERY and DESTROY.
pub const OUT_HEADER: Layout = Layout::new(
    "general_obj_out_cmd_hdr",
    HEADER_SIZE,
    &[output::STATUS, output::SYNDROME, output::OBJ_ID],
);

/// Human-readable opcode name for diagnostics.
pub fn opcode_name(opcode: u16) -> &'static str {
    match opcode {
        OPCODE_CREATE => "CREATE_GENERAL_OBJECT",
        OPCODE_MODIFY => "MODIFY_GENERAL_OBJECT",
        OPCODE_QUERY => "QUERY_GENERAL_OBJECT",
        OPCODE_DESTROY => "DESTROY_GENERAL_OBJECT",
        _ => "UNKNOWN",
    }
}
