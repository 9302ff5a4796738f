//! Channel object body (object type `0x59`).
//!
//! Appended after the generic input header on CREATE and after the generic
//! output header on QUERY. Everything not listed here is reserved and must be
//! zero on the wire.
//!
//! ```text
//! 0x000 ┌────────────────────┬──────────────────────────────┐
//!       │ q_protocol_mode (8)│ reserved                (24) │
//! 0x020 ├────────────────────┴──────────────────────────────┤
//!       │ q_mkey                                       (32) │
//! 0x040 ├───────────────────────────────────────────────────┤
//!       │ q_size                                       (32) │
//! 0x060 ├───────────────────────────────────────────────────┤
//!       │ reserved                                     (32) │
//! 0x080 ├───────────────────────────────────────────────────┤
//!       │ q_addr                                       (64) │
//! 0x0c0 ├─────────────────────────┬─────────────────────────┤
//!       │ reserved           (16) │ stride_index       (16) │
//! 0x0e0 ├─────────────────────────┴─────────────────────────┤
//!       │ reserved                                    (288) │
//! 0x200 └───────────────────────────────────────────────────┘
//! ```

use crate::layout::{FieldSpec, Layout};

/// Object type tag selecting this body layout.
pub const OBJ_TYPE_TLP_EMU_CHANNEL: u16 = 0x0059;

/// Body size in bytes.
pub const BODY_SIZE: usize = 0x200 / 8;

pub const Q_PROTOCOL_MODE: FieldSpec = FieldSpec::at_bit("q_protocol_mode", 0x00, 8);
pub const Q_MKEY: FieldSpec = FieldSpec::at_bit("q_mkey", 0x20, 32);
pub const Q_SIZE: FieldSpec = FieldSpec::at_bit("q_size", 0x40, 32);
pub const Q_ADDR: FieldSpec = FieldSpec::at_bit("q_addr", 0x80, 64);
pub const STRIDE_INDEX: FieldSpec = FieldSpec::at_bit("tlp_channel_stride_index", 0xd0, 16);

pub const BODY: Layout = Layout::new(
    "tlp_emu_channel",
    BODY_SIZE,
    &[Q_PROTOCOL_MODE, Q_MKEY, Q_SIZE, Q_ADDR, STRIDE_INDEX],
);
