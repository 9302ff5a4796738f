/// Errors raised while reading or writing command buffer fields.
///
/// Every variant is a local invariant violation: the layout tables and the
/// buffers they address are under this crate's control, so none of these are
/// recoverable by retrying.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    /// The field's bit range does not fit inside the buffer.
    #[error("field {field} (bits {start_bit}..{end_bit}) exceeds buffer of {buffer_bits} bits")]
    FieldOutOfBounds {
        field: &'static str,
        start_bit: usize,
        end_bit: usize,
        buffer_bits: usize,
    },

    /// The value needs more bits than the field provides.
    #[error("value {value:#x} does not fit in {width}-bit field {field}")]
    ValueOverflow {
        field: &'static str,
        value: u64,
        width: u32,
    },

    /// Two fields of the same layout claim the same bits.
    #[error("layout {layout}: fields {first} and {second} overlap")]
    OverlappingFields {
        layout: &'static str,
        first: &'static str,
        second: &'static str,
    },

    /// A buffer does not have the size its layout declares.
    #[error("layout {layout} expects {expected} bytes, buffer has {actual}")]
    SizeMismatch {
        layout: &'static str,
        expected: usize,
        actual: usize,
    },
}

pub type Result<T> = std::result::Result<T, EncodingError>;
