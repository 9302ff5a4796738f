use crate::error::{EncodingError, Result};

/// Location of one named field inside a command buffer.
///
/// Bits are numbered big-endian: bit 0 is the most significant bit of byte
/// `byte_offset`, and `bit_offset` counts down from there. A field's most
/// significant bit is the first one reached when walking the buffer forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    name: &'static str,
    byte_offset: usize,
    bit_offset: u8,
    bit_width: u32,
}

impl FieldSpec {
    /// Declare a field. Panics (at compile time in `const` tables) when
    /// `bit_offset >= 8` or `bit_width` is outside `1..=64`.
    pub const fn new(
        name: &'static str,
        byte_offset: usize,
        bit_offset: u8,
        bit_width: u32,
    ) -> Self {
        assert!(bit_offset < 8, "bit_offset must be below 8");
        assert!(bit_width >= 1 && bit_width <= 64, "bit_width must be in 1..=64");
        Self {
            name,
            byte_offset,
            bit_offset,
            bit_width,
        }
    }

    /// Declare a field from an absolute bit position, the way firmware
    /// interface headers write them (`reserved_at_60[0x20]`).
    pub const fn at_bit(name: &'static str, bit: usize, bit_width: u32) -> Self {
        Self::new(name, bit / 8, (bit % 8) as u8, bit_width)
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn byte_offset(&self) -> usize {
        self.byte_offset
    }

    pub const fn bit_offset(&self) -> u8 {
        self.bit_offset
    }

    pub const fn bit_width(&self) -> u32 {
        self.bit_width
    }

    /// Absolute index of the field's first (most significant) bit.
    pub const fn start_bit(&self) -> usize {
        self.byte_offset * 8 + self.bit_offset as usize
    }

    /// One past the field's last bit.
    pub const fn end_bit(&self) -> usize {
        self.start_bit() + self.bit_width as usize
    }

    /// Largest value the field can hold.
    pub const fn max_value(&self) -> u64 {
        if self.bit_width == 64 {
            u64::MAX
        } else {
            (1u64 << self.bit_width) - 1
        }
    }

    /// Whether the field fits in a buffer of `len` bytes.
    pub const fn fits(&self, len: usize) -> bool {
        self.end_bit() <= len * 8
    }

    /// Whether two fields claim any common bit.
    pub const fn overlaps(&self, other: &FieldSpec) -> bool {
        self.start_bit() < other.end_bit() && other.start_bit() < self.end_bit()
    }
}

/// A named, fixed-size command buffer layout.
///
/// Reserved ranges are simply not listed; the codec never touches them, so
/// they keep the zero they were allocated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    name: &'static str,
    size: usize,
    fields: &'static [FieldSpec],
}

impl Layout {
    pub const fn new(name: &'static str, size: usize, fields: &'static [FieldSpec]) -> Self {
        Self { name, size, fields }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Size of the buffer this layout describes, in bytes.
    pub const fn size(&self) -> usize {
        self.size
    }

    pub const fn fields(&self) -> &'static [FieldSpec] {
        self.fields
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Allocate a zeroed buffer of this layout's size.
    pub fn zeroed(&self) -> Vec<u8> {
        vec![0u8; self.size]
    }

    /// Check that every field lies inside the layout and that no two fields
    /// share a bit.
    pub fn validate(&self) -> Result<()> {
        for (i, field) in self.fields.iter().enumerate() {
            if !field.fits(self.size) {
                return Err(EncodingError::FieldOutOfBounds {
                    field: field.name,
                    start_bit: field.start_bit(),
                    end_bit: field.end_bit(),
                    buffer_bits: self.size * 8,
                });
            }
            if let Some(other) = self.fields[i + 1..].iter().find(|o| field.overlaps(o)) {
                return Err(EncodingError::OverlappingFields {
                    layout: self.name,
                    first: field.name,
                    second: other.name,
                });
            }
        }
        Ok(())
    }

    /// Reject buffers whose length differs from the declared size.
    pub fn check_len(&self, actual: usize) -> Result<()> {
        if actual != self.size {
            return Err(EncodingError::SizeMismatch {
                layout: self.name,
                expected: self.size,
                actual,
            });
        }
        Ok(())
    }

    /// Reject buffers too short to hold this layout.
    pub fn check_min_len(&self, actual: usize) -> Result<()> {
        if actual < self.size {
            return Err(EncodingError::SizeMismatch {
                layout: self.name,
                expected: self.size,
                actual,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_bit_splits_into_byte_and_bit() {
        let f = FieldSpec::at_bit("x", 0x63, 5);
        assert_eq!(f.byte_offset(), 12);
        assert_eq!(f.bit_offset(), 3);
        assert_eq!(f.start_bit(), 0x63);
        assert_eq!(f.end_bit(), 0x68);
    }

    #[test]
    fn max_value_for_edge_widths() {
        assert_eq!(FieldSpec::new("a", 0, 0, 1).max_value(), 1);
        assert_eq!(FieldSpec::new("b", 0, 0, 32).max_value(), u32::MAX as u64);
        assert_eq!(FieldSpec::new("c", 0, 0, 64).max_value(), u64::MAX);
    }

    #[test]
    #[should_panic]
    fn rejects_bit_offset_of_eight() {
        let _ = FieldSpec::new("bad", 0, std::hint::black_box(8), 4);
    }

    #[test]
    #[should_panic]
    fn rejects_zero_width() {
        let _ = FieldSpec::new("bad", 0, 0, std::hint::black_box(0));
    }

    #[test]
    fn overlap_is_symmetric_and_exclusive_at_edges() {
        let a = FieldSpec::at_bit("a", 0, 8);
        let b = FieldSpec::at_bit("b", 8, 8);
        let c = FieldSpec::at_bit("c", 4, 8);
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&b));
    }

    #[test]
    fn validate_reports_overlap() {
        static FIELDS: [FieldSpec; 2] = [
            FieldSpec::at_bit("lo", 0, 16),
            FieldSpec::at_bit("hi", 8, 16),
        ];
        let layout = Layout::new("broken", 4, &FIELDS);
        assert_eq!(
            layout.validate(),
            Err(EncodingError::OverlappingFields {
                layout: "broken",
                first: "lo",
                second: "hi",
            })
        );
    }

    #[test]
    fn validate_reports_field_past_end() {
        static FIELDS: [FieldSpec; 1] = [FieldSpec::at_bit("tail", 24, 16)];
        let layout = Layout::new("short", 4, &FIELDS);
        assert!(matches!(
            layout.validate(),
            Err(EncodingError::FieldOutOfBounds { field: "tail", .. })
        ));
    }

    #[test]
    fn check_len_and_min_len() {
        static FIELDS: [FieldSpec; 1] = [FieldSpec::at_bit("v", 0, 8)];
        let layout = Layout::new("one", 4, &FIELDS);
        assert!(layout.check_len(4).is_ok());
        assert!(layout.check_len(5).is_err());
        assert!(layout.check_min_len(5).is_ok());
        assert!(layout.check_min_len(3).is_err());
    }
}
