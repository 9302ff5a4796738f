use crate::error::{EncodingError, Result};
use crate::layout::FieldSpec;

/// Write `value` into the bits `spec` describes.
///
/// Bits outside the field are preserved, so narrow fields sharing a byte can
/// be written in any order.
///
/// ```text
///   byte_offset          byte_offset + 1
///  ┌─┬─┬─┬─┬─┬─┬─┬─┐    ┌─┬─┬─┬─┬─┬─┬─┬─┐
///  │ │ │ │M│ │ │ │ │    │ │ │L│ │ │ │ │ │     bit_offset = 3, bit_width = 7
///  └─┴─┴─┴─┴─┴─┴─┴─┘    └─┴─┴─┴─┴─┴─┴─┴─┘     M = field MSB, L = field LSB
/// ```
pub fn set(buf: &mut [u8], spec: &FieldSpec, value: u64) -> Result<()> {
    check_bounds(buf.len(), spec)?;
    if value > spec.max_value() {
        return Err(EncodingError::ValueOverflow {
            field: spec.name(),
            value,
            width: spec.bit_width(),
        });
    }

    let mut pos = spec.start_bit();
    let mut remaining = spec.bit_width();
    while remaining > 0 {
        let (byte, take, shift) = chunk(pos, remaining);
        let mask = low_mask(take) << shift;
        let bits = ((value >> (remaining - take)) as u8 & low_mask(take)) << shift;
        buf[byte] = (buf[byte] & !mask) | bits;
        pos += take as usize;
        remaining -= take;
    }
    Ok(())
}

/// Read the bits `spec` describes as an unsigned integer.
pub fn get(buf: &[u8], spec: &FieldSpec) -> Result<u64> {
    check_bounds(buf.len(), spec)?;

    let mut pos = spec.start_bit();
    let mut remaining = spec.bit_width();
    let mut value = 0u64;
    while remaining > 0 {
        let (byte, take, shift) = chunk(pos, remaining);
        let bits = (buf[byte] >> shift) & low_mask(take);
        // `take` is 8 at most, and a 64-bit field never shifts out set bits.
        value = (value << take) | u64::from(bits);
        pos += take as usize;
        remaining -= take;
    }
    Ok(value)
}

/// Write a value that must fit the field's width exactly, e.g. a `u16` into
/// a 16-bit field.
pub fn set_u8(buf: &mut [u8], spec: &FieldSpec, value: u8) -> Result<()> {
    set(buf, spec, u64::from(value))
}

pub fn set_u16(buf: &mut [u8], spec: &FieldSpec, value: u16) -> Result<()> {
    set(buf, spec, u64::from(value))
}

pub fn set_u32(buf: &mut [u8], spec: &FieldSpec, value: u32) -> Result<()> {
    set(buf, spec, u64::from(value))
}

/// Read a field no wider than 8 bits.
pub fn get_u8(buf: &[u8], spec: &FieldSpec) -> Result<u8> {
    narrow(spec, get(buf, spec)?)
}

/// Read a field no wider than 16 bits.
pub fn get_u16(buf: &[u8], spec: &FieldSpec) -> Result<u16> {
    narrow(spec, get(buf, spec)?)
}

/// Read a field no wider than 32 bits.
pub fn get_u32(buf: &[u8], spec: &FieldSpec) -> Result<u32> {
    narrow(spec, get(buf, spec)?)
}

fn narrow<T: TryFrom<u64>>(spec: &FieldSpec, value: u64) -> Result<T> {
    T::try_from(value).map_err(|_| EncodingError::ValueOverflow {
        field: spec.name(),
        value,
        width: (std::mem::size_of::<T>() * 8) as u32,
    })
}

fn check_bounds(len: usize, spec: &FieldSpec) -> Result<()> {
    if !spec.fits(len) {
        return Err(EncodingError::FieldOutOfBounds {
            field: spec.name(),
            start_bit: spec.start_bit(),
            end_bit: spec.end_bit(),
            buffer_bits: len * 8,
        });
    }
    Ok(())
}

/// Split the next run of a field at absolute bit `pos` into
/// `(byte index, bits taken from this byte, right shift of the run)`.
fn chunk(pos: usize, remaining: u32) -> (usize, u32, u32) {
    let within = (pos % 8) as u32;
    let take = (8 - within).min(remaining);
    (pos / 8, take, 8 - within - take)
}

fn low_mask(bits: u32) -> u8 {
    ((1u16 << bits) - 1) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_aligned_fields_are_big_endian() {
        let mut buf = [0u8; 16];
        set(&mut buf, &FieldSpec::at_bit("w16", 0, 16), 0x0a00).unwrap();
        set(&mut buf, &FieldSpec::at_bit("w32", 0x20, 32), 0xE1E1_0102).unwrap();
        set(&mut buf, &FieldSpec::at_bit("w64", 0x40, 64), 0x0102_0304_0506_0708).unwrap();

        assert_eq!(&buf[0..2], &[0x0a, 0x00]);
        assert_eq!(&buf[4..8], &[0xE1, 0xE1, 0x01, 0x02]);
        assert_eq!(&buf[8..16], &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn sub_byte_field_lands_below_msb() {
        let mut buf = [0u8; 1];
        set(&mut buf, &FieldSpec::new("nib", 0, 2, 4), 0b1011).unwrap();
        assert_eq!(buf[0], 0b0010_1100);
        assert_eq!(get(&buf, &FieldSpec::new("nib", 0, 2, 4)).unwrap(), 0b1011);
    }

    #[test]
    fn unaligned_field_spans_three_bytes() {
        let spec = FieldSpec::new("odd", 0, 3, 14);
        let mut buf = [0u8; 3];
        set(&mut buf, &spec, 0x3FFF).unwrap();
        assert_eq!(buf, [0b0001_1111, 0b1111_1111, 0b1000_0000]);
        assert_eq!(get(&buf, &spec).unwrap(), 0x3FFF);
    }

    #[test]
    fn neighbouring_bits_are_preserved() {
        let spec = FieldSpec::new("mid", 1, 3, 6);
        let mut buf = [0xFFu8; 3];
        set(&mut buf, &spec, 0).unwrap();
        assert_eq!(buf, [0xFF, 0b1110_0000, 0b0111_1111]);
    }

    #[test]
    fn full_width_u64_roundtrips() {
        let spec = FieldSpec::new("wide", 1, 5, 64);
        let mut buf = [0u8; 10];
        set(&mut buf, &spec, u64::MAX - 7).unwrap();
        assert_eq!(get(&buf, &spec).unwrap(), u64::MAX - 7);
    }

    #[test]
    fn overflow_is_rejected_without_touching_buffer() {
        let spec = FieldSpec::at_bit("mode", 0, 8);
        let mut buf = [0x5Au8; 4];
        let err = set(&mut buf, &spec, 0x100).unwrap_err();
        assert!(matches!(err, EncodingError::ValueOverflow { width: 8, .. }));
        assert_eq!(buf, [0x5A; 4]);
    }

    #[test]
    fn out_of_bounds_read_and_write() {
        let spec = FieldSpec::at_bit("tail", 0x18, 16);
        let mut buf = [0u8; 4];
        assert!(matches!(
            set(&mut buf, &spec, 1),
            Err(EncodingError::FieldOutOfBounds { buffer_bits: 32, .. })
        ));
        assert!(matches!(
            get(&buf, &spec),
            Err(EncodingError::FieldOutOfBounds { end_bit: 0x28, .. })
        ));
    }

    #[test]
    fn field_ending_exactly_at_buffer_end_is_accepted() {
        let spec = FieldSpec::at_bit("last", 0x10, 16);
        let mut buf = [0u8; 4];
        set_u16(&mut buf, &spec, 0xBEEF).unwrap();
        assert_eq!(get_u16(&buf, &spec).unwrap(), 0xBEEF);
    }

    #[test]
    fn narrow_getters_reject_wider_fields() {
        let buf = [0xFFu8; 8];
        let spec = FieldSpec::at_bit("wide", 0, 40);
        assert!(get_u32(&buf, &spec).is_err());
        assert_eq!(get_u8(&buf, &FieldSpec::at_bit("b", 0, 8)).unwrap(), 0xFF);
    }

    #[test]
    fn every_single_bit_position_is_isolated() {
        for start in 0..16 {
            let spec = FieldSpec::at_bit("bit", start, 1);
            let mut buf = [0u8; 2];
            set(&mut buf, &spec, 1).unwrap();
            let word = u16::from_be_bytes(buf);
            assert_eq!(word, 0x8000 >> start, "bit {start}");
        }
    }
}
