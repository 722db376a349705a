//! Layout-driven field decoding
//!
//! USB descriptors are packed little-endian records. A layout string names
//! the width of each field in order:
//!
//! ```text
//! b  u8
//! w  u16 (little-endian)
//! W  u16 (little-endian, alias kept for aligned-word layouts)
//! d  u32 (little-endian)
//! ```
//!
//! Every field is widened to `u32` so a single `Vec` can carry any record.

use crate::error::{DescriptorError, Result};
use byteorder::{ByteOrder, LittleEndian};

/// Width in bytes of a single layout letter
fn field_width(c: char) -> Result<usize> {
    match c {
        'b' => Ok(1),
        'w' | 'W' => Ok(2),
        'd' => Ok(4),
        other => Err(DescriptorError::InvalidLayout(other)),
    }
}

/// Total number of bytes a layout describes
pub fn layout_len(layout: &str) -> Result<usize> {
    layout.chars().map(field_width).sum()
}

/// Decode `bytes` according to `layout`
///
/// Bytes past the end of the layout are ignored.
///
/// # Example
/// ```
/// use descriptor::parse_fields;
///
/// let fields = parse_fields(&[0x09, 0x02, 0x20, 0x00], "bbw").unwrap();
/// assert_eq!(fields, vec![9, 2, 32]);
/// ```
pub fn parse_fields(bytes: &[u8], layout: &str) -> Result<Vec<u32>> {
    let needed = layout_len(layout)?;
    if bytes.len() < needed {
        return Err(DescriptorError::BufferTooSmall {
            needed,
            available: bytes.len(),
        });
    }

    let mut fields = Vec::with_capacity(layout.len());
    let mut offset = 0;
    for c in layout.chars() {
        let value = match c {
            'b' => u32::from(bytes[offset]),
            'w' | 'W' => u32::from(LittleEndian::read_u16(&bytes[offset..])),
            'd' => LittleEndian::read_u32(&bytes[offset..]),
            other => return Err(DescriptorError::InvalidLayout(other)),
        };
        fields.push(value);
        offset += field_width(c)?;
    }

    Ok(fields)
}

/// Encode `values` according to `layout`
///
/// Values wider than their field are truncated to the field width.
pub fn encode_fields(values: &[u32], layout: &str) -> Result<Vec<u8>> {
    let expected = layout.chars().count();
    if values.len() != expected {
        return Err(DescriptorError::FieldCount {
            expected,
            actual: values.len(),
        });
    }

    let mut out = vec![0u8; layout_len(layout)?];
    let mut offset = 0;
    for (c, value) in layout.chars().zip(values) {
        match c {
            'b' => out[offset] = *value as u8,
            'w' | 'W' => LittleEndian::write_u16(&mut out[offset..], *value as u16),
            'd' => LittleEndian::write_u32(&mut out[offset..], *value),
            other => return Err(DescriptorError::InvalidLayout(other)),
        }
        offset += field_width(c)?;
    }

    Ok(out)
}
