//! Bit flag analysis: decode mask literals and derive the shift each flag
//! accessor needs.
//!
//! A flag occupies a contiguous span of bits inside a primitive attribute.
//! The reference semantics for generated accessors are
//! `get = (storage & mask) >> shift` and
//! `set = (storage & !mask) | ((value << shift) & mask)`; the final `& mask`
//! keeps an oversized value from spilling into neighbouring flags.

use crate::model::PrimitiveType;

/// Decode a textual mask literal, decimal or hex ("31", "0x1F").
pub fn decode_mask(text: &str) -> Option<u64> {
    let t = text.trim();
    if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else {
        t.parse::<u64>().ok()
    }
}

fn width_mask(ty: PrimitiveType) -> u64 {
    match ty.bit_width() {
        64 => u64::MAX,
        w => (1u64 << w) - 1,
    }
}

/// Number of bits to shift so the lowest set bit of `mask` lands at bit
/// zero. Bits beyond the type's width are ignored; a zero or undecodable
/// mask shifts by 0.
pub fn shift_for(ty: PrimitiveType, mask: &str) -> u32 {
    let m = decode_mask(mask).unwrap_or(0) & width_mask(ty);
    if m == 0 {
        0
    } else {
        m.trailing_zeros()
    }
}

/// Read a flag value out of `storage`.
pub fn extract(ty: PrimitiveType, mask: &str, storage: u64) -> u64 {
    let m = decode_mask(mask).unwrap_or(0) & width_mask(ty);
    if m == 0 {
        return 0;
    }
    (storage & m) >> m.trailing_zeros()
}

/// Write a flag value into `storage`: the field is cleared first, and bits
/// of `value` that do not fit the field are discarded.
pub fn insert(ty: PrimitiveType, mask: &str, storage: u64, value: u64) -> u64 {
    let m = decode_mask(mask).unwrap_or(0) & width_mask(ty);
    if m == 0 {
        return storage;
    }
    let shift = m.trailing_zeros();
    let field = value & (m >> shift);
    (storage & !m) | (field << shift)
}
