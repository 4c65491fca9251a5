//! IBM mainframe floating-point conversion and missing-value markers.
//!
//! XPT stores numerics as 8-byte big-endian IBM hexadecimal floats:
//! sign bit, 7-bit base-16 exponent biased by 64, 56-bit fraction with no
//! implicit leading bit. Missing values reuse the numeric slot with a marker
//! byte followed by zeros.

use crate::types::MissingValue;

/// Convert an 8-byte IBM hexadecimal float to an IEEE 754 double.
///
/// The `u64 -> f64` cast rounds the 56-bit fraction to nearest, which is the
/// correct IEEE rounding for the three bits that cannot be represented.
pub fn ibm_to_ieee(bytes: [u8; 8]) -> f64 {
    let ibm = u64::from_be_bytes(bytes);
    let mantissa = ibm & 0x00ff_ffff_ffff_ffff;
    if mantissa == 0 {
        return 0.0;
    }
    let sign = if ibm & 0x8000_0000_0000_0000 != 0 {
        -1.0
    } else {
        1.0
    };
    let exponent = ((ibm >> 56) & 0x7f) as i32;
    // value = mantissa/2^56 * 16^(exponent-64)
    sign * (mantissa as f64) * 2.0_f64.powi(4 * (exponent - 64) - 56)
}

/// Convert an IEEE 754 double to an 8-byte IBM hexadecimal float.
///
/// Exact for every finite double whose base-16 exponent fits the IBM range;
/// larger magnitudes clamp to the largest representable value and smaller
/// ones underflow to zero.
pub fn ieee_to_ibm(value: f64) -> [u8; 8] {
    if value == 0.0 || !value.is_finite() {
        return [0u8; 8];
    }
    let bits = value.to_bits();
    let sign = bits & 0x8000_0000_0000_0000;
    let exp2 = ((bits >> 52) & 0x7ff) as i64 - 1023;
    let mantissa53 = 0x0010_0000_0000_0000_u64 | (bits & 0x000f_ffff_ffff_ffff);

    // Split the power of two as 2^exp2 = 16^q * 2^r with r in 0..4, so the
    // IBM fraction becomes mantissa53 << r and the exponent q+1+64.
    let q = exp2.div_euclid(4);
    let r = exp2.rem_euclid(4);
    let ibm_exp = q + 1 + 64;
    if ibm_exp > 127 {
        return (sign | 0x7fff_ffff_ffff_ffff).to_be_bytes();
    }
    if ibm_exp < 0 {
        return [0u8; 8];
    }
    let ibm = sign | ((ibm_exp as u64) << 56) | (mantissa53 << r);
    ibm.to_be_bytes()
}

/// Detect a SAS missing-value marker in a numeric field.
///
/// A field is missing when its first byte is `.`, `_`, or `A`-`Z` and every
/// remaining byte is zero. Anything else is a regular IBM float.
pub fn is_missing(bytes: &[u8]) -> Option<MissingValue> {
    if bytes.is_empty() || bytes[1..].iter().any(|&b| b != 0) {
        return None;
    }
    match bytes[0] {
        b'.' => Some(MissingValue::Standard),
        b'_' => Some(MissingValue::Underscore),
        c @ b'A'..=b'Z' => Some(MissingValue::Special(c as char)),
        _ => None,
    }
}

/// Encode a missing value as its 8-byte field representation.
pub fn missing_bytes(missing: MissingValue) -> [u8; 8] {
    let mut bytes = [0u8; 8];
    bytes[0] = missing.marker_byte();
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_values() {
        assert_eq!(ibm_to_ieee([0x41, 0x10, 0, 0, 0, 0, 0, 0]), 1.0);
        assert_eq!(ibm_to_ieee([0x41, 0x20, 0, 0, 0, 0, 0, 0]), 2.0);
        assert_eq!(ibm_to_ieee([0x40, 0x80, 0, 0, 0, 0, 0, 0]), 0.5);
        assert_eq!(ibm_to_ieee([0xc1, 0x10, 0, 0, 0, 0, 0, 0]), -1.0);
        assert_eq!(ibm_to_ieee([0u8; 8]), 0.0);
    }

    #[test]
    fn test_encode_known_values() {
        assert_eq!(ieee_to_ibm(1.0), [0x41, 0x10, 0, 0, 0, 0, 0, 0]);
        assert_eq!(ieee_to_ibm(-1.0), [0xc1, 0x10, 0, 0, 0, 0, 0, 0]);
        assert_eq!(ieee_to_ibm(0.0), [0u8; 8]);
    }

    #[test]
    fn test_missing_markers() {
        assert_eq!(
            is_missing(&[0x2e, 0, 0, 0, 0, 0, 0, 0]),
            Some(MissingValue::Standard)
        );
        assert_eq!(
            is_missing(&[0x5f, 0, 0, 0, 0, 0, 0, 0]),
            Some(MissingValue::Underscore)
        );
        assert_eq!(
            is_missing(&[0x41, 0, 0, 0, 0, 0, 0, 0]),
            Some(MissingValue::Special('A'))
        );
        // Nonzero tail means a real number, not a marker.
        assert_eq!(is_missing(&[0x41, 0x10, 0, 0, 0, 0, 0, 0]), None);
        assert_eq!(is_missing(&[0u8; 8]), None);
    }

    #[test]
    fn test_missing_bytes_roundtrip() {
        for missing in [
            MissingValue::Standard,
            MissingValue::Underscore,
            MissingValue::Special('Q'),
        ] {
            assert_eq!(is_missing(&missing_bytes(missing)), Some(missing));
        }
    }

    proptest! {
        #[test]
        fn roundtrip_integers(v in -1_000_000_000i64..1_000_000_000i64) {
            let value = v as f64;
            prop_assert_eq!(ibm_to_ieee(ieee_to_ibm(value)), value);
        }

        #[test]
        fn roundtrip_scaled_doubles(m in -(1i64 << 53)..(1i64 << 53), e in -40i32..40) {
            // Every double inside the IBM exponent range converts exactly.
            let value = (m as f64) * 2.0_f64.powi(e);
            prop_assert_eq!(ibm_to_ieee(ieee_to_ibm(value)), value);
        }
    }
}
