//! Arbitrary-precision modular exponentiation for the MODEXP precompile.

use malachite::base::num::arithmetic::traits::{Mod, ModPow};
use malachite::base::num::conversion::traits::PowerOf2Digits;
use malachite::Natural;

/// `base ^ exponent mod modulus`, with the EVM's conventions for the
/// degenerate cases (`mod 0` and `mod 1` give zero).
pub fn modexp(base: Natural, exponent: Natural, modulus: Natural) -> Natural {
    let zero = Natural::from(0u32);
    let one = Natural::from(1u32);

    if modulus == zero || modulus == one {
        return zero;
    }
    if exponent == zero {
        return one;
    }

    let reduced = (&base).mod_op(&modulus);
    if exponent == one || reduced == zero || reduced == one {
        return reduced;
    }

    reduced.mod_pow(&exponent, &modulus)
}

/// Big-endian bytes to a natural number.
pub fn natural_from_big_endian(bytes: &[u8]) -> Natural {
    Natural::from_power_of_2_digits_desc(8, bytes.iter().map(|byte| *byte as u64))
        .unwrap_or_default()
}

/// Natural number to big-endian bytes, left-padded to `size`. Values wider
/// than `size` keep only the low-order bytes.
pub fn natural_to_big_endian(value: &Natural, size: usize) -> Vec<u8> {
    let digits: Vec<u8> = PowerOf2Digits::<u8>::to_power_of_2_digits_desc(value, 8);
    let mut out = vec![0u8; size];
    if digits.len() >= size {
        out.copy_from_slice(&digits[digits.len() - size..]);
    } else {
        out[size - digits.len()..].copy_from_slice(&digits);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_small_values() {
        let result = modexp(
            Natural::from(3u32),
            Natural::from(0xffffu32),
            Natural::from(97u32),
        );
        // 3^65535 mod 97, cross-checked by repeated squaring.
        let mut expected = Natural::from(1u32);
        let mut acc = Natural::from(3u32);
        let mut e = 0xffffu32;
        while e > 0 {
            if e & 1 == 1 {
                expected = (&expected * &acc).mod_op(&Natural::from(97u32));
            }
            acc = (&acc * &acc).mod_op(&Natural::from(97u32));
            e >>= 1;
        }
        assert_eq!(result, expected);
    }

    #[test]
    fn degenerate_cases() {
        let zero = Natural::from(0u32);
        let one = Natural::from(1u32);
        assert_eq!(
            modexp(Natural::from(5u32), Natural::from(10u32), zero.clone()),
            zero
        );
        assert_eq!(
            modexp(Natural::from(5u32), Natural::from(10u32), one.clone()),
            zero
        );
        assert_eq!(
            modexp(Natural::from(5u32), zero.clone(), Natural::from(7u32)),
            one
        );
        // Exponent one reduces the base.
        assert_eq!(
            modexp(Natural::from(12u32), one, Natural::from(7u32)),
            Natural::from(5u32)
        );
    }

    #[test]
    fn byte_round_trip() {
        let value = natural_from_big_endian(&[0x01, 0x00, 0xff]);
        assert_eq!(value, Natural::from(0x100ffu32));
        assert_eq!(natural_to_big_endian(&value, 4), vec![0x00, 0x01, 0x00, 0xff]);
        assert_eq!(natural_to_big_endian(&value, 2), vec![0x00, 0xff]);
    }
}
