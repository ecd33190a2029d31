/*!
 * Checksum PIN generation
 *
 * Every 4-digit base 0000-9999 gets one trailing check digit computed with the
 * weights 3,1,3,1. External verifiers validate PINs with the same formula, so
 * the computation is fixed and must not change.
 *
 * The PIN list is followed by a small supplementary set of 7-digit codes taken
 * at a fixed stride.
 */

use rayon::prelude::*;

/// Number of 4-digit bases.
pub const BASE_COUNT: u32 = 10_000;

/// Number of supplementary 7-digit codes.
pub const SUPPLEMENTARY_COUNT: u32 = 1_000;

/// Stride between supplementary codes.
pub const SUPPLEMENTARY_STRIDE: u32 = 11;

const WEIGHTS: [u32; 4] = [3, 1, 3, 1];

/// Check digit for a 4-digit base given as digit values.
#[inline]
pub fn checksum_digit(digits: [u8; 4]) -> u8 {
    let acc: u32 = digits
        .iter()
        .zip(WEIGHTS)
        .map(|(&d, w)| d as u32 * w)
        .sum();
    ((10 - acc % 10) % 10) as u8
}

/// Check digit for a numeric base in `0..10_000`.
pub fn checksum_for_base(base: u32) -> u8 {
    debug_assert!(base < BASE_COUNT);
    let digits = [
        (base / 1000 % 10) as u8,
        (base / 100 % 10) as u8,
        (base / 10 % 10) as u8,
        (base % 10) as u8,
    ];
    checksum_digit(digits)
}

/// Full PIN (base followed by its check digit) for a numeric base.
///
/// `pin_for_base(1234) == "12342"`.
pub fn pin_for_base(base: u32) -> String {
    format!("{:04}{}", base, checksum_for_base(base))
}

/// Returns true when `pin` is four digits followed by their check digit.
pub fn is_valid_pin(pin: &str) -> bool {
    let bytes = pin.as_bytes();
    if bytes.len() != 5 || !bytes.iter().all(u8::is_ascii_digit) {
        return false;
    }

    let digits = [
        bytes[0] - b'0',
        bytes[1] - b'0',
        bytes[2] - b'0',
        bytes[3] - b'0',
    ];
    checksum_digit(digits) == bytes[4] - b'0'
}

/// All checksum PINs in base order (0000x .. 9999x).
pub fn checksum_pins() -> Vec<String> {
    (0..BASE_COUNT).into_par_iter().map(pin_for_base).collect()
}

/// Supplementary 7-digit codes: 0000000, 0000011, 0000022, ...
pub fn supplementary_codes() -> Vec<String> {
    (0..SUPPLEMENTARY_COUNT)
        .into_par_iter()
        .map(|i| format!("{:07}", i * SUPPLEMENTARY_STRIDE))
        .collect()
}

/// PIN stage candidates: every checksum PIN, then the supplementary codes.
pub fn generate_pins() -> Vec<String> {
    let mut pins = checksum_pins();
    pins.extend(supplementary_codes());
    pins
}
