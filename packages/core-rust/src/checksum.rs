//! ISO/IEC 7064 MOD 11,10 check digits, as used by the Croatian personal
//! identification number (OIB).
//!
//! The running value starts at 10. For each of the first ten digits: add the
//! digit, reduce mod 10 (treating 0 as 10), double, reduce mod 11. The check
//! digit is `11 - running`, with 10 mapped to 0.

/// Number of digits in an OIB, including the check digit.
pub const OIB_LENGTH: usize = 11;

/// Computes the MOD 11,10 check digit for a run of decimal digits.
///
/// Returns `None` if any input byte is not an ASCII digit.
///
/// # Examples
///
/// ```
/// use joshua_core::checksum::mod11_10_check_digit;
///
/// assert_eq!(mod11_10_check_digit(b"1234567890"), Some(3));
/// ```
#[must_use]
pub fn mod11_10_check_digit(digits: &[u8]) -> Option<u8> {
    let mut running: u8 = 10;
    for &byte in digits {
        if !byte.is_ascii_digit() {
            return None;
        }
        running += byte - b'0';
        running %= 10;
        if running == 0 {
            running = 10;
        }
        running *= 2;
        running %= 11;
    }

    let check = 11 - running;
    Some(if check == 10 { 0 } else { check })
}

/// Shape check: exactly eleven ASCII digits.
#[must_use]
pub fn is_oib_shaped(input: &str) -> bool {
    input.len() == OIB_LENGTH && input.bytes().all(|b| b.is_ascii_digit())
}

/// Verifies a complete OIB: eleven digits whose last digit is the MOD 11,10
/// check digit of the first ten.
#[must_use]
pub fn verify_oib(input: &str) -> bool {
    if !is_oib_shaped(input) {
        return false;
    }
    let bytes = input.as_bytes();
    mod11_10_check_digit(&bytes[..OIB_LENGTH - 1]) == Some(bytes[OIB_LENGTH - 1] - b'0')
}
