//! Luhn (mod 10) checksum validation for order numbers.

/// Returns `true` if `digits` is a non-empty string of ASCII digits that passes the Luhn checksum.
///
/// Starting from the rightmost digit, every second digit is doubled, and 9 is subtracted if the result exceeds 9. The
/// number is valid when the sum of all the digits is divisible by 10.
pub fn is_valid(digits: &str) -> bool {
    if digits.is_empty() {
        return false;
    }
    let mut sum = 0u32;
    for (i, b) in digits.bytes().rev().enumerate() {
        if !b.is_ascii_digit() {
            return false;
        }
        let mut d = u32::from(b - b'0');
        if i % 2 == 1 {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
    }
    sum % 10 == 0
}
