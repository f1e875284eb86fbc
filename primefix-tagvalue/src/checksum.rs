/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! FIX checksum calculation.
//!
//! The FIX checksum is the sum of all bytes in the message up to and
//! including the SOH before `10=`, modulo 256, rendered as exactly three
//! decimal digits.

/// Calculates the FIX checksum for the given data.
///
/// # Example
/// ```
/// use primefix_tagvalue::calculate_checksum;
///
/// let checksum = calculate_checksum(b"8=FIX.4.2\x019=5\x0135=0\x01");
/// assert!(u32::from(checksum) < 256);
/// ```
#[inline]
#[must_use]
pub fn calculate_checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Formats a checksum value as a 3-digit zero-padded string.
#[inline]
#[must_use]
pub fn format_checksum(checksum: u8) -> [u8; 3] {
    [
        b'0' + checksum / 100,
        b'0' + (checksum / 10) % 10,
        b'0' + checksum % 10,
    ]
}

/// Parses a 3-digit checksum string.
///
/// # Returns
/// `Some(checksum)` for three ASCII digits with a value of at most 255,
/// `None` otherwise.
#[inline]
#[must_use]
pub fn parse_checksum(bytes: &[u8]) -> Option<u8> {
    if bytes.len() != 3 || !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }

    let value = bytes
        .iter()
        .fold(0u16, |acc, &b| acc * 10 + u16::from(b - b'0'));
    u8::try_from(value).ok()
}
