//! Boundary validation for addresses and byte values entering the session.
//!
//! Everything past this module takes `u16`/`u8` directly, so range checks
//! happen exactly once, at the point where untyped host input arrives.

use crate::{SessionError, SessionResult};

/// Size in bytes of the flat 6502 address space (64 KiB).
pub const ADDRESS_SPACE_BYTES: usize = u16::MAX as usize + 1;

/// First address of the hardware stack page.
pub const STACK_PAGE_START: u16 = 0x0100;
/// Last address of the hardware stack page.
pub const STACK_PAGE_END: u16 = 0x01FF;

/// Low byte of the reset vector.
pub const RESET_VECTOR_LO: u16 = 0xFFFC;
/// High byte of the reset vector.
pub const RESET_VECTOR_HI: u16 = 0xFFFD;

/// Converts a host integer into an address.
///
/// # Errors
///
/// Returns [`SessionError::AddressOutOfRange`] when `value` is negative or
/// above `0xFFFF`.
pub fn address_from(value: i64) -> SessionResult<u16> {
    u16::try_from(value).map_err(|_| SessionError::AddressOutOfRange(value))
}

/// Converts a host integer into a byte value.
///
/// # Errors
///
/// Returns [`SessionError::ValueOutOfRange`] when `value` is negative or
/// above `0xFF`.
pub fn byte_from(value: i64) -> SessionResult<u8> {
    u8::try_from(value).map_err(|_| SessionError::ValueOutOfRange(value))
}

/// Parses hexadecimal text (`8000`, `$8000`, `0x8000`) into an address.
///
/// # Errors
///
/// Returns [`SessionError::InvalidHex`] for empty or non-hex text and
/// [`SessionError::AddressOutOfRange`] for values above `0xFFFF`.
pub fn parse_hex_address(text: &str) -> SessionResult<u16> {
    parse_hex(text).and_then(address_from)
}

/// Parses hexadecimal text (`42`, `$42`, `0x42`) into a byte value.
///
/// # Errors
///
/// Returns [`SessionError::InvalidHex`] for empty or non-hex text and
/// [`SessionError::ValueOutOfRange`] for values above `0xFF`.
pub fn parse_hex_byte(text: &str) -> SessionResult<u8> {
    parse_hex(text).and_then(byte_from)
}

fn parse_hex(text: &str) -> SessionResult<i64> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix('$')
        .or_else(|| trimmed.strip_prefix("0x"))
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(SessionError::InvalidHex(text.to_string()));
    }

    // Long inputs are out of range rather than unparseable.
    i64::from_str_radix(digits, 16).or(Ok(i64::MAX))
}
