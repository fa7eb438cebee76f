//! Colon-separated hex rendering and parsing for notification bytes.

use std::fmt;

/// Display wrapper rendering bytes as `02:01:00`.
///
/// # Examples
///
/// ```
/// use gattframe::hexdump::HexBytes;
///
/// assert_eq!(HexBytes(&[0x02, 0x01, 0xab]).to_string(), "02:01:ab");
/// assert_eq!(HexBytes(&[]).to_string(), "");
/// ```
#[derive(Clone, Copy, Debug)]
pub struct HexBytes<'a>(pub &'a [u8]);

impl fmt::Display for HexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut bytes = self.0.iter();
        if let Some(first) = bytes.next() {
            write!(f, "{first:02x}")?;
        }
        for byte in bytes {
            write!(f, ":{byte:02x}")?;
        }
        Ok(())
    }
}

/// Parse hex text, ignoring `:` separators and whitespace.
///
/// # Errors
///
/// Returns [`hex::FromHexError`] for odd-length input or non-hex characters.
///
/// # Examples
///
/// ```
/// use gattframe::hexdump::parse_hex;
///
/// assert_eq!(parse_hex("02:01:ab").expect("valid hex"), [0x02, 0x01, 0xab]);
/// assert_eq!(parse_hex("0201 ab").expect("valid hex"), [0x02, 0x01, 0xab]);
/// ```
pub fn parse_hex(text: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let digits: String = text
        .chars()
        .filter(|c| *c != ':' && !c.is_whitespace())
        .collect();
    hex::decode(digits)
}
