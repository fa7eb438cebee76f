//! Fragment header classification for GATT response notifications.
//!
//! The first byte of every notification says whether it continues the
//! message in progress or starts a new one. Start fragments also declare the
//! total payload length using one of three encodings selected by bits 6-5:
//!
//! ```text
//! bit      7   6 5   4 3 2 1 0
//! start    0   0 0   L L L L L                      general, 5-bit length
//! start    0   0 1   L L L L L   LLLLLLLL           extended, 13-bit length
//! start    0   1 0   x x x x x   LLLLLLLL LLLLLLLL  extended, 16-bit length
//! cont.    1   x x   x x x x x                      payload follows
//! ```
//!
//! All bit manipulation for the header lives here so the accumulator only
//! ever sees a resolved [`FragmentHeader`].

use bytes::BufMut;
use derive_more::Display;
use thiserror::Error;

/// Bit 7 of byte 0: set on every continuation fragment.
pub const CONTINUATION_FLAG: u8 = 0b1000_0000;
/// The header byte written in front of each continuation payload.
pub const CONTINUATION_HEADER: u8 = CONTINUATION_FLAG;

const KIND_MASK: u8 = 0b0110_0000;
const KIND_SHIFT: u32 = 5;
const LENGTH_MASK: u8 = 0b0001_1111;

/// Largest payload length a general (1-byte) header can declare.
pub const MAX_GENERAL_LEN: usize = 0x1f;
/// Largest payload length a 13-bit extended header can declare.
pub const MAX_EXTENDED13_LEN: usize = 0x1fff;
/// Largest payload length a 16-bit extended header can declare.
pub const MAX_EXTENDED16_LEN: usize = 0xffff;

/// Length encoding carried by a start fragment.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum HeaderKind {
    /// One header byte; the low five bits hold the length.
    #[display("general")]
    General,
    /// Two header bytes holding a 13-bit length.
    #[display("extended-13")]
    Extended13,
    /// Three header bytes; bytes 1 and 2 hold a big-endian 16-bit length.
    #[display("extended-16")]
    Extended16,
}

impl HeaderKind {
    /// Number of header bytes stripped from a start fragment of this kind.
    #[must_use]
    pub const fn header_len(self) -> usize {
        match self {
            Self::General => 1,
            Self::Extended13 => 2,
            Self::Extended16 => 3,
        }
    }

    /// Largest payload length this kind can declare.
    #[must_use]
    pub const fn max_len(self) -> usize {
        match self {
            Self::General => MAX_GENERAL_LEN,
            Self::Extended13 => MAX_EXTENDED13_LEN,
            Self::Extended16 => MAX_EXTENDED16_LEN,
        }
    }

    /// Select the smallest header kind able to declare `len` payload bytes.
    ///
    /// Returns `None` when `len` exceeds [`MAX_EXTENDED16_LEN`].
    ///
    /// # Examples
    ///
    /// ```
    /// use gattframe::header::HeaderKind;
    ///
    /// assert_eq!(HeaderKind::for_length(31), Some(HeaderKind::General));
    /// assert_eq!(HeaderKind::for_length(32), Some(HeaderKind::Extended13));
    /// assert_eq!(HeaderKind::for_length(70_000), None);
    /// ```
    #[must_use]
    pub const fn for_length(len: usize) -> Option<Self> {
        if len <= MAX_GENERAL_LEN {
            Some(Self::General)
        } else if len <= MAX_EXTENDED13_LEN {
            Some(Self::Extended13)
        } else if len <= MAX_EXTENDED16_LEN {
            Some(Self::Extended16)
        } else {
            None
        }
    }

    const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0b00 => Some(Self::General),
            0b01 => Some(Self::Extended13),
            0b10 => Some(Self::Extended16),
            _ => None,
        }
    }

    const fn bits(self) -> u8 {
        match self {
            Self::General => 0b00,
            Self::Extended13 => 0b01,
            Self::Extended16 => 0b10,
        }
    }
}

/// Resolved meaning of a fragment's leading header bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FragmentHeader {
    /// The fragment starts a new message of `declared_len` payload bytes.
    Start {
        /// Header encoding used by the fragment.
        kind: HeaderKind,
        /// Total payload length across all fragments of the message.
        declared_len: usize,
    },
    /// The fragment extends the message in progress.
    Continuation,
}

/// Result of classifying a fragment: the header and how many bytes it spans.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParsedFragmentHeader {
    header: FragmentHeader,
    header_len: usize,
}

impl ParsedFragmentHeader {
    /// Create a parsed header with its byte length.
    #[must_use]
    pub const fn new(header: FragmentHeader, header_len: usize) -> Self {
        Self { header, header_len }
    }

    /// Return the parsed header.
    #[must_use]
    pub const fn header(&self) -> FragmentHeader { self.header }

    /// Return the number of leading bytes consumed by the header.
    #[must_use]
    pub const fn header_len(&self) -> usize { self.header_len }
}

/// Errors raised while classifying a fragment header.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum HeaderError {
    /// The transport delivered a notification with no bytes.
    #[error("empty fragment")]
    EmptyFragment,
    /// Bits 6-5 of a start fragment hold the reserved value `11`.
    #[error("reserved header type in byte {byte:#04x}")]
    ReservedKind {
        /// The offending first byte.
        byte: u8,
    },
    /// The fragment ends before the header it announces.
    #[error("{kind} header needs {needed} bytes, fragment has {available}")]
    Truncated {
        /// Header kind announced by byte 0.
        kind: HeaderKind,
        /// Header bytes required by that kind.
        needed: usize,
        /// Bytes present in the fragment.
        available: usize,
    },
}

/// Classify `fragment` and decode any declared length.
///
/// # Errors
///
/// Returns [`HeaderError`] when the fragment is empty, uses the reserved
/// header type, or is shorter than its announced header.
///
/// # Examples
///
/// ```
/// use gattframe::header::{FragmentHeader, HeaderKind, parse_fragment_header};
///
/// let parsed = parse_fragment_header(&[0x21, 0x04, 0xaa]).expect("valid header");
/// assert_eq!(
///     parsed.header(),
///     FragmentHeader::Start {
///         kind: HeaderKind::Extended13,
///         declared_len: 0x104,
///     }
/// );
/// assert_eq!(parsed.header_len(), 2);
/// ```
pub fn parse_fragment_header(fragment: &[u8]) -> Result<ParsedFragmentHeader, HeaderError> {
    let Some(&first) = fragment.first() else {
        return Err(HeaderError::EmptyFragment);
    };

    if first & CONTINUATION_FLAG != 0 {
        return Ok(ParsedFragmentHeader::new(FragmentHeader::Continuation, 1));
    }

    let kind = HeaderKind::from_bits((first & KIND_MASK) >> KIND_SHIFT)
        .ok_or(HeaderError::ReservedKind { byte: first })?;
    let needed = kind.header_len();
    if fragment.len() < needed {
        return Err(HeaderError::Truncated {
            kind,
            needed,
            available: fragment.len(),
        });
    }

    let low = usize::from(first & LENGTH_MASK);
    let declared_len = match kind {
        HeaderKind::General => low,
        HeaderKind::Extended13 => (low << 8) | usize::from(fragment[1]),
        HeaderKind::Extended16 => usize::from(u16::from_be_bytes([fragment[1], fragment[2]])),
    };

    Ok(ParsedFragmentHeader::new(
        FragmentHeader::Start { kind, declared_len },
        needed,
    ))
}

/// Write the start header declaring `declared_len` payload bytes into `dst`.
///
/// Returns the kind written, or `None` (writing nothing) when the length
/// cannot be represented.
#[expect(
    clippy::cast_possible_truncation,
    reason = "for_length bounds declared_len to the width of each kind"
)]
pub fn put_start_header(dst: &mut impl BufMut, declared_len: usize) -> Option<HeaderKind> {
    let kind = HeaderKind::for_length(declared_len)?;
    let tag = kind.bits() << KIND_SHIFT;
    match kind {
        HeaderKind::General => dst.put_u8(tag | declared_len as u8),
        HeaderKind::Extended13 => {
            dst.put_u8(tag | (declared_len >> 8) as u8);
            dst.put_u8(declared_len as u8);
        }
        HeaderKind::Extended16 => {
            dst.put_u8(tag);
            dst.put_u16(declared_len as u16);
        }
    }
    Some(kind)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::general_zero(&[0x00], HeaderKind::General, 0, 1)]
    #[case::general_max(&[0x1f, 0xaa], HeaderKind::General, 31, 1)]
    #[case::extended13(&[0x20, 0x20], HeaderKind::Extended13, 32, 2)]
    #[case::extended13_max(&[0x3f, 0xff], HeaderKind::Extended13, 8191, 2)]
    #[case::extended16(&[0x40, 0x20, 0x00], HeaderKind::Extended16, 8192, 3)]
    #[case::extended16_ignores_low_bits(&[0x5f, 0xff, 0xff], HeaderKind::Extended16, 65_535, 3)]
    fn start_headers_decode_declared_length(
        #[case] fragment: &[u8],
        #[case] kind: HeaderKind,
        #[case] declared_len: usize,
        #[case] header_len: usize,
    ) {
        let parsed = parse_fragment_header(fragment).expect("valid start header");
        assert_eq!(
            parsed.header(),
            FragmentHeader::Start { kind, declared_len }
        );
        assert_eq!(parsed.header_len(), header_len);
    }

    #[rstest]
    #[case(&[0x80])]
    #[case(&[0x81, 0x01, 0x02])]
    #[case(&[0xff, 0x00])]
    fn continuation_flag_wins_over_kind_bits(#[case] fragment: &[u8]) {
        let parsed = parse_fragment_header(fragment).expect("continuation header");
        assert_eq!(parsed.header(), FragmentHeader::Continuation);
        assert_eq!(parsed.header_len(), 1);
    }

    #[test]
    fn reserved_kind_is_rejected() {
        assert_eq!(
            parse_fragment_header(&[0x62, 0x01, 0x00]),
            Err(HeaderError::ReservedKind { byte: 0x62 })
        );
    }

    #[test]
    fn empty_fragment_is_rejected() {
        assert_eq!(parse_fragment_header(&[]), Err(HeaderError::EmptyFragment));
    }

    #[rstest]
    #[case(&[0x20], HeaderKind::Extended13, 2, 1)]
    #[case(&[0x40, 0x01], HeaderKind::Extended16, 3, 2)]
    fn short_extended_headers_are_truncated(
        #[case] fragment: &[u8],
        #[case] kind: HeaderKind,
        #[case] needed: usize,
        #[case] available: usize,
    ) {
        assert_eq!(
            parse_fragment_header(fragment),
            Err(HeaderError::Truncated {
                kind,
                needed,
                available
            })
        );
    }

    #[rstest]
    #[case(0, HeaderKind::General)]
    #[case(31, HeaderKind::General)]
    #[case(32, HeaderKind::Extended13)]
    #[case(8191, HeaderKind::Extended13)]
    #[case(8192, HeaderKind::Extended16)]
    #[case(8193, HeaderKind::Extended16)]
    #[case(65_535, HeaderKind::Extended16)]
    fn written_headers_parse_back(#[case] len: usize, #[case] kind: HeaderKind) {
        let mut dst = Vec::new();
        assert_eq!(put_start_header(&mut dst, len), Some(kind));
        assert_eq!(dst.len(), kind.header_len());

        let parsed = parse_fragment_header(&dst).expect("written header parses");
        assert_eq!(
            parsed.header(),
            FragmentHeader::Start {
                kind,
                declared_len: len
            }
        );
    }

    #[test]
    fn unrepresentable_length_writes_nothing() {
        let mut dst = Vec::new();
        assert_eq!(put_start_header(&mut dst, MAX_EXTENDED16_LEN + 1), None);
        assert!(dst.is_empty());
    }
}
