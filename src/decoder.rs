//! Decoding of reassembled response payloads.
//!
//! A response payload starts with a two-byte header (message id, status)
//! followed by zero or more TLV parameters, each a one-byte tag, a one-byte
//! length and exactly that many value bytes.

use std::collections::BTreeMap;

use bytes::Buf;
use thiserror::Error;

/// Bytes taken by the id and status fields.
pub const RESPONSE_HEADER_LEN: usize = 2;

/// Status byte reported by the peer on success.
pub const STATUS_SUCCESS: u8 = 0;

/// Format errors raised by [`decode`].
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The payload cannot hold the id and status bytes.
    #[error(
        "response payload of {len} bytes is shorter than the {header}-byte header",
        header = RESPONSE_HEADER_LEN
    )]
    MissingHeader {
        /// Length of the payload that was supplied.
        len: usize,
    },
    /// A tag byte is the last byte of the payload.
    #[error("parameter {tag:#04x} has no length byte")]
    MissingLength {
        /// Tag of the dangling parameter.
        tag: u8,
    },
    /// A parameter declares more value bytes than remain.
    #[error("parameter {tag:#04x} declares {declared} bytes but only {available} remain")]
    TruncatedEntry {
        /// Tag of the truncated parameter.
        tag: u8,
        /// Length declared by the parameter.
        declared: usize,
        /// Bytes left in the payload.
        available: usize,
    },
}

/// A decoded response: id, status and TLV parameters.
///
/// A non-zero status is a valid result the peer reported, not a decode error.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodedMessage {
    id: u8,
    status: u8,
    parameters: BTreeMap<u8, Vec<u8>>,
}

impl DecodedMessage {
    /// Create a message with no parameters.
    #[must_use]
    pub const fn new(id: u8, status: u8) -> Self {
        Self {
            id,
            status,
            parameters: BTreeMap::new(),
        }
    }

    /// Return the message with `tag` set to `value`, replacing any earlier value.
    #[must_use]
    pub fn with_parameter(mut self, tag: u8, value: impl Into<Vec<u8>>) -> Self {
        self.parameters.insert(tag, value.into());
        self
    }

    /// Identifier of the command this response answers.
    #[must_use]
    pub const fn id(&self) -> u8 { self.id }

    /// Status byte reported by the peer.
    #[must_use]
    pub const fn status(&self) -> u8 { self.status }

    /// Whether the peer reported success.
    #[must_use]
    pub const fn is_success(&self) -> bool { self.status == STATUS_SUCCESS }

    /// Value bytes for `tag`, if present.
    #[must_use]
    pub fn parameter(&self, tag: u8) -> Option<&[u8]> {
        self.parameters.get(&tag).map(Vec::as_slice)
    }

    /// All parameters keyed by tag.
    #[must_use]
    pub const fn parameters(&self) -> &BTreeMap<u8, Vec<u8>> { &self.parameters }

    /// Consume the message, returning its parameters.
    #[must_use]
    pub fn into_parameters(self) -> BTreeMap<u8, Vec<u8>> { self.parameters }
}

/// Decode a complete response payload.
///
/// A repeated tag keeps its last value.
///
/// # Errors
///
/// Returns [`DecodeError`] when the payload is shorter than the header or a
/// parameter runs past the end of the payload.
///
/// # Examples
///
/// ```
/// use gattframe::decoder::decode;
///
/// let message = decode(&[0x01, 0x00, 0x01, 0x01, 0xab]).expect("well-formed payload");
/// assert_eq!(message.id(), 1);
/// assert!(message.is_success());
/// assert_eq!(message.parameter(0x01), Some(&[0xab][..]));
/// ```
pub fn decode(payload: &[u8]) -> Result<DecodedMessage, DecodeError> {
    let mut buf = payload;
    if buf.remaining() < RESPONSE_HEADER_LEN {
        return Err(DecodeError::MissingHeader { len: payload.len() });
    }

    let mut message = DecodedMessage::new(buf.get_u8(), buf.get_u8());
    while buf.has_remaining() {
        let tag = buf.get_u8();
        if !buf.has_remaining() {
            return Err(DecodeError::MissingLength { tag });
        }
        let declared = usize::from(buf.get_u8());
        if buf.remaining() < declared {
            return Err(DecodeError::TruncatedEntry {
                tag,
                declared,
                available: buf.remaining(),
            });
        }
        message.parameters.insert(tag, buf[..declared].to_vec());
        buf.advance(declared);
    }

    Ok(message)
}
