//! TLV serialisation of responses, the inverse of [`decode`](crate::decoder::decode).

use bytes::BufMut;
use thiserror::Error;

use crate::decoder::{DecodedMessage, RESPONSE_HEADER_LEN};

/// Largest value a single TLV parameter can carry.
pub const MAX_PARAMETER_LEN: usize = 0xff;

/// Errors raised while serialising a [`DecodedMessage`].
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    /// A parameter value does not fit the one-byte length field.
    #[error("parameter {tag:#04x} value is {len} bytes; the limit is {max}", max = MAX_PARAMETER_LEN)]
    ValueTooLong {
        /// Tag of the oversized parameter.
        tag: u8,
        /// Length of its value.
        len: usize,
    },
}

impl DecodedMessage {
    /// Number of payload bytes [`to_payload`](Self::to_payload) produces.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        self.parameters()
            .values()
            .map(|value| 2 + value.len())
            .sum::<usize>()
            + RESPONSE_HEADER_LEN
    }

    /// Serialise the id, status and parameters into a response payload.
    ///
    /// Parameters are written in ascending tag order.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::ValueTooLong`] if any value exceeds 255 bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use gattframe::decoder::DecodedMessage;
    ///
    /// let payload = DecodedMessage::new(0x01, 0x00)
    ///     .with_parameter(0x01, [0xab])
    ///     .to_payload()
    ///     .expect("value fits");
    /// assert_eq!(payload, [0x01, 0x00, 0x01, 0x01, 0xab]);
    /// ```
    pub fn to_payload(&self) -> Result<Vec<u8>, EncodeError> {
        let mut dst = Vec::with_capacity(self.encoded_len());
        dst.put_u8(self.id());
        dst.put_u8(self.status());
        for (&tag, value) in self.parameters() {
            let len = u8::try_from(value.len()).map_err(|_| EncodeError::ValueTooLong {
                tag,
                len: value.len(),
            })?;
            dst.put_u8(tag);
            dst.put_u8(len);
            dst.put_slice(value);
        }
        Ok(dst)
    }
}
