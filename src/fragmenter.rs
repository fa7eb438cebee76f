//! Outbound helper that splits payloads into MTU-sized notifications.
//!
//! [`Fragmenter`] picks the smallest start header able to declare the
//! payload length, fills the first fragment up to the MTU, and carries the
//! rest in continuation fragments prefixed with a single flag byte.

use std::num::NonZeroUsize;

use thiserror::Error;

use crate::{
    config::{AssemblyConfig, MIN_MTU},
    decoder::DecodedMessage,
    encoder::EncodeError,
    header::{CONTINUATION_HEADER, HeaderKind, MAX_EXTENDED16_LEN, put_start_header},
};

/// Errors produced while fragmenting outbound payloads.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum FragmentationError {
    /// The MTU cannot hold a 3-byte header plus one payload byte.
    #[error("mtu {mtu} is below the minimum of {min} bytes", min = MIN_MTU)]
    MtuTooSmall {
        /// Requested MTU.
        mtu: usize,
    },
    /// The payload is longer than a 16-bit header can declare.
    #[error("payload of {len} bytes exceeds the {max}-byte protocol limit", max = MAX_EXTENDED16_LEN)]
    PayloadTooLarge {
        /// Payload length.
        len: usize,
    },
    /// Serialising the message failed before chunking.
    #[error("failed to encode message: {0}")]
    Encode(#[from] EncodeError),
}

/// Splits payloads into notification-sized fragments.
#[derive(Clone, Copy, Debug)]
pub struct Fragmenter {
    mtu: NonZeroUsize,
}

impl Fragmenter {
    /// Create a fragmenter producing fragments of at most `mtu` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`FragmentationError::MtuTooSmall`] if `mtu` is below [`MIN_MTU`].
    pub const fn new(mtu: NonZeroUsize) -> Result<Self, FragmentationError> {
        if mtu.get() < MIN_MTU {
            return Err(FragmentationError::MtuTooSmall { mtu: mtu.get() });
        }
        Ok(Self { mtu })
    }

    /// Create a fragmenter using the MTU from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`FragmentationError::MtuTooSmall`] if the configured MTU is
    /// below [`MIN_MTU`].
    pub const fn from_config(config: &AssemblyConfig) -> Result<Self, FragmentationError> {
        Self::new(config.mtu)
    }

    /// Return the maximum fragment size in bytes.
    #[must_use]
    pub const fn mtu(&self) -> NonZeroUsize { self.mtu }

    /// Serialise `message` and split it into fragments.
    ///
    /// # Errors
    ///
    /// Returns [`FragmentationError::Encode`] if a parameter is too long, or
    /// [`FragmentationError::PayloadTooLarge`] if the payload cannot be declared.
    pub fn fragment_message(
        &self,
        message: &DecodedMessage,
    ) -> Result<FragmentBatch, FragmentationError> {
        let payload = message.to_payload()?;
        self.fragment(&payload)
    }

    /// Split `payload` into fragments.
    ///
    /// # Errors
    ///
    /// Returns [`FragmentationError::PayloadTooLarge`] if `payload` is longer
    /// than [`MAX_EXTENDED16_LEN`].
    ///
    /// # Examples
    ///
    /// ```
    /// use std::num::NonZeroUsize;
    ///
    /// use gattframe::{fragmenter::Fragmenter, header::HeaderKind};
    ///
    /// let fragmenter = Fragmenter::new(NonZeroUsize::new(8).expect("non-zero"))
    ///     .expect("mtu large enough");
    /// let batch = fragmenter.fragment(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]).expect("fits");
    /// assert_eq!(batch.kind(), HeaderKind::General);
    /// assert_eq!(batch.fragments()[0], [0x0a, 1, 2, 3, 4, 5, 6, 7]);
    /// assert_eq!(batch.fragments()[1], [0x80, 8, 9, 10]);
    /// ```
    pub fn fragment(&self, payload: &[u8]) -> Result<FragmentBatch, FragmentationError> {
        let mtu = self.mtu.get();
        let mut first = Vec::with_capacity(mtu.min(payload.len() + 3));
        let kind = put_start_header(&mut first, payload.len())
            .ok_or(FragmentationError::PayloadTooLarge { len: payload.len() })?;

        let split = payload.len().min(mtu - kind.header_len());
        let (head, tail) = payload.split_at(split);
        first.extend_from_slice(head);

        let mut fragments = Vec::with_capacity(1 + tail.len().div_ceil(mtu - 1));
        fragments.push(first);
        for chunk in tail.chunks(mtu - 1) {
            let mut fragment = Vec::with_capacity(chunk.len() + 1);
            fragment.push(CONTINUATION_HEADER);
            fragment.extend_from_slice(chunk);
            fragments.push(fragment);
        }

        Ok(FragmentBatch { kind, fragments })
    }
}

/// Fragments produced for a single payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FragmentBatch {
    kind: HeaderKind,
    fragments: Vec<Vec<u8>>,
}

impl FragmentBatch {
    /// Header kind used by the start fragment.
    #[must_use]
    pub const fn kind(&self) -> HeaderKind { self.kind }

    /// Return the fragments as a slice, start fragment first.
    #[must_use]
    pub fn fragments(&self) -> &[Vec<u8>] { self.fragments.as_slice() }

    /// Number of fragments in the batch.
    #[expect(
        clippy::len_without_is_empty,
        reason = "batches always hold a start fragment"
    )]
    #[must_use]
    pub fn len(&self) -> usize { self.fragments.len() }

    /// Whether the payload needed continuation fragments.
    #[must_use]
    pub fn is_fragmented(&self) -> bool { self.len() > 1 }

    /// Consume the batch, returning all fragments.
    #[must_use]
    pub fn into_fragments(self) -> Vec<Vec<u8>> { self.fragments }
}

impl IntoIterator for FragmentBatch {
    type Item = Vec<u8>;
    type IntoIter = std::vec::IntoIter<Vec<u8>>;

    fn into_iter(self) -> Self::IntoIter { self.fragments.into_iter() }
}
