//! Errors raised while reassembling a notification stream.
//!
//! Every variant leaves the accumulator reset; callers decide whether to
//! abort the exchange or wait for the next start fragment.

use std::num::NonZeroUsize;

use thiserror::Error;

use crate::header::HeaderError;

/// Errors produced by [`FragmentAccumulator`](super::FragmentAccumulator).
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum AccumulateError {
    /// The fragment header could not be classified.
    #[error("malformed fragment header: {0}")]
    Header(#[from] HeaderError),

    /// A continuation fragment arrived while no message was in progress.
    #[error("continuation fragment received without a message in progress")]
    ContinuationWithoutMessage,

    /// More payload arrived than the start fragment declared.
    #[error("message declared {declared} bytes but {received} were received")]
    LengthOverrun {
        /// Payload length declared by the start fragment.
        declared: usize,
        /// Payload bytes received including the offending fragment.
        received: usize,
    },

    /// The declared length exceeds the configured message cap.
    #[error("message declares {declared} bytes > limit {limit} bytes")]
    MessageTooLarge {
        /// Payload length declared by the start fragment.
        declared: usize,
        /// Configured size cap.
        limit: NonZeroUsize,
    },
}

impl AccumulateError {
    /// Whether the error came from the reserved header type.
    #[must_use]
    pub const fn is_malformed_header(&self) -> bool {
        matches!(self, Self::Header(HeaderError::ReservedKind { .. }))
    }

    /// Whether the fragment stream itself broke the framing rules.
    ///
    /// Reserved header types count as protocol violations too.
    #[must_use]
    pub const fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::Header(_) | Self::ContinuationWithoutMessage | Self::LengthOverrun { .. }
        )
    }
}
