//! Errors raised while routing notifications to per-channel accumulators.

use thiserror::Error;

use super::ChannelId;
use crate::{accumulator::AccumulateError, decoder::DecodeError};

/// Errors produced by [`ResponseRouter`](super::ResponseRouter).
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum RouterError {
    /// The notification arrived on a channel that was never registered.
    #[error("notification on unregistered channel {channel}")]
    UnknownChannel {
        /// Channel the notification arrived on.
        channel: ChannelId,
    },
    /// Reassembly failed; the channel's partial response was discarded.
    #[error("reassembly failed on channel {channel}: {source}")]
    Accumulate {
        /// Channel whose stream was malformed.
        channel: ChannelId,
        /// Underlying accumulator error.
        source: AccumulateError,
    },
    /// The reassembled payload was not a valid response.
    #[error("decode failed on channel {channel}: {source}")]
    Decode {
        /// Channel that carried the payload.
        channel: ChannelId,
        /// Underlying decoder error.
        source: DecodeError,
    },
}

impl RouterError {
    /// Channel the failing notification arrived on.
    #[must_use]
    pub const fn channel(&self) -> ChannelId {
        match self {
            Self::UnknownChannel { channel }
            | Self::Accumulate { channel, .. }
            | Self::Decode { channel, .. } => *channel,
        }
    }
}
