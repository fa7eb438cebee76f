//! Configuration for reassembly and fragmentation.
//!
//! [`AssemblyConfig`] bounds how much a single response may buffer, how long
//! a stalled reassembly may linger before a router evicts it, and the MTU
//! used when splitting outbound payloads.

use std::{num::NonZeroUsize, time::Duration};

use thiserror::Error;

use crate::header::{HeaderKind, MAX_EXTENDED16_LEN};

/// Largest payload any header variant can declare.
pub const DEFAULT_MAX_MESSAGE_SIZE: NonZeroUsize = NonZeroUsize::new(MAX_EXTENDED16_LEN)
    .expect("MAX_EXTENDED16_LEN is non-zero");

/// Notification payload size of the default ATT MTU (23 bytes minus 3 bytes
/// of ATT overhead).
pub const DEFAULT_MTU: NonZeroUsize = NonZeroUsize::new(20).expect("20 is non-zero");

/// How long a partial response may sit idle before eviction.
pub const DEFAULT_REASSEMBLY_TIMEOUT: Duration = Duration::from_secs(10);

/// Smallest MTU able to carry the widest start header plus one payload byte.
pub const MIN_MTU: usize = HeaderKind::Extended16.header_len() + 1;

/// Settings that bound reassembly resource usage and fragment sizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AssemblyConfig {
    /// Hard cap on the declared payload length of a single message.
    pub max_message_size: NonZeroUsize,
    /// Duration after which incomplete reassemblies are evicted.
    pub reassembly_timeout: Duration,
    /// Maximum bytes per notification, header included.
    pub mtu: NonZeroUsize,
}

/// Errors returned by [`AssemblyConfig::validate`].
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The MTU cannot hold a 3-byte header and at least one payload byte.
    #[error("mtu {mtu} is below the minimum of {min} bytes", min = MIN_MTU)]
    MtuTooSmall {
        /// Configured MTU.
        mtu: usize,
    },
    /// The message cap exceeds what a 16-bit header can declare.
    #[error(
        "max message size {size} exceeds the protocol limit of {max} bytes",
        max = MAX_EXTENDED16_LEN
    )]
    MaxMessageSizeTooLarge {
        /// Configured cap.
        size: usize,
    },
    /// A zero timeout would evict every partial response immediately.
    #[error("reassembly timeout must be non-zero")]
    ZeroTimeout,
}

impl AssemblyConfig {
    /// Return a copy with a different MTU.
    #[must_use]
    pub const fn with_mtu(mut self, mtu: NonZeroUsize) -> Self {
        self.mtu = mtu;
        self
    }

    /// Return a copy with a different message cap.
    #[must_use]
    pub const fn with_max_message_size(mut self, max_message_size: NonZeroUsize) -> Self {
        self.max_message_size = max_message_size;
        self
    }

    /// Return a copy with a different reassembly timeout.
    #[must_use]
    pub const fn with_reassembly_timeout(mut self, reassembly_timeout: Duration) -> Self {
        self.reassembly_timeout = reassembly_timeout;
        self
    }

    /// Check the settings against protocol limits.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] describing the first setting out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mtu.get() < MIN_MTU {
            return Err(ConfigError::MtuTooSmall {
                mtu: self.mtu.get(),
            });
        }
        if self.max_message_size.get() > MAX_EXTENDED16_LEN {
            return Err(ConfigError::MaxMessageSizeTooLarge {
                size: self.max_message_size.get(),
            });
        }
        if self.reassembly_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            reassembly_timeout: DEFAULT_REASSEMBLY_TIMEOUT,
            mtu: DEFAULT_MTU,
        }
    }
}
