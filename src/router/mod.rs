//! Per-channel routing of notifications to response accumulators.
//!
//! A GATT client may subscribe to several response characteristics at once.
//! [`ResponseRouter`] keeps one [`FragmentAccumulator`] per registered
//! [`ChannelId`], decodes each response as soon as it completes, and evicts
//! partial responses that stall longer than the configured timeout. All
//! mutation goes through `&mut self`, so callers whose transport delivers
//! notifications from several threads must wrap the router in a lock.

pub mod error;

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use derive_more::{Display, From, Into};
use log::{debug, warn};

pub use self::error::RouterError;
use crate::{
    accumulator::{AccumulateStatus, FragmentAccumulator},
    config::AssemblyConfig,
    decoder::{DecodedMessage, decode},
    header::CONTINUATION_FLAG,
    metrics::{self, ErrorKind},
};

/// Identifies the response characteristic a notification arrived on,
/// typically its GATT attribute handle.
///
/// # Examples
///
/// ```
/// use gattframe::router::ChannelId;
///
/// let channel = ChannelId::new(0x0031);
/// assert_eq!(channel.get(), 0x31);
/// assert_eq!(channel.to_string(), "0x0031");
/// ```
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, PartialOrd, Ord, From, Into)]
#[display("{_0:#06x}")]
pub struct ChannelId(u16);

impl ChannelId {
    /// Create a channel identifier.
    #[must_use]
    pub const fn new(value: u16) -> Self { Self(value) }

    /// Return the raw handle.
    #[must_use]
    pub const fn get(self) -> u16 { self.0 }
}

#[derive(Debug)]
struct ChannelAssembly {
    accumulator: FragmentAccumulator,
    started_at: Option<Instant>,
}

impl ChannelAssembly {
    fn new(config: &AssemblyConfig) -> Self {
        Self {
            accumulator: FragmentAccumulator::with_max_message_size(config.max_message_size),
            started_at: None,
        }
    }

    fn is_expired(&self, now: Instant, timeout: Duration) -> bool {
        self.started_at
            .is_some_and(|started| now.saturating_duration_since(started) >= timeout)
    }

    fn clear(&mut self) {
        self.accumulator.reset();
        self.started_at = None;
    }
}

/// Routes notifications to per-channel accumulators and decodes responses.
///
/// # Examples
///
/// ```
/// use gattframe::{
///     config::AssemblyConfig,
///     router::{ChannelId, ResponseRouter},
/// };
///
/// let channel = ChannelId::new(0x31);
/// let mut router = ResponseRouter::new(AssemblyConfig::default());
/// router.register(channel);
///
/// let message = router
///     .push(channel, &[0x05, 0x01, 0x00, 0x01, 0x01, 0xab])
///     .expect("valid notification")
///     .expect("single-fragment response completes");
/// assert_eq!(message.id(), 1);
/// assert_eq!(message.parameter(0x01), Some(&[0xab][..]));
/// ```
#[derive(Debug)]
pub struct ResponseRouter {
    config: AssemblyConfig,
    channels: HashMap<ChannelId, ChannelAssembly>,
}

impl ResponseRouter {
    /// Create a router with no registered channels.
    #[must_use]
    pub fn new(config: AssemblyConfig) -> Self {
        Self {
            config,
            channels: HashMap::new(),
        }
    }

    /// Return the configuration applied to every channel.
    #[must_use]
    pub const fn config(&self) -> &AssemblyConfig { &self.config }

    /// Start accepting notifications on `channel`.
    ///
    /// Returns `false` if the channel was already registered; its state is
    /// left untouched.
    pub fn register(&mut self, channel: ChannelId) -> bool {
        if self.channels.contains_key(&channel) {
            return false;
        }
        self.channels
            .insert(channel, ChannelAssembly::new(&self.config));
        true
    }

    /// Stop accepting notifications on `channel`, discarding any partial response.
    ///
    /// Returns `false` if the channel was not registered.
    pub fn unregister(&mut self, channel: ChannelId) -> bool {
        self.channels.remove(&channel).is_some()
    }

    /// Whether `channel` is registered.
    #[must_use]
    pub fn is_registered(&self, channel: ChannelId) -> bool { self.channels.contains_key(&channel) }

    /// Feed a notification using the current time.
    ///
    /// Returns `Ok(Some(_))` when the notification completes a response,
    /// `Ok(None)` while more fragments are required.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError`] if the channel is unknown, the fragment stream
    /// is malformed, or the completed payload cannot be decoded. The
    /// channel's partial response is discarded in every case.
    pub fn push(
        &mut self,
        channel: ChannelId,
        fragment: &[u8],
    ) -> Result<Option<DecodedMessage>, RouterError> {
        self.push_at(channel, fragment, Instant::now())
    }

    /// Feed a notification using an explicit clock reading.
    ///
    /// Expired partial responses on every channel are evicted first.
    ///
    /// # Errors
    ///
    /// See [`push`](Self::push).
    pub fn push_at(
        &mut self,
        channel: ChannelId,
        fragment: &[u8],
        now: Instant,
    ) -> Result<Option<DecodedMessage>, RouterError> {
        self.purge_expired_at(now);
        metrics::inc_fragments();

        let Some(assembly) = self.channels.get_mut(&channel) else {
            metrics::inc_errors(ErrorKind::UnknownChannel);
            return Err(RouterError::UnknownChannel { channel });
        };

        let starts_message = fragment
            .first()
            .is_some_and(|byte| byte & CONTINUATION_FLAG == 0);

        let status = assembly.accumulator.accumulate(fragment).map_err(|source| {
            assembly.started_at = None;
            metrics::inc_errors(ErrorKind::Reassembly);
            warn!("discarding response: channel={channel}, error={source}");
            RouterError::Accumulate { channel, source }
        })?;

        match status {
            AccumulateStatus::Empty => {
                assembly.started_at = None;
                debug!("ignoring zero-length response: channel={channel}");
                Ok(None)
            }
            AccumulateStatus::Incomplete { remaining } => {
                if starts_message {
                    assembly.started_at = Some(now);
                }
                debug!("awaiting continuation: channel={channel}, remaining={remaining}");
                Ok(None)
            }
            AccumulateStatus::Complete => {
                assembly.started_at = None;
                let payload = assembly.accumulator.take_message().unwrap_or_default();
                let message = decode(&payload).map_err(|source| {
                    metrics::inc_errors(ErrorKind::Decode);
                    warn!("undecodable response: channel={channel}, error={source}");
                    RouterError::Decode { channel, source }
                })?;
                metrics::inc_messages(message.is_success());
                debug!(
                    "response complete: channel={channel}, id={:#04x}, status={}, parameters={}",
                    message.id(),
                    message.status(),
                    message.parameters().len()
                );
                Ok(Some(message))
            }
        }
    }

    /// Discard partial responses that exceeded the configured timeout.
    ///
    /// Returns the channels whose partial response was evicted.
    pub fn purge_expired(&mut self) -> Vec<ChannelId> { self.purge_expired_at(Instant::now()) }

    /// Discard expired partial responses using an explicit clock reading.
    ///
    /// Channels stay registered; only their buffered bytes are dropped.
    pub fn purge_expired_at(&mut self, now: Instant) -> Vec<ChannelId> {
        let timeout = self.config.reassembly_timeout;
        let mut evicted: Vec<ChannelId> = self
            .channels
            .iter_mut()
            .filter(|(_, assembly)| assembly.is_expired(now, timeout))
            .map(|(channel, assembly)| {
                debug!(
                    "evicting stalled response: channel={channel}, remaining={}",
                    assembly.accumulator.remaining()
                );
                assembly.clear();
                *channel
            })
            .collect();

        if !evicted.is_empty() {
            evicted.sort_unstable();
            metrics::inc_evictions(evicted.len() as u64);
        }
        evicted
    }

    /// Number of channels with a partial response buffered.
    #[must_use]
    pub fn in_progress_count(&self) -> usize {
        self.channels
            .values()
            .filter(|assembly| assembly.accumulator.is_in_progress())
            .count()
    }
}
