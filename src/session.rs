//! Hand-off between a notification callback and the task awaiting a response.
//!
//! A BLE stack delivers notifications through a callback, while the code that
//! wrote the command wants to `await` the decoded response with a deadline.
//! [`response_channel`] splits a [`ResponseRouter`] into a
//! [`NotificationHandler`] for the callback side and a [`ResponseWaiter`] for
//! the awaiting side, joined by a bounded Tokio channel. When the waiter
//! falls behind and the channel fills, further outcomes are dropped with a
//! warning rather than buffered without limit.

use std::{num::NonZeroUsize, time::Duration};

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    decoder::DecodedMessage,
    hexdump::HexBytes,
    metrics::{self, ErrorKind},
    router::{ChannelId, ResponseRouter, RouterError},
};

/// Outcomes buffered for the waiter by [`response_channel`].
pub const DEFAULT_RESPONSE_QUEUE_CAPACITY: NonZeroUsize =
    NonZeroUsize::new(8).expect("8 is non-zero");

/// A decoded response together with the channel it arrived on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    channel: ChannelId,
    message: DecodedMessage,
}

impl Response {
    /// Create a response record.
    #[must_use]
    pub const fn new(channel: ChannelId, message: DecodedMessage) -> Self {
        Self { channel, message }
    }

    /// Channel the response arrived on.
    #[must_use]
    pub const fn channel(&self) -> ChannelId { self.channel }

    /// Borrow the decoded message.
    #[must_use]
    pub const fn message(&self) -> &DecodedMessage { &self.message }

    /// Whether the peer reported success.
    #[must_use]
    pub const fn is_success(&self) -> bool { self.message.is_success() }

    /// Consume the record, returning the decoded message.
    #[must_use]
    pub fn into_message(self) -> DecodedMessage { self.message }
}

type Outcome = Result<Response, RouterError>;

/// Errors returned by [`ResponseWaiter::next_response`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WaitError {
    /// No response completed within the deadline.
    #[error("no response within {0:?}")]
    Timeout(Duration),
    /// The notification handler was dropped.
    #[error("notification handler closed")]
    Closed,
    /// A response failed to reassemble or decode.
    #[error(transparent)]
    Failed(#[from] RouterError),
}

/// Callback-side half: feeds notifications into the router.
#[derive(Debug)]
pub struct NotificationHandler {
    router: ResponseRouter,
    outcomes: mpsc::Sender<Outcome>,
}

impl NotificationHandler {
    /// Borrow the router, for example to inspect registered channels.
    #[must_use]
    pub const fn router(&self) -> &ResponseRouter { &self.router }

    /// Mutably borrow the router to register channels or purge stalls.
    pub const fn router_mut(&mut self) -> &mut ResponseRouter { &mut self.router }

    /// Process one notification.
    ///
    /// Completed responses and failures are forwarded to the waiter. An
    /// outcome that finds the queue full is dropped and logged.
    /// Returns `false` once the waiter has been dropped.
    pub fn on_notification(&mut self, channel: ChannelId, data: &[u8]) -> bool {
        debug!(%channel, data = %HexBytes(data), "notification received");

        let outcome = match self.router.push(channel, data) {
            Ok(None) => return !self.outcomes.is_closed(),
            Ok(Some(message)) => {
                if message.is_success() {
                    info!(%channel, id = message.id(), "response received");
                } else {
                    warn!(
                        %channel,
                        id = message.id(),
                        status = message.status(),
                        "peer reported failure"
                    );
                }
                Ok(Response::new(channel, message))
            }
            Err(err) => Err(err),
        };

        match self.outcomes.try_send(outcome) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                metrics::inc_errors(ErrorKind::QueueFull);
                warn!(
                    %channel,
                    failed = dropped.is_err(),
                    capacity = self.outcomes.max_capacity(),
                    "response queue full; outcome dropped"
                );
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(%channel, "response waiter dropped");
                false
            }
        }
    }
}

/// Awaiting half: yields responses as they complete.
#[derive(Debug)]
pub struct ResponseWaiter {
    outcomes: mpsc::Receiver<Outcome>,
}

impl ResponseWaiter {
    /// Wait up to `timeout` for the next response or failure.
    ///
    /// # Errors
    ///
    /// Returns [`WaitError::Timeout`] if nothing completes in time,
    /// [`WaitError::Closed`] if the handler was dropped, or
    /// [`WaitError::Failed`] if a response could not be reassembled or decoded.
    pub async fn next_response(&mut self, timeout: Duration) -> Result<Response, WaitError> {
        match tokio::time::timeout(timeout, self.outcomes.recv()).await {
            Err(_) => Err(WaitError::Timeout(timeout)),
            Ok(None) => Err(WaitError::Closed),
            Ok(Some(outcome)) => outcome.map_err(WaitError::from),
        }
    }

    /// Return an already-completed response without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`WaitError::Failed`] when the queued outcome is a failure.
    pub fn try_next_response(&mut self) -> Result<Option<Response>, WaitError> {
        match self.outcomes.try_recv() {
            Ok(outcome) => outcome.map(Some).map_err(WaitError::from),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(WaitError::Closed),
        }
    }
}

/// Split `router` into a callback-side handler and an awaiting waiter
/// buffering up to [`DEFAULT_RESPONSE_QUEUE_CAPACITY`] outcomes.
///
/// # Examples
///
/// ```
/// use gattframe::{
///     config::AssemblyConfig,
///     router::{ChannelId, ResponseRouter},
///     session::response_channel,
/// };
///
/// let channel = ChannelId::new(0x31);
/// let mut router = ResponseRouter::new(AssemblyConfig::default());
/// router.register(channel);
/// let (mut handler, mut waiter) = response_channel(router);
///
/// handler.on_notification(channel, &[0x02, 0x01, 0x00]);
/// let response = waiter
///     .try_next_response()
///     .expect("no failure")
///     .expect("response queued");
/// assert!(response.is_success());
/// ```
#[must_use]
pub fn response_channel(router: ResponseRouter) -> (NotificationHandler, ResponseWaiter) {
    response_channel_with_capacity(router, DEFAULT_RESPONSE_QUEUE_CAPACITY)
}

/// Like [`response_channel`], buffering up to `capacity` outcomes.
#[must_use]
pub fn response_channel_with_capacity(
    router: ResponseRouter,
    capacity: NonZeroUsize,
) -> (NotificationHandler, ResponseWaiter) {
    let (tx, rx) = mpsc::channel(capacity.get());
    (
        NotificationHandler {
            router,
            outcomes: tx,
        },
        ResponseWaiter { outcomes: rx },
    )
}
