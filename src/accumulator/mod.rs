//! Reassembly of one response message from MTU-limited notifications.
//!
//! [`FragmentAccumulator`] consumes fragments in arrival order. A start
//! fragment discards whatever was buffered and declares the total payload
//! length; continuation fragments append until the declared length is
//! reached. Completion can happen on any fragment, including the first, so
//! callers check [`FragmentAccumulator::is_complete`] after every call. A
//! start fragment declaring zero bytes carries no message and leaves the
//! accumulator idle.

pub mod error;

use std::num::NonZeroUsize;

use log::debug;

pub use self::error::AccumulateError;
use crate::{
    config::DEFAULT_MAX_MESSAGE_SIZE,
    header::{FragmentHeader, HeaderKind, parse_fragment_header},
};

/// Result of feeding one fragment into the accumulator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccumulateStatus {
    /// The message still expects `remaining` payload bytes.
    Incomplete {
        /// Payload bytes still outstanding.
        remaining: usize,
    },
    /// The fragment completed the message.
    Complete,
    /// The fragment declared a zero-length message; nothing is buffered and
    /// the accumulator is idle.
    Empty,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Idle,
    InProgress { declared: usize, remaining: usize },
    Complete,
}

/// Stateful reassembler for a single response stream.
///
/// # Examples
///
/// ```
/// use gattframe::accumulator::{AccumulateStatus, FragmentAccumulator};
///
/// let mut accumulator = FragmentAccumulator::new();
///
/// // General header declaring 4 payload bytes, 2 carried here.
/// let status = accumulator.accumulate(&[0x04, 0x01, 0x00]).expect("start");
/// assert_eq!(status, AccumulateStatus::Incomplete { remaining: 2 });
///
/// // Continuation carrying the last 2 bytes.
/// let status = accumulator.accumulate(&[0x80, 0x02, 0x01]).expect("continuation");
/// assert_eq!(status, AccumulateStatus::Complete);
/// assert_eq!(accumulator.buffer(), &[0x01, 0x00, 0x02, 0x01]);
/// ```
#[derive(Debug)]
pub struct FragmentAccumulator {
    buffer: Vec<u8>,
    state: State,
    max_message_size: NonZeroUsize,
}

impl FragmentAccumulator {
    /// Create an accumulator accepting any length a header can declare.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_max_message_size(DEFAULT_MAX_MESSAGE_SIZE)
    }

    /// Create an accumulator that rejects declared lengths above `max_message_size`.
    #[must_use]
    pub const fn with_max_message_size(max_message_size: NonZeroUsize) -> Self {
        Self {
            buffer: Vec::new(),
            state: State::Idle,
            max_message_size,
        }
    }

    /// Feed one transport fragment.
    ///
    /// # Errors
    ///
    /// Returns [`AccumulateError`] when the header is malformed, a
    /// continuation arrives with no message in progress, more bytes arrive
    /// than were declared, or the declared length exceeds the configured
    /// cap. The accumulator is reset before the error is returned.
    pub fn accumulate(&mut self, fragment: &[u8]) -> Result<AccumulateStatus, AccumulateError> {
        let result = self.try_accumulate(fragment);
        if result.is_err() {
            self.reset();
        }
        result
    }

    fn try_accumulate(&mut self, fragment: &[u8]) -> Result<AccumulateStatus, AccumulateError> {
        let parsed = parse_fragment_header(fragment)?;
        let payload = &fragment[parsed.header_len()..];
        match parsed.header() {
            FragmentHeader::Start { kind, declared_len } => self.start(kind, declared_len, payload),
            FragmentHeader::Continuation => self.extend(payload),
        }
    }

    fn start(
        &mut self,
        kind: HeaderKind,
        declared: usize,
        payload: &[u8],
    ) -> Result<AccumulateStatus, AccumulateError> {
        if declared > self.max_message_size.get() {
            return Err(AccumulateError::MessageTooLarge {
                declared,
                limit: self.max_message_size,
            });
        }
        if matches!(self.state, State::InProgress { .. }) {
            debug!(
                "discarding partial message: buffered={}, header={kind}",
                self.buffer.len()
            );
        }

        self.buffer.clear();
        let remaining = declared
            .checked_sub(payload.len())
            .ok_or(AccumulateError::LengthOverrun {
                declared,
                received: payload.len(),
            })?;
        if declared == 0 {
            self.state = State::Idle;
            return Ok(AccumulateStatus::Empty);
        }
        self.buffer.reserve(declared);
        self.buffer.extend_from_slice(payload);
        Ok(self.advance(declared, remaining))
    }

    fn extend(&mut self, payload: &[u8]) -> Result<AccumulateStatus, AccumulateError> {
        let State::InProgress {
            declared,
            remaining,
        } = self.state
        else {
            return Err(AccumulateError::ContinuationWithoutMessage);
        };

        let remaining = remaining
            .checked_sub(payload.len())
            .ok_or(AccumulateError::LengthOverrun {
                declared,
                received: self.buffer.len().saturating_add(payload.len()),
            })?;
        self.buffer.extend_from_slice(payload);
        Ok(self.advance(declared, remaining))
    }

    fn advance(&mut self, declared: usize, remaining: usize) -> AccumulateStatus {
        if remaining == 0 {
            self.state = State::Complete;
            AccumulateStatus::Complete
        } else {
            self.state = State::InProgress {
                declared,
                remaining,
            };
            AccumulateStatus::Incomplete { remaining }
        }
    }

    /// Whether the buffered bytes form a complete message.
    ///
    /// A complete message always has a non-empty buffer.
    #[must_use]
    pub fn is_complete(&self) -> bool { self.state == State::Complete }

    /// Whether a message has started but not yet completed.
    #[must_use]
    pub fn is_in_progress(&self) -> bool { matches!(self.state, State::InProgress { .. }) }

    /// Payload bytes still expected for the message in progress.
    ///
    /// Zero when idle or complete.
    #[must_use]
    pub fn remaining(&self) -> usize {
        match self.state {
            State::InProgress { remaining, .. } => remaining,
            State::Idle | State::Complete => 0,
        }
    }

    /// Borrow the payload bytes accumulated so far.
    #[must_use]
    pub fn buffer(&self) -> &[u8] { &self.buffer }

    /// Take the completed message, leaving the accumulator idle.
    ///
    /// Returns `None` without touching state when no message is complete.
    pub fn take_message(&mut self) -> Option<Vec<u8>> {
        if !self.is_complete() {
            return None;
        }
        self.state = State::Idle;
        Some(std::mem::take(&mut self.buffer))
    }

    /// Discard any buffered payload and return to the idle state.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = State::Idle;
    }
}

impl Default for FragmentAccumulator {
    fn default() -> Self { Self::new() }
}
