#![doc(html_root_url = "https://docs.rs/gattframe/latest")]
//! Reassembly and decoding of BLE GATT response notifications.
//!
//! Responses larger than the negotiated MTU arrive as a series of
//! notifications. The first carries a compact length header; the rest carry
//! a continuation flag. [`FragmentAccumulator`] stitches them back together
//! and [`decode`] turns the completed payload into an id, a status and a set
//! of TLV parameters. [`ResponseRouter`] and [`response_channel`] provide the
//! per-channel routing and async hand-off a BLE client needs around them.

pub mod accumulator;
pub mod config;
pub mod decoder;
pub mod encoder;
pub mod fragmenter;
pub mod header;
pub mod hexdump;
pub mod metrics;
pub mod router;
pub mod session;

pub use accumulator::{AccumulateError, AccumulateStatus, FragmentAccumulator};
pub use config::{AssemblyConfig, ConfigError};
pub use decoder::{DecodeError, DecodedMessage, decode};
pub use encoder::EncodeError;
pub use fragmenter::{FragmentBatch, FragmentationError, Fragmenter};
pub use header::{FragmentHeader, HeaderError, HeaderKind, parse_fragment_header};
pub use router::{ChannelId, ResponseRouter, RouterError};
pub use session::{
    NotificationHandler,
    Response,
    ResponseWaiter,
    WaitError,
    response_channel,
    response_channel_with_capacity,
};
