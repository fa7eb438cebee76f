//! Log records emitted while routing notifications.

mod common;

use std::time::{Duration, Instant};

use common::{LoggerHandle, logger};
use gattframe::{AssemblyConfig, ChannelId, ResponseRouter};
use log::Level;
use rstest::rstest;

const RESPONSE: ChannelId = ChannelId::new(0x0031);

fn router() -> ResponseRouter {
    let mut router = ResponseRouter::new(AssemblyConfig::default());
    router.register(RESPONSE);
    router
}

fn find<'a>(records: &'a [(Level, String)], level: Level, needle: &str) -> Option<&'a str> {
    records
        .iter()
        .find(|(lvl, message)| *lvl == level && message.contains(needle))
        .map(|(_, message)| message.as_str())
}

#[rstest]
fn discarded_response_is_warned(mut logger: LoggerHandle) {
    logger.drain();
    let mut router = router();
    router.push(RESPONSE, &[0x04, 0x01, 0x00]).expect("start");
    router.push(RESPONSE, &[0x60]).expect_err("reserved header");

    let records = logger.drain();
    let warning = find(&records, Level::Warn, "discarding response")
        .expect("reassembly failure should be warned");
    assert!(warning.contains("channel=0x0031"), "got: {warning}");
    assert!(warning.contains("reserved header type"), "got: {warning}");
}

#[rstest]
fn undecodable_response_is_warned(mut logger: LoggerHandle) {
    logger.drain();
    router()
        .push(RESPONSE, &[0x01, 0x01])
        .expect_err("payload too short");

    let records = logger.drain();
    assert!(find(&records, Level::Warn, "undecodable response").is_some());
}

#[rstest]
fn eviction_is_logged_at_debug(mut logger: LoggerHandle) {
    logger.drain();
    let mut router = router();
    let start = Instant::now();
    router
        .push_at(RESPONSE, &[0x08, 0x01, 0x00], start)
        .expect("start");
    router.purge_expired_at(start + Duration::from_secs(60));

    let records = logger.drain();
    let evicted = find(&records, Level::Debug, "evicting stalled response")
        .expect("eviction should be logged");
    assert!(evicted.contains("remaining=6"), "got: {evicted}");
}
