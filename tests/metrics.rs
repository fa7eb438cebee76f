#![cfg(feature = "metrics")]
//! Tests for `gattframe` metrics.
//!
//! Counters are observed through `metrics_util::debugging::DebuggingRecorder`
//! while a router processes notifications.

use std::{
    num::NonZeroUsize,
    time::{Duration, Instant},
};

use gattframe::{
    AssemblyConfig,
    ChannelId,
    ResponseRouter,
    metrics as gatt_metrics,
    response_channel_with_capacity,
};
use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use rstest::rstest;

const RESPONSE: ChannelId = ChannelId::new(0x0031);

/// Creates a debugging recorder and snapshotter for metrics testing.
fn debugging_recorder_setup() -> (Snapshotter, DebuggingRecorder) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    (snapshotter, recorder)
}

fn router() -> ResponseRouter {
    let config = AssemblyConfig::default().with_reassembly_timeout(Duration::from_secs(5));
    let mut router = ResponseRouter::new(config);
    router.register(RESPONSE);
    router
}

/// Sum of counter values named `name` carrying `label`, if any.
fn counter_value(snapshotter: &Snapshotter, name: &str, label: Option<(&str, &str)>) -> u64 {
    snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .filter(|(key, _, _, _)| key.key().name() == name)
        .filter(|(key, _, _, _)| {
            label.is_none_or(|(k, v)| key.key().labels().any(|l| l.key() == k && l.value() == v))
        })
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(count) => count,
            other => panic!("{name} is not a counter: {other:?}"),
        })
        .sum()
}

#[test]
fn decoded_responses_are_counted_by_outcome() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        let mut router = router();
        assert_eq!(router.push(RESPONSE, &[0x04, 0x01]), Ok(None));
        let success = router
            .push(RESPONSE, &[0x80, 0x00, 0x07, 0x00])
            .expect("valid continuation")
            .expect("completes");
        assert!(success.is_success());
        assert_eq!(success.parameter(0x07), Some(&[][..]));
        let failure = router
            .push(RESPONSE, &[0x02, 0x01, 0x04])
            .expect("valid notification")
            .expect("failing status completes");
        assert!(!failure.is_success());
    });

    assert_eq!(
        counter_value(&snapshotter, gatt_metrics::FRAGMENTS_RECEIVED, None),
        3
    );
    assert_eq!(
        counter_value(
            &snapshotter,
            gatt_metrics::MESSAGES_DECODED,
            Some(("success", "true"))
        ),
        1
    );
    assert_eq!(
        counter_value(
            &snapshotter,
            gatt_metrics::MESSAGES_DECODED,
            Some(("success", "false"))
        ),
        1
    );
    assert_eq!(
        counter_value(&snapshotter, gatt_metrics::ERRORS_TOTAL, None),
        0
    );
}

#[rstest]
#[case::reassembly(&[0x80, 0x01], "reassembly")]
#[case::decode(&[0x01, 0x01], "decode")]
fn failures_are_counted_by_stage(#[case] fragment: &[u8], #[case] kind: &str) {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        router().push(RESPONSE, fragment).expect_err("rejected");
    });

    assert_eq!(
        counter_value(&snapshotter, gatt_metrics::ERRORS_TOTAL, Some(("kind", kind))),
        1
    );
}

#[test]
fn unknown_channel_is_counted() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        router()
            .push(ChannelId::new(0x0099), &[0x02, 0x01, 0x00])
            .expect_err("unregistered");
    });

    assert_eq!(
        counter_value(
            &snapshotter,
            gatt_metrics::ERRORS_TOTAL,
            Some(("kind", "unknown_channel"))
        ),
        1
    );
}

#[test]
fn evictions_are_counted() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        let mut router = router();
        let start = Instant::now();
        router
            .push_at(RESPONSE, &[0x08, 0x01, 0x00], start)
            .expect("start");
        assert_eq!(
            router.purge_expired_at(start + Duration::from_secs(5)),
            vec![RESPONSE]
        );
    });

    assert_eq!(
        counter_value(&snapshotter, gatt_metrics::REASSEMBLIES_EVICTED, None),
        1
    );
}

#[test]
fn dropped_outcomes_are_counted() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        let (mut handler, _waiter) =
            response_channel_with_capacity(router(), NonZeroUsize::new(1).expect("non-zero"));
        for _ in 0..3 {
            assert!(handler.on_notification(RESPONSE, &[0x02, 0x01, 0x00]));
        }
    });

    assert_eq!(
        counter_value(
            &snapshotter,
            gatt_metrics::ERRORS_TOTAL,
            Some(("kind", "queue_full"))
        ),
        2
    );
}
