//! Block capture completion: polling, notification and trampoline lifetime.

#![cfg(feature = "mock")]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use daq_driver_ps6000a::{
    BlockSettings, Channel, ChannelFlags, DataType, DeviceResolution, MockBoundary, MockConfig,
    PicoStatus, Ps6000a, RatioMode, ReadyCallback, ReadySignal,
};

// =============================================================================
// Helpers
// =============================================================================

fn open(config: MockConfig) -> Ps6000a<MockBoundary> {
    let mut scope = Ps6000a::with_boundary(MockBoundary::new(config));
    scope.open_unit(None, DeviceResolution::Bits8).unwrap();
    scope
}

fn wait_ready(scope: &mut Ps6000a<MockBoundary>) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !scope.is_ready().unwrap() {
        assert!(Instant::now() < deadline, "capture never completed");
        thread::sleep(Duration::from_millis(1));
    }
}

fn codes(range: std::ops::Range<u64>) -> Vec<i64> {
    range
        .map(|i| MockBoundary::sample_code(DataType::Int8, i))
        .collect()
}

// =============================================================================
// Polling
// =============================================================================

#[test]
fn poll_mode_capture_and_readback() {
    let mut scope = open(MockConfig::default());
    let buffer = scope
        .get_data_buffer(Channel::A, DataType::Int8, 0, RatioMode::RAW, 1000, true)
        .unwrap();

    let indisposed = scope
        .run_block(&BlockSettings::new(100, 900, 5), None)
        .unwrap();
    assert!((indisposed - 5.0).abs() < 1e-9);
    assert_eq!(scope.live_trampolines(), 0);

    wait_ready(&mut scope);
    let read = scope.get_values(0, 1000, 1, RatioMode::RAW, 0).unwrap();
    assert_eq!(read.samples, 1000);
    assert!(read.overflow.is_empty());
    assert_eq!(buffer.read().to_i64(), codes(0..1000));
}

#[test]
fn values_before_completion_are_unavailable() {
    let mut scope = open(MockConfig {
        block_latency: Duration::from_secs(60),
        ..MockConfig::default()
    });
    scope
        .get_data_buffer(Channel::A, DataType::Int8, 0, RatioMode::RAW, 100, true)
        .unwrap();
    scope.run_block(&BlockSettings::new(0, 100, 5), None).unwrap();

    assert!(!scope.is_ready().unwrap());
    let err = scope.get_values(0, 100, 1, RatioMode::RAW, 0).unwrap_err();
    assert_eq!(err.status(), Some(PicoStatus::DATA_NOT_AVAILABLE));
}

#[test]
fn partial_read_from_offset() {
    let mut scope = open(MockConfig::default());
    let buffer = scope
        .get_data_buffer(Channel::A, DataType::Int8, 0, RatioMode::RAW, 1000, true)
        .unwrap();
    scope.run_block(&BlockSettings::new(0, 1000, 5), None).unwrap();
    wait_ready(&mut scope);

    let read = scope.get_values(200, 1000, 1, RatioMode::RAW, 0).unwrap();
    assert_eq!(read.samples, 800);
    assert_eq!(buffer.read_range(0, 800).unwrap().to_i64(), codes(200..1000));
}

#[test]
fn overflow_flags_reported() {
    let mut scope = open(MockConfig {
        overflow: ChannelFlags::A | ChannelFlags::C,
        ..MockConfig::default()
    });
    scope
        .get_data_buffer(Channel::A, DataType::Int8, 0, RatioMode::RAW, 10, true)
        .unwrap();
    scope.run_block(&BlockSettings::new(0, 10, 5), None).unwrap();
    wait_ready(&mut scope);

    let read = scope.get_values(0, 10, 1, RatioMode::RAW, 0).unwrap();
    assert_eq!(read.overflow, ChannelFlags::A | ChannelFlags::C);
}

#[test]
fn values_without_buffers_rejected_by_device() {
    let mut scope = open(MockConfig::default());
    scope.run_block(&BlockSettings::new(0, 10, 5), None).unwrap();
    wait_ready(&mut scope);
    let err = scope.get_values(0, 10, 1, RatioMode::RAW, 0).unwrap_err();
    assert_eq!(err.status(), Some(PicoStatus::BUFFERS_NOT_SET));
}

#[test]
fn empty_capture_never_reaches_device() {
    let mut scope = open(MockConfig::default());
    let err = scope
        .run_block(&BlockSettings::new(0, 0, 5), None)
        .unwrap_err();
    assert!(err.is_validation());
    assert!(!scope.boundary().calls().contains(&"RunBlock"));
}

#[test]
fn trigger_info_per_segment() {
    let mut scope = open(MockConfig::default());
    scope.memory_segments(4).unwrap();
    scope
        .get_data_buffer(Channel::A, DataType::Int8, 2, RatioMode::RAW, 100, true)
        .unwrap();
    scope
        .run_block(&BlockSettings::new(25, 75, 5).segment(2), None)
        .unwrap();
    wait_ready(&mut scope);

    let infos = scope.get_trigger_info(0, 4).unwrap();
    assert_eq!(infos.len(), 4);
    for (i, info) in infos.iter().enumerate() {
        assert_eq!(info.segment_index, i as u64);
        assert_eq!(info.trigger_index, 25);
        assert_eq!(info.status, PicoStatus::OK);
    }

    let err = scope.get_trigger_info(2, 4).unwrap_err();
    assert_eq!(err.status(), Some(PicoStatus::SEGMENT_OUT_OF_RANGE));
}

// =============================================================================
// Notification
// =============================================================================

#[tokio::test]
async fn ready_signal_wakes_waiter() {
    let mut scope = open(MockConfig::default());
    scope
        .get_data_buffer(Channel::A, DataType::Int8, 0, RatioMode::RAW, 100, true)
        .unwrap();

    let signal = ReadySignal::new();
    scope
        .run_block(&BlockSettings::new(0, 100, 5), Some(signal.callback()))
        .unwrap();
    let status = tokio::time::timeout(Duration::from_secs(5), signal.wait())
        .await
        .unwrap();
    assert_eq!(status, PicoStatus::OK);
    assert!(scope.is_ready().unwrap());
    assert_eq!(scope.get_values(0, 100, 1, RatioMode::RAW, 0).unwrap().samples, 100);

    scope.close_unit().unwrap();
    assert_eq!(scope.boundary().callbacks_fired(), 1);
}

#[test]
fn callback_fires_once_per_run() {
    let mut scope = open(MockConfig::default());
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    let callback: ReadyCallback = Arc::new(move |_handle: i16, _status: PicoStatus| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    for _ in 0..3 {
        scope
            .run_block(&BlockSettings::new(0, 10, 5), Some(&callback))
            .unwrap();
        wait_ready(&mut scope);
    }
    // One trampoline serves every run of the same callback
    assert_eq!(scope.live_trampolines(), 1);

    scope.close_unit().unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 3);
    assert_eq!(scope.live_trampolines(), 0);
}

#[test]
fn distinct_callbacks_get_distinct_trampolines() {
    let mut scope = open(MockConfig::default());
    let first = ReadySignal::new();
    let second = ReadySignal::new();

    scope
        .run_block(&BlockSettings::new(0, 10, 5), Some(first.callback()))
        .unwrap();
    wait_ready(&mut scope);
    scope
        .run_block(&BlockSettings::new(0, 10, 5), Some(second.callback()))
        .unwrap();
    wait_ready(&mut scope);
    assert_eq!(scope.live_trampolines(), 2);

    scope.close_unit().unwrap();
    assert_eq!(first.status(), Some(PicoStatus::OK));
    assert_eq!(second.status(), Some(PicoStatus::OK));
}

#[test]
fn panicking_callback_is_contained() {
    let mut scope = open(MockConfig::default());
    let callback: ReadyCallback = Arc::new(|_handle: i16, _status: PicoStatus| panic!("handler failed"));

    scope
        .run_block(&BlockSettings::new(0, 10, 5), Some(&callback))
        .unwrap();
    wait_ready(&mut scope);

    scope.close_unit().unwrap();
    assert_eq!(scope.boundary().callbacks_fired(), 1);
}

#[test]
fn session_drop_waits_for_pending_notification() {
    let signal = ReadySignal::new();
    {
        let mut scope = open(MockConfig {
            block_latency: Duration::from_millis(20),
            ..MockConfig::default()
        });
        scope
            .run_block(&BlockSettings::new(0, 10, 5), Some(signal.callback()))
            .unwrap();
    }
    assert_eq!(signal.status(), Some(PicoStatus::OK));
}
