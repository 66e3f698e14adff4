//! Buffer registration as seen by the device and by the registry.

#![cfg(feature = "mock")]

use daq_driver_ps6000a::{
    Action, BlockSettings, Buffer, BufferClass, BufferRole, Channel, DataType, DeviceResolution,
    MockBoundary, Ps6000a, RatioMode,
};

fn open() -> Ps6000a<MockBoundary> {
    let mut scope = Ps6000a::mock();
    scope.open_unit(None, DeviceResolution::Bits8).unwrap();
    scope
}

#[test]
fn clear_others_replaces_class_on_both_sides() {
    let mut scope = open();
    scope
        .get_data_buffer(Channel::A, DataType::Int8, 0, RatioMode::RAW, 10, false)
        .unwrap();
    scope
        .get_data_buffer(Channel::A, DataType::Int8, 0, RatioMode::RAW, 10, false)
        .unwrap();
    let other_class = scope
        .get_data_buffer(Channel::B, DataType::Int8, 0, RatioMode::RAW, 10, false)
        .unwrap();
    assert_eq!(scope.boundary().registered(Channel::A, DataType::Int8, 0), 2);

    let kept = scope
        .get_data_buffer(Channel::A, DataType::Int8, 0, RatioMode::RAW, 20, true)
        .unwrap();
    let last = scope.boundary().set_data_buffers_calls().pop().unwrap();
    assert_eq!(last.action, Action::CLEAR_ALL | Action::ADD);
    assert_eq!(last.n_samples, 20);

    assert_eq!(
        scope.get_all_existing_data_buffers(Some(Channel::A), None, None),
        vec![kept]
    );
    assert_eq!(scope.boundary().registered(Channel::A, DataType::Int8, 0), 1);
    assert_eq!(
        scope.get_all_existing_data_buffers(Some(Channel::B), None, None),
        vec![other_class]
    );
}

#[test]
fn clear_submits_null_addresses_and_empties_one_class() {
    let mut scope = open();
    scope
        .get_data_buffer(Channel::A, DataType::Int8, 0, RatioMode::RAW, 10, true)
        .unwrap();
    let seg1 = scope
        .get_data_buffer(Channel::A, DataType::Int8, 1, RatioMode::RAW, 10, true)
        .unwrap();

    scope
        .clear_data_buffers(Channel::A, DataType::Int8, 0)
        .unwrap();
    let call = scope.boundary().set_data_buffers_calls().pop().unwrap();
    assert_eq!((call.max, call.min, call.n_samples), (0, 0, 0));
    assert_eq!(call.action, Action::CLEAR_ALL);

    assert_eq!(scope.total_buffers(), 1);
    assert_eq!(
        scope.get_all_existing_data_buffers(Some(Channel::A), None, None),
        vec![seg1]
    );
    assert_eq!(scope.boundary().registered(Channel::A, DataType::Int8, 0), 0);
    assert_eq!(scope.boundary().registered(Channel::A, DataType::Int8, 1), 1);
}

#[test]
fn mixed_raw_and_aggregate_pairs() {
    let mut scope = open();
    let raw = scope
        .get_data_buffer(Channel::A, DataType::Int8, 0, RatioMode::RAW, 100, false)
        .unwrap();
    let (agg_max, agg_min) = scope
        .get_data_buffers(Channel::A, DataType::Int8, 0, RatioMode::AGGREGATE, 100, false)
        .unwrap();

    let set = scope.get_existing_data_buffer_pairs(Channel::A, DataType::Int8, 0);
    assert!(set.orphans.is_empty());
    assert_eq!(set.pairs.len(), 2);

    let raw_pair = set.pairs.iter().find(|p| p.mode == RatioMode::RAW).unwrap();
    assert_eq!(raw_pair.max, raw);
    assert!(raw_pair.min.is_none());

    let agg_pair = set
        .pairs
        .iter()
        .find(|p| p.mode == RatioMode::AGGREGATE)
        .unwrap();
    assert_eq!(agg_pair.max, agg_max);
    assert_eq!(agg_pair.max.role(), BufferRole::Max);
    assert_eq!(agg_pair.min.as_ref(), Some(&agg_min));
}

#[test]
fn reload_resubmits_without_touching_registry() {
    let mut scope = open();
    let (max, min) = scope
        .get_data_buffers(Channel::C, DataType::Int16, 0, RatioMode::AGGREGATE, 64, true)
        .unwrap();
    let before = scope.get_all_existing_data_buffers(None, None, None);
    let calls_before = scope.boundary().set_data_buffers_calls().len();

    let reloaded = scope
        .reload_data_buffers(Channel::C, DataType::Int16, 0)
        .unwrap();
    assert_eq!(reloaded, vec![max, min.clone()]);
    assert_eq!(reloaded[1].role(), BufferRole::Min);
    assert_eq!(scope.get_all_existing_data_buffers(None, None, None), before);

    let calls = scope.boundary().set_data_buffers_calls();
    assert_eq!(calls.len(), calls_before + 1);
    let call = calls.last().unwrap();
    assert_eq!(call.action, Action::ADD);
    assert_ne!(call.max, 0);
    assert_ne!(call.min, 0);
}

#[test]
fn registering_the_same_buffer_again_is_idempotent() {
    let mut scope = open();
    let buffer = scope
        .get_data_buffer(Channel::A, DataType::Int16, 0, RatioMode::RAW, 32, false)
        .unwrap();
    scope.set_data_buffers(&buffer, None, false).unwrap();
    scope.set_data_buffers(&buffer, None, false).unwrap();

    let set = scope.get_existing_data_buffer_pairs(Channel::A, DataType::Int16, 0);
    assert_eq!(set.pairs.len(), 1);
    assert!(set.orphans.is_empty());
    assert_eq!(
        scope.get_all_existing_data_buffers(Some(Channel::A), None, None),
        vec![buffer.clone()]
    );
    assert_eq!(scope.total_buffers(), 1);
    assert_eq!(scope.boundary().registered(Channel::A, DataType::Int16, 0), 1);

    let calls_before = scope.boundary().set_data_buffers_calls().len();
    let reloaded = scope
        .reload_data_buffers(Channel::A, DataType::Int16, 0)
        .unwrap();
    assert_eq!(reloaded, vec![buffer]);
    assert_eq!(
        scope.boundary().set_data_buffers_calls().len(),
        calls_before + 1
    );
}

#[test]
fn re_registering_a_pair_keeps_one_pair() {
    let mut scope = open();
    let (max, min) = scope
        .get_data_buffers(Channel::B, DataType::Int8, 0, RatioMode::AGGREGATE, 16, true)
        .unwrap();
    scope.set_data_buffers(&max, Some(&min), false).unwrap();

    let set = scope.get_existing_data_buffer_pairs(Channel::B, DataType::Int8, 0);
    assert_eq!(set.pairs.len(), 1);
    assert_eq!(set.pairs[0].min.as_ref(), Some(&min));
    assert_eq!(scope.total_buffers(), 2);
    assert_eq!(scope.boundary().registered(Channel::B, DataType::Int8, 0), 1);
}

#[test]
fn reload_of_empty_class_is_a_no_op() {
    let mut scope = open();
    assert!(scope
        .reload_data_buffers(Channel::D, DataType::Int8, 0)
        .unwrap()
        .is_empty());
    assert!(scope.boundary().set_data_buffers_calls().is_empty());
}

#[test]
fn equal_attributes_stay_distinct() {
    let mut scope = open();
    let class = BufferClass::new(Channel::A, DataType::Int8, 0);
    let first = Buffer::new(class, RatioMode::RAW, BufferRole::Max, 8).unwrap();
    let second = Buffer::new(class, RatioMode::RAW, BufferRole::Max, 8).unwrap();
    assert_ne!(first, second);

    scope.set_data_buffers(&first, None, false).unwrap();
    scope.set_data_buffers(&second, None, false).unwrap();
    assert_eq!(scope.registry().class(&class), &[first, second]);
}

#[test]
fn buffers_survive_repeated_captures_and_close() {
    let mut scope = open();
    let buffer = scope
        .get_data_buffer(Channel::A, DataType::Int8, 0, RatioMode::RAW, 50, true)
        .unwrap();

    for _ in 0..2 {
        scope.run_block(&BlockSettings::new(0, 50, 3), None).unwrap();
        while !scope.is_ready().unwrap() {
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        assert_eq!(scope.get_values(0, 50, 1, RatioMode::RAW, 0).unwrap().samples, 50);
    }
    assert_eq!(scope.total_buffers(), 1);

    scope.close_unit().unwrap();
    assert_eq!(scope.total_buffers(), 0);
    // The caller's clone still owns the data
    assert_eq!(buffer.read().len(), 50);
}
