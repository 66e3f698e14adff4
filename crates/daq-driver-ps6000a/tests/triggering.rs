//! Advanced triggering, digital ports and device queries against the
//! simulated unit.

#![cfg(feature = "mock")]

use daq_driver_ps6000a::{
    Action, BandwidthLimiter, Channel, Coupling, DeviceResolution, DigitalPortHysteresis,
    MockBoundary, MockConfig, PicoStatus, ProbeRange, Ps6000a, Ps6000aError, ThresholdDirection,
    ThresholdMode, TriggerChannelProperties, TriggerCondition, TriggerDirection, TriggerState,
    TriggerWithinPreTrigger,
};

fn open() -> Ps6000a<MockBoundary> {
    let mut scope = Ps6000a::mock();
    scope.open_unit(None, DeviceResolution::Bits8).unwrap();
    scope
}

// =============================================================================
// Advanced triggering
// =============================================================================

#[test]
fn window_trigger_tables_reach_the_unit() {
    let mut scope = open();
    let props = [
        TriggerChannelProperties::window(Channel::A, -30, 30, 2),
        TriggerChannelProperties::level(Channel::External, 100, 0),
    ];
    scope
        .set_trigger_channel_properties(&props, false, 5000)
        .unwrap();
    scope
        .set_trigger_channel_directions(&[TriggerDirection::new(
            Channel::A,
            ThresholdDirection::Rising,
            ThresholdMode::Window,
        )])
        .unwrap();
    scope.set_trigger_delay(64).unwrap();

    let held = scope.boundary().advanced_trigger();
    assert_eq!(held.properties, props.to_vec());
    assert_eq!(held.auto_trigger_us, 5000);
    assert_eq!(held.directions.len(), 1);
    assert_eq!(held.directions[0].mode, ThresholdMode::Window);
    assert_eq!(held.delay, 64);
    assert_eq!(scope.last_status(), Some(PicoStatus::OK));
}

#[test]
fn conditions_or_across_calls_and_and_within_one() {
    let mut scope = open();
    let a_and_b = [
        TriggerCondition::new(Channel::A, TriggerState::True),
        TriggerCondition::new(Channel::B, TriggerState::True),
    ];
    let c_low = [TriggerCondition::new(Channel::C, TriggerState::False)];

    scope
        .set_trigger_channel_conditions(&a_and_b, Action::CLEAR_ALL | Action::ADD)
        .unwrap();
    scope
        .set_trigger_channel_conditions(&c_low, Action::ADD)
        .unwrap();
    assert_eq!(
        scope.boundary().advanced_trigger().conditions,
        vec![a_and_b.to_vec(), c_low.to_vec()]
    );

    // Replacing drops both products
    scope
        .set_trigger_channel_conditions(&c_low, Action::CLEAR_ALL | Action::ADD)
        .unwrap();
    assert_eq!(
        scope.boundary().advanced_trigger().conditions,
        vec![c_low.to_vec()]
    );

    // An empty table with CLEAR_ALL switches triggering off
    scope
        .set_trigger_channel_conditions(&[], Action::CLEAR_ALL)
        .unwrap();
    assert!(scope.boundary().advanced_trigger().conditions.is_empty());
}

#[test]
fn rejected_trigger_setup_keeps_previous_tables() {
    let mut scope = open();
    let props = [TriggerChannelProperties::level(Channel::A, 10, 1)];
    scope.set_trigger_channel_properties(&props, false, 0).unwrap();

    let err = scope
        .set_trigger_channel_properties(
            &[TriggerChannelProperties::level(Channel::Unknown(99), 10, 1)],
            false,
            0,
        )
        .unwrap_err();
    assert_eq!(err.status(), Some(PicoStatus::INVALID_TRIGGER_CHANNEL));
    assert_eq!(scope.last_status(), Some(PicoStatus::INVALID_TRIGGER_CHANNEL));
    assert_eq!(scope.boundary().advanced_trigger().properties, props.to_vec());

    let err = scope
        .set_trigger_channel_properties(
            &[TriggerChannelProperties::window(Channel::A, 50, -50, 0)],
            false,
            0,
        )
        .unwrap_err();
    assert_eq!(err.status(), Some(PicoStatus::INVALID_TRIGGER_PROPERTY));
}

#[test]
fn pre_trigger_arm_and_delay_conflict() {
    let mut scope = open();
    scope
        .trigger_within_pre_trigger_samples(TriggerWithinPreTrigger::Arm)
        .unwrap();
    let err = scope.set_trigger_delay(100).unwrap_err();
    assert_eq!(
        err.status(),
        Some(PicoStatus::TRIGGER_WITHIN_PRE_NOT_ALLOWED_WITH_DELAY)
    );

    scope
        .trigger_within_pre_trigger_samples(TriggerWithinPreTrigger::Disable)
        .unwrap();
    scope.set_trigger_delay(100).unwrap();
    assert_eq!(scope.boundary().advanced_trigger().delay, 100);
}

#[test]
fn oversized_tables_never_reach_the_unit() {
    let mut scope = open();
    let conditions = vec![TriggerCondition::new(Channel::A, TriggerState::True); 40_000];
    let err = scope
        .set_trigger_channel_conditions(&conditions, Action::ADD)
        .unwrap_err();
    assert!(err.is_validation());
    assert!(!scope
        .boundary()
        .calls()
        .contains(&"SetTriggerChannelConditions"));
}

#[test]
fn trigger_calls_need_an_open_unit() {
    let mut scope = Ps6000a::mock();
    assert!(matches!(
        scope.set_trigger_delay(1).unwrap_err(),
        Ps6000aError::Handle(_)
    ));
    assert!(scope.boundary().calls().is_empty());
}

#[test]
fn close_forgets_trigger_tables_and_ports() {
    let mut scope = open();
    scope
        .set_trigger_channel_properties(
            &[TriggerChannelProperties::level(Channel::B, 0, 0)],
            false,
            0,
        )
        .unwrap();
    scope
        .set_digital_port_on(Channel::Port0, &[1000; 8], DigitalPortHysteresis::Normal100mV)
        .unwrap();
    scope.close_unit().unwrap();

    scope.open_unit(None, DeviceResolution::Bits8).unwrap();
    assert!(scope.boundary().advanced_trigger().properties.is_empty());
    assert_eq!(scope.boundary().digital_port(Channel::Port0), None);
}

// =============================================================================
// Digital ports
// =============================================================================

#[test]
fn digital_port_on_and_off() {
    let mut scope = open();
    scope
        .set_digital_port_on(Channel::Port1, &[500, 500, -500], DigitalPortHysteresis::Low50mV)
        .unwrap();
    let port = scope.boundary().digital_port(Channel::Port1).unwrap();
    assert_eq!(port.thresholds, vec![500, 500, -500]);
    assert_eq!(port.hysteresis, DigitalPortHysteresis::Low50mV);

    scope.set_digital_port_off(Channel::Port1).unwrap();
    assert_eq!(scope.boundary().digital_port(Channel::Port1), None);
}

#[test]
fn digital_port_rejects_analog_channel_and_bad_hysteresis() {
    let mut scope = open();
    let err = scope
        .set_digital_port_on(Channel::A, &[0], DigitalPortHysteresis::High200mV)
        .unwrap_err();
    assert_eq!(err.status(), Some(PicoStatus::INVALID_CHANNEL));

    let err = scope
        .set_digital_port_on(Channel::Port2, &[0], DigitalPortHysteresis::Unknown(9))
        .unwrap_err();
    assert_eq!(
        err.status(),
        Some(PicoStatus::DIGITAL_PORT_HYSTERESIS_OUT_OF_RANGE)
    );
    assert_eq!(scope.boundary().digital_port(Channel::Port2), None);
}

// =============================================================================
// Queries
// =============================================================================

#[test]
fn max_segments_query_scales_with_channels_and_resolution() {
    let mut scope = open();
    let one = scope
        .query_max_segments_by_samples(10_000, 1, DeviceResolution::Bits8)
        .unwrap();
    let four = scope
        .query_max_segments_by_samples(10_000, 4, DeviceResolution::Bits8)
        .unwrap();
    let wide = scope
        .query_max_segments_by_samples(10_000, 1, DeviceResolution::Bits12)
        .unwrap();
    assert_eq!(one, 4 * four);
    assert_eq!(one, 2 * wide);

    // A query does not segment memory
    let info = scope.get_timebase(5, 1000, 0).unwrap();
    assert_eq!(info.max_samples, MockConfig::default().memory_samples);
    assert!(scope.get_timebase(5, 1000, 1).is_err());
}

#[test]
fn scaling_values_follow_channel_settings() {
    let mut scope = open();
    scope
        .set_channel_on(
            Channel::B,
            Coupling::Dc,
            ProbeRange::X1Probe2V,
            0.5,
            BandwidthLimiter::Full,
        )
        .unwrap();

    let values = scope
        .get_scaling_values(&[Channel::B, Channel::D])
        .unwrap();
    assert_eq!(values.len(), 2);

    let b = values[0];
    assert_eq!(b.channel, Channel::B);
    assert_eq!(b.range, ProbeRange::X1Probe2V);
    // 8-bit: 0.5 V of 2 V full scale is 31 codes
    assert_eq!(b.offset, 31);
    assert!((b.scaling_factor - 2.0 / 127.0).abs() < 1e-12);

    let d = values[1];
    assert_eq!(d.channel, Channel::D);
    assert_eq!(d.range, ProbeRange::ProbeOff);
    assert_eq!(d.scaling_factor, 0.0);

    let err = scope.get_scaling_values(&[Channel::Port0]).unwrap_err();
    assert_eq!(err.status(), Some(PicoStatus::INVALID_CHANNEL));
}
