//! Loading acquisition configs from disk and applying them to a session.

#![cfg(feature = "mock")]

use std::io::Write;

use daq_driver_ps6000a::{
    AcquisitionConfig, Channel, Coupling, DataType, DeviceResolution, MockBoundary, ProbeRange,
    Ps6000a, Ps6000aError, RatioMode, ThresholdDirection,
};
use tempfile::NamedTempFile;

const BLOCK_SETUP: &str = r#"
resolution = "DR_12BIT"

[[channel]]
channel = "A"
range = "X1_PROBE_1V"
coupling = "DC_50OHM"

[[channel]]
channel = "B"
range = "X1_PROBE_2V"
enabled = false

[trigger]
source = "A"
threshold_volts = 0.25
direction = "falling"
auto_trigger_us = 1000

[[buffer]]
channel = "A"
len = 2000

[[buffer]]
channel = "A"
mode = "AGGREGATE"
len = 200
with_min = true

[block]
pre_trigger = 500
post_trigger = 1500
timebase = 5
"#;

fn write_config(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file
}

#[test]
fn load_open_apply_capture() -> anyhow::Result<()> {
    let file = write_config(BLOCK_SETUP);
    let config = AcquisitionConfig::load(file.path())?;
    assert_eq!(config.resolution, DeviceResolution::Bits12);
    assert_eq!(config.buffers.len(), 2);

    let mut scope = Ps6000a::mock();
    config.open(&mut scope)?;
    let pairs = config.apply(&mut scope)?;

    let a = scope.boundary().channel(Channel::A).unwrap();
    assert_eq!(a.coupling, Coupling::Dc50Ohm);
    assert_eq!(a.range, ProbeRange::X1Probe1V);
    assert!(scope.boundary().channel(Channel::B).is_none());

    // 0.25 V of 1 V at 12-bit (i16 codes) truncates to 8191
    let trigger = scope.boundary().trigger().unwrap();
    assert_eq!(trigger.threshold, 8191);
    assert_eq!(trigger.direction, ThresholdDirection::Falling);

    assert_eq!(pairs.len(), 2);
    assert_eq!(pairs[0].max.data_type(), DataType::Int16);
    assert!(pairs[0].min.is_none());
    assert_eq!(pairs[1].mode, RatioMode::AGGREGATE);
    assert!(pairs[1].min.is_some());
    assert_eq!(scope.total_buffers(), 3);

    let block = config.block.as_ref().unwrap();
    scope.run_block(block, None)?;
    while !scope.is_ready()? {
        std::thread::sleep(std::time::Duration::from_millis(1));
    }
    let read = scope.get_values(0, block.total_samples(), 1, RatioMode::RAW, 0)?;
    assert_eq!(read.samples, 2000);
    assert_eq!(
        pairs[0].max.read_range(1999, 1)?.to_i64(),
        vec![MockBoundary::sample_code(DataType::Int16, 1999)]
    );
    Ok(())
}

#[test]
fn applying_twice_does_not_duplicate_buffers() -> anyhow::Result<()> {
    let config = AcquisitionConfig::from_toml_str(BLOCK_SETUP)?;
    let mut scope = Ps6000a::mock();
    config.open(&mut scope)?;
    config.apply(&mut scope)?;
    config.apply(&mut scope)?;
    assert_eq!(scope.total_buffers(), 3);
    assert_eq!(
        scope.boundary().registered(Channel::A, DataType::Int16, 0),
        2
    );
    Ok(())
}

#[test]
fn resolution_pushed_when_session_differs() -> anyhow::Result<()> {
    let config = AcquisitionConfig::from_toml_str(BLOCK_SETUP)?;
    let mut scope = Ps6000a::mock();
    scope.open_unit(None, DeviceResolution::Bits8)?;
    config.apply(&mut scope)?;
    assert_eq!(scope.resolution(), DeviceResolution::Bits12);
    assert!(scope.boundary().calls().contains(&"SetDeviceResolution"));
    Ok(())
}

#[test]
fn apply_requires_open_unit() {
    let config = AcquisitionConfig::from_toml_str(BLOCK_SETUP).unwrap();
    let mut scope = Ps6000a::mock();
    let err = config.apply(&mut scope).unwrap_err();
    assert!(err.is_handle_error());
}

#[test]
fn missing_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = AcquisitionConfig::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, Ps6000aError::Config { .. }));
}

#[test]
fn invalid_file_is_config_error() {
    let file = write_config("[[channel]]\nchannel = \"A\"\nrange = \"X1_PROBE_3V\"\n");
    let err = AcquisitionConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, Ps6000aError::Config { .. }));
}
