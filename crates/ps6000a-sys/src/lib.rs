//! Low-level FFI bindings for the PicoScope 6000E (`ps6000a`) driver.
//!
//! This crate provides raw, unsafe declarations for the subset of the
//! `ps6000aApi.h` interface used by the acquisition core: device open/close,
//! channel, digital-port and trigger setup, data-buffer registration, block and streaming
//! capture, and the block-ready notification typedef.
//!
//! # Safety
//!
//! All functions in this crate are `unsafe` as they are direct FFI bindings.
//! For a safe wrapper, use the `daq-driver-ps6000a` crate instead.
//!
//! # Features
//!
//! - `picosdk`: Declare and link the driver functions. Without this feature
//!   only the types and constants are available, which is enough to build
//!   and test the safe crate against its simulated device.

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
#![allow(clippy::all)]

#[cfg(feature = "picosdk")]
use std::os::raw::c_char;
use std::os::raw::c_void;

/// Status code returned by every driver function.
pub type PICO_STATUS = u32;

pub type PICO_CHANNEL = u32;
pub type PICO_CHANNEL_FLAGS = u32;
pub type PICO_COUPLING = u32;
pub type PICO_CONNECT_PROBE_RANGE = u32;
pub type PICO_BANDWIDTH_LIMITER = u32;
pub type PICO_DEVICE_RESOLUTION = u32;
pub type PICO_DATA_TYPE = u32;
pub type PICO_RATIO_MODE = u32;
pub type PICO_ACTION = u32;
pub type PICO_TIME_UNITS = u32;
pub type PICO_THRESHOLD_DIRECTION = u32;
pub type PICO_INFO = u32;
pub type PICO_THRESHOLD_MODE = u32;
pub type PICO_TRIGGER_STATE = u32;
pub type PICO_DIGITAL_PORT_HYSTERESIS = u32;
pub type PICO_TRIGGER_WITHIN_PRE_TRIGGER = u32;

/// Notification invoked by the driver when a block capture completes.
///
/// The driver calls this from its own thread, exactly once per `RunBlock`.
pub type ps6000aBlockReady =
    Option<unsafe extern "system" fn(handle: i16, status: PICO_STATUS, pParameter: *mut c_void)>;

/// Per-buffer information exchanged with `ps6000aGetStreamingLatestValues`.
///
/// The caller fills `channel_`, `mode_` and `type_`; the driver fills the rest.
#[repr(C, packed)]
#[derive(Debug, Copy, Clone, Default)]
pub struct PICO_STREAMING_DATA_INFO {
    pub channel_: PICO_CHANNEL,
    pub mode_: PICO_RATIO_MODE,
    pub type_: PICO_DATA_TYPE,
    pub noOfSamples_: i32,
    pub bufferIndex_: u64,
    pub startIndex_: i32,
    pub overflow_: i16,
}

/// Trigger information reported alongside a streaming poll.
#[repr(C, packed)]
#[derive(Debug, Copy, Clone, Default)]
pub struct PICO_STREAMING_DATA_TRIGGER_INFO {
    pub triggerAt_: u64,
    pub triggered_: i16,
    pub autoStop_: i16,
}

/// Trigger timing information for one captured segment.
#[repr(C, packed)]
#[derive(Debug, Copy, Clone, Default)]
pub struct PICO_TRIGGER_INFO {
    pub status: PICO_STATUS,
    pub segmentIndex: u64,
    pub triggerIndex: u64,
    pub triggerTime: f64,
    pub timeUnits: PICO_TIME_UNITS,
    pub missedTriggers: u64,
    pub timeStampCounter: u64,
}

/// Thresholds of one trigger source, in ADC counts.
#[repr(C, packed)]
#[derive(Debug, Copy, Clone, Default)]
pub struct PICO_TRIGGER_CHANNEL_PROPERTIES {
    pub thresholdUpper: i16,
    pub thresholdUpperHysteresis: u16,
    pub thresholdLower: i16,
    pub thresholdLowerHysteresis: u16,
    pub channel: PICO_CHANNEL,
}

/// One term of a trigger condition (terms are ANDed).
#[repr(C, packed)]
#[derive(Debug, Copy, Clone, Default)]
pub struct PICO_CONDITION {
    pub source: PICO_CHANNEL,
    pub condition: PICO_TRIGGER_STATE,
}

/// Edge or level a trigger source must cross.
#[repr(C, packed)]
#[derive(Debug, Copy, Clone, Default)]
pub struct PICO_DIRECTION {
    pub channel: PICO_CHANNEL,
    pub direction: PICO_THRESHOLD_DIRECTION,
    pub thresholdMode: PICO_THRESHOLD_MODE,
}

/// Per-channel scaling reported by `ps6000aGetScalingValues`.
///
/// The caller fills `channel`; the driver fills the rest.
#[repr(C, packed)]
#[derive(Debug, Copy, Clone, Default)]
pub struct PICO_SCALING_FACTORS_VALUES {
    pub channel: PICO_CHANNEL,
    pub range: PICO_CONNECT_PROBE_RANGE,
    pub offset: i16,
    pub scalingFactor: f64,
}

// Status codes referenced directly by the safe layer
pub const PICO_OK: PICO_STATUS = 0x0000_0000;
pub const PICO_NOT_FOUND: PICO_STATUS = 0x0000_0003;
pub const PICO_INVALID_HANDLE: PICO_STATUS = 0x0000_000C;
pub const PICO_INVALID_PARAMETER: PICO_STATUS = 0x0000_000D;
pub const PICO_NO_SAMPLES_AVAILABLE: PICO_STATUS = 0x0000_0025;
pub const PICO_BUSY: PICO_STATUS = 0x0000_0027;
pub const PICO_INVALID_BUFFER: PICO_STATUS = 0x0000_0037;
pub const PICO_BUFFERS_NOT_SET: PICO_STATUS = 0x0000_0046;
pub const PICO_WAITING_FOR_DATA_BUFFERS: PICO_STATUS = 0x0000_0197;

// PICO_ACTION flags
pub const PICO_CLEAR_ALL: PICO_ACTION = 0x0000_0001;
pub const PICO_ADD: PICO_ACTION = 0x0000_0002;
pub const PICO_CLEAR_THIS_DATA_BUFFER: PICO_ACTION = 0x0000_1000;
pub const PICO_CLEAR_WAVEFORM_DATA_BUFFERS: PICO_ACTION = 0x0000_2000;
pub const PICO_CLEAR_WAVEFORM_READ_DATA_BUFFERS: PICO_ACTION = 0x0000_4000;

// PICO_RATIO_MODE flags
pub const PICO_RATIO_MODE_AGGREGATE: PICO_RATIO_MODE = 0x0000_0001;
pub const PICO_RATIO_MODE_DECIMATE: PICO_RATIO_MODE = 0x0000_0002;
pub const PICO_RATIO_MODE_AVERAGE: PICO_RATIO_MODE = 0x0000_0004;
pub const PICO_RATIO_MODE_DISTRIBUTION: PICO_RATIO_MODE = 0x0000_0008;
pub const PICO_RATIO_MODE_SUM: PICO_RATIO_MODE = 0x0000_0010;
pub const PICO_RATIO_MODE_TRIGGER_DATA_FOR_TIME_CALCULATION: PICO_RATIO_MODE = 0x1000_0000;
pub const PICO_RATIO_MODE_SEGMENT_HEADER: PICO_RATIO_MODE = 0x2000_0000;
pub const PICO_RATIO_MODE_TRIGGER: PICO_RATIO_MODE = 0x4000_0000;
pub const PICO_RATIO_MODE_RAW: PICO_RATIO_MODE = 0x8000_0000;

#[cfg(feature = "picosdk")]
extern "system" {
    pub fn ps6000aOpenUnit(
        handle: *mut i16,
        serial: *mut c_char,
        resolution: PICO_DEVICE_RESOLUTION,
    ) -> PICO_STATUS;
    pub fn ps6000aOpenUnitAsync(
        status: *mut i16,
        serial: *mut c_char,
        resolution: PICO_DEVICE_RESOLUTION,
    ) -> PICO_STATUS;
    pub fn ps6000aOpenUnitProgress(
        handle: *mut i16,
        progressPercent: *mut i16,
        complete: *mut i16,
    ) -> PICO_STATUS;
    pub fn ps6000aGetUnitInfo(
        handle: i16,
        string: *mut c_char,
        stringLength: i16,
        requiredSize: *mut i16,
        info: PICO_INFO,
    ) -> PICO_STATUS;
    pub fn ps6000aCloseUnit(handle: i16) -> PICO_STATUS;
    pub fn ps6000aFlashLed(handle: i16, start: i16) -> PICO_STATUS;
    pub fn ps6000aPingUnit(handle: i16) -> PICO_STATUS;
    pub fn ps6000aEnumerateUnits(
        count: *mut i16,
        serials: *mut c_char,
        serialLth: *mut i16,
    ) -> PICO_STATUS;
    pub fn ps6000aMemorySegments(
        handle: i16,
        nSegments: u64,
        nMaxSamples: *mut u64,
    ) -> PICO_STATUS;
    pub fn ps6000aMemorySegmentsBySamples(
        handle: i16,
        nSamples: u64,
        nMaxSegments: *mut u64,
    ) -> PICO_STATUS;
    pub fn ps6000aGetMaximumAvailableMemory(
        handle: i16,
        nMaxSamples: *mut u64,
        resolution: PICO_DEVICE_RESOLUTION,
    ) -> PICO_STATUS;
    pub fn ps6000aSetChannelOn(
        handle: i16,
        channel: PICO_CHANNEL,
        coupling: PICO_COUPLING,
        range: PICO_CONNECT_PROBE_RANGE,
        analogueOffset: f64,
        bandwidth: PICO_BANDWIDTH_LIMITER,
    ) -> PICO_STATUS;
    pub fn ps6000aSetChannelOff(handle: i16, channel: PICO_CHANNEL) -> PICO_STATUS;
    pub fn ps6000aGetTimebase(
        handle: i16,
        timebase: u32,
        noSamples: u64,
        timeIntervalNanoseconds: *mut f64,
        maxSamples: *mut u64,
        segmentIndex: u64,
    ) -> PICO_STATUS;
    pub fn ps6000aSetSimpleTrigger(
        handle: i16,
        enable: i16,
        source: PICO_CHANNEL,
        threshold: i16,
        direction: PICO_THRESHOLD_DIRECTION,
        delay: u64,
        autoTriggerMicroSeconds: u32,
    ) -> PICO_STATUS;
    pub fn ps6000aSetTriggerChannelProperties(
        handle: i16,
        channelProperties: *mut PICO_TRIGGER_CHANNEL_PROPERTIES,
        nChannelProperties: i16,
        auxOutputEnable: i16,
        autoTriggerMicroSeconds: u32,
    ) -> PICO_STATUS;
    pub fn ps6000aSetTriggerChannelConditions(
        handle: i16,
        conditions: *mut PICO_CONDITION,
        nConditions: i16,
        action: PICO_ACTION,
    ) -> PICO_STATUS;
    pub fn ps6000aSetTriggerChannelDirections(
        handle: i16,
        directions: *mut PICO_DIRECTION,
        nDirections: i16,
    ) -> PICO_STATUS;
    pub fn ps6000aSetTriggerDelay(handle: i16, delay: u64) -> PICO_STATUS;
    pub fn ps6000aTriggerWithinPreTriggerSamples(
        handle: i16,
        state: PICO_TRIGGER_WITHIN_PRE_TRIGGER,
    ) -> PICO_STATUS;
    pub fn ps6000aSetDigitalPortOn(
        handle: i16,
        port: PICO_CHANNEL,
        logicThresholdLevel: *mut i16,
        logicThresholdLevelLength: i16,
        hysteresis: PICO_DIGITAL_PORT_HYSTERESIS,
    ) -> PICO_STATUS;
    pub fn ps6000aSetDigitalPortOff(handle: i16, port: PICO_CHANNEL) -> PICO_STATUS;
    pub fn ps6000aQueryMaxSegmentsBySamples(
        handle: i16,
        nSamples: u64,
        nChannelEnabled: i32,
        nMaxSegments: *mut u64,
        resolution: PICO_DEVICE_RESOLUTION,
    ) -> PICO_STATUS;
    pub fn ps6000aGetScalingValues(
        handle: i16,
        scalingValues: *mut PICO_SCALING_FACTORS_VALUES,
        nChannels: i16,
    ) -> PICO_STATUS;
    pub fn ps6000aSetDataBuffers(
        handle: i16,
        channel: PICO_CHANNEL,
        bufferMax: *mut c_void,
        bufferMin: *mut c_void,
        nSamples: i32,
        dataType: PICO_DATA_TYPE,
        waveform: u64,
        downSampleRatioMode: PICO_RATIO_MODE,
        action: PICO_ACTION,
    ) -> PICO_STATUS;
    pub fn ps6000aRunStreaming(
        handle: i16,
        sampleInterval: *mut f64,
        sampleIntervalTimeUnits: PICO_TIME_UNITS,
        maxPreTriggerSamples: u64,
        maxPostPreTriggerSamples: u64,
        autoStop: i16,
        downSampleRatio: u64,
        downSampleRatioMode: PICO_RATIO_MODE,
    ) -> PICO_STATUS;
    pub fn ps6000aGetStreamingLatestValues(
        handle: i16,
        streamingDataInfo: *mut PICO_STREAMING_DATA_INFO,
        nStreamingDataInfos: u64,
        triggerInfo: *mut PICO_STREAMING_DATA_TRIGGER_INFO,
    ) -> PICO_STATUS;
    pub fn ps6000aNoOfStreamingValues(handle: i16, noOfValues: *mut u64) -> PICO_STATUS;
    pub fn ps6000aRunBlock(
        handle: i16,
        noOfPreTriggerSamples: u64,
        noOfPostTriggerSamples: u64,
        timebase: u32,
        timeIndisposedMs: *mut f64,
        segmentIndex: u64,
        lpReady: ps6000aBlockReady,
        pParameter: *mut c_void,
    ) -> PICO_STATUS;
    pub fn ps6000aIsReady(handle: i16, ready: *mut i16) -> PICO_STATUS;
    pub fn ps6000aGetValues(
        handle: i16,
        startIndex: u64,
        noOfSamples: *mut u64,
        downSampleRatio: u64,
        downSampleRatioMode: PICO_RATIO_MODE,
        segmentIndex: u64,
        overflow: *mut i16,
    ) -> PICO_STATUS;
    pub fn ps6000aStop(handle: i16) -> PICO_STATUS;
    pub fn ps6000aGetTriggerInfo(
        handle: i16,
        triggerInfo: *mut PICO_TRIGGER_INFO,
        firstSegmentIndex: u64,
        segmentCount: u64,
    ) -> PICO_STATUS;
    pub fn ps6000aGetAnalogueOffsetLimits(
        handle: i16,
        range: PICO_CONNECT_PROBE_RANGE,
        coupling: PICO_COUPLING,
        maximumVoltage: *mut f64,
        minimumVoltage: *mut f64,
    ) -> PICO_STATUS;
    pub fn ps6000aGetMinimumTimebaseStateless(
        handle: i16,
        enabledChannelFlags: PICO_CHANNEL_FLAGS,
        timebase: *mut u32,
        timeInterval: *mut f64,
        resolution: PICO_DEVICE_RESOLUTION,
    ) -> PICO_STATUS;
    pub fn ps6000aNearestSampleIntervalStateless(
        handle: i16,
        enabledChannelFlags: PICO_CHANNEL_FLAGS,
        timeIntervalRequested: f64,
        resolution: PICO_DEVICE_RESOLUTION,
        timebase: *mut u32,
        timeIntervalAvailable: *mut f64,
    ) -> PICO_STATUS;
    pub fn ps6000aSetDeviceResolution(
        handle: i16,
        resolution: PICO_DEVICE_RESOLUTION,
    ) -> PICO_STATUS;
    pub fn ps6000aGetDeviceResolution(
        handle: i16,
        resolution: *mut PICO_DEVICE_RESOLUTION,
    ) -> PICO_STATUS;
    pub fn ps6000aGetAdcLimits(
        handle: i16,
        resolution: PICO_DEVICE_RESOLUTION,
        minValue: *mut i16,
        maxValue: *mut i16,
    ) -> PICO_STATUS;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_struct_sizes() {
        // Layouts must match the vendor header's #pragma pack(1)
        assert_eq!(std::mem::size_of::<PICO_STREAMING_DATA_INFO>(), 30);
        assert_eq!(std::mem::size_of::<PICO_STREAMING_DATA_TRIGGER_INFO>(), 12);
        assert_eq!(std::mem::size_of::<PICO_TRIGGER_INFO>(), 48);
        assert_eq!(std::mem::size_of::<PICO_TRIGGER_CHANNEL_PROPERTIES>(), 12);
        assert_eq!(std::mem::size_of::<PICO_CONDITION>(), 8);
        assert_eq!(std::mem::size_of::<PICO_DIRECTION>(), 12);
        assert_eq!(std::mem::size_of::<PICO_SCALING_FACTORS_VALUES>(), 18);
    }

    #[test]
    fn test_action_constants() {
        assert_eq!(PICO_CLEAR_ALL | PICO_ADD, 0x3);
        assert_eq!(PICO_RATIO_MODE_RAW, 0x8000_0000);
    }

    #[test]
    fn test_waiting_for_buffers_is_distinct_from_ok() {
        assert_ne!(PICO_WAITING_FOR_DATA_BUFFERS, PICO_OK);
    }
}
