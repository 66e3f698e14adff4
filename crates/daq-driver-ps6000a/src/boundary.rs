//! The device call boundary.
//!
//! [`DeviceBoundary`] mirrors the flat vendor API one method per function:
//! every call is keyed by the device handle, takes raw vendor values, writes
//! results through `&mut` out-parameters and returns the raw 32-bit status.
//! Nothing here interprets a status; that is the session's job.
//!
//! Two implementations exist:
//! - [`SdkBoundary`](crate::sdk::SdkBoundary) (feature `picosdk`) forwards to
//!   the vendor library through `ps6000a-sys`.
//! - [`MockBoundary`](crate::mock::MockBoundary) (feature `mock`) simulates a
//!   unit in memory, including the driver-owned notification thread.

use std::ffi::{c_void, CStr};

use ps6000a_sys::{
    ps6000aBlockReady, PICO_CONDITION, PICO_DIRECTION, PICO_SCALING_FACTORS_VALUES,
    PICO_STREAMING_DATA_INFO, PICO_STREAMING_DATA_TRIGGER_INFO, PICO_TRIGGER_CHANNEL_PROPERTIES,
    PICO_TRIGGER_INFO,
};

/// One method per vendor function. All methods return the raw status code.
#[allow(clippy::too_many_arguments)]
pub trait DeviceBoundary: Send + Sync {
    /// `ps6000aOpenUnit`
    fn open_unit(&self, handle: &mut i16, serial: Option<&CStr>, resolution: u32) -> u32;

    /// `ps6000aOpenUnitAsync`
    fn open_unit_async(&self, status: &mut i16, serial: Option<&CStr>, resolution: u32) -> u32;

    /// `ps6000aOpenUnitProgress`
    fn open_unit_progress(&self, handle: &mut i16, progress: &mut i16, complete: &mut i16)
        -> u32;

    /// `ps6000aGetUnitInfo`. The driver writes a NUL-terminated string.
    fn get_unit_info(&self, handle: i16, string: &mut [u8], required: &mut i16, info: u32)
        -> u32;

    /// `ps6000aCloseUnit`
    fn close_unit(&self, handle: i16) -> u32;

    /// `ps6000aPingUnit`
    fn ping_unit(&self, handle: i16) -> u32;

    /// `ps6000aFlashLed`
    fn flash_led(&self, handle: i16, start: i16) -> u32;

    /// `ps6000aEnumerateUnits`. Serials are written comma-separated.
    fn enumerate_units(&self, count: &mut i16, serials: &mut [u8], serial_len: &mut i16) -> u32;

    /// `ps6000aMemorySegments`
    fn memory_segments(&self, handle: i16, n_segments: u64, max_samples: &mut u64) -> u32;

    /// `ps6000aMemorySegmentsBySamples`
    fn memory_segments_by_samples(&self, handle: i16, n_samples: u64, max_segments: &mut u64)
        -> u32;

    /// `ps6000aQueryMaxSegmentsBySamples`
    fn query_max_segments_by_samples(
        &self,
        handle: i16,
        n_samples: u64,
        n_channels_enabled: i32,
        max_segments: &mut u64,
        resolution: u32,
    ) -> u32;

    /// `ps6000aGetMaximumAvailableMemory`
    fn get_maximum_available_memory(&self, handle: i16, max_samples: &mut u64, resolution: u32)
        -> u32;

    /// `ps6000aSetChannelOn`
    fn set_channel_on(
        &self,
        handle: i16,
        channel: u32,
        coupling: u32,
        range: u32,
        analogue_offset: f64,
        bandwidth: u32,
    ) -> u32;

    /// `ps6000aSetChannelOff`
    fn set_channel_off(&self, handle: i16, channel: u32) -> u32;

    /// `ps6000aSetDigitalPortOn`. One threshold per enabled pin.
    fn set_digital_port_on(&self, handle: i16, port: u32, thresholds: &[i16], hysteresis: u32)
        -> u32;

    /// `ps6000aSetDigitalPortOff`
    fn set_digital_port_off(&self, handle: i16, port: u32) -> u32;

    /// `ps6000aGetTimebase`
    fn get_timebase(
        &self,
        handle: i16,
        timebase: u32,
        n_samples: u64,
        interval_ns: &mut f64,
        max_samples: &mut u64,
        segment: u64,
    ) -> u32;

    /// `ps6000aSetSimpleTrigger`
    fn set_simple_trigger(
        &self,
        handle: i16,
        enable: i16,
        source: u32,
        threshold: i16,
        direction: u32,
        delay: u64,
        auto_trigger_us: u32,
    ) -> u32;

    /// `ps6000aSetTriggerChannelProperties`. An empty slice switches
    /// triggering off.
    fn set_trigger_channel_properties(
        &self,
        handle: i16,
        properties: &[PICO_TRIGGER_CHANNEL_PROPERTIES],
        aux_output_enable: i16,
        auto_trigger_us: u32,
    ) -> u32;

    /// `ps6000aSetTriggerChannelConditions`. The terms of one call are ANDed;
    /// successive calls with `ADD` are ORed.
    fn set_trigger_channel_conditions(
        &self,
        handle: i16,
        conditions: &[PICO_CONDITION],
        action: u32,
    ) -> u32;

    /// `ps6000aSetTriggerChannelDirections`
    fn set_trigger_channel_directions(&self, handle: i16, directions: &[PICO_DIRECTION]) -> u32;

    /// `ps6000aSetTriggerDelay`, in sample periods.
    fn set_trigger_delay(&self, handle: i16, delay: u64) -> u32;

    /// `ps6000aTriggerWithinPreTriggerSamples`
    fn trigger_within_pre_trigger_samples(&self, handle: i16, state: u32) -> u32;

    /// `ps6000aSetDataBuffers`
    ///
    /// # Safety
    ///
    /// Non-null `max` and `min` must point to at least `n_samples` elements
    /// of `data_type` and stay valid until the device is told to forget them
    /// (a clear action on their class, or closing the unit).
    unsafe fn set_data_buffers(
        &self,
        handle: i16,
        channel: u32,
        max: *mut c_void,
        min: *mut c_void,
        n_samples: i32,
        data_type: u32,
        segment: u64,
        mode: u32,
        action: u32,
    ) -> u32;

    /// `ps6000aRunStreaming`. `sample_interval` is updated to the interval
    /// actually achieved.
    fn run_streaming(
        &self,
        handle: i16,
        sample_interval: &mut f64,
        time_units: u32,
        pre_trigger: u64,
        post_trigger: u64,
        auto_stop: i16,
        downsample_ratio: u64,
        mode: u32,
    ) -> u32;

    /// `ps6000aGetStreamingLatestValues`. The caller fills channel, mode and
    /// type of each info; the driver fills the rest.
    fn get_streaming_latest_values(
        &self,
        handle: i16,
        infos: &mut [PICO_STREAMING_DATA_INFO],
        trigger: &mut PICO_STREAMING_DATA_TRIGGER_INFO,
    ) -> u32;

    /// `ps6000aNoOfStreamingValues`
    fn no_of_streaming_values(&self, handle: i16, n_values: &mut u64) -> u32;

    /// `ps6000aRunBlock`
    ///
    /// # Safety
    ///
    /// When `ready` is set, `parameter` must stay valid until the driver has
    /// invoked `ready`, which it does exactly once from its own thread.
    unsafe fn run_block(
        &self,
        handle: i16,
        pre_trigger: u64,
        post_trigger: u64,
        timebase: u32,
        time_indisposed_ms: &mut f64,
        segment: u64,
        ready: ps6000aBlockReady,
        parameter: *mut c_void,
    ) -> u32;

    /// `ps6000aIsReady`
    fn is_ready(&self, handle: i16, ready: &mut i16) -> u32;

    /// `ps6000aGetValues`
    fn get_values(
        &self,
        handle: i16,
        start: u64,
        n_samples: &mut u64,
        downsample_ratio: u64,
        mode: u32,
        segment: u64,
        overflow: &mut i16,
    ) -> u32;

    /// `ps6000aStop`
    fn stop(&self, handle: i16) -> u32;

    /// `ps6000aGetTriggerInfo`. One entry per segment from `first_segment`.
    fn get_trigger_info(&self, handle: i16, infos: &mut [PICO_TRIGGER_INFO], first_segment: u64)
        -> u32;

    /// `ps6000aGetAnalogueOffsetLimits`
    fn get_analogue_offset_limits(
        &self,
        handle: i16,
        range: u32,
        coupling: u32,
        max: &mut f64,
        min: &mut f64,
    ) -> u32;

    /// `ps6000aGetMinimumTimebaseStateless`
    fn get_minimum_timebase_stateless(
        &self,
        handle: i16,
        channel_flags: u32,
        timebase: &mut u32,
        interval_s: &mut f64,
        resolution: u32,
    ) -> u32;

    /// `ps6000aNearestSampleIntervalStateless`
    fn nearest_sample_interval_stateless(
        &self,
        handle: i16,
        channel_flags: u32,
        requested_s: f64,
        resolution: u32,
        timebase: &mut u32,
        available_s: &mut f64,
    ) -> u32;

    /// `ps6000aSetDeviceResolution`
    fn set_device_resolution(&self, handle: i16, resolution: u32) -> u32;

    /// `ps6000aGetDeviceResolution`
    fn get_device_resolution(&self, handle: i16, resolution: &mut u32) -> u32;

    /// `ps6000aGetAdcLimits`
    fn get_adc_limits(&self, handle: i16, resolution: u32, min: &mut i16, max: &mut i16) -> u32;

    /// `ps6000aGetScalingValues`. The caller fills `channel` of each entry;
    /// the driver fills the rest.
    fn get_scaling_values(&self, handle: i16, values: &mut [PICO_SCALING_FACTORS_VALUES]) -> u32;
}
