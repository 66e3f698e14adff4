//! Device boundary backed by the vendor driver library.

use std::ffi::{c_char, c_void, CStr};
use std::ptr;

use ps6000a_sys::{
    ps6000aBlockReady, PICO_CONDITION, PICO_DIRECTION, PICO_SCALING_FACTORS_VALUES,
    PICO_STREAMING_DATA_INFO, PICO_STREAMING_DATA_TRIGGER_INFO, PICO_TRIGGER_CHANNEL_PROPERTIES,
    PICO_TRIGGER_INFO,
};

use crate::boundary::DeviceBoundary;

/// Forwards every boundary call to `libps6000a`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SdkBoundary;

fn serial_ptr(serial: Option<&CStr>) -> *mut c_char {
    // The driver treats the serial as input only.
    serial.map_or(ptr::null_mut(), |s| s.as_ptr() as *mut c_char)
}

fn len_i16(len: usize) -> i16 {
    i16::try_from(len).unwrap_or(i16::MAX)
}

// SAFETY (all calls below): the vendor functions only read their scalar
// arguments and write through the out-pointers, which come from live `&mut`
// references or slices whose length is passed alongside. Input arrays are
// declared `*mut` in the header but never written.
impl DeviceBoundary for SdkBoundary {
    fn open_unit(&self, handle: &mut i16, serial: Option<&CStr>, resolution: u32) -> u32 {
        unsafe { ps6000a_sys::ps6000aOpenUnit(handle, serial_ptr(serial), resolution) }
    }

    fn open_unit_async(&self, status: &mut i16, serial: Option<&CStr>, resolution: u32) -> u32 {
        unsafe { ps6000a_sys::ps6000aOpenUnitAsync(status, serial_ptr(serial), resolution) }
    }

    fn open_unit_progress(
        &self,
        handle: &mut i16,
        progress: &mut i16,
        complete: &mut i16,
    ) -> u32 {
        unsafe { ps6000a_sys::ps6000aOpenUnitProgress(handle, progress, complete) }
    }

    fn get_unit_info(
        &self,
        handle: i16,
        string: &mut [u8],
        required: &mut i16,
        info: u32,
    ) -> u32 {
        unsafe {
            ps6000a_sys::ps6000aGetUnitInfo(
                handle,
                string.as_mut_ptr() as *mut c_char,
                len_i16(string.len()),
                required,
                info,
            )
        }
    }

    fn close_unit(&self, handle: i16) -> u32 {
        unsafe { ps6000a_sys::ps6000aCloseUnit(handle) }
    }

    fn ping_unit(&self, handle: i16) -> u32 {
        unsafe { ps6000a_sys::ps6000aPingUnit(handle) }
    }

    fn flash_led(&self, handle: i16, start: i16) -> u32 {
        unsafe { ps6000a_sys::ps6000aFlashLed(handle, start) }
    }

    fn enumerate_units(&self, count: &mut i16, serials: &mut [u8], serial_len: &mut i16) -> u32 {
        *serial_len = len_i16(serials.len());
        unsafe {
            ps6000a_sys::ps6000aEnumerateUnits(
                count,
                serials.as_mut_ptr() as *mut c_char,
                serial_len,
            )
        }
    }

    fn memory_segments(&self, handle: i16, n_segments: u64, max_samples: &mut u64) -> u32 {
        unsafe { ps6000a_sys::ps6000aMemorySegments(handle, n_segments, max_samples) }
    }

    fn memory_segments_by_samples(
        &self,
        handle: i16,
        n_samples: u64,
        max_segments: &mut u64,
    ) -> u32 {
        unsafe { ps6000a_sys::ps6000aMemorySegmentsBySamples(handle, n_samples, max_segments) }
    }

    fn query_max_segments_by_samples(
        &self,
        handle: i16,
        n_samples: u64,
        n_channels_enabled: i32,
        max_segments: &mut u64,
        resolution: u32,
    ) -> u32 {
        unsafe {
            ps6000a_sys::ps6000aQueryMaxSegmentsBySamples(
                handle,
                n_samples,
                n_channels_enabled,
                max_segments,
                resolution,
            )
        }
    }

    fn get_maximum_available_memory(
        &self,
        handle: i16,
        max_samples: &mut u64,
        resolution: u32,
    ) -> u32 {
        unsafe { ps6000a_sys::ps6000aGetMaximumAvailableMemory(handle, max_samples, resolution) }
    }

    fn set_channel_on(
        &self,
        handle: i16,
        channel: u32,
        coupling: u32,
        range: u32,
        analogue_offset: f64,
        bandwidth: u32,
    ) -> u32 {
        unsafe {
            ps6000a_sys::ps6000aSetChannelOn(
                handle,
                channel,
                coupling,
                range,
                analogue_offset,
                bandwidth,
            )
        }
    }

    fn set_channel_off(&self, handle: i16, channel: u32) -> u32 {
        unsafe { ps6000a_sys::ps6000aSetChannelOff(handle, channel) }
    }

    fn set_digital_port_on(
        &self,
        handle: i16,
        port: u32,
        thresholds: &[i16],
        hysteresis: u32,
    ) -> u32 {
        unsafe {
            ps6000a_sys::ps6000aSetDigitalPortOn(
                handle,
                port,
                thresholds.as_ptr() as *mut i16,
                len_i16(thresholds.len()),
                hysteresis,
            )
        }
    }

    fn set_digital_port_off(&self, handle: i16, port: u32) -> u32 {
        unsafe { ps6000a_sys::ps6000aSetDigitalPortOff(handle, port) }
    }

    fn get_timebase(
        &self,
        handle: i16,
        timebase: u32,
        n_samples: u64,
        interval_ns: &mut f64,
        max_samples: &mut u64,
        segment: u64,
    ) -> u32 {
        unsafe {
            ps6000a_sys::ps6000aGetTimebase(
                handle,
                timebase,
                n_samples,
                interval_ns,
                max_samples,
                segment,
            )
        }
    }

    fn set_simple_trigger(
        &self,
        handle: i16,
        enable: i16,
        source: u32,
        threshold: i16,
        direction: u32,
        delay: u64,
        auto_trigger_us: u32,
    ) -> u32 {
        unsafe {
            ps6000a_sys::ps6000aSetSimpleTrigger(
                handle,
                enable,
                source,
                threshold,
                direction,
                delay,
                auto_trigger_us,
            )
        }
    }

    fn set_trigger_channel_properties(
        &self,
        handle: i16,
        properties: &[PICO_TRIGGER_CHANNEL_PROPERTIES],
        aux_output_enable: i16,
        auto_trigger_us: u32,
    ) -> u32 {
        unsafe {
            ps6000a_sys::ps6000aSetTriggerChannelProperties(
                handle,
                properties.as_ptr() as *mut PICO_TRIGGER_CHANNEL_PROPERTIES,
                len_i16(properties.len()),
                aux_output_enable,
                auto_trigger_us,
            )
        }
    }

    fn set_trigger_channel_conditions(
        &self,
        handle: i16,
        conditions: &[PICO_CONDITION],
        action: u32,
    ) -> u32 {
        unsafe {
            ps6000a_sys::ps6000aSetTriggerChannelConditions(
                handle,
                conditions.as_ptr() as *mut PICO_CONDITION,
                len_i16(conditions.len()),
                action,
            )
        }
    }

    fn set_trigger_channel_directions(&self, handle: i16, directions: &[PICO_DIRECTION]) -> u32 {
        unsafe {
            ps6000a_sys::ps6000aSetTriggerChannelDirections(
                handle,
                directions.as_ptr() as *mut PICO_DIRECTION,
                len_i16(directions.len()),
            )
        }
    }

    fn set_trigger_delay(&self, handle: i16, delay: u64) -> u32 {
        unsafe { ps6000a_sys::ps6000aSetTriggerDelay(handle, delay) }
    }

    fn trigger_within_pre_trigger_samples(&self, handle: i16, state: u32) -> u32 {
        unsafe { ps6000a_sys::ps6000aTriggerWithinPreTriggerSamples(handle, state) }
    }

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
    ) -> u32 {
        ps6000a_sys::ps6000aSetDataBuffers(
            handle, channel, max, min, n_samples, data_type, segment, mode, action,
        )
    }

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
    ) -> u32 {
        unsafe {
            ps6000a_sys::ps6000aRunStreaming(
                handle,
                sample_interval,
                time_units,
                pre_trigger,
                post_trigger,
                auto_stop,
                downsample_ratio,
                mode,
            )
        }
    }

    fn get_streaming_latest_values(
        &self,
        handle: i16,
        infos: &mut [PICO_STREAMING_DATA_INFO],
        trigger: &mut PICO_STREAMING_DATA_TRIGGER_INFO,
    ) -> u32 {
        unsafe {
            ps6000a_sys::ps6000aGetStreamingLatestValues(
                handle,
                infos.as_mut_ptr(),
                infos.len() as u64,
                trigger,
            )
        }
    }

    fn no_of_streaming_values(&self, handle: i16, n_values: &mut u64) -> u32 {
        unsafe { ps6000a_sys::ps6000aNoOfStreamingValues(handle, n_values) }
    }

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
    ) -> u32 {
        ps6000a_sys::ps6000aRunBlock(
            handle,
            pre_trigger,
            post_trigger,
            timebase,
            time_indisposed_ms,
            segment,
            ready,
            parameter,
        )
    }

    fn is_ready(&self, handle: i16, ready: &mut i16) -> u32 {
        unsafe { ps6000a_sys::ps6000aIsReady(handle, ready) }
    }

    fn get_values(
        &self,
        handle: i16,
        start: u64,
        n_samples: &mut u64,
        downsample_ratio: u64,
        mode: u32,
        segment: u64,
        overflow: &mut i16,
    ) -> u32 {
        unsafe {
            ps6000a_sys::ps6000aGetValues(
                handle,
                start,
                n_samples,
                downsample_ratio,
                mode,
                segment,
                overflow,
            )
        }
    }

    fn stop(&self, handle: i16) -> u32 {
        unsafe { ps6000a_sys::ps6000aStop(handle) }
    }

    fn get_trigger_info(
        &self,
        handle: i16,
        infos: &mut [PICO_TRIGGER_INFO],
        first_segment: u64,
    ) -> u32 {
        unsafe {
            ps6000a_sys::ps6000aGetTriggerInfo(
                handle,
                infos.as_mut_ptr(),
                first_segment,
                infos.len() as u64,
            )
        }
    }

    fn get_analogue_offset_limits(
        &self,
        handle: i16,
        range: u32,
        coupling: u32,
        max: &mut f64,
        min: &mut f64,
    ) -> u32 {
        unsafe { ps6000a_sys::ps6000aGetAnalogueOffsetLimits(handle, range, coupling, max, min) }
    }

    fn get_minimum_timebase_stateless(
        &self,
        handle: i16,
        channel_flags: u32,
        timebase: &mut u32,
        interval_s: &mut f64,
        resolution: u32,
    ) -> u32 {
        unsafe {
            ps6000a_sys::ps6000aGetMinimumTimebaseStateless(
                handle,
                channel_flags,
                timebase,
                interval_s,
                resolution,
            )
        }
    }

    fn nearest_sample_interval_stateless(
        &self,
        handle: i16,
        channel_flags: u32,
        requested_s: f64,
        resolution: u32,
        timebase: &mut u32,
        available_s: &mut f64,
    ) -> u32 {
        unsafe {
            ps6000a_sys::ps6000aNearestSampleIntervalStateless(
                handle,
                channel_flags,
                requested_s,
                resolution,
                timebase,
                available_s,
            )
        }
    }

    fn set_device_resolution(&self, handle: i16, resolution: u32) -> u32 {
        unsafe { ps6000a_sys::ps6000aSetDeviceResolution(handle, resolution) }
    }

    fn get_device_resolution(&self, handle: i16, resolution: &mut u32) -> u32 {
        unsafe { ps6000a_sys::ps6000aGetDeviceResolution(handle, resolution) }
    }

    fn get_adc_limits(&self, handle: i16, resolution: u32, min: &mut i16, max: &mut i16) -> u32 {
        unsafe { ps6000a_sys::ps6000aGetAdcLimits(handle, resolution, min, max) }
    }

    fn get_scaling_values(&self, handle: i16, values: &mut [PICO_SCALING_FACTORS_VALUES]) -> u32 {
        unsafe {
            ps6000a_sys::ps6000aGetScalingValues(
                handle,
                values.as_mut_ptr(),
                len_i16(values.len()),
            )
        }
    }
}
