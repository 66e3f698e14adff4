//! The device session and its configuration pass-throughs.
//!
//! [`Ps6000a`] owns the device boundary, the handle guard, the buffer
//! registry and the block-ready trampoline table. Operations are grouped by
//! concern across modules (`handle`, `registry`, `streaming`, `block`,
//! `trigger`); this module holds the struct itself, the status bookkeeping
//! every call goes through, and the front-end configuration calls.
//!
//! Every device call follows the same sequence: require a valid handle, call
//! the boundary, record the returned status, translate it.

use tracing::{debug, info, warn};

use ps6000a_sys::PICO_SCALING_FACTORS_VALUES;

use crate::block::TrampolineTable;
use crate::boundary::DeviceBoundary;
use crate::error::{Ps6000aError, Result};
use crate::handle::HandleGuard;
use crate::registry::BufferRegistry;
use crate::scaling::VoltageScale;
use crate::status::PicoStatus;
use crate::trigger::table_len;
use crate::types::{
    BandwidthLimiter, Channel, ChannelFlags, Coupling, DeviceResolution, DigitalPortHysteresis,
    ProbeRange, ThresholdDirection,
};

/// A session with one PicoScope 6000E unit.
///
/// The registry has no internal locking: every mutating operation takes
/// `&mut self`, so access is serialized by the borrow checker.
pub struct Ps6000a<B: DeviceBoundary> {
    pub(crate) boundary: B,
    pub(crate) handle: HandleGuard,
    pub(crate) last_status: Option<PicoStatus>,
    pub(crate) registry: BufferRegistry,
    pub(crate) trampolines: TrampolineTable,
    pub(crate) resolution: DeviceResolution,
}

/// Sample interval and capacity reported for a timebase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimebaseInfo {
    /// Sample interval in nanoseconds
    pub interval_ns: f64,
    /// Maximum number of samples in the requested segment
    pub max_samples: u64,
}

/// A timebase index paired with its sample interval in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimebaseChoice {
    /// Timebase index
    pub timebase: u32,
    /// Sample interval in seconds
    pub interval_s: f64,
}

/// Allowed analogue offset for a range and coupling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffsetLimits {
    /// Largest offset, volts
    pub max: f64,
    /// Smallest offset, volts
    pub min: f64,
}

/// Scaling the unit applies to one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalingFactors {
    /// Channel
    pub channel: Channel,
    /// Range the channel is set to
    pub range: ProbeRange,
    /// Analogue offset as an ADC code
    pub offset: i16,
    /// Volts per ADC code
    pub scaling_factor: f64,
}

impl From<PICO_SCALING_FACTORS_VALUES> for ScalingFactors {
    fn from(raw: PICO_SCALING_FACTORS_VALUES) -> Self {
        Self {
            channel: Channel::from_raw(raw.channel),
            range: ProbeRange::from_raw(raw.range),
            offset: raw.offset,
            scaling_factor: raw.scalingFactor,
        }
    }
}

/// Simple edge/level trigger on one source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimpleTrigger {
    /// Trigger source
    pub source: Channel,
    /// Threshold as a raw ADC code
    pub threshold: i16,
    /// Direction
    pub direction: ThresholdDirection,
    /// Delay in sample periods after the trigger event
    pub delay: u64,
    /// Auto-trigger timeout in microseconds (0 waits forever)
    pub auto_trigger_us: u32,
}

impl<B: DeviceBoundary> Ps6000a<B> {
    /// Create a session over a device boundary. No unit is opened.
    pub fn with_boundary(boundary: B) -> Self {
        Self {
            boundary,
            handle: HandleGuard::default(),
            last_status: None,
            registry: BufferRegistry::default(),
            trampolines: TrampolineTable::default(),
            resolution: DeviceResolution::default(),
        }
    }

    /// The device boundary.
    pub fn boundary(&self) -> &B {
        &self.boundary
    }

    /// The status returned by the most recent device call, `None` before
    /// any call was made.
    pub fn last_status(&self) -> Option<PicoStatus> {
        self.last_status
    }

    /// Resolution the unit was opened with or last set to.
    pub fn resolution(&self) -> DeviceResolution {
        self.resolution
    }

    /// Record a raw status, then translate it.
    pub(crate) fn record(&mut self, raw: u32) -> Result<()> {
        let status = PicoStatus::from_raw(raw);
        self.last_status = Some(status);
        if !status.is_ok() {
            debug!(%status, "Device call failed");
        }
        status.check()
    }

    /// Require a valid handle, make one boundary call, record its status.
    pub(crate) fn call<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&B, i16) -> u32,
    {
        let handle = self.handle.get()?;
        let raw = f(&self.boundary, handle);
        self.record(raw)
    }

    // =========================================================================
    // Channels and triggering
    // =========================================================================

    /// Enable a channel with the given front-end settings.
    pub fn set_channel_on(
        &mut self,
        channel: Channel,
        coupling: Coupling,
        range: ProbeRange,
        analogue_offset: f64,
        bandwidth: BandwidthLimiter,
    ) -> Result<()> {
        self.call(|b, h| {
            b.set_channel_on(
                h,
                channel.to_raw(),
                coupling.to_raw(),
                range.to_raw(),
                analogue_offset,
                bandwidth.to_raw(),
            )
        })?;
        debug!(%channel, %coupling, %range, analogue_offset, %bandwidth, "Channel on");
        Ok(())
    }

    /// Disable a channel.
    pub fn set_channel_off(&mut self, channel: Channel) -> Result<()> {
        self.call(|b, h| b.set_channel_off(h, channel.to_raw()))?;
        debug!(%channel, "Channel off");
        Ok(())
    }

    /// Enable a digital port. One logic threshold (ADC code, ±32767 for
    /// ±5 V) per pin; the number given decides how many pins are enabled.
    pub fn set_digital_port_on(
        &mut self,
        port: Channel,
        thresholds: &[i16],
        hysteresis: DigitalPortHysteresis,
    ) -> Result<()> {
        table_len("digital port thresholds", thresholds.len())?;
        self.call(|b, h| {
            b.set_digital_port_on(h, port.to_raw(), thresholds, hysteresis.to_raw())
        })?;
        debug!(%port, pins = thresholds.len(), %hysteresis, "Digital port on");
        Ok(())
    }

    /// Disable a digital port.
    pub fn set_digital_port_off(&mut self, port: Channel) -> Result<()> {
        self.call(|b, h| b.set_digital_port_off(h, port.to_raw()))?;
        debug!(%port, "Digital port off");
        Ok(())
    }

    /// Arm (or with `enable = false`, disarm) a simple trigger.
    pub fn set_simple_trigger(&mut self, trigger: SimpleTrigger, enable: bool) -> Result<()> {
        self.call(|b, h| {
            b.set_simple_trigger(
                h,
                i16::from(enable),
                trigger.source.to_raw(),
                trigger.threshold,
                trigger.direction.to_raw(),
                trigger.delay,
                trigger.auto_trigger_us,
            )
        })?;
        debug!(?trigger, enable, "Simple trigger set");
        Ok(())
    }

    /// Arm a simple trigger with the threshold given in volts for a source
    /// set to `range`.
    pub fn set_simple_trigger_volts(
        &mut self,
        source: Channel,
        range: ProbeRange,
        threshold_volts: f64,
        direction: ThresholdDirection,
        delay: u64,
        auto_trigger_us: u32,
    ) -> Result<()> {
        let code = VoltageScale::new(range, self.resolution)?.to_code(threshold_volts);
        let threshold = i16::try_from(code).map_err(|_| {
            Ps6000aError::validation(format!(
                "trigger threshold {} V is outside the {} range",
                threshold_volts, range
            ))
        })?;
        self.set_simple_trigger(
            SimpleTrigger {
                source,
                threshold,
                direction,
                delay,
                auto_trigger_us,
            },
            true,
        )
    }

    // =========================================================================
    // Timebase and memory
    // =========================================================================

    /// Sample interval and segment capacity for a timebase.
    pub fn get_timebase(&mut self, timebase: u32, n_samples: u64, segment: u64) -> Result<TimebaseInfo> {
        let mut interval_ns = 0.0;
        let mut max_samples = 0;
        self.call(|b, h| {
            b.get_timebase(h, timebase, n_samples, &mut interval_ns, &mut max_samples, segment)
        })?;
        Ok(TimebaseInfo {
            interval_ns,
            max_samples,
        })
    }

    /// Fastest timebase available for a channel set at a resolution.
    pub fn get_minimum_timebase_stateless(
        &mut self,
        channels: ChannelFlags,
        resolution: DeviceResolution,
    ) -> Result<TimebaseChoice> {
        let mut timebase = 0;
        let mut interval_s = 0.0;
        self.call(|b, h| {
            b.get_minimum_timebase_stateless(
                h,
                channels.bits(),
                &mut timebase,
                &mut interval_s,
                resolution.to_raw(),
            )
        })?;
        Ok(TimebaseChoice {
            timebase,
            interval_s,
        })
    }

    /// Timebase closest to a requested sample interval (seconds).
    pub fn nearest_sample_interval_stateless(
        &mut self,
        channels: ChannelFlags,
        requested_s: f64,
        resolution: DeviceResolution,
    ) -> Result<TimebaseChoice> {
        let mut timebase = 0;
        let mut interval_s = 0.0;
        self.call(|b, h| {
            b.nearest_sample_interval_stateless(
                h,
                channels.bits(),
                requested_s,
                resolution.to_raw(),
                &mut timebase,
                &mut interval_s,
            )
        })?;
        Ok(TimebaseChoice {
            timebase,
            interval_s,
        })
    }

    /// Split capture memory into `n_segments`; returns samples per segment.
    pub fn memory_segments(&mut self, n_segments: u64) -> Result<u64> {
        let mut max_samples = 0;
        self.call(|b, h| b.memory_segments(h, n_segments, &mut max_samples))?;
        info!(n_segments, max_samples, "Memory segmented");
        Ok(max_samples)
    }

    /// Split capture memory into segments of `n_samples`; returns the
    /// number of segments.
    pub fn memory_segments_by_samples(&mut self, n_samples: u64) -> Result<u64> {
        let mut max_segments = 0;
        self.call(|b, h| b.memory_segments_by_samples(h, n_samples, &mut max_segments))?;
        info!(n_samples, max_segments, "Memory segmented by samples");
        Ok(max_segments)
    }

    /// How many segments of `n_samples` would fit with `n_channels_enabled`
    /// channels at a resolution. Does not change the segmentation.
    pub fn query_max_segments_by_samples(
        &mut self,
        n_samples: u64,
        n_channels_enabled: u32,
        resolution: DeviceResolution,
    ) -> Result<u64> {
        let n_channels = i32::try_from(n_channels_enabled).map_err(|_| {
            Ps6000aError::validation(format!("{} enabled channels", n_channels_enabled))
        })?;
        let mut max_segments = 0;
        self.call(|b, h| {
            b.query_max_segments_by_samples(
                h,
                n_samples,
                n_channels,
                &mut max_segments,
                resolution.to_raw(),
            )
        })?;
        Ok(max_segments)
    }

    /// Total sample memory available at a resolution.
    pub fn get_maximum_available_memory(&mut self, resolution: DeviceResolution) -> Result<u64> {
        let mut max_samples = 0;
        self.call(|b, h| b.get_maximum_available_memory(h, &mut max_samples, resolution.to_raw()))?;
        Ok(max_samples)
    }

    // =========================================================================
    // Resolution and limits
    // =========================================================================

    /// Change the ADC resolution.
    pub fn set_device_resolution(&mut self, resolution: DeviceResolution) -> Result<()> {
        self.call(|b, h| b.set_device_resolution(h, resolution.to_raw()))?;
        self.resolution = resolution;
        info!(%resolution, "Device resolution set");
        Ok(())
    }

    /// Read the ADC resolution from the unit.
    pub fn get_device_resolution(&mut self) -> Result<DeviceResolution> {
        let mut raw = 0;
        self.call(|b, h| b.get_device_resolution(h, &mut raw))?;
        let resolution = DeviceResolution::from_raw(raw);
        if let DeviceResolution::Unknown(value) = resolution {
            warn!(value, "Unit reported an unknown resolution");
        }
        self.resolution = resolution;
        Ok(resolution)
    }

    /// ADC code limits `(min, max)` at a resolution.
    pub fn get_adc_limits(&mut self, resolution: DeviceResolution) -> Result<(i16, i16)> {
        let mut min = 0;
        let mut max = 0;
        self.call(|b, h| b.get_adc_limits(h, resolution.to_raw(), &mut min, &mut max))?;
        Ok((min, max))
    }

    /// Scaling the unit applies to each of `channels`, in the same order.
    pub fn get_scaling_values(&mut self, channels: &[Channel]) -> Result<Vec<ScalingFactors>> {
        table_len("scaling channels", channels.len())?;
        let mut values: Vec<PICO_SCALING_FACTORS_VALUES> = channels
            .iter()
            .map(|channel| PICO_SCALING_FACTORS_VALUES {
                channel: channel.to_raw(),
                ..Default::default()
            })
            .collect();
        self.call(|b, h| b.get_scaling_values(h, &mut values))?;
        Ok(values.into_iter().map(ScalingFactors::from).collect())
    }

    /// Allowed analogue offset range for a range and coupling.
    pub fn get_analog_offset_limits(
        &mut self,
        range: ProbeRange,
        coupling: Coupling,
    ) -> Result<OffsetLimits> {
        let mut max = 0.0;
        let mut min = 0.0;
        self.call(|b, h| {
            b.get_analogue_offset_limits(h, range.to_raw(), coupling.to_raw(), &mut max, &mut min)
        })?;
        Ok(OffsetLimits { max, min })
    }

    /// Start (`start > 0`) or stop flashing the front-panel LED.
    ///
    /// A positive count flashes that many times, a negative one flashes
    /// until stopped, zero stops.
    pub fn flash_led(&mut self, start: i16) -> Result<()> {
        self.call(|b, h| b.flash_led(h, start))
    }
}

impl<B: DeviceBoundary> Drop for Ps6000a<B> {
    fn drop(&mut self) {
        if self.handle.is_valid() {
            if let Err(err) = self.close_unit() {
                warn!(error = %err, "Error closing unit on drop");
            }
        }
    }
}

#[cfg(feature = "picosdk")]
impl Ps6000a<crate::sdk::SdkBoundary> {
    /// Session backed by the installed vendor driver.
    pub fn new() -> Self {
        Self::with_boundary(crate::sdk::SdkBoundary)
    }
}

#[cfg(feature = "picosdk")]
impl Default for Ps6000a<crate::sdk::SdkBoundary> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "mock")]
impl Ps6000a<crate::mock::MockBoundary> {
    /// Session backed by a simulated unit with default settings.
    pub fn mock() -> Self {
        Self::with_boundary(crate::mock::MockBoundary::default())
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::error::HandleError;
    use crate::mock::MockBoundary;

    fn open() -> Ps6000a<MockBoundary> {
        let mut scope = Ps6000a::mock();
        scope.open_unit(None, DeviceResolution::Bits8).unwrap();
        scope
    }

    #[test]
    fn test_calls_require_handle() {
        let mut scope = Ps6000a::mock();
        let err = scope.ping_unit().unwrap_err();
        assert!(matches!(
            err,
            Ps6000aError::Handle(HandleError::NeverOpened)
        ));
        assert_eq!(scope.last_status(), None);
        assert!(scope.boundary().calls().is_empty());
    }

    #[test]
    fn test_status_recorded_before_error() {
        let mut scope = open();
        scope
            .boundary()
            .fail_next("SetChannelOn", PicoStatus::INVALID_VOLTAGE_RANGE);
        let err = scope
            .set_channel_on(
                Channel::A,
                Coupling::Dc,
                ProbeRange::X1Probe1V,
                0.0,
                BandwidthLimiter::Full,
            )
            .unwrap_err();
        assert_eq!(err.status(), Some(PicoStatus::INVALID_VOLTAGE_RANGE));
        assert_eq!(scope.last_status(), Some(PicoStatus::INVALID_VOLTAGE_RANGE));
    }

    #[test]
    fn test_trigger_threshold_from_volts() {
        let mut scope = open();
        scope
            .set_simple_trigger_volts(
                Channel::A,
                ProbeRange::X1Probe1V,
                0.5,
                ThresholdDirection::Rising,
                0,
                1000,
            )
            .unwrap();
        // 8-bit: 0.5 V / 1 V * 127 truncates to 63
        assert_eq!(scope.boundary().trigger().map(|t| t.threshold), Some(63));

        let err = scope
            .set_simple_trigger_volts(
                Channel::A,
                ProbeRange::X1Probe1V,
                1000.0,
                ThresholdDirection::Rising,
                0,
                0,
            )
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_resolution_tracking() {
        let mut scope = open();
        scope.set_device_resolution(DeviceResolution::Bits12).unwrap();
        assert_eq!(scope.resolution(), DeviceResolution::Bits12);
        assert_eq!(
            scope.get_device_resolution().unwrap(),
            DeviceResolution::Bits12
        );
        assert_eq!(
            scope.get_adc_limits(DeviceResolution::Bits12).unwrap(),
            (i16::MIN, i16::MAX)
        );
    }

    #[test]
    fn test_timebase_queries() {
        let mut scope = open();
        let tb = scope.get_timebase(2, 1000, 0).unwrap();
        assert!((tb.interval_ns - 0.8).abs() < 1e-9);
        assert!(tb.max_samples > 0);

        let choice = scope
            .nearest_sample_interval_stateless(ChannelFlags::A, 1e-6, DeviceResolution::Bits8)
            .unwrap();
        assert!((choice.interval_s - 1e-6).abs() < 1e-8);
    }
}
