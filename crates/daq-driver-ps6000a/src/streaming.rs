//! Streaming continuity.
//!
//! In streaming mode the unit writes samples continuously into the buffers
//! registered for segment 0, wrapping through each buffer once. Every poll
//! reports, per requested (channel, data type, mode), the window of samples
//! that became available since the previous poll. Windows tile each buffer
//! from index 0 without gaps or overlap.
//!
//! When a buffer has been filled the driver returns
//! `WAITING_FOR_DATA_BUFFERS`. That status is not an error: the poll succeeds
//! with `full = true`, the whole buffer holds data, and the caller must copy
//! what it needs and then re-arm with
//! [`reload_data_buffers`](crate::Ps6000a::reload_data_buffers) before the
//! device can write more. Nothing is re-armed automatically.
//!
//! # Example
//!
//! ```no_run
//! use daq_driver_ps6000a::{Channel, DataType, Ps6000a, RatioMode, StreamingSettings, TimeUnits};
//!
//! # fn example() -> anyhow::Result<()> {
//! let mut scope = Ps6000a::mock();
//! scope.open_unit(None, Default::default())?;
//! let buffer = scope.get_data_buffer(Channel::A, DataType::Int8, 0, RatioMode::RAW, 10_000, true)?;
//!
//! let settings = StreamingSettings::new(1.0, TimeUnits::Us, 100_000);
//! scope.run_streaming(&settings)?;
//!
//! let mut captured = Vec::new();
//! while captured.len() < 100_000 {
//!     let poll = scope.get_streaming_latest_values(None)?;
//!     for window in &poll.windows {
//!         captured.extend(window.copy_from(&buffer)?.to_i64());
//!     }
//!     if poll.full {
//!         scope.reload_data_buffers(Channel::A, DataType::Int8, 0)?;
//!     }
//! }
//! scope.stop()?;
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use ps6000a_sys::{PICO_STREAMING_DATA_INFO, PICO_STREAMING_DATA_TRIGGER_INFO};

use crate::boundary::DeviceBoundary;
use crate::buffer::{Buffer, BufferClass, Samples};
use crate::error::{Ps6000aError, Result};
use crate::session::Ps6000a;
use crate::status::PicoStatus;
use crate::types::{BufferRole, Channel, DataType, RatioMode, TimeUnits};

// =============================================================================
// Settings
// =============================================================================

/// Parameters of a streaming run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamingSettings {
    /// Requested sample interval, in `time_units`
    pub sample_interval: f64,

    /// Unit of `sample_interval`
    #[serde(default = "default_time_units")]
    pub time_units: TimeUnits,

    /// Samples to keep before the trigger
    #[serde(default)]
    pub pre_trigger: u64,

    /// Samples to capture after the trigger
    pub post_trigger: u64,

    /// Stop automatically after `pre_trigger + post_trigger` samples
    #[serde(default)]
    pub auto_stop: bool,

    /// Downsampling ratio (1 = none)
    #[serde(default = "default_downsample_ratio")]
    pub downsample_ratio: u64,

    /// Downsampling mode
    #[serde(default = "default_ratio_mode")]
    pub ratio_mode: RatioMode,
}

fn default_time_units() -> TimeUnits {
    TimeUnits::S
}

fn default_downsample_ratio() -> u64 {
    1
}

fn default_ratio_mode() -> RatioMode {
    RatioMode::RAW
}

impl StreamingSettings {
    /// Settings with no pre-trigger, no auto-stop and no downsampling.
    pub fn new(sample_interval: f64, time_units: TimeUnits, post_trigger: u64) -> Self {
        Self {
            sample_interval,
            time_units,
            pre_trigger: 0,
            post_trigger,
            auto_stop: false,
            downsample_ratio: default_downsample_ratio(),
            ratio_mode: default_ratio_mode(),
        }
    }

    /// Set pre-trigger sample count.
    pub fn pre_trigger(mut self, samples: u64) -> Self {
        self.pre_trigger = samples;
        self
    }

    /// Enable or disable auto-stop.
    pub fn auto_stop(mut self, enabled: bool) -> Self {
        self.auto_stop = enabled;
        self
    }

    /// Set downsampling ratio and mode.
    pub fn downsample(mut self, ratio: u64, mode: RatioMode) -> Self {
        self.downsample_ratio = ratio;
        self.ratio_mode = mode;
        self
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<()> {
        if !(self.sample_interval.is_finite() && self.sample_interval > 0.0) {
            return Err(Ps6000aError::validation(format!(
                "Invalid sample interval: {}",
                self.sample_interval
            )));
        }
        if self.time_units.per_second().is_none() {
            return Err(Ps6000aError::validation(format!(
                "Unknown time units: {}",
                self.time_units
            )));
        }
        if self.pre_trigger.saturating_add(self.post_trigger) == 0 {
            return Err(Ps6000aError::validation(
                "Streaming run must capture at least one sample",
            ));
        }
        if self.downsample_ratio == 0 {
            return Err(Ps6000aError::validation("Downsample ratio must be at least 1"));
        }
        if self.ratio_mode.is_empty() {
            return Err(Ps6000aError::validation("Downsampling mode must be set"));
        }
        Ok(())
    }
}

// =============================================================================
// Poll results
// =============================================================================

/// One (channel, data type, mode) the poll asks about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamingRequest {
    /// Channel
    pub channel: Channel,
    /// Element type of the registered buffer
    pub data_type: DataType,
    /// Downsampling mode of the registered buffer
    pub mode: RatioMode,
}

impl StreamingRequest {
    /// Request matching a registered buffer.
    pub fn for_buffer(buffer: &Buffer) -> Self {
        Self {
            channel: buffer.channel(),
            data_type: buffer.data_type(),
            mode: buffer.mode(),
        }
    }

    fn class(&self) -> BufferClass {
        BufferClass::new(self.channel, self.data_type, 0)
    }
}

/// Samples newly available in one buffer since the previous poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamingWindow {
    /// Which buffer this window belongs to
    pub request: StreamingRequest,
    /// First new sample
    pub start_index: usize,
    /// Number of new samples
    pub length: usize,
    /// Driver's index of the buffer being filled
    pub buffer_index: u64,
    /// True if any sample in the window overflowed the range
    pub overflow: bool,
}

impl StreamingWindow {
    /// True if the poll produced no new samples for this buffer.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Copy the window's samples out of the registered buffer.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `buffer` is not a buffer of this
    /// window's channel, data type and mode, or is too short.
    pub fn copy_from(&self, buffer: &Buffer) -> Result<Samples> {
        if StreamingRequest::for_buffer(buffer) != self.request {
            return Err(Ps6000aError::validation(format!(
                "buffer {} does not belong to streaming window {:?}",
                buffer.id(),
                self.request
            )));
        }
        buffer.read_range(self.start_index, self.length)
    }
}

/// Trigger state reported alongside a poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamingTriggerInfo {
    /// Sample index of the trigger event, if triggered
    pub trigger_at: u64,
    /// True if the trigger has fired
    pub triggered: bool,
    /// True if the run stopped automatically
    pub auto_stop: bool,
}

impl From<PICO_STREAMING_DATA_TRIGGER_INFO> for StreamingTriggerInfo {
    fn from(raw: PICO_STREAMING_DATA_TRIGGER_INFO) -> Self {
        let (trigger_at, triggered, auto_stop) = (raw.triggerAt_, raw.triggered_, raw.autoStop_);
        Self {
            trigger_at,
            triggered: triggered != 0,
            auto_stop: auto_stop != 0,
        }
    }
}

/// Result of one streaming poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamingPoll {
    /// One window per request, in request order
    pub windows: Vec<StreamingWindow>,
    /// The device is waiting for buffers to be re-registered
    pub full: bool,
    /// Trigger state
    pub trigger: StreamingTriggerInfo,
}

impl StreamingPoll {
    /// Window for a request, if it was part of this poll.
    pub fn window(&self, request: &StreamingRequest) -> Option<&StreamingWindow> {
        self.windows.iter().find(|w| &w.request == request)
    }
}

fn window_from_info(
    request: StreamingRequest,
    capacity: usize,
    info: &PICO_STREAMING_DATA_INFO,
) -> Result<StreamingWindow> {
    // Copy out of the packed struct before use
    let n_samples = info.noOfSamples_;
    let start_index = info.startIndex_;
    let buffer_index = info.bufferIndex_;
    let overflow = info.overflow_;

    let (Ok(start), Ok(length)) = (usize::try_from(start_index), usize::try_from(n_samples))
    else {
        return Err(Ps6000aError::validation(format!(
            "device reported negative window {}+{} for {:?}",
            start_index, n_samples, request
        )));
    };
    if start.checked_add(length).map_or(true, |end| end > capacity) {
        return Err(Ps6000aError::validation(format!(
            "device reported window {}+{} beyond buffer capacity {} for {:?}",
            start, length, capacity, request
        )));
    }

    Ok(StreamingWindow {
        request,
        start_index: start,
        length,
        buffer_index,
        overflow: overflow != 0,
    })
}

// =============================================================================
// Session operations
// =============================================================================

impl<B: DeviceBoundary> Ps6000a<B> {
    /// Start a streaming run.
    ///
    /// Returns the sample interval the device actually achieved, in the
    /// settings' time units.
    pub fn run_streaming(&mut self, settings: &StreamingSettings) -> Result<f64> {
        settings.validate()?;
        if self.registry.streaming_targets().is_empty() {
            warn!("Starting streaming with no segment-0 buffers registered");
        }

        let mut interval = settings.sample_interval;
        self.call(|b, h| {
            b.run_streaming(
                h,
                &mut interval,
                settings.time_units.to_raw(),
                settings.pre_trigger,
                settings.post_trigger,
                i16::from(settings.auto_stop),
                settings.downsample_ratio,
                settings.ratio_mode.bits(),
            )
        })?;

        info!(
            requested = settings.sample_interval,
            actual = interval,
            units = %settings.time_units,
            pre = settings.pre_trigger,
            post = settings.post_trigger,
            auto_stop = settings.auto_stop,
            "Streaming started"
        );
        self.log_registry_summary();
        Ok(interval)
    }

    /// Poll a running stream.
    ///
    /// With `requests = None` the poll covers every segment-0 MAX buffer in
    /// the registry. Each request must have a registered buffer, whose
    /// capacity bounds the reported window.
    ///
    /// # Errors
    ///
    /// - Validation error if there is nothing to poll, a request has no
    ///   registered buffer, or the device reports a window outside the
    ///   buffer.
    /// - Status error for any status other than `OK` and
    ///   `WAITING_FOR_DATA_BUFFERS`.
    pub fn get_streaming_latest_values(
        &mut self,
        requests: Option<&[StreamingRequest]>,
    ) -> Result<StreamingPoll> {
        let requests: Vec<StreamingRequest> = match requests {
            Some(requests) => requests.to_vec(),
            None => self
                .registry
                .streaming_targets()
                .iter()
                .map(StreamingRequest::for_buffer)
                .collect(),
        };
        if requests.is_empty() {
            return Err(Ps6000aError::validation(
                "no streaming buffers registered to poll",
            ));
        }

        let capacities = requests
            .iter()
            .map(|request| {
                self.registry
                    .class(&request.class())
                    .iter()
                    .find(|b| b.role() == BufferRole::Max && b.mode() == request.mode)
                    .map(Buffer::len)
                    .ok_or_else(|| {
                        Ps6000aError::validation(format!(
                            "no segment-0 buffer registered for {:?}",
                            request
                        ))
                    })
            })
            .collect::<Result<Vec<usize>>>()?;

        let mut infos: Vec<PICO_STREAMING_DATA_INFO> = requests
            .iter()
            .map(|request| PICO_STREAMING_DATA_INFO {
                channel_: request.channel.to_raw(),
                mode_: request.mode.bits(),
                type_: request.data_type.to_raw(),
                ..Default::default()
            })
            .collect();
        let mut trigger = PICO_STREAMING_DATA_TRIGGER_INFO::default();

        let handle = self.handle()?;
        let raw = self
            .boundary
            .get_streaming_latest_values(handle, &mut infos, &mut trigger);
        let status = PicoStatus::from_raw(raw);
        self.last_status = Some(status);
        let full = status == PicoStatus::WAITING_FOR_DATA_BUFFERS;
        if !full {
            status.check()?;
        }

        let windows = requests
            .iter()
            .zip(&capacities)
            .zip(&infos)
            .map(|((request, &capacity), info)| window_from_info(*request, capacity, info))
            .collect::<Result<Vec<_>>>()?;

        let trigger = StreamingTriggerInfo::from(trigger);
        trace!(
            windows = windows.len(),
            samples = windows.iter().map(|w| w.length).sum::<usize>(),
            full,
            triggered = trigger.triggered,
            "Streaming poll"
        );
        if full {
            debug!("Device waiting for data buffers");
        }

        Ok(StreamingPoll {
            windows,
            full,
            trigger,
        })
    }

    /// Total samples captured by the last streaming run.
    ///
    /// Only meaningful after [`stop`](Self::stop).
    pub fn no_of_streaming_values(&mut self) -> Result<u64> {
        let mut n_values = 0;
        self.call(|b, h| b.no_of_streaming_values(h, &mut n_values))?;
        Ok(n_values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> StreamingRequest {
        StreamingRequest {
            channel: Channel::A,
            data_type: DataType::Int16,
            mode: RatioMode::RAW,
        }
    }

    fn info(start: i32, n: i32) -> PICO_STREAMING_DATA_INFO {
        PICO_STREAMING_DATA_INFO {
            startIndex_: start,
            noOfSamples_: n,
            ..Default::default()
        }
    }

    #[test]
    fn test_window_within_capacity() {
        let w = window_from_info(request(), 100, &info(40, 60)).unwrap();
        assert_eq!((w.start_index, w.length), (40, 60));
        assert!(!w.overflow);
    }

    #[test]
    fn test_window_beyond_capacity_rejected() {
        let err = window_from_info(request(), 100, &info(40, 61)).unwrap_err();
        assert!(err.is_validation());
        assert!(window_from_info(request(), 100, &info(-1, 5)).is_err());
    }

    #[test]
    fn test_settings_validation() {
        assert!(StreamingSettings::new(1.0, TimeUnits::Us, 1000).validate().is_ok());
        assert!(StreamingSettings::new(0.0, TimeUnits::Us, 1000).validate().is_err());
        assert!(StreamingSettings::new(1.0, TimeUnits::Unknown(12), 1000)
            .validate()
            .is_err());
        assert!(StreamingSettings::new(1.0, TimeUnits::Us, 0).validate().is_err());
        assert!(StreamingSettings::new(1.0, TimeUnits::Us, 10)
            .downsample(0, RatioMode::RAW)
            .validate()
            .is_err());
    }

    #[test]
    fn test_settings_from_toml_defaults() {
        let settings: StreamingSettings = toml::from_str(
            r#"
            sample_interval = 0.000001
            post_trigger = 5000
            "#,
        )
        .unwrap();
        assert_eq!(settings.time_units, TimeUnits::S);
        assert_eq!(settings.downsample_ratio, 1);
        assert_eq!(settings.ratio_mode, RatioMode::RAW);
        assert!(!settings.auto_stop);
    }
}
