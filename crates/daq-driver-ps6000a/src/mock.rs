//! Simulated PicoScope 6000E unit.
//!
//! [`MockBoundary`] implements [`DeviceBoundary`] entirely in memory so the
//! whole acquisition core can be exercised without hardware:
//!
//! - buffers registered with `SetDataBuffers` are written through the raw
//!   addresses the session hands over, exactly like the real driver;
//! - streaming produces `streaming_chunk` samples per poll per buffer and
//!   reports `WAITING_FOR_DATA_BUFFERS` once a buffer is full, after which
//!   that buffer must be re-registered;
//! - block captures become ready after `block_latency`, and a block-ready
//!   callback is invoked from a separate thread, exactly once per run.
//!
//! Sample codes are a deterministic sawtooth (see [`MockBoundary::sample_code`])
//! so tests can check continuity across polls.
//!
//! Fault injection: [`MockBoundary::fail_next`] makes the next call of a
//! given vendor function return a chosen status without side effects.

use std::collections::HashMap;
use std::ffi::{c_void, CStr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, trace};

use ps6000a_sys::{
    ps6000aBlockReady, PICO_CONDITION, PICO_DIRECTION, PICO_SCALING_FACTORS_VALUES,
    PICO_STREAMING_DATA_INFO, PICO_STREAMING_DATA_TRIGGER_INFO, PICO_TRIGGER_CHANNEL_PROPERTIES,
    PICO_TRIGGER_INFO,
};

use crate::boundary::DeviceBoundary;
use crate::scaling::VoltageScale;
use crate::status::PicoStatus;
use crate::trigger::{TriggerChannelProperties, TriggerCondition, TriggerDirection};
use crate::types::{
    Action, BandwidthLimiter, Channel, ChannelFlags, Coupling, DataType, DeviceResolution,
    DigitalPortHysteresis, Info, ProbeRange, RatioMode, ThresholdDirection, TimeUnits,
    TriggerWithinPreTrigger,
};

// =============================================================================
// Configuration and inspection types
// =============================================================================

/// Behaviour of the simulated unit.
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Serial numbers of the simulated units; the first is opened by default
    pub serials: Vec<String>,
    /// Reported model variant
    pub variant: String,
    /// Samples produced per streaming poll for each buffer
    pub streaming_chunk: usize,
    /// Time from `RunBlock` to capture completion
    pub block_latency: Duration,
    /// Sample memory at 8-bit resolution
    pub memory_samples: u64,
    /// Channels reported as overflowed by `GetValues`
    pub overflow: ChannelFlags,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            serials: vec!["JO247/0118".to_string()],
            variant: "6824E".to_string(),
            streaming_chunk: 1000,
            block_latency: Duration::from_millis(5),
            memory_samples: 4_000_000_000,
            overflow: ChannelFlags::empty(),
        }
    }
}

/// One recorded `SetDataBuffers` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetDataBuffersCall {
    /// Channel
    pub channel: Channel,
    /// MAX address (0 when null)
    pub max: usize,
    /// MIN address (0 when null)
    pub min: usize,
    /// Element count
    pub n_samples: i32,
    /// Element type
    pub data_type: DataType,
    /// Segment
    pub segment: u64,
    /// Downsampling mode
    pub mode: RatioMode,
    /// Action flags
    pub action: Action,
}

/// Front-end settings of an enabled channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MockChannel {
    /// Coupling
    pub coupling: Coupling,
    /// Range
    pub range: ProbeRange,
    /// Analogue offset, volts
    pub offset: f64,
    /// Bandwidth limiter
    pub bandwidth: BandwidthLimiter,
}

/// Last simple trigger configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockTrigger {
    /// Armed
    pub enabled: bool,
    /// Source
    pub source: Channel,
    /// Threshold code
    pub threshold: i16,
    /// Direction
    pub direction: ThresholdDirection,
    /// Delay in samples
    pub delay: u64,
    /// Auto-trigger timeout
    pub auto_trigger_us: u32,
}

/// Advanced trigger tables as the unit holds them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockAdvancedTrigger {
    /// Thresholds per source
    pub properties: Vec<TriggerChannelProperties>,
    /// Auto-trigger timeout given with the properties
    pub auto_trigger_us: u32,
    /// ORed products of ANDed terms
    pub conditions: Vec<Vec<TriggerCondition>>,
    /// Directions per source
    pub directions: Vec<TriggerDirection>,
    /// Delay in samples
    pub delay: u64,
    /// Trigger within pre-trigger samples
    pub within_pre_trigger: TriggerWithinPreTrigger,
}

impl Default for MockAdvancedTrigger {
    fn default() -> Self {
        Self {
            properties: Vec::new(),
            auto_trigger_us: 0,
            conditions: Vec::new(),
            directions: Vec::new(),
            delay: 0,
            within_pre_trigger: TriggerWithinPreTrigger::Disable,
        }
    }
}

/// Settings of an enabled digital port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockDigitalPort {
    /// Logic threshold per enabled pin
    pub thresholds: Vec<i16>,
    /// Hysteresis
    pub hysteresis: DigitalPortHysteresis,
}

// =============================================================================
// Internal state
// =============================================================================

// (channel, data type, segment, mode), all raw
type RegKey = (u32, u32, u64, u32);

#[derive(Debug)]
struct Registration {
    max: usize,
    min: usize,
    len: usize,
    cursor: usize,
}

#[derive(Debug)]
struct StreamState {
    running: bool,
    pre_trigger: u64,
    limit: Option<u64>,
    produced: HashMap<(u32, u32, u32), u64>,
    trigger_reported: bool,
}

impl StreamState {
    fn total(&self) -> u64 {
        self.produced.values().copied().max().unwrap_or(0)
    }
}

#[derive(Debug)]
struct BlockState {
    pre_trigger: u64,
    samples: u64,
    segment: u64,
    ready_at: Instant,
}

#[derive(Debug)]
struct PendingOpen {
    serial: String,
    resolution: DeviceResolution,
    progress: i16,
}

#[derive(Debug)]
struct MockState {
    calls: Vec<&'static str>,
    faults: HashMap<&'static str, u32>,
    next_handle: i16,
    open: Option<i16>,
    serial: Option<String>,
    pending_open: Option<PendingOpen>,
    resolution: DeviceResolution,
    n_segments: u64,
    channels: HashMap<u32, MockChannel>,
    trigger: Option<MockTrigger>,
    advanced: MockAdvancedTrigger,
    ports: HashMap<u32, MockDigitalPort>,
    registrations: HashMap<RegKey, Vec<Registration>>,
    buffer_calls: Vec<SetDataBuffersCall>,
    stream: Option<StreamState>,
    last_stream_total: Option<u64>,
    forced_window: Option<(i32, i32)>,
    block: Option<BlockState>,
    callback_threads: Vec<JoinHandle<()>>,
}

impl MockState {
    fn new() -> Self {
        Self {
            calls: Vec::new(),
            faults: HashMap::new(),
            next_handle: 1,
            open: None,
            serial: None,
            pending_open: None,
            resolution: DeviceResolution::default(),
            n_segments: 1,
            channels: HashMap::new(),
            trigger: None,
            advanced: MockAdvancedTrigger::default(),
            ports: HashMap::new(),
            registrations: HashMap::new(),
            buffer_calls: Vec::new(),
            stream: None,
            last_stream_total: None,
            forced_window: None,
            block: None,
            callback_threads: Vec::new(),
        }
    }

    fn reset_unit(&mut self) {
        self.open = None;
        self.serial = None;
        self.n_segments = 1;
        self.channels.clear();
        self.trigger = None;
        self.advanced = MockAdvancedTrigger::default();
        self.ports.clear();
        self.registrations.clear();
        self.stream = None;
        self.last_stream_total = None;
        self.forced_window = None;
        self.block = None;
    }
}

// =============================================================================
// Sample generation
// =============================================================================

fn timebase_interval_s(timebase: u32) -> f64 {
    if timebase <= 4 {
        f64::from(1u32 << timebase) / 5e9
    } else {
        f64::from(timebase - 4) / 156_250_000.0
    }
}

fn nearest_timebase(interval_s: f64) -> u32 {
    let ticks = interval_s * 156_250_000.0;
    if ticks >= 1.0 {
        return ticks.round().min(f64::from(u32::MAX - 4)) as u32 + 4;
    }
    (0..=4)
        .min_by(|&a, &b| {
            let da = (timebase_interval_s(a) - interval_s).abs();
            let db = (timebase_interval_s(b) - interval_s).abs();
            da.total_cmp(&db)
        })
        .unwrap_or(0)
}

/// Write one code into a device buffer.
///
/// # Safety
///
/// `base` must point to at least `index + 1` elements of `data_type`.
unsafe fn write_code(base: usize, data_type: DataType, index: usize, code: i64) {
    match data_type {
        DataType::Int8 => *(base as *mut i8).add(index) = code as i8,
        DataType::Int16 => *(base as *mut i16).add(index) = code as i16,
        DataType::Int32 => *(base as *mut i32).add(index) = code as i32,
        DataType::UInt32 => *(base as *mut u32).add(index) = code as u32,
        DataType::Int64 => *(base as *mut i64).add(index) = code,
        DataType::Unknown(_) => {}
    }
}

fn write_codes(reg: &Registration, data_type: DataType, at: usize, first_code: u64, step: u64, n: usize) {
    for i in 0..n {
        let code = MockBoundary::sample_code(data_type, first_code + i as u64 * step);
        // SAFETY: `at + n <= reg.len`, the length the session registered.
        unsafe {
            write_code(reg.max, data_type, at + i, code);
            if reg.min != 0 {
                write_code(reg.min, data_type, at + i, code);
            }
        }
    }
}

fn copy_str(dst: &mut [u8], src: &str) -> usize {
    if dst.is_empty() {
        return 0;
    }
    let n = src.len().min(dst.len() - 1);
    dst[..n].copy_from_slice(&src.as_bytes()[..n]);
    dst[n] = 0;
    n
}

fn is_trigger_source(channel: Channel) -> bool {
    channel.is_analog()
        || matches!(
            channel,
            Channel::External
                | Channel::TriggerAux
                | Channel::Port0
                | Channel::Port1
                | Channel::Port2
                | Channel::Port3
        )
}

fn is_digital_port(port: u32) -> bool {
    (0x80..=0x83).contains(&port)
}

// =============================================================================
// MockBoundary
// =============================================================================

/// In-memory [`DeviceBoundary`].
pub struct MockBoundary {
    config: MockConfig,
    state: Mutex<MockState>,
    callbacks_fired: Arc<AtomicUsize>,
}

impl Default for MockBoundary {
    fn default() -> Self {
        Self::new(MockConfig::default())
    }
}

macro_rules! enter {
    ($self:ident, $name:literal) => {
        match $self.enter($name, None) {
            Ok(state) => state,
            Err(status) => return status,
        }
    };
    ($self:ident, $name:literal, $handle:expr) => {
        match $self.enter($name, Some($handle)) {
            Ok(state) => state,
            Err(status) => return status,
        }
    };
}

impl MockBoundary {
    /// Simulated unit with the given behaviour.
    pub fn new(config: MockConfig) -> Self {
        Self {
            config,
            state: Mutex::new(MockState::new()),
            callbacks_fired: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Code written at position `index` of a stream or capture.
    pub fn sample_code(data_type: DataType, index: u64) -> i64 {
        let period = data_type
            .max_value()
            .map_or(1, |max| (max as u64).saturating_add(1).min(1 << 15));
        (index % period) as i64
    }

    /// Make the next call of `function` (vendor name without the `ps6000a`
    /// prefix, e.g. `"SetDataBuffers"`) return `status`.
    pub fn fail_next(&self, function: &'static str, status: PicoStatus) {
        self.state.lock().faults.insert(function, status.to_raw());
    }

    /// Report this window for every buffer on the next streaming poll.
    pub fn force_next_window(&self, start_index: i32, n_samples: i32) {
        self.state.lock().forced_window = Some((start_index, n_samples));
    }

    /// Names of every vendor function called so far.
    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().calls.clone()
    }

    /// Every `SetDataBuffers` call that reached the unit.
    pub fn set_data_buffers_calls(&self) -> Vec<SetDataBuffersCall> {
        self.state.lock().buffer_calls.clone()
    }

    /// Buffers the unit currently holds for a class, across all modes.
    pub fn registered(&self, channel: Channel, data_type: DataType, segment: u64) -> usize {
        self.state
            .lock()
            .registrations
            .iter()
            .filter(|(key, _)| {
                key.0 == channel.to_raw() && key.1 == data_type.to_raw() && key.2 == segment
            })
            .map(|(_, regs)| regs.len())
            .sum()
    }

    /// Settings of an enabled channel.
    pub fn channel(&self, channel: Channel) -> Option<MockChannel> {
        self.state.lock().channels.get(&channel.to_raw()).copied()
    }

    /// Last trigger configured.
    pub fn trigger(&self) -> Option<MockTrigger> {
        self.state.lock().trigger
    }

    /// Advanced trigger tables.
    pub fn advanced_trigger(&self) -> MockAdvancedTrigger {
        self.state.lock().advanced.clone()
    }

    /// Settings of an enabled digital port.
    pub fn digital_port(&self, port: Channel) -> Option<MockDigitalPort> {
        self.state.lock().ports.get(&port.to_raw()).cloned()
    }

    /// True while a handle is open.
    pub fn is_open(&self) -> bool {
        self.state.lock().open.is_some()
    }

    /// Number of block-ready callbacks delivered.
    pub fn callbacks_fired(&self) -> usize {
        self.callbacks_fired.load(Ordering::SeqCst)
    }

    fn enter(
        &self,
        function: &'static str,
        handle: Option<i16>,
    ) -> std::result::Result<MutexGuard<'_, MockState>, u32> {
        let mut state = self.state.lock();
        state.calls.push(function);
        trace!(function, ?handle, "Mock call");
        if let Some(status) = state.faults.remove(function) {
            debug!(function, status = %PicoStatus::from_raw(status), "Injected fault");
            return Err(status);
        }
        if let Some(handle) = handle {
            if state.open != Some(handle) {
                return Err(PicoStatus::INVALID_HANDLE.to_raw());
            }
        }
        Ok(state)
    }

    fn join_callbacks(&self) {
        let threads = std::mem::take(&mut self.state.lock().callback_threads);
        for thread in threads {
            let _ = thread.join();
        }
    }

    fn serial_matches(&self, serial: Option<&CStr>) -> Option<String> {
        match serial {
            None => self.config.serials.first().cloned(),
            Some(serial) => {
                let serial = serial.to_string_lossy();
                self.config.serials.iter().find(|s| **s == serial).cloned()
            }
        }
    }
}

impl Drop for MockBoundary {
    fn drop(&mut self) {
        self.join_callbacks();
    }
}

impl DeviceBoundary for MockBoundary {
    fn open_unit(&self, handle: &mut i16, serial: Option<&CStr>, resolution: u32) -> u32 {
        let mut state = enter!(self, "OpenUnit");
        let resolution = DeviceResolution::from_raw(resolution);

        if state.open.is_some() {
            *handle = -1;
            return PicoStatus::MAX_UNITS_OPENED.to_raw();
        }
        let Some(serial) = self.serial_matches(serial) else {
            *handle = 0;
            return PicoStatus::NOT_FOUND.to_raw();
        };
        if resolution.bits().is_none() {
            *handle = -1;
            return PicoStatus::INVALID_DEVICE_RESOLUTION.to_raw();
        }

        *handle = state.next_handle;
        state.next_handle = state.next_handle.wrapping_add(1).max(1);
        state.open = Some(*handle);
        state.serial = Some(serial);
        state.resolution = resolution;
        PicoStatus::OK.to_raw()
    }

    fn open_unit_async(&self, status: &mut i16, serial: Option<&CStr>, resolution: u32) -> u32 {
        let mut state = enter!(self, "OpenUnitAsync");
        *status = 0;
        if state.pending_open.is_some() || state.open.is_some() {
            return PicoStatus::OPEN_OPERATION_IN_PROGRESS.to_raw();
        }
        let Some(serial) = self.serial_matches(serial) else {
            return PicoStatus::NOT_FOUND.to_raw();
        };
        let resolution = DeviceResolution::from_raw(resolution);
        if resolution.bits().is_none() {
            return PicoStatus::INVALID_DEVICE_RESOLUTION.to_raw();
        }

        state.pending_open = Some(PendingOpen {
            serial,
            resolution,
            progress: 0,
        });
        *status = 1;
        PicoStatus::OK.to_raw()
    }

    fn open_unit_progress(
        &self,
        handle: &mut i16,
        progress: &mut i16,
        complete: &mut i16,
    ) -> u32 {
        let mut state = enter!(self, "OpenUnitProgress");
        let Some(mut pending) = state.pending_open.take() else {
            return PicoStatus::INVALID_CALL.to_raw();
        };

        pending.progress = (pending.progress + 50).min(100);
        *progress = pending.progress;
        if pending.progress < 100 {
            *complete = 0;
            state.pending_open = Some(pending);
            return PicoStatus::OK.to_raw();
        }

        *complete = 1;
        *handle = state.next_handle;
        state.next_handle = state.next_handle.wrapping_add(1).max(1);
        state.open = Some(*handle);
        state.serial = Some(pending.serial);
        state.resolution = pending.resolution;
        PicoStatus::OK.to_raw()
    }

    fn get_unit_info(&self, handle: i16, string: &mut [u8], required: &mut i16, info: u32) -> u32 {
        let state = enter!(self, "GetUnitInfo", handle);
        let value = match Info::from_raw(info) {
            Info::DriverVersion => "1.0.0 (simulated)".to_string(),
            Info::UsbVersion => "3.0".to_string(),
            Info::HardwareVersion => "1".to_string(),
            Info::VariantInfo => self.config.variant.clone(),
            Info::BatchAndSerial => state.serial.clone().unwrap_or_default(),
            Info::CalDate => "01Jan26".to_string(),
            Info::KernelVersion => "n/a".to_string(),
            Info::Unknown(_) => return PicoStatus::INVALID_INFO.to_raw(),
            _ => return PicoStatus::INFO_UNAVAILABLE.to_raw(),
        };
        *required = i16::try_from(value.len() + 1).unwrap_or(i16::MAX);
        copy_str(string, &value);
        PicoStatus::OK.to_raw()
    }

    fn close_unit(&self, handle: i16) -> u32 {
        {
            let _state = enter!(self, "CloseUnit", handle);
        }
        // Outstanding notifications are delivered before the handle dies
        self.join_callbacks();
        self.state.lock().reset_unit();
        PicoStatus::OK.to_raw()
    }

    fn ping_unit(&self, handle: i16) -> u32 {
        let _state = enter!(self, "PingUnit", handle);
        PicoStatus::OK.to_raw()
    }

    fn flash_led(&self, handle: i16, _start: i16) -> u32 {
        let _state = enter!(self, "FlashLed", handle);
        PicoStatus::OK.to_raw()
    }

    fn enumerate_units(&self, count: &mut i16, serials: &mut [u8], serial_len: &mut i16) -> u32 {
        let _state = enter!(self, "EnumerateUnits");
        *count = i16::try_from(self.config.serials.len()).unwrap_or(i16::MAX);
        if self.config.serials.is_empty() {
            *serial_len = 0;
            return PicoStatus::NOT_FOUND.to_raw();
        }
        let joined = self.config.serials.join(",");
        let written = copy_str(serials, &joined);
        *serial_len = i16::try_from(written).unwrap_or(i16::MAX);
        PicoStatus::OK.to_raw()
    }

    fn memory_segments(&self, handle: i16, n_segments: u64, max_samples: &mut u64) -> u32 {
        let mut state = enter!(self, "MemorySegments", handle);
        if n_segments == 0 || n_segments > self.config.memory_samples {
            return PicoStatus::TOO_MANY_SEGMENTS.to_raw();
        }
        state.n_segments = n_segments;
        *max_samples = self.config.memory_samples / n_segments;
        PicoStatus::OK.to_raw()
    }

    fn memory_segments_by_samples(&self, handle: i16, n_samples: u64, max_segments: &mut u64) -> u32 {
        let mut state = enter!(self, "MemorySegmentsBySamples", handle);
        if n_samples == 0 || n_samples > self.config.memory_samples {
            return PicoStatus::TOO_MANY_SAMPLES.to_raw();
        }
        let segments = self.config.memory_samples / n_samples;
        state.n_segments = segments;
        *max_segments = segments;
        PicoStatus::OK.to_raw()
    }

    fn query_max_segments_by_samples(
        &self,
        handle: i16,
        n_samples: u64,
        n_channels_enabled: i32,
        max_segments: &mut u64,
        resolution: u32,
    ) -> u32 {
        let _state = enter!(self, "QueryMaxSegmentsBySamples", handle);
        let Some(data_type) = DeviceResolution::from_raw(resolution).min_type() else {
            return PicoStatus::INVALID_DEVICE_RESOLUTION.to_raw();
        };
        let Ok(n_channels) = u64::try_from(n_channels_enabled) else {
            return PicoStatus::INVALID_NUMBER_CHANNELS_FOR_RESOLUTION.to_raw();
        };
        if !(1..=8).contains(&n_channels) {
            return PicoStatus::INVALID_NUMBER_CHANNELS_FOR_RESOLUTION.to_raw();
        }
        let capacity = self.config.memory_samples / data_type.size_of().unwrap_or(1) as u64;
        let per_segment = n_samples.saturating_mul(n_channels);
        if n_samples == 0 || per_segment > capacity {
            return PicoStatus::TOO_MANY_SAMPLES.to_raw();
        }
        *max_segments = capacity / per_segment;
        PicoStatus::OK.to_raw()
    }

    fn get_maximum_available_memory(&self, handle: i16, max_samples: &mut u64, resolution: u32) -> u32 {
        let _state = enter!(self, "GetMaximumAvailableMemory", handle);
        let Some(data_type) = DeviceResolution::from_raw(resolution).min_type() else {
            return PicoStatus::INVALID_DEVICE_RESOLUTION.to_raw();
        };
        let bytes = data_type.size_of().unwrap_or(1) as u64;
        *max_samples = self.config.memory_samples / bytes;
        PicoStatus::OK.to_raw()
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
        let mut state = enter!(self, "SetChannelOn", handle);
        if channel > 7 {
            return PicoStatus::INVALID_CHANNEL.to_raw();
        }
        let coupling = Coupling::from_raw(coupling);
        if coupling.name().is_none() {
            return PicoStatus::INVALID_COUPLING.to_raw();
        }
        let range = ProbeRange::from_raw(range);
        if range.full_scale().is_none() {
            return PicoStatus::INVALID_VOLTAGE_RANGE.to_raw();
        }
        let bandwidth = BandwidthLimiter::from_raw(bandwidth);
        if bandwidth.name().is_none() {
            return PicoStatus::INVALID_BANDWIDTH.to_raw();
        }
        state.channels.insert(
            channel,
            MockChannel {
                coupling,
                range,
                offset: analogue_offset,
                bandwidth,
            },
        );
        PicoStatus::OK.to_raw()
    }

    fn set_channel_off(&self, handle: i16, channel: u32) -> u32 {
        let mut state = enter!(self, "SetChannelOff", handle);
        if channel > 7 {
            return PicoStatus::INVALID_CHANNEL.to_raw();
        }
        state.channels.remove(&channel);
        PicoStatus::OK.to_raw()
    }

    fn set_digital_port_on(
        &self,
        handle: i16,
        port: u32,
        thresholds: &[i16],
        hysteresis: u32,
    ) -> u32 {
        let mut state = enter!(self, "SetDigitalPortOn", handle);
        if !is_digital_port(port) {
            return PicoStatus::INVALID_CHANNEL.to_raw();
        }
        if thresholds.is_empty() || thresholds.len() > 8 {
            return PicoStatus::INVALID_PARAMETER.to_raw();
        }
        if thresholds.contains(&i16::MIN) {
            return PicoStatus::THRESHOLD_OUT_OF_RANGE.to_raw();
        }
        let hysteresis = DigitalPortHysteresis::from_raw(hysteresis);
        if hysteresis.name().is_none() {
            return PicoStatus::DIGITAL_PORT_HYSTERESIS_OUT_OF_RANGE.to_raw();
        }
        state.ports.insert(
            port,
            MockDigitalPort {
                thresholds: thresholds.to_vec(),
                hysteresis,
            },
        );
        PicoStatus::OK.to_raw()
    }

    fn set_digital_port_off(&self, handle: i16, port: u32) -> u32 {
        let mut state = enter!(self, "SetDigitalPortOff", handle);
        if !is_digital_port(port) {
            return PicoStatus::INVALID_CHANNEL.to_raw();
        }
        state.ports.remove(&port);
        PicoStatus::OK.to_raw()
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
        let state = enter!(self, "GetTimebase", handle);
        if segment >= state.n_segments {
            return PicoStatus::SEGMENT_OUT_OF_RANGE.to_raw();
        }
        let capacity = self.config.memory_samples / state.n_segments;
        if n_samples > capacity {
            return PicoStatus::TOO_MANY_SAMPLES.to_raw();
        }
        *interval_ns = timebase_interval_s(timebase) * 1e9;
        *max_samples = capacity;
        PicoStatus::OK.to_raw()
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
        let mut state = enter!(self, "SetSimpleTrigger", handle);
        let source = Channel::from_raw(source);
        let valid_source =
            source.is_analog() || matches!(source, Channel::External | Channel::TriggerAux);
        if !valid_source {
            return PicoStatus::INVALID_TRIGGER_CHANNEL.to_raw();
        }
        let direction = ThresholdDirection::from_raw(direction);
        if direction.name().is_none() {
            return PicoStatus::INVALID_TRIGGER_DIRECTION.to_raw();
        }
        state.trigger = Some(MockTrigger {
            enabled: enable != 0,
            source,
            threshold,
            direction,
            delay,
            auto_trigger_us,
        });
        PicoStatus::OK.to_raw()
    }

    fn set_trigger_channel_properties(
        &self,
        handle: i16,
        properties: &[PICO_TRIGGER_CHANNEL_PROPERTIES],
        _aux_output_enable: i16,
        auto_trigger_us: u32,
    ) -> u32 {
        let mut state = enter!(self, "SetTriggerChannelProperties", handle);
        let properties: Vec<TriggerChannelProperties> =
            properties.iter().copied().map(Into::into).collect();
        if properties.iter().any(|p| !is_trigger_source(p.channel)) {
            return PicoStatus::INVALID_TRIGGER_CHANNEL.to_raw();
        }
        if properties
            .iter()
            .any(|p| p.lower_threshold > p.upper_threshold)
        {
            return PicoStatus::INVALID_TRIGGER_PROPERTY.to_raw();
        }
        state.advanced.properties = properties;
        state.advanced.auto_trigger_us = auto_trigger_us;
        PicoStatus::OK.to_raw()
    }

    fn set_trigger_channel_conditions(
        &self,
        handle: i16,
        conditions: &[PICO_CONDITION],
        action: u32,
    ) -> u32 {
        let mut state = enter!(self, "SetTriggerChannelConditions", handle);
        let action = Action::from_bits_retain(action);
        if !action.intersects(Action::CLEAR_ALL | Action::ADD) {
            return PicoStatus::INVALID_ACTION.to_raw();
        }
        let terms: Vec<TriggerCondition> = conditions.iter().copied().map(Into::into).collect();
        for (i, term) in terms.iter().enumerate() {
            if !is_trigger_source(term.source) {
                return PicoStatus::INVALID_CONDITION_CHANNEL.to_raw();
            }
            if term.state.name().is_none() {
                return PicoStatus::INVALID_TRIGGER_STATES.to_raw();
            }
            if terms[..i].iter().any(|t| t.source == term.source) {
                return PicoStatus::DUPLICATE_CONDITION_SOURCE.to_raw();
            }
        }
        if action.contains(Action::CLEAR_ALL) {
            state.advanced.conditions.clear();
        }
        if action.contains(Action::ADD) {
            if terms.is_empty() {
                return PicoStatus::NULL_CONDITIONS.to_raw();
            }
            state.advanced.conditions.push(terms);
        }
        PicoStatus::OK.to_raw()
    }

    fn set_trigger_channel_directions(&self, handle: i16, directions: &[PICO_DIRECTION]) -> u32 {
        let mut state = enter!(self, "SetTriggerChannelDirections", handle);
        let directions: Vec<TriggerDirection> =
            directions.iter().copied().map(Into::into).collect();
        for dir in &directions {
            if !is_trigger_source(dir.channel) {
                return PicoStatus::INVALID_TRIGGER_CHANNEL.to_raw();
            }
            if dir.direction.name().is_none() {
                return PicoStatus::INVALID_THRESHOLD_DIRECTION.to_raw();
            }
            if dir.mode.name().is_none() {
                return PicoStatus::INVALID_PARAMETER.to_raw();
            }
        }
        state.advanced.directions = directions;
        PicoStatus::OK.to_raw()
    }

    fn set_trigger_delay(&self, handle: i16, delay: u64) -> u32 {
        let mut state = enter!(self, "SetTriggerDelay", handle);
        if delay > u64::from(u32::MAX) {
            return PicoStatus::TRIGGER_DELAY_OUT_OF_RANGE.to_raw();
        }
        if delay > 0 && state.advanced.within_pre_trigger == TriggerWithinPreTrigger::Arm {
            return PicoStatus::TRIGGER_WITHIN_PRE_NOT_ALLOWED_WITH_DELAY.to_raw();
        }
        state.advanced.delay = delay;
        PicoStatus::OK.to_raw()
    }

    fn trigger_within_pre_trigger_samples(&self, handle: i16, state_raw: u32) -> u32 {
        let mut state = enter!(self, "TriggerWithinPreTriggerSamples", handle);
        let within = TriggerWithinPreTrigger::from_raw(state_raw);
        if within.name().is_none() {
            return PicoStatus::INVALID_TRIGGER_WITHIN_PRE_TRIGGER_STATE.to_raw();
        }
        if within == TriggerWithinPreTrigger::Arm && state.advanced.delay > 0 {
            return PicoStatus::TRIGGER_WITHIN_PRE_NOT_ALLOWED_WITH_DELAY.to_raw();
        }
        state.advanced.within_pre_trigger = within;
        PicoStatus::OK.to_raw()
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
        let mut state = enter!(self, "SetDataBuffers", handle);
        let action_flags = Action::from_bits_retain(action);
        state.buffer_calls.push(SetDataBuffersCall {
            channel: Channel::from_raw(channel),
            max: max as usize,
            min: min as usize,
            n_samples,
            data_type: DataType::from_raw(data_type),
            segment,
            mode: RatioMode::from_bits_retain(mode),
            action: action_flags,
        });

        if channel > 7 && !(0x80..=0x83).contains(&channel) {
            return PicoStatus::INVALID_CHANNEL.to_raw();
        }
        if DataType::from_raw(data_type).size_of().is_none() {
            return PicoStatus::DATATYPE_INVALID.to_raw();
        }
        if !action_flags.intersects(Action::ADD | Action::CLEAR_ALL | Action::CLEAR_THIS_DATA_BUFFER)
        {
            return PicoStatus::INVALID_ACTION.to_raw();
        }
        if action_flags.contains(Action::ADD) {
            if max.is_null() {
                return PicoStatus::INVALID_BUFFER.to_raw();
            }
            if n_samples <= 0 {
                return PicoStatus::NO_SAMPLES_REQUESTED.to_raw();
            }
        }

        if action_flags.contains(Action::CLEAR_ALL) {
            state
                .registrations
                .retain(|key, _| !(key.0 == channel && key.1 == data_type && key.2 == segment));
        }
        if action_flags.contains(Action::CLEAR_THIS_DATA_BUFFER) {
            for regs in state.registrations.values_mut() {
                regs.retain(|r| r.max != max as usize);
            }
        }
        if action_flags.contains(Action::ADD) {
            let registration = Registration {
                max: max as usize,
                min: min as usize,
                len: n_samples as usize,
                cursor: 0,
            };
            let regs = state
                .registrations
                .entry((channel, data_type, segment, mode))
                .or_default();
            // The unit keys buffers by address: adding one again re-arms it
            match regs.iter_mut().find(|r| r.max == registration.max) {
                Some(existing) => *existing = registration,
                None => regs.push(registration),
            }
        }
        PicoStatus::OK.to_raw()
    }

    fn run_streaming(
        &self,
        handle: i16,
        sample_interval: &mut f64,
        time_units: u32,
        pre_trigger: u64,
        post_trigger: u64,
        auto_stop: i16,
        _downsample_ratio: u64,
        _mode: u32,
    ) -> u32 {
        let mut state = enter!(self, "RunStreaming", handle);
        let Some(per_second) = TimeUnits::from_raw(time_units).per_second() else {
            return PicoStatus::TIME_UNITS_OUT_OF_RANGE.to_raw();
        };
        if !(*sample_interval > 0.0) {
            return PicoStatus::INVALID_SAMPLE_INTERVAL.to_raw();
        }

        let timebase = nearest_timebase(*sample_interval / per_second);
        *sample_interval = timebase_interval_s(timebase) * per_second;

        for regs in state.registrations.values_mut() {
            for reg in regs.iter_mut() {
                reg.cursor = 0;
            }
        }
        state.block = None;
        state.last_stream_total = None;
        state.stream = Some(StreamState {
            running: true,
            pre_trigger,
            limit: (auto_stop != 0).then(|| pre_trigger.saturating_add(post_trigger)),
            produced: HashMap::new(),
            trigger_reported: false,
        });
        PicoStatus::OK.to_raw()
    }

    fn get_streaming_latest_values(
        &self,
        handle: i16,
        infos: &mut [PICO_STREAMING_DATA_INFO],
        trigger: &mut PICO_STREAMING_DATA_TRIGGER_INFO,
    ) -> u32 {
        let mut guard = enter!(self, "GetStreamingLatestValues", handle);
        let state = &mut *guard;
        let Some(stream) = state.stream.as_mut() else {
            return PicoStatus::INVALID_CALL.to_raw();
        };

        if let Some((start, n)) = state.forced_window.take() {
            for info in infos.iter_mut() {
                info.startIndex_ = start;
                info.noOfSamples_ = n;
            }
            return PicoStatus::OK.to_raw();
        }

        let mut full = false;
        let mut stopped = false;
        for info in infos.iter_mut() {
            let (channel, mode, raw_type) = (info.channel_, info.mode_, info.type_);
            let data_type = DataType::from_raw(raw_type);
            info.startIndex_ = 0;
            info.noOfSamples_ = 0;
            info.overflow_ = 0;

            let Some(reg) = state
                .registrations
                .get_mut(&(channel, raw_type, 0, mode))
                .and_then(|regs| regs.first_mut())
            else {
                // Nothing to write into: the unit stalls until buffers arrive
                full = true;
                continue;
            };

            let produced = stream.produced.entry((channel, raw_type, mode)).or_insert(0);
            let mut n = self.config.streaming_chunk.min(reg.len - reg.cursor);
            if let Some(limit) = stream.limit {
                let left = limit.saturating_sub(*produced);
                n = n.min(usize::try_from(left).unwrap_or(usize::MAX));
                if left == 0 {
                    stopped = true;
                }
            }
            if !stream.running {
                n = 0;
            }

            write_codes(reg, data_type, reg.cursor, *produced, 1, n);
            info.startIndex_ = reg.cursor as i32;
            info.noOfSamples_ = n as i32;
            reg.cursor += n;
            *produced += n as u64;

            if reg.cursor == reg.len {
                full = true;
            }
        }

        // Buffers that were filled are handed back to the caller
        state.registrations.retain(|key, regs| {
            if key.2 == 0 {
                regs.retain(|r| r.cursor < r.len);
            }
            !regs.is_empty()
        });

        let total = stream.total();
        if let Some(limit) = stream.limit {
            if total >= limit {
                stopped = true;
            }
        }
        *trigger = PICO_STREAMING_DATA_TRIGGER_INFO::default();
        let armed = state.trigger.map_or(false, |t| t.enabled);
        if armed && !stream.trigger_reported && total > stream.pre_trigger {
            stream.trigger_reported = true;
            trigger.triggered_ = 1;
            trigger.triggerAt_ = stream.pre_trigger;
        }
        if stopped {
            trigger.autoStop_ = 1;
            stream.running = false;
        }

        if full {
            PicoStatus::WAITING_FOR_DATA_BUFFERS.to_raw()
        } else {
            PicoStatus::OK.to_raw()
        }
    }

    fn no_of_streaming_values(&self, handle: i16, n_values: &mut u64) -> u32 {
        let state = enter!(self, "NoOfStreamingValues", handle);
        match (&state.stream, state.last_stream_total) {
            (Some(_), _) => PicoStatus::INVALID_CALL.to_raw(),
            (None, Some(total)) => {
                *n_values = total;
                PicoStatus::OK.to_raw()
            }
            (None, None) => PicoStatus::DATA_NOT_AVAILABLE.to_raw(),
        }
    }

    unsafe fn run_block(
        &self,
        handle: i16,
        pre_trigger: u64,
        post_trigger: u64,
        _timebase: u32,
        time_indisposed_ms: &mut f64,
        segment: u64,
        ready: ps6000aBlockReady,
        parameter: *mut c_void,
    ) -> u32 {
        let mut state = enter!(self, "RunBlock", handle);
        if segment >= state.n_segments {
            return PicoStatus::SEGMENT_OUT_OF_RANGE.to_raw();
        }
        let samples = pre_trigger.saturating_add(post_trigger);
        if samples == 0 {
            return PicoStatus::NO_SAMPLES_REQUESTED.to_raw();
        }

        let latency = self.config.block_latency;
        state.stream = None;
        state.block = Some(BlockState {
            pre_trigger,
            samples,
            segment,
            ready_at: Instant::now() + latency,
        });
        *time_indisposed_ms = latency.as_secs_f64() * 1e3;

        if let Some(callback) = ready {
            let parameter = parameter as usize;
            let fired = Arc::clone(&self.callbacks_fired);
            let thread = thread::spawn(move || {
                thread::sleep(latency);
                // SAFETY: the caller keeps `parameter` valid until this call.
                unsafe { callback(handle, PicoStatus::OK.to_raw(), parameter as *mut c_void) };
                fired.fetch_add(1, Ordering::SeqCst);
            });
            state.callback_threads.push(thread);
        }
        PicoStatus::OK.to_raw()
    }

    fn is_ready(&self, handle: i16, ready: &mut i16) -> u32 {
        let state = enter!(self, "IsReady", handle);
        let Some(block) = &state.block else {
            return PicoStatus::INVALID_CALL.to_raw();
        };
        *ready = i16::from(Instant::now() >= block.ready_at);
        PicoStatus::OK.to_raw()
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
        let state = enter!(self, "GetValues", handle);
        let Some(block) = &state.block else {
            return PicoStatus::INVALID_CALL.to_raw();
        };
        if Instant::now() < block.ready_at {
            return PicoStatus::DATA_NOT_AVAILABLE.to_raw();
        }
        if segment != block.segment {
            return PicoStatus::SEGMENT_NOT_USED.to_raw();
        }
        if start >= block.samples {
            return PicoStatus::STARTINDEX_INVALID.to_raw();
        }

        let step = downsample_ratio.max(1);
        let available = (block.samples - start) / step;
        let targets: Vec<(DataType, &Registration)> = state
            .registrations
            .iter()
            .filter(|(key, _)| key.2 == segment && key.3 & mode != 0)
            .flat_map(|(key, regs)| regs.iter().map(move |r| (DataType::from_raw(key.1), r)))
            .collect();
        if targets.is_empty() {
            return PicoStatus::BUFFERS_NOT_SET.to_raw();
        }

        let mut written = (*n_samples).min(available);
        for (_, reg) in &targets {
            written = written.min(reg.len as u64);
        }
        for (data_type, reg) in &targets {
            write_codes(reg, *data_type, 0, start, step, written as usize);
        }

        *n_samples = written;
        *overflow = self.config.overflow.bits() as u16 as i16;
        PicoStatus::OK.to_raw()
    }

    fn stop(&self, handle: i16) -> u32 {
        let mut state = enter!(self, "Stop", handle);
        if let Some(stream) = state.stream.take() {
            state.last_stream_total = Some(stream.total());
        }
        PicoStatus::OK.to_raw()
    }

    fn get_trigger_info(&self, handle: i16, infos: &mut [PICO_TRIGGER_INFO], first_segment: u64) -> u32 {
        let state = enter!(self, "GetTriggerInfo", handle);
        let Some(block) = &state.block else {
            return PicoStatus::INVALID_CALL.to_raw();
        };
        if first_segment.saturating_add(infos.len() as u64) > state.n_segments {
            return PicoStatus::SEGMENT_OUT_OF_RANGE.to_raw();
        }
        for (i, info) in infos.iter_mut().enumerate() {
            let segment = first_segment + i as u64;
            *info = PICO_TRIGGER_INFO {
                status: PicoStatus::OK.to_raw(),
                segmentIndex: segment,
                triggerIndex: block.pre_trigger,
                triggerTime: 0.0,
                timeUnits: TimeUnits::Ns.to_raw(),
                missedTriggers: 0,
                timeStampCounter: segment * block.samples,
            };
        }
        PicoStatus::OK.to_raw()
    }

    fn get_analogue_offset_limits(
        &self,
        handle: i16,
        range: u32,
        coupling: u32,
        max: &mut f64,
        min: &mut f64,
    ) -> u32 {
        let _state = enter!(self, "GetAnalogueOffsetLimits", handle);
        let Some(full_scale) = ProbeRange::from_raw(range).full_scale() else {
            return PicoStatus::INVALID_VOLTAGE_RANGE.to_raw();
        };
        let mut limit = (full_scale * 2.5).min(20.0);
        match Coupling::from_raw(coupling) {
            Coupling::Dc50Ohm => limit = limit.min(5.0),
            Coupling::Unknown(_) => return PicoStatus::INVALID_COUPLING.to_raw(),
            _ => {}
        }
        *max = limit;
        *min = -limit;
        PicoStatus::OK.to_raw()
    }

    fn get_minimum_timebase_stateless(
        &self,
        handle: i16,
        channel_flags: u32,
        timebase: &mut u32,
        interval_s: &mut f64,
        resolution: u32,
    ) -> u32 {
        let _state = enter!(self, "GetMinimumTimebaseStateless", handle);
        let Some(bits) = DeviceResolution::from_raw(resolution).bits() else {
            return PicoStatus::INVALID_DEVICE_RESOLUTION.to_raw();
        };
        let analog = (ChannelFlags::from_bits_retain(channel_flags).bits() & 0xFF).count_ones();
        if analog == 0 {
            return PicoStatus::INVALID_CHANNEL.to_raw();
        }
        let mut tb = match analog {
            1..=2 => 0,
            3..=4 => 1,
            _ => 2,
        };
        if bits > 8 {
            tb += 1;
        }
        *timebase = tb;
        *interval_s = timebase_interval_s(tb);
        PicoStatus::OK.to_raw()
    }

    fn nearest_sample_interval_stateless(
        &self,
        handle: i16,
        _channel_flags: u32,
        requested_s: f64,
        resolution: u32,
        timebase: &mut u32,
        available_s: &mut f64,
    ) -> u32 {
        let _state = enter!(self, "NearestSampleIntervalStateless", handle);
        if DeviceResolution::from_raw(resolution).bits().is_none() {
            return PicoStatus::INVALID_DEVICE_RESOLUTION.to_raw();
        }
        if !(requested_s > 0.0) {
            return PicoStatus::INVALID_SAMPLE_INTERVAL.to_raw();
        }
        *timebase = nearest_timebase(requested_s);
        *available_s = timebase_interval_s(*timebase);
        PicoStatus::OK.to_raw()
    }

    fn set_device_resolution(&self, handle: i16, resolution: u32) -> u32 {
        let mut state = enter!(self, "SetDeviceResolution", handle);
        let resolution = DeviceResolution::from_raw(resolution);
        if resolution.bits().is_none() {
            return PicoStatus::INVALID_DEVICE_RESOLUTION.to_raw();
        }
        state.resolution = resolution;
        PicoStatus::OK.to_raw()
    }

    fn get_device_resolution(&self, handle: i16, resolution: &mut u32) -> u32 {
        let state = enter!(self, "GetDeviceResolution", handle);
        *resolution = state.resolution.to_raw();
        PicoStatus::OK.to_raw()
    }

    fn get_adc_limits(&self, handle: i16, resolution: u32, min: &mut i16, max: &mut i16) -> u32 {
        let _state = enter!(self, "GetAdcLimits", handle);
        let Some(data_type) = DeviceResolution::from_raw(resolution).min_type() else {
            return PicoStatus::INVALID_DEVICE_RESOLUTION.to_raw();
        };
        *min = data_type.min_value().unwrap_or(0) as i16;
        *max = data_type.max_value().unwrap_or(0) as i16;
        PicoStatus::OK.to_raw()
    }

    fn get_scaling_values(&self, handle: i16, values: &mut [PICO_SCALING_FACTORS_VALUES]) -> u32 {
        let state = enter!(self, "GetScalingValues", handle);
        if values.iter().any(|v| !Channel::from_raw(v.channel).is_analog()) {
            return PicoStatus::INVALID_CHANNEL.to_raw();
        }
        for value in values.iter_mut() {
            let Some(channel) = state.channels.get(&{ value.channel }) else {
                value.range = ProbeRange::ProbeOff.to_raw();
                value.offset = 0;
                value.scalingFactor = 0.0;
                continue;
            };
            let Ok(scale) = VoltageScale::new(channel.range, state.resolution) else {
                return PicoStatus::INVALID_DEVICE_RESOLUTION.to_raw();
            };
            value.range = channel.range.to_raw();
            value.offset = scale
                .to_code(channel.offset)
                .clamp(i64::from(i16::MIN), i64::from(i16::MAX)) as i16;
            value.scalingFactor = scale.to_volts(1.0);
        }
        PicoStatus::OK.to_raw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timebase_formula() {
        assert!((timebase_interval_s(0) - 0.2e-9).abs() < 1e-15);
        assert!((timebase_interval_s(4) - 3.2e-9).abs() < 1e-15);
        assert!((timebase_interval_s(5) - 6.4e-9).abs() < 1e-15);
        assert_eq!(nearest_timebase(6.4e-9), 5);
        assert_eq!(nearest_timebase(0.8e-9), 2);
    }

    #[test]
    fn test_sample_code_wraps_within_type() {
        assert_eq!(MockBoundary::sample_code(DataType::Int8, 127), 127);
        assert_eq!(MockBoundary::sample_code(DataType::Int8, 128), 0);
        assert_eq!(MockBoundary::sample_code(DataType::Int16, 40_000), 40_000 - 32_768);
    }

    #[test]
    fn test_fault_injection_is_one_shot() {
        let mock = MockBoundary::default();
        mock.fail_next("EnumerateUnits", PicoStatus::NOT_RESPONDING);
        let (mut count, mut len) = (0, 0);
        let mut buf = [0u8; 64];
        assert_eq!(
            mock.enumerate_units(&mut count, &mut buf, &mut len),
            PicoStatus::NOT_RESPONDING.to_raw()
        );
        assert_eq!(mock.enumerate_units(&mut count, &mut buf, &mut len), 0);
        assert_eq!(count, 1);
    }

    fn opened() -> (MockBoundary, i16) {
        let mock = MockBoundary::default();
        let mut handle = 0;
        assert_eq!(mock.open_unit(&mut handle, None, 0), 0);
        (mock, handle)
    }

    #[test]
    fn test_conditions_accumulate_until_cleared() {
        use crate::types::TriggerState;

        let (mock, handle) = opened();
        let a = PICO_CONDITION::from(TriggerCondition::new(Channel::A, TriggerState::True));
        let b = PICO_CONDITION::from(TriggerCondition::new(Channel::B, TriggerState::False));
        let add = Action::ADD.bits();
        assert_eq!(mock.set_trigger_channel_conditions(handle, &[a, b], add), 0);
        assert_eq!(mock.set_trigger_channel_conditions(handle, &[b], add), 0);
        assert_eq!(mock.advanced_trigger().conditions.len(), 2);

        assert_eq!(
            mock.set_trigger_channel_conditions(handle, &[a, a], add),
            PicoStatus::DUPLICATE_CONDITION_SOURCE.to_raw()
        );
        assert_eq!(
            mock.set_trigger_channel_conditions(handle, &[a], 0),
            PicoStatus::INVALID_ACTION.to_raw()
        );
        assert_eq!(mock.advanced_trigger().conditions.len(), 2);

        assert_eq!(
            mock.set_trigger_channel_conditions(handle, &[], Action::CLEAR_ALL.bits()),
            0
        );
        assert!(mock.advanced_trigger().conditions.is_empty());
    }

    #[test]
    fn test_directions_reject_unknown_values() {
        use crate::types::ThresholdMode;

        let (mock, handle) = opened();
        let good = PICO_DIRECTION::from(TriggerDirection::new(
            Channel::A,
            ThresholdDirection::Rising,
            ThresholdMode::Level,
        ));
        let bad_mode = PICO_DIRECTION {
            thresholdMode: 7,
            ..good
        };
        let bad_direction = PICO_DIRECTION {
            direction: 500,
            ..good
        };
        assert_eq!(mock.set_trigger_channel_directions(handle, &[good]), 0);
        assert_eq!(
            mock.set_trigger_channel_directions(handle, &[bad_direction]),
            PicoStatus::INVALID_THRESHOLD_DIRECTION.to_raw()
        );
        assert_eq!(
            mock.set_trigger_channel_directions(handle, &[bad_mode]),
            PicoStatus::INVALID_PARAMETER.to_raw()
        );
        assert_eq!(mock.advanced_trigger().directions.len(), 1);
    }

    #[test]
    fn test_delay_and_pre_trigger_arm_exclude_each_other() {
        let (mock, handle) = opened();
        let arm = TriggerWithinPreTrigger::Arm.to_raw();
        assert_eq!(mock.trigger_within_pre_trigger_samples(handle, arm), 0);
        assert_eq!(
            mock.set_trigger_delay(handle, 10),
            PicoStatus::TRIGGER_WITHIN_PRE_NOT_ALLOWED_WITH_DELAY.to_raw()
        );
        assert_eq!(mock.set_trigger_delay(handle, 0), 0);
        assert_eq!(
            mock.trigger_within_pre_trigger_samples(handle, 5),
            PicoStatus::INVALID_TRIGGER_WITHIN_PRE_TRIGGER_STATE.to_raw()
        );
    }

    #[test]
    fn test_query_max_segments_leaves_segmentation_alone() {
        let (mock, handle) = opened();
        let mut segments = 0;
        let bits8 = DeviceResolution::Bits8.to_raw();
        assert_eq!(
            mock.query_max_segments_by_samples(handle, 1_000_000, 4, &mut segments, bits8),
            0
        );
        assert_eq!(segments, 1000);
        assert_eq!(mock.state.lock().n_segments, 1);
        assert_eq!(
            mock.query_max_segments_by_samples(handle, 1000, 0, &mut segments, bits8),
            PicoStatus::INVALID_NUMBER_CHANNELS_FOR_RESOLUTION.to_raw()
        );
    }

    #[test]
    fn test_wrong_handle_rejected() {
        let mock = MockBoundary::default();
        let mut handle = 0;
        assert_eq!(mock.open_unit(&mut handle, None, 0), 0);
        assert_eq!(mock.ping_unit(handle), 0);
        assert_eq!(
            mock.ping_unit(handle + 1),
            PicoStatus::INVALID_HANDLE.to_raw()
        );
    }
}
