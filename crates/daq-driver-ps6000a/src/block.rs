//! Block-mode capture and completion.
//!
//! A block capture is started with [`Ps6000a::run_block`] and completes in
//! one of two ways:
//!
//! - **Polling**: call [`Ps6000a::is_ready`] until it returns true.
//! - **Notification**: pass a [`ReadyCallback`]. The driver invokes it once,
//!   from its own thread, when the capture completes.
//!
//! In notification mode the driver receives a C-ABI trampoline plus an
//! opaque parameter pointing at a trampoline that owns the callback. The
//! session keeps every trampoline it hands out in a table keyed by the
//! callback's identity, so the pointer stays valid until the driver has
//! called it, and wrapping the same callback again reuses the same live
//! trampoline. The table is emptied when the unit is closed.
//!
//! [`ReadySignal`] is a ready-made callback that can be awaited.

use std::collections::HashMap;
use std::ffi::c_void;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tracing::{debug, error, info, trace};

use ps6000a_sys::PICO_TRIGGER_INFO;

use crate::boundary::DeviceBoundary;
use crate::error::{Ps6000aError, Result};
use crate::session::Ps6000a;
use crate::status::PicoStatus;
use crate::types::{ChannelFlags, RatioMode, TimeUnits};

/// Completion callback: receives the device handle and the capture status.
///
/// Runs on the driver's thread. It must not block for long and must not call
/// back into the session.
pub type ReadyCallback = Arc<dyn Fn(i16, PicoStatus) + Send + Sync>;

// =============================================================================
// Trampolines
// =============================================================================

/// Owns a callback on behalf of the driver.
pub(crate) struct Trampoline {
    callback: ReadyCallback,
}

impl Trampoline {
    fn as_parameter(self: &Arc<Self>) -> *mut c_void {
        Arc::as_ptr(self) as *mut c_void
    }
}

/// C-ABI entry point handed to the driver.
///
/// # Safety
///
/// `parameter` must be null or point to a live [`Trampoline`].
unsafe extern "system" fn block_ready_trampoline(
    handle: i16,
    status: u32,
    parameter: *mut c_void,
) {
    if parameter.is_null() {
        return;
    }
    // SAFETY: the session's trampoline table holds an Arc to this
    // trampoline until the unit is closed, and the driver does not call
    // back after close.
    let trampoline = &*(parameter as *const Trampoline);
    let status = PicoStatus::from_raw(status);
    trace!(handle, %status, "Block ready");

    // Unwinding across the C boundary would abort the process
    let result = panic::catch_unwind(AssertUnwindSafe(|| (trampoline.callback)(handle, status)));
    if result.is_err() {
        error!(handle, "Block-ready callback panicked");
    }
}

/// Identity-keyed table of live trampolines.
#[derive(Default)]
pub(crate) struct TrampolineTable {
    entries: HashMap<usize, Arc<Trampoline>>,
}

impl TrampolineTable {
    fn key(callback: &ReadyCallback) -> usize {
        Arc::as_ptr(callback) as *const () as usize
    }

    /// The live trampoline for `callback`, creating it on first use.
    pub(crate) fn wrap(&mut self, callback: &ReadyCallback) -> Arc<Trampoline> {
        self.entries
            .entry(Self::key(callback))
            .or_insert_with(|| {
                Arc::new(Trampoline {
                    callback: Arc::clone(callback),
                })
            })
            .clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

impl fmt::Debug for TrampolineTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrampolineTable")
            .field("live", &self.entries.len())
            .finish()
    }
}

// =============================================================================
// Awaitable completion
// =============================================================================

struct SignalState {
    notify: Notify,
    status: Mutex<Option<PicoStatus>>,
}

/// A [`ReadyCallback`] that records the completion status and wakes any
/// task waiting on it.
///
/// The same signal can be reused for successive captures; call
/// [`reset`](Self::reset) before each new run.
#[derive(Clone)]
pub struct ReadySignal {
    state: Arc<SignalState>,
    callback: ReadyCallback,
}

impl ReadySignal {
    /// Create an unsignalled signal.
    pub fn new() -> Self {
        let state = Arc::new(SignalState {
            notify: Notify::new(),
            status: Mutex::new(None),
        });
        let shared = Arc::clone(&state);
        let callback: ReadyCallback = Arc::new(move |handle, status| {
            *shared.status.lock() = Some(status);
            shared.notify.notify_one();
            trace!(handle, %status, "Ready signal set");
        });
        Self { state, callback }
    }

    /// The callback to pass to [`Ps6000a::run_block`]. Always the same
    /// `Arc`, so repeated runs reuse one trampoline.
    pub fn callback(&self) -> &ReadyCallback {
        &self.callback
    }

    /// Completion status, if the capture has completed.
    pub fn status(&self) -> Option<PicoStatus> {
        *self.state.status.lock()
    }

    /// True once the callback has fired.
    pub fn is_set(&self) -> bool {
        self.status().is_some()
    }

    /// Forget a previous completion.
    pub fn reset(&self) {
        *self.state.status.lock() = None;
    }

    /// Wait for completion and return its status.
    pub async fn wait(&self) -> PicoStatus {
        loop {
            if let Some(status) = self.status() {
                return status;
            }
            self.state.notify.notified().await;
        }
    }
}

impl Default for ReadySignal {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReadySignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadySignal")
            .field("status", &self.status())
            .finish()
    }
}

// =============================================================================
// Settings and results
// =============================================================================

/// Parameters of a block capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSettings {
    /// Samples before the trigger
    #[serde(default)]
    pub pre_trigger: u64,
    /// Samples after the trigger
    pub post_trigger: u64,
    /// Timebase index
    pub timebase: u32,
    /// Memory segment to capture into
    #[serde(default)]
    pub segment: u64,
}

impl BlockSettings {
    /// Settings for a capture into segment 0.
    pub fn new(pre_trigger: u64, post_trigger: u64, timebase: u32) -> Self {
        Self {
            pre_trigger,
            post_trigger,
            timebase,
            segment: 0,
        }
    }

    /// Capture into another segment.
    pub fn segment(mut self, segment: u64) -> Self {
        self.segment = segment;
        self
    }

    /// Total samples per channel.
    pub fn total_samples(&self) -> u64 {
        self.pre_trigger.saturating_add(self.post_trigger)
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<()> {
        if self.total_samples() == 0 {
            return Err(Ps6000aError::validation(
                "Block capture must include at least one sample",
            ));
        }
        Ok(())
    }
}

/// Outcome of [`Ps6000a::get_values`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValuesRead {
    /// Samples written into each registered buffer
    pub samples: u64,
    /// Channels whose input exceeded the range
    pub overflow: ChannelFlags,
}

/// Trigger timing for one captured segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerInfo {
    /// Per-segment status
    pub status: PicoStatus,
    /// Segment index
    pub segment_index: u64,
    /// Sample index of the trigger within the segment
    pub trigger_index: u64,
    /// Trigger time offset
    pub trigger_time: f64,
    /// Unit of `trigger_time`
    pub time_units: TimeUnits,
    /// Triggers missed since the previous segment
    pub missed_triggers: u64,
    /// Free-running timestamp counter at the trigger
    pub time_stamp_counter: u64,
}

impl From<PICO_TRIGGER_INFO> for TriggerInfo {
    fn from(raw: PICO_TRIGGER_INFO) -> Self {
        Self {
            status: PicoStatus::from_raw(raw.status),
            segment_index: raw.segmentIndex,
            trigger_index: raw.triggerIndex,
            trigger_time: raw.triggerTime,
            time_units: TimeUnits::from_raw(raw.timeUnits),
            missed_triggers: raw.missedTriggers,
            time_stamp_counter: raw.timeStampCounter,
        }
    }
}

// =============================================================================
// Session operations
// =============================================================================

impl<B: DeviceBoundary> Ps6000a<B> {
    /// Start a block capture.
    ///
    /// With `ready = None` completion is polled with
    /// [`is_ready`](Self::is_ready); otherwise `ready` is invoked once from
    /// the driver's thread. Returns the driver's estimate, in milliseconds,
    /// of how long the unit will be busy capturing.
    pub fn run_block(
        &mut self,
        settings: &BlockSettings,
        ready: Option<&ReadyCallback>,
    ) -> Result<f64> {
        settings.validate()?;

        let trampoline = ready.map(|callback| self.trampolines.wrap(callback));
        let (ready_fn, parameter): (ps6000a_sys::ps6000aBlockReady, *mut c_void) =
            match &trampoline {
                Some(t) => (
                    Some(block_ready_trampoline as unsafe extern "system" fn(i16, u32, *mut c_void)),
                    t.as_parameter(),
                ),
                None => (None, std::ptr::null_mut()),
            };

        let mut time_indisposed_ms = 0.0;
        // SAFETY: the trampoline table keeps `parameter` alive until close.
        self.call(|b, h| unsafe {
            b.run_block(
                h,
                settings.pre_trigger,
                settings.post_trigger,
                settings.timebase,
                &mut time_indisposed_ms,
                settings.segment,
                ready_fn,
                parameter,
            )
        })?;

        info!(
            pre = settings.pre_trigger,
            post = settings.post_trigger,
            timebase = settings.timebase,
            segment = settings.segment,
            notify = ready.is_some(),
            time_indisposed_ms,
            "Block capture started"
        );
        self.log_registry_summary();
        Ok(time_indisposed_ms)
    }

    /// True once the running block capture has completed.
    pub fn is_ready(&mut self) -> Result<bool> {
        let mut ready: i16 = 0;
        self.call(|b, h| b.is_ready(h, &mut ready))?;
        Ok(ready != 0)
    }

    /// Transfer captured samples into the registered buffers of `segment`.
    pub fn get_values(
        &mut self,
        start: u64,
        n_samples: u64,
        downsample_ratio: u64,
        mode: RatioMode,
        segment: u64,
    ) -> Result<ValuesRead> {
        let mut samples = n_samples;
        let mut overflow: i16 = 0;
        self.call(|b, h| {
            b.get_values(
                h,
                start,
                &mut samples,
                downsample_ratio,
                mode.bits(),
                segment,
                &mut overflow,
            )
        })?;

        let overflow = ChannelFlags::from_overflow(overflow);
        debug!(start, requested = n_samples, samples, ?overflow, segment, "Values retrieved");
        Ok(ValuesRead { samples, overflow })
    }

    /// Stop the running capture (block or streaming).
    pub fn stop(&mut self) -> Result<()> {
        self.call(|b, h| b.stop(h))?;
        debug!("Capture stopped");
        Ok(())
    }

    /// Trigger timing for `count` segments starting at `first_segment`.
    pub fn get_trigger_info(&mut self, first_segment: u64, count: usize) -> Result<Vec<TriggerInfo>> {
        let mut infos = vec![PICO_TRIGGER_INFO::default(); count];
        self.call(|b, h| b.get_trigger_info(h, &mut infos, first_segment))?;
        Ok(infos.into_iter().map(TriggerInfo::from).collect())
    }

    /// Number of live block-ready trampolines held by the session.
    pub fn live_trampolines(&self) -> usize {
        self.trampolines.len()
    }
}
