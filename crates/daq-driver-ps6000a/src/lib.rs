//! Safe Rust driver for PicoScope 6000E oscilloscopes.
//!
//! This crate wraps the `ps6000a` driver API from `ps6000a-sys` with typed
//! constants, error translation, and ownership of the sample buffers the
//! device writes into.
//!
//! # Architecture
//!
//! Everything hangs off one session object, [`Ps6000a`], generic over the
//! [`DeviceBoundary`] that performs the actual driver calls:
//! - [`SdkBoundary`] calls the vendor library (feature `picosdk`)
//! - [`MockBoundary`] simulates a unit in memory (feature `mock`, default)
//!
//! ## Session
//! - Handle guard: `open_unit`, `close_unit`, `ping_unit`, `get_unit_info`
//! - Status translation: every call records [`Ps6000a::last_status`] and maps
//!   non-OK codes to [`Ps6000aError::Status`]
//!
//! ## Buffers
//! - [`Buffer`] - Shared, fixed-length sample storage the device writes into
//! - [`BufferRegistry`] - Class → registered buffers, pairing and validation
//!
//! ## Acquisition
//! - Streaming: [`StreamingSettings`], [`StreamingPoll`], [`StreamingWindow`]
//! - Block: [`BlockSettings`], [`ReadySignal`], [`TriggerInfo`]
//! - Triggering: [`SimpleTrigger`], or [`TriggerChannelProperties`],
//!   [`TriggerCondition`] and [`TriggerDirection`] combined on the unit
//!
//! ## Scaling
//! - [`VoltageScale`], [`adc_to_volts`], [`volts_to_adc`]
//!
//! ## Configuration
//! - [`AcquisitionConfig`] - TOML acquisition setup applied onto a session
//!
//! # Example
//!
//! ```no_run
//! use daq_driver_ps6000a::{
//!     BandwidthLimiter, BlockSettings, Channel, Coupling, DataType, DeviceResolution, ProbeRange,
//!     Ps6000a, RatioMode, VoltageScale,
//! };
//!
//! # fn example() -> anyhow::Result<()> {
//! let mut scope = Ps6000a::mock();
//! scope.open_unit(None, DeviceResolution::Bits8)?;
//! scope.set_channel_on(Channel::A, Coupling::Dc, ProbeRange::X1Probe1V, 0.0, BandwidthLimiter::Full)?;
//!
//! let buffer = scope.get_data_buffer(Channel::A, DataType::Int8, 0, RatioMode::RAW, 1000, true)?;
//! scope.run_block(&BlockSettings::new(100, 900, 5), None)?;
//! while !scope.is_ready()? {
//!     std::thread::sleep(std::time::Duration::from_millis(1));
//! }
//! let read = scope.get_values(0, 1000, 1, RatioMode::RAW, 0)?;
//!
//! let scale = VoltageScale::new(ProbeRange::X1Probe1V, scope.resolution())?;
//! let volts = scale.samples_to_volts(&buffer.read_range(0, read.samples as usize)?);
//! println!("{} samples, first {:.3} V", volts.len(), volts[0]);
//! scope.close_unit()?;
//! # Ok(())
//! # }
//! ```

pub mod block;
pub mod boundary;
pub mod buffer;
pub mod config;
pub mod error;
pub mod handle;
#[cfg(feature = "mock")]
pub mod mock;
pub mod registry;
pub mod scaling;
#[cfg(feature = "picosdk")]
pub mod sdk;
pub mod session;
pub mod status;
pub mod streaming;
pub mod trigger;
pub mod types;

pub use block::{BlockSettings, ReadyCallback, ReadySignal, TriggerInfo, ValuesRead};
pub use boundary::DeviceBoundary;
pub use buffer::{Buffer, BufferClass, Samples};
pub use config::{AcquisitionConfig, BufferConfig, ChannelConfig, TriggerConfig};
pub use error::{HandleError, Ps6000aError, Result, StatusError};
pub use handle::{HandleGuard, OpenProgress};
pub use registry::{BufferPair, BufferRegistry, PairSet};
pub use scaling::{adc_to_volts, type_extreme, volts_to_adc, VoltageScale};
pub use session::{
    OffsetLimits, Ps6000a, ScalingFactors, SimpleTrigger, TimebaseChoice, TimebaseInfo,
};
pub use status::PicoStatus;
pub use streaming::{
    StreamingPoll, StreamingRequest, StreamingSettings, StreamingTriggerInfo, StreamingWindow,
};
pub use trigger::{TriggerChannelProperties, TriggerCondition, TriggerDirection};
pub use types::{
    Action, BandwidthLimiter, BufferRole, Channel, ChannelFlags, Coupling, DataType,
    DeviceResolution, DigitalPortHysteresis, Info, ProbeRange, RatioMode, ThresholdDirection,
    ThresholdMode, TimeUnits, TriggerState, TriggerWithinPreTrigger,
};

#[cfg(feature = "mock")]
pub use mock::{MockBoundary, MockConfig};
#[cfg(feature = "picosdk")]
pub use sdk::SdkBoundary;
