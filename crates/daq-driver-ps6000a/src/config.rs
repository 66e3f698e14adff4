//! Declarative acquisition setup.
//!
//! An [`AcquisitionConfig`] describes everything needed to prepare a unit
//! for a capture: resolution, channel front-ends, an optional simple
//! trigger, the buffers to register, and block or streaming settings.
//!
//! # Example Configuration
//!
//! ```toml
//! serial = "JO247/0118"
//! resolution = "DR_12BIT"
//!
//! [[channel]]
//! channel = "A"
//! range = "X1_PROBE_1V"
//! coupling = "DC"
//!
//! [trigger]
//! source = "A"
//! threshold_volts = 0.25
//! direction = "RISING"
//! auto_trigger_us = 1000
//!
//! [[buffer]]
//! channel = "A"
//! len = 10000
//!
//! [block]
//! pre_trigger = 1000
//! post_trigger = 9000
//! timebase = 5
//! ```
//!
//! Enum values accept vendor names in any case or raw integers.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::block::BlockSettings;
use crate::boundary::DeviceBoundary;
use crate::buffer::BufferClass;
use crate::error::{Ps6000aError, Result};
use crate::registry::BufferPair;
use crate::session::Ps6000a;
use crate::streaming::StreamingSettings;
use crate::types::{
    BandwidthLimiter, Channel, Coupling, DataType, DeviceResolution, ProbeRange, RatioMode,
    ThresholdDirection,
};

// =============================================================================
// Configuration Types
// =============================================================================

/// Complete acquisition setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// Serial number to open (first unit found when absent)
    #[serde(default)]
    pub serial: Option<String>,

    /// Vertical resolution
    #[serde(default)]
    pub resolution: DeviceResolution,

    /// Number of memory segments to divide capture memory into
    #[serde(default)]
    pub segments: Option<u64>,

    /// Channel front-end settings
    #[serde(default, rename = "channel")]
    pub channels: Vec<ChannelConfig>,

    /// Simple trigger
    #[serde(default)]
    pub trigger: Option<TriggerConfig>,

    /// Buffers to allocate and register
    #[serde(default, rename = "buffer")]
    pub buffers: Vec<BufferConfig>,

    /// Block capture settings
    #[serde(default)]
    pub block: Option<BlockSettings>,

    /// Streaming settings
    #[serde(default)]
    pub streaming: Option<StreamingSettings>,
}

/// Front-end settings for one analog channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Analog channel
    pub channel: Channel,

    /// Switch the channel on (default) or off
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Input coupling (default: DC)
    #[serde(default = "default_coupling")]
    pub coupling: Coupling,

    /// Input range
    pub range: ProbeRange,

    /// Analogue offset in volts
    #[serde(default)]
    pub offset: f64,

    /// Bandwidth limiter (default: full)
    #[serde(default = "default_bandwidth")]
    pub bandwidth: BandwidthLimiter,
}

/// Simple trigger with the threshold in volts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Source channel; must be a configured, enabled channel
    pub source: Channel,

    /// Threshold in volts on the source's range
    pub threshold_volts: f64,

    /// Direction (default: rising)
    #[serde(default = "default_direction")]
    pub direction: ThresholdDirection,

    /// Delay in sample periods
    #[serde(default)]
    pub delay: u64,

    /// Auto-trigger timeout in microseconds (0 waits forever)
    #[serde(default)]
    pub auto_trigger_us: u32,
}

/// One buffer (or MAX/MIN pair) to register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferConfig {
    /// Channel
    pub channel: Channel,

    /// Element type (default: the resolution's native type)
    #[serde(default)]
    pub data_type: Option<DataType>,

    /// Memory segment
    #[serde(default)]
    pub segment: u64,

    /// Downsampling mode (default: raw)
    #[serde(default = "default_mode")]
    pub mode: RatioMode,

    /// Elements per buffer
    pub len: usize,

    /// Also allocate a MIN buffer
    #[serde(default)]
    pub with_min: bool,
}

fn default_enabled() -> bool {
    true
}

fn default_coupling() -> Coupling {
    Coupling::Dc
}

fn default_bandwidth() -> BandwidthLimiter {
    BandwidthLimiter::Full
}

fn default_direction() -> ThresholdDirection {
    ThresholdDirection::Rising
}

fn default_mode() -> RatioMode {
    RatioMode::RAW
}

// =============================================================================
// Loading and validation
// =============================================================================

impl AcquisitionConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| Ps6000aError::config(format!("Invalid acquisition config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Ps6000aError::config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&text)?;
        debug!(path = %path.display(), channels = config.channels.len(), "Loaded acquisition config");
        Ok(config)
    }

    /// Serialize back to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self)
            .map_err(|e| Ps6000aError::config(format!("Cannot serialize config: {}", e)))
    }

    /// Element type used for buffers that do not name one.
    pub fn default_data_type(&self) -> Result<DataType> {
        self.resolution.min_type().ok_or_else(|| {
            Ps6000aError::config(format!("Unknown resolution {}", self.resolution))
        })
    }

    /// Settings of a configured, enabled channel.
    pub fn enabled_channel(&self, channel: Channel) -> Option<&ChannelConfig> {
        self.channels
            .iter()
            .find(|c| c.channel == channel && c.enabled)
    }

    /// Check internal consistency without touching a device.
    pub fn validate(&self) -> Result<()> {
        let default_type = self.default_data_type()?;

        if self.segments == Some(0) {
            return Err(Ps6000aError::config("'segments' must be at least 1"));
        }

        let mut seen = HashSet::new();
        for ch in &self.channels {
            if !ch.channel.is_analog() {
                return Err(Ps6000aError::config(format!(
                    "{} is not an analog channel",
                    ch.channel
                )));
            }
            if !seen.insert(ch.channel) {
                return Err(Ps6000aError::config(format!(
                    "Channel {} configured twice",
                    ch.channel
                )));
            }
            if ch.range.full_scale().is_none() {
                return Err(Ps6000aError::config(format!(
                    "Unknown range {} on channel {}",
                    ch.range, ch.channel
                )));
            }
            if ch.coupling.name().is_none() || ch.bandwidth.name().is_none() {
                return Err(Ps6000aError::config(format!(
                    "Unknown coupling or bandwidth on channel {}",
                    ch.channel
                )));
            }
            if !ch.offset.is_finite() {
                return Err(Ps6000aError::config(format!(
                    "Invalid offset on channel {}",
                    ch.channel
                )));
            }
        }

        if let Some(trigger) = &self.trigger {
            if self.enabled_channel(trigger.source).is_none() {
                return Err(Ps6000aError::config(format!(
                    "Trigger source {} is not an enabled channel",
                    trigger.source
                )));
            }
            if trigger.direction.name().is_none() {
                return Err(Ps6000aError::config(format!(
                    "Unknown trigger direction {}",
                    trigger.direction
                )));
            }
        }

        for buffer in &self.buffers {
            if buffer.len == 0 {
                return Err(Ps6000aError::config(format!(
                    "Buffer for channel {} has zero length",
                    buffer.channel
                )));
            }
            let data_type = buffer.data_type.unwrap_or(default_type);
            if data_type.size_of().is_none() {
                return Err(Ps6000aError::config(format!(
                    "Unknown data type {} for channel {}",
                    data_type, buffer.channel
                )));
            }
            if buffer.mode.is_empty() {
                return Err(Ps6000aError::config(format!(
                    "Buffer for channel {} has no downsampling mode",
                    buffer.channel
                )));
            }
            if let Some(segments) = self.segments {
                if buffer.segment >= segments {
                    return Err(Ps6000aError::config(format!(
                        "Buffer segment {} exceeds configured segment count {}",
                        buffer.segment, segments
                    )));
                }
            }
            if self.enabled_channel(buffer.channel).is_none() {
                warn!(channel = %buffer.channel, "Buffer registered for a channel that is not enabled");
            }
        }

        if let Some(block) = &self.block {
            block
                .validate()
                .map_err(|e| Ps6000aError::config(format!("[block] {}", e)))?;
        }
        if let Some(streaming) = &self.streaming {
            streaming
                .validate()
                .map_err(|e| Ps6000aError::config(format!("[streaming] {}", e)))?;
        }
        Ok(())
    }

    // =========================================================================
    // Applying to a session
    // =========================================================================

    /// Open the configured unit at the configured resolution.
    pub fn open<B: DeviceBoundary>(&self, scope: &mut Ps6000a<B>) -> Result<()> {
        scope.open_unit(self.serial.as_deref(), self.resolution)
    }

    /// Push resolution, segments, channels and trigger to an open unit, then
    /// register the configured buffers.
    ///
    /// Returns the registered buffers in configuration order.
    pub fn apply<B: DeviceBoundary>(&self, scope: &mut Ps6000a<B>) -> Result<Vec<BufferPair>> {
        self.validate()?;

        if scope.resolution() != self.resolution {
            scope.set_device_resolution(self.resolution)?;
        }
        if let Some(segments) = self.segments {
            scope.memory_segments(segments)?;
        }

        for ch in &self.channels {
            if ch.enabled {
                scope.set_channel_on(ch.channel, ch.coupling, ch.range, ch.offset, ch.bandwidth)?;
            } else {
                scope.set_channel_off(ch.channel)?;
            }
        }

        if let Some(trigger) = &self.trigger {
            let range = self
                .enabled_channel(trigger.source)
                .map(|c| c.range)
                .ok_or_else(|| {
                    Ps6000aError::config(format!(
                        "Trigger source {} is not an enabled channel",
                        trigger.source
                    ))
                })?;
            scope.set_simple_trigger_volts(
                trigger.source,
                range,
                trigger.threshold_volts,
                trigger.direction,
                trigger.delay,
                trigger.auto_trigger_us,
            )?;
        }

        let pairs = self.register_buffers(scope)?;
        info!(
            channels = self.channels.iter().filter(|c| c.enabled).count(),
            trigger = self.trigger.is_some(),
            buffers = pairs.len(),
            resolution = %self.resolution,
            "Applied acquisition config"
        );
        Ok(pairs)
    }

    /// Allocate and register the configured buffers.
    ///
    /// The first buffer of each class replaces whatever that class held, so
    /// applying the same config twice leaves one set of buffers.
    pub fn register_buffers<B: DeviceBoundary>(
        &self,
        scope: &mut Ps6000a<B>,
    ) -> Result<Vec<BufferPair>> {
        let default_type = self.default_data_type()?;
        let mut cleared = HashSet::new();
        let mut pairs = Vec::with_capacity(self.buffers.len());

        for buffer in &self.buffers {
            let data_type = buffer.data_type.unwrap_or(default_type);
            let class = BufferClass::new(buffer.channel, data_type, buffer.segment);
            let clear_others = cleared.insert(class);

            let pair = if buffer.with_min {
                let (max, min) = scope.get_data_buffers(
                    buffer.channel,
                    data_type,
                    buffer.segment,
                    buffer.mode,
                    buffer.len,
                    clear_others,
                )?;
                BufferPair {
                    mode: buffer.mode,
                    max,
                    min: Some(min),
                }
            } else {
                let max = scope.get_data_buffer(
                    buffer.channel,
                    data_type,
                    buffer.segment,
                    buffer.mode,
                    buffer.len,
                    clear_others,
                )?;
                BufferPair {
                    mode: buffer.mode,
                    max,
                    min: None,
                }
            };
            pairs.push(pair);
        }
        Ok(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [[channel]]
        channel = "a"
        range = "X1_PROBE_1V"
    "#;

    #[test]
    fn test_defaults() {
        let config = AcquisitionConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.resolution, DeviceResolution::Bits8);
        assert_eq!(config.serial, None);
        let ch = &config.channels[0];
        assert_eq!(ch.channel, Channel::A);
        assert!(ch.enabled);
        assert_eq!(ch.coupling, Coupling::Dc);
        assert_eq!(ch.bandwidth, BandwidthLimiter::Full);
        assert!(config.trigger.is_none());
    }

    #[test]
    fn test_buffer_defaults_follow_resolution() {
        let config = AcquisitionConfig::from_toml_str(
            r#"
            resolution = "dr_12bit"
            [[channel]]
            channel = "B"
            range = 7
            [[buffer]]
            channel = "B"
            len = 500
            "#,
        )
        .unwrap();
        let buffer = &config.buffers[0];
        assert_eq!(buffer.mode, RatioMode::RAW);
        assert_eq!(buffer.data_type, None);
        assert_eq!(config.default_data_type().unwrap(), DataType::Int16);
        assert_eq!(config.channels[0].range, ProbeRange::X1Probe2V);
    }

    #[test]
    fn test_rejections() {
        let cases = [
            // trigger on a channel that is not configured
            r#"
            [[channel]]
            channel = "A"
            range = "X1_PROBE_1V"
            [trigger]
            source = "B"
            threshold_volts = 0.1
            "#,
            // duplicate channel
            r#"
            [[channel]]
            channel = "A"
            range = "X1_PROBE_1V"
            [[channel]]
            channel = "A"
            range = "X1_PROBE_2V"
            "#,
            // digital port as an analog channel
            r#"
            [[channel]]
            channel = "PORT0"
            range = "X1_PROBE_1V"
            "#,
            // zero-length buffer
            r#"
            [[buffer]]
            channel = "A"
            len = 0
            "#,
            // empty block
            r#"
            [block]
            post_trigger = 0
            timebase = 3
            "#,
        ];
        for text in cases {
            let err = AcquisitionConfig::from_toml_str(text).unwrap_err();
            assert!(matches!(err, Ps6000aError::Config { .. }), "{text}: {err}");
        }
    }

    #[test]
    fn test_syntax_error_is_config_error() {
        let err = AcquisitionConfig::from_toml_str("resolution = ").unwrap_err();
        assert!(matches!(err, Ps6000aError::Config { .. }));
    }

    #[test]
    fn test_round_trip_preserves_settings() {
        let config = AcquisitionConfig::from_toml_str(
            r#"
            serial = "JO247/0118"
            [[channel]]
            channel = "C"
            range = "X1_PROBE_500MV"
            offset = 0.1
            [streaming]
            sample_interval = 1.0
            time_units = "US"
            post_trigger = 20000
            auto_stop = true
            "#,
        )
        .unwrap();
        let text = config.to_toml_string().unwrap();
        assert_eq!(AcquisitionConfig::from_toml_str(&text).unwrap(), config);
    }
}
