//! Advanced triggering.
//!
//! Beyond [`set_simple_trigger`](Ps6000a::set_simple_trigger) the unit builds
//! a trigger out of three tables:
//!
//! - thresholds per source ([`TriggerChannelProperties`]);
//! - the edge or window each source must cross ([`TriggerDirection`]);
//! - a sum of products over the sources ([`TriggerCondition`]).
//!
//! The conditions passed in one call are ANDed. A call made with
//! [`Action::ADD`] ORs its product with the ones the unit already holds,
//! [`Action::CLEAR_ALL`] drops them first. An empty property or condition
//! table switches triggering off.
//!
//! ```no_run
//! use daq_driver_ps6000a::{
//!     Action, Channel, Ps6000a, ThresholdDirection, ThresholdMode, TriggerChannelProperties,
//!     TriggerCondition, TriggerDirection, TriggerState,
//! };
//!
//! # fn example(scope: &mut Ps6000a<daq_driver_ps6000a::MockBoundary>) -> anyhow::Result<()> {
//! // A rising AND B above its level
//! scope.set_trigger_channel_properties(
//!     &[
//!         TriggerChannelProperties::level(Channel::A, 40, 4),
//!         TriggerChannelProperties::level(Channel::B, -20, 4),
//!     ],
//!     false,
//!     0,
//! )?;
//! scope.set_trigger_channel_conditions(
//!     &[
//!         TriggerCondition::new(Channel::A, TriggerState::True),
//!         TriggerCondition::new(Channel::B, TriggerState::True),
//!     ],
//!     Action::CLEAR_ALL | Action::ADD,
//! )?;
//! scope.set_trigger_channel_directions(&[
//!     TriggerDirection::new(Channel::A, ThresholdDirection::Rising, ThresholdMode::Level),
//!     TriggerDirection::new(Channel::B, ThresholdDirection::Above, ThresholdMode::Level),
//! ])?;
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use ps6000a_sys::{PICO_CONDITION, PICO_DIRECTION, PICO_TRIGGER_CHANNEL_PROPERTIES};

use crate::boundary::DeviceBoundary;
use crate::error::{Ps6000aError, Result};
use crate::session::Ps6000a;
use crate::types::{
    Action, Channel, ThresholdDirection, ThresholdMode, TriggerState, TriggerWithinPreTrigger,
};

/// Thresholds of one trigger source, as raw ADC codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerChannelProperties {
    /// Source
    pub channel: Channel,
    /// Upper threshold
    pub upper_threshold: i16,
    /// Hysteresis below the upper threshold
    pub upper_hysteresis: u16,
    /// Lower threshold, used by window and lower-level directions
    pub lower_threshold: i16,
    /// Hysteresis above the lower threshold
    pub lower_hysteresis: u16,
}

impl TriggerChannelProperties {
    /// Single level with the same threshold on both sides.
    pub fn level(channel: Channel, threshold: i16, hysteresis: u16) -> Self {
        Self {
            channel,
            upper_threshold: threshold,
            upper_hysteresis: hysteresis,
            lower_threshold: threshold,
            lower_hysteresis: hysteresis,
        }
    }

    /// Window between `lower` and `upper`.
    pub fn window(channel: Channel, lower: i16, upper: i16, hysteresis: u16) -> Self {
        Self {
            channel,
            upper_threshold: upper,
            upper_hysteresis: hysteresis,
            lower_threshold: lower,
            lower_hysteresis: hysteresis,
        }
    }
}

impl From<TriggerChannelProperties> for PICO_TRIGGER_CHANNEL_PROPERTIES {
    fn from(p: TriggerChannelProperties) -> Self {
        Self {
            thresholdUpper: p.upper_threshold,
            thresholdUpperHysteresis: p.upper_hysteresis,
            thresholdLower: p.lower_threshold,
            thresholdLowerHysteresis: p.lower_hysteresis,
            channel: p.channel.to_raw(),
        }
    }
}

impl From<PICO_TRIGGER_CHANNEL_PROPERTIES> for TriggerChannelProperties {
    fn from(raw: PICO_TRIGGER_CHANNEL_PROPERTIES) -> Self {
        Self {
            channel: Channel::from_raw(raw.channel),
            upper_threshold: raw.thresholdUpper,
            upper_hysteresis: raw.thresholdUpperHysteresis,
            lower_threshold: raw.thresholdLower,
            lower_hysteresis: raw.thresholdLowerHysteresis,
        }
    }
}

/// One term of a trigger condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerCondition {
    /// Source
    pub source: Channel,
    /// Required state
    pub state: TriggerState,
}

impl TriggerCondition {
    /// Term requiring `source` to be in `state`.
    pub fn new(source: Channel, state: TriggerState) -> Self {
        Self { source, state }
    }
}

impl From<TriggerCondition> for PICO_CONDITION {
    fn from(c: TriggerCondition) -> Self {
        Self {
            source: c.source.to_raw(),
            condition: c.state.to_raw(),
        }
    }
}

impl From<PICO_CONDITION> for TriggerCondition {
    fn from(raw: PICO_CONDITION) -> Self {
        Self {
            source: Channel::from_raw(raw.source),
            state: TriggerState::from_raw(raw.condition),
        }
    }
}

/// Edge or level a source must cross.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerDirection {
    /// Source
    pub channel: Channel,
    /// Direction
    pub direction: ThresholdDirection,
    /// Level or window comparison
    pub mode: ThresholdMode,
}

impl TriggerDirection {
    /// Direction for one source.
    pub fn new(channel: Channel, direction: ThresholdDirection, mode: ThresholdMode) -> Self {
        Self {
            channel,
            direction,
            mode,
        }
    }
}

impl From<TriggerDirection> for PICO_DIRECTION {
    fn from(d: TriggerDirection) -> Self {
        Self {
            channel: d.channel.to_raw(),
            direction: d.direction.to_raw(),
            thresholdMode: d.mode.to_raw(),
        }
    }
}

impl From<PICO_DIRECTION> for TriggerDirection {
    fn from(raw: PICO_DIRECTION) -> Self {
        Self {
            channel: Channel::from_raw(raw.channel),
            direction: ThresholdDirection::from_raw(raw.direction),
            mode: ThresholdMode::from_raw(raw.thresholdMode),
        }
    }
}

/// Element count of a table handed to the device.
pub(crate) fn table_len(what: &str, len: usize) -> Result<i16> {
    i16::try_from(len).map_err(|_| {
        Ps6000aError::validation(format!(
            "{} entries given for {}, at most {} allowed",
            len,
            what,
            i16::MAX
        ))
    })
}

impl<B: DeviceBoundary> Ps6000a<B> {
    /// Set the thresholds of one or more trigger sources. An empty slice
    /// switches triggering off.
    pub fn set_trigger_channel_properties(
        &mut self,
        properties: &[TriggerChannelProperties],
        aux_output_enable: bool,
        auto_trigger_us: u32,
    ) -> Result<()> {
        table_len("trigger channel properties", properties.len())?;
        let raw: Vec<PICO_TRIGGER_CHANNEL_PROPERTIES> =
            properties.iter().copied().map(Into::into).collect();
        self.call(|b, h| {
            b.set_trigger_channel_properties(h, &raw, i16::from(aux_output_enable), auto_trigger_us)
        })?;
        debug!(count = properties.len(), auto_trigger_us, "Trigger channel properties set");
        Ok(())
    }

    /// Add (or with [`Action::CLEAR_ALL`], replace) one ANDed trigger
    /// condition.
    pub fn set_trigger_channel_conditions(
        &mut self,
        conditions: &[TriggerCondition],
        action: Action,
    ) -> Result<()> {
        table_len("trigger conditions", conditions.len())?;
        let raw: Vec<PICO_CONDITION> = conditions.iter().copied().map(Into::into).collect();
        self.call(|b, h| b.set_trigger_channel_conditions(h, &raw, action.bits()))?;
        debug!(count = conditions.len(), ?action, "Trigger conditions set");
        Ok(())
    }

    /// Set the direction of one or more trigger sources.
    pub fn set_trigger_channel_directions(&mut self, directions: &[TriggerDirection]) -> Result<()> {
        table_len("trigger directions", directions.len())?;
        let raw: Vec<PICO_DIRECTION> = directions.iter().copied().map(Into::into).collect();
        self.call(|b, h| b.set_trigger_channel_directions(h, &raw))?;
        debug!(count = directions.len(), "Trigger directions set");
        Ok(())
    }

    /// Delay, in sample periods, between the trigger event and the start of
    /// the post-trigger data.
    pub fn set_trigger_delay(&mut self, delay: u64) -> Result<()> {
        self.call(|b, h| b.set_trigger_delay(h, delay))?;
        debug!(delay, "Trigger delay set");
        Ok(())
    }

    /// Allow (or forbid) a trigger event within the pre-trigger samples.
    pub fn trigger_within_pre_trigger_samples(
        &mut self,
        state: TriggerWithinPreTrigger,
    ) -> Result<()> {
        self.call(|b, h| b.trigger_within_pre_trigger_samples(h, state.to_raw()))?;
        debug!(%state, "Trigger within pre-trigger samples");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_properties_convert_both_ways() {
        let props = TriggerChannelProperties::window(Channel::C, -100, 250, 8);
        let raw = PICO_TRIGGER_CHANNEL_PROPERTIES::from(props);
        assert_eq!({ raw.channel }, 2);
        assert_eq!({ raw.thresholdLower }, -100);
        assert_eq!({ raw.thresholdUpper }, 250);
        assert_eq!(TriggerChannelProperties::from(raw), props);
    }

    #[test]
    fn test_unknown_raw_values_survive() {
        let raw = PICO_DIRECTION {
            channel: 0,
            direction: 77,
            thresholdMode: 9,
        };
        let dir = TriggerDirection::from(raw);
        assert_eq!(dir.direction, ThresholdDirection::Unknown(77));
        assert_eq!(dir.mode, ThresholdMode::Unknown(9));
        assert_eq!({ PICO_DIRECTION::from(dir).thresholdMode }, 9);
    }

    #[test]
    fn test_table_len_limit() {
        assert_eq!(table_len("x", 3).unwrap(), 3);
        assert!(table_len("x", 40_000).unwrap_err().is_validation());
    }
}
