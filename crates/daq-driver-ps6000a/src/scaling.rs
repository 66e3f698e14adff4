//! Conversion between raw ADC codes and volts.
//!
//! The unit reports samples as signed codes where the largest value of the
//! resolution's native sample type corresponds to the full-scale voltage of
//! the channel's range:
//!
//! ```text
//! volts = code / type_max(resolution) * full_scale(range)
//! ```
//!
//! 8-bit captures use `i8` (max 127); every other resolution uses `i16`
//! (max 32767). The inverse truncates toward zero.

use crate::buffer::Samples;
use crate::error::{Ps6000aError, Result};
use crate::types::{DeviceResolution, ProbeRange};

/// Largest code of the native sample type at a resolution.
pub fn type_extreme(resolution: DeviceResolution) -> Result<i64> {
    resolution
        .min_type()
        .and_then(|t| t.max_value())
        .ok_or_else(|| {
            Ps6000aError::validation(format!("no sample type known for resolution {}", resolution))
        })
}

/// Code ↔ volts conversion for one range at one resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoltageScale {
    full_scale: f64,
    max_code: f64,
}

impl VoltageScale {
    /// Build the scale for a range and resolution.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the range has no known full-scale
    /// voltage or the resolution is unknown.
    pub fn new(range: ProbeRange, resolution: DeviceResolution) -> Result<Self> {
        let full_scale = range.full_scale().ok_or_else(|| {
            Ps6000aError::validation(format!("no full-scale voltage known for range {}", range))
        })?;
        let max_code = type_extreme(resolution)? as f64;
        Ok(Self {
            full_scale,
            max_code,
        })
    }

    /// Full-scale voltage of the range.
    pub fn full_scale(&self) -> f64 {
        self.full_scale
    }

    /// Convert one code to volts.
    pub fn to_volts(&self, code: f64) -> f64 {
        code / self.max_code * self.full_scale
    }

    /// Convert volts to the nearest code toward zero.
    pub fn to_code(&self, volts: f64) -> i64 {
        if self.full_scale == 0.0 {
            return 0;
        }
        (volts / self.full_scale * self.max_code) as i64
    }

    /// Convert a block of copied-out samples to volts.
    pub fn samples_to_volts(&self, samples: &Samples) -> Vec<f64> {
        samples
            .to_f64()
            .into_iter()
            .map(|code| self.to_volts(code))
            .collect()
    }
}

/// Convert one code to volts.
pub fn adc_to_volts(code: f64, range: ProbeRange, resolution: DeviceResolution) -> Result<f64> {
    Ok(VoltageScale::new(range, resolution)?.to_volts(code))
}

/// Convert volts to a code, truncating toward zero.
pub fn volts_to_adc(volts: f64, range: ProbeRange, resolution: DeviceResolution) -> Result<i64> {
    Ok(VoltageScale::new(range, resolution)?.to_code(volts))
}
