//! Constant tables for the ps6000a driver.
//!
//! Each vendor value set is a closed Rust enum with an explicit
//! `Unknown(raw)` variant, so a value the table does not list is carried
//! through verbatim instead of being rejected or invented at runtime.
//! Flag sets (ratio modes, actions, channel masks) are `bitflags` types.
//!
//! Enums parse from their vendor names case-insensitively (`"a"`,
//! `"X1_PROBE_1V"`, `"dc_50ohm"`) or from a raw integer, which is what the
//! configuration loader relies on.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Ps6000aError;

macro_rules! pico_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $repr:ty {
            $( $(#[$vmeta:meta])* $variant:ident = $value:literal => $text:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[allow(missing_docs)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant, )+
            /// A value outside the known table, preserved verbatim.
            Unknown($repr),
        }

        impl $name {
            /// Every known (non-`Unknown`) value.
            pub const KNOWN: &'static [$name] = &[$($name::$variant),+];

            /// Convert from the raw vendor value.
            pub fn from_raw(raw: $repr) -> Self {
                match raw {
                    $( $value => Self::$variant, )+
                    other => Self::Unknown(other),
                }
            }

            /// The raw vendor value.
            pub fn to_raw(self) -> $repr {
                match self {
                    $( Self::$variant => $value, )+
                    Self::Unknown(raw) => raw,
                }
            }

            /// Vendor name of a known value.
            pub fn name(self) -> Option<&'static str> {
                match self {
                    $( Self::$variant => Some($text), )+
                    Self::Unknown(_) => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self.name() {
                    Some(name) => f.write_str(name),
                    None => write!(f, "{}({})", stringify!($name), self.to_raw()),
                }
            }
        }

        impl FromStr for $name {
            type Err = Ps6000aError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let upper = s.trim().to_ascii_uppercase();
                match upper.as_str() {
                    $( $text => Ok(Self::$variant), )+
                    other => other.parse::<$repr>().map(Self::from_raw).map_err(|_| {
                        Ps6000aError::validation(format!(
                            "unknown {} '{}'",
                            stringify!($name),
                            s
                        ))
                    }),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                match self.name() {
                    Some(name) => serializer.serialize_str(name),
                    None => self.to_raw().serialize(serializer),
                }
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                struct EnumVisitor;

                impl<'de> Visitor<'de> for EnumVisitor {
                    type Value = $name;

                    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                        write!(f, "a {} name or raw value", stringify!($name))
                    }

                    fn visit_str<E: de::Error>(self, v: &str) -> Result<$name, E> {
                        v.parse().map_err(E::custom)
                    }

                    fn visit_i64<E: de::Error>(self, v: i64) -> Result<$name, E> {
                        <$repr>::try_from(v)
                            .map($name::from_raw)
                            .map_err(|_| E::custom(format!("{} out of range", v)))
                    }

                    fn visit_u64<E: de::Error>(self, v: u64) -> Result<$name, E> {
                        <$repr>::try_from(v)
                            .map($name::from_raw)
                            .map_err(|_| E::custom(format!("{} out of range", v)))
                    }
                }

                deserializer.deserialize_any(EnumVisitor)
            }
        }
    };
}

// =============================================================================
// Channels
// =============================================================================

pico_enum! {
    /// Analog channel, digital port or trigger source.
    pub enum Channel: u32 {
        A = 0 => "A",
        B = 1 => "B",
        C = 2 => "C",
        D = 3 => "D",
        E = 4 => "E",
        F = 5 => "F",
        G = 6 => "G",
        H = 7 => "H",
        Port0 = 0x80 => "PORT0",
        Port1 = 0x81 => "PORT1",
        Port2 = 0x82 => "PORT2",
        Port3 = 0x83 => "PORT3",
        External = 1000 => "EXTERNAL",
        TriggerAux = 1001 => "TRIGGER_AUX",
    }
}

impl Channel {
    /// True for the analog inputs A to H.
    pub fn is_analog(self) -> bool {
        matches!(self.to_raw(), 0..=7)
    }

    /// The bit this channel occupies in a [`ChannelFlags`] mask.
    pub fn flag(self) -> Option<ChannelFlags> {
        match self.to_raw() {
            raw @ 0..=7 => Some(ChannelFlags::from_bits_retain(1 << raw)),
            raw @ 0x80..=0x83 => Some(ChannelFlags::from_bits_retain(0x10000 << (raw - 0x80))),
            _ => None,
        }
    }
}

bitflags! {
    /// Mask of channels and ports, as used by the stateless timebase queries
    /// and the per-channel overflow report.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ChannelFlags: u32 {
        const A = 0x0000_0001;
        const B = 0x0000_0002;
        const C = 0x0000_0004;
        const D = 0x0000_0008;
        const E = 0x0000_0010;
        const F = 0x0000_0020;
        const G = 0x0000_0040;
        const H = 0x0000_0080;
        const PORT0 = 0x0001_0000;
        const PORT1 = 0x0002_0000;
        const PORT2 = 0x0004_0000;
        const PORT3 = 0x0008_0000;
    }
}

impl ChannelFlags {
    /// Overflow flags as reported by the driver in a signed 16-bit word.
    pub fn from_overflow(raw: i16) -> Self {
        Self::from_bits_retain(u32::from(raw as u16))
    }
}

// =============================================================================
// Sample data types
// =============================================================================

pico_enum! {
    /// Element type of a data buffer.
    pub enum DataType: u32 {
        Int8 = 0 => "INT8",
        Int16 = 1 => "INT16",
        Int32 = 2 => "INT32",
        UInt32 = 3 => "UINT32",
        Int64 = 4 => "INT64",
    }
}

impl DataType {
    /// Smallest representable sample code.
    pub fn min_value(self) -> Option<i64> {
        match self {
            Self::Int8 => Some(i64::from(i8::MIN)),
            Self::Int16 => Some(i64::from(i16::MIN)),
            Self::Int32 => Some(i64::from(i32::MIN)),
            Self::UInt32 => Some(0),
            Self::Int64 => Some(i64::MIN),
            Self::Unknown(_) => None,
        }
    }

    /// Largest representable sample code.
    pub fn max_value(self) -> Option<i64> {
        match self {
            Self::Int8 => Some(i64::from(i8::MAX)),
            Self::Int16 => Some(i64::from(i16::MAX)),
            Self::Int32 => Some(i64::from(i32::MAX)),
            Self::UInt32 => Some(i64::from(u32::MAX)),
            Self::Int64 => Some(i64::MAX),
            Self::Unknown(_) => None,
        }
    }

    /// Size of one element in bytes.
    pub fn size_of(self) -> Option<usize> {
        match self {
            Self::Int8 => Some(1),
            Self::Int16 => Some(2),
            Self::Int32 | Self::UInt32 => Some(4),
            Self::Int64 => Some(8),
            Self::Unknown(_) => None,
        }
    }
}

bitflags! {
    /// Downsampling (ratio) mode. Modes are flags and may be combined when
    /// retrieving data.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct RatioMode: u32 {
        const AGGREGATE = ps6000a_sys::PICO_RATIO_MODE_AGGREGATE;
        const DECIMATE = ps6000a_sys::PICO_RATIO_MODE_DECIMATE;
        const AVERAGE = ps6000a_sys::PICO_RATIO_MODE_AVERAGE;
        const DISTRIBUTION = ps6000a_sys::PICO_RATIO_MODE_DISTRIBUTION;
        const SUM = ps6000a_sys::PICO_RATIO_MODE_SUM;
        const TRIGGER_DATA_FOR_TIME_CALCULATION =
            ps6000a_sys::PICO_RATIO_MODE_TRIGGER_DATA_FOR_TIME_CALCULATION;
        const SEGMENT_HEADER = ps6000a_sys::PICO_RATIO_MODE_SEGMENT_HEADER;
        const TRIGGER = ps6000a_sys::PICO_RATIO_MODE_TRIGGER;
        const RAW = ps6000a_sys::PICO_RATIO_MODE_RAW;
    }
}

bitflags! {
    /// Action applied by a buffer-registration call.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Action: u32 {
        const CLEAR_ALL = ps6000a_sys::PICO_CLEAR_ALL;
        const ADD = ps6000a_sys::PICO_ADD;
        const CLEAR_THIS_DATA_BUFFER = ps6000a_sys::PICO_CLEAR_THIS_DATA_BUFFER;
        const CLEAR_WAVEFORM_DATA_BUFFERS = ps6000a_sys::PICO_CLEAR_WAVEFORM_DATA_BUFFERS;
        const CLEAR_WAVEFORM_READ_DATA_BUFFERS =
            ps6000a_sys::PICO_CLEAR_WAVEFORM_READ_DATA_BUFFERS;
    }
}

// =============================================================================
// Front end
// =============================================================================

pico_enum! {
    /// Input coupling.
    pub enum Coupling: u32 {
        Ac = 0 => "AC",
        Dc = 1 => "DC",
        Dc50Ohm = 50 => "DC_50OHM",
    }
}

pico_enum! {
    /// Bandwidth limiter setting.
    pub enum BandwidthLimiter: u32 {
        Full = 0 => "BW_FULL",
        Bw20kHz = 20_000 => "BW_20KHZ",
        Bw100kHz = 100_000 => "BW_100KHZ",
        Bw1MHz = 1_000_000 => "BW_1MHZ",
        Bw20MHz = 20_000_000 => "BW_20MHZ",
        Bw25MHz = 25_000_000 => "BW_25MHZ",
        Bw50MHz = 50_000_000 => "BW_50MHZ",
        Bw250MHz = 250_000_000 => "BW_250MHZ",
        Bw500MHz = 500_000_000 => "BW_500MHZ",
    }
}

pico_enum! {
    /// Input range for a directly connected (x1) or x10 probe.
    pub enum ProbeRange: u32 {
        X1Probe10mV = 0 => "X1_PROBE_10MV",
        X1Probe20mV = 1 => "X1_PROBE_20MV",
        X1Probe50mV = 2 => "X1_PROBE_50MV",
        X1Probe100mV = 3 => "X1_PROBE_100MV",
        X1Probe200mV = 4 => "X1_PROBE_200MV",
        X1Probe500mV = 5 => "X1_PROBE_500MV",
        X1Probe1V = 6 => "X1_PROBE_1V",
        X1Probe2V = 7 => "X1_PROBE_2V",
        X1Probe5V = 8 => "X1_PROBE_5V",
        X1Probe10V = 9 => "X1_PROBE_10V",
        X1Probe20V = 10 => "X1_PROBE_20V",
        X1Probe50V = 11 => "X1_PROBE_50V",
        X1Probe100V = 12 => "X1_PROBE_100V",
        X1Probe200V = 13 => "X1_PROBE_200V",
        X10Probe100mV = 32 => "X10_PROBE_100MV",
        X10Probe200mV = 33 => "X10_PROBE_200MV",
        X10Probe500mV = 34 => "X10_PROBE_500MV",
        X10Probe1V = 35 => "X10_PROBE_1V",
        X10Probe2V = 36 => "X10_PROBE_2V",
        X10Probe5V = 37 => "X10_PROBE_5V",
        X10Probe10V = 38 => "X10_PROBE_10V",
        X10Probe20V = 39 => "X10_PROBE_20V",
        X10Probe50V = 40 => "X10_PROBE_50V",
        X10Probe100V = 41 => "X10_PROBE_100V",
        X10Probe200V = 42 => "X10_PROBE_200V",
        X10Probe500V = 43 => "X10_PROBE_500V",
        ProbeOff = 1024 => "CONNECT_PROBE_OFF",
    }
}

impl ProbeRange {
    /// Full-scale voltage of this range, in volts.
    ///
    /// `None` for ranges outside the table (current clamps, high-voltage
    /// probes and other intelligent-probe ranges).
    pub fn full_scale(self) -> Option<f64> {
        let volts = match self {
            Self::X1Probe10mV => 0.01,
            Self::X1Probe20mV => 0.02,
            Self::X1Probe50mV => 0.05,
            Self::X1Probe100mV | Self::X10Probe100mV => 0.1,
            Self::X1Probe200mV | Self::X10Probe200mV => 0.2,
            Self::X1Probe500mV | Self::X10Probe500mV => 0.5,
            Self::X1Probe1V | Self::X10Probe1V => 1.0,
            Self::X1Probe2V | Self::X10Probe2V => 2.0,
            Self::X1Probe5V | Self::X10Probe5V => 5.0,
            Self::X1Probe10V | Self::X10Probe10V => 10.0,
            Self::X1Probe20V | Self::X10Probe20V => 20.0,
            Self::X1Probe50V | Self::X10Probe50V => 50.0,
            Self::X1Probe100V | Self::X10Probe100V => 100.0,
            Self::X1Probe200V | Self::X10Probe200V => 200.0,
            Self::X10Probe500V => 500.0,
            Self::ProbeOff => 0.0,
            Self::Unknown(_) => return None,
        };
        Some(volts)
    }
}

pico_enum! {
    /// ADC resolution of the device.
    pub enum DeviceResolution: u32 {
        Bits8 = 0 => "DR_8BIT",
        Bits12 = 1 => "DR_12BIT",
        Bits14 = 2 => "DR_14BIT",
        Bits15 = 3 => "DR_15BIT",
        Bits16 = 4 => "DR_16BIT",
        Bits10 = 10 => "DR_10BIT",
    }
}

impl Default for DeviceResolution {
    fn default() -> Self {
        Self::Bits8
    }
}

impl DeviceResolution {
    /// Number of ADC bits.
    pub fn bits(self) -> Option<u32> {
        match self {
            Self::Bits8 => Some(8),
            Self::Bits10 => Some(10),
            Self::Bits12 => Some(12),
            Self::Bits14 => Some(14),
            Self::Bits15 => Some(15),
            Self::Bits16 => Some(16),
            Self::Unknown(_) => None,
        }
    }

    /// Resolution with the given number of ADC bits.
    pub fn from_bits(bits: u32) -> Option<Self> {
        Self::KNOWN.iter().copied().find(|r| r.bits() == Some(bits))
    }

    /// Smallest sample type able to hold codes at this resolution.
    pub fn min_type(self) -> Option<DataType> {
        match self {
            Self::Bits8 => Some(DataType::Int8),
            Self::Unknown(_) => None,
            _ => Some(DataType::Int16),
        }
    }
}

// =============================================================================
// Time and triggering
// =============================================================================

pico_enum! {
    /// Unit of time.
    pub enum TimeUnits: u32 {
        Fs = 0 => "FS",
        Ps = 1 => "PS",
        Ns = 2 => "NS",
        Us = 3 => "US",
        Ms = 4 => "MS",
        S = 5 => "S",
    }
}

impl TimeUnits {
    /// Number of these units in one second.
    pub fn per_second(self) -> Option<f64> {
        match self {
            Self::Fs => Some(1e15),
            Self::Ps => Some(1e12),
            Self::Ns => Some(1e9),
            Self::Us => Some(1e6),
            Self::Ms => Some(1e3),
            Self::S => Some(1.0),
            Self::Unknown(_) => None,
        }
    }

    /// Convert a value in these units to seconds.
    pub fn to_seconds(self, value: f64) -> Option<f64> {
        self.per_second().map(|scale| value / scale)
    }
}

pico_enum! {
    /// Direction in which the signal must move to cause a trigger.
    pub enum ThresholdDirection: u32 {
        Above = 0 => "ABOVE",
        Below = 1 => "BELOW",
        Rising = 2 => "RISING",
        Falling = 3 => "FALLING",
        RisingOrFalling = 4 => "RISING_OR_FALLING",
        AboveLower = 5 => "ABOVE_LOWER",
        BelowLower = 6 => "BELOW_LOWER",
        RisingLower = 7 => "RISING_LOWER",
        FallingLower = 8 => "FALLING_LOWER",
        PositiveRunt = 9 => "POSITIVE_RUNT",
        NegativeRunt = 10 => "NEGATIVE_RUNT",
        LogicLower = 1000 => "LOGIC_LOWER",
        LogicUpper = 1001 => "LOGIC_UPPER",
    }
}

pico_enum! {
    /// Whether a trigger source compares against one level or a window.
    pub enum ThresholdMode: u32 {
        Level = 0 => "LEVEL",
        Window = 1 => "WINDOW",
    }
}

pico_enum! {
    /// Required state of one source within a trigger condition.
    pub enum TriggerState: u32 {
        DontCare = 0 => "DONT_CARE",
        True = 1 => "TRUE",
        False = 2 => "FALSE",
    }
}

pico_enum! {
    /// Hysteresis applied to every pin of a digital port.
    pub enum DigitalPortHysteresis: u32 {
        VeryHigh400mV = 0 => "VERY_HIGH_400MV",
        High200mV = 1 => "HIGH_200MV",
        Normal100mV = 2 => "NORMAL_100MV",
        Low50mV = 3 => "LOW_50MV",
    }
}

pico_enum! {
    /// Trigger-within-pre-trigger-samples switch.
    pub enum TriggerWithinPreTrigger: u32 {
        Disable = 0 => "DISABLE",
        Arm = 1 => "ARM",
    }
}

pico_enum! {
    /// A piece of information about the unit.
    pub enum Info: u32 {
        DriverVersion = 0x00 => "DRIVER_VERSION",
        UsbVersion = 0x01 => "USB_VERSION",
        HardwareVersion = 0x02 => "HARDWARE_VERSION",
        VariantInfo = 0x03 => "VARIANT_INFO",
        BatchAndSerial = 0x04 => "BATCH_AND_SERIAL",
        CalDate = 0x05 => "CAL_DATE",
        KernelVersion = 0x06 => "KERNEL_VERSION",
        DigitalHardwareVersion = 0x07 => "DIGITAL_HARDWARE_VERSION",
        AnalogueHardwareVersion = 0x08 => "ANALOGUE_HARDWARE_VERSION",
        FirmwareVersion1 = 0x09 => "FIRMWARE_VERSION_1",
        FirmwareVersion2 = 0x0A => "FIRMWARE_VERSION_2",
        MacAddress = 0x0B => "MAC_ADDRESS",
        ShadowCal = 0x0C => "SHADOW_CAL",
        IppVersion = 0x0D => "IPP_VERSION",
    }
}

/// Role of a buffer within a (MAX, MIN) pair.
///
/// Aggregate downsampling writes the maximum of each bin to the MAX buffer
/// and the minimum to the MIN buffer; every other mode uses MAX only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BufferRole {
    /// Primary buffer
    Max,
    /// Secondary buffer for aggregate minima
    Min,
}
