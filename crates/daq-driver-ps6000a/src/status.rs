//! Status translation.
//!
//! Every device call returns a 32-bit status. [`PicoStatus`] wraps that code
//! without loss: known codes get a symbolic name, unknown codes are kept and
//! printed as hex. [`PicoStatus::check`] is the single translation point from
//! a status to `Ok` or [`StatusError`].

use std::fmt;

use crate::error::{Result, StatusError};

/// A raw status code returned by the device boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PicoStatus(u32);

macro_rules! pico_statuses {
    ($($name:ident = $value:literal,)+) => {
        #[allow(missing_docs)]
        impl PicoStatus {
            $(pub const $name: PicoStatus = PicoStatus($value);)+

            /// Every status code with a symbolic name.
            pub const KNOWN: &'static [PicoStatus] = &[$(PicoStatus($value),)+];

            /// Symbolic name of a known status code.
            pub fn name(self) -> Option<&'static str> {
                match self.0 {
                    $($value => Some(stringify!($name)),)+
                    _ => None,
                }
            }
        }
    };
}

pico_statuses! {
    OK = 0x00000000,
    MAX_UNITS_OPENED = 0x00000001,
    MEMORY_FAIL = 0x00000002,
    NOT_FOUND = 0x00000003,
    FW_FAIL = 0x00000004,
    OPEN_OPERATION_IN_PROGRESS = 0x00000005,
    OPERATION_FAILED = 0x00000006,
    NOT_RESPONDING = 0x00000007,
    CONFIG_FAIL = 0x00000008,
    KERNEL_DRIVER_TOO_OLD = 0x00000009,
    EEPROM_CORRUPT = 0x0000000A,
    OS_NOT_SUPPORTED = 0x0000000B,
    INVALID_HANDLE = 0x0000000C,
    INVALID_PARAMETER = 0x0000000D,
    INVALID_TIMEBASE = 0x0000000E,
    INVALID_VOLTAGE_RANGE = 0x0000000F,
    INVALID_CHANNEL = 0x00000010,
    INVALID_TRIGGER_CHANNEL = 0x00000011,
    INVALID_CONDITION_CHANNEL = 0x00000012,
    NO_SIGNAL_GENERATOR = 0x00000013,
    STREAMING_FAILED = 0x00000014,
    BLOCK_MODE_FAILED = 0x00000015,
    NULL_PARAMETER = 0x00000016,
    ETS_MODE_SET = 0x00000017,
    DATA_NOT_AVAILABLE = 0x00000018,
    STRING_BUFFER_TO_SMALL = 0x00000019,
    ETS_NOT_SUPPORTED = 0x0000001A,
    AUTO_TRIGGER_TIME_TO_SHORT = 0x0000001B,
    BUFFER_STALL = 0x0000001C,
    TOO_MANY_SAMPLES = 0x0000001D,
    TOO_MANY_SEGMENTS = 0x0000001E,
    PULSE_WIDTH_QUALIFIER = 0x0000001F,
    DELAY = 0x00000020,
    SOURCE_DETAILS = 0x00000021,
    CONDITIONS = 0x00000022,
    USER_CALLBACK = 0x00000023,
    DEVICE_SAMPLING = 0x00000024,
    NO_SAMPLES_AVAILABLE = 0x00000025,
    SEGMENT_OUT_OF_RANGE = 0x00000026,
    BUSY = 0x00000027,
    STARTINDEX_INVALID = 0x00000028,
    INVALID_INFO = 0x00000029,
    INFO_UNAVAILABLE = 0x0000002A,
    INVALID_SAMPLE_INTERVAL = 0x0000002B,
    TRIGGER_ERROR = 0x0000002C,
    MEMORY = 0x0000002D,
    SIG_GEN_PARAM = 0x0000002E,
    SHOTS_SWEEPS_WARNING = 0x0000002F,
    SIGGEN_TRIGGER_SOURCE = 0x00000030,
    AUX_OUTPUT_CONFLICT = 0x00000031,
    AUX_OUTPUT_ETS_CONFLICT = 0x00000032,
    WARNING_EXT_THRESHOLD_CONFLICT = 0x00000033,
    WARNING_AUX_OUTPUT_CONFLICT = 0x00000034,
    SIGGEN_OUTPUT_OVER_VOLTAGE = 0x00000035,
    DELAY_NULL = 0x00000036,
    INVALID_BUFFER = 0x00000037,
    SIGGEN_OFFSET_VOLTAGE = 0x00000038,
    SIGGEN_PK_TO_PK = 0x00000039,
    CANCELLED = 0x0000003A,
    SEGMENT_NOT_USED = 0x0000003B,
    INVALID_CALL = 0x0000003C,
    GET_VALUES_INTERRUPTED = 0x0000003D,
    NOT_USED = 0x0000003F,
    INVALID_SAMPLERATIO = 0x00000040,
    INVALID_STATE = 0x00000041,
    NOT_ENOUGH_SEGMENTS = 0x00000042,
    DRIVER_FUNCTION = 0x00000043,
    RESERVED = 0x00000044,
    INVALID_COUPLING = 0x00000045,
    BUFFERS_NOT_SET = 0x00000046,
    RATIO_MODE_NOT_SUPPORTED = 0x00000047,
    RAPID_NOT_SUPPORT_AGGREGATION = 0x00000048,
    INVALID_TRIGGER_PROPERTY = 0x00000049,
    INTERFACE_NOT_CONNECTED = 0x0000004A,
    RESISTANCE_AND_PROBE_NOT_ALLOWED = 0x0000004B,
    POWER_FAILED = 0x0000004C,
    SIGGEN_WAVEFORM_SETUP_FAILED = 0x0000004D,
    FPGA_FAIL = 0x0000004E,
    POWER_MANAGER = 0x0000004F,
    INVALID_ANALOGUE_OFFSET = 0x00000050,
    PLL_LOCK_FAILED = 0x00000051,
    ANALOG_BOARD = 0x00000052,
    CONFIG_FAIL_AWG = 0x00000053,
    INITIALISE_FPGA = 0x00000054,
    EXTERNAL_FREQUENCY_INVALID = 0x00000056,
    CLOCK_CHANGE_ERROR = 0x00000057,
    TRIGGER_AND_EXTERNAL_CLOCK_CLASH = 0x00000058,
    PWQ_AND_EXTERNAL_CLOCK_CLASH = 0x00000059,
    UNABLE_TO_OPEN_SCALING_FILE = 0x0000005A,
    MEMORY_CLOCK_FREQUENCY = 0x0000005B,
    I2C_NOT_RESPONDING = 0x0000005C,
    NO_CAPTURES_AVAILABLE = 0x0000005D,
    NOT_USED_IN_THIS_CAPTURE_MODE = 0x0000005E,
    TOO_MANY_TRIGGER_CHANNELS_IN_USE = 0x0000005F,
    INVALID_TRIGGER_DIRECTION = 0x00000060,
    INVALID_TRIGGER_STATES = 0x00000061,
    GET_DATA_ACTIVE = 0x00000103,
    COUPLING_NOT_SUPPORTED = 0x0000010C,
    BANDWIDTH_NOT_SUPPORTED = 0x0000010D,
    INVALID_BANDWIDTH = 0x0000010E,
    CAPTURING_DATA = 0x0000011D,
    NOT_SUPPORTED_BY_THIS_DEVICE = 0x0000011F,
    INVALID_DEVICE_RESOLUTION = 0x00000120,
    INVALID_NUMBER_CHANNELS_FOR_RESOLUTION = 0x00000121,
    TRIGGER_WITHIN_PRE_TRIG_NOT_ARMED = 0x00000125,
    TRIGGER_WITHIN_PRE_NOT_ALLOWED_WITH_DELAY = 0x00000126,
    NULL_CONDITIONS = 0x0000012A,
    DUPLICATE_CONDITION_SOURCE = 0x0000012B,
    ARGUMENT_OUT_OF_RANGE = 0x0000012F,
    TIMEOUT = 0x00000143,
    INTERNAL_ERROR = 0x00000145,
    INVALID_RATIO_MODE = 0x0000015F,
    NO_SAMPLES_READ = 0x00000172,
    RATIO_MODE_BUFFER_NOT_SET = 0x0000017A,
    THRESHOLD_OUT_OF_RANGE = 0x0000017C,
    NULL_CHANNEL_PROPERTIES = 0x00000180,
    TRIGGER_CHANNEL_NOT_ENABLED = 0x00000181,
    CONDITION_HAS_NO_TRIGGER_PROPERTY = 0x00000182,
    RATIO_MODE_TRIGGER_MASKING_INVALID = 0x00000183,
    TRIGGER_DATA_REQUIRES_MIN_BUFFER_SIZE_OF_40_SAMPLES = 0x00000184,
    NO_OF_CAPTURES_OUT_OF_RANGE = 0x00000185,
    RATIO_MODE_SEGMENT_HEADER_DOES_NOT_REQUIRE_BUFFERS = 0x00000186,
    FOR_SEGMENT_HEADER_USE_GETTRIGGERINFO = 0x00000187,
    READ_NOT_SET = 0x00000188,
    ADC_SETTING_MISMATCH = 0x00000189,
    DATATYPE_INVALID = 0x0000018A,
    RATIO_MODE_DOES_NOT_SUPPORT_DATATYPE = 0x0000018B,
    CHANNEL_COMBINATION_NOT_VALID_IN_THIS_RESOLUTION = 0x0000018C,
    USE_8BIT_RESOLUTION = 0x0000018D,
    AGGREGATE_BUFFERS_SAME_POINTER = 0x0000018E,
    OVERLAPPED_READ_VALUES_OUT_OF_RANGE = 0x0000018F,
    OVERLAPPED_READ_SEGMENTS_OUT_OF_RANGE = 0x00000190,
    CHANNELFLAGSCOMBINATIONS_ARRAY_SIZE_TOO_SMALL = 0x00000191,
    CAPTURES_EXCEEDS_NO_OF_SUPPORTED_SEGMENTS = 0x00000192,
    TIME_UNITS_OUT_OF_RANGE = 0x00000193,
    NO_SAMPLES_REQUESTED = 0x00000194,
    INVALID_ACTION = 0x00000195,
    NO_OF_SAMPLES_NEED_TO_BE_EQUAL_WHEN_ADDING_BUFFERS = 0x00000196,
    WAITING_FOR_DATA_BUFFERS = 0x00000197,
    STREAMING_ONLY_SUPPORTS_ONE_READ = 0x00000198,
    CLEAR_DATA_BUFFER_INVALID = 0x00000199,
    INVALID_ACTION_FLAGS_COMBINATION = 0x0000019A,
    PICO_MOTH_MIN_AND_MAX_NULL_BUFFERS_CANNOT_BE_ADDED = 0x0000019B,
    CONFLICT_IN_SET_DATA_BUFFERS_CALL_REMOVE_DATA_BUFFER_TO_RESET = 0x0000019C,
    REMOVING_DATA_BUFFER_ENTRIES_NOT_ALLOWED_WHILE_DATA_PROCESSING = 0x0000019D,
    INVALID_TRIGGER_WITHIN_PRE_TRIGGER_STATE = 0x00000212,
    TRIGGER_DELAY_OUT_OF_RANGE = 0x00000300,
    INVALID_THRESHOLD_DIRECTION = 0x00000301,
    DIGITAL_PORT_HYSTERESIS_OUT_OF_RANGE = 0x00005002,
}

impl PicoStatus {
    /// Wrap a raw status code.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw status code.
    pub const fn to_raw(self) -> u32 {
        self.0
    }

    /// Only `OK` counts as success.
    pub fn is_ok(self) -> bool {
        self == Self::OK
    }

    /// Translate to `Ok(())` or a [`StatusError`] carrying this code.
    pub fn check(self) -> Result<()> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(StatusError { status: self }.into())
        }
    }
}

impl From<u32> for PicoStatus {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for PicoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} (0x{:08X})", name, self.0),
            None => write!(f, "0x{:08X}", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Ps6000aError;

    #[test]
    fn test_ok_is_the_only_success() {
        assert!(PicoStatus::OK.check().is_ok());
        for &status in PicoStatus::KNOWN.iter().filter(|s| **s != PicoStatus::OK) {
            assert!(!status.is_ok(), "{status} must not count as success");
            match status.check().unwrap_err() {
                Ps6000aError::Status(StatusError { status: kept }) => {
                    assert_eq!(kept.to_raw(), status.to_raw());
                    assert_eq!(kept.name(), status.name());
                }
                other => panic!("unexpected error {other:?}"),
            }
        }
        for raw in [0x0000_019E, 0x7777_0000, 0xDEAD_BEEF] {
            match PicoStatus::from_raw(raw).check().unwrap_err() {
                Ps6000aError::Status(StatusError { status }) => assert_eq!(status.to_raw(), raw),
                other => panic!("unexpected error {other:?}"),
            }
        }
    }

    #[test]
    fn test_known_codes_are_named_and_unique() {
        let mut seen = std::collections::HashSet::new();
        for status in PicoStatus::KNOWN {
            assert!(status.name().is_some());
            assert!(seen.insert(status.to_raw()), "duplicate code {status}");
        }
        assert!(PicoStatus::KNOWN.contains(&PicoStatus::WAITING_FOR_DATA_BUFFERS));
    }

    #[test]
    fn test_matches_ffi_constants() {
        assert_eq!(PicoStatus::OK.to_raw(), ps6000a_sys::PICO_OK);
        assert_eq!(PicoStatus::NOT_FOUND.to_raw(), ps6000a_sys::PICO_NOT_FOUND);
        assert_eq!(
            PicoStatus::WAITING_FOR_DATA_BUFFERS.to_raw(),
            ps6000a_sys::PICO_WAITING_FOR_DATA_BUFFERS
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(
            PicoStatus::INVALID_HANDLE.to_string(),
            "INVALID_HANDLE (0x0000000C)"
        );
        assert_eq!(PicoStatus::from_raw(0x7777_0000).to_string(), "0x77770000");
        assert_eq!(PicoStatus::from_raw(0x7777_0000).name(), None);
    }
}
