//! Error types for PicoScope 6000E operations.
//!
//! Every failure surfaced by this crate is one of three kinds: the session has
//! no usable device handle, the device boundary returned a non-OK status, or
//! the request was rejected locally before reaching the device.

use std::ffi::NulError;

use thiserror::Error;

use crate::status::PicoStatus;

/// Result type alias for ps6000a operations.
pub type Result<T> = std::result::Result<T, Ps6000aError>;

/// Why the session cannot issue a device call.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleError {
    /// `open_unit` has never completed on this session.
    #[error("Cannot operate without acquiring a handle to the hardware. Call open_unit first.")]
    NeverOpened,

    /// The driver reported a negative handle.
    #[error("Cannot operate without a valid handle: hardware failed to open (handle {0}). Call get_unit_info for details.")]
    OpenFailed(i16),

    /// The driver reported handle zero.
    #[error("Cannot operate without a valid handle: no hardware found.")]
    NotFound,
}

impl HandleError {
    /// Classify a handle that failed the validity check.
    ///
    /// Returns `None` for a valid (positive) handle.
    pub fn classify(handle: Option<i16>) -> Option<Self> {
        match handle {
            None => Some(Self::NeverOpened),
            Some(0) => Some(Self::NotFound),
            Some(h) if h < 0 => Some(Self::OpenFailed(h)),
            Some(_) => None,
        }
    }
}

/// A device call returned a status other than `OK`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("PicoScope operation failed with status: {status}")]
pub struct StatusError {
    /// The status code exactly as the device returned it.
    pub status: PicoStatus,
}

/// Errors that can occur when working with a PicoScope 6000E.
#[derive(Error, Debug)]
pub enum Ps6000aError {
    /// No valid device handle
    #[error(transparent)]
    Handle(#[from] HandleError),

    /// Non-OK status from the device boundary
    #[error(transparent)]
    Status(#[from] StatusError),

    /// Request rejected before reaching the device
    #[error("Invalid request: {message}")]
    Validation {
        /// What was wrong with the request
        message: String,
    },

    /// Acquisition configuration could not be loaded or applied
    #[error("Invalid configuration: {message}")]
    Config {
        /// What was wrong with the configuration
        message: String,
    },

    /// A string passed to the driver contained an interior NUL byte
    #[error("String contains an interior NUL byte: {0}")]
    InvalidString(#[from] NulError),
}

impl Ps6000aError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// The device status carried by this error, if it came from the device.
    pub fn status(&self) -> Option<PicoStatus> {
        match self {
            Self::Status(err) => Some(err.status),
            _ => None,
        }
    }

    /// Check if this is a handle error.
    pub fn is_handle_error(&self) -> bool {
        matches!(self, Self::Handle(_))
    }

    /// Check if this error was raised locally by request validation.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}
