//! Handle guard and unit lifecycle.
//!
//! A session holds at most one device handle. The driver reports a positive
//! handle on success, zero when no unit was found and a negative value when
//! the open failed; a session that never opened has no handle at all. Every
//! device call goes through [`HandleGuard::get`], which turns the three
//! invalid states into a [`HandleError`].

use std::ffi::CString;

use tracing::{debug, info, warn};

use crate::boundary::DeviceBoundary;
use crate::error::{HandleError, Result};
use crate::session::Ps6000a;
use crate::types::{DeviceResolution, Info};

/// Tracks the single device handle of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandleGuard {
    handle: Option<i16>,
}

impl HandleGuard {
    /// The handle, if it is valid.
    pub fn get(&self) -> std::result::Result<i16, HandleError> {
        match HandleError::classify(self.handle) {
            None => Ok(self.handle.unwrap_or_default()),
            Some(err) => Err(err),
        }
    }

    /// The handle exactly as the driver last reported it.
    pub fn raw(&self) -> Option<i16> {
        self.handle
    }

    /// True if the handle is positive.
    pub fn is_valid(&self) -> bool {
        self.get().is_ok()
    }

    pub(crate) fn set(&mut self, handle: i16) {
        self.handle = Some(handle);
    }

    pub(crate) fn clear(&mut self) {
        self.handle = None;
    }
}

/// Progress of an asynchronous open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenProgress {
    /// Percentage reported by the driver
    pub percent: i16,
    /// True once the open has finished and the handle is stored
    pub complete: bool,
}

// Size of the string buffer offered to GetUnitInfo / EnumerateUnits.
const INFO_STRING_LEN: usize = 256;

fn nul_terminated(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

impl<B: DeviceBoundary> Ps6000a<B> {
    fn serial_cstring(serial: Option<&str>) -> Result<Option<CString>> {
        Ok(serial.map(CString::new).transpose()?)
    }

    fn close_if_open(&mut self) -> Result<()> {
        if let Ok(handle) = self.handle.get() {
            warn!(handle, "Unit already open, closing it before reopening");
            self.close_unit()?;
        }
        Ok(())
    }

    /// Open a unit, optionally by serial number, at the given resolution.
    ///
    /// If this session already holds a valid handle, that unit is closed
    /// first. The handle the driver reports is stored even when the open
    /// fails, so later calls report why the session is unusable.
    pub fn open_unit(&mut self, serial: Option<&str>, resolution: DeviceResolution) -> Result<()> {
        self.close_if_open()?;
        let serial = Self::serial_cstring(serial)?;

        let mut handle: i16 = 0;
        let raw = self
            .boundary
            .open_unit(&mut handle, serial.as_deref(), resolution.to_raw());
        self.handle.set(handle);
        self.record(raw)?;

        self.resolution = resolution;
        info!(handle, %resolution, "Opened PicoScope 6000E unit");
        Ok(())
    }

    /// Begin opening a unit in the background.
    ///
    /// Returns true if the driver started the open. Poll
    /// [`open_unit_progress`](Self::open_unit_progress) until it completes.
    pub fn open_unit_async(
        &mut self,
        serial: Option<&str>,
        resolution: DeviceResolution,
    ) -> Result<bool> {
        self.close_if_open()?;
        let serial = Self::serial_cstring(serial)?;

        let mut started: i16 = 0;
        let raw = self
            .boundary
            .open_unit_async(&mut started, serial.as_deref(), resolution.to_raw());
        self.record(raw)?;

        self.resolution = resolution;
        debug!(started, "Asynchronous open requested");
        Ok(started != 0)
    }

    /// Poll an asynchronous open. The handle is stored once complete.
    pub fn open_unit_progress(&mut self) -> Result<OpenProgress> {
        let mut handle: i16 = 0;
        let mut percent: i16 = 0;
        let mut complete: i16 = 0;
        let raw = self
            .boundary
            .open_unit_progress(&mut handle, &mut percent, &mut complete);
        self.record(raw)?;

        let complete = complete != 0;
        if complete {
            self.handle.set(handle);
            info!(handle, "Asynchronous open complete");
        }
        Ok(OpenProgress { percent, complete })
    }

    /// Close the unit.
    ///
    /// On success the handle is cleared and the session drops every
    /// registered buffer and every block-ready trampoline.
    pub fn close_unit(&mut self) -> Result<()> {
        self.call(|b, h| b.close_unit(h))?;

        let handle = self.handle.raw();
        self.handle.clear();
        let dropped = self.registry.clear_all();
        self.trampolines.clear();
        info!(?handle, dropped_buffers = dropped, "Closed PicoScope 6000E unit");
        Ok(())
    }

    /// Check that the unit is still responding.
    pub fn ping_unit(&mut self) -> Result<()> {
        self.call(|b, h| b.ping_unit(h))
    }

    /// Read one piece of unit information as a string.
    pub fn get_unit_info(&mut self, info: Info) -> Result<String> {
        let mut buf = vec![0u8; INFO_STRING_LEN];
        let mut required: i16 = 0;
        self.call(|b, h| b.get_unit_info(h, &mut buf, &mut required, info.to_raw()))?;
        Ok(nul_terminated(&buf))
    }

    /// List the serial numbers of all connected units.
    ///
    /// Does not need an open handle.
    pub fn enumerate_units(&mut self) -> Result<Vec<String>> {
        let mut count: i16 = 0;
        let mut buf = vec![0u8; INFO_STRING_LEN];
        let mut len: i16 = 0;
        let raw = self.boundary.enumerate_units(&mut count, &mut buf, &mut len);
        self.record(raw)?;

        let used = usize::try_from(len).unwrap_or(0).min(buf.len());
        let serials: Vec<String> = nul_terminated(&buf[..used])
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();
        debug!(count, ?serials, "Enumerated units");
        Ok(serials)
    }

    /// The handle exactly as last reported, without validation.
    pub fn raw_handle(&self) -> Option<i16> {
        self.handle.raw()
    }

    /// The valid handle, or why there is none.
    pub fn handle(&self) -> Result<i16> {
        Ok(self.handle.get()?)
    }
}
