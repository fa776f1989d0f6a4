// pandacan/src/device.rs
//
// Implements the USB device handle for the comma.ai panda.
//
// This file is part of the Rust 'pandacan' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! The panda device handle.
//!
//! [`Panda`] wraps a claimed `rusb` device handle. Configuration goes out as
//! vendor control transfers; CAN traffic is batched over the bulk endpoints
//! as packed records (see [`crate::frame`]).
//!
//! Configuration calls (safety mode, bus speeds, GMLAN routing, loopback)
//! must happen before entering a send/receive loop; the device applies them
//! immediately and does not re-order them around in-flight traffic.

use crate::{
    constants::{
        CAN_RECORD_SIZE, ENDPOINT_CAN_IN, ENDPOINT_CAN_OUT, MAX_RECORDS_PER_READ,
        MAX_RECORDS_PER_WRITE, NUM_BUSES,
        PANDA_PID, PANDA_VID, REQUEST_CAN_LOOPBACK, REQUEST_CAN_SPEED, REQUEST_ESP_POWER,
        REQUEST_GMLAN, REQUEST_HW_TYPE, REQUEST_SAFETY_MODE,
    },
    errors::{Error, Result},
    frame::CanFrame,
};
use rusb::{Direction, GlobalContext, Recipient, RequestType, UsbContext};
use std::time::Duration;

/// Device-enforced policy governing whether the interface may transmit onto
/// the physical bus or only observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum SafetyMode {
    /// Receive only; all transmission is blocked by the firmware.
    Silent = 0,
    /// Everything is allowed out. For test benches, never for a car.
    AllOutput = 17,
}

/// Which transceiver the GMLAN single-wire bus is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum GmlanBus {
    /// Route GMLAN over the CAN2 transceiver.
    Can2 = 1,
    /// Route GMLAN over the CAN3 transceiver.
    Can3 = 2,
}

/// Hardware revision, as reported by the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwType {
    /// Pre-production or unrecognized board.
    Unknown,
    /// White panda.
    White,
    /// Grey panda (white plus GPS).
    Grey,
    /// Black panda; GMLAN is reached through the OBD-II harness.
    Black,
    /// Comma pedal.
    Pedal,
    /// Uno.
    Uno,
}

impl From<u8> for HwType {
    fn from(code: u8) -> Self {
        match code {
            1 => HwType::White,
            2 => HwType::Grey,
            3 => HwType::Black,
            4 => HwType::Pedal,
            5 => HwType::Uno,
            _ => HwType::Unknown,
        }
    }
}

/// Timeout for a single USB transfer. The bulk IN endpoint returns whatever
/// is queued well inside this; hitting it on a read means "nothing pending".
const USB_TIMEOUT: Duration = Duration::from_millis(100);

/// An open connection to a panda.
///
/// The USB interface is claimed for the lifetime of the handle and released
/// on drop.
pub struct Panda {
    handle: rusb::DeviceHandle<GlobalContext>,
    timeout: Duration,
}

impl Panda {
    /// Opens the first attached panda.
    ///
    /// Returns [`Error::NotFound`] if no panda is on the bus.
    pub fn new() -> Result<Self> {
        let device = GlobalContext::default()
            .devices()?
            .iter()
            .find(|dev| {
                dev.device_descriptor()
                    .map(|desc| {
                        desc.vendor_id() == PANDA_VID && desc.product_id() == PANDA_PID
                    })
                    .unwrap_or(false)
            })
            .ok_or(Error::NotFound)?;

        let mut handle = device.open()?;
        handle.claim_interface(0)?;

        let panda = Self {
            handle,
            timeout: USB_TIMEOUT,
        };
        let hw = panda.hw_type()?;
        log::debug!(
            "opened panda at bus {:03} addr {:03}, hw type {:?}",
            device.bus_number(),
            device.address(),
            hw
        );
        Ok(panda)
    }

    /// Sets the safety mode.
    pub fn set_safety_mode(&self, mode: SafetyMode) -> Result<()> {
        self.vendor_write(REQUEST_SAFETY_MODE, mode as u16, 0)
    }

    /// Routes GMLAN onto the given transceiver, or takes it off the bus
    /// entirely with `None`.
    pub fn set_gmlan(&self, bus: Option<GmlanBus>) -> Result<()> {
        match bus {
            Some(bus) => self.vendor_write(REQUEST_GMLAN, 1, bus as u16),
            None => self.vendor_write(REQUEST_GMLAN, 0, 0),
        }
    }

    /// Switches the OBD-II harness passthrough relay.
    ///
    /// Shares the firmware's bus-multiplexing request with [`set_gmlan`];
    /// wValue 2 selects the harness path.
    ///
    /// [`set_gmlan`]: Self::set_gmlan
    pub fn set_obd(&self, obd: bool) -> Result<()> {
        self.vendor_write(REQUEST_GMLAN, if obd { 2 } else { 0 }, 0)
    }

    /// Enables loopback mode: transmitted frames are delivered back to the
    /// receive path as if they had arrived from the bus.
    pub fn set_can_loopback(&self, enable: bool) -> Result<()> {
        self.vendor_write(REQUEST_CAN_LOOPBACK, enable as u16, 0)
    }

    /// Sets the nominal bit rate of one bus, in kbps.
    ///
    /// The firmware takes the rate in units of 100 bps, so fractional GMLAN
    /// rates like 33.3 are representable.
    pub fn set_can_speed_kbps(&self, bus: u8, speed: f32) -> Result<()> {
        if bus >= NUM_BUSES {
            return Err(Error::InvalidBus(bus));
        }
        let raw = (speed * 10.0).round();
        if !(raw > 0.0 && raw <= f32::from(u16::MAX)) {
            return Err(Error::InvalidSpeed(speed));
        }
        self.vendor_write(REQUEST_CAN_SPEED, bus as u16, raw as u16)
    }

    /// Powers the ESP/GPS auxiliary rail on or off.
    pub fn set_esp_power(&self, on: bool) -> Result<()> {
        self.vendor_write(REQUEST_ESP_POWER, on as u16, 0)
    }

    /// Reads the hardware revision from the firmware.
    pub fn hw_type(&self) -> Result<HwType> {
        let mut buf = [0u8; 1];
        self.vendor_read(REQUEST_HW_TYPE, 0, 0, &mut buf)?;
        Ok(HwType::from(buf[0]))
    }

    /// Whether this is a white panda.
    pub fn is_white(&self) -> Result<bool> {
        Ok(self.hw_type()? == HwType::White)
    }

    /// Whether this is a grey panda.
    pub fn is_grey(&self) -> Result<bool> {
        Ok(self.hw_type()? == HwType::Grey)
    }

    /// Sends a batch of frames.
    ///
    /// Frames are packed into records and pushed out the bulk endpoint in
    /// endpoint-sized chunks.
    pub fn can_send_many(&self, frames: &[CanFrame]) -> Result<()> {
        let mut buf = Vec::with_capacity(frames.len() * CAN_RECORD_SIZE);
        for frame in frames {
            buf.extend_from_slice(&frame.to_record());
        }
        for chunk in buf.chunks(MAX_RECORDS_PER_WRITE * CAN_RECORD_SIZE) {
            self.handle
                .write_bulk(ENDPOINT_CAN_OUT, chunk, self.timeout)?;
        }
        log::trace!("sent {} frames", frames.len());
        Ok(())
    }

    /// Sends a single frame.
    pub fn can_send(&self, frame: CanFrame) -> Result<()> {
        self.can_send_many(std::slice::from_ref(&frame))
    }

    /// Drains whatever frames the device has queued.
    ///
    /// Non-blocking-poll semantics: returns an empty vector when nothing is
    /// pending, never waits for traffic to show up. Records that fail to
    /// decode are dropped with a warning rather than poisoning the batch.
    pub fn can_recv(&self) -> Result<Vec<CanFrame>> {
        let mut buf = vec![0u8; CAN_RECORD_SIZE * MAX_RECORDS_PER_READ];
        let n = match self.handle.read_bulk(ENDPOINT_CAN_IN, &mut buf, self.timeout) {
            Ok(n) => n,
            Err(rusb::Error::Timeout) => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };

        let mut frames = Vec::with_capacity(n / CAN_RECORD_SIZE);
        for rec in buf[..n].chunks_exact(CAN_RECORD_SIZE) {
            match CanFrame::from_record(rec) {
                Ok(frame) => frames.push(frame),
                Err(e) => log::warn!("dropping undecodable record: {}", e),
            }
        }
        log::trace!("received {} frames", frames.len());
        Ok(frames)
    }

    fn vendor_write(&self, request: u8, value: u16, index: u16) -> Result<()> {
        let rt = rusb::request_type(Direction::Out, RequestType::Vendor, Recipient::Device);
        self.handle
            .write_control(rt, request, value, index, &[], self.timeout)?;
        Ok(())
    }

    fn vendor_read(&self, request: u8, value: u16, index: u16, buf: &mut [u8]) -> Result<usize> {
        let rt = rusb::request_type(Direction::In, RequestType::Vendor, Recipient::Device);
        let n = self
            .handle
            .read_control(rt, request, value, index, buf, self.timeout)?;
        Ok(n)
    }
}

impl Drop for Panda {
    fn drop(&mut self) {
        // Best effort; the kernel reclaims the interface anyway on exit.
        let _ = self.handle.release_interface(0);
    }
}
