// pandacan/src/frame.rs
//
// Implements CAN frames and the panda's packed wire records.
//
// This file is part of the Rust 'pandacan' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! CAN frames as the panda sees them.
//!
//! A [`CanFrame`] is a classic CAN 2.0 data frame tagged with the bus it was
//! seen on. The device moves frames over USB as fixed 16-byte records:
//!
//! ```text
//! u32 rir   - identifier word; standard ids sit in the top 11 bits,
//!             extended ids are shifted left 3 with the EXTENDED flag set
//! u32 rdtr  - low nibble: payload length, bits 4..12: source bus
//! [u8; 8]   - payload, zero padded
//! ```
//!
//! Records the device echoes back for frames this host transmitted carry
//! [`BUS_RETURNED_FLAG`] in the bus field. The flag is stripped on decode
//! and surfaced as [`CanFrame::is_returned`].

use crate::{
    constants::{
        BUS_RETURNED_FLAG, CAN_MAX_DLEN, CAN_RECORD_SIZE, EFF_MASK, SFF_MASK,
    },
    errors::ConstructionError,
};
use bitflags::bitflags;
use embedded_can::{ExtendedId, Frame as EmbeddedFrame, Id, StandardId};
use itertools::Itertools;
use std::fmt;

bitflags! {
    /// Flag bits in the identifier word of a packed record.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RirFlags: u32 {
        /// Transmit request; set by the host on outgoing records.
        const TRANSMIT = 0x01;
        /// Record carries a 29-bit extended identifier.
        const EXTENDED = 0x04;
    }
}

/// Gets the raw 32-bit value from an Id.
pub fn id_to_raw(id: impl Into<Id>) -> u32 {
    match id.into() {
        Id::Standard(id) => id.as_raw() as u32,
        Id::Extended(id) => id.as_raw(),
    }
}

/// Creates an Id from a raw value, honoring the extended flag.
///
/// Returns `None` if the value is out of range for the indicated format.
pub fn id_from_raw(raw: u32, extended: bool) -> Option<Id> {
    if extended {
        ExtendedId::new(raw).map(Id::Extended)
    } else {
        StandardId::new(raw as u16).map(Id::Standard)
    }
}

/// A classic CAN 2.0 frame, tagged with its panda bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanFrame {
    id: Id,
    bus: u8,
    returned: bool,
    dlen: u8,
    data: [u8; CAN_MAX_DLEN],
}

impl CanFrame {
    /// Creates a frame addressed to the given bus.
    pub fn new(
        id: impl Into<Id>,
        data: &[u8],
        bus: u8,
    ) -> Result<Self, ConstructionError> {
        if data.len() > CAN_MAX_DLEN {
            return Err(ConstructionError::TooMuchData);
        }
        let mut buf = [0u8; CAN_MAX_DLEN];
        buf[..data.len()].copy_from_slice(data);
        Ok(Self {
            id: id.into(),
            bus,
            returned: false,
            dlen: data.len() as u8,
            data: buf,
        })
    }

    /// The CAN identifier.
    pub fn id(&self) -> Id {
        self.id
    }

    /// The identifier as a raw integer, without flags.
    pub fn raw_id(&self) -> u32 {
        id_to_raw(self.id)
    }

    /// The bus the frame was received on or is addressed to.
    pub fn bus(&self) -> u8 {
        self.bus
    }

    /// Re-addresses the frame to another bus.
    pub fn set_bus(&mut self, bus: u8) -> &mut Self {
        self.bus = bus;
        self
    }

    /// Whether this is the device's echo of a frame this host transmitted,
    /// as opposed to traffic picked up off the wire.
    pub fn is_returned(&self) -> bool {
        self.returned
    }

    /// Whether the frame uses a 29-bit extended identifier.
    pub fn is_extended(&self) -> bool {
        matches!(self.id, Id::Extended(_))
    }

    /// The payload.
    pub fn data(&self) -> &[u8] {
        &self.data[..self.dlen as usize]
    }

    /// The payload length in bytes.
    pub fn len(&self) -> usize {
        self.dlen as usize
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.dlen == 0
    }

    /// Packs the frame into a 16-byte record for the bulk OUT endpoint.
    pub fn to_record(&self) -> [u8; CAN_RECORD_SIZE] {
        let rir = match self.id {
            Id::Standard(id) => (id.as_raw() as u32) << 21,
            Id::Extended(id) => (id.as_raw() << 3) | RirFlags::EXTENDED.bits(),
        } | RirFlags::TRANSMIT.bits();
        let rdtr = self.dlen as u32 | ((self.bus as u32) << 4);

        let mut rec = [0u8; CAN_RECORD_SIZE];
        rec[0..4].copy_from_slice(&rir.to_le_bytes());
        rec[4..8].copy_from_slice(&rdtr.to_le_bytes());
        rec[8..].copy_from_slice(&self.data);
        rec
    }

    /// Unpacks a 16-byte record from the bulk IN endpoint.
    pub fn from_record(rec: &[u8]) -> Result<Self, ConstructionError> {
        if rec.len() < CAN_RECORD_SIZE {
            return Err(ConstructionError::TruncatedRecord);
        }
        let rir = u32::from_le_bytes(rec[0..4].try_into().unwrap());
        let rdtr = u32::from_le_bytes(rec[4..8].try_into().unwrap());

        let flags = RirFlags::from_bits_truncate(rir);
        let id = if flags.contains(RirFlags::EXTENDED) {
            id_from_raw((rir >> 3) & EFF_MASK, true)
        } else {
            id_from_raw((rir >> 21) & SFF_MASK, false)
        }
        .ok_or(ConstructionError::IdOutOfRange)?;

        let dlen = (rdtr & 0xf) as u8;
        if dlen as usize > CAN_MAX_DLEN {
            return Err(ConstructionError::TooMuchData);
        }
        let bus_field = ((rdtr >> 4) & 0xff) as u8;

        let mut data = [0u8; CAN_MAX_DLEN];
        data.copy_from_slice(&rec[8..CAN_RECORD_SIZE]);

        Ok(Self {
            id,
            bus: bus_field & !BUS_RETURNED_FLAG,
            returned: bus_field & BUS_RETURNED_FLAG != 0,
            dlen,
            data,
        })
    }
}

impl EmbeddedFrame for CanFrame {
    /// Creates a frame on bus 0.
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        Self::new(id, data, 0).ok()
    }

    /// Remote frames are not part of the panda wire protocol.
    fn new_remote(_id: impl Into<Id>, _dlc: usize) -> Option<Self> {
        None
    }

    fn is_extended(&self) -> bool {
        self.is_extended()
    }

    fn is_remote_frame(&self) -> bool {
        false
    }

    fn id(&self) -> Id {
        self.id
    }

    fn dlc(&self) -> usize {
        self.dlen as usize
    }

    fn data(&self) -> &[u8] {
        self.data()
    }
}

impl fmt::Display for CanFrame {
    /// Human-readable line, as printed by the sniffer:
    /// `bus 3 1AA [8] AA AA AA AA AA AA AA AA`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bus {} {:X} [{}] {}",
            self.bus,
            self.raw_id(),
            self.len(),
            self.data().iter().map(|b| format!("{:02X}", b)).join(" ")
        )?;
        if self.returned {
            f.write_str(" (returned)")?;
        }
        Ok(())
    }
}

impl fmt::UpperHex for CanFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}#", self.raw_id())?;
        let mut parts = self.data().iter().map(|v| format!("{:02X}", v));
        write!(f, "{}", parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STD_ID: u32 = 0x1aa;
    const EXT_ID: u32 = 0x18db33f1;
    const DATA: &[u8] = &[0xaa; 8];

    #[test]
    fn test_roundtrip_standard() {
        let frame = CanFrame::new(StandardId::new(STD_ID as u16).unwrap(), DATA, 3).unwrap();
        let rec = frame.to_record();

        let back = CanFrame::from_record(&rec).unwrap();
        assert_eq!(back.raw_id(), STD_ID);
        assert!(!back.is_extended());
        assert_eq!(back.bus(), 3);
        assert!(!back.is_returned());
        assert_eq!(back.data(), DATA);
    }

    #[test]
    fn test_roundtrip_extended() {
        let frame = CanFrame::new(ExtendedId::new(EXT_ID).unwrap(), &DATA[..4], 1).unwrap();
        let rec = frame.to_record();

        // EXTENDED flag must be on the wire word.
        let rir = u32::from_le_bytes(rec[0..4].try_into().unwrap());
        assert!(RirFlags::from_bits_truncate(rir).contains(RirFlags::EXTENDED));

        let back = CanFrame::from_record(&rec).unwrap();
        assert_eq!(back.raw_id(), EXT_ID);
        assert!(back.is_extended());
        assert_eq!(back.bus(), 1);
        assert_eq!(back.data(), &DATA[..4]);
    }

    #[test]
    fn test_transmit_flag_set_on_outgoing() {
        let frame = CanFrame::new(StandardId::new(0x100).unwrap(), &[], 0).unwrap();
        let rir = u32::from_le_bytes(frame.to_record()[0..4].try_into().unwrap());
        assert!(RirFlags::from_bits_truncate(rir).contains(RirFlags::TRANSMIT));
    }

    #[test]
    fn test_returned_marker() {
        let frame = CanFrame::new(StandardId::new(STD_ID as u16).unwrap(), DATA, 3).unwrap();
        let mut rec = frame.to_record();
        // Patch the bus field the way the device marks tx echoes.
        let rdtr = u32::from_le_bytes(rec[4..8].try_into().unwrap());
        let rdtr = rdtr | ((BUS_RETURNED_FLAG as u32) << 4);
        rec[4..8].copy_from_slice(&rdtr.to_le_bytes());

        let back = CanFrame::from_record(&rec).unwrap();
        assert!(back.is_returned());
        assert_eq!(back.bus(), 3);
    }

    #[test]
    fn test_too_much_data() {
        let id = StandardId::new(0x100).unwrap();
        assert_eq!(
            CanFrame::new(id, &[0u8; 9], 0),
            Err(ConstructionError::TooMuchData)
        );
    }

    #[test]
    fn test_truncated_record() {
        assert_eq!(
            CanFrame::from_record(&[0u8; 12]),
            Err(ConstructionError::TruncatedRecord)
        );
    }

    #[test]
    fn test_display() {
        let frame = CanFrame::new(StandardId::new(STD_ID as u16).unwrap(), &[0xde, 0xad], 2).unwrap();
        assert_eq!(frame.to_string(), "bus 2 1AA [2] DE AD");
        assert_eq!(format!("{:X}", frame), "1AA#DE AD");
    }
}
