// pandacan/src/constants.rs
//
// USB protocol constants for the comma.ai panda CAN interface.
//
// This file is part of the Rust 'pandacan' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! Constants of the panda USB protocol.
//!
//! The panda enumerates as a vendor-class USB device. Configuration is done
//! with vendor control transfers on endpoint 0; CAN traffic moves as packed
//! 16-byte records over a pair of bulk endpoints.

/// USB vendor ID of the panda.
pub const PANDA_VID: u16 = 0xbbaa;

/// USB product ID of the panda application firmware.
pub const PANDA_PID: u16 = 0xddcc;

/// USB product ID of the panda bootstub.
pub const PANDA_PID_BOOTSTUB: u16 = 0xddee;

/// Bulk IN endpoint delivering received CAN records.
pub const ENDPOINT_CAN_IN: u8 = 0x81;

/// Bulk OUT endpoint accepting CAN records to transmit.
pub const ENDPOINT_CAN_OUT: u8 = 0x03;

// Vendor control request codes, from the panda firmware's USB handler.

/// Set ESP/GPS power (wValue = 0/1).
pub const REQUEST_ESP_POWER: u8 = 0xd9;

/// Enable/disable GMLAN or the OBD-II harness multiplexing
/// (wValue = enable, wIndex = bus).
pub const REQUEST_GMLAN: u8 = 0xdb;

/// Set the safety mode (wValue = mode).
pub const REQUEST_SAFETY_MODE: u8 = 0xdc;

/// Set a bus bit rate (wValue = bus, wIndex = speed in units of 100 bps).
pub const REQUEST_CAN_SPEED: u8 = 0xde;

/// Enable/disable CAN loopback mode (wValue = 0/1).
pub const REQUEST_CAN_LOOPBACK: u8 = 0xe5;

/// Read the hardware type (1 byte back).
pub const REQUEST_HW_TYPE: u8 = 0xc1;

/// Number of buses the hardware exposes. Frames carry bus ids 0..=3;
/// anything else coming back from the device is bogus.
pub const NUM_BUSES: u8 = 4;

/// Marker OR'd into the bus field of a received record when the record is
/// the transmit echo of a frame this host sent.
pub const BUS_RETURNED_FLAG: u8 = 0x80;

/// Size of one packed CAN record on the bulk endpoints.
pub const CAN_RECORD_SIZE: usize = 16;

/// Most records the device returns in a single bulk read.
pub const MAX_RECORDS_PER_READ: usize = 256;

/// Most records the firmware accepts in a single bulk write.
pub const MAX_RECORDS_PER_WRITE: usize = 16;

/// Maximum payload of a classic CAN frame.
pub const CAN_MAX_DLEN: usize = 8;

/// Largest valid 11-bit CAN identifier.
pub const SFF_MASK: u32 = 0x0000_07ff;

/// Largest valid 29-bit CAN identifier.
pub const EFF_MASK: u32 = 0x1fff_ffff;

/// Wall-clock bit cost of one classic CAN data frame with a full 8-byte
/// payload, ignoring bit stuffing: SOF + 11 id + RTR + IDE + r0 + 4 DLC +
/// 64 data + 15 CRC + CRC delimiter + ACK + ACK delimiter + 7 EOF.
pub const CAN_FRAME_BITS: u32 = 1 + 11 + 1 + 1 + 1 + 4 + 8 * 8 + 15 + 1 + 1 + 1 + 7;
