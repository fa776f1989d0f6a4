// pandacan/src/errors.rs
//
// Error types for the Rust panda CAN interface library.
//
// This file is part of the Rust 'pandacan' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! Errors for the panda driver.
//!
//! Everything the library can fail on funnels into [`Error`]. USB transport
//! problems are passed through from `rusb`; malformed wire records and bad
//! caller arguments get their own variants so the tools can tell a dead
//! device apart from their own misuse.

use thiserror::Error;

/// A result holding the composite `pandacan` error.
pub type Result<T> = std::result::Result<T, Error>;

/// Composite error for the panda library.
#[derive(Debug, Error)]
pub enum Error {
    /// No panda attached to the host.
    ///
    /// The message is the exact line the diagnostic tools print when they
    /// come up without hardware.
    #[error("Unable to find any attached Pandas")]
    NotFound,

    /// Error from the USB transport layer.
    #[error(transparent)]
    Usb(#[from] rusb::Error),

    /// Error building or decoding a CAN frame.
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    /// A bus number outside the hardware's 0..=3 range.
    #[error("invalid bus number: {0}")]
    InvalidBus(u8),

    /// A bit rate the device cannot be programmed with.
    #[error("bus speed out of range: {0} kbps")]
    InvalidSpeed(f32),
}

/// Error that occurs when creating or decoding CAN frames.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum ConstructionError {
    /// CAN ID was outside the range of valid IDs.
    #[error("CAN ID is out of range")]
    IdOutOfRange,

    /// More than 8 bytes of payload data were passed in.
    #[error("payload is larger than the CAN maximum of 8 bytes")]
    TooMuchData,

    /// A wire record was shorter than the fixed record size.
    #[error("truncated wire record")]
    TruncatedRecord,
}
