// pandacan/src/lib.rs
//
// The main lib file for the Rust 'pandacan' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! panda CAN interface support.
//!
//! The [panda](https://github.com/commaai/panda) is a USB CAN interface
//! with multiple transceivers, one of which can be rerouted onto GMLAN,
//! GM's single-wire CAN variant that runs at 33.3 kbps. This crate talks to
//! the device from the host side: vendor control transfers configure safety
//! mode, bus speeds, GMLAN routing and loopback; bulk transfers move CAN
//! frames in batches of packed 16-byte records.
//!
//! # Safety modes
//!
//! The firmware gates transmission. In silent mode the interface only
//! observes; in all-output mode anything goes out. The mode must be set
//! before a send/receive loop is entered, along with bus speeds and any
//! GMLAN/loopback routing.
//!
//! # Diagnostic tools
//!
//! With the default `utils` feature, three small binaries are built on top
//! of the library:
//!
//! - `gmlan-sniff` — watch one GMLAN sub-bus and tally traffic per bus
//! - `gmlan-log` — record all traffic to a CSV file in silent mode
//! - `gmlan-test` — loopback throughput self-test against nominal rates
//!
//! # Example
//!
//! ```no_run
//! use pandacan::{CanFrame, Panda, SafetyMode, StandardId};
//!
//! fn main() -> pandacan::Result<()> {
//!     let panda = Panda::new()?;
//!     panda.set_safety_mode(SafetyMode::AllOutput)?;
//!     panda.set_can_speed_kbps(0, 500.0)?;
//!
//!     let frame = CanFrame::new(StandardId::new(0x1aa).unwrap(), &[0xaa; 8], 0)?;
//!     panda.can_send(frame)?;
//!
//!     for frame in panda.can_recv()? {
//!         println!("{}", frame);
//!     }
//!     Ok(())
//! }
//! ```

// Re-export the embedded-can types used in the public API.
pub use embedded_can::{
    ExtendedId, Frame as EmbeddedFrame, Id, StandardId,
};

pub mod constants;

pub mod errors;
pub use errors::{ConstructionError, Error, Result};

pub mod frame;
pub use frame::{CanFrame, RirFlags};

pub mod device;
pub use device::{GmlanBus, HwType, Panda, SafetyMode};

pub mod stats;
pub use stats::BusStats;

pub mod dump;

pub mod timing;
