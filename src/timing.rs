// pandacan/src/timing.rs
//
// Throughput accounting for the loopback self-test.
//
// This file is part of the Rust 'pandacan' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! Effective-throughput math for the loopback self-test.
//!
//! The estimate charges every frame the full bit cost of a classic CAN data
//! frame with an 8-byte payload ([`CAN_FRAME_BITS`]) and divides by wall
//! time. Bit stuffing is deliberately not modeled; the measurement is
//! checked against a 80%–100% band of the nominal rate, which absorbs the
//! approximation and the hardware's real timing jitter. Don't tighten the
//! band.

use crate::{constants::CAN_FRAME_BITS, frame::CanFrame};
use std::time::Duration;

/// Effective throughput in kbps for `count` full frames moved in `elapsed`.
pub fn effective_kbps(count: u32, elapsed: Duration) -> f64 {
    let ms = elapsed.as_secs_f64() * 1000.0;
    f64::from(CAN_FRAME_BITS) * f64::from(count) / ms
}

/// Whether a measured rate lands in the accepted band below a nominal rate.
///
/// The band is open on both ends: a bus can't beat its own nominal rate,
/// and below 80% something is wrong with the configuration or the wiring.
pub fn within_tolerance(measured_kbps: f64, nominal_kbps: f64) -> bool {
    0.8 * nominal_kbps < measured_kbps && measured_kbps < nominal_kbps
}

/// Splits a collected batch into (tx echoes, loopback receptions) for the
/// given bus.
///
/// In loopback mode every transmitted frame is seen twice: once as the
/// device's echo of our own transmission (marked returned) and once through
/// the loopback receive path (plain bus id). Traffic on other buses is
/// ignored.
pub fn split_loopback(frames: &[CanFrame], bus: u8) -> (Vec<CanFrame>, Vec<CanFrame>) {
    frames
        .iter()
        .copied()
        .filter(|f| f.bus() == bus)
        .partition(|f| f.is_returned())
}
