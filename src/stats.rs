// pandacan/src/stats.rs
//
// Per-bus frame counters for the diagnostic tools.
//
// This file is part of the Rust 'pandacan' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! Per-bus frame counters.
//!
//! A [`BusStats`] is the explicit state object the receive loops thread
//! through; there is no global counter anywhere. Counts only ever go up,
//! and only for the hardware's real buses 0..=3.

use crate::constants::NUM_BUSES;
use std::collections::BTreeMap;
use std::fmt;

/// Running per-bus frame counts.
#[derive(Debug, Default, Clone)]
pub struct BusStats {
    counts: BTreeMap<u8, u64>,
}

impl BusStats {
    /// Creates an empty counter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one frame on the given bus.
    ///
    /// Returns `false` without counting when the bus id is outside the
    /// hardware's 0..=3 range; the caller decides how loudly to complain.
    pub fn record(&mut self, bus: u8) -> bool {
        if bus >= NUM_BUSES {
            return false;
        }
        *self.counts.entry(bus).or_insert(0) += 1;
        true
    }

    /// The count for one bus. Buses never seen report zero.
    pub fn count(&self, bus: u8) -> u64 {
        self.counts.get(&bus).copied().unwrap_or(0)
    }

    /// Total frames counted across all buses.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// The observed buses and their counts, in ascending bus order.
    pub fn snapshot(&self) -> Vec<(u8, u64)> {
        self.counts.iter().map(|(&bus, &n)| (bus, n)).collect()
    }

    /// Whether nothing has been counted yet.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl fmt::Display for BusStats {
    /// Fixed-width single line over all four buses, for in-place redraws:
    /// `Bus 0: 17 Bus 1: 0 Bus 2: 4 Bus 3: 1289`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bus in 0..NUM_BUSES {
            if bus > 0 {
                f.write_str(" ")?;
            }
            write!(f, "Bus {}: {}", bus, self.count(bus))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_matches_sum() {
        let mut stats = BusStats::new();
        for bus in [0u8, 1, 3, 3, 3, 0, 2] {
            assert!(stats.record(bus));
        }
        assert_eq!(stats.total(), 7);
        assert_eq!(stats.count(0), 2);
        assert_eq!(stats.count(1), 1);
        assert_eq!(stats.count(2), 1);
        assert_eq!(stats.count(3), 3);
        assert_eq!(
            stats.snapshot(),
            vec![(0, 2), (1, 1), (2, 1), (3, 3)]
        );
    }

    #[test]
    fn test_out_of_range_bus_not_counted() {
        let mut stats = BusStats::new();
        assert!(!stats.record(7));
        assert!(!stats.record(0x83));
        assert_eq!(stats.total(), 0);
        assert!(stats.is_empty());
    }

    #[test]
    fn test_display_covers_all_buses() {
        let mut stats = BusStats::new();
        stats.record(3);
        stats.record(3);
        assert_eq!(stats.to_string(), "Bus 0: 0 Bus 1: 0 Bus 2: 0 Bus 3: 2");
    }
}
