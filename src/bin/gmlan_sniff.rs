// pandacan/src/bin/gmlan_sniff.rs

//! Watch one GMLAN sub-bus and tally traffic per bus.
//!
//! Picks the monitored sub-bus from the hardware revision: white/grey
//! pandas reroute GMLAN onto the CAN3 transceiver, newer boards reach it
//! through the OBD-II harness on bus 1. Frames on the monitored bus are
//! printed as they arrive; every few thousand frames a sorted per-bus
//! count snapshot goes out, and a final snapshot is printed on Ctrl-C or
//! on a fault.

use anyhow::Result;
use clap::Parser;
use pandacan::{BusStats, Error, GmlanBus, Panda, SafetyMode};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Sub-bus GMLAN lands on for white/grey hardware.
const WHITE_GMLAN_BUS: u8 = 3;
/// Sub-bus GMLAN lands on through the OBD-II harness.
const OTHER_GMLAN_BUS: u8 = 1;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Monitor this bus instead of the one picked by hardware detection
    #[arg(long)]
    bus: Option<u8>,

    /// Print a stats snapshot every this many frames
    #[arg(long, default_value_t = 5000)]
    stats_every: u64,
}

fn print_stats(heading: &str, stats: &BusStats) {
    println!("{}", heading);
    for (bus, count) in stats.snapshot() {
        println!("Bus: {}, Count: {}", bus, count);
    }
}

/// The receive loop. Returns `Ok(())` on a requested stop, `Err` on a
/// device fault; the caller prints final stats either way.
fn watch(
    panda: &Panda,
    bus: u8,
    stats_every: u64,
    stop: &AtomicBool,
    stats: &mut BusStats,
) -> pandacan::Result<()> {
    let mut seen: u64 = 0;

    while !stop.load(Ordering::Relaxed) {
        let frames = panda.can_recv()?;
        if frames.is_empty() {
            continue;
        }
        for frame in frames {
            stats.record(frame.bus());
            if frame.bus() == bus {
                println!("{}", frame);
            }
            seen += 1;
            if seen % stats_every == 0 {
                print_stats("STATS:", stats);
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let panda = match Panda::new() {
        Ok(panda) => panda,
        Err(err @ Error::NotFound) => {
            println!("{}", err);
            process::exit(1);
        }
        Err(err) => return Err(err.into()),
    };

    panda.set_safety_mode(SafetyMode::AllOutput)?;

    let bus = if panda.is_white()? || panda.is_grey()? {
        println!("White/grey panda: routing GMLAN onto CAN3");
        panda.set_gmlan(Some(GmlanBus::Can3))?;
        WHITE_GMLAN_BUS
    } else {
        println!("Black panda (or newer): using the OBD-II harness");
        panda.set_obd(true)?;
        OTHER_GMLAN_BUS
    };
    let bus = args.bus.unwrap_or(bus);

    let stop = Arc::new(AtomicBool::new(false));
    let signal_stop = stop.clone();
    ctrlc::set_handler(move || {
        signal_stop.store(true, Ordering::Relaxed);
    })?;

    let mut stats = BusStats::new();
    let res = watch(&panda, bus, args.stats_every, &stop, &mut stats);

    println!();
    print_stats("FINAL STATS:", &stats);

    res.map_err(Into::into)
}
