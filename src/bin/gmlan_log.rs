// pandacan/src/bin/gmlan_log.rs

//! Record all CAN traffic to a CSV file in silent mode.
//!
//! Enables GMLAN addressing, puts the device in silent (receive-only)
//! safety mode, and writes one CSV row per received frame. A one-line
//! per-bus count summary is redrawn in place after every batch; the final
//! counts are printed on Ctrl-C, after the log file is flushed.

use anyhow::Result;
use clap::Parser;
use pandacan::{dump, BusStats, GmlanBus, Panda, SafetyMode};
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Output CSV file
    #[arg(short, long, default_value = "output.csv")]
    output: PathBuf,

    /// GMLAN sub-bus to enable: 2 (CAN2) or 3 (CAN3)
    #[arg(long, default_value_t = 3)]
    gmlan: u8,
}

/// The receive loop. `Ok(())` means the user asked to stop.
fn log_frames<W: std::io::Write>(
    panda: &Panda,
    wtr: &mut dump::Writer<W>,
    stop: &AtomicBool,
    stats: &mut BusStats,
) -> Result<()> {
    let mut stdout = std::io::stdout();

    while !stop.load(Ordering::Relaxed) {
        for frame in panda.can_recv()? {
            wtr.write_frame(&frame)?;
            if !stats.record(frame.bus()) {
                // Keep the warning off the redraw line.
                println!();
                log::warn!("frame with unexpected bus id {}", frame.bus());
            }
            print!("\rMessage Counts... {}", stats);
            stdout.flush()?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let gmlan = match args.gmlan {
        2 => GmlanBus::Can2,
        3 => GmlanBus::Can3,
        n => anyhow::bail!("GMLAN can only be routed onto bus 2 or 3, not {}", n),
    };

    let panda = Panda::new()?;
    panda.set_gmlan(Some(gmlan))?;
    panda.set_safety_mode(SafetyMode::Silent)?;

    let mut wtr = dump::Writer::create(&args.output)?;
    println!(
        "Writing csv file {}. Press Ctrl-C to exit...\n",
        args.output.display()
    );

    let stop = Arc::new(AtomicBool::new(false));
    let signal_stop = stop.clone();
    ctrlc::set_handler(move || {
        signal_stop.store(true, Ordering::Relaxed);
    })?;

    let mut stats = BusStats::new();
    let res = log_frames(&panda, &mut wtr, &stop, &mut stats);

    wtr.flush()?;
    println!("\nNow exiting. Final message Counts... {}", stats);
    log::info!("wrote {} rows to {}", wtr.rows(), args.output.display());

    res
}
