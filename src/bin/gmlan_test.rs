// pandacan/src/bin/gmlan_test.rs

//! Loopback throughput self-test.
//!
//! Puts the device in loopback mode, bursts a fixed number of frames at a
//! bus, and checks that every frame comes back twice (tx echo + loopback
//! reception) and that the effective throughput lands within 80%–100% of
//! the bus's nominal rate. Runs once on GMLAN at 33.3 kbps and once on a
//! plain CAN bus at 500 kbps.

use anyhow::{ensure, Result};
use clap::Parser;
use pandacan::{
    timing::{effective_kbps, split_loopback, within_tolerance},
    CanFrame, GmlanBus, Panda, SafetyMode, StandardId,
};
use std::time::{Duration, Instant};

/// Frames per burst.
const MSG_COUNT: u32 = 100;

/// Give up collecting the burst after this long.
const RECV_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Nominal rate of the plain CAN buses, in kbps
    #[arg(long, default_value_t = 500.0)]
    normal_speed: f32,

    /// Nominal rate of the GMLAN bus, in kbps
    #[arg(long, default_value_t = 33.3)]
    gmlan_speed: f32,
}

/// Bursts `MSG_COUNT` frames at a bus and measures the effective kbps from
/// the time it takes for all echoes and loopback receptions to come back.
fn time_many_sends(panda: &Panda, bus: u8) -> Result<f64> {
    let frame = CanFrame::new(StandardId::new(0x1aa).unwrap(), &[0xaa; 8], bus)?;
    let burst = vec![frame; MSG_COUNT as usize];

    let start = Instant::now();
    panda.can_send_many(&burst)?;

    let mut collected = Vec::new();
    while collected.len() < 2 * MSG_COUNT as usize && start.elapsed() < RECV_TIMEOUT {
        collected.extend(panda.can_recv()?);
    }
    let elapsed = start.elapsed();

    let (echo, looped) = split_loopback(&collected, bus);
    ensure!(
        echo.len() == MSG_COUNT as usize,
        "bus {}: expected {} tx echoes, got {}",
        bus,
        MSG_COUNT,
        echo.len()
    );
    ensure!(
        looped.len() == MSG_COUNT as usize,
        "bus {}: expected {} loopback frames, got {}",
        bus,
        MSG_COUNT,
        looped.len()
    );

    Ok(effective_kbps(MSG_COUNT, elapsed))
}

fn check_throughput(measured: f64, nominal: f32, what: &str) -> Result<()> {
    ensure!(
        within_tolerance(measured, f64::from(nominal)),
        "{}: measured {:.2} kbps outside 80%-100% of nominal {} kbps",
        what,
        measured,
        nominal
    );
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let panda = Panda::new()?;

    // The ESP shares the board's power budget; this test doesn't need it.
    panda.set_esp_power(false)?;

    panda.set_safety_mode(SafetyMode::AllOutput)?;
    panda.set_can_loopback(true)?;

    panda.set_can_speed_kbps(1, args.normal_speed)?;
    panda.set_can_speed_kbps(2, args.normal_speed)?;
    panda.set_can_speed_kbps(3, args.gmlan_speed)?;

    // GMLAN on the CAN3 transceiver, burst on bus 3.
    panda.set_gmlan(Some(GmlanBus::Can3))?;
    let gmlan_kbps = time_many_sends(&panda, 3)?;
    check_throughput(gmlan_kbps, args.gmlan_speed, "GMLAN")?;

    // GMLAN off again, burst on a plain CAN bus.
    panda.set_gmlan(None)?;
    let normal_kbps = time_many_sends(&panda, 2)?;
    check_throughput(normal_kbps, args.normal_speed, "CAN")?;

    println!(
        "GMLAN: {:.2} kbps vs CAN: {:.2} kbps",
        gmlan_kbps, normal_kbps
    );
    Ok(())
}
