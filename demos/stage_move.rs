// Stage motion example
//
// Homes the stage if needed, then moves it to an absolute position or by a
// relative step and reports where it ended up.

use clap::Parser;
use conexcc_rs::{AxisConfig, ConexAxis, SerialSettings, SerialTransport, StateCategory, SystemClock};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "stage_move")]
#[command(version = "1.0")]
#[command(about = "Move a CONEX-CC stage")]
struct Args {
    /// Serial port of the controller
    port: String,

    /// Target position in micrometers
    #[arg(short, long, conflicts_with = "step", help = "Absolute target in um")]
    to: Option<f64>,

    /// Relative step in micrometers
    #[arg(short, long, allow_hyphen_values = true, help = "Relative step in um")]
    step: Option<f64>,

    #[arg(long, default_value_t = 921_600, help = "Baud rate of the virtual COM port")]
    baud: u32,

    #[arg(long, default_value_t = 0.4, help = "Velocity in mm/s (clamped to the hardware maximum)")]
    velocity: f64,

    #[arg(long, default_value_t = 30, help = "Timeout per attempt in seconds")]
    timeout: u64,

    #[arg(long, default_value_t = 3, help = "Retries for homing and absolute moves")]
    retries: u32,

    /// Re-home and come back to the current position instead of moving
    #[arg(long, conflicts_with_all = ["to", "step"])]
    rehome: bool,

    /// Enable verbose logging
    #[arg(short, long, help = "Show debug information and detailed logs")]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::init();
    }

    let timeout = Duration::from_secs(args.timeout);
    let settings = SerialSettings::conex_cc().with_baud_rate(args.baud);
    let transport = SerialTransport::open(&args.port, &settings)?;
    let mut axis = ConexAxis::new(transport, SystemClock, AxisConfig::default(), args.velocity)?;

    let state = axis.state()?;
    println!("Controller state: {}", state);
    match state.category() {
        StateCategory::NotReferenced => {
            println!("Stage is not referenced, homing...");
            axis.init_position_sync(timeout, args.retries)?;
        }
        StateCategory::Disable => {
            println!("Stage is disabled, enabling...");
            axis.enable()?;
        }
        _ => {}
    }

    if args.rehome {
        axis.init_position_and_come_back()?;
    } else if let Some(target) = args.to {
        axis.move_absolute_sync(target, timeout, args.retries)?;
    } else if let Some(step) = args.step {
        axis.move_relative_sync(step, timeout)?;
    }

    println!("Position: {:.1} um", axis.current_position()?);
    axis.close()?;
    Ok(())
}
