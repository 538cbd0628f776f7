// Ethernet-to-serial bridge example
//
// Drives a stage whose controller sits behind a TCP serial converter and
// steps it through a list of positions.

use clap::Parser;
use conexcc_rs::{AxisConfig, ConexAxis, LanSettings, LanTransport, Motor, SystemClock};

#[derive(Parser)]
#[command(name = "lan_stage")]
#[command(version = "1.0")]
#[command(about = "Scan a CONEX-CC stage through a LAN serial bridge")]
struct Args {
    /// Host name or IP address of the bridge
    host: String,

    #[arg(long, default_value_t = LanSettings::DEFAULT_TCP_PORT)]
    tcp_port: u16,

    #[arg(long, default_value_t = 1, help = "Controller address")]
    address: u8,

    /// Positions to visit, in micrometers
    #[arg(required = true, num_args = 1..)]
    positions: Vec<f64>,
}

fn scan<M: Motor>(motor: &mut M, positions: &[f64]) -> Result<(), M::Error> {
    for &position in positions {
        motor.move_to(position)?;
        println!("Reached {:.1} um", motor.current_position()?);
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let settings = LanSettings::default().with_port(args.tcp_port);
    let transport = LanTransport::connect(&args.host, &settings)?;
    let config = AxisConfig::default().with_controller_address(args.address);
    let mut axis = ConexAxis::new(transport, SystemClock, config, AxisConfig::MAX_VELOCITY)?;

    if !axis.is_ready()? {
        axis.init_position_sync(axis.config().default_timeout, axis.config().default_retries)?;
    }
    scan(&mut axis, &args.positions)?;

    axis.close()?;
    Ok(())
}
