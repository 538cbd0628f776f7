// Basic device discovery and connection example
//
// This example shows how to discover CONEX-CC controllers and inspect the stage.

use conexcc_rs::ConexConnector;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (optional)
    env_logger::init();

    println!("CONEX-CC Device Discovery Example");
    println!("=================================\n");

    // Method 1: List all USB serial ports
    println!("1. Discovering USB serial ports...");
    let devices = ConexConnector::get_available_ports()?;

    if devices.is_empty() {
        println!("No USB serial ports found. Please connect a controller and try again.");
        return Ok(());
    }

    println!("Found {} port(s):", devices.len());
    for (i, device) in devices.iter().enumerate() {
        let product = device.product.as_deref().unwrap_or("unknown product");
        println!("  {}. {} ({})", i + 1, device.port, product);
    }
    println!();

    // Method 2: Connect to the first port that identifies as a CONEX-CC
    println!("2. Probing ports for a CONEX-CC...");
    let mut axis = ConexConnector::connect(None, 0.2)?;
    println!("Successfully connected!");

    // Method 3: Basic stage information
    println!("\n3. Stage information:");
    let report = axis.state_and_error()?;
    println!("  State:          {}", report.state);
    if report.error.is_empty() {
        println!("  Positioner:     no fault");
    } else {
        println!("  Positioner:     {:?}", report.error.descriptions());
    }
    println!("  Position:       {:.1} um", axis.current_position()?);
    println!("  Velocity:       {:.3} mm/s", axis.velocity()?);
    println!(
        "  Software range: {:.3} .. {:.3} mm",
        axis.min_limit(),
        axis.max_limit()
    );

    // Closing does not stop a running motion
    axis.close()?;
    println!("\n4. Connection test completed successfully!");

    Ok(())
}
