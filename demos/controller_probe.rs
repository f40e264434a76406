// Controller probe: survey what is attached before running teleop.
//
// Queries only (firmware, per-channel classification, motion state); the
// driver issues one global stop when it closes the port.
//
// Usage: cargo run --example controller_probe -- [port]
// Example: cargo run --example controller_probe -- /dev/ttyUSB0

use picomotor_zenoh_runtime::config::DEFAULT_PORT;
use picomotor_zenoh_runtime::motor::{MotorId, PicomotorDriver, SerialChannel};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("debug".parse().unwrap()),
        )
        .init();

    // Get port from args or use default
    let port = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_PORT.to_string());

    println!("Picomotor controller probe");
    println!("Serial port: {}", port);
    println!();

    println!("Step 1: Opening serial port...");
    let channel = match SerialChannel::open(&port) {
        Ok(channel) => {
            println!("  ✓ Serial port opened");
            channel
        }
        Err(e) => {
            println!("  ✗ Failed to open serial port: {}", e);
            println!();
            println!("Troubleshooting:");
            println!("  - Check the port path is correct");
            println!("  - Verify the USB cable is connected");
            println!("  - Check your user can read/write the device node");
            return Err(e.into());
        }
    };
    let mut driver = PicomotorDriver::new(channel);
    println!();

    println!("Step 2: Identifying controller...");
    match driver.firmware_version() {
        Ok(firmware) => println!("  ✓ {}", firmware),
        Err(e) => {
            println!("  ✗ No answer to version query: {}", e);
            return Err(e.into());
        }
    }
    println!();

    println!("Step 3: Classifying motors...");
    match driver.survey_motors() {
        Ok(found) => {
            for motor in MotorId::ALL {
                println!("  Motor {}: {}", motor, found[motor.get() as usize - 1]);
            }
        }
        Err(e) => println!("  ✗ Survey failed: {}", e),
    }
    println!();

    println!("Step 4: Motion state...");
    for motor in MotorId::ALL {
        match driver.motion_done(motor) {
            Ok(true) => println!("  Motor {}: idle", motor),
            Ok(false) => println!("  Motor {}: MOVING", motor),
            Err(e) => println!("  Motor {}: ERROR - {}", motor, e),
        }
    }
    println!();

    println!("Probe complete. Next step: cargo run -- --port {}", port);

    Ok(())
}
