use clap::Parser;
use tracing_subscriber::EnvFilter;

use picomotor_zenoh_runtime::config;
use picomotor_zenoh_runtime::motor::channel::DEFAULT_BAUDRATE;
use picomotor_zenoh_runtime::runtime::{self, RunOptions};

/// Drive a New Focus picomotor controller from gamepad axis samples.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Serial device of the controller
    #[arg(long, default_value = config::DEFAULT_PORT)]
    port: String,

    /// Serial baud rate
    #[arg(long, default_value_t = DEFAULT_BAUDRATE)]
    baud: u32,

    /// Centered band treated as "stick released"
    #[arg(long, default_value_t = config::DEADZONE)]
    deadzone: f32,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init(); // installs the subscriber globally

    let args = Args::parse();
    let opts = RunOptions {
        port: args.port,
        baud: args.baud,
        deadzone: args.deadzone,
    };

    if let Err(e) = runtime::run(opts).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
