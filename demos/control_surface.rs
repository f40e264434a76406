// Command-line control surface: rebind an axis or stop everything, from
// another terminal while the runtime drives the controller.
//
// Usage: cargo run --example control_surface -- bind rx 3 --fine
//        cargo run --example control_surface -- stop

use clap::{Parser, Subcommand};
use tracing::info;

use picomotor_zenoh_runtime::config::{TOPIC_BINDING, TOPIC_STOP};
use picomotor_zenoh_runtime::messages::{Axis, BindingUpdate};

#[derive(Debug, Parser)]
#[command(about = "Control surface for the picomotor runtime")]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Rebind an axis (x, y, rx, ry) to a motor (1-4)
    Bind {
        axis: String,
        motor: u8,
        /// Scale this axis's velocity down by a factor of ten
        #[arg(long)]
        fine: bool,
    },
    /// Stop all motors
    Stop,
}

fn parse_axis(name: &str) -> Option<Axis> {
    match name.to_ascii_lowercase().as_str() {
        "x" => Some(Axis::X),
        "y" => Some(Axis::Y),
        "rx" => Some(Axis::Rx),
        "ry" => Some(Axis::Ry),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let cli = Cli::parse();
    let session = zenoh::open(zenoh::Config::default()).await?;

    match cli.command {
        Cmd::Bind { axis, motor, fine } => {
            let Some(axis) = parse_axis(&axis) else {
                eprintln!("Unknown axis {:?} (expected x, y, rx or ry)", axis);
                std::process::exit(2);
            };
            let update = BindingUpdate { axis, motor, fine };
            let publisher = session.declare_publisher(TOPIC_BINDING).await?;
            publisher.put(serde_json::to_string(&update)?).await?;
            info!("Published {:?}", update);
        }
        Cmd::Stop => {
            let publisher = session.declare_publisher(TOPIC_STOP).await?;
            publisher.put("stop").await?;
            info!("Published global stop");
        }
    }

    Ok(())
}
