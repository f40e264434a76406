// Keyboard stand-in for the gamepad poller: WASD drive X/Y, arrow keys
// drive RX/RY, R/F change deflection, Q quit.
//
// Publishes the same axis-sample messages a real pad poller would, so the
// runtime cannot tell the difference.
//
// Usage: cargo run --example key_teleop

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::time::{Duration, Instant};
use tracing::info;

use picomotor_zenoh_runtime::config::TOPIC_AXIS;
use picomotor_zenoh_runtime::messages::{Axis, AxisSample};

// Deflection tiers as raw axis values (fractions of full scale 32768)
const DEFLECTIONS: [i32; 3] = [8192, 19661, 32768];
const INPUT_TIMEOUT_MS: u64 = 150; // Recenter axes after this much time with no input

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let publisher = session.declare_publisher(TOPIC_AXIS).await?;

    info!("Controls: WASD=left stick, arrows=right stick, R/F=deflection, Q=quit");
    info!("Deflection: LOW");

    enable_raw_mode()?;
    let result = run_teleop(&publisher).await;
    disable_raw_mode()?;

    result
}

async fn run_teleop(
    publisher: &zenoh::pubsub::Publisher<'_>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut tier: usize = 0;

    // Persistent raw deflections, one per axis
    let mut raw = [0i32; 4];
    let mut published = [i32::MIN; 4];
    let mut last_movement_input = Instant::now();

    loop {
        // Poll for key with 20ms timeout (50Hz effective rate)
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;
                let deflection = DEFLECTIONS[tier];

                let mut moved = true;
                match code {
                    KeyCode::Char('d') if pressed => raw[0] = deflection,
                    KeyCode::Char('a') if pressed => raw[0] = -deflection,
                    KeyCode::Char('w') if pressed => raw[1] = deflection,
                    KeyCode::Char('s') if pressed => raw[1] = -deflection,
                    KeyCode::Right if pressed => raw[2] = deflection,
                    KeyCode::Left if pressed => raw[2] = -deflection,
                    KeyCode::Up if pressed => raw[3] = deflection,
                    KeyCode::Down if pressed => raw[3] = -deflection,

                    KeyCode::Char('r') if pressed => {
                        tier = (tier + 1).min(2);
                        print_tier(tier);
                        moved = false;
                    }
                    KeyCode::Char('f') if pressed => {
                        tier = tier.saturating_sub(1);
                        print_tier(tier);
                        moved = false;
                    }

                    KeyCode::Char('q') | KeyCode::Esc if pressed => break,

                    _ => moved = false,
                }
                if moved {
                    last_movement_input = Instant::now();
                }
            }
        }

        // Recenter everything if the keys went quiet
        if last_movement_input.elapsed() > Duration::from_millis(INPUT_TIMEOUT_MS) {
            raw = [0; 4];
        }

        // Publish only what changed, like a real pad's event stream
        for (slot, axis) in Axis::ALL.iter().enumerate() {
            if raw[slot] != published[slot] {
                let sample = AxisSample {
                    axis: *axis,
                    raw: raw[slot],
                };
                publisher.put(serde_json::to_string(&sample)?).await?;
                published[slot] = raw[slot];
            }
        }
    }

    Ok(())
}

fn print_tier(tier: usize) {
    let label = ["LOW", "MED", "HIGH"][tier];
    info!("Deflection: {}", label);
}
