// Topics, input scaling, teleop tuning constants

// Zenoh topics
pub const TOPIC_AXIS: &str = "picomotor/cmd/axis"; // gamepad samples
pub const TOPIC_BINDING: &str = "picomotor/cmd/binding"; // axis-to-motor changes
pub const TOPIC_STOP: &str = "picomotor/cmd/stop"; // global stop
pub const TOPIC_STATUS: &str = "picomotor/state/status"; // startup report

/// Full-scale magnitude one gamepad axis reports; raw samples are divided by
/// this to land in [-1, 1].
pub const AXIS_RANGE: f32 = 32768.0;

/// Velocity ceiling (steps/s) of the 8821-L motors this rig drives.
pub const MAX_VELOCITY: f32 = 2000.0;

/// Velocity multiplier while fine tuning is enabled on an axis.
pub const FINE_FACTOR: f32 = 0.1;

/// Centered band treated as "stick released".
pub const DEADZONE: f32 = 0.01;

/// Wider band for worn sticks that don't return to rest cleanly.
pub const DEADZONE_WIDE: f32 = 0.05;

/// Serial device of the controller
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";
