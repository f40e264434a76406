// Message types exchanged with the input poller and the control surface

use serde::{Deserialize, Serialize};

use crate::config::AXIS_RANGE;

/// Logical gamepad axes the runtime understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    X,
    Y,
    Rx,
    Ry,
}

impl Axis {
    pub const ALL: [Axis; 4] = [Axis::X, Axis::Y, Axis::Rx, Axis::Ry];

    pub(crate) fn slot(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Rx => 2,
            Axis::Ry => 3,
        }
    }
}

// One analog sample from the input poller -> runtime.
// Carries the raw hardware value; normalization happens on consumption.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AxisSample {
    pub axis: Axis,
    pub raw: i32,
}

impl AxisSample {
    /// Deflection normalized by the pad's full-scale magnitude. Not clamped;
    /// hardware occasionally reports past full scale and the velocity math
    /// follows it.
    pub fn value(&self) -> f32 {
        self.raw as f32 / AXIS_RANGE
    }
}

// Binding change from the control surface -> runtime.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BindingUpdate {
    pub axis: Axis,
    pub motor: u8,
    #[serde(default)]
    pub fine: bool,
}

/// Startup report published for the control surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerStatus {
    pub firmware: String,
    pub motors: Vec<String>,
}
