// Axis-to-motor pairing, adjustable from the control surface while the
// loop runs.

use crate::messages::Axis;
use crate::motor::MotorId;

/// One axis pairing: target motor plus the fine-tuning flag that scales the
/// commanded velocity down by a factor of ten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub motor: MotorId,
    pub fine: bool,
}

/// Pairings for all four axes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisBindings {
    slots: [Binding; 4],
}

impl Default for AxisBindings {
    /// The control panel's initial selection: left stick on motors 1/2 at
    /// full speed, right stick on the same motors with fine tuning.
    fn default() -> Self {
        let coarse = |motor| Binding { motor, fine: false };
        let fine = |motor| Binding { motor, fine: true };
        Self {
            slots: [
                coarse(MotorId::M1), // X
                coarse(MotorId::M2), // Y
                fine(MotorId::M1),   // RX
                fine(MotorId::M2),   // RY
            ],
        }
    }
}

impl AxisBindings {
    pub fn get(&self, axis: Axis) -> Binding {
        self.slots[axis.slot()]
    }

    pub fn set(&mut self, axis: Axis, binding: Binding) {
        self.slots[axis.slot()] = binding;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pairings() {
        let bindings = AxisBindings::default();
        assert_eq!(bindings.get(Axis::X).motor, MotorId::M1);
        assert!(!bindings.get(Axis::X).fine);
        assert_eq!(bindings.get(Axis::Y).motor, MotorId::M2);
        assert_eq!(bindings.get(Axis::Rx).motor, MotorId::M1);
        assert!(bindings.get(Axis::Rx).fine);
        assert!(bindings.get(Axis::Ry).fine);
    }

    #[test]
    fn test_set_overwrites_one_axis() {
        let mut bindings = AxisBindings::default();
        bindings.set(
            Axis::Y,
            Binding {
                motor: MotorId::M4,
                fine: true,
            },
        );
        assert_eq!(bindings.get(Axis::Y).motor, MotorId::M4);
        assert!(bindings.get(Axis::Y).fine);
        // others untouched
        assert_eq!(bindings.get(Axis::X).motor, MotorId::M1);
    }
}
