// Event-driven teleoperation loop
//
// One consumer drains gamepad samples and control-surface messages and is the
// only writer on the controller channel; the protocol is strict request/reply
// and a second command must never be written before a pending query's reply
// has been read.

use tracing::{info, warn};

use crate::bindings::{AxisBindings, Binding};
use crate::config::{
    FINE_FACTOR, MAX_VELOCITY, TOPIC_AXIS, TOPIC_BINDING, TOPIC_STATUS, TOPIC_STOP,
};
use crate::messages::{AxisSample, BindingUpdate, ControllerStatus};
use crate::motor::{
    DeviceChannel, Direction, MotorId, PicomotorDriver, Result, SerialChannel,
};

pub struct ControlLoop<C: DeviceChannel> {
    driver: PicomotorDriver<C>,
    bindings: AxisBindings,
    // One motion marker per motor: set once a move command has gone out for
    // the current out-of-deadzone deflection, cleared when the axis
    // re-centers. Suppresses repeated move-starts on an already-moving motor.
    markers: [bool; 4],
    deadzone: f32,
}

impl<C: DeviceChannel> ControlLoop<C> {
    pub fn new(driver: PicomotorDriver<C>, bindings: AxisBindings, deadzone: f32) -> Self {
        Self {
            driver,
            bindings,
            markers: [false; 4],
            deadzone,
        }
    }

    /// Bring the controller to a known state: identify the firmware,
    /// classify the motor on each channel, then stop everything.
    pub fn startup(&mut self) -> Result<ControllerStatus> {
        let firmware = self.driver.firmware_version()?;
        info!("Connected to {}", firmware);

        let motors = self.driver.survey_motors()?;
        self.driver.stop_all()?;

        Ok(ControllerStatus {
            firmware,
            motors: motors.iter().map(|m| m.to_string()).collect(),
        })
    }

    /// Process one analog sample for its bound motor.
    ///
    /// Centered: stop the motor and close the deflection episode. Deflected:
    /// refresh the velocity every sample, and start a move only when the
    /// motor reports its last motion finished and no move has been issued for
    /// this episode yet.
    pub fn handle_sample(&mut self, sample: AxisSample) -> Result<()> {
        let value = sample.value();
        let Binding { motor, fine } = self.bindings.get(sample.axis);

        if value.abs() < self.deadzone {
            self.driver.stop(motor)?;
            self.markers[motor.slot()] = false;
            return Ok(());
        }

        let scale = if fine { FINE_FACTOR } else { 1.0 };
        let velocity = (MAX_VELOCITY * value.abs() * scale).round() as u32;
        self.driver.set_velocity(motor, velocity)?;

        if self.driver.motion_done(motor)? && !self.markers[motor.slot()] {
            self.driver.start_motion(motor, Direction::from_value(value))?;
            self.markers[motor.slot()] = true;
        }
        Ok(())
    }

    /// Apply a binding change from the control surface.
    pub fn apply_binding(&mut self, update: BindingUpdate) {
        match MotorId::new(update.motor) {
            Some(motor) => {
                info!(
                    "Binding {:?} -> motor {} (fine: {})",
                    update.axis, motor, update.fine
                );
                self.bindings.set(
                    update.axis,
                    Binding {
                        motor,
                        fine: update.fine,
                    },
                );
            }
            None => warn!(
                "Ignoring binding for {:?}: no motor {}",
                update.axis, update.motor
            ),
        }
    }

    /// Stop every motor on request from the control surface. Markers are
    /// left as they are: a still-deflected axis stays stopped until it
    /// passes back through the deadzone.
    pub fn global_stop(&mut self) -> Result<()> {
        self.driver.stop_all()
    }

    pub fn bindings(&self) -> &AxisBindings {
        &self.bindings
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub port: String,
    pub baud: u32,
    pub deadzone: f32,
}

pub async fn run(opts: RunOptions) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Serial first: with no controller there is no loop to run.
    info!("Opening controller on {} ({} baud)", opts.port, opts.baud);
    let channel = SerialChannel::open_with_baudrate(&opts.port, opts.baud)?;
    let driver = PicomotorDriver::new(channel);
    let mut control = ControlLoop::new(driver, AxisBindings::default(), opts.deadzone);

    let status = control.startup()?;

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let axis_sub = session.declare_subscriber(TOPIC_AXIS).await?;
    let binding_sub = session.declare_subscriber(TOPIC_BINDING).await?;
    let stop_sub = session.declare_subscriber(TOPIC_STOP).await?;
    let pub_status = session.declare_publisher(TOPIC_STATUS).await?;

    pub_status.put(serde_json::to_string(&status)?).await?;

    info!("Runtime started: deadzone {}", opts.deadzone);
    info!("Subscribed to: {}, {}, {}", TOPIC_AXIS, TOPIC_BINDING, TOPIC_STOP);
    info!("Publishing to: {}", TOPIC_STATUS);

    loop {
        tokio::select! {
            sample = axis_sub.recv_async() => {
                let sample = sample?;
                let payload = sample.payload().to_bytes();
                match serde_json::from_slice::<AxisSample>(&payload) {
                    Ok(sample) => control.handle_sample(sample)?,
                    Err(e) => warn!("Failed to parse axis sample: {}", e),
                }
            }
            update = binding_sub.recv_async() => {
                let update = update?;
                let payload = update.payload().to_bytes();
                match serde_json::from_slice::<BindingUpdate>(&payload) {
                    Ok(update) => control.apply_binding(update),
                    Err(e) => warn!("Failed to parse binding update: {}", e),
                }
            }
            request = stop_sub.recv_async() => {
                request?;
                info!("Global stop requested");
                control.global_stop()?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEADZONE, DEADZONE_WIDE};
    use crate::messages::Axis;
    use crate::motor::channel::mock::MockChannel;
    use crate::motor::PicomotorError;

    fn control() -> ControlLoop<MockChannel> {
        ControlLoop::new(
            PicomotorDriver::new(MockChannel::new()),
            AxisBindings::default(),
            DEADZONE,
        )
    }

    fn sample(axis: Axis, raw: i32) -> AxisSample {
        AxisSample { axis, raw }
    }

    #[test]
    fn test_centered_sample_stops_and_clears_marker() {
        let mut control = control();
        control.markers[0] = true;

        control.handle_sample(sample(Axis::X, 0)).unwrap();

        assert_eq!(control.driver.channel().sent(), ["1>1 ST\r"]);
        assert!(!control.markers[0]);
    }

    #[test]
    fn test_centered_stop_reissued_every_sample() {
        let mut control = control();
        control.handle_sample(sample(Axis::X, 0)).unwrap();
        control.handle_sample(sample(Axis::X, 0)).unwrap();
        assert_eq!(control.driver.channel().sent(), ["1>1 ST\r", "1>1 ST\r"]);
    }

    #[test]
    fn test_deflection_episode_issues_one_move() {
        let mut control = control();
        control.driver.channel_mut().push_reply("1");
        control.driver.channel_mut().push_reply("1");

        // half deflection on X (motor 1, coarse)
        control.handle_sample(sample(Axis::X, 16384)).unwrap();
        assert!(control.markers[0]);

        // still deflected: velocity refreshed, no second move
        control.handle_sample(sample(Axis::X, 19661)).unwrap();

        assert_eq!(
            control.driver.channel().sent(),
            [
                "1>1 VA 1000\r",
                "1>1 MD?\r",
                "1>1 MV +\r",
                "1>1 VA 1200\r",
                "1>1 MD?\r",
            ]
        );
    }

    #[test]
    fn test_fine_tuning_scales_velocity_down() {
        let mut control = control();
        control.driver.channel_mut().push_reply("1");

        // RX is bound to motor 1 with fine tuning by default
        control.handle_sample(sample(Axis::Rx, 16384)).unwrap();

        assert_eq!(
            control.driver.channel().sent(),
            ["1>1 VA 100\r", "1>1 MD?\r", "1>1 MV +\r"]
        );
    }

    #[test]
    fn test_velocity_rounds_to_nearest() {
        let mut control = control();
        control.driver.channel_mut().push_reply("0");

        // 1008/32768 * 2000 = 61.52...; truncation would give 61
        control.handle_sample(sample(Axis::X, 1008)).unwrap();

        assert_eq!(
            control.driver.channel().sent(),
            ["1>1 VA 62\r", "1>1 MD?\r"]
        );
    }

    #[test]
    fn test_negative_deflection_moves_backward() {
        let mut control = control();
        control.driver.channel_mut().push_reply("1");

        control.handle_sample(sample(Axis::X, -16384)).unwrap();

        assert_eq!(
            control.driver.channel().sent(),
            ["1>1 VA 1000\r", "1>1 MD?\r", "1>1 MV -\r"]
        );
    }

    #[test]
    fn test_no_move_while_motor_still_travelling() {
        let mut control = control();

        control.driver.channel_mut().push_reply("0");
        control.handle_sample(sample(Axis::X, 16384)).unwrap();
        assert!(!control.markers[0]);

        // next sample finds the motor idle and starts the move
        control.driver.channel_mut().push_reply("1");
        control.handle_sample(sample(Axis::X, 16384)).unwrap();
        assert!(control.markers[0]);

        let sent = control.driver.channel().sent();
        assert_eq!(sent.iter().filter(|f| f.contains("MV")).count(), 1);
    }

    #[test]
    fn test_reversal_waits_for_recentering() {
        let mut control = control();

        control.driver.channel_mut().push_reply("1");
        control.handle_sample(sample(Axis::X, 16384)).unwrap();

        // reversed while still deflected: marker holds the move back
        control.driver.channel_mut().push_reply("1");
        control.handle_sample(sample(Axis::X, -16384)).unwrap();
        let sent = control.driver.channel().sent();
        assert_eq!(sent.iter().filter(|f| f.contains("MV")).count(), 1);

        // recentering reopens the episode
        control.handle_sample(sample(Axis::X, 0)).unwrap();
        control.driver.channel_mut().push_reply("1");
        control.handle_sample(sample(Axis::X, -16384)).unwrap();

        let sent = control.driver.channel().sent();
        assert_eq!(*sent.last().unwrap(), "1>1 MV -\r");
    }

    #[test]
    fn test_query_failure_leaves_marker_unchanged() {
        let mut control = control();

        // no reply scripted: the motion query times out
        let err = control.handle_sample(sample(Axis::X, 16384)).unwrap_err();
        assert!(matches!(err, PicomotorError::Io(_)));
        assert!(!control.markers[0]);

        // a later healthy sample still starts the move
        control.driver.channel_mut().push_reply("1");
        control.handle_sample(sample(Axis::X, 16384)).unwrap();
        assert!(control.markers[0]);
    }

    #[test]
    fn test_axes_sharing_a_motor_share_its_marker() {
        let mut control = control();

        // X and RX both target motor 1 by default
        control.driver.channel_mut().push_reply("1");
        control.handle_sample(sample(Axis::X, 16384)).unwrap();

        control.driver.channel_mut().push_reply("1");
        control.handle_sample(sample(Axis::Rx, 16384)).unwrap();

        let sent = control.driver.channel().sent();
        assert_eq!(sent.iter().filter(|f| f.contains("MV")).count(), 1);
    }

    #[test]
    fn test_deadzone_comparison_is_strict() {
        let mut control = control();

        // 327/32768 is just under the 0.01 band, 328/32768 just over
        control.handle_sample(sample(Axis::X, 327)).unwrap();
        assert_eq!(control.driver.channel().sent(), ["1>1 ST\r"]);

        control.driver.channel_mut().push_reply("0");
        control.handle_sample(sample(Axis::X, 328)).unwrap();
        let sent = control.driver.channel().sent();
        assert_eq!(sent[1], "1>1 VA 20\r");
    }

    #[test]
    fn test_wide_deadzone_profile() {
        let mut control = ControlLoop::new(
            PicomotorDriver::new(MockChannel::new()),
            AxisBindings::default(),
            DEADZONE_WIDE,
        );

        // deflection that the default profile would act on
        control.handle_sample(sample(Axis::X, 1008)).unwrap();
        assert_eq!(control.driver.channel().sent(), ["1>1 ST\r"]);
    }

    #[test]
    fn test_binding_update_redirects_axis() {
        let mut control = control();
        control.apply_binding(BindingUpdate {
            axis: Axis::X,
            motor: 3,
            fine: false,
        });

        control.driver.channel_mut().push_reply("1");
        control.handle_sample(sample(Axis::X, 16384)).unwrap();

        assert_eq!(
            control.driver.channel().sent(),
            ["1>3 VA 1000\r", "1>3 MD?\r", "1>3 MV +\r"]
        );
        assert!(control.markers[2]);
    }

    #[test]
    fn test_binding_update_rejects_bad_motor_index() {
        let mut control = control();
        control.apply_binding(BindingUpdate {
            axis: Axis::X,
            motor: 9,
            fine: true,
        });
        assert_eq!(control.bindings().get(Axis::X).motor, MotorId::M1);
        assert!(!control.bindings().get(Axis::X).fine);
    }

    #[test]
    fn test_startup_sequence_and_report() {
        let mut control = control();
        control
            .driver
            .channel_mut()
            .push_reply("8742 Version 2.2 08/01/13");
        for code in ["3", "3", "0", "1"] {
            control.driver.channel_mut().push_reply(code);
        }

        let status = control.startup().unwrap();

        assert_eq!(status.firmware, "8742 Version 2.2 08/01/13");
        assert_eq!(
            status.motors,
            [
                "'Standard' Motor",
                "'Standard' Motor",
                "No motor connected",
                "Motor Unknown",
            ]
        );
        assert_eq!(
            control.driver.channel().sent(),
            [
                "VE?\r",
                "MC\r",
                "1>1 QM?\r",
                "1>2 QM?\r",
                "1>3 QM?\r",
                "1>4 QM?\r",
                "ST\r",
            ]
        );
    }

    #[test]
    fn test_global_stop_keeps_markers() {
        let mut control = control();
        control.markers[0] = true;

        control.global_stop().unwrap();

        assert_eq!(control.driver.channel().sent(), ["ST\r"]);
        assert!(control.markers[0]);
    }
}
