// High-level controller driver.
//
// Enforces the request/reply discipline over a DeviceChannel: a command is
// written, and exactly when its mnemonic carries '?' the single reply frame
// is read back and decoded. Nothing here retries; errors go to the caller.

use tracing::{debug, info, warn};

use super::channel::DeviceChannel;
use super::newport::{
    decode_reply, Command, Direction, MotionStatus, MotorId, MotorType, PicomotorError, Result,
};

/// Largest reply frame the controller produces.
pub const REPLY_MAX_LEN: usize = 100;

/// Driver for one picomotor controller unit.
pub struct PicomotorDriver<C: DeviceChannel> {
    channel: C,
}

impl<C: DeviceChannel> PicomotorDriver<C> {
    pub fn new(channel: C) -> Self {
        Self { channel }
    }

    /// Direct access to the underlying channel.
    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Write a fire-and-forget command.
    pub fn send(&mut self, command: &Command) -> Result<()> {
        debug!("-> {}", command);
        self.channel.write(&command.encode())
    }

    /// Write a query and read back its one reply.
    pub fn query(&mut self, command: &Command) -> Result<String> {
        if !command.expects_reply() {
            return Err(PicomotorError::NotAQuery {
                command: command.to_string(),
            });
        }
        self.channel.write(&command.encode())?;
        let reply = decode_reply(&self.channel.read(REPLY_MAX_LEN)?);
        debug!("-> {} <- {:?}", command, reply);
        Ok(reply)
    }

    /// Dispatch raw command text the way a console surface does: parse it,
    /// then query or send depending on the mnemonic.
    pub fn command(&mut self, text: &str) -> Result<Option<String>> {
        let command = Command::parse(text)?;
        if command.expects_reply() {
            self.query(&command).map(Some)
        } else {
            self.send(&command).map(|_| None)
        }
    }

    /// Stop every motor.
    pub fn stop_all(&mut self) -> Result<()> {
        self.send(&Command::stop_all())
    }

    /// Stop one motor.
    pub fn stop(&mut self, motor: MotorId) -> Result<()> {
        self.send(&Command::stop(motor))
    }

    /// Set the velocity used by the motor's next move.
    pub fn set_velocity(&mut self, motor: MotorId, velocity: u32) -> Result<()> {
        self.send(&Command::set_velocity(motor, velocity))
    }

    /// Start an indefinite move in the given direction.
    pub fn start_motion(&mut self, motor: MotorId, direction: Direction) -> Result<()> {
        self.send(&Command::start_motion(motor, direction))
    }

    /// Whether the motor's last commanded motion has finished.
    pub fn motion_done(&mut self, motor: MotorId) -> Result<bool> {
        let query = Command::motion_done(motor);
        let reply = self.query(&query)?;
        let status =
            MotionStatus::from_reply(&reply).ok_or_else(|| PicomotorError::UnexpectedReply {
                query: query.to_string(),
                reply: reply.clone(),
            })?;
        Ok(status == MotionStatus::Done)
    }

    /// Classification of the motor attached to one channel.
    pub fn motor_type(&mut self, motor: MotorId) -> Result<MotorType> {
        let query = Command::motor_type(motor);
        let reply = self.query(&query)?;
        MotorType::from_reply(&reply).ok_or_else(|| PicomotorError::UnexpectedReply {
            query: query.to_string(),
            reply,
        })
    }

    /// Controller model and firmware version string.
    pub fn firmware_version(&mut self) -> Result<String> {
        self.query(&Command::firmware_version())
    }

    /// Rescan the channels and classify each of the four motors.
    pub fn survey_motors(&mut self) -> Result<[MotorType; 4]> {
        self.send(&Command::motor_check())?;

        let mut found = [MotorType::NotConnected; 4];
        for motor in MotorId::ALL {
            let motor_type = self.motor_type(motor)?;
            info!("Motor {}: {}", motor, motor_type);
            found[motor.slot()] = motor_type;
        }
        Ok(found)
    }
}

impl<C: DeviceChannel> Drop for PicomotorDriver<C> {
    fn drop(&mut self) {
        // Leave the hardware idle when the driver goes away
        if let Err(e) = self.stop_all() {
            warn!("Failed to stop motors on drop: {}", e);
        }
    }
}
