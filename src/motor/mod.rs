// Picomotor controller module
//
// Provides:
// - New Focus command grammar codec (parse, encode, reply decode)
// - Byte-oriented device channel over a serial port
// - High-level request/reply driver API

pub mod channel;
mod driver;
pub mod newport;

pub use channel::{DeviceChannel, SerialChannel};
pub use driver::{PicomotorDriver, REPLY_MAX_LEN};
pub use newport::{
    Command, Direction, MotionStatus, MotorId, MotorType, Parameter, PicomotorError, Result,
};
