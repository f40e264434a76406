// New Focus / Newport picomotor controller command protocol
//
// Command text is of the form xxAAnn: a two-or-more character mnemonic (AA)
// with an optional leading driver digit (xx) and an optional trailing
// parameter (nn), e.g. "1VA2000", "2MD?", "ST". On the wire a command is
// plain ASCII terminated by a single carriage return, with the
// controller-select prefix "1>" inserted when a driver digit is present.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Controller-select prefix for driver-addressed commands. The firmware
/// supports daisy-chained units; this driver only ever talks to unit 1.
const CONTROLLER_SELECT: &str = "1>";

/// Command pattern, anchored: trailing text is rejected rather than silently
/// dropped, and the driver digit is restricted to the four channels the
/// hardware has.
static COMMAND_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([1-4]?)([A-Za-z?]{2,})([0-9+-]*)$").unwrap());

/// Error types for controller communication
#[derive(Debug, thiserror::Error)]
pub enum PicomotorError {
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("command {input:?} does not match the controller grammar")]
    MalformedCommand { input: String },

    #[error("command {command} does not solicit a reply")]
    NotAQuery { command: String },

    #[error("unrecognized reply {reply:?} to {query}")]
    UnexpectedReply { query: String, reply: String },
}

pub type Result<T> = std::result::Result<T, PicomotorError>;

/// Motor channel selector, 1..=4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MotorId(u8);

impl MotorId {
    pub const M1: MotorId = MotorId(1);
    pub const M2: MotorId = MotorId(2);
    pub const M3: MotorId = MotorId(3);
    pub const M4: MotorId = MotorId(4);

    pub const ALL: [MotorId; 4] = [Self::M1, Self::M2, Self::M3, Self::M4];

    pub fn new(index: u8) -> Option<Self> {
        (1..=4).contains(&index).then_some(Self(index))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Zero-based index for per-motor tables.
    pub(crate) fn slot(self) -> usize {
        usize::from(self.0 - 1)
    }
}

impl fmt::Display for MotorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Travel direction for an indefinite move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    /// Direction of a deflection by sign.
    pub fn from_value(value: f32) -> Self {
        if value > 0.0 {
            Self::Forward
        } else {
            Self::Backward
        }
    }

    pub fn sign(self) -> char {
        match self {
            Self::Forward => '+',
            Self::Backward => '-',
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sign())
    }
}

/// Trailing command parameter: either a signed magnitude ("VA2000") or a
/// bare direction sign ("MV+").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parameter {
    Value(i32),
    Heading(Direction),
}

impl Parameter {
    fn parse(text: &str) -> Option<Self> {
        match text {
            "+" => Some(Self::Heading(Direction::Forward)),
            "-" => Some(Self::Heading(Direction::Backward)),
            _ => text.parse::<i32>().ok().map(Self::Value),
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => write!(f, "{}", value),
            Self::Heading(direction) => write!(f, "{}", direction),
        }
    }
}

/// A validated controller command. Construct via [`Command::parse`] for raw
/// console text or via the typed constructors; malformed text never reaches
/// the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    driver: Option<MotorId>,
    mnemonic: String,
    parameter: Option<Parameter>,
}

impl Command {
    /// Parse command text against the controller grammar.
    pub fn parse(text: &str) -> Result<Self> {
        let malformed = || PicomotorError::MalformedCommand {
            input: text.to_string(),
        };

        let caps = COMMAND_PATTERN.captures(text).ok_or_else(malformed)?;

        let driver = match &caps[1] {
            "" => None,
            digit => {
                let index = digit.parse::<u8>().map_err(|_| malformed())?;
                Some(MotorId::new(index).ok_or_else(malformed)?)
            }
        };
        let mnemonic = caps[2].to_string();
        let parameter = match &caps[3] {
            "" => None,
            tail => Some(Parameter::parse(tail).ok_or_else(malformed)?),
        };

        Ok(Self {
            driver,
            mnemonic,
            parameter,
        })
    }

    fn typed(driver: Option<MotorId>, mnemonic: &str, parameter: Option<Parameter>) -> Self {
        Self {
            driver,
            mnemonic: mnemonic.to_string(),
            parameter,
        }
    }

    /// `ST`: stop every motor.
    pub fn stop_all() -> Self {
        Self::typed(None, "ST", None)
    }

    /// `{n}ST`: stop one motor.
    pub fn stop(motor: MotorId) -> Self {
        Self::typed(Some(motor), "ST", None)
    }

    /// `{n}VA{v}`: set the velocity used by subsequent moves.
    pub fn set_velocity(motor: MotorId, velocity: u32) -> Self {
        Self::typed(Some(motor), "VA", Some(Parameter::Value(velocity as i32)))
    }

    /// `{n}MV+` / `{n}MV-`: start an indefinite move.
    pub fn start_motion(motor: MotorId, direction: Direction) -> Self {
        Self::typed(Some(motor), "MV", Some(Parameter::Heading(direction)))
    }

    /// `{n}MD?`: is the last commanded motion finished?
    pub fn motion_done(motor: MotorId) -> Self {
        Self::typed(Some(motor), "MD?", None)
    }

    /// `{n}QM?`: classify the attached motor.
    pub fn motor_type(motor: MotorId) -> Self {
        Self::typed(Some(motor), "QM?", None)
    }

    /// `VE?`: controller model and firmware version string.
    pub fn firmware_version() -> Self {
        Self::typed(None, "VE?", None)
    }

    /// `MC`: rescan which channels have a motor attached.
    pub fn motor_check() -> Self {
        Self::typed(None, "MC", None)
    }

    pub fn driver(&self) -> Option<MotorId> {
        self.driver
    }

    pub fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    pub fn parameter(&self) -> Option<Parameter> {
        self.parameter
    }

    /// Whether the controller will answer this command with a reply frame.
    /// Decided from the mnemonic alone, before the command is written.
    pub fn expects_reply(&self) -> bool {
        self.mnemonic.contains('?')
    }

    /// Wire form: `["1>" driver " "] mnemonic [" " parameter] CR`.
    pub fn encode(&self) -> Vec<u8> {
        let mut wire = match self.driver {
            Some(motor) => format!("{CONTROLLER_SELECT}{motor} {}", self.mnemonic),
            None => self.mnemonic.clone(),
        };
        if let Some(parameter) = &self.parameter {
            wire.push(' ');
            wire.push_str(&parameter.to_string());
        }
        wire.push('\r');
        wire.into_bytes()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(motor) = self.driver {
            write!(f, "{}", motor)?;
        }
        f.write_str(&self.mnemonic)?;
        if let Some(parameter) = &self.parameter {
            write!(f, "{}", parameter)?;
        }
        Ok(())
    }
}

/// Decode raw reply bytes: one byte to one char, trailing whitespace and
/// control bytes stripped. Never fails, whatever the controller sent.
pub fn decode_reply(raw: &[u8]) -> String {
    let text: String = raw.iter().map(|&b| b as char).collect();
    text.trim_end_matches(|c: char| c.is_whitespace() || c.is_control())
        .to_string()
}

/// Motion state reported by `MD?`. The firmware answers with a status digit
/// in the reply's final character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionStatus {
    /// Last commanded motion finished; the motor is idle.
    Done,
    /// Motor still travelling.
    InProgress,
}

impl MotionStatus {
    pub fn from_reply(reply: &str) -> Option<Self> {
        match reply.chars().last()? {
            '1' => Some(Self::Done),
            '0' => Some(Self::InProgress),
            _ => None,
        }
    }
}

/// Motor classification reported by `QM?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorType {
    NotConnected,
    Unknown,
    Tiny,
    Standard,
}

impl MotorType {
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            '0' => Some(Self::NotConnected),
            '1' => Some(Self::Unknown),
            '2' => Some(Self::Tiny),
            '3' => Some(Self::Standard),
            _ => None,
        }
    }

    pub fn from_reply(reply: &str) -> Option<Self> {
        Self::from_code(reply.chars().last()?)
    }
}

impl fmt::Display for MotorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotConnected => "No motor connected",
            Self::Unknown => "Motor Unknown",
            Self::Tiny => "'Tiny' Motor",
            Self::Standard => "'Standard' Motor",
        };
        f.write_str(label)
    }
}
