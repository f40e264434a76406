// Byte-oriented duplex channel to the controller.
//
// The protocol is strict request/reply over this channel: one command frame
// out, at most one reply frame back, never unsolicited. Framing, retry and
// buffering all live above or below this seam, not in it.

use std::io::{Read, Write};
use std::time::Duration;

use serialport::SerialPort;

use super::newport::Result;

/// Default serial configuration for the controller's virtual COM port
pub const DEFAULT_BAUDRATE: u32 = 115_200;
pub const DEFAULT_TIMEOUT_MS: u64 = 250;

/// Duplex byte transport owned by the surrounding application.
pub trait DeviceChannel {
    fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Read one reply frame, blocking until at least one byte arrives or the
    /// transport errors (a timeout is an error).
    fn read(&mut self, max_len: usize) -> Result<Vec<u8>>;
}

/// Serial-port channel to a connected controller.
pub struct SerialChannel {
    port: Box<dyn SerialPort>,
}

impl SerialChannel {
    /// Open the controller's serial device with the default baudrate.
    pub fn open(port_name: &str) -> Result<Self> {
        Self::open_with_baudrate(port_name, DEFAULT_BAUDRATE)
    }

    /// Open with a custom baudrate.
    pub fn open_with_baudrate(port_name: &str, baudrate: u32) -> Result<Self> {
        let port = serialport::new(port_name, baudrate)
            .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
            .open()?;

        Ok(Self { port })
    }
}

impl DeviceChannel for SerialChannel {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.port.write_all(bytes)?;
        self.port.flush()?;
        Ok(())
    }

    fn read(&mut self, max_len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; max_len];
        let n = self.port.read(&mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use std::collections::VecDeque;

    use super::DeviceChannel;
    use crate::motor::newport::Result;

    /// Scripted channel: records every write, serves queued replies in order.
    /// An empty reply queue behaves like a read timeout, and `jammed` makes
    /// writes fail, for exercising transport-error paths.
    pub(crate) struct MockChannel {
        pub(crate) written: Vec<Vec<u8>>,
        pub(crate) replies: VecDeque<Vec<u8>>,
        pub(crate) jammed: bool,
    }

    impl MockChannel {
        pub(crate) fn new() -> Self {
            Self {
                written: Vec::new(),
                replies: VecDeque::new(),
                jammed: false,
            }
        }

        pub(crate) fn push_reply(&mut self, reply: &str) {
            self.replies.push_back(reply.as_bytes().to_vec());
        }

        /// Wire frames written so far, as command strings.
        pub(crate) fn sent(&self) -> Vec<String> {
            self.written
                .iter()
                .map(|frame| String::from_utf8_lossy(frame).into_owned())
                .collect()
        }
    }

    impl DeviceChannel for MockChannel {
        fn write(&mut self, bytes: &[u8]) -> Result<()> {
            if self.jammed {
                return Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "jammed").into());
            }
            self.written.push(bytes.to_vec());
            Ok(())
        }

        fn read(&mut self, max_len: usize) -> Result<Vec<u8>> {
            let mut reply = self.replies.pop_front().ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::TimedOut, "no reply scripted")
            })?;
            reply.truncate(max_len);
            Ok(reply)
        }
    }
}
