// Copyright (C) 2026 Brian Johnson
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

use std::time::Duration;
use serialport::{SerialPort as SerialPortTrait, DataBits, Parity, StopBits};

#[cfg(test)]
use std::sync::Arc;
#[cfg(test)]
use std::sync::atomic::{AtomicBool, Ordering};

// ============================================================================
// SerialPort Trait
// ============================================================================

/// Trait for serial port operations needed by the intercom link
pub trait SerialPort: Send {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()>;

    /// Read up to `buf.len()` bytes. `Ok(0)` means the link is closed.
    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> std::io::Result<usize>;
}

// ============================================================================
// Real Serial Port Implementation
// ============================================================================

/// Line settings for the panel link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSettings {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
}

impl Default for LineSettings {
    /// 9600 8E1, what the panel speaks
    fn default() -> Self {
        LineSettings {
            baud_rate: 9600,
            data_bits: DataBits::Eight,
            parity: Parity::Even,
            stop_bits: StopBits::One,
        }
    }
}

/// Real serial port implementation that wraps the serialport crate
pub struct RealSerialPort {
    port: Box<dyn SerialPortTrait>,
}

impl RealSerialPort {
    pub fn open(port_name: &str, settings: LineSettings) -> Result<Self, serialport::Error> {
        let port = serialport::new(port_name, settings.baud_rate)
            .data_bits(settings.data_bits)
            .parity(settings.parity)
            .stop_bits(settings.stop_bits)
            .timeout(Duration::from_millis(100))
            .open()?;

        Ok(RealSerialPort { port })
    }
}

impl SerialPort for RealSerialPort {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.port.write_all(buf)?;
        self.port.flush()?;
        Ok(())
    }

    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> std::io::Result<usize> {
        self.port.set_timeout(timeout)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        self.port.read(buf)
    }
}

// ============================================================================
// Mock Serial Port for Testing
// ============================================================================

/// Replays scripted panel traffic and checks the bridge's replies on drop.
#[cfg(test)]
pub struct MockSerialPort {
    // Bytes handed out by reads; a `None` entry stands for one poll timeout
    script: Vec<Option<u8>>,
    cursor: usize,
    sent: Vec<u8>,
    expected_sent: Vec<u8>,
    // Raised once the script is used up, instead of closing the link
    shutdown: Option<Arc<AtomicBool>>,
}

#[cfg(test)]
impl MockSerialPort {
    pub fn new(script: Vec<Option<u8>>, expected_sent: Vec<u8>) -> Self {
        MockSerialPort {
            script,
            cursor: 0,
            sent: Vec::new(),
            expected_sent,
            shutdown: None,
        }
    }

    /// Simulate Ctrl-C arriving after the scripted traffic
    pub fn interrupt_when_drained(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = Some(flag);
        self
    }

    fn timeout() -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::TimedOut, "no data from panel")
    }
}

#[cfg(test)]
impl SerialPort for MockSerialPort {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.sent.extend_from_slice(buf);
        Ok(())
    }

    fn read_timeout(&mut self, buf: &mut [u8], _timeout: Duration) -> std::io::Result<usize> {
        let Some(next) = self.script.get(self.cursor) else {
            return match &self.shutdown {
                Some(flag) => {
                    flag.store(true, Ordering::SeqCst);
                    Err(Self::timeout())
                }
                None => Ok(0),
            };
        };

        if next.is_none() {
            self.cursor += 1;
            return Err(Self::timeout());
        }

        // hand out bytes up to the next timeout marker, like a short serial read
        let available = self.script[self.cursor..]
            .iter()
            .take(buf.len())
            .map_while(|b| *b);
        let mut n = 0;
        for byte in available {
            buf[n] = byte;
            n += 1;
        }
        self.cursor += n;

        Ok(n)
    }
}

#[cfg(test)]
impl Drop for MockSerialPort {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }

        assert_eq!(
            self.cursor,
            self.script.len(),
            "panel script not fully read: {} of {} entries consumed",
            self.cursor,
            self.script.len()
        );

        assert_eq!(
            self.sent,
            self.expected_sent,
            "bridge replies differ\nexpected: {:02X?}\nsent:     {:02X?}",
            self.expected_sent,
            self.sent
        );
    }
}
