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

use std::convert::Infallible;
use std::io::ErrorKind;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::codec::{Codec, CodecError};
use crate::protocol::{Command, FRAME_LEN, GUARD_DELAY, PanelMessage};
use crate::serial::SerialPort;
use crate::session::{Session, SessionState};

/// How long a single poll of the port waits before checking for shutdown
const POLL_INTERVAL: Duration = Duration::from_millis(100);

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("link closed mid-frame: got {received} of {expected} bytes")]
    ShortFrame { expected: usize, received: usize },

    #[error("interrupted")]
    Interrupted,
}

// ============================================================================
// Bridge
// ============================================================================

/// Owns the panel link and runs the read-decide-write loop.
pub struct Bridge {
    serial: Box<dyn SerialPort>,
    codec: Codec,
    session: Session,
    shutdown: Arc<AtomicBool>,
}

impl Bridge {
    pub fn new(serial: Box<dyn SerialPort>, codec: Codec, shutdown: Arc<AtomicBool>) -> Self {
        Bridge {
            serial,
            codec,
            session: Session::new(),
            shutdown,
        }
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Process frames until the link fails or shutdown is requested.
    pub fn run(&mut self) -> Result<Infallible, BridgeError> {
        loop {
            self.step()?;
        }
    }

    /// Read one frame, feed it to the session and send the reply, if any.
    pub fn step(&mut self) -> Result<(), BridgeError> {
        let frame = self.read_frame()?;
        let msg = self.codec.decode(&frame);
        info!("message_hex: {}", msg.text);

        if msg.kind == PanelMessage::Unknown {
            error!("Unknown message: {}", msg.text);
        }

        if let Some(cmd) = self.session.next(msg.kind) {
            self.write_command(cmd)?;
        }

        if self.state() != SessionState::Idle {
            warn!("STATE: {}", self.state());
            debug!("Unlock attempts: {}", self.session.unlock_attempts());
        }

        Ok(())
    }

    /// Block until a whole frame has arrived.
    fn read_frame(&mut self) -> Result<[u8; FRAME_LEN], BridgeError> {
        let mut frame = [0u8; FRAME_LEN];
        let mut received = 0;

        while received < FRAME_LEN {
            if self.shutdown.load(Ordering::SeqCst) {
                return Err(BridgeError::Interrupted);
            }

            match self.serial.read_timeout(&mut frame[received..], POLL_INTERVAL) {
                Ok(0) => {
                    return Err(BridgeError::ShortFrame { expected: FRAME_LEN, received });
                }
                Ok(n) => received += n,
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => {}
                Err(e) => return Err(self.io_error(e)),
            }
        }

        debug!("Received frame: {:02X?}", frame);
        Ok(frame)
    }

    /// Fire-and-forget: wait out the guard delay, then transmit.
    fn write_command(&mut self, cmd: Command) -> Result<(), BridgeError> {
        std::thread::sleep(GUARD_DELAY);

        let bytes = self.codec.encode(cmd.name())?;
        self.serial
            .write_all(&bytes)
            .map_err(|e| self.io_error(e))?;

        info!("Publish cmd: {}", cmd);
        Ok(())
    }

    fn io_error(&self, e: std::io::Error) -> BridgeError {
        BridgeError::Io(std::io::Error::new(
            e.kind(),
            format!("{} (in state: {})", e, self.state()),
        ))
    }
}

// ============================================================================
// Tests
// ============================================================================
