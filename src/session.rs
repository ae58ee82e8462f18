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

//! Call session state machine
//!
//! The panel drives every transition. Each received message produces at most
//! one command and possibly a new state; heartbeats are where the bridge takes
//! the initiative (pickup while ringing, unlock while speaking).

use crate::protocol::{Command, MAX_UNLOCK_ATTEMPTS, PanelMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Ring,
    Speaking,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "IDLE"),
            SessionState::Ring => write!(f, "RING"),
            SessionState::Speaking => write!(f, "SPEAKING"),
        }
    }
}

/// The single call session on the intercom line.
#[derive(Debug, Default)]
pub struct Session {
    state: SessionState,
    unlock_attempts: u32,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn unlock_attempts(&self) -> u32 {
        self.unlock_attempts
    }

    /// Feed one panel message; returns the command to send back, if any.
    pub fn next(&mut self, msg: PanelMessage) -> Option<Command> {
        match msg {
            PanelMessage::Discover => Some(Command::ImHere),
            PanelMessage::Ring => {
                self.state = SessionState::Ring;
                Some(Command::RingAck)
            }
            PanelMessage::PickupAck => {
                self.state = SessionState::Speaking;
                Some(Command::Speaking)
            }
            PanelMessage::UnlockAck => Some(Command::Speaking),
            PanelMessage::CallHangupAck => {
                self.reset();
                Some(Command::Heartbeat)
            }
            PanelMessage::Heartbeat => Some(self.on_heartbeat()),
            PanelMessage::Ack => None,
            PanelMessage::Unknown => {
                // abandons the call, but the unlock count carries over
                self.state = SessionState::Idle;
                None
            }
        }
    }

    fn on_heartbeat(&mut self) -> Command {
        match self.state {
            SessionState::Idle => Command::Heartbeat,
            SessionState::Ring => Command::Pickup,
            SessionState::Speaking if self.unlock_attempts < MAX_UNLOCK_ATTEMPTS => {
                self.unlock_attempts += 1;
                Command::Unlock
            }
            SessionState::Speaking => {
                // stays SPEAKING until the panel acknowledges the hangup
                self.unlock_attempts = 0;
                Command::CallHangup
            }
        }
    }

    fn reset(&mut self) {
        self.state = SessionState::Idle;
        self.unlock_attempts = 0;
    }
}
