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

//! Intercom panel vocabulary

use std::time::Duration;

/// Every frame on the wire is exactly this many bytes
pub const FRAME_LEN: usize = 4;

/// Guard delay before each transmitted frame
pub const GUARD_DELAY: Duration = Duration::from_millis(5);

/// Unlock requests sent during one call before forcing a hangup
pub const MAX_UNLOCK_ATTEMPTS: u32 = 5;

// ============================================================================
// Panel -> bridge
// ============================================================================

/// Panel searches for devices on the bus
pub const H_DISCOVER: &str = "H_Discover";

/// Incoming call is ringing
pub const H_RING: &str = "H_Ring";

/// Panel confirms our pickup request
pub const H_PKUP_ACK: &str = "H_PkupAck";

/// Panel confirms the door was unlocked
pub const H_UNLOCK_ACK: &str = "H_UnlockAck";

/// Panel confirms the call was hung up
pub const H_CALL_HANGUP_ACK: &str = "H_CallHangupACK";

/// Panel heartbeat
pub const HHB: &str = "HHB";

/// Generic acknowledgment, needs no reply
pub const H_ACK: &str = "H_ACK";

// ============================================================================
// Bridge -> panel
// ============================================================================

/// Answer to a discovery request
pub const C_IM_HERE: &str = "C_ImHere";

/// Acknowledge an incoming ring
pub const C_RING_ACK: &str = "C_RingACK";

/// Ask the panel to pick up the call
pub const C_PKUP: &str = "C_Pkup";

/// Report that the call is in progress
pub const C_SPKING: &str = "C_Spking";

/// Ask the panel to open the door
pub const C_UNLOCK: &str = "C_Unlock";

/// Ask the panel to hang up
pub const C_CALL_HANGUP: &str = "C_CallHangup";

/// Heartbeat acknowledgment
pub const CHB: &str = "CHB";

// ============================================================================
// Typed messages
// ============================================================================

/// A frame received from the panel, classified by its symbolic content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelMessage {
    Discover,
    Ring,
    PickupAck,
    UnlockAck,
    CallHangupAck,
    Heartbeat,
    Ack,
    Unknown,
}

impl PanelMessage {
    /// Classify substituted frame text. Names are tested in priority order and
    /// the first one found anywhere in the text wins.
    pub fn classify(text: &str) -> PanelMessage {
        const PRIORITY: [(&str, PanelMessage); 7] = [
            (H_DISCOVER, PanelMessage::Discover),
            (H_RING, PanelMessage::Ring),
            (H_PKUP_ACK, PanelMessage::PickupAck),
            (H_UNLOCK_ACK, PanelMessage::UnlockAck),
            (H_CALL_HANGUP_ACK, PanelMessage::CallHangupAck),
            (HHB, PanelMessage::Heartbeat),
            (H_ACK, PanelMessage::Ack),
        ];

        PRIORITY
            .iter()
            .find(|(name, _)| text.contains(name))
            .map(|&(_, msg)| msg)
            .unwrap_or(PanelMessage::Unknown)
    }
}

/// A frame the bridge sends to the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ImHere,
    RingAck,
    Pickup,
    Speaking,
    Unlock,
    CallHangup,
    Heartbeat,
}

impl Command {
    pub const ALL: [Command; 7] = [
        Command::ImHere,
        Command::RingAck,
        Command::Pickup,
        Command::Speaking,
        Command::Unlock,
        Command::CallHangup,
        Command::Heartbeat,
    ];

    /// Code table key for this command
    pub fn name(self) -> &'static str {
        match self {
            Command::ImHere => C_IM_HERE,
            Command::RingAck => C_RING_ACK,
            Command::Pickup => C_PKUP,
            Command::Speaking => C_SPKING,
            Command::Unlock => C_UNLOCK,
            Command::CallHangup => C_CALL_HANGUP,
            Command::Heartbeat => CHB,
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
