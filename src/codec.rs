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

use thiserror::Error;

use crate::codes::CodeTable;
use crate::protocol::PanelMessage;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("no code for symbolic name {0}")]
    UnknownName(String),

    #[error("invalid hex code {0:?}")]
    InvalidHex(String),
}

/// A frame after hex rendering and symbolic substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    /// Substituted text, possibly with leftover hex
    pub text: String,
    pub kind: PanelMessage,
}

/// Translates between raw frames and symbolic names using a code table.
pub struct Codec {
    table: CodeTable,
}

impl Codec {
    pub fn new(table: CodeTable) -> Self {
        Codec { table }
    }

    /// Raw bytes for a symbolic name
    pub fn encode(&self, name: &str) -> Result<Vec<u8>, CodecError> {
        let code = self
            .table
            .code(name)
            .ok_or_else(|| CodecError::UnknownName(name.to_string()))?;
        hex_to_bytes(code)
    }

    /// Render a frame, substitute known codes and classify the result
    pub fn decode(&self, frame: &[u8]) -> DecodedMessage {
        let text = symbolic_substitute(&bytes_to_hex(frame), &self.table);
        let kind = PanelMessage::classify(&text);
        DecodedMessage { text, kind }
    }
}

/// Uppercase hex, two bytes per space-separated group: `[0xAA, 0x01, 0x01]`
/// becomes `"AA01 01"`.
pub fn bytes_to_hex(frame: &[u8]) -> String {
    frame
        .chunks(2)
        .map(|pair| pair.iter().map(|b| format!("{:02X}", b)).collect::<String>())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse hex text, ignoring spaces
pub fn hex_to_bytes(code: &str) -> Result<Vec<u8>, CodecError> {
    let digits: Vec<u8> = code.bytes().filter(|&b| b != b' ').collect();
    if digits.len() % 2 != 0 {
        return Err(CodecError::InvalidHex(code.to_string()));
    }

    digits
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .ok_or_else(|| CodecError::InvalidHex(code.to_string()))
        })
        .collect()
}

/// Replace every occurrence of each code with its name, walking the table in
/// document order.
pub fn symbolic_substitute(text: &str, table: &CodeTable) -> String {
    table
        .iter()
        .fold(text.to_string(), |acc, (name, code)| acc.replace(code, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::sample_table;

    #[test]
    fn test_bytes_to_hex() {
        assert_eq!(bytes_to_hex(&[0xAA, 0x01, 0x01, 0x55]), "AA01 0155");
        assert_eq!(bytes_to_hex(&[0x0f, 0xa0, 0x3c]), "0FA0 3C");
        assert_eq!(bytes_to_hex(&[0x00]), "00");
        assert_eq!(bytes_to_hex(&[]), "");
    }

    #[test]
    fn test_hex_to_bytes() {
        assert_eq!(hex_to_bytes("AA01 0155"), Ok(vec![0xAA, 0x01, 0x01, 0x55]));
        assert_eq!(hex_to_bytes("aa 01"), Ok(vec![0xAA, 0x01]));
        assert_eq!(hex_to_bytes("AA0"), Err(CodecError::InvalidHex("AA0".to_string())));
        assert_eq!(hex_to_bytes("ZZ00"), Err(CodecError::InvalidHex("ZZ00".to_string())));
    }

    #[test]
    fn test_encode_unknown_name() {
        let codec = Codec::new(sample_table());
        assert_eq!(
            codec.encode("C_Teleport"),
            Err(CodecError::UnknownName("C_Teleport".to_string()))
        );
    }

    #[test]
    fn test_every_code_round_trips_to_its_name() {
        let table = sample_table();
        let codec = Codec::new(table.clone());

        for (name, code) in table.iter() {
            let frame = codec.encode(name).unwrap();
            assert_eq!(frame.len(), 4);
            assert_eq!(bytes_to_hex(&frame), code);
            assert_eq!(codec.decode(&frame).text, name, "no residue expected for {}", name);
        }
    }

    #[test]
    fn test_decode_classifies() {
        let codec = Codec::new(sample_table());

        let msg = codec.decode(&[0xAA, 0x02, 0x01, 0x55]);
        assert_eq!(msg.text, "H_Ring");
        assert_eq!(msg.kind, PanelMessage::Ring);

        let msg = codec.decode(&[0xAA, 0x07, 0x01, 0x55]);
        assert_eq!(msg.kind, PanelMessage::Heartbeat);
    }

    #[test]
    fn test_decode_unmatched_keeps_hex() {
        let codec = Codec::new(sample_table());

        let msg = codec.decode(&[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(msg.text, "DEAD BEEF");
        assert_eq!(msg.kind, PanelMessage::Unknown);
    }

    #[test]
    fn test_partial_substitution_leaves_residue() {
        let table = CodeTable::from_json(
            r#"{
                "H_Ring": "AA02",
                "C_ImHere": "B001 01",
                "C_RingACK": "B002 01",
                "C_Pkup": "B003 01",
                "C_Spking": "B004 01",
                "C_Unlock": "B005 01",
                "C_CallHangup": "B006 01",
                "CHB": "B007 01"
            }"#,
        )
        .unwrap();
        let codec = Codec::new(table);

        let msg = codec.decode(&[0xAA, 0x02, 0x12, 0x34]);
        assert_eq!(msg.text, "H_Ring 1234");
        assert_eq!(msg.kind, PanelMessage::Ring);
    }
}
