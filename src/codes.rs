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

//! Symbolic name <-> hex code table
//!
//! The table is a JSON object such as `{"H_Ring": "AA02 0155", ...}`. Codes are
//! written in the same canonical form the codec produces for a frame: uppercase
//! hex, four digits per group, groups separated by a single space.

use std::fmt;
use std::path::Path;

use serde::de::{self, Deserialize, Deserializer, MapAccess, Visitor};
use thiserror::Error;

use crate::protocol::Command;

#[derive(Debug, Error)]
pub enum CodeTableError {
    #[error("cannot read code table: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed code table: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("code for {name} is not canonical hex: {code:?}")]
    MalformedCode { name: String, code: String },

    #[error("code for {first} ({first_code}) overlaps the code for {second} ({second_code})")]
    OverlappingCodes {
        first: String,
        first_code: String,
        second: String,
        second_code: String,
    },

    #[error("code table has no entry for command {0}")]
    MissingCommand(&'static str),
}

/// Immutable, insertion-ordered set of (symbolic name, hex code) pairs.
#[derive(Debug, Clone)]
pub struct CodeTable {
    entries: Vec<(String, String)>,
}

impl CodeTable {
    /// Load and validate the table stored at `path`.
    pub fn load(path: &Path) -> Result<Self, CodeTableError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, CodeTableError> {
        let entries: OrderedEntries = serde_json::from_str(text)?;
        Self::from_entries(entries.0)
    }

    pub fn from_entries(entries: Vec<(String, String)>) -> Result<Self, CodeTableError> {
        for (name, code) in &entries {
            if !is_canonical_hex(code) {
                return Err(CodeTableError::MalformedCode {
                    name: name.clone(),
                    code: code.clone(),
                });
            }
        }

        // Substitution replaces codes one after another, so two codes that can
        // share characters of the same frame text make the result depend on
        // table order.
        for (i, (first, first_code)) in entries.iter().enumerate() {
            for (second, second_code) in &entries[i + 1..] {
                if codes_overlap(first_code, second_code) {
                    return Err(CodeTableError::OverlappingCodes {
                        first: first.clone(),
                        first_code: first_code.clone(),
                        second: second.clone(),
                        second_code: second_code.clone(),
                    });
                }
            }
        }

        let table = CodeTable { entries };
        for cmd in Command::ALL {
            if table.code(cmd.name()).is_none() {
                return Err(CodeTableError::MissingCommand(cmd.name()));
            }
        }

        Ok(table)
    }

    /// Hex code for a symbolic name
    pub fn code(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c.as_str())
    }

    /// Entries in the order they appear in the source document
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, c)| (n.as_str(), c.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Uppercase hex in groups of four digits separated by single spaces. The last
/// group may hold a single byte.
fn is_canonical_hex(code: &str) -> bool {
    if code.is_empty() {
        return false;
    }

    let groups: Vec<&str> = code.split(' ').collect();
    let last = groups.len() - 1;

    groups.iter().enumerate().all(|(i, group)| {
        let len_ok = group.len() == 4 || (i == last && group.len() == 2);
        len_ok && group.bytes().all(|b| matches!(b, b'0'..=b'9' | b'A'..=b'F'))
    })
}

/// True if one code contains the other, or a tail of one is a head of the other.
fn codes_overlap(a: &str, b: &str) -> bool {
    if a.contains(b) || b.contains(a) {
        return true;
    }

    // codes are ASCII, so byte slicing stays on char boundaries
    (1..a.len().min(b.len())).any(|k| a.ends_with(&b[..k]) || b.ends_with(&a[..k]))
}

// ============================================================================
// Ordered JSON object
// ============================================================================

/// Keeps JSON object entries in document order and rejects repeated keys.
struct OrderedEntries(Vec<(String, String)>);

impl<'de> Deserialize<'de> for OrderedEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = OrderedEntries;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping symbolic names to hex codes")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries: Vec<(String, String)> = Vec::new();
                while let Some((name, code)) = map.next_entry::<String, String>()? {
                    if entries.iter().any(|(n, _)| *n == name) {
                        return Err(de::Error::custom(format!("duplicate name {name}")));
                    }
                    entries.push((name, code));
                }
                Ok(OrderedEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

// ============================================================================
// Test fixture
// ============================================================================

#[cfg(test)]
pub const SAMPLE_JSON: &str = r#"{
    "H_Discover": "AA01 0155",
    "C_ImHere": "AA81 0155",
    "H_Ring": "AA02 0155",
    "C_RingACK": "AA82 0155",
    "H_PkupAck": "AA03 0155",
    "C_Pkup": "AA83 0155",
    "C_Spking": "AA84 0155",
    "H_UnlockAck": "AA05 0155",
    "C_Unlock": "AA85 0155",
    "H_CallHangupACK": "AA06 0155",
    "C_CallHangup": "AA86 0155",
    "HHB": "AA07 0155",
    "CHB": "AA87 0155",
    "H_ACK": "AA08 0155"
}"#;

#[cfg(test)]
pub fn sample_table() -> CodeTable {
    CodeTable::from_json(SAMPLE_JSON).expect("sample table is valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_entry(name: &str, code: &str) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> = sample_table()
            .iter()
            .map(|(n, c)| (n.to_string(), c.to_string()))
            .collect();
        entries.push((name.to_string(), code.to_string()));
        entries
    }

    #[test]
    fn test_sample_table_keeps_document_order() {
        let table = sample_table();
        assert_eq!(table.len(), 14);

        let names: Vec<&str> = table.iter().map(|(n, _)| n).collect();
        assert_eq!(names[0], "H_Discover");
        assert_eq!(names[1], "C_ImHere");
        assert_eq!(names[13], "H_ACK");
        assert_eq!(table.code("HHB"), Some("AA07 0155"));
        assert_eq!(table.code("H_Nope"), None);
    }

    #[test]
    fn test_canonical_hex() {
        assert!(is_canonical_hex("AA01 0155"));
        assert!(is_canonical_hex("AA01"));
        assert!(is_canonical_hex("AA01 01"));
        assert!(is_canonical_hex("0F"));

        assert!(!is_canonical_hex(""));
        assert!(!is_canonical_hex("aa01 0155"));
        assert!(!is_canonical_hex("AA010155"));
        assert!(!is_canonical_hex("AA01  0155"));
        assert!(!is_canonical_hex("AA 0155"));
        assert!(!is_canonical_hex("AA01 015"));
        assert!(!is_canonical_hex("AA0G 0155"));
        assert!(!is_canonical_hex(" AA01"));
    }

    #[test]
    fn test_rejects_malformed_code() {
        let err = CodeTable::from_entries(with_entry("H_Bad", "aa09 0155")).unwrap_err();
        assert!(matches!(err, CodeTableError::MalformedCode { ref name, .. } if name == "H_Bad"));
    }

    #[test]
    fn test_rejects_contained_code() {
        let err = CodeTable::from_entries(with_entry("H_Short", "0155")).unwrap_err();
        match err {
            CodeTableError::OverlappingCodes { second, second_code, .. } => {
                assert_eq!(second, "H_Short");
                assert_eq!(second_code, "0155");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_codes_overlap() {
        assert!(codes_overlap("AA01 0155", "0155"));
        assert!(codes_overlap("AA01 01", "0155"));
        assert!(codes_overlap("0155", "AA01 01"));
        assert!(codes_overlap("AA02", "AA02"));
        assert!(codes_overlap("BB01 01", "0166"));

        assert!(!codes_overlap("AA01 0155", "AA02 0155"));
        assert!(!codes_overlap("AA02", "B001 01"));
    }

    #[test]
    fn test_rejects_head_tail_overlap_in_either_order() {
        // frame BB01 0166 would decode as "H_Ring66" or "BB01 HHB" depending on order
        let ring = ("H_Ring", "BB01 01");
        let heartbeat = ("HHB", "0166");

        for (first, second) in [(ring, heartbeat), (heartbeat, ring)] {
            let mut entries: Vec<(String, String)> = sample_table()
                .iter()
                .filter(|(n, _)| *n != "H_Ring" && *n != "HHB")
                .map(|(n, c)| (n.to_string(), c.to_string()))
                .collect();
            entries.push((first.0.to_string(), first.1.to_string()));
            entries.push((second.0.to_string(), second.1.to_string()));

            match CodeTable::from_entries(entries).unwrap_err() {
                CodeTableError::OverlappingCodes { first: a, second: b, .. } => {
                    assert_eq!(a, first.0);
                    assert_eq!(b, second.0);
                }
                other => panic!("unexpected error: {:?}", other),
            }
        }
    }

    #[test]
    fn test_rejects_missing_command() {
        let entries = vec![
            ("H_Ring".to_string(), "AA02 0155".to_string()),
            ("C_RingACK".to_string(), "AA82 0155".to_string()),
        ];
        let err = CodeTable::from_entries(entries).unwrap_err();
        assert!(matches!(err, CodeTableError::MissingCommand("C_ImHere")));
    }

    #[test]
    fn test_rejects_duplicate_name() {
        let json = r#"{"CHB": "AA87 0155", "CHB": "AA88 0155"}"#;
        let err = CodeTable::from_json(json).unwrap_err();
        assert!(matches!(err, CodeTableError::Parse(_)));
        assert!(err.to_string().contains("duplicate name CHB"));
    }

    #[test]
    fn test_rejects_non_object_documents() {
        assert!(matches!(CodeTable::from_json("[]"), Err(CodeTableError::Parse(_))));
        assert!(matches!(CodeTable::from_json(r#"{"CHB": 7}"#), Err(CodeTableError::Parse(_))));
        assert!(matches!(CodeTable::from_json("{"), Err(CodeTableError::Parse(_))));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join("intercom_bridge_codes.json");
        std::fs::write(&path, SAMPLE_JSON).unwrap();

        let table = CodeTable::load(&path).expect("table should load");
        assert_eq!(table.code("C_Unlock"), Some("AA85 0155"));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_missing_file() {
        let path = std::env::temp_dir().join("intercom_bridge_no_such_table.json");
        assert!(matches!(CodeTable::load(&path), Err(CodeTableError::Io(_))));
    }
}
