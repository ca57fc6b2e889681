//! The ordered list of telemetry message types the collector polls.
//!
//! Names follow the MAVLink convention (`ATTITUDE`, `GLOBAL_POSITION_INT`)
//! and double as snapshot file stems, so they are validated up front.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{MavsnapError, Result};

// ── Defaults ──────────────────────────────────────────────────────────────────

/// Message types polled when none are given on the command line.
pub const DEFAULT_MESSAGE_TYPES: [&str; 11] = [
    "ATTITUDE",
    "AHRS",
    "AHRS2",
    "BATTERY_STATUS",
    "HEARTBEAT",
    "DISTANCE_SENSOR",
    "GLOBAL_POSITION_INT",
    "RANGEFINDER",
    "RAW_IMU",
    "SCALED_IMU2",
    "LOCAL_POSITION_NED",
];

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z][A-Z0-9_]*$").expect("valid message type regex"))
}

// ── MessageType ───────────────────────────────────────────────────────────────

/// A validated telemetry message type name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageType(String);

impl MessageType {
    /// Validate `name` and wrap it. Surrounding whitespace is ignored.
    pub fn new(name: &str) -> Result<Self> {
        let name = name.trim();
        if !name_pattern().is_match(name) {
            return Err(MavsnapError::InvalidMessageType(name.to_string()));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the snapshot file for this type, e.g. `ATTITUDE.json`.
    pub fn file_name(&self) -> String {
        format!("{}.json", self.0)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for MessageType {
    type Err = MavsnapError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

// ── MessageTypeList ───────────────────────────────────────────────────────────

/// Ordered, duplicate-free, non-empty list of message types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTypeList {
    types: Vec<MessageType>,
}

impl MessageTypeList {
    /// Build a list from names, keeping the first occurrence of duplicates.
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut types: Vec<MessageType> = Vec::new();
        for name in names {
            let message_type = MessageType::new(name.as_ref())?;
            if !types.contains(&message_type) {
                types.push(message_type);
            }
        }

        if types.is_empty() {
            return Err(MavsnapError::EmptyMessageTypes);
        }

        Ok(Self { types })
    }

    /// Parse a comma-separated list such as `"ATTITUDE, HEARTBEAT"`.
    pub fn parse(list: &str) -> Result<Self> {
        Self::from_names(list.split(',').filter(|s| !s.trim().is_empty()))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MessageType> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for MessageTypeList {
    fn default() -> Self {
        Self {
            types: DEFAULT_MESSAGE_TYPES
                .iter()
                .map(|name| MessageType(name.to_string()))
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a MessageTypeList {
    type Item = &'a MessageType;
    type IntoIter = std::slice::Iter<'a, MessageType>;

    fn into_iter(self) -> Self::IntoIter {
        self.types.iter()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_accepts_mavlink_names() {
        for name in DEFAULT_MESSAGE_TYPES {
            assert!(MessageType::new(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn test_message_type_trims_whitespace() {
        let mt = MessageType::new("  RAW_IMU ").unwrap();
        assert_eq!(mt.as_str(), "RAW_IMU");
    }

    #[test]
    fn test_message_type_rejects_bad_names() {
        for name in ["", "attitude", "2FAST", "../ATTITUDE", "ATT.json", "ATT ITUDE"] {
            let err = MessageType::new(name).unwrap_err();
            assert!(matches!(err, MavsnapError::InvalidMessageType(_)), "{name}");
        }
    }

    #[test]
    fn test_message_type_file_name() {
        let mt = MessageType::new("SCALED_IMU2").unwrap();
        assert_eq!(mt.file_name(), "SCALED_IMU2.json");
        assert_eq!(mt.to_string(), "SCALED_IMU2");
    }

    #[test]
    fn test_default_list_order() {
        let list = MessageTypeList::default();
        let names: Vec<&str> = list.iter().map(|m| m.as_str()).collect();
        assert_eq!(names, DEFAULT_MESSAGE_TYPES.to_vec());
        assert_eq!(list.len(), 11);
        assert!(!list.is_empty());
    }

    #[test]
    fn test_parse_comma_list_keeps_order_and_dedups() {
        let list = MessageTypeList::parse("HEARTBEAT, ATTITUDE,HEARTBEAT,,RAW_IMU").unwrap();
        let names: Vec<&str> = list.iter().map(|m| m.as_str()).collect();
        assert_eq!(names, vec!["HEARTBEAT", "ATTITUDE", "RAW_IMU"]);
    }

    #[test]
    fn test_parse_empty_list_is_error() {
        let err = MessageTypeList::parse(" , ").unwrap_err();
        assert!(matches!(err, MavsnapError::EmptyMessageTypes));
    }

    #[test]
    fn test_parse_rejects_invalid_entry() {
        assert!(MessageTypeList::parse("ATTITUDE,heartbeat").is_err());
    }
}
