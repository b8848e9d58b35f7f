use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use once_cell::sync::Lazy;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::DbError;

const COUNTER_MASK: u32 = 0x00FF_FFFF;

/// Random bytes fixed for the lifetime of the process.
static PROCESS_UNIQUE: Lazy<[u8; 5]> = Lazy::new(|| {
    let bytes = Uuid::new_v4().into_bytes();
    [bytes[0], bytes[1], bytes[2], bytes[3], bytes[4]]
});

static COUNTER: Lazy<AtomicU32> = Lazy::new(|| {
    let bytes = Uuid::new_v4().into_bytes();
    AtomicU32::new(u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]))
});

/// 12-byte document identifier, rendered as 24 lowercase hex characters.
///
/// Layout: 4-byte big-endian unix seconds, 5 per-process random bytes,
/// 3-byte big-endian counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    /// Length of the textual form.
    pub const HEX_LEN: usize = 24;

    pub fn new() -> Self {
        let seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs() as u32)
            .unwrap_or_default();
        let counter = COUNTER.fetch_add(1, Ordering::Relaxed) & COUNTER_MASK;

        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..9].copy_from_slice(PROCESS_UNIQUE.as_slice());
        bytes[9..].copy_from_slice(&counter.to_be_bytes()[1..]);
        Self(bytes)
    }

    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> [u8; 12] {
        self.0
    }

    /// Parse the 24-character hex form; any other shape is rejected.
    pub fn parse_str(value: &str) -> Result<Self, DbError> {
        if value.len() != Self::HEX_LEN {
            return Err(DbError::InvalidObjectId(value.to_string()));
        }

        let mut bytes = [0u8; 12];
        hex::decode_to_slice(value, &mut bytes)
            .map_err(|_| DbError::InvalidObjectId(value.to_string()))?;
        Ok(Self(bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse_str(&raw).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique_and_ascending() {
        let first = ObjectId::new();
        let second = ObjectId::new();

        assert_ne!(first, second);
        assert_eq!(first.to_hex().len(), ObjectId::HEX_LEN);
        // Same second and process bytes; only a counter wrap could reorder.
        if first.bytes()[..9] == second.bytes()[..9] && first.bytes()[9..] != [0xFF; 3] {
            assert!(first < second);
        }
    }

    #[test]
    fn hex_form_round_trips() {
        let id = ObjectId::new();
        let parsed: ObjectId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn all_zero_id_is_well_formed() {
        let id = ObjectId::parse_str("000000000000000000000000").unwrap();
        assert_eq!(id, ObjectId::from_bytes([0; 12]));
    }

    #[test]
    fn malformed_ids_are_rejected() {
        for raw in ["invalid", "", "00000000000000000000000", "zz0000000000000000000000"] {
            assert_eq!(
                ObjectId::parse_str(raw),
                Err(DbError::InvalidObjectId(raw.to_string())),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn serializes_as_hex_string() {
        let id = ObjectId::from_bytes([0xab; 12]);
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json, serde_json::json!("abababababababababababab"));

        let back: ObjectId = serde_json::from_value(json).unwrap();
        assert_eq!(back, id);
    }
}
