//! Intent hashes and UTXO identity.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;

/// Decode a 64-character hex string into 32 bytes.
pub(crate) fn parse_hex32(s: &str) -> Result<[u8; 32], TypesError> {
    let trimmed = s.trim().trim_start_matches("0x");
    let bytes = hex::decode(trimmed).map_err(|e| TypesError::InvalidHex(format!("{s:?}: {e}")))?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| TypesError::InvalidHex(format!("{s:?}: expected 32 bytes, got {}", bytes.len())))
}

/// Hash of the intent that created an output.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntentHash([u8; 32]);

impl IntentHash {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for IntentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IntentHash({})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for IntentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for IntentHash {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex32(s).map(Self)
    }
}

impl Serialize for IntentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for IntentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Identity of a created output: the intent that created it plus its position.
///
/// Unique per created output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UtxoId {
    pub intent_hash: IntentHash,
    pub output_index: u32,
}

impl UtxoId {
    pub fn new(intent_hash: IntentHash, output_index: u32) -> Self {
        Self {
            intent_hash,
            output_index,
        }
    }
}

impl fmt::Display for UtxoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.intent_hash, self.output_index)
    }
}
