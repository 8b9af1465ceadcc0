//! Token type identifiers.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;
use crate::hash::parse_hex32;

/// A 32-byte token type identifier. The all-zero value is the native token.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenType([u8; 32]);

impl TokenType {
    /// The native NIGHT token.
    pub const NATIVE: Self = Self([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_native(&self) -> bool {
        *self == Self::NATIVE
    }
}

impl Default for TokenType {
    fn default() -> Self {
        Self::NATIVE
    }
}

impl fmt::Debug for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_native() {
            f.write_str("TokenType(NIGHT)")
        } else {
            write!(f, "TokenType({})", hex::encode(&self.0[..4]))
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for TokenType {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex32(s).map(Self)
    }
}

impl Serialize for TokenType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for TokenType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_token_is_all_zero() {
        let parsed: TokenType = "00".repeat(32).parse().unwrap();
        assert!(parsed.is_native());
        assert_eq!(TokenType::default(), TokenType::NATIVE);
    }

    #[test]
    fn custom_token_is_not_native() {
        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        assert!(!TokenType::new(bytes).is_native());
    }
}
