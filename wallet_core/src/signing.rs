//! Signing material supplied by the caller.

use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use night_types::TypesError;

/// Length of a wallet seed in bytes.
pub const SEED_LEN: usize = 32;

/// A wallet seed. Opaque to the orchestrator; handed to the engine.
///
/// Not `Clone`, never printed, zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SigningMaterial(Vec<u8>);

impl SigningMaterial {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, TypesError> {
        if bytes.len() != SEED_LEN {
            let len = bytes.len();
            let mut bytes = bytes;
            bytes.zeroize();
            return Err(TypesError::InvalidHex(format!(
                "seed must be {SEED_LEN} bytes, got {len}"
            )));
        }
        Ok(Self(bytes))
    }

    /// Parse a hex-encoded seed.
    pub fn from_hex(s: &str) -> Result<Self, TypesError> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| TypesError::InvalidHex(format!("seed is not valid hex: {e}")))?;
        Self::from_bytes(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Hex encoding for handing the seed to an engine process.
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(&self.0))
    }
}

impl fmt::Debug for SigningMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningMaterial(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_32_byte_hex() {
        let material = SigningMaterial::from_hex(&"01".repeat(32)).unwrap();
        assert_eq!(material.as_bytes(), &[1u8; 32]);
        assert_eq!(material.to_hex().as_str(), "01".repeat(32));
    }

    #[test]
    fn rejects_wrong_length_and_bad_hex() {
        assert!(SigningMaterial::from_hex("0102").is_err());
        assert!(SigningMaterial::from_hex(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn debug_never_shows_bytes() {
        let material = SigningMaterial::from_hex(&"ab".repeat(32)).unwrap();
        let shown = format!("{material:?}");
        assert!(!shown.contains("ab"));
    }
}
