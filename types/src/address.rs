//! Network-tagged wallet addresses (bech32m).
//!
//! An address is the bech32m encoding of a 32-byte payload under the
//! human-readable part of its network, e.g. `mn_addr_preprod1...`.

use bech32::primitives::decode::CheckedHrpstring;
use bech32::{Bech32m, Hrp};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TypesError;
use crate::network::NetworkId;

/// Length of the decoded address payload.
pub const ADDRESS_PAYLOAD_LEN: usize = 32;

/// A decoded NIGHT address.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WalletAddress {
    network: NetworkId,
    payload: [u8; ADDRESS_PAYLOAD_LEN],
    encoded: String,
}

impl WalletAddress {
    /// Encode a payload as an address on `network`.
    pub fn encode(
        network: NetworkId,
        payload: [u8; ADDRESS_PAYLOAD_LEN],
    ) -> Result<Self, TypesError> {
        let hrp = Hrp::parse(&network.address_hrp())
            .map_err(|e| TypesError::InvalidAddress(format!("bad prefix: {e}")))?;
        let encoded = bech32::encode::<Bech32m>(hrp, &payload)
            .map_err(|e| TypesError::InvalidAddress(e.to_string()))?;
        Ok(Self {
            network,
            payload,
            encoded,
        })
    }

    /// Decode an address, learning its network from the embedded tag.
    pub fn decode(s: &str) -> Result<Self, TypesError> {
        let trimmed = s.trim();
        let checked = CheckedHrpstring::new::<Bech32m>(trimmed)
            .map_err(|e| TypesError::InvalidAddress(format!("{trimmed:?}: {e}")))?;

        let hrp = checked.hrp().to_string().to_lowercase();
        let network = NetworkId::from_address_hrp(&hrp).ok_or_else(|| {
            TypesError::InvalidAddress(format!("unrecognised address prefix {hrp:?}"))
        })?;

        let bytes: Vec<u8> = checked.byte_iter().collect();
        let payload: [u8; ADDRESS_PAYLOAD_LEN] = bytes.as_slice().try_into().map_err(|_| {
            TypesError::InvalidAddress(format!(
                "payload must be {ADDRESS_PAYLOAD_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;

        Ok(Self {
            network,
            payload,
            encoded: trimmed.to_lowercase(),
        })
    }

    /// Decode an address and require that it belongs to `expected`.
    pub fn decode_for(s: &str, expected: NetworkId) -> Result<Self, TypesError> {
        let address = Self::decode(s)?;
        if address.network != expected {
            return Err(TypesError::NetworkMismatch {
                expected: expected.to_string(),
                found: address.network.to_string(),
            });
        }
        Ok(address)
    }

    /// Network tag embedded in the address.
    pub fn network(&self) -> NetworkId {
        self.network
    }

    pub fn payload(&self) -> &[u8; ADDRESS_PAYLOAD_LEN] {
        &self.payload
    }

    /// The canonical (lowercase) encoded form.
    pub fn as_str(&self) -> &str {
        &self.encoded
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}
