//! Network identifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;

/// Identifies which NIGHT network the wallet talks to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkId {
    /// Local standalone network started on the developer's machine.
    Undeployed,
    /// Internal development network.
    Devnet,
    /// Public preview network.
    Preview,
    /// Pre-production network.
    Preprod,
    /// The production network.
    Mainnet,
}

impl NetworkId {
    /// Every known network, in display order.
    pub const ALL: [NetworkId; 5] = [
        Self::Undeployed,
        Self::Devnet,
        Self::Preview,
        Self::Preprod,
        Self::Mainnet,
    ];

    /// Human-readable name, also used as the network tag inside addresses.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Undeployed => "undeployed",
            Self::Devnet => "devnet",
            Self::Preview => "preview",
            Self::Preprod => "preprod",
            Self::Mainnet => "mainnet",
        }
    }

    /// Bech32m human-readable part used for addresses on this network.
    ///
    /// Mainnet addresses carry no network suffix.
    pub fn address_hrp(&self) -> String {
        match self {
            Self::Mainnet => "mn_addr".to_string(),
            other => format!("mn_addr_{}", other.as_str()),
        }
    }

    /// Recover the network from an address human-readable part.
    pub fn from_address_hrp(hrp: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|network| network.address_hrp() == hrp)
    }

    /// Comma-separated list of valid network names, for error messages.
    pub fn valid_names() -> String {
        Self::ALL
            .iter()
            .map(|n| n.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|network| network.as_str() == wanted)
            .ok_or_else(|| TypesError::UnknownNetwork {
                name: s.to_string(),
                valid: Self::valid_names(),
            })
    }
}
